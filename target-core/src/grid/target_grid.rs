use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::warn;

use crate::calendar::{FY_MONTHS, is_target_in_financial_year, month_to_year};
use crate::models::{FinancialYear, Service, StaffMember, TargetRecord};

type MonthTargets = BTreeMap<String, u32>;

/// Committed targets: staff → month → service name → value.
///
/// Every staff member present has all twelve months, and every month has
/// every service the grid was built with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetGrid {
    staff: BTreeMap<i64, BTreeMap<u32, MonthTargets>>,
}

/// Why a persisted row was left out of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("month/year pair lies outside the financial year")]
    OutsideFinancialYear,

    #[error("staff member is not in the directory")]
    UnknownStaff,

    #[error("service is not in the directory")]
    UnknownService,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub record: TargetRecord,
    pub reason: RejectionReason,
}

impl TargetGrid {
    /// A grid with every cell of every listed staff member set to zero.
    pub fn blank(
        staff: &[StaffMember],
        services: &[Service],
    ) -> Self {
        let mut grid = Self::default();
        for member in staff {
            grid.insert_blank_staff(member.staff_id, services);
        }
        grid
    }

    fn insert_blank_staff(
        &mut self,
        staff_id: i64,
        services: &[Service],
    ) {
        let months = FY_MONTHS
            .iter()
            .map(|&month| {
                let cells = services
                    .iter()
                    .map(|s| (s.service_name.clone(), 0))
                    .collect();
                (month, cells)
            })
            .collect();
        self.staff.insert(staff_id, months);
    }

    /// Build a grid for `fy` from persisted rows.
    ///
    /// Each staff member starts zero-filled; accepted rows overwrite their
    /// cell. Rows outside `fy`, or naming an unknown staff member or
    /// service, are skipped and returned so the caller can report them.
    pub fn from_records(
        fy: &FinancialYear,
        staff: &[StaffMember],
        services: &[Service],
        records: impl IntoIterator<Item = TargetRecord>,
    ) -> (Self, Vec<Rejection>) {
        let mut grid = Self::blank(staff, services);
        let rejected = grid.overlay(fy, services, records);
        (grid, rejected)
    }

    /// Overlay persisted rows onto existing cells.
    pub fn overlay(
        &mut self,
        fy: &FinancialYear,
        services: &[Service],
        records: impl IntoIterator<Item = TargetRecord>,
    ) -> Vec<Rejection> {
        let names: HashMap<i64, &str> = services
            .iter()
            .map(|s| (s.service_id, s.service_name.as_str()))
            .collect();

        let mut rejected = Vec::new();
        for record in records {
            if let Err(reason) = self.apply(fy, &names, &record) {
                warn!(
                    staff_id = record.staff_id,
                    service_id = record.service_id,
                    month = record.month,
                    year = record.year,
                    %fy,
                    "dropping target row: {reason}"
                );
                rejected.push(Rejection { record, reason });
            }
        }
        rejected
    }

    fn apply(
        &mut self,
        fy: &FinancialYear,
        names: &HashMap<i64, &str>,
        record: &TargetRecord,
    ) -> Result<(), RejectionReason> {
        if !is_target_in_financial_year(record.month, record.year, fy) {
            return Err(RejectionReason::OutsideFinancialYear);
        }
        let name = names
            .get(&record.service_id)
            .ok_or(RejectionReason::UnknownService)?;
        let cell = self
            .staff
            .get_mut(&record.staff_id)
            .ok_or(RejectionReason::UnknownStaff)?
            .get_mut(&record.month)
            .and_then(|cells| cells.get_mut(*name))
            .ok_or(RejectionReason::UnknownService)?;
        *cell = record.target_value;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.staff.is_empty()
    }

    pub fn contains_staff(
        &self,
        staff_id: i64,
    ) -> bool {
        self.staff.contains_key(&staff_id)
    }

    pub fn staff_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.staff.keys().copied()
    }

    pub fn value(
        &self,
        staff_id: i64,
        month: u32,
        service_name: &str,
    ) -> Option<u32> {
        self.month_targets(staff_id, month)?.get(service_name).copied()
    }

    /// Overwrite an existing cell, returning its previous value. Cells
    /// outside the grid are never created.
    pub fn set(
        &mut self,
        staff_id: i64,
        month: u32,
        service_name: &str,
        value: u32,
    ) -> Option<u32> {
        let cell = self
            .staff
            .get_mut(&staff_id)?
            .get_mut(&month)?
            .get_mut(service_name)?;
        Some(std::mem::replace(cell, value))
    }

    pub fn month_targets(
        &self,
        staff_id: i64,
        month: u32,
    ) -> Option<&BTreeMap<String, u32>> {
        self.staff.get(&staff_id)?.get(&month)
    }

    /// The full persisted row set for one staff member: every month in
    /// financial-year order crossed with every service in directory order.
    pub fn records_for(
        &self,
        staff_id: i64,
        fy: &FinancialYear,
        services: &[Service],
    ) -> Option<Vec<TargetRecord>> {
        let months = self.staff.get(&staff_id)?;
        let records = FY_MONTHS
            .iter()
            .flat_map(|&month| {
                services.iter().map(move |service| TargetRecord {
                    staff_id,
                    service_id: service.service_id,
                    month,
                    year: month_to_year(month, fy),
                    target_value: months
                        .get(&month)
                        .and_then(|cells| cells.get(&service.service_name))
                        .copied()
                        .unwrap_or(0),
                })
            })
            .collect();
        Some(records)
    }

    // ── aggregates ───────────────────────────────────────────────────────

    /// Sum over services for one staff member and month.
    pub fn monthly_total(
        &self,
        staff_id: i64,
        month: u32,
    ) -> u64 {
        self.month_targets(staff_id, month)
            .map(|cells| cells.values().map(|&v| u64::from(v)).sum())
            .unwrap_or(0)
    }

    /// Sum over the twelve months for one staff member and service.
    pub fn annual_total(
        &self,
        staff_id: i64,
        service_name: &str,
    ) -> u64 {
        FY_MONTHS
            .iter()
            .filter_map(|&month| self.value(staff_id, month, service_name))
            .map(u64::from)
            .sum()
    }

    /// Sum of every cell for one staff member.
    pub fn staff_annual_total(
        &self,
        staff_id: i64,
    ) -> u64 {
        FY_MONTHS
            .iter()
            .map(|&month| self.monthly_total(staff_id, month))
            .sum()
    }

    /// Sum across all staff for one service and month.
    pub fn service_month_total(
        &self,
        service_name: &str,
        month: u32,
    ) -> u64 {
        self.staff_ids()
            .filter_map(|id| self.value(id, month, service_name))
            .map(u64::from)
            .sum()
    }

    /// Sum across all staff and months for one service.
    pub fn service_annual_total(
        &self,
        service_name: &str,
    ) -> u64 {
        self.staff_ids()
            .map(|id| self.annual_total(id, service_name))
            .sum()
    }

    pub fn grand_total(&self) -> u64 {
        self.staff_ids().map(|id| self.staff_annual_total(id)).sum()
    }
}
