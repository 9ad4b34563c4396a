//! Reading exported target CSV back in.
//!
//! The accepted layout is exactly the one written by
//! [`crate::export::CsvExporter`]. Headers are matched by name, so column
//! order does not matter; whitespace around values is trimmed.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

use target_core::calendar::is_target_in_financial_year;
use target_core::{
    FinancialYear, RepositoryError, Service, StaffMember, TargetRecord, TargetRepository,
};
use thiserror::Error;
use tracing::debug;

use crate::export::ExportRow;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    #[error("row {row}: month {month} of {year} is not part of {fy}")]
    OutsideFinancialYear {
        row: usize,
        month: u32,
        year: i32,
        fy: FinancialYear,
    },

    #[error("row {row}: no staff member with id {staff_id}")]
    UnknownStaff { row: usize, staff_id: i64 },

    #[error("row {row}: no service with id {service_id}")]
    UnknownService { row: usize, service_id: i64 },

    #[error("row {row}: repeats the cell already given on row {first}")]
    DuplicateCell { row: usize, first: usize },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

pub struct CsvImporter;

impl CsvImporter {
    /// Parse exported rows from any reader, in file order.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<ExportRow>, ImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in csv_reader.deserialize() {
            let row: ExportRow = result?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Convert parsed rows into persisted records, refusing any row whose
    /// month and year do not belong to `fy`. Row numbers are 1-based
    /// (header = row 0).
    pub fn to_records(
        rows: &[ExportRow],
        fy: &FinancialYear,
    ) -> Result<Vec<TargetRecord>, ImportError> {
        rows.iter()
            .enumerate()
            .map(|(idx, row)| {
                if !is_target_in_financial_year(row.month, row.year, fy) {
                    return Err(ImportError::OutsideFinancialYear {
                        row: idx + 1,
                        month: row.month,
                        year: row.year,
                        fy: fy.clone(),
                    });
                }
                Ok(TargetRecord {
                    staff_id: row.staff_id,
                    service_id: row.service_id,
                    month: row.month,
                    year: row.year,
                    target_value: row.target_value,
                })
            })
            .collect()
    }

    /// Check `records` against the directories before anything is written.
    ///
    /// Every row must name a known staff member and service, and no cell
    /// (staff, service, month, year) may appear twice. Row numbers match
    /// [`to_records`](Self::to_records).
    pub fn validate(
        records: &[TargetRecord],
        staff: &[StaffMember],
        services: &[Service],
    ) -> Result<(), ImportError> {
        let staff_ids: BTreeSet<i64> = staff.iter().map(|m| m.staff_id).collect();
        let service_ids: BTreeSet<i64> = services.iter().map(|s| s.service_id).collect();
        let mut seen = BTreeMap::new();

        for (idx, record) in records.iter().enumerate() {
            let row = idx + 1;
            if !staff_ids.contains(&record.staff_id) {
                return Err(ImportError::UnknownStaff {
                    row,
                    staff_id: record.staff_id,
                });
            }
            if !service_ids.contains(&record.service_id) {
                return Err(ImportError::UnknownService {
                    row,
                    service_id: record.service_id,
                });
            }
            let cell = (record.staff_id, record.service_id, record.month, record.year);
            if let Some(&first) = seen.get(&cell) {
                return Err(ImportError::DuplicateCell { row, first });
            }
            seen.insert(cell, row);
        }
        Ok(())
    }

    /// Write `records` to the store.
    ///
    /// The whole file is validated first; a bad row means nothing is
    /// written. Each staff member present in `records` then has all of
    /// their rows for `fy` replaced by the new ones, so loading the same
    /// file twice gives the same result. Staff members not in `records`
    /// are untouched.
    pub async fn load<R>(
        repo: &R,
        fy: &FinancialYear,
        records: &[TargetRecord],
    ) -> Result<usize, ImportError>
    where
        R: TargetRepository + ?Sized,
    {
        let staff = repo.list_staff().await?;
        let services = repo.list_services().await?;
        Self::validate(records, &staff, &services)?;

        let mut by_staff: BTreeMap<i64, Vec<TargetRecord>> = BTreeMap::new();
        for record in records {
            by_staff.entry(record.staff_id).or_default().push(*record);
        }

        let years = fy.candidate_years();
        let mut inserted = 0;
        for (staff_id, staff_records) in by_staff {
            let (removed, rows) = repo
                .replace_targets(staff_id, &years, &staff_records)
                .await?;
            inserted += rows;
            debug!(staff_id, removed, rows, "imported targets");
        }

        Ok(inserted)
    }
}
