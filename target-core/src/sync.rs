//! Moving the target grid to and from the remote store.
//!
//! Saving is delete-then-insert per staff member: every row a staff member
//! has in either calendar year of the financial year is removed, then the
//! full set derived from the grid is written back. Staff members are
//! written concurrently and independently, so a failure part way through
//! leaves the staff already written in place.

use futures_util::future::join_all;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::db::repository::{RepositoryError, TargetRepository};
use crate::grid::{Rejection, TargetGrid};
use crate::models::{FinancialYear, Service, StaffMember};

/// A single staff member whose rows could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffFailure {
    pub staff_id: i64,
    pub error: RepositoryError,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("failed to load targets for staff {staff_id}: {source}")]
    Load {
        staff_id: i64,
        #[source]
        source: RepositoryError,
    },

    #[error("saved {succeeded} staff member(s) but {} failed", .failed.len())]
    PartialSave {
        succeeded: usize,
        failed: Vec<StaffFailure>,
    },
}

/// A hydrated grid plus the rows that were left out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedGrid {
    pub grid: TargetGrid,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveSummary {
    pub staff_saved: usize,
    pub rows_written: usize,
}

/// Load and save operations against any [`TargetRepository`].
pub struct PersistenceSync;

impl PersistenceSync {
    /// Fetch each staff member's rows for both calendar years of `fy` and
    /// build the grid from them.
    ///
    /// Rows that do not belong in the grid are dropped with a warning and
    /// reported in [`LoadedGrid::rejected`]; they never fail the load.
    ///
    /// # Errors
    /// [`SyncError::Load`] for the first staff member whose fetch failed.
    pub async fn load<R>(
        repo: &R,
        fy: &FinancialYear,
        staff: &[StaffMember],
        services: &[Service],
    ) -> Result<LoadedGrid, SyncError>
    where
        R: TargetRepository + ?Sized,
    {
        let years = fy.candidate_years();
        let fetches = staff.iter().map(|member| async move {
            repo.fetch_targets(Some(member.staff_id), &years)
                .await
                .map_err(|source| SyncError::Load {
                    staff_id: member.staff_id,
                    source,
                })
        });

        let mut grid = TargetGrid::blank(staff, services);
        let mut rejected = Vec::new();
        for fetched in join_all(fetches).await {
            rejected.extend(grid.overlay(fy, services, fetched?));
        }

        info!(
            %fy,
            staff = staff.len(),
            rejected = rejected.len(),
            "loaded target grid"
        );
        Ok(LoadedGrid { grid, rejected })
    }

    /// Replace every staff member's persisted rows for `fy` with the rows
    /// derived from `grid`.
    ///
    /// # Errors
    /// [`SyncError::PartialSave`] when any staff member failed. Staff
    /// members that succeeded stay written.
    pub async fn save<R>(
        repo: &R,
        fy: &FinancialYear,
        grid: &TargetGrid,
        services: &[Service],
    ) -> Result<SaveSummary, SyncError>
    where
        R: TargetRepository + ?Sized,
    {
        let years = fy.candidate_years();
        let writes = grid.staff_ids().filter_map(|staff_id| {
            let records = grid.records_for(staff_id, fy, services)?;
            Some(async move {
                let result = async {
                    let removed = repo.delete_targets(staff_id, &years).await?;
                    debug!(staff_id, removed, "cleared existing targets");
                    repo.insert_targets(&records).await
                }
                .await;
                (staff_id, result)
            })
        });

        let mut summary = SaveSummary {
            staff_saved: 0,
            rows_written: 0,
        };
        let mut failed = Vec::new();
        for (staff_id, result) in join_all(writes).await {
            match result {
                Ok(rows) => {
                    summary.staff_saved += 1;
                    summary.rows_written += rows;
                }
                Err(error) => {
                    error!(staff_id, %error, "failed to save targets");
                    failed.push(StaffFailure { staff_id, error });
                }
            }
        }

        if !failed.is_empty() {
            return Err(SyncError::PartialSave {
                succeeded: summary.staff_saved,
                failed,
            });
        }

        info!(
            %fy,
            staff = summary.staff_saved,
            rows = summary.rows_written,
            "saved target grid"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::grid::RejectionReason;
    use crate::models::TargetRecord;

    // ── in-memory store ──────────────────────────────────────────────────
    #[derive(Default)]
    struct MemoryRepository {
        rows: Mutex<Vec<TargetRecord>>,
        fail_fetch_for: Option<i64>,
        fail_insert_for: Option<i64>,
    }

    impl MemoryRepository {
        fn with_rows(rows: Vec<TargetRecord>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        fn snapshot(&self) -> BTreeSet<TargetRecord> {
            self.rows.lock().unwrap().iter().copied().collect()
        }
    }

    #[async_trait]
    impl TargetRepository for MemoryRepository {
        async fn list_staff(&self) -> Result<Vec<StaffMember>, RepositoryError> {
            Ok(staff())
        }
        async fn list_services(&self) -> Result<Vec<Service>, RepositoryError> {
            Ok(services())
        }
        async fn fetch_targets(
            &self,
            staff_id: Option<i64>,
            years: &[i32],
        ) -> Result<Vec<TargetRecord>, RepositoryError> {
            if staff_id.is_some() && staff_id == self.fail_fetch_for {
                return Err(RepositoryError::Connection("fetch refused".to_string()));
            }
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .filter(|r| staff_id.is_none_or(|id| r.staff_id == id))
                .filter(|r| years.contains(&r.year))
                .copied()
                .collect())
        }
        async fn delete_targets(
            &self,
            staff_id: i64,
            years: &[i32],
        ) -> Result<u64, RepositoryError> {
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|r| !(r.staff_id == staff_id && years.contains(&r.year)));
            Ok((before - rows.len()) as u64)
        }
        async fn insert_targets(
            &self,
            records: &[TargetRecord],
        ) -> Result<usize, RepositoryError> {
            if records.iter().any(|r| Some(r.staff_id) == self.fail_insert_for) {
                return Err(RepositoryError::Database("insert refused".to_string()));
            }
            self.rows.lock().unwrap().extend_from_slice(records);
            Ok(records.len())
        }
    }

    fn staff() -> Vec<StaffMember> {
        vec![
            StaffMember {
                staff_id: 1,
                name: "Ada".to_string(),
            },
            StaffMember {
                staff_id: 2,
                name: "Brian".to_string(),
            },
        ]
    }

    fn services() -> Vec<Service> {
        vec![
            Service {
                service_id: 10,
                service_name: "A".to_string(),
            },
            Service {
                service_id: 20,
                service_name: "B".to_string(),
            },
        ]
    }

    fn fy() -> FinancialYear {
        FinancialYear::starting(2024)
    }

    fn row(
        staff_id: i64,
        service_id: i64,
        month: u32,
        year: i32,
        target_value: u32,
    ) -> TargetRecord {
        TargetRecord {
            staff_id,
            service_id,
            month,
            year,
            target_value,
        }
    }

    #[tokio::test]
    async fn load_hydrates_and_reports_rejected_rows() {
        let repo = MemoryRepository::with_rows(vec![
            row(1, 10, 2, 2025, 10),
            row(1, 10, 11, 2024, 7),
            row(1, 20, 2, 2024, 99),
            row(2, 20, 6, 2023, 5),
        ]);

        let loaded = PersistenceSync::load(&repo, &fy(), &staff(), &services())
            .await
            .expect("load should succeed");

        assert_eq!(loaded.grid.value(1, 2, "A"), Some(10));
        assert_eq!(loaded.grid.value(1, 11, "A"), Some(7));
        assert_eq!(loaded.grid.value(1, 2, "B"), Some(0));
        assert_eq!(loaded.grid.value(2, 6, "B"), Some(0));
        assert_eq!(loaded.rejected.len(), 1);
        assert_eq!(loaded.rejected[0].reason, RejectionReason::OutsideFinancialYear);
    }

    #[tokio::test]
    async fn load_failure_names_the_staff_member() {
        let repo = MemoryRepository {
            fail_fetch_for: Some(2),
            ..Default::default()
        };

        let err = PersistenceSync::load(&repo, &fy(), &staff(), &services())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Load { staff_id: 2, .. }));
    }

    #[tokio::test]
    async fn save_writes_every_cell_with_derived_year() {
        let repo = MemoryRepository::default();
        let mut grid = TargetGrid::blank(&staff(), &services());
        grid.set(1, 2, "A", 10);
        grid.set(1, 11, "A", 7);

        let summary = PersistenceSync::save(&repo, &fy(), &grid, &services())
            .await
            .expect("save should succeed");

        assert_eq!(summary, SaveSummary { staff_saved: 2, rows_written: 48 });
        let rows = repo.snapshot();
        assert!(rows.contains(&row(1, 10, 2, 2025, 10)));
        assert!(rows.contains(&row(1, 10, 11, 2024, 7)));
        assert!(rows.contains(&row(2, 20, 3, 2025, 0)));
    }

    #[tokio::test]
    async fn save_removes_stale_rows_but_leaves_other_years() {
        let repo = MemoryRepository::with_rows(vec![
            row(1, 10, 2, 2024, 55),
            row(1, 10, 5, 2023, 8),
        ]);
        let grid = TargetGrid::blank(&staff(), &services());

        PersistenceSync::save(&repo, &fy(), &grid, &services())
            .await
            .unwrap();

        let rows = repo.snapshot();
        assert!(!rows.contains(&row(1, 10, 2, 2024, 55)));
        assert!(rows.contains(&row(1, 10, 5, 2023, 8)));
    }

    #[tokio::test]
    async fn save_twice_yields_same_rows() {
        let repo = MemoryRepository::default();
        let mut grid = TargetGrid::blank(&staff(), &services());
        grid.set(2, 8, "B", 3);

        PersistenceSync::save(&repo, &fy(), &grid, &services()).await.unwrap();
        let first = repo.snapshot();
        PersistenceSync::save(&repo, &fy(), &grid, &services()).await.unwrap();

        assert_eq!(repo.snapshot(), first);
        assert_eq!(repo.rows.lock().unwrap().len(), 48);
    }

    #[tokio::test]
    async fn save_then_load_reproduces_grid() {
        let repo = MemoryRepository::default();
        let mut grid = TargetGrid::blank(&staff(), &services());
        grid.set(1, 1, "B", 4);
        grid.set(2, 12, "A", 9);

        PersistenceSync::save(&repo, &fy(), &grid, &services()).await.unwrap();
        let loaded = PersistenceSync::load(&repo, &fy(), &staff(), &services())
            .await
            .unwrap();

        assert_eq!(loaded.grid, grid);
        assert!(loaded.rejected.is_empty());
    }

    #[tokio::test]
    async fn partial_failure_keeps_other_staff_written() {
        let repo = MemoryRepository {
            fail_insert_for: Some(2),
            ..Default::default()
        };
        let mut grid = TargetGrid::blank(&staff(), &services());
        grid.set(1, 4, "A", 1);

        let err = PersistenceSync::save(&repo, &fy(), &grid, &services())
            .await
            .unwrap_err();

        match err {
            SyncError::PartialSave { succeeded, failed } => {
                assert_eq!(succeeded, 1);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].staff_id, 2);
            }
            other => panic!("expected PartialSave, got {other:?}"),
        }
        let rows = repo.snapshot();
        assert!(rows.contains(&row(1, 10, 4, 2024, 1)));
        assert!(rows.iter().all(|r| r.staff_id == 1));
    }
}
