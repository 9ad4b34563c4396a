use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Service, StaffMember, TargetRecord};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// The remote target store.
///
/// Targets are only ever queried by staff and year set, removed by staff
/// and year set, and written in bulk.
#[async_trait]
pub trait TargetRepository: Send + Sync {
    // Directories
    async fn list_staff(&self) -> Result<Vec<StaffMember>, RepositoryError>;
    async fn list_services(&self) -> Result<Vec<Service>, RepositoryError>;

    // Targets
    /// Rows whose `year` is in `years`, optionally restricted to one staff
    /// member.
    async fn fetch_targets(
        &self,
        staff_id: Option<i64>,
        years: &[i32],
    ) -> Result<Vec<TargetRecord>, RepositoryError>;

    /// Remove every row for `staff_id` whose `year` is in `years`. Returns
    /// the number of rows removed.
    async fn delete_targets(
        &self,
        staff_id: i64,
        years: &[i32],
    ) -> Result<u64, RepositoryError>;

    /// Insert all `records` as one batch; either every row lands or none.
    async fn insert_targets(
        &self,
        records: &[TargetRecord],
    ) -> Result<usize, RepositoryError>;

    /// Swap `staff_id`'s rows for `years` with `records`. Returns the rows
    /// removed and inserted.
    ///
    /// The default runs [`delete_targets`](Self::delete_targets) then
    /// [`insert_targets`](Self::insert_targets), so a failed insert leaves
    /// the staff member with no rows. Backends with transactions override
    /// this to keep the old rows on failure.
    async fn replace_targets(
        &self,
        staff_id: i64,
        years: &[i32],
        records: &[TargetRecord],
    ) -> Result<(u64, usize), RepositoryError> {
        let removed = self.delete_targets(staff_id, years).await?;
        let inserted = self.insert_targets(records).await?;
        Ok((removed, inserted))
    }
}
