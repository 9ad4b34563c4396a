use std::path::PathBuf;

use async_trait::async_trait;
use target_core::db::{DbConfig, RepositoryFactory};
use target_core::{RepositoryError, TargetRepository};

use crate::repository::SqliteRepository;

pub const SEEDS_DIR_ENV: &str = "TARGET_DB_SQLITE_SEEDS_DIR";

/// Where the directory seed files live: `$TARGET_DB_SQLITE_SEEDS_DIR`,
/// else `./seeds` when present, else this crate's own `seeds/`.
fn seeds_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(SEEDS_DIR_ENV) {
        return PathBuf::from(dir);
    }
    Some(PathBuf::from("seeds"))
        .filter(|local| local.is_dir())
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds"))
}

/// The `"sqlite"` backend.
///
/// ```rust,no_run
/// use target_core::db::RepositoryRegistry;
/// use target_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// `connection_string` may be a bare path (`targets.db`), a sqlx URL
    /// (`sqlite:targets.db`) or `:memory:`. The schema is migrated and the
    /// staff and service directories seeded before the repository is
    /// returned.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn TargetRepository>, RepositoryError> {
        let repo = SqliteRepository::new(&config.connection_string)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;

        let setup = async {
            repo.run_migrations().await?;
            repo.run_seeds(&seeds_dir()).await
        };
        setup
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;

        Ok(Box::new(repo))
    }
}
