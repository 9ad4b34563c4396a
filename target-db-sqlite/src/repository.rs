use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row, Sqlite};
use target_core::{RepositoryError, Service, StaffMember, TargetRecord, TargetRepository};
use tracing::debug;

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to `database_url`, creating the database file when missing.
    ///
    /// In-memory databases are held on a single connection so every query
    /// sees the same data.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new();
        if database_url.contains(":memory:") || database_url.contains("mode=memory") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute every SQL seed file in `seeds_dir`, in name order.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "applied seed file");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn db_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn get_u32(
    row: &SqliteRow,
    column: &str,
) -> Result<u32, RepositoryError> {
    let raw: i64 = row.try_get(column).map_err(db_error)?;
    u32::try_from(raw).map_err(|_| {
        RepositoryError::Database(format!("Column '{}' out of range: {}", column, raw))
    })
}

fn row_to_target(row: &SqliteRow) -> Result<TargetRecord, RepositoryError> {
    Ok(TargetRecord {
        staff_id: row.try_get("staff_id").map_err(db_error)?,
        service_id: row.try_get("service_id").map_err(db_error)?,
        month: get_u32(row, "month")?,
        year: row.try_get("year").map_err(db_error)?,
        target_value: get_u32(row, "target_value")?,
    })
}

/// Append `AND year IN (?, ?, ...)` to a query under construction.
fn push_year_filter(
    query: &mut QueryBuilder<'_, Sqlite>,
    years: &[i32],
) {
    query.push(" AND year IN (");
    let mut separated = query.separated(", ");
    for year in years {
        separated.push_bind(*year);
    }
    separated.push_unseparated(")");
}

fn delete_query(
    staff_id: i64,
    years: &[i32],
) -> QueryBuilder<'static, Sqlite> {
    let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM staff_targets WHERE staff_id = ");
    query.push_bind(staff_id);
    push_year_filter(&mut query, years);
    query
}

async fn insert_rows(
    conn: &mut SqliteConnection,
    records: &[TargetRecord],
) -> Result<(), RepositoryError> {
    for record in records {
        sqlx::query(
            "INSERT INTO staff_targets (staff_id, service_id, month, year, target_value)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.staff_id)
        .bind(record.service_id)
        .bind(i64::from(record.month))
        .bind(record.year)
        .bind(i64::from(record.target_value))
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

#[async_trait]
impl TargetRepository for SqliteRepository {
    async fn list_staff(&self) -> Result<Vec<StaffMember>, RepositoryError> {
        let rows = sqlx::query("SELECT staff_id, name FROM staff ORDER BY name, staff_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter()
            .map(|row| {
                Ok(StaffMember {
                    staff_id: row.try_get("staff_id").map_err(db_error)?,
                    name: row.try_get("name").map_err(db_error)?,
                })
            })
            .collect()
    }

    async fn list_services(&self) -> Result<Vec<Service>, RepositoryError> {
        let rows = sqlx::query("SELECT service_id, service_name FROM services ORDER BY service_id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        rows.iter()
            .map(|row| {
                Ok(Service {
                    service_id: row.try_get("service_id").map_err(db_error)?,
                    service_name: row.try_get("service_name").map_err(db_error)?,
                })
            })
            .collect()
    }

    async fn fetch_targets(
        &self,
        staff_id: Option<i64>,
        years: &[i32],
    ) -> Result<Vec<TargetRecord>, RepositoryError> {
        if years.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT staff_id, service_id, month, year, target_value
             FROM staff_targets WHERE 1 = 1",
        );
        if let Some(id) = staff_id {
            query.push(" AND staff_id = ").push_bind(id);
        }
        push_year_filter(&mut query, years);
        query.push(" ORDER BY staff_id, year, month, service_id");

        let rows = query.build().fetch_all(&self.pool).await.map_err(db_error)?;

        rows.iter().map(row_to_target).collect()
    }

    async fn delete_targets(
        &self,
        staff_id: i64,
        years: &[i32],
    ) -> Result<u64, RepositoryError> {
        if years.is_empty() {
            return Ok(0);
        }

        let result = delete_query(staff_id, years)
            .build()
            .execute(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(result.rows_affected())
    }

    async fn insert_targets(
        &self,
        records: &[TargetRecord],
    ) -> Result<usize, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        insert_rows(&mut tx, records).await?;
        tx.commit().await.map_err(db_error)?;

        Ok(records.len())
    }

    /// Delete and insert inside one transaction; on any error the staff
    /// member's previous rows are left as they were.
    async fn replace_targets(
        &self,
        staff_id: i64,
        years: &[i32],
        records: &[TargetRecord],
    ) -> Result<(u64, usize), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let removed = if years.is_empty() {
            0
        } else {
            delete_query(staff_id, years)
                .build()
                .execute(&mut *tx)
                .await
                .map_err(db_error)?
                .rows_affected()
        };
        insert_rows(&mut tx, records).await?;

        tx.commit().await.map_err(db_error)?;
        Ok((removed, records.len()))
    }
}
