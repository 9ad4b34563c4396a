use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use target_core::TargetRepository;
use target_core::models::FinancialYear;
use target_core::sync::PersistenceSync;
use target_data::{CsvExporter, CsvImporter};
use target_db_sqlite::SqliteRepository;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Move staff targets between the database and CSV files.
///
/// Exported files carry one row per staff member, month and service with
/// the columns `staff_id, staff_name, service_id, service_name, month,
/// year, target_value`. The same layout is accepted by `import`.
#[derive(Parser, Debug)]
#[command(name = "target-data")]
#[command(version, about, long_about = None)]
struct Args {
    /// SQLite database URL (e.g., sqlite:targets.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:targets.db?mode=rwc", global = true)]
    database: String,

    /// Run database migrations first
    #[arg(short, long, default_value_t = false, global = true)]
    migrate: bool,

    /// Run seed files from this directory after migrations
    #[arg(short, long, global = true)]
    seeds: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write every staff member's targets for one financial year to CSV
    Export {
        /// Calendar year the financial year starts in (2024 = FY 2024-25)
        #[arg(short, long)]
        year: i32,

        /// Directory the `targets_<label>.csv` file is written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Replace the targets of every staff member named in a CSV file
    Import {
        /// Calendar year the financial year starts in (2024 = FY 2024-25)
        #[arg(short, long)]
        year: i32,

        /// Path to the CSV file
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::from("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        info!("running migrations");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
    }

    if let Some(seeds_dir) = &args.seeds {
        info!(dir = %seeds_dir.display(), "running seeds");
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
    }

    match args.command {
        Command::Export { year, out_dir } => export(&repo, year, &out_dir).await,
        Command::Import { year, file } => import(&repo, year, &file).await,
    }
}

async fn export(
    repo: &SqliteRepository,
    year: i32,
    out_dir: &Path,
) -> Result<()> {
    let fy = FinancialYear::starting(year);
    let staff = repo.list_staff().await.context("Failed to list staff")?;
    let services = repo
        .list_services()
        .await
        .context("Failed to list services")?;

    let loaded = PersistenceSync::load(repo, &fy, &staff, &services)
        .await
        .with_context(|| format!("Failed to load targets for {fy}"))?;

    let path = CsvExporter::export_to_dir(out_dir, &fy, &staff, &services, &loaded.grid)
        .with_context(|| format!("Failed to export into: {}", out_dir.display()))?;

    info!(path = %path.display(), "export complete");
    Ok(())
}

async fn import(
    repo: &SqliteRepository,
    year: i32,
    file: &Path,
) -> Result<()> {
    let fy = FinancialYear::starting(year);

    let reader =
        File::open(file).with_context(|| format!("Failed to open: {}", file.display()))?;
    let rows = CsvImporter::parse(reader)
        .with_context(|| format!("Failed to parse CSV: {}", file.display()))?;
    info!(rows = rows.len(), "parsed CSV");

    let records = CsvImporter::to_records(&rows, &fy)?;
    let inserted = CsvImporter::load(repo, &fy, &records)
        .await
        .context("Failed to load targets into database")?;

    info!(inserted, %fy, "import complete");
    Ok(())
}
