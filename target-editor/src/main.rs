use std::path::PathBuf;

use anyhow::{Context, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};

use target_core::calendar::financial_year_containing;
use target_core::grid::CommitOutcome;
use target_core::models::FinancialYear;
use target_data::CsvExporter;
use target_editor::settings::{DEFAULT_SETTINGS_FILE, Settings};
use target_editor::{app, logging, report};

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Monthly service targets for each staff member, by financial year.
///
/// Settings come from a TOML file; any flag given here overrides it.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Settings file.
    #[arg(long, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,

    /// Database backend to use.
    #[arg(long)]
    backend: Option<String>,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `targets.db`) or `:memory:`.
    #[arg(long)]
    db: Option<String>,

    /// Log level or filter directive; overrides `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,

    /// Financial year by starting calendar year (2024 = FY 2024-25).
    /// Defaults to the financial year containing today.
    #[arg(long, global = true)]
    year: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print one staff member's grid with totals.
    Show {
        #[arg(long)]
        staff: i64,
    },
    /// Set one cell and save.
    Set {
        #[arg(long)]
        staff: i64,
        #[arg(long)]
        service: String,
        /// Calendar month number, 1–12.
        #[arg(long)]
        month: u32,
        /// New target; blank means 0.
        value: String,
    },
    /// Write `targets_<label>.csv`.
    Export {
        /// Output directory; defaults to `export_dir` from settings.
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

// ─── entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to read settings: {}", cli.config.display()))?;
    if let Some(backend) = cli.backend {
        settings.database.backend = backend;
    }
    if let Some(db) = cli.db {
        settings.database.connection_string = db;
    }

    // RUST_LOG beats the settings file; --log-level beats both.
    logging::init_logging(&settings.log_level)?;
    if let Some(level) = &cli.log_level {
        logging::set_log_level(level)?;
    }
    logging::set_log_file(settings.log_file.as_deref())?;

    let fy = cli
        .year
        .map(FinancialYear::starting)
        .unwrap_or_else(|| financial_year_containing(Local::now().date_naive()));

    debug!("connecting to {} backend", settings.database.backend);
    let registry = app::build_registry();
    let repo = registry.create(&settings.database).await?;

    let mut editor = app::open_editor(&*repo, fy).await?;

    match cli.command {
        Command::Show { staff } => match report::render_staff_grid(&editor, staff) {
            Some(text) => print!("{text}"),
            None => bail!("no staff member with id {staff}"),
        },
        Command::Set {
            staff,
            service,
            month,
            value,
        } => {
            let address = editor.address_of(staff, &service, month)?;
            let key = editor
                .key_at(address)
                .with_context(|| format!("no cell at {address:?}"))?;
            editor.stage_edit(key.clone(), value);

            match editor.commit_pending(&key) {
                Some(CommitOutcome::Changed { previous, value }) => {
                    editor.save(&*repo).await?;
                    info!(staff, %service, month, previous, value, "target updated");
                }
                Some(CommitOutcome::Unchanged) => info!("target already has that value"),
                Some(CommitOutcome::Rejected) | None => {
                    warn!("targets must be whole numbers of zero or more");
                    bail!("invalid target value");
                }
            }
        }
        Command::Export { out_dir } => {
            let dir = out_dir.unwrap_or(settings.export_dir);
            let path = CsvExporter::export_to_dir(
                &dir,
                editor.financial_year(),
                editor.staff(),
                editor.services(),
                editor.grid(),
            )?;
            info!("wrote {}", path.display());
        }
    }

    Ok(())
}
