use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use anyhow::{Result, anyhow, bail};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::{FmtContext, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, reload};

// --- Formatter ---

/// `HH:MM:SS.mmm LEVEL target: fields`, local time.
struct EditorFmt;

impl<S, N> FormatEvent<S, N> for EditorFmt
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();
        let stamp = Local::now().format("%H:%M:%S%.3f");

        if ansi {
            let colour = match *meta.level() {
                Level::ERROR => "31",
                Level::WARN => "33",
                Level::INFO => "32",
                Level::DEBUG => "34",
                Level::TRACE => "35",
            };
            write!(
                writer,
                "\x1b[2m{stamp}\x1b[0m \x1b[1;{colour}m{:>5}\x1b[0m \x1b[36m{}\x1b[0m: ",
                meta.level(),
                meta.target()
            )?;
        } else {
            write!(writer, "{stamp} {:>5} {}: ", meta.level(), meta.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

// --- Log file that can be attached after start-up ---

type SharedFile = Arc<Mutex<Option<File>>>;

#[derive(Clone)]
struct LateFile(SharedFile);

struct LateFileWriter<'a>(MutexGuard<'a, Option<File>>);

impl Write for LateFileWriter<'_> {
    fn write(
        &mut self,
        buf: &[u8],
    ) -> io::Result<usize> {
        match self.0.as_mut() {
            Some(file) => file.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LateFile {
    type Writer = LateFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LateFileWriter(lock(&self.0))
    }
}

fn lock(slot: &Mutex<Option<File>>) -> MutexGuard<'_, Option<File>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

// --- Handles kept after init ---

type ReloadFn = Box<dyn Fn(EnvFilter) -> Result<()> + Send + Sync>;

static RELOAD_FILTER: OnceLock<ReloadFn> = OnceLock::new();
static LOG_FILE: OnceLock<SharedFile> = OnceLock::new();

fn parse_filter(directive: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| anyhow!("invalid log level '{directive}': {e}"))
}

/// Install the global subscriber. `RUST_LOG` wins over `default_level`
/// when set.
///
/// Output goes to stdout, coloured when stdout is a terminal, and to the
/// log file once one is attached with [`set_log_file`]. Calling this
/// more than once is harmless; later calls do nothing.
pub fn init_logging(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(default_level)?,
    };
    let (filter_layer, filter_handle) = reload::Layer::new(filter);

    let file: SharedFile = Arc::new(Mutex::new(None));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .event_format(EditorFmt)
        .with_ansi(io::stdout().is_terminal());
    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(EditorFmt)
        .with_ansi(false)
        .with_writer(LateFile(file.clone()));

    if tracing_subscriber::registry()
        .with(filter_layer)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok()
    {
        let _ = LOG_FILE.set(file);
        let _ = RELOAD_FILTER.set(Box::new(move |filter| {
            filter_handle
                .reload(filter)
                .map_err(|e| anyhow!("filter reload failed: {e}"))
        }));
    }
    Ok(())
}

/// Swap the active filter, overriding `RUST_LOG`. Accepts a bare level or
/// any `EnvFilter` directive.
pub fn set_log_level(level: &str) -> Result<()> {
    let filter = parse_filter(level)?;
    match RELOAD_FILTER.get() {
        Some(reload) => reload(filter),
        None => bail!("logging not yet initialized"),
    }
}

/// Append log output to `path`, replacing any file already attached.
/// `None` detaches the current file. The parent directory must exist.
pub fn set_log_file(path: Option<&Path>) -> Result<()> {
    let file = path
        .map(|path| {
            File::options()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow!("cannot open log file '{}': {e}", path.display()))
        })
        .transpose()?;

    match LOG_FILE.get() {
        Some(slot) => {
            *lock(slot) = file;
            Ok(())
        }
        None => bail!("logging not yet initialized"),
    }
}
