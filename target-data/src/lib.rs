pub mod export;
pub mod import;

pub use export::{CSV_HEADER, CsvExporter, ExportError, ExportRow};
pub use import::{CsvImporter, ImportError};
