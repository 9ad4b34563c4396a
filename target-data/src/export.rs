//! Flattening a target grid into CSV.
//!
//! ## CSV Format
//!
//! UTF-8, one header row, then one row per (staff, month, service):
//!
//! | Column         | Type    | Notes                                   |
//! |----------------|---------|-----------------------------------------|
//! | `staff_id`     | integer |                                         |
//! | `staff_name`   | string  |                                         |
//! | `service_id`   | integer |                                         |
//! | `service_name` | string  |                                         |
//! | `month`        | integer | 1–12                                    |
//! | `year`         | integer | calendar year the month falls in        |
//! | `target_value` | integer | non-negative                            |
//!
//! Rows run staff in directory order, then months April to March, then
//! services in directory order. `year` is derived exactly as it is when
//! the grid is saved, so an export always agrees with the stored rows.
//!
//! ```csv
//! staff_id,staff_name,service_id,service_name,month,year,target_value
//! 1,Amara Okafor,1,Assessments,4,2024,12
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use target_core::grid::TargetGrid;
use target_core::{FinancialYear, Service, StaffMember};
use thiserror::Error;
use tracing::info;

pub const CSV_HEADER: [&str; 7] = [
    "staff_id",
    "staff_name",
    "service_id",
    "service_name",
    "month",
    "year",
    "target_value",
];

/// One exported line. Field order matches [`CSV_HEADER`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRow {
    pub staff_id: i64,
    pub staff_name: String,
    pub service_id: i64,
    pub service_name: String,
    pub month: u32,
    pub year: i32,
    pub target_value: u32,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error writing '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct CsvExporter;

impl CsvExporter {
    /// `targets_<label>.csv`, e.g. `targets_2024-25.csv`.
    pub fn file_name(fy: &FinancialYear) -> String {
        format!("targets_{}.csv", fy.label())
    }

    /// Flatten `grid`. Staff members missing from the grid are skipped.
    pub fn rows(
        fy: &FinancialYear,
        staff: &[StaffMember],
        services: &[Service],
        grid: &TargetGrid,
    ) -> Vec<ExportRow> {
        let names: HashMap<i64, &str> = services
            .iter()
            .map(|s| (s.service_id, s.service_name.as_str()))
            .collect();

        let mut rows = Vec::new();
        for member in staff {
            let Some(records) = grid.records_for(member.staff_id, fy, services) else {
                continue;
            };
            rows.extend(records.into_iter().map(|record| ExportRow {
                staff_id: member.staff_id,
                staff_name: member.name.clone(),
                service_id: record.service_id,
                service_name: names
                    .get(&record.service_id)
                    .copied()
                    .unwrap_or_default()
                    .to_string(),
                month: record.month,
                year: record.year,
                target_value: record.target_value,
            }));
        }
        rows
    }

    /// Write the header and `rows` to `writer`.
    pub fn write_csv<W: Write>(
        writer: W,
        rows: &[ExportRow],
    ) -> Result<(), ExportError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        csv_writer.write_record(CSV_HEADER)?;
        for row in rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_csv_string(rows: &[ExportRow]) -> Result<String, ExportError> {
        let mut buffer = Vec::new();
        Self::write_csv(&mut buffer, rows)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write `targets_<label>.csv` into `dir` and return its path.
    pub fn export_to_dir(
        dir: &Path,
        fy: &FinancialYear,
        staff: &[StaffMember],
        services: &[Service],
        grid: &TargetGrid,
    ) -> Result<PathBuf, ExportError> {
        let path = dir.join(Self::file_name(fy));
        let file = File::create(&path).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;

        let rows = Self::rows(fy, staff, services, grid);
        Self::write_csv(file, &rows)?;

        info!(path = %path.display(), rows = rows.len(), "exported targets");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn staff() -> Vec<StaffMember> {
        vec![StaffMember {
            staff_id: 1,
            name: "S1".to_string(),
        }]
    }

    fn services() -> Vec<Service> {
        vec![
            Service {
                service_id: 10,
                service_name: "A".to_string(),
            },
            Service {
                service_id: 20,
                service_name: "B, with comma".to_string(),
            },
        ]
    }

    fn grid() -> TargetGrid {
        let mut grid = TargetGrid::blank(&staff(), &services());
        grid.set(1, 2, "A", 10);
        grid.set(1, 11, "A", 7);
        grid
    }

    #[test]
    fn file_name_uses_label() {
        assert_eq!(
            CsvExporter::file_name(&FinancialYear::starting(2024)),
            "targets_2024-25.csv"
        );
    }

    #[test]
    fn one_row_per_staff_month_service() {
        let fy = FinancialYear::starting(2024);
        let rows = CsvExporter::rows(&fy, &staff(), &services(), &grid());

        assert_eq!(rows.len(), 24);
        assert_eq!(rows[0].month, 4);
        assert_eq!(rows[0].service_name, "A");
        assert_eq!(rows[1].month, 4);
        assert_eq!(rows[1].service_name, "B, with comma");
        assert_eq!(rows[23].month, 3);
    }

    #[test]
    fn february_and_november_get_their_own_years() {
        let fy = FinancialYear::starting(2024);
        let rows = CsvExporter::rows(&fy, &staff(), &services(), &grid());

        let feb = rows
            .iter()
            .find(|r| r.month == 2 && r.service_name == "A")
            .unwrap();
        assert_eq!((feb.year, feb.target_value), (2025, 10));

        let nov = rows
            .iter()
            .find(|r| r.month == 11 && r.service_name == "A")
            .unwrap();
        assert_eq!((nov.year, nov.target_value), (2024, 7));
    }

    #[test]
    fn staff_missing_from_grid_is_skipped() {
        let fy = FinancialYear::starting(2024);
        let mut everyone = staff();
        everyone.push(StaffMember {
            staff_id: 2,
            name: "Not loaded".to_string(),
        });

        let rows = CsvExporter::rows(&fy, &everyone, &services(), &grid());

        assert!(rows.iter().all(|r| r.staff_id == 1));
    }

    #[test]
    fn csv_text_has_header_and_quotes_commas() {
        let fy = FinancialYear::starting(2024);
        let rows = CsvExporter::rows(&fy, &staff(), &services(), &grid());

        let text = CsvExporter::to_csv_string(&rows).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("staff_id,staff_name,service_id,service_name,month,year,target_value")
        );
        assert_eq!(lines.next(), Some("1,S1,10,A,4,2024,0"));
        assert_eq!(lines.next(), Some("1,S1,20,\"B, with comma\",4,2024,0"));
    }

    #[test]
    fn empty_grid_still_writes_header() {
        let text = CsvExporter::to_csv_string(&[]).unwrap();
        assert_eq!(text, format!("{}\n", CSV_HEADER.join(",")));
    }
}
