//! Plain-text rendering of one staff member's targets.

use comfy_table::{Cell, CellAlignment, Table};
use target_core::calendar::months_in_order;

use crate::editor::GridEditor;

fn number(value: u64) -> Cell {
    Cell::new(value).set_alignment(CellAlignment::Right)
}

/// Services down the side, April to March across, with a total column and
/// a total row. `None` when the staff member is not in the grid.
pub fn render_staff_grid(
    editor: &GridEditor,
    staff_id: i64,
) -> Option<String> {
    let grid = editor.grid();
    if !grid.contains_staff(staff_id) {
        return None;
    }
    let member = editor.staff().iter().find(|m| m.staff_id == staff_id)?;
    let months = months_in_order();

    let mut table = Table::new();
    let mut header = vec![Cell::new("Service")];
    header.extend(months.iter().map(|(_, name)| Cell::new(name)));
    header.push(Cell::new("Total"));
    table.set_header(header);

    for service in editor.services() {
        let name = &service.service_name;
        let mut row = vec![Cell::new(name)];
        row.extend(months.iter().map(|(month, _)| {
            number(u64::from(grid.value(staff_id, *month, name).unwrap_or(0)))
        }));
        row.push(number(grid.annual_total(staff_id, name)));
        table.add_row(row);
    }

    let mut totals = vec![Cell::new("Total")];
    totals.extend(
        months
            .iter()
            .map(|(month, _)| number(grid.monthly_total(staff_id, *month))),
    );
    totals.push(number(grid.staff_annual_total(staff_id)));
    table.add_row(totals);

    Some(format!(
        "{} ({})\n{table}\n",
        member.name,
        editor.financial_year()
    ))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use target_core::grid::{CellKey, TargetGrid};
    use target_core::{FinancialYear, Service, StaffMember};

    use super::*;
    use crate::editor::EditorContext;

    fn context() -> EditorContext {
        EditorContext {
            financial_year: FinancialYear::starting(2024),
            staff: vec![StaffMember {
                staff_id: 7,
                name: "Dana".to_string(),
            }],
            services: vec![
                Service {
                    service_id: 1,
                    service_name: "Calls".to_string(),
                },
                Service {
                    service_id: 2,
                    service_name: "Visits".to_string(),
                },
            ],
        }
    }

    /// Non-empty cell texts of one rendered table line.
    fn cells(line: &str) -> Vec<&str> {
        line.split(['|', '│'])
            .map(str::trim)
            .filter(|cell| !cell.is_empty())
            .collect()
    }

    fn row_named<'a>(
        text: &'a str,
        label: &str,
    ) -> Vec<&'a str> {
        text.lines()
            .map(cells)
            .find(|row| row.first() == Some(&label))
            .unwrap_or_else(|| panic!("no row labelled {label} in:\n{text}"))
    }

    #[test]
    fn unloaded_staff_renders_nothing() {
        assert_eq!(render_staff_grid(&GridEditor::new(context()), 7), None);
    }

    #[test]
    fn unknown_staff_renders_nothing() {
        let context = context();
        let grid = TargetGrid::blank(&context.staff, &context.services);
        let editor = GridEditor::with_grid(context, grid);

        assert_eq!(render_staff_grid(&editor, 8), None);
    }

    #[test]
    fn renders_rows_and_totals() {
        let context = context();
        let grid = TargetGrid::blank(&context.staff, &context.services);
        let mut editor = GridEditor::with_grid(context, grid);
        editor.commit_edit(&CellKey::new(7, 4, "Calls"), "3");
        editor.commit_edit(&CellKey::new(7, 4, "Visits"), "5");
        editor.commit_edit(&CellKey::new(7, 3, "Visits"), "2");

        let text = render_staff_grid(&editor, 7).unwrap();

        assert_eq!(text.lines().next(), Some("Dana (FY 2024-25)"));

        let header = row_named(&text, "Service");
        assert_eq!(header.len(), 14);
        assert_eq!(header[1], "April");
        assert_eq!(header[12], "March");
        assert_eq!(header[13], "Total");

        let calls = row_named(&text, "Calls");
        assert_eq!((calls[1], calls[2], calls[13]), ("3", "0", "3"));

        let visits = row_named(&text, "Visits");
        assert_eq!((visits[1], visits[12], visits[13]), ("5", "2", "7"));

        let totals = row_named(&text, "Total");
        assert_eq!((totals[1], totals[12], totals[13]), ("8", "2", "10"));
    }
}
