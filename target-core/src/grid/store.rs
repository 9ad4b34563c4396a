use tracing::{debug, warn};

use super::edit_buffer::{CellKey, EditBuffer};
use super::target_grid::TargetGrid;

/// Result of committing a cell's raw text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The grid now holds `value`, which differs from `previous`.
    Changed { previous: u32, value: u32 },
    /// The text parsed to the value already committed.
    Unchanged,
    /// The text was not a non-negative integer, or the cell does not
    /// exist. The grid is untouched.
    Rejected,
}

impl CommitOutcome {
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }
}

/// Parse cell input as a non-negative base-10 integer. Blank input is 0.
pub fn parse_target(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0);
    }
    trimmed.parse().ok()
}

/// The committed grid plus the edit buffer of uncommitted cell text.
#[derive(Debug, Clone, Default)]
pub struct TargetGridStore {
    grid: TargetGrid,
    buffer: EditBuffer,
}

impl TargetGridStore {
    pub fn new(grid: TargetGrid) -> Self {
        Self {
            grid,
            buffer: EditBuffer::new(),
        }
    }

    pub fn grid(&self) -> &TargetGrid {
        &self.grid
    }

    pub fn buffer(&self) -> &EditBuffer {
        &self.buffer
    }

    /// Swap in a freshly loaded grid, discarding any uncommitted text.
    pub fn replace(
        &mut self,
        grid: TargetGrid,
    ) {
        self.grid = grid;
        self.buffer.clear();
    }

    /// Drop everything; used when a load fails.
    pub fn clear(&mut self) {
        self.replace(TargetGrid::default());
    }

    /// Text a cell should display: buffered input when present, otherwise
    /// the committed value. `None` for cells outside the grid.
    pub fn read_cell(
        &self,
        key: &CellKey,
    ) -> Option<String> {
        if let Some(raw) = self.buffer.get(key) {
            return Some(raw.to_string());
        }
        self.grid
            .value(key.staff_id, key.month, &key.service_name)
            .map(|v| v.to_string())
    }

    pub fn stage_edit(
        &mut self,
        key: CellKey,
        raw: impl Into<String>,
    ) {
        self.buffer.stage(key, raw);
    }

    /// Move `raw` into the grid if it parses, and always clear the
    /// buffer entry for `key`.
    pub fn commit_edit(
        &mut self,
        key: &CellKey,
        raw: &str,
    ) -> CommitOutcome {
        self.buffer.remove(key);

        let Some(value) = parse_target(raw) else {
            debug!(?key, raw, "rejected cell input");
            return CommitOutcome::Rejected;
        };

        match self.grid.set(key.staff_id, key.month, &key.service_name, value) {
            Some(previous) if previous == value => CommitOutcome::Unchanged,
            Some(previous) => CommitOutcome::Changed { previous, value },
            None => {
                warn!(?key, "commit to a cell outside the grid");
                CommitOutcome::Rejected
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{Service, StaffMember};

    fn store() -> TargetGridStore {
        let staff = [StaffMember {
            staff_id: 1,
            name: "Ada".to_string(),
        }];
        let services = [Service {
            service_id: 10,
            service_name: "A".to_string(),
        }];
        let mut grid = TargetGrid::blank(&staff, &services);
        grid.set(1, 5, "A", 4);
        TargetGridStore::new(grid)
    }

    fn key() -> CellKey {
        CellKey::new(1, 5, "A")
    }

    #[test]
    fn parse_target_accepts_blank_and_digits_only() {
        assert_eq!(parse_target(""), Some(0));
        assert_eq!(parse_target("   "), Some(0));
        assert_eq!(parse_target(" 42 "), Some(42));
        assert_eq!(parse_target("-1"), None);
        assert_eq!(parse_target("abc"), None);
        assert_eq!(parse_target("1.5"), None);
        assert_eq!(parse_target("99999999999"), None);
    }

    #[test]
    fn read_cell_prefers_buffered_text() {
        let mut store = store();
        assert_eq!(store.read_cell(&key()), Some("4".to_string()));

        store.stage_edit(key(), "");
        assert_eq!(store.read_cell(&key()), Some(String::new()));

        store.stage_edit(key(), "1x");
        assert_eq!(store.read_cell(&key()), Some("1x".to_string()));
    }

    #[test]
    fn read_cell_outside_grid_is_none() {
        assert_eq!(store().read_cell(&CellKey::new(2, 5, "A")), None);
    }

    #[test]
    fn commit_writes_value_and_clears_buffer() {
        let mut store = store();
        store.stage_edit(key(), "12");

        let outcome = store.commit_edit(&key(), "12");

        assert_eq!(outcome, CommitOutcome::Changed { previous: 4, value: 12 });
        assert_eq!(store.grid().value(1, 5, "A"), Some(12));
        assert!(store.buffer().is_empty());
    }

    #[test]
    fn commit_negative_or_text_keeps_previous_value() {
        for raw in ["-1", "abc"] {
            let mut store = store();
            store.stage_edit(key(), raw);

            assert_eq!(store.commit_edit(&key(), raw), CommitOutcome::Rejected);
            assert_eq!(store.grid().value(1, 5, "A"), Some(4));
            assert!(store.buffer().get(&key()).is_none(), "buffer kept {raw:?}");
            assert_eq!(store.read_cell(&key()), Some("4".to_string()));
        }
    }

    #[test]
    fn commit_blank_commits_zero() {
        let mut store = store();
        store.stage_edit(key(), "");

        assert_eq!(
            store.commit_edit(&key(), ""),
            CommitOutcome::Changed { previous: 4, value: 0 }
        );
        assert_eq!(store.grid().value(1, 5, "A"), Some(0));
    }

    #[test]
    fn commit_same_value_is_unchanged() {
        let mut store = store();
        assert_eq!(store.commit_edit(&key(), "4"), CommitOutcome::Unchanged);
        assert!(!store.commit_edit(&key(), "04").is_change());
    }

    #[test]
    fn commit_outside_grid_is_rejected() {
        let mut store = store();
        let stray = CellKey::new(1, 5, "Z");
        store.stage_edit(stray.clone(), "3");

        assert_eq!(store.commit_edit(&stray, "3"), CommitOutcome::Rejected);
        assert!(store.buffer().is_empty());
    }

    #[test]
    fn replace_discards_pending_text() {
        let mut store = store();
        store.stage_edit(key(), "7");

        store.replace(TargetGrid::default());

        assert!(store.buffer().is_empty());
        assert!(store.grid().is_empty());
    }
}
