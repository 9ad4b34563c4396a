use std::fmt;

use serde::Serialize;

/// A UK-style financial year running from April of `start` to March of
/// `end`.
///
/// Only constructible through [`FinancialYear::starting`], which keeps
/// `end == start + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FinancialYear {
    start: i32,
    end: i32,
    label: String,
}

impl FinancialYear {
    /// The financial year that begins in April of `start`.
    pub fn starting(start: i32) -> Self {
        let end = start + 1;
        Self {
            start,
            end,
            label: format!("{start}-{:02}", end.rem_euclid(100)),
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    /// Short label, e.g. `2024-25`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Both calendar years a target row for this financial year may carry.
    pub fn candidate_years(&self) -> [i32; 2] {
        [self.start, self.end]
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "FY {}", self.label)
    }
}
