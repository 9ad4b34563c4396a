//! Mapping between financial-year months and calendar years.
//!
//! A financial year runs April to March. Months 4–12 fall in the year the
//! financial year starts; months 1–3 fall in the following calendar year.
//! The April-first ordering returned by [`months_in_order`] drives both
//! the grid's column order and the navigation order.

use chrono::{Datelike, Month, NaiveDate};

use crate::models::FinancialYear;

/// Calendar month numbers in financial-year order, April first.
pub const FY_MONTHS: [u32; 12] = [4, 5, 6, 7, 8, 9, 10, 11, 12, 1, 2, 3];

/// First month (April) of a financial year.
const FY_FIRST_MONTH: u32 = 4;

/// Calendar year that `month` (1–12) falls in within `fy`.
///
/// # Examples
///
/// ```
/// use target_core::calendar::month_to_year;
/// use target_core::FinancialYear;
///
/// let fy = FinancialYear::starting(2024);
/// assert_eq!(month_to_year(11, &fy), 2024);
/// assert_eq!(month_to_year(2, &fy), 2025);
/// ```
pub fn month_to_year(
    month: u32,
    fy: &FinancialYear,
) -> i32 {
    if month >= FY_FIRST_MONTH {
        fy.start()
    } else {
        fy.end()
    }
}

/// The twelve `(month, name)` pairs in financial-year order.
pub fn months_in_order() -> [(u32, &'static str); 12] {
    FY_MONTHS.map(|month| (month, month_name(month).unwrap_or_default()))
}

/// English month name for a calendar month number.
pub fn month_name(month: u32) -> Option<&'static str> {
    let month = u8::try_from(month).ok()?;
    Month::try_from(month).ok().map(|m| m.name())
}

/// Position of `month` in financial-year order (April = 0, March = 11).
pub fn month_index(month: u32) -> Option<usize> {
    FY_MONTHS.iter().position(|&m| m == month)
}

/// The financial year that contains `today`.
pub fn financial_year_containing(today: NaiveDate) -> FinancialYear {
    if today.month() >= FY_FIRST_MONTH {
        FinancialYear::starting(today.year())
    } else {
        FinancialYear::starting(today.year() - 1)
    }
}

/// Whether a persisted `(month, year)` pair belongs to `fy`.
pub fn is_target_in_financial_year(
    month: u32,
    year: i32,
    fy: &FinancialYear,
) -> bool {
    match month {
        4..=12 => year == fy.start(),
        1..=3 => year == fy.end(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fy_2024() -> FinancialYear {
        FinancialYear::starting(2024)
    }

    #[test]
    fn january_to_march_map_to_end_year() {
        for month in 1..=3 {
            assert_eq!(month_to_year(month, &fy_2024()), 2025, "month {month}");
        }
    }

    #[test]
    fn april_to_december_map_to_start_year() {
        for month in 4..=12 {
            assert_eq!(month_to_year(month, &fy_2024()), 2024, "month {month}");
        }
    }

    #[test]
    fn months_in_order_starts_april_ends_march() {
        let months = months_in_order();

        assert_eq!(months.len(), 12);
        assert_eq!(months[0], (4, "April"));
        assert_eq!(months[11], (3, "March"));
    }

    #[test]
    fn months_in_order_contains_each_month_once() {
        let mut numbers: Vec<u32> = months_in_order().iter().map(|(m, _)| *m).collect();
        numbers.sort_unstable();

        assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn month_name_rejects_out_of_range() {
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
        assert_eq!(month_name(9), Some("September"));
    }

    #[test]
    fn month_index_follows_financial_order() {
        assert_eq!(month_index(4), Some(0));
        assert_eq!(month_index(12), Some(8));
        assert_eq!(month_index(1), Some(9));
        assert_eq!(month_index(3), Some(11));
        assert_eq!(month_index(13), None);
    }

    #[test]
    fn financial_year_containing_april_onwards_starts_this_year() {
        let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        assert_eq!(financial_year_containing(today), FinancialYear::starting(2024));

        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(financial_year_containing(today), FinancialYear::starting(2024));
    }

    #[test]
    fn financial_year_containing_first_quarter_starts_last_year() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        assert_eq!(financial_year_containing(today), FinancialYear::starting(2024));

        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(financial_year_containing(today), FinancialYear::starting(2024));
    }

    #[test]
    fn target_membership_checks_month_year_split() {
        let fy = fy_2024();

        assert!(is_target_in_financial_year(11, 2024, &fy));
        assert!(is_target_in_financial_year(2, 2025, &fy));
        assert!(!is_target_in_financial_year(2, 2024, &fy));
        assert!(!is_target_in_financial_year(11, 2025, &fy));
        assert!(!is_target_in_financial_year(0, 2024, &fy));
        assert!(!is_target_in_financial_year(13, 2025, &fy));
    }
}
