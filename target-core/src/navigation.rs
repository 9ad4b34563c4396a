//! Spreadsheet-style movement through the (staff, service, month) grid.
//!
//! Moving forward advances the month first, then the service, then the
//! staff member, wrapping at every boundary like an odometer. Moving
//! backward is the exact mirror, so forward then backward is always the
//! identity.

use crate::calendar::FY_MONTHS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A cell by position: staff and service index in directory order, month
/// index in financial-year order (April = 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellAddress {
    pub staff: usize,
    pub service: usize,
    pub month: usize,
}

impl CellAddress {
    pub fn new(
        staff: usize,
        service: usize,
        month: usize,
    ) -> Self {
        Self {
            staff,
            service,
            month,
        }
    }

    /// Calendar month number of this address.
    pub fn calendar_month(&self) -> Option<u32> {
        FY_MONTHS.get(self.month).copied()
    }
}

/// Extent of each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub staff: usize,
    pub services: usize,
    pub months: usize,
}

impl GridShape {
    pub fn new(
        staff: usize,
        services: usize,
    ) -> Self {
        Self {
            staff,
            services,
            months: FY_MONTHS.len(),
        }
    }

    pub fn contains(
        &self,
        address: CellAddress,
    ) -> bool {
        address.staff < self.staff && address.service < self.services && address.month < self.months
    }

    pub fn first(&self) -> Option<CellAddress> {
        (!self.is_empty()).then(CellAddress::default)
    }

    pub fn last(&self) -> Option<CellAddress> {
        (!self.is_empty()).then(|| CellAddress::new(self.staff - 1, self.services - 1, self.months - 1))
    }

    pub fn is_empty(&self) -> bool {
        self.staff == 0 || self.services == 0 || self.months == 0
    }
}

/// The cell reached by one step from `from`. `None` when `from` lies
/// outside `shape` or the shape has an empty axis.
pub fn step(
    from: CellAddress,
    direction: Direction,
    shape: GridShape,
) -> Option<CellAddress> {
    if shape.is_empty() || !shape.contains(from) {
        return None;
    }

    let mut next = from;
    match direction {
        Direction::Forward => {
            next.month += 1;
            if next.month == shape.months {
                next.month = 0;
                next.service += 1;
                if next.service == shape.services {
                    next.service = 0;
                    next.staff = (next.staff + 1) % shape.staff;
                }
            }
        }
        Direction::Backward => {
            if next.month > 0 {
                next.month -= 1;
            } else {
                next.month = shape.months - 1;
                if next.service > 0 {
                    next.service -= 1;
                } else {
                    next.service = shape.services - 1;
                    next.staff = next.staff.checked_sub(1).unwrap_or(shape.staff - 1);
                }
            }
        }
    }
    Some(next)
}
