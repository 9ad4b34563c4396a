//! The committed target grid and the uncommitted edit buffer laid over it.

mod edit_buffer;
mod store;
mod target_grid;

pub use edit_buffer::{CellKey, EditBuffer};
pub use store::{CommitOutcome, TargetGridStore, parse_target};
pub use target_grid::{Rejection, RejectionReason, TargetGrid};
