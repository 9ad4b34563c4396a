use serde::{Deserialize, Serialize};

/// One persisted target row: the value for a single staff member, service
/// and calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRecord {
    pub staff_id: i64,
    pub service_id: i64,
    pub month: u32,
    pub year: i32,
    pub target_value: u32,
}
