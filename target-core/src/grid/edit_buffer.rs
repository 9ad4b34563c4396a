use std::collections::HashMap;

/// Address of one cell by identity rather than by grid position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub staff_id: i64,
    pub month: u32,
    pub service_name: String,
}

impl CellKey {
    pub fn new(
        staff_id: i64,
        month: u32,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            staff_id,
            month,
            service_name: service_name.into(),
        }
    }
}

/// Raw text typed into cells that has not been committed yet.
///
/// While a cell has an entry here, the entry is what the cell displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    entries: HashMap<CellKey, String>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(
        &mut self,
        key: CellKey,
        raw: impl Into<String>,
    ) {
        self.entries.insert(key, raw.into());
    }

    pub fn get(
        &self,
        key: &CellKey,
    ) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn remove(
        &mut self,
        key: &CellKey,
    ) -> Option<String> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
