// ── Account snapshot ──
//
// One fetched account state. Transient: built per poll, consumed once by
// the reconciler, then dropped.

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub tags: Vec<TagRecord>,
    pub phones: Vec<PhoneRecord>,
}

impl Snapshot {
    pub fn new(tags: Vec<TagRecord>, phones: Vec<PhoneRecord>) -> Self {
        Self { tags, phones }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    /// Tag MAC, the external id the host registered it under.
    pub id: String,
    pub name: Option<String>,
    pub connected: bool,
    pub battery_low: bool,
    pub battery_empty: bool,
}

impl TagRecord {
    pub fn disconnected(&self) -> bool {
        !self.connected
    }

    pub fn battery_alarm(&self) -> bool {
        self.battery_low || self.battery_empty
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneRecord {
    pub id: String,
    pub name: Option<String>,
    pub battery_level: Option<i64>,
}
