use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// The durable record, one per device. Fully overwritten on every
/// checkpoint; a record that fails to parse or carries a different schema
/// version is treated as absent, never as a crash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    /// Epoch seconds of the last reading the clock validator accepted.
    pub last_known_time: Option<i64>,
    /// Epoch seconds when this record was written. None before the first
    /// checkpoint, and whenever wall time was untrusted at write time.
    pub last_checkpoint_time: Option<i64>,
    /// Desired power state of the cooling load (not the relay coil).
    pub relay_on: bool,
    pub cycle_elapsed_seconds: u64,
    pub total_runtime_seconds: u64,
    pub boot_count: u32,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_known_time: None,
            last_checkpoint_time: None,
            relay_on: true,
            cycle_elapsed_seconds: 0,
            total_runtime_seconds: 0,
            boot_count: 0,
        }
    }
}

impl PersistedState {
    pub fn is_current_schema(&self) -> bool {
        self.version == SCHEMA_VERSION
    }

    pub fn add_runtime(&mut self, seconds: u64) {
        self.total_runtime_seconds = self.total_runtime_seconds.saturating_add(seconds);
    }
}
