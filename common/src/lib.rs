pub mod clock;
pub mod config;
pub mod cycle;
pub mod recovery;
pub mod state;
pub mod types;

pub use clock::{validate, ClockError, ClockMonitor, TimeAnchor};
pub use config::{ClockConfig, ConfigError, CycleConfig, HardwareConfig, RuntimeConfig};
pub use cycle::{CycleEngine, TickOutcome};
pub use recovery::{recover, InitialState};
pub use state::{PersistedState, SCHEMA_VERSION};
pub use types::{CycleMode, LedDirective};
