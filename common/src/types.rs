use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CycleMode {
    Normal,
    Continuous,
}

impl CycleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Continuous => "CONTINUOUS",
        }
    }
}

/// Status LED command for one tick. The blink cadence itself (0.5 s period)
/// is owned by the hardware driver, not the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedDirective {
    SteadyOn,
    SteadyOff,
    Blink,
}

impl LedDirective {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SteadyOn => "STEADY_ON",
            Self::SteadyOff => "STEADY_OFF",
            Self::Blink => "BLINK",
        }
    }
}
