use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::CycleMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{phase} phase duration must be non-zero")]
    ZeroPhaseDuration { phase: &'static str },
    #[error("night window boundary {minutes} exceeds 1439 minutes")]
    NightWindowOutOfRange { minutes: u16 },
    #[error("tick interval must be non-zero")]
    ZeroTickInterval,
}

/// Duty-cycle parameters for one operating mode. The night window is
/// expressed in local minutes-of-day and may wrap past midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    pub duration_on_seconds: u32,
    pub duration_off_seconds: u32,
    pub night_rest_enabled: bool,
    pub night_start_minutes: u16,
    pub night_end_minutes: u16,
}

impl CycleConfig {
    pub fn for_mode(mode: CycleMode) -> Self {
        match mode {
            // 12 min ON / 18 min OFF, compressor rest 01:30-07:00.
            CycleMode::Normal => Self {
                duration_on_seconds: 720,
                duration_off_seconds: 1080,
                night_rest_enabled: true,
                night_start_minutes: 90,
                night_end_minutes: 420,
            },
            // "Ice" mode: 10 min ON / 10 min OFF around the clock.
            CycleMode::Continuous => Self {
                duration_on_seconds: 600,
                duration_off_seconds: 600,
                night_rest_enabled: false,
                night_start_minutes: 0,
                night_end_minutes: 0,
            },
        }
    }

    /// A zero duration would starve one phase forever, so it is rejected
    /// here rather than handled at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.duration_on_seconds == 0 {
            return Err(ConfigError::ZeroPhaseDuration { phase: "on" });
        }
        if self.duration_off_seconds == 0 {
            return Err(ConfigError::ZeroPhaseDuration { phase: "off" });
        }
        for minutes in [self.night_start_minutes, self.night_end_minutes] {
            if minutes >= 24 * 60 {
                return Err(ConfigError::NightWindowOutOfRange { minutes });
            }
        }
        Ok(())
    }

    pub fn phase_duration_seconds(&self, relay_on: bool) -> u32 {
        if relay_on {
            self.duration_on_seconds
        } else {
            self.duration_off_seconds
        }
    }

    pub fn in_night_window(&self, minute_of_day: u16) -> bool {
        if !self.night_rest_enabled {
            return false;
        }
        if self.night_start_minutes <= self.night_end_minutes {
            (self.night_start_minutes..self.night_end_minutes).contains(&minute_of_day)
        } else {
            minute_of_day >= self.night_start_minutes || minute_of_day < self.night_end_minutes
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::for_mode(CycleMode::Normal)
    }
}

/// Bounds for deciding whether an externally supplied timestamp is usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockConfig {
    pub min_year: i32,
    pub max_year: i32,
    pub max_drift_seconds: i64,
    pub resync_interval_seconds: u64,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            min_year: 2020,
            max_year: 2030,
            max_drift_seconds: 300,
            resync_interval_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareConfig {
    pub relay_pin: u8,
    pub led_pin: u8,
    /// The relay is normally-closed: energizing the coil cuts power to the
    /// load. The driver inverts accordingly; everything above it speaks in
    /// terms of the load's desired power state.
    pub relay_normally_closed: bool,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            relay_pin: 5,
            led_pin: 2,
            relay_normally_closed: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub mode: CycleMode,
    pub cycle: CycleConfig,
    pub clock: ClockConfig,
    pub long_outage_threshold_seconds: i64,
    pub checkpoint_interval_seconds: u64,
    pub tick_interval_seconds: u64,
    pub timezone: String,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

impl RuntimeConfig {
    pub fn for_mode(mode: CycleMode) -> Self {
        Self {
            mode,
            cycle: CycleConfig::for_mode(mode),
            clock: ClockConfig::default(),
            long_outage_threshold_seconds: 7_200,
            checkpoint_interval_seconds: 600,
            tick_interval_seconds: 1,
            timezone: "America/Argentina/Cordoba".to_string(),
            hardware: HardwareConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cycle.validate()?;
        if self.tick_interval_seconds == 0 {
            return Err(ConfigError::ZeroTickInterval);
        }
        Ok(())
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::for_mode(CycleMode::Normal)
    }
}
