use chrono::{DateTime, Datelike};
use thiserror::Error;

use crate::config::ClockConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("timestamp year {year} outside plausible window {min_year}..={max_year}")]
    Range {
        year: i32,
        min_year: i32,
        max_year: i32,
    },
    #[error("timestamp differs {delta_seconds}s from extrapolated time (max {max_drift_seconds}s)")]
    Drift {
        delta_seconds: i64,
        max_drift_seconds: i64,
    },
}

/// The last reading the validator accepted, pinned to the device uptime at
/// which it was taken so later candidates can be checked against
/// `timestamp + elapsed uptime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAnchor {
    pub timestamp: i64,
    pub uptime_seconds: u64,
}

impl TimeAnchor {
    pub fn extrapolate(&self, uptime_seconds: u64) -> i64 {
        self.timestamp
            .saturating_add(uptime_seconds.saturating_sub(self.uptime_seconds) as i64)
    }
}

/// Judge a candidate timestamp. Pure; callers own all state mutation.
///
/// The range check runs first: a timestamp outside the plausible calendar
/// window is rejected regardless of how well it agrees with the anchor.
pub fn validate(
    candidate: i64,
    anchor: Option<TimeAnchor>,
    uptime_seconds: u64,
    config: &ClockConfig,
) -> Result<(), ClockError> {
    let year = DateTime::from_timestamp(candidate, 0)
        .map(|dt| dt.year())
        .unwrap_or(0);
    if year < config.min_year || year > config.max_year {
        return Err(ClockError::Range {
            year,
            min_year: config.min_year,
            max_year: config.max_year,
        });
    }

    if let Some(anchor) = anchor {
        let delta_seconds = (candidate - anchor.extrapolate(uptime_seconds)).abs();
        if delta_seconds > config.max_drift_seconds {
            return Err(ClockError::Drift {
                delta_seconds,
                max_drift_seconds: config.max_drift_seconds,
            });
        }
    }

    Ok(())
}

/// Tracks time trustworthiness across the controller's lifetime.
///
/// Fresh readings are judged by [`validate`]; a `Valid` verdict becomes the
/// new anchor. Absence of a reading never degrades the verdict on its own,
/// even past the resync interval: only a positive rejection flips validity
/// to false. The anchor deliberately starts empty each boot, since the
/// uptime elapsed across a power cut is unknowable.
#[derive(Debug, Clone)]
pub struct ClockMonitor {
    config: ClockConfig,
    anchor: Option<TimeAnchor>,
    valid: bool,
    last_reading_uptime: Option<u64>,
    last_error: Option<ClockError>,
}

impl ClockMonitor {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            anchor: None,
            valid: false,
            last_reading_uptime: None,
            last_error: None,
        }
    }

    /// Feed the tick's time reading, if any. Returns the current validity.
    pub fn observe(&mut self, candidate: Option<i64>, uptime_seconds: u64) -> bool {
        let Some(candidate) = candidate else {
            return self.valid;
        };

        self.last_reading_uptime = Some(uptime_seconds);
        match validate(candidate, self.anchor, uptime_seconds, &self.config) {
            Ok(()) => {
                self.anchor = Some(TimeAnchor {
                    timestamp: candidate,
                    uptime_seconds,
                });
                self.valid = true;
                self.last_error = None;
            }
            Err(err) => {
                self.valid = false;
                self.last_error = Some(err);
            }
        }
        self.valid
    }

    /// Whether the time source should be asked for a fresh reading.
    pub fn resync_due(&self, uptime_seconds: u64) -> bool {
        match self.last_reading_uptime {
            None => true,
            Some(at) => uptime_seconds.saturating_sub(at) >= self.config.resync_interval_seconds,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn last_known_time(&self) -> Option<i64> {
        self.anchor.map(|anchor| anchor.timestamp)
    }

    pub fn last_error(&self) -> Option<ClockError> {
        self.last_error
    }

    /// Current wall time extrapolated from the anchor, when trustworthy.
    pub fn current_time(&self, uptime_seconds: u64) -> Option<i64> {
        if !self.valid {
            return None;
        }
        self.anchor.map(|anchor| anchor.extrapolate(uptime_seconds))
    }
}
