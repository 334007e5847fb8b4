use crate::config::CycleConfig;
use crate::recovery::InitialState;
use crate::types::LedDirective;

/// What the controller loop must do after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Desired power state of the load for this tick. During night rest this
    /// is forced false while the underlying phase is preserved.
    pub relay_on: bool,
    pub led: LedDirective,
    /// A phase flip happened this tick; the caller checkpoints immediately.
    pub transitioned: bool,
    pub resting: bool,
}

/// The duty-cycle state machine: `{On, Off}` crossed with a time-validity
/// axis fed in per tick.
///
/// Phase boundaries are driven purely by elapsed ticks. A trustworthy wall
/// clock only adds the night-rest window on top; flipping between
/// time-known and time-unknown operation preserves the phase and its
/// elapsed counter, so a verdict change alone never chatters the relay.
#[derive(Debug, Clone)]
pub struct CycleEngine {
    config: CycleConfig,
    relay_on: bool,
    elapsed_seconds: u64,
    /// One-shot duration for the current phase, used by the conservative
    /// half-duration restart. Cleared on the first flip.
    phase_duration_override: Option<u64>,
}

impl CycleEngine {
    pub fn new(config: CycleConfig) -> Self {
        Self {
            config,
            relay_on: true,
            elapsed_seconds: 0,
            phase_duration_override: None,
        }
    }

    pub fn from_recovery(config: CycleConfig, initial: &InitialState) -> Self {
        Self {
            config,
            relay_on: initial.relay_on,
            elapsed_seconds: initial.cycle_elapsed_seconds,
            phase_duration_override: initial.first_phase_duration,
        }
    }

    pub fn relay_on(&self) -> bool {
        self.relay_on
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    fn active_phase_duration(&self) -> u64 {
        self.phase_duration_override
            .unwrap_or(u64::from(self.config.phase_duration_seconds(self.relay_on)))
    }

    /// Advance one tick. `minute_of_day` is the local time-of-day and is
    /// only consulted when `time_valid` is true.
    pub fn tick(
        &mut self,
        tick_seconds: u64,
        time_valid: bool,
        minute_of_day: Option<u16>,
    ) -> TickOutcome {
        if time_valid {
            if let Some(minute) = minute_of_day {
                if self.config.in_night_window(minute) {
                    // Compressor rest: load stays off, counters freeze so the
                    // cycle resumes from the same position at window exit.
                    return TickOutcome {
                        relay_on: false,
                        led: LedDirective::SteadyOn,
                        transitioned: false,
                        resting: true,
                    };
                }
            }
        }

        self.elapsed_seconds = self.elapsed_seconds.saturating_add(tick_seconds);
        let mut transitioned = false;
        if self.elapsed_seconds >= self.active_phase_duration() {
            self.relay_on = !self.relay_on;
            self.elapsed_seconds = 0;
            self.phase_duration_override = None;
            transitioned = true;
        }

        let led = if !time_valid {
            LedDirective::Blink
        } else if self.relay_on {
            // Board convention carried over: LED lit while the load rests.
            LedDirective::SteadyOff
        } else {
            LedDirective::SteadyOn
        };

        TickOutcome {
            relay_on: self.relay_on,
            led,
            transitioned,
            resting: false,
        }
    }
}
