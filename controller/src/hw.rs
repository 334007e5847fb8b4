use tracing::{debug, info};

use fridge_common::{HardwareConfig, LedDirective};

pub const LED_BLINK_INTERVAL_MS: u64 = 500;

/// Relay line driver. Everything above it speaks in terms of the load's
/// desired power state; the normally-closed wiring inversion lives here and
/// nowhere else.
pub struct RelayDriver {
    pin: u8,
    normally_closed: bool,
    coil_energized: Option<bool>,
}

impl RelayDriver {
    pub fn new(config: &HardwareConfig) -> Self {
        Self {
            pin: config.relay_pin,
            normally_closed: config.relay_normally_closed,
            coil_energized: None,
        }
    }

    pub fn set_load(&mut self, load_on: bool) {
        let energize = if self.normally_closed {
            !load_on
        } else {
            load_on
        };
        if self.coil_energized == Some(energize) {
            return;
        }
        self.coil_energized = Some(energize);
        info!(
            pin = self.pin,
            load_on,
            coil = energize,
            "relay switched"
        );
    }

    pub fn coil_energized(&self) -> Option<bool> {
        self.coil_energized
    }
}

/// Status LED driver. The state machine hands down a directive per tick;
/// the 0.5 s blink cadence is timed here against the monotonic clock.
pub struct LedDriver {
    pin: u8,
    level: bool,
    last_toggle_ms: u64,
}

impl LedDriver {
    pub fn new(config: &HardwareConfig) -> Self {
        Self {
            pin: config.led_pin,
            level: false,
            last_toggle_ms: 0,
        }
    }

    pub fn drive(&mut self, directive: LedDirective, now_ms: u64) {
        let level = match directive {
            LedDirective::SteadyOn => true,
            LedDirective::SteadyOff => false,
            LedDirective::Blink => {
                if now_ms.saturating_sub(self.last_toggle_ms) >= LED_BLINK_INTERVAL_MS {
                    self.last_toggle_ms = now_ms;
                    !self.level
                } else {
                    self.level
                }
            }
        };
        self.set_level(level);
    }

    pub fn set_level(&mut self, level: bool) {
        if level == self.level {
            return;
        }
        self.level = level;
        debug!(pin = self.pin, level, "led");
    }

    pub fn level(&self) -> bool {
        self.level
    }
}
