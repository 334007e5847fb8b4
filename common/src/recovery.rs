use crate::config::CycleConfig;
use crate::state::PersistedState;

/// In-cycle position handed to the controller loop after boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialState {
    pub relay_on: bool,
    pub cycle_elapsed_seconds: u64,
    /// Duration for the first phase only, set by the conservative restart.
    pub first_phase_duration: Option<u64>,
    pub total_runtime_seconds: u64,
    pub boot_count: u32,
    pub last_known_time: Option<i64>,
}

/// Reconstruct a plausible in-cycle position from the persisted record and
/// the boot-time clock verdict. Deterministic: the same inputs always yield
/// the same result.
///
/// Branches, in order:
/// - no record: conservative start (ON, half the ON duration remaining);
/// - clock untrusted: resume the persisted position exactly, advancing only
///   by real ticks from here on;
/// - clock trusted: fast-forward by the outage gap when it is short enough
///   to reason about, otherwise fall back to the conservative start.
pub fn recover(
    persisted: Option<&PersistedState>,
    boot_time: i64,
    clock_valid: bool,
    cycle: &CycleConfig,
    long_outage_threshold_seconds: i64,
) -> InitialState {
    let Some(prev) = persisted else {
        return conservative_start(cycle, 0, 1, None);
    };

    let boot_count = prev.boot_count.saturating_add(1);

    if !clock_valid {
        return InitialState {
            relay_on: prev.relay_on,
            cycle_elapsed_seconds: prev.cycle_elapsed_seconds,
            first_phase_duration: None,
            total_runtime_seconds: prev.total_runtime_seconds,
            boot_count,
            last_known_time: prev.last_known_time,
        };
    }

    let Some(checkpoint) = prev.last_checkpoint_time else {
        // Record exists but was never stamped with a trusted time.
        return conservative_start(cycle, prev.total_runtime_seconds, boot_count, prev.last_known_time);
    };

    let gap = boot_time - checkpoint;
    if gap < 0 {
        // Clock went backwards relative to the record; the gap is garbage.
        return conservative_start(cycle, prev.total_runtime_seconds, boot_count, prev.last_known_time);
    }

    let total_runtime_seconds = prev.total_runtime_seconds.saturating_add(gap as u64);

    if gap > long_outage_threshold_seconds {
        // Compressor has long since equilibrated; the stale phase tells us
        // nothing useful.
        return conservative_start(cycle, total_runtime_seconds, boot_count, prev.last_known_time);
    }

    // Replay the flips the gap would have caused from the persisted position.
    let mut relay_on = prev.relay_on;
    let mut elapsed = prev.cycle_elapsed_seconds.saturating_add(gap as u64);
    loop {
        let duration = u64::from(cycle.phase_duration_seconds(relay_on));
        if elapsed < duration {
            break;
        }
        elapsed -= duration;
        relay_on = !relay_on;
    }

    InitialState {
        relay_on,
        cycle_elapsed_seconds: elapsed,
        first_phase_duration: None,
        total_runtime_seconds,
        boot_count,
        last_known_time: prev.last_known_time,
    }
}

/// Start ON with half the ON duration remaining: averages out the
/// uncertainty of an unknown prior state instead of assuming a full ON or
/// a full OFF start.
fn conservative_start(
    cycle: &CycleConfig,
    total_runtime_seconds: u64,
    boot_count: u32,
    last_known_time: Option<i64>,
) -> InitialState {
    InitialState {
        relay_on: true,
        cycle_elapsed_seconds: 0,
        first_phase_duration: Some(u64::from(cycle.duration_on_seconds / 2).max(1)),
        total_runtime_seconds,
        boot_count,
        last_known_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CycleMode;
    use pretty_assertions::assert_eq;

    const THRESHOLD: i64 = 7_200;
    const T: i64 = 1_717_200_000;

    fn cycle() -> CycleConfig {
        CycleConfig::for_mode(CycleMode::Normal)
    }

    fn persisted(relay_on: bool, elapsed: u64, checkpoint: Option<i64>) -> PersistedState {
        PersistedState {
            relay_on,
            cycle_elapsed_seconds: elapsed,
            last_checkpoint_time: checkpoint,
            last_known_time: checkpoint,
            total_runtime_seconds: 50_000,
            boot_count: 4,
            ..PersistedState::default()
        }
    }

    #[test]
    fn first_boot_starts_conservative() {
        let initial = recover(None, T, true, &cycle(), THRESHOLD);

        assert!(initial.relay_on);
        assert_eq!(initial.cycle_elapsed_seconds, 0);
        assert_eq!(initial.first_phase_duration, Some(360)); // 720 / 2
        assert_eq!(initial.boot_count, 1);
        assert_eq!(initial.total_runtime_seconds, 0);
    }

    #[test]
    fn short_gap_fast_forwards_within_phase() {
        let prev = persisted(true, 300, Some(T));

        let initial = recover(Some(&prev), T + 400, true, &cycle(), THRESHOLD);

        assert!(initial.relay_on);
        assert_eq!(initial.cycle_elapsed_seconds, 700); // 300 + 400 < 720
        assert_eq!(initial.first_phase_duration, None);
        assert_eq!(initial.boot_count, 5);
        assert_eq!(initial.total_runtime_seconds, 50_400);
    }

    #[test]
    fn fast_forward_replays_phase_transitions() {
        let prev = persisted(true, 300, Some(T));

        // 300 + 3000 = 3300 total: 720 ON ends at 720, 1080 OFF ends at
        // 1800, next ON ends at 2520, leaving 780 into the following OFF.
        let initial = recover(Some(&prev), T + 3_000, true, &cycle(), THRESHOLD);

        assert!(!initial.relay_on);
        assert_eq!(initial.cycle_elapsed_seconds, 780);
    }

    #[test]
    fn long_outage_falls_back_to_conservative_start() {
        let prev = persisted(false, 900, Some(T));

        let initial = recover(Some(&prev), T + 9_000, true, &cycle(), THRESHOLD);

        assert!(initial.relay_on);
        assert_eq!(initial.cycle_elapsed_seconds, 0);
        assert_eq!(initial.first_phase_duration, Some(360));
        // Gap still feeds the lifetime counter, boot count still bumps.
        assert_eq!(initial.total_runtime_seconds, 59_000);
        assert_eq!(initial.boot_count, 5);
    }

    #[test]
    fn untrusted_clock_resumes_persisted_position_exactly() {
        let prev = persisted(false, 431, Some(T));

        let initial = recover(Some(&prev), T + 400, false, &cycle(), THRESHOLD);

        assert!(!initial.relay_on);
        assert_eq!(initial.cycle_elapsed_seconds, 431);
        assert_eq!(initial.first_phase_duration, None);
        assert_eq!(initial.total_runtime_seconds, 50_000); // no gap credit
        assert_eq!(initial.boot_count, 5);
    }

    #[test]
    fn clock_went_backwards_treated_as_unknown() {
        let prev = persisted(true, 100, Some(T + 1_000));

        let initial = recover(Some(&prev), T, true, &cycle(), THRESHOLD);

        assert!(initial.relay_on);
        assert_eq!(initial.cycle_elapsed_seconds, 0);
        assert_eq!(initial.first_phase_duration, Some(360));
        assert_eq!(initial.total_runtime_seconds, 50_000);
    }

    #[test]
    fn missing_checkpoint_time_treated_as_unknown() {
        let prev = persisted(false, 900, None);

        let initial = recover(Some(&prev), T, true, &cycle(), THRESHOLD);

        assert!(initial.relay_on);
        assert_eq!(initial.first_phase_duration, Some(360));
        assert_eq!(initial.boot_count, 5);
    }

    #[test]
    fn recovery_is_deterministic() {
        let prev = persisted(true, 555, Some(T));

        let a = recover(Some(&prev), T + 2_000, true, &cycle(), THRESHOLD);
        let b = recover(Some(&prev), T + 2_000, true, &cycle(), THRESHOLD);

        assert_eq!(a, b);
    }

    #[test]
    fn boot_count_saturates() {
        let prev = PersistedState {
            boot_count: u32::MAX,
            ..PersistedState::default()
        };

        let initial = recover(Some(&prev), T, false, &cycle(), THRESHOLD);
        assert_eq!(initial.boot_count, u32::MAX);
    }

    #[test]
    fn gap_exactly_at_threshold_still_fast_forwards() {
        let prev = persisted(true, 0, Some(T));

        let initial = recover(Some(&prev), T + THRESHOLD, true, &cycle(), THRESHOLD);

        // 7200 = 4 full 1800s cycles: lands back at ON with 0 elapsed.
        assert!(initial.relay_on);
        assert_eq!(initial.cycle_elapsed_seconds, 0);
        assert_eq!(initial.first_phase_duration, None);
    }
}
