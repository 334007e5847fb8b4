use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

/// One reading published by the time-source collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSample {
    pub epoch_seconds: i64,
}

fn source_enabled() -> bool {
    // FRIDGE_TIME_SOURCE=none simulates a device that never gets NTP.
    std::env::var("FRIDGE_TIME_SOURCE")
        .map(|value| value != "none")
        .unwrap_or(true)
}

/// Take one reading right now. `None` when the source is unavailable.
pub fn sample_now() -> Option<i64> {
    source_enabled().then(|| Utc::now().timestamp())
}

/// Spawn the background monitor. It only ever publishes readings through
/// the watch channel; the controller loop reads them at tick boundaries and
/// owns all state. The host collaborator resamples far more often than the
/// configured resync minimum.
pub fn spawn_monitor(sample_interval: Duration) -> watch::Receiver<TimeSample> {
    let initial = TimeSample {
        epoch_seconds: sample_now().unwrap_or(0),
    };
    let (tx, rx) = watch::channel(initial);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sample_interval);
        ticker.tick().await; // the immediate first tick
        loop {
            ticker.tick().await;
            let Some(epoch_seconds) = sample_now() else {
                continue;
            };
            if tx.send(TimeSample { epoch_seconds }).is_err() {
                break;
            }
        }
    });

    rx
}

/// Non-blocking read: a candidate only when the monitor published a fresh
/// sample since the last call.
pub fn fresh_candidate(rx: &mut watch::Receiver<TimeSample>) -> Option<i64> {
    if rx.has_changed().unwrap_or(false) {
        Some(rx.borrow_and_update().epoch_seconds)
    } else {
        None
    }
}
