use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::{DateTime, Timelike};
use chrono_tz::Tz;
use tracing::{info, warn};

use fridge_common::{
    recover, ClockMonitor, CycleEngine, PersistedState, RuntimeConfig, SCHEMA_VERSION,
};

use crate::hw::{LedDriver, RelayDriver};
use crate::store::Store;
use crate::timesrc;

/// Host time-source sampling cadence. Real deployments resync against NTP
/// far less often; the clock monitor's resync interval still governs when a
/// reading is demanded synchronously.
const TIME_SAMPLE_INTERVAL_SECONDS: u64 = 60;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = Store::new();
    let config = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    config.validate().context("invalid runtime configuration")?;

    let timezone: Tz = config.timezone.parse().unwrap_or_else(|_| {
        warn!(timezone = %config.timezone, "unknown timezone, falling back to UTC");
        Tz::UTC
    });

    info!(mode = config.mode.as_str(), %timezone, "fridge controller starting");

    let mut relay = RelayDriver::new(&config.hardware);
    let mut led = LedDriver::new(&config.hardware);

    // Boot: load the record, judge the clock once, reconstruct a position.
    let persisted = store.load_state().await;
    let mut monitor = ClockMonitor::new(config.clock.clone());
    let boot_candidate = timesrc::sample_now();
    let clock_valid = monitor.observe(boot_candidate, uptime_seconds());

    let initial = recover(
        persisted.as_ref(),
        boot_candidate.unwrap_or(0),
        clock_valid,
        &config.cycle,
        config.long_outage_threshold_seconds,
    );
    info!(
        boot = initial.boot_count,
        relay_on = initial.relay_on,
        elapsed = initial.cycle_elapsed_seconds,
        clock_valid,
        "state recovered"
    );

    let mut engine = CycleEngine::from_recovery(config.cycle.clone(), &initial);
    let mut state = PersistedState {
        version: SCHEMA_VERSION,
        last_known_time: monitor.last_known_time().or(initial.last_known_time),
        last_checkpoint_time: None,
        relay_on: initial.relay_on,
        cycle_elapsed_seconds: initial.cycle_elapsed_seconds,
        total_runtime_seconds: initial.total_runtime_seconds,
        boot_count: initial.boot_count,
    };

    relay.set_load(initial.relay_on);
    boot_blink(&mut led).await;

    let mut time_rx = timesrc::spawn_monitor(Duration::from_secs(TIME_SAMPLE_INTERVAL_SECONDS));
    let mut ticker = tokio::time::interval(Duration::from_secs(config.tick_interval_seconds));
    let mut last_checkpoint_uptime = uptime_seconds();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let up = uptime_seconds();

                let mut candidate = timesrc::fresh_candidate(&mut time_rx);
                if candidate.is_none() && monitor.resync_due(up) {
                    candidate = timesrc::sample_now();
                }

                let was_valid = monitor.is_valid();
                let time_valid = monitor.observe(candidate, up);
                if time_valid != was_valid {
                    match monitor.last_error() {
                        Some(err) => warn!(%err, "clock no longer trusted, degrading to tick-anchored cycle"),
                        None => info!("clock trusted, wall-anchored schedule active"),
                    }
                }

                let minute_of_day = monitor
                    .current_time(up)
                    .and_then(|ts| local_minute_of_day(ts, &timezone));

                let outcome = engine.tick(config.tick_interval_seconds, time_valid, minute_of_day);
                relay.set_load(outcome.relay_on);
                led.drive(outcome.led, monotonic_ms());

                state.relay_on = engine.relay_on();
                state.cycle_elapsed_seconds = engine.elapsed_seconds();
                state.add_runtime(config.tick_interval_seconds);
                if let Some(ts) = monitor.last_known_time() {
                    state.last_known_time = Some(ts);
                }

                if outcome.transitioned {
                    info!(relay_on = engine.relay_on(), "phase transition");
                }

                let interval_elapsed =
                    up.saturating_sub(last_checkpoint_uptime) >= config.checkpoint_interval_seconds;
                if outcome.transitioned || interval_elapsed {
                    state.last_checkpoint_time = monitor.current_time(up);
                    match store.checkpoint(&state).await {
                        Ok(()) => {
                            if interval_elapsed && !outcome.transitioned {
                                let runtime_hours =
                                    state.total_runtime_seconds as f64 / 3_600.0;
                                info!(runtime_hours = format!("{runtime_hours:.1}"), "checkpoint");
                            }
                        }
                        Err(err) => {
                            warn!("checkpoint failed, retrying on next cadence: {err:#}");
                        }
                    }
                    last_checkpoint_uptime = up;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested, writing final checkpoint");
                state.last_checkpoint_time = monitor.current_time(uptime_seconds());
                if let Err(err) = store.checkpoint(&state).await {
                    warn!("final checkpoint failed: {err:#}");
                }
                // Leave the load unpowered and the LED dark.
                relay.set_load(false);
                led.set_level(false);
                break;
            }
        }
    }

    Ok(())
}

/// Boot indication carried over from the original board: three quick blinks
/// once the hardware is up.
async fn boot_blink(led: &mut LedDriver) {
    for _ in 0..3 {
        led.set_level(false);
        tokio::time::sleep(Duration::from_millis(100)).await;
        led.set_level(true);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn local_minute_of_day(epoch_seconds: i64, timezone: &Tz) -> Option<u16> {
    let utc = DateTime::from_timestamp(epoch_seconds, 0)?;
    let local = utc.with_timezone(timezone);
    Some((local.hour() * 60 + local.minute()) as u16)
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

fn uptime_seconds() -> u64 {
    monotonic_ms() / 1_000
}
