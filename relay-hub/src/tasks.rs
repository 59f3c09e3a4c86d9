use crate::store::{lock, SharedStore};
use chrono::{Local, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Perturbs the global metrics every `period` until shutdown is signalled.
pub async fn run_metrics_drift(
    store: SharedStore,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Starting metrics drift every {:?}", period);

    let mut rng = StdRng::from_entropy();
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                lock(&store).drift_metrics(&mut rng, period);
            }
            _ = shutdown.changed() => break,
        }
    }

    info!("Metrics drift stopped");
}

/// Fires expired timers and due schedules every `period` until shutdown is signalled.
pub async fn run_sweeper(
    store: SharedStore,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Starting timer sweep every {:?}", period);

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut guard = lock(&store);
                let timers = guard.sweep_timers(Utc::now());
                let schedules = guard.sweep_schedules(Local::now().naive_local());
                drop(guard);
                if timers + schedules > 0 {
                    debug!("Sweep fired {} timers and {} schedules", timers, schedules);
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    info!("Timer sweep stopped");
}
