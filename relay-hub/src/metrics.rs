use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref TOGGLES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_hub_toggles_total",
        "Total appliance toggles applied to the store"
    ))
    .unwrap();
    pub static ref DEVICE_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_hub_device_failures_total",
        "Total relay board requests that failed or could not be dispatched"
    ))
    .unwrap();
    pub static ref TIMERS_FIRED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_hub_timers_fired_total",
        "Total countdown timers that expired"
    ))
    .unwrap();
    pub static ref SCHEDULES_FIRED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_hub_schedules_fired_total",
        "Total schedules that triggered an appliance change"
    ))
    .unwrap();
    pub static ref NOTIFICATIONS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "relay_hub_notifications_total",
        "Total notifications emitted"
    ))
    .unwrap();
    pub static ref POWER_WATTS: Gauge = Gauge::with_opts(Opts::new(
        "relay_hub_power_watts",
        "Current aggregate power draw"
    ))
    .unwrap();
    pub static ref DEVICE_REQUESTS_IN_FLIGHT: Gauge = Gauge::with_opts(Opts::new(
        "relay_hub_device_requests_in_flight",
        "Relay board requests awaiting a response"
    ))
    .unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(TOGGLES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(DEVICE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TIMERS_FIRED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SCHEDULES_FIRED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(NOTIFICATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(POWER_WATTS.clone()))?;
    REGISTRY.register(Box::new(DEVICE_REQUESTS_IN_FLIGHT.clone()))?;
    Ok(())
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
