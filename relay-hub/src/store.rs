use crate::device::RelayClient;
use crate::errors::Result;
use crate::metrics::{
    DEVICE_FAILURES_TOTAL, NOTIFICATIONS_TOTAL, POWER_WATTS, SCHEDULES_FIRED_TOTAL,
    TIMERS_FIRED_TOTAL, TOGGLES_TOTAL,
};
use crate::model::{
    seed_appliances, seed_metrics, Action, Appliance, Confirmation, HistoryDataPoint, Metrics,
    NewSchedule, Notification, NotificationKind, Schedule, Timer, WeeklyDataPoint,
};
use crate::settings::AddressStore;
use crate::validate::{validate_address, validate_schedule, validate_timer_duration};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Most recent notifications retained, newest first.
pub const NOTIFICATION_CAPACITY: usize = 5;

const POWER_DRIFT_W: f64 = 10.0;
const CURRENT_DRIFT_A: f64 = 0.05;
const HIGH_POWER_PROBABILITY: f64 = 0.05;
const FALLBACK_ADDRESS: &str = "192.168.1.100";
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub type SharedStore = Arc<Mutex<ApplianceStateStore>>;

/// Locks the shared store, recovering the data if a previous holder panicked.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, ApplianceStateStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Address used when nothing valid has been persisted yet.
    pub default_address: String,
    pub electricity_rate: f64,
    /// Appliance ids whose relays are wired inverted.
    pub inverted_relays: Vec<u32>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_address: FALLBACK_ADDRESS.to_string(),
            electricity_rate: 8.5,
            inverted_relays: Vec::new(),
        }
    }
}

/// In-memory state behind the dashboard.
///
/// All mutation goes through the methods below. Unknown appliance, schedule or
/// notification ids are ignored without emitting anything.
pub struct ApplianceStateStore {
    appliances: Vec<Appliance>,
    metrics: Metrics,
    notifications: Vec<Notification>,
    history_24h: Vec<HistoryDataPoint>,
    history_7d: Vec<WeeklyDataPoint>,
    device_address: String,
    electricity_rate: f64,
    relay: Arc<dyn RelayClient>,
    settings: Arc<dyn AddressStore>,
    last_notification_id: i64,
    // schedule id -> minute it last fired, formatted "%Y-%m-%d %H:%M"
    schedule_marks: HashMap<String, String>,
    // appliance id -> on-time below one second not yet added to usage_duration
    usage_carry_ms: HashMap<u32, u64>,
}

impl ApplianceStateStore {
    pub fn new(
        config: StoreConfig,
        relay: Arc<dyn RelayClient>,
        settings: Arc<dyn AddressStore>,
    ) -> Self {
        Self::with_rng(config, relay, settings, &mut rand::thread_rng())
    }

    pub fn with_rng(
        config: StoreConfig,
        relay: Arc<dyn RelayClient>,
        settings: Arc<dyn AddressStore>,
        rng: &mut impl Rng,
    ) -> Self {
        let now = Utc::now();

        let default_address = match validate_address(&config.default_address) {
            Ok(()) => config.default_address.clone(),
            Err(e) => {
                warn!("{}, using {}", e, FALLBACK_ADDRESS);
                FALLBACK_ADDRESS.to_string()
            }
        };

        let device_address = match settings.load() {
            Ok(Some(address)) if validate_address(&address).is_ok() => address,
            Ok(Some(address)) => {
                warn!("Ignoring persisted device address {}", address);
                default_address
            }
            Ok(None) => default_address,
            Err(e) => {
                warn!("Failed to read persisted settings: {}", e);
                default_address
            }
        };

        let mut appliances = seed_appliances(now);
        for appliance in &mut appliances {
            appliance.inverted = config.inverted_relays.contains(&appliance.id);
        }

        let metrics = seed_metrics(now);
        POWER_WATTS.set(metrics.power);

        info!(
            "Store initialised with {} appliances, device address {}",
            appliances.len(),
            device_address
        );

        Self {
            appliances,
            metrics,
            notifications: Vec::with_capacity(NOTIFICATION_CAPACITY),
            history_24h: generate_history_24h(rng),
            history_7d: generate_history_7d(rng),
            device_address,
            electricity_rate: config.electricity_rate,
            relay,
            settings,
            last_notification_id: 0,
            schedule_marks: HashMap::new(),
            usage_carry_ms: HashMap::new(),
        }
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn appliances(&self) -> &[Appliance] {
        &self.appliances
    }

    pub fn appliance(&self, id: u32) -> Option<&Appliance> {
        self.appliances.iter().find(|a| a.id == id)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn history_24h(&self) -> &[HistoryDataPoint] {
        &self.history_24h
    }

    pub fn history_7d(&self) -> &[WeeklyDataPoint] {
        &self.history_7d
    }

    pub fn device_address(&self) -> &str {
        &self.device_address
    }

    pub fn electricity_rate(&self) -> f64 {
        self.electricity_rate
    }

    pub fn is_loading(&self) -> bool {
        self.relay.in_flight() > 0
    }

    pub fn is_online(&self) -> bool {
        self.relay.is_online()
    }

    fn find_mut(&mut self, id: u32) -> Option<&mut Appliance> {
        self.appliances.iter_mut().find(|a| a.id == id)
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        let now = Utc::now();
        let id = now
            .timestamp_millis()
            .max(self.last_notification_id + 1);
        self.last_notification_id = id;

        let notification = Notification {
            id,
            kind,
            message: message.into(),
            timestamp: now,
        };
        debug!("Notification {:?}: {}", kind, notification.message);

        self.notifications.insert(0, notification);
        self.notifications.truncate(NOTIFICATION_CAPACITY);
        NOTIFICATIONS_TOTAL.inc();
    }

    /// Sends a toggle to the relay board and flips the appliance locally without
    /// waiting for the board's answer. Returns `None` for an unknown id.
    pub fn toggle_appliance(&mut self, id: u32) -> Option<Confirmation> {
        let (name, relay, next_state) = {
            let appliance = self.appliance(id)?;
            (appliance.name.clone(), appliance.relay_index(), !appliance.state)
        };
        let label = if next_state { "ON" } else { "OFF" };

        if let Err(e) = self.relay.dispatch_toggle(&self.device_address, relay) {
            warn!("Failed to control {} on relay {}: {}", name, relay, e);
            DEVICE_FAILURES_TOTAL.inc();
            self.notify(NotificationKind::Error, format!("Failed to control {}", name));
            return Some(Confirmation::failure("Failed to control appliance"));
        }

        if let Some(appliance) = self.find_mut(id) {
            appliance.state = next_state;
            appliance.last_update = Utc::now();
        }
        TOGGLES_TOTAL.inc();
        info!("{} (relay {}) turned {}", name, relay, label);

        self.notify(NotificationKind::Info, format!("{} turned {}", name, label));
        Some(Confirmation::success(format!("{} {}", name, label)))
    }

    /// Returns whether a notification was removed.
    pub fn dismiss_notification(&mut self, id: i64) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        before != self.notifications.len()
    }

    pub fn reset_statistics(&mut self) -> Confirmation {
        for appliance in &mut self.appliances {
            appliance.energy_today = 0.0;
            appliance.usage_duration = 0;
        }
        self.usage_carry_ms.clear();
        self.metrics.energy_today = 0.0;

        info!("Statistics reset");
        self.notify(NotificationKind::Info, "Statistics reset successfully");
        Confirmation::success("Statistics have been reset")
    }

    /// Appends a schedule with a fresh id. `Ok(None)` for an unknown appliance.
    pub fn add_schedule(
        &mut self,
        appliance_id: u32,
        schedule: NewSchedule,
    ) -> Result<Option<Schedule>> {
        if self.appliance(appliance_id).is_none() {
            return Ok(None);
        }
        validate_schedule(&schedule)?;

        let schedule = schedule.with_id(uuid::Uuid::new_v4().to_string());
        let Some(appliance) = self.find_mut(appliance_id) else {
            return Ok(None);
        };
        appliance.schedules.push(schedule.clone());
        let name = appliance.name.clone();

        info!(
            "Schedule {} added for {}: {} at {} on {:?}",
            schedule.id, name, schedule.action, schedule.time, schedule.days
        );
        self.notify(
            NotificationKind::Info,
            format!("Schedule added for {}: {} at {}", name, schedule.action, schedule.time),
        );
        Ok(Some(schedule))
    }

    /// Returns whether a schedule was removed.
    pub fn delete_schedule(&mut self, appliance_id: u32, schedule_id: &str) -> bool {
        let Some(appliance) = self.find_mut(appliance_id) else {
            return false;
        };
        let before = appliance.schedules.len();
        appliance.schedules.retain(|s| s.id != schedule_id);
        let removed = before != appliance.schedules.len();

        if removed {
            self.schedule_marks.remove(schedule_id);
            debug!("Schedule {} deleted from appliance {}", schedule_id, appliance_id);
        }
        removed
    }

    /// Flips `enabled` on one schedule and returns the new value.
    pub fn toggle_schedule(&mut self, appliance_id: u32, schedule_id: &str) -> Option<bool> {
        let schedule = self
            .find_mut(appliance_id)?
            .schedules
            .iter_mut()
            .find(|s| s.id == schedule_id)?;
        schedule.enabled = !schedule.enabled;
        debug!("Schedule {} enabled={}", schedule_id, schedule.enabled);
        Some(schedule.enabled)
    }

    /// Replaces any timer on the appliance. `Ok(None)` for an unknown appliance.
    pub fn set_timer(
        &mut self,
        appliance_id: u32,
        duration: u32,
        action: Action,
    ) -> Result<Option<Timer>> {
        if self.appliance(appliance_id).is_none() {
            return Ok(None);
        }
        validate_timer_duration(duration)?;

        let timer = Timer {
            enabled: true,
            duration,
            start_time: Utc::now(),
            action,
        };
        let Some(appliance) = self.find_mut(appliance_id) else {
            return Ok(None);
        };
        appliance.timer = Some(timer.clone());
        let name = appliance.name.clone();

        info!("Timer set for {}: {} in {}s", name, action, duration);
        self.notify(
            NotificationKind::Info,
            format!("Timer set: {} will turn {} in {}", name, action, format_duration(duration)),
        );
        Ok(Some(timer))
    }

    /// Returns whether a timer was cancelled.
    pub fn cancel_timer(&mut self, appliance_id: u32) -> bool {
        let Some(appliance) = self.find_mut(appliance_id) else {
            return false;
        };
        if appliance.timer.take().is_none() {
            return false;
        }
        let name = appliance.name.clone();

        info!("Timer cancelled for {}", name);
        self.notify(NotificationKind::Info, format!("Timer cancelled for {}", name));
        true
    }

    /// Validates, persists and activates a new relay board address. On error the
    /// previous address stays active.
    pub fn update_device_address(&mut self, address: &str) -> Result<Confirmation> {
        let address = address.trim();
        validate_address(address)?;
        self.settings.save(address)?;

        info!("Device address changed from {} to {}", self.device_address, address);
        self.device_address = address.to_string();
        self.notify(
            NotificationKind::Info,
            format!("Device address updated to {}", address),
        );
        Ok(Confirmation::success(format!("Device address set to {}", address)))
    }

    /// One tick of synthetic metric drift plus usage accrual for appliances that are on.
    pub fn drift_metrics(&mut self, rng: &mut impl Rng, tick: Duration) {
        let power_delta = (rng.gen::<f64>() - 0.5) * 2.0 * POWER_DRIFT_W;
        let current_delta = (rng.gen::<f64>() - 0.5) * 2.0 * CURRENT_DRIFT_A;
        self.metrics.power = (self.metrics.power + power_delta).max(0.0);
        self.metrics.current = (self.metrics.current + current_delta).max(0.0);
        self.metrics.timestamp = Utc::now();

        let secs = tick.as_secs_f64();
        let tick_ms = tick.as_millis() as u64;
        let mut accrued_kwh = 0.0;
        for appliance in self.appliances.iter_mut().filter(|a| a.state) {
            let kwh = appliance.power * secs / 3_600_000.0;
            appliance.energy_today += kwh;
            accrued_kwh += kwh;

            let carry = self.usage_carry_ms.entry(appliance.id).or_insert(0);
            *carry += tick_ms;
            appliance.usage_duration += *carry / 1000;
            *carry %= 1000;
        }
        self.metrics.energy_today += accrued_kwh;
        POWER_WATTS.set(self.metrics.power);

        if rng.gen_bool(HIGH_POWER_PROBABILITY) {
            warn!("High power consumption: {:.1} W", self.metrics.power);
            self.notify(NotificationKind::Warning, "High power consumption detected");
        }
    }

    /// Fires every enabled timer whose duration has elapsed at `now`: toggles the
    /// appliance, clears the timer and reports completion. Returns how many fired.
    pub fn sweep_timers(&mut self, now: DateTime<Utc>) -> usize {
        let expired: Vec<(u32, Action)> = self
            .appliances
            .iter()
            .filter_map(|a| match &a.timer {
                Some(timer) if timer.enabled && timer.is_expired(now) => Some((a.id, timer.action)),
                _ => None,
            })
            .collect();

        for (id, action) in &expired {
            self.toggle_appliance(*id);

            let Some(appliance) = self.find_mut(*id) else {
                continue;
            };
            appliance.timer = None;
            let name = appliance.name.clone();
            TIMERS_FIRED_TOTAL.inc();

            info!("Timer completed for {}: {}", name, action);
            self.notify(
                NotificationKind::Info,
                format!("Timer completed: {} turned {}", name, action),
            );
        }

        expired.len()
    }

    /// Fires enabled schedules matching the local wall-clock minute. Each schedule
    /// fires at most once per minute. Returns how many changed an appliance.
    pub fn sweep_schedules(&mut self, local_now: NaiveDateTime) -> usize {
        let minute = local_now.format("%H:%M").to_string();
        let mark = local_now.format("%Y-%m-%d %H:%M").to_string();
        let weekday = local_now.weekday().num_days_from_sunday() as u8;

        let mut due: Vec<(u32, String, Action)> = Vec::new();
        for appliance in &self.appliances {
            for schedule in &appliance.schedules {
                if schedule.enabled && schedule.time == minute && schedule.days.contains(&weekday) {
                    due.push((appliance.id, schedule.id.clone(), schedule.action));
                }
            }
        }

        let mut fired = 0;
        for (appliance_id, schedule_id, action) in due {
            if self.schedule_marks.get(&schedule_id) == Some(&mark) {
                continue;
            }
            self.schedule_marks.insert(schedule_id.clone(), mark.clone());

            let current = self.appliance(appliance_id).map(|a| a.state);
            if current == Some(action.target_state()) {
                continue;
            }
            let applied = self
                .toggle_appliance(appliance_id)
                .is_some_and(|confirmation| confirmation.success);
            if applied {
                debug!("Schedule {} turned appliance {} {}", schedule_id, appliance_id, action);
                SCHEDULES_FIRED_TOTAL.inc();
                fired += 1;
            }
        }
        fired
    }
}

fn generate_history_24h(rng: &mut impl Rng) -> Vec<HistoryDataPoint> {
    (0..24)
        .map(|hour| HistoryDataPoint {
            time: format!("{:02}:00", hour),
            power: rng.gen_range(50..350),
        })
        .collect()
}

fn generate_history_7d(rng: &mut impl Rng) -> Vec<WeeklyDataPoint> {
    WEEKDAYS
        .iter()
        .map(|day| WeeklyDataPoint {
            day: day.to_string(),
            energy: rng.gen_range(5..15),
        })
        .collect()
}

fn format_duration(secs: u32) -> String {
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (hours, minutes, seconds) {
        (0, 0, s) => format!("{}s", s),
        (0, m, 0) => format!("{}m", m),
        (0, m, s) => format!("{}m {}s", m, s),
        (h, m, _) => format!("{}h {}m", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::settings::MemoryAddressStore;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRelay {
        calls: AtomicUsize,
    }

    impl RelayClient for CountingRelay {
        fn dispatch_toggle(&self, _address: &str, _relay: u32) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn in_flight(&self) -> usize {
            0
        }

        fn is_online(&self) -> bool {
            true
        }
    }

    struct BrokenRelay;

    impl RelayClient for BrokenRelay {
        fn dispatch_toggle(&self, _address: &str, _relay: u32) -> Result<()> {
            Err(Error::DeviceUnavailable("no route".to_string()))
        }

        fn in_flight(&self) -> usize {
            0
        }

        fn is_online(&self) -> bool {
            false
        }
    }

    fn store_with(relay: Arc<dyn RelayClient>) -> ApplianceStateStore {
        ApplianceStateStore::with_rng(
            StoreConfig::default(),
            relay,
            Arc::new(MemoryAddressStore::default()),
            &mut StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_history_seeded_once() {
        let store = store_with(Arc::new(CountingRelay::default()));
        assert_eq!(store.history_24h().len(), 24);
        assert_eq!(store.history_24h()[0].time, "00:00");
        assert_eq!(store.history_24h()[23].time, "23:00");
        assert!(store
            .history_24h()
            .iter()
            .all(|p| (50..350).contains(&p.power)));

        assert_eq!(store.history_7d().len(), 7);
        assert_eq!(store.history_7d()[0].day, "Mon");
        assert!(store.history_7d().iter().all(|p| (5..15).contains(&p.energy)));
    }

    #[test]
    fn test_inverted_relays_from_config() {
        let store = ApplianceStateStore::with_rng(
            StoreConfig {
                inverted_relays: vec![3],
                ..StoreConfig::default()
            },
            Arc::new(CountingRelay::default()),
            Arc::new(MemoryAddressStore::default()),
            &mut StdRng::seed_from_u64(1),
        );
        assert!(store.appliance(3).unwrap().inverted);
        assert!(!store.appliance(1).unwrap().inverted);
    }

    #[test]
    fn test_persisted_address_wins_over_default() {
        let store = ApplianceStateStore::new(
            StoreConfig::default(),
            Arc::new(CountingRelay::default()),
            Arc::new(MemoryAddressStore::new(Some("10.1.1.1".to_string()))),
        );
        assert_eq!(store.device_address(), "10.1.1.1");

        let store = ApplianceStateStore::new(
            StoreConfig::default(),
            Arc::new(CountingRelay::default()),
            Arc::new(MemoryAddressStore::new(Some("300.1.1.1".to_string()))),
        );
        assert_eq!(store.device_address(), "192.168.1.100");
    }

    #[test]
    fn test_toggle_flips_state_and_notifies() {
        let relay = Arc::new(CountingRelay::default());
        let mut store = store_with(relay.clone());

        let confirmation = store.toggle_appliance(1).unwrap();
        assert!(confirmation.success);
        assert_eq!(confirmation.description, "Living Room Light ON");
        assert!(store.appliance(1).unwrap().state);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.notifications()[0].message, "Living Room Light turned ON");
    }

    #[test]
    fn test_toggle_failure_leaves_state() {
        let mut store = store_with(Arc::new(BrokenRelay));

        let confirmation = store.toggle_appliance(2).unwrap();
        assert!(!confirmation.success);
        assert!(store.appliance(2).unwrap().state);
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(store.notifications()[0].kind, NotificationKind::Error);
        assert_eq!(store.notifications()[0].message, "Failed to control Bedroom Fan");
    }

    #[test]
    fn test_notification_ids_unique() {
        let mut store = store_with(Arc::new(CountingRelay::default()));
        store.toggle_appliance(1);
        store.toggle_appliance(1);
        store.toggle_appliance(1);

        let ids: Vec<i64> = store.notifications().iter().map(|n| n.id).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_drift_stays_non_negative() {
        let mut store = store_with(Arc::new(CountingRelay::default()));
        store.metrics.power = 3.0;
        store.metrics.current = 0.01;
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..500 {
            let before = store.metrics().power;
            store.drift_metrics(&mut rng, Duration::from_secs(2));
            assert!(store.metrics().power >= 0.0);
            assert!(store.metrics().current >= 0.0);
            assert!((store.metrics().power - before).abs() <= POWER_DRIFT_W + 1e-9);
        }
        assert!(store.notifications().len() <= NOTIFICATION_CAPACITY);
    }

    #[test]
    fn test_drift_accrues_usage_for_running_appliances() {
        let mut store = store_with(Arc::new(CountingRelay::default()));
        store.reset_statistics();
        store.drift_metrics(&mut StdRng::seed_from_u64(3), Duration::from_secs(3600));

        // Bedroom Fan (75 W) and Kitchen Outlet (85 W) are on
        let fan = store.appliance(2).unwrap();
        assert_eq!(fan.usage_duration, 3600);
        assert!((fan.energy_today - 0.075).abs() < 1e-9);
        assert_eq!(store.appliance(1).unwrap().usage_duration, 0);
        assert!((store.metrics().energy_today - 0.16).abs() < 1e-9);
    }

    #[test]
    fn test_usage_keeps_sub_second_remainder() {
        let mut store = store_with(Arc::new(CountingRelay::default()));
        store.reset_statistics();
        let mut rng = StdRng::seed_from_u64(5);

        for _ in 0..4 {
            store.drift_metrics(&mut rng, Duration::from_millis(1500));
        }
        assert_eq!(store.appliance(2).unwrap().usage_duration, 6);

        store.reset_statistics();
        for _ in 0..3 {
            store.drift_metrics(&mut rng, Duration::from_millis(400));
        }
        assert_eq!(store.appliance(2).unwrap().usage_duration, 1);
        assert_eq!(store.appliance(1).unwrap().usage_duration, 0);
    }

    #[test]
    fn test_invalid_default_address_falls_back() {
        let store = ApplianceStateStore::new(
            StoreConfig {
                default_address: "not-an-address".to_string(),
                ..StoreConfig::default()
            },
            Arc::new(CountingRelay::default()),
            Arc::new(MemoryAddressStore::default()),
        );
        assert_eq!(store.device_address(), FALLBACK_ADDRESS);
    }

    #[test]
    fn test_timer_toggles_even_when_already_in_target_state() {
        let relay = Arc::new(CountingRelay::default());
        let mut store = store_with(relay.clone());
        assert!(store.appliance(2).unwrap().state);

        let timer = store.set_timer(2, 5, Action::On).unwrap().unwrap();
        assert_eq!(store.sweep_timers(timer.start_time + ChronoDuration::seconds(5)), 1);

        assert_eq!(relay.calls.load(Ordering::SeqCst), 1);
        assert!(!store.appliance(2).unwrap().state);
        assert!(store.appliance(2).unwrap().timer.is_none());
        assert_eq!(
            store.notifications()[0].message,
            "Timer completed: Bedroom Fan turned ON"
        );
    }

    #[test]
    fn test_schedule_fires_once_per_minute() {
        let relay = Arc::new(CountingRelay::default());
        let mut store = store_with(relay.clone());
        // 2026-10-18 is a Sunday
        let now = NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(7, 30, 5)
            .unwrap();

        store
            .add_schedule(
                1,
                NewSchedule {
                    enabled: true,
                    time: "07:30".to_string(),
                    days: vec![0],
                    action: Action::On,
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(store.sweep_schedules(now), 1);
        assert!(store.appliance(1).unwrap().state);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 1);

        // User turns it off again within the same minute; schedule must not re-fire
        store.toggle_appliance(1);
        assert_eq!(store.sweep_schedules(now + ChronoDuration::seconds(20)), 0);
        assert!(!store.appliance(1).unwrap().state);
    }

    #[test]
    fn test_schedule_ignores_other_days_and_disabled() {
        let relay = Arc::new(CountingRelay::default());
        let mut store = store_with(relay.clone());
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap();

        let sunday_only = store
            .add_schedule(
                2,
                NewSchedule {
                    enabled: true,
                    time: "22:00".to_string(),
                    days: vec![0],
                    action: Action::Off,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(store.sweep_schedules(monday), 0);

        store.delete_schedule(2, &sunday_only.id);
        let disabled = store
            .add_schedule(
                2,
                NewSchedule {
                    enabled: true,
                    time: "22:00".to_string(),
                    days: vec![1],
                    action: Action::Off,
                },
            )
            .unwrap()
            .unwrap();
        store.toggle_schedule(2, &disabled.id);
        assert_eq!(store.sweep_schedules(monday), 0);
        assert_eq!(relay.calls.load(Ordering::SeqCst), 0);
        assert!(store.appliance(2).unwrap().state);
    }

    #[test]
    fn test_invalid_schedule_rejected() {
        let mut store = store_with(Arc::new(CountingRelay::default()));
        let result = store.add_schedule(
            1,
            NewSchedule {
                enabled: true,
                time: "7pm".to_string(),
                days: vec![1],
                action: Action::On,
            },
        );
        assert!(matches!(result, Err(Error::InvalidSchedule(_))));
        assert!(store.appliance(1).unwrap().schedules.is_empty());
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(300), "5m");
        assert_eq!(format_duration(90), "1m 30s");
        assert_eq!(format_duration(3_660), "1h 1m");
    }
}
