use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target state of a timer or schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    On,
    Off,
}

impl Action {
    pub fn target_state(self) -> bool {
        matches!(self, Action::On)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::On => f.write_str("ON"),
            Action::Off => f.write_str("OFF"),
        }
    }
}

/// Recurring day-of-week gated action. `days` holds weekday indices, 0 = Sunday.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: String,
    pub enabled: bool,
    pub time: String,
    pub days: Vec<u8>,
    pub action: Action,
}

/// A schedule as submitted by a caller, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSchedule {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub time: String,
    pub days: Vec<u8>,
    pub action: Action,
}

fn default_enabled() -> bool {
    true
}

impl NewSchedule {
    pub(crate) fn with_id(self, id: String) -> Schedule {
        Schedule {
            id,
            enabled: self.enabled,
            time: self.time,
            days: self.days,
            action: self.action,
        }
    }
}

/// One-shot countdown; `duration` is in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub enabled: bool,
    pub duration: u32,
    pub start_time: DateTime<Utc>,
    pub action: Action,
}

impl Timer {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let elapsed = now.signed_duration_since(self.start_time).num_seconds();
        elapsed >= i64::from(self.duration)
    }

    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u32 {
        let elapsed = now
            .signed_duration_since(self.start_time)
            .num_seconds()
            .max(0);
        (i64::from(self.duration) - elapsed).max(0) as u32
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appliance {
    pub id: u32,
    pub name: String,
    pub icon: String,
    pub state: bool,
    /// Rated draw in watts.
    pub power: f64,
    pub last_update: DateTime<Utc>,
    /// kWh consumed since the last statistics reset.
    pub energy_today: f64,
    /// Seconds spent switched on since the last statistics reset.
    pub usage_duration: u64,
    pub schedules: Vec<Schedule>,
    pub timer: Option<Timer>,
    #[serde(default)]
    pub inverted: bool,
}

impl Appliance {
    /// Zero-based switch position on the relay board.
    pub fn relay_index(&self) -> u32 {
        self.id.saturating_sub(1)
    }

    /// Electrical level the relay is driven at for the displayed state.
    pub fn relay_level(&self) -> bool {
        self.state != self.inverted
    }

    pub fn daily_cost(&self, rate: f64) -> f64 {
        self.energy_today * rate
    }

    pub fn usage_hours_minutes(&self) -> (u64, u64) {
        (self.usage_duration / 3600, (self.usage_duration % 3600) / 60)
    }
}

/// Global electrical snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub energy_today: f64,
    pub power_factor: f64,
    pub frequency: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryDataPoint {
    pub time: String,
    pub power: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyDataPoint {
    pub day: String,
    pub energy: u32,
}

/// Transient outcome message handed back to the caller of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub success: bool,
    pub title: String,
    pub description: String,
}

impl Confirmation {
    pub fn success(description: impl Into<String>) -> Self {
        Self {
            success: true,
            title: "Success".to_string(),
            description: description.into(),
        }
    }

    pub fn failure(description: impl Into<String>) -> Self {
        Self {
            success: false,
            title: "Error".to_string(),
            description: description.into(),
        }
    }
}

pub fn seed_appliances(now: DateTime<Utc>) -> Vec<Appliance> {
    let seed = |id: u32, name: &str, icon: &str, state: bool, power: f64, energy: f64, usage| {
        Appliance {
            id,
            name: name.to_string(),
            icon: icon.to_string(),
            state,
            power,
            last_update: now,
            energy_today: energy,
            usage_duration: usage,
            schedules: Vec::new(),
            timer: None,
            inverted: false,
        }
    };

    vec![
        seed(1, "Living Room Light", "💡", false, 60.0, 0.48, 28_800),
        seed(2, "Bedroom Fan", "🌀", true, 75.0, 0.9, 43_200),
        seed(3, "TV Hall", "📺", false, 150.0, 1.2, 21_600),
        seed(4, "Kitchen Outlet", "🔌", true, 85.0, 0.68, 25_200),
    ]
}

pub fn seed_metrics(now: DateTime<Utc>) -> Metrics {
    Metrics {
        voltage: 230.5,
        current: 0.91,
        power: 210.0,
        energy_today: 3.26,
        power_factor: 0.98,
        frequency: 50.0,
        timestamp: now,
    }
}
