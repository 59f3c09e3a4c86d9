use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of one relay channel.
#[derive(Debug, Clone, Serialize)]
pub struct RelayStatus {
    pub index: usize,
    pub level: bool,
    pub toggles: u64,
    pub last_change: Option<DateTime<Utc>>,
}

/// In-memory bank of relays, all starting low.
#[derive(Debug)]
pub struct RelayBoard {
    relays: Vec<RelayStatus>,
}

impl RelayBoard {
    pub fn new(count: usize) -> Self {
        Self {
            relays: (0..count)
                .map(|index| RelayStatus {
                    index,
                    level: false,
                    toggles: 0,
                    last_change: None,
                })
                .collect(),
        }
    }

    /// Flips one relay and returns its new level, or `None` if the index is off the board.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let relay = self.relays.get_mut(index)?;
        relay.level = !relay.level;
        relay.toggles += 1;
        relay.last_change = Some(Utc::now());
        Some(relay.level)
    }

    pub fn status(&self) -> &[RelayStatus] {
        &self.relays
    }
}
