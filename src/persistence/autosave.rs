use crate::persistence::house_info::{save_house_info, HouseInfoReport};
use crate::persistence::map_serialize::{save_house_items, SaveReport};
use crate::persistence::store::{StoreError, WorldStore};
use crate::world::state::WorldState;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveConfig {
    pub interval_seconds: u64,
}

impl AutosaveConfig {
    pub fn interval(self) -> Option<Duration> {
        if self.interval_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.interval_seconds))
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutosaveState {
    interval: Option<Duration>,
    next_due: Option<Instant>,
}

impl AutosaveState {
    pub fn new(config: AutosaveConfig, now: Instant) -> Self {
        let interval = config.interval();
        let next_due = interval.map(|interval| now + interval);
        Self { interval, next_due }
    }

    pub fn due(&self, now: Instant) -> bool {
        self.next_due.map_or(false, |next| now >= next)
    }

    /// Time left until the next save, if autosave is enabled.
    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        self.next_due
            .map(|next| next.saturating_duration_since(now))
    }

    pub fn mark_saved(&mut self, now: Instant) {
        if let Some(interval) = self.interval {
            self.next_due = Some(now + interval);
        }
    }
}

/// Outcome of one full save. The two parts run in separate transactions, so
/// one may succeed while the other fails.
#[derive(Debug)]
pub struct AutosaveReport {
    pub house_info: Result<HouseInfoReport, StoreError>,
    pub house_items: Result<SaveReport, StoreError>,
}

impl AutosaveReport {
    pub fn is_ok(&self) -> bool {
        self.house_info.is_ok() && self.house_items.is_ok()
    }
}

pub fn autosave_world(world: &WorldState, store: &mut dyn WorldStore) -> AutosaveReport {
    let house_info = save_house_info(store, &world.houses);
    let house_items = save_house_items(store, world);
    AutosaveReport {
        house_info,
        house_items,
    }
}
