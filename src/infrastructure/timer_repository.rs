use crate::domain::timer::TimerState;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::KeyValueStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::warn;

pub const TIMER_STATE_KEY: &str = "timerState";
pub const TIMER_LAST_SAVED_KEY: &str = "timerLastSaved";
pub const TIMER_LEFT_AT_KEY: &str = "timerLeftAt";

/// Persists the timer snapshot and reconciles a running countdown against
/// wall-clock time that passed while the process was not ticking.
#[derive(Clone)]
pub struct TimerRepository {
    store: Arc<dyn KeyValueStore>,
}

impl TimerRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn save(&self, state: &TimerState, now: DateTime<Utc>) -> Result<(), InfraError> {
        let payload = serde_json::to_string(state)?;
        self.store.set(TIMER_STATE_KEY, &payload)?;
        if state.is_running {
            self.store
                .set(TIMER_LAST_SAVED_KEY, &now.timestamp_millis().to_string())?;
        }
        Ok(())
    }

    /// Returns `defaults` when nothing is stored or the stored value is
    /// unusable; an unusable value is removed.
    pub fn load(&self, now: DateTime<Utc>, defaults: TimerState) -> Result<TimerState, InfraError> {
        let Some(raw) = self.store.get(TIMER_STATE_KEY)? else {
            return Ok(defaults);
        };

        let parsed = serde_json::from_str::<TimerState>(&raw)
            .map_err(|error| error.to_string())
            .and_then(|state| state.validate().map(|()| state));
        let mut state = match parsed {
            Ok(state) => state,
            Err(reason) => {
                warn!(key = TIMER_STATE_KEY, %reason, "discarding corrupt timer state");
                self.store.remove(TIMER_STATE_KEY)?;
                return Ok(defaults);
            }
        };

        if state.is_running {
            if let Some(last_saved) = self.last_saved()? {
                let elapsed = (now - last_saved).num_seconds().max(0);
                let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
                state.time_left = state.time_left.saturating_sub(elapsed);
            }
        }
        Ok(state)
    }

    pub fn last_saved(&self) -> Result<Option<DateTime<Utc>>, InfraError> {
        self.read_millis(TIMER_LAST_SAVED_KEY)
    }

    pub fn save_left_at(&self, left_at: DateTime<Utc>) -> Result<(), InfraError> {
        self.store
            .set(TIMER_LEFT_AT_KEY, &left_at.timestamp_millis().to_string())
    }

    pub fn load_left_at(&self) -> Result<Option<DateTime<Utc>>, InfraError> {
        self.read_millis(TIMER_LEFT_AT_KEY)
    }

    pub fn clear_left_at(&self) -> Result<(), InfraError> {
        self.store.remove(TIMER_LEFT_AT_KEY)
    }

    fn read_millis(&self, key: &str) -> Result<Option<DateTime<Utc>>, InfraError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        let parsed = raw
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis);
        if parsed.is_none() {
            warn!(key, value = %raw, "discarding unreadable timestamp");
            self.store.remove(key)?;
        }
        Ok(parsed)
    }
}
