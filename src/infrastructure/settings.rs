use crate::infrastructure::error::InfraError;
use crate::infrastructure::kv_store::KeyValueStore;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

pub const SHOW_MOTIVATIONAL_REMINDERS_KEY: &str = "showMotivationalReminders";
pub const URGENT_NOTIFICATIONS_KEY: &str = "urgentNotifications";
pub const CUSTOM_TASK_SOUND_KEY: &str = "customTaskSound";
pub const CUSTOM_TIMER_SOUND_KEY: &str = "customTimerSound";
pub const TASK_CATEGORIES_KEY: &str = "taskCategories";
pub const LAST_MOTIVATION_DATE_KEY: &str = "lastMotivationDate";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub show_motivational_reminders: bool,
    pub urgent_notifications: bool,
    pub custom_task_sound: Option<String>,
    pub custom_timer_sound: Option<String>,
    pub task_categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundSlot {
    Task,
    Timer,
}

impl SoundSlot {
    fn key(self) -> &'static str {
        match self {
            Self::Task => CUSTOM_TASK_SOUND_KEY,
            Self::Timer => CUSTOM_TIMER_SOUND_KEY,
        }
    }
}

/// Per-feature flags kept as plain strings next to the collections.
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self, default_categories: &[String]) -> Result<Settings, InfraError> {
        Ok(Settings {
            show_motivational_reminders: self.show_motivational_reminders()?,
            urgent_notifications: self.urgent_notifications()?,
            custom_task_sound: self.custom_sound(SoundSlot::Task)?,
            custom_timer_sound: self.custom_sound(SoundSlot::Timer)?,
            task_categories: self.task_categories(default_categories)?,
        })
    }

    /// On unless explicitly switched off.
    pub fn show_motivational_reminders(&self) -> Result<bool, InfraError> {
        Ok(self.store.get(SHOW_MOTIVATIONAL_REMINDERS_KEY)?.as_deref() != Some("false"))
    }

    pub fn set_show_motivational_reminders(&self, enabled: bool) -> Result<(), InfraError> {
        self.store
            .set(SHOW_MOTIVATIONAL_REMINDERS_KEY, &enabled.to_string())
    }

    /// Off unless explicitly switched on.
    pub fn urgent_notifications(&self) -> Result<bool, InfraError> {
        Ok(self.store.get(URGENT_NOTIFICATIONS_KEY)?.as_deref() == Some("true"))
    }

    pub fn set_urgent_notifications(&self, enabled: bool) -> Result<(), InfraError> {
        self.store.set(URGENT_NOTIFICATIONS_KEY, &enabled.to_string())
    }

    pub fn custom_sound(&self, slot: SoundSlot) -> Result<Option<String>, InfraError> {
        Ok(self
            .store
            .get(slot.key())?
            .filter(|value| !value.trim().is_empty()))
    }

    pub fn set_custom_sound(&self, slot: SoundSlot, file_name: Option<&str>) -> Result<(), InfraError> {
        match file_name.map(str::trim).filter(|value| !value.is_empty()) {
            Some(file_name) => self.store.set(slot.key(), file_name),
            None => self.store.remove(slot.key()),
        }
    }

    pub fn task_categories(&self, defaults: &[String]) -> Result<Vec<String>, InfraError> {
        let Some(raw) = self.store.get(TASK_CATEGORIES_KEY)? else {
            return Ok(defaults.to_vec());
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(categories) => Ok(categories),
            Err(error) => {
                warn!(key = TASK_CATEGORIES_KEY, %error, "discarding corrupt categories");
                self.store.remove(TASK_CATEGORIES_KEY)?;
                Ok(defaults.to_vec())
            }
        }
    }

    pub fn set_task_categories(&self, categories: &[String]) -> Result<(), InfraError> {
        let payload = serde_json::to_string(categories)?;
        self.store.set(TASK_CATEGORIES_KEY, &payload)
    }

    pub fn last_motivation_date(&self) -> Result<Option<NaiveDate>, InfraError> {
        Ok(self
            .store
            .get(LAST_MOTIVATION_DATE_KEY)?
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()))
    }

    pub fn set_last_motivation_date(&self, date: NaiveDate) -> Result<(), InfraError> {
        self.store
            .set(LAST_MOTIVATION_DATE_KEY, &date.format("%Y-%m-%d").to_string())
    }
}
