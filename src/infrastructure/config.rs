use crate::domain::timer::{DEFAULT_BREAK_MINUTES, DEFAULT_FOCUS_MINUTES, MAX_DURATION_MINUTES};
use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const DEFAULT_APP_NAME: &str = "FocusFlow";
const DEFAULT_TASKS_PER_PAGE: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub schema: u8,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_focus_minutes")]
    pub focus_duration_minutes: u32,
    #[serde(default = "default_break_minutes")]
    pub break_duration_minutes: u32,
    #[serde(default = "default_tasks_per_page")]
    pub tasks_per_page: usize,
    #[serde(default = "default_categories")]
    pub default_categories: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: 1,
            app_name: default_app_name(),
            timezone: default_timezone(),
            focus_duration_minutes: DEFAULT_FOCUS_MINUTES,
            break_duration_minutes: DEFAULT_BREAK_MINUTES,
            tasks_per_page: DEFAULT_TASKS_PER_PAGE,
            default_categories: default_categories(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), InfraError> {
        for (value, field_name) in [
            (self.focus_duration_minutes, "focusDurationMinutes"),
            (self.break_duration_minutes, "breakDurationMinutes"),
        ] {
            if value == 0 || value > MAX_DURATION_MINUTES {
                return Err(InfraError::InvalidConfig(format!(
                    "{field_name} must be between 1 and {MAX_DURATION_MINUTES}"
                )));
            }
        }
        if self.tasks_per_page == 0 {
            return Err(InfraError::InvalidConfig(
                "tasksPerPage must be greater than 0".to_string(),
            ));
        }
        self.tz().map(|_| ())
    }

    pub fn tz(&self) -> Result<Tz, InfraError> {
        parse_timezone(&self.timezone)
    }
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_focus_minutes() -> u32 {
    DEFAULT_FOCUS_MINUTES
}

fn default_break_minutes() -> u32 {
    DEFAULT_BREAK_MINUTES
}

fn default_tasks_per_page() -> usize {
    DEFAULT_TASKS_PER_PAGE
}

fn default_categories() -> Vec<String> {
    ["Work", "Personal", "Study", "Health"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&AppConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_app_config(config_dir: &Path) -> Result<AppConfig, InfraError> {
    let path = config_dir.join(APP_JSON);
    let value = read_config(&path)?;
    let config: AppConfig = serde_json::from_value(value).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid {}: {error}", path.display()))
    })?;
    config.validate()?;
    Ok(config)
}

pub fn parse_timezone(name: &str) -> Result<Tz, InfraError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| InfraError::InvalidConfig(format!("unknown timezone: {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_written_once_and_loads() {
        let dir = tempfile::tempdir().expect("temp dir");
        ensure_default_configs(dir.path()).expect("write defaults");

        let config = load_app_config(dir.path()).expect("load");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tz().expect("tz"), chrono_tz::UTC);

        fs::write(
            dir.path().join(APP_JSON),
            r#"{"schema":1,"timezone":"Asia/Tokyo","focusDurationMinutes":50}"#,
        )
        .expect("overwrite");
        ensure_default_configs(dir.path()).expect("keep existing");

        let config = load_app_config(dir.path()).expect("load edited");
        assert_eq!(config.focus_duration_minutes, 50);
        assert_eq!(config.break_duration_minutes, DEFAULT_BREAK_MINUTES);
        assert_eq!(config.tz().expect("tz"), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join(APP_JSON), r#"{"schema":2}"#).expect("write");
        match load_app_config(dir.path()) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("unsupported schema")),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn unknown_timezone_and_zero_duration_are_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join(APP_JSON),
            r#"{"schema":1,"timezone":"Mars/Olympus"}"#,
        )
        .expect("write");
        assert!(load_app_config(dir.path()).is_err());

        fs::write(
            dir.path().join(APP_JSON),
            r#"{"schema":1,"breakDurationMinutes":0}"#,
        )
        .expect("write");
        assert!(load_app_config(dir.path()).is_err());
    }
}
