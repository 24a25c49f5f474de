use crate::domain::models::{ProcrastinationEntry, Task};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub tasks: Vec<Task>,
    pub procrastination: Vec<ProcrastinationEntry>,
    pub export_date: DateTime<Utc>,
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("focusflow-export-{}.json", now.format("%Y-%m-%d"))
}

/// Writes pretty-printed JSON into `directory`, replacing a same-day export.
pub fn write_export(directory: &Path, document: &ExportDocument) -> Result<PathBuf, InfraError> {
    fs::create_dir_all(directory)?;
    let path = directory.join(export_file_name(document.export_date));
    let formatted = serde_json::to_string_pretty(document)?;
    fs::write(&path, format!("{formatted}\n"))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::NewTask;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn export_writes_dated_file_with_expected_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let now = fixed_time("2026-03-04T22:15:00Z");
        let task = NewTask {
            title: "Ship release".to_string(),
            ..NewTask::default()
        }
        .into_task("tsk-1".to_string(), now);
        let document = ExportDocument {
            tasks: vec![task],
            procrastination: Vec::new(),
            export_date: now,
        };

        let path = write_export(&dir.path().join("exports"), &document).expect("export");
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("focusflow-export-2026-03-04.json")
        );

        let raw = fs::read_to_string(&path).expect("read export");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("parse export");
        assert!(value.get("tasks").and_then(serde_json::Value::as_array).is_some());
        assert!(value.get("procrastination").is_some());
        assert_eq!(
            value.get("exportDate").and_then(serde_json::Value::as_str),
            Some("2026-03-04T22:15:00Z")
        );
        let parsed: ExportDocument = serde_json::from_str(&raw).expect("typed parse");
        assert_eq!(parsed, document);
    }
}
