use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank, lower sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }

    /// Next due date after `date`. Monthly recurrence clamps to the last day
    /// of shorter months.
    pub fn next_after(self, date: NaiveDate) -> NaiveDate {
        match self {
            Self::Daily => date + Duration::days(1),
            Self::Weekly => date + Duration::days(7),
            Self::Monthly => date
                .checked_add_months(Months::new(1))
                .unwrap_or(date + Duration::days(30)),
        }
    }
}

/// One focus interval, either run to completion or cut short by a pause.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSession {
    pub id: String,
    pub date: DateTime<Utc>,
    /// Seconds.
    pub duration: u32,
    pub task: Option<String>,
    pub completed: bool,
}

impl FocusSession {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "focus_session.id")
    }
}

/// A local notification handed to the platform notifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub body: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Asks for the full-screen alert style. Only honoured while the user
    /// has urgent notifications switched on.
    #[serde(default)]
    pub urgent: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubTask {
    pub id: String,
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Estimated minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<SubTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub has_notification: bool,
    #[serde(default)]
    pub is_priority: bool,
    /// Seconds of tracked focus time.
    #[serde(default)]
    pub total_time_spent: u64,
    #[serde(default)]
    pub focus_sessions: Vec<FocusSession>,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        validate_schedule(
            self.due_date,
            self.due_time.as_deref(),
            self.start_time.as_deref(),
            self.end_time.as_deref(),
        )?;
        for subtask in &self.subtasks {
            validate_non_empty(&subtask.id, "task.subtasks[].id")?;
        }
        Ok(())
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// The open copy that follows this task once it is completed. Undated
    /// recurring tasks are scheduled from the completion day.
    pub fn next_occurrence(&self, id: String, now: DateTime<Utc>, today: NaiveDate) -> Option<Task> {
        let recurrence = self.recurrence?;
        let due_date = recurrence.next_after(self.due_date.unwrap_or(today));
        Some(Task {
            id,
            completed: false,
            created_at: now,
            completed_at: None,
            due_date: Some(due_date),
            subtasks: self
                .subtasks
                .iter()
                .map(|subtask| SubTask {
                    completed: false,
                    ..subtask.clone()
                })
                .collect(),
            total_time_spent: 0,
            focus_sessions: Vec::new(),
            ..self.clone()
        })
    }

    /// Case-insensitive match across title, description, category and priority.
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&needle))
            || self
                .category
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&needle))
            || self.priority.as_str().contains(&needle)
    }
}

/// Task form input before an id and creation time are assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub due_time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<u32>,
    pub priority: Priority,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub recurrence: Option<Recurrence>,
    pub has_notification: bool,
}

impl NewTask {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.title, "task.title")?;
        validate_schedule(
            self.due_date,
            self.due_time.as_deref(),
            self.start_time.as_deref(),
            self.end_time.as_deref(),
        )
    }

    pub fn into_task(self, id: String, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title.trim().to_string(),
            description: normalize_optional(self.description),
            completed: false,
            created_at,
            completed_at: None,
            due_date: self.due_date,
            due_time: normalize_optional(self.due_time),
            start_time: normalize_optional(self.start_time),
            end_time: normalize_optional(self.end_time),
            duration: self.duration,
            priority: self.priority,
            category: normalize_optional(self.category),
            tags: self
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
            subtasks: Vec::new(),
            recurrence: self.recurrence,
            has_notification: self.has_notification,
            is_priority: false,
            total_time_spent: 0,
            focus_sessions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Frustrated,
    Bored,
    Anxious,
    Tired,
    Distracted,
}

impl Mood {
    pub const ALL: [Mood; 5] = [
        Self::Frustrated,
        Self::Bored,
        Self::Anxious,
        Self::Tired,
        Self::Distracted,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "frustrated" => Some(Self::Frustrated),
            "bored" => Some(Self::Bored),
            "anxious" => Some(Self::Anxious),
            "tired" => Some(Self::Tired),
            "distracted" => Some(Self::Distracted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcrastinationEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    #[serde(default)]
    pub overcome: bool,
}

impl ProcrastinationEntry {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "procrastination.id")?;
        validate_non_empty(&self.reason, "procrastination.reason")
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: String,
    pub title: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VisionBoardEntry {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub linked_task_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub journal_entries: Vec<JournalEntry>,
    #[serde(default)]
    pub media_items: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_criteria: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_percentage: Option<u8>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl VisionBoardEntry {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "vision.id")?;
        validate_non_empty(&self.title, "vision.title")?;
        if let Some(progress) = self.progress_percentage {
            if progress > 100 {
                return Err("vision.progress_percentage must be <= 100".to_string());
            }
        }
        for milestone in &self.milestones {
            validate_non_empty(&milestone.title, "vision.milestones[].title")?;
        }
        Ok(())
    }
}

pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

pub fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    parse_hhmm(value).map(|_| ()).ok_or_else(|| format!("{field_name} must be HH:MM"))
}

pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    let (hour, minute) = value.split_once(':')?;
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    let hour = hour.parse::<u32>().ok()?;
    let minute = minute.parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

pub fn parse_date(value: &str, field_name: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{field_name} must be YYYY-MM-DD"))
}

fn validate_schedule(
    due_date: Option<NaiveDate>,
    due_time: Option<&str>,
    start_time: Option<&str>,
    end_time: Option<&str>,
) -> Result<(), String> {
    if let Some(due_time) = due_time {
        if due_date.is_none() {
            return Err("task.due_time requires task.due_date".to_string());
        }
        validate_hhmm(due_time, "task.due_time")?;
    }
    let start = start_time
        .map(|value| parse_hhmm(value).ok_or_else(|| "task.start_time must be HH:MM".to_string()))
        .transpose()?;
    let end = end_time
        .map(|value| parse_hhmm(value).ok_or_else(|| "task.end_time must be HH:MM".to_string()))
        .transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            return Err("task.end_time must be after task.start_time".to_string());
        }
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
