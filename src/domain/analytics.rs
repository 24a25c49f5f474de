use crate::domain::models::{FocusSession, Mood, Priority, ProcrastinationEntry, Task};
use crate::domain::timer::TimerState;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::collections::BTreeMap;

const SERIES_DAYS: i64 = 7;
const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyProductivity {
    pub date: NaiveDate,
    pub tasks_completed: usize,
    pub focus_minutes: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownRow {
    pub name: String,
    pub total: usize,
    pub completed: usize,
    /// Percentage, rounded.
    pub completion: u32,
    pub minutes: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductivitySummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_rate: u32,
    /// Focus time tracked against tasks.
    pub tracked_minutes: u64,
    /// All focus time logged by the timer.
    pub focus_minutes: u64,
    pub total_sessions: usize,
    pub average_session_minutes: u64,
    pub streak_days: u32,
    pub procrastination_entries: usize,
    pub procrastination_overcome: usize,
    pub daily: Vec<DailyProductivity>,
    pub categories: Vec<BreakdownRow>,
    pub priorities: Vec<BreakdownRow>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionSummary {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub completed_count: u32,
    pub interrupted_count: u32,
    pub total_focus_minutes: u64,
    pub sessions: Vec<FocusSession>,
}

pub fn productivity_summary(
    tasks: &[Task],
    timer: &TimerState,
    procrastination: &[ProcrastinationEntry],
    today: NaiveDate,
    timezone: Tz,
) -> ProductivitySummary {
    let completed_tasks = tasks.iter().filter(|task| task.completed).count();
    let tracked_seconds = tasks.iter().map(|task| task.total_time_spent).sum::<u64>();
    let total_sessions = timer.focus_sessions.len();
    let session_seconds = timer
        .focus_sessions
        .iter()
        .map(|session| u64::from(session.duration))
        .sum::<u64>();

    let daily = (0..SERIES_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let tasks_completed = tasks
                .iter()
                .filter_map(|task| task.completed_at)
                .filter(|completed_at| completed_at.with_timezone(&timezone).date_naive() == date)
                .count();
            let seconds = timer
                .focus_sessions
                .iter()
                .filter(|session| session.date.with_timezone(&timezone).date_naive() == date)
                .map(|session| u64::from(session.duration))
                .sum::<u64>();
            DailyProductivity {
                date,
                tasks_completed,
                focus_minutes: seconds / 60,
            }
        })
        .collect();

    let mut by_category: BTreeMap<&str, Vec<&Task>> = BTreeMap::new();
    for task in tasks {
        let name = task.category.as_deref().unwrap_or(UNCATEGORIZED);
        by_category.entry(name).or_default().push(task);
    }
    let categories = by_category
        .into_iter()
        .map(|(name, group)| breakdown(name, &group))
        .collect();

    let priorities = [Priority::High, Priority::Medium, Priority::Low]
        .into_iter()
        .map(|priority| {
            let group = tasks
                .iter()
                .filter(|task| task.priority == priority)
                .collect::<Vec<_>>();
            breakdown(priority.as_str(), &group)
        })
        .collect();

    ProductivitySummary {
        total_tasks: tasks.len(),
        completed_tasks,
        completion_rate: percentage(completed_tasks, tasks.len()),
        tracked_minutes: tracked_seconds / 60,
        focus_minutes: timer.total_focus_time / 60,
        total_sessions,
        average_session_minutes: if total_sessions == 0 {
            0
        } else {
            session_seconds / total_sessions as u64 / 60
        },
        streak_days: timer.streak_days,
        procrastination_entries: procrastination.len(),
        procrastination_overcome: procrastination.iter().filter(|entry| entry.overcome).count(),
        daily,
        categories,
        priorities,
    }
}

/// Sessions whose start falls inside `[start, end]`.
pub fn reflection_summary(
    sessions: &[FocusSession],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<ReflectionSummary, String> {
    if end <= start {
        return Err("end must be greater than start".to_string());
    }

    let in_range = sessions
        .iter()
        .filter(|session| session.date >= start && session.date <= end)
        .cloned()
        .collect::<Vec<_>>();
    let completed_count = in_range.iter().filter(|session| session.completed).count() as u32;
    let interrupted_count = in_range.len() as u32 - completed_count;
    let total_focus_minutes = in_range
        .iter()
        .map(|session| u64::from(session.duration))
        .sum::<u64>()
        / 60;

    Ok(ReflectionSummary {
        start,
        end,
        completed_count,
        interrupted_count,
        total_focus_minutes,
        sessions: in_range,
    })
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MoodCount {
    pub mood: Mood,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcrastinationInsights {
    pub moods: Vec<MoodCount>,
    pub overcome: usize,
    pub not_yet: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    pub date: NaiveDate,
    pub entries: Vec<ProcrastinationEntry>,
}

pub fn procrastination_insights(entries: &[ProcrastinationEntry]) -> ProcrastinationInsights {
    let moods = Mood::ALL
        .into_iter()
        .map(|mood| MoodCount {
            mood,
            count: entries.iter().filter(|entry| entry.mood == Some(mood)).count(),
        })
        .filter(|row| row.count > 0)
        .collect();
    let overcome = entries.iter().filter(|entry| entry.overcome).count();
    ProcrastinationInsights {
        moods,
        overcome,
        not_yet: entries.len() - overcome,
    }
}

/// Entries bucketed by local calendar day, newest day first. Order inside a
/// day is newest first too.
pub fn group_by_day(entries: &[ProcrastinationEntry], timezone: Tz) -> Vec<DayGroup> {
    let mut groups: BTreeMap<NaiveDate, Vec<ProcrastinationEntry>> = BTreeMap::new();
    for entry in entries {
        let date = entry.timestamp.with_timezone(&timezone).date_naive();
        groups.entry(date).or_default().push(entry.clone());
    }
    groups
        .into_iter()
        .rev()
        .map(|(date, mut entries)| {
            entries.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
            DayGroup { date, entries }
        })
        .collect()
}

fn breakdown(name: &str, group: &[&Task]) -> BreakdownRow {
    let completed = group.iter().filter(|task| task.completed).count();
    let seconds = group.iter().map(|task| task.total_time_spent).sum::<u64>();
    BreakdownRow {
        name: name.to_string(),
        total: group.len(),
        completed,
        completion: percentage(completed, group.len()),
        minutes: seconds / 60,
    }
}

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}
