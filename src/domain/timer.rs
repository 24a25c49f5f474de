//! Focus/break countdown with tree-health and streak bookkeeping.
//!
//! `TimerMachine` never reads the wall clock: every command takes `now`, so
//! callers decide whether time comes from the system clock or a test fixture.

use crate::domain::models::{FocusSession, Notification};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const DEFAULT_FOCUS_MINUTES: u32 = 25;
/// Notification id of the pending "focus time complete" alert.
pub const FOCUS_ALERT_ID: &str = "timer-focus";
pub const DEFAULT_BREAK_MINUTES: u32 = 5;
pub const MAX_DURATION_MINUTES: u32 = 180;
pub const MAX_TREE_HEALTH: u8 = 100;

const PARTIAL_SESSION_MIN_SECONDS: i64 = 10;
const AWAY_GRACE_SECONDS: i64 = 10;
const AWAY_STEP_SECONDS: i64 = 10;
const HEALTH_LOST_PER_STEP: i64 = 5;
const TICK_CUE_SECONDS: u32 = 5;
const WITHERING_BELOW: u8 = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Idle,
    Focus,
    Break,
}

impl TimerMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Focus => "focus",
            Self::Break => "break",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    /// Seconds remaining in the current interval.
    pub time_left: u32,
    pub is_running: bool,
    /// Minutes.
    pub focus_duration: u32,
    /// Minutes.
    pub break_duration: u32,
    pub sessions_completed: u32,
    pub current_task: Option<String>,
    pub tree_health: u8,
    pub streak_days: u32,
    pub last_active_day: Option<NaiveDate>,
    #[serde(default)]
    pub focus_sessions: Vec<FocusSession>,
    /// Seconds.
    #[serde(default)]
    pub total_focus_time: u64,
    #[serde(default)]
    pub session_start_time: Option<DateTime<Utc>>,
    /// `time_left` when the current focus run was started or resumed.
    #[serde(default)]
    pub run_length: u32,
}

impl TimerState {
    pub fn with_durations(focus_minutes: u32, break_minutes: u32) -> Self {
        Self {
            mode: TimerMode::Idle,
            time_left: focus_minutes * 60,
            is_running: false,
            focus_duration: focus_minutes,
            break_duration: break_minutes,
            sessions_completed: 0,
            current_task: None,
            tree_health: MAX_TREE_HEALTH,
            streak_days: 0,
            last_active_day: None,
            focus_sessions: Vec::new(),
            total_focus_time: 0,
            session_start_time: None,
            run_length: 0,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_duration(self.focus_duration, "timer.focus_duration")?;
        validate_duration(self.break_duration, "timer.break_duration")?;
        if self.tree_health > MAX_TREE_HEALTH {
            return Err("timer.tree_health must be <= 100".to_string());
        }
        for session in &self.focus_sessions {
            session.validate()?;
        }
        Ok(())
    }

    fn focus_seconds(&self) -> u32 {
        self.focus_duration * 60
    }

    fn break_seconds(&self) -> u32 {
        self.break_duration * 60
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::with_durations(DEFAULT_FOCUS_MINUTES, DEFAULT_BREAK_MINUTES)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerCommand {
    Start { task: Option<String> },
    Pause,
    Reset,
    Tick,
    SwitchToBreak,
    SwitchToFocus,
    SetFocusDuration(u32),
    SetBreakDuration(u32),
    UpdateTreeHealth(i64),
    ResetTreeHealth,
    UpdateStreak,
    AppHidden,
    AppVisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    TimerTick,
    TimerComplete,
}

impl SoundCue {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TimerTick => "timerTick",
            Self::TimerComplete => "timerComplete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEffect {
    PlaySound(SoundCue),
    StopSound(SoundCue),
    SessionRecorded(FocusSession),
    FocusCompleted,
    BreakCompleted,
    TreeWithering(u8),
    TreeDied,
    ScheduleNotification(Notification),
    CancelNotification(String),
}

#[derive(Debug, Clone)]
pub struct TimerMachine {
    state: TimerState,
    left_at: Option<DateTime<Utc>>,
    timezone: Tz,
}

impl TimerMachine {
    pub fn new(state: TimerState, timezone: Tz) -> Self {
        Self {
            state,
            left_at: None,
            timezone,
        }
    }

    pub fn with_left_at(mut self, left_at: Option<DateTime<Utc>>) -> Self {
        self.left_at = left_at;
        self
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// When the app was last backgrounded during a running focus interval.
    pub fn left_at(&self) -> Option<DateTime<Utc>> {
        self.left_at
    }

    pub fn apply(
        &mut self,
        command: TimerCommand,
        now: DateTime<Utc>,
    ) -> Result<Vec<TimerEffect>, String> {
        let mut effects = Vec::new();
        match command {
            TimerCommand::Start { task } => self.start(task, now, &mut effects),
            TimerCommand::Pause => self.pause(now, &mut effects),
            TimerCommand::Reset => {
                if self.state.is_running {
                    effects.push(TimerEffect::StopSound(SoundCue::TimerTick));
                }
                self.cancel_focus_alert(&mut effects);
                self.state.mode = TimerMode::Idle;
                self.state.is_running = false;
                self.state.time_left = self.state.focus_seconds();
                self.state.current_task = None;
                self.end_run();
            }
            TimerCommand::Tick => self.tick(now, &mut effects),
            TimerCommand::SwitchToBreak => {
                self.cancel_focus_alert(&mut effects);
                self.state.mode = TimerMode::Break;
                self.state.is_running = false;
                self.state.time_left = self.state.break_seconds();
                self.end_run();
            }
            TimerCommand::SwitchToFocus => {
                self.cancel_focus_alert(&mut effects);
                self.state.tree_health = MAX_TREE_HEALTH;
                self.state.mode = TimerMode::Focus;
                self.state.is_running = false;
                self.state.time_left = self.state.focus_seconds();
                self.end_run();
            }
            TimerCommand::SetFocusDuration(minutes) => {
                validate_duration(minutes, "focus_duration")?;
                self.state.focus_duration = minutes;
                let applies = matches!(self.state.mode, TimerMode::Focus | TimerMode::Idle);
                if applies && !self.state.is_running {
                    self.state.time_left = self.state.focus_seconds();
                }
            }
            TimerCommand::SetBreakDuration(minutes) => {
                validate_duration(minutes, "break_duration")?;
                self.state.break_duration = minutes;
                if self.state.mode == TimerMode::Break && !self.state.is_running {
                    self.state.time_left = self.state.break_seconds();
                }
            }
            TimerCommand::UpdateTreeHealth(health) => {
                self.state.tree_health = clamp_health(health);
            }
            TimerCommand::ResetTreeHealth => {
                self.state.tree_health = MAX_TREE_HEALTH;
            }
            TimerCommand::UpdateStreak => self.update_streak(now),
            TimerCommand::AppHidden => {
                if self.state.is_running && self.state.mode == TimerMode::Focus {
                    self.left_at = Some(now);
                }
            }
            TimerCommand::AppVisible => self.returned(now, &mut effects),
        }
        Ok(effects)
    }

    fn start(&mut self, task: Option<String>, now: DateTime<Utc>, effects: &mut Vec<TimerEffect>) {
        if self.state.is_running {
            return;
        }
        if matches!(self.state.mode, TimerMode::Idle | TimerMode::Focus) {
            self.state.tree_health = MAX_TREE_HEALTH;
        }
        if self.state.mode == TimerMode::Idle {
            self.state.mode = TimerMode::Focus;
        }
        if let Some(task) = task
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            self.state.current_task = Some(task.to_string());
        }
        self.state.is_running = true;

        if self.state.mode != TimerMode::Focus {
            self.end_run();
            return;
        }
        self.state.session_start_time = Some(now);
        self.state.run_length = self.state.time_left;

        let label = self
            .state
            .current_task
            .clone()
            .unwrap_or_else(|| "Focus Session".to_string());
        effects.push(TimerEffect::ScheduleNotification(Notification {
            id: FOCUS_ALERT_ID.to_string(),
            title: "Focus Time Complete!".to_string(),
            body: format!("Your {label} session is complete."),
            at: now + Duration::seconds(i64::from(self.state.time_left)),
            sound: None,
            urgent: false,
        }));
    }

    fn pause(&mut self, now: DateTime<Utc>, effects: &mut Vec<TimerEffect>) {
        if !self.state.is_running {
            return;
        }
        effects.push(TimerEffect::StopSound(SoundCue::TimerTick));
        self.cancel_focus_alert(effects);
        if self.state.mode == TimerMode::Focus {
            if let Some(started) = self.state.session_start_time {
                let elapsed = (now - started).num_seconds();
                if elapsed > PARTIAL_SESSION_MIN_SECONDS {
                    let duration = u32::try_from(elapsed).unwrap_or(u32::MAX);
                    let session = self.record_session(duration, false, now);
                    effects.push(TimerEffect::SessionRecorded(session));
                }
            }
        }
        self.state.is_running = false;
        self.end_run();
    }

    fn tick(&mut self, now: DateTime<Utc>, effects: &mut Vec<TimerEffect>) {
        if !self.state.is_running {
            return;
        }
        if self.state.time_left > 1 {
            if self.state.time_left <= TICK_CUE_SECONDS {
                effects.push(TimerEffect::PlaySound(SoundCue::TimerTick));
            }
            self.state.time_left -= 1;
            return;
        }

        effects.push(TimerEffect::PlaySound(SoundCue::TimerComplete));
        match self.state.mode {
            TimerMode::Focus => {
                let duration = if self.state.run_length > 0 {
                    self.state.run_length
                } else {
                    self.state.focus_seconds()
                };
                let session = self.record_session(duration, true, now);
                self.state.sessions_completed += 1;
                self.update_streak(now);
                self.state.mode = TimerMode::Break;
                self.state.time_left = self.state.break_seconds();
                self.state.is_running = false;
                self.end_run();

                effects.push(TimerEffect::ScheduleNotification(Notification {
                    id: format!("complete-{}", now.timestamp_millis()),
                    title: "Focus Session Completed".to_string(),
                    body: format!(
                        "You completed a {} focus session{}!",
                        format_duration(session.duration),
                        session
                            .task
                            .as_deref()
                            .map(|task| format!(" for \"{task}\""))
                            .unwrap_or_default()
                    ),
                    at: now,
                    sound: None,
                    urgent: false,
                }));
                effects.push(TimerEffect::SessionRecorded(session));
                effects.push(TimerEffect::FocusCompleted);
            }
            TimerMode::Break => {
                self.state.mode = TimerMode::Focus;
                self.state.time_left = self.state.focus_seconds();
                self.state.is_running = false;
                self.end_run();
                effects.push(TimerEffect::BreakCompleted);
            }
            TimerMode::Idle => {
                self.state.time_left = 0;
                self.state.is_running = false;
            }
        }
    }

    fn returned(&mut self, now: DateTime<Utc>, effects: &mut Vec<TimerEffect>) {
        let Some(left_at) = self.left_at.take() else {
            return;
        };
        if !self.state.is_running || self.state.mode != TimerMode::Focus {
            return;
        }
        let away = (now - left_at).num_seconds();
        if away <= AWAY_GRACE_SECONDS {
            return;
        }
        let reduction = (away / AWAY_STEP_SECONDS).saturating_mul(HEALTH_LOST_PER_STEP);
        let health = clamp_health(i64::from(self.state.tree_health).saturating_sub(reduction));
        self.state.tree_health = health;
        if health == 0 {
            effects.push(TimerEffect::TreeDied);
        } else if health < WITHERING_BELOW {
            effects.push(TimerEffect::TreeWithering(health));
        }
    }

    fn record_session(&mut self, duration: u32, completed: bool, now: DateTime<Utc>) -> FocusSession {
        let session = FocusSession {
            id: format!(
                "session-{}-{}",
                now.timestamp_millis(),
                self.state.focus_sessions.len()
            ),
            date: now,
            duration,
            task: self.state.current_task.clone(),
            completed,
        };
        self.state.focus_sessions.push(session.clone());
        self.state.total_focus_time += u64::from(duration);
        session
    }

    fn update_streak(&mut self, now: DateTime<Utc>) {
        let today = now.with_timezone(&self.timezone).date_naive();
        if self.state.last_active_day != Some(today) {
            self.state.streak_days += 1;
        }
        self.state.last_active_day = Some(today);
    }

    /// Only a running focus interval has a pending alert.
    fn cancel_focus_alert(&self, effects: &mut Vec<TimerEffect>) {
        if self.state.is_running && self.state.mode == TimerMode::Focus {
            effects.push(TimerEffect::CancelNotification(FOCUS_ALERT_ID.to_string()));
        }
    }

    fn end_run(&mut self) {
        self.state.session_start_time = None;
        self.state.run_length = 0;
    }
}

fn validate_duration(minutes: u32, field_name: &str) -> Result<(), String> {
    if minutes == 0 || minutes > MAX_DURATION_MINUTES {
        return Err(format!(
            "{field_name} must be between 1 and {MAX_DURATION_MINUTES} minutes"
        ));
    }
    Ok(())
}

fn clamp_health(value: i64) -> u8 {
    value.clamp(0, i64::from(MAX_TREE_HEALTH)) as u8
}

/// "2 hours 5 minutes", "25 minutes" or "40 seconds".
pub fn format_duration(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let plural = |count: u32, unit: &str| {
        if count == 1 {
            format!("1 {unit}")
        } else {
            format!("{count} {unit}s")
        }
    };

    match (hours, minutes) {
        (0, 0) => plural(seconds, "second"),
        (0, minutes) => plural(minutes, "minute"),
        (hours, 0) => plural(hours, "hour"),
        (hours, minutes) => format!("{} {}", plural(hours, "hour"), plural(minutes, "minute")),
    }
}
