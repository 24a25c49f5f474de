use crate::application::bootstrap::bootstrap_workspace;
use crate::application::task_commands::attribute_session;
use crate::domain::analytics::{
    ProductivitySummary, ReflectionSummary, productivity_summary, reflection_summary,
};
use crate::domain::models::{Notification, ProcrastinationEntry, Task, VisionBoardEntry};
use crate::domain::timer::{TimerCommand, TimerEffect, TimerMachine, TimerState};
use crate::infrastructure::collections::{
    JsonListRepository, PROCRASTINATION_KEY, TASKS_KEY, VisionBoardRepository,
};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::export::{ExportDocument, write_export};
use crate::infrastructure::kv_store::{KeyValueStore, SqliteKeyValueStore, StoreNamespace};
use crate::infrastructure::notifier::{LogNotifier, LogSoundPlayer, Notifier, SoundPlayer};
use crate::infrastructure::settings::{Settings, SettingsRepository, SoundSlot};
use crate::infrastructure::timer_repository::TimerRepository;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

/// Clock and platform capabilities the state is wired to.
pub struct Collaborators {
    pub now_provider: NowProvider,
    pub notifier: Arc<dyn Notifier>,
    pub sound: Arc<dyn SoundPlayer>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            now_provider: Arc::new(Utc::now),
            notifier: Arc::new(LogNotifier),
            sound: Arc::new(LogSoundPlayer),
        }
    }
}

pub struct AppState {
    workspace_root: PathBuf,
    config: AppConfig,
    timezone: Tz,
    local_store: Arc<dyn KeyValueStore>,
    indexed_store: Arc<dyn KeyValueStore>,
    pub(crate) timer_repository: TimerRepository,
    pub(crate) task_repository: JsonListRepository<Task>,
    pub(crate) procrastination_repository: JsonListRepository<ProcrastinationEntry>,
    pub(crate) vision_repository: VisionBoardRepository,
    pub(crate) settings: SettingsRepository,
    runtime: Mutex<RuntimeState>,
    now_provider: NowProvider,
    notifier: Arc<dyn Notifier>,
    sound: Arc<dyn SoundPlayer>,
}

pub(crate) struct RuntimeState {
    pub(crate) timer: TimerMachine,
    pub(crate) tasks: Vec<Task>,
    pub(crate) procrastination: Vec<ProcrastinationEntry>,
    pub(crate) vision: Vec<VisionBoardEntry>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        Self::with_collaborators(workspace_root, Collaborators::default())
    }

    pub fn with_collaborators(
        workspace_root: PathBuf,
        collaborators: Collaborators,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config = bootstrap.config;
        let timezone = config.tz()?;

        let local_store: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(
            &bootstrap.database_path,
            StoreNamespace::Local,
        ));
        let indexed_store: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(
            &bootstrap.database_path,
            StoreNamespace::Indexed,
        ));
        let timer_repository = TimerRepository::new(Arc::clone(&local_store));
        let task_repository = JsonListRepository::new(Arc::clone(&local_store), TASKS_KEY);
        let procrastination_repository =
            JsonListRepository::new(Arc::clone(&local_store), PROCRASTINATION_KEY);
        let vision_repository =
            VisionBoardRepository::new(Arc::clone(&local_store), Arc::clone(&indexed_store));
        let settings = SettingsRepository::new(Arc::clone(&local_store));

        let now = (collaborators.now_provider)();
        let timer_state = timer_repository.load(now, default_timer_state(&config))?;
        let left_at = timer_repository.load_left_at()?;
        let runtime = RuntimeState {
            timer: TimerMachine::new(timer_state, timezone).with_left_at(left_at),
            tasks: task_repository.load()?,
            procrastination: procrastination_repository.load()?,
            vision: vision_repository.load()?,
        };
        info!(
            app = %config.app_name,
            workspace = %workspace_root.display(),
            database = %bootstrap.database_path.display(),
            tasks = runtime.tasks.len(),
            procrastination = runtime.procrastination.len(),
            vision = runtime.vision.len(),
            "state loaded"
        );

        Ok(Self {
            workspace_root,
            config,
            timezone,
            local_store,
            indexed_store,
            timer_repository,
            task_repository,
            procrastination_repository,
            vision_repository,
            settings,
            runtime: Mutex::new(runtime),
            now_provider: collaborators.now_provider,
            notifier: collaborators.notifier,
            sound: collaborators.sound,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    /// Calendar day of `now` in the configured timezone.
    pub fn today(&self) -> NaiveDate {
        self.now().with_timezone(&self.timezone).date_naive()
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        info!(command, "{message}");
    }

    pub fn log_error(&self, command: &str, message: &str) {
        error!(command, "{message}");
    }

    /// Hands notifications to the platform. Failures never abort the calling
    /// command; they come back as warnings for the user.
    pub(crate) async fn deliver_notifications(&self, notifications: &[Notification]) -> Vec<String> {
        let mut warnings = Vec::new();
        let urgent_allowed = match self.settings.urgent_notifications() {
            Ok(enabled) => enabled,
            Err(error) => {
                warn!(%error, "failed to read urgent notification setting");
                false
            }
        };
        for notification in notifications {
            let notification = &Notification {
                urgent: notification.urgent && urgent_allowed,
                ..notification.clone()
            };
            match self.notifier.schedule(notification).await {
                Ok(()) => {}
                Err(InfraError::NotificationPermissionDenied) => {
                    warn!(id = %notification.id, "notification permission not granted");
                    let message =
                        "Notification permission not granted; reminders will not fire".to_string();
                    if !warnings.contains(&message) {
                        warnings.push(message);
                    }
                }
                Err(error) => {
                    warn!(id = %notification.id, %error, "failed to schedule notification");
                    warnings.push(format!("Failed to schedule \"{}\": {error}", notification.title));
                }
            }
        }
        warnings
    }

    pub(crate) async fn cancel_notification(&self, notification_id: &str) {
        if let Err(error) = self.notifier.cancel(notification_id).await {
            warn!(id = notification_id, %error, "failed to cancel notification");
        }
    }
}

fn default_timer_state(config: &AppConfig) -> TimerState {
    TimerState::with_durations(config.focus_duration_minutes, config.break_duration_minutes)
}

pub(crate) fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerResponse {
    pub timer: TimerState,
    /// Notable transitions, e.g. `focusCompleted` or `treeWithering:40`.
    pub events: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub path: String,
    pub tasks: usize,
    pub procrastination: usize,
}

pub fn timer_status_impl(state: &AppState) -> Result<TimerState, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.timer.state().clone())
}

pub async fn start_timer_impl(
    state: &AppState,
    task: Option<String>,
) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "start_timer", TimerCommand::Start { task }).await
}

pub async fn pause_timer_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "pause_timer", TimerCommand::Pause).await
}

pub async fn reset_timer_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "reset_timer", TimerCommand::Reset).await
}

pub async fn tick_timer_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "tick_timer", TimerCommand::Tick).await
}

pub async fn switch_to_break_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "switch_to_break", TimerCommand::SwitchToBreak).await
}

pub async fn switch_to_focus_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "switch_to_focus", TimerCommand::SwitchToFocus).await
}

pub async fn set_focus_duration_impl(
    state: &AppState,
    minutes: u32,
) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "set_focus_duration", TimerCommand::SetFocusDuration(minutes)).await
}

pub async fn set_break_duration_impl(
    state: &AppState,
    minutes: u32,
) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "set_break_duration", TimerCommand::SetBreakDuration(minutes)).await
}

pub async fn update_tree_health_impl(
    state: &AppState,
    health: i64,
) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "update_tree_health", TimerCommand::UpdateTreeHealth(health)).await
}

pub async fn reset_tree_health_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "reset_tree_health", TimerCommand::ResetTreeHealth).await
}

pub async fn update_streak_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "update_streak", TimerCommand::UpdateStreak).await
}

pub async fn app_hidden_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "app_hidden", TimerCommand::AppHidden).await
}

pub async fn app_visible_impl(state: &AppState) -> Result<TimerResponse, InfraError> {
    run_timer_command(state, "app_visible", TimerCommand::AppVisible).await
}

async fn run_timer_command(
    state: &AppState,
    command_name: &str,
    command: TimerCommand,
) -> Result<TimerResponse, InfraError> {
    let now = state.now();
    let is_tick = command == TimerCommand::Tick;

    let (snapshot, effects) = {
        let mut runtime = lock_runtime(state)?;
        let effects = runtime
            .timer
            .apply(command.clone(), now)
            .map_err(InfraError::InvalidInput)?;

        match command {
            TimerCommand::AppHidden => {
                if let Some(left_at) = runtime.timer.left_at() {
                    state.timer_repository.save_left_at(left_at)?;
                }
            }
            TimerCommand::AppVisible => state.timer_repository.clear_left_at()?,
            _ => {}
        }

        let mut tasks_changed = false;
        for effect in &effects {
            if let TimerEffect::SessionRecorded(session) = effect {
                tasks_changed |= attribute_session(&mut runtime.tasks, session);
            }
        }
        if tasks_changed {
            state.task_repository.save(&runtime.tasks)?;
        }

        let snapshot = runtime.timer.state().clone();
        state.timer_repository.save(&snapshot, now)?;
        (snapshot, effects)
    };

    let mut events = Vec::new();
    let mut notifications = Vec::new();
    let mut cancelled = Vec::new();
    for effect in effects {
        match effect {
            TimerEffect::PlaySound(cue) => state.sound.play(cue),
            TimerEffect::StopSound(cue) => state.sound.stop(cue),
            TimerEffect::SessionRecorded(session) => {
                info!(
                    session_id = %session.id,
                    duration = session.duration,
                    completed = session.completed,
                    "focus session recorded"
                );
                events.push(format!("sessionRecorded:{}", session.id));
            }
            TimerEffect::FocusCompleted => events.push("focusCompleted".to_string()),
            TimerEffect::BreakCompleted => events.push("breakCompleted".to_string()),
            TimerEffect::TreeWithering(health) => events.push(format!("treeWithering:{health}")),
            TimerEffect::TreeDied => events.push("treeDied".to_string()),
            TimerEffect::ScheduleNotification(mut notification) => {
                if notification.sound.is_none() {
                    notification.sound = state.settings.custom_sound(SoundSlot::Timer)?;
                }
                notifications.push(notification);
            }
            TimerEffect::CancelNotification(id) => cancelled.push(id),
        }
    }
    for id in &cancelled {
        state.cancel_notification(id).await;
    }
    let warnings = state.deliver_notifications(&notifications).await;

    if is_tick && events.is_empty() {
        debug!(time_left = snapshot.time_left, mode = snapshot.mode.as_str(), "tick");
    } else {
        state.log_info(
            command_name,
            &format!(
                "mode={} time_left={} running={} events={}",
                snapshot.mode.as_str(),
                snapshot.time_left,
                snapshot.is_running,
                events.join(",")
            ),
        );
    }

    Ok(TimerResponse {
        timer: snapshot,
        events,
        warnings,
    })
}

pub fn settings_impl(state: &AppState) -> Result<Settings, InfraError> {
    state.settings.load(&state.config().default_categories)
}

pub fn set_motivational_reminders_impl(state: &AppState, enabled: bool) -> Result<Settings, InfraError> {
    state.settings.set_show_motivational_reminders(enabled)?;
    state.log_info("set_motivational_reminders", &format!("enabled={enabled}"));
    settings_impl(state)
}

pub fn set_urgent_notifications_impl(state: &AppState, enabled: bool) -> Result<Settings, InfraError> {
    state.settings.set_urgent_notifications(enabled)?;
    state.log_info("set_urgent_notifications", &format!("enabled={enabled}"));
    settings_impl(state)
}

/// `None` restores the bundled sound.
pub fn set_custom_sound_impl(
    state: &AppState,
    slot: SoundSlot,
    file_name: Option<String>,
) -> Result<Settings, InfraError> {
    state.settings.set_custom_sound(slot, file_name.as_deref())?;
    state.log_info(
        "set_custom_sound",
        &format!("slot={slot:?} file={}", file_name.as_deref().unwrap_or("default")),
    );
    settings_impl(state)
}

pub fn productivity_summary_impl(state: &AppState) -> Result<ProductivitySummary, InfraError> {
    let today = state.today();
    let runtime = lock_runtime(state)?;
    Ok(productivity_summary(
        &runtime.tasks,
        runtime.timer.state(),
        &runtime.procrastination,
        today,
        state.timezone(),
    ))
}

pub fn reflection_summary_impl(
    state: &AppState,
    start: Option<String>,
    end: Option<String>,
) -> Result<ReflectionSummary, InfraError> {
    let now = state.now();
    let start = match start {
        Some(raw) => parse_datetime_input(state, &raw, "start")?,
        None => now - Duration::days(7),
    };
    let end = match end {
        Some(raw) => parse_datetime_input(state, &raw, "end")?,
        None => now,
    };

    let runtime = lock_runtime(state)?;
    reflection_summary(&runtime.timer.state().focus_sessions, start, end)
        .map_err(InfraError::InvalidInput)
}

pub fn export_data_impl(
    state: &AppState,
    directory: Option<PathBuf>,
) -> Result<ExportResponse, InfraError> {
    let directory = directory.unwrap_or_else(|| state.workspace_root().join("exports"));
    let document = {
        let runtime = lock_runtime(state)?;
        ExportDocument {
            tasks: runtime.tasks.clone(),
            procrastination: runtime.procrastination.clone(),
            export_date: state.now(),
        }
    };

    let path = write_export(&directory, &document)?;
    state.log_info("export_data", &format!("exported to {}", path.display()));
    Ok(ExportResponse {
        path: path.display().to_string(),
        tasks: document.tasks.len(),
        procrastination: document.procrastination.len(),
    })
}

/// Wipes both stores and returns every collection to its initial value.
pub fn clear_all_data_impl(state: &AppState) -> Result<(), InfraError> {
    let mut runtime = lock_runtime(state)?;
    state.local_store.clear()?;
    state.indexed_store.clear()?;

    runtime.timer = TimerMachine::new(default_timer_state(state.config()), state.timezone());
    runtime.tasks.clear();
    runtime.procrastination.clear();
    runtime.vision.clear();
    drop(runtime);

    state.log_info("clear_all_data", "cleared all stored data");
    Ok(())
}

/// Accepts RFC 3339 or a bare `YYYY-MM-DD`, read as midnight in the
/// configured timezone.
pub(crate) fn parse_datetime_input(
    state: &AppState,
    value: &str,
    field_name: &str,
) -> Result<DateTime<Utc>, InfraError> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        InfraError::InvalidInput(format!("{field_name} must be RFC3339 or YYYY-MM-DD"))
    })?;
    local_datetime(state.timezone(), date, NaiveTime::MIN)
        .ok_or_else(|| InfraError::InvalidInput(format!("{field_name} does not exist in timezone")))
}

pub(crate) fn local_datetime(timezone: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    date.and_time(time)
        .and_local_timezone(timezone)
        .earliest()
        .map(|value| value.with_timezone(&Utc))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::models::NewTask;
    use crate::domain::timer::{FOCUS_ALERT_ID, SoundCue, TimerMode};
    use crate::infrastructure::notifier::{RecordingNotifier, RecordingSoundPlayer};
    use std::fs;

    /// A workspace on disk plus a clock the test moves by hand.
    pub(crate) struct TestHarness {
        pub(crate) dir: tempfile::TempDir,
        pub(crate) clock: Arc<Mutex<DateTime<Utc>>>,
        pub(crate) notifier: Arc<RecordingNotifier>,
        pub(crate) sound: Arc<RecordingSoundPlayer>,
    }

    impl TestHarness {
        pub(crate) fn new() -> Self {
            Self::with_notifier(RecordingNotifier::default())
        }

        pub(crate) fn with_notifier(notifier: RecordingNotifier) -> Self {
            Self {
                dir: tempfile::tempdir().expect("temp dir"),
                clock: Arc::new(Mutex::new(fixed_time("2026-03-02T09:00:00Z"))),
                notifier: Arc::new(notifier),
                sound: Arc::new(RecordingSoundPlayer::default()),
            }
        }

        pub(crate) fn app_state(&self) -> AppState {
            let clock = Arc::clone(&self.clock);
            AppState::with_collaborators(
                self.dir.path().to_path_buf(),
                Collaborators {
                    now_provider: Arc::new(move || *clock.lock().expect("clock")),
                    notifier: self.notifier.clone(),
                    sound: self.sound.clone(),
                },
            )
            .expect("initialize app state")
        }

        pub(crate) fn advance(&self, seconds: i64) {
            let mut clock = self.clock.lock().expect("clock");
            *clock += Duration::seconds(seconds);
        }
    }

    pub(crate) fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    async fn tick_n(state: &AppState, harness: &TestHarness, count: u32) -> Vec<String> {
        let mut events = Vec::new();
        for _ in 0..count {
            harness.advance(1);
            events.extend(tick_timer_impl(state).await.expect("tick").events);
        }
        events
    }

    #[tokio::test]
    async fn full_focus_interval_records_session_and_credits_task() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let task = crate::application::task_commands::add_task_impl(
            &state,
            NewTask {
                title: "Write chapter".to_string(),
                ..NewTask::default()
            },
        )
        .await
        .expect("add task")
        .task;

        let started = start_timer_impl(&state, Some(task.id.clone()))
            .await
            .expect("start");
        assert_eq!(started.timer.mode, TimerMode::Focus);
        assert_eq!(harness.notifier.scheduled().len(), 1);

        let events = tick_n(&state, &harness, 1500).await;
        assert!(events.contains(&"focusCompleted".to_string()));

        let timer = timer_status_impl(&state).expect("status");
        assert_eq!(timer.mode, TimerMode::Break);
        assert_eq!(timer.sessions_completed, 1);
        assert_eq!(timer.total_focus_time, 1500);
        assert_eq!(timer.streak_days, 1);
        assert!(harness.sound.played().contains(&SoundCue::TimerComplete));
        assert_eq!(harness.notifier.scheduled().len(), 2);

        let tasks = crate::application::task_commands::all_tasks_impl(&state).expect("tasks");
        assert_eq!(tasks[0].total_time_spent, 1500);
        assert_eq!(tasks[0].focus_sessions.len(), 1);
    }

    #[tokio::test]
    async fn timer_state_survives_restart_with_elapsed_time() {
        let harness = TestHarness::new();
        {
            let state = harness.app_state();
            start_timer_impl(&state, None).await.expect("start");
            tick_n(&state, &harness, 10).await;
        }

        harness.advance(120);
        let reopened = harness.app_state();
        let timer = timer_status_impl(&reopened).expect("status");
        assert!(timer.is_running);
        assert_eq!(timer.time_left, 1500 - 10 - 120);
    }

    #[tokio::test]
    async fn visibility_changes_survive_restart_and_cost_health() {
        let harness = TestHarness::new();
        {
            let state = harness.app_state();
            start_timer_impl(&state, None).await.expect("start");
            app_hidden_impl(&state).await.expect("hidden");
        }

        harness.advance(60);
        let state = harness.app_state();
        let response = app_visible_impl(&state).await.expect("visible");
        assert_eq!(response.timer.tree_health, 70);
        assert!(response.events.is_empty());
        assert_eq!(state.timer_repository.load_left_at().expect("left at"), None);
    }

    #[tokio::test]
    async fn pause_records_partial_session() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        start_timer_impl(&state, Some("Reading".to_string()))
            .await
            .expect("start");
        tick_n(&state, &harness, 30).await;

        let paused = pause_timer_impl(&state).await.expect("pause");
        assert!(!paused.timer.is_running);
        assert_eq!(paused.timer.focus_sessions.len(), 1);
        assert!(!paused.timer.focus_sessions[0].completed);
        assert_eq!(paused.timer.focus_sessions[0].duration, 30);
        assert!(paused.events[0].starts_with("sessionRecorded:"));
        assert_eq!(harness.sound.stopped(), vec![SoundCue::TimerTick]);
        assert_eq!(harness.notifier.cancelled(), vec![FOCUS_ALERT_ID.to_string()]);

        start_timer_impl(&state, None).await.expect("resume");
        reset_timer_impl(&state).await.expect("reset");
        let scheduled: Vec<String> = harness
            .notifier
            .scheduled()
            .into_iter()
            .map(|notification| notification.id)
            .collect();
        assert_eq!(scheduled, vec![FOCUS_ALERT_ID.to_string(); 2]);
        assert_eq!(harness.notifier.cancelled(), vec![FOCUS_ALERT_ID.to_string(); 2]);
    }

    #[tokio::test]
    async fn shortening_focus_mid_run_keeps_history_across_restart() {
        let harness = TestHarness::new();
        {
            let state = harness.app_state();
            start_timer_impl(&state, None).await.expect("start");
            tick_n(&state, &harness, 30).await;
            pause_timer_impl(&state).await.expect("pause");
            start_timer_impl(&state, None).await.expect("resume");
            let shortened = set_focus_duration_impl(&state, 10).await.expect("shorten");
            assert_eq!(shortened.timer.time_left, 1470);
            assert_eq!(shortened.timer.focus_duration, 10);
        }

        let reopened = harness.app_state();
        let timer = timer_status_impl(&reopened).expect("status");
        assert_eq!(timer.mode, TimerMode::Focus);
        assert!(timer.is_running);
        assert_eq!(timer.focus_sessions.len(), 1);
        assert_eq!(timer.total_focus_time, 30);
        assert_eq!(timer.focus_duration, 10);
    }

    #[tokio::test]
    async fn invalid_duration_is_rejected() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let result = set_focus_duration_impl(&state, 0).await;
        assert!(matches!(result, Err(InfraError::InvalidInput(_))));

        let updated = set_focus_duration_impl(&state, 45).await.expect("set");
        assert_eq!(updated.timer.time_left, 45 * 60);
    }

    #[tokio::test]
    async fn denied_notification_permission_is_a_warning() {
        let harness = TestHarness::with_notifier(RecordingNotifier::denying_permission());
        let state = harness.app_state();
        let response = start_timer_impl(&state, None).await.expect("start");
        assert!(response.timer.is_running);
        assert_eq!(response.warnings.len(), 1);
    }

    #[tokio::test]
    async fn clear_all_data_resets_everything() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        crate::application::task_commands::add_task_impl(
            &state,
            NewTask {
                title: "Temporary".to_string(),
                ..NewTask::default()
            },
        )
        .await
        .expect("add");
        start_timer_impl(&state, None).await.expect("start");

        clear_all_data_impl(&state).expect("clear");
        assert!(crate::application::task_commands::all_tasks_impl(&state)
            .expect("tasks")
            .is_empty());
        assert_eq!(timer_status_impl(&state).expect("status"), TimerState::default());

        let reopened = harness.app_state();
        assert!(crate::application::task_commands::all_tasks_impl(&reopened)
            .expect("tasks")
            .is_empty());
    }

    #[tokio::test]
    async fn export_writes_current_collections() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        crate::application::task_commands::add_task_impl(
            &state,
            NewTask {
                title: "Export me".to_string(),
                ..NewTask::default()
            },
        )
        .await
        .expect("add");

        let exported = export_data_impl(&state, None).expect("export");
        assert_eq!(exported.tasks, 1);
        assert!(exported.path.ends_with("focusflow-export-2026-03-02.json"));
        let raw = fs::read_to_string(&exported.path).expect("read export");
        assert!(raw.contains("Export me"));
    }

    #[tokio::test]
    async fn reflection_defaults_to_last_week() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        start_timer_impl(&state, None).await.expect("start");
        tick_n(&state, &harness, 20).await;
        pause_timer_impl(&state).await.expect("pause");

        let summary = reflection_summary_impl(&state, None, None).expect("summary");
        assert_eq!(summary.interrupted_count, 1);
        assert_eq!(summary.completed_count, 0);

        let result = reflection_summary_impl(
            &state,
            Some("2026-03-02".to_string()),
            Some("2026-03-01".to_string()),
        );
        assert!(matches!(result, Err(InfraError::InvalidInput(_))));
    }

    #[test]
    fn settings_round_trip_through_commands() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let defaults = settings_impl(&state).expect("settings");
        assert!(defaults.show_motivational_reminders);
        assert!(!defaults.urgent_notifications);
        assert_eq!(defaults.task_categories, state.config().default_categories);

        set_motivational_reminders_impl(&state, false).expect("reminders");
        set_urgent_notifications_impl(&state, true).expect("urgent");
        let updated = set_custom_sound_impl(&state, SoundSlot::Timer, Some("gong.wav".to_string()))
            .expect("sound");
        assert!(!updated.show_motivational_reminders);
        assert!(updated.urgent_notifications);
        assert_eq!(updated.custom_timer_sound.as_deref(), Some("gong.wav"));

        let reset = set_custom_sound_impl(&state, SoundSlot::Timer, None).expect("reset sound");
        assert_eq!(reset.custom_timer_sound, None);
    }

    #[test]
    fn productivity_summary_reads_runtime_state() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let summary = productivity_summary_impl(&state).expect("summary");
        assert_eq!(summary.total_tasks, 0);
        assert_eq!(summary.daily.last().map(|day| day.date), Some(state.today()));
    }
}
