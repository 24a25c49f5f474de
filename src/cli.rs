use crate::application::commands::{
    AppState, app_hidden_impl, app_visible_impl, clear_all_data_impl, export_data_impl,
    pause_timer_impl, productivity_summary_impl, reflection_summary_impl, reset_timer_impl,
    reset_tree_health_impl, set_break_duration_impl, set_custom_sound_impl,
    set_focus_duration_impl, set_motivational_reminders_impl, set_urgent_notifications_impl,
    settings_impl, start_timer_impl, switch_to_break_impl, switch_to_focus_impl,
    timer_status_impl, update_streak_impl, update_tree_health_impl,
};
use crate::application::journal_commands::{
    MediaInput, ProcrastinationInput, VisionInput, add_journal_impl, add_media_impl,
    add_milestone_impl, add_procrastination_impl, add_vision_impl, daily_motivation_impl,
    delete_journal_impl, delete_media_impl, delete_milestone_impl, delete_procrastination_impl,
    delete_vision_impl, get_vision_impl, link_task_impl, list_procrastination_impl,
    list_vision_impl, mark_overcome_impl, procrastination_insights_impl, random_vision_impl,
    task_progress_impl, toggle_milestone_impl, unlink_task_impl, update_journal_impl,
    update_progress_impl,
};
use crate::application::task_commands::{
    add_category_impl, add_focus_time_impl, add_subtask_impl, add_task_impl,
    delete_subtask_impl, delete_task_impl, get_task_impl, list_categories_impl, list_tasks_impl,
    remove_category_impl, reset_tracked_time_impl, toggle_complete_impl, toggle_priority_impl,
    toggle_subtask_impl,
};
use crate::application::ticker::{TICK_PERIOD, run_until_interval_ends};
use crate::domain::models::{MediaKind, Mood, NewTask, Priority, Recurrence, parse_date};
use crate::domain::task_query::{SortDirection, SortField, TaskQuery};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::settings::SoundSlot;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "focusflow")]
#[command(about = "Focus timer, tasks, procrastination log and vision board")]
#[command(version)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    /// Directory holding config/ and state/
    #[arg(long, global = true, env = "FOCUSFLOW_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Focus timer
    Timer {
        #[command(subcommand)]
        action: TimerAction,
    },
    /// Task list
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },
    /// Procrastination log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
    /// Vision board
    Vision {
        #[command(subcommand)]
        action: VisionAction,
    },
    /// Reminder and sound preferences
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Productivity summary
    Stats,
    /// Completed and interrupted focus sessions in a window
    Reflect {
        /// RFC 3339 or YYYY-MM-DD (default: 7 days ago)
        #[arg(long)]
        start: Option<String>,
        /// RFC 3339 or YYYY-MM-DD (default: now)
        #[arg(long)]
        end: Option<String>,
    },
    /// Write tasks and procrastination entries to a JSON file
    Export {
        /// Output directory (default: <workspace>/exports)
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete every stored record
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Today's vision board reminder, at most once per day
    Motivation,
}

#[derive(Debug, Subcommand)]
pub enum TimerAction {
    Start {
        /// Task id or title to credit the session to
        #[arg(long)]
        task: Option<String>,
    },
    Pause,
    Reset,
    Status,
    /// Switch to break mode
    Break,
    /// Switch to focus mode
    Focus,
    /// Change interval lengths in minutes
    Duration {
        #[arg(long)]
        focus: Option<u32>,
        #[arg(long = "break")]
        break_minutes: Option<u32>,
    },
    /// The app went to the background
    Hidden,
    /// The app came back to the foreground
    Visible,
    Health {
        #[arg(allow_negative_numbers = true)]
        value: Option<i64>,
        #[arg(long, conflicts_with = "value")]
        reset: bool,
    },
    Streak,
    /// Start if needed and tick every second until the interval ends
    Run {
        #[arg(long)]
        task: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TaskAction {
    Add(TaskAddArgs),
    List(TaskListArgs),
    Show { id: String },
    /// Toggle completion
    Done { id: String },
    Delete { id: String },
    /// Toggle the priority star
    Star { id: String },
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },
    Category {
        #[command(subcommand)]
        action: CategoryAction,
    },
    ResetTime { id: String },
    /// Log focus minutes against a task
    Track {
        id: String,
        #[arg(long)]
        minutes: u32,
    },
}

#[derive(Debug, Args)]
pub struct TaskAddArgs {
    title: String,
    #[arg(long)]
    description: Option<String>,
    /// YYYY-MM-DD
    #[arg(long, value_parser = parse_date_arg)]
    due: Option<NaiveDate>,
    /// HH:MM, requires --due
    #[arg(long)]
    time: Option<String>,
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
    /// Estimated minutes
    #[arg(long)]
    duration: Option<u32>,
    #[arg(long, value_parser = parse_priority, default_value = "medium")]
    priority: Priority,
    #[arg(long)]
    category: Option<String>,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long, value_parser = parse_recurrence)]
    recurrence: Option<Recurrence>,
    /// Schedule a reminder at the due time
    #[arg(long)]
    notify: bool,
}

#[derive(Debug, Args)]
pub struct TaskListArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long, value_parser = parse_priority)]
    priority: Option<Priority>,
    #[arg(long, value_parser = parse_date_arg)]
    due: Option<NaiveDate>,
    #[arg(long)]
    recurring: bool,
    #[arg(long)]
    search: Option<String>,
    /// created, due, priority or category
    #[arg(long, value_parser = parse_sort_field, default_value = "created")]
    sort: SortField,
    /// asc or desc
    #[arg(long, value_parser = parse_direction, default_value = "desc")]
    direction: SortDirection,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    page_size: Option<usize>,
}

#[derive(Debug, Subcommand)]
pub enum SubtaskAction {
    Add { task_id: String, title: String },
    Toggle { task_id: String, subtask_id: String },
    Delete { task_id: String, subtask_id: String },
}

#[derive(Debug, Subcommand)]
pub enum CategoryAction {
    List,
    Add { name: String },
    Remove { name: String },
}

#[derive(Debug, Subcommand)]
pub enum LogAction {
    Add {
        reason: String,
        #[arg(long, value_parser = parse_mood)]
        mood: Option<Mood>,
        #[arg(long)]
        task_id: Option<String>,
        #[arg(long)]
        task_name: Option<String>,
    },
    /// Entries grouped by day
    List,
    /// Mood and outcome counts
    Insights,
    Overcome { id: String },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum VisionAction {
    Add(VisionAddArgs),
    List,
    Show { id: String },
    Delete { id: String },
    Random,
    Milestone {
        #[command(subcommand)]
        action: MilestoneAction,
    },
    Journal {
        #[command(subcommand)]
        action: JournalAction,
    },
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },
    Link { vision_id: String, task_id: String },
    Unlink { vision_id: String, task_id: String },
    /// Set the manual progress percentage
    Progress { vision_id: String, percentage: u32 },
    /// Percentage of linked tasks that are done
    TaskProgress { vision_id: String },
}

#[derive(Debug, Args)]
pub struct VisionAddArgs {
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long)]
    image: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    importance: Option<String>,
    #[arg(long)]
    criteria: Option<String>,
    #[arg(long, value_parser = parse_date_arg)]
    target: Option<NaiveDate>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum MilestoneAction {
    Add {
        vision_id: String,
        title: String,
        #[arg(long, value_parser = parse_date_arg)]
        due: NaiveDate,
        #[arg(long)]
        notes: Option<String>,
    },
    Toggle { vision_id: String, milestone_id: String },
    Delete { vision_id: String, milestone_id: String },
}

#[derive(Debug, Subcommand)]
pub enum JournalAction {
    Add {
        vision_id: String,
        content: String,
        #[arg(long)]
        prompt: Option<String>,
    },
    Edit {
        vision_id: String,
        journal_id: String,
        content: String,
    },
    Delete { vision_id: String, journal_id: String },
}

#[derive(Debug, Subcommand)]
pub enum MediaAction {
    Add {
        vision_id: String,
        url: String,
        /// image, audio or video
        #[arg(long, value_parser = parse_media_kind)]
        kind: MediaKind,
        #[arg(long)]
        thumbnail: Option<String>,
        #[arg(long)]
        mime_type: Option<String>,
    },
    Delete { vision_id: String, media_id: String },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    Show,
    Reminders {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    Urgent {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Custom sound file for task or timer notifications; omit to restore the default
    Sound {
        #[arg(value_parser = parse_sound_slot)]
        slot: SoundSlot,
        file: Option<String>,
    },
}

impl Commands {
    /// Name used when logging a failed command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Timer { .. } => "timer",
            Self::Task { .. } => "task",
            Self::Log { .. } => "log",
            Self::Vision { .. } => "vision",
            Self::Settings { .. } => "settings",
            Self::Stats => "stats",
            Self::Reflect { .. } => "reflect",
            Self::Export { .. } => "export",
            Self::Clear { .. } => "clear",
            Self::Motivation => "motivation",
        }
    }
}

pub async fn dispatch(state: &AppState, command: Commands) -> Result<(), InfraError> {
    match command {
        Commands::Timer { action } => timer(state, action).await,
        Commands::Task { action } => task(state, action).await,
        Commands::Log { action } => log(state, action),
        Commands::Vision { action } => vision(state, action),
        Commands::Settings { action } => settings(state, action),
        Commands::Stats => emit(&productivity_summary_impl(state)?),
        Commands::Reflect { start, end } => emit(&reflection_summary_impl(state, start, end)?),
        Commands::Export { dir } => emit(&export_data_impl(state, dir)?),
        Commands::Clear { yes } => {
            if !yes {
                return Err(InfraError::InvalidInput(
                    "refusing to clear all data without --yes".to_string(),
                ));
            }
            clear_all_data_impl(state)?;
            emit(&serde_json::json!({ "cleared": true }))
        }
        Commands::Motivation => emit(&daily_motivation_impl(state)?),
    }
}

async fn timer(state: &AppState, action: TimerAction) -> Result<(), InfraError> {
    match action {
        TimerAction::Start { task } => emit(&start_timer_impl(state, task).await?),
        TimerAction::Pause => emit(&pause_timer_impl(state).await?),
        TimerAction::Reset => emit(&reset_timer_impl(state).await?),
        TimerAction::Status => emit(&timer_status_impl(state)?),
        TimerAction::Break => emit(&switch_to_break_impl(state).await?),
        TimerAction::Focus => emit(&switch_to_focus_impl(state).await?),
        TimerAction::Duration {
            focus,
            break_minutes,
        } => {
            if focus.is_none() && break_minutes.is_none() {
                return Err(InfraError::InvalidInput(
                    "pass --focus and/or --break".to_string(),
                ));
            }
            if let Some(minutes) = focus {
                set_focus_duration_impl(state, minutes).await?;
            }
            if let Some(minutes) = break_minutes {
                set_break_duration_impl(state, minutes).await?;
            }
            emit(&timer_status_impl(state)?)
        }
        TimerAction::Hidden => emit(&app_hidden_impl(state).await?),
        TimerAction::Visible => emit(&app_visible_impl(state).await?),
        TimerAction::Health { value, reset } => match (value, reset) {
            (_, true) => emit(&reset_tree_health_impl(state).await?),
            (Some(value), false) => emit(&update_tree_health_impl(state, value).await?),
            (None, false) => emit(&timer_status_impl(state)?.tree_health),
        },
        TimerAction::Streak => emit(&update_streak_impl(state).await?),
        TimerAction::Run { task } => {
            if !timer_status_impl(state)?.is_running {
                start_timer_impl(state, task).await?;
            }
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            emit(&run_until_interval_ends(state, TICK_PERIOD, shutdown).await?)
        }
    }
}

async fn task(state: &AppState, action: TaskAction) -> Result<(), InfraError> {
    match action {
        TaskAction::Add(args) => {
            let input = NewTask {
                title: args.title,
                description: args.description,
                due_date: args.due,
                due_time: args.time,
                start_time: args.start,
                end_time: args.end,
                duration: args.duration,
                priority: args.priority,
                category: args.category,
                tags: args.tags,
                recurrence: args.recurrence,
                has_notification: args.notify,
            };
            emit(&add_task_impl(state, input).await?)
        }
        TaskAction::List(args) => {
            let query = TaskQuery {
                category: args.category,
                priority: args.priority,
                due_date: args.due,
                recurring_only: args.recurring,
                search: args.search,
                sort_by: args.sort,
                direction: args.direction,
                page: args.page,
                page_size: args.page_size.unwrap_or(state.config().tasks_per_page),
            };
            emit(&list_tasks_impl(state, query)?)
        }
        TaskAction::Show { id } => emit(&get_task_impl(state, id)?),
        TaskAction::Done { id } => emit(&toggle_complete_impl(state, id).await?),
        TaskAction::Delete { id } => emit(&delete_task_impl(state, id).await?),
        TaskAction::Star { id } => emit(&toggle_priority_impl(state, id)?),
        TaskAction::Subtask { action } => match action {
            SubtaskAction::Add { task_id, title } => emit(&add_subtask_impl(state, task_id, title)?),
            SubtaskAction::Toggle {
                task_id,
                subtask_id,
            } => emit(&toggle_subtask_impl(state, task_id, subtask_id)?),
            SubtaskAction::Delete {
                task_id,
                subtask_id,
            } => emit(&delete_subtask_impl(state, task_id, subtask_id)?),
        },
        TaskAction::Category { action } => match action {
            CategoryAction::List => emit(&list_categories_impl(state)?),
            CategoryAction::Add { name } => emit(&add_category_impl(state, name)?),
            CategoryAction::Remove { name } => emit(&remove_category_impl(state, name)?),
        },
        TaskAction::ResetTime { id } => emit(&reset_tracked_time_impl(state, id)?),
        TaskAction::Track { id, minutes } => {
            emit(&add_focus_time_impl(state, id, minutes.saturating_mul(60))?)
        }
    }
}

fn log(state: &AppState, action: LogAction) -> Result<(), InfraError> {
    match action {
        LogAction::Add {
            reason,
            mood,
            task_id,
            task_name,
        } => emit(&add_procrastination_impl(
            state,
            ProcrastinationInput {
                reason,
                task_id,
                task_name,
                mood,
            },
        )?),
        LogAction::List => emit(&list_procrastination_impl(state)?),
        LogAction::Insights => emit(&procrastination_insights_impl(state)?),
        LogAction::Overcome { id } => emit(&mark_overcome_impl(state, id)?),
        LogAction::Delete { id } => emit(&delete_procrastination_impl(state, id)?),
    }
}

fn vision(state: &AppState, action: VisionAction) -> Result<(), InfraError> {
    match action {
        VisionAction::Add(args) => emit(&add_vision_impl(
            state,
            VisionInput {
                title: args.title,
                description: args.description,
                image_url: args.image,
                category: args.category,
                importance: args.importance,
                success_criteria: args.criteria,
                target_date: args.target,
                notes: args.notes,
            },
        )?),
        VisionAction::List => emit(&list_vision_impl(state)?),
        VisionAction::Show { id } => emit(&get_vision_impl(state, id)?),
        VisionAction::Delete { id } => emit(&delete_vision_impl(state, id)?),
        VisionAction::Random => emit(&random_vision_impl(state)?),
        VisionAction::Milestone { action } => match action {
            MilestoneAction::Add {
                vision_id,
                title,
                due,
                notes,
            } => emit(&add_milestone_impl(state, vision_id, title, due, notes)?),
            MilestoneAction::Toggle {
                vision_id,
                milestone_id,
            } => emit(&toggle_milestone_impl(state, vision_id, milestone_id)?),
            MilestoneAction::Delete {
                vision_id,
                milestone_id,
            } => emit(&delete_milestone_impl(state, vision_id, milestone_id)?),
        },
        VisionAction::Journal { action } => match action {
            JournalAction::Add {
                vision_id,
                content,
                prompt,
            } => emit(&add_journal_impl(state, vision_id, content, prompt)?),
            JournalAction::Edit {
                vision_id,
                journal_id,
                content,
            } => emit(&update_journal_impl(state, vision_id, journal_id, content)?),
            JournalAction::Delete {
                vision_id,
                journal_id,
            } => emit(&delete_journal_impl(state, vision_id, journal_id)?),
        },
        VisionAction::Media { action } => match action {
            MediaAction::Add {
                vision_id,
                url,
                kind,
                thumbnail,
                mime_type,
            } => emit(&add_media_impl(
                state,
                vision_id,
                MediaInput {
                    kind,
                    url,
                    thumbnail,
                    mime_type,
                },
            )?),
            MediaAction::Delete {
                vision_id,
                media_id,
            } => emit(&delete_media_impl(state, vision_id, media_id)?),
        },
        VisionAction::Link { vision_id, task_id } => {
            emit(&link_task_impl(state, vision_id, task_id)?)
        }
        VisionAction::Unlink { vision_id, task_id } => {
            emit(&unlink_task_impl(state, vision_id, task_id)?)
        }
        VisionAction::Progress {
            vision_id,
            percentage,
        } => emit(&update_progress_impl(state, vision_id, percentage)?),
        VisionAction::TaskProgress { vision_id } => emit(&task_progress_impl(state, vision_id)?),
    }
}

fn settings(state: &AppState, action: SettingsAction) -> Result<(), InfraError> {
    match action {
        SettingsAction::Show => emit(&settings_impl(state)?),
        SettingsAction::Reminders { enabled } => {
            emit(&set_motivational_reminders_impl(state, enabled)?)
        }
        SettingsAction::Urgent { enabled } => emit(&set_urgent_notifications_impl(state, enabled)?),
        SettingsAction::Sound { slot, file } => emit(&set_custom_sound_impl(state, slot, file)?),
    }
}

fn emit<T: Serialize + ?Sized>(value: &T) -> Result<(), InfraError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_date_arg(value: &str) -> Result<NaiveDate, String> {
    parse_date(value, "date")
}

fn parse_priority(value: &str) -> Result<Priority, String> {
    Priority::parse(value).ok_or_else(|| "expected high, medium or low".to_string())
}

fn parse_recurrence(value: &str) -> Result<Recurrence, String> {
    Recurrence::parse(value).ok_or_else(|| "expected daily, weekly or monthly".to_string())
}

fn parse_mood(value: &str) -> Result<Mood, String> {
    Mood::parse(value)
        .ok_or_else(|| "expected frustrated, bored, anxious, tired or distracted".to_string())
}

fn parse_media_kind(value: &str) -> Result<MediaKind, String> {
    MediaKind::parse(value).ok_or_else(|| "expected image, audio or video".to_string())
}

fn parse_sort_field(value: &str) -> Result<SortField, String> {
    SortField::parse(value).ok_or_else(|| "expected created, due, priority or category".to_string())
}

fn parse_direction(value: &str) -> Result<SortDirection, String> {
    SortDirection::parse(value).ok_or_else(|| "expected asc or desc".to_string())
}

fn parse_sound_slot(value: &str) -> Result<SoundSlot, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "task" => Ok(SoundSlot::Task),
        "timer" => Ok(SoundSlot::Timer),
        _ => Err("expected task or timer".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_task_add_with_flags() {
        let cli = Cli::try_parse_from([
            "focusflow",
            "--workspace",
            "/tmp/ff",
            "task",
            "add",
            "Write report",
            "--due",
            "2026-03-02",
            "--time",
            "09:30",
            "--priority",
            "HIGH",
            "--tag",
            "q1",
            "--tag",
            "draft",
            "--recurrence",
            "weekly",
            "--notify",
        ])
        .expect("parse");
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ff")));
        let Commands::Task {
            action: TaskAction::Add(args),
        } = cli.command
        else {
            panic!("expected task add");
        };
        assert_eq!(args.priority, Priority::High);
        assert_eq!(args.tags, vec!["q1".to_string(), "draft".to_string()]);
        assert_eq!(args.recurrence, Some(Recurrence::Weekly));
        assert!(args.notify);
    }

    #[test]
    fn rejects_unknown_mood_and_sort() {
        assert!(Cli::try_parse_from(["focusflow", "log", "add", "Phone", "--mood", "sleepy"]).is_err());
        assert!(Cli::try_parse_from(["focusflow", "task", "list", "--sort", "size"]).is_err());
    }

    #[test]
    fn health_accepts_negative_values() {
        let cli = Cli::try_parse_from(["focusflow", "timer", "health", "-20"]).expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Timer {
                action: TimerAction::Health {
                    value: Some(-20),
                    reset: false
                }
            }
        ));
    }

    #[tokio::test]
    async fn clear_requires_confirmation() {
        let harness = crate::application::commands::tests::TestHarness::new();
        let state = harness.app_state();
        let result = dispatch(&state, Commands::Clear { yes: false }).await;
        assert!(matches!(result, Err(InfraError::InvalidInput(_))));
    }
}
