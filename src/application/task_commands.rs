use crate::application::commands::{AppState, RuntimeState, local_datetime, lock_runtime, next_id};
use crate::domain::models::{
    FocusSession, NewTask, Notification, Priority, SubTask, Task, parse_hhmm, validate_non_empty,
};
use crate::domain::task_query::{TaskPage, TaskQuery};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::settings::SoundSlot;
use chrono::NaiveTime;
use serde::Serialize;

const DEFAULT_TASK_SOUND: &str = "beep.wav";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub task: Task,
    /// Set when completing a recurring task opened its next occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_occurrence: Option<Task>,
    pub warnings: Vec<String>,
}

pub async fn add_task_impl(state: &AppState, input: NewTask) -> Result<TaskResponse, InfraError> {
    input.validate().map_err(InfraError::InvalidInput)?;
    let task = input.into_task(next_id("task"), state.now());

    {
        let mut runtime = lock_runtime(state)?;
        runtime.tasks.insert(0, task.clone());
        state.task_repository.save(&runtime.tasks)?;
    }

    let warnings = schedule_due_notification(state, &task).await?;
    state.log_info("add_task", &format!("created task_id={}", task.id));
    Ok(TaskResponse {
        task,
        next_occurrence: None,
        warnings,
    })
}

pub fn all_tasks_impl(state: &AppState) -> Result<Vec<Task>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.tasks.clone())
}

pub fn list_tasks_impl(state: &AppState, query: TaskQuery) -> Result<TaskPage, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(query.apply(&runtime.tasks))
}

pub fn get_task_impl(state: &AppState, task_id: String) -> Result<Task, InfraError> {
    let task_id = required_id(&task_id, "task_id")?;
    let runtime = lock_runtime(state)?;
    runtime
        .tasks
        .iter()
        .find(|task| task.id == task_id)
        .cloned()
        .ok_or_else(|| task_not_found(task_id))
}

/// Replaces the stored record with the same id.
pub fn update_task_impl(state: &AppState, task: Task) -> Result<Task, InfraError> {
    task.validate().map_err(InfraError::InvalidInput)?;

    let mut runtime = lock_runtime(state)?;
    let Some(slot) = runtime.tasks.iter_mut().find(|candidate| candidate.id == task.id) else {
        return Err(task_not_found(&task.id));
    };
    *slot = task.clone();
    state.task_repository.save(&runtime.tasks)?;
    drop(runtime);

    state.log_info("update_task", &format!("updated task_id={}", task.id));
    Ok(task)
}

pub async fn delete_task_impl(state: &AppState, task_id: String) -> Result<bool, InfraError> {
    let task_id = required_id(&task_id, "task_id")?;

    let removed = {
        let mut runtime = lock_runtime(state)?;
        let Some(index) = runtime.tasks.iter().position(|task| task.id == task_id) else {
            return Ok(false);
        };
        let removed = runtime.tasks.remove(index);
        state.task_repository.save(&runtime.tasks)?;
        removed
    };

    if removed.has_notification {
        state.cancel_notification(&due_notification_id(&removed)).await;
    }
    state.log_info("delete_task", &format!("deleted task_id={task_id}"));
    Ok(true)
}

pub async fn toggle_complete_impl(
    state: &AppState,
    task_id: String,
) -> Result<TaskResponse, InfraError> {
    let task_id = required_id(&task_id, "task_id")?;
    let now = state.now();
    let today = state.today();

    let (task, next_occurrence) = {
        let mut runtime = lock_runtime(state)?;
        let task = {
            let task = find_task_mut(&mut runtime, task_id)?;
            task.completed = !task.completed;
            task.completed_at = task.completed.then_some(now);
            task.clone()
        };

        let next_occurrence = if task.completed {
            task.next_occurrence(next_id("task"), now, today)
        } else {
            None
        };
        if let Some(next) = &next_occurrence {
            runtime.tasks.insert(0, next.clone());
        }
        state.task_repository.save(&runtime.tasks)?;
        (task, next_occurrence)
    };

    let mut warnings = Vec::new();
    if let Some(next) = &next_occurrence {
        warnings = schedule_due_notification(state, next).await?;
        state.log_info(
            "toggle_complete",
            &format!("task_id={} spawned next occurrence {}", task.id, next.id),
        );
    }
    state.log_info(
        "toggle_complete",
        &format!("task_id={} completed={}", task.id, task.completed),
    );
    Ok(TaskResponse {
        task,
        next_occurrence,
        warnings,
    })
}

pub fn toggle_priority_impl(state: &AppState, task_id: String) -> Result<Task, InfraError> {
    mutate_task(state, "toggle_priority", &task_id, |task| {
        task.is_priority = !task.is_priority;
        Ok(())
    })
}

pub fn add_subtask_impl(
    state: &AppState,
    task_id: String,
    title: String,
) -> Result<Task, InfraError> {
    validate_non_empty(&title, "subtask.title").map_err(InfraError::InvalidInput)?;
    mutate_task(state, "add_subtask", &task_id, |task| {
        task.subtasks.push(SubTask {
            id: next_id("subtask"),
            title: title.trim().to_string(),
            completed: false,
        });
        Ok(())
    })
}

pub fn toggle_subtask_impl(
    state: &AppState,
    task_id: String,
    subtask_id: String,
) -> Result<Task, InfraError> {
    mutate_task(state, "toggle_subtask", &task_id, |task| {
        let subtask = task
            .subtasks
            .iter_mut()
            .find(|subtask| subtask.id == subtask_id.trim())
            .ok_or_else(|| InfraError::NotFound(format!("subtask not found: {subtask_id}")))?;
        subtask.completed = !subtask.completed;
        Ok(())
    })
}

pub fn delete_subtask_impl(
    state: &AppState,
    task_id: String,
    subtask_id: String,
) -> Result<Task, InfraError> {
    mutate_task(state, "delete_subtask", &task_id, |task| {
        task.subtasks.retain(|subtask| subtask.id != subtask_id.trim());
        Ok(())
    })
}

pub fn reset_tracked_time_impl(state: &AppState, task_id: String) -> Result<Task, InfraError> {
    mutate_task(state, "reset_tracked_time", &task_id, |task| {
        task.total_time_spent = 0;
        task.focus_sessions.clear();
        Ok(())
    })
}

/// Logs `seconds` of completed focus against a task outside the timer.
pub fn add_focus_time_impl(
    state: &AppState,
    task_id: String,
    seconds: u32,
) -> Result<Task, InfraError> {
    if seconds == 0 {
        return Err(InfraError::InvalidInput(
            "focus time must be greater than 0".to_string(),
        ));
    }
    let now = state.now();
    mutate_task(state, "add_focus_time", &task_id, |task| {
        let session = FocusSession {
            id: next_id("session"),
            date: now,
            duration: seconds,
            task: Some(task.id.clone()),
            completed: true,
        };
        apply_focus_time(task, &session);
        Ok(())
    })
}

pub fn list_categories_impl(state: &AppState) -> Result<Vec<String>, InfraError> {
    state
        .settings
        .task_categories(&state.config().default_categories)
}

pub fn add_category_impl(state: &AppState, name: String) -> Result<Vec<String>, InfraError> {
    validate_non_empty(&name, "category").map_err(InfraError::InvalidInput)?;
    let name = name.trim();
    let mut categories = list_categories_impl(state)?;
    if categories.iter().any(|existing| existing.eq_ignore_ascii_case(name)) {
        return Ok(categories);
    }
    categories.push(name.to_string());
    state.settings.set_task_categories(&categories)?;
    state.log_info("add_category", &format!("added category={name}"));
    Ok(categories)
}

/// Drops the category from the list and from every task filed under it.
pub fn remove_category_impl(state: &AppState, name: String) -> Result<Vec<String>, InfraError> {
    let name = name.trim();
    let mut categories = list_categories_impl(state)?;
    categories.retain(|existing| existing != name);
    state.settings.set_task_categories(&categories)?;

    let mut runtime = lock_runtime(state)?;
    let mut cleared = 0;
    for task in runtime
        .tasks
        .iter_mut()
        .filter(|task| task.category.as_deref() == Some(name))
    {
        task.category = None;
        cleared += 1;
    }
    if cleared > 0 {
        state.task_repository.save(&runtime.tasks)?;
    }
    drop(runtime);

    state.log_info(
        "remove_category",
        &format!("removed category={name} cleared_tasks={cleared}"),
    );
    Ok(categories)
}

/// Credits a timer session to the task it was run for, matched by id first
/// and then by exact title. Returns whether a task changed.
pub(crate) fn attribute_session(tasks: &mut [Task], session: &FocusSession) -> bool {
    let Some(reference) = session.task.as_deref() else {
        return false;
    };
    let position = tasks
        .iter()
        .position(|task| task.id == reference)
        .or_else(|| tasks.iter().position(|task| task.title == reference));
    match position {
        Some(index) => {
            apply_focus_time(&mut tasks[index], session);
            true
        }
        None => false,
    }
}

fn apply_focus_time(task: &mut Task, session: &FocusSession) {
    task.total_time_spent += u64::from(session.duration);
    task.focus_sessions.push(session.clone());
}

fn mutate_task<F>(
    state: &AppState,
    command: &str,
    task_id: &str,
    mutation: F,
) -> Result<Task, InfraError>
where
    F: FnOnce(&mut Task) -> Result<(), InfraError>,
{
    let task_id = required_id(task_id, "task_id")?;
    let mut runtime = lock_runtime(state)?;
    let updated = {
        let task = find_task_mut(&mut runtime, task_id)?;
        mutation(task)?;
        task.clone()
    };
    state.task_repository.save(&runtime.tasks)?;
    drop(runtime);

    state.log_info(command, &format!("updated task_id={task_id}"));
    Ok(updated)
}

fn find_task_mut<'a>(runtime: &'a mut RuntimeState, task_id: &str) -> Result<&'a mut Task, InfraError> {
    runtime
        .tasks
        .iter_mut()
        .find(|task| task.id == task_id)
        .ok_or_else(|| task_not_found(task_id))
}

async fn schedule_due_notification(state: &AppState, task: &Task) -> Result<Vec<String>, InfraError> {
    let Some(notification) = due_notification(state, task)? else {
        return Ok(Vec::new());
    };
    Ok(state.deliver_notifications(&[notification]).await)
}

fn due_notification(state: &AppState, task: &Task) -> Result<Option<Notification>, InfraError> {
    if !task.has_notification {
        return Ok(None);
    }
    let Some(due_date) = task.due_date else {
        return Ok(None);
    };
    let time = task
        .due_time
        .as_deref()
        .and_then(parse_hhmm)
        .unwrap_or(NaiveTime::MIN);
    let Some(at) = local_datetime(state.timezone(), due_date, time) else {
        return Ok(None);
    };
    let sound = state
        .settings
        .custom_sound(SoundSlot::Task)?
        .unwrap_or_else(|| DEFAULT_TASK_SOUND.to_string());

    Ok(Some(Notification {
        id: due_notification_id(task),
        title: "Task Due".to_string(),
        body: format!("Task \"{}\" is due now!", task.title),
        at,
        sound: Some(sound),
        urgent: task.priority == Priority::High,
    }))
}

fn due_notification_id(task: &Task) -> String {
    format!("task-{}", task.id)
}

fn required_id<'a>(value: &'a str, field_name: &str) -> Result<&'a str, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidInput(format!("{field_name} must not be empty")));
    }
    Ok(value)
}

fn task_not_found(task_id: &str) -> InfraError {
    InfraError::NotFound(format!("task not found: {task_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::tests::{TestHarness, fixed_time};
    use crate::domain::models::Recurrence;
    use crate::domain::task_query::{SortDirection, SortField};
    use chrono::NaiveDate;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn titled(title: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            ..NewTask::default()
        }
    }

    #[tokio::test]
    async fn add_task_rejects_invalid_form() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let result = add_task_impl(&state, titled("   ")).await;
        assert!(matches!(result, Err(InfraError::InvalidInput(_))));

        let mut input = titled("Call dentist");
        input.due_time = Some("10:00".to_string());
        assert!(add_task_impl(&state, input).await.is_err());
        assert!(all_tasks_impl(&state).expect("tasks").is_empty());
    }

    #[tokio::test]
    async fn new_tasks_are_prepended_and_persisted() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        add_task_impl(&state, titled("First")).await.expect("first");
        add_task_impl(&state, titled("Second")).await.expect("second");

        let reopened = harness.app_state();
        let titles = all_tasks_impl(&reopened)
            .expect("tasks")
            .into_iter()
            .map(|task| task.title)
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Second".to_string(), "First".to_string()]);
    }

    #[tokio::test]
    async fn due_notification_uses_timezone_and_custom_sound() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        state
            .settings
            .set_custom_sound(SoundSlot::Task, Some("chime.mp3"))
            .expect("sound");

        let mut input = titled("Submit taxes");
        input.due_date = Some(date("2026-04-15"));
        input.due_time = Some("17:30".to_string());
        input.has_notification = true;
        let created = add_task_impl(&state, input).await.expect("add");
        assert!(created.warnings.is_empty());

        let scheduled = harness.notifier.scheduled();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].title, "Task Due");
        assert_eq!(scheduled[0].at, fixed_time("2026-04-15T17:30:00Z"));
        assert_eq!(scheduled[0].sound.as_deref(), Some("chime.mp3"));

        assert!(delete_task_impl(&state, created.task.id.clone()).await.expect("delete"));
        assert_eq!(
            harness.notifier.cancelled(),
            vec![format!("task-{}", created.task.id)]
        );
        assert!(!delete_task_impl(&state, created.task.id).await.expect("delete again"));
    }

    #[tokio::test]
    async fn urgent_style_requires_the_setting() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let mut input = titled("File appeal");
        input.due_date = Some(date("2026-03-10"));
        input.priority = Priority::High;
        input.has_notification = true;

        add_task_impl(&state, input.clone()).await.expect("add");
        state.settings.set_urgent_notifications(true).expect("enable urgent");
        add_task_impl(&state, input.clone()).await.expect("add urgent");
        input.priority = Priority::Low;
        add_task_impl(&state, input).await.expect("add low");

        let urgent = harness
            .notifier
            .scheduled()
            .iter()
            .map(|notification| notification.urgent)
            .collect::<Vec<_>>();
        assert_eq!(urgent, vec![false, true, false]);
    }

    #[tokio::test]
    async fn undated_reminder_schedules_nothing() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let mut input = titled("Someday");
        input.has_notification = true;
        add_task_impl(&state, input).await.expect("add");
        assert!(harness.notifier.scheduled().is_empty());
    }

    #[tokio::test]
    async fn toggle_complete_sets_and_clears_completed_at() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let task = add_task_impl(&state, titled("Laundry")).await.expect("add").task;

        let done = toggle_complete_impl(&state, task.id.clone()).await.expect("complete");
        assert!(done.task.completed);
        assert_eq!(done.task.completed_at, Some(fixed_time("2026-03-02T09:00:00Z")));
        assert!(done.next_occurrence.is_none());

        let reopened = toggle_complete_impl(&state, task.id).await.expect("reopen");
        assert!(!reopened.task.completed);
        assert_eq!(reopened.task.completed_at, None);
    }

    #[tokio::test]
    async fn completing_recurring_task_opens_next_occurrence() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let mut input = titled("Water plants");
        input.recurrence = Some(Recurrence::Daily);
        input.due_date = Some(date("2026-03-02"));
        let task = add_task_impl(&state, input).await.expect("add").task;
        add_subtask_impl(&state, task.id.clone(), "Balcony".to_string()).expect("subtask");

        let response = toggle_complete_impl(&state, task.id.clone()).await.expect("complete");
        let next = response.next_occurrence.expect("next occurrence");
        assert_ne!(next.id, task.id);
        assert_eq!(next.due_date, Some(date("2026-03-03")));
        assert!(!next.completed);

        let tasks = all_tasks_impl(&state).expect("tasks");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, next.id);
    }

    #[tokio::test]
    async fn subtasks_priority_and_tracked_time() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let task = add_task_impl(&state, titled("Thesis")).await.expect("add").task;

        let with_subtask =
            add_subtask_impl(&state, task.id.clone(), " Read papers ".to_string()).expect("add subtask");
        let subtask_id = with_subtask.subtasks[0].id.clone();
        assert_eq!(with_subtask.subtasks[0].title, "Read papers");

        let toggled =
            toggle_subtask_impl(&state, task.id.clone(), subtask_id.clone()).expect("toggle subtask");
        assert!(toggled.subtasks[0].completed);
        assert!(matches!(
            toggle_subtask_impl(&state, task.id.clone(), "missing".to_string()),
            Err(InfraError::NotFound(_))
        ));

        let starred = toggle_priority_impl(&state, task.id.clone()).expect("star");
        assert!(starred.is_priority);

        let tracked = add_focus_time_impl(&state, task.id.clone(), 600).expect("focus time");
        assert_eq!(tracked.total_time_spent, 600);
        assert_eq!(tracked.focus_sessions.len(), 1);

        let reset = reset_tracked_time_impl(&state, task.id.clone()).expect("reset");
        assert_eq!(reset.total_time_spent, 0);
        assert!(reset.focus_sessions.is_empty());

        let without = delete_subtask_impl(&state, task.id.clone(), subtask_id).expect("delete subtask");
        assert!(without.subtasks.is_empty());

        assert!(matches!(
            toggle_priority_impl(&state, "nope".to_string()),
            Err(InfraError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn update_task_replaces_record() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        let mut task = add_task_impl(&state, titled("Draft")).await.expect("add").task;
        task.title = "Final".to_string();
        task.priority = Priority::High;

        let updated = update_task_impl(&state, task.clone()).expect("update");
        assert_eq!(updated.title, "Final");
        assert_eq!(get_task_impl(&state, task.id.clone()).expect("get").priority, Priority::High);

        task.id = "missing".to_string();
        assert!(matches!(
            update_task_impl(&state, task),
            Err(InfraError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_tasks_filters_sorts_and_pages() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        for (title, priority, due) in [
            ("low", Priority::Low, "2026-03-05"),
            ("high", Priority::High, "2026-03-05"),
            ("high-early", Priority::High, "2026-03-03"),
        ] {
            let mut input = titled(title);
            input.priority = priority;
            input.due_date = Some(date(due));
            add_task_impl(&state, input).await.expect("add");
        }

        let page = list_tasks_impl(
            &state,
            TaskQuery {
                priority: Some(Priority::High),
                sort_by: SortField::DueDate,
                direction: SortDirection::Asc,
                page_size: 1,
                ..TaskQuery::default()
            },
        )
        .expect("list");
        assert_eq!(page.total, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.tasks[0].title, "high-early");
    }

    #[tokio::test]
    async fn categories_default_from_config_and_removal_clears_tasks() {
        let harness = TestHarness::new();
        let state = harness.app_state();
        assert_eq!(list_categories_impl(&state).expect("list").len(), 4);

        let categories = add_category_impl(&state, "Errands".to_string()).expect("add");
        assert!(categories.contains(&"Errands".to_string()));
        let again = add_category_impl(&state, "errands".to_string()).expect("add again");
        assert_eq!(again.len(), categories.len());

        let mut input = titled("Buy stamps");
        input.category = Some("Errands".to_string());
        let task = add_task_impl(&state, input).await.expect("add").task;

        let remaining = remove_category_impl(&state, "Errands".to_string()).expect("remove");
        assert!(!remaining.contains(&"Errands".to_string()));
        assert_eq!(get_task_impl(&state, task.id).expect("get").category, None);
    }

    #[test]
    fn session_attribution_prefers_id_then_title() {
        let mut tasks = vec![
            titled("Essay").into_task("a".to_string(), fixed_time("2026-03-01T08:00:00Z")),
            titled("a").into_task("b".to_string(), fixed_time("2026-03-01T08:00:00Z")),
        ];
        let mut session = FocusSession {
            id: "session-1".to_string(),
            date: fixed_time("2026-03-01T09:00:00Z"),
            duration: 300,
            task: Some("a".to_string()),
            completed: true,
        };
        assert!(attribute_session(&mut tasks, &session));
        assert_eq!(tasks[0].total_time_spent, 300);
        assert_eq!(tasks[1].total_time_spent, 0);

        session.task = Some("Essay".to_string());
        assert!(attribute_session(&mut tasks, &session));
        assert_eq!(tasks[0].total_time_spent, 600);

        session.task = Some("Unknown".to_string());
        assert!(!attribute_session(&mut tasks, &session));
        session.task = None;
        assert!(!attribute_session(&mut tasks, &session));
    }
}
