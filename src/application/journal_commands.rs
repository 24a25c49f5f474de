use crate::application::commands::{AppState, RuntimeState, lock_runtime, next_id};
use crate::domain::analytics::{DayGroup, ProcrastinationInsights, group_by_day, procrastination_insights};
use crate::domain::models::{
    JournalEntry, MediaItem, MediaKind, Milestone, Mood, ProcrastinationEntry, VisionBoardEntry,
    validate_non_empty,
};
use crate::infrastructure::error::InfraError;
use chrono::NaiveDate;
use rand::seq::IndexedRandom;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcrastinationInput {
    pub reason: String,
    pub task_id: Option<String>,
    pub task_name: Option<String>,
    pub mood: Option<Mood>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisionInput {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub importance: Option<String>,
    pub success_criteria: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaInput {
    pub kind: MediaKind,
    pub url: String,
    pub thumbnail: Option<String>,
    pub mime_type: Option<String>,
}

pub fn add_procrastination_impl(
    state: &AppState,
    input: ProcrastinationInput,
) -> Result<ProcrastinationEntry, InfraError> {
    let entry = ProcrastinationEntry {
        id: next_id("entry"),
        timestamp: state.now(),
        task_id: trimmed(input.task_id),
        task_name: trimmed(input.task_name),
        reason: input.reason.trim().to_string(),
        mood: input.mood,
        overcome: false,
    };
    entry.validate().map_err(InfraError::InvalidInput)?;

    let mut runtime = lock_runtime(state)?;
    runtime.procrastination.insert(0, entry.clone());
    state.procrastination_repository.save(&runtime.procrastination)?;
    drop(runtime);

    state.log_info("add_procrastination", &format!("logged entry_id={}", entry.id));
    Ok(entry)
}

pub fn list_procrastination_impl(state: &AppState) -> Result<Vec<DayGroup>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(group_by_day(&runtime.procrastination, state.timezone()))
}

pub fn procrastination_insights_impl(state: &AppState) -> Result<ProcrastinationInsights, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(procrastination_insights(&runtime.procrastination))
}

pub fn update_procrastination_impl(
    state: &AppState,
    entry: ProcrastinationEntry,
) -> Result<ProcrastinationEntry, InfraError> {
    entry.validate().map_err(InfraError::InvalidInput)?;

    let mut runtime = lock_runtime(state)?;
    let Some(slot) = runtime
        .procrastination
        .iter_mut()
        .find(|candidate| candidate.id == entry.id)
    else {
        return Err(entry_not_found(&entry.id));
    };
    *slot = entry.clone();
    state.procrastination_repository.save(&runtime.procrastination)?;
    drop(runtime);

    state.log_info("update_procrastination", &format!("updated entry_id={}", entry.id));
    Ok(entry)
}

pub fn mark_overcome_impl(state: &AppState, entry_id: String) -> Result<ProcrastinationEntry, InfraError> {
    let entry_id = required_id(&entry_id, "entry_id")?;
    let mut runtime = lock_runtime(state)?;
    let updated = {
        let entry = runtime
            .procrastination
            .iter_mut()
            .find(|entry| entry.id == entry_id)
            .ok_or_else(|| entry_not_found(entry_id))?;
        entry.overcome = true;
        entry.clone()
    };
    state.procrastination_repository.save(&runtime.procrastination)?;
    drop(runtime);

    state.log_info("mark_overcome", &format!("entry_id={entry_id} overcome"));
    Ok(updated)
}

pub fn delete_procrastination_impl(state: &AppState, entry_id: String) -> Result<bool, InfraError> {
    let entry_id = required_id(&entry_id, "entry_id")?;
    let mut runtime = lock_runtime(state)?;
    let before = runtime.procrastination.len();
    runtime.procrastination.retain(|entry| entry.id != entry_id);
    if runtime.procrastination.len() == before {
        return Ok(false);
    }
    state.procrastination_repository.save(&runtime.procrastination)?;
    drop(runtime);

    state.log_info("delete_procrastination", &format!("deleted entry_id={entry_id}"));
    Ok(true)
}

pub fn add_vision_impl(state: &AppState, input: VisionInput) -> Result<VisionBoardEntry, InfraError> {
    let entry = VisionBoardEntry {
        id: next_id("vision"),
        image_url: trimmed(input.image_url),
        title: input.title.trim().to_string(),
        description: input.description.trim().to_string(),
        category: trimmed(input.category),
        linked_task_ids: Vec::new(),
        created_at: state.now(),
        milestones: Vec::new(),
        journal_entries: Vec::new(),
        media_items: Vec::new(),
        importance: trimmed(input.importance),
        success_criteria: trimmed(input.success_criteria),
        target_date: input.target_date,
        progress_percentage: Some(0),
        completed: false,
        completed_at: None,
        notes: trimmed(input.notes),
    };
    entry.validate().map_err(InfraError::InvalidInput)?;

    let mut runtime = lock_runtime(state)?;
    runtime.vision.insert(0, entry.clone());
    state.vision_repository.save(&runtime.vision)?;
    drop(runtime);

    state.log_info("add_vision", &format!("created vision_id={}", entry.id));
    Ok(entry)
}

pub fn list_vision_impl(state: &AppState) -> Result<Vec<VisionBoardEntry>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.vision.clone())
}

pub fn get_vision_impl(state: &AppState, vision_id: String) -> Result<VisionBoardEntry, InfraError> {
    let vision_id = required_id(&vision_id, "vision_id")?;
    let runtime = lock_runtime(state)?;
    runtime
        .vision
        .iter()
        .find(|entry| entry.id == vision_id)
        .cloned()
        .ok_or_else(|| vision_not_found(vision_id))
}

/// Replaces the stored entry with the same id.
pub fn update_vision_impl(
    state: &AppState,
    entry: VisionBoardEntry,
) -> Result<VisionBoardEntry, InfraError> {
    entry.validate().map_err(InfraError::InvalidInput)?;

    let mut runtime = lock_runtime(state)?;
    let Some(slot) = runtime.vision.iter_mut().find(|candidate| candidate.id == entry.id) else {
        return Err(vision_not_found(&entry.id));
    };
    *slot = entry.clone();
    state.vision_repository.save(&runtime.vision)?;
    drop(runtime);

    state.log_info("update_vision", &format!("updated vision_id={}", entry.id));
    Ok(entry)
}

pub fn delete_vision_impl(state: &AppState, vision_id: String) -> Result<bool, InfraError> {
    let vision_id = required_id(&vision_id, "vision_id")?;
    let mut runtime = lock_runtime(state)?;
    let before = runtime.vision.len();
    runtime.vision.retain(|entry| entry.id != vision_id);
    if runtime.vision.len() == before {
        return Ok(false);
    }
    state.vision_repository.save(&runtime.vision)?;
    drop(runtime);

    state.log_info("delete_vision", &format!("deleted vision_id={vision_id}"));
    Ok(true)
}

pub fn random_vision_impl(state: &AppState) -> Result<Option<VisionBoardEntry>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.vision.choose(&mut rand::rng()).cloned())
}

/// At most one reminder per local day, and only while reminders are enabled.
pub fn daily_motivation_impl(state: &AppState) -> Result<Option<VisionBoardEntry>, InfraError> {
    if !state.settings.show_motivational_reminders()? {
        return Ok(None);
    }
    let today = state.today();
    if state.settings.last_motivation_date()? == Some(today) {
        return Ok(None);
    }
    let Some(entry) = random_vision_impl(state)? else {
        return Ok(None);
    };
    state.settings.set_last_motivation_date(today)?;
    state.log_info("daily_motivation", &format!("showing vision_id={}", entry.id));
    Ok(Some(entry))
}

pub fn add_milestone_impl(
    state: &AppState,
    vision_id: String,
    title: String,
    due_date: NaiveDate,
    notes: Option<String>,
) -> Result<VisionBoardEntry, InfraError> {
    validate_non_empty(&title, "milestone.title").map_err(InfraError::InvalidInput)?;
    let now = state.now();
    mutate_vision(state, "add_milestone", &vision_id, |entry| {
        entry.milestones.push(Milestone {
            id: next_id("milestone"),
            title: title.trim().to_string(),
            due_date,
            completed: false,
            completed_at: None,
            created_at: Some(now),
            notes: trimmed(notes),
        });
        Ok(())
    })
}

pub fn update_milestone_impl(
    state: &AppState,
    vision_id: String,
    milestone: Milestone,
) -> Result<VisionBoardEntry, InfraError> {
    validate_non_empty(&milestone.title, "milestone.title").map_err(InfraError::InvalidInput)?;
    mutate_vision(state, "update_milestone", &vision_id, |entry| {
        let slot = entry
            .milestones
            .iter_mut()
            .find(|candidate| candidate.id == milestone.id)
            .ok_or_else(|| nested_not_found("milestone", &milestone.id))?;
        *slot = milestone;
        Ok(())
    })
}

pub fn toggle_milestone_impl(
    state: &AppState,
    vision_id: String,
    milestone_id: String,
) -> Result<VisionBoardEntry, InfraError> {
    let now = state.now();
    mutate_vision(state, "toggle_milestone", &vision_id, |entry| {
        let milestone = entry
            .milestones
            .iter_mut()
            .find(|milestone| milestone.id == milestone_id.trim())
            .ok_or_else(|| nested_not_found("milestone", &milestone_id))?;
        milestone.completed = !milestone.completed;
        milestone.completed_at = milestone.completed.then_some(now);
        Ok(())
    })
}

pub fn delete_milestone_impl(
    state: &AppState,
    vision_id: String,
    milestone_id: String,
) -> Result<VisionBoardEntry, InfraError> {
    mutate_vision(state, "delete_milestone", &vision_id, |entry| {
        entry.milestones.retain(|milestone| milestone.id != milestone_id.trim());
        Ok(())
    })
}

pub fn add_journal_impl(
    state: &AppState,
    vision_id: String,
    content: String,
    prompt: Option<String>,
) -> Result<VisionBoardEntry, InfraError> {
    validate_non_empty(&content, "journal.content").map_err(InfraError::InvalidInput)?;
    let now = state.now();
    mutate_vision(state, "add_journal", &vision_id, |entry| {
        entry.journal_entries.push(JournalEntry {
            id: next_id("journal"),
            content: content.trim().to_string(),
            created_at: now,
            prompt: trimmed(prompt),
        });
        Ok(())
    })
}

pub fn update_journal_impl(
    state: &AppState,
    vision_id: String,
    journal_id: String,
    content: String,
) -> Result<VisionBoardEntry, InfraError> {
    validate_non_empty(&content, "journal.content").map_err(InfraError::InvalidInput)?;
    mutate_vision(state, "update_journal", &vision_id, |entry| {
        let journal = entry
            .journal_entries
            .iter_mut()
            .find(|journal| journal.id == journal_id.trim())
            .ok_or_else(|| nested_not_found("journal entry", &journal_id))?;
        journal.content = content.trim().to_string();
        Ok(())
    })
}

pub fn delete_journal_impl(
    state: &AppState,
    vision_id: String,
    journal_id: String,
) -> Result<VisionBoardEntry, InfraError> {
    mutate_vision(state, "delete_journal", &vision_id, |entry| {
        entry.journal_entries.retain(|journal| journal.id != journal_id.trim());
        Ok(())
    })
}

pub fn add_media_impl(
    state: &AppState,
    vision_id: String,
    input: MediaInput,
) -> Result<VisionBoardEntry, InfraError> {
    validate_non_empty(&input.url, "media.url").map_err(InfraError::InvalidInput)?;
    let now = state.now();
    mutate_vision(state, "add_media", &vision_id, |entry| {
        entry.media_items.push(MediaItem {
            id: next_id("media"),
            kind: input.kind,
            url: input.url.trim().to_string(),
            thumbnail: trimmed(input.thumbnail),
            mime_type: trimmed(input.mime_type),
            created_at: now,
        });
        Ok(())
    })
}

pub fn delete_media_impl(
    state: &AppState,
    vision_id: String,
    media_id: String,
) -> Result<VisionBoardEntry, InfraError> {
    mutate_vision(state, "delete_media", &vision_id, |entry| {
        entry.media_items.retain(|item| item.id != media_id.trim());
        Ok(())
    })
}

pub fn link_task_impl(
    state: &AppState,
    vision_id: String,
    task_id: String,
) -> Result<VisionBoardEntry, InfraError> {
    let task_id = required_id(&task_id, "task_id")?.to_string();
    mutate_vision(state, "link_task", &vision_id, |entry| {
        if !entry.linked_task_ids.contains(&task_id) {
            entry.linked_task_ids.push(task_id);
        }
        Ok(())
    })
}

pub fn unlink_task_impl(
    state: &AppState,
    vision_id: String,
    task_id: String,
) -> Result<VisionBoardEntry, InfraError> {
    mutate_vision(state, "unlink_task", &vision_id, |entry| {
        entry.linked_task_ids.retain(|linked| linked != task_id.trim());
        Ok(())
    })
}

/// Values above 100 are clamped.
pub fn update_progress_impl(
    state: &AppState,
    vision_id: String,
    percentage: u32,
) -> Result<VisionBoardEntry, InfraError> {
    let percentage = percentage.min(100) as u8;
    mutate_vision(state, "update_progress", &vision_id, |entry| {
        entry.progress_percentage = Some(percentage);
        Ok(())
    })
}

/// Share of linked tasks that exist and are completed. Dangling links are
/// ignored.
pub fn task_progress_impl(state: &AppState, vision_id: String) -> Result<u8, InfraError> {
    let vision_id = required_id(&vision_id, "vision_id")?;
    let runtime = lock_runtime(state)?;
    let entry = runtime
        .vision
        .iter()
        .find(|entry| entry.id == vision_id)
        .ok_or_else(|| vision_not_found(vision_id))?;

    let linked = runtime
        .tasks
        .iter()
        .filter(|task| entry.linked_task_ids.contains(&task.id))
        .collect::<Vec<_>>();
    if linked.is_empty() {
        return Ok(0);
    }
    let completed = linked.iter().filter(|task| task.completed).count();
    Ok(((completed * 100) as f64 / linked.len() as f64).round() as u8)
}

fn mutate_vision<F>(
    state: &AppState,
    command: &str,
    vision_id: &str,
    mutation: F,
) -> Result<VisionBoardEntry, InfraError>
where
    F: FnOnce(&mut VisionBoardEntry) -> Result<(), InfraError>,
{
    let vision_id = required_id(vision_id, "vision_id")?;
    let mut runtime = lock_runtime(state)?;
    let updated = {
        let entry = find_vision_mut(&mut runtime, vision_id)?;
        mutation(entry)?;
        entry.validate().map_err(InfraError::InvalidInput)?;
        entry.clone()
    };
    state.vision_repository.save(&runtime.vision)?;
    drop(runtime);

    state.log_info(command, &format!("updated vision_id={vision_id}"));
    Ok(updated)
}

fn find_vision_mut<'a>(
    runtime: &'a mut RuntimeState,
    vision_id: &str,
) -> Result<&'a mut VisionBoardEntry, InfraError> {
    runtime
        .vision
        .iter_mut()
        .find(|entry| entry.id == vision_id)
        .ok_or_else(|| vision_not_found(vision_id))
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn required_id<'a>(value: &'a str, field_name: &str) -> Result<&'a str, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidInput(format!("{field_name} must not be empty")));
    }
    Ok(value)
}

fn entry_not_found(entry_id: &str) -> InfraError {
    InfraError::NotFound(format!("procrastination entry not found: {entry_id}"))
}

fn vision_not_found(vision_id: &str) -> InfraError {
    InfraError::NotFound(format!("vision entry not found: {vision_id}"))
}

fn nested_not_found(kind: &str, id: &str) -> InfraError {
    InfraError::NotFound(format!("{kind} not found: {id}"))
}
