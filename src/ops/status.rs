use chrono::Utc;
use tracing::info;

use crate::model::{Project, Status, Task};

/// Error type for in-memory task operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("subtask not found: {subtask} (in task {task})")]
    SubtaskNotFound { task: String, subtask: String },
    #[error("choice not found: {choice} (in task {task})")]
    ChoiceNotFound { task: String, choice: String },
}

/// What a status update applies to, addressed by exact title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTarget<'a> {
    Task(&'a str),
    Subtask { task: &'a str, subtask: &'a str },
}

impl<'a> StatusTarget<'a> {
    pub fn new(task: &'a str, subtask: Option<&'a str>) -> Self {
        match subtask {
            Some(subtask) => StatusTarget::Subtask { task, subtask },
            None => StatusTarget::Task(task),
        }
    }
}

// ---------------------------------------------------------------------------
// Cascading status update
// ---------------------------------------------------------------------------

/// Apply a status change and its cascade. Returns one description per
/// field that changed.
///
/// Marking a task done forces every subtask done. Marking a subtask so that
/// all subtasks are done promotes a not-yet-done parent to done.
pub fn apply_status_update(
    project: &mut Project,
    target: StatusTarget<'_>,
    status: Status,
) -> Result<Vec<String>, TaskError> {
    let now = Utc::now();
    let task_title = match target {
        StatusTarget::Task(t) | StatusTarget::Subtask { task: t, .. } => t,
    };
    let task = project
        .find_task_mut(task_title)
        .ok_or_else(|| TaskError::NotFound(task_title.to_string()))?;

    let mut changes = Vec::new();
    match target {
        StatusTarget::Task(_) => {
            changes.push(format!(
                "Task '{}' status: {} -> {}",
                task.title, task.status, status
            ));
            task.status = status;
            task.updated_at = now;

            if status == Status::Done {
                cascade_down(task, &mut changes);
            }
        }
        StatusTarget::Subtask { subtask, .. } => {
            let parent_title = task.title.clone();
            let sub = task
                .find_subtask_mut(subtask)
                .ok_or_else(|| TaskError::SubtaskNotFound {
                    task: parent_title.clone(),
                    subtask: subtask.to_string(),
                })?;
            changes.push(format!(
                "Subtask '{}' of '{}' status: {} -> {}",
                sub.title, parent_title, sub.status, status
            ));
            sub.status = status;
            sub.updated_at = now;

            if task.can_be_marked_complete() && !task.is_completed() {
                task.status = Status::Done;
                task.updated_at = now;
                changes.push(format!(
                    "Task '{}' auto-completed: all subtasks are done",
                    task.title
                ));
            }
        }
    }
    Ok(changes)
}

/// Force every non-done subtask of a done task to done
fn cascade_down(task: &mut Task, changes: &mut Vec<String>) {
    let now = Utc::now();
    for sub in task.subtasks.iter_mut().filter(|s| !s.is_done()) {
        sub.status = Status::Done;
        sub.updated_at = now;
        changes.push(format!(
            "Subtask '{}' of '{}' marked done (parent task is done)",
            sub.title, task.title
        ));
    }
}

// ---------------------------------------------------------------------------
// Auto-update sweep
// ---------------------------------------------------------------------------

/// Reconcile task and subtask states across a project. Returns the change
/// descriptions and whether anything changed. Persisting is up to the caller.
///
/// A task with no subtasks is never promoted.
pub fn auto_update_task_statuses(project: &mut Project) -> (Vec<String>, bool) {
    let now = Utc::now();
    let mut changes = Vec::new();

    for task in &mut project.tasks {
        if !task.is_completed() && !task.subtasks.is_empty() && task.can_be_marked_complete() {
            task.status = Status::Done;
            task.updated_at = now;
            changes.push(format!(
                "Task '{}' auto-completed: all {} subtasks are done",
                task.title,
                task.subtasks.len()
            ));
        } else if task.is_completed() {
            cascade_down(task, &mut changes);
        }
    }

    if !changes.is_empty() {
        info!(
            project = %project.name,
            count = changes.len(),
            "auto-update reconciled task statuses"
        );
    }
    let changed = !changes.is_empty();
    (changes, changed)
}
