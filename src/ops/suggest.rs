use serde::Serialize;

use crate::model::{Category, Complexity, Priority, Project, Status, Task};
use crate::ops::deps::is_ready;

pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub task_id: u32,
    pub title: String,
    pub status: Status,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub score: i32,
    pub ready: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SuggestOptions {
    pub focus_category: Option<Category>,
    pub max: Option<usize>,
    pub include_blocked: bool,
}

fn priority_score(priority: Priority) -> i32 {
    match priority {
        Priority::P0 => 100,
        Priority::P1 => 75,
        Priority::P2 => 50,
        Priority::P3 => 25,
    }
}

fn score(project: &Project, task: &Task) -> (i32, bool, String) {
    let ready = is_ready(project, task);
    let mut score = priority_score(task.priority);
    let mut reasons = Vec::new();

    match task.priority {
        Priority::P0 => reasons.push("Critical priority"),
        Priority::P1 => reasons.push("High priority"),
        _ => {}
    }
    if ready {
        score += 50;
        if !task.dependencies.is_empty() {
            reasons.push("All dependencies completed");
        }
    } else {
        score -= 25;
        reasons.push("Waiting for dependencies");
    }
    if task.status == Status::InProgress {
        score += 30;
        reasons.push("Already in progress");
    }
    if task.has_pending_choices() {
        score += 20;
        reasons.push("Has pending decisions");
    }
    if task.complexity == Some(Complexity::High) {
        score -= 10;
        reasons.push("High complexity - consider breaking down");
    }
    if !task.subtasks.is_empty() {
        score += 10;
    }

    let reason = if reasons.is_empty() {
        "Ready to start".to_string()
    } else {
        reasons.join(", ")
    };
    (score, ready, reason)
}

/// Rank open tasks by priority, readiness and momentum
pub fn suggest_next_actions(project: &Project, opts: &SuggestOptions) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = project
        .tasks
        .iter()
        .filter(|t| t.status != Status::Done)
        .filter(|t| opts.include_blocked || t.status != Status::Blocked)
        .filter(|t| opts.focus_category.is_none() || t.category == opts.focus_category)
        .map(|task| {
            let (score, ready, reason) = score(project, task);
            Suggestion {
                task_id: task.id,
                title: task.title.clone(),
                status: task.status,
                priority: task.priority,
                category: task.category,
                score,
                ready,
                reason,
            }
        })
        .collect();

    // stable: ties keep document order
    suggestions.sort_by(|a, b| b.score.cmp(&a.score));
    suggestions.truncate(opts.max.unwrap_or(DEFAULT_MAX_SUGGESTIONS));
    suggestions
}
