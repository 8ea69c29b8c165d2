use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Project, Status};

/// In-progress tasks untouched for longer than this are stale
pub const STALE_TASK_DAYS: i64 = 7;
/// Untouched todo tasks with no subtasks older than this need a breakdown
pub const BREAKDOWN_TASK_DAYS: i64 = 14;
/// In-progress subtasks untouched for longer than this are stale
pub const STALE_SUBTASK_DAYS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttentionType {
    /// In progress past its estimated hours
    Overdue,
    /// In progress without updates
    Stale,
    /// Old todo task with no subtasks
    Breakdown,
}

impl AttentionType {
    pub const ALL: [AttentionType; 3] = [
        AttentionType::Overdue,
        AttentionType::Stale,
        AttentionType::Breakdown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttentionType::Overdue => "overdue",
            AttentionType::Stale => "stale",
            AttentionType::Breakdown => "breakdown",
        }
    }

    pub fn from_str_exact(s: &str) -> Option<AttentionType> {
        AttentionType::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

/// A task or subtask flagged for review
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttentionItem {
    pub task_id: u32,
    pub task_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask_title: Option<String>,
    pub reason: String,
    #[serde(rename = "type")]
    pub kind: AttentionType,
    /// 1 (low) to 5 (high)
    pub severity: u8,
}

/// Scan a project for tasks that need attention as of `now`. Never mutates.
pub fn tasks_needing_attention(project: &Project, now: DateTime<Utc>) -> Vec<AttentionItem> {
    let mut items = Vec::new();

    for task in &project.tasks {
        if matches!(task.status, Status::Done | Status::Blocked) {
            continue;
        }
        let item = |reason: String, kind, severity| AttentionItem {
            task_id: task.id,
            task_title: task.title.clone(),
            subtask_title: None,
            reason,
            kind,
            severity,
        };

        let idle = now - task.updated_at;
        let estimate = Duration::hours(i64::from(task.estimated_hours));
        match task.status {
            Status::InProgress if task.estimated_hours > 0 && idle > estimate => {
                items.push(item(
                    format!(
                        "In progress for {}h without an update, over the {}h estimate",
                        idle.num_hours(),
                        task.estimated_hours
                    ),
                    AttentionType::Overdue,
                    4,
                ));
            }
            Status::InProgress if idle > Duration::days(STALE_TASK_DAYS) => {
                items.push(item(
                    format!("No update for {} days while in progress", idle.num_days()),
                    AttentionType::Stale,
                    3,
                ));
            }
            Status::Todo
                if task.subtasks.is_empty()
                    && now - task.created_at > Duration::days(BREAKDOWN_TASK_DAYS) =>
            {
                items.push(item(
                    format!(
                        "Created {} days ago with no subtasks; needs breakdown or action",
                        (now - task.created_at).num_days()
                    ),
                    AttentionType::Breakdown,
                    2,
                ));
            }
            _ => {}
        }

        for sub in &task.subtasks {
            let idle = now - sub.updated_at;
            if sub.status == Status::InProgress && idle > Duration::days(STALE_SUBTASK_DAYS) {
                items.push(AttentionItem {
                    task_id: task.id,
                    task_title: task.title.clone(),
                    subtask_title: Some(sub.title.clone()),
                    reason: format!(
                        "Subtask '{}' in progress for {} days without an update",
                        sub.title,
                        idle.num_days()
                    ),
                    kind: AttentionType::Stale,
                    severity: 2,
                });
            }
        }
    }
    items
}
