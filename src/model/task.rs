use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::choice::Choice;

/// Lifecycle state shared by tasks and subtasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Todo,
        Status::InProgress,
        Status::Done,
        Status::Blocked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Done => "done",
            Status::Blocked => "blocked",
        }
    }

    pub fn from_str_exact(s: &str) -> Option<Status> {
        Status::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

/// Task category tag, rendered bracketed (`[MVP]`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "[MVP]")]
    Mvp,
    #[serde(rename = "[AI]")]
    Ai,
    #[serde(rename = "[UX]")]
    Ux,
    #[serde(rename = "[INFRA]")]
    Infra,
}

impl Category {
    pub const ALL: [Category; 4] = [Category::Mvp, Category::Ai, Category::Ux, Category::Infra];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Mvp => "[MVP]",
            Category::Ai => "[AI]",
            Category::Ux => "[UX]",
            Category::Infra => "[INFRA]",
        }
    }

    pub fn from_str_exact(s: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    /// Blocker/Critical
    P0,
    /// High priority
    P1,
    /// Medium priority
    #[default]
    P2,
    /// Low priority
    P3,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Priority::P0, Priority::P1, Priority::P2, Priority::P3];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::P0 => "P0",
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }

    pub fn from_str_exact(s: &str) -> Option<Priority> {
        Priority::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Complexity::Low, Complexity::Medium, Complexity::High];

    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }

    pub fn from_str_exact(s: &str) -> Option<Complexity> {
        Complexity::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Status, Category, Priority, Complexity);

/// A unit of work owned by exactly one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    /// Empty string means no description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub estimated_hours: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subtask {
    /// A fresh `todo` subtask stamped with the current time
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Subtask {
            title: title.into(),
            description: String::new(),
            status: Status::default(),
            estimated_hours: 0,
            complexity: None,
            choices: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == Status::Done
    }
}

/// A top-level task within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Assigned by the store; `0` until the task is added
    pub id: u32,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub priority: Priority,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub estimated_hours: u32,
    /// IDs of tasks this one depends on. May reference tasks that no longer exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// A fresh task with default status and priority. The ID is assigned on add.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Task {
            id: 0,
            title: title.into(),
            description: description.into(),
            category: None,
            priority: Priority::default(),
            status: Status::default(),
            complexity: None,
            estimated_hours: 0,
            dependencies: Vec::new(),
            subtasks: Vec::new(),
            choices: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Done
    }

    /// Done, and every subtask (if any) is done too
    pub fn is_fully_completed(&self) -> bool {
        self.is_completed() && self.subtasks.iter().all(Subtask::is_done)
    }

    /// True when the task has no subtasks or all of them are done
    pub fn can_be_marked_complete(&self) -> bool {
        self.subtasks.iter().all(Subtask::is_done)
    }

    pub fn completed_subtask_count(&self) -> usize {
        self.subtasks.iter().filter(|s| s.is_done()).count()
    }

    /// `(completed, total, percentage)`. No subtasks counts as 100%.
    pub fn subtask_progress(&self) -> (usize, usize, f64) {
        let total = self.subtasks.len();
        if total == 0 {
            return (0, 0, 100.0);
        }
        let completed = self.completed_subtask_count();
        (completed, total, completed as f64 / total as f64 * 100.0)
    }

    /// Unresolved choices on the task and all of its subtasks
    pub fn pending_choice_count(&self) -> usize {
        let own = self.choices.iter().filter(|c| c.is_pending()).count();
        let nested: usize = self
            .subtasks
            .iter()
            .map(|s| s.choices.iter().filter(|c| c.is_pending()).count())
            .sum();
        own + nested
    }

    pub fn has_pending_choices(&self) -> bool {
        self.pending_choice_count() > 0
    }

    /// First subtask that is not done
    pub fn next_incomplete_subtask(&self) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| !s.is_done())
    }

    pub fn find_subtask(&self, title: &str) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.title == title)
    }

    pub fn find_subtask_mut(&mut self, title: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.title == title)
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            title: self.title.clone(),
            status: self.status,
            category: self.category,
            priority: self.priority,
            complexity: self.complexity,
            estimated_hours: self.estimated_hours,
            subtask_count: self.subtasks.len(),
            completed_subtasks: self.completed_subtask_count(),
            pending_choices: self.pending_choice_count(),
        }
    }
}

/// Condensed view of a task for agent consumption
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary {
    pub id: u32,
    pub title: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(skip_serializing_if = "is_zero")]
    pub estimated_hours: u32,
    pub subtask_count: usize,
    pub completed_subtasks: usize,
    pub pending_choices: usize,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_subtasks(states: &[Status]) -> Task {
        let mut task = Task::new("Parent", "desc");
        for (i, status) in states.iter().enumerate() {
            let mut sub = Subtask::new(format!("sub {}", i));
            sub.status = *status;
            task.subtasks.push(sub);
        }
        task
    }

    #[test]
    fn test_defaults() {
        let task = Task::new("Write spec", "Draft it");
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.priority, Priority::P2);
        assert_eq!(task.id, 0);
        assert_eq!(Subtask::new("x").status, Status::Todo);
    }

    #[test]
    fn test_fully_completed_requires_subtasks_done() {
        let mut task = task_with_subtasks(&[Status::Done, Status::Todo]);
        task.status = Status::Done;
        assert!(task.is_completed());
        assert!(!task.is_fully_completed());

        task.subtasks[1].status = Status::Done;
        assert!(task.is_fully_completed());
    }

    #[test]
    fn test_can_be_marked_complete() {
        assert!(task_with_subtasks(&[]).can_be_marked_complete());
        assert!(task_with_subtasks(&[Status::Done, Status::Done]).can_be_marked_complete());
        assert!(!task_with_subtasks(&[Status::Done, Status::Blocked]).can_be_marked_complete());
    }

    #[test]
    fn test_subtask_progress() {
        assert_eq!(task_with_subtasks(&[]).subtask_progress(), (0, 0, 100.0));
        let (done, total, pct) =
            task_with_subtasks(&[Status::Done, Status::Todo, Status::Todo, Status::Done])
                .subtask_progress();
        assert_eq!((done, total), (2, 4));
        assert!((pct - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_enum_string_forms() {
        assert_eq!(Status::InProgress.as_str(), "in_progress");
        assert_eq!(Status::from_str_exact("blocked"), Some(Status::Blocked));
        assert_eq!(Status::from_str_exact("Blocked"), None);
        assert_eq!(Category::from_str_exact("[INFRA]"), Some(Category::Infra));
        assert_eq!(Category::from_str_exact("INFRA"), None);
        assert_eq!(Priority::P0.to_string(), "P0");
        assert_eq!(Complexity::from_str_exact("high"), Some(Complexity::High));
    }
}
