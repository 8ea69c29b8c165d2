use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::{Task, TaskSummary};

/// A named collection of tasks, backed by one document on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub tasks: Vec<Task>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Project {
            name: name.into(),
            description: String::new(),
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The ID the next added task receives: one past the highest existing ID
    pub fn next_task_id(&self) -> u32 {
        self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    pub fn find_task(&self, title: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.title == title)
    }

    pub fn find_task_mut(&mut self, title: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.title == title)
    }

    pub fn task_by_id(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn completed_task_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.is_completed()).count()
    }

    /// Tasks plus subtasks
    pub fn total_item_count(&self) -> usize {
        self.tasks.len() + self.tasks.iter().map(|t| t.subtasks.len()).sum::<usize>()
    }

    pub fn completed_item_count(&self) -> usize {
        self.completed_task_count()
            + self
                .tasks
                .iter()
                .map(|t| t.completed_subtask_count())
                .sum::<usize>()
    }

    pub fn progress_percentage(&self) -> f64 {
        let total = self.total_item_count();
        if total == 0 {
            return 0.0;
        }
        self.completed_item_count() as f64 / total as f64 * 100.0
    }

    pub fn pending_choice_count(&self) -> usize {
        self.tasks.iter().map(|t| t.pending_choice_count()).sum()
    }

    pub fn progress(&self) -> ProgressSummary {
        let total_tasks = self.tasks.len();
        let completed_tasks = self.completed_task_count();
        let task_progress = if total_tasks == 0 {
            0.0
        } else {
            completed_tasks as f64 / total_tasks as f64 * 100.0
        };
        ProgressSummary {
            total_tasks,
            completed_tasks,
            total_items: self.total_item_count(),
            completed_items: self.completed_item_count(),
            task_progress,
            overall_progress: self.progress_percentage(),
            pending_choices: self.pending_choice_count(),
        }
    }

    pub fn summary(&self, include_tasks: bool) -> ProjectSummary {
        ProjectSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            task_count: self.tasks.len(),
            completed_tasks: self.completed_task_count(),
            pending_choices: self.pending_choice_count(),
            tasks: if include_tasks {
                self.tasks.iter().map(Task::summary).collect()
            } else {
                Vec::new()
            },
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub task_count: usize,
    pub completed_tasks: usize,
    pub pending_choices: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskSummary>,
    pub updated_at: DateTime<Utc>,
}

/// Completion counts across tasks and subtasks
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub total_items: usize,
    pub completed_items: usize,
    pub task_progress: f64,
    pub overall_progress: f64,
    pub pending_choices: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Choice, Status, Subtask};

    #[test]
    fn test_next_task_id_uses_max_not_len() {
        let mut project = Project::new("demo");
        assert_eq!(project.next_task_id(), 1);
        for id in [3, 7, 2] {
            let mut t = Task::new(format!("t{}", id), "d");
            t.id = id;
            project.tasks.push(t);
        }
        assert_eq!(project.next_task_id(), 8);
    }

    #[test]
    fn test_progress_counts_subtasks() {
        let mut project = Project::new("demo");
        let mut a = Task::new("a", "d");
        a.status = Status::Done;
        let mut b = Task::new("b", "d");
        let mut sub = Subtask::new("s1");
        sub.status = Status::Done;
        b.subtasks.push(sub);
        b.subtasks.push(Subtask::new("s2"));
        b.choices
            .push(Choice::new("Which?", vec!["x".into(), "y".into()]));
        project.tasks.push(a);
        project.tasks.push(b);

        let progress = project.progress();
        assert_eq!(progress.total_tasks, 2);
        assert_eq!(progress.completed_tasks, 1);
        assert_eq!(progress.total_items, 4);
        assert_eq!(progress.completed_items, 2);
        assert!((progress.overall_progress - 50.0).abs() < f64::EPSILON);
        assert_eq!(progress.pending_choices, 1);
    }

    #[test]
    fn test_summary_omits_tasks_unless_requested() {
        let mut project = Project::new("demo");
        project.tasks.push(Task::new("a", "d"));
        assert!(project.summary(false).tasks.is_empty());
        assert_eq!(project.summary(true).tasks.len(), 1);
    }
}
