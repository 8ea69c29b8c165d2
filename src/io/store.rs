use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::io::atomic::atomic_write;
use crate::model::validate::{
    sanitize_project_name, validate_choice, validate_estimated_hours, validate_project_name,
    validate_title, ValidationError,
};
use crate::model::{Choice, Complexity, Project, Status, Subtask, Task};
use crate::ops::status::{apply_status_update, StatusTarget, TaskError};
use crate::parse::{decode_project, encode_project, DecodeError};

/// Extension of every project document
pub const DOCUMENT_EXT: &str = "md";

/// Error type for task store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("task not found: {task} (project {project})")]
    TaskNotFound { project: String, task: String },
    #[error("subtask not found: {subtask} (task {task}, project {project})")]
    SubtaskNotFound {
        project: String,
        task: String,
        subtask: String,
    },
    #[error("choice not found: {choice} (task {task}, project {project})")]
    ChoiceNotFound {
        project: String,
        task: String,
        choice: String,
    },
    #[error("project {project} is corrupt: {source}")]
    CorruptDocument {
        project: String,
        #[source]
        source: DecodeError,
    },
    #[error("all tasks in project {0} are completed")]
    AllCompleted(String),
    #[error("could not {op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    /// Missing project, task, subtask or choice
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::ProjectNotFound(_)
                | StoreError::TaskNotFound { .. }
                | StoreError::SubtaskNotFound { .. }
                | StoreError::ChoiceNotFound { .. }
        )
    }

    /// The terminal "nothing left to do" signal from `get_next_task`
    pub fn is_all_completed(&self) -> bool {
        matches!(self, StoreError::AllCompleted(_))
    }

    fn from_task(project: &str, err: TaskError) -> Self {
        let project = project.to_string();
        match err {
            TaskError::NotFound(task) => StoreError::TaskNotFound { project, task },
            TaskError::SubtaskNotFound { task, subtask } => StoreError::SubtaskNotFound {
                project,
                task,
                subtask,
            },
            TaskError::ChoiceNotFound { task, choice } => StoreError::ChoiceNotFound {
                project,
                task,
                choice,
            },
        }
    }

    fn io(op: &'static str, path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Parameters for recording a complexity estimate on a task
#[derive(Debug, Clone)]
pub struct ComplexityEstimate {
    pub complexity: Complexity,
    pub estimated_hours: u32,
    pub reasoning: Option<String>,
    pub suggested_subtasks: Vec<String>,
    /// Create `suggested_subtasks` when complexity is medium or high
    pub auto_create: bool,
}

/// Directory of per-project markdown documents.
///
/// One reader-writer lock guards all document I/O for the directory. Loads
/// take the read side and saves the write side, so a load-modify-save
/// sequence is not atomic: two concurrent updates to the same project can
/// lose one of the changes (last writer wins).
#[derive(Debug)]
pub struct TaskStore {
    dir: PathBuf,
    lock: RwLock<()>,
}

impl TaskStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StoreError::io("create", &dir, e))?;
        Ok(TaskStore {
            dir,
            lock: RwLock::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Document path for a project: sanitized name plus `.md`
    pub fn project_path(&self, name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", sanitize_project_name(name), DOCUMENT_EXT))
    }

    // -----------------------------------------------------------------------
    // Document I/O
    // -----------------------------------------------------------------------

    pub fn create_project(&self, name: &str) -> Result<Project, StoreError> {
        validate_project_name(name)?;
        let path = self.project_path(name);
        let _guard = self.lock.write();
        if path.exists() {
            return Err(StoreError::AlreadyExists(format!("project '{}'", name)));
        }
        let project = Project::new(name);
        atomic_write(&path, encode_project(&project).as_bytes())
            .map_err(|e| StoreError::io("write", &path, e))?;
        info!(project = name, path = %path.display(), "created project");
        Ok(project)
    }

    pub fn project_exists(&self, name: &str) -> bool {
        let path = self.project_path(name);
        let _guard = self.lock.read();
        path.is_file()
    }

    pub fn load_project(&self, name: &str) -> Result<Project, StoreError> {
        validate_project_name(name)?;
        let path = self.project_path(name);
        let text = {
            let _guard = self.lock.read();
            fs::read_to_string(&path).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => StoreError::ProjectNotFound(name.to_string()),
                _ => StoreError::io("read", &path, e),
            })?
        };
        let mut project = decode_project(&text).map_err(|source| StoreError::CorruptDocument {
            project: name.to_string(),
            source,
        })?;
        project.name = name.to_string();
        debug!(project = name, tasks = project.tasks.len(), "loaded project");
        Ok(project)
    }

    /// Stamp `updated_at` and atomically replace the project's document
    pub fn save_project(&self, project: &mut Project) -> Result<(), StoreError> {
        validate_project_name(&project.name)?;
        project.updated_at = Utc::now();
        let path = self.project_path(&project.name);
        let text = encode_project(project);
        {
            let _guard = self.lock.write();
            atomic_write(&path, text.as_bytes()).map_err(|e| StoreError::io("write", &path, e))?;
        }
        info!(project = %project.name, tasks = project.tasks.len(), "saved project");
        Ok(())
    }

    /// Load, apply `f`, and save if `f` succeeds. Subject to the same
    /// last-writer-wins race as separate load and save calls.
    pub fn update_project<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Project) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut project = self.load_project(name)?;
        let out = f(&mut project)?;
        self.save_project(&mut project)?;
        Ok(out)
    }

    /// Sorted names of every project document in the directory
    pub fn list_projects(&self) -> Result<Vec<String>, StoreError> {
        let _guard = self.lock.read();
        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::io("list", &self.dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| StoreError::io("list", &self.dir, e))?
                .path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == DOCUMENT_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    // -----------------------------------------------------------------------
    // Task operations
    // -----------------------------------------------------------------------

    /// Append a task with the next ID (max existing + 1). Returns the stored task.
    pub fn add_task(&self, name: &str, mut task: Task) -> Result<Task, StoreError> {
        self.update_project(name, |project| {
            let now = Utc::now();
            task.id = project.next_task_id();
            task.created_at = now;
            task.updated_at = now;
            project.tasks.push(task.clone());
            Ok(task)
        })
    }

    /// Set a task or subtask status with cascading completion. Returns the
    /// change descriptions.
    pub fn update_task_status(
        &self,
        name: &str,
        task_title: &str,
        subtask_title: Option<&str>,
        status: Status,
    ) -> Result<Vec<String>, StoreError> {
        self.update_project(name, |project| {
            apply_status_update(project, StatusTarget::new(task_title, subtask_title), status)
                .map_err(|e| StoreError::from_task(name, e))
        })
    }

    /// First task (in document order) that is not fully completed, with its
    /// first incomplete subtask if it has one.
    pub fn get_next_task(&self, name: &str) -> Result<(Task, Option<Subtask>), StoreError> {
        let project = self.load_project(name)?;
        project
            .tasks
            .into_iter()
            .find(|t| !t.is_fully_completed())
            .map(|task| {
                let subtask = task.next_incomplete_subtask().cloned();
                (task, subtask)
            })
            .ok_or_else(|| StoreError::AllCompleted(name.to_string()))
    }

    /// Append todo subtasks; with reasoning, record it as a resolved choice
    pub fn expand_task(
        &self,
        name: &str,
        task_title: &str,
        subtask_titles: &[String],
        reasoning: Option<&str>,
    ) -> Result<Task, StoreError> {
        for title in subtask_titles {
            validate_title(title)?;
        }
        self.update_project(name, |project| {
            let task = find_task(project, name, task_title)?;
            task.subtasks
                .extend(subtask_titles.iter().map(|t| Subtask::new(t.as_str())));
            if let Some(reasoning) = reasoning.filter(|r| !r.trim().is_empty()) {
                task.choices.push(Choice::resolved(
                    "Task breakdown reasoning",
                    "Accepted breakdown",
                    reasoning,
                ));
            }
            task.updated_at = Utc::now();
            Ok(task.clone())
        })
    }

    /// Record complexity and hours, optionally creating suggested subtasks
    pub fn set_task_complexity(
        &self,
        name: &str,
        task_title: &str,
        estimate: &ComplexityEstimate,
    ) -> Result<Task, StoreError> {
        validate_estimated_hours(estimate.estimated_hours)?;
        for title in &estimate.suggested_subtasks {
            validate_title(title)?;
        }
        self.update_project(name, |project| {
            let task = find_task(project, name, task_title)?;
            task.complexity = Some(estimate.complexity);
            task.estimated_hours = estimate.estimated_hours;
            if let Some(reasoning) = estimate.reasoning.as_deref().filter(|r| !r.trim().is_empty())
            {
                task.choices.push(Choice::resolved(
                    "Complexity Analysis",
                    estimate.complexity.as_str(),
                    reasoning,
                ));
            }
            if estimate.auto_create && estimate.complexity != Complexity::Low {
                for title in &estimate.suggested_subtasks {
                    if task.find_subtask(title).is_none() {
                        task.subtasks.push(Subtask::new(title.as_str()));
                    }
                }
            }
            task.updated_at = Utc::now();
            Ok(task.clone())
        })
    }

    /// Attach a pending choice to a task, or to one of its subtasks
    pub fn add_choice(
        &self,
        name: &str,
        task_title: &str,
        subtask_title: Option<&str>,
        question: &str,
        options: Vec<String>,
    ) -> Result<Choice, StoreError> {
        let choice = Choice::new(question, options);
        validate_choice(&choice)?;
        self.update_project(name, |project| {
            let task = find_task(project, name, task_title)?;
            let now = Utc::now();
            match subtask_title {
                Some(sub_title) => {
                    let sub = task.find_subtask_mut(sub_title).ok_or_else(|| {
                        StoreError::SubtaskNotFound {
                            project: name.to_string(),
                            task: task_title.to_string(),
                            subtask: sub_title.to_string(),
                        }
                    })?;
                    sub.choices.push(choice.clone());
                    sub.updated_at = now;
                }
                None => task.choices.push(choice.clone()),
            }
            task.updated_at = now;
            Ok(choice)
        })
    }

    /// Select an option on a task or subtask choice and stamp it resolved
    pub fn resolve_choice(
        &self,
        name: &str,
        task_title: &str,
        choice_id: &str,
        selected: &str,
        reasoning: &str,
    ) -> Result<Choice, StoreError> {
        self.update_project(name, |project| {
            let task = find_task(project, name, task_title)?;
            let choice = task
                .choices
                .iter_mut()
                .chain(task.subtasks.iter_mut().flat_map(|s| s.choices.iter_mut()))
                .find(|c| c.id == choice_id)
                .ok_or_else(|| StoreError::ChoiceNotFound {
                    project: name.to_string(),
                    task: task_title.to_string(),
                    choice: choice_id.to_string(),
                })?;
            if !choice.options.iter().any(|o| o == selected) {
                return Err(ValidationError::InvalidChoice(format!(
                    "selected option '{}' is not in the available options",
                    selected
                ))
                .into());
            }
            let now = Utc::now();
            choice.selected = Some(selected.to_string());
            choice.reasoning = reasoning.to_string();
            choice.resolved_at = Some(now);
            let resolved = choice.clone();
            task.updated_at = now;
            Ok(resolved)
        })
    }
}

fn find_task<'a>(
    project: &'a mut Project,
    name: &str,
    title: &str,
) -> Result<&'a mut Task, StoreError> {
    project
        .find_task_mut(title)
        .ok_or_else(|| StoreError::TaskNotFound {
            project: name.to_string(),
            task: title.to_string(),
        })
}
