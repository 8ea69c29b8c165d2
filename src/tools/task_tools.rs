use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::io::{ComplexityEstimate, StoreError, TaskStore};
use crate::model::validate::{
    validate_category, validate_complexity, validate_description, validate_estimated_hours,
    validate_priority, validate_status, validate_title,
};
use crate::model::{Category, Subtask, Task, ValidationError};
use crate::ops::{
    all_dependencies, auto_update_task_statuses, suggest_next_actions, task_dependencies,
    tasks_needing_attention, AttentionType, SuggestOptions,
};
use crate::tools::args::{
    optional_bool, optional_str, optional_str_list, optional_u32, optional_u32_list, required_str,
    ArgError,
};
use crate::tools::{ToolCall, ToolError, ToolHandler, ToolOutput, PROJECT_NAME_ARG};

/// Upper bound on subtasks supplied with a new task
pub const MAX_SUBTASKS_PER_TASK: usize = 50;

/// Every operation name [`TaskTools`] answers to
pub const OPERATIONS: [&str; 15] = [
    "create_task_file",
    "add_task",
    "update_task_status",
    "get_next_task",
    "list_projects",
    "get_task_dependencies",
    "get_tasks_needing_attention",
    "auto_update_tasks",
    "suggest_next_actions",
    "expand_task",
    "estimate_task_complexity",
    "add_choice",
    "resolve_choice",
    "project_summary",
    "debug_info",
];

#[derive(Debug, thiserror::Error)]
enum OpError {
    #[error(transparent)]
    Arg(#[from] ArgError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown operation")]
    Unknown,
}

type OpResult = Result<Value, OpError>;
type Args = Map<String, Value>;

/// The store's operations exposed through [`ToolHandler`]. Store I/O runs on
/// the blocking pool.
#[derive(Debug, Clone)]
pub struct TaskTools {
    store: Arc<TaskStore>,
}

impl TaskTools {
    pub fn new(store: Arc<TaskStore>) -> Self {
        TaskTools { store }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }
}

#[async_trait]
impl ToolHandler for TaskTools {
    async fn call(
        &self,
        call: &ToolCall,
        _cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError> {
        let store = Arc::clone(&self.store);
        let owned = call.clone();
        let result = tokio::task::spawn_blocking(move || dispatch(&store, &owned))
            .await
            .map_err(|e| ToolError::new(&call.name, e))?;
        result
            .map(ToolOutput::Json)
            .map_err(|e| ToolError::new(&call.name, e))
    }
}

/// Run one operation synchronously against the store
fn dispatch(store: &TaskStore, call: &ToolCall) -> OpResult {
    debug!(operation = %call.name, "dispatching");
    let args = &call.args;
    match call.name.as_str() {
        "create_task_file" => create_task_file(store, args),
        "add_task" => add_task(store, args),
        "update_task_status" => update_task_status(store, args),
        "get_next_task" => get_next_task(store, args),
        "list_projects" => list_projects(store),
        "get_task_dependencies" => get_task_dependencies(store, args),
        "get_tasks_needing_attention" => get_tasks_needing_attention(store, args),
        "auto_update_tasks" => auto_update_tasks(store, args),
        "suggest_next_actions" => suggest(store, args),
        "expand_task" => expand_task(store, args),
        "estimate_task_complexity" => estimate_task_complexity(store, args),
        "add_choice" => add_choice(store, args),
        "resolve_choice" => resolve_choice(store, args),
        "project_summary" => project_summary(store, args),
        "debug_info" => debug_info(store),
        _ => Err(OpError::Unknown),
    }
}

fn project_arg(args: &Args) -> Result<&str, ArgError> {
    required_str(args, PROJECT_NAME_ARG)
}

/// Accepts `MVP` as well as the bracketed `[MVP]`
fn parse_category(raw: &str) -> Result<Category, ValidationError> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        validate_category(raw)
    } else {
        validate_category(&format!("[{}]", raw.to_ascii_uppercase())).map_err(|_| {
            ValidationError::InvalidEnumValue {
                field: "category",
                value: raw.to_string(),
                allowed: Category::ALL.iter().map(|c| c.as_str()).collect(),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Project operations
// ---------------------------------------------------------------------------

fn create_task_file(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    let description = optional_str(args, "description")?
        .map(str::trim)
        .filter(|d| !d.is_empty());
    if let Some(description) = description {
        validate_description(description)?;
    }
    let mut project = store.create_project(name)?;
    if let Some(description) = description {
        project.description = description.to_string();
        store.save_project(&mut project)?;
    }
    Ok(json!({
        "project_name": project.name,
        "file": store.project_path(name).display().to_string(),
        "created": true,
    }))
}

fn list_projects(store: &TaskStore) -> OpResult {
    let projects = store.list_projects()?;
    Ok(json!({ "count": projects.len(), "projects": projects }))
}

fn project_summary(store: &TaskStore, args: &Args) -> OpResult {
    let project = store.load_project(project_arg(args)?)?;
    let include_tasks = optional_bool(args, "include_tasks")?.unwrap_or(false);
    Ok(json!({
        "summary": project.summary(include_tasks),
        "progress": project.progress(),
    }))
}

fn debug_info(store: &TaskStore) -> OpResult {
    let projects = store.list_projects()?;
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "tasks_dir": store.dir().display().to_string(),
        "project_count": projects.len(),
        "projects": projects,
        "operations": OPERATIONS,
        "server_time": Utc::now(),
    }))
}

// ---------------------------------------------------------------------------
// Task operations
// ---------------------------------------------------------------------------

fn add_task(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    let title = required_str(args, "title")?.trim();
    let description = required_str(args, "description")?;
    validate_title(title)?;
    validate_description(description)?;

    let mut task = Task::new(title, description.trim());
    if let Some(raw) = optional_str(args, "category")?.filter(|s| !s.is_empty()) {
        task.category = Some(parse_category(raw)?);
    }
    if let Some(raw) = optional_str(args, "priority")? {
        task.priority = validate_priority(raw)?;
    }
    if let Some(raw) = optional_str(args, "complexity")? {
        task.complexity = Some(validate_complexity(raw)?);
    }
    if let Some(hours) = optional_u32(args, "estimated_hours")? {
        task.estimated_hours = validate_estimated_hours(hours)?;
    }
    task.dependencies = optional_u32_list(args, "dependencies")?;

    let subtasks = optional_str_list(args, "subtasks")?;
    if subtasks.len() > MAX_SUBTASKS_PER_TASK {
        return Err(ValidationError::InvalidTitle(format!(
            "too many subtasks ({}, max {})",
            subtasks.len(),
            MAX_SUBTASKS_PER_TASK
        ))
        .into());
    }
    for sub in &subtasks {
        validate_title(sub.trim())?;
        task.subtasks.push(Subtask::new(sub.trim()));
    }

    if store.load_project(name)?.find_task(title).is_some() {
        return Err(StoreError::AlreadyExists(format!("task '{}'", title)).into());
    }
    let task = store.add_task(name, task)?;
    Ok(json!({
        "message": format!("Added task {}: {}", task.id, task.title),
        "task": task.summary(),
    }))
}

fn update_task_status(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    let task_title = required_str(args, "task_title")?;
    let subtask_title = optional_str(args, "subtask_title")?.filter(|s| !s.is_empty());
    let status = validate_status(required_str(args, "status")?)?;
    let changes = store.update_task_status(name, task_title, subtask_title, status)?;
    Ok(json!({
        "task_title": task_title,
        "subtask_title": subtask_title,
        "status": status,
        "changes": changes,
    }))
}

fn get_next_task(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    match store.get_next_task(name) {
        Ok((task, subtask)) => Ok(json!({
            "task": task.summary(),
            "description": task.description,
            "subtask": subtask.map(|s| json!({"title": s.title, "status": s.status})),
        })),
        Err(e) if e.is_all_completed() => Ok(json!({
            "all_completed": true,
            "message": format!("All tasks in project {} are completed", name),
        })),
        Err(e) => Err(e.into()),
    }
}

fn get_task_dependencies(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    let project = store.load_project(name)?;
    let include_dependents = optional_bool(args, "include_dependents")?.unwrap_or(false);
    match optional_str(args, "task_title")?.filter(|s| !s.is_empty()) {
        Some(title) => {
            let report = task_dependencies(&project, title, include_dependents).map_err(|_| {
                StoreError::TaskNotFound {
                    project: name.to_string(),
                    task: title.to_string(),
                }
            })?;
            Ok(json!(report))
        }
        None => Ok(json!(all_dependencies(&project))),
    }
}

fn get_tasks_needing_attention(store: &TaskStore, args: &Args) -> OpResult {
    let project = store.load_project(project_arg(args)?)?;
    let filter = match optional_str(args, "attention_type")?.filter(|s| !s.is_empty()) {
        Some(raw) => Some(AttentionType::from_str_exact(raw).ok_or_else(|| {
            ValidationError::InvalidEnumValue {
                field: "attention_type",
                value: raw.to_string(),
                allowed: AttentionType::ALL.iter().map(|t| t.as_str()).collect(),
            }
        })?),
        None => None,
    };
    let items: Vec<_> = tasks_needing_attention(&project, Utc::now())
        .into_iter()
        .filter(|item| filter.is_none_or(|kind| item.kind == kind))
        .collect();
    Ok(json!({ "count": items.len(), "items": items }))
}

fn auto_update_tasks(store: &TaskStore, args: &Args) -> OpResult {
    let mut project = store.load_project(project_arg(args)?)?;
    let dry_run = optional_bool(args, "dry_run")?.unwrap_or(false);
    let (changes, changed) = auto_update_task_statuses(&mut project);
    if changed && !dry_run {
        store.save_project(&mut project)?;
    }
    Ok(json!({
        "changed": changed,
        "dry_run": dry_run,
        "changes": changes,
    }))
}

fn suggest(store: &TaskStore, args: &Args) -> OpResult {
    let project = store.load_project(project_arg(args)?)?;
    let opts = SuggestOptions {
        focus_category: optional_str(args, "focus_category")?
            .filter(|s| !s.is_empty())
            .map(parse_category)
            .transpose()?,
        max: optional_u32(args, "max_suggestions")?.map(|n| n as usize),
        include_blocked: optional_bool(args, "include_blocked")?.unwrap_or(false),
    };
    let suggestions = suggest_next_actions(&project, &opts);
    Ok(json!({ "count": suggestions.len(), "suggestions": suggestions }))
}

fn expand_task(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    let task_title = required_str(args, "task_title")?;
    let subtasks: Vec<String> = optional_str_list(args, "subtasks")?
        .into_iter()
        .map(|s| s.trim().to_string())
        .collect();
    if subtasks.is_empty() {
        return Err(ArgError::Missing("subtasks").into());
    }
    let reasoning = optional_str(args, "reasoning")?;
    let task = store.expand_task(name, task_title, &subtasks, reasoning)?;
    Ok(json!({
        "added": subtasks.len(),
        "task": task.summary(),
    }))
}

fn estimate_task_complexity(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    let task_title = required_str(args, "task_title")?;
    let estimate = ComplexityEstimate {
        complexity: validate_complexity(required_str(args, "complexity")?)?,
        estimated_hours: optional_u32(args, "estimated_hours")?
            .ok_or(ArgError::Missing("estimated_hours"))?,
        reasoning: optional_str(args, "reasoning")?.map(str::to_string),
        suggested_subtasks: optional_str_list(args, "suggested_subtasks")?,
        auto_create: optional_bool(args, "auto_create_subtasks")?.unwrap_or(false),
    };
    let task = store.set_task_complexity(name, task_title, &estimate)?;
    Ok(json!({ "task": task.summary() }))
}

fn add_choice(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    let task_title = required_str(args, "task_title")?;
    let subtask_title = optional_str(args, "subtask_title")?.filter(|s| !s.is_empty());
    let question = required_str(args, "question")?;
    let options = optional_str_list(args, "options")?;
    let choice = store.add_choice(name, task_title, subtask_title, question, options)?;
    Ok(json!({ "choice": choice }))
}

fn resolve_choice(store: &TaskStore, args: &Args) -> OpResult {
    let name = project_arg(args)?;
    let choice = store.resolve_choice(
        name,
        required_str(args, "task_title")?,
        required_str(args, "choice_id")?,
        required_str(args, "selected_option")?,
        optional_str(args, "reasoning")?.unwrap_or(""),
    )?;
    Ok(json!({ "choice": choice }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn tools() -> (TempDir, TaskTools) {
        let tmp = TempDir::new().unwrap();
        let store = TaskStore::new(tmp.path().join("tasks")).unwrap();
        (tmp, TaskTools::new(Arc::new(store)))
    }

    async fn run(tools: &TaskTools, name: &str, args: Value) -> Result<Value, ToolError> {
        let call = ToolCall::from_value(name, args);
        match tools.call(&call, &CancellationToken::new()).await? {
            ToolOutput::Json(v) => Ok(v),
            ToolOutput::Text(t) => panic!("unexpected text output: {}", t),
        }
    }

    #[tokio::test]
    async fn test_create_add_and_next() {
        let (_tmp, tools) = tools();
        run(&tools, "create_task_file", json!({"project_name": "demo"}))
            .await
            .unwrap();
        let added = run(
            &tools,
            "add_task",
            json!({
                "project_name": "demo",
                "title": "Write spec",
                "description": "Draft it",
                "category": "MVP",
                "priority": "P1",
            }),
        )
        .await
        .unwrap();
        assert_eq!(added["task"]["id"], json!(1));
        assert_eq!(added["task"]["category"], json!("[MVP]"));

        let next = run(&tools, "get_next_task", json!({"project_name": "demo"}))
            .await
            .unwrap();
        assert_eq!(next["task"]["title"], json!("Write spec"));
        assert_eq!(next["subtask"], Value::Null);

        run(
            &tools,
            "update_task_status",
            json!({"project_name": "demo", "task_title": "Write spec", "status": "done"}),
        )
        .await
        .unwrap();
        let next = run(&tools, "get_next_task", json!({"project_name": "demo"}))
            .await
            .unwrap();
        assert_eq!(next["all_completed"], json!(true));
    }

    #[tokio::test]
    async fn test_add_task_validation() {
        let (_tmp, tools) = tools();
        run(&tools, "create_task_file", json!({"project_name": "demo"}))
            .await
            .unwrap();
        let base = json!({"project_name": "demo", "title": "T", "description": "d"});
        run(&tools, "add_task", base.clone()).await.unwrap();

        let err = run(&tools, "add_task", base).await.unwrap_err();
        assert_eq!(err.operation, "add_task");
        assert!(err.message.contains("already exists"));

        let err = run(
            &tools,
            "add_task",
            json!({"project_name": "demo", "title": "U", "description": "d", "priority": "P9"}),
        )
        .await
        .unwrap_err();
        assert!(err.message.contains("Valid options: P0, P1, P2, P3"));

        let many: Vec<String> = (0..51).map(|i| format!("sub {}", i)).collect();
        let err = run(
            &tools,
            "add_task",
            json!({"project_name": "demo", "title": "V", "description": "d", "subtasks": many}),
        )
        .await
        .unwrap_err();
        assert!(err.message.contains("too many subtasks"));

        let err = run(&tools, "add_task", json!({"project_name": "demo", "title": "W"}))
            .await
            .unwrap_err();
        assert!(err.message.contains("description"));
    }

    #[tokio::test]
    async fn test_unknown_operation_and_missing_project() {
        let (_tmp, tools) = tools();
        let err = run(&tools, "frobnicate", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "frobnicate: unknown operation");

        let err = run(&tools, "project_summary", json!({"project_name": "ghost"}))
            .await
            .unwrap_err();
        assert!(err.message.contains("project not found"));
    }

    #[tokio::test]
    async fn test_dependencies_and_attention_filter() {
        let (_tmp, tools) = tools();
        run(&tools, "create_task_file", json!({"project_name": "p"}))
            .await
            .unwrap();
        for (title, deps) in [("A", json!([3])), ("B", json!([1])), ("C", json!([2]))] {
            run(
                &tools,
                "add_task",
                json!({"project_name": "p", "title": title, "description": "d", "dependencies": deps}),
            )
            .await
            .unwrap();
        }
        let overview = run(&tools, "get_task_dependencies", json!({"project_name": "p"}))
            .await
            .unwrap();
        assert_eq!(overview["circular_dependencies"], json!(["A", "B", "C"]));

        let single = run(
            &tools,
            "get_task_dependencies",
            json!({"project_name": "p", "task_title": "B", "include_dependents": true}),
        )
        .await
        .unwrap();
        assert_eq!(single["dependencies"][0]["title"], json!("A"));
        assert_eq!(single["dependents"][0]["title"], json!("C"));

        let attention = run(
            &tools,
            "get_tasks_needing_attention",
            json!({"project_name": "p", "attention_type": "stale"}),
        )
        .await
        .unwrap();
        assert_eq!(attention["count"], json!(0));
        assert!(run(
            &tools,
            "get_tasks_needing_attention",
            json!({"project_name": "p", "attention_type": "bogus"}),
        )
        .await
        .is_err());
    }

    #[tokio::test]
    async fn test_choices_and_summary() {
        let (_tmp, tools) = tools();
        run(
            &tools,
            "create_task_file",
            json!({"project_name": "p", "description": "Choice demo"}),
        )
        .await
        .unwrap();
        run(
            &tools,
            "add_task",
            json!({"project_name": "p", "title": "Pick DB", "description": "d"}),
        )
        .await
        .unwrap();
        let added = run(
            &tools,
            "add_choice",
            json!({
                "project_name": "p",
                "task_title": "Pick DB",
                "question": "Which DB?",
                "options": ["Postgres", "SQLite"],
            }),
        )
        .await
        .unwrap();
        let id = added["choice"]["id"].as_str().unwrap().to_string();

        let summary = run(&tools, "project_summary", json!({"project_name": "p"}))
            .await
            .unwrap();
        assert_eq!(summary["summary"]["pending_choices"], json!(1));
        assert_eq!(summary["summary"]["description"], json!("Choice demo"));

        run(
            &tools,
            "resolve_choice",
            json!({
                "project_name": "p",
                "task_title": "Pick DB",
                "choice_id": id,
                "selected_option": "SQLite",
                "reasoning": "embedded",
            }),
        )
        .await
        .unwrap();
        let summary = run(&tools, "project_summary", json!({"project_name": "p"}))
            .await
            .unwrap();
        assert_eq!(summary["progress"]["pending_choices"], json!(0));
    }

    #[tokio::test]
    async fn test_expand_estimate_and_suggest() {
        let (_tmp, tools) = tools();
        run(&tools, "create_task_file", json!({"project_name": "p"}))
            .await
            .unwrap();
        run(
            &tools,
            "add_task",
            json!({"project_name": "p", "title": "Big", "description": "d", "priority": "P0"}),
        )
        .await
        .unwrap();
        let expanded = run(
            &tools,
            "expand_task",
            json!({"project_name": "p", "task_title": "Big", "subtasks": ["one", "two"]}),
        )
        .await
        .unwrap();
        assert_eq!(expanded["task"]["subtask_count"], json!(2));

        let estimated = run(
            &tools,
            "estimate_task_complexity",
            json!({
                "project_name": "p",
                "task_title": "Big",
                "complexity": "high",
                "estimated_hours": 20,
                "suggested_subtasks": ["three"],
                "auto_create_subtasks": true,
            }),
        )
        .await
        .unwrap();
        assert_eq!(estimated["task"]["subtask_count"], json!(3));
        assert_eq!(estimated["task"]["complexity"], json!("high"));

        let suggestions = run(&tools, "suggest_next_actions", json!({"project_name": "p"}))
            .await
            .unwrap();
        assert_eq!(suggestions["count"], json!(1));
        assert_eq!(suggestions["suggestions"][0]["title"], json!("Big"));
    }

    #[tokio::test]
    async fn test_auto_update_dry_run() {
        let (_tmp, tools) = tools();
        let store = Arc::clone(tools.store());
        store.create_project("p").unwrap();
        let mut task = Task::new("Parent", "d");
        let mut sub = Subtask::new("only");
        sub.status = crate::model::Status::Done;
        task.subtasks.push(sub);
        store.add_task("p", task).unwrap();

        let dry = run(
            &tools,
            "auto_update_tasks",
            json!({"project_name": "p", "dry_run": true}),
        )
        .await
        .unwrap();
        assert_eq!(dry["changed"], json!(true));
        assert_eq!(
            store.load_project("p").unwrap().tasks[0].status,
            crate::model::Status::Todo
        );

        run(&tools, "auto_update_tasks", json!({"project_name": "p"}))
            .await
            .unwrap();
        assert_eq!(
            store.load_project("p").unwrap().tasks[0].status,
            crate::model::Status::Done
        );
    }

    #[tokio::test]
    async fn test_list_and_debug_info() {
        let (_tmp, tools) = tools();
        for name in ["b", "a"] {
            run(&tools, "create_task_file", json!({"project_name": name}))
                .await
                .unwrap();
        }
        let listed = run(&tools, "list_projects", json!({})).await.unwrap();
        assert_eq!(listed["projects"], json!(["a", "b"]));
        let info = run(&tools, "debug_info", json!({})).await.unwrap();
        assert_eq!(info["project_count"], json!(2));
    }
}
