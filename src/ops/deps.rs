use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Project, Status, Task};
use crate::ops::status::TaskError;

/// One end of a dependency edge, resolved against the project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyRef {
    pub id: u32,
    pub title: String,
    pub status: Status,
}

impl DependencyRef {
    fn of(task: &Task) -> Self {
        DependencyRef {
            id: task.id,
            title: task.title.clone(),
            status: task.status,
        }
    }
}

/// Structured result for a single task's dependencies, suitable for JSON output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskDependencies {
    pub task_id: u32,
    pub title: String,
    pub dependencies: Vec<DependencyRef>,
    /// Dependency IDs that reference no existing task
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<u32>,
    /// True when every existing dependency is done
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependents: Option<Vec<DependencyRef>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyOverview {
    pub tasks_with_dependencies: Vec<TaskDependencies>,
    pub count: usize,
    pub circular_dependencies: Vec<String>,
}

fn index_by_id(tasks: &[Task]) -> IndexMap<u32, &Task> {
    tasks.iter().map(|t| (t.id, t)).collect()
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

/// Titles of every task that lies on a dependency cycle, in document order.
///
/// Runs a depth-first walk from each task with its own visited set and a
/// recursion stack; reaching a node on the stack marks the stack segment from
/// that node onward as cyclic. IDs with no matching task are ignored.
pub fn detect_circular_dependencies(tasks: &[Task]) -> Vec<String> {
    let index = index_by_id(tasks);
    let mut in_cycle: HashSet<u32> = HashSet::new();

    for task in tasks {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        walk(task.id, &index, &mut visited, &mut stack, &mut in_cycle);
    }

    tasks
        .iter()
        .filter(|t| in_cycle.contains(&t.id))
        .map(|t| t.title.clone())
        .collect()
}

fn walk(
    id: u32,
    index: &IndexMap<u32, &Task>,
    visited: &mut HashSet<u32>,
    stack: &mut Vec<u32>,
    in_cycle: &mut HashSet<u32>,
) {
    if let Some(pos) = stack.iter().position(|&s| s == id) {
        in_cycle.extend(&stack[pos..]);
        return;
    }
    if !visited.insert(id) {
        return;
    }
    let Some(task) = index.get(&id) else {
        return;
    };
    stack.push(id);
    for dep in &task.dependencies {
        walk(*dep, index, visited, stack, in_cycle);
    }
    stack.pop();
}

// ---------------------------------------------------------------------------
// Dependency reports
// ---------------------------------------------------------------------------

/// True when every dependency that resolves to a task is done
pub fn is_ready(project: &Project, task: &Task) -> bool {
    task.dependencies
        .iter()
        .filter_map(|id| project.task_by_id(*id))
        .all(Task::is_completed)
}

fn report(project: &Project, task: &Task, include_dependents: bool) -> TaskDependencies {
    let index = index_by_id(&project.tasks);
    let mut dependencies = Vec::new();
    let mut missing = Vec::new();
    for id in &task.dependencies {
        match index.get(id) {
            Some(dep) => dependencies.push(DependencyRef::of(dep)),
            None => missing.push(*id),
        }
    }
    let ready = dependencies.iter().all(|d| d.status == Status::Done);

    let dependents = include_dependents.then(|| {
        project
            .tasks
            .iter()
            .filter(|t| t.dependencies.contains(&task.id))
            .map(DependencyRef::of)
            .collect()
    });

    TaskDependencies {
        task_id: task.id,
        title: task.title.clone(),
        dependencies,
        missing,
        ready,
        dependents,
    }
}

/// Dependencies (and optionally dependents) of the task titled `title`
pub fn task_dependencies(
    project: &Project,
    title: &str,
    include_dependents: bool,
) -> Result<TaskDependencies, TaskError> {
    let task = project
        .find_task(title)
        .ok_or_else(|| TaskError::NotFound(title.to_string()))?;
    Ok(report(project, task, include_dependents))
}

/// Every task that has dependencies, plus the cycle report
pub fn all_dependencies(project: &Project) -> DependencyOverview {
    let tasks_with_dependencies: Vec<TaskDependencies> = project
        .tasks
        .iter()
        .filter(|t| !t.dependencies.is_empty())
        .map(|t| report(project, t, false))
        .collect();
    DependencyOverview {
        count: tasks_with_dependencies.len(),
        tasks_with_dependencies,
        circular_dependencies: detect_circular_dependencies(&project.tasks),
    }
}
