//! End-to-end scenarios against a real store directory.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use taskmd::io::{StoreError, TaskStore};
use taskmd::model::{Status, Subtask, Task};
use taskmd::ops::{
    all_dependencies, apply_status_update, detect_circular_dependencies, tasks_needing_attention,
    AttentionType, StatusTarget,
};
use tempfile::TempDir;

fn store() -> (TempDir, TaskStore) {
    let tmp = TempDir::new().unwrap();
    let store = TaskStore::new(tmp.path().join("tasks")).unwrap();
    (tmp, store)
}

fn task_with_deps(id: u32, title: &str, deps: &[u32]) -> Task {
    let mut task = Task::new(title, "d");
    task.id = id;
    task.dependencies = deps.to_vec();
    task
}

#[test]
fn next_task_until_all_completed() {
    let (_tmp, store) = store();
    store.create_project("demo").unwrap();
    store
        .add_task("demo", Task::new("Write spec", "Draft it"))
        .unwrap();

    let (task, subtask) = store.get_next_task("demo").unwrap();
    assert_eq!(task.title, "Write spec");
    assert!(subtask.is_none());

    store
        .update_task_status("demo", "Write spec", None, Status::Done)
        .unwrap();
    assert!(matches!(
        store.get_next_task("demo"),
        Err(StoreError::AllCompleted(ref name)) if name == "demo"
    ));
}

#[test]
fn last_subtask_promotes_parent() {
    let (_tmp, store) = store();
    store.create_project("demo").unwrap();
    let mut task = Task::new("Ship feature", "Get it out");
    task.subtasks = ["design", "code", "test"]
        .iter()
        .map(|t| Subtask::new(*t))
        .collect();
    store.add_task("demo", task).unwrap();

    store
        .update_task_status("demo", "Ship feature", Some("design"), Status::Done)
        .unwrap();
    store
        .update_task_status("demo", "Ship feature", Some("code"), Status::Done)
        .unwrap();
    let parent = &store.load_project("demo").unwrap().tasks[0];
    assert_ne!(parent.status, Status::Done);

    let changes = store
        .update_task_status("demo", "Ship feature", Some("test"), Status::Done)
        .unwrap();
    assert!(changes.len() >= 2);
    let parent = &store.load_project("demo").unwrap().tasks[0];
    assert_eq!(parent.status, Status::Done);
}

#[test]
fn done_task_completes_every_subtask() {
    let (_tmp, store) = store();
    store.create_project("demo").unwrap();
    let mut task = Task::new("Mixed", "d");
    let statuses = [Status::Todo, Status::InProgress, Status::Blocked, Status::Done];
    task.subtasks = statuses
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut sub = Subtask::new(format!("sub {}", i));
            sub.status = *s;
            sub
        })
        .collect();
    store.add_task("demo", task).unwrap();

    store
        .update_task_status("demo", "Mixed", None, Status::Done)
        .unwrap();
    let task = &store.load_project("demo").unwrap().tasks[0];
    assert!(task.subtasks.iter().all(|s| s.status == Status::Done));
}

#[test]
fn new_task_after_max_id_seven_gets_eight() {
    let (_tmp, store) = store();
    store.create_project("ids").unwrap();
    store
        .update_project("ids", |p| {
            p.tasks.push(task_with_deps(2, "Two", &[]));
            p.tasks.push(task_with_deps(7, "Seven", &[]));
            Ok(())
        })
        .unwrap();
    let added = store.add_task("ids", Task::new("Eight", "d")).unwrap();
    assert_eq!(added.id, 8);
}

#[test]
fn three_task_cycle_reported_for_all() {
    let (_tmp, store) = store();
    store.create_project("cyc").unwrap();
    store
        .update_project("cyc", |p| {
            p.tasks.push(task_with_deps(1, "A", &[2]));
            p.tasks.push(task_with_deps(2, "B", &[3]));
            p.tasks.push(task_with_deps(3, "C", &[1]));
            Ok(())
        })
        .unwrap();
    let project = store.load_project("cyc").unwrap();
    let overview = all_dependencies(&project);
    assert_eq!(overview.circular_dependencies, vec!["A", "B", "C"]);
    assert_eq!(overview.count, 3);
}

#[test]
fn chain_without_back_edge_has_no_cycle() {
    let tasks = vec![
        task_with_deps(1, "A", &[2]),
        task_with_deps(2, "B", &[3]),
        task_with_deps(3, "C", &[]),
    ];
    assert!(detect_circular_dependencies(&tasks).is_empty());
}

#[test]
fn overrun_flagged_only_past_estimate() {
    let (_tmp, store) = store();
    store.create_project("att").unwrap();
    let mut task = Task::new("Quick fix", "d");
    task.status = Status::InProgress;
    task.estimated_hours = 2;
    store.add_task("att", task).unwrap();

    let mut project = store.load_project("att").unwrap();
    let now = Utc::now();

    project.tasks[0].updated_at = now - Duration::hours(3);
    let items = tasks_needing_attention(&project, now);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].kind, AttentionType::Overdue);
    assert_eq!(items[0].task_title, "Quick fix");

    project.tasks[0].updated_at = now - Duration::hours(1);
    assert!(tasks_needing_attention(&project, now).is_empty());
}

#[test]
fn cascade_is_pure_without_storage() {
    let (_tmp, store) = store();
    store.create_project("pure").unwrap();
    let mut task = Task::new("T", "d");
    task.subtasks = vec![Subtask::new("only")];
    store.add_task("pure", task).unwrap();

    let mut project = store.load_project("pure").unwrap();
    let changes = apply_status_update(
        &mut project,
        StatusTarget::new("T", Some("only")),
        Status::Done,
    )
    .unwrap();
    assert!(!changes.is_empty());
    assert_eq!(project.tasks[0].status, Status::Done);
    // the stored document is untouched until saved
    assert_eq!(store.load_project("pure").unwrap().tasks[0].status, Status::Todo);
}

#[test]
fn title_with_tag_prefix_stays_addressable() {
    let (_tmp, store) = store();
    store.create_project("demo").unwrap();
    store
        .add_task("demo", Task::new("[AI] Chatbot", "d"))
        .unwrap();

    let task = &store.load_project("demo").unwrap().tasks[0];
    assert_eq!(task.title, "[AI] Chatbot");
    assert_eq!(task.category, None);

    store
        .update_task_status("demo", "[AI] Chatbot", None, Status::Done)
        .unwrap();
    let task = &store.load_project("demo").unwrap().tasks[0];
    assert_eq!(task.status, Status::Done);
}

#[test]
fn description_bullets_do_not_become_dependencies() {
    let (_tmp, store) = store();
    store.create_project("demo").unwrap();
    let description = "Steps:\n- install deps\n- Task 3\n# heading";
    store
        .add_task("demo", Task::new("Setup", description))
        .unwrap();

    let project = store.load_project("demo").unwrap();
    assert_eq!(project.tasks[0].description, description);
    assert!(project.tasks[0].dependencies.is_empty());
    assert!(all_dependencies(&project).circular_dependencies.is_empty());
}
