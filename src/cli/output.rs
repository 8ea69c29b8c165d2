use serde_json::Value;

use crate::tools::ToolOutput;

/// Print an operation's output: raw JSON with `--json`, else readable lines
pub fn print_output(operation: &str, output: &ToolOutput, json: bool) {
    match output {
        ToolOutput::Json(value) if !json => {
            for line in format_text(operation, value) {
                println!("{}", line);
            }
        }
        other => println!("{}", other.render()),
    }
}

/// String form of `value[key]`: strings unquoted, null as empty
fn field(value: &Value, key: &str) -> String {
    match &value[key] {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn task_line(task: &Value) -> String {
    let mut line = format!("#{} {}", field(task, "id"), field(task, "title"));
    if let Some(category) = task["category"].as_str() {
        line = format!("{} {}", line, category);
    }
    format!(
        "{} ({}) [{}]",
        line,
        field(task, "priority"),
        field(task, "status")
    )
}

// ---------------------------------------------------------------------------
// Per-operation text
// ---------------------------------------------------------------------------

pub fn format_text(operation: &str, value: &Value) -> Vec<String> {
    let mut lines = match operation {
        "create_task_file" => vec![format!(
            "Created project {} ({})",
            field(value, "project_name"),
            field(value, "file")
        )],
        "add_task" => vec![field(value, "message")],
        "update_task_status" => format_status_update(value),
        "get_next_task" => format_next(value),
        "list_projects" => format_list(value),
        "get_task_dependencies" => format_deps(value),
        "get_tasks_needing_attention" => format_attention(value),
        "auto_update_tasks" => format_auto_update(value),
        "suggest_next_actions" => format_suggestions(value),
        "expand_task" | "estimate_task_complexity" => {
            let task = &value["task"];
            let mut line = format!(
                "{}: {} subtasks",
                task_line(task),
                field(task, "subtask_count")
            );
            if let Some(c) = task["complexity"].as_str() {
                line.push_str(&format!(", {} complexity", c));
            }
            if let Some(h) = task["estimated_hours"].as_u64() {
                line.push_str(&format!(", {}h", h));
            }
            vec![line]
        }
        "add_choice" | "resolve_choice" => format_choice(&value["choice"]),
        "project_summary" => format_summary(value),
        _ => vec![serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())],
    };
    if let Some(eval) = value.get("auto_evaluation") {
        lines.push(String::new());
        lines.extend(format_auto_evaluation(eval));
    }
    lines
}

fn format_status_update(value: &Value) -> Vec<String> {
    let target = match value["subtask_title"].as_str() {
        Some(sub) => format!("{} / {}", field(value, "task_title"), sub),
        None => field(value, "task_title"),
    };
    let mut lines = vec![format!("{} -> {}", target, field(value, "status"))];
    lines.extend(string_items(&value["changes"]).map(|c| format!("  {}", c)));
    lines
}

fn format_next(value: &Value) -> Vec<String> {
    if value["all_completed"].as_bool() == Some(true) {
        return vec![field(value, "message")];
    }
    let mut lines = vec![format!("Next: {}", task_line(&value["task"]))];
    let description = field(value, "description");
    if !description.is_empty() {
        lines.extend(description.lines().map(|l| format!("  {}", l)));
    }
    if value["subtask"].is_object() {
        lines.push(format!(
            "  subtask: {} [{}]",
            field(&value["subtask"], "title"),
            field(&value["subtask"], "status")
        ));
    }
    lines
}

fn format_list(value: &Value) -> Vec<String> {
    let lines: Vec<String> = string_items(&value["projects"]).collect();
    if lines.is_empty() {
        vec!["No projects.".to_string()]
    } else {
        lines
    }
}

fn dependency_refs(list: &Value) -> Vec<String> {
    items(list)
        .map(|d| format!("#{} {} [{}]", field(d, "id"), field(d, "title"), field(d, "status")))
        .collect()
}

fn format_deps(value: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    if value.get("tasks_with_dependencies").is_some() {
        for task in items(&value["tasks_with_dependencies"]) {
            lines.push(format!(
                "#{} {} <- {}",
                field(task, "task_id"),
                field(task, "title"),
                dependency_refs(&task["dependencies"]).join(", ")
            ));
        }
        if lines.is_empty() {
            lines.push("No dependencies.".to_string());
        }
        let cycles: Vec<String> = string_items(&value["circular_dependencies"]).collect();
        if !cycles.is_empty() {
            lines.push(format!("Circular: {}", cycles.join(", ")));
        }
        return lines;
    }

    let ready = if value["ready"].as_bool() == Some(true) {
        "ready"
    } else {
        "waiting"
    };
    lines.push(format!("#{} {} ({})", field(value, "task_id"), field(value, "title"), ready));
    lines.extend(dependency_refs(&value["dependencies"]).into_iter().map(|d| format!("  depends on {}", d)));
    lines.extend(dependency_refs(&value["dependents"]).into_iter().map(|d| format!("  needed by {}", d)));
    lines
}

fn format_attention(value: &Value) -> Vec<String> {
    let lines: Vec<String> = items(&value["items"])
        .map(|item| {
            let target = match item["subtask_title"].as_str() {
                Some(sub) => format!("{} / {}", field(item, "task_title"), sub),
                None => field(item, "task_title"),
            };
            format!("[{}] {}: {}", field(item, "type"), target, field(item, "reason"))
        })
        .collect();
    if lines.is_empty() {
        vec!["Nothing needs attention.".to_string()]
    } else {
        lines
    }
}

fn format_auto_update(value: &Value) -> Vec<String> {
    let mut lines: Vec<String> = string_items(&value["changes"]).collect();
    if lines.is_empty() {
        lines.push("No changes.".to_string());
    } else if value["dry_run"].as_bool() == Some(true) {
        lines.push("(dry run, nothing saved)".to_string());
    }
    lines
}

fn format_suggestions(value: &Value) -> Vec<String> {
    let lines: Vec<String> = items(&value["suggestions"])
        .map(|s| {
            format!(
                "{:>4}  #{} {} - {}",
                field(s, "score"),
                field(s, "task_id"),
                field(s, "title"),
                field(s, "reason")
            )
        })
        .collect();
    if lines.is_empty() {
        vec!["No suggestions.".to_string()]
    } else {
        lines
    }
}

fn format_choice(choice: &Value) -> Vec<String> {
    let mut lines = vec![format!("Choice {}: {}", field(choice, "id"), field(choice, "question"))];
    let selected = choice["selected"].as_str();
    for option in string_items(&choice["options"]) {
        let mark = if selected == Some(option.as_str()) { "x" } else { " " };
        lines.push(format!("  [{}] {}", mark, option));
    }
    let reasoning = field(choice, "reasoning");
    if !reasoning.is_empty() {
        lines.push(format!("  reasoning: {}", reasoning));
    }
    lines
}

fn format_summary(value: &Value) -> Vec<String> {
    let summary = &value["summary"];
    let progress = &value["progress"];
    let mut lines = vec![field(summary, "name")];
    let description = field(summary, "description");
    if !description.is_empty() {
        lines.push(description);
    }
    lines.push(format!(
        "Tasks: {}/{} done ({:.0}%)",
        field(progress, "completed_tasks"),
        field(progress, "total_tasks"),
        progress["task_progress"].as_f64().unwrap_or(0.0)
    ));
    lines.push(format!(
        "Items: {}/{} done ({:.0}%)",
        field(progress, "completed_items"),
        field(progress, "total_items"),
        progress["overall_progress"].as_f64().unwrap_or(0.0)
    ));
    lines.push(format!("Pending choices: {}", field(progress, "pending_choices")));
    for task in items(&summary["tasks"]) {
        lines.push(format!("  {}", task_line(task)));
    }
    lines
}

/// Readable form of the `auto_evaluation` block
pub fn format_auto_evaluation(eval: &Value) -> Vec<String> {
    let source = if eval["cache_hit"].as_bool() == Some(true) {
        "cache"
    } else {
        "fresh"
    };
    let mut lines = vec![format!(
        "Auto-evaluation of {} ({}, {})",
        field(eval, "project_name"),
        source,
        field(eval, "processing_time")
    )];
    lines.extend(string_items(&eval["updates_applied"]).map(|u| format!("  updated: {}", u)));
    lines.extend(items(&eval["attention_items"]).map(|item| {
        format!(
            "  attention: {}: {}",
            field(item, "task_title"),
            field(item, "reason")
        )
    }));
    lines
}

fn items(value: &Value) -> impl Iterator<Item = &Value> {
    value.as_array().into_iter().flatten()
}

fn string_items(value: &Value) -> impl Iterator<Item = String> + '_ {
    items(value).filter_map(|v| v.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_next_task_text() {
        let value = json!({
            "task": {"id": 3, "title": "Write spec", "priority": "P1", "status": "todo", "category": "[MVP]"},
            "description": "Draft it",
            "subtask": {"title": "outline", "status": "in_progress"},
        });
        assert_eq!(
            format_text("get_next_task", &value),
            vec![
                "Next: #3 Write spec [MVP] (P1) [todo]",
                "  Draft it",
                "  subtask: outline [in_progress]",
            ]
        );
        let done = json!({"all_completed": true, "message": "All tasks in project demo are completed"});
        assert_eq!(
            format_text("get_next_task", &done),
            vec!["All tasks in project demo are completed"]
        );
    }

    #[test]
    fn test_auto_evaluation_appended() {
        let value = json!({
            "message": "Added task 2: Next",
            "auto_evaluation": {
                "project_name": "demo",
                "cache_hit": true,
                "processing_time": "3ms",
                "updates_applied": ["Task 'A' auto-completed"],
                "attention_items": [{"task_title": "B", "reason": "stale", "type": "stale"}],
            }
        });
        assert_eq!(
            format_text("add_task", &value),
            vec![
                "Added task 2: Next",
                "",
                "Auto-evaluation of demo (cache, 3ms)",
                "  updated: Task 'A' auto-completed",
                "  attention: B: stale",
            ]
        );
    }

    #[test]
    fn test_dependency_overview_text() {
        let value = json!({
            "tasks_with_dependencies": [
                {"task_id": 2, "title": "B", "dependencies": [{"id": 1, "title": "A", "status": "done"}], "ready": true}
            ],
            "count": 1,
            "circular_dependencies": [],
        });
        assert_eq!(
            format_text("get_task_dependencies", &value),
            vec!["#2 B <- #1 A [done]"]
        );
    }

    #[test]
    fn test_unknown_operation_falls_back_to_json() {
        let lines = format_text("debug_info", &json!({"version": "1"}));
        assert_eq!(lines, vec!["{\n  \"version\": \"1\"\n}"]);
    }
}
