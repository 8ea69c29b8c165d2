use chrono::{DateTime, Utc};

use crate::model::{Choice, Project, Status, Subtask, Task};
use crate::parse::project_parser::is_plain_text;
use crate::parse::text::{escape_line, escape_title, format_meta, format_timestamp};

/// Static legend emitted after the preamble. Ignored on decode.
pub const LEGEND: [&str; 11] = [
    "## Categories",
    "- [MVP] Core functionality tasks",
    "- [AI] AI-related features",
    "- [UX] User experience improvements",
    "- [INFRA] Infrastructure and setup",
    "",
    "## Priority Levels",
    "- P0: Blocker/Critical",
    "- P1: High Priority",
    "- P2: Medium Priority",
    "- P3: Low Priority",
];

/// Encode a project into its markdown document
pub fn encode_project(project: &Project) -> String {
    let mut out = serialize_project(project).join("\n");
    out.push('\n');
    out
}

/// Serialize a project to document lines
pub fn serialize_project(project: &Project) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!("# {}", escape_line(&project.name)));
    lines.push(timestamps_meta(project.created_at, project.updated_at));
    lines.push(String::new());

    if push_paragraph(&project.description, &mut lines) {
        lines.push(String::new());
    }

    lines.extend(LEGEND.iter().map(|l| l.to_string()));
    lines.push(String::new());

    for task in &project.tasks {
        serialize_task(task, &mut lines);
    }
    lines
}

/// The task heading. Empty category renders with no tag.
pub fn task_heading(task: &Task) -> String {
    let mut heading = format!("## Task {}: ", task.id);
    if let Some(category) = task.category {
        heading.push_str(category.as_str());
        heading.push(' ');
    }
    heading.push_str(&escape_title(&task.title));
    heading.push_str(&format!(" ({}) [{}]", task.priority, task.status));
    heading
}

fn serialize_task(task: &Task, lines: &mut Vec<String>) {
    lines.push(task_heading(task));
    lines.push(timestamps_meta(task.created_at, task.updated_at));
    lines.push(String::new());

    if push_paragraph(&task.description, lines) {
        lines.push(String::new());
    }

    if !task.dependencies.is_empty() {
        lines.push("### Dependencies:".to_string());
        for dep in &task.dependencies {
            lines.push(format!("- Task {}", dep));
        }
        lines.push(String::new());
    }

    if task.complexity.is_some() || task.estimated_hours > 0 {
        match task.complexity {
            Some(c) => lines.push(format!("### Complexity: {}", c)),
            None => lines.push("### Complexity:".to_string()),
        }
        lines.push(format!("Estimated hours: {}", task.estimated_hours));
        lines.push(String::new());
    }

    if !task.choices.is_empty() {
        lines.push("### Choices:".to_string());
        for choice in &task.choices {
            serialize_choice(choice, "", lines);
        }
    }

    if !task.subtasks.is_empty() {
        lines.push("### Subtasks:".to_string());
        lines.push(String::new());
        for subtask in &task.subtasks {
            serialize_subtask(subtask, lines);
        }
        lines.push(String::new());
    }

    lines.push("---".to_string());
    lines.push(String::new());
}

fn serialize_subtask(subtask: &Subtask, lines: &mut Vec<String>) {
    let mark = if subtask.is_done() { 'x' } else { ' ' };
    lines.push(format!("- [{}] {}", mark, escape_line(&subtask.title)));
    lines.push(format!(
        "  {}",
        timestamps_meta(subtask.created_at, subtask.updated_at)
    ));

    // todo/done are carried by the checkbox
    if !matches!(subtask.status, Status::Todo | Status::Done) {
        lines.push(format!("  - status: {}", subtask.status));
    }
    if let Some(c) = subtask.complexity {
        lines.push(format!("  - complexity: {}", c));
    }
    if subtask.estimated_hours > 0 {
        lines.push(format!("  - estimated hours: {}", subtask.estimated_hours));
    }
    if !subtask.description.is_empty() {
        lines.push(format!(
            "  - description: {}",
            escape_line(&subtask.description)
        ));
    }
    for choice in &subtask.choices {
        serialize_choice(choice, "  ", lines);
    }
}

/// A choice block is always followed by a blank line so that option
/// checkboxes never run into the next subtask.
fn serialize_choice(choice: &Choice, indent: &str, lines: &mut Vec<String>) {
    lines.push(format!("{}**Choice:** {}", indent, escape_line(&choice.question)));

    let mut meta = vec![
        ("id", choice.id.clone()),
        ("created", format_timestamp(&choice.created_at)),
    ];
    if let Some(resolved) = choice.resolved_at {
        meta.push(("resolved", format_timestamp(&resolved)));
    }
    lines.push(format!("{}{}", indent, format_meta(&meta)));

    lines.push(format!("{}Options:", indent));
    for option in &choice.options {
        let mark = if choice.selected.as_deref() == Some(option.as_str()) {
            'x'
        } else {
            ' '
        };
        lines.push(format!("{}- [{}] {}", indent, mark, escape_line(option)));
    }
    if !choice.reasoning.is_empty() {
        lines.push(format!(
            "{}Reasoning: {}",
            indent,
            escape_line(&choice.reasoning)
        ));
    }
    lines.push(String::new());
}

fn timestamps_meta(created: DateTime<Utc>, updated: DateTime<Utc>) -> String {
    format_meta(&[
        ("created", format_timestamp(&created)),
        ("updated", format_timestamp(&updated)),
    ])
}

/// Push the trimmed, non-empty lines of `text`, escaping any that would
/// decode as structure. Returns whether anything was pushed.
fn push_paragraph(text: &str, lines: &mut Vec<String>) -> bool {
    let before = lines.len();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if is_plain_text(line) {
            lines.push(line.to_string());
        } else {
            lines.push(format!("\\{}", line));
        }
    }
    lines.len() > before
}
