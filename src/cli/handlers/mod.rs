use std::sync::Arc;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::cli::commands::*;
use crate::cli::output::print_output;
use crate::eval::EvaluationMiddleware;
use crate::io::TaskStore;
use crate::model::Config;
use crate::tools::{TaskTools, ToolCall, ToolHandler};

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Run one subcommand through the evaluation middleware and print the result
pub async fn dispatch(cli: Cli, mut config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = cli.tasks_dir {
        config.tasks_dir = dir;
    }
    let call = to_call(cli.command)?;

    let store = Arc::new(TaskStore::new(config.tasks_dir.clone())?);
    let middleware = EvaluationMiddleware::new(Arc::clone(&store), config.evaluation.clone());
    let tools = middleware.wrap(TaskTools::new(store));

    let result = tools.call(&call, &CancellationToken::new()).await;
    middleware.shutdown().await;

    print_output(&call.name, &result?, cli.json);
    Ok(())
}

/// Translate a subcommand into the operation call it stands for
pub fn to_call(command: Commands) -> Result<ToolCall, Box<dyn std::error::Error>> {
    let (name, args) = match command {
        Commands::Create(a) => (
            "create_task_file",
            json!({"project_name": a.project, "description": a.description}),
        ),
        Commands::Add(a) => (
            "add_task",
            json!({
                "project_name": a.project,
                "title": a.title,
                "description": a.description,
                "category": a.category,
                "priority": a.priority,
                "complexity": a.complexity,
                "estimated_hours": a.hours,
                "dependencies": a.deps,
                "subtasks": a.subtasks,
            }),
        ),
        Commands::Status(a) => (
            "update_task_status",
            json!({
                "project_name": a.project,
                "task_title": a.task,
                "subtask_title": a.subtask,
                "status": a.status,
            }),
        ),
        Commands::Next(a) => ("get_next_task", json!({"project_name": a.project})),
        Commands::List => ("list_projects", json!({})),
        Commands::Deps(a) => (
            "get_task_dependencies",
            json!({
                "project_name": a.project,
                "task_title": a.task,
                "include_dependents": a.dependents,
            }),
        ),
        Commands::Attention(a) => (
            "get_tasks_needing_attention",
            json!({"project_name": a.project, "attention_type": a.kind}),
        ),
        Commands::AutoUpdate(a) => (
            "auto_update_tasks",
            json!({"project_name": a.project, "dry_run": a.dry_run}),
        ),
        Commands::Suggest(a) => (
            "suggest_next_actions",
            json!({
                "project_name": a.project,
                "focus_category": a.category,
                "max_suggestions": a.max,
                "include_blocked": a.include_blocked,
            }),
        ),
        Commands::Expand(a) => (
            "expand_task",
            json!({
                "project_name": a.project,
                "task_title": a.task,
                "subtasks": a.subtasks,
                "reasoning": a.reasoning,
            }),
        ),
        Commands::Complexity(a) => (
            "estimate_task_complexity",
            json!({
                "project_name": a.project,
                "task_title": a.task,
                "complexity": a.complexity,
                "estimated_hours": a.hours,
                "reasoning": a.reasoning,
                "suggested_subtasks": a.suggested,
                "auto_create_subtasks": a.create,
            }),
        ),
        Commands::Choice(a) => (
            "add_choice",
            json!({
                "project_name": a.project,
                "task_title": a.task,
                "subtask_title": a.subtask,
                "question": a.question,
                "options": a.options,
            }),
        ),
        Commands::Resolve(a) => (
            "resolve_choice",
            json!({
                "project_name": a.project,
                "task_title": a.task,
                "choice_id": a.choice_id,
                "selected_option": a.option,
                "reasoning": a.reasoning,
            }),
        ),
        Commands::Summary(a) => (
            "project_summary",
            json!({"project_name": a.project, "include_tasks": a.tasks}),
        ),
        Commands::Debug => ("debug_info", json!({})),
        Commands::Call(a) => {
            let args: Value = serde_json::from_str(&a.args)
                .map_err(|e| format!("invalid JSON arguments: {}", e))?;
            if !args.is_object() {
                return Err("arguments must be a JSON object".into());
            }
            return Ok(ToolCall::from_value(a.operation, args));
        }
    };
    Ok(ToolCall::from_value(name, args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(argv: &[&str]) -> ToolCall {
        let cli = Cli::try_parse_from(argv).unwrap();
        to_call(cli.command).unwrap()
    }

    #[test]
    fn test_add_maps_to_add_task() {
        let call = parse(&[
            "taskmd", "add", "demo", "Write spec", "-d", "Draft it", "--dep", "1", "--dep", "2",
            "--subtask", "outline",
        ]);
        assert_eq!(call.name, "add_task");
        assert_eq!(call.project_name(), Some("demo"));
        assert_eq!(call.args["dependencies"], json!([1, 2]));
        assert_eq!(call.args["subtasks"], json!(["outline"]));
        assert_eq!(call.args["category"], Value::Null);
    }

    #[test]
    fn test_status_with_subtask() {
        let call = parse(&["taskmd", "status", "demo", "Ship", "done", "--subtask", "code"]);
        assert_eq!(call.name, "update_task_status");
        assert_eq!(call.args["subtask_title"], json!("code"));
        assert_eq!(call.args["status"], json!("done"));
    }

    #[test]
    fn test_raw_call() {
        let call = parse(&["taskmd", "call", "list_projects"]);
        assert_eq!(call.name, "list_projects");
        assert!(call.args.is_empty());

        let cli = Cli::try_parse_from(["taskmd", "call", "add_task", "[1]"]).unwrap();
        assert!(to_call(cli.command).is_err());
        let cli = Cli::try_parse_from(["taskmd", "call", "add_task", "{nope"]).unwrap();
        assert!(to_call(cli.command).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["taskmd", "list", "--json", "--tasks-dir", "/tmp/t"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.tasks_dir.as_deref(), Some(std::path::Path::new("/tmp/t")));
    }
}
