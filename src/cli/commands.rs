use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "taskmd", about = concat!("taskmd v", env!("CARGO_PKG_VERSION"), " - markdown task files for agents"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding the project documents (overrides config)
    #[arg(long = "tasks-dir", global = true)]
    pub tasks_dir: Option<PathBuf>,

    /// Config file to load instead of taskmd.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project document
    Create(CreateArgs),
    /// Add a task to a project
    Add(AddArgs),
    /// Set a task or subtask status
    Status(StatusArgs),
    /// Show the next task to work on
    Next(ProjectArg),
    /// List projects
    List,
    /// Show task dependencies and cycles
    Deps(DepsArgs),
    /// Show tasks needing attention
    Attention(AttentionArgs),
    /// Reconcile task states with their subtasks
    AutoUpdate(AutoUpdateArgs),
    /// Suggest what to work on next
    Suggest(SuggestArgs),
    /// Break a task into subtasks
    Expand(ExpandArgs),
    /// Record a complexity estimate
    Complexity(ComplexityArgs),
    /// Attach a pending choice to a task
    Choice(ChoiceArgs),
    /// Resolve a pending choice
    Resolve(ResolveArgs),
    /// Show project summary and progress
    Summary(SummaryArgs),
    /// Show store diagnostics
    Debug,
    /// Invoke any operation with JSON arguments
    Call(CallArgs),
}

#[derive(Args)]
pub struct ProjectArg {
    /// Project name
    pub project: String,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct CreateArgs {
    /// Project name
    pub project: String,
    /// Project description
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args)]
pub struct AddArgs {
    /// Project name
    pub project: String,
    /// Task title
    pub title: String,
    /// Task description
    #[arg(short, long)]
    pub description: String,
    /// Category (MVP, AI, UX, INFRA)
    #[arg(long)]
    pub category: Option<String>,
    /// Priority (P0-P3)
    #[arg(long)]
    pub priority: Option<String>,
    /// Complexity (low, medium, high)
    #[arg(long)]
    pub complexity: Option<String>,
    /// Estimated hours
    #[arg(long)]
    pub hours: Option<u32>,
    /// ID of a task this one depends on (repeatable)
    #[arg(long = "dep")]
    pub deps: Vec<u32>,
    /// Subtask title (repeatable)
    #[arg(long = "subtask")]
    pub subtasks: Vec<String>,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Project name
    pub project: String,
    /// Task title
    pub task: String,
    /// New status (todo, in_progress, done, blocked)
    pub status: String,
    /// Subtask title; sets the subtask instead of the task
    #[arg(long)]
    pub subtask: Option<String>,
}

#[derive(Args)]
pub struct AutoUpdateArgs {
    /// Project name
    pub project: String,
    /// Report changes without saving
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct ExpandArgs {
    /// Project name
    pub project: String,
    /// Task title
    pub task: String,
    /// Subtask titles
    #[arg(required = true)]
    pub subtasks: Vec<String>,
    /// Why the task was broken down this way
    #[arg(long)]
    pub reasoning: Option<String>,
}

#[derive(Args)]
pub struct ComplexityArgs {
    /// Project name
    pub project: String,
    /// Task title
    pub task: String,
    /// Complexity (low, medium, high)
    pub complexity: String,
    /// Estimated hours
    pub hours: u32,
    #[arg(long)]
    pub reasoning: Option<String>,
    /// Suggested subtask title (repeatable)
    #[arg(long = "suggest")]
    pub suggested: Vec<String>,
    /// Create the suggested subtasks for medium and high complexity
    #[arg(long)]
    pub create: bool,
}

#[derive(Args)]
pub struct ChoiceArgs {
    /// Project name
    pub project: String,
    /// Task title
    pub task: String,
    /// The question to decide
    pub question: String,
    /// Options (at least two)
    #[arg(required = true)]
    pub options: Vec<String>,
    /// Attach to this subtask instead of the task
    #[arg(long)]
    pub subtask: Option<String>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Project name
    pub project: String,
    /// Task title
    pub task: String,
    /// Choice ID
    pub choice_id: String,
    /// Selected option
    pub option: String,
    #[arg(long)]
    pub reasoning: Option<String>,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct DepsArgs {
    /// Project name
    pub project: String,
    /// Limit to one task
    #[arg(long)]
    pub task: Option<String>,
    /// Also list tasks that depend on it
    #[arg(long)]
    pub dependents: bool,
}

#[derive(Args)]
pub struct AttentionArgs {
    /// Project name
    pub project: String,
    /// Filter by type (overdue, stale, breakdown)
    #[arg(long = "type")]
    pub kind: Option<String>,
}

#[derive(Args)]
pub struct SuggestArgs {
    /// Project name
    pub project: String,
    /// Only suggest tasks in this category
    #[arg(long)]
    pub category: Option<String>,
    /// Maximum number of suggestions
    #[arg(long)]
    pub max: Option<u32>,
    /// Include blocked tasks
    #[arg(long)]
    pub include_blocked: bool,
}

#[derive(Args)]
pub struct SummaryArgs {
    /// Project name
    pub project: String,
    /// Include per-task summaries
    #[arg(long)]
    pub tasks: bool,
}

#[derive(Args)]
pub struct CallArgs {
    /// Operation name, e.g. add_task
    pub operation: String,
    /// Arguments as a JSON object
    #[arg(default_value = "{}")]
    pub args: String,
}
