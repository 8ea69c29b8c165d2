pub mod attention;
pub mod deps;
pub mod status;
pub mod suggest;

pub use attention::{tasks_needing_attention, AttentionItem, AttentionType};
pub use deps::{all_dependencies, detect_circular_dependencies, task_dependencies};
pub use status::{apply_status_update, auto_update_task_statuses, StatusTarget, TaskError};
pub use suggest::{suggest_next_actions, SuggestOptions, Suggestion};
