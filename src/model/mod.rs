pub mod choice;
pub mod config;
pub mod project;
pub mod task;
pub mod validate;

pub use choice::*;
pub use config::*;
pub use project::*;
pub use task::*;
pub use validate::ValidationError;
