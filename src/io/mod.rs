pub mod atomic;
pub mod config_io;
pub mod store;

pub use config_io::{load_config, ConfigError};
pub use store::{ComplexityEstimate, StoreError, TaskStore};
