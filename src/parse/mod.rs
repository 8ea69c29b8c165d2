pub mod project_parser;
pub mod project_serializer;
pub mod text;

pub use project_parser::{decode_project, DecodeError};
pub use project_serializer::{encode_project, serialize_project, task_heading};
