pub mod cli;
pub mod eval;
pub mod io;
pub mod logging;
pub mod model;
pub mod ops;
pub mod parse;
pub mod tools;
