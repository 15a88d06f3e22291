//! Core engine — types, parsing, resolution, planning, execution.

pub mod catalog;
pub mod error;
pub mod executor;
pub mod parser;
pub mod planner;
pub mod resolver;
pub mod state;
pub mod types;
