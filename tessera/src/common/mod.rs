//! Common utilities shared by the execution structures

pub mod profiler;
pub mod types;
pub mod utils;
