// src/gtest/mod.rs

//! Google test support: a streaming parser that turns a test binary's
//! console output into [`GtestExecution`] and the reports printed from it.

pub mod model;
pub mod parser;
pub mod report;

pub use model::{GtestExecution, GtestState, GtestTest};
pub use parser::ParsedLine;
pub use report::{GTEST_FILTER_ARG, GtestVerdict, gtest_shell_command};
