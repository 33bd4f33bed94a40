// src/output/mod.rs

//! Output of executions: line buffers, file links and search.

pub mod colors;
pub mod links;
pub mod search;
pub mod text_buffer;

pub use links::{ExecutionOutput, FileLink, find_file_links};
pub use search::{SearchCursor, SearchMatch, TextBufferSearch, write_search_results};
pub use text_buffer::{LineBuffer, TextBufferType, TextBuffers};
