// src/output/colors.rs

//! ANSI escape sequences used on the console.

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const BLUE: &str = "\x1b[34m";
pub const MAGENTA: &str = "\x1b[35m";
pub const RESET: &str = "\x1b[0m";

/// Erase the current line and return the cursor to its start.
pub const CLEAR_LINE: &str = "\x1b[2K\r";
