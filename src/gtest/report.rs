// src/gtest/report.rs

use std::io::{self, Write};

use super::model::{GtestExecution, GtestState, GtestTest};
use crate::output::colors::{GREEN, RED, RESET};

pub const GTEST_FILTER_ARG: &str = "--gtest_filter";

/// How a google test run ended, decided once its process exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GtestVerdict {
    /// The banner never appeared.
    NotGtest,
    /// The process exited while tests were still running.
    Premature,
    Passed,
    Failed,
}

impl GtestExecution {
    /// Close the run after its process exited.
    ///
    /// A test still open at this point is counted as failed: the binary
    /// crashed or was killed in the middle of it.
    pub fn conclude(&mut self) -> GtestVerdict {
        let verdict = match self.state {
            GtestState::Running => {
                self.test_count = 0;
                GtestVerdict::NotGtest
            }
            GtestState::Parsing => {
                if let Some(current) = self.current_test.take() {
                    self.failed_test_ids.push(current);
                }
                GtestVerdict::Premature
            }
            GtestState::Parsed | GtestState::Finished if self.failed_test_ids.is_empty() => {
                GtestVerdict::Passed
            }
            GtestState::Parsed | GtestState::Finished => GtestVerdict::Failed,
        };
        self.state = GtestState::Finished;
        verdict
    }
}

/// Shell command running `binary`, optionally limited to `filter`.
pub fn gtest_shell_command(binary: &str, filter: Option<&str>) -> String {
    match filter {
        Some(filter) => format!("{binary} {GTEST_FILTER_ARG}='{filter}'"),
        None => binary.to_string(),
    }
}

/// `round(100 * failed / total)`, or 0 when nothing ran.
pub fn failed_percent(failed: usize, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    (failed * 100 + total / 2) / total
}

pub fn write_progress(out: &mut dyn Write, exec: &GtestExecution) -> io::Result<()> {
    write!(out, "\rTests completed: {} of {}", exec.tests.len(), exec.test_count)?;
    out.flush()
}

pub fn write_test_list(
    out: &mut dyn Write,
    ids: impl IntoIterator<Item = usize>,
    tests: &[GtestTest],
) -> io::Result<()> {
    for (i, id) in ids.into_iter().enumerate() {
        let test = &tests[id];
        writeln!(out, "{} \"{}\" {}", i + 1, test.name, test.duration)?;
    }
    Ok(())
}

pub fn write_all_tests(out: &mut dyn Write, exec: &GtestExecution) -> io::Result<()> {
    writeln!(out, "{GREEN}Last executed tests {}:{RESET}", exec.total_duration)?;
    write_test_list(out, 0..exec.tests.len(), &exec.tests)
}

pub fn write_failed_tests(out: &mut dyn Write, exec: &GtestExecution) -> io::Result<()> {
    writeln!(out, "{RED}Failed tests:{RESET}")?;
    write_test_list(out, exec.failed_test_ids.iter().copied(), &exec.tests)?;
    let failed = exec.failed_test_ids.len();
    let total = exec.tests.len();
    writeln!(
        out,
        "{RED}Tests failed: {failed} of {total} ({}%) {}{RESET}",
        failed_percent(failed, total),
        exec.total_duration
    )
}

/// Header line plus the test's own lines, ready for an output buffer.
pub fn test_output_lines(test: &GtestTest, gtest_buffer: &[String], color: &str) -> Vec<String> {
    let end = test.buffer_end.min(gtest_buffer.len());
    let start = test.buffer_start.min(end);
    let mut lines = Vec::with_capacity(end - start + 1);
    lines.push(format!("{color}\"{}\" output:{RESET}", test.name));
    lines.extend_from_slice(&gtest_buffer[start..end]);
    lines
}
