// src/gtest/model.rs

use std::ops::Range;

/// One google test seen in the output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GtestTest {
    /// Qualified `Suite.Case` name.
    pub name: String,
    /// Duration as printed by google test, e.g. `(12 ms)`. Empty when the
    /// test never finished.
    pub duration: String,
    /// Range of the test's lines in the execution's gtest buffer.
    pub buffer_start: usize,
    pub buffer_end: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GtestState {
    /// Waiting for the `Running N tests` banner.
    #[default]
    Running,
    /// Banner seen, tests are being run.
    Parsing,
    /// Final banner with the total duration seen.
    Parsed,
    /// Process exited and results were reported.
    Finished,
}

/// Structured result of a google test binary's run.
#[derive(Debug, Clone, Default)]
pub struct GtestExecution {
    pub rerun_of_single_test: bool,
    pub tests: Vec<GtestTest>,
    /// Indices into `tests`, in the order the failures happened.
    pub failed_test_ids: Vec<usize>,
    /// Count announced by the banner; 0 if the banner never appeared.
    pub test_count: usize,
    pub current_test: Option<usize>,
    pub total_duration: String,
    pub state: GtestState,
    /// Process buffer lines already fed to the parser.
    pub lines_parsed: usize,
    /// Gtest buffer range holding output printed before the first test.
    pub before_tests: Range<usize>,
}

impl GtestExecution {
    pub fn rerun_of_single_test() -> Self {
        Self {
            rerun_of_single_test: true,
            ..Self::default()
        }
    }

    /// Fresh state for another run of the same kind.
    pub fn restarted(&self) -> Self {
        Self {
            rerun_of_single_test: self.rerun_of_single_test,
            ..Self::default()
        }
    }

    /// Whether output lines still need to be parsed.
    pub fn accepts_output(&self) -> bool {
        matches!(self.state, GtestState::Running | GtestState::Parsing)
    }

    pub fn is_finished(&self) -> bool {
        self.state == GtestState::Finished
    }
}
