//! Realistic google test console output for scripted processes.

#[derive(Debug, Clone)]
struct ScriptedTest {
    name: String,
    output: Vec<String>,
    passed: bool,
}

/// Builder of the lines a google test binary prints.
///
/// Every test takes 1 ms, so a run of `n` tests reports `(n ms total)`.
#[derive(Debug, Clone, Default)]
pub struct GtestOutput {
    preparation: Vec<String>,
    tests: Vec<ScriptedTest>,
    /// Stop in the middle of the last test.
    crash: bool,
}

impl GtestOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines printed before the test banner.
    pub fn preparation(mut self, line: &str) -> Self {
        self.preparation.push(line.to_string());
        self
    }

    pub fn passed(mut self, name: &str, output: &[&str]) -> Self {
        self.tests.push(ScriptedTest {
            name: name.to_string(),
            output: output.iter().map(|l| l.to_string()).collect(),
            passed: true,
        });
        self
    }

    pub fn failed(mut self, name: &str, output: &[&str]) -> Self {
        self.tests.push(ScriptedTest {
            name: name.to_string(),
            output: output.iter().map(|l| l.to_string()).collect(),
            passed: false,
        });
        self
    }

    /// The binary dies after printing the last test's output.
    pub fn crash(mut self) -> Self {
        self.crash = true;
        self
    }

    pub fn lines(&self) -> Vec<String> {
        let count = self.tests.len();
        let mut lines = self.preparation.clone();
        lines.push(format!("[==========] Running {count} tests from 1 test suite."));
        lines.push("[----------] Global test environment set-up.".to_string());
        for (i, test) in self.tests.iter().enumerate() {
            lines.push(format!("[ RUN      ] {}", test.name));
            lines.extend(test.output.iter().cloned());
            if self.crash && i + 1 == count {
                return lines;
            }
            let word = if test.passed { "       OK " } else { "  FAILED  " };
            lines.push(format!("[{word}] {} (1 ms)", test.name));
        }
        lines.push("[----------] Global test environment tear-down".to_string());
        lines.push(format!(
            "[==========] {count} tests from 1 test suite ran. ({count} ms total)"
        ));
        let failed: Vec<&ScriptedTest> = self.tests.iter().filter(|t| !t.passed).collect();
        lines.push(format!("[  PASSED  ] {} tests.", count - failed.len()));
        if !failed.is_empty() {
            lines.push(format!("[  FAILED  ] {} tests, listed below:", failed.len()));
            for test in failed {
                lines.push(format!("[  FAILED  ] {}", test.name));
            }
        }
        lines
    }

    pub fn exit_code(&self) -> i32 {
        if self.tests.iter().all(|t| t.passed) && !self.crash {
            0
        } else {
            1
        }
    }
}
