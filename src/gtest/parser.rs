// src/gtest/parser.rs

//! Line-by-line google test output parser.

use super::model::{GtestExecution, GtestState, GtestTest};

const TEST_COUNT_PREFIX: &str = "Running ";

/// What a single line meant to the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedLine {
    /// Printed before the first test; kept as preparation output.
    Preparation,
    /// `[ RUN      ]` of a new test.
    TestStarted,
    /// Output of the test that is currently running.
    TestOutput,
    /// `[       OK ]` or `[  FAILED  ]` of the current test.
    TestCompleted,
    /// `[==========]` banner with the test count or the total duration.
    Banner,
    /// Anything else, e.g. `[----------]` separators.
    Ignored,
}

/// `[<filler><word><filler>] <content>` as printed by google test.
#[derive(Debug, PartialEq, Eq)]
struct Marker<'a> {
    filler: char,
    word: String,
    content: &'a str,
}

fn parse_marker(line: &str) -> Option<Marker<'_>> {
    let mut chars = line.char_indices();
    if chars.next()?.1 != '[' {
        return None;
    }
    let (_, filler) = chars.next()?;
    let mut word = String::new();
    for (i, c) in chars {
        if c == ']' {
            let content = line.get(i + 2..).unwrap_or("");
            return Some(Marker {
                filler,
                word,
                content,
            });
        }
        if c != filler {
            word.push(c);
        }
    }
    None
}

fn duration_of(content: &str) -> String {
    content
        .rfind('(')
        .map(|i| content[i..].to_string())
        .unwrap_or_default()
}

impl GtestExecution {
    /// Feed one complete output line.
    ///
    /// Lines belonging to a test are appended to `gtest_buffer` and the
    /// test's range grows to cover them. The current test is checked first:
    /// a test binary may itself run google tests, and their markers must
    /// count as output of our test rather than as our own results.
    pub fn parse_line(&mut self, line: &str, gtest_buffer: &mut Vec<String>) -> ParsedLine {
        let marker = parse_marker(line);
        let (filler, word, content) = match &marker {
            Some(m) => (Some(m.filler), m.word.as_str(), m.content),
            None => (None, "", line),
        };

        if let Some(current) = self.current_test {
            let belongs_to_current = content.starts_with(self.tests[current].name.as_str());
            if belongs_to_current && (word == "OK" || word == "FAILED") {
                if word == "FAILED" {
                    self.failed_test_ids.push(current);
                }
                self.tests[current].duration = duration_of(content);
                self.current_test = None;
                return ParsedLine::TestCompleted;
            }
            gtest_buffer.push(line.to_string());
            self.tests[current].buffer_end = gtest_buffer.len();
            return ParsedLine::TestOutput;
        }

        if word == "RUN" {
            self.current_test = Some(self.tests.len());
            self.tests.push(GtestTest {
                name: content.to_string(),
                duration: String::new(),
                buffer_start: gtest_buffer.len(),
                buffer_end: gtest_buffer.len(),
            });
            return ParsedLine::TestStarted;
        }

        if filler == Some('=') {
            match self.state {
                GtestState::Running => {
                    if let Some(count) = parse_test_count(content) {
                        self.test_count = count;
                        self.tests.reserve(count);
                        self.state = GtestState::Parsing;
                        return ParsedLine::Banner;
                    }
                }
                GtestState::Parsing => {
                    self.total_duration = duration_of(content);
                    self.state = GtestState::Parsed;
                    return ParsedLine::Banner;
                }
                GtestState::Parsed | GtestState::Finished => return ParsedLine::Ignored,
            }
        }

        if self.state == GtestState::Running {
            if self.before_tests.is_empty() {
                self.before_tests = gtest_buffer.len()..gtest_buffer.len();
            }
            gtest_buffer.push(line.to_string());
            self.before_tests.end = gtest_buffer.len();
            return ParsedLine::Preparation;
        }
        ParsedLine::Ignored
    }
}

fn parse_test_count(content: &str) -> Option<usize> {
    let rest = content.strip_prefix(TEST_COUNT_PREFIX)?;
    let count = rest.split(' ').next()?;
    count.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(exec: &mut GtestExecution, buf: &mut Vec<String>, lines: &[&str]) -> Vec<ParsedLine> {
        lines.iter().map(|l| exec.parse_line(l, buf)).collect()
    }

    #[test]
    fn parses_marker_words_and_content() {
        assert_eq!(
            parse_marker("[ RUN      ] suite.test1"),
            Some(Marker {
                filler: ' ',
                word: "RUN".into(),
                content: "suite.test1"
            })
        );
        let banner = parse_marker("[==========] Running 2 tests from 1 test suite.").unwrap();
        assert_eq!(banner.filler, '=');
        assert_eq!(banner.word, "");
        assert_eq!(banner.content, "Running 2 tests from 1 test suite.");
        assert_eq!(parse_marker("plain line"), None);
        assert_eq!(parse_marker("[unterminated"), None);
    }

    #[test]
    fn successful_suite_is_fully_parsed() {
        let mut exec = GtestExecution::default();
        let mut buf = Vec::new();
        feed(
            &mut exec,
            &mut buf,
            &[
                "Running main() from gtest_main.cc",
                "[==========] Running 2 tests from 1 test suite.",
                "[----------] 2 tests from suite",
                "[ RUN      ] suite.test1",
                "[       OK ] suite.test1 (0 ms)",
                "[ RUN      ] suite.test2",
                "some output",
                "[       OK ] suite.test2 (3 ms)",
                "[----------] 2 tests from suite (3 ms total)",
                "[==========] 2 tests from 1 test suite ran. (3 ms total)",
                "[  PASSED  ] 2 tests.",
            ],
        );
        assert_eq!(exec.state, GtestState::Parsed);
        assert_eq!(exec.test_count, 2);
        assert_eq!(exec.tests.len(), 2);
        assert!(exec.failed_test_ids.is_empty());
        assert_eq!(exec.total_duration, "(3 ms total)");
        assert_eq!(exec.tests[1].duration, "(3 ms)");
        assert_eq!(exec.before_tests, 0..1);
        assert_eq!(&buf[exec.tests[1].buffer_start..exec.tests[1].buffer_end], ["some output"]);
    }

    #[test]
    fn failures_are_recorded_with_their_output() {
        let mut exec = GtestExecution::default();
        let mut buf = Vec::new();
        let parsed = feed(
            &mut exec,
            &mut buf,
            &[
                "[==========] Running 1 test from 1 test suite.",
                "[ RUN      ] suite.bad",
                "/src/test.cc:12: Failure",
                "[  FAILED  ] suite.bad (1 ms)",
            ],
        );
        assert_eq!(
            parsed,
            vec![
                ParsedLine::Banner,
                ParsedLine::TestStarted,
                ParsedLine::TestOutput,
                ParsedLine::TestCompleted
            ]
        );
        assert_eq!(exec.failed_test_ids, vec![0]);
        assert_eq!(exec.current_test, None);
        assert_eq!(buf, vec!["/src/test.cc:12: Failure"]);
    }

    #[test]
    fn nested_markers_count_as_output_of_current_test() {
        let mut exec = GtestExecution::default();
        let mut buf = Vec::new();
        feed(
            &mut exec,
            &mut buf,
            &[
                "[==========] Running 1 test from 1 test suite.",
                "[ RUN      ] outer.test",
                "[==========] Running 5 tests from 1 test suite.",
                "[ RUN      ] inner.test",
                "[  FAILED  ] inner.test (0 ms)",
                "[       OK ] outer.test (9 ms)",
            ],
        );
        assert_eq!(exec.tests.len(), 1);
        assert_eq!(exec.test_count, 1);
        assert!(exec.failed_test_ids.is_empty());
        assert_eq!(exec.tests[0].buffer_end - exec.tests[0].buffer_start, 3);
    }

    #[test]
    fn output_without_banner_is_preparation() {
        let mut exec = GtestExecution::default();
        let mut buf = Vec::new();
        let parsed = feed(&mut exec, &mut buf, &["hello", "world"]);
        assert_eq!(parsed, vec![ParsedLine::Preparation; 2]);
        assert_eq!(exec.state, GtestState::Running);
        assert_eq!(exec.before_tests, 0..2);
    }
}
