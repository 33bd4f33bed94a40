// src/output/search.rs

//! Regex search over a range of lines of a text buffer.

use std::io::{self, Write};
use std::ops::Range;

use regex::Regex;

use super::colors::{GREEN, MAGENTA, RED, RESET};
use super::text_buffer::TextBufferType;

/// Lines `search_start..search_end` of one of an execution's buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBufferSearch {
    pub buffer: TextBufferType,
    pub search_start: usize,
    pub search_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Absolute line index inside the buffer.
    pub line: usize,
    /// Byte range inside that line.
    pub range: Range<usize>,
}

impl TextBufferSearch {
    pub fn new(buffer: TextBufferType, search_start: usize, search_end: usize) -> Self {
        Self {
            buffer,
            search_start,
            search_end,
        }
    }

    /// Compile `pattern` into a cursor positioned before the first line.
    pub fn cursor(&self, pattern: &str) -> Result<SearchCursor, regex::Error> {
        Ok(SearchCursor {
            regex: Regex::new(pattern)?,
            line: self.search_start,
            pos: 0,
            search_end: self.search_end,
        })
    }
}

/// Resumable iteration over matches.
///
/// Every call continues right after the previous match, so earlier matches
/// are never found twice. The end of the range is re-read against the
/// buffer on each call, since the buffer may still be growing.
#[derive(Debug, Clone)]
pub struct SearchCursor {
    regex: Regex,
    line: usize,
    pos: usize,
    search_end: usize,
}

impl SearchCursor {
    pub fn next_match(&mut self, lines: &[String]) -> Option<SearchMatch> {
        let end = self.search_end.min(lines.len());
        while self.line < end {
            let text = &lines[self.line];
            if self.pos <= text.len() {
                if let Some(m) = self.regex.find_at(text, self.pos) {
                    self.pos = if m.end() > m.start() {
                        m.end()
                    } else {
                        // Step over one character so an empty match can't repeat.
                        text[m.end()..]
                            .chars()
                            .next()
                            .map_or(text.len() + 1, |c| m.end() + c.len_utf8())
                    };
                    return Some(SearchMatch {
                        line: self.line,
                        range: m.range(),
                    });
                }
            }
            self.line += 1;
            self.pos = 0;
        }
        None
    }
}

/// Print every line of `search` that matches `pattern`.
///
/// Each hit is prefixed with its line number relative to `search_start`,
/// and matched text is shown in green. A bad pattern is reported and
/// nothing else is printed.
pub fn write_search_results(
    out: &mut dyn Write,
    lines: &[String],
    search: &TextBufferSearch,
    pattern: &str,
) -> io::Result<()> {
    let mut cursor = match search.cursor(pattern) {
        Ok(cursor) => cursor,
        Err(err) => {
            return writeln!(out, "{RED}Invalid regular expression '{pattern}': {err}{RESET}");
        }
    };

    let mut found = false;
    let mut current: Option<(usize, Vec<Range<usize>>)> = None;
    while let Some(m) = cursor.next_match(lines) {
        found = true;
        match current.as_mut() {
            Some((line, ranges)) if *line == m.line => ranges.push(m.range),
            _ => {
                if let Some((line, ranges)) = current.take() {
                    write_highlighted(out, search, line, &lines[line], &ranges)?;
                }
                current = Some((m.line, vec![m.range]));
            }
        }
    }
    if let Some((line, ranges)) = current {
        write_highlighted(out, search, line, &lines[line], &ranges)?;
    }
    if !found {
        writeln!(out, "{GREEN}No matches found{RESET}")?;
    }
    Ok(())
}

fn write_highlighted(
    out: &mut dyn Write,
    search: &TextBufferSearch,
    line: usize,
    text: &str,
    ranges: &[Range<usize>],
) -> io::Result<()> {
    write!(out, "{MAGENTA}{}:{RESET}", line - search.search_start + 1)?;
    let mut last = 0;
    for range in ranges.iter().filter(|r| !r.is_empty()) {
        write!(out, "{}{GREEN}{}{RESET}", &text[last..range.start], &text[range.clone()])?;
        last = range.end;
    }
    writeln!(out, "{}", &text[last..])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn next_match_resumes_after_previous_match() {
        let buf = lines(&["some random data"]);
        let search = TextBufferSearch::new(TextBufferType::Output, 0, buf.len());
        let mut cursor = search.cursor("(some|data)").unwrap();

        let first = cursor.next_match(&buf).unwrap();
        assert_eq!(first, SearchMatch { line: 0, range: 0..4 });
        let second = cursor.next_match(&buf).unwrap();
        assert_eq!(second, SearchMatch { line: 0, range: 12..16 });
        assert_eq!(cursor.next_match(&buf), None);
    }

    #[test]
    fn respects_search_range() {
        let buf = lines(&["data", "data", "data"]);
        let search = TextBufferSearch::new(TextBufferType::Gtest, 1, 2);
        let mut cursor = search.cursor("data").unwrap();
        assert_eq!(cursor.next_match(&buf).map(|m| m.line), Some(1));
        assert_eq!(cursor.next_match(&buf), None);
    }

    #[test]
    fn empty_matches_advance() {
        let buf = lines(&["ab"]);
        let search = TextBufferSearch::new(TextBufferType::Output, 0, 1);
        let mut cursor = search.cursor("x*").unwrap();
        let mut count = 0;
        while cursor.next_match(&buf).is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn prints_relative_line_numbers_and_highlights() {
        let buf = lines(&["first", "some random data", "nothing"]);
        let search = TextBufferSearch::new(TextBufferType::Output, 1, 3);
        let mut out = Vec::new();
        write_search_results(&mut out, &buf, &search, "(some|data)").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("{MAGENTA}1:{RESET}{GREEN}some{RESET} random {GREEN}data{RESET}\n")
        );
    }

    #[test]
    fn reports_no_matches_and_bad_patterns() {
        let buf = lines(&["abc"]);
        let search = TextBufferSearch::new(TextBufferType::Output, 0, 1);

        let mut out = Vec::new();
        write_search_results(&mut out, &buf, &search, "zzz").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{GREEN}No matches found{RESET}\n"));

        let mut out = Vec::new();
        write_search_results(&mut out, &buf, &search, "(").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(&format!("{RED}Invalid regular expression '(': ")));
    }
}
