// src/output/links.rs

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::colors::{MAGENTA, RESET};

/// `path:line[:column]` with an absolute unix path.
#[cfg(not(windows))]
const FILE_LINK_PATTERN: &str = r"(/[^:]+):([0-9]+):?([0-9]+)?";

/// Also `C:\path(line[,column])` and `C:\path:line:column` on windows.
#[cfg(windows)]
const FILE_LINK_PATTERN: &str = concat!(
    r"(/[^:]+):([0-9]+):?([0-9]+)?",
    r"|([A-Z]:\\[^:]+)\(([0-9]+),?([0-9]+)?\)",
    r"|([A-Z]:\\[^:]+):([0-9]+):([0-9]+)?",
);

static FILE_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FILE_LINK_PATTERN).expect("file link pattern is valid"));

/// A file link found in a line of output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    /// Byte range of the whole match inside the line.
    pub span: Range<usize>,
    /// Normalized `path:line[:column]` text handed to the editor.
    pub link: String,
}

/// Find all file links in `line`, left to right.
pub fn find_file_links(line: &str) -> Vec<FileLink> {
    FILE_LINK_REGEX
        .captures_iter(line)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            // Only the groups of the alternative that matched participate.
            let mut groups = caps.iter().skip(1).flatten().map(|m| m.as_str());
            let path = groups.next()?;
            let line_no = groups.next()?;
            let link = match groups.next() {
                Some(col) => format!("{path}:{line_no}:{col}"),
                None => format!("{path}:{line_no}"),
            };
            Some(FileLink {
                span: whole.range(),
                link,
            })
        })
        .collect()
}

/// Derived view over an execution's output buffer.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOutput {
    /// Number of output lines already scanned (and printed, if shown).
    pub lines_processed: usize,
    /// Distinct links in first-seen order. Display index is position + 1.
    pub file_links: Vec<String>,
}

impl ExecutionOutput {
    /// Register a link and return its 1-based display index.
    pub fn add_link(&mut self, link: String) -> usize {
        match self.file_links.iter().position(|l| *l == link) {
            Some(i) => i + 1,
            None => {
                self.file_links.push(link);
                self.file_links.len()
            }
        }
    }

    /// Register the links of `line` and return it with each link replaced
    /// by a magenta `[o<N>] <link>` marker.
    pub fn highlight_links(&mut self, line: &str, open_cmd: &str) -> String {
        let links = find_file_links(line);
        if links.is_empty() {
            return line.to_string();
        }
        let mut highlighted = String::with_capacity(line.len() + links.len() * 16);
        let mut last_end = 0;
        for found in links {
            let index = self.add_link(found.link.clone());
            highlighted.push_str(&line[last_end..found.span.start]);
            highlighted.push_str(&format!(
                "{MAGENTA}[{open_cmd}{index}] {}{RESET}",
                found.link
            ));
            last_end = found.span.end;
        }
        highlighted.push_str(&line[last_end..]);
        highlighted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_links_with_and_without_column() {
        let links = find_file_links("/a/b/c:10 and then /d/e/f:15:32 something");
        let texts: Vec<_> = links.iter().map(|l| l.link.as_str()).collect();
        assert_eq!(texts, vec!["/a/b/c:10", "/d/e/f:15:32"]);
    }

    #[test]
    fn link_followed_by_text() {
        let links = find_file_links("/d/e/f:15:32 something");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].link, "/d/e/f:15:32");
        assert_eq!(links[0].span, 0..12);
    }

    #[test]
    fn relative_paths_are_not_links() {
        assert!(find_file_links("src/main.rs:10:5").is_empty());
        assert!(find_file_links("some random data").is_empty());
    }

    #[cfg(windows)]
    #[test]
    fn finds_windows_links() {
        let links = find_file_links(r"C:\src\main.cpp(12,5): error and C:\src\lib.cpp:3:7 warning");
        let texts: Vec<_> = links.iter().map(|l| l.link.as_str()).collect();
        assert_eq!(texts, vec![r"C:\src\main.cpp:12:5", r"C:\src\lib.cpp:3:7"]);
    }

    #[test]
    fn highlighting_dedups_and_keeps_first_index() {
        let mut out = ExecutionOutput::default();
        assert_eq!(
            out.highlight_links("/a/b/c:10", "o"),
            format!("{MAGENTA}[o1] /a/b/c:10{RESET}")
        );
        assert_eq!(
            out.highlight_links("at /d/e/f:15:32 something", "o"),
            format!("at {MAGENTA}[o2] /d/e/f:15:32{RESET} something")
        );
        assert_eq!(
            out.highlight_links("/a/b/c:10", "o"),
            format!("{MAGENTA}[o1] /a/b/c:10{RESET}")
        );
        assert_eq!(out.file_links, vec!["/a/b/c:10", "/d/e/f:15:32"]);
    }
}
