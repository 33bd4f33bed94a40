// src/output/text_buffer.rs

use std::mem;

/// Which of an execution's line buffers to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextBufferType {
    /// Every line the process printed, in arrival order.
    Process,
    /// Lines that belong to google tests; tests address ranges of it.
    Gtest,
    /// Lines shown to the user; links and `s` operate on these.
    Output,
}

/// The three line buffers of one execution.
#[derive(Debug, Clone, Default)]
pub struct TextBuffers {
    process: Vec<String>,
    gtest: Vec<String>,
    output: Vec<String>,
}

impl TextBuffers {
    pub fn get(&self, ty: TextBufferType) -> &Vec<String> {
        match ty {
            TextBufferType::Process => &self.process,
            TextBufferType::Gtest => &self.gtest,
            TextBufferType::Output => &self.output,
        }
    }

    pub fn get_mut(&mut self, ty: TextBufferType) -> &mut Vec<String> {
        match ty {
            TextBufferType::Process => &mut self.process,
            TextBufferType::Gtest => &mut self.gtest,
            TextBufferType::Output => &mut self.output,
        }
    }

    pub fn clear(&mut self) {
        self.process.clear();
        self.gtest.clear();
        self.output.clear();
    }
}

/// Reassembles lines from raw output chunks.
///
/// A trailing partial line is kept until its newline arrives. A `\r`
/// directly before the newline is dropped.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    partial: String,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(eol) = rest.find('\n') {
            self.partial.push_str(&rest[..eol]);
            let mut line = mem::take(&mut self.partial);
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
            rest = &rest[eol + 1..];
        }
        self.partial.push_str(rest);
        lines
    }

    /// Take whatever is left once the stream is closed.
    pub fn flush(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            None
        } else {
            Some(mem::take(&mut self.partial))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_lines_split_across_chunks() {
        let mut buf = LineBuffer::default();
        assert!(buf.push("hel").is_empty());
        assert_eq!(buf.push("lo\nwor"), vec!["hello"]);
        assert_eq!(buf.push("ld\r\n\n"), vec!["world", ""]);
        assert_eq!(buf.flush(), None);
    }

    #[test]
    fn flush_returns_unterminated_tail() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push("a\nb"), vec!["a"]);
        assert_eq!(buf.flush().as_deref(), Some("b"));
        assert_eq!(buf.flush(), None);
    }

    #[test]
    fn buffers_are_addressed_by_type() {
        let mut buffers = TextBuffers::default();
        buffers.get_mut(TextBufferType::Gtest).push("x".into());
        assert!(buffers.get(TextBufferType::Process).is_empty());
        assert_eq!(buffers.get(TextBufferType::Gtest), &vec!["x".to_string()]);
        buffers.clear();
        assert!(buffers.get(TextBufferType::Gtest).is_empty());
    }
}
