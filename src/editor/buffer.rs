use ropey::Rope;
use std::{fs::File, io, io::BufReader, path::Path};

pub struct Buffer {
    text: Rope,
}

impl Buffer {
    pub fn new() -> Self {
        Self { text: Rope::new() }
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        let text = Rope::from_reader(BufReader::new(File::open(path)?))?;
        Ok(Self { text })
    }

    pub fn from_text(s: &str) -> Self {
        Self {
            text: Rope::from_str(s),
        }
    }

    /// Number of lines, not counting the empty line after a trailing newline
    pub fn line_count(&self) -> usize {
        let lines = self.text.len_lines();
        let len = self.text.len_chars();
        if len > 0 && self.text.char(len - 1) == '\n' {
            lines - 1
        } else {
            lines
        }
    }

    pub fn len_chars(&self) -> usize {
        self.text.len_chars()
    }

    /// Line content without the newline, None if out of bounds
    pub fn line_text(&self, idx: usize) -> Option<String> {
        if idx >= self.line_count() {
            return None;
        }
        let mut line = self.text.line(idx).to_string();
        if line.ends_with('\n') {
            line.pop();
        }
        Some(line)
    }

    pub fn line_len(&self, idx: usize) -> usize {
        // Length excluding newline character
        let line = self.text.line(idx);
        let len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    /// Remove lines `first..=last` including their terminators
    pub fn delete_lines(&mut self, first: usize, last: usize) {
        let count = self.line_count();
        if first >= count || first > last {
            return;
        }
        let last = last.min(count - 1);
        let start = self.text.line_to_char(first);
        let end = if last + 1 < self.text.len_lines() {
            self.text.line_to_char(last + 1)
        } else {
            self.text.len_chars()
        };
        self.text.remove(start..end);
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}
