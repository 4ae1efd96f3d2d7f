/// Caret position, 0-based
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self { line: 0, col: 0 }
    }

    /// Jump to `line`, clamped to the last line, column reset to 0
    pub fn move_to_line(&mut self, line: usize, line_count: usize) {
        self.line = line.min(line_count.saturating_sub(1));
        self.col = 0;
    }
}
