use std::io;
use std::path::{Path, PathBuf};

use super::{Buffer, Cursor, Editor, EditorId};

/// A rope-backed editor with a single caret
pub struct TextEditor {
    id: EditorId,
    pub buffer: Buffer,
    pub cursor: Cursor,
    path: Option<PathBuf>,
}

impl TextEditor {
    pub fn new(id: EditorId) -> Self {
        Self {
            id,
            buffer: Buffer::new(),
            cursor: Cursor::new(),
            path: None,
        }
    }

    pub fn open(id: EditorId, path: PathBuf) -> io::Result<Self> {
        Ok(Self {
            id,
            buffer: Buffer::from_file(&path)?,
            cursor: Cursor::new(),
            path: Some(path),
        })
    }

    pub fn from_text(id: EditorId, text: &str) -> Self {
        Self {
            id,
            buffer: Buffer::from_text(text),
            cursor: Cursor::new(),
            path: None,
        }
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    fn clamp_cursor(&mut self) {
        let line_count = self.buffer.line_count();
        if self.cursor.line >= line_count {
            self.cursor.line = line_count.saturating_sub(1);
        }
        let line_len = self.buffer.line_len(self.cursor.line);
        if self.cursor.col > line_len {
            self.cursor.col = line_len;
        }
    }
}

impl Editor for TextEditor {
    fn id(&self) -> EditorId {
        self.id
    }

    fn current_line(&self) -> usize {
        self.cursor.line
    }

    fn set_current_line(&mut self, line: usize) {
        let line_count = self.buffer.line_count();
        self.cursor.move_to_line(line, line_count);
    }

    fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    fn text_length(&self) -> usize {
        self.buffer.len_chars()
    }

    fn line_text(&self, line: usize) -> Option<String> {
        self.buffer.line_text(line)
    }

    fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn delete_lines(&mut self, first: usize, last: usize) {
        self.buffer.delete_lines(first, last);
        self.cursor.line = first;
        self.clamp_cursor();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with_text(s: &str) -> TextEditor {
        TextEditor::from_text(EditorId(1), s)
    }

    #[test]
    fn new_editor_starts_on_first_line() {
        let editor = TextEditor::new(EditorId(0));
        assert_eq!(editor.current_line(), 0);
        assert_eq!(editor.line_count(), 1);
        assert!(editor.path().is_none());
    }

    #[test]
    fn set_current_line_clamps() {
        let mut editor = editor_with_text("1\n2\n3\n");
        editor.set_current_line(2);
        assert_eq!(editor.current_line(), 2);
        editor.set_current_line(10);
        assert_eq!(editor.current_line(), 2);
    }

    #[test]
    fn delete_lines_keeps_cursor_in_bounds() {
        let mut editor = editor_with_text("1\n2\n3\n");
        editor.set_current_line(2);
        editor.delete_lines(1, 2);
        assert_eq!(editor.text(), "1\n");
        assert_eq!(editor.current_line(), 0);
    }

    #[test]
    fn open_reads_file_and_remembers_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "alpha\nbeta\n").unwrap();

        let editor = TextEditor::open(EditorId(3), path.clone()).unwrap();
        assert_eq!(editor.line_count(), 2);
        assert_eq!(editor.line_text(1).as_deref(), Some("beta"));
        assert_eq!(editor.path(), Some(path.as_path()));
        assert_eq!(editor.text_length(), 11);
    }
}
