//! The host editor as seen by the script engine.
//!
//! The engine never renders and never reads keystrokes. Everything it needs
//! from the editor goes through the [`Editor`] trait. [`TextEditor`] is a
//! rope-backed implementation used by tests and simple hosts.

mod buffer;
mod cursor;
mod text_editor;

use std::fmt;
use std::path::Path;

pub use buffer::Buffer;
pub use cursor::Cursor;
pub use text_editor::TextEditor;

/// Identity of an editor instance; owns LOCAL option values and `b:`/`w:`/`t:` variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EditorId(pub usize);

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "editor#{}", self.0)
    }
}

/// Collaborator contract consumed by the engine.
///
/// Line numbers are 0-based here; script-visible lines (`a:firstline`,
/// `line('.')`, ranges) are 1-based and converted at the boundary.
pub trait Editor {
    fn id(&self) -> EditorId;

    fn current_line(&self) -> usize;

    /// Move the caret to `line`, clamped to the buffer
    fn set_current_line(&mut self, line: usize);

    fn line_count(&self) -> usize;

    /// Total size of the text in characters
    fn text_length(&self) -> usize;

    /// Text of `line` without its line terminator
    fn line_text(&self, line: usize) -> Option<String>;

    fn path(&self) -> Option<&Path>;

    /// Delete lines `first..=last`
    fn delete_lines(&mut self, first: usize, last: usize);
}
