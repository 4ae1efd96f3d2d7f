//! Script engine for a modal editor's command language.
//!
//! A host builds one [`Session`], attaches its editors, and runs parsed
//! scripts through [`Session::execute_script`]. Options can also be set up
//! front from a Rhai init file with [`config::ConfigEngine`].

pub mod commands;
pub mod config;
pub mod editor;
pub mod options;
pub mod script;
pub mod session;

pub use editor::{Editor, EditorId, TextEditor};
pub use options::{OptionScope, OptionService, OptionValue};
pub use script::{ExecError, ExecutionResult, Expr, Statement, Value};
pub use session::{ExecContext, Session};
