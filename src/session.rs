//! The process-wide script context.
//!
//! A [`Session`] owns everything GLOBAL: variables, the function registry and
//! the option service. It is created once per host and passed by reference
//! into every execution through an [`ExecContext`], which pairs it with the
//! editor the code runs against.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::editor::{Editor, EditorId};
use crate::options::keyword;
use crate::options::{OptionError, OptionScope, OptionService, OptionValue, SharedClassifier};
use crate::script::{
    Diagnostic, EvalError, ExecError, ExecutionResult, FunctionRegistry, Statement, Value,
    Variable, VariableStore,
};

/// Recursion bound used when `maxfuncdepth` cannot be read
const DEFAULT_MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub error: bool,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

pub struct Session {
    options: Arc<RwLock<OptionService>>,
    keywords: SharedClassifier,
    pub variables: VariableStore,
    pub functions: FunctionRegistry,
    messages: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        let mut options = OptionService::new();
        // Only fails when `iskeyword` is not declared, which the builtin table always does
        let keywords = keyword::attach(&mut options).unwrap_or_default();
        Self::assemble(options, keywords)
    }

    /// Session over a caller-built option service; it must declare `iskeyword`
    pub fn with_options(mut options: OptionService) -> Result<Self, OptionError> {
        let keywords = keyword::attach(&mut options)?;
        Ok(Self::assemble(options, keywords))
    }

    fn assemble(options: OptionService, keywords: SharedClassifier) -> Self {
        Self {
            options: Arc::new(RwLock::new(options)),
            keywords,
            variables: VariableStore::new(),
            functions: FunctionRegistry::new(),
            messages: Vec::new(),
        }
    }

    /// Handle for hosts and the config engine; GLOBAL writes go through its lock
    pub fn shared_options(&self) -> Arc<RwLock<OptionService>> {
        Arc::clone(&self.options)
    }

    pub fn options(&self) -> RwLockReadGuard<'_, OptionService> {
        self.options.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn options_mut(&self) -> RwLockWriteGuard<'_, OptionService> {
        self.options.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn attach_editor(&mut self, editor: EditorId) {
        self.options_mut().register_editor(editor);
    }

    pub fn detach_editor(&mut self, editor: EditorId) {
        self.options_mut().forget_editor(editor);
        self.variables.forget_editor(editor);
    }

    pub fn is_keyword(&self, c: char) -> bool {
        self.keywords
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_keyword(c)
    }

    pub fn max_call_depth(&self) -> usize {
        match self.options().get(OptionScope::Global, "maxfuncdepth") {
            Ok(OptionValue::Number(n)) => usize::try_from(n).unwrap_or(DEFAULT_MAX_DEPTH),
            _ => DEFAULT_MAX_DEPTH,
        }
    }

    pub fn echo(&mut self, text: impl Into<String>) {
        self.messages.push(Message {
            text: text.into(),
            error: false,
        });
    }

    /// Surface an error to the user and remember it in `v:errmsg`
    pub fn report_error(&mut self, error: &dyn fmt::Display) {
        let text = error.to_string();
        tracing::warn!(message = %text, "script error");
        self.variables.set_builtin("errmsg", Value::string(text.clone()));
        self.messages.push(Message { text, error: true });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn take_messages(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    /// Run top-level statements against `editor`.
    ///
    /// Statement errors are reported and execution moves on. Evaluation
    /// errors are reported and returned. `:finish` ends the script quietly.
    #[tracing::instrument(skip_all, fields(editor = %editor.id(), statements = statements.len()))]
    pub fn execute_script(
        &mut self,
        editor: &mut dyn Editor,
        statements: &[Statement],
    ) -> Result<(), ExecError> {
        let mut ctx = ExecContext::new(self, editor);
        for statement in statements {
            let result = match statement.execute(&mut ctx) {
                Ok(result) => result,
                Err(err) if err.is_collectable() => ExecutionResult::Error(err.to_string()),
                Err(ExecError::Finish) => {
                    tracing::debug!("script finished early");
                    return Ok(());
                }
                Err(err) => {
                    ctx.session.report_error(&err);
                    return Err(err);
                }
            };
            match result {
                ExecutionResult::Success => {}
                ExecutionResult::Break => ctx.session.report_error(&Diagnostic::BreakWithoutLoop),
                ExecutionResult::Continue => {
                    ctx.session.report_error(&Diagnostic::ContinueWithoutLoop)
                }
                ExecutionResult::Return(_) => {
                    ctx.session.report_error(&Diagnostic::ReturnOutsideFunction);
                    return Ok(());
                }
                ExecutionResult::Error(message) => ctx.session.report_error(&message),
            }
        }
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("variables", &self.variables)
            .field("functions", &self.functions)
            .field("messages", &self.messages.len())
            .finish()
    }
}

/// One execution: the session plus the editor code runs against
pub struct ExecContext<'a> {
    pub session: &'a mut Session,
    pub editor: &'a mut dyn Editor,
}

impl<'a> ExecContext<'a> {
    pub fn new(session: &'a mut Session, editor: &'a mut dyn Editor) -> Self {
        Self { session, editor }
    }

    pub fn editor_id(&self) -> EditorId {
        self.editor.id()
    }

    /// Current line, 1-based
    pub fn current_line(&self) -> usize {
        self.editor.current_line() + 1
    }

    pub fn lookup(&self, variable: &Variable) -> Option<Value> {
        self.session
            .variables
            .get_variable_value(variable, self.editor.id())
    }

    pub fn variable(&self, variable: &Variable) -> Result<Value, EvalError> {
        self.session
            .variables
            .get_nonnull_variable_value(variable, self.editor.id())
    }

    pub fn store(&mut self, variable: &Variable, value: Value) -> Result<(), EvalError> {
        let editor = self.editor.id();
        self.session.variables.store_variable(variable, value, editor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextEditor;

    #[test]
    fn report_error_sets_errmsg() {
        let mut session = Session::new();
        session.report_error(&"E492: Not an editor command: frob");
        let errmsg = session
            .variables
            .get_variable_value(&Variable::parse("v:errmsg"), EditorId(0));
        assert_eq!(errmsg, Some(Value::string("E492: Not an editor command: frob")));
        assert!(session.messages()[0].error);
    }

    #[test]
    fn keyword_option_drives_classifier() {
        let session = Session::new();
        assert!(session.is_keyword('_'));
        session
            .options_mut()
            .set_option_value(OptionScope::Global, "isk", &Value::string("@"))
            .unwrap();
        assert!(!session.is_keyword('_'));
        assert!(session.is_keyword('q'));
    }

    #[test]
    fn invalid_keyword_value_keeps_previous_classifier() {
        let session = Session::new();
        let err = session
            .options_mut()
            .set_option_value(OptionScope::Global, "isk", &Value::string("@,z-a"));
        assert!(err.is_err());
        assert!(session.is_keyword('_'));
        assert!(session.is_keyword('7'));
    }

    #[test]
    fn max_depth_follows_option() {
        let session = Session::new();
        assert_eq!(session.max_call_depth(), 100);
        session
            .options_mut()
            .set_option_value(OptionScope::Global, "mfd", &Value::Integer(7))
            .unwrap();
        assert_eq!(session.max_call_depth(), 7);
    }

    #[test]
    fn detach_drops_editor_state() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(4), "x\n");
        session.attach_editor(editor.id());
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        ctx.store(&Variable::parse("b:tick"), Value::Integer(1)).unwrap();
        assert!(ctx.lookup(&Variable::parse("b:tick")).is_some());

        session.detach_editor(EditorId(4));
        let gone = session
            .variables
            .get_variable_value(&Variable::parse("b:tick"), EditorId(4));
        assert_eq!(gone, None);
    }
}
