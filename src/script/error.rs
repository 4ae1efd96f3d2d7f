//! Error taxonomy of the script engine.
//!
//! - [`EvalError`] and [`ArityError`] always propagate immediately.
//! - [`ExecError::Ex`] and [`ExecError::Option`] are statement-level failures
//!   that the function body policies may collect as [`Diagnostic`]s.
//! - [`ExecError::Finish`] is not a failure: it unwinds the rest of the
//!   running script and produces no message.

use thiserror::Error;

use crate::options::OptionError;

/// Errors raised while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("E121: Undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("E117: Unknown function: {0}")]
    UnknownFunction(String),
    #[error("E1154: Divide by zero")]
    DivisionByZero,
    #[error("E1012: Type mismatch; expected {expected} but got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("E684: List index out of range: {0}")]
    IndexOutOfRange(i64),
    #[error("E716: Key not present in Dictionary: \"{0}\"")]
    MissingKey(String),
    #[error("E46: Cannot change read-only variable \"{0}\"")]
    ReadOnlyVariable(String),
    #[error("E461: Illegal variable name: {0}")]
    IllegalVariableName(String),
    #[error("E725: Calling dict function without Dictionary: {0}")]
    DictFunctionWithoutDict(String),
    #[error("E132: Function call depth is higher than 'maxfuncdepth'")]
    CallDepthExceeded,
    #[error("E698: Variable nested too deep for making a copy")]
    NestedTooDeep,
    #[error("E474: Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Arity(#[from] ArityError),
    #[error(transparent)]
    Option(#[from] OptionError),
}

/// Argument count outside the declared bounds of a function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArityError {
    #[error("E119: Not enough arguments for function: {name}")]
    TooFew { name: String, min: usize, given: usize },
    #[error("E118: Too many arguments for function: {name}")]
    TooMany { name: String, max: usize, given: usize },
}

/// Everything that can interrupt statement execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Option(OptionError),
    /// Generic statement-level error
    #[error("{0}")]
    Ex(String),
    /// `:finish`; unwinds to the top of the call stack without a message
    #[error("finish")]
    Finish,
}

impl ExecError {
    pub fn ex(message: impl Into<String>) -> Self {
        ExecError::Ex(message.into())
    }

    /// Whether a body policy may collect this error instead of propagating it
    pub fn is_collectable(&self) -> bool {
        matches!(self, ExecError::Ex(_) | ExecError::Option(_))
    }
}

impl From<ArityError> for ExecError {
    fn from(err: ArityError) -> Self {
        ExecError::Eval(EvalError::Arity(err))
    }
}

impl From<OptionError> for ExecError {
    fn from(err: OptionError) -> Self {
        ExecError::Option(err)
    }
}

/// A problem collected while running a body, reported after it finishes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("E587: :break without :while or :for: break")]
    BreakWithoutLoop,
    #[error("E586: :continue without :while or :for: continue")]
    ContinueWithoutLoop,
    #[error("E133: :return not inside a function")]
    ReturnOutsideFunction,
    #[error("{0}")]
    Statement(String),
}

impl Diagnostic {
    pub fn is_control_flow_misuse(&self) -> bool {
        matches!(
            self,
            Diagnostic::BreakWithoutLoop
                | Diagnostic::ContinueWithoutLoop
                | Diagnostic::ReturnOutsideFunction
        )
    }
}

impl From<ExecError> for Diagnostic {
    fn from(err: ExecError) -> Self {
        Diagnostic::Statement(err.to_string())
    }
}

/// Diagnostics collected for one invocation.
///
/// Only the most recent one is ever surfaced; several errors raised by the
/// same body are not reported individually.
#[derive(Debug, Default)]
pub struct Diagnostics {
    last: Option<Diagnostic>,
    count: usize,
}

impl Diagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.count += 1;
        self.last = Some(diagnostic);
    }

    pub fn last(&self) -> Option<&Diagnostic> {
        self.last.as_ref()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_errors_are_eval_errors() {
        let err: ExecError = ArityError::TooFew {
            name: "Foo".to_string(),
            min: 1,
            given: 0,
        }
        .into();
        assert!(matches!(err, ExecError::Eval(EvalError::Arity(_))));
        assert!(!err.is_collectable());
        assert_eq!(err.to_string(), "E119: Not enough arguments for function: Foo");
    }

    #[test]
    fn only_statement_errors_are_collectable() {
        assert!(ExecError::ex("boom").is_collectable());
        assert!(!ExecError::Finish.is_collectable());
        assert!(!ExecError::Eval(EvalError::DivisionByZero).is_collectable());
    }

    #[test]
    fn diagnostics_keep_only_the_last() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(Diagnostic::BreakWithoutLoop);
        diagnostics.push(Diagnostic::Statement("later".to_string()));
        assert_eq!(diagnostics.count(), 2);
        assert_eq!(diagnostics.last().map(|d| d.to_string()).as_deref(), Some("later"));
    }
}
