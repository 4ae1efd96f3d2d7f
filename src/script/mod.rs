//! The script engine: values, variables, expressions, statements and
//! functions.
//!
//! Scripts arrive already parsed, as [`Statement`] trees. Execution runs
//! against a [`crate::session::ExecContext`].

pub mod builtins;
mod error;
pub mod expr;
pub mod function;
pub mod statement;
mod value;
mod variables;

pub use builtins::Builtin;
pub use error::{ArityError, Diagnostic, Diagnostics, EvalError, ExecError};
pub use expr::{BinaryOp, Expr, OptionAccess, UnaryOp};
pub use function::{
    CallSite, DefinedFunction, FunctionDeclaration, FunctionFlag, FunctionRegistry, FunctionScope,
    call_function, define_function,
};
pub use statement::{ExecutionPolicy, ExecutionResult, Statement, execute_block, run_body};
pub use value::{DictRef, ListRef, Value, json_to_value};
pub use variables::{CallFrame, Locals, Scope, Variable, VariableStore};
