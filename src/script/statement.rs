//! Statements and control flow.
//!
//! `break`, `continue` and `return` travel as [`ExecutionResult`] values,
//! never as errors. Each construct decides whether to consume a signal or
//! hand it to its caller: loops take Break/Continue, the function body
//! runner takes Return.

use std::fmt;
use std::rc::Rc;

use super::error::{Diagnostic, Diagnostics, ExecError};
use super::expr::Expr;
use super::function::{FunctionDeclaration, define_function};
use super::value::Value;
use super::variables::Variable;
use crate::commands::Command;
use crate::session::ExecContext;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Success,
    Break,
    Continue,
    Return(Value),
    /// A statement-level failure, eligible for collection by the body policy
    Error(String),
}

#[derive(Clone)]
pub enum Statement {
    Command(Rc<dyn Command>),
    If {
        branches: Vec<(Expr, Vec<Statement>)>,
        otherwise: Vec<Statement>,
    },
    While {
        condition: Expr,
        body: Vec<Statement>,
    },
    For {
        variable: Variable,
        iterable: Expr,
        body: Vec<Statement>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Finish,
    Function(Rc<FunctionDeclaration>),
}

impl Statement {
    pub fn command(command: impl Command + 'static) -> Self {
        Statement::Command(Rc::new(command))
    }

    pub fn if_then(condition: Expr, body: Vec<Statement>) -> Self {
        Statement::If {
            branches: vec![(condition, body)],
            otherwise: Vec::new(),
        }
    }

    pub fn function(declaration: FunctionDeclaration) -> Self {
        Statement::Function(Rc::new(declaration))
    }

    pub fn execute(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        match self {
            Statement::Command(command) => command.execute(ctx),
            Statement::If {
                branches,
                otherwise,
            } => {
                for (condition, body) in branches {
                    if condition.evaluate(ctx)?.is_truthy()? {
                        return execute_block(body, ctx);
                    }
                }
                execute_block(otherwise, ctx)
            }
            Statement::While { condition, body } => {
                while condition.evaluate(ctx)?.is_truthy()? {
                    match execute_block(body, ctx)? {
                        ExecutionResult::Break => break,
                        ExecutionResult::Success | ExecutionResult::Continue => {}
                        other => return Ok(other),
                    }
                }
                Ok(ExecutionResult::Success)
            }
            Statement::For {
                variable,
                iterable,
                body,
            } => {
                let iterable = iterable.evaluate(ctx)?;
                // Iterate a snapshot so the body may modify the list
                let items = iterable.as_list()?.borrow().clone();
                for item in items {
                    ctx.store(variable, item)?;
                    match execute_block(body, ctx)? {
                        ExecutionResult::Break => break,
                        ExecutionResult::Success | ExecutionResult::Continue => {}
                        other => return Ok(other),
                    }
                }
                Ok(ExecutionResult::Success)
            }
            Statement::Break => Ok(ExecutionResult::Break),
            Statement::Continue => Ok(ExecutionResult::Continue),
            Statement::Return(value) => {
                let value = match value {
                    Some(expr) => expr.evaluate(ctx)?,
                    None => Value::Integer(0),
                };
                Ok(ExecutionResult::Return(value))
            }
            Statement::Finish => Err(ExecError::Finish),
            Statement::Function(declaration) => {
                define_function(ctx, Rc::clone(declaration))?;
                Ok(ExecutionResult::Success)
            }
        }
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Command(command) => write!(f, "Command({})", command.name()),
            Statement::If { branches, .. } => write!(f, "If({} branches)", branches.len()),
            Statement::While { condition, .. } => write!(f, "While({condition})"),
            Statement::For {
                variable, iterable, ..
            } => write!(f, "For({variable} in {iterable})"),
            Statement::Break => f.write_str("Break"),
            Statement::Continue => f.write_str("Continue"),
            Statement::Return(Some(value)) => write!(f, "Return({value})"),
            Statement::Return(None) => f.write_str("Return"),
            Statement::Finish => f.write_str("Finish"),
            Statement::Function(declaration) => write!(f, "Function({})", declaration.name),
        }
    }
}

/// Run statements in order and return the first result that is not Success.
///
/// Collectable errors become [`ExecutionResult::Error`]; evaluation errors
/// and `:finish` propagate as `Err`.
pub fn execute_block(
    statements: &[Statement],
    ctx: &mut ExecContext<'_>,
) -> Result<ExecutionResult, ExecError> {
    for statement in statements {
        match run_statement(statement, ctx)? {
            ExecutionResult::Success => {}
            other => return Ok(other),
        }
    }
    Ok(ExecutionResult::Success)
}

fn run_statement(
    statement: &Statement,
    ctx: &mut ExecContext<'_>,
) -> Result<ExecutionResult, ExecError> {
    match statement.execute(ctx) {
        Err(err) if err.is_collectable() => Ok(ExecutionResult::Error(err.to_string())),
        other => other,
    }
}

/// How a function body reacts to a misused control-flow statement or a
/// statement error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Stop at the first problem
    Abort,
    /// Note the problem and keep going
    Default,
}

/// Run a function body once.
///
/// Returns the value of the `return` that ended it, if any. Problems the
/// policy collects go into `diagnostics`; only the newest one is kept for
/// reporting.
pub fn run_body(
    statements: &[Statement],
    policy: ExecutionPolicy,
    ctx: &mut ExecContext<'_>,
    diagnostics: &mut Diagnostics,
) -> Result<Option<Value>, ExecError> {
    for statement in statements {
        let diagnostic = match run_statement(statement, ctx)? {
            ExecutionResult::Success => continue,
            ExecutionResult::Return(value) => return Ok(Some(value)),
            ExecutionResult::Break => Diagnostic::BreakWithoutLoop,
            ExecutionResult::Continue => Diagnostic::ContinueWithoutLoop,
            ExecutionResult::Error(message) => Diagnostic::Statement(message),
        };
        tracing::warn!(%diagnostic, ?policy, "collected error in function body");
        diagnostics.push(diagnostic);
        if policy == ExecutionPolicy::Abort {
            break;
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{CommandLine, EchoCommand};
    use crate::editor::{EditorId, TextEditor};
    use crate::script::EvalError;
    use crate::script::expr::BinaryOp;
    use crate::session::Session;

    fn echo(text: &str) -> Statement {
        Statement::command(EchoCommand::new(vec![Expr::string(text)]))
    }

    fn run(statements: &[Statement], policy: ExecutionPolicy) -> (Session, Diagnostics, Option<Value>) {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut diagnostics = Diagnostics::default();
        let returned = {
            let mut ctx = ExecContext::new(&mut session, &mut editor);
            run_body(statements, policy, &mut ctx, &mut diagnostics).unwrap()
        };
        (session, diagnostics, returned)
    }

    fn echoed(session: &Session) -> Vec<String> {
        session.messages().iter().map(|m| m.text.clone()).collect()
    }

    #[test]
    fn abort_policy_stops_at_stray_break() {
        let body = vec![echo("before"), Statement::Break, echo("after")];
        let (session, diagnostics, returned) = run(&body, ExecutionPolicy::Abort);
        assert_eq!(diagnostics.count(), 1);
        assert_eq!(diagnostics.last(), Some(&Diagnostic::BreakWithoutLoop));
        assert_eq!(echoed(&session), vec!["before"]);
        assert_eq!(returned, None);
    }

    #[test]
    fn default_policy_keeps_going_and_remembers_the_last_problem() {
        let body = vec![Statement::Break, echo("middle"), Statement::Continue, echo("end")];
        let (session, diagnostics, _) = run(&body, ExecutionPolicy::Default);
        assert_eq!(diagnostics.count(), 2);
        assert_eq!(diagnostics.last(), Some(&Diagnostic::ContinueWithoutLoop));
        assert_eq!(echoed(&session), vec!["middle", "end"]);
    }

    #[test]
    fn return_ends_the_body() {
        let body = vec![
            Statement::Return(Some(Expr::Integer(7))),
            echo("unreachable"),
        ];
        let (session, diagnostics, returned) = run(&body, ExecutionPolicy::Default);
        assert_eq!(returned, Some(Value::Integer(7)));
        assert!(diagnostics.is_empty());
        assert!(session.messages().is_empty());
    }

    #[test]
    fn while_loop_consumes_break() {
        // let i = 0 | while 1 | if i == 3 | break | endif | let i += 1 | endwhile
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let counter = Variable::parse("g:i");
        ctx.store(&counter, Value::Integer(0)).unwrap();
        let body = vec![
            Statement::if_then(
                Expr::binary(BinaryOp::Eq, Expr::var("g:i"), Expr::Integer(3)),
                vec![Statement::Break],
            ),
            Statement::command(crate::commands::LetCommand::assign(
                crate::commands::LetTarget::Variable(counter.clone()),
                Expr::binary(BinaryOp::Add, Expr::var("g:i"), Expr::Integer(1)),
            )),
        ];
        let looped = Statement::While {
            condition: Expr::Integer(1),
            body,
        };
        assert_eq!(looped.execute(&mut ctx).unwrap(), ExecutionResult::Success);
        assert_eq!(ctx.lookup(&counter), Some(Value::Integer(3)));
    }

    #[test]
    fn for_loop_skips_on_continue() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let looped = Statement::For {
            variable: Variable::parse("g:n"),
            iterable: Expr::List(vec![Expr::Integer(1), Expr::Integer(2), Expr::Integer(3)]),
            body: vec![
                Statement::if_then(
                    Expr::binary(BinaryOp::Eq, Expr::var("g:n"), Expr::Integer(2)),
                    vec![Statement::Continue],
                ),
                Statement::command(EchoCommand::new(vec![Expr::var("g:n")])),
            ],
        };
        looped.execute(&mut ctx).unwrap();
        let shown: Vec<String> = session.messages().iter().map(|m| m.text.clone()).collect();
        assert_eq!(shown, vec!["1", "3"]);
    }

    #[test]
    fn finish_propagates_through_blocks() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let block = vec![Statement::if_then(Expr::Integer(1), vec![Statement::Finish]), echo("no")];
        assert_eq!(execute_block(&block, &mut ctx), Err(ExecError::Finish));
    }

    #[test]
    fn statement_errors_become_results() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let command = crate::commands::build("delf", CommandLine::with_argument("Missing")).unwrap();
        let result = execute_block(&[Statement::Command(command), echo("no")], &mut ctx).unwrap();
        assert_eq!(
            result,
            ExecutionResult::Error("E130: Unknown function: Missing".to_string())
        );
        assert!(session.messages().is_empty());
    }

    #[test]
    fn evaluation_errors_are_not_collected() {
        let body = vec![
            Statement::Return(Some(Expr::binary(BinaryOp::Div, Expr::Integer(1), Expr::Integer(0)))),
        ];
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut diagnostics = Diagnostics::default();
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let err = run_body(&body, ExecutionPolicy::Default, &mut ctx, &mut diagnostics).unwrap_err();
        assert_eq!(err, ExecError::Eval(EvalError::DivisionByZero));
        assert!(diagnostics.is_empty());
    }
}
