use super::{Access, ArgumentFlag, Command, CommandFlags, CommandLine, RangeFlag, flags};
use crate::script::{ExecError, ExecutionResult, Expr};
use crate::session::ExecContext;

/// `:echo {expr}..` and `:echoerr {expr}..`
#[derive(Debug)]
pub struct EchoCommand {
    line: CommandLine,
    exprs: Vec<Expr>,
    error: bool,
}

impl EchoCommand {
    const FLAGS: CommandFlags = flags(RangeFlag::Forbidden, ArgumentFlag::Optional, Access::ReadOnly);

    pub fn new(exprs: Vec<Expr>) -> Self {
        Self {
            line: CommandLine::with_argument(join_source(&exprs)),
            exprs,
            error: false,
        }
    }

    /// `:echoerr` fails the statement with the message, so the body policy
    /// decides what happens next
    pub fn error(exprs: Vec<Expr>) -> Self {
        Self {
            error: true,
            ..Self::new(exprs)
        }
    }

    fn render(&self, ctx: &mut ExecContext<'_>) -> Result<String, ExecError> {
        let mut parts = Vec::with_capacity(self.exprs.len());
        for expr in &self.exprs {
            parts.push(expr.evaluate(ctx)?.to_string());
        }
        Ok(parts.join(" "))
    }
}

fn join_source(exprs: &[Expr]) -> String {
    exprs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

impl Command for EchoCommand {
    fn name(&self) -> &'static str {
        if self.error { "echoerr" } else { "echo" }
    }

    fn flags(&self) -> CommandFlags {
        Self::FLAGS
    }

    fn line(&self) -> &CommandLine {
        &self.line
    }

    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        let text = self.render(ctx)?;
        if self.error {
            return Err(ExecError::Ex(text));
        }
        ctx.session.echo(text);
        Ok(ExecutionResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{EditorId, TextEditor};
    use crate::session::Session;

    #[test]
    fn echo_joins_values_with_spaces() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let command = EchoCommand::new(vec![
            Expr::string("count:"),
            Expr::Integer(3),
            Expr::List(vec![Expr::string("a")]),
        ]);
        assert_eq!(command.execute(&mut ctx).unwrap(), ExecutionResult::Success);
        assert_eq!(session.messages()[0].text, "count: 3 ['a']");
    }

    #[test]
    fn echoerr_is_a_statement_error() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let command = EchoCommand::error(vec![Expr::string("bad thing")]);
        let err = command.execute(&mut ctx).unwrap_err();
        assert_eq!(err, ExecError::Ex("bad thing".to_string()));
        assert!(err.is_collectable());
    }

    #[test]
    fn echo_renders_source_as_argument() {
        let command = EchoCommand::new(vec![Expr::var("g:x"), Expr::Float(0.5)]);
        assert_eq!(command.line().argument, "g:x 0.5");
    }
}
