use super::{Access, ArgumentFlag, Command, CommandFlags, CommandLine, LineRange, RangeFlag, flags};
use crate::script::expr::evaluate_all;
use crate::script::{CallSite, ExecError, ExecutionResult, Expr, call_function};
use crate::session::ExecContext;

/// `:[range]call {name}({args})`; the result is discarded
#[derive(Debug)]
pub struct CallCommand {
    line: CommandLine,
    function: String,
    args: Vec<Expr>,
}

impl CallCommand {
    const FLAGS: CommandFlags = flags(RangeFlag::Optional, ArgumentFlag::Required, Access::Write);

    pub fn new(function: impl Into<String>, args: Vec<Expr>) -> Self {
        let function = function.into();
        let argument = Expr::call(function.clone(), args.clone()).to_string();
        Self {
            line: CommandLine::with_argument(argument),
            function,
            args,
        }
    }

    pub fn with_range(mut self, range: LineRange) -> Self {
        self.line.range = Some(range);
        self
    }
}

impl Command for CallCommand {
    fn name(&self) -> &'static str {
        "call"
    }

    fn flags(&self) -> CommandFlags {
        Self::FLAGS
    }

    fn line(&self) -> &CommandLine {
        &self.line
    }

    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        let args = evaluate_all(&self.args, ctx)?;
        let site = CallSite {
            range: self.line.range,
            dict: None,
        };
        call_function(ctx, &self.function, args, site)?;
        Ok(ExecutionResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::EchoCommand;
    use crate::editor::{Editor, EditorId, TextEditor};
    use crate::script::{FunctionDeclaration, FunctionFlag, Statement};
    use crate::session::Session;

    #[test]
    fn call_passes_range_to_range_function() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "1\n2\n3\n4\n");
        let script = vec![
            Statement::function(
                FunctionDeclaration::new("Mark")
                    .flag(FunctionFlag::Range)
                    .body(vec![Statement::command(EchoCommand::new(vec![Expr::call(
                        "getline",
                        vec![Expr::string(".")],
                    )]))]),
            ),
            Statement::command(CallCommand::new("Mark", vec![]).with_range(LineRange::new(2, 3))),
        ];
        session.execute_script(&mut editor, &script).unwrap();
        let shown: Vec<&str> = session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(shown, vec!["2", "3"]);
        assert_eq!(editor.current_line(), 2);
    }

    #[test]
    fn out_of_buffer_range_is_rejected_before_calling() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "1\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let command = CallCommand::new("Missing", vec![]).with_range(LineRange::new(1, 5));
        let err = command.execute(&mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "E16: Invalid range");
    }

    #[test]
    fn unknown_function_is_an_evaluation_error() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "1\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let err = CallCommand::new("Missing", vec![]).execute(&mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "E117: Unknown function: Missing");
        assert!(!err.is_collectable());
    }
}
