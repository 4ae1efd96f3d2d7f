//! Line-oriented commands.

use super::{Access, ArgumentFlag, Command, CommandFlags, CommandLine, LineRange, RangeFlag, flags};
use crate::script::{ExecError, ExecutionResult};
use crate::session::ExecContext;

fn target_range(line: &CommandLine, ctx: &ExecContext<'_>) -> LineRange {
    line.range.unwrap_or_else(|| LineRange::line(ctx.current_line()))
}

/// `:[range]p[rint]`: echo the lines and leave the cursor on the last one
#[derive(Debug)]
pub struct PrintCommand {
    line: CommandLine,
}

impl PrintCommand {
    const FLAGS: CommandFlags = flags(RangeFlag::Optional, ArgumentFlag::Forbidden, Access::ReadOnly);

    pub fn new(line: CommandLine) -> Self {
        Self { line }
    }
}

impl Command for PrintCommand {
    fn name(&self) -> &'static str {
        "print"
    }

    fn flags(&self) -> CommandFlags {
        Self::FLAGS
    }

    fn line(&self) -> &CommandLine {
        &self.line
    }

    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        let range = target_range(&self.line, ctx);
        for line in range.first..=range.last {
            let text = ctx.editor.line_text(line - 1).unwrap_or_default();
            ctx.session.echo(text);
        }
        ctx.editor.set_current_line(range.last - 1);
        Ok(ExecutionResult::Success)
    }
}

/// `:[range]d[elete] [count]`
///
/// With a count, deletes that many lines starting at the last line of the
/// range, stopping at the end of the buffer.
#[derive(Debug)]
pub struct DeleteCommand {
    line: CommandLine,
}

impl DeleteCommand {
    const FLAGS: CommandFlags = flags(RangeFlag::Optional, ArgumentFlag::Optional, Access::Write);

    pub fn new(line: CommandLine) -> Self {
        Self { line }
    }

    fn count(&self) -> Result<Option<usize>, ExecError> {
        let argument = self.line.argument.trim();
        if argument.is_empty() {
            return Ok(None);
        }
        match argument.parse::<usize>() {
            Ok(count) if count > 0 => Ok(Some(count)),
            _ => Err(ExecError::ex(format!("E488: Trailing characters: {argument}"))),
        }
    }
}

impl Command for DeleteCommand {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn flags(&self) -> CommandFlags {
        Self::FLAGS
    }

    fn line(&self) -> &CommandLine {
        &self.line
    }

    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        let mut range = target_range(&self.line, ctx);
        if let Some(count) = self.count()? {
            let first = range.last;
            let last = first.saturating_add(count - 1).min(ctx.editor.line_count());
            range = LineRange::new(first, last);
        }
        tracing::debug!(range = %range, "deleting lines");
        ctx.editor.delete_lines(range.first - 1, range.last - 1);
        Ok(ExecutionResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{Editor, EditorId, TextEditor};
    use crate::session::Session;

    fn editor() -> TextEditor {
        TextEditor::from_text(EditorId(0), "one\ntwo\nthree\nfour\n")
    }

    #[test]
    fn print_echoes_range_and_moves_cursor() {
        let mut session = Session::new();
        let mut editor = editor();
        let before = editor.text();
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let command = PrintCommand::new(CommandLine::default().range(LineRange::new(2, 3)));
        command.execute(&mut ctx).unwrap();

        let shown: Vec<&str> = session.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(shown, vec!["two", "three"]);
        assert_eq!(editor.current_line(), 2);
        assert_eq!(editor.text(), before);
    }

    #[test]
    fn print_defaults_to_current_line() {
        let mut session = Session::new();
        let mut editor = editor();
        editor.set_current_line(3);
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        PrintCommand::new(CommandLine::default()).execute(&mut ctx).unwrap();
        assert_eq!(session.messages()[0].text, "four");
    }

    #[test]
    fn print_rejects_arguments_without_output() {
        let mut session = Session::new();
        let mut editor = editor();
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let err = PrintCommand::new(CommandLine::with_argument("x"))
            .execute(&mut ctx)
            .unwrap_err();
        assert_eq!(err.to_string(), "E488: Trailing characters: x");
        assert!(session.messages().is_empty());
    }

    #[test]
    fn delete_removes_range() {
        let mut session = Session::new();
        let mut editor = editor();
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        DeleteCommand::new(CommandLine::default().range(LineRange::new(2, 3)))
            .execute(&mut ctx)
            .unwrap();
        assert_eq!(editor.text(), "one\nfour\n");
        assert_eq!(editor.current_line(), 1);
    }

    #[test]
    fn delete_count_starts_at_range_end_and_stops_at_buffer_end() {
        let mut session = Session::new();
        let mut editor = editor();
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let line = CommandLine::with_argument("5").range(LineRange::line(3));
        DeleteCommand::new(line).execute(&mut ctx).unwrap();
        assert_eq!(editor.text(), "one\ntwo\n");
    }

    #[test]
    fn delete_with_huge_count_clamps_to_buffer_end() {
        let mut session = Session::new();
        let mut editor = editor();
        let script = vec![crate::script::Statement::Command(
            crate::commands::build(
                "delete",
                CommandLine::with_argument(usize::MAX.to_string()).range(LineRange::line(2)),
            )
            .unwrap(),
        )];
        session.execute_script(&mut editor, &script).unwrap();
        assert_eq!(editor.text(), "one\n");
        assert!(session.messages().is_empty());
    }

    #[test]
    fn delete_rejects_non_numeric_count() {
        let mut session = Session::new();
        let mut editor = editor();
        let before = editor.text();
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let err = DeleteCommand::new(CommandLine::with_argument("abc"))
            .execute(&mut ctx)
            .unwrap_err();
        assert_eq!(err.to_string(), "E488: Trailing characters: abc");
        assert_eq!(editor.text(), before);
    }
}
