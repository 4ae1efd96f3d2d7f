use super::{Access, ArgumentFlag, Command, CommandFlags, CommandLine, RangeFlag, flags};
use crate::script::{ExecError, ExecutionResult};
use crate::session::ExecContext;

/// `:delf[unction][!] {name}`
#[derive(Debug)]
pub struct DelfunctionCommand {
    line: CommandLine,
}

impl DelfunctionCommand {
    const FLAGS: CommandFlags = flags(RangeFlag::Forbidden, ArgumentFlag::Required, Access::ReadOnly);

    pub fn new(line: CommandLine) -> Self {
        Self { line }
    }
}

impl Command for DelfunctionCommand {
    fn name(&self) -> &'static str {
        "delfunction"
    }

    fn flags(&self) -> CommandFlags {
        Self::FLAGS
    }

    fn line(&self) -> &CommandLine {
        &self.line
    }

    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        let name = self.line.argument.trim();
        if ctx.session.functions.remove(name) {
            tracing::debug!(function = name, "function deleted");
        } else if !self.line.bang {
            return Err(ExecError::ex(format!("E130: Unknown function: {name}")));
        }
        Ok(ExecutionResult::Success)
    }
}
