//! Ex commands.
//!
//! Every command carries a static [`CommandFlags`] descriptor. The provided
//! [`Command::execute`] checks the call against it before `process` runs, so
//! a rejected call has no side effects. Commands marked
//! [`Access::ReadOnly`] never change buffer text.

mod call;
mod echo;
mod function;
mod lines;
mod set;
mod variables;

use std::fmt;
use std::rc::Rc;

use crate::script::{ExecError, ExecutionResult};
use crate::session::ExecContext;

pub use call::CallCommand;
pub use echo::EchoCommand;
pub use function::DelfunctionCommand;
pub use lines::{DeleteCommand, PrintCommand};
pub use set::{SetCommand, SetKind};
pub use variables::{LetCommand, LetOperator, LetTarget, UnletCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFlag {
    Forbidden,
    Optional,
    Required,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgumentFlag {
    Forbidden,
    Optional,
    Required,
}

/// What the command may do to buffer text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFlags {
    pub range: RangeFlag,
    pub argument: ArgumentFlag,
    pub access: Access,
}

pub const fn flags(range: RangeFlag, argument: ArgumentFlag, access: Access) -> CommandFlags {
    CommandFlags {
        range,
        argument,
        access,
    }
}

/// Inclusive line range, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub first: usize,
    pub last: usize,
}

impl LineRange {
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub fn line(line: usize) -> Self {
        Self::new(line, line)
    }

    pub fn len(&self) -> usize {
        (self.last + 1).saturating_sub(self.first)
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.first == self.last {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{},{}", self.first, self.last)
        }
    }
}

/// The already-resolved parts of a command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandLine {
    pub range: Option<LineRange>,
    pub bang: bool,
    pub argument: String,
}

impl CommandLine {
    pub fn with_argument(argument: impl Into<String>) -> Self {
        Self {
            argument: argument.into(),
            ..Self::default()
        }
    }

    pub fn range(mut self, range: LineRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn bang(mut self) -> Self {
        self.bang = true;
        self
    }

    pub fn has_argument(&self) -> bool {
        !self.argument.trim().is_empty()
    }
}

pub trait Command {
    fn name(&self) -> &'static str;

    fn flags(&self) -> CommandFlags;

    fn line(&self) -> &CommandLine;

    /// The command's work, called only once the line passed validation
    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError>;

    fn execute(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        validate(self.name(), self.flags(), self.line(), ctx.editor.line_count())?;
        tracing::trace!(command = self.name(), argument = %self.line().argument, "executing command");
        self.process(ctx)
    }
}

/// Check a command line against a descriptor
pub fn validate(
    name: &str,
    flags: CommandFlags,
    line: &CommandLine,
    line_count: usize,
) -> Result<(), ExecError> {
    match (flags.range, line.range) {
        (RangeFlag::Forbidden, Some(_)) => return Err(ExecError::ex("E481: No range allowed")),
        (RangeFlag::Required, None) => {
            return Err(ExecError::ex(format!("E14: Range required: {name}")));
        }
        (_, Some(range)) if range.first == 0 || range.is_empty() || range.last > line_count => {
            return Err(ExecError::ex("E16: Invalid range"));
        }
        _ => {}
    }
    match (flags.argument, line.has_argument()) {
        (ArgumentFlag::Forbidden, true) => Err(ExecError::ex(format!(
            "E488: Trailing characters: {}",
            line.argument.trim()
        ))),
        (ArgumentFlag::Required, false) => Err(ExecError::ex("E471: Argument required")),
        _ => Ok(()),
    }
}

/// Full command names and the shortest abbreviation each accepts
const TEXT_COMMANDS: &[(&str, usize)] = &[
    ("delete", 1),
    ("delfunction", 4),
    ("print", 1),
    ("set", 2),
    ("setglobal", 4),
    ("setlocal", 4),
    ("unlet", 3),
];

fn resolve_name(name: &str) -> Option<&'static str> {
    TEXT_COMMANDS
        .iter()
        .filter(|(full, min)| name.len() >= *min && full.starts_with(name))
        // An exact match wins over a longer command sharing the prefix
        .min_by_key(|(full, _)| full.len())
        .map(|(full, _)| *full)
}

/// Build a command whose argument is plain text.
///
/// Commands taking expressions (`:let`, `:echo`, `:call`) are built from
/// their parsed parts instead.
pub fn build(name: &str, line: CommandLine) -> Result<Rc<dyn Command>, ExecError> {
    let command: Rc<dyn Command> = match resolve_name(name) {
        Some("delete") => Rc::new(DeleteCommand::new(line)),
        Some("delfunction") => Rc::new(DelfunctionCommand::new(line)),
        Some("print") => Rc::new(PrintCommand::new(line)),
        Some("set") => Rc::new(SetCommand::new(SetKind::Both, line)),
        Some("setglobal") => Rc::new(SetCommand::new(SetKind::Global, line)),
        Some("setlocal") => Rc::new(SetCommand::new(SetKind::Local, line)),
        Some("unlet") => Rc::new(UnletCommand::parse(line)),
        _ => {
            return Err(ExecError::ex(format!("E492: Not an editor command: {name}")));
        }
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("se", Some("set"))]
    #[case("set", Some("set"))]
    #[case("setl", Some("setlocal"))]
    #[case("setg", Some("setglobal"))]
    #[case("p", Some("print"))]
    #[case("d", Some("delete"))]
    #[case("del", Some("delete"))]
    #[case("delf", Some("delfunction"))]
    #[case("unl", Some("unlet"))]
    #[case("s", None)]
    #[case("un", None)]
    #[case("frob", None)]
    fn abbreviations(#[case] typed: &str, #[case] expected: Option<&str>) {
        assert_eq!(resolve_name(typed), expected);
    }

    const RANGED: CommandFlags = flags(RangeFlag::Optional, ArgumentFlag::Forbidden, Access::ReadOnly);

    #[rstest]
    #[case(CommandLine::default(), None)]
    #[case(CommandLine::default().range(LineRange::new(1, 3)), None)]
    #[case(CommandLine::default().range(LineRange::new(0, 3)), Some("E16"))]
    #[case(CommandLine::default().range(LineRange::new(3, 1)), Some("E16"))]
    #[case(CommandLine::default().range(LineRange::new(2, 9)), Some("E16"))]
    #[case(CommandLine::with_argument("x"), Some("E488"))]
    #[case(CommandLine::with_argument("   "), None)]
    fn descriptor_checks(#[case] line: CommandLine, #[case] code: Option<&str>) {
        let result = validate("print", RANGED, &line, 5);
        match code {
            None => assert!(result.is_ok()),
            Some(code) => assert!(result.unwrap_err().to_string().starts_with(code)),
        }
    }

    #[test]
    fn forbidden_range_and_required_argument() {
        let strict = flags(RangeFlag::Forbidden, ArgumentFlag::Required, Access::ReadOnly);
        let ranged = CommandLine::with_argument("x").range(LineRange::line(1));
        assert_eq!(
            validate("let", strict, &ranged, 5).unwrap_err().to_string(),
            "E481: No range allowed"
        );
        assert_eq!(
            validate("let", strict, &CommandLine::default(), 5).unwrap_err().to_string(),
            "E471: Argument required"
        );
        let needs_range = flags(RangeFlag::Required, ArgumentFlag::Optional, Access::Write);
        assert!(validate("x", needs_range, &CommandLine::default(), 5).is_err());
    }

    #[test]
    fn unknown_command() {
        let err = build("frobnicate", CommandLine::default()).err().unwrap();
        assert_eq!(err.to_string(), "E492: Not an editor command: frobnicate");
    }
}
