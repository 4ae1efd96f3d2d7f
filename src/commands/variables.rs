use std::fmt;

use super::{Access, ArgumentFlag, Command, CommandFlags, CommandLine, RangeFlag, flags};
use crate::script::expr::{self, index_value, resolve_index};
use crate::script::{
    BinaryOp, EvalError, ExecError, ExecutionResult, Expr, OptionAccess, Value, Variable,
};
use crate::session::ExecContext;

/// Left-hand side of `:let`
#[derive(Debug, Clone, PartialEq)]
pub enum LetTarget {
    Variable(Variable),
    /// `list[i]` or `dict[key]`; the container is updated in place
    Index { base: Expr, index: Expr },
    Option { access: OptionAccess, name: String },
}

impl fmt::Display for LetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LetTarget::Variable(variable) => write!(f, "{variable}"),
            LetTarget::Index { base, index } => write!(f, "{base}[{index}]"),
            LetTarget::Option { access, name } => write!(
                f,
                "{}",
                Expr::Option {
                    access: *access,
                    name: name.clone()
                }
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetOperator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Concat,
}

impl LetOperator {
    fn binary(self) -> Option<BinaryOp> {
        match self {
            LetOperator::Assign => None,
            LetOperator::Add => Some(BinaryOp::Add),
            LetOperator::Subtract => Some(BinaryOp::Sub),
            LetOperator::Multiply => Some(BinaryOp::Mul),
            LetOperator::Divide => Some(BinaryOp::Div),
            LetOperator::Modulo => Some(BinaryOp::Mod),
            LetOperator::Concat => Some(BinaryOp::Concat),
        }
    }

    fn symbol(self) -> &'static str {
        match self.binary() {
            None => "=",
            Some(BinaryOp::Add) => "+=",
            Some(BinaryOp::Sub) => "-=",
            Some(BinaryOp::Mul) => "*=",
            Some(BinaryOp::Div) => "/=",
            Some(BinaryOp::Mod) => "%=",
            Some(_) => ".=",
        }
    }
}

/// `:let {target} {op} {expr}`
#[derive(Debug)]
pub struct LetCommand {
    line: CommandLine,
    target: LetTarget,
    operator: LetOperator,
    value: Expr,
}

impl LetCommand {
    const FLAGS: CommandFlags = flags(RangeFlag::Forbidden, ArgumentFlag::Required, Access::ReadOnly);

    pub fn new(target: LetTarget, operator: LetOperator, value: Expr) -> Self {
        let argument = format!("{target} {} {value}", operator.symbol());
        Self {
            line: CommandLine::with_argument(argument),
            target,
            operator,
            value,
        }
    }

    pub fn assign(target: LetTarget, value: Expr) -> Self {
        Self::new(target, LetOperator::Assign, value)
    }

    fn combine(
        &self,
        current: impl FnOnce() -> Result<Value, EvalError>,
        rhs: Value,
    ) -> Result<Value, EvalError> {
        match self.operator.binary() {
            None => Ok(rhs),
            Some(op) => expr::binary(op, &current()?, &rhs),
        }
    }

    fn assign_index(
        &self,
        ctx: &mut ExecContext<'_>,
        base: &Expr,
        index: &Expr,
        rhs: Value,
    ) -> Result<(), ExecError> {
        let container = base.evaluate(ctx)?;
        let key = index.evaluate(ctx)?;
        match &container {
            Value::List(list) => {
                let i = key.to_number()?;
                let len = list.borrow().len();
                let slot = resolve_index(i, len).ok_or(EvalError::IndexOutOfRange(i))?;
                let value = self.combine(|| index_value(&container, &key), rhs)?;
                list.borrow_mut()[slot] = value;
            }
            Value::Dict(dict) => {
                let name = key.to_text()?;
                let value = self.combine(|| index_value(&container, &key), rhs)?;
                dict.borrow_mut().insert(name, value);
            }
            other => {
                return Err(EvalError::TypeMismatch {
                    expected: "list",
                    found: other.type_name(),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl Command for LetCommand {
    fn name(&self) -> &'static str {
        "let"
    }

    fn flags(&self) -> CommandFlags {
        Self::FLAGS
    }

    fn line(&self) -> &CommandLine {
        &self.line
    }

    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        let rhs = self.value.evaluate(ctx)?;
        match &self.target {
            LetTarget::Variable(variable) => {
                let value = self.combine(|| ctx.variable(variable), rhs)?;
                ctx.store(variable, value)?;
            }
            LetTarget::Index { base, index } => self.assign_index(ctx, base, index, rhs)?,
            LetTarget::Option { access, name } => {
                let scope = access.scope(ctx);
                let value = self.combine(
                    || Ok(ctx.session.options().get_option_value(scope, name)?),
                    rhs,
                )?;
                ctx.session.options_mut().set_option_value(scope, name, &value)?;
            }
        }
        Ok(ExecutionResult::Success)
    }
}

/// `:unlet[!] {name}..`
#[derive(Debug)]
pub struct UnletCommand {
    line: CommandLine,
    variables: Vec<Variable>,
}

impl UnletCommand {
    const FLAGS: CommandFlags = flags(RangeFlag::Forbidden, ArgumentFlag::Required, Access::ReadOnly);

    pub fn parse(line: CommandLine) -> Self {
        let variables = line.argument.split_whitespace().map(Variable::parse).collect();
        Self { line, variables }
    }
}

impl Command for UnletCommand {
    fn name(&self) -> &'static str {
        "unlet"
    }

    fn flags(&self) -> CommandFlags {
        Self::FLAGS
    }

    fn line(&self) -> &CommandLine {
        &self.line
    }

    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        let editor = ctx.editor_id();
        for variable in &self.variables {
            let removed = ctx.session.variables.remove_variable(variable, editor)?;
            if !removed && !self.line.bang {
                return Err(ExecError::ex(format!("E108: No such variable: \"{variable}\"")));
            }
        }
        Ok(ExecutionResult::Success)
    }
}
