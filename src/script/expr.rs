//! Expression AST and evaluator.
//!
//! Arithmetic coerces Strings to Numbers the way the editor does
//! (`"12ab" + 1 == 13`) and widens to Float when either side is a Float.
//! Strings are only joined by the explicit `..` operator.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use super::error::{EvalError, ExecError};
use super::function::{self, CallSite};
use super::value::{Value, format_float};
use super::variables::Variable;
use crate::options::OptionScope;
use crate::session::ExecContext;

/// Which value an `&option` reference reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAccess {
    /// `&name`: the editor's value for LOCAL options, else the global one
    Effective,
    /// `&l:name`
    Local,
    /// `&g:name`
    Global,
}

impl OptionAccess {
    pub fn scope(self, ctx: &ExecContext<'_>) -> OptionScope {
        match self {
            OptionAccess::Effective | OptionAccess::Local => OptionScope::Local(ctx.editor_id()),
            OptionAccess::Global => OptionScope::Global,
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            OptionAccess::Effective => "&",
            OptionAccess::Local => "&l:",
            OptionAccess::Global => "&g:",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Is,
    IsNot,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Concat => "..",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Is => "is",
            BinaryOp::IsNot => "isnot",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Expr>),
    Dict(Vec<(Expr, Expr)>),
    Variable(Variable),
    Option { access: OptionAccess, name: String },
    /// `function('Name')`
    FunctionRef(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Call { name: String, args: Vec<Expr> },
    /// `dict.Key(args)`: calls the Funcref stored under `key` with `self` bound
    MethodCall { dict: Box<Expr>, key: String, args: Vec<Expr> },
}

impl Expr {
    pub fn string(s: impl Into<String>) -> Self {
        Expr::String(s.into())
    }

    /// Variable reference; `g:x`, `a:x`, `l:x`... select a scope
    pub fn var(name: &str) -> Self {
        Expr::Variable(Variable::parse(name))
    }

    pub fn option(name: impl Into<String>) -> Self {
        Expr::Option {
            access: OptionAccess::Effective,
            name: name.into(),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        Expr::Index(Box::new(base), Box::new(index))
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args,
        }
    }

    pub fn evaluate(&self, ctx: &mut ExecContext<'_>) -> Result<Value, ExecError> {
        match self {
            Expr::Integer(n) => Ok(Value::Integer(*n)),
            Expr::Float(f) => Ok(Value::Float(*f)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::List(items) => {
                let values = items
                    .iter()
                    .map(|item| item.evaluate(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(values))
            }
            Expr::Dict(entries) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = key.evaluate(ctx)?.to_text()?;
                    map.insert(key, value.evaluate(ctx)?);
                }
                Ok(Value::dict(map))
            }
            Expr::Variable(variable) => Ok(ctx.variable(variable)?),
            Expr::Option { access, name } => {
                let scope = access.scope(ctx);
                Ok(ctx.session.options().get_option_value(scope, name).map_err(EvalError::from)?)
            }
            Expr::FunctionRef(name) => {
                if !function::exists(ctx, name) {
                    return Err(EvalError::UnknownFunction(name.clone()).into());
                }
                Ok(Value::Funcref(name.clone()))
            }
            Expr::Unary(op, operand) => {
                let value = operand.evaluate(ctx)?;
                Ok(unary(*op, &value)?)
            }
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                let result = lhs.evaluate(ctx)?.is_truthy()? && rhs.evaluate(ctx)?.is_truthy()?;
                Ok(Value::bool(result))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                let result = lhs.evaluate(ctx)?.is_truthy()? || rhs.evaluate(ctx)?.is_truthy()?;
                Ok(Value::bool(result))
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = lhs.evaluate(ctx)?;
                let rhs = rhs.evaluate(ctx)?;
                Ok(binary(*op, &lhs, &rhs)?)
            }
            Expr::Ternary(condition, then, otherwise) => {
                if condition.evaluate(ctx)?.is_truthy()? {
                    then.evaluate(ctx)
                } else {
                    otherwise.evaluate(ctx)
                }
            }
            Expr::Index(base, index) => {
                let base = base.evaluate(ctx)?;
                let index = index.evaluate(ctx)?;
                Ok(index_value(&base, &index)?)
            }
            Expr::Call { name, args } => {
                let args = evaluate_all(args, ctx)?;
                function::call_function(ctx, name, args, CallSite::default())
            }
            Expr::MethodCall { dict, key, args } => {
                let dict = dict.evaluate(ctx)?;
                let dict = dict.as_dict()?.clone();
                let target = dict
                    .borrow()
                    .get(key)
                    .cloned()
                    .ok_or_else(|| EvalError::MissingKey(key.clone()))?;
                let name = match target {
                    Value::Funcref(name) => name,
                    other => return Err(mismatch("func", &other).into()),
                };
                let args = evaluate_all(args, ctx)?;
                function::call_function(ctx, &name, args, CallSite::with_dict(dict))
            }
        }
    }
}

pub(crate) fn evaluate_all(
    exprs: &[Expr],
    ctx: &mut ExecContext<'_>,
) -> Result<Vec<Value>, ExecError> {
    exprs.iter().map(|expr| expr.evaluate(ctx)).collect()
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[Expr]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// Source-like rendering, used for command text and logs
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(n) => write!(f, "{n}"),
            Expr::Float(x) => f.write_str(&format_float(*x)),
            Expr::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Expr::List(items) => {
                f.write_str("[")?;
                write_args(f, items)?;
                f.write_str("]")
            }
            Expr::Dict(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
            Expr::Variable(variable) => write!(f, "{variable}"),
            Expr::Option { access, name } => write!(f, "{}{name}", access.prefix()),
            Expr::FunctionRef(name) => write!(f, "function('{name}')"),
            Expr::Unary(op, operand) => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::Plus => "+",
                };
                write!(f, "{symbol}{operand}")
            }
            Expr::Binary(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Expr::Ternary(condition, then, otherwise) => {
                write!(f, "({condition} ? {then} : {otherwise})")
            }
            Expr::Index(base, index) => write!(f, "{base}[{index}]"),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
            Expr::MethodCall { dict, key, args } => {
                write!(f, "{dict}.{key}(")?;
                write_args(f, args)?;
                f.write_str(")")
            }
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

fn as_float(value: &Value) -> Result<f64, EvalError> {
    match value {
        Value::Float(f) => Ok(*f),
        other => other.to_number().map(|n| n as f64),
    }
}

pub fn unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, value) => Ok(Value::bool(!value.is_truthy()?)),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, value) => Ok(Value::Integer(value.to_number()?.wrapping_neg())),
        (UnaryOp::Plus, Value::Float(f)) => Ok(Value::Float(*f)),
        (UnaryOp::Plus, value) => Ok(Value::Integer(value.to_number()?)),
    }
}

/// Apply a non-short-circuit binary operator to two evaluated operands
pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, lhs, rhs)
        }
        BinaryOp::Concat => Ok(Value::String(concat_text(lhs)? + concat_text(rhs)?.as_str())),
        BinaryOp::Eq => equals(lhs, rhs).map(Value::bool),
        BinaryOp::Ne => equals(lhs, rhs).map(|eq| Value::bool(!eq)),
        BinaryOp::Lt => compare(lhs, rhs).map(|o| Value::bool(o == Ordering::Less)),
        BinaryOp::Le => compare(lhs, rhs).map(|o| Value::bool(o != Ordering::Greater)),
        BinaryOp::Gt => compare(lhs, rhs).map(|o| Value::bool(o == Ordering::Greater)),
        BinaryOp::Ge => compare(lhs, rhs).map(|o| Value::bool(o != Ordering::Less)),
        BinaryOp::And => Ok(Value::bool(lhs.is_truthy()? && rhs.is_truthy()?)),
        BinaryOp::Or => Ok(Value::bool(lhs.is_truthy()? || rhs.is_truthy()?)),
        BinaryOp::Is => Ok(Value::bool(lhs.is_same(rhs))),
        BinaryOp::IsNot => Ok(Value::bool(!lhs.is_same(rhs))),
    }
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::List(a), Value::List(b)) if op == BinaryOp::Add => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::List(_) | Value::Dict(_) | Value::Funcref(_), _) => Err(mismatch("number", lhs)),
        (_, Value::List(_) | Value::Dict(_) | Value::Funcref(_)) => Err(mismatch("number", rhs)),
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            let (a, b) = (as_float(lhs)?, as_float(rhs)?);
            let result = match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                BinaryOp::Div if b == 0.0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => a / b,
                _ => {
                    let float = if matches!(lhs, Value::Float(_)) { lhs } else { rhs };
                    return Err(mismatch("number", float));
                }
            };
            Ok(Value::Float(result))
        }
        _ => {
            let (a, b) = (lhs.to_number()?, rhs.to_number()?);
            let result = match op {
                BinaryOp::Add => a.wrapping_add(b),
                BinaryOp::Sub => a.wrapping_sub(b),
                BinaryOp::Mul => a.wrapping_mul(b),
                BinaryOp::Div | BinaryOp::Mod if b == 0 => return Err(EvalError::DivisionByZero),
                BinaryOp::Div => a.wrapping_div(b),
                _ => a.wrapping_rem(b),
            };
            Ok(Value::Integer(result))
        }
    }
}

fn concat_text(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Float(f) => Ok(format_float(*f)),
        other => other.to_text(),
    }
}

fn equals(lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    match (lhs, rhs) {
        (Value::List(_), Value::List(_)) | (Value::Dict(_), Value::Dict(_)) => lhs.equals(rhs),
        (Value::Funcref(a), Value::Funcref(b)) => Ok(a == b),
        (Value::List(_) | Value::Dict(_) | Value::Funcref(_), _) => Err(mismatch(rhs.type_name(), lhs)),
        (_, Value::List(_) | Value::Dict(_) | Value::Funcref(_)) => Err(mismatch(lhs.type_name(), rhs)),
        (Value::String(a), Value::String(b)) => Ok(a == b),
        (Value::Float(_), _) | (_, Value::Float(_)) => Ok(as_float(lhs)? == as_float(rhs)?),
        _ => Ok(lhs.to_number()? == rhs.to_number()?),
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Result<Ordering, EvalError> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::List(_) | Value::Dict(_) | Value::Funcref(_), _) => Err(mismatch("number", lhs)),
        (_, Value::List(_) | Value::Dict(_) | Value::Funcref(_)) => Err(mismatch("number", rhs)),
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            let (a, b) = (as_float(lhs)?, as_float(rhs)?);
            Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal))
        }
        _ => Ok(lhs.to_number()?.cmp(&rhs.to_number()?)),
    }
}

/// `list[i]` (negative counts from the end), `dict[key]`, `string[i]`
pub fn index_value(base: &Value, index: &Value) -> Result<Value, EvalError> {
    match base {
        Value::List(list) => {
            let list = list.borrow();
            let i = index.to_number()?;
            resolve_index(i, list.len())
                .map(|i| list[i].clone())
                .ok_or(EvalError::IndexOutOfRange(i))
        }
        Value::Dict(dict) => {
            let key = index.to_text()?;
            dict.borrow()
                .get(&key)
                .cloned()
                .ok_or(EvalError::MissingKey(key))
        }
        Value::String(s) => {
            let i = index.to_number()?;
            let c = usize::try_from(i).ok().and_then(|i| s.chars().nth(i));
            Ok(Value::String(c.map(String::from).unwrap_or_default()))
        }
        other => Err(mismatch("list", other)),
    }
}

/// Map a possibly negative index onto `0..len`
pub fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let index = if index < 0 { len + index } else { index };
    (0..len).contains(&index).then_some(index as usize)
}
