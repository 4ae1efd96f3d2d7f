//! Builtin functions.
//!
//! A closed set: each name maps to one [`Builtin`] variant with fixed arity
//! bounds, checked the same way as for user functions.

use std::rc::Rc;

use super::error::{EvalError, ExecError};
use super::function::{self, CallSite, check_arity};
use super::value::{Value, json_to_value};
use super::variables::Variable;
use crate::session::ExecContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Empty,
    Type,
    String,
    Copy,
    DeepCopy,
    Add,
    Get,
    HasKey,
    Keys,
    Values,
    Join,
    Split,
    Abs,
    Function,
    Call,
    Exists,
    Line,
    GetLine,
    JsonEncode,
    JsonDecode,
}

const ALL: &[Builtin] = &[
    Builtin::Len,
    Builtin::Empty,
    Builtin::Type,
    Builtin::String,
    Builtin::Copy,
    Builtin::DeepCopy,
    Builtin::Add,
    Builtin::Get,
    Builtin::HasKey,
    Builtin::Keys,
    Builtin::Values,
    Builtin::Join,
    Builtin::Split,
    Builtin::Abs,
    Builtin::Function,
    Builtin::Call,
    Builtin::Exists,
    Builtin::Line,
    Builtin::GetLine,
    Builtin::JsonEncode,
    Builtin::JsonDecode,
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Len => "len",
            Builtin::Empty => "empty",
            Builtin::Type => "type",
            Builtin::String => "string",
            Builtin::Copy => "copy",
            Builtin::DeepCopy => "deepcopy",
            Builtin::Add => "add",
            Builtin::Get => "get",
            Builtin::HasKey => "has_key",
            Builtin::Keys => "keys",
            Builtin::Values => "values",
            Builtin::Join => "join",
            Builtin::Split => "split",
            Builtin::Abs => "abs",
            Builtin::Function => "function",
            Builtin::Call => "call",
            Builtin::Exists => "exists",
            Builtin::Line => "line",
            Builtin::GetLine => "getline",
            Builtin::JsonEncode => "json_encode",
            Builtin::JsonDecode => "json_decode",
        }
    }

    /// (min, max) argument counts
    pub fn arity(self) -> (usize, usize) {
        match self {
            Builtin::Len
            | Builtin::Empty
            | Builtin::Type
            | Builtin::String
            | Builtin::Copy
            | Builtin::DeepCopy
            | Builtin::Keys
            | Builtin::Values
            | Builtin::Abs
            | Builtin::Function
            | Builtin::Exists
            | Builtin::Line
            | Builtin::GetLine
            | Builtin::JsonEncode
            | Builtin::JsonDecode => (1, 1),
            Builtin::Add | Builtin::HasKey => (2, 2),
            Builtin::Get => (2, 3),
            Builtin::Join | Builtin::Split => (1, 2),
            Builtin::Call => (2, 3),
        }
    }

    pub fn call(
        self,
        ctx: &mut ExecContext<'_>,
        args: Vec<Value>,
        site: CallSite,
    ) -> Result<Value, ExecError> {
        let (min, max) = self.arity();
        check_arity(self.name(), min, Some(max), args.len())?;
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Integer(0));

        let value = match self {
            Builtin::Len => match &args[0] {
                Value::String(s) => count(s.len()),
                Value::Integer(n) => count(n.to_string().len()),
                Value::List(list) => count(list.borrow().len()),
                Value::Dict(dict) => count(dict.borrow().len()),
                other => return Err(mismatch("list", other)),
            },
            Builtin::Empty => Value::bool(match &args[0] {
                Value::Integer(n) => *n == 0,
                Value::Float(f) => *f == 0.0,
                Value::String(s) => s.is_empty(),
                Value::List(list) => list.borrow().is_empty(),
                Value::Dict(dict) => dict.borrow().is_empty(),
                Value::Funcref(_) => false,
            }),
            Builtin::Type => Value::Integer(args[0].type_code()),
            Builtin::String => Value::String(args[0].repr()),
            Builtin::Copy => args[0].shallow_copy(),
            Builtin::DeepCopy => args[0].deep_copy()?,
            Builtin::Add => {
                args[0].as_list()?.borrow_mut().push(arg(1));
                args[0].clone()
            }
            Builtin::Get => {
                let fallback = arg(2);
                match &args[0] {
                    Value::List(list) => {
                        let list = list.borrow();
                        let index = args[1].to_number()?;
                        super::expr::resolve_index(index, list.len())
                            .map(|i| list[i].clone())
                            .unwrap_or(fallback)
                    }
                    Value::Dict(dict) => {
                        let key = args[1].to_text()?;
                        dict.borrow().get(&key).cloned().unwrap_or(fallback)
                    }
                    other => return Err(mismatch("list", other)),
                }
            }
            Builtin::HasKey => {
                let key = args[1].to_text()?;
                Value::bool(args[0].as_dict()?.borrow().contains_key(&key))
            }
            Builtin::Keys => {
                let dict = args[0].as_dict()?.borrow();
                Value::list(dict.keys().map(|key| Value::string(key.as_str())).collect())
            }
            Builtin::Values => {
                let dict = args[0].as_dict()?.borrow();
                Value::list(dict.values().cloned().collect())
            }
            Builtin::Join => {
                let separator = match args.get(1) {
                    Some(separator) => separator.to_text()?,
                    None => " ".to_string(),
                };
                let list = args[0].as_list()?.borrow();
                let parts = list
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.repr(),
                    })
                    .collect::<Vec<_>>();
                Value::String(parts.join(&separator))
            }
            Builtin::Split => {
                let text = args[0].to_text()?;
                let pieces: Vec<Value> = match args.get(1) {
                    Some(separator) => {
                        let separator = separator.to_text()?;
                        if separator.is_empty() {
                            text.chars().map(|c| Value::String(c.to_string())).collect()
                        } else {
                            text.split(separator.as_str())
                                .filter(|piece| !piece.is_empty())
                                .map(Value::string)
                                .collect()
                        }
                    }
                    None => text.split_whitespace().map(Value::string).collect(),
                };
                Value::list(pieces)
            }
            Builtin::Abs => match &args[0] {
                Value::Float(f) => Value::Float(f.abs()),
                other => Value::Integer(other.to_number()?.wrapping_abs()),
            },
            Builtin::Function => {
                let name = args[0].to_text()?;
                if !function::exists(ctx, &name) {
                    return Err(EvalError::UnknownFunction(name).into());
                }
                Value::Funcref(name)
            }
            Builtin::Call => {
                let name = match &args[0] {
                    Value::Funcref(name) | Value::String(name) => name.clone(),
                    other => return Err(mismatch("func", other)),
                };
                let call_args = args[1].as_list()?.borrow().clone();
                let dict = match args.get(2) {
                    Some(dict) => Some(Rc::clone(dict.as_dict()?)),
                    None => site.dict,
                };
                return function::call_function(
                    ctx,
                    &name,
                    call_args,
                    CallSite {
                        range: site.range,
                        dict,
                    },
                );
            }
            Builtin::Exists => Value::bool(exists(ctx, &args[0].to_text()?)),
            Builtin::Line => match line_number(ctx, &args[0])? {
                Some(line) => count(line),
                None => Value::Integer(0),
            },
            Builtin::GetLine => {
                let text = line_number(ctx, &args[0])?
                    .and_then(|line| line.checked_sub(1))
                    .and_then(|line| ctx.editor.line_text(line));
                Value::String(text.unwrap_or_default())
            }
            Builtin::JsonEncode => {
                let encoded = serde_json::to_string(&args[0])
                    .map_err(|e| EvalError::InvalidArgument(e.to_string()))?;
                Value::String(encoded)
            }
            Builtin::JsonDecode => {
                let text = args[0].to_text()?;
                let decoded: serde_json::Value = serde_json::from_str(&text)
                    .map_err(|e| EvalError::InvalidArgument(format!("json_decode: {e}")))?;
                json_to_value(&decoded)
            }
        };
        Ok(value)
    }
}

fn count(n: usize) -> Value {
    Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
}

fn mismatch(expected: &'static str, found: &Value) -> ExecError {
    EvalError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
    .into()
}

/// `&opt`, `*Func` or a variable name
fn exists(ctx: &ExecContext<'_>, what: &str) -> bool {
    if let Some(option) = what.strip_prefix('&') {
        return ctx.session.options().declaration(option).is_ok();
    }
    if let Some(name) = what.strip_prefix('*') {
        return function::exists(ctx, name);
    }
    ctx.lookup(&Variable::parse(what)).is_some()
}

/// `"."` is the cursor line, `"$"` the last line, numbers are taken as-is
fn line_number(ctx: &ExecContext<'_>, spec: &Value) -> Result<Option<usize>, EvalError> {
    let line = match spec {
        Value::String(s) if s == "." => Some(ctx.current_line()),
        Value::String(s) if s == "$" => Some(ctx.editor.line_count()),
        other => usize::try_from(other.to_number()?).ok(),
    };
    Ok(line.filter(|line| (1..=ctx.editor.line_count()).contains(line)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::{EditorId, TextEditor};
    use crate::script::expr::Expr;
    use crate::session::Session;
    use rstest::rstest;

    fn call(name: &str, args: Vec<Expr>) -> Result<Value, ExecError> {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "first\nsecond\nthird\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        Expr::call(name, args).evaluate(&mut ctx)
    }

    fn list(items: &[i64]) -> Expr {
        Expr::List(items.iter().map(|n| Expr::Integer(*n)).collect())
    }

    #[rstest]
    #[case("len", vec![Expr::string("abcd")], "4")]
    #[case("len", vec![list(&[1, 2])], "2")]
    #[case("empty", vec![Expr::string("")], "1")]
    #[case("empty", vec![list(&[0])], "0")]
    #[case("type", vec![Expr::Float(1.0)], "5")]
    #[case("string", vec![list(&[1])], "'[1]'")]
    #[case("join", vec![list(&[1, 2, 3]), Expr::string("-")], "'1-2-3'")]
    #[case("split", vec![Expr::string(" a  b ")], "['a', 'b']")]
    #[case("split", vec![Expr::string("a,b,,c"), Expr::string(",")], "['a', 'b', 'c']")]
    #[case("abs", vec![Expr::Integer(-3)], "3")]
    #[case("get", vec![list(&[1]), Expr::Integer(5), Expr::Integer(9)], "9")]
    #[case("line", vec![Expr::string("$")], "3")]
    #[case("getline", vec![Expr::Integer(2)], "'second'")]
    #[case("getline", vec![Expr::Integer(9)], "''")]
    #[case("json_encode", vec![list(&[1, 2])], "'[1,2]'")]
    #[case("exists", vec![Expr::string("&isk")], "1")]
    #[case("exists", vec![Expr::string("*len")], "1")]
    #[case("exists", vec![Expr::string("g:nothing")], "0")]
    fn builtin_results(#[case] name: &str, #[case] args: Vec<Expr>, #[case] expected: &str) {
        assert_eq!(call(name, args).unwrap().repr(), expected);
    }

    #[test]
    fn add_mutates_the_shared_list() {
        let mut session = Session::new();
        let mut editor = TextEditor::from_text(EditorId(0), "x\n");
        let mut ctx = ExecContext::new(&mut session, &mut editor);
        let items = Value::list(vec![]);
        ctx.store(&Variable::parse("g:items"), items.clone()).unwrap();
        Expr::call("add", vec![Expr::var("g:items"), Expr::Integer(1)])
            .evaluate(&mut ctx)
            .unwrap();
        assert_eq!(items.repr(), "[1]");
    }

    #[test]
    fn copy_and_deepcopy_differ() {
        let inner = Value::list(vec![Value::Integer(1)]);
        let outer = Value::list(vec![inner.clone()]);
        let shallow = outer.shallow_copy();
        let deep = outer.deep_copy().unwrap();
        inner.as_list().unwrap().borrow_mut().push(Value::Integer(2));
        assert_eq!(shallow.repr(), "[[1, 2]]");
        assert_eq!(deep.repr(), "[[1]]");
    }

    #[test]
    fn json_decode_builds_values() {
        let value = call("json_decode", vec![Expr::string(r#"{"a": [1, 2.5, "x"], "b": true}"#)]).unwrap();
        assert_eq!(value.repr(), "{'a': [1, 2.5, 'x'], 'b': 1}");
    }

    #[test]
    fn funcref_cannot_be_encoded() {
        let err = call("json_encode", vec![Expr::FunctionRef("len".to_string())]).unwrap_err();
        assert!(matches!(err, ExecError::Eval(EvalError::InvalidArgument(_))));
    }

    #[test]
    fn builtin_arity_is_checked() {
        let err = call("len", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "E119: Not enough arguments for function: len");
        let err = call("abs", vec![Expr::Integer(1), Expr::Integer(2)]).unwrap_err();
        assert_eq!(err.to_string(), "E118: Too many arguments for function: abs");
    }

    #[test]
    fn call_forwards_arguments() {
        let value = call(
            "call",
            vec![Expr::FunctionRef("abs".to_string()), Expr::List(vec![Expr::Integer(-4)])],
        )
        .unwrap();
        assert_eq!(value, Value::Integer(4));
    }
}
