//! Script values.
//!
//! Lists and Dictionaries are shared handles: binding the same list to two
//! variables makes both observe in-place mutation. `copy()` and
//! [`Value::deep_copy`] produce independent containers.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use super::error::EvalError;

pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type DictRef = Rc<RefCell<BTreeMap<String, Value>>>;

/// Nesting depth after which display and copy give up
const MAX_NESTING: usize = 100;

#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    List(ListRef),
    Dict(DictRef),
    /// Reference to a function by name
    Funcref(String),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: BTreeMap<String, Value>) -> Self {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn bool(b: bool) -> Self {
        Value::Integer(i64::from(b))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "number",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Funcref(_) => "func",
        }
    }

    /// Numeric code used by `type()`
    pub fn type_code(&self) -> i64 {
        match self {
            Value::Integer(_) => 0,
            Value::String(_) => 1,
            Value::Funcref(_) => 2,
            Value::List(_) => 3,
            Value::Dict(_) => 4,
            Value::Float(_) => 5,
        }
    }

    fn mismatch(&self, expected: &'static str) -> EvalError {
        EvalError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    /// Number conversion: Strings parse their leading decimal digits, Floats are refused
    pub fn to_number(&self) -> Result<i64, EvalError> {
        match self {
            Value::Integer(n) => Ok(*n),
            Value::String(s) => Ok(parse_leading_number(s)),
            other => Err(other.mismatch("number")),
        }
    }

    pub fn is_truthy(&self) -> Result<bool, EvalError> {
        match self {
            Value::Float(f) => Ok(*f != 0.0),
            other => other.to_number().map(|n| n != 0),
        }
    }

    /// String conversion used by `..` and by commands taking text
    pub fn to_text(&self) -> Result<String, EvalError> {
        match self {
            Value::Integer(n) => Ok(n.to_string()),
            Value::String(s) => Ok(s.clone()),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_list(&self) -> Result<&ListRef, EvalError> {
        match self {
            Value::List(list) => Ok(list),
            other => Err(other.mismatch("list")),
        }
    }

    pub fn as_dict(&self) -> Result<&DictRef, EvalError> {
        match self {
            Value::Dict(dict) => Ok(dict),
            other => Err(other.mismatch("dict")),
        }
    }

    /// One-level copy: new container, shared elements
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::List(list) => Value::list(list.borrow().clone()),
            Value::Dict(dict) => Value::dict(dict.borrow().clone()),
            other => other.clone(),
        }
    }

    /// Recursive copy; nothing in the result aliases the original
    pub fn deep_copy(&self) -> Result<Value, EvalError> {
        self.deep_copy_at(0)
    }

    fn deep_copy_at(&self, depth: usize) -> Result<Value, EvalError> {
        if depth > MAX_NESTING {
            return Err(EvalError::NestedTooDeep);
        }
        match self {
            Value::List(list) => {
                let items = list
                    .borrow()
                    .iter()
                    .map(|item| item.deep_copy_at(depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::list(items))
            }
            Value::Dict(dict) => {
                let mut entries = BTreeMap::new();
                for (key, item) in dict.borrow().iter() {
                    entries.insert(key.clone(), item.deep_copy_at(depth + 1)?);
                }
                Ok(Value::dict(entries))
            }
            other => Ok(other.clone()),
        }
    }

    /// Same container (for `is`), or equal scalars of the same type
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(a, b),
            (a, b) => a.type_code() == b.type_code() && a == b,
        }
    }

    /// Structural equality. The same container always equals itself, so a
    /// list holding itself compares equal to a copy of it.
    pub fn equals(&self, other: &Value) -> Result<bool, EvalError> {
        self.equals_at(other, 0)
    }

    fn equals_at(&self, other: &Value, depth: usize) -> Result<bool, EvalError> {
        if depth > MAX_NESTING {
            return Err(EvalError::NestedTooDeep);
        }
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.equals_at(y, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (a, b) = (a.borrow(), b.borrow());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for ((ka, x), (kb, y)) in a.iter().zip(b.iter()) {
                    if ka != kb || !x.equals_at(y, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Integer(a), Value::Integer(b)) => Ok(a == b),
            (Value::Float(a), Value::Float(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) | (Value::Funcref(a), Value::Funcref(b)) => {
                Ok(a == b)
            }
            _ => Ok(false),
        }
    }

    /// The form produced by `string()`: Strings are quoted
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, 0);
        out
    }

    fn write_repr(&self, out: &mut String, depth: usize) {
        match self {
            Value::String(s) => {
                out.push('\'');
                out.push_str(&s.replace('\'', "''"));
                out.push('\'');
            }
            Value::Funcref(name) => {
                out.push_str("function('");
                out.push_str(name);
                out.push_str("')");
            }
            Value::List(list) => {
                if depth >= MAX_NESTING {
                    out.push_str("[...]");
                    return;
                }
                out.push('[');
                for (i, item) in list.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_repr(out, depth + 1);
                }
                out.push(']');
            }
            Value::Dict(dict) => {
                if depth >= MAX_NESTING {
                    out.push_str("{...}");
                    return;
                }
                out.push('{');
                for (i, (key, item)) in dict.borrow().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push('\'');
                    out.push_str(key);
                    out.push_str("': ");
                    item.write_repr(out, depth + 1);
                }
                out.push('}');
            }
            Value::Integer(n) => out.push_str(&n.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
        }
    }
}

/// `:echo` form: top-level Strings and Funcrefs print bare
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Funcref(name) => f.write_str(name),
            other => f.write_str(&other.repr()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

/// Structural equality; containers nested past the limit compare unequal,
/// use [`Value::equals`] to see that as an error
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.equals(other).unwrap_or(false)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Nested {
            value: self,
            depth: 0,
        }
        .serialize(serializer)
    }
}

/// A value being serialized at `depth` levels below the top
struct Nested<'a> {
    value: &'a Value,
    depth: usize,
}

impl Nested<'_> {
    fn child<'v>(&self, value: &'v Value) -> Nested<'v> {
        Nested {
            value,
            depth: self.depth + 1,
        }
    }
}

impl Serialize for Nested<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.depth > MAX_NESTING {
            return Err(S::Error::custom(EvalError::NestedTooDeep));
        }
        match self.value {
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(list) => {
                let list = list.borrow();
                let mut seq = serializer.serialize_seq(Some(list.len()))?;
                for item in list.iter() {
                    seq.serialize_element(&self.child(item))?;
                }
                seq.end()
            }
            Value::Dict(dict) => {
                let dict = dict.borrow();
                let mut map = serializer.serialize_map(Some(dict.len()))?;
                for (key, item) in dict.iter() {
                    map.serialize_entry(key, &self.child(item))?;
                }
                map.end()
            }
            Value::Funcref(name) => Err(S::Error::custom(format!("cannot encode Funcref {name}"))),
        }
    }
}

/// Convert decoded JSON into a script value.
///
/// `true`/`false` become 1/0 and `null` becomes 0.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Integer(0),
        serde_json::Value::Bool(b) => Value::bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::list(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(entries) => Value::dict(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        ),
    }
}

pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{sign}inf")
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// `"12abc"` → 12, `"-3"` → -3, `"abc"` → 0
fn parse_leading_number(s: &str) -> i64 {
    let trimmed = s.trim_start();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let mut n: i64 = 0;
    for c in digits.chars() {
        match c.to_digit(10) {
            Some(d) => n = n.saturating_mul(10).saturating_add(i64::from(d)),
            None => break,
        }
    }
    if negative { -n } else { n }
}
