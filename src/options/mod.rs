//! Typed, validated, scoped editor options.
//!
//! GLOBAL options hold one process-wide value. LOCAL options hold one value
//! per editor plus a global value that new editors are initialised from.
//! Every committed change is announced to the option's listeners, in
//! registration order, on the calling thread.

mod declaration;
mod defaults;
pub mod keyword;
mod service;

use std::fmt;

use thiserror::Error;

use crate::editor::EditorId;
use crate::script::Value;

pub use declaration::{OptionDeclaration, Validator};
pub use defaults::builtin_options;
pub use keyword::{KeywordClassifier, SharedClassifier};
pub use service::{Listener, OptionChange, OptionService};

/// Where an option value is read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionScope {
    Global,
    Local(EditorId),
}

/// Declared scope of an option
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Global,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Boolean,
    Number,
    String,
    StringList,
}

impl OptionType {
    pub fn name(self) -> &'static str {
        match self {
            OptionType::Boolean => "boolean",
            OptionType::Number => "number",
            OptionType::String => "string",
            OptionType::StringList => "string list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Boolean(bool),
    Number(i64),
    String(String),
    StringList(Vec<String>),
}

impl OptionValue {
    pub fn option_type(&self) -> OptionType {
        match self {
            OptionValue::Boolean(_) => OptionType::Boolean,
            OptionValue::Number(_) => OptionType::Number,
            OptionValue::String(_) => OptionType::String,
            OptionValue::StringList(_) => OptionType::StringList,
        }
    }

    /// Script view: booleans are 0/1, lists are comma-joined strings
    pub fn to_value(&self) -> Value {
        match self {
            OptionValue::Boolean(b) => Value::bool(*b),
            OptionValue::Number(n) => Value::Integer(*n),
            OptionValue::String(_) | OptionValue::StringList(_) => Value::String(self.to_string()),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Boolean(b) => write!(f, "{}", i64::from(*b)),
            OptionValue::Number(n) => write!(f, "{n}"),
            OptionValue::String(s) => f.write_str(s),
            OptionValue::StringList(items) => f.write_str(&items.join(",")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("E518: Unknown option: {0}")]
    Unknown(String),
    #[error("option already declared: {0}")]
    AlreadyDeclared(String),
    #[error("E474: Invalid argument: {name}={value}")]
    Invalid { name: String, value: String },
    #[error("E521: Number required after =: {name}={value}")]
    NumberRequired { name: String, value: String },
    #[error("E474: {name} is a {actual} option, not a {expected} option")]
    WrongType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("E474: Invalid argument: {name}={value} ({reason})")]
    Rejected {
        name: String,
        value: String,
        reason: String,
    },
}
