use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::editor::EditorId;
use crate::script::Value;

use super::{
    OptionDeclaration, OptionError, OptionKind, OptionScope, OptionType, OptionValue,
    builtin_options,
};

/// A committed change, as seen by listeners
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChange {
    pub name: String,
    pub scope: OptionScope,
    pub old: OptionValue,
    pub new: OptionValue,
}

/// Called after every committed change; an error is propagated to the setter
/// and the remaining listeners are skipped
pub type Listener = Arc<dyn Fn(&OptionChange) -> Result<(), OptionError> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Edit {
    Append,
    Prepend,
    Remove,
}

/// Registry of declared options and their current values
pub struct OptionService {
    declarations: Vec<OptionDeclaration>,
    /// Full names and abbreviations to declaration index
    index: HashMap<String, usize>,
    global: Vec<OptionValue>,
    local: HashMap<EditorId, HashMap<usize, OptionValue>>,
    listeners: HashMap<usize, Vec<Listener>>,
}

impl Default for OptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionService")
            .field("options", &self.declarations.len())
            .field("editors", &self.local.len())
            .finish()
    }
}

impl OptionService {
    /// Service preloaded with the builtin options
    pub fn new() -> Self {
        let mut service = Self::empty();
        for decl in builtin_options() {
            // Builtin names are unique
            let _ = service.declare(decl);
        }
        service
    }

    pub fn empty() -> Self {
        Self {
            declarations: Vec::new(),
            index: HashMap::new(),
            global: Vec::new(),
            local: HashMap::new(),
            listeners: HashMap::new(),
        }
    }

    pub fn declare(&mut self, decl: OptionDeclaration) -> Result<(), OptionError> {
        let names = std::iter::once(decl.name.clone()).chain(decl.abbreviation.clone());
        for name in names.clone() {
            if self.index.contains_key(&name) {
                return Err(OptionError::AlreadyDeclared(name));
            }
        }

        let idx = self.declarations.len();
        for name in names {
            self.index.insert(name, idx);
        }
        self.global.push(decl.default.clone());
        if decl.kind == OptionKind::Local {
            for values in self.local.values_mut() {
                values.insert(idx, decl.default.clone());
            }
        }
        self.declarations.push(decl);
        Ok(())
    }

    pub fn declarations(&self) -> impl Iterator<Item = &OptionDeclaration> {
        self.declarations.iter()
    }

    /// Look up by full name or abbreviation
    pub fn declaration(&self, name: &str) -> Result<&OptionDeclaration, OptionError> {
        self.resolve(name).map(|idx| &self.declarations[idx])
    }

    fn resolve(&self, name: &str) -> Result<usize, OptionError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| OptionError::Unknown(name.to_string()))
    }

    /// Give a new editor its own copy of every LOCAL option, taken from the
    /// current global values
    pub fn register_editor(&mut self, editor: EditorId) {
        let values = self
            .declarations
            .iter()
            .enumerate()
            .filter(|(_, decl)| decl.kind == OptionKind::Local)
            .map(|(idx, _)| (idx, self.global[idx].clone()))
            .collect();
        self.local.entry(editor).or_insert(values);
        tracing::debug!(%editor, "editor registered with option service");
    }

    pub fn forget_editor(&mut self, editor: EditorId) {
        self.local.remove(&editor);
    }

    /// Where a write at `scope` actually lands
    fn effective_scope(&self, idx: usize, scope: OptionScope) -> OptionScope {
        match (self.declarations[idx].kind, scope) {
            (OptionKind::Local, OptionScope::Local(editor)) => OptionScope::Local(editor),
            _ => OptionScope::Global,
        }
    }

    fn current(&self, idx: usize, scope: OptionScope) -> &OptionValue {
        match self.effective_scope(idx, scope) {
            OptionScope::Local(editor) => self
                .local
                .get(&editor)
                .and_then(|values| values.get(&idx))
                .unwrap_or(&self.global[idx]),
            OptionScope::Global => &self.global[idx],
        }
    }

    pub fn get(&self, scope: OptionScope, name: &str) -> Result<OptionValue, OptionError> {
        let idx = self.resolve(name)?;
        Ok(self.current(idx, scope).clone())
    }

    /// Script view of an option value
    pub fn get_option_value(&self, scope: OptionScope, name: &str) -> Result<Value, OptionError> {
        self.get(scope, name).map(|value| value.to_value())
    }

    /// Convert a script value and commit it
    pub fn set_option_value(
        &mut self,
        scope: OptionScope,
        name: &str,
        value: &Value,
    ) -> Result<(), OptionError> {
        let idx = self.resolve(name)?;
        let converted = self.coerce(idx, value)?;
        self.commit(idx, scope, converted)
    }

    /// Commit an already typed value
    pub fn set_value(
        &mut self,
        scope: OptionScope,
        name: &str,
        value: OptionValue,
    ) -> Result<(), OptionError> {
        let idx = self.resolve(name)?;
        let decl = &self.declarations[idx];
        if value.option_type() != decl.option_type() {
            return Err(OptionError::WrongType {
                name: decl.name.clone(),
                expected: decl.option_type().name(),
                actual: value.option_type().name(),
            });
        }
        self.commit(idx, scope, value)
    }

    /// Set a value from its textual form, as typed after `=` in `:set`
    pub fn set_from_text(
        &mut self,
        scope: OptionScope,
        name: &str,
        text: &str,
    ) -> Result<(), OptionError> {
        let idx = self.resolve(name)?;
        let value = self.parse_text(idx, text)?;
        self.commit(idx, scope, value)
    }

    fn parse_text(&self, idx: usize, text: &str) -> Result<OptionValue, OptionError> {
        let decl = &self.declarations[idx];
        match decl.option_type() {
            OptionType::Boolean => Err(OptionError::Invalid {
                name: decl.name.clone(),
                value: text.to_string(),
            }),
            OptionType::Number => parse_number(text)
                .map(OptionValue::Number)
                .ok_or_else(|| OptionError::NumberRequired {
                    name: decl.name.clone(),
                    value: text.to_string(),
                }),
            OptionType::String => Ok(OptionValue::String(text.to_string())),
            OptionType::StringList => decl
                .tokenize(text)
                .map(OptionValue::StringList)
                .ok_or_else(|| OptionError::Invalid {
                    name: decl.name.clone(),
                    value: text.to_string(),
                }),
        }
    }

    fn coerce(&self, idx: usize, value: &Value) -> Result<OptionValue, OptionError> {
        let decl = &self.declarations[idx];
        let invalid = || OptionError::Invalid {
            name: decl.name.clone(),
            value: value.repr(),
        };
        match (decl.option_type(), value) {
            (OptionType::Boolean, Value::Integer(n)) => Ok(OptionValue::Boolean(*n != 0)),
            (OptionType::Number, Value::Integer(n)) => Ok(OptionValue::Number(*n)),
            (OptionType::Number, Value::String(s)) => parse_number(s)
                .map(OptionValue::Number)
                .ok_or_else(|| OptionError::NumberRequired {
                    name: decl.name.clone(),
                    value: s.clone(),
                }),
            (OptionType::String, Value::String(s)) => Ok(OptionValue::String(s.clone())),
            (OptionType::String, Value::Integer(n)) => Ok(OptionValue::String(n.to_string())),
            (OptionType::StringList, Value::String(s)) => self.parse_text(idx, s),
            (OptionType::StringList, Value::List(items)) => items
                .borrow()
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    Value::Integer(n) => Ok(n.to_string()),
                    _ => Err(invalid()),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(OptionValue::StringList),
            _ => Err(invalid()),
        }
    }

    /// Validate, store and notify. Nothing is stored if validation fails.
    fn commit(
        &mut self,
        idx: usize,
        scope: OptionScope,
        new: OptionValue,
    ) -> Result<(), OptionError> {
        let decl = &self.declarations[idx];
        decl.run_validator(&new)
            .map_err(|reason| OptionError::Rejected {
                name: decl.name.clone(),
                value: new.to_string(),
                reason,
            })?;

        let scope = self.effective_scope(idx, scope);
        let old = self.store(idx, scope, new.clone());
        let change = OptionChange {
            name: self.declarations[idx].name.clone(),
            scope,
            old,
            new,
        };
        tracing::debug!(option = %change.name, scope = ?change.scope, value = %change.new, "option set");
        self.notify(idx, &change)
    }

    fn store(&mut self, idx: usize, scope: OptionScope, value: OptionValue) -> OptionValue {
        match scope {
            OptionScope::Global => std::mem::replace(&mut self.global[idx], value),
            OptionScope::Local(editor) => {
                if !self.local.contains_key(&editor) {
                    self.register_editor(editor);
                }
                let global = &self.global[idx];
                let values = self.local.entry(editor).or_default();
                let old = values.get(&idx).unwrap_or(global).clone();
                values.insert(idx, value);
                old
            }
        }
    }

    fn notify(&self, idx: usize, change: &OptionChange) -> Result<(), OptionError> {
        let Some(listeners) = self.listeners.get(&idx) else {
            return Ok(());
        };
        for listener in listeners {
            listener(change)?;
        }
        Ok(())
    }

    pub fn add_listener(&mut self, name: &str, listener: Listener) -> Result<(), OptionError> {
        let idx = self.resolve(name)?;
        self.listeners.entry(idx).or_default().push(listener);
        Ok(())
    }

    pub fn is_set(&self, scope: OptionScope, name: &str) -> Result<bool, OptionError> {
        match self.get(scope, name)? {
            OptionValue::Boolean(b) => Ok(b),
            OptionValue::Number(n) => Ok(n != 0),
            other => Err(self.wrong_type(name, OptionType::Boolean, &other)),
        }
    }

    pub fn set_option(&mut self, scope: OptionScope, name: &str) -> Result<(), OptionError> {
        self.set_boolean(scope, name, |_| true)
    }

    pub fn unset_option(&mut self, scope: OptionScope, name: &str) -> Result<(), OptionError> {
        self.set_boolean(scope, name, |_| false)
    }

    pub fn toggle_option(&mut self, scope: OptionScope, name: &str) -> Result<(), OptionError> {
        self.set_boolean(scope, name, |current| !current)
    }

    fn set_boolean(
        &mut self,
        scope: OptionScope,
        name: &str,
        next: impl FnOnce(bool) -> bool,
    ) -> Result<(), OptionError> {
        let idx = self.resolve(name)?;
        match self.current(idx, scope) {
            OptionValue::Boolean(current) => {
                let value = OptionValue::Boolean(next(*current));
                self.commit(idx, scope, value)
            }
            other => Err(self.wrong_type(name, OptionType::Boolean, other)),
        }
    }

    fn wrong_type(&self, name: &str, expected: OptionType, actual: &OptionValue) -> OptionError {
        OptionError::WrongType {
            name: name.to_string(),
            expected: expected.name(),
            actual: actual.option_type().name(),
        }
    }

    /// `+=`: add to a number, concatenate to a string, add missing list tokens
    pub fn append_value(
        &mut self,
        scope: OptionScope,
        name: &str,
        operand: &str,
    ) -> Result<(), OptionError> {
        self.edit(scope, name, operand, Edit::Append)
    }

    /// `^=`: multiply a number, prepend to a string, put missing tokens first
    pub fn prepend_value(
        &mut self,
        scope: OptionScope,
        name: &str,
        operand: &str,
    ) -> Result<(), OptionError> {
        self.edit(scope, name, operand, Edit::Prepend)
    }

    /// `-=`: subtract from a number, remove a substring or list tokens
    pub fn remove_value(
        &mut self,
        scope: OptionScope,
        name: &str,
        operand: &str,
    ) -> Result<(), OptionError> {
        self.edit(scope, name, operand, Edit::Remove)
    }

    fn edit(
        &mut self,
        scope: OptionScope,
        name: &str,
        operand: &str,
        edit: Edit,
    ) -> Result<(), OptionError> {
        let idx = self.resolve(name)?;
        let current = self.current(idx, scope).clone();
        let decl = &self.declarations[idx];

        let updated = match current.clone() {
            OptionValue::Boolean(_) => {
                return Err(OptionError::Invalid {
                    name: decl.name.clone(),
                    value: operand.to_string(),
                });
            }
            OptionValue::Number(n) => {
                let m = parse_number(operand).ok_or_else(|| OptionError::NumberRequired {
                    name: decl.name.clone(),
                    value: operand.to_string(),
                })?;
                let result = match edit {
                    Edit::Append => n.checked_add(m),
                    Edit::Prepend => n.checked_mul(m),
                    Edit::Remove => n.checked_sub(m),
                };
                OptionValue::Number(result.ok_or_else(|| OptionError::Invalid {
                    name: decl.name.clone(),
                    value: operand.to_string(),
                })?)
            }
            OptionValue::String(s) => OptionValue::String(match edit {
                Edit::Append => s + operand,
                Edit::Prepend => format!("{operand}{s}"),
                Edit::Remove => s.replacen(operand, "", 1),
            }),
            OptionValue::StringList(mut items) => {
                let tokens = decl.tokenize(operand).ok_or_else(|| OptionError::Invalid {
                    name: decl.name.clone(),
                    value: operand.to_string(),
                })?;
                match edit {
                    Edit::Append => {
                        for token in tokens {
                            if !items.contains(&token) {
                                items.push(token);
                            }
                        }
                    }
                    Edit::Prepend => {
                        let fresh: Vec<String> = tokens
                            .into_iter()
                            .filter(|token| !items.contains(token))
                            .collect();
                        items.splice(0..0, fresh);
                    }
                    Edit::Remove => items.retain(|item| !tokens.contains(item)),
                }
                OptionValue::StringList(items)
            }
        };

        if updated == current {
            tracing::trace!(option = %decl.name, ?edit, "option edit changed nothing");
            return Ok(());
        }
        self.commit(idx, scope, updated)
    }

    /// Restore the declared default; listeners fire as for an explicit set
    pub fn reset_default(&mut self, scope: OptionScope, name: &str) -> Result<(), OptionError> {
        let idx = self.resolve(name)?;
        let default = self.declarations[idx].default.clone();
        self.commit(idx, scope, default)
    }

    pub fn is_default(&self, scope: OptionScope, name: &str) -> Result<bool, OptionError> {
        let idx = self.resolve(name)?;
        Ok(*self.current(idx, scope) == self.declarations[idx].default)
    }
}

/// Decimal, `0x` hex and leading-zero octal, with an optional minus sign
fn parse_number(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}
