//! Scoped variable storage with a call-frame stack.
//!
//! Each in-flight function invocation owns one [`CallFrame`]; frames are
//! pushed on call and popped on every return path, so recursive calls never
//! share `a:`/`l:` bindings.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::error::EvalError;
use super::value::Value;
use crate::editor::EditorId;

/// Frame locals; shared with closures defined inside the frame
pub type Locals = Rc<RefCell<HashMap<String, Value>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// `g:`
    Global,
    /// `s:`
    Script,
    /// `a:` - function arguments, read-only to scripts
    Function,
    /// `l:` - function locals
    Local,
    /// `b:`
    Buffer,
    /// `w:`
    Window,
    /// `t:`
    Tab,
    /// `v:`
    Builtin,
}

impl Scope {
    pub fn from_prefix(prefix: char) -> Option<Self> {
        Some(match prefix {
            'g' => Scope::Global,
            's' => Scope::Script,
            'a' => Scope::Function,
            'l' => Scope::Local,
            'b' => Scope::Buffer,
            'w' => Scope::Window,
            't' => Scope::Tab,
            'v' => Scope::Builtin,
            _ => return None,
        })
    }

    pub fn prefix(self) -> &'static str {
        match self {
            Scope::Global => "g:",
            Scope::Script => "s:",
            Scope::Function => "a:",
            Scope::Local => "l:",
            Scope::Buffer => "b:",
            Scope::Window => "w:",
            Scope::Tab => "t:",
            Scope::Builtin => "v:",
        }
    }
}

/// A variable reference; `scope: None` resolves by search order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    pub scope: Option<Scope>,
    pub name: String,
}

impl Variable {
    pub fn new(scope: Option<Scope>, name: impl Into<String>) -> Self {
        Self {
            scope,
            name: name.into(),
        }
    }

    pub fn unscoped(name: impl Into<String>) -> Self {
        Self::new(None, name)
    }

    pub fn scoped(scope: Scope, name: impl Into<String>) -> Self {
        Self::new(Some(scope), name)
    }

    /// Parse `g:foo`, `a:000`, `count`, ...
    pub fn parse(text: &str) -> Self {
        let mut chars = text.chars();
        if let (Some(prefix), Some(':')) = (chars.next(), chars.next()) {
            if let Some(scope) = Scope::from_prefix(prefix) {
                return Self::scoped(scope, &text[2..]);
            }
        }
        Self::unscoped(text)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scope) = self.scope {
            f.write_str(scope.prefix())?;
        }
        f.write_str(&self.name)
    }
}

/// Bindings owned by one function invocation
#[derive(Debug)]
pub struct CallFrame {
    function: String,
    arguments: HashMap<String, Value>,
    locals: Locals,
    captured: Option<Locals>,
}

impl CallFrame {
    pub fn new(function: impl Into<String>, captured: Option<Locals>) -> Self {
        Self {
            function: function.into(),
            arguments: HashMap::new(),
            locals: Rc::new(RefCell::new(HashMap::new())),
            captured,
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn locals(&self) -> &Locals {
        &self.locals
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.locals.borrow().get(name) {
            return Some(value.clone());
        }
        if let Some(value) = self.arguments.get(name) {
            return Some(value.clone());
        }
        self.captured
            .as_ref()
            .and_then(|captured| captured.borrow().get(name).cloned())
    }

    fn store(&mut self, name: &str, value: Value) {
        // Assigning to a name the closure captured updates the outer frame
        if let Some(captured) = &self.captured {
            if !self.locals.borrow().contains_key(name) && captured.borrow().contains_key(name) {
                captured.borrow_mut().insert(name.to_string(), value);
                return;
            }
        }
        self.locals.borrow_mut().insert(name.to_string(), value);
    }
}

#[derive(Debug, Default)]
struct EditorVariables {
    buffer: HashMap<String, Value>,
    window: HashMap<String, Value>,
    tab: HashMap<String, Value>,
}

impl EditorVariables {
    fn map(&self, scope: Scope) -> Option<&HashMap<String, Value>> {
        match scope {
            Scope::Buffer => Some(&self.buffer),
            Scope::Window => Some(&self.window),
            Scope::Tab => Some(&self.tab),
            _ => None,
        }
    }

    fn map_mut(&mut self, scope: Scope) -> Option<&mut HashMap<String, Value>> {
        match scope {
            Scope::Buffer => Some(&mut self.buffer),
            Scope::Window => Some(&mut self.window),
            Scope::Tab => Some(&mut self.tab),
            _ => None,
        }
    }
}

/// `v:` variables scripts may assign
const WRITABLE_BUILTINS: &[&str] = &["errmsg"];

#[derive(Debug)]
pub struct VariableStore {
    globals: HashMap<String, Value>,
    script: HashMap<String, Value>,
    builtins: HashMap<String, Value>,
    editors: HashMap<EditorId, EditorVariables>,
    frames: Vec<CallFrame>,
}

impl VariableStore {
    pub fn new() -> Self {
        let mut builtins = HashMap::new();
        builtins.insert("version".to_string(), Value::Integer(900));
        builtins.insert("true".to_string(), Value::Integer(1));
        builtins.insert("false".to_string(), Value::Integer(0));
        builtins.insert("count".to_string(), Value::Integer(0));
        builtins.insert("errmsg".to_string(), Value::string(""));

        Self {
            globals: HashMap::new(),
            script: HashMap::new(),
            builtins,
            editors: HashMap::new(),
            frames: Vec::new(),
        }
    }

    pub fn push_frame(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    /// Bind an `a:` variable in the active frame; bypasses the read-only rule
    pub fn bind_argument(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.arguments.insert(name.into(), value);
        }
    }

    /// Engine-side write of a `v:` variable
    pub fn set_builtin(&mut self, name: impl Into<String>, value: Value) {
        self.builtins.insert(name.into(), value);
    }

    /// Create or overwrite a binding.
    ///
    /// Unscoped writes go to the active frame's locals inside a call and to
    /// `g:` otherwise.
    pub fn store_variable(
        &mut self,
        variable: &Variable,
        value: Value,
        editor: EditorId,
    ) -> Result<(), EvalError> {
        match variable.scope {
            None => match self.frames.last_mut() {
                Some(frame) => frame.store(&variable.name, value),
                None => {
                    self.globals.insert(variable.name.clone(), value);
                }
            },
            Some(Scope::Global) => {
                self.globals.insert(variable.name.clone(), value);
            }
            Some(Scope::Script) => {
                self.script.insert(variable.name.clone(), value);
            }
            Some(Scope::Function) => {
                return Err(EvalError::ReadOnlyVariable(variable.to_string()));
            }
            Some(Scope::Local) => match self.frames.last_mut() {
                Some(frame) => {
                    frame
                        .locals
                        .borrow_mut()
                        .insert(variable.name.clone(), value);
                }
                None => return Err(EvalError::IllegalVariableName(variable.to_string())),
            },
            Some(scope @ (Scope::Buffer | Scope::Window | Scope::Tab)) => {
                if let Some(map) = self.editors.entry(editor).or_default().map_mut(scope) {
                    map.insert(variable.name.clone(), value);
                }
            }
            Some(Scope::Builtin) => {
                if !WRITABLE_BUILTINS.contains(&variable.name.as_str()) {
                    return Err(EvalError::ReadOnlyVariable(variable.to_string()));
                }
                self.builtins.insert(variable.name.clone(), value);
            }
        }
        Ok(())
    }

    pub fn get_variable_value(&self, variable: &Variable, editor: EditorId) -> Option<Value> {
        match variable.scope {
            None => {
                if let Some(frame) = self.frames.last() {
                    if let Some(value) = frame.lookup(&variable.name) {
                        return Some(value);
                    }
                }
                self.globals
                    .get(&variable.name)
                    .or_else(|| self.builtins.get(&variable.name))
                    .cloned()
            }
            Some(Scope::Global) => self.globals.get(&variable.name).cloned(),
            Some(Scope::Script) => self.script.get(&variable.name).cloned(),
            Some(Scope::Function) => self
                .frames
                .last()
                .and_then(|frame| frame.arguments.get(&variable.name).cloned()),
            Some(Scope::Local) => self
                .frames
                .last()
                .and_then(|frame| frame.locals.borrow().get(&variable.name).cloned()),
            Some(scope @ (Scope::Buffer | Scope::Window | Scope::Tab)) => self
                .editors
                .get(&editor)
                .and_then(|vars| vars.map(scope))
                .and_then(|map| map.get(&variable.name).cloned()),
            Some(Scope::Builtin) => self.builtins.get(&variable.name).cloned(),
        }
    }

    pub fn get_nonnull_variable_value(
        &self,
        variable: &Variable,
        editor: EditorId,
    ) -> Result<Value, EvalError> {
        self.get_variable_value(variable, editor)
            .ok_or_else(|| EvalError::UndefinedVariable(variable.to_string()))
    }

    /// Remove a binding; returns whether it existed
    pub fn remove_variable(
        &mut self,
        variable: &Variable,
        editor: EditorId,
    ) -> Result<bool, EvalError> {
        let removed = match variable.scope {
            None => match self.frames.last_mut() {
                Some(frame) => frame.locals.borrow_mut().remove(&variable.name).is_some(),
                None => self.globals.remove(&variable.name).is_some(),
            },
            Some(Scope::Global) => self.globals.remove(&variable.name).is_some(),
            Some(Scope::Script) => self.script.remove(&variable.name).is_some(),
            Some(Scope::Local) => self
                .frames
                .last_mut()
                .is_some_and(|frame| frame.locals.borrow_mut().remove(&variable.name).is_some()),
            Some(scope @ (Scope::Buffer | Scope::Window | Scope::Tab)) => self
                .editors
                .get_mut(&editor)
                .and_then(|vars| vars.map_mut(scope))
                .is_some_and(|map| map.remove(&variable.name).is_some()),
            Some(Scope::Function | Scope::Builtin) => {
                return Err(EvalError::ReadOnlyVariable(variable.to_string()));
            }
        };
        Ok(removed)
    }

    /// Drop everything owned by a closed editor
    pub fn forget_editor(&mut self, editor: EditorId) {
        self.editors.remove(&editor);
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}
