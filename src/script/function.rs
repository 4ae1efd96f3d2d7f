//! User-defined functions: declarations, the registry, and invocation.
//!
//! Each call gets a fresh [`CallFrame`] that is popped on every exit path,
//! so recursive invocations never share `a:` or `l:` bindings.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use super::builtins::Builtin;
use super::error::{ArityError, Diagnostics, EvalError, ExecError};
use super::expr::Expr;
use super::statement::{ExecutionPolicy, Statement, run_body};
use super::value::{DictRef, Value};
use super::variables::{CallFrame, Locals, Scope, Variable};
use crate::commands::LineRange;
use crate::session::ExecContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionFlag {
    /// Run the body once per line of the call range
    Range,
    /// Stop the body at the first error
    Abort,
    /// Must be called through a Dictionary, which is bound to `self`
    Dict,
    /// Capture the defining function's locals
    Closure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FunctionScope {
    Global,
    Script,
}

impl FunctionScope {
    fn prefix(self) -> &'static str {
        match self {
            FunctionScope::Global => "",
            FunctionScope::Script => "s:",
        }
    }
}

/// Split `s:Name` / `g:Name` / `Name`
fn split_name(name: &str) -> (Option<FunctionScope>, &str) {
    if let Some(rest) = name.strip_prefix("s:") {
        (Some(FunctionScope::Script), rest)
    } else if let Some(rest) = name.strip_prefix("g:") {
        (Some(FunctionScope::Global), rest)
    } else {
        (None, name)
    }
}

#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    pub name: String,
    pub scope: FunctionScope,
    /// Required parameters
    pub args: Vec<String>,
    /// Optional parameters and their default expressions
    pub default_args: Vec<(String, Expr)>,
    pub flags: HashSet<FunctionFlag>,
    pub varargs: bool,
    pub body: Vec<Statement>,
    /// `function!`: replace an existing definition
    pub replace: bool,
}

impl FunctionDeclaration {
    pub fn new(name: &str) -> Self {
        let (scope, bare) = split_name(name);
        Self {
            name: bare.to_string(),
            scope: scope.unwrap_or(FunctionScope::Global),
            args: Vec::new(),
            default_args: Vec::new(),
            flags: HashSet::new(),
            varargs: false,
            body: Vec::new(),
            replace: false,
        }
    }

    pub fn arg(mut self, name: &str) -> Self {
        self.args.push(name.to_string());
        self
    }

    pub fn default_arg(mut self, name: &str, default: Expr) -> Self {
        self.default_args.push((name.to_string(), default));
        self
    }

    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    pub fn flag(mut self, flag: FunctionFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn body(mut self, body: Vec<Statement>) -> Self {
        self.body = body;
        self
    }

    pub fn replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn has(&self, flag: FunctionFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn qualified_name(&self) -> String {
        format!("{}{}", self.scope.prefix(), self.name)
    }

    pub fn min_args(&self) -> usize {
        self.args.len()
    }

    /// None when variadic
    pub fn max_args(&self) -> Option<usize> {
        (!self.varargs).then(|| self.args.len() + self.default_args.len())
    }

    pub fn check_arity(&self, given: usize) -> Result<(), ArityError> {
        check_arity(&self.qualified_name(), self.min_args(), self.max_args(), given)
    }
}

pub(crate) fn check_arity(
    name: &str,
    min: usize,
    max: Option<usize>,
    given: usize,
) -> Result<(), ArityError> {
    if given < min {
        return Err(ArityError::TooFew {
            name: name.to_string(),
            min,
            given,
        });
    }
    match max {
        Some(max) if given > max => Err(ArityError::TooMany {
            name: name.to_string(),
            max,
            given,
        }),
        _ => Ok(()),
    }
}

/// A registered function, with the locals it closed over
#[derive(Debug)]
pub struct DefinedFunction {
    pub declaration: Rc<FunctionDeclaration>,
    captured: Option<Locals>,
}

#[derive(Debug, Default)]
pub struct FunctionRegistry {
    functions: HashMap<(FunctionScope, String), Rc<DefinedFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        declaration: Rc<FunctionDeclaration>,
        captured: Option<Locals>,
    ) -> Result<(), ExecError> {
        let name = &declaration.name;
        let starts_upper = name.chars().next().is_some_and(char::is_uppercase);
        if declaration.scope == FunctionScope::Global && !starts_upper {
            return Err(ExecError::ex(format!(
                "E128: Function name must start with a capital or \"s:\": {name}"
            )));
        }

        let key = (declaration.scope, name.clone());
        if self.functions.contains_key(&key) && !declaration.replace {
            return Err(ExecError::ex(format!(
                "E122: Function {} already exists, add ! to replace it",
                declaration.qualified_name()
            )));
        }

        tracing::debug!(function = %declaration.qualified_name(), "function defined");
        self.functions.insert(
            key,
            Rc::new(DefinedFunction {
                declaration,
                captured,
            }),
        );
        Ok(())
    }

    /// Unprefixed names find global functions first, then script-local ones
    pub fn get(&self, name: &str) -> Option<Rc<DefinedFunction>> {
        let (scope, bare) = split_name(name);
        let lookup = |scope: FunctionScope| self.functions.get(&(scope, bare.to_string())).cloned();
        match scope {
            Some(scope) => lookup(scope),
            None => lookup(FunctionScope::Global).or_else(|| lookup(FunctionScope::Script)),
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let (scope, bare) = split_name(name);
        let key = (scope.unwrap_or(FunctionScope::Global), bare.to_string());
        self.functions.remove(&key).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<(FunctionScope, String)> = self.functions.keys().cloned().collect();
        names.sort();
        names
            .into_iter()
            .map(|(scope, name)| format!("{}{name}", scope.prefix()))
            .collect()
    }
}

/// Register a `:function` definition, capturing the current frame for closures
pub fn define_function(
    ctx: &mut ExecContext<'_>,
    declaration: Rc<FunctionDeclaration>,
) -> Result<(), ExecError> {
    let captured = if declaration.has(FunctionFlag::Closure) {
        let frame = ctx.session.variables.current_frame().ok_or_else(|| {
            ExecError::ex("E932: Closure function should not be at top level")
        })?;
        Some(Rc::clone(frame.locals()))
    } else {
        None
    };
    ctx.session.functions.define(declaration, captured)
}

/// Caller-side facts about an invocation
#[derive(Debug, Clone, Default)]
pub struct CallSite {
    /// Explicit line range, 1-based
    pub range: Option<LineRange>,
    /// Dictionary bound to `self`
    pub dict: Option<DictRef>,
}

impl CallSite {
    pub fn with_range(range: LineRange) -> Self {
        Self {
            range: Some(range),
            dict: None,
        }
    }

    pub fn with_dict(dict: DictRef) -> Self {
        Self {
            range: None,
            dict: Some(dict),
        }
    }
}

/// Whether `name` is a user function or a builtin
pub fn exists(ctx: &ExecContext<'_>, name: &str) -> bool {
    ctx.session.functions.get(name).is_some() || Builtin::from_name(name).is_some()
}

/// Resolve `name` and call it: user functions, then builtins, then a
/// variable holding a Funcref
pub fn call_function(
    ctx: &mut ExecContext<'_>,
    name: &str,
    args: Vec<Value>,
    site: CallSite,
) -> Result<Value, ExecError> {
    if let Some(function) = ctx.session.functions.get(name) {
        return invoke(ctx, &function, args, site);
    }
    if let Some(builtin) = Builtin::from_name(name) {
        return builtin.call(ctx, args, site);
    }
    if let Some(Value::Funcref(target)) = ctx.lookup(&Variable::parse(name)) {
        if target != name {
            return call_function(ctx, &target, args, site);
        }
    }
    Err(EvalError::UnknownFunction(name.to_string()).into())
}

/// Invoke a user function.
///
/// Arity, the Dictionary requirement and the depth limit are checked before
/// the frame exists. The most recent collected problem is reported once the
/// body is done; `:finish` discards them all.
pub fn invoke(
    ctx: &mut ExecContext<'_>,
    function: &Rc<DefinedFunction>,
    args: Vec<Value>,
    site: CallSite,
) -> Result<Value, ExecError> {
    let declaration = &function.declaration;
    declaration.check_arity(args.len())?;
    if declaration.has(FunctionFlag::Dict) && site.dict.is_none() {
        return Err(EvalError::DictFunctionWithoutDict(declaration.qualified_name()).into());
    }
    if ctx.session.variables.depth() >= ctx.session.max_call_depth() {
        return Err(EvalError::CallDepthExceeded.into());
    }

    let (first, last) = match site.range {
        Some(range) if declaration.has(FunctionFlag::Range) => (range.first, range.last),
        _ => {
            let line = ctx.current_line();
            (line, line)
        }
    };
    tracing::debug!(
        function = %declaration.qualified_name(),
        args = args.len(),
        first,
        last,
        "invoking function"
    );

    let frame = CallFrame::new(declaration.qualified_name(), function.captured.clone());
    ctx.session.variables.push_frame(frame);
    let outcome = run_invocation(ctx, declaration, args, &site, first, last);
    ctx.session.variables.pop_frame();
    outcome
}

fn run_invocation(
    ctx: &mut ExecContext<'_>,
    declaration: &FunctionDeclaration,
    args: Vec<Value>,
    site: &CallSite,
    first: usize,
    last: usize,
) -> Result<Value, ExecError> {
    bind_arguments(ctx, declaration, args)?;
    let vars = &mut ctx.session.variables;
    vars.bind_argument("firstline", Value::Integer(line_value(first)));
    vars.bind_argument("lastline", Value::Integer(line_value(last)));
    if let Some(dict) = &site.dict {
        ctx.store(&Variable::scoped(Scope::Local, "self"), Value::Dict(Rc::clone(dict)))?;
    }

    let policy = if declaration.has(FunctionFlag::Abort) {
        ExecutionPolicy::Abort
    } else {
        ExecutionPolicy::Default
    };
    let per_line = declaration.has(FunctionFlag::Range);
    let move_cursor = per_line && site.range.is_some();
    let lines = if per_line { first..=last } else { first..=first };

    let mut diagnostics = Diagnostics::default();
    let mut returned = None;
    for line in lines {
        if move_cursor {
            ctx.editor.set_current_line(line.saturating_sub(1));
        }
        // Err, including `:finish`, leaves `diagnostics` unreported
        if let Some(value) = run_body(&declaration.body, policy, ctx, &mut diagnostics)? {
            returned = Some(value);
        }
    }

    if let Some(diagnostic) = diagnostics.last() {
        let diagnostic = diagnostic.clone();
        ctx.session.report_error(&diagnostic);
    }
    Ok(returned.unwrap_or(Value::Integer(0)))
}

/// Required, then optional (defaults evaluated in the new frame, so they
/// can see earlier parameters), then the variadic rest in `a:000`
fn bind_arguments(
    ctx: &mut ExecContext<'_>,
    declaration: &FunctionDeclaration,
    args: Vec<Value>,
) -> Result<(), ExecError> {
    let mut args = args.into_iter();
    for name in &declaration.args {
        let value = args.next().unwrap_or(Value::Integer(0));
        ctx.session.variables.bind_argument(name.as_str(), value);
    }
    for (name, default) in &declaration.default_args {
        let value = match args.next() {
            Some(value) => value,
            None => default.evaluate(ctx)?,
        };
        ctx.session.variables.bind_argument(name.as_str(), value);
    }

    let extra: Vec<Value> = args.collect();
    if declaration.varargs {
        let vars = &mut ctx.session.variables;
        vars.bind_argument("0", Value::Integer(extra.len() as i64));
        for (i, value) in extra.iter().enumerate() {
            vars.bind_argument((i + 1).to_string(), value.clone());
        }
        vars.bind_argument("000", Value::list(extra));
    }
    Ok(())
}

fn line_value(line: usize) -> i64 {
    i64::try_from(line).unwrap_or(i64::MAX)
}

impl fmt::Display for FunctionDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}(", self.qualified_name())?;
        let mut params: Vec<String> = self.args.clone();
        params.extend(
            self.default_args
                .iter()
                .map(|(name, default)| format!("{name} = {default}")),
        );
        if self.varargs {
            params.push("...".to_string());
        }
        f.write_str(&params.join(", "))?;
        f.write_str(")")?;
        for (flag, word) in [
            (FunctionFlag::Range, " range"),
            (FunctionFlag::Abort, " abort"),
            (FunctionFlag::Dict, " dict"),
            (FunctionFlag::Closure, " closure"),
        ] {
            if self.has(flag) {
                f.write_str(word)?;
            }
        }
        Ok(())
    }
}
