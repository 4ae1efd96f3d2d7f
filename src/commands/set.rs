//! `:set`, `:setlocal` and `:setglobal`.
//!
//! The argument is a list of whitespace separated items (`\ ` keeps a
//! space inside a value). Items are applied left to right and the first
//! failing item stops the command; earlier items stay applied.

use super::{Access, ArgumentFlag, Command, CommandFlags, CommandLine, RangeFlag, flags};
use crate::editor::EditorId;
use crate::options::{
    OptionError, OptionKind, OptionScope, OptionService, OptionType, OptionValue,
};
use crate::script::{ExecError, ExecutionResult};
use crate::session::ExecContext;

/// Which values a `:set` variant reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    /// `:set`: the editor's value and the global value
    Both,
    /// `:setlocal`
    Local,
    /// `:setglobal`
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    ShowAll,
    ResetAll,
    Option { name: String, action: Action },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    /// Bare `opt`: switch a boolean on, show anything else
    Plain,
    Show,
    Disable,
    Toggle,
    Reset,
    Assign(String),
    Append(String),
    Prepend(String),
    Remove(String),
}

fn split_items(argument: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = argument.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) if escaped.is_whitespace() || escaped == '\\' => current.push(escaped),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    items.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        items.push(current);
    }
    items
}

fn parse_item(text: &str) -> Result<Item, ExecError> {
    match text {
        "all" => return Ok(Item::ShowAll),
        "all&" => return Ok(Item::ResetAll),
        _ => {}
    }
    let split = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let (name, rest) = text.split_at(split);
    if name.is_empty() {
        return Err(invalid(text));
    }
    let action = match rest {
        "" => Action::Plain,
        "?" => Action::Show,
        "!" => Action::Toggle,
        "&" => Action::Reset,
        _ => {
            if let Some(value) = rest.strip_prefix("+=") {
                Action::Append(value.to_string())
            } else if let Some(value) = rest.strip_prefix("-=") {
                Action::Remove(value.to_string())
            } else if let Some(value) = rest.strip_prefix("^=") {
                Action::Prepend(value.to_string())
            } else if let Some(value) = rest.strip_prefix(['=', ':']) {
                Action::Assign(value.to_string())
            } else {
                return Err(invalid(text));
            }
        }
    };
    Ok(Item::Option {
        name: name.to_string(),
        action,
    })
}

fn invalid(text: &str) -> ExecError {
    ExecError::ex(format!("E474: Invalid argument: {text}"))
}

/// `:se[t]`, `:setl[ocal]`, `:setg[lobal]`
#[derive(Debug)]
pub struct SetCommand {
    line: CommandLine,
    kind: SetKind,
}

impl SetCommand {
    const FLAGS: CommandFlags = flags(RangeFlag::Forbidden, ArgumentFlag::Optional, Access::ReadOnly);

    pub fn new(kind: SetKind, line: CommandLine) -> Self {
        Self { line, kind }
    }

    fn read_scope(&self, editor: EditorId) -> OptionScope {
        match self.kind {
            SetKind::Global => OptionScope::Global,
            SetKind::Both | SetKind::Local => OptionScope::Local(editor),
        }
    }

    fn write_scopes(&self, kind: OptionKind, editor: EditorId) -> Vec<OptionScope> {
        match (self.kind, kind) {
            (SetKind::Both, OptionKind::Local) => {
                vec![OptionScope::Local(editor), OptionScope::Global]
            }
            (SetKind::Global, _) | (_, OptionKind::Global) => vec![OptionScope::Global],
            (SetKind::Local, OptionKind::Local) => vec![OptionScope::Local(editor)],
        }
    }

    fn apply(
        &self,
        options: &mut OptionService,
        editor: EditorId,
        item: Item,
        shown: &mut Vec<String>,
    ) -> Result<(), ExecError> {
        let read = self.read_scope(editor);
        let (name, action) = match item {
            Item::ShowAll => {
                for decl in options.declarations() {
                    shown.push(describe(&decl.name, &options.get(read, &decl.name)?));
                }
                return Ok(());
            }
            Item::ResetAll => {
                let names: Vec<String> = options.declarations().map(|d| d.name.clone()).collect();
                for name in names {
                    let kind = options.declaration(&name)?.kind;
                    for scope in self.write_scopes(kind, editor) {
                        options.reset_default(scope, &name)?;
                    }
                }
                return Ok(());
            }
            Item::Option { name, action } => resolve(options, name, action)?,
        };

        let decl = options.declaration(&name)?;
        let (full, kind, option_type) = (decl.name.clone(), decl.kind, decl.default.option_type());
        let scopes = self.write_scopes(kind, editor);

        match action {
            Action::Show => shown.push(describe(&full, &options.get(read, &full)?)),
            Action::Plain if option_type != OptionType::Boolean => {
                shown.push(describe(&full, &options.get(read, &full)?));
            }
            Action::Plain => {
                for scope in scopes {
                    options.set_option(scope, &full)?;
                }
            }
            Action::Disable => {
                for scope in scopes {
                    options.unset_option(scope, &full)?;
                }
            }
            Action::Toggle => {
                if option_type != OptionType::Boolean {
                    return Err(invalid(&format!("{full}!")));
                }
                let next = OptionValue::Boolean(!options.is_set(read, &full)?);
                for scope in scopes {
                    options.set_value(scope, &full, next.clone())?;
                }
            }
            Action::Reset => {
                for scope in scopes {
                    options.reset_default(scope, &full)?;
                }
            }
            Action::Assign(text) => {
                for scope in scopes {
                    options.set_from_text(scope, &full, &text)?;
                }
            }
            Action::Append(text) => {
                for scope in scopes {
                    options.append_value(scope, &full, &text)?;
                }
            }
            Action::Prepend(text) => {
                for scope in scopes {
                    options.prepend_value(scope, &full, &text)?;
                }
            }
            Action::Remove(text) => {
                for scope in scopes {
                    options.remove_value(scope, &full, &text)?;
                }
            }
        }
        Ok(())
    }
}

/// Map `noopt` and `invopt` onto their option when `opt` itself is unknown
fn resolve(
    options: &OptionService,
    name: String,
    action: Action,
) -> Result<(String, Action), ExecError> {
    if options.declaration(&name).is_ok() {
        return Ok((name, action));
    }
    if action == Action::Plain {
        for (prefix, negated) in [("no", Action::Disable), ("inv", Action::Toggle)] {
            if let Some(bare) = name.strip_prefix(prefix) {
                if let Ok(decl) = options.declaration(bare) {
                    if decl.default.option_type() != OptionType::Boolean {
                        return Err(invalid(&name));
                    }
                    return Ok((bare.to_string(), negated));
                }
            }
        }
    }
    Err(OptionError::Unknown(name).into())
}

fn describe(name: &str, value: &OptionValue) -> String {
    match value {
        OptionValue::Boolean(true) => format!("  {name}"),
        OptionValue::Boolean(false) => format!("no{name}"),
        other => format!("  {name}={other}"),
    }
}

impl Command for SetCommand {
    fn name(&self) -> &'static str {
        match self.kind {
            SetKind::Both => "set",
            SetKind::Local => "setlocal",
            SetKind::Global => "setglobal",
        }
    }

    fn flags(&self) -> CommandFlags {
        Self::FLAGS
    }

    fn line(&self) -> &CommandLine {
        &self.line
    }

    fn process(&self, ctx: &mut ExecContext<'_>) -> Result<ExecutionResult, ExecError> {
        let editor = ctx.editor_id();
        let mut shown = Vec::new();
        let result = {
            let mut options = ctx.session.options_mut();
            let items = split_items(&self.line.argument);
            if items.is_empty() {
                // Bare `:set` lists what differs from the defaults
                let read = self.read_scope(editor);
                for decl in options.declarations() {
                    let value = options.get(read, &decl.name)?;
                    if value != decl.default {
                        shown.push(describe(&decl.name, &value));
                    }
                }
                Ok(())
            } else {
                items.iter().try_for_each(|text| {
                    let item = parse_item(text)?;
                    self.apply(&mut *options, editor, item, &mut shown)
                })
            }
        };
        for line in shown {
            ctx.session.echo(line);
        }
        result.map(|()| ExecutionResult::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::TextEditor;
    use crate::session::Session;
    use rstest::rstest;

    const ED: EditorId = EditorId(4);

    fn set(session: &mut Session, kind: SetKind, argument: &str) -> Result<Vec<String>, ExecError> {
        let mut editor = TextEditor::from_text(ED, "x\n");
        let mut ctx = ExecContext::new(session, &mut editor);
        SetCommand::new(kind, CommandLine::with_argument(argument)).execute(&mut ctx)?;
        Ok(session.take_messages().into_iter().map(|m| m.text).collect())
    }

    fn global(session: &Session, name: &str) -> OptionValue {
        session.options().get(OptionScope::Global, name).unwrap()
    }

    fn local(session: &Session, name: &str) -> OptionValue {
        session.options().get(OptionScope::Local(ED), name).unwrap()
    }

    #[rstest]
    #[case("ic", Item::Option { name: "ic".into(), action: Action::Plain })]
    #[case("ic?", Item::Option { name: "ic".into(), action: Action::Show })]
    #[case("ic!", Item::Option { name: "ic".into(), action: Action::Toggle })]
    #[case("sw&", Item::Option { name: "sw".into(), action: Action::Reset })]
    #[case("sw=4", Item::Option { name: "sw".into(), action: Action::Assign("4".into()) })]
    #[case("sw:4", Item::Option { name: "sw".into(), action: Action::Assign("4".into()) })]
    #[case("vi+=f1", Item::Option { name: "vi".into(), action: Action::Append("f1".into()) })]
    #[case("vi^=f1", Item::Option { name: "vi".into(), action: Action::Prepend("f1".into()) })]
    #[case("vi-=f1", Item::Option { name: "vi".into(), action: Action::Remove("f1".into()) })]
    #[case("isk=@,-,=", Item::Option { name: "isk".into(), action: Action::Assign("@,-,=".into()) })]
    #[case("all", Item::ShowAll)]
    #[case("all&", Item::ResetAll)]
    fn parses_items(#[case] text: &str, #[case] expected: Item) {
        assert_eq!(parse_item(text).unwrap(), expected);
    }

    #[rstest]
    #[case("=4")]
    #[case("sw*4")]
    fn rejects_malformed_items(#[case] text: &str) {
        assert!(parse_item(text).unwrap_err().to_string().starts_with("E474"));
    }

    #[test]
    fn escaped_spaces_stay_in_values() {
        assert_eq!(split_items(r"sel=old  cb=x\ y"), vec!["sel=old", "cb=x y"]);
    }

    #[test]
    fn boolean_forms() {
        let mut session = Session::new();
        set(&mut session, SetKind::Both, "ic").unwrap();
        assert_eq!(global(&session, "ignorecase"), OptionValue::Boolean(true));
        set(&mut session, SetKind::Both, "noic").unwrap();
        assert_eq!(global(&session, "ignorecase"), OptionValue::Boolean(false));
        set(&mut session, SetKind::Both, "invic").unwrap();
        assert_eq!(global(&session, "ignorecase"), OptionValue::Boolean(true));
        set(&mut session, SetKind::Both, "ic!").unwrap();
        assert_eq!(global(&session, "ignorecase"), OptionValue::Boolean(false));
        assert_eq!(set(&mut session, SetKind::Both, "ic?").unwrap(), vec!["noignorecase"]);
    }

    #[test]
    fn value_forms_and_show() {
        let mut session = Session::new();
        set(&mut session, SetKind::Both, "so=5 hi+=10").unwrap();
        assert_eq!(global(&session, "scrolloff"), OptionValue::Number(5));
        assert_eq!(global(&session, "history"), OptionValue::Number(60));
        assert_eq!(set(&mut session, SetKind::Both, "so").unwrap(), vec!["  scrolloff=5"]);
        set(&mut session, SetKind::Both, "so&").unwrap();
        assert_eq!(global(&session, "scrolloff"), OptionValue::Number(0));
    }

    #[test]
    fn set_writes_both_values_of_local_options() {
        let mut session = Session::new();
        set(&mut session, SetKind::Both, "sw=4").unwrap();
        assert_eq!(local(&session, "sw"), OptionValue::Number(4));
        assert_eq!(global(&session, "sw"), OptionValue::Number(4));

        set(&mut session, SetKind::Local, "sw=2").unwrap();
        assert_eq!(local(&session, "sw"), OptionValue::Number(2));
        assert_eq!(global(&session, "sw"), OptionValue::Number(4));

        set(&mut session, SetKind::Global, "sw=6").unwrap();
        assert_eq!(local(&session, "sw"), OptionValue::Number(2));
        assert_eq!(global(&session, "sw"), OptionValue::Number(6));
    }

    #[test]
    fn first_failure_stops_later_items() {
        let mut session = Session::new();
        let err = set(&mut session, SetKind::Both, "so=3 nosuch so=4").unwrap_err();
        assert_eq!(err.to_string(), "E518: Unknown option: nosuch");
        assert!(err.is_collectable());
        assert_eq!(global(&session, "scrolloff"), OptionValue::Number(3));
    }

    #[test]
    fn number_options_need_numbers() {
        let mut session = Session::new();
        let err = set(&mut session, SetKind::Both, "so=abc").unwrap_err();
        assert!(err.to_string().starts_with("E521"));
        let err = set(&mut session, SetKind::Both, "nosel").unwrap_err();
        assert!(err.to_string().starts_with("E474"));
    }

    #[test]
    fn bare_set_lists_changed_options() {
        let mut session = Session::new();
        assert!(set(&mut session, SetKind::Both, "").unwrap().is_empty());
        set(&mut session, SetKind::Both, "hls").unwrap();
        assert_eq!(set(&mut session, SetKind::Both, "").unwrap(), vec!["  hlsearch"]);
        set(&mut session, SetKind::Both, "all&").unwrap();
        assert!(set(&mut session, SetKind::Both, "").unwrap().is_empty());
    }

    #[test]
    fn set_all_shows_every_option() {
        let mut session = Session::new();
        let shown = set(&mut session, SetKind::Both, "all").unwrap();
        assert_eq!(shown.len(), session.options().declarations().count());
        assert!(shown.contains(&"  iskeyword=@,48-57,_".to_string()));
    }
}
