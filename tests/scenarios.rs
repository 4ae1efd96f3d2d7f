use lark_ex::commands::{
    CallCommand, CommandLine, EchoCommand, LetCommand, LetTarget, LineRange, SetCommand, SetKind,
};
use lark_ex::options::{OptionDeclaration, OptionScope, OptionService, OptionValue};
use lark_ex::script::{BinaryOp, FunctionDeclaration, FunctionFlag, Variable};
use lark_ex::{Editor, EditorId, Expr, Session, Statement, TextEditor, Value};

fn five_lines() -> TextEditor {
    TextEditor::from_text(EditorId(0), "one\ntwo\nthree\nfour\nfive\n")
}

fn shown(session: &Session) -> Vec<String> {
    session.messages().iter().map(|m| m.text.clone()).collect()
}

#[test]
fn keyword_option_classifies_characters() {
    let mut session = Session::new();
    let mut editor = five_lines();
    let script = vec![Statement::command(SetCommand::new(
        SetKind::Both,
        CommandLine::with_argument("iskeyword=@,48-57,_"),
    ))];
    session.execute_script(&mut editor, &script).unwrap();

    for c in ['a', '_', '5'] {
        assert!(session.is_keyword(c), "{c:?} should be a keyword character");
    }
    assert!(!session.is_keyword(' '));
    assert!(session.is_keyword('\u{3b1}'));
}

#[test]
fn optional_parameter_defaults_when_omitted() {
    let mut session = Session::new();
    let mut editor = five_lines();
    let script = vec![
        Statement::function(
            FunctionDeclaration::new("Sum")
                .arg("x")
                .default_arg("y", Expr::Integer(0))
                .body(vec![Statement::Return(Some(Expr::binary(
                    BinaryOp::Add,
                    Expr::var("a:x"),
                    Expr::var("a:y"),
                )))]),
        ),
        Statement::command(LetCommand::assign(
            LetTarget::Variable(Variable::parse("g:result")),
            Expr::call("Sum", vec![Expr::Integer(5)]),
        )),
    ];
    session.execute_script(&mut editor, &script).unwrap();

    let result = session
        .variables
        .get_variable_value(&Variable::parse("g:result"), EditorId(0));
    assert_eq!(result, Some(Value::Integer(5)));
}

#[test]
fn range_function_runs_once_per_line_of_explicit_range() {
    let mut session = Session::new();
    let mut editor = five_lines();
    let script = vec![
        Statement::function(
            FunctionDeclaration::new("Each")
                .flag(FunctionFlag::Range)
                .body(vec![Statement::command(EchoCommand::new(vec![
                    Expr::var("a:firstline"),
                    Expr::var("a:lastline"),
                    Expr::call("line", vec![Expr::string(".")]),
                ]))]),
        ),
        Statement::command(CallCommand::new("Each", vec![]).with_range(LineRange::new(3, 5))),
    ];
    session.execute_script(&mut editor, &script).unwrap();

    assert_eq!(shown(&session), vec!["3 5 3", "3 5 4", "3 5 5"]);
    assert_eq!(editor.current_line(), 4);
}

#[test]
fn stray_break_aborts_the_body() {
    let mut session = Session::new();
    let mut editor = five_lines();
    let script = vec![
        Statement::function(
            FunctionDeclaration::new("Stray")
                .flag(FunctionFlag::Abort)
                .body(vec![
                    Statement::Break,
                    Statement::command(EchoCommand::new(vec![Expr::string("after")])),
                ]),
        ),
        Statement::command(CallCommand::new("Stray", vec![])),
    ];
    session.execute_script(&mut editor, &script).unwrap();

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].error);
    assert!(messages[0].text.starts_with("E587"));
}

#[test]
fn list_option_edits() {
    let mut options = OptionService::new();
    options
        .declare(OptionDeclaration::list("letters", "lt", "a,b"))
        .unwrap();
    let mut session = Session::with_options(options).unwrap();
    let mut editor = five_lines();
    let letters = |session: &Session| {
        session
            .options()
            .get(OptionScope::Global, "letters")
            .unwrap()
    };

    let set = |argument: &str| {
        Statement::command(SetCommand::new(SetKind::Both, CommandLine::with_argument(argument)))
    };
    session
        .execute_script(&mut editor, &[set("letters+=k")])
        .unwrap();
    assert_eq!(letters(&session).to_string(), "a,b,k");

    session
        .execute_script(&mut editor, &[set("lt-=b")])
        .unwrap();
    assert_eq!(letters(&session).to_string(), "a,k");

    session
        .execute_script(&mut editor, &[set("letters-=z")])
        .unwrap();
    assert_eq!(
        letters(&session),
        OptionValue::StringList(vec!["a".to_string(), "k".to_string()])
    );
    assert!(session.messages().is_empty());
}

#[test]
fn statement_errors_do_not_stop_the_script() {
    let mut session = Session::new();
    let mut editor = five_lines();
    let script = vec![
        Statement::command(SetCommand::new(SetKind::Both, CommandLine::with_argument("nosuch"))),
        Statement::command(EchoCommand::new(vec![Expr::var("v:errmsg")])),
    ];
    session.execute_script(&mut editor, &script).unwrap();

    assert_eq!(
        shown(&session),
        vec!["E518: Unknown option: nosuch", "E518: Unknown option: nosuch"]
    );
}

#[test]
fn self_containing_list_compares_and_fails_to_encode() {
    let mut session = Session::new();
    let mut editor = five_lines();
    let let_var = |name: &str, value: Expr| {
        Statement::command(LetCommand::assign(LetTarget::Variable(Variable::parse(name)), value))
    };
    let script = vec![
        let_var("g:l", Expr::List(vec![])),
        let_var("g:x", Expr::call("add", vec![Expr::var("g:l"), Expr::var("g:l")])),
        let_var(
            "g:same",
            Expr::binary(
                BinaryOp::Eq,
                Expr::var("g:l"),
                Expr::call("copy", vec![Expr::var("g:l")]),
            ),
        ),
    ];
    session.execute_script(&mut editor, &script).unwrap();
    let same = session
        .variables
        .get_variable_value(&Variable::parse("g:same"), EditorId(0));
    assert_eq!(same, Some(Value::Integer(1)));

    let encode = vec![Statement::command(EchoCommand::new(vec![Expr::call(
        "json_encode",
        vec![Expr::var("g:l")],
    )]))];
    let err = session.execute_script(&mut editor, &encode).unwrap_err();
    assert!(err.to_string().contains("E698"), "{err}");

    if let Some(Value::List(list)) = session
        .variables
        .get_variable_value(&Variable::parse("g:l"), EditorId(0))
    {
        list.borrow_mut().clear();
    }
}
