//! Menu-bound macros: compiled once from configuration text, cached by
//! name for the process lifetime, and run like any other macro.

use edmacro::{
    DocumentId, MacroError, MacroRuntime, MenuConfig, RunOutcome, ScratchHost, Value,
};

const DOC: DocumentId = DocumentId(1);

const CONFIG: &str = r#"
[[macros]]
name = "Greet"
source = 'insert_string("hi ")'

[[macros]]
name = "Sum"
source = '''
s = 0
for (i = 1; i <= 3; i++) {
  s += i
}
s
'''
"#;

#[test]
fn configured_macros_compile_and_run() {
    let mut runtime = MacroRuntime::new();
    let mut host = ScratchHost::with_text("world");
    let config = MenuConfig::from_toml(CONFIG).unwrap();
    runtime.load_menu_config(&config).unwrap();

    let outcome = runtime.run_menu_macro(DOC, "Greet", &mut host).unwrap();
    assert_eq!(outcome, RunOutcome::Finished(Value::Undef));
    assert_eq!(host.text(), "hi world");

    let outcome = runtime.run_menu_macro(DOC, "Sum", &mut host).unwrap();
    assert_eq!(outcome, RunOutcome::Finished(Value::Int(6)));
}

#[test]
fn menu_programs_are_compiled_once_and_cached() {
    let mut runtime = MacroRuntime::new();
    let config = MenuConfig::from_toml(CONFIG).unwrap();
    runtime.load_menu_config(&config).unwrap();

    let first = runtime.menu_macro("Greet").unwrap();
    let second = runtime.menu_macro("Greet").unwrap();
    assert!(std::rc::Rc::ptr_eq(&first, &second));
}

#[test]
fn an_unknown_menu_macro_is_an_error() {
    let mut runtime = MacroRuntime::new();
    let mut host = ScratchHost::new();
    let err = runtime.run_menu_macro(DOC, "Missing", &mut host).unwrap_err();
    assert!(matches!(err, MacroError::Runtime(ref m) if m.contains("Missing")));
}

#[test]
fn a_bad_definition_fails_the_load_naming_the_macro() {
    let mut runtime = MacroRuntime::new();
    let config = MenuConfig::from_toml(
        "[[macros]]\nname = \"Broken\"\nsource = 'x = \"unterminated'\n",
    )
    .unwrap();
    let err = runtime.load_menu_config(&config).unwrap_err();
    match err {
        MacroError::Parse { message, .. } => {
            assert!(message.contains("menu macro 'Broken'"), "{}", message)
        }
        other => panic!("expected parse error, got {:?}", other),
    }
}

#[test]
fn menu_sources_get_the_trailing_newline_normalization() {
    // 'Greet' above has no trailing newline in its TOML string; the load
    // normalizes it rather than failing on an unterminated statement.
    let mut runtime = MacroRuntime::new();
    let config = MenuConfig::from_toml(CONFIG).unwrap();
    assert!(runtime.load_menu_config(&config).is_ok());
    assert!(runtime.menu_macro("Greet").is_some());
}
