//! Semantics of the language itself, run end to end through the runtime.

use edmacro::{DocumentId, MacroError, MacroRuntime, RunOutcome, ScratchHost, Value};

const DOC: DocumentId = DocumentId(1);

fn run(source: &str) -> (MacroRuntime, Result<RunOutcome, MacroError>) {
    let mut runtime = MacroRuntime::new();
    let mut host = ScratchHost::new();
    let outcome = runtime.run_source(DOC, "test", source, &mut host);
    (runtime, outcome)
}

fn global_int(runtime: &MacroRuntime, name: &str) -> i64 {
    match runtime.global(name) {
        Some(Value::Int(i)) => *i,
        other => panic!("global {} = {:?}", name, other),
    }
}

#[test]
fn integer_overflow_wraps() {
    let (rt, outcome) = run("x = 9223372036854775807 + 1\n");
    outcome.unwrap();
    assert_eq!(global_int(&rt, "x"), i64::MIN);
}

#[test]
fn division_by_zero_fails_with_source_position() {
    let (_, outcome) = run("ok = 1\nx = 1 / 0\n");
    let err = outcome.unwrap_err();
    match err {
        MacroError::Runtime(msg) => {
            assert!(msg.contains("division by zero"), "{}", msg);
            assert!(msg.contains("at byte 7"), "{}", msg);
        }
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn numeric_strings_coerce_in_arithmetic() {
    let (rt, outcome) = run("x = \"2\" + 3\n");
    outcome.unwrap();
    assert_eq!(global_int(&rt, "x"), 5);
}

#[test]
fn adjacency_concatenation() {
    let (rt, outcome) = run("n = 7\nmsg = \"line \" n \"!\"\n");
    outcome.unwrap();
    assert_eq!(rt.global("msg"), Some(&Value::Str("line 7!".into())));
}

#[test]
fn short_circuit_skips_the_right_operand() {
    // unknown_sub would fail at run time if it were ever called
    let (rt, outcome) = run("x = 1 || unknown_sub()\ny = 0 && unknown_sub()\n");
    outcome.unwrap();
    assert_eq!(global_int(&rt, "x"), 1);
    assert_eq!(global_int(&rt, "y"), 0);
}

#[test]
fn comparisons_yield_zero_or_one() {
    let (rt, outcome) = run("a = 3 < 5\nb = \"abc\" == \"abd\"\nc = \"10\" > 9\n");
    outcome.unwrap();
    assert_eq!(global_int(&rt, "a"), 1);
    assert_eq!(global_int(&rt, "b"), 0);
    assert_eq!(global_int(&rt, "c"), 1);
}

#[test]
fn while_and_for_loops_run_to_their_bounds() {
    let src = "s = 0\nfor (i = 1; i <= 10; i++) {\n  s += i\n}\nn = 0\nwhile (n < 4) {\n  n += 1\n}\n";
    let (rt, outcome) = run(src);
    outcome.unwrap();
    assert_eq!(global_int(&rt, "s"), 55);
    assert_eq!(global_int(&rt, "n"), 4);
}

#[test]
fn break_and_continue() {
    let src = "\
s = 0
for (i = 0; i < 10; i++) {
  if (i == 5) {
    break
  }
  if (i % 2) {
    continue
  }
  s += i
}
";
    let (rt, outcome) = run(src);
    outcome.unwrap();
    assert_eq!(global_int(&rt, "s"), 0 + 2 + 4);
}

#[test]
fn defined_subroutines_recurse() {
    let src = "\
define fact(n) {
  if (n < 2) {
    return 1
  }
  return n * fact(n - 1)
}
x = fact(6)
";
    let (rt, outcome) = run(src);
    outcome.unwrap();
    assert_eq!(global_int(&rt, "x"), 720);
}

#[test]
fn assigned_names_in_a_subroutine_are_frame_local() {
    let src = "\
y = 1
define f(n) {
  y = n + 90
  return y
}
x = f(9)
";
    let (rt, outcome) = run(src);
    outcome.unwrap();
    assert_eq!(global_int(&rt, "x"), 99);
    assert_eq!(global_int(&rt, "y"), 1);
}

#[test]
fn wrong_argument_count_to_a_subroutine_fails() {
    let (_, outcome) = run("define f(a, b) {\n  return a + b\n}\nx = f(1)\n");
    let err = outcome.unwrap_err();
    assert!(matches!(err, MacroError::Runtime(ref m) if m.contains("argument")));
}

#[test]
fn arrays_copy_on_write() {
    let src = "\
a[0] = 1
a[1] = 2
b = a
b[2] = 3
x = array_size(a)
y = array_size(b)
";
    let (rt, outcome) = run(src);
    outcome.unwrap();
    assert_eq!(global_int(&rt, "x"), 2);
    assert_eq!(global_int(&rt, "y"), 3);
}

#[test]
fn for_in_visits_every_key() {
    let src = "\
a[\"k1\"] = 1
a[\"k2\"] = 2
a[7] = 4
s = 0
for (k in a) {
  s += a[k]
}
";
    let (rt, outcome) = run(src);
    outcome.unwrap();
    assert_eq!(global_int(&rt, "s"), 7);
}

#[test]
fn delete_removes_an_element_and_missing_access_fails() {
    let (rt, outcome) = run("a[0] = 1\na[1] = 2\ndelete a[0]\nx = array_size(a)\n");
    outcome.unwrap();
    assert_eq!(global_int(&rt, "x"), 1);

    let (_, outcome) = run("a[0] = 1\nx = a[5]\n");
    let err = outcome.unwrap_err();
    assert!(matches!(err, MacroError::Runtime(ref m) if m.contains("no element")));
}

#[test]
fn builtin_arity_is_enforced() {
    let (_, outcome) = run("x = length()\n");
    let err = outcome.unwrap_err();
    assert!(matches!(err, MacroError::Runtime(ref m) if m.contains("expects")));
}

#[test]
fn reading_an_unset_global_names_the_variable() {
    let (_, outcome) = run("x = nope + 1\n");
    let err = outcome.unwrap_err();
    assert!(matches!(err, MacroError::Runtime(ref m) if m.contains("'nope'")));
}

#[test]
fn string_builtins_behave() {
    let src = "\
s = \"Hello World\"
a = substring(s, 0, 5)
b = toupper(a)
p = search_string(s, \"World\", 0)
n = length(s)
";
    let (rt, outcome) = run(src);
    outcome.unwrap();
    assert_eq!(rt.global("a"), Some(&Value::Str("Hello".into())));
    assert_eq!(rt.global("b"), Some(&Value::Str("HELLO".into())));
    assert_eq!(global_int(&rt, "p"), 6);
    assert_eq!(global_int(&rt, "n"), 11);
}

#[test]
fn substring_out_of_range_is_an_error() {
    let (_, outcome) = run("x = substring(\"abc\", 1, 9)\n");
    assert!(outcome.is_err());
}

#[test]
fn the_last_expression_is_the_program_result() {
    let (_, outcome) = run("x = 6\nx * 7\n");
    assert_eq!(outcome.unwrap(), RunOutcome::Finished(Value::Int(42)));
}
