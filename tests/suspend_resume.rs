//! The suspension protocol: a macro that calls a pending native operation
//! freezes at the call, resumes with the delivered result, and ends up
//! exactly where a synchronous implementation would have put it.

use std::collections::HashMap;

use edmacro::vm::{CallState, ExecContext, Step};
use edmacro::{
    compile, Arity, BuiltinOutcome, DocumentId, EventToken, MacroError, MacroRuntime, OpCode,
    Registry, RunOutcome, ScratchHost, Value,
};

const DOC: DocumentId = DocumentId(1);

fn pausing_registry() -> Registry {
    let mut reg = Registry::new();
    reg.register("pause", Arity::Exact(0), |_, _| {
        Ok(BuiltinOutcome::Suspend(EventToken(7)))
    });
    reg
}

#[test]
fn the_state_parks_at_the_call_instruction() {
    let reg = pausing_registry();
    let program = compile("test", "x = pause()\n", &reg).unwrap();
    let mut state = CallState::new(program.clone());
    let mut host = ScratchHost::new();
    let mut globals = HashMap::new();
    let mut subs = HashMap::new();
    let mut cx = ExecContext {
        registry: &reg,
        host: &mut host,
        globals: &mut globals,
        subs: &mut subs,
    };

    let step = loop {
        match state.step(&mut cx).unwrap() {
            Step::Continue => continue,
            other => break other,
        }
    };
    assert_eq!(step, Step::Suspend(EventToken(7)));
    assert_eq!(state.pending_token(), Some(EventToken(7)));

    // The instruction pointer still addresses the suspending call.
    let ip = state.ip().unwrap();
    assert!(matches!(
        program.ops()[ip],
        OpCode::CallBuiltin { argc: 0, .. }
    ));

    // Substitute the operation's result and run to the end.
    state.resume_with(Value::Int(42)).unwrap();
    let finished = loop {
        match state.step(&mut cx).unwrap() {
            Step::Continue => continue,
            other => break other,
        }
    };
    assert_eq!(finished, Step::Finished(Value::Undef));
    assert_eq!(globals[&edmacro::Symbol::intern("x")], Value::Int(42));
}

#[test]
fn completion_resumes_through_the_runtime() {
    let mut runtime = MacroRuntime::with_registry(pausing_registry());
    let mut host = ScratchHost::new();

    let outcome = runtime
        .run_source(DOC, "test", "x = pause()\nx\n", &mut host)
        .unwrap();
    assert_eq!(outcome, RunOutcome::Suspended);
    assert!(runtime.is_macro_running(DOC));

    let finished = runtime
        .on_external_event_complete(EventToken(7), Ok(Value::Int(42)), &mut host)
        .expect("a macro was waiting on token 7")
        .unwrap();
    // The call expression evaluated to 42 at the next statement.
    assert_eq!(finished, RunOutcome::Finished(Value::Int(42)));
    assert!(!runtime.is_macro_running(DOC));
}

#[test]
fn suspended_and_synchronous_builtins_agree_on_the_final_value() {
    let source = "y = answer() + 1\ny\n";

    // Synchronous rendition.
    let mut sync_reg = Registry::new();
    sync_reg.register("answer", Arity::Exact(0), |_, _| {
        Ok(BuiltinOutcome::Done(Value::Int(41)))
    });
    let mut runtime = MacroRuntime::with_registry(sync_reg);
    let mut host = ScratchHost::new();
    let sync_result = runtime.run_source(DOC, "test", source, &mut host).unwrap();

    // Suspending rendition of the same operation.
    let mut pend_reg = Registry::new();
    pend_reg.register("answer", Arity::Exact(0), |_, _| {
        Ok(BuiltinOutcome::Suspend(EventToken(3)))
    });
    let mut runtime = MacroRuntime::with_registry(pend_reg);
    let mut host = ScratchHost::new();
    let parked = runtime.run_source(DOC, "test", source, &mut host).unwrap();
    assert_eq!(parked, RunOutcome::Suspended);
    let resumed = runtime
        .on_external_event_complete(EventToken(3), Ok(Value::Int(41)), &mut host)
        .unwrap()
        .unwrap();

    assert_eq!(sync_result, resumed);
    assert_eq!(resumed, RunOutcome::Finished(Value::Int(42)));
}

#[test]
fn a_failed_external_operation_kills_the_macro() {
    let mut runtime = MacroRuntime::with_registry(pausing_registry());
    let mut host = ScratchHost::new();
    runtime
        .run_source(DOC, "test", "x = pause()\n", &mut host)
        .unwrap();

    let result = runtime
        .on_external_event_complete(
            EventToken(7),
            Err(MacroError::Runtime("child exited abnormally".to_string())),
            &mut host,
        )
        .unwrap();
    assert!(result.is_err());
    assert!(!runtime.is_macro_running(DOC));
}

#[test]
fn suspension_inside_a_subroutine_keeps_the_frame_stack() {
    let reg = pausing_registry();
    let source = "\
define ask() {
  return pause() + 100
}
x = ask()
x
";
    let mut runtime = MacroRuntime::with_registry(reg);
    let mut host = ScratchHost::new();
    let outcome = runtime.run_source(DOC, "test", source, &mut host).unwrap();
    assert_eq!(outcome, RunOutcome::Suspended);

    let finished = runtime
        .on_external_event_complete(EventToken(7), Ok(Value::Int(42)), &mut host)
        .unwrap()
        .unwrap();
    assert_eq!(finished, RunOutcome::Finished(Value::Int(142)));
}
