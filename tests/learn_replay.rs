//! Learn/replay: dispatched actions are captured literally and replay in
//! order through the same VM, including actions that suspend.

use std::cell::RefCell;
use std::rc::Rc;

use edmacro::{
    Arity, BuiltinOutcome, DocumentId, EventToken, MacroRuntime, Registry, RunOutcome,
    ScratchHost, Value,
};

const DOC: DocumentId = DocumentId(1);

type CallLog = Rc<RefCell<Vec<(String, Vec<Value>)>>>;

fn logging_registry(log: &CallLog) -> Registry {
    let mut reg = Registry::new();
    for name in ["ins", "move_to"] {
        let l = Rc::clone(log);
        reg.register(name, Arity::AtLeast(0), move |_, args| {
            l.borrow_mut().push((name.to_string(), args.to_vec()));
            Ok(BuiltinOutcome::Done(Value::Undef))
        });
    }
    let l = Rc::clone(log);
    reg.register("run_shell", Arity::Exact(1), move |_, args| {
        l.borrow_mut().push(("run_shell".to_string(), args.to_vec()));
        Ok(BuiltinOutcome::Suspend(EventToken(1)))
    });
    reg
}

#[test]
fn recorder_round_trip_replays_the_exact_sequence() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut runtime = MacroRuntime::with_registry(logging_registry(&log));
    let mut host = ScratchHost::new();

    runtime.begin_learn().unwrap();
    runtime
        .dispatch_action(DOC, "ins", &[Value::Str("a".into())], &mut host)
        .unwrap();
    runtime
        .dispatch_action(DOC, "move_to", &[Value::Int(2), Value::Int(0)], &mut host)
        .unwrap();
    runtime
        .dispatch_action(DOC, "ins", &[Value::Str("b".into())], &mut host)
        .unwrap();
    runtime.finish_learn().unwrap();

    let recorded_live: Vec<_> = log.borrow_mut().drain(..).collect();
    let replayed = runtime.replay(DOC, &mut host).unwrap();
    assert_eq!(replayed, RunOutcome::Finished(Value::Undef));
    let recorded_replay: Vec<_> = log.borrow_mut().drain(..).collect();

    assert_eq!(recorded_live, recorded_replay);
    assert_eq!(
        recorded_replay,
        vec![
            ("ins".to_string(), vec![Value::Str("a".into())]),
            ("move_to".to_string(), vec![Value::Int(2), Value::Int(0)]),
            ("ins".to_string(), vec![Value::Str("b".into())]),
        ]
    );
}

#[test]
fn only_one_learn_session_exists_process_wide() {
    let mut runtime = MacroRuntime::new();
    runtime.begin_learn().unwrap();
    assert!(runtime.begin_learn().is_err());
    runtime.cancel_learn();
    runtime.begin_learn().unwrap();
    assert!(runtime.is_learning());
}

#[test]
fn cancelled_recordings_are_discarded() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut runtime = MacroRuntime::with_registry(logging_registry(&log));
    let mut host = ScratchHost::new();

    runtime.begin_learn().unwrap();
    runtime
        .dispatch_action(DOC, "ins", &[Value::Str("junk".into())], &mut host)
        .unwrap();
    runtime.cancel_learn();
    assert!(!runtime.can_replay());
    assert!(runtime.replay(DOC, &mut host).is_err());
}

#[test]
fn a_recorded_suspending_action_replays_asynchronously() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut runtime = MacroRuntime::with_registry(logging_registry(&log));
    let mut host = ScratchHost::new();

    runtime.begin_learn().unwrap();
    let live = runtime
        .dispatch_action(DOC, "run_shell", &[Value::Str("ls".into())], &mut host)
        .unwrap();
    assert_eq!(live, RunOutcome::Suspended);
    runtime
        .on_external_event_complete(EventToken(1), Ok(Value::Str("out".into())), &mut host)
        .unwrap()
        .unwrap();
    runtime.finish_learn().unwrap();
    log.borrow_mut().clear();

    // Replay parks at the same action and resumes the same way.
    let replayed = runtime.replay(DOC, &mut host).unwrap();
    assert_eq!(replayed, RunOutcome::Suspended);
    assert!(runtime.is_macro_running(DOC));
    let finished = runtime
        .on_external_event_complete(EventToken(1), Ok(Value::Str("out".into())), &mut host)
        .unwrap()
        .unwrap();
    assert_eq!(finished, RunOutcome::Finished(Value::Undef));
    assert_eq!(
        log.borrow().as_slice(),
        &[("run_shell".to_string(), vec![Value::Str("ls".into())])]
    );
}

#[test]
fn actions_dispatched_outside_learn_are_not_recorded() {
    let log: CallLog = Rc::new(RefCell::new(Vec::new()));
    let mut runtime = MacroRuntime::with_registry(logging_registry(&log));
    let mut host = ScratchHost::new();

    runtime
        .dispatch_action(DOC, "ins", &[Value::Str("x".into())], &mut host)
        .unwrap();
    runtime.begin_learn().unwrap();
    runtime
        .dispatch_action(DOC, "ins", &[Value::Str("y".into())], &mut host)
        .unwrap();
    runtime.finish_learn().unwrap();
    log.borrow_mut().clear();

    runtime.replay(DOC, &mut host).unwrap();
    assert_eq!(
        log.borrow().as_slice(),
        &[("ins".to_string(), vec![Value::Str("y".into())])]
    );
}
