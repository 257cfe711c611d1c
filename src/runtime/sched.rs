//! Per-document macro lifecycle: the check-and-set "one macro per
//! document" discipline, completion routing for suspended states, and
//! idle-time continuation of preempted ones.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::host::DocumentHost;
use crate::opcode::Program;
use crate::registry::EventToken;
use crate::value::{MacroError, Value};
use crate::vm::{CallState, ExecContext, Step};

use super::{DocumentId, MacroRuntime, RunOutcome};

/// Instructions executed per entry before a macro is parked for the next
/// idle poll, keeping the host event loop responsive through long loops.
const SLICE_OPS: usize = 8192;

/// Execution state of the one live macro a document may have.
#[derive(Debug)]
pub(super) enum DocState {
    /// Re-entry guard held while the VM is being driven.
    Stepping,
    /// Parked at a suspending native call, waiting for `token`.
    Suspended(SuspendedState),
    /// Parked by the instruction budget, waiting for the next poll.
    Preempted(CallState),
}

/// A call state frozen at the instant a native call suspended, together
/// with the completion token that will wake it. Nothing mutates the state
/// while it is parked here.
#[derive(Debug)]
pub(super) struct SuspendedState {
    state: CallState,
    token: EventToken,
}

enum DriveEnd {
    Finished(Value),
    Suspended(EventToken, CallState),
    Preempted(CallState),
    Failed(MacroError),
}

impl MacroRuntime {
    /// Start a macro on a document. A document whose macro is still live
    /// (parked or running) rejects the new invocation outright — the
    /// first VM is untouched and nothing is queued.
    pub fn run_macro(
        &mut self,
        doc: DocumentId,
        program: Rc<Program>,
        host: &mut dyn DocumentHost,
    ) -> Result<RunOutcome, MacroError> {
        if self.docs.contains_key(&doc) {
            return Err(MacroError::AlreadyRunning);
        }
        debug!(%doc, name = program.name(), "macro start");
        self.docs.insert(doc, DocState::Stepping);
        let state = CallState::new(program);
        self.drive(doc, state, host)
    }

    /// True while the document's macro is neither finished nor failed;
    /// hosts use this to lock duplicate invocations out of the UI.
    pub fn is_macro_running(&self, doc: DocumentId) -> bool {
        self.docs.contains_key(&doc)
    }

    /// Deliver the result of an external operation. Returns `None` when no
    /// macro waits on `token` (e.g. the operation outlived a cancel).
    pub fn on_external_event_complete(
        &mut self,
        token: EventToken,
        result: Result<Value, MacroError>,
        host: &mut dyn DocumentHost,
    ) -> Option<Result<RunOutcome, MacroError>> {
        let doc = self.docs.iter().find_map(|(d, s)| match s {
            DocState::Suspended(ss) if ss.token == token => Some(*d),
            _ => None,
        });
        let Some(doc) = doc else {
            warn!(token = token.0, "completion for unknown token ignored");
            return None;
        };
        let Some(DocState::Suspended(ss)) = self.docs.remove(&doc) else {
            unreachable!("document state changed underneath us");
        };
        let mut state = ss.state;
        debug!(%doc, token = token.0, "macro resume");
        match result {
            Ok(value) => {
                if let Err(e) = state.resume_with(value) {
                    return Some(Err(e));
                }
                self.docs.insert(doc, DocState::Stepping);
                Some(self.drive(doc, state, host))
            }
            Err(e) => {
                // The pending operation failed; the macro dies with it.
                state.cancel();
                Some(Err(e))
            }
        }
    }

    /// Idle-time continuation hook. Gives a macro parked by the slice
    /// budget another slice; returns `None` when the document has nothing
    /// poll-able (idle, or waiting on an event instead).
    pub fn poll(
        &mut self,
        doc: DocumentId,
        host: &mut dyn DocumentHost,
    ) -> Option<Result<RunOutcome, MacroError>> {
        if !matches!(self.docs.get(&doc), Some(DocState::Preempted(_))) {
            return None;
        }
        let Some(DocState::Preempted(state)) = self.docs.remove(&doc) else {
            unreachable!("document state changed underneath us");
        };
        self.docs.insert(doc, DocState::Stepping);
        Some(self.drive(doc, state, host))
    }

    /// Cancel the document's macro immediately: every frame is released
    /// before this returns. Yields the token of a still-pending external
    /// operation so the host can abort it.
    pub fn cancel_macro(&mut self, doc: DocumentId) -> Option<EventToken> {
        let token = match self.docs.remove(&doc)? {
            DocState::Suspended(mut ss) => ss.state.cancel(),
            DocState::Preempted(mut state) => state.cancel(),
            DocState::Stepping => None,
        };
        debug!(%doc, "macro cancelled");
        token
    }

    /// Step the state until it finishes, suspends, errors, or exhausts
    /// its instruction slice, then record where it ended up.
    fn drive(
        &mut self,
        doc: DocumentId,
        mut state: CallState,
        host: &mut dyn DocumentHost,
    ) -> Result<RunOutcome, MacroError> {
        let registry = Rc::clone(&self.registry);
        let end = {
            let mut cx = ExecContext {
                registry: &registry,
                host,
                globals: &mut self.globals,
                subs: &mut self.subs,
            };
            let mut executed = 0usize;
            loop {
                match state.step(&mut cx) {
                    Ok(Step::Continue) => {
                        executed += 1;
                        if executed >= SLICE_OPS {
                            break DriveEnd::Preempted(state);
                        }
                    }
                    Ok(Step::Finished(v)) => break DriveEnd::Finished(v),
                    Ok(Step::Suspend(token)) => break DriveEnd::Suspended(token, state),
                    Err(e) => break DriveEnd::Failed(e),
                }
            }
        };
        match end {
            DriveEnd::Finished(value) => {
                self.docs.remove(&doc);
                debug!(%doc, "macro finished");
                Ok(RunOutcome::Finished(value))
            }
            DriveEnd::Suspended(token, state) => {
                self.docs
                    .insert(doc, DocState::Suspended(SuspendedState { state, token }));
                Ok(RunOutcome::Suspended)
            }
            DriveEnd::Preempted(state) => {
                debug!(%doc, "macro preempted, awaiting poll");
                self.docs.insert(doc, DocState::Preempted(state));
                Ok(RunOutcome::Suspended)
            }
            DriveEnd::Failed(e) => {
                self.docs.remove(&doc);
                debug!(%doc, error = %e, "macro failed");
                Err(e)
            }
        }
    }
}
