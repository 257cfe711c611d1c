use std::rc::Rc;

use tracing::debug;

use crate::opcode::{OpCode, Program, ProgramBuilder, SYNTH_OFFSET};
use crate::symbol::Symbol;
use crate::value::{MacroError, Value};

/// The learn/replay keystroke recorder.
///
/// There is one recorder per process, never per document: keystrokes are a
/// single serial stream, so only one recording can be live at a time. Each
/// captured action becomes a call instruction with constant-folded literal
/// arguments — no variables, no control flow — and the finished recording
/// replays through the VM exactly like a compiled macro.
#[derive(Debug, Default)]
pub struct Recorder {
    state: State,
    last: Option<Rc<Program>>,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Idle,
    Recording(ProgramBuilder),
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, State::Recording(_))
    }

    pub fn has_recording(&self) -> bool {
        self.last.is_some()
    }

    pub fn begin_learn(&mut self) -> Result<(), MacroError> {
        if self.is_recording() {
            return Err(MacroError::runtime("learn mode is already in use"));
        }
        debug!("learn mode started");
        self.state = State::Recording(ProgramBuilder::new("learn/replay"));
        Ok(())
    }

    /// Capture one dispatched action. A no-op unless a recording is live.
    pub fn record_action(&mut self, name: &str, args: &[Value]) {
        let State::Recording(builder) = &mut self.state else {
            return;
        };
        for arg in args {
            let idx = builder.const_idx(arg.clone());
            builder.emit(OpCode::LoadConst(idx), SYNTH_OFFSET);
        }
        builder.emit(
            OpCode::CallName {
                name: Symbol::intern(name),
                argc: args.len() as u8,
            },
            SYNTH_OFFSET,
        );
        builder.emit(OpCode::Pop, SYNTH_OFFSET);
    }

    /// Finalize the recording; it becomes the program `replay` hands out.
    pub fn finish_learn(&mut self) -> Result<(), MacroError> {
        let State::Recording(mut builder) = std::mem::take(&mut self.state) else {
            return Err(MacroError::runtime("no learn session to finish"));
        };
        builder.emit(OpCode::Finish, SYNTH_OFFSET);
        debug!("learn mode finished");
        self.last = Some(Rc::new(builder.finish()));
        Ok(())
    }

    /// Discard an in-progress recording; the previous finished one (if
    /// any) stays available.
    pub fn cancel_learn(&mut self) {
        if self.is_recording() {
            debug!("learn mode cancelled");
        }
        self.state = State::Idle;
    }

    pub fn replay(&self) -> Option<Rc<Program>> {
        self.last.clone()
    }
}
