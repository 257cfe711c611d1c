use std::rc::Rc;

use crate::opcode::{OpCode, Program, ProgramBuilder, SYNTH_OFFSET};
use crate::symbol::Symbol;
use crate::value::Value;

/// How Repeat re-runs the most recently dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    /// Run the action once.
    Once,
    /// Run the action a fixed number of times.
    Times(i64),
    /// Run the action until the cursor stops moving (the "to end" repeat).
    ToEnd,
}

/// Wrap the last dispatched action as a tiny program. Repeat is not a
/// separate execution engine: the wrapper goes through the same VM and
/// scheduler as every compiled macro.
pub(crate) fn synthesize(mode: RepeatMode, name: &str, args: &[Value]) -> Rc<Program> {
    let mut b = ProgramBuilder::new(match mode {
        RepeatMode::Once => "command",
        RepeatMode::Times(_) => "repeat",
        RepeatMode::ToEnd => "repeat to end",
    });
    match mode {
        RepeatMode::Once => {
            emit_action(&mut b, name, args);
        }
        RepeatMode::Times(n) => {
            // count = n; while (count > 0) { action(); count -= 1 }
            let count = b.local_slot("#count");
            let n_idx = b.const_idx(Value::Int(n));
            let zero = b.const_idx(Value::Int(0));
            let one = b.const_idx(Value::Int(1));
            b.emit(OpCode::LoadConst(n_idx), SYNTH_OFFSET);
            b.emit(OpCode::StoreLocal(count), SYNTH_OFFSET);
            let cond_at = b.here();
            b.emit(OpCode::LoadLocal(count), SYNTH_OFFSET);
            b.emit(OpCode::LoadConst(zero), SYNTH_OFFSET);
            b.emit(OpCode::Gt, SYNTH_OFFSET);
            let to_end = b.emit(OpCode::JumpIfFalse(0), SYNTH_OFFSET);
            emit_action(&mut b, name, args);
            b.emit(OpCode::LoadLocal(count), SYNTH_OFFSET);
            b.emit(OpCode::LoadConst(one), SYNTH_OFFSET);
            b.emit(OpCode::Sub, SYNTH_OFFSET);
            b.emit(OpCode::StoreLocal(count), SYNTH_OFFSET);
            b.emit(OpCode::Jump(cond_at), SYNTH_OFFSET);
            let end = b.here();
            b.patch_jump(to_end, end);
        }
        RepeatMode::ToEnd => {
            // last = -1
            // while ((cur = cursor()) != last) { last = cur; action() }
            let last = b.local_slot("#last");
            let cur = b.local_slot("#cur");
            let minus_one = b.const_idx(Value::Int(-1));
            b.emit(OpCode::LoadConst(minus_one), SYNTH_OFFSET);
            b.emit(OpCode::StoreLocal(last), SYNTH_OFFSET);
            let cond_at = b.here();
            b.emit(
                OpCode::CallName {
                    name: Symbol::intern("cursor"),
                    argc: 0,
                },
                SYNTH_OFFSET,
            );
            b.emit(OpCode::StoreLocal(cur), SYNTH_OFFSET);
            b.emit(OpCode::LoadLocal(cur), SYNTH_OFFSET);
            b.emit(OpCode::LoadLocal(last), SYNTH_OFFSET);
            b.emit(OpCode::Eq, SYNTH_OFFSET);
            let to_end = b.emit(OpCode::JumpIfTrue(0), SYNTH_OFFSET);
            b.emit(OpCode::LoadLocal(cur), SYNTH_OFFSET);
            b.emit(OpCode::StoreLocal(last), SYNTH_OFFSET);
            emit_action(&mut b, name, args);
            b.emit(OpCode::Jump(cond_at), SYNTH_OFFSET);
            let end = b.here();
            b.patch_jump(to_end, end);
        }
    }
    b.emit(OpCode::Finish, SYNTH_OFFSET);
    Rc::new(b.finish())
}

fn emit_action(b: &mut ProgramBuilder, name: &str, args: &[Value]) {
    for arg in args {
        let idx = b.const_idx(arg.clone());
        b.emit(OpCode::LoadConst(idx), SYNTH_OFFSET);
    }
    b.emit(
        OpCode::CallName {
            name: Symbol::intern(name),
            argc: args.len() as u8,
        },
        SYNTH_OFFSET,
    );
    b.emit(OpCode::Pop, SYNTH_OFFSET);
}
