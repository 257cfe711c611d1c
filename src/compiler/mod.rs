use std::rc::Rc;

use crate::ast::{AssignOp, Expr, LValue, Stmt, StmtKind};
use crate::opcode::{OpCode, Program, ProgramBuilder};
use crate::parser;
use crate::registry::Registry;
use crate::symbol::Symbol;
use crate::value::{MacroError, Value};

mod expr;
mod stmt;

/// The grammar requires every statement to be terminated; a caller holding
/// a bare expression (the `-do` command line, the shell) appends the final
/// newline before compiling.
pub fn ensure_terminated(source: &str) -> String {
    if source.ends_with('\n') {
        source.to_string()
    } else {
        let mut s = String::with_capacity(source.len() + 1);
        s.push_str(source);
        s.push('\n');
        s
    }
}

/// Compile macro source into an executable program. The registry is read
/// only, used to early-bind calls to statically known native subroutines.
/// On failure no partial program is produced.
pub fn compile(
    name: &str,
    source: &str,
    registry: &Registry,
) -> Result<Rc<Program>, MacroError> {
    let stmts = parser::parse(source)?;
    let program = Compiler::new(registry, name, true).compile_program(&stmts, &[])?;
    Ok(Rc::new(program))
}

struct LoopCtx {
    break_sites: Vec<usize>,
    continue_sites: Vec<usize>,
}

pub(crate) struct Compiler<'a> {
    registry: &'a Registry,
    builder: ProgramBuilder,
    /// Top-level program (false inside a `define` body).
    is_root: bool,
    /// Byte offset of the statement being lowered, recorded per op.
    cur_offset: u32,
    loops: Vec<LoopCtx>,
    tmp_counter: usize,
}

impl<'a> Compiler<'a> {
    fn new(registry: &'a Registry, name: &str, is_root: bool) -> Self {
        Self {
            registry,
            builder: ProgramBuilder::new(name),
            is_root,
            cur_offset: 0,
            loops: Vec::new(),
            tmp_counter: 0,
        }
    }

    fn compile_program(
        mut self,
        stmts: &[Stmt],
        params: &[String],
    ) -> Result<Program, MacroError> {
        self.builder.declare_params(params);
        if !self.is_root {
            self.declare_assigned(stmts);
        }
        for stmt in stmts {
            self.compile_stmt(stmt, true)?;
        }
        if self.is_root {
            self.emit(OpCode::Finish);
        } else {
            self.emit(OpCode::LoadUndef);
            self.emit(OpCode::Return);
        }
        Ok(self.builder.finish())
    }

    /// Inside a subroutine body every assigned name is a frame-local slot,
    /// declared up front so reads before the first assignment resolve to
    /// the same slot.
    fn declare_assigned(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match &stmt.kind {
                StmtKind::Assign { target, .. } | StmtKind::Incr { target, .. } => {
                    match target {
                        LValue::Var(name) | LValue::Elem { array: name, .. } => {
                            self.builder.local_slot(name);
                        }
                    }
                }
                StmtKind::Delete { array, .. } => {
                    self.builder.local_slot(array);
                }
                StmtKind::ForIn { var, body, .. } => {
                    self.builder.local_slot(var);
                    self.declare_assigned(body);
                }
                StmtKind::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    self.declare_assigned(then_body);
                    self.declare_assigned(else_body);
                }
                StmtKind::While { body, .. } => self.declare_assigned(body),
                StmtKind::For {
                    init, step, body, ..
                } => {
                    if let Some(init) = init {
                        self.declare_assigned(std::slice::from_ref(&**init));
                    }
                    if let Some(step) = step {
                        self.declare_assigned(std::slice::from_ref(&**step));
                    }
                    self.declare_assigned(body);
                }
                StmtKind::Block(body) => self.declare_assigned(body),
                _ => {}
            }
        }
    }

    // -- emit helpers --

    fn emit(&mut self, op: OpCode) -> usize {
        self.builder.emit(op, self.cur_offset)
    }

    fn emit_const(&mut self, value: Value) {
        let idx = self.builder.const_idx(value);
        self.emit(OpCode::LoadConst(idx));
    }

    fn alloc_temp(&mut self) -> u32 {
        self.tmp_counter += 1;
        self.builder.local_slot(&format!("#t{}", self.tmp_counter))
    }

    /// Slot of `name` if it is a frame-local in this program.
    fn local_of(&mut self, name: &str) -> Option<u32> {
        if self.is_root {
            return None;
        }
        // Declared up front by declare_assigned; absent names are globals.
        let sym = Symbol::intern(name);
        self.builder.lookup_local(sym)
    }

    fn emit_load_var(&mut self, name: &str) {
        match self.local_of(name) {
            Some(slot) => self.emit(OpCode::LoadLocal(slot)),
            None => self.emit(OpCode::LoadGlobal(Symbol::intern(name))),
        };
    }

    fn emit_load_var_soft(&mut self, name: &str) {
        match self.local_of(name) {
            Some(slot) => self.emit(OpCode::LoadLocal(slot)),
            None => self.emit(OpCode::LoadGlobalSoft(Symbol::intern(name))),
        };
    }

    fn emit_store_var(&mut self, name: &str) {
        match self.local_of(name) {
            Some(slot) => self.emit(OpCode::StoreLocal(slot)),
            None => self.emit(OpCode::StoreGlobal(Symbol::intern(name))),
        };
    }

    fn error(&self, stmt: &Stmt, message: &str) -> MacroError {
        MacroError::parse(stmt.offset, message)
    }
}
