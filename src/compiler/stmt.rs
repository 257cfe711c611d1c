use super::*;

impl Compiler<'_> {
    pub(super) fn compile_stmt(&mut self, stmt: &Stmt, top: bool) -> Result<(), MacroError> {
        self.cur_offset = stmt.offset as u32;
        match &stmt.kind {
            StmtKind::Assign { target, op, value } => {
                self.compile_assign(target, *op, value)?;
            }
            StmtKind::Incr { target, delta } => {
                let value = Expr::Number(*delta);
                self.compile_assign(target, AssignOp::Add, &value)?;
            }
            StmtKind::Expr(e) => {
                self.compile_expr(e)?;
                // The last top-level expression value becomes the program
                // result, so `-do` and the shell have something to show.
                if top && self.is_root {
                    self.emit(OpCode::StoreResult);
                } else {
                    self.emit(OpCode::Pop);
                }
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                self.compile_expr(cond)?;
                let to_else = self.emit(OpCode::JumpIfFalse(0));
                self.compile_stmts(then_body)?;
                if else_body.is_empty() {
                    let here = self.builder.here();
                    self.builder.patch_jump(to_else, here);
                } else {
                    let to_end = self.emit(OpCode::Jump(0));
                    let here = self.builder.here();
                    self.builder.patch_jump(to_else, here);
                    self.compile_stmts(else_body)?;
                    let here = self.builder.here();
                    self.builder.patch_jump(to_end, here);
                }
            }
            StmtKind::While { cond, body } => {
                let cond_at = self.builder.here();
                self.compile_expr(cond)?;
                let to_end = self.emit(OpCode::JumpIfFalse(0));
                self.loops.push(LoopCtx {
                    break_sites: Vec::new(),
                    continue_sites: Vec::new(),
                });
                self.compile_stmts(body)?;
                self.emit(OpCode::Jump(cond_at));
                let end = self.builder.here();
                self.builder.patch_jump(to_end, end);
                self.patch_loop(end, cond_at);
            }
            StmtKind::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.compile_stmt(init, false)?;
                }
                let cond_at = self.builder.here();
                let to_end = match cond {
                    Some(cond) => {
                        self.compile_expr(cond)?;
                        Some(self.emit(OpCode::JumpIfFalse(0)))
                    }
                    None => None,
                };
                self.loops.push(LoopCtx {
                    break_sites: Vec::new(),
                    continue_sites: Vec::new(),
                });
                self.compile_stmts(body)?;
                let step_at = self.builder.here();
                if let Some(step) = step {
                    self.compile_stmt(step, false)?;
                }
                self.emit(OpCode::Jump(cond_at));
                let end = self.builder.here();
                if let Some(site) = to_end {
                    self.builder.patch_jump(site, end);
                }
                self.patch_loop(end, step_at);
            }
            StmtKind::ForIn {
                var,
                iterable,
                body,
            } => {
                let keys = self.alloc_temp();
                let idx = self.alloc_temp();
                self.compile_expr(iterable)?;
                self.emit(OpCode::ArrayKeys);
                self.emit(OpCode::StoreLocal(keys));
                self.emit_const(Value::Int(0));
                self.emit(OpCode::StoreLocal(idx));
                let cond_at = self.builder.here();
                self.emit(OpCode::LoadLocal(idx));
                self.emit(OpCode::LoadLocal(keys));
                self.emit(OpCode::ArraySize);
                self.emit(OpCode::Lt);
                let to_end = self.emit(OpCode::JumpIfFalse(0));
                self.emit(OpCode::LoadLocal(keys));
                self.emit(OpCode::LoadLocal(idx));
                self.emit(OpCode::ArrayGet);
                self.emit_store_var(var);
                self.loops.push(LoopCtx {
                    break_sites: Vec::new(),
                    continue_sites: Vec::new(),
                });
                self.compile_stmts(body)?;
                let step_at = self.builder.here();
                self.emit(OpCode::LoadLocal(idx));
                self.emit_const(Value::Int(1));
                self.emit(OpCode::Add);
                self.emit(OpCode::StoreLocal(idx));
                self.emit(OpCode::Jump(cond_at));
                let end = self.builder.here();
                self.builder.patch_jump(to_end, end);
                self.patch_loop(end, step_at);
            }
            StmtKind::Break => {
                let site = self.emit(OpCode::Jump(0));
                match self.loops.last_mut() {
                    Some(ctx) => ctx.break_sites.push(site),
                    None => return Err(self.error(stmt, "break outside a loop")),
                }
            }
            StmtKind::Continue => {
                let site = self.emit(OpCode::Jump(0));
                match self.loops.last_mut() {
                    Some(ctx) => ctx.continue_sites.push(site),
                    None => return Err(self.error(stmt, "continue outside a loop")),
                }
            }
            StmtKind::Return(expr) => {
                match expr {
                    Some(e) => self.compile_expr(e)?,
                    None => {
                        self.emit(OpCode::LoadUndef);
                    }
                }
                self.emit(OpCode::Return);
            }
            StmtKind::Define { name, params, body } => {
                let sub = Compiler::new(self.registry, name, false)
                    .compile_program(body, params)?;
                let idx = self.builder.add_sub(Rc::new(sub));
                self.emit(OpCode::DefineSub {
                    name: Symbol::intern(name),
                    sub: idx,
                });
            }
            StmtKind::Delete { array, index } => {
                self.emit_load_var(array);
                self.compile_expr(index)?;
                self.emit(OpCode::ArrayRemove);
                self.emit_store_var(array);
            }
            StmtKind::Block(body) => self.compile_stmts(body)?,
        }
        Ok(())
    }

    fn compile_stmts(&mut self, stmts: &[Stmt]) -> Result<(), MacroError> {
        for stmt in stmts {
            self.compile_stmt(stmt, false)?;
        }
        Ok(())
    }

    fn patch_loop(&mut self, break_to: u32, continue_to: u32) {
        let ctx = self.loops.pop().expect("loop context");
        for site in ctx.break_sites {
            self.builder.patch_jump(site, break_to);
        }
        for site in ctx.continue_sites {
            self.builder.patch_jump(site, continue_to);
        }
    }

    fn compile_assign(
        &mut self,
        target: &LValue,
        op: AssignOp,
        value: &Expr,
    ) -> Result<(), MacroError> {
        match target {
            LValue::Var(name) => {
                if op != AssignOp::Set {
                    self.emit_load_var(name);
                }
                self.compile_expr(value)?;
                if let Some(opcode) = arith_op(op) {
                    self.emit(opcode);
                }
                self.emit_store_var(name);
            }
            LValue::Elem { array, index } => {
                // The index lands in a temp so it is evaluated exactly once
                // even for compound assignment.
                let idx = self.alloc_temp();
                self.compile_expr(index)?;
                self.emit(OpCode::StoreLocal(idx));
                // Soft load: assigning into a fresh name creates the array.
                self.emit_load_var_soft(array);
                self.emit(OpCode::LoadLocal(idx));
                if op != AssignOp::Set {
                    self.emit_load_var(array);
                    self.emit(OpCode::LoadLocal(idx));
                    self.emit(OpCode::ArrayGet);
                }
                self.compile_expr(value)?;
                if let Some(opcode) = arith_op(op) {
                    self.emit(opcode);
                }
                self.emit(OpCode::ArrayInsert);
                self.emit_store_var(array);
            }
        }
        Ok(())
    }
}

fn arith_op(op: AssignOp) -> Option<OpCode> {
    match op {
        AssignOp::Set => None,
        AssignOp::Add => Some(OpCode::Add),
        AssignOp::Sub => Some(OpCode::Sub),
        AssignOp::Mul => Some(OpCode::Mul),
        AssignOp::Div => Some(OpCode::Div),
        AssignOp::Mod => Some(OpCode::Mod),
    }
}
