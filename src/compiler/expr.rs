use super::*;
use crate::ast::{BinaryOp, UnaryOp};

impl Compiler<'_> {
    pub(super) fn compile_expr(&mut self, expr: &Expr) -> Result<(), MacroError> {
        match expr {
            Expr::Number(n) => self.emit_const(Value::Int(*n)),
            Expr::Str(s) => self.emit_const(Value::Str(s.clone())),
            Expr::Var(name) => {
                self.emit_load_var(name);
            }
            Expr::Index { target, index } => {
                self.compile_expr(target)?;
                self.compile_expr(index)?;
                self.emit(OpCode::ArrayGet);
            }
            Expr::Call { name, args } => {
                if args.len() > u8::MAX as usize {
                    return Err(MacroError::parse(
                        self.cur_offset as usize,
                        format!("too many arguments in call to {}", name),
                    ));
                }
                for arg in args {
                    self.compile_expr(arg)?;
                }
                let sym = Symbol::intern(name);
                let argc = args.len() as u8;
                // Statically known native subroutines bind at compile time;
                // anything else resolves by name when the call executes.
                match self.registry.id(sym) {
                    Some(id) => self.emit(OpCode::CallBuiltin { id, argc }),
                    None => self.emit(OpCode::CallName { name: sym, argc }),
                };
            }
            Expr::Unary { op, expr } => {
                self.compile_expr(expr)?;
                match op {
                    UnaryOp::Neg => self.emit(OpCode::Negate),
                    UnaryOp::Not => self.emit(OpCode::Not),
                };
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And => self.compile_and(left, right)?,
                BinaryOp::Or => self.compile_or(left, right)?,
                _ => {
                    self.compile_expr(left)?;
                    self.compile_expr(right)?;
                    self.emit(binary_opcode(*op));
                }
            },
        }
        Ok(())
    }

    /// `a && b` yields integer 0/1 and does not evaluate `b` when `a` is
    /// already false.
    fn compile_and(&mut self, left: &Expr, right: &Expr) -> Result<(), MacroError> {
        self.compile_expr(left)?;
        let short = self.emit(OpCode::JumpIfFalse(0));
        self.compile_expr(right)?;
        let short2 = self.emit(OpCode::JumpIfFalse(0));
        self.emit_const(Value::Int(1));
        let to_end = self.emit(OpCode::Jump(0));
        let false_at = self.builder.here();
        self.builder.patch_jump(short, false_at);
        self.builder.patch_jump(short2, false_at);
        self.emit_const(Value::Int(0));
        let end = self.builder.here();
        self.builder.patch_jump(to_end, end);
        Ok(())
    }

    fn compile_or(&mut self, left: &Expr, right: &Expr) -> Result<(), MacroError> {
        self.compile_expr(left)?;
        let short = self.emit(OpCode::JumpIfTrue(0));
        self.compile_expr(right)?;
        let short2 = self.emit(OpCode::JumpIfTrue(0));
        self.emit_const(Value::Int(0));
        let to_end = self.emit(OpCode::Jump(0));
        let true_at = self.builder.here();
        self.builder.patch_jump(short, true_at);
        self.builder.patch_jump(short2, true_at);
        self.emit_const(Value::Int(1));
        let end = self.builder.here();
        self.builder.patch_jump(to_end, end);
        Ok(())
    }
}

fn binary_opcode(op: BinaryOp) -> OpCode {
    match op {
        BinaryOp::Add => OpCode::Add,
        BinaryOp::Sub => OpCode::Sub,
        BinaryOp::Mul => OpCode::Mul,
        BinaryOp::Div => OpCode::Div,
        BinaryOp::Mod => OpCode::Mod,
        BinaryOp::Eq => OpCode::Eq,
        BinaryOp::Ne => OpCode::Ne,
        BinaryOp::Lt => OpCode::Lt,
        BinaryOp::Le => OpCode::Le,
        BinaryOp::Gt => OpCode::Gt,
        BinaryOp::Ge => OpCode::Ge,
        BinaryOp::Concat => OpCode::Concat,
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops lower to jumps"),
    }
}
