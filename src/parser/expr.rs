use super::*;

impl Parser {
    pub(super) fn parse_expr(&mut self) -> Result<Expr, MacroError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, MacroError> {
        let mut expr = self.parse_and()?;
        while self.match_kind(TokenKind::OrOr) {
            let right = self.parse_and()?;
            expr = binary(BinaryOp::Or, expr, right);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, MacroError> {
        let mut expr = self.parse_concat()?;
        while self.match_kind(TokenKind::AndAnd) {
            let right = self.parse_concat()?;
            expr = binary(BinaryOp::And, expr, right);
        }
        Ok(expr)
    }

    /// Adjacency concatenation: two operands with nothing between them
    /// concatenate as strings (`"col " n ":"`).
    fn parse_concat(&mut self) -> Result<Expr, MacroError> {
        let mut expr = self.parse_equality()?;
        while self.starts_operand() {
            let right = self.parse_equality()?;
            expr = binary(BinaryOp::Concat, expr, right);
        }
        Ok(expr)
    }

    fn starts_operand(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::LParen => true,
            TokenKind::Ident(name) => !is_keyword(name),
            _ => false,
        }
    }

    fn parse_equality(&mut self) -> Result<Expr, MacroError> {
        let mut expr = self.parse_comparison()?;
        loop {
            let op = if self.match_kind(TokenKind::EqEq) {
                BinaryOp::Eq
            } else if self.match_kind(TokenKind::BangEq) {
                BinaryOp::Ne
            } else {
                return Ok(expr);
            };
            let right = self.parse_comparison()?;
            expr = binary(op, expr, right);
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, MacroError> {
        let mut expr = self.parse_additive()?;
        loop {
            let op = if self.match_kind(TokenKind::Lt) {
                BinaryOp::Lt
            } else if self.match_kind(TokenKind::Lte) {
                BinaryOp::Le
            } else if self.match_kind(TokenKind::Gt) {
                BinaryOp::Gt
            } else if self.match_kind(TokenKind::Gte) {
                BinaryOp::Ge
            } else {
                return Ok(expr);
            };
            let right = self.parse_additive()?;
            expr = binary(op, expr, right);
        }
    }

    fn parse_additive(&mut self) -> Result<Expr, MacroError> {
        let mut expr = self.parse_term()?;
        loop {
            let op = if self.match_kind(TokenKind::Plus) {
                BinaryOp::Add
            } else if self.match_kind(TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                return Ok(expr);
            };
            let right = self.parse_term()?;
            expr = binary(op, expr, right);
        }
    }

    fn parse_term(&mut self) -> Result<Expr, MacroError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = if self.match_kind(TokenKind::Star) {
                BinaryOp::Mul
            } else if self.match_kind(TokenKind::Slash) {
                BinaryOp::Div
            } else if self.match_kind(TokenKind::Percent) {
                BinaryOp::Mod
            } else {
                return Ok(expr);
            };
            let right = self.parse_unary()?;
            expr = binary(op, expr, right);
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, MacroError> {
        if self.match_kind(TokenKind::Minus) {
            let expr = self.parse_unary()?;
            // Fold the sign into number literals so `-1` is one constant.
            if let Expr::Number(n) = expr {
                return Ok(Expr::Number(n.wrapping_neg()));
            }
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }
        if self.match_kind(TokenKind::Bang) {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, MacroError> {
        let mut expr = self.parse_primary()?;
        while self.match_kind(TokenKind::LBracket) {
            let index = self.parse_expr()?;
            self.consume_kind(TokenKind::RBracket, "']' after array index")?;
            expr = Expr::Index {
                target: Box::new(expr),
                index: Box::new(index),
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, MacroError> {
        match self.peek_kind().clone() {
            TokenKind::Number(n) => {
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.pos += 1;
                Ok(Expr::Str(s))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.consume_kind(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::Ident(name) => {
                if is_keyword(&name) {
                    return Err(self.error_here(format!("unexpected keyword '{}'", name)));
                }
                self.pos += 1;
                if self.match_kind(TokenKind::LParen) {
                    let mut args = Vec::new();
                    if !self.check(&TokenKind::RParen) {
                        args.push(self.parse_expr()?);
                        while self.match_kind(TokenKind::Comma) {
                            args.push(self.parse_expr()?);
                        }
                    }
                    self.consume_kind(TokenKind::RParen, "')' after arguments")?;
                    return Ok(Expr::Call { name, args });
                }
                Ok(Expr::Var(name))
            }
            _ => Err(self.error_here("expected an expression")),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn expr_of(source: &str) -> Expr {
        let stmts = parse(source).unwrap();
        match stmts.into_iter().next().unwrap().kind {
            StmtKind::Expr(e) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn precedence_mul_over_add() {
        let e = expr_of("1 + 2 * 3\n");
        assert_eq!(
            e,
            Expr::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expr::Number(1)),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(Expr::Number(2)),
                    right: Box::new(Expr::Number(3)),
                }),
            }
        );
    }

    #[test]
    fn adjacency_concatenates() {
        let e = expr_of("\"line \" n\n");
        assert_eq!(
            e,
            Expr::Binary {
                op: BinaryOp::Concat,
                left: Box::new(Expr::Str("line ".into())),
                right: Box::new(Expr::Var("n".into())),
            }
        );
    }

    #[test]
    fn minus_binds_as_subtraction_not_concat() {
        let e = expr_of("a - 1\n");
        assert!(matches!(e, Expr::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn negative_literal_folds() {
        assert_eq!(expr_of("-7\n"), Expr::Number(-7));
    }

    #[test]
    fn call_with_arguments() {
        let e = expr_of("substring(s, 0, 3)\n");
        assert_eq!(
            e,
            Expr::Call {
                name: "substring".into(),
                args: vec![
                    Expr::Var("s".into()),
                    Expr::Number(0),
                    Expr::Number(3)
                ],
            }
        );
    }
}
