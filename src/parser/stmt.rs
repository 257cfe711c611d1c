use super::*;

impl Parser {
    pub(super) fn parse_stmt(&mut self) -> Result<Stmt, MacroError> {
        let offset = self.offset_here();
        let kind = self.parse_stmt_kind()?;
        Ok(Stmt { kind, offset })
    }

    fn parse_stmt_kind(&mut self) -> Result<StmtKind, MacroError> {
        if self.check(&TokenKind::LBrace) {
            return Ok(StmtKind::Block(self.parse_block()?));
        }
        if self.match_ident("if") {
            return self.parse_if();
        }
        if self.match_ident("while") {
            self.consume_kind(TokenKind::LParen, "'(' after while")?;
            let cond = self.parse_expr()?;
            self.consume_kind(TokenKind::RParen, "')' after condition")?;
            let body = self.parse_block_or_stmt()?;
            return Ok(StmtKind::While { cond, body });
        }
        if self.match_ident("for") {
            return self.parse_for();
        }
        if self.match_ident("break") {
            return Ok(StmtKind::Break);
        }
        if self.match_ident("continue") {
            return Ok(StmtKind::Continue);
        }
        if self.match_ident("return") {
            if self.check(&TokenKind::Newline)
                || self.check(&TokenKind::Semicolon)
                || self.check(&TokenKind::RBrace)
                || self.check(&TokenKind::Eof)
            {
                return Ok(StmtKind::Return(None));
            }
            return Ok(StmtKind::Return(Some(self.parse_expr()?)));
        }
        if self.match_ident("define") {
            return self.parse_define();
        }
        if self.match_ident("delete") {
            let array = self.consume_ident("array name after delete")?;
            self.consume_kind(TokenKind::LBracket, "'[' after array name")?;
            let index = self.parse_expr()?;
            self.consume_kind(TokenKind::RBracket, "']' after array index")?;
            return Ok(StmtKind::Delete { array, index });
        }
        // ++x / --x
        if self.match_kind(TokenKind::PlusPlus) {
            let target = self.parse_lvalue()?;
            return Ok(StmtKind::Incr { target, delta: 1 });
        }
        if self.match_kind(TokenKind::MinusMinus) {
            let target = self.parse_lvalue()?;
            return Ok(StmtKind::Incr { target, delta: -1 });
        }
        // Assignment, x++ / x--, or an expression statement.
        if let Some(name) = self.peek_ident() {
            if !is_keyword(name) {
                if let Some(kind) = self.try_parse_assign_like()? {
                    return Ok(kind);
                }
            }
        }
        Ok(StmtKind::Expr(self.parse_expr()?))
    }

    /// Assignment / increment statements start with an lvalue; everything
    /// else falls through to an expression statement.
    fn try_parse_assign_like(&mut self) -> Result<Option<StmtKind>, MacroError> {
        let next = self.peek_nth_kind(1);
        let assigns_directly = matches!(
            next,
            Some(
                TokenKind::Eq
                    | TokenKind::PlusEq
                    | TokenKind::MinusEq
                    | TokenKind::StarEq
                    | TokenKind::SlashEq
                    | TokenKind::PercentEq
                    | TokenKind::PlusPlus
                    | TokenKind::MinusMinus
            )
        );
        let assigns_through_index =
            matches!(next, Some(TokenKind::LBracket)) && self.index_assign_ahead();
        if !assigns_directly && !assigns_through_index {
            return Ok(None);
        }

        let target = self.parse_lvalue()?;
        if self.match_kind(TokenKind::PlusPlus) {
            return Ok(Some(StmtKind::Incr { target, delta: 1 }));
        }
        if self.match_kind(TokenKind::MinusMinus) {
            return Ok(Some(StmtKind::Incr { target, delta: -1 }));
        }
        let op = if self.match_kind(TokenKind::Eq) {
            AssignOp::Set
        } else if self.match_kind(TokenKind::PlusEq) {
            AssignOp::Add
        } else if self.match_kind(TokenKind::MinusEq) {
            AssignOp::Sub
        } else if self.match_kind(TokenKind::StarEq) {
            AssignOp::Mul
        } else if self.match_kind(TokenKind::SlashEq) {
            AssignOp::Div
        } else if self.match_kind(TokenKind::PercentEq) {
            AssignOp::Mod
        } else {
            return Err(self.error_here("expected assignment operator"));
        };
        let value = self.parse_expr()?;
        Ok(Some(StmtKind::Assign { target, op, value }))
    }

    /// Does `name [ ... ]` continue with an assignment operator?
    fn index_assign_ahead(&self) -> bool {
        let mut i = self.pos + 1; // at '['
        let mut depth = 0usize;
        while let Some(token) = self.tokens.get(i) {
            match token.kind {
                TokenKind::LBracket => depth += 1,
                TokenKind::RBracket => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(
                                TokenKind::Eq
                                    | TokenKind::PlusEq
                                    | TokenKind::MinusEq
                                    | TokenKind::StarEq
                                    | TokenKind::SlashEq
                                    | TokenKind::PercentEq
                                    | TokenKind::PlusPlus
                                    | TokenKind::MinusMinus
                            )
                        );
                    }
                }
                TokenKind::Newline | TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_lvalue(&mut self) -> Result<LValue, MacroError> {
        let name = self.consume_ident("variable name")?;
        if self.match_kind(TokenKind::LBracket) {
            let index = self.parse_expr()?;
            self.consume_kind(TokenKind::RBracket, "']' after array index")?;
            return Ok(LValue::Elem { array: name, index });
        }
        Ok(LValue::Var(name))
    }

    fn parse_if(&mut self) -> Result<StmtKind, MacroError> {
        self.consume_kind(TokenKind::LParen, "'(' after if")?;
        let cond = self.parse_expr()?;
        self.consume_kind(TokenKind::RParen, "')' after condition")?;
        let then_body = self.parse_block_or_stmt()?;
        self.skip_newlines();
        let else_body = if self.match_ident("else") {
            if self.peek_ident() == Some("if") {
                // else-if chain: parse the rest as a single nested statement
                let offset = self.offset_here();
                self.pos += 1;
                let kind = self.parse_if()?;
                vec![Stmt { kind, offset }]
            } else {
                self.parse_block_or_stmt()?
            }
        } else {
            Vec::new()
        };
        Ok(StmtKind::If {
            cond,
            then_body,
            else_body,
        })
    }

    fn parse_for(&mut self) -> Result<StmtKind, MacroError> {
        self.consume_kind(TokenKind::LParen, "'(' after for")?;
        // for (name in expr)
        if matches!(self.peek_kind(), TokenKind::Ident(n) if !is_keyword(n))
            && self.peek_nth_kind(1) == Some(&TokenKind::Ident("in".to_string()))
        {
            let var = self.consume_ident("loop variable")?;
            self.pos += 1; // 'in'
            let iterable = self.parse_expr()?;
            self.consume_kind(TokenKind::RParen, "')' after for-in")?;
            let body = self.parse_block_or_stmt()?;
            return Ok(StmtKind::ForIn {
                var,
                iterable,
                body,
            });
        }
        // for (init; cond; step)
        let init = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_stmt()?))
        };
        self.consume_kind(TokenKind::Semicolon, "';' after for initializer")?;
        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.consume_kind(TokenKind::Semicolon, "';' after for condition")?;
        let step = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_stmt()?))
        };
        self.consume_kind(TokenKind::RParen, "')' after for clauses")?;
        let body = self.parse_block_or_stmt()?;
        Ok(StmtKind::For {
            init,
            cond,
            step,
            body,
        })
    }

    fn parse_define(&mut self) -> Result<StmtKind, MacroError> {
        if self.in_define {
            return Err(self.error_here("nested define is not allowed"));
        }
        let name = self.consume_ident("subroutine name after define")?;
        let mut params = Vec::new();
        if self.match_kind(TokenKind::LParen) {
            if !self.check(&TokenKind::RParen) {
                params.push(self.consume_ident("parameter name")?);
                while self.match_kind(TokenKind::Comma) {
                    params.push(self.consume_ident("parameter name")?);
                }
            }
            self.consume_kind(TokenKind::RParen, "')' after parameters")?;
        }
        self.skip_newlines();
        self.in_define = true;
        let body = self.parse_block();
        self.in_define = false;
        Ok(StmtKind::Define {
            name,
            params,
            body: body?,
        })
    }

    fn parse_block_or_stmt(&mut self) -> Result<Vec<Stmt>, MacroError> {
        self.skip_newlines();
        if self.check(&TokenKind::LBrace) {
            return self.parse_block();
        }
        let stmt = self.parse_stmt()?;
        if !stmt.ends_with_brace() {
            self.expect_terminator()?;
        }
        Ok(vec![stmt])
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, MacroError> {
        self.consume_kind(TokenKind::LBrace, "'{'")?;
        let mut stmts = Vec::new();
        self.skip_terminators();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::Eof) {
                return Err(self.error_here("unexpected end of input, expected '}'"));
            }
            let stmt = self.parse_stmt()?;
            let braced = stmt.ends_with_brace();
            stmts.push(stmt);
            if !braced {
                self.expect_terminator()?;
            }
            self.skip_terminators();
        }
        self.consume_kind(TokenKind::RBrace, "'}'")?;
        Ok(stmts)
    }
}
