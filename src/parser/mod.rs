use crate::ast::{AssignOp, BinaryOp, Expr, LValue, Stmt, StmtKind, UnaryOp};
use crate::lexer;
use crate::token::{Token, TokenKind};
use crate::value::MacroError;

mod expr;
mod stmt;

const KEYWORDS: &[&str] = &[
    "if", "else", "while", "for", "in", "break", "continue", "return", "define", "delete",
];

/// Parse a whole macro source into statements. The grammar requires every
/// simple statement to be terminated (newline or `;`), including the last
/// one — callers compiling a bare expression append a newline first.
pub(crate) fn parse(source: &str) -> Result<Vec<Stmt>, MacroError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    parser.parse_program()
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Set while parsing a `define` body; `define` does not nest.
    in_define: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            in_define: false,
        }
    }

    fn parse_program(&mut self) -> Result<Vec<Stmt>, MacroError> {
        let mut stmts = Vec::new();
        self.skip_terminators();
        while !self.check(&TokenKind::Eof) {
            let stmt = self.parse_stmt()?;
            let braced = stmt.ends_with_brace();
            stmts.push(stmt);
            if !braced {
                self.expect_terminator()?;
            }
            self.skip_terminators();
        }
        Ok(stmts)
    }

    // -- token helpers --

    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_nth_kind(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + n).map(|t| &t.kind)
    }

    fn offset_here(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].offset
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(&kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn consume_kind(&mut self, kind: TokenKind, what: &str) -> Result<(), MacroError> {
        if self.match_kind(kind) {
            Ok(())
        } else {
            Err(self.error_here(format!("expected {}", what)))
        }
    }

    fn peek_ident(&self) -> Option<&str> {
        match self.peek_kind() {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }

    fn match_ident(&mut self, name: &str) -> bool {
        if self.peek_ident() == Some(name) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn consume_ident(&mut self, what: &str) -> Result<String, MacroError> {
        match self.peek_kind() {
            TokenKind::Ident(name) if !is_keyword(name) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error_here(format!("expected {}", what))),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> MacroError {
        MacroError::parse(self.offset_here(), message)
    }

    // -- statement termination --

    fn expect_terminator(&mut self) -> Result<(), MacroError> {
        if self.match_kind(TokenKind::Newline) || self.match_kind(TokenKind::Semicolon) {
            return Ok(());
        }
        if self.check(&TokenKind::RBrace) {
            return Ok(());
        }
        if self.check(&TokenKind::Eof) {
            return Err(self.error_here("unexpected end of input, statement not terminated"));
        }
        Err(self.error_here("expected end of statement"))
    }

    fn skip_terminators(&mut self) {
        while self.match_kind(TokenKind::Newline) || self.match_kind(TokenKind::Semicolon) {}
    }

    fn skip_newlines(&mut self) {
        while self.match_kind(TokenKind::Newline) {}
    }
}

fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

impl Stmt {
    /// Statements ending in `}` need no explicit terminator.
    fn ends_with_brace(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::If { .. }
                | StmtKind::While { .. }
                | StmtKind::For { .. }
                | StmtKind::ForIn { .. }
                | StmtKind::Define { .. }
                | StmtKind::Block(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_final_newline_is_an_error() {
        let err = parse("beep()").unwrap_err();
        match err {
            MacroError::Parse { offset, .. } => assert_eq!(offset, 6),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn simple_call_statement() {
        let stmts = parse("beep()\n").unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(
            stmts[0].kind,
            StmtKind::Expr(Expr::Call {
                name: "beep".into(),
                args: vec![],
            })
        );
    }

    #[test]
    fn keywords_are_not_variables() {
        assert!(parse("x = while\n").is_err());
    }

    #[test]
    fn nested_define_is_rejected() {
        let src = "define outer {\n  define inner {\n    beep()\n  }\n}\n";
        assert!(parse(src).is_err());
    }

    #[test]
    fn statement_offsets_are_recorded() {
        let stmts = parse("beep()\nx = 1\n").unwrap();
        assert_eq!(stmts[0].offset, 0);
        assert_eq!(stmts[1].offset, 7);
    }
}
