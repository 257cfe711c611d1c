use crate::token::{Token, TokenKind};
use crate::value::MacroError;

/// Tokenize a whole macro source. Statement terminators (newlines) are
/// real tokens; a backslash immediately before a newline continues the
/// statement. Fails on the first malformed token, reporting the byte
/// offset reached (for an unterminated string, the opening quote).
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, MacroError> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer {
    src: Vec<char>,
    pos: usize,
    /// Byte offset of `src[pos]` in the original text.
    byte: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
            byte: 0,
        }
    }

    fn next_token(&mut self) -> Result<Token, MacroError> {
        loop {
            self.skip_blanks_and_comments();
            let offset = self.byte;
            let Some(ch) = self.peek() else {
                return Ok(Token { kind: TokenKind::Eof, offset });
            };
            self.bump();
            let kind = match ch {
                '\n' => TokenKind::Newline,
                '"' => TokenKind::Str(self.read_string(offset)?),
                '0'..='9' => TokenKind::Number(self.read_number(ch)),
                '+' => {
                    if self.match_char('+') {
                        TokenKind::PlusPlus
                    } else if self.match_char('=') {
                        TokenKind::PlusEq
                    } else {
                        TokenKind::Plus
                    }
                }
                '-' => {
                    if self.match_char('-') {
                        TokenKind::MinusMinus
                    } else if self.match_char('=') {
                        TokenKind::MinusEq
                    } else {
                        TokenKind::Minus
                    }
                }
                '*' => {
                    if self.match_char('=') {
                        TokenKind::StarEq
                    } else {
                        TokenKind::Star
                    }
                }
                '/' => {
                    if self.match_char('=') {
                        TokenKind::SlashEq
                    } else {
                        TokenKind::Slash
                    }
                }
                '%' => {
                    if self.match_char('=') {
                        TokenKind::PercentEq
                    } else {
                        TokenKind::Percent
                    }
                }
                '=' => {
                    if self.match_char('=') {
                        TokenKind::EqEq
                    } else {
                        TokenKind::Eq
                    }
                }
                '!' => {
                    if self.match_char('=') {
                        TokenKind::BangEq
                    } else {
                        TokenKind::Bang
                    }
                }
                '<' => {
                    if self.match_char('=') {
                        TokenKind::Lte
                    } else {
                        TokenKind::Lt
                    }
                }
                '>' => {
                    if self.match_char('=') {
                        TokenKind::Gte
                    } else {
                        TokenKind::Gt
                    }
                }
                '&' => {
                    if self.match_char('&') {
                        TokenKind::AndAnd
                    } else {
                        return Err(MacroError::parse(offset, "expected '&&'"));
                    }
                }
                '|' => {
                    if self.match_char('|') {
                        TokenKind::OrOr
                    } else {
                        return Err(MacroError::parse(offset, "expected '||'"));
                    }
                }
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                _ => {
                    if ch.is_ascii_alphabetic() || ch == '_' || ch == '$' {
                        TokenKind::Ident(self.read_ident(ch))
                    } else {
                        return Err(MacroError::parse(
                            offset,
                            format!("unexpected character {:?}", ch),
                        ));
                    }
                }
            };
            return Ok(Token { kind, offset });
        }
    }

    /// Skip spaces, tabs, carriage returns, `#` comments, and
    /// backslash-newline continuations. Newlines themselves are tokens.
    fn skip_blanks_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.bump();
                }
                Some('\\') if self.peek_next() == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    fn read_string(&mut self, open_offset: usize) -> Result<String, MacroError> {
        let mut s = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(MacroError::parse(open_offset, "unterminated string"));
            };
            if c == '\n' {
                return Err(MacroError::parse(open_offset, "unterminated string"));
            }
            self.bump();
            match c {
                '"' => return Ok(s),
                '\\' => {
                    let Some(esc) = self.peek() else {
                        return Err(MacroError::parse(open_offset, "unterminated string"));
                    };
                    self.bump();
                    match esc {
                        'n' => s.push('\n'),
                        't' => s.push('\t'),
                        '"' => s.push('"'),
                        '\\' => s.push('\\'),
                        other => s.push(other),
                    }
                }
                other => s.push(other),
            }
        }
    }

    /// Decimal literal. Digits accumulate with wrap-around, the same
    /// arithmetic the language uses everywhere else.
    fn read_number(&mut self, first: char) -> i64 {
        let mut n = (first as u8 - b'0') as i64;
        while let Some(c) = self.peek() {
            if let Some(d) = c.to_digit(10) {
                n = n.wrapping_mul(10).wrapping_add(d as i64);
                self.bump();
            } else {
                break;
            }
        }
        n
    }

    fn read_ident(&mut self, first: char) -> String {
        let mut ident = String::new();
        ident.push(first);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        ident
    }

    fn bump(&mut self) {
        let c = self.src[self.pos];
        self.pos += 1;
        self.byte += c.len_utf8();
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }
}
