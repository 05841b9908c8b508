//! Hand-rolled lexer, one `Token` per call to [`Lexer::next_token`].
//!
//! Grounded on the teacher's `lexer/token.rs` `Token { kind, lexeme, line }`
//! shape, adapted from s-expression atoms to a small C-like token set.

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Ident(String),

    KwFn,
    KwLet,
    KwIf,
    KwElse,
    KwWhile,
    KwReturn,
    KwBreak,
    KwContinue,
    KwInt,
    KwFloat,
    KwVoid,

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,

    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Arrow,

    Eof,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
}

fn keyword(word: &str) -> Option<TokenKind> {
    Some(match word {
        "fn" => TokenKind::KwFn,
        "let" => TokenKind::KwLet,
        "if" => TokenKind::KwIf,
        "else" => TokenKind::KwElse,
        "while" => TokenKind::KwWhile,
        "return" => TokenKind::KwReturn,
        "break" => TokenKind::KwBreak,
        "continue" => TokenKind::KwContinue,
        "int" => TokenKind::KwInt,
        "float" => TokenKind::KwFloat,
        "void" => TokenKind::KwVoid,
        _ => return None,
    })
}

/// Scans one source string into a flat token list (no streaming / lookahead
/// API — the parser indexes into the returned `Vec` directly). Unrecognized
/// bytes are skipped rather than raised as an error; lexical diagnostics are
/// out of scope (front-end errors here are the ones spec-listed in
/// `FrontendError`'s doc comment).
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src: src.as_bytes(), pos: 0, line: 1 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn make(&self, kind: TokenKind, lexeme: String, line: u32) -> Token {
        Token { kind, lexeme, line }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let line = self.line;
        let Some(c) = self.peek() else {
            return self.make(TokenKind::Eof, String::new(), line);
        };

        if c.is_ascii_digit() {
            return self.lex_number(line);
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            return self.lex_ident_or_keyword(line);
        }

        self.bump();
        let (kind, len) = match c {
            b'+' => (TokenKind::Plus, 1),
            b'-' => {
                if self.peek() == Some(b'>') {
                    self.bump();
                    (TokenKind::Arrow, 2)
                } else {
                    (TokenKind::Minus, 1)
                }
            }
            b'*' => (TokenKind::Star, 1),
            b'/' => (TokenKind::Slash, 1),
            b'%' => (TokenKind::Percent, 1),
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    (TokenKind::EqEq, 2)
                } else {
                    (TokenKind::Eq, 1)
                }
            }
            b'!' if self.peek() == Some(b'=') => {
                self.bump();
                (TokenKind::NotEq, 2)
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    (TokenKind::Le, 2)
                } else {
                    (TokenKind::Lt, 1)
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    (TokenKind::Ge, 2)
                } else {
                    (TokenKind::Gt, 1)
                }
            }
            b'(' => (TokenKind::LParen, 1),
            b')' => (TokenKind::RParen, 1),
            b'{' => (TokenKind::LBrace, 1),
            b'}' => (TokenKind::RBrace, 1),
            b'[' => (TokenKind::LBracket, 1),
            b']' => (TokenKind::RBracket, 1),
            b',' => (TokenKind::Comma, 1),
            b';' => (TokenKind::Semicolon, 1),
            b':' => (TokenKind::Colon, 1),
            other => {
                // Unrecognized byte: emit it as its own one-char token so
                // the parser's error recovery has something to skip past.
                return self.make(TokenKind::Ident((other as char).to_string()), (other as char).to_string(), line);
            }
        };
        let lexeme = std::str::from_utf8(&self.src[self.pos - len..self.pos]).unwrap_or("").to_string();
        self.make(kind, lexeme, line)
    }

    fn lex_number(&mut self, line: u32) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("0");
        if is_float {
            self.make(TokenKind::Float(text.parse().unwrap_or(0.0)), text.to_string(), line)
        } else {
            self.make(TokenKind::Int(text.parse().unwrap_or(0)), text.to_string(), line)
        }
    }

    fn lex_ident_or_keyword(&mut self, line: u32) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_') {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("").to_string();
        let kind = keyword(&text).unwrap_or_else(|| TokenKind::Ident(text.clone()));
        self.make(kind, text, line)
    }

    /// Scan the whole source into a token list terminated by one `Eof`.
    pub fn lex_all(src: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok);
            if done {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_a_small_function() {
        let toks = Lexer::lex_all("fn add(a: int, b: int) -> int { return a + b; }");
        let kinds: Vec<_> = toks.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(kinds.first(), Some(&TokenKind::KwFn));
        assert!(kinds.contains(&TokenKind::Arrow));
        assert!(kinds.contains(&TokenKind::Plus));
        assert_eq!(kinds.last(), Some(&TokenKind::Eof));
    }

    #[test]
    fn float_literal_requires_a_digit_after_the_dot() {
        let toks = Lexer::lex_all("3.14");
        assert_eq!(toks[0].kind, TokenKind::Float(3.14));
    }

    #[test]
    fn line_numbers_track_newlines() {
        let toks = Lexer::lex_all("let x: int = 1;\nreturn x;");
        let ret = toks.iter().find(|t| t.kind == TokenKind::KwReturn).unwrap();
        assert_eq!(ret.line, 2);
    }
}
