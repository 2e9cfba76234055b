//! The lazy scanner: one token per call.

pub mod token;

use maki_vm::error::{Error, Result};

pub use token::{Token, TokenKind};

/// Turns source text into tokens on demand. Spaces, tabs and carriage
/// returns separate tokens; newlines are tokens in their own right (they
/// terminate statements). `start`/`current` are byte offsets into `source`.
pub struct Scanner<'src> {
    source: &'src str,
    start: usize,
    current: usize,
    line: u32,
}

impl<'src> Scanner<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
        }
    }

    /// Scan the next token. Comments retry until a real token (or `Eof`)
    /// shows up.
    pub fn scan_token(&mut self) -> Result<Token> {
        loop {
            self.trim();
            self.start = self.current;

            if self.is_end() {
                return Ok(self.make_token(TokenKind::Eof));
            }

            let c = self.advance();
            return match c {
                '\n' => {
                    let token = self.make_token(TokenKind::NewLine);
                    self.line += 1;
                    Ok(token)
                }
                '(' => Ok(self.make_token(TokenKind::LeftParen)),
                ')' => Ok(self.make_token(TokenKind::RightParen)),
                '{' => Ok(self.make_token(TokenKind::LeftBrace)),
                '}' => Ok(self.make_token(TokenKind::RightBrace)),
                '[' => Ok(self.make_token(TokenKind::LeftSquare)),
                ']' => Ok(self.make_token(TokenKind::RightSquare)),
                ';' => Ok(self.make_token(TokenKind::Semicolon)),
                ',' => Ok(self.make_token(TokenKind::Comma)),
                '.' => Ok(self.make_token(TokenKind::Dot)),
                '+' => Ok(self.make_token(TokenKind::Plus)),
                '-' => Ok(self.make_token(TokenKind::Minus)),
                '*' => Ok(self.make_token(TokenKind::Star)),
                '!' => {
                    if self.is_next('=') {
                        Ok(self.make_token(TokenKind::NotEqual))
                    } else {
                        Ok(self.make_token(TokenKind::Not))
                    }
                }
                '=' => {
                    if self.is_next('=') {
                        Ok(self.make_token(TokenKind::EqualEqual))
                    } else {
                        Ok(self.make_token(TokenKind::Equal))
                    }
                }
                '>' => {
                    if self.is_next('=') {
                        Ok(self.make_token(TokenKind::GreaterEqual))
                    } else {
                        Ok(self.make_token(TokenKind::Greater))
                    }
                }
                '<' => {
                    if self.is_next('=') {
                        Ok(self.make_token(TokenKind::LessEqual))
                    } else {
                        Ok(self.make_token(TokenKind::Less))
                    }
                }
                '/' => {
                    if self.is_next('/') {
                        while self.peek() != '\n' && !self.is_end() {
                            self.advance();
                        }
                        continue;
                    }
                    if self.is_next('*') {
                        self.block_comment()?;
                        continue;
                    }
                    Ok(self.make_token(TokenKind::Slash))
                }
                '"' => self.scan_string(),
                c if c.is_ascii_digit() => Ok(self.scan_number()),
                c if c.is_ascii_alphabetic() => Ok(self.scan_identifier()),
                c => Err(Error::scan(format!("unknown character '{}'", c), self.line)),
            };
        }
    }

    fn block_comment(&mut self) -> Result<()> {
        loop {
            if self.is_end() {
                return Err(Error::scan("comment not terminated", self.line));
            }
            match self.advance() {
                '\n' => self.line += 1,
                '*' if self.peek() == '/' => {
                    self.advance();
                    return Ok(());
                }
                _ => {}
            }
        }
    }

    /// The lexeme excludes the surrounding quotes; embedded newlines count
    /// toward the line number.
    fn scan_string(&mut self) -> Result<Token> {
        while self.peek() != '"' && !self.is_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_end() {
            return Err(Error::scan("unterminated string", self.line));
        }
        self.advance();

        Ok(Token {
            kind: TokenKind::String,
            lexeme: self.source[self.start + 1..self.current - 1].to_string(),
            line: self.line,
        })
    }

    fn scan_number(&mut self) -> Token {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.make_token(TokenKind::Number)
    }

    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_ascii_alphanumeric() {
            self.advance();
        }

        match token::keyword(&self.source[self.start..self.current]) {
            Some(kind) => self.make_token(kind),
            None => self.make_token(TokenKind::Identifier),
        }
    }

    fn is_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn peek(&self) -> char {
        self.source[self.current..].chars().next().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.source[self.current..].chars().nth(1).unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.current += c.len_utf8();
        c
    }

    fn is_next(&mut self, expected: char) -> bool {
        if self.is_end() || self.peek() != expected {
            return false;
        }
        self.current += expected.len_utf8();
        true
    }

    fn trim(&mut self) {
        while matches!(self.peek(), ' ' | '\t' | '\r') {
            self.current += 1;
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token {
            kind,
            lexeme: self.source[self.start..self.current].to_string(),
            line: self.line,
        }
    }
}
