/*
* Largely ripped from Robert Nystrom's *Crafting Interpreters*
*/

use tracing::trace;

use crate::ast::Literal;
use crate::error::TsilError;

const EOF_CHAR: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Punctuation
    LeftParen,
    RightParen,
    Comma,
    Semicolon,

    // Operators
    Bang,
    BangEqual,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Minus,
    Plus,
    Slash,
    Star,

    // Literals
    Identifier,
    PredicateName,
    Number,
    Str,

    // Keywords
    And,
    Ask,
    False,
    Implies,
    Nil,
    Or,
    Print,
    True,

    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Literal>,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            literal: None,
            line,
        }
    }

    pub fn eof(line: usize) -> Self {
        Token::new(TokenKind::Eof, "", line)
    }
}

#[derive(Debug)]
pub struct Scanner {
    source: Vec<char>,
    position: usize, // The character to be scanned
    line: usize,
    start: usize, // The start of the current lexeme
}

impl Scanner {
    pub fn new(source: Vec<char>) -> Self {
        Scanner {
            source,
            position: 0,
            line: 1,
            start: 0,
        }
    }

    /// Scans the whole source. Lexical errors are kept in place and scanning carries on after
    /// them; the last element is always the end-of-input token.
    pub fn tokens(&mut self) -> Vec<Result<Token, TsilError>> {
        let mut toks = Vec::new();
        while !self.is_at_end() {
            self.start = self.position;
            if let Some(tok) = self.next_token() {
                toks.push(tok);
            }
        }
        toks.push(Ok(Token::eof(self.line)));
        trace!(count = toks.len(), "scanned tokens");

        toks
    }

    /// Scans one lexeme. Returns `None` for whitespace and comments.
    fn next_token(&mut self) -> Option<Result<Token, TsilError>> {
        let ch = self.curr_char();
        self.advance();
        let kind = match ch {
            ' ' | '\r' | '\t' => return None,
            '\n' => {
                self.line += 1;
                return None;
            }

            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,

            '/' => {
                if self.match_and_consume('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                    return None;
                }
                TokenKind::Slash
            }

            '!' => {
                if self.match_and_consume('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            '=' => {
                if self.match_and_consume('=') {
                    TokenKind::EqualEqual
                } else {
                    return Some(Err(self.error("expected '=' after '='")));
                }
            }
            '>' => {
                if self.match_and_consume('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '<' => {
                if self.match_and_consume('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }

            '"' => return Some(self.scan_str()),

            n if n.is_ascii_digit() => return Some(self.scan_numeric()),

            c if c.is_ascii_alphabetic() || c == '_' => return Some(Ok(self.scan_symbol())),

            _ => return Some(Err(self.error("unexpected character"))),
        };
        Some(Ok(self.make_token(kind)))
    }

    fn scan_numeric(&mut self) -> Result<Token, TsilError> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            // pass the '.'
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let lexeme = self.lexeme();
        let value = lexeme
            .parse::<f64>()
            .map_err(|_| self.error("malformed number"))?;
        let mut tok = self.make_token(TokenKind::Number);
        tok.literal = Some(Literal::Number(value));
        Ok(tok)
    }

    fn scan_str(&mut self) -> Result<Token, TsilError> {
        while self.peek() != '"' && !self.is_at_end() {
            if self.peek() == '\n' {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_at_end() {
            return Err(self.error("unterminated string, expected closing '\"'"));
        }
        // pass closing "
        self.advance();
        let value: String = self.source[self.start + 1..self.position - 1]
            .iter()
            .collect();
        let mut tok = self.make_token(TokenKind::Str);
        tok.literal = Some(Literal::Str(value));
        Ok(tok)
    }

    fn scan_symbol(&mut self) -> Token {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let lexeme = self.lexeme();
        let kind = match Self::token_for_keyword(&lexeme) {
            Some(kind) => kind,
            None if self.opens_argument_list() => TokenKind::PredicateName,
            None => TokenKind::Identifier,
        };
        let mut tok = self.make_token(kind);
        tok.literal = match kind {
            TokenKind::True => Some(Literal::Bool(true)),
            TokenKind::False => Some(Literal::Bool(false)),
            TokenKind::Nil => Some(Literal::Nil),
            _ => None,
        };
        tok
    }

    fn token_for_keyword(lexeme: &str) -> Option<TokenKind> {
        match lexeme {
            "AND" => Some(TokenKind::And),
            "ASK" => Some(TokenKind::Ask),
            "IMPLIES" => Some(TokenKind::Implies),
            "OR" => Some(TokenKind::Or),
            "PRINT" => Some(TokenKind::Print),
            "false" => Some(TokenKind::False),
            "nil" => Some(TokenKind::Nil),
            "true" => Some(TokenKind::True),
            _ => None,
        }
    }

    /// Whether the next non-blank character on this line is '('.
    fn opens_argument_list(&self) -> bool {
        self.source[self.position..]
            .iter()
            .find(|c| !matches!(**c, ' ' | '\t' | '\r'))
            .is_some_and(|c| *c == '(')
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), self.line)
    }

    fn lexeme(&self) -> String {
        self.source[self.start..self.position].iter().collect()
    }

    fn error(&self, reason: &str) -> TsilError {
        TsilError::ScannerError {
            line: self.line,
            lexeme: self.lexeme(),
            reason: reason.into(),
        }
    }

    fn curr_char(&self) -> char {
        if self.is_at_end() {
            return EOF_CHAR;
        }
        self.source[self.position]
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn peek(&self) -> char {
        self.curr_char()
    }

    fn peek_next(&self) -> char {
        if self.position + 1 >= self.source.len() {
            return EOF_CHAR;
        }
        self.source[self.position + 1]
    }

    fn match_and_consume(&mut self, ch: char) -> bool {
        if self.peek() == ch {
            self.advance();
            true
        } else {
            false
        }
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.source.len()
    }
}
