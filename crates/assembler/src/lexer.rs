//! Tokenizer for nandasm assembly text.
//!
//! The lexer is a lazy iterator over located tokens. Malformed input does
//! not stop it: an error token is produced and lexing resumes at the next
//! whitespace, newline or comment.

use std::fmt;

use nandasm_common::isa::{is_identifier_continue, is_identifier_start};
use serde::Serialize;
use thiserror::Error;

use crate::span::Span;

/// A token and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// What a token is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A mnemonic, label name or label reference.
    Identifier(String),
    /// A numeric literal, sign included.
    Number(NumberLiteral),
    /// `#` or `+` in front of an operand.
    Prefix(OperandPrefix),
    /// The `:` ending a label definition.
    Colon,
    /// Text after `;` or `//`, up to the end of the line.
    Comment(String),
    Newline,
    EndOfInput,
    /// Input the lexer could not make sense of.
    Error(LexError),
}

impl TokenKind {
    /// Coarse classification used in diagnostics.
    pub fn class(&self) -> TokenClass {
        match self {
            TokenKind::Identifier(_) => TokenClass::Identifier,
            TokenKind::Number(_) => TokenClass::Number,
            TokenKind::Prefix(OperandPrefix::Immediate) => TokenClass::ImmediatePrefix,
            TokenKind::Prefix(OperandPrefix::Indirect) => TokenClass::IndirectPrefix,
            TokenKind::Colon => TokenClass::Colon,
            TokenKind::Comment(_) => TokenClass::Comment,
            TokenKind::Newline => TokenClass::Newline,
            TokenKind::EndOfInput => TokenClass::EndOfInput,
            TokenKind::Error(_) => TokenClass::Invalid,
        }
    }

    /// Newline, comment or end of input.
    pub fn ends_line(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::Comment(_) | TokenKind::EndOfInput
        )
    }
}

/// Token kinds as named in "expected ..., found ..." messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    Identifier,
    Number,
    ImmediatePrefix,
    IndirectPrefix,
    Colon,
    Comment,
    Newline,
    EndOfInput,
    Invalid,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenClass::Identifier => "identifier",
            TokenClass::Number => "number",
            TokenClass::ImmediatePrefix => "'#'",
            TokenClass::IndirectPrefix => "'+'",
            TokenClass::Colon => "':'",
            TokenClass::Comment => "comment",
            TokenClass::Newline => "newline",
            TokenClass::EndOfInput => "end of input",
            TokenClass::Invalid => "invalid token",
        };
        f.write_str(name)
    }
}

/// Operand-kind prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperandPrefix {
    /// `#`
    Immediate,
    /// `+`
    Indirect,
}

impl OperandPrefix {
    pub fn as_char(self) -> char {
        match self {
            OperandPrefix::Immediate => '#',
            OperandPrefix::Indirect => '+',
        }
    }
}

/// Base a literal was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Radix {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl Radix {
    pub fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Decimal => 10,
            Radix::Hexadecimal => 16,
        }
    }

    /// Lowercase literal prefix, empty for decimal.
    pub fn prefix(self) -> &'static str {
        match self {
            Radix::Binary => "0b",
            Radix::Octal => "0o",
            Radix::Decimal => "",
            Radix::Hexadecimal => "0x",
        }
    }
}

/// A numeric literal as written.
///
/// The lexer guarantees the signed value fits in `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NumberLiteral {
    pub magnitude: u64,
    pub negative: bool,
    pub radix: Radix,
    /// Digit count as written, leading zeros included.
    pub digits: usize,
}

impl NumberLiteral {
    /// A plain decimal literal for `value`.
    pub fn decimal(value: i64) -> Self {
        let magnitude = value.unsigned_abs();
        Self {
            magnitude,
            negative: value < 0,
            radix: Radix::Decimal,
            digits: magnitude.to_string().len(),
        }
    }

    pub fn value(&self) -> i64 {
        if self.negative {
            // Wrapping so that a magnitude of 2^63 becomes i64::MIN.
            (self.magnitude as i64).wrapping_neg()
        } else {
            self.magnitude as i64
        }
    }
}

/// Canonical rendering: sign, lowercase radix prefix, uppercase digits,
/// zero-padded to the written digit count.
impl fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match self.radix {
            Radix::Binary => format!("{:b}", self.magnitude),
            Radix::Octal => format!("{:o}", self.magnitude),
            Radix::Decimal => self.magnitude.to_string(),
            Radix::Hexadecimal => format!("{:X}", self.magnitude),
        };
        let sign = if self.negative { "-" } else { "" };
        write!(
            f,
            "{sign}{}{body:0>width$}",
            self.radix.prefix(),
            width = self.digits
        )
    }
}

/// Lexing failures. Each becomes an error token.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum LexError {
    #[error("unrecognized character '{0}'")]
    UnknownCharacter(char),

    #[error("malformed number '{0}'")]
    MalformedNumber(String),

    #[error("number '{0}' is too large")]
    NumberOverflow(String),

    #[error("'-' must be directly followed by a number")]
    DanglingSign,
}

/// Start lexing `source`.
pub fn tokenize(source: &str) -> Lexer<'_> {
    Lexer::new(source)
}

/// Lazy token stream. Yields exactly one `EndOfInput`, then `None`.
///
/// Cloning a lexer restarts the stream from the clone's position.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            finished: false,
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&mut pred) {
            self.bump();
        }
        &self.source[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.eat_while(|c| c.is_whitespace() && c != '\n');
    }

    fn at_comment(&self) -> bool {
        match self.peek() {
            Some(';') => true,
            Some('/') => self.peek_second() == Some('/'),
            _ => false,
        }
    }

    /// Skip to the next place a fresh token can start.
    fn recover(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() || self.at_comment() {
                break;
            }
            self.bump();
        }
    }

    fn comment(&mut self, marker_len: usize) -> TokenKind {
        self.pos += marker_len;
        let text = self.eat_while(|c| c != '\n');
        TokenKind::Comment(text.trim_end_matches('\r').to_string())
    }

    fn number(&mut self, negative: bool) -> TokenKind {
        let word = self.eat_while(is_identifier_continue);
        let written = if negative {
            format!("-{word}")
        } else {
            word.to_string()
        };

        let (radix, digits) = split_radix(word);
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix.base())) {
            return TokenKind::Error(LexError::MalformedNumber(written));
        }

        let limit = if negative {
            i64::MIN.unsigned_abs()
        } else {
            i64::MAX as u64
        };
        match u64::from_str_radix(digits, radix.base()) {
            Ok(magnitude) if magnitude <= limit => TokenKind::Number(NumberLiteral {
                magnitude,
                negative,
                radix,
                digits: digits.len(),
            }),
            // Digits are already validated, so the only failure left is size.
            _ => TokenKind::Error(LexError::NumberOverflow(written)),
        }
    }
}

fn split_radix(word: &str) -> (Radix, &str) {
    let bytes = word.as_bytes();
    if bytes.len() >= 2 && bytes[0] == b'0' {
        let radix = match bytes[1] {
            b'x' | b'X' => Some(Radix::Hexadecimal),
            b'b' | b'B' => Some(Radix::Binary),
            b'o' | b'O' => Some(Radix::Octal),
            _ => None,
        };
        if let Some(radix) = radix {
            return (radix, &word[2..]);
        }
    }
    (Radix::Decimal, word)
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        self.skip_whitespace();
        let start = self.pos;

        let Some(c) = self.peek() else {
            self.finished = true;
            return Some(Token::new(TokenKind::EndOfInput, Span::point(start)));
        };

        let kind = match c {
            '\n' => {
                self.bump();
                TokenKind::Newline
            }
            ';' => self.comment(1),
            '/' if self.peek_second() == Some('/') => self.comment(2),
            ':' => {
                self.bump();
                TokenKind::Colon
            }
            '#' => {
                self.bump();
                TokenKind::Prefix(OperandPrefix::Immediate)
            }
            '+' => {
                self.bump();
                TokenKind::Prefix(OperandPrefix::Indirect)
            }
            '-' => {
                self.bump();
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.number(true)
                } else {
                    self.recover();
                    TokenKind::Error(LexError::DanglingSign)
                }
            }
            c if c.is_ascii_digit() => self.number(false),
            c if is_identifier_start(c) => {
                TokenKind::Identifier(self.eat_while(is_identifier_continue).to_string())
            }
            other => {
                self.bump();
                self.recover();
                TokenKind::Error(LexError::UnknownCharacter(other))
            }
        };

        Some(Token::new(kind, Span::new(start, self.pos)))
    }
}
