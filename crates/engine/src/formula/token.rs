//! Expression tokenizer.
//!
//! Splits a raw expression string into lexical tokens: numbers, variables,
//! the four arithmetic operators, and parentheses. Whitespace delimits
//! tokens and is never emitted. Anything that matches no recognized pattern
//! is still emitted as `Token::Invalid` so that validation can reject it
//! explicitly instead of silently dropping characters.

/// One of the four arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    /// The single-character spelling used in canonical formula strings.
    pub fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    /// Apply the operator. Division by zero is the caller's concern.
    pub fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Op::Add => left + right,
            Op::Sub => left - right,
            Op::Mul => left * right,
            Op::Div => left / right,
        }
    }
}

/// A classified lexeme. Number and variable tokens carry their raw text;
/// canonicalization (numeric re-rendering, variable normalization) happens
/// during formula construction, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Number(String),
    Variable(String),
    Op(Op),
    LParen,
    RParen,
    /// A character window that matched no recognized pattern.
    Invalid(String),
}

impl Token {
    /// The raw text of the token, for error messages.
    pub fn lexeme(&self) -> String {
        match self {
            Token::Number(text) | Token::Variable(text) | Token::Invalid(text) => text.clone(),
            Token::Op(op) => op.symbol().to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
        }
    }
}

/// Lazy token stream over an expression string.
///
/// A plain `Iterator`, so it is finite and consumed by iteration; re-scanning
/// means constructing a new `Tokenizer`. Pure function of its input, no side
/// effects.
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let rest = self.src[self.pos..].trim_start();
        self.pos = self.src.len() - rest.len();
        let first = rest.chars().next()?;

        let (token, len) = match first {
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '+' => (Token::Op(Op::Add), 1),
            '-' => (Token::Op(Op::Sub), 1),
            '*' => (Token::Op(Op::Mul), 1),
            '/' => (Token::Op(Op::Div), 1),
            c if c.is_ascii_digit() || c == '.' => match scan_number(rest) {
                Some(len) => (Token::Number(rest[..len].to_string()), len),
                None => (Token::Invalid(first.to_string()), first.len_utf8()),
            },
            c if c.is_ascii_alphabetic() || c == '_' => {
                let len = scan_variable(rest);
                (Token::Variable(rest[..len].to_string()), len)
            }
            other => (Token::Invalid(other.to_string()), other.len_utf8()),
        };

        self.pos += len;
        Some(token)
    }
}

/// True if `s` is syntactically a legal variable: a letter or underscore
/// followed by zero or more letters, digits, or underscores.
pub fn is_valid_variable(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Byte length of the numeric literal at the start of `src`, or `None` if
/// the leading characters do not form one (e.g. a lone `.`).
///
/// Accepts `5`, `5.`, `.5`, `2.75`, and an optional exponent with optional
/// sign (`1e2`, `3.5E-7`). The exponent is only consumed when at least one
/// digit follows it, so `1e` lexes as the number `1` and the variable `e`.
fn scan_number(src: &str) -> Option<usize> {
    let bytes = src.as_bytes();
    let mut len = 0;
    while len < bytes.len() && bytes[len].is_ascii_digit() {
        len += 1;
    }
    let int_digits = len;

    let mut frac_digits = 0;
    if len < bytes.len() && bytes[len] == b'.' {
        let mut after = len + 1;
        while after < bytes.len() && bytes[after].is_ascii_digit() {
            after += 1;
        }
        frac_digits = after - len - 1;
        if int_digits > 0 || frac_digits > 0 {
            len = after;
        }
    }

    if int_digits == 0 && frac_digits == 0 {
        return None;
    }

    if len < bytes.len() && (bytes[len] == b'e' || bytes[len] == b'E') {
        let mut exp = len + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        let mut exp_digits = 0;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
            exp_digits += 1;
        }
        if exp_digits > 0 {
            len = exp;
        }
    }

    Some(len)
}

/// Byte length of the variable at the start of `src` (first char already
/// known to be a letter or underscore).
fn scan_variable(src: &str) -> usize {
    src.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count()
}
