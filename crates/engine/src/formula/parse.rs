//! Formula construction and canonicalization.
//!
//! A `Formula` is an immutable, syntactically validated arithmetic expression
//! over non-negative numbers, variables, parentheses, and the four operators.
//! Its one essential attribute is the canonical string: numeric literals are
//! reparsed and re-rendered (so `1e2` and `100` spell the same), variables
//! are passed through a caller-supplied normalizer, and whitespace is gone.
//! Equality and hashing are defined purely on that string.

use rustc_hash::FxHashSet;

use crate::error::FormulaError;

use super::token::{self, Token, Tokenizer};

/// An immutable, validated, canonicalized arithmetic expression.
///
/// Two formulas are equal iff their canonical token sequences are identical:
/// `2.0+x7` equals `2.000 + x7`, but `x1+y2` does not equal `y2+x1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Formula {
    canonical: String,
}

impl Formula {
    /// Construct with the identity normalizer and an always-true validity
    /// predicate.
    pub fn new(raw: &str) -> Result<Self, FormulaError> {
        Self::parse(raw, |s| s.to_string(), |_| true)
    }

    /// Construct from a raw expression string.
    ///
    /// Every variable is passed through `normalize`; the normalized form must
    /// itself be a legal variable (letter or underscore, then letters, digits,
    /// or underscores) and must satisfy `is_valid`. Syntax is checked with a
    /// two-state expectation machine: after a number, variable, or `)` the
    /// next token must be an operator or `)`; after an operator, `(`, or at
    /// the start it must be a number, variable, or `(`.
    ///
    /// On success the canonical string is the concatenation of re-rendered
    /// numbers, normalized variables, operators, and parentheses with no
    /// separators. Re-parsing a canonical string always succeeds and yields
    /// the same canonical string.
    pub fn parse<N, V>(raw: &str, normalize: N, is_valid: V) -> Result<Self, FormulaError>
    where
        N: Fn(&str) -> String,
        V: Fn(&str) -> bool,
    {
        if raw.trim().is_empty() {
            return Err(FormulaError::Empty);
        }

        let mut canonical = String::with_capacity(raw.len());
        let mut expect_value = true;
        let mut open_parens = 0usize;

        for tok in Tokenizer::new(raw) {
            match tok {
                Token::Number(text) if expect_value => {
                    let number: f64 = text
                        .parse()
                        .map_err(|_| FormulaError::InvalidToken(text.clone()))?;
                    // An overflowing literal would render as `inf`, which
                    // re-tokenizes as a variable, not a number.
                    if !number.is_finite() {
                        return Err(FormulaError::InvalidToken(text));
                    }
                    canonical.push_str(&number.to_string());
                    expect_value = false;
                }
                Token::Variable(name) if expect_value => {
                    let normalized = normalize(&name);
                    if !token::is_valid_variable(&normalized) || !is_valid(&normalized) {
                        return Err(FormulaError::InvalidVariable(name));
                    }
                    canonical.push_str(&normalized);
                    expect_value = false;
                }
                Token::Op(op) if !expect_value => {
                    canonical.push(op.symbol());
                    expect_value = true;
                }
                Token::LParen if expect_value => {
                    open_parens += 1;
                    canonical.push('(');
                }
                Token::RParen if !expect_value => {
                    if open_parens == 0 {
                        return Err(FormulaError::UnbalancedParens);
                    }
                    open_parens -= 1;
                    canonical.push(')');
                }
                Token::Invalid(text) => return Err(FormulaError::InvalidToken(text)),
                wrong_state => return Err(FormulaError::UnexpectedToken(wrong_state.lexeme())),
            }
        }

        if open_parens != 0 {
            return Err(FormulaError::UnbalancedParens);
        }
        // A well-formed expression ends on a number, variable, or `)`, all of
        // which leave the machine expecting an operator.
        if expect_value {
            return Err(FormulaError::BadEnding);
        }

        Ok(Self { canonical })
    }

    /// The canonical string (normalized, whitespace-free).
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The normalized variables occurring in this formula, deduplicated, in
    /// first-occurrence order.
    pub fn variables(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut names = Vec::new();
        for tok in Tokenizer::new(&self.canonical) {
            if let Token::Variable(name) = tok {
                if seen.insert(name.clone()) {
                    names.push(name);
                }
            }
        }
        names
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical)
    }
}
