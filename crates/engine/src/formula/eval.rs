//! Formula evaluation.
//!
//! A two-stack, left-to-right algorithm with eager precedence: `*` and `/`
//! are applied as soon as both operands are available, `+` and `-` are
//! deferred until the next additive operator, `)`, or the end of input.
//!
//! Evaluation never panics and never returns a hard fault; every failure
//! path (undefined variable, division by zero) produces an [`EvalError`]
//! value carrying an explanatory reason, so the caller can store it as data
//! and keep recalculating unrelated cells.

use super::parse::Formula;
use super::token::{Op, Token, Tokenizer};

/// The reason a formula could not produce a number.
///
/// Deliberately a plain value rather than a fault: it is stored as a cell's
/// value and surfaced to readers as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalError {
    reason: String,
}

impl EvalError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reason)
    }
}

/// Operator-stack entry: a pending operator or a `(` marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Op(Op),
    Paren,
}

impl Formula {
    /// Evaluate against `lookup`, which resolves a variable to its numeric
    /// value or `None` when the variable is undefined.
    pub fn evaluate<L>(&self, lookup: L) -> Result<f64, EvalError>
    where
        L: Fn(&str) -> Option<f64>,
    {
        let mut values: Vec<f64> = Vec::new();
        let mut ops: Vec<Pending> = Vec::new();

        for tok in Tokenizer::new(self.as_str()) {
            match tok {
                Token::Number(text) => {
                    let number = text.parse::<f64>().map_err(|_| malformed())?;
                    push_operand(number, &mut values, &mut ops)?;
                }
                Token::Variable(name) => {
                    let number = lookup(&name)
                        .ok_or_else(|| EvalError::new(format!("undefined variable {name}")))?;
                    push_operand(number, &mut values, &mut ops)?;
                }
                Token::Op(op @ (Op::Add | Op::Sub)) => {
                    apply_additive(&mut values, &mut ops)?;
                    ops.push(Pending::Op(op));
                }
                Token::Op(op) => ops.push(Pending::Op(op)),
                Token::LParen => ops.push(Pending::Paren),
                Token::RParen => {
                    apply_additive(&mut values, &mut ops)?;
                    // Discard the matching `(` marker, then apply any `*`/`/`
                    // now exposed (handles `2*(3+4)`).
                    if ops.pop() != Some(Pending::Paren) {
                        return Err(malformed());
                    }
                    apply_multiplicative(&mut values, &mut ops)?;
                }
                Token::Invalid(_) => return Err(malformed()),
            }
        }

        if ops.len() == 1 {
            apply_additive(&mut values, &mut ops)?;
        }
        match (values.pop(), values.is_empty(), ops.is_empty()) {
            (Some(result), true, true) => Ok(result),
            _ => Err(malformed()),
        }
    }
}

// The canonical-string invariant means a Formula can always be re-tokenized
// and evaluated; hitting one of these paths would mean the invariant broke,
// and evaluation still must not panic.
fn malformed() -> EvalError {
    EvalError::new("malformed expression")
}

/// Push a resolved operand; if a `*` or `/` is waiting on top of the
/// operator stack, apply it immediately.
fn push_operand(
    number: f64,
    values: &mut Vec<f64>,
    ops: &mut Vec<Pending>,
) -> Result<(), EvalError> {
    values.push(number);
    apply_multiplicative(values, ops)
}

/// Apply the top operator if it is `*` or `/`.
fn apply_multiplicative(values: &mut Vec<f64>, ops: &mut Vec<Pending>) -> Result<(), EvalError> {
    if matches!(ops.last(), Some(Pending::Op(Op::Mul | Op::Div))) {
        apply_top(values, ops)?;
    }
    Ok(())
}

/// Apply the top operator if it is `+` or `-`.
fn apply_additive(values: &mut Vec<f64>, ops: &mut Vec<Pending>) -> Result<(), EvalError> {
    if matches!(ops.last(), Some(Pending::Op(Op::Add | Op::Sub))) {
        apply_top(values, ops)?;
    }
    Ok(())
}

/// Pop one operator and two values, combine, and push the result.
fn apply_top(values: &mut Vec<f64>, ops: &mut Vec<Pending>) -> Result<(), EvalError> {
    let Some(Pending::Op(op)) = ops.pop() else {
        return Err(malformed());
    };
    let (Some(right), Some(left)) = (values.pop(), values.pop()) else {
        return Err(malformed());
    };
    if op == Op::Div && right == 0.0 {
        return Err(EvalError::new("division by zero"));
    }
    values.push(op.apply(left, right));
    Ok(())
}
