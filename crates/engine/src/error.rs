//! Error types for the engine.
//!
//! These are the true faults: bad names, bad syntax, cycles. Per-cell
//! evaluation problems (division by zero, unresolved variables) are not
//! here — those are data, modeled by [`crate::formula::EvalError`] and
//! stored as cell values so one bad formula does not abort recalculation
//! of unrelated cells.

use thiserror::Error;

use crate::recalc::CycleReport;

/// A syntactically invalid formula, reported during construction only.
/// No `Formula` is ever partially built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("cannot parse an empty expression")]
    Empty,

    #[error("unrecognized token `{0}`")]
    InvalidToken(String),

    #[error("token `{0}` is not allowed here")]
    UnexpectedToken(String),

    #[error("variable `{0}` is not legal after normalization")]
    InvalidVariable(String),

    #[error("unbalanced parentheses")]
    UnbalancedParens,

    #[error("expression must end with a number, variable, or `)`")]
    BadEnding,
}

/// Failures raised by cell store entry points. Every variant leaves the
/// store unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpreadsheetError {
    #[error("invalid cell name `{0}`")]
    InvalidName(String),

    #[error(transparent)]
    Format(#[from] FormulaError),

    #[error(transparent)]
    Circular(#[from] CycleReport),
}
