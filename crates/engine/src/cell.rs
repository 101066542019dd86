use crate::formula::{EvalError, Formula};

/// The authored form of a cell: what sits on the editing line.
#[derive(Debug, Clone, PartialEq)]
pub enum Contents {
    Number(f64),
    Text(String),
    Formula(Formula),
}

impl Contents {
    /// The canonical textual form used for persistence: numbers render via
    /// `f64` display, text is the raw text, formulas are `=` plus the
    /// canonical formula string.
    pub fn string_form(&self) -> String {
        match self {
            Contents::Number(n) => n.to_string(),
            Contents::Text(s) => s.clone(),
            Contents::Formula(f) => format!("={f}"),
        }
    }
}

/// The derived form of a cell: what a grid would display.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Error(EvalError),
}

impl Value {
    /// The numeric value, if this is a number. Text and errors resolve to
    /// `None`, which formula lookups treat as an undefined variable.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// One spreadsheet position: contents plus derived value, replaced
/// wholesale on every successful mutation and never partially mutated.
///
/// A cell whose contents would be empty text is not represented at all —
/// the store simply has no entry for that name.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    string_form: String,
    contents: Contents,
    value: Value,
}

impl Cell {
    pub fn number(n: f64) -> Self {
        Self::from_contents(Contents::Number(n), Value::Number(n))
    }

    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::from_contents(Contents::Text(text.clone()), Value::Text(text))
    }

    /// A formula cell. The value placeholder is overwritten by the ordered
    /// recompute before it can be observed (the new cell is always first in
    /// the recalculation order).
    pub fn formula(formula: Formula) -> Self {
        Self::from_contents(
            Contents::Formula(formula),
            Value::Error(EvalError::new("not yet evaluated")),
        )
    }

    fn from_contents(contents: Contents, value: Value) -> Self {
        Self {
            string_form: contents.string_form(),
            contents,
            value,
        }
    }

    pub fn string_form(&self) -> &str {
        &self.string_form
    }

    pub fn contents(&self) -> &Contents {
        &self.contents
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}
