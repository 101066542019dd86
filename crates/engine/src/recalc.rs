//! Recalculation reporting.
//!
//! Types produced by the cell store's ordered-recomputation protocol when
//! cycle detection rejects a mutation.

/// Report when cycle detection finds a circular dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Cells participating in the cycle. May be a subset for large cycles.
    pub cells: Vec<String>,

    /// Human-readable description of the cycle.
    pub message: String,
}

impl CycleReport {
    /// Create a new cycle report.
    pub fn new(cells: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            cells,
            message: message.into(),
        }
    }

    /// Create a cycle report for a self-referencing cell.
    pub fn self_reference(cell: &str) -> Self {
        Self {
            cells: vec![cell.to_string()],
            message: format!("cell {cell} references itself"),
        }
    }

    /// Create a cycle report for a multi-cell cycle.
    pub fn cycle(cells: Vec<String>) -> Self {
        let message = format!("circular dependency: {}", cells.join(" -> "));
        Self { cells, message }
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CycleReport {}
