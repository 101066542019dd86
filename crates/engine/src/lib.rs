pub mod cell;
pub mod dep_graph;
pub mod error;
pub mod formula;
pub mod recalc;
pub mod spreadsheet;

pub use cell::{Cell, Contents, Value};
pub use dep_graph::DependencyGraph;
pub use error::{FormulaError, SpreadsheetError};
pub use formula::{EvalError, Formula};
pub use recalc::CycleReport;
pub use spreadsheet::Spreadsheet;
