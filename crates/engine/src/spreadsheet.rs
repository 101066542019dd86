//! Cell store and recalculation engine.
//!
//! A [`Spreadsheet`] owns the map of named cells and the one
//! [`DependencyGraph`] that mirrors "this cell's formula references that
//! cell" as an edge. Every mutation goes through a cycle-safe protocol:
//! edges are installed tentatively, the recalculation order is computed,
//! and on a cycle the edges are rolled back with the store untouched.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::cell::{Cell, Contents, Value};
use crate::dep_graph::DependencyGraph;
use crate::error::SpreadsheetError;
use crate::formula::{is_valid_variable, Formula};
use crate::recalc::CycleReport;

/// A collection of named cells with dependency-ordered recalculation.
///
/// Cell name policy is injected at construction: every name entering any
/// entry point is passed through `normalize`, and the normalized form must
/// be a legal variable and satisfy `is_valid`. The same pair governs the
/// variables inside formulas, so a formula can only reference legal cells.
pub struct Spreadsheet {
    cells: FxHashMap<String, Cell>,
    graph: DependencyGraph,
    normalize: Box<dyn Fn(&str) -> String>,
    is_valid: Box<dyn Fn(&str) -> bool>,
    version: String,
    dirty: bool,
}

impl Spreadsheet {
    /// An empty spreadsheet with the identity normalizer, an always-true
    /// validity predicate, and the `"default"` version tag.
    pub fn new() -> Self {
        Self::with_policies("default", |s| s.to_string(), |_| true)
    }

    /// An empty spreadsheet with explicit name policies and version tag.
    pub fn with_policies<N, V>(version: impl Into<String>, normalize: N, is_valid: V) -> Self
    where
        N: Fn(&str) -> String + 'static,
        V: Fn(&str) -> bool + 'static,
    {
        Self {
            cells: FxHashMap::default(),
            graph: DependencyGraph::new(),
            normalize: Box::new(normalize),
            is_valid: Box::new(is_valid),
            version: version.into(),
            dirty: false,
        }
    }

    /// The version tag this spreadsheet was created with.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// True if the spreadsheet has been mutated since creation or the last
    /// [`mark_saved`](Self::mark_saved).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag. Called by persistence after a successful save
    /// or after replaying a loaded snapshot.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// The names of every cell that currently holds contents.
    pub fn non_empty_cells(&self) -> impl Iterator<Item = &str> + '_ {
        self.cells.keys().map(String::as_str)
    }

    /// Each non-empty cell paired with its persistable string form.
    pub fn cell_records(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.cells
            .iter()
            .map(|(name, cell)| (name.as_str(), cell.string_form()))
    }

    /// The contents of a cell. A valid name with no stored cell reads as
    /// empty text, which is not an error.
    pub fn contents(&self, name: &str) -> Result<Contents, SpreadsheetError> {
        let name = self.checked_name(name)?;
        Ok(self
            .cells
            .get(&name)
            .map(Cell::contents)
            .cloned()
            .unwrap_or(Contents::Text(String::new())))
    }

    /// The derived value of a cell. A valid name with no stored cell reads
    /// as empty text.
    pub fn value(&self, name: &str) -> Result<Value, SpreadsheetError> {
        let name = self.checked_name(name)?;
        Ok(self
            .cells
            .get(&name)
            .map(Cell::value)
            .cloned()
            .unwrap_or(Value::Text(String::new())))
    }

    /// Set a cell from raw edit-line text and recompute everything it
    /// affects.
    ///
    /// Classification: text that parses as a number stores a number; text
    /// beginning with `=` stores a formula (the remainder must parse); the
    /// empty string removes the cell; anything else stores text.
    ///
    /// Returns the affected cell names in recalculation order, starting
    /// with `name` itself, followed by its transitive dependents with every
    /// dependee preceding its dependents. On any error the store is
    /// unchanged, including the dirty flag.
    pub fn set_contents_of_cell(
        &mut self,
        name: &str,
        raw: &str,
    ) -> Result<Vec<String>, SpreadsheetError> {
        let name = self.checked_name(name)?;

        let order = if let Ok(number) = raw.trim().parse::<f64>() {
            self.set_plain(&name, Some(Cell::number(number)))?
        } else if let Some(expr) = raw.strip_prefix('=') {
            let formula = Formula::parse(expr, |s| (self.normalize)(s), |s| (self.is_valid)(s))?;
            self.set_formula(&name, formula)?
        } else if raw.is_empty() {
            self.set_plain(&name, None)?
        } else {
            self.set_plain(&name, Some(Cell::text(raw)))?
        };

        self.dirty = true;
        self.revalue(&order);
        Ok(order)
    }

    /// Normalize a name and check it against the validity policy.
    fn checked_name(&self, name: &str) -> Result<String, SpreadsheetError> {
        let normalized = (self.normalize)(name);
        if is_valid_variable(&normalized) && (self.is_valid)(&normalized) {
            Ok(normalized)
        } else {
            Err(SpreadsheetError::InvalidName(name.to_string()))
        }
    }

    /// Store a number or text cell, or remove the cell entirely. Plain
    /// contents reference nothing, so the cell's in-edges are cleared.
    fn set_plain(
        &mut self,
        name: &str,
        cell: Option<Cell>,
    ) -> Result<Vec<String>, SpreadsheetError> {
        self.graph.replace_dependees(name, std::iter::empty::<&str>());
        match cell {
            Some(cell) => {
                self.cells.insert(name.to_string(), cell);
            }
            None => {
                self.cells.remove(name);
            }
        }
        // Removing in-edges cannot introduce a cycle.
        self.recalc_order(name).map_err(Into::into)
    }

    /// Store a formula cell. Its referenced names become tentative in-edges;
    /// if the recalculation order reports a cycle the previous edges are
    /// reinstalled and the cell is never committed.
    fn set_formula(
        &mut self,
        name: &str,
        formula: Formula,
    ) -> Result<Vec<String>, SpreadsheetError> {
        let old_refs: Vec<String> = self.graph.dependees(name).map(str::to_string).collect();
        self.graph.replace_dependees(name, formula.variables());

        match self.recalc_order(name) {
            Ok(order) => {
                self.cells.insert(name.to_string(), Cell::formula(formula));
                Ok(order)
            }
            Err(report) => {
                self.graph.replace_dependees(name, &old_refs);
                Err(report.into())
            }
        }
    }

    /// Depth-first order over `start` and its transitive dependents such
    /// that every cell appears before the cells that depend on it. Direct
    /// dependents are visited in lexicographic order, so the result is
    /// deterministic for a given graph.
    fn recalc_order(&self, start: &str) -> Result<Vec<String>, CycleReport> {
        let mut visited = FxHashSet::default();
        let mut path = Vec::new();
        let mut postorder = Vec::new();
        self.visit(start, &mut visited, &mut path, &mut postorder)?;
        postorder.reverse();
        Ok(postorder)
    }

    fn visit(
        &self,
        name: &str,
        visited: &mut FxHashSet<String>,
        path: &mut Vec<String>,
        postorder: &mut Vec<String>,
    ) -> Result<(), CycleReport> {
        visited.insert(name.to_string());
        path.push(name.to_string());

        let mut dependents: Vec<&str> = self.graph.dependents(name).collect();
        dependents.sort_unstable();
        for dependent in dependents {
            if path.iter().any(|p| p == dependent) {
                // Revisiting a cell on the current recursion stack.
                if dependent == name {
                    return Err(CycleReport::self_reference(name));
                }
                let from = path.iter().position(|p| p == dependent).unwrap_or(0);
                let mut cells: Vec<String> = path[from..].to_vec();
                cells.push(dependent.to_string());
                return Err(CycleReport::cycle(cells));
            }
            if !visited.contains(dependent) {
                self.visit(dependent, visited, path, postorder)?;
            }
        }

        path.pop();
        postorder.push(name.to_string());
        Ok(())
    }

    /// Re-evaluate the formula cells in `order`. Number and text cells keep
    /// their values; a removed cell's name is simply skipped.
    fn revalue(&mut self, order: &[String]) {
        for name in order {
            let formula = match self.cells.get(name).map(Cell::contents) {
                Some(Contents::Formula(formula)) => formula.clone(),
                _ => continue,
            };
            let value = match formula
                .evaluate(|var| self.cells.get(var).and_then(|c| c.value().as_number()))
            {
                Ok(n) => Value::Number(n),
                Err(e) => Value::Error(e),
            };
            if let Some(cell) = self.cells.get_mut(name) {
                cell.set_value(value);
            }
        }
    }
}

impl Default for Spreadsheet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Spreadsheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Spreadsheet")
            .field("cells", &self.cells)
            .field("graph", &self.graph)
            .field("version", &self.version)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;
    use crate::formula::EvalError;

    fn upper(s: &str) -> String {
        s.to_uppercase()
    }

    /// Cell names shaped like `A1`: letters then digits.
    fn letters_then_digits(s: &str) -> bool {
        let digits = s.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        !digits.is_empty()
            && digits.len() < s.len()
            && digits.chars().all(|c| c.is_ascii_digit())
    }

    fn sheet() -> Spreadsheet {
        Spreadsheet::with_policies("default", upper, letters_then_digits)
    }

    #[test]
    fn test_empty_spreadsheet() {
        let s = sheet();
        assert_eq!(s.contents("A1").unwrap(), Contents::Text(String::new()));
        assert_eq!(s.value("A1").unwrap(), Value::Text(String::new()));
        assert_eq!(s.non_empty_cells().count(), 0);
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_invalid_name_rejected() {
        let s = sheet();
        assert_eq!(
            s.contents("1A"),
            Err(SpreadsheetError::InvalidName("1A".to_string()))
        );
        assert!(s.value("A1!").is_err());

        let mut s = sheet();
        assert!(s.set_contents_of_cell("AB", "5").is_err());
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_set_number() {
        let mut s = sheet();
        let order = s.set_contents_of_cell("a1", "5.0").unwrap();
        assert_eq!(order, vec!["A1"]);
        assert_eq!(s.contents("A1").unwrap(), Contents::Number(5.0));
        assert_eq!(s.value("a1").unwrap(), Value::Number(5.0));
        assert!(s.is_dirty());
    }

    #[test]
    fn test_set_text() {
        let mut s = sheet();
        s.set_contents_of_cell("B2", "hello").unwrap();
        assert_eq!(s.contents("b2").unwrap(), Contents::Text("hello".into()));
        assert_eq!(s.value("B2").unwrap(), Value::Text("hello".into()));
    }

    #[test]
    fn test_set_formula_evaluates() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "3").unwrap();
        s.set_contents_of_cell("B1", "=a1 * 2 + 1").unwrap();
        assert_eq!(s.value("B1").unwrap(), Value::Number(7.0));
        assert_eq!(
            s.contents("B1").unwrap(),
            Contents::Formula(Formula::new("A1*2+1").unwrap())
        );
    }

    #[test]
    fn test_bad_formula_leaves_store_unchanged() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "10").unwrap();
        s.mark_saved();

        let err = s.set_contents_of_cell("A1", "=2 +").unwrap_err();
        assert!(matches!(
            err,
            SpreadsheetError::Format(FormulaError::BadEnding)
        ));
        assert_eq!(s.contents("A1").unwrap(), Contents::Number(10.0));
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_overflowing_formula_literal_rejected() {
        let mut s = sheet();
        // Committing this would persist a string form the same store
        // policies could never replay.
        let err = s.set_contents_of_cell("A1", "=1e400").unwrap_err();
        assert!(matches!(
            err,
            SpreadsheetError::Format(FormulaError::InvalidToken(_))
        ));
        assert_eq!(s.non_empty_cells().count(), 0);
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_formula_referencing_invalid_name_rejected() {
        let mut s = sheet();
        // "X" normalizes fine but fails the letters-then-digits policy.
        let err = s.set_contents_of_cell("A1", "=X + 1").unwrap_err();
        assert!(matches!(err, SpreadsheetError::Format(_)));
        assert_eq!(s.non_empty_cells().count(), 0);
    }

    #[test]
    fn test_empty_string_removes_cell() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "=B1+1").unwrap();
        assert_eq!(s.non_empty_cells().count(), 1);

        s.set_contents_of_cell("A1", "").unwrap();
        assert_eq!(s.non_empty_cells().count(), 0);
        assert_eq!(s.contents("A1").unwrap(), Contents::Text(String::new()));
        assert!(s.is_dirty());
    }

    #[test]
    fn test_dependent_updates_when_input_changes() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "2").unwrap();
        s.set_contents_of_cell("B1", "=A1+1").unwrap();
        s.set_contents_of_cell("C1", "=B1*10").unwrap();
        assert_eq!(s.value("C1").unwrap(), Value::Number(30.0));

        let order = s.set_contents_of_cell("A1", "5").unwrap();
        assert_eq!(order, vec!["A1", "B1", "C1"]);
        assert_eq!(s.value("B1").unwrap(), Value::Number(6.0));
        assert_eq!(s.value("C1").unwrap(), Value::Number(60.0));
    }

    #[test]
    fn test_chain_recalculation_order() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "=A2+A3").unwrap();
        s.set_contents_of_cell("A2", "6").unwrap();
        s.set_contents_of_cell("A3", "=A2+A4").unwrap();
        s.set_contents_of_cell("A4", "=A2+A5").unwrap();

        let order = s.set_contents_of_cell("A5", "82.5").unwrap();
        assert_eq!(order, vec!["A5", "A4", "A3", "A1"]);
        assert_eq!(s.value("A4").unwrap(), Value::Number(88.5));
        assert_eq!(s.value("A3").unwrap(), Value::Number(94.5));
        assert_eq!(s.value("A1").unwrap(), Value::Number(100.5));
    }

    #[test]
    fn test_undefined_variable_is_error_value() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "=B1+1").unwrap();
        assert!(matches!(s.value("A1").unwrap(), Value::Error(_)));

        // Text does not resolve to a number either.
        s.set_contents_of_cell("B1", "six").unwrap();
        assert!(matches!(s.value("A1").unwrap(), Value::Error(_)));

        // Defining the input numerically repairs the dependent.
        s.set_contents_of_cell("B1", "6").unwrap();
        assert_eq!(s.value("A1").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn test_error_propagates_through_chain() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "=1/0").unwrap();
        s.set_contents_of_cell("B1", "=A1+1").unwrap();
        assert!(matches!(s.value("A1").unwrap(), Value::Error(_)));
        assert!(matches!(s.value("B1").unwrap(), Value::Error(_)));

        // Sibling cells still recalculate.
        s.set_contents_of_cell("C1", "=2+2").unwrap();
        assert_eq!(s.value("C1").unwrap(), Value::Number(4.0));
    }

    #[test]
    fn test_self_reference_rejected() {
        let mut s = sheet();
        let err = s.set_contents_of_cell("A1", "=A1+1").unwrap_err();
        assert!(matches!(err, SpreadsheetError::Circular(_)));
        assert_eq!(s.contents("A1").unwrap(), Contents::Text(String::new()));
    }

    #[test]
    fn test_cycle_rejection_is_atomic() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "=A2").unwrap();
        s.mark_saved();

        let err = s.set_contents_of_cell("A2", "=A1").unwrap_err();
        assert!(matches!(err, SpreadsheetError::Circular(_)));
        // A2 was never committed, A1 untouched, flag untouched.
        assert_eq!(s.contents("A2").unwrap(), Contents::Text(String::new()));
        assert_eq!(
            s.contents("A1").unwrap(),
            Contents::Formula(Formula::new("A2").unwrap())
        );
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_cycle_rollback_keeps_old_formula_edges() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "=B1").unwrap();
        s.set_contents_of_cell("B1", "=C1").unwrap();

        // B1 -> A1 edge must survive the failed attempt.
        assert!(s.set_contents_of_cell("B1", "=A1").is_err());
        let order = s.set_contents_of_cell("C1", "1").unwrap();
        assert_eq!(order, vec!["C1", "B1", "A1"]);
        assert_eq!(s.value("A1").unwrap(), Value::Number(1.0));
    }

    #[test]
    fn test_longer_cycle_rejected() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "=B1").unwrap();
        s.set_contents_of_cell("B1", "=C1").unwrap();
        let err = s.set_contents_of_cell("C1", "=A1").unwrap_err();
        let SpreadsheetError::Circular(report) = err else {
            panic!("expected a circular dependency");
        };
        assert!(report.cells.contains(&"A1".to_string()));
        assert!(report.cells.contains(&"C1".to_string()));
    }

    #[test]
    fn test_replacing_formula_drops_stale_edges() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "1").unwrap();
        s.set_contents_of_cell("B1", "=A1").unwrap();
        s.set_contents_of_cell("B1", "=C1").unwrap();

        // A1 no longer feeds B1.
        let order = s.set_contents_of_cell("A1", "2").unwrap();
        assert_eq!(order, vec!["A1"]);
    }

    #[test]
    fn test_overwriting_formula_with_number_frees_dependees() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "=B1").unwrap();
        s.set_contents_of_cell("A1", "7").unwrap();

        // With the edge gone, B1 = A1 is no longer circular.
        s.set_contents_of_cell("B1", "=A1").unwrap();
        assert_eq!(s.value("B1").unwrap(), Value::Number(7.0));
    }

    #[test]
    fn test_names_are_normalized_everywhere() {
        let mut s = sheet();
        s.set_contents_of_cell("a1", "1").unwrap();
        s.set_contents_of_cell("b1", "=a1+1").unwrap();
        let names: Vec<&str> = {
            let mut v: Vec<&str> = s.non_empty_cells().collect();
            v.sort_unstable();
            v
        };
        assert_eq!(names, vec!["A1", "B1"]);
        assert_eq!(s.value("B1").unwrap(), Value::Number(2.0));
    }

    #[test]
    fn test_cell_records_use_string_forms() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "5.0").unwrap();
        s.set_contents_of_cell("B1", "= a1 + 2").unwrap();
        s.set_contents_of_cell("C1", "note").unwrap();

        let mut records: Vec<(String, String)> = s
            .cell_records()
            .map(|(n, f)| (n.to_string(), f.to_string()))
            .collect();
        records.sort();
        assert_eq!(
            records,
            vec![
                ("A1".to_string(), "5".to_string()),
                ("B1".to_string(), "=A1+2".to_string()),
                ("C1".to_string(), "note".to_string()),
            ]
        );
    }

    #[test]
    fn test_diamond_dependency_recalculates_once() {
        let mut s = sheet();
        s.set_contents_of_cell("D1", "=B1+C1").unwrap();
        s.set_contents_of_cell("B1", "=A1*2").unwrap();
        s.set_contents_of_cell("C1", "=A1*3").unwrap();

        let order = s.set_contents_of_cell("A1", "1").unwrap();
        assert_eq!(order, vec!["A1", "C1", "B1", "D1"]);
        assert_eq!(order.iter().filter(|n| *n == "D1").count(), 1);
        assert_eq!(s.value("D1").unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_division_by_zero_stored_as_error() {
        let mut s = sheet();
        s.set_contents_of_cell("A1", "0").unwrap();
        s.set_contents_of_cell("B1", "=5/A1").unwrap();
        let Value::Error(err) = s.value("B1").unwrap() else {
            panic!("expected an evaluation error");
        };
        assert_eq!(err, EvalError::new("division by zero"));

        s.set_contents_of_cell("A1", "2").unwrap();
        assert_eq!(s.value("B1").unwrap(), Value::Number(2.5));
    }

    #[test]
    fn test_default_policies_accept_any_variable() {
        let mut s = Spreadsheet::new();
        s.set_contents_of_cell("total_2024", "10").unwrap();
        s.set_contents_of_cell("doubled", "=total_2024*2").unwrap();
        assert_eq!(s.value("doubled").unwrap(), Value::Number(20.0));
        assert_eq!(s.version(), "default");
    }
}
