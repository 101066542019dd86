//! Dependency graph: a reusable many-to-many relation over string keys.
//!
//! An edge (s, t) means "t depends on s; s must be evaluated before t".
//! The graph knows nothing about cells or formulas and performs no cycle
//! detection — it is a dumb relation; cycle safety is layered on top by the
//! cell store.
//!
//! # Invariants
//!
//! 1. **Bidirectional consistency:** if t ∈ dependents\[s\] then
//!    s ∈ dependees\[t\], and vice versa.
//! 2. **No dangling entries:** empty sets are removed, not stored.
//! 3. **No duplicate edges:** set semantics enforced by `FxHashSet`.
//! 4. **Mirrors move together:** both indices are only ever mutated inside
//!    this type's own methods, never exposed raw.

use rustc_hash::{FxHashMap, FxHashSet};

/// A set of ordered pairs of strings with both directions indexed.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// For each key s, the keys that depend on s: s -> {t : (s,t)}.
    dependents: FxHashMap<String, FxHashSet<String>>,

    /// For each key t, the keys that t depends on: t -> {s : (s,t)}.
    dependees: FxHashMap<String, FxHashSet<String>>,

    /// Total distinct edge count.
    size: usize,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of distinct ordered pairs in the graph.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Insert the ordered pair (s, t): t depends on s. Idempotent.
    pub fn add_dependency(&mut self, s: &str, t: &str) {
        let inserted = self
            .dependents
            .entry(s.to_string())
            .or_default()
            .insert(t.to_string());
        if inserted {
            self.dependees
                .entry(t.to_string())
                .or_default()
                .insert(s.to_string());
            self.size += 1;
        }
    }

    /// Remove the ordered pair (s, t) if present; no-op otherwise.
    pub fn remove_dependency(&mut self, s: &str, t: &str) {
        let Some(forward) = self.dependents.get_mut(s) else {
            return;
        };
        if !forward.remove(t) {
            return;
        }
        if forward.is_empty() {
            self.dependents.remove(s);
        }
        if let Some(backward) = self.dependees.get_mut(t) {
            backward.remove(s);
            if backward.is_empty() {
                self.dependees.remove(t);
            }
        }
        self.size -= 1;
    }

    /// The keys that depend on `s`. Absent keys yield an empty iterator,
    /// never an error.
    pub fn dependents(&self, s: &str) -> impl Iterator<Item = &str> + '_ {
        self.dependents
            .get(s)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// The keys that `t` depends on.
    pub fn dependees(&self, t: &str) -> impl Iterator<Item = &str> + '_ {
        self.dependees
            .get(t)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// True if at least one edge (s, _) exists. Allocation-free.
    pub fn has_dependents(&self, s: &str) -> bool {
        self.dependents.contains_key(s)
    }

    /// True if at least one edge (_, t) exists. Allocation-free.
    pub fn has_dependees(&self, t: &str) -> bool {
        self.dependees.contains_key(t)
    }

    /// Remove every edge (s, r), then add (s, t) for each t in `new_dependents`.
    pub fn replace_dependents<I>(&mut self, s: &str, new_dependents: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let old: Vec<String> = self.dependents(s).map(str::to_string).collect();
        for t in old {
            self.remove_dependency(s, &t);
        }
        for t in new_dependents {
            self.add_dependency(s, t.as_ref());
        }
    }

    /// Remove every edge (r, t), then add (s, t) for each s in `new_dependees`.
    pub fn replace_dependees<I>(&mut self, t: &str, new_dependees: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let old: Vec<String> = self.dependees(t).map(str::to_string).collect();
        for s in old {
            self.remove_dependency(&s, t);
        }
        for s in new_dependees {
            self.add_dependency(s.as_ref(), t);
        }
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        let mut edges = 0;
        for (s, dependents) in &self.dependents {
            assert!(
                !dependents.is_empty(),
                "empty dependents set stored for {s:?}"
            );
            for t in dependents {
                edges += 1;
                assert!(
                    self.dependees.get(t).is_some_and(|set| set.contains(s)),
                    "missing mirror edge: {t:?} should list {s:?} as a dependee"
                );
            }
        }
        for (t, dependees) in &self.dependees {
            assert!(!dependees.is_empty(), "empty dependees set stored for {t:?}");
            for s in dependees {
                assert!(
                    self.dependents.get(s).is_some_and(|set| set.contains(t)),
                    "missing mirror edge: {s:?} should list {t:?} as a dependent"
                );
            }
        }
        assert_eq!(self.size, edges, "size counter out of sync with edge set");
    }
}
