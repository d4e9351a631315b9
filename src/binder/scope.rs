//! Lexical scope for variable binding during evaluation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ReqlError, Result};
use crate::types::Datum;

/// Immutable binding frame with a link to its parent.
///
/// Frames are never mutated after construction: `push` creates a child and
/// leaves the receiver untouched, so sibling branches never observe each
/// other's bindings.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    /// Symbol -> bound value for this frame only.
    values: HashMap<String, Datum>,
    /// Enclosing frame.
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// Creates a new empty root scope.
    #[must_use]
    pub fn new() -> Self {
        Scope {
            values: HashMap::new(),
            parent: None,
        }
    }

    /// Creates a child scope holding `bindings` with this scope as parent.
    #[must_use]
    pub fn push<I>(&self, bindings: I) -> Scope
    where
        I: IntoIterator<Item = (String, Datum)>,
    {
        Scope {
            values: bindings.into_iter().collect(),
            parent: Some(Arc::new(self.clone())),
        }
    }

    /// Looks up a symbol, checking parent scopes if not found.
    ///
    /// # Errors
    ///
    /// Returns `NameNotBound` when no frame in the chain binds `name`.
    pub fn get(&self, name: &str) -> Result<&Datum> {
        self.lookup(name)
            .ok_or_else(|| ReqlError::NameNotBound(name.to_string()))
    }

    fn lookup(&self, name: &str) -> Option<&Datum> {
        if let Some(value) = self.values.get(name) {
            return Some(value);
        }
        if let Some(ref parent) = self.parent {
            return parent.lookup(name);
        }
        None
    }

    /// Returns true if `name` is bound in this scope or any parent.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Returns the number of frames from this one to the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        1 + self.parent.as_ref().map_or(0, |p| p.depth())
    }

    /// Returns every visible binding; inner frames shadow outer ones.
    #[must_use]
    pub fn flattened(&self) -> HashMap<String, Datum> {
        let mut out = self
            .parent
            .as_ref()
            .map(|p| p.flattened())
            .unwrap_or_default();
        out.extend(self.values.iter().map(|(k, v)| (k.clone(), v.clone())));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind(name: &str, value: i32) -> Vec<(String, Datum)> {
        vec![(name.to_string(), Datum::from(value))]
    }

    #[test]
    fn test_lookup_walks_parents() {
        let root = Scope::new().push(bind("x", 1));
        let child = root.push(bind("y", 2));
        assert_eq!(child.get("x").unwrap(), &Datum::from(1));
        assert_eq!(child.get("y").unwrap(), &Datum::from(2));
        assert_eq!(child.depth(), 3);
    }

    #[test]
    fn test_siblings_are_isolated() {
        let root = Scope::new().push(bind("x", 1));
        let left = root.push(bind("a", 10));
        let right = root.push(bind("b", 20));
        assert!(left.contains("a"));
        assert!(!left.contains("b"));
        assert!(!right.contains("a"));
        assert!(!root.contains("a"));
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let outer = Scope::new().push(bind("x", 1));
        let inner = outer.push(bind("x", 2));
        assert_eq!(inner.get("x").unwrap(), &Datum::from(2));
        assert_eq!(outer.get("x").unwrap(), &Datum::from(1));
        assert_eq!(inner.flattened().get("x"), Some(&Datum::from(2)));
    }

    #[test]
    fn test_missing_symbol_is_name_not_bound() {
        let scope = Scope::new();
        assert_eq!(
            scope.get("nope").unwrap_err(),
            ReqlError::NameNotBound("nope".into())
        );
    }
}
