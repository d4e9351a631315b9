//! Grouped intermediate results.

use crate::error::Result;
use crate::types::Datum;

/// Ordered mapping from grouping key to that group's value.
///
/// Keys keep first-seen order. A key that was never inserted reads as an
/// empty sequence.
#[derive(Debug, Clone, Default)]
pub struct GroupResults {
    entries: Vec<(Datum, Datum)>,
}

impl GroupResults {
    /// Creates an empty set of groups.
    #[must_use]
    pub fn new() -> Self {
        GroupResults {
            entries: Vec::new(),
        }
    }

    /// Returns the value stored for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &Datum) -> Option<&Datum> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the value for `key`, or an empty sequence for unseen keys.
    #[must_use]
    pub fn get_or_empty(&self, key: &Datum) -> Datum {
        self.get(key).cloned().unwrap_or(Datum::Array(Vec::new()))
    }

    /// Appends `value` to the sequence bucket of `key`, creating it on first use.
    pub fn push(&mut self, key: Datum, value: Datum) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, Datum::Array(items))) => items.push(value),
            Some((_, slot)) => *slot = Datum::Array(vec![slot.clone(), value]),
            None => self.entries.push((key, Datum::Array(vec![value]))),
        }
    }

    /// Sets the value for `key`, keeping its original position if present.
    pub fn insert(&mut self, key: Datum, value: Datum) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Iterates over `(key, value)` pairs in key order of first appearance.
    pub fn iter(&self) -> impl Iterator<Item = (&Datum, &Datum)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Returns the group keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &Datum> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// Returns the number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies `f` to every group value, keeping keys and order.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map_values<F>(self, mut f: F) -> Result<GroupResults>
    where
        F: FnMut(Datum) -> Result<Datum>,
    {
        let entries = self
            .entries
            .into_iter()
            .map(|(k, v)| Ok((k, f(v)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(GroupResults { entries })
    }

    /// Consumes the groups into their `(key, value)` pairs.
    #[must_use]
    pub fn into_entries(self) -> Vec<(Datum, Datum)> {
        self.entries
    }
}

impl FromIterator<(Datum, Datum)> for GroupResults {
    fn from_iter<T: IntoIterator<Item = (Datum, Datum)>>(iter: T) -> Self {
        let mut groups = GroupResults::new();
        for (k, v) in iter {
            groups.insert(k, v);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_preserves_first_seen_order() {
        let mut groups = GroupResults::new();
        groups.push(Datum::from("b"), Datum::from(1));
        groups.push(Datum::from("a"), Datum::from(2));
        groups.push(Datum::from("b"), Datum::from(3));

        let keys: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(keys, vec![Datum::from("b"), Datum::from("a")]);
        assert_eq!(
            groups.get(&Datum::from("b")),
            Some(&Datum::Array(vec![Datum::from(1), Datum::from(3)]))
        );
    }

    #[test]
    fn test_unseen_key_reads_as_empty() {
        let groups = GroupResults::new();
        assert_eq!(groups.get_or_empty(&Datum::from("x")), Datum::Array(vec![]));
    }
}
