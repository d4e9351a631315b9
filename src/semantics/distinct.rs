//! Structural equality: canonical forms, distinct and set operations.

use std::collections::BTreeSet;

use crate::types::Datum;

/// Canonical form used for structural equality.
///
/// Arrays become their canonicalized elements in sorted order, so two arrays
/// holding the same elements in different order are equal. Objects are
/// already key-sorted; their values are canonicalized.
#[must_use]
pub fn canonicalize(value: &Datum) -> Datum {
    match value {
        Datum::Array(items) => {
            let mut canon: Vec<Datum> = items.iter().map(canonicalize).collect();
            canon.sort();
            Datum::Array(canon)
        }
        Datum::Object(obj) => Datum::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect(),
        ),
        Datum::Literal(payload) => canonicalize(payload),
        other => other.clone(),
    }
}

/// Set of values compared by canonical form.
#[derive(Debug, Clone, Default)]
pub struct StructuralSet {
    seen: BTreeSet<Datum>,
}

impl StructuralSet {
    #[must_use]
    pub fn new() -> Self {
        StructuralSet {
            seen: BTreeSet::new(),
        }
    }

    /// Adds a value; returns false if an equal value was already present.
    pub fn insert(&mut self, value: &Datum) -> bool {
        self.seen.insert(canonicalize(value))
    }

    /// Returns true if an equal value is present.
    #[must_use]
    pub fn contains(&self, value: &Datum) -> bool {
        self.seen.contains(&canonicalize(value))
    }
}

impl<'a> FromIterator<&'a Datum> for StructuralSet {
    fn from_iter<T: IntoIterator<Item = &'a Datum>>(iter: T) -> Self {
        let mut set = StructuralSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

/// Drops later duplicates, keeping first-seen order.
#[must_use]
pub fn distinct(seq: Vec<Datum>) -> Vec<Datum> {
    let mut seen = StructuralSet::new();
    seq.into_iter().filter(|v| seen.insert(v)).collect()
}

/// Adds `value` unless an equal element exists.
#[must_use]
pub fn set_insert(seq: Vec<Datum>, value: Datum) -> Vec<Datum> {
    let mut out = distinct(seq);
    if !out.iter().collect::<StructuralSet>().contains(&value) {
        out.push(value);
    }
    out
}

/// Distinct elements of both sequences, left first.
#[must_use]
pub fn set_union(left: Vec<Datum>, right: Vec<Datum>) -> Vec<Datum> {
    let mut joined = left;
    joined.extend(right);
    distinct(joined)
}

/// Distinct elements of `left` that also appear in `right`.
#[must_use]
pub fn set_intersection(left: Vec<Datum>, right: &[Datum]) -> Vec<Datum> {
    let keep: StructuralSet = right.iter().collect();
    distinct(left).into_iter().filter(|v| keep.contains(v)).collect()
}

/// Distinct elements of `left` that do not appear in `right`.
#[must_use]
pub fn set_difference(left: Vec<Datum>, right: &[Datum]) -> Vec<Datum> {
    let drop: StructuralSet = right.iter().collect();
    distinct(left).into_iter().filter(|v| !drop.contains(v)).collect()
}
