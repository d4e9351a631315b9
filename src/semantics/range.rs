//! Range membership for `between`.

use std::cmp::Ordering;

use crate::error::{ReqlError, Result};
use crate::types::Datum;

/// Whether a range end includes its bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Open,
    Closed,
}

impl Bound {
    /// Parses `"open"` / `"closed"`.
    ///
    /// # Errors
    ///
    /// Returns a runtime error for any other string.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "open" => Ok(Bound::Open),
            "closed" => Ok(Bound::Closed),
            other => Err(ReqlError::Runtime(format!(
                "Expected `open` or `closed` for bound, got `{other}`."
            ))),
        }
    }
}

/// Key range with independently configurable ends.
///
/// Defaults match the server: closed on the left, open on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRange {
    pub lower: Datum,
    pub upper: Datum,
    pub left_bound: Bound,
    pub right_bound: Bound,
}

impl KeyRange {
    /// Range `[lower, upper)`.
    #[must_use]
    pub fn new(lower: Datum, upper: Datum) -> Self {
        KeyRange {
            lower,
            upper,
            left_bound: Bound::Closed,
            right_bound: Bound::Open,
        }
    }

    #[must_use]
    pub fn with_left_bound(mut self, bound: Bound) -> Self {
        self.left_bound = bound;
        self
    }

    #[must_use]
    pub fn with_right_bound(mut self, bound: Bound) -> Self {
        self.right_bound = bound;
        self
    }

    /// Returns true if `key` lies inside the range.
    ///
    /// `MinVal`/`MaxVal` bounds compare below/above every key, also when
    /// they appear as components of a compound key.
    #[must_use]
    pub fn contains(&self, key: &Datum) -> bool {
        let above_lower = match key.compare(&self.lower) {
            Ordering::Greater => true,
            Ordering::Equal => self.left_bound == Bound::Closed,
            Ordering::Less => false,
        };
        let below_upper = match key.compare(&self.upper) {
            Ordering::Less => true,
            Ordering::Equal => self.right_bound == Bound::Closed,
            Ordering::Greater => false,
        };
        above_lower && below_upper
    }
}
