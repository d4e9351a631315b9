//! Null-aware min/max, numeric reductions and grouping.

use std::cmp::Ordering;

use crate::error::{ReqlError, Result};
use crate::types::{Datum, GroupResults};

fn extreme_by<F>(seq: Vec<Datum>, mut key: F, want: Ordering, what: &str) -> Result<Datum>
where
    F: FnMut(&Datum) -> Result<Option<Datum>>,
{
    let mut best: Option<(Datum, Datum)> = None;
    for item in seq {
        let Some(k) = key(&item)? else {
            continue;
        };
        let replace = match &best {
            Some((best_key, _)) => k.compare(best_key) == want,
            None => true,
        };
        if replace {
            best = Some((k, item));
        }
    }
    best.map(|(_, item)| item)
        .ok_or_else(|| ReqlError::Runtime(format!("Cannot take the {what} of an empty stream.")))
}

/// Returns the element with the smallest key; ties keep the first seen.
///
/// The key function returns `None` for elements that should be skipped.
/// Null keys sort below every real value, so a null key wins.
///
/// # Errors
///
/// Returns a runtime error if no element produced a key, or the first error
/// raised by `key`.
pub fn min_by<F>(seq: Vec<Datum>, key: F) -> Result<Datum>
where
    F: FnMut(&Datum) -> Result<Option<Datum>>,
{
    extreme_by(seq, key, Ordering::Less, "min")
}

/// Returns the element with the largest key; ties keep the first seen.
///
/// Null keys only win when every key is null.
///
/// # Errors
///
/// Returns a runtime error if no element produced a key, or the first error
/// raised by `key`.
pub fn max_by<F>(seq: Vec<Datum>, key: F) -> Result<Datum>
where
    F: FnMut(&Datum) -> Result<Option<Datum>>,
{
    extreme_by(seq, key, Ordering::Greater, "max")
}

/// Sums the numeric elements, ignoring everything else.
#[must_use]
pub fn safe_sum(seq: &[Datum]) -> f64 {
    seq.iter().filter_map(Datum::as_f64).sum()
}

/// Averages the numeric elements; `None` when there are none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn safe_average(seq: &[Datum]) -> Option<f64> {
    let numbers: Vec<f64> = seq.iter().filter_map(Datum::as_f64).collect();
    if numbers.is_empty() {
        None
    } else {
        Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
    }
}

/// Buckets `seq` by `key`, keeping encounter order within each bucket.
///
/// # Errors
///
/// Returns the first error raised by `key`.
pub fn group_by<F>(seq: Vec<Datum>, mut key: F) -> Result<GroupResults>
where
    F: FnMut(&Datum) -> Result<Datum>,
{
    let mut groups = GroupResults::new();
    for item in seq {
        let k = key(&item)?;
        groups.push(k, item);
    }
    Ok(groups)
}
