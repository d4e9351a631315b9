//! Positional array edits with server-style index handling.

use crate::error::{ReqlError, Result};
use crate::types::Datum;

/// Resolves a possibly negative index against `len`.
///
/// `allow_end` accepts `len` itself, as insertion points do.
///
/// # Errors
///
/// Returns a runtime error when the index is out of bounds or not an integer.
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn normalize_index(index: f64, len: usize, allow_end: bool) -> Result<usize> {
    if index.fract() != 0.0 {
        return Err(ReqlError::Runtime(format!(
            "Number not an integer: {index}"
        )));
    }
    let len_f = len as f64;
    let resolved = if index < 0.0 { len_f + index } else { index };
    let limit = if allow_end { len_f } else { len_f - 1.0 };
    if resolved < 0.0 || resolved > limit {
        return Err(ReqlError::Runtime(format!(
            "Index `{index}` out of bounds for array of size: `{len}`."
        )));
    }
    Ok(resolved as usize)
}

/// Inserts `value` before position `index`.
///
/// # Errors
///
/// Returns a runtime error when `index` is out of bounds.
pub fn insert_at(mut seq: Vec<Datum>, index: f64, value: Datum) -> Result<Vec<Datum>> {
    let at = normalize_index(index, seq.len(), true)?;
    seq.insert(at, value);
    Ok(seq)
}

/// Inserts every element of `values` before position `index`.
///
/// # Errors
///
/// Returns a runtime error when `index` is out of bounds.
pub fn splice_at(mut seq: Vec<Datum>, index: f64, values: Vec<Datum>) -> Result<Vec<Datum>> {
    let at = normalize_index(index, seq.len(), true)?;
    let tail = seq.split_off(at);
    seq.extend(values);
    seq.extend(tail);
    Ok(seq)
}

/// Replaces the element at `index`.
///
/// # Errors
///
/// Returns a runtime error when `index` is out of bounds.
pub fn change_at(mut seq: Vec<Datum>, index: f64, value: Datum) -> Result<Vec<Datum>> {
    let at = normalize_index(index, seq.len(), false)?;
    seq[at] = value;
    Ok(seq)
}

/// Removes the element at `index`, or the range `[index, end)` when `end` is given.
///
/// # Errors
///
/// Returns a runtime error when either index is out of bounds.
pub fn delete_at(mut seq: Vec<Datum>, index: f64, end: Option<f64>) -> Result<Vec<Datum>> {
    let start = normalize_index(index, seq.len(), false)?;
    let stop = match end {
        Some(end) => normalize_index(end, seq.len(), true)?,
        None => start + 1,
    };
    if stop > start {
        seq.drain(start..stop);
    }
    Ok(seq)
}

/// Returns `seq[start..end]` with negative indexes counted from the end.
///
/// Out-of-range bounds are clamped, matching the server's lenient slicing.
/// `right_closed` includes the element at `end`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap
)]
pub fn slice(seq: Vec<Datum>, start: f64, end: Option<f64>, right_closed: bool) -> Vec<Datum> {
    let len = seq.len() as f64;
    let clamp = |i: f64| {
        let resolved = if i < 0.0 { len + i } else { i };
        resolved.clamp(0.0, len)
    };
    let from = clamp(start) as usize;
    let mut to = end.map_or(len, clamp) as usize;
    if right_closed && end.is_some() {
        to = (to + 1).min(seq.len());
    }
    if to <= from {
        return Vec::new();
    }
    seq.into_iter().skip(from).take(to - from).collect()
}
