//! Semantic utilities shared by the evaluator.
//!
//! These are the algorithms whose behavior has to match the server exactly:
//! stable multi-key sort, null-aware min/max, grouping, structural distinct,
//! deep merge with literal override and range membership.

mod aggregate;
mod array;
mod distinct;
mod merge;
mod range;
mod sort;

pub use aggregate::{group_by, max_by, min_by, safe_average, safe_sum};
pub use array::{change_at, delete_at, insert_at, normalize_index, slice, splice_at};
pub use distinct::{
    canonicalize, distinct, set_difference, set_insert, set_intersection, set_union,
    StructuralSet,
};
pub use merge::{contains_literals, has_nested_literal, merge_with, strip_literals};
pub use range::{Bound, KeyRange};
pub use sort::{sort_by_fields, sort_by_many, Direction};
