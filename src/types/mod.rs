//! Runtime value types.

mod group;
mod value;

pub use group::GroupResults;
pub use value::{Datum, Object};
