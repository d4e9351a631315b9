//! Catalog of databases and their tables.

mod schema;

pub use schema::{Catalog, Database};
