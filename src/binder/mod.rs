//! Binder module for variable scoping.
//!
//! Function application binds formal parameters to evaluated arguments in a
//! fresh child [`Scope`]; variable references resolve against that chain.

mod scope;

pub use scope::Scope;
