//! reqlsim - in-process ReQL query engine
//!
//! Evaluates query trees against an in-memory, persistent catalog with the
//! semantics of the real server, for use as a test double.

pub mod ast;
pub mod binder;
pub mod catalog;
pub mod error;
pub mod executor;
pub mod semantics;
pub mod storage;
pub mod types;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

pub use ast::{AdminOp, BinaryOp, ByFuncOp, Func, Node, OrderKey, TernaryOp, UnaryOp};
pub use binder::Scope;
pub use catalog::{Catalog, Database};
pub use error::{ErrorKind, ReqlError, Result};
pub use executor::RunContext;
pub use semantics::Direction;
pub use storage::{ConflictPolicy, Table, WriteReport};
pub use types::{Datum, GroupResults, Object};

/// Configuration for an [`Engine`].
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Database used when a query names none and the run supplies none.
    pub default_db: Option<String>,
    /// Fixed instant for `now`; the wall clock at run start when unset.
    pub clock: Option<DateTime<Utc>>,
}

impl EngineConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default database.
    #[must_use]
    pub fn with_default_db(mut self, db: &str) -> Self {
        self.default_db = Some(db.to_string());
        self
    }

    /// Pins `now` to a fixed instant.
    #[must_use]
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }
}

/// Query runner over a baseline catalog.
///
/// Each [`Engine::run`] evaluates against one catalog snapshot. A run that
/// writes replaces the baseline with its final catalog when it succeeds; a
/// run that fails leaves the baseline untouched.
#[derive(Debug)]
pub struct Engine {
    /// Engine configuration.
    config: EngineConfig,
    /// Catalog restored by [`Engine::reset`].
    initial: RwLock<Arc<Catalog>>,
    /// Current baseline.
    current: RwLock<Arc<Catalog>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Catalog::new())
    }
}

impl Engine {
    /// Creates an engine over `catalog` with the default configuration.
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, EngineConfig::default())
    }

    /// Creates an engine with an explicit configuration.
    #[must_use]
    pub fn with_config(catalog: Catalog, config: EngineConfig) -> Self {
        let catalog = Arc::new(catalog);
        Engine {
            config,
            initial: RwLock::new(Arc::clone(&catalog)),
            current: RwLock::new(catalog),
        }
    }

    /// Creates an engine from a JSON bootstrap document (see [`Catalog::from_json`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed.
    pub fn from_json(data: &serde_json::Value) -> Result<Self> {
        Ok(Self::new(Catalog::from_json(data)?))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the current baseline catalog.
    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.current.read())
    }

    /// Runs a query and returns its externally visible result.
    ///
    /// `db` is the default database for this run; it falls back to the
    /// configured default. Grouped results come back as an object keyed by
    /// group key.
    ///
    /// # Errors
    ///
    /// Returns any error raised during evaluation, or a runtime error when
    /// the result is a bare function.
    pub fn run(&self, query: &Node, db: Option<&str>) -> Result<Datum> {
        let default_db = db
            .map(ToString::to_string)
            .or_else(|| self.config.default_db.clone());
        let now = self.config.clock.unwrap_or_else(Utc::now);
        debug!(
            kind = query.kind_name(),
            operands = query.operands().len(),
            db = ?default_db,
            "run query"
        );

        let mut ctx = RunContext::new(self.catalog(), now, default_db);
        let result = query.run(&mut ctx, &Scope::new())?;
        let result = reify(result)?;

        if ctx.is_mutated() {
            *self.current.write() = ctx.into_catalog();
            debug!("committed new catalog");
        }
        Ok(result)
    }

    /// Restores the catalog the engine was created (or last reset) with.
    pub fn reset(&self) {
        let initial = Arc::clone(&self.initial.read());
        *self.current.write() = initial;
    }

    /// Replaces both the initial and the current catalog.
    pub fn reset_data(&self, catalog: Catalog) {
        let catalog = Arc::new(catalog);
        *self.initial.write() = Arc::clone(&catalog);
        *self.current.write() = catalog;
    }

    /// Replaces the data from a JSON bootstrap document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed; the data is unchanged then.
    pub fn reset_data_json(&self, data: &serde_json::Value) -> Result<()> {
        self.reset_data(Catalog::from_json(data)?);
        Ok(())
    }

    /// Opens a connection targeting `db`.
    #[must_use]
    pub fn connect(&self, db: Option<&str>) -> Connection<'_> {
        Connection {
            engine: self,
            db: db.map(ToString::to_string),
        }
    }

    /// Runs `f` with a connection, then resets the data.
    pub fn session<T>(&self, db: Option<&str>, f: impl FnOnce(&mut Connection<'_>) -> T) -> T {
        let mut conn = self.connect(db);
        let out = f(&mut conn);
        self.reset();
        out
    }
}

/// Converts a run result into a plain datum.
fn reify(value: Datum) -> Result<Datum> {
    match value {
        Datum::Grouped(groups) => {
            let entries = groups.into_entries();
            let rendered: BTreeSet<String> = entries
                .iter()
                .filter(|(key, _)| !matches!(key, Datum::String(_)))
                .map(|(key, _)| key.to_json().to_string())
                .collect();
            let mut obj = Object::new();
            for (key, value) in entries {
                obj.insert(group_key_text(key, &rendered), reify(value)?);
            }
            Ok(Datum::Object(obj))
        }
        Datum::Literal(inner) => reify(*inner),
        Datum::Func(func) => Err(ReqlError::Runtime(format!(
            "Query result must be a datum, not a function: {func}"
        ))),
        Datum::Array(items) => items
            .into_iter()
            .map(reify)
            .collect::<Result<Vec<_>>>()
            .map(Datum::Array),
        Datum::Object(obj) => obj
            .into_iter()
            .map(|(k, v)| Ok((k, reify(v)?)))
            .collect::<Result<Object>>()
            .map(Datum::Object),
        other => Ok(other),
    }
}

/// Renders a group key as an object key.
///
/// Strings are kept verbatim unless another key renders to the same text,
/// in which case the string is JSON-quoted too.
fn group_key_text(key: Datum, rendered: &BTreeSet<String>) -> String {
    match key {
        Datum::String(s) if !rendered.contains(&s) => s,
        other => other.to_json().to_string(),
    }
}

/// A handle that runs queries against a target database.
#[derive(Debug, Clone)]
pub struct Connection<'a> {
    engine: &'a Engine,
    db: Option<String>,
}

impl Connection<'_> {
    /// Changes the target database.
    pub fn use_db(&mut self, db: &str) {
        self.db = Some(db.to_string());
    }

    /// Returns the target database.
    #[must_use]
    pub fn db(&self) -> Option<&str> {
        self.db.as_deref()
    }

    /// Runs a query with this connection's database as the default.
    ///
    /// # Errors
    ///
    /// See [`Engine::run`].
    pub fn run(&self, query: &Node) -> Result<Datum> {
        self.engine.run(query, self.db.as_deref())
    }

    /// Replaces the engine's data.
    pub fn reset_data(&self, catalog: Catalog) {
        self.engine.reset_data(catalog);
    }
}
