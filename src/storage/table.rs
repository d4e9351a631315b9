//! Persistent document tables.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::trace;
use uuid::Uuid;

use crate::ast::Func;
use crate::error::{ReqlError, Result};
use crate::storage::{Change, ConflictPolicy, WriteReport};
use crate::types::Datum;

/// Secondary index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    /// Derives the index key from a row.
    pub derive: Arc<Func>,
    /// Multi indexes are keyed by every element of the derived array.
    pub multi: bool,
}

impl IndexDef {
    /// Creates an index definition.
    #[must_use]
    pub fn new(derive: Arc<Func>, multi: bool) -> Self {
        IndexDef { derive, multi }
    }
}

/// An ordered collection of rows keyed by `id`, plus its index definitions.
///
/// Every mutating method takes `&self` and returns a new table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    name: String,
    rows: Vec<Datum>,
    indexes: BTreeMap<String, IndexDef>,
}

fn row_id(row: &Datum) -> Option<&Datum> {
    row.as_object().and_then(|obj| obj.get("id"))
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Table {
            name: name.to_string(),
            rows: Vec::new(),
            indexes: BTreeMap::new(),
        }
    }

    /// Creates a table holding `rows`.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if a row is not an object, lacks an `id`, or
    /// repeats another row's `id`.
    pub fn with_rows(name: &str, rows: Vec<Datum>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for row in &rows {
            let id = row_id(row).ok_or_else(|| {
                ReqlError::Runtime(format!("Row in table `{name}` has no primary key: {row}"))
            })?;
            if !seen.insert(id) {
                return Err(ReqlError::Runtime(format!(
                    "Duplicate primary key `id` in table `{name}`: {id}"
                )));
            }
        }
        Ok(Table {
            name: name.to_string(),
            rows,
            indexes: BTreeMap::new(),
        })
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the rows in table order.
    #[must_use]
    pub fn rows(&self) -> &[Datum] {
        &self.rows
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Finds a row by primary key.
    #[must_use]
    pub fn get(&self, id: &Datum) -> Option<&Datum> {
        self.rows.iter().find(|row| row_id(row) == Some(id))
    }

    /// Inserts documents, resolving existing ids with `policy`.
    ///
    /// Documents without an `id` get a generated UUID. The resulting rows are
    /// the rows no document touched, in their old order, followed by the
    /// touched rows in input order.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if a document is not an object.
    pub fn insert(&self, docs: Vec<Datum>, policy: ConflictPolicy) -> Result<(Table, WriteReport)> {
        let mut report = WriteReport::default();
        let mut current: BTreeMap<Datum, Datum> = self
            .rows
            .iter()
            .filter_map(|row| row_id(row).map(|id| (id.clone(), row.clone())))
            .collect();
        let mut touched: Vec<Datum> = Vec::new();
        let mut touched_ids: BTreeSet<Datum> = BTreeSet::new();

        for doc in docs {
            let mut body = doc.into_object()?;
            let id = if let Some(id) = body.get("id") {
                id.clone()
            } else {
                let key = Uuid::new_v4().to_string();
                report.generated_keys.push(key.clone());
                body.insert("id".to_string(), Datum::from(key.clone()));
                Datum::from(key)
            };
            let doc = Datum::Object(body);

            let new_row = match current.get(&id) {
                Some(old) => {
                    let new_row = match policy {
                        ConflictPolicy::Error => {
                            report.record_error(format!(
                                "Duplicate primary key `id`:\n{old}\n{doc}"
                            ));
                            continue;
                        }
                        ConflictPolicy::Update => {
                            let mut merged = old.clone().into_object()?;
                            merged.extend(doc.into_object()?);
                            Datum::Object(merged)
                        }
                        ConflictPolicy::Replace => doc,
                    };
                    report.replaced += 1;
                    report.changes.push(Change::new(old.clone(), new_row.clone()));
                    new_row
                }
                None => {
                    report.inserted += 1;
                    report.changes.push(Change::new(Datum::Null, doc.clone()));
                    doc
                }
            };

            match touched.iter().position(|row| row_id(row) == Some(&id)) {
                Some(pos) => touched[pos] = new_row.clone(),
                None => touched.push(new_row.clone()),
            }
            current.insert(id.clone(), new_row);
            touched_ids.insert(id);
        }

        let mut rows: Vec<Datum> = self
            .rows
            .iter()
            .filter(|row| row_id(row).map_or(true, |id| !touched_ids.contains(id)))
            .cloned()
            .collect();
        rows.extend(touched);

        trace!(
            table = %self.name,
            inserted = report.inserted,
            replaced = report.replaced,
            errors = report.errors,
            "insert"
        );
        Ok((self.with_row_vec(rows), report))
    }

    /// Replaces rows in place, matching by `id`.
    ///
    /// Rows whose `id` is not in the table are skipped.
    #[must_use]
    pub fn update_by_id(&self, updated: Vec<Datum>) -> (Table, WriteReport) {
        let mut report = WriteReport::default();
        let mut rows = self.rows.clone();
        for new_row in updated {
            let Some(pos) = row_id(&new_row)
                .and_then(|id| rows.iter().position(|row| row_id(row) == Some(id)))
            else {
                continue;
            };
            let old = std::mem::replace(&mut rows[pos], new_row.clone());
            report.replaced += 1;
            report.changes.push(Change::new(old, new_row));
        }
        trace!(table = %self.name, replaced = report.replaced, "update");
        (self.with_row_vec(rows), report)
    }

    /// Removes the rows with the given ids. Unknown ids are ignored.
    #[must_use]
    pub fn remove_by_id(&self, ids: &[Datum]) -> (Table, WriteReport) {
        let mut report = WriteReport::default();
        let mut rows = self.rows.clone();
        for id in ids {
            if let Some(pos) = rows.iter().position(|row| row_id(row) == Some(id)) {
                let old = rows.remove(pos);
                report.deleted += 1;
                report.changes.push(Change::new(old, Datum::Null));
            }
        }
        trace!(table = %self.name, deleted = report.deleted, "delete");
        (self.with_row_vec(rows), report)
    }

    fn with_row_vec(&self, rows: Vec<Datum>) -> Table {
        Table {
            name: self.name.clone(),
            rows,
            indexes: self.indexes.clone(),
        }
    }

    /// Registers a secondary index.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the index already exists.
    pub fn create_index(&self, name: &str, derive: Arc<Func>, multi: bool) -> Result<Table> {
        if self.indexes.contains_key(name) {
            return Err(ReqlError::Runtime(format!(
                "Index `{name}` already exists on table `{}`.",
                self.name
            )));
        }
        let mut table = self.clone();
        table
            .indexes
            .insert(name.to_string(), IndexDef::new(derive, multi));
        Ok(table)
    }

    /// Removes a secondary index.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the index does not exist.
    pub fn drop_index(&self, name: &str) -> Result<Table> {
        self.index(name).map_err(|e| ReqlError::Runtime(e.message().to_string()))?;
        let mut table = self.clone();
        table.indexes.remove(name);
        Ok(table)
    }

    /// Renames a secondary index.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if `old` is missing or `new` already exists.
    pub fn rename_index(&self, old: &str, new: &str) -> Result<Table> {
        let mut table = self.clone();
        let def = table
            .indexes
            .remove(old)
            .ok_or_else(|| ReqlError::Runtime(self.missing_index(old)))?;
        if table.indexes.contains_key(new) {
            return Err(ReqlError::Runtime(format!(
                "Index `{new}` already exists on table `{}`.",
                self.name
            )));
        }
        table.indexes.insert(new.to_string(), def);
        Ok(table)
    }

    /// Returns the index names in sorted order.
    #[must_use]
    pub fn list_indexes(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    #[must_use]
    pub fn index_exists(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Looks up an index definition.
    ///
    /// # Errors
    ///
    /// Returns a compile error if the index does not exist.
    pub fn index(&self, name: &str) -> Result<&IndexDef> {
        self.indexes
            .get(name)
            .ok_or_else(|| ReqlError::Compile(self.missing_index(name)))
    }

    fn missing_index(&self, name: &str) -> String {
        format!("Index `{name}` was not found on table `{}`.", self.name)
    }

    /// Computes the index keys of every row, in table order.
    ///
    /// `derive` evaluates the index function against one row. Rows for which
    /// it raises a non-existence error are left out. A multi index yields
    /// every element of the derived array as a key of its row; other indexes
    /// yield exactly one key per row.
    ///
    /// # Errors
    ///
    /// Returns a compile error for an unknown index, or any other error
    /// raised by `derive`.
    pub fn index_values<F>(&self, name: &str, mut derive: F) -> Result<Vec<(Vec<Datum>, &Datum)>>
    where
        F: FnMut(&Func, &Datum) -> Result<Datum>,
    {
        let def = self.index(name)?;
        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let key = match derive(&def.derive, row) {
                Ok(key) => key,
                Err(ReqlError::NonExistence(_)) => continue,
                Err(e) => return Err(e),
            };
            let keys = match (def.multi, key) {
                (true, Datum::Array(keys)) => keys,
                (_, key) => vec![key],
            };
            out.push((keys, row));
        }
        Ok(out)
    }
}
