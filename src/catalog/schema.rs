//! Persistent catalog and database values.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::ast::Func;
use crate::error::{ReqlError, Result};
use crate::storage::Table;
use crate::types::Datum;

/// Catalog of all databases.
///
/// Databases and tables are shared through `Arc`; replacing one table
/// produces a new catalog that still shares every other table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    databases: BTreeMap<String, Arc<Database>>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Catalog {
            databases: BTreeMap::new(),
        }
    }

    /// Builds a catalog from a JSON bootstrap document.
    ///
    /// The document has the shape
    /// `{"databases": {db: {"tables": {name: table}}}}` (`"dbs"` is accepted
    /// in place of `"databases"`). A table is either an array of rows or
    /// `{"rows": [...], "indexes": {name: spec}}`, where an index spec is a
    /// field name, an array of field names, or `{"field"|"fields": ..., "multi": bool}`.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the document does not have that shape or
    /// a table's rows are invalid.
    pub fn from_json(data: &Json) -> Result<Self> {
        let dbs = data
            .get("databases")
            .or_else(|| data.get("dbs"))
            .and_then(Json::as_object)
            .ok_or_else(|| bad_shape("expected a `databases` object"))?;

        let mut catalog = Catalog::new();
        for (db_name, db_data) in dbs {
            let mut db = Database::new(db_name);
            let tables = match db_data.get("tables") {
                Some(Json::Object(tables)) => tables.clone(),
                Some(_) => return Err(bad_shape("`tables` must be an object")),
                None => serde_json::Map::new(),
            };
            for (table_name, table_data) in &tables {
                db = db.with_table(table_from_json(table_name, table_data)?);
            }
            catalog = catalog.with_database(db);
        }
        Ok(catalog)
    }

    /// Returns a database by name.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the database does not exist.
    pub fn db(&self, name: &str) -> Result<&Arc<Database>> {
        self.databases
            .get(name)
            .ok_or_else(|| ReqlError::Runtime(format!("Database `{name}` does not exist.")))
    }

    #[must_use]
    pub fn db_exists(&self, name: &str) -> bool {
        self.databases.contains_key(name)
    }

    /// Returns database names in sorted order.
    #[must_use]
    pub fn list_dbs(&self) -> Vec<String> {
        self.databases.keys().cloned().collect()
    }

    /// Returns a catalog with an additional empty database.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the database already exists.
    pub fn create_db(&self, name: &str) -> Result<Catalog> {
        if self.db_exists(name) {
            return Err(ReqlError::Runtime(format!(
                "Database `{name}` already exists."
            )));
        }
        Ok(self.with_database(Database::new(name)))
    }

    /// Returns a catalog without the named database.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the database does not exist.
    pub fn drop_db(&self, name: &str) -> Result<Catalog> {
        self.db(name)?;
        let mut next = self.clone();
        next.databases.remove(name);
        Ok(next)
    }

    /// Returns a catalog with `db` added or replaced.
    #[must_use]
    pub fn with_database(&self, db: Database) -> Catalog {
        let mut next = self.clone();
        next.databases.insert(db.name().to_string(), Arc::new(db));
        next
    }

    /// Returns a table by database and table name.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if either does not exist.
    pub fn table(&self, db: &str, name: &str) -> Result<&Arc<Table>> {
        self.db(db)?.table(name)
    }

    /// Returns a catalog in which `table` replaces the same-named table of `db`.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the database does not exist.
    pub fn with_table(&self, db: &str, table: Table) -> Result<Catalog> {
        let database = self.db(db)?.with_table(table);
        Ok(self.with_database(database))
    }
}

fn bad_shape(detail: &str) -> ReqlError {
    ReqlError::Runtime(format!("Invalid catalog data: {detail}."))
}

fn table_from_json(name: &str, data: &Json) -> Result<Table> {
    let (rows, indexes) = match data {
        Json::Array(rows) => (rows.as_slice(), None),
        Json::Object(body) => (
            body.get("rows")
                .and_then(Json::as_array)
                .map_or(&[][..], Vec::as_slice),
            body.get("indexes").and_then(Json::as_object),
        ),
        _ => return Err(bad_shape("a table must be an array or an object")),
    };

    let mut table = Table::with_rows(name, rows.iter().map(Datum::from_json).collect())?;
    for (index_name, spec) in indexes.into_iter().flatten() {
        let (derive, multi) = index_from_json(spec)?;
        table = table.create_index(index_name, Arc::new(derive), multi)?;
    }
    Ok(table)
}

fn index_from_json(spec: &Json) -> Result<(Func, bool)> {
    let field_list = |items: &Vec<Json>| -> Result<Func> {
        let names = items
            .iter()
            .map(|f| {
                f.as_str()
                    .ok_or_else(|| bad_shape("index fields must be strings"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Func::fields(&names))
    };
    match spec {
        Json::String(field) => Ok((Func::field(field), false)),
        Json::Array(fields) => Ok((field_list(fields)?, false)),
        Json::Object(body) => {
            let multi = body.get("multi").and_then(Json::as_bool).unwrap_or(false);
            let derive = match (body.get("field"), body.get("fields")) {
                (Some(Json::String(field)), _) => Func::field(field),
                (_, Some(Json::Array(fields))) => field_list(fields)?,
                _ => return Err(bad_shape("index needs `field` or `fields`")),
            };
            Ok((derive, multi))
        }
        _ => Err(bad_shape("unsupported index spec")),
    }
}

/// A named collection of tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Database {
    name: String,
    tables: BTreeMap<String, Arc<Table>>,
}

impl Database {
    /// Creates an empty database.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Database {
            name: name.to_string(),
            tables: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a table by name.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the table does not exist.
    pub fn table(&self, name: &str) -> Result<&Arc<Table>> {
        self.tables.get(name).ok_or_else(|| {
            ReqlError::Runtime(format!("Table `{}.{name}` does not exist.", self.name))
        })
    }

    #[must_use]
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Returns table names in sorted order.
    #[must_use]
    pub fn list_tables(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    /// Returns a database with an additional empty table.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the table already exists.
    pub fn create_table(&self, name: &str) -> Result<Database> {
        if self.table_exists(name) {
            return Err(ReqlError::Runtime(format!(
                "Table `{}.{name}` already exists.",
                self.name
            )));
        }
        Ok(self.with_table(Table::new(name)))
    }

    /// Returns a database without the named table.
    ///
    /// # Errors
    ///
    /// Returns a runtime error if the table does not exist.
    pub fn drop_table(&self, name: &str) -> Result<Database> {
        self.table(name)?;
        let mut next = self.clone();
        next.tables.remove(name);
        Ok(next)
    }

    /// Returns a database with `table` added or replaced.
    #[must_use]
    pub fn with_table(&self, table: Table) -> Database {
        let mut next = self.clone();
        next.tables.insert(table.name().to_string(), Arc::new(table));
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Catalog {
        Catalog::from_json(&json!({
            "dbs": {
                "x": {
                    "tables": {
                        "people": [{"id": "joe"}, {"id": "bob"}],
                        "things": {
                            "rows": [{"id": 1, "tags": ["a", "b"]}],
                            "indexes": {
                                "by_tag": {"field": "tags", "multi": true},
                                "pair": ["id", "tags"]
                            }
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_from_json_shapes() {
        let catalog = sample();
        assert_eq!(catalog.list_dbs(), vec!["x".to_string()]);
        let db = catalog.db("x").unwrap();
        assert_eq!(db.list_tables(), vec!["people".to_string(), "things".to_string()]);
        let things = db.table("things").unwrap();
        assert_eq!(things.list_indexes(), vec!["by_tag".to_string(), "pair".to_string()]);
        assert!(things.index("by_tag").unwrap().multi);
    }

    #[test]
    fn test_replacing_a_table_shares_the_rest() {
        let catalog = sample();
        let people = catalog.table("x", "people").unwrap();
        let next = catalog.with_table("x", Table::new("things")).unwrap();
        assert!(Arc::ptr_eq(people, next.table("x", "people").unwrap()));
        assert_eq!(catalog.table("x", "things").unwrap().len(), 1);
        assert!(next.table("x", "things").unwrap().is_empty());
    }

    #[test]
    fn test_db_and_table_lifecycle_errors() {
        let catalog = sample();
        assert!(catalog.create_db("x").is_err());
        assert!(catalog.drop_db("nope").is_err());
        let db = catalog.db("x").unwrap();
        assert!(db.create_table("people").is_err());
        assert!(db.drop_table("nope").is_err());
        let dropped = db.drop_table("people").unwrap();
        assert_eq!(dropped.list_tables(), vec!["things".to_string()]);
    }

    #[test]
    fn test_missing_table_message() {
        let err = sample().table("x", "nope").unwrap_err();
        assert_eq!(err, ReqlError::runtime("Table `x.nope` does not exist."));
    }
}
