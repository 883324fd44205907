//! Schema catalog: table, column, and index metadata with constraint rules.
//!
//! Table and column names are case-insensitive for lookup; the declared
//! case is preserved for output. The catalog is persisted as a single
//! document by the storage engine after every DDL statement.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::{ColumnDef, CreateIndexStatement, CreateTableStatement};
use crate::error::{Error, Result};
use crate::types::{DataType, Value};

/// Schema information for a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: DataType,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key: bool,
    /// Default value, already coerced to the column type.
    pub default: Option<Value>,
}

impl ColumnSchema {
    /// Coerce a value for this column and enforce NOT NULL.
    pub fn check_value(&self, value: Value) -> Result<Value> {
        let value = self.data_type.coerce(value).map_err(|e| match e {
            Error::Type(msg) => Error::type_error(format!("column '{}': {}", self.name, msg)),
            Error::Constraint(msg) => {
                Error::constraint(format!("column '{}': {}", self.name, msg))
            }
            other => other,
        })?;
        if value.is_null() && self.not_null {
            return Err(Error::constraint(format!(
                "column '{}' cannot be null",
                self.name
            )));
        }
        Ok(value)
    }
}

/// Definition of a secondary or constraint-backed index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub column: String,
    pub unique: bool,
    /// True for indexes created implicitly by PRIMARY KEY / UNIQUE columns;
    /// these cannot be dropped with DROP INDEX.
    pub implicit: bool,
}

/// Schema information for a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub primary_key: Option<String>,
    pub indexes: Vec<IndexDef>,
}

impl TableSchema {
    /// Get a column by name (case-insensitive).
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Look up a column, failing with a schema error when absent.
    pub fn require_column(&self, name: &str) -> Result<&ColumnSchema> {
        self.get_column(name).ok_or_else(|| {
            Error::schema(format!(
                "unknown column '{}' in table '{}'",
                name, self.name
            ))
        })
    }

    /// Get all column names in declared order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Indexes covering the given column (case-insensitive).
    pub fn indexes_on<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a IndexDef> + 'a {
        self.indexes
            .iter()
            .filter(move |i| i.column.eq_ignore_ascii_case(column))
    }
}

/// Registry of all table definitions, keyed case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    tables: IndexMap<String, TableSchema>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and register a table schema from a CREATE TABLE statement.
    pub fn create_table(&mut self, stmt: &CreateTableStatement) -> Result<&TableSchema> {
        let key = stmt.name.to_lowercase();
        if self.tables.contains_key(&key) {
            return Err(Error::schema(format!(
                "table '{}' already exists",
                stmt.name
            )));
        }
        if stmt.columns.is_empty() {
            return Err(Error::schema("a table needs at least one column"));
        }

        let mut columns = Vec::with_capacity(stmt.columns.len());
        let mut primary_key: Option<String> = None;
        let mut indexes = Vec::new();

        for def in &stmt.columns {
            if columns
                .iter()
                .any(|c: &ColumnSchema| c.name.eq_ignore_ascii_case(&def.name))
            {
                return Err(Error::schema(format!("duplicate column '{}'", def.name)));
            }
            if def.primary_key {
                if primary_key.is_some() {
                    return Err(Error::schema(format!(
                        "table '{}' declares more than one primary key",
                        stmt.name
                    )));
                }
                primary_key = Some(def.name.clone());
                indexes.push(IndexDef {
                    name: format!("{}_pkey", stmt.name.to_lowercase()),
                    table: stmt.name.clone(),
                    column: def.name.clone(),
                    unique: true,
                    implicit: true,
                });
            } else if def.unique {
                indexes.push(IndexDef {
                    name: format!(
                        "{}_{}_key",
                        stmt.name.to_lowercase(),
                        def.name.to_lowercase()
                    ),
                    table: stmt.name.clone(),
                    column: def.name.clone(),
                    unique: true,
                    implicit: true,
                });
            }
            columns.push(Self::column_schema(def)?);
        }

        let schema = TableSchema {
            name: stmt.name.clone(),
            columns,
            primary_key,
            indexes,
        };
        Ok(self.tables.entry(key).or_insert(schema))
    }

    fn column_schema(def: &ColumnDef) -> Result<ColumnSchema> {
        let mut column = ColumnSchema {
            name: def.name.clone(),
            data_type: def.data_type,
            not_null: def.not_null,
            unique: def.unique,
            primary_key: def.primary_key,
            default: None,
        };
        if let Some(lit) = &def.default {
            // Defaults are checked once at declaration time, so a bad
            // DEFAULT fails the CREATE TABLE instead of a later INSERT.
            let value = def.data_type.coerce(Value::from(lit)).map_err(|e| {
                Error::schema(format!("invalid default for column '{}': {}", def.name, e))
            })?;
            if value.is_null() && def.not_null {
                return Err(Error::schema(format!(
                    "column '{}' is NOT NULL but defaults to null",
                    def.name
                )));
            }
            column.default = Some(value);
        }
        Ok(column)
    }

    /// Register an already-built schema (used when loading the catalog).
    pub fn add_table(&mut self, schema: TableSchema) {
        self.tables.insert(schema.name.to_lowercase(), schema);
    }

    /// Remove a table definition.
    pub fn drop_table(&mut self, name: &str) -> Result<TableSchema> {
        self.tables
            .shift_remove(&name.to_lowercase())
            .ok_or_else(|| Error::schema(format!("unknown table '{}'", name)))
    }

    /// Look up a table (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(&name.to_lowercase())
    }

    /// Look up a table, failing with a schema error when absent.
    pub fn require(&self, name: &str) -> Result<&TableSchema> {
        self.get(name)
            .ok_or_else(|| Error::schema(format!("unknown table '{}'", name)))
    }

    fn require_mut(&mut self, name: &str) -> Result<&mut TableSchema> {
        self.tables
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| Error::schema(format!("unknown table '{}'", name)))
    }

    /// All table schemas in creation order.
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.values()
    }

    /// Find an index by name across all tables.
    pub fn find_index(&self, name: &str) -> Option<&IndexDef> {
        self.tables
            .values()
            .flat_map(|t| t.indexes.iter())
            .find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// Register a secondary index from a CREATE INDEX statement.
    pub fn create_index(&mut self, stmt: &CreateIndexStatement) -> Result<IndexDef> {
        if self.find_index(&stmt.name).is_some() {
            return Err(Error::schema(format!(
                "index '{}' already exists",
                stmt.name
            )));
        }
        let table = self.require(&stmt.table)?;
        let column = table.require_column(&stmt.column)?;
        let def = IndexDef {
            name: stmt.name.clone(),
            table: table.name.clone(),
            column: column.name.clone(),
            unique: stmt.unique,
            implicit: false,
        };
        let table_name = table.name.clone();
        self.require_mut(&table_name)?.indexes.push(def.clone());
        Ok(def)
    }

    /// Remove a secondary index by name. Constraint-backed indexes stay.
    pub fn drop_index(&mut self, name: &str) -> Result<IndexDef> {
        let def = self
            .find_index(name)
            .ok_or_else(|| Error::schema(format!("unknown index '{}'", name)))?
            .clone();
        if def.implicit {
            return Err(Error::schema(format!(
                "index '{}' backs a constraint and cannot be dropped",
                name
            )));
        }
        let table = self.require_mut(&def.table)?;
        table
            .indexes
            .retain(|i| !i.name.eq_ignore_ascii_case(name));
        Ok(def)
    }
}
