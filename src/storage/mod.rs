//! Durable row store.
//!
//! Each table is materialized as a JSON document `{rows, next_row_id}`
//! under `data_dir/tables/<name>`, and the catalog as `data_dir/catalog`.
//! All mutations happen in memory; [`Storage::flush`] persists dirty
//! documents with a write-then-rename so a crash leaves either the old or
//! the new snapshot, never a torn file.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::types::Value;

/// A stored row: column name to value, in declared column order.
pub type Row = IndexMap<String, Value>;

/// In-memory image of one table's persisted document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableData {
    /// Row id to row, iterated in ascending id order.
    pub rows: BTreeMap<u64, Row>,
    /// Next id to assign; strictly monotonic, deletion never reclaims ids.
    pub next_row_id: u64,
}

/// Owns the data directory and every loaded table document.
pub struct Storage {
    data_dir: PathBuf,
    tables: HashMap<String, TableData>,
    dirty: HashSet<String>,
    removed: HashSet<String>,
    catalog_dirty: bool,
}

impl Storage {
    /// Open the store, creating the directory layout if absent, and load
    /// the catalog plus every table document it names.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<(Storage, Catalog)> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(data_dir.join("tables"))?;

        let catalog_path = data_dir.join("catalog");
        let catalog: Catalog = if catalog_path.exists() {
            let bytes = fs::read(&catalog_path)?;
            serde_json::from_slice(&bytes)
                .map_err(|e| Error::Io(std::io::Error::other(format!("corrupt catalog: {}", e))))?
        } else {
            Catalog::new()
        };

        let mut tables = HashMap::new();
        for schema in catalog.tables() {
            let key = schema.name.to_lowercase();
            let path = data_dir.join("tables").join(&key);
            let data: TableData = if path.exists() {
                let bytes = fs::read(&path)?;
                serde_json::from_slice(&bytes).map_err(|e| {
                    Error::Io(std::io::Error::other(format!(
                        "corrupt table file '{}': {}",
                        key, e
                    )))
                })?
            } else {
                TableData::default()
            };
            tables.insert(key, data);
        }

        info!(
            "opened store at {} with {} table(s)",
            data_dir.display(),
            tables.len()
        );

        let storage = Storage {
            data_dir,
            tables,
            dirty: HashSet::new(),
            removed: HashSet::new(),
            catalog_dirty: false,
        };
        Ok((storage, catalog))
    }

    /// Register an empty document for a newly created table.
    pub fn create_table(&mut self, name: &str) {
        let key = name.to_lowercase();
        self.tables.insert(key.clone(), TableData::default());
        self.removed.remove(&key);
        self.dirty.insert(key);
        self.catalog_dirty = true;
    }

    /// Remove a table's document; the file disappears at the next flush.
    pub fn drop_table(&mut self, name: &str) -> Result<TableData> {
        let key = name.to_lowercase();
        let data = self
            .tables
            .remove(&key)
            .ok_or_else(|| Error::not_found(format!("no stored data for table '{}'", name)))?;
        self.dirty.remove(&key);
        self.removed.insert(key);
        self.catalog_dirty = true;
        Ok(data)
    }

    fn table(&self, name: &str) -> Result<&TableData> {
        self.tables
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::not_found(format!("no stored data for table '{}'", name)))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut TableData> {
        let key = name.to_lowercase();
        self.dirty.insert(key.clone());
        self.tables
            .get_mut(&key)
            .ok_or_else(|| Error::not_found(format!("no stored data for table '{}'", name)))
    }

    /// Insert a row, assigning and returning the next row id.
    pub fn insert(&mut self, name: &str, row: Row) -> Result<u64> {
        let data = self.table_mut(name)?;
        let row_id = data.next_row_id;
        data.next_row_id += 1;
        data.rows.insert(row_id, row);
        Ok(row_id)
    }

    /// Overwrite an existing row, returning its prior image.
    pub fn update(&mut self, name: &str, row_id: u64, row: Row) -> Result<Row> {
        let data = self.table_mut(name)?;
        if !data.rows.contains_key(&row_id) {
            return Err(Error::not_found(format!(
                "row {} does not exist in table '{}'",
                row_id, name
            )));
        }
        Ok(data.rows.insert(row_id, row).unwrap_or_default())
    }

    /// Put a row back under a specific id without touching the id counter
    /// (statement rollback only).
    pub fn put(&mut self, name: &str, row_id: u64, row: Row) -> Result<()> {
        let data = self.table_mut(name)?;
        data.rows.insert(row_id, row);
        Ok(())
    }

    /// Remove a row, returning its prior image.
    pub fn delete(&mut self, name: &str, row_id: u64) -> Result<Row> {
        let data = self.table_mut(name)?;
        data.rows.remove(&row_id).ok_or_else(|| {
            Error::not_found(format!("row {} does not exist in table '{}'", row_id, name))
        })
    }

    /// Fetch one row by id.
    pub fn get(&self, name: &str, row_id: u64) -> Result<Option<&Row>> {
        Ok(self.table(name)?.rows.get(&row_id))
    }

    /// Iterate `(row_id, row)` in ascending row-id order.
    pub fn scan(&self, name: &str) -> Result<impl Iterator<Item = (u64, &Row)>> {
        Ok(self.table(name)?.rows.iter().map(|(id, row)| (*id, row)))
    }

    /// Number of live rows in a table.
    pub fn count(&self, name: &str) -> Result<usize> {
        Ok(self.table(name)?.rows.len())
    }

    /// Current value of the monotonic row-id counter.
    pub fn next_row_id(&self, name: &str) -> Result<u64> {
        Ok(self.table(name)?.next_row_id)
    }

    /// Restore the row-id counter (statement rollback only).
    pub fn set_next_row_id(&mut self, name: &str, next: u64) -> Result<()> {
        self.table_mut(name)?.next_row_id = next;
        Ok(())
    }

    /// Clear all rows and reset the row-id counter to zero.
    pub fn truncate(&mut self, name: &str) -> Result<TableData> {
        let data = self.table_mut(name)?;
        let old = std::mem::take(data);
        Ok(old)
    }

    /// Put back a table image taken by [`Storage::truncate`] (rollback).
    pub fn restore(&mut self, name: &str, image: TableData) -> Result<()> {
        let data = self.table_mut(name)?;
        *data = image;
        Ok(())
    }

    /// Mark the catalog document for rewriting at the next flush.
    pub fn mark_catalog_dirty(&mut self) {
        self.catalog_dirty = true;
    }

    /// Atomically persist every pending table and catalog change.
    pub fn flush(&mut self, catalog: &Catalog) -> Result<()> {
        if self.catalog_dirty {
            let bytes = serde_json::to_vec_pretty(catalog)
                .map_err(|e| Error::Io(std::io::Error::other(e)))?;
            write_atomic(&self.data_dir.join("catalog"), &bytes)?;
            self.catalog_dirty = false;
            debug!("flushed catalog");
        }

        let dirty: Vec<String> = self.dirty.drain().collect();
        for key in dirty {
            if let Some(data) = self.tables.get(&key) {
                let bytes = serde_json::to_vec(data)
                    .map_err(|e| Error::Io(std::io::Error::other(e)))?;
                write_atomic(&self.data_dir.join("tables").join(&key), &bytes)?;
                debug!("flushed table '{}' ({} rows)", key, data.rows.len());
            }
        }

        let removed: Vec<String> = self.removed.drain().collect();
        for key in removed {
            let path = self.data_dir.join("tables").join(&key);
            if path.exists() {
                fs::remove_file(&path)?;
                debug!("removed table file '{}'", key);
            }
        }

        Ok(())
    }
}

/// Write a file via a temporary sibling and rename, so readers only ever
/// observe a complete document.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
