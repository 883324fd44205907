//! # minidb
//!
//! A small embeddable SQL database engine: a lexer and recursive-descent
//! parser feed a tree-walking executor over a JSON-persisted row store
//! with B-tree indexes.
//!
//! ## Features
//!
//! - SQL dialect covering DDL (`CREATE TABLE`, `CREATE INDEX`, `DROP`,
//!   `TRUNCATE`), DML (`INSERT`, `UPDATE`, `DELETE`), and queries with
//!   joins, grouping, aggregation, `DISTINCT`, ordering, and paging
//! - Typed columns (`INTEGER`, `FLOAT`, `VARCHAR(n)`, `TEXT`, `BOOLEAN`,
//!   `DATE`, `TIMESTAMP`) with write-time coercion and three-valued null
//!   semantics
//! - `PRIMARY KEY`, `UNIQUE`, `NOT NULL`, and `DEFAULT` constraints backed
//!   by B-tree indexes that also serve equality and range lookups
//! - Per-statement atomicity: a failing statement rolls back in memory and
//!   nothing is flushed
//! - Durable snapshots via write-then-rename of per-table JSON documents
//!
//! ## Quick Start
//!
//! ```no_run
//! use minidb::Database;
//!
//! # fn main() -> minidb::Result<()> {
//! let mut db = Database::open("./data")?;
//! db.execute("CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(40))")?;
//! db.execute("INSERT INTO users VALUES (1, 'Alice')")?;
//! let result = db.execute("SELECT name FROM users WHERE id = 1")?;
//! for row in &result.rows {
//!     println!("{:?}", row);
//! }
//! db.close()?;
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod catalog;
pub mod database;
pub mod error;
pub mod executor;
pub mod index;
pub mod lexer;
pub mod parser;
pub mod storage;
pub mod types;

// Re-export main types for convenience
pub use ast::Statement;
pub use catalog::{Catalog, ColumnSchema, IndexDef, TableSchema};
pub use database::Database;
pub use error::{Error, Result};
pub use executor::QueryResult;
pub use index::BTree;
pub use lexer::{Keyword, Lexer, Token, TokenKind};
pub use parser::Parser;
pub use storage::Row;
pub use types::{DataType, Value};
