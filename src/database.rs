//! Database handle and public API.
//!
//! A [`Database`] owns the catalog, the row store, and every index tree,
//! and assumes it is the sole reader and writer of its data directory.
//! Indexes are rebuilt from table scans at open; after every successful
//! mutating statement the store flushes, so the on-disk state is always a
//! consistent snapshot.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::executor::{Executor, QueryResult};
use crate::index::BTree;
use crate::parser::Parser;
use crate::storage::Storage;
use crate::types::Value;

/// An embedded SQL database rooted at a data directory.
pub struct Database {
    catalog: Catalog,
    storage: Storage,
    indexes: HashMap<String, BTree>,
}

impl Database {
    /// Open (or create) a database at the given directory.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Database> {
        let (storage, catalog) = Storage::open(data_dir)?;
        let mut db = Database {
            catalog,
            storage,
            indexes: HashMap::new(),
        };
        db.rebuild_indexes()?;
        Ok(db)
    }

    /// Rebuild every index tree from a table scan.
    fn rebuild_indexes(&mut self) -> Result<()> {
        for schema in self.catalog.tables() {
            for def in &schema.indexes {
                let mut tree = BTree::new(def.unique);
                for (row_id, row) in self.storage.scan(&schema.name)? {
                    let key = row.get(&def.column).cloned().unwrap_or(Value::Null);
                    if !key.is_null() {
                        tree.insert(key, row_id)?;
                    }
                }
                debug!(
                    "rebuilt index '{}' on {}({}) with {} key(s)",
                    def.name,
                    def.table,
                    def.column,
                    tree.key_count()
                );
                self.indexes.insert(def.name.to_lowercase(), tree);
            }
        }
        info!("rebuilt {} index(es)", self.indexes.len());
        Ok(())
    }

    /// Parse and execute one SQL statement.
    ///
    /// Mutations are all-or-nothing: on any error the in-memory state is
    /// rolled back and nothing is flushed; on success pending changes are
    /// persisted before returning.
    pub fn execute(&mut self, sql: &str) -> Result<QueryResult> {
        debug!("execute: {}", sql.trim());
        let stmt = Parser::new(sql).parse()?;
        let mut executor = Executor {
            catalog: &mut self.catalog,
            storage: &mut self.storage,
            indexes: &mut self.indexes,
        };
        let result = executor.execute(&stmt)?;
        self.storage.flush(&self.catalog)?;
        Ok(result)
    }

    /// Names of all tables, in creation order with declared case.
    pub fn tables(&self) -> Vec<String> {
        self.catalog.tables().map(|t| t.name.clone()).collect()
    }

    /// Number of rows in a table.
    pub fn count(&self, table: &str) -> Result<usize> {
        let schema = self.catalog.require(table)?;
        self.storage.count(&schema.name)
    }

    /// Flush pending state and release the handle.
    pub fn close(mut self) -> Result<()> {
        self.storage.flush(&self.catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::Row;
    use tempfile::TempDir;

    fn open_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(dir.path()).expect("open");
        (dir, db)
    }

    fn exec(db: &mut Database, sql: &str) -> QueryResult {
        db.execute(sql)
            .unwrap_or_else(|e| panic!("`{}` failed: {}", sql, e))
    }

    fn cell<'r>(rows: &'r [Row], i: usize, col: &str) -> &'r Value {
        rows[i]
            .get(col)
            .unwrap_or_else(|| panic!("row {} has no column '{}'", i, col))
    }

    #[test]
    fn test_s1_create_insert_select() {
        let (_dir, mut db) = open_db();
        exec(
            &mut db,
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(10) NOT NULL, age INTEGER);",
        );
        assert_eq!(exec(&mut db, "INSERT INTO users VALUES (1, 'Alice', 30);").affected, 1);
        assert_eq!(exec(&mut db, "INSERT INTO users VALUES (2, 'Bob', 25);").affected, 1);

        let result = exec(
            &mut db,
            "SELECT name FROM users WHERE age > 26 ORDER BY age DESC;",
        );
        assert_eq!(result.columns, vec!["name"]);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(cell(&result.rows, 0, "name"), &Value::Text("Alice".into()));
        assert_eq!(result.status, "SELECT");
    }

    #[test]
    fn test_s2_unique_violation() {
        let (_dir, mut db) = open_db();
        exec(
            &mut db,
            "CREATE TABLE u (id INTEGER PRIMARY KEY, e VARCHAR(20) UNIQUE)",
        );
        exec(&mut db, "INSERT INTO u VALUES (1, 'a@x')");
        let err = db.execute("INSERT INTO u VALUES (2, 'a@x')").unwrap_err();
        assert!(matches!(err, Error::Constraint(_)), "got {:?}", err);

        let result = exec(&mut db, "SELECT COUNT(*) FROM u");
        assert_eq!(result.columns, vec!["COUNT(*)"]);
        assert_eq!(cell(&result.rows, 0, "COUNT(*)"), &Value::Integer(1));
    }

    #[test]
    fn test_s3_left_join_group() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE c (id INTEGER PRIMARY KEY, name VARCHAR(20))");
        exec(
            &mut db,
            "CREATE TABLE e (id INTEGER PRIMARY KEY, cid INTEGER, amount FLOAT)",
        );
        exec(&mut db, "INSERT INTO c VALUES (1, 'Food')");
        exec(&mut db, "INSERT INTO c VALUES (2, 'Rent')");
        exec(&mut db, "INSERT INTO e VALUES (10, 1, 5.0)");

        let result = exec(
            &mut db,
            "SELECT c.name, COUNT(e.id) FROM c LEFT JOIN e ON c.id = e.cid \
             GROUP BY c.name ORDER BY c.name",
        );
        assert_eq!(result.rows.len(), 2);
        assert_eq!(cell(&result.rows, 0, "name"), &Value::Text("Food".into()));
        assert_eq!(cell(&result.rows, 0, "COUNT(e.id)"), &Value::Integer(1));
        assert_eq!(cell(&result.rows, 1, "name"), &Value::Text("Rent".into()));
        assert_eq!(cell(&result.rows, 1, "COUNT(e.id)"), &Value::Integer(0));
    }

    #[test]
    fn test_s4_aggregates_with_nulls() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE x (v INTEGER)");
        exec(&mut db, "INSERT INTO x VALUES (1)");
        exec(&mut db, "INSERT INTO x VALUES (NULL)");
        exec(&mut db, "INSERT INTO x VALUES (3)");

        let result = exec(&mut db, "SELECT COUNT(*), COUNT(v), SUM(v), AVG(v) FROM x");
        assert_eq!(result.rows.len(), 1);
        assert_eq!(cell(&result.rows, 0, "COUNT(*)"), &Value::Integer(3));
        assert_eq!(cell(&result.rows, 0, "COUNT(v)"), &Value::Integer(2));
        assert_eq!(cell(&result.rows, 0, "SUM(v)"), &Value::Integer(4));
        assert_eq!(cell(&result.rows, 0, "AVG(v)"), &Value::Float(2.0));
    }

    #[test]
    fn test_s5_range_over_index() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE p (id INTEGER PRIMARY KEY, price FLOAT)");
        exec(&mut db, "CREATE INDEX idx_price ON p(price)");
        exec(&mut db, "INSERT INTO p VALUES (1, 10.0)");
        exec(&mut db, "INSERT INTO p VALUES (2, 25.0)");
        exec(&mut db, "INSERT INTO p VALUES (3, 50.0)");

        let result = exec(
            &mut db,
            "SELECT id FROM p WHERE price BETWEEN 20 AND 40 ORDER BY id",
        );
        assert_eq!(result.rows.len(), 1);
        assert_eq!(cell(&result.rows, 0, "id"), &Value::Integer(2));
    }

    #[test]
    fn test_s6_update_constraint_rolls_back() {
        let (_dir, mut db) = open_db();
        exec(
            &mut db,
            "CREATE TABLE t (id INTEGER PRIMARY KEY, e VARCHAR(20) UNIQUE)",
        );
        exec(&mut db, "INSERT INTO t VALUES (1, 'a')");
        exec(&mut db, "INSERT INTO t VALUES (2, 'b')");

        let err = db.execute("UPDATE t SET e = 'a' WHERE id = 2").unwrap_err();
        assert!(matches!(err, Error::Constraint(_)), "got {:?}", err);

        let result = exec(&mut db, "SELECT e FROM t WHERE id = 2");
        assert_eq!(cell(&result.rows, 0, "e"), &Value::Text("b".into()));
        // index still answers lookups for the untouched key
        let result = exec(&mut db, "SELECT id FROM t WHERE e = 'b'");
        assert_eq!(cell(&result.rows, 0, "id"), &Value::Integer(2));
    }

    #[test]
    fn test_where_null_semantics() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE n (v INTEGER)");
        exec(&mut db, "INSERT INTO n VALUES (NULL)");
        exec(&mut db, "INSERT INTO n VALUES (1)");

        assert_eq!(exec(&mut db, "SELECT v FROM n WHERE v = NULL").rows.len(), 0);
        assert_eq!(exec(&mut db, "SELECT v FROM n WHERE v IS NULL").rows.len(), 1);
        assert_eq!(
            exec(&mut db, "SELECT v FROM n WHERE v IS NOT NULL").rows.len(),
            1
        );
        // unknown comparisons filter the row out, NOT does not resurrect it
        assert_eq!(
            exec(&mut db, "SELECT v FROM n WHERE NOT v = 1").rows.len(),
            0
        );
    }

    #[test]
    fn test_empty_string_is_not_null() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE s (v VARCHAR(5))");
        exec(&mut db, "INSERT INTO s VALUES ('')");
        assert_eq!(exec(&mut db, "SELECT v FROM s WHERE v IS NULL").rows.len(), 0);
        assert_eq!(exec(&mut db, "SELECT v FROM s WHERE v = ''").rows.len(), 1);
    }

    #[test]
    fn test_varchar_length_boundary() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE s (v VARCHAR(3))");
        exec(&mut db, "INSERT INTO s VALUES ('abc')");
        let err = db.execute("INSERT INTO s VALUES ('abcd')").unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        assert_eq!(db.count("s").unwrap(), 1);
    }

    #[test]
    fn test_integer_overflow_promotes() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE one (x INTEGER)");
        exec(&mut db, "INSERT INTO one VALUES (0)");
        let result = exec(
            &mut db,
            "SELECT x + 9223372036854775807 + 1 AS v FROM one WHERE x = 0",
        );
        assert_eq!(
            cell(&result.rows, 0, "v"),
            &Value::Float(i64::MAX as f64 + 1.0)
        );
    }

    #[test]
    fn test_insert_defaults_and_not_null() {
        let (_dir, mut db) = open_db();
        exec(
            &mut db,
            "CREATE TABLE d (id INTEGER PRIMARY KEY, n INTEGER DEFAULT 7, \
             s VARCHAR(5) NOT NULL DEFAULT 'hi', m INTEGER NOT NULL)",
        );
        exec(&mut db, "INSERT INTO d (id, m) VALUES (1, 0)");
        let result = exec(&mut db, "SELECT n, s FROM d WHERE id = 1");
        assert_eq!(cell(&result.rows, 0, "n"), &Value::Integer(7));
        assert_eq!(cell(&result.rows, 0, "s"), &Value::Text("hi".into()));

        // omitting a NOT NULL column without default fails
        let err = db.execute("INSERT INTO d (id) VALUES (2)").unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        assert_eq!(db.count("d").unwrap(), 1);
    }

    #[test]
    fn test_multi_row_insert_is_atomic() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (id INTEGER PRIMARY KEY)");
        let err = db
            .execute("INSERT INTO t VALUES (1), (2), (1)")
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        assert_eq!(db.count("t").unwrap(), 0);
        // the failed statement did not burn row ids
        exec(&mut db, "INSERT INTO t VALUES (5)");
        assert_eq!(db.count("t").unwrap(), 1);
    }

    #[test]
    fn test_delete_then_count_zero() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER)");
        for i in 0..5 {
            exec(&mut db, &format!("INSERT INTO t VALUES ({}, {})", i, i * 10));
        }
        let result = exec(&mut db, "DELETE FROM t WHERE v >= 20");
        assert_eq!(result.affected, 3);
        let count = exec(&mut db, "SELECT COUNT(*) FROM t WHERE v >= 20");
        assert_eq!(cell(&count.rows, 0, "COUNT(*)"), &Value::Integer(0));
        assert_eq!(db.count("t").unwrap(), 2);
    }

    #[test]
    fn test_truncate_keeps_schema_resets_ids() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (id INTEGER PRIMARY KEY, v VARCHAR(5))");
        exec(&mut db, "INSERT INTO t VALUES (1, 'a')");
        exec(&mut db, "INSERT INTO t VALUES (2, 'b')");

        let result = exec(&mut db, "TRUNCATE TABLE t");
        assert_eq!(result.affected, 2);
        assert_eq!(db.count("t").unwrap(), 0);

        // schema survives, unique enforcement restarts cleanly
        exec(&mut db, "INSERT INTO t VALUES (1, 'a')");
        assert!(db.execute("INSERT INTO t VALUES (1, 'z')").is_err());
        assert_eq!(db.count("t").unwrap(), 1);
    }

    #[test]
    fn test_create_drop_create() {
        let (_dir, mut db) = open_db();
        let ddl = "CREATE TABLE t (id INTEGER PRIMARY KEY, v VARCHAR(5))";
        exec(&mut db, ddl);
        exec(&mut db, "INSERT INTO t VALUES (1, 'a')");
        exec(&mut db, "DROP TABLE t");
        assert!(db.tables().is_empty());
        exec(&mut db, ddl);
        assert_eq!(db.count("t").unwrap(), 0);
        exec(&mut db, "INSERT INTO t VALUES (1, 'a')");
    }

    #[test]
    fn test_distinct_treats_null_as_equal() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (v INTEGER)");
        for sql in [
            "INSERT INTO t VALUES (1)",
            "INSERT INTO t VALUES (1)",
            "INSERT INTO t VALUES (NULL)",
            "INSERT INTO t VALUES (NULL)",
            "INSERT INTO t VALUES (2)",
        ] {
            exec(&mut db, sql);
        }
        let result = exec(&mut db, "SELECT DISTINCT v FROM t");
        assert_eq!(result.rows.len(), 3);
    }

    #[test]
    fn test_order_by_null_placement() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (v INTEGER)");
        exec(&mut db, "INSERT INTO t VALUES (2)");
        exec(&mut db, "INSERT INTO t VALUES (NULL)");
        exec(&mut db, "INSERT INTO t VALUES (1)");

        let asc = exec(&mut db, "SELECT v FROM t ORDER BY v ASC");
        assert_eq!(cell(&asc.rows, 0, "v"), &Value::Null);
        assert_eq!(cell(&asc.rows, 1, "v"), &Value::Integer(1));
        assert_eq!(cell(&asc.rows, 2, "v"), &Value::Integer(2));

        let desc = exec(&mut db, "SELECT v FROM t ORDER BY v DESC");
        assert_eq!(cell(&desc.rows, 0, "v"), &Value::Integer(2));
        assert_eq!(cell(&desc.rows, 2, "v"), &Value::Null);
    }

    #[test]
    fn test_order_by_is_stable_with_limit_offset() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (g INTEGER, v INTEGER)");
        for (g, v) in [(1, 10), (2, 20), (1, 30), (2, 40), (1, 50)] {
            exec(&mut db, &format!("INSERT INTO t VALUES ({}, {})", g, v));
        }
        // rows with equal keys keep insertion order
        let result = exec(&mut db, "SELECT v FROM t ORDER BY g");
        let vs: Vec<&Value> = (0..5).map(|i| cell(&result.rows, i, "v")).collect();
        assert_eq!(
            vs,
            vec![
                &Value::Integer(10),
                &Value::Integer(30),
                &Value::Integer(50),
                &Value::Integer(20),
                &Value::Integer(40),
            ]
        );

        let page = exec(&mut db, "SELECT v FROM t ORDER BY g LIMIT 2 OFFSET 1");
        assert_eq!(page.rows.len(), 2);
        assert_eq!(cell(&page.rows, 0, "v"), &Value::Integer(30));
        assert_eq!(cell(&page.rows, 1, "v"), &Value::Integer(50));
    }

    #[test]
    fn test_reopen_reproduces_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut db = Database::open(dir.path()).unwrap();
            exec(
                &mut db,
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(10), joined DATE)",
            );
            exec(&mut db, "CREATE INDEX idx_name ON users(name)");
            exec(&mut db, "INSERT INTO users VALUES (1, 'Alice', '2024-01-05')");
            exec(&mut db, "INSERT INTO users VALUES (2, 'Bob', NULL)");
            db.close().unwrap();
        }

        let mut db = Database::open(dir.path()).unwrap();
        assert_eq!(db.tables(), vec!["users".to_string()]);
        assert_eq!(db.count("users").unwrap(), 2);

        // rebuilt secondary index answers queries
        let result = exec(&mut db, "SELECT id FROM users WHERE name = 'Alice'");
        assert_eq!(cell(&result.rows, 0, "id"), &Value::Integer(1));

        // rebuilt primary key index still enforces uniqueness
        assert!(db.execute("INSERT INTO users VALUES (1, 'Eve', NULL)").is_err());

        // row ids continue from where they left off
        exec(&mut db, "INSERT INTO users VALUES (3, 'Carol', NULL)");
        let result = exec(&mut db, "SELECT joined FROM users WHERE id = 1");
        assert!(matches!(cell(&result.rows, 0, "joined"), Value::Date(_)));
    }

    #[test]
    fn test_date_comparison_and_order() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE ev (id INTEGER PRIMARY KEY, at DATE)");
        exec(&mut db, "INSERT INTO ev VALUES (1, '2024-03-01')");
        exec(&mut db, "INSERT INTO ev VALUES (2, '2023-12-31')");
        exec(&mut db, "INSERT INTO ev VALUES (3, '2024-06-15')");

        let result = exec(&mut db, "SELECT id FROM ev WHERE at > '2024-01-01' ORDER BY at");
        assert_eq!(result.rows.len(), 2);
        assert_eq!(cell(&result.rows, 0, "id"), &Value::Integer(1));
        assert_eq!(cell(&result.rows, 1, "id"), &Value::Integer(3));

        let err = db.execute("INSERT INTO ev VALUES (4, 'not-a-date')").unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }

    #[test]
    fn test_join_inner_and_wildcard() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE a (id INTEGER PRIMARY KEY, v VARCHAR(5))");
        exec(&mut db, "CREATE TABLE b (id INTEGER PRIMARY KEY, aid INTEGER)");
        exec(&mut db, "INSERT INTO a VALUES (1, 'x')");
        exec(&mut db, "INSERT INTO a VALUES (2, 'y')");
        exec(&mut db, "INSERT INTO b VALUES (10, 1)");

        let result = exec(&mut db, "SELECT * FROM a JOIN b ON a.id = b.aid");
        assert_eq!(result.rows.len(), 1);
        // colliding names from the right table come out qualified
        assert_eq!(result.columns, vec!["id", "v", "b.id", "aid"]);
        assert_eq!(cell(&result.rows, 0, "b.id"), &Value::Integer(10));
    }

    #[test]
    fn test_like_and_in() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (name VARCHAR(20))");
        for name in ["Alice", "Bob", "alice", "Carol"] {
            exec(&mut db, &format!("INSERT INTO t VALUES ('{}')", name));
        }
        // case-sensitive LIKE
        assert_eq!(
            exec(&mut db, "SELECT name FROM t WHERE name LIKE 'A%'").rows.len(),
            1
        );
        assert_eq!(
            exec(&mut db, "SELECT name FROM t WHERE name LIKE '_lice'").rows.len(),
            1
        );
        assert_eq!(
            exec(&mut db, "SELECT name FROM t WHERE name IN ('Bob', 'Carol')")
                .rows
                .len(),
            2
        );
    }

    #[test]
    fn test_having_filters_groups() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE s (dept VARCHAR(10), pay INTEGER)");
        for (d, p) in [("eng", 100), ("eng", 200), ("ops", 50)] {
            exec(&mut db, &format!("INSERT INTO s VALUES ('{}', {})", d, p));
        }
        let result = exec(
            &mut db,
            "SELECT dept, SUM(pay) FROM s GROUP BY dept HAVING COUNT(*) > 1",
        );
        assert_eq!(result.rows.len(), 1);
        assert_eq!(cell(&result.rows, 0, "dept"), &Value::Text("eng".into()));
        assert_eq!(cell(&result.rows, 0, "SUM(pay)"), &Value::Integer(300));
    }

    #[test]
    fn test_show_and_describe() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE Points (id INTEGER PRIMARY KEY, x FLOAT DEFAULT 0.0)");
        let result = exec(&mut db, "SHOW TABLES");
        assert_eq!(result.columns, vec!["table_name"]);
        assert_eq!(
            cell(&result.rows, 0, "table_name"),
            &Value::Text("Points".into())
        );

        let result = exec(&mut db, "DESCRIBE points");
        assert_eq!(result.rows.len(), 2);
        assert_eq!(cell(&result.rows, 0, "key"), &Value::Text("PRI".into()));
        assert_eq!(cell(&result.rows, 0, "nullable"), &Value::Text("NO".into()));
        assert_eq!(cell(&result.rows, 1, "default"), &Value::Float(0.0));
    }

    #[test]
    fn test_schema_errors() {
        let (_dir, mut db) = open_db();
        assert!(matches!(
            db.execute("SELECT * FROM missing").unwrap_err(),
            Error::Schema(_)
        ));
        exec(&mut db, "CREATE TABLE t (a INTEGER)");
        assert!(matches!(
            db.execute("SELECT b FROM t").unwrap_err(),
            Error::Schema(_)
        ));
        assert!(matches!(
            db.execute("INSERT INTO t (b) VALUES (1)").unwrap_err(),
            Error::Schema(_)
        ));
        assert!(matches!(
            db.execute("SELECT FROM t").unwrap_err(),
            Error::Syntax { .. }
        ));
    }

    #[test]
    fn test_type_error_leaves_state() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (n INTEGER)");
        let err = db.execute("INSERT INTO t VALUES ('five')").unwrap_err();
        assert!(matches!(err, Error::Type(_)));
        assert_eq!(db.count("t").unwrap(), 0);
    }

    #[test]
    fn test_unique_allows_multiple_nulls() {
        let (_dir, mut db) = open_db();
        exec(
            &mut db,
            "CREATE TABLE t (id INTEGER PRIMARY KEY, e VARCHAR(10) UNIQUE)",
        );
        exec(&mut db, "INSERT INTO t VALUES (1, NULL)");
        exec(&mut db, "INSERT INTO t VALUES (2, NULL)");
        assert_eq!(db.count("t").unwrap(), 2);
    }

    #[test]
    fn test_update_moves_index_entries() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER)");
        exec(&mut db, "CREATE INDEX idx_v ON t(v)");
        exec(&mut db, "INSERT INTO t VALUES (1, 10)");
        exec(&mut db, "UPDATE t SET v = 99 WHERE id = 1");

        assert_eq!(exec(&mut db, "SELECT id FROM t WHERE v = 10").rows.len(), 0);
        let result = exec(&mut db, "SELECT id FROM t WHERE v = 99");
        assert_eq!(cell(&result.rows, 0, "id"), &Value::Integer(1));
    }

    #[test]
    fn test_create_unique_index_rejects_existing_duplicates() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER)");
        exec(&mut db, "INSERT INTO t VALUES (1, 5)");
        exec(&mut db, "INSERT INTO t VALUES (2, 5)");
        let err = db.execute("CREATE UNIQUE INDEX idx_v ON t(v)").unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        // the failed index left no trace
        exec(&mut db, "CREATE INDEX idx_v ON t(v)");
        exec(&mut db, "DROP INDEX idx_v");
        assert_eq!(exec(&mut db, "SELECT id FROM t WHERE v = 5").rows.len(), 2);
    }

    #[test]
    fn test_expression_projection_with_alias() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE t (a INTEGER, b INTEGER)");
        exec(&mut db, "INSERT INTO t VALUES (3, 4)");
        let result = exec(&mut db, "SELECT a + b AS total, a * b FROM t ORDER BY total");
        assert_eq!(result.columns, vec!["total", "(a * b)"]);
        assert_eq!(cell(&result.rows, 0, "total"), &Value::Integer(7));
        assert_eq!(cell(&result.rows, 0, "(a * b)"), &Value::Integer(12));
    }

    #[test]
    fn test_tables_and_count_api() {
        let (_dir, mut db) = open_db();
        exec(&mut db, "CREATE TABLE A (x INTEGER)");
        exec(&mut db, "CREATE TABLE b (x INTEGER)");
        assert_eq!(db.tables(), vec!["A".to_string(), "b".to_string()]);
        exec(&mut db, "INSERT INTO a VALUES (1)");
        assert_eq!(db.count("a").unwrap(), 1);
        assert!(db.count("missing").is_err());
    }
}
