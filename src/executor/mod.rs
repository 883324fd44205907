//! Query executor.
//!
//! Interprets a parsed [`Statement`] against the catalog, row store, and
//! indexes. SELECT runs as a pipeline of stages (scan, join, filter,
//! group, project, distinct, sort, offset/limit); mutations journal undo
//! records so a mid-statement failure leaves the database untouched.

mod eval;

use std::cmp::Ordering;
use std::collections::HashMap;

use indexmap::IndexMap;
use log::debug;

use crate::ast::{
    BinaryOp, ColumnRef, CreateIndexStatement, DeleteStatement, Expr, InsertStatement, JoinType,
    SelectItem, SelectStatement, Statement, UnaryOp, UpdateStatement,
};
use crate::catalog::{Catalog, TableSchema};
use crate::error::{Error, Result};
use crate::index::BTree;
use crate::storage::{Row, Storage};
use crate::types::{Value, ValueKey};

use eval::{eval, eval_predicate, Env, ExecRow};

/// The result of one executed statement.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Output column names in order (empty for mutations).
    pub columns: Vec<String>,
    /// Result rows as name -> value mappings.
    pub rows: Vec<Row>,
    /// Rows affected by a mutation.
    pub affected: usize,
    /// Statement tag, e.g. `SELECT` or `CREATE TABLE`.
    pub status: String,
}

impl QueryResult {
    fn with_rows(columns: Vec<String>, rows: Vec<Row>, status: &str) -> Self {
        Self {
            columns,
            rows,
            affected: 0,
            status: status.to_string(),
        }
    }

    fn with_affected(affected: usize, status: &str) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected,
            status: status.to_string(),
        }
    }

    /// Render the rows as an aligned text table with a row-count footer.
    pub fn format_table(&self) -> String {
        use std::fmt::Write;

        if self.columns.is_empty() {
            return format!("{}\n", self.status);
        }

        // column-major: each output column's cells and width in one pass
        let mut table: Vec<(usize, Vec<String>)> = Vec::with_capacity(self.columns.len());
        for name in &self.columns {
            let cells: Vec<String> = self
                .rows
                .iter()
                .map(|row| row.get(name).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            let width = cells.iter().map(String::len).fold(name.len(), usize::max);
            table.push((width, cells));
        }

        let mut out = String::new();
        for (name, &(width, _)) in self.columns.iter().zip(&table) {
            let _ = write!(out, "| {:<width$} ", name);
        }
        out.push_str("|\n");
        for &(width, _) in &table {
            let _ = write!(out, "+{}", "-".repeat(width + 2));
        }
        out.push_str("+\n");
        for i in 0..self.rows.len() {
            for &(width, ref cells) in &table {
                let _ = write!(out, "| {:<width$} ", cells[i]);
            }
            out.push_str("|\n");
        }
        let _ = writeln!(out, "({} rows)", self.rows.len());
        out
    }
}

/// Undo record for statement-level rollback, applied in reverse order.
enum Undo {
    RowInserted { table: String, row_id: u64 },
    RowWritten { table: String, row_id: u64, old: Row },
    RowDeleted { table: String, row_id: u64, old: Row },
    IndexInserted { index: String, key: Value, row_id: u64 },
    IndexDeleted { index: String, key: Value, row_id: u64 },
    RowIdCounter { table: String, value: u64 },
}

/// Borrows the database state for the duration of one statement.
pub(crate) struct Executor<'a> {
    pub catalog: &'a mut Catalog,
    pub storage: &'a mut Storage,
    pub indexes: &'a mut HashMap<String, BTree>,
}

impl<'a> Executor<'a> {
    pub fn execute(&mut self, stmt: &Statement) -> Result<QueryResult> {
        match stmt {
            Statement::Select(select) => self.exec_select(select),
            Statement::Insert(insert) => self.exec_insert(insert),
            Statement::Update(update) => self.exec_update(update),
            Statement::Delete(delete) => self.exec_delete(delete),
            Statement::CreateTable(create) => {
                let schema = self.catalog.create_table(create)?.clone();
                self.storage.create_table(&schema.name);
                for def in &schema.indexes {
                    self.indexes
                        .insert(def.name.to_lowercase(), BTree::new(def.unique));
                }
                debug!("created table '{}'", schema.name);
                Ok(QueryResult::with_affected(0, "CREATE TABLE"))
            }
            Statement::DropTable { name } => {
                let schema = self.catalog.drop_table(name)?;
                self.storage.drop_table(&schema.name)?;
                for def in &schema.indexes {
                    self.indexes.remove(&def.name.to_lowercase());
                }
                debug!("dropped table '{}'", schema.name);
                Ok(QueryResult::with_affected(0, "DROP TABLE"))
            }
            Statement::CreateIndex(create) => self.exec_create_index(create),
            Statement::DropIndex { name } => {
                let def = self.catalog.drop_index(name)?;
                self.storage.mark_catalog_dirty();
                self.indexes.remove(&def.name.to_lowercase());
                Ok(QueryResult::with_affected(0, "DROP INDEX"))
            }
            Statement::ShowTables => {
                let mut rows = Vec::new();
                for schema in self.catalog.tables() {
                    let mut row = Row::new();
                    row.insert("table_name".to_string(), Value::Text(schema.name.clone()));
                    rows.push(row);
                }
                Ok(QueryResult::with_rows(
                    vec!["table_name".to_string()],
                    rows,
                    "SHOW",
                ))
            }
            Statement::Describe { table } => {
                let schema = self.catalog.require(table)?;
                let columns = ["column", "type", "nullable", "key", "default"];
                let mut rows = Vec::new();
                for col in &schema.columns {
                    let key = if col.primary_key {
                        "PRI"
                    } else if col.unique {
                        "UNI"
                    } else {
                        ""
                    };
                    let mut row = Row::new();
                    row.insert("column".to_string(), Value::Text(col.name.clone()));
                    row.insert("type".to_string(), Value::Text(col.data_type.to_string()));
                    row.insert(
                        "nullable".to_string(),
                        Value::Text(if col.not_null { "NO" } else { "YES" }.to_string()),
                    );
                    row.insert("key".to_string(), Value::Text(key.to_string()));
                    row.insert(
                        "default".to_string(),
                        col.default.clone().unwrap_or(Value::Null),
                    );
                    rows.push(row);
                }
                Ok(QueryResult::with_rows(
                    columns.iter().map(|c| c.to_string()).collect(),
                    rows,
                    "DESCRIBE",
                ))
            }
            Statement::Truncate { table } => {
                let schema = self.catalog.require(table)?.clone();
                let old = self.storage.truncate(&schema.name)?;
                for def in &schema.indexes {
                    self.index_tree(&def.name)?.clear();
                }
                debug!("truncated table '{}'", schema.name);
                Ok(QueryResult::with_affected(old.rows.len(), "TRUNCATE"))
            }
        }
    }

    fn index_tree(&mut self, name: &str) -> Result<&mut BTree> {
        self.indexes
            .get_mut(&name.to_lowercase())
            .ok_or_else(|| Error::not_found(format!("index '{}' has no tree", name)))
    }

    // ========================================================================
    // SELECT
    // ========================================================================

    fn exec_select(&mut self, stmt: &SelectStatement) -> Result<QueryResult> {
        let base = self.catalog.require(&stmt.from.name)?.clone();
        let base_binding = stmt
            .from
            .alias
            .clone()
            .unwrap_or_else(|| base.name.clone());

        let mut bindings: Vec<(String, Vec<String>)> = vec![(
            base_binding.clone(),
            base.columns.iter().map(|c| c.name.clone()).collect(),
        )];

        // base scan, index-assisted for single-table statements
        let mut rows: Vec<ExecRow> = Vec::new();
        let candidates = if stmt.joins.is_empty() {
            self.plan_scan(&base, &base_binding, stmt.where_clause.as_ref())?
        } else {
            None
        };
        match candidates {
            Some(ids) => {
                debug!("index scan over {} candidate row(s)", ids.len());
                for id in ids {
                    if let Some(row) = self.storage.get(&base.name, id)? {
                        let mut exec = ExecRow::new();
                        exec.add_table(&base_binding, row);
                        rows.push(exec);
                    }
                }
            }
            None => {
                for (_, row) in self.storage.scan(&base.name)? {
                    let mut exec = ExecRow::new();
                    exec.add_table(&base_binding, row);
                    rows.push(exec);
                }
            }
        }

        // nested-loop joins
        for join in &stmt.joins {
            let right = self.catalog.require(&join.table.name)?.clone();
            let right_binding = join
                .table
                .alias
                .clone()
                .unwrap_or_else(|| right.name.clone());
            let right_cols: Vec<String> = right.columns.iter().map(|c| c.name.clone()).collect();

            let mut right_rows = Vec::new();
            for (_, row) in self.storage.scan(&right.name)? {
                let mut exec = ExecRow::new();
                exec.add_table(&right_binding, row);
                right_rows.push(exec);
            }

            let mut joined = Vec::new();
            for left in &rows {
                let mut matched = false;
                for right_row in &right_rows {
                    let combined = ExecRow::combine(left, right_row);
                    if eval_predicate(&join.on, &Env::Row(&combined))? == Some(true) {
                        joined.push(combined);
                        matched = true;
                    }
                }
                if !matched && join.join_type == JoinType::Left {
                    let mut combined = left.clone();
                    let names: Vec<&str> = right_cols.iter().map(|c| c.as_str()).collect();
                    combined.add_null_table(&right_binding, &names);
                    joined.push(combined);
                }
            }
            rows = joined;
            bindings.push((right_binding, right_cols));
        }

        // WHERE keeps only definitely-true rows
        if let Some(pred) = &stmt.where_clause {
            let mut kept = Vec::new();
            for row in rows {
                if eval_predicate(pred, &Env::Row(&row))? == Some(true) {
                    kept.push(row);
                }
            }
            rows = kept;
        }

        // HAVING without GROUP BY still aggregates over a single group
        let grouped = !stmt.group_by.is_empty()
            || stmt.having.is_some()
            || stmt
                .projection
                .iter()
                .any(|item| matches!(item, SelectItem::Expr { expr, .. } if expr.contains_aggregate()));

        let specs = projection_specs(&stmt.projection, &bindings, grouped)?;
        let columns: Vec<String> = specs.iter().map(|(name, _)| name.clone()).collect();

        // projected tuples plus their ORDER BY keys
        let mut output: Vec<(Vec<Value>, Vec<Value>)> = Vec::new();

        if grouped {
            let mut groups: IndexMap<Vec<ValueKey>, Vec<ExecRow>> = IndexMap::new();
            if stmt.group_by.is_empty() {
                groups.insert(Vec::new(), rows);
            } else {
                for row in rows {
                    let mut key = Vec::with_capacity(stmt.group_by.len());
                    for expr in &stmt.group_by {
                        key.push(eval(expr, &Env::Row(&row))?.key());
                    }
                    groups.entry(key).or_default().push(row);
                }
            }

            for (_, group) in groups {
                let env = Env::Group(&group);
                if let Some(pred) = &stmt.having {
                    if eval_predicate(pred, &env)? != Some(true) {
                        continue;
                    }
                }
                let values = eval_specs(&specs, &env)?;
                let keys = order_keys(stmt, &specs, &values, &env)?;
                output.push((values, keys));
            }
        } else {
            for row in &rows {
                let env = Env::Row(row);
                let values = eval_specs(&specs, &env)?;
                let keys = order_keys(stmt, &specs, &values, &env)?;
                output.push((values, keys));
            }
        }

        // DISTINCT dedups on the projected tuple, null equal to null
        if stmt.distinct {
            let mut seen = std::collections::HashSet::new();
            output.retain(|(values, _)| {
                let key: Vec<ValueKey> = values.iter().map(Value::key).collect();
                seen.insert(key)
            });
        }

        // stable sort; nulls first ascending, last descending
        if !stmt.order_by.is_empty() {
            let descs: Vec<bool> = stmt.order_by.iter().map(|k| k.desc).collect();
            output.sort_by(|(_, a), (_, b)| {
                for (i, desc) in descs.iter().enumerate() {
                    let ord = compare_order_key(&a[i], &b[i], *desc);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let offset = stmt.offset.unwrap_or(0) as usize;
        let limit = stmt.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let rows: Vec<Row> = output
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(values, _)| {
                let mut row = Row::new();
                for (name, value) in columns.iter().zip(values) {
                    row.insert(name.clone(), value);
                }
                row
            })
            .collect();

        Ok(QueryResult::with_rows(columns, rows, "SELECT"))
    }

    /// Try to answer the WHERE clause's leading indexable conjunct with an
    /// index probe, returning candidate row ids. `None` means scan.
    fn plan_scan(
        &self,
        schema: &TableSchema,
        binding: &str,
        where_clause: Option<&Expr>,
    ) -> Result<Option<Vec<u64>>> {
        let Some(pred) = where_clause else {
            return Ok(None);
        };
        let mut conjuncts = Vec::new();
        collect_conjuncts(pred, &mut conjuncts);

        for conjunct in conjuncts {
            if let Some(ids) = self.try_index_probe(schema, binding, conjunct) {
                return Ok(Some(ids));
            }
        }
        Ok(None)
    }

    fn try_index_probe(
        &self,
        schema: &TableSchema,
        binding: &str,
        expr: &Expr,
    ) -> Option<Vec<u64>> {
        match expr {
            Expr::BinaryOp { op, lhs, rhs } => {
                // normalize to column <op> constant
                let (col, value, op) = match (lhs.as_ref(), const_value(rhs)) {
                    (Expr::Column(col), Some(value)) => (col, value, *op),
                    _ => match (rhs.as_ref(), const_value(lhs)) {
                        (Expr::Column(col), Some(value)) => (col, value, flip(*op)?),
                        _ => return None,
                    },
                };
                let (column, tree) = self.probe_target(schema, binding, col)?;
                let key = column.data_type.coerce(value).ok()?;
                if key.is_null() {
                    return None;
                }
                let ids = match op {
                    BinaryOp::Eq => tree.point_lookup(&key),
                    BinaryOp::Lt => tree.range_scan(None, Some(&key), true, false),
                    BinaryOp::LtEq => tree.range_scan(None, Some(&key), true, true),
                    BinaryOp::Gt => tree.range_scan(Some(&key), None, false, true),
                    BinaryOp::GtEq => tree.range_scan(Some(&key), None, true, true),
                    _ => return None,
                };
                Some(ids)
            }
            Expr::Between {
                expr,
                low,
                high,
                negated: false,
            } => {
                let Expr::Column(col) = expr.as_ref() else {
                    return None;
                };
                let (column, tree) = self.probe_target(schema, binding, col)?;
                let low = column.data_type.coerce(const_value(low)?).ok()?;
                let high = column.data_type.coerce(const_value(high)?).ok()?;
                if low.is_null() || high.is_null() {
                    return None;
                }
                Some(tree.range_scan(Some(&low), Some(&high), true, true))
            }
            Expr::InList {
                expr,
                list,
                negated: false,
            } => {
                let Expr::Column(col) = expr.as_ref() else {
                    return None;
                };
                let (column, tree) = self.probe_target(schema, binding, col)?;
                let mut ids = Vec::new();
                for item in list {
                    let key = column.data_type.coerce(const_value(item)?).ok()?;
                    if !key.is_null() {
                        ids.extend(tree.point_lookup(&key));
                    }
                }
                ids.sort_unstable();
                ids.dedup();
                Some(ids)
            }
            _ => None,
        }
    }

    /// Resolve a column reference to an indexed column of the base table.
    fn probe_target<'b>(
        &'b self,
        schema: &'b TableSchema,
        binding: &str,
        col: &ColumnRef,
    ) -> Option<(&'b crate::catalog::ColumnSchema, &'b BTree)> {
        if let Some(table) = &col.table {
            if !table.eq_ignore_ascii_case(binding) {
                return None;
            }
        }
        let column = schema.get_column(&col.column)?;
        let def = schema.indexes_on(&column.name).next()?;
        let tree = self.indexes.get(&def.name.to_lowercase())?;
        Some((column, tree))
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    fn exec_insert(&mut self, stmt: &InsertStatement) -> Result<QueryResult> {
        let schema = self.catalog.require(&stmt.table)?.clone();

        let targets: Vec<String> = if stmt.columns.is_empty() {
            schema.columns.iter().map(|c| c.name.clone()).collect()
        } else {
            let mut targets = Vec::with_capacity(stmt.columns.len());
            for name in &stmt.columns {
                let column = schema.require_column(name)?;
                if targets
                    .iter()
                    .any(|t: &String| t.eq_ignore_ascii_case(&column.name))
                {
                    return Err(Error::schema(format!(
                        "column '{}' named twice in INSERT",
                        column.name
                    )));
                }
                targets.push(column.name.clone());
            }
            targets
        };

        let mut journal = vec![Undo::RowIdCounter {
            table: schema.name.clone(),
            value: self.storage.next_row_id(&schema.name)?,
        }];

        match self.insert_rows(&schema, &targets, &stmt.values, &mut journal) {
            Ok(affected) => Ok(QueryResult::with_affected(affected, "INSERT")),
            Err(e) => {
                self.rollback(journal);
                Err(e)
            }
        }
    }

    fn insert_rows(
        &mut self,
        schema: &TableSchema,
        targets: &[String],
        tuples: &[Vec<Expr>],
        journal: &mut Vec<Undo>,
    ) -> Result<usize> {
        for tuple in tuples {
            if tuple.len() != targets.len() {
                return Err(Error::schema(format!(
                    "INSERT into '{}' expects {} values, got {}",
                    schema.name,
                    targets.len(),
                    tuple.len()
                )));
            }

            let mut row = Row::new();
            for column in &schema.columns {
                let provided = targets
                    .iter()
                    .position(|t| t.eq_ignore_ascii_case(&column.name));
                let raw = match provided {
                    Some(i) => eval(&tuple[i], &Env::Empty)?,
                    None => column.default.clone().unwrap_or(Value::Null),
                };
                row.insert(column.name.clone(), column.check_value(raw)?);
            }

            self.check_unique(schema, &row, None)?;
            let row_id = self.storage.insert(&schema.name, row.clone())?;
            journal.push(Undo::RowInserted {
                table: schema.name.clone(),
                row_id,
            });
            self.index_row(schema, &row, row_id, journal)?;
        }
        Ok(tuples.len())
    }

    fn exec_update(&mut self, stmt: &UpdateStatement) -> Result<QueryResult> {
        let schema = self.catalog.require(&stmt.table)?.clone();

        let mut assignments = Vec::with_capacity(stmt.assignments.len());
        for a in &stmt.assignments {
            let column = schema.require_column(&a.column)?.clone();
            assignments.push((column, &a.value));
        }

        let matching = self.matching_rows(&schema, stmt.where_clause.as_ref())?;
        let mut journal = Vec::new();

        let result = (|| -> Result<usize> {
            let mut affected = 0;
            for (row_id, old_row) in &matching {
                let mut exec = ExecRow::new();
                exec.add_table(&schema.name, old_row);

                let mut new_row = old_row.clone();
                for (column, expr) in &assignments {
                    let value = eval(expr, &Env::Row(&exec))?;
                    new_row.insert(column.name.clone(), column.check_value(value)?);
                }

                self.check_unique(&schema, &new_row, Some(*row_id))?;

                let old = self.storage.update(&schema.name, *row_id, new_row.clone())?;
                journal.push(Undo::RowWritten {
                    table: schema.name.clone(),
                    row_id: *row_id,
                    old,
                });

                for def in &schema.indexes {
                    let old_key = old_row.get(&def.column).cloned().unwrap_or(Value::Null);
                    let new_key = new_row.get(&def.column).cloned().unwrap_or(Value::Null);
                    if old_key == new_key {
                        continue;
                    }
                    if !old_key.is_null() {
                        self.index_tree(&def.name)?.delete(&old_key, *row_id);
                        journal.push(Undo::IndexDeleted {
                            index: def.name.clone(),
                            key: old_key,
                            row_id: *row_id,
                        });
                    }
                    if !new_key.is_null() {
                        self.index_tree(&def.name)?
                            .insert(new_key.clone(), *row_id)
                            .map_err(|e| unique_error(e, &new_key, &def.column))?;
                        journal.push(Undo::IndexInserted {
                            index: def.name.clone(),
                            key: new_key,
                            row_id: *row_id,
                        });
                    }
                }
                affected += 1;
            }
            Ok(affected)
        })();

        match result {
            Ok(affected) => Ok(QueryResult::with_affected(affected, "UPDATE")),
            Err(e) => {
                self.rollback(journal);
                Err(e)
            }
        }
    }

    fn exec_delete(&mut self, stmt: &DeleteStatement) -> Result<QueryResult> {
        let schema = self.catalog.require(&stmt.table)?.clone();
        let matching = self.matching_rows(&schema, stmt.where_clause.as_ref())?;
        let mut journal = Vec::new();

        let result = (|| -> Result<usize> {
            for (row_id, old_row) in &matching {
                for def in &schema.indexes {
                    let key = old_row.get(&def.column).cloned().unwrap_or(Value::Null);
                    if key.is_null() {
                        continue;
                    }
                    self.index_tree(&def.name)?.delete(&key, *row_id);
                    journal.push(Undo::IndexDeleted {
                        index: def.name.clone(),
                        key,
                        row_id: *row_id,
                    });
                }
                let old = self.storage.delete(&schema.name, *row_id)?;
                journal.push(Undo::RowDeleted {
                    table: schema.name.clone(),
                    row_id: *row_id,
                    old,
                });
            }
            Ok(matching.len())
        })();

        match result {
            Ok(affected) => Ok(QueryResult::with_affected(affected, "DELETE")),
            Err(e) => {
                self.rollback(journal);
                Err(e)
            }
        }
    }

    fn exec_create_index(&mut self, stmt: &CreateIndexStatement) -> Result<QueryResult> {
        let def = self.catalog.create_index(stmt)?;
        self.storage.mark_catalog_dirty();

        let mut tree = BTree::new(def.unique);
        let mut failure = None;
        for (row_id, row) in self.storage.scan(&def.table)? {
            let key = row.get(&def.column).cloned().unwrap_or(Value::Null);
            if key.is_null() {
                continue;
            }
            if let Err(e) = tree.insert(key.clone(), row_id) {
                failure = Some(unique_error(e, &key, &def.column));
                break;
            }
        }
        if let Some(e) = failure {
            // existing rows violate the new unique constraint
            self.catalog.drop_index(&def.name)?;
            return Err(e);
        }

        self.indexes.insert(def.name.to_lowercase(), tree);
        debug!("created index '{}' on {}({})", def.name, def.table, def.column);
        Ok(QueryResult::with_affected(0, "CREATE INDEX"))
    }

    /// Row ids and images matching a WHERE clause against one table.
    fn matching_rows(
        &mut self,
        schema: &TableSchema,
        where_clause: Option<&Expr>,
    ) -> Result<Vec<(u64, Row)>> {
        let mut matching = Vec::new();
        let candidates = self.plan_scan(schema, &schema.name, where_clause)?;

        let keep = |row: &Row, row_id: u64, out: &mut Vec<(u64, Row)>| -> Result<()> {
            match where_clause {
                None => {
                    out.push((row_id, row.clone()));
                }
                Some(pred) => {
                    let mut exec = ExecRow::new();
                    exec.add_table(&schema.name, row);
                    if eval_predicate(pred, &Env::Row(&exec))? == Some(true) {
                        out.push((row_id, row.clone()));
                    }
                }
            }
            Ok(())
        };

        match candidates {
            Some(ids) => {
                for id in ids {
                    if let Some(row) = self.storage.get(&schema.name, id)? {
                        keep(row, id, &mut matching)?;
                    }
                }
            }
            None => {
                for (id, row) in self.storage.scan(&schema.name)? {
                    keep(row, id, &mut matching)?;
                }
            }
        }
        Ok(matching)
    }

    /// Probe every unique index of the table for conflicts with `row`,
    /// ignoring `exclude` (the row being updated).
    fn check_unique(
        &mut self,
        schema: &TableSchema,
        row: &Row,
        exclude: Option<u64>,
    ) -> Result<()> {
        for def in &schema.indexes {
            if !def.unique {
                continue;
            }
            let key = row.get(&def.column).cloned().unwrap_or(Value::Null);
            if key.is_null() {
                continue;
            }
            let ids = self.index_tree(&def.name)?.point_lookup(&key);
            if ids.iter().any(|id| Some(*id) != exclude) {
                return Err(Error::constraint(format!(
                    "duplicate value '{}' for unique column '{}'",
                    key, def.column
                )));
            }
        }
        Ok(())
    }

    /// Add a freshly inserted row to every index of its table.
    fn index_row(
        &mut self,
        schema: &TableSchema,
        row: &Row,
        row_id: u64,
        journal: &mut Vec<Undo>,
    ) -> Result<()> {
        for def in &schema.indexes {
            let key = row.get(&def.column).cloned().unwrap_or(Value::Null);
            if key.is_null() {
                continue;
            }
            self.index_tree(&def.name)?
                .insert(key.clone(), row_id)
                .map_err(|e| unique_error(e, &key, &def.column))?;
            journal.push(Undo::IndexInserted {
                index: def.name.clone(),
                key,
                row_id,
            });
        }
        Ok(())
    }

    /// Apply undo records in reverse order. Rollback itself is best-effort
    /// over in-memory state that the journal mirrors exactly.
    fn rollback(&mut self, journal: Vec<Undo>) {
        for op in journal.into_iter().rev() {
            match op {
                Undo::RowInserted { table, row_id } => {
                    let _ = self.storage.delete(&table, row_id);
                }
                Undo::RowWritten { table, row_id, old }
                | Undo::RowDeleted { table, row_id, old } => {
                    let _ = self.storage.put(&table, row_id, old);
                }
                Undo::IndexInserted { index, key, row_id } => {
                    if let Ok(tree) = self.index_tree(&index) {
                        tree.delete(&key, row_id);
                    }
                }
                Undo::IndexDeleted { index, key, row_id } => {
                    if let Ok(tree) = self.index_tree(&index) {
                        let _ = tree.insert(key, row_id);
                    }
                }
                Undo::RowIdCounter { table, value } => {
                    let _ = self.storage.set_next_row_id(&table, value);
                }
            }
        }
    }
}

fn unique_error(e: Error, key: &Value, column: &str) -> Error {
    match e {
        Error::Constraint(_) => Error::constraint(format!(
            "duplicate value '{}' for unique column '{}'",
            key, column
        )),
        other => other,
    }
}

/// Split a predicate into its top-level AND conjuncts.
fn collect_conjuncts<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    match expr {
        Expr::BinaryOp {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => {
            collect_conjuncts(lhs, out);
            collect_conjuncts(rhs, out);
        }
        other => out.push(other),
    }
}

/// Evaluate a constant expression (literal with optional sign).
fn const_value(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Literal(lit) => Some(Value::from(lit)),
        Expr::UnaryOp { op, expr } => {
            let value = const_value(expr)?;
            match (op, value) {
                (UnaryOp::Minus, Value::Integer(n)) => Some(Value::Integer(-n)),
                (UnaryOp::Minus, Value::Float(f)) => Some(Value::Float(-f)),
                (UnaryOp::Plus, v @ (Value::Integer(_) | Value::Float(_))) => Some(v),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Mirror a comparison so the column ends up on the left.
fn flip(op: BinaryOp) -> Option<BinaryOp> {
    match op {
        BinaryOp::Eq => Some(BinaryOp::Eq),
        BinaryOp::Lt => Some(BinaryOp::Gt),
        BinaryOp::LtEq => Some(BinaryOp::GtEq),
        BinaryOp::Gt => Some(BinaryOp::Lt),
        BinaryOp::GtEq => Some(BinaryOp::LtEq),
        _ => None,
    }
}

/// Expand the projection into `(output name, expression)` pairs. Wildcards
/// expand to every visible column; a name that collides with an earlier
/// table is qualified as `binding.column`.
fn projection_specs(
    projection: &[SelectItem],
    bindings: &[(String, Vec<String>)],
    grouped: bool,
) -> Result<Vec<(String, Expr)>> {
    let mut specs = Vec::new();
    for item in projection {
        match item {
            SelectItem::Wildcard => {
                if grouped {
                    return Err(Error::schema(
                        "SELECT * cannot be combined with GROUP BY or aggregates",
                    ));
                }
                let mut seen: Vec<String> = Vec::new();
                for (binding, columns) in bindings {
                    for column in columns {
                        let name = if seen.iter().any(|s| s.eq_ignore_ascii_case(column)) {
                            format!("{}.{}", binding, column)
                        } else {
                            seen.push(column.clone());
                            column.clone()
                        };
                        specs.push((
                            name,
                            Expr::Column(ColumnRef {
                                table: Some(binding.clone()),
                                column: column.clone(),
                            }),
                        ));
                    }
                }
            }
            SelectItem::Expr { expr, alias } => {
                let name = match alias {
                    Some(alias) => alias.clone(),
                    None => match expr {
                        Expr::Column(col) => col.column.clone(),
                        other => other.to_string(),
                    },
                };
                specs.push((name, expr.clone()));
            }
        }
    }
    Ok(specs)
}

fn eval_specs(specs: &[(String, Expr)], env: &Env) -> Result<Vec<Value>> {
    specs.iter().map(|(_, expr)| eval(expr, env)).collect()
}

/// Compute ORDER BY key values. A bare column name that matches an output
/// column (e.g. a projection alias) sorts on the projected value;
/// everything else evaluates in the row or group environment.
fn order_keys(
    stmt: &SelectStatement,
    specs: &[(String, Expr)],
    values: &[Value],
    env: &Env,
) -> Result<Vec<Value>> {
    let mut keys = Vec::with_capacity(stmt.order_by.len());
    for item in &stmt.order_by {
        if let Expr::Column(ColumnRef { table: None, column }) = &item.expr {
            if let Some(i) = specs
                .iter()
                .position(|(name, _)| name.eq_ignore_ascii_case(column))
            {
                keys.push(values[i].clone());
                continue;
            }
        }
        keys.push(eval(&item.expr, env)?);
    }
    Ok(keys)
}

/// Per-key ordering: nulls sort first ascending and last descending.
fn compare_order_key(a: &Value, b: &Value, desc: bool) -> Ordering {
    let ord = match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return if desc { Ordering::Greater } else { Ordering::Less },
        (false, true) => return if desc { Ordering::Less } else { Ordering::Greater },
        (false, false) => a.total_cmp(b),
    };
    if desc {
        ord.reverse()
    } else {
        ord
    }
}
