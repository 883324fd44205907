//! Expression evaluation.
//!
//! Expressions evaluate against an [`Env`]: either a single row or a group
//! of rows (for aggregates). Comparisons follow three-valued logic; an
//! unknown result surfaces as [`Value::Null`], and predicates report
//! `Ok(None)` so WHERE can keep only definitely-true rows.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ast::{AggFunc, BinaryOp, ColumnRef, Expr, UnaryOp};
use crate::error::{Error, Result};
use crate::storage::Row;
use crate::types::Value;

/// A row flowing between executor stages: positional values with a
/// lookup map keyed by lowercase `column` and `binding.column` names.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExecRow {
    pub values: Vec<Value>,
    col_map: HashMap<String, usize>,
}

impl ExecRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a table's columns under the given binding name. An
    /// unqualified name that collides with an earlier table resolves to
    /// the later one.
    pub fn add_table(&mut self, binding: &str, row: &Row) {
        for (name, value) in row {
            self.push_column(binding, name, value.clone());
        }
    }

    /// Append a table's columns with every value null (LEFT JOIN padding).
    pub fn add_null_table(&mut self, binding: &str, columns: &[&str]) {
        for name in columns {
            self.push_column(binding, name, Value::Null);
        }
    }

    fn push_column(&mut self, binding: &str, name: &str, value: Value) {
        let idx = self.values.len();
        self.values.push(value);
        self.col_map.insert(name.to_lowercase(), idx);
        self.col_map
            .insert(format!("{}.{}", binding.to_lowercase(), name.to_lowercase()), idx);
    }

    /// Concatenate two rows (join step).
    pub fn combine(left: &ExecRow, right: &ExecRow) -> ExecRow {
        let mut combined = left.clone();
        let offset = combined.values.len();
        for (key, idx) in &right.col_map {
            combined.col_map.insert(key.clone(), idx + offset);
        }
        combined.values.extend(right.values.iter().cloned());
        combined
    }

    pub fn get(&self, col: &ColumnRef) -> Result<&Value> {
        let key = match &col.table {
            Some(table) => format!("{}.{}", table.to_lowercase(), col.column.to_lowercase()),
            None => col.column.to_lowercase(),
        };
        self.col_map
            .get(&key)
            .map(|idx| &self.values[*idx])
            .ok_or_else(|| Error::schema(format!("unknown column '{}'", col)))
    }
}

/// Evaluation environment.
pub(crate) enum Env<'a> {
    /// A single row; aggregate calls are rejected.
    Row(&'a ExecRow),
    /// A group of rows; column references resolve against the first row.
    Group(&'a [ExecRow]),
    /// No columns in scope (INSERT value lists).
    Empty,
}

impl<'a> Env<'a> {
    fn column(&self, col: &ColumnRef) -> Result<Value> {
        match self {
            Env::Row(row) => row.get(col).cloned(),
            Env::Group(rows) => match rows.first() {
                Some(row) => row.get(col).cloned(),
                None => Ok(Value::Null),
            },
            Env::Empty => Err(Error::schema(format!(
                "column '{}' is not allowed here",
                col
            ))),
        }
    }
}

/// Evaluate an expression to a value.
pub(crate) fn eval(expr: &Expr, env: &Env) -> Result<Value> {
    match expr {
        Expr::Literal(lit) => Ok(Value::from(lit)),
        Expr::Column(col) => env.column(col),
        Expr::BinaryOp { op, lhs, rhs } => eval_binary(*op, lhs, rhs, env),
        Expr::UnaryOp { op, expr } => eval_unary(*op, expr, env),
        Expr::IsNull { expr, negated } => {
            let value = eval(expr, env)?;
            Ok(Value::Boolean(value.is_null() != *negated))
        }
        Expr::InList {
            expr,
            list,
            negated,
        } => {
            let value = eval(expr, env)?;
            let mut saw_unknown = false;
            let mut found = false;
            for item in list {
                let candidate = eval(item, env)?;
                match value.compare(&candidate)? {
                    Some(Ordering::Equal) => {
                        found = true;
                        break;
                    }
                    Some(_) => {}
                    None => saw_unknown = true,
                }
            }
            Ok(match (found, saw_unknown) {
                (true, _) => Value::Boolean(!*negated),
                (false, true) => Value::Null,
                (false, false) => Value::Boolean(*negated),
            })
        }
        Expr::Between {
            expr,
            low,
            high,
            negated,
        } => {
            let value = eval(expr, env)?;
            let low = eval(low, env)?;
            let high = eval(high, env)?;
            let ge_low = value.compare(&low)?.map(|o| o != Ordering::Less);
            let le_high = value.compare(&high)?.map(|o| o != Ordering::Greater);
            let both = kleene_and(ge_low, le_high);
            Ok(bool_value(if *negated { kleene_not(both) } else { both }))
        }
        Expr::Like {
            expr,
            pattern,
            negated,
        } => {
            let value = eval(expr, env)?;
            let pattern = eval(pattern, env)?;
            match (value, pattern) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::Text(s), Value::Text(p)) => {
                    Ok(Value::Boolean(like_match(&s, &p) != *negated))
                }
                (v, p) => Err(Error::type_error(format!(
                    "LIKE expects strings, got {} and {}",
                    v.kind_name(),
                    p.kind_name()
                ))),
            }
        }
        Expr::Aggregate { func, arg } => match env {
            Env::Group(rows) => eval_aggregate(*func, arg.as_deref(), rows),
            _ => Err(Error::schema(format!(
                "aggregate {} is not allowed here",
                func
            ))),
        },
    }
}

/// Evaluate a predicate under three-valued logic; `None` is unknown.
pub(crate) fn eval_predicate(expr: &Expr, env: &Env) -> Result<Option<bool>> {
    truth_value(eval(expr, env)?)
}

fn truth_value(value: Value) -> Result<Option<bool>> {
    match value {
        Value::Boolean(b) => Ok(Some(b)),
        Value::Null => Ok(None),
        other => Err(Error::type_error(format!(
            "expected a boolean condition, got {}",
            other.kind_name()
        ))),
    }
}

fn bool_value(b: Option<bool>) -> Value {
    match b {
        Some(b) => Value::Boolean(b),
        None => Value::Null,
    }
}

fn kleene_and(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn kleene_or(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    match (a, b) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn kleene_not(a: Option<bool>) -> Option<bool> {
    a.map(|b| !b)
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &Env) -> Result<Value> {
    match op {
        BinaryOp::And => {
            let a = truth_value(eval(lhs, env)?)?;
            // short-circuit: false AND x is false without evaluating x
            if a == Some(false) {
                return Ok(Value::Boolean(false));
            }
            let b = truth_value(eval(rhs, env)?)?;
            Ok(bool_value(kleene_and(a, b)))
        }
        BinaryOp::Or => {
            let a = truth_value(eval(lhs, env)?)?;
            if a == Some(true) {
                return Ok(Value::Boolean(true));
            }
            let b = truth_value(eval(rhs, env)?)?;
            Ok(bool_value(kleene_or(a, b)))
        }
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt
        | BinaryOp::GtEq => {
            let a = eval(lhs, env)?;
            let b = eval(rhs, env)?;
            let ord = a.compare(&b)?;
            let result = ord.map(|ord| match op {
                BinaryOp::Eq => ord == Ordering::Equal,
                BinaryOp::NotEq => ord != Ordering::Equal,
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::LtEq => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                BinaryOp::GtEq => ord != Ordering::Less,
                _ => unreachable!(),
            });
            Ok(bool_value(result))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            let a = eval(lhs, env)?;
            let b = eval(rhs, env)?;
            arith(op, a, b)
        }
    }
}

/// Numeric arithmetic. Mixing integer and float yields float; integer
/// overflow promotes the result to float.
fn arith(op: BinaryOp, a: Value, b: Value) -> Result<Value> {
    if a.is_null() || b.is_null() {
        return Ok(Value::Null);
    }
    match (&a, &b) {
        (Value::Integer(x), Value::Integer(y)) => {
            let (x, y) = (*x, *y);
            match op {
                BinaryOp::Add => Ok(x
                    .checked_add(y)
                    .map(Value::Integer)
                    .unwrap_or(Value::Float(x as f64 + y as f64))),
                BinaryOp::Sub => Ok(x
                    .checked_sub(y)
                    .map(Value::Integer)
                    .unwrap_or(Value::Float(x as f64 - y as f64))),
                BinaryOp::Mul => Ok(x
                    .checked_mul(y)
                    .map(Value::Integer)
                    .unwrap_or(Value::Float(x as f64 * y as f64))),
                BinaryOp::Div => {
                    if y == 0 {
                        Err(Error::type_error("division by zero"))
                    } else {
                        Ok(x
                            .checked_div(y)
                            .map(Value::Integer)
                            .unwrap_or(Value::Float(x as f64 / y as f64)))
                    }
                }
                _ => unreachable!(),
            }
        }
        _ => {
            let x = a.as_f64().ok_or_else(|| {
                Error::type_error(format!("cannot apply {} to {}", op, a.kind_name()))
            })?;
            let y = b.as_f64().ok_or_else(|| {
                Error::type_error(format!("cannot apply {} to {}", op, b.kind_name()))
            })?;
            match op {
                BinaryOp::Add => Ok(Value::Float(x + y)),
                BinaryOp::Sub => Ok(Value::Float(x - y)),
                BinaryOp::Mul => Ok(Value::Float(x * y)),
                BinaryOp::Div => {
                    if y == 0.0 {
                        Err(Error::type_error("division by zero"))
                    } else {
                        Ok(Value::Float(x / y))
                    }
                }
                _ => unreachable!(),
            }
        }
    }
}

fn eval_unary(op: UnaryOp, expr: &Expr, env: &Env) -> Result<Value> {
    let value = eval(expr, env)?;
    match op {
        UnaryOp::Not => Ok(bool_value(kleene_not(truth_value(value)?))),
        UnaryOp::Plus => match value {
            Value::Null | Value::Integer(_) | Value::Float(_) => Ok(value),
            other => Err(Error::type_error(format!(
                "cannot apply unary + to {}",
                other.kind_name()
            ))),
        },
        UnaryOp::Minus => match value {
            Value::Null => Ok(Value::Null),
            Value::Integer(n) => Ok(n
                .checked_neg()
                .map(Value::Integer)
                .unwrap_or(Value::Float(-(n as f64)))),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(Error::type_error(format!(
                "cannot apply unary - to {}",
                other.kind_name()
            ))),
        },
    }
}

fn eval_aggregate(func: AggFunc, arg: Option<&Expr>, rows: &[ExecRow]) -> Result<Value> {
    // COUNT(*) counts rows, everything else folds non-null argument values
    let arg = match (func, arg) {
        (AggFunc::Count, None) => return Ok(Value::Integer(rows.len() as i64)),
        (_, Some(arg)) => arg,
        (func, None) => {
            return Err(Error::schema(format!("{} requires an argument", func)));
        }
    };

    let mut values = Vec::new();
    for row in rows {
        let value = eval(arg, &Env::Row(row))?;
        if !value.is_null() {
            values.push(value);
        }
    }

    match func {
        AggFunc::Count => Ok(Value::Integer(values.len() as i64)),
        AggFunc::Sum => sum(&values),
        AggFunc::Avg => {
            if values.is_empty() {
                Ok(Value::Null)
            } else {
                let total = match sum(&values)? {
                    Value::Integer(n) => n as f64,
                    Value::Float(f) => f,
                    _ => return Err(Error::type_error("AVG expects numeric values")),
                };
                Ok(Value::Float(total / values.len() as f64))
            }
        }
        AggFunc::Min | AggFunc::Max => {
            let mut best: Option<Value> = None;
            for value in values {
                best = Some(match best {
                    None => value,
                    Some(current) => {
                        let keep_new = match value.compare(&current)? {
                            Some(Ordering::Less) => func == AggFunc::Min,
                            Some(Ordering::Greater) => func == AggFunc::Max,
                            _ => false,
                        };
                        if keep_new {
                            value
                        } else {
                            current
                        }
                    }
                });
            }
            Ok(best.unwrap_or(Value::Null))
        }
    }
}

/// SUM over non-null values: null on empty input, integer unless any
/// addend is float, overflow promotes to float.
fn sum(values: &[Value]) -> Result<Value> {
    if values.is_empty() {
        return Ok(Value::Null);
    }
    let mut acc = Value::Integer(0);
    for value in values {
        match value {
            Value::Integer(_) | Value::Float(_) => {
                acc = arith(BinaryOp::Add, acc, value.clone())?;
            }
            other => {
                return Err(Error::type_error(format!(
                    "SUM expects numeric values, got {}",
                    other.kind_name()
                )))
            }
        }
    }
    Ok(acc)
}

/// Anchored SQL LIKE match: `%` matches any substring, `_` exactly one
/// character. Case-sensitive.
pub(crate) fn like_match(value: &str, pattern: &str) -> bool {
    fn matches(v: &[char], p: &[char]) -> bool {
        match p.first() {
            None => v.is_empty(),
            Some('%') => {
                // greedy-or-empty: try every split point
                (0..=v.len()).any(|skip| matches(&v[skip..], &p[1..]))
            }
            Some('_') => !v.is_empty() && matches(&v[1..], &p[1..]),
            Some(c) => v.first() == Some(c) && matches(&v[1..], &p[1..]),
        }
    }
    let v: Vec<char> = value.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    matches(&v, &p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn eval_str(input: &str) -> Result<Value> {
        let mut parser = Parser::new(input);
        let expr = parser.parse_expression().expect("parse failed");
        eval(&expr, &Env::Empty)
    }

    fn row_env_value(columns: &[(&str, Value)], input: &str) -> Result<Value> {
        let mut row = Row::new();
        for (name, value) in columns {
            row.insert(name.to_string(), value.clone());
        }
        let mut exec = ExecRow::new();
        exec.add_table("t", &row);
        let mut parser = Parser::new(input);
        let expr = parser.parse_expression().expect("parse failed");
        eval(&expr, &Env::Row(&exec))
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval_str("1 + 2 * 3").unwrap(), Value::Integer(7));
        assert_eq!(eval_str("7 / 2").unwrap(), Value::Integer(3));
        assert_eq!(eval_str("7.0 / 2").unwrap(), Value::Float(3.5));
        assert_eq!(eval_str("1 + 2.5").unwrap(), Value::Float(3.5));
        assert!(eval_str("1 / 0").is_err());
    }

    #[test]
    fn test_integer_overflow_promotes_to_float() {
        let max = i64::MAX;
        let result = arith(BinaryOp::Add, Value::Integer(max), Value::Integer(1)).unwrap();
        assert_eq!(result, Value::Float(max as f64 + 1.0));
    }

    #[test]
    fn test_null_propagates_through_arithmetic() {
        assert_eq!(eval_str("NULL + 1").unwrap(), Value::Null);
        assert_eq!(eval_str("-(NULL)").unwrap(), Value::Null);
    }

    #[test]
    fn test_comparison_with_null_is_unknown() {
        assert_eq!(eval_str("1 = NULL").unwrap(), Value::Null);
        assert_eq!(eval_str("NULL != NULL").unwrap(), Value::Null);
        assert_eq!(eval_str("1 < 2").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_three_valued_and_or() {
        assert_eq!(eval_str("FALSE AND NULL").unwrap(), Value::Boolean(false));
        assert_eq!(eval_str("TRUE AND NULL").unwrap(), Value::Null);
        assert_eq!(eval_str("TRUE OR NULL").unwrap(), Value::Boolean(true));
        assert_eq!(eval_str("FALSE OR NULL").unwrap(), Value::Null);
        assert_eq!(eval_str("NOT NULL").unwrap(), Value::Null);
    }

    #[test]
    fn test_is_null_is_never_unknown() {
        assert_eq!(eval_str("NULL IS NULL").unwrap(), Value::Boolean(true));
        assert_eq!(eval_str("1 IS NULL").unwrap(), Value::Boolean(false));
        assert_eq!(eval_str("1 IS NOT NULL").unwrap(), Value::Boolean(true));
    }

    #[test]
    fn test_in_list_three_valued() {
        assert_eq!(eval_str("2 IN (1, 2, 3)").unwrap(), Value::Boolean(true));
        assert_eq!(eval_str("5 IN (1, 2, 3)").unwrap(), Value::Boolean(false));
        assert_eq!(eval_str("5 IN (1, NULL)").unwrap(), Value::Null);
        assert_eq!(eval_str("2 IN (2, NULL)").unwrap(), Value::Boolean(true));
        assert_eq!(eval_str("2 NOT IN (2, 3)").unwrap(), Value::Boolean(false));
        assert_eq!(eval_str("5 NOT IN (1, NULL)").unwrap(), Value::Null);
    }

    #[test]
    fn test_between() {
        assert_eq!(eval_str("25 BETWEEN 20 AND 40").unwrap(), Value::Boolean(true));
        assert_eq!(eval_str("50 BETWEEN 20 AND 40").unwrap(), Value::Boolean(false));
        assert_eq!(eval_str("20 BETWEEN 20 AND 40").unwrap(), Value::Boolean(true));
        assert_eq!(
            eval_str("25 NOT BETWEEN 20 AND 40").unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(eval_str("NULL BETWEEN 20 AND 40").unwrap(), Value::Null);
    }

    #[test]
    fn test_like() {
        assert!(like_match("hello", "hello"));
        assert!(like_match("hello", "h%"));
        assert!(like_match("hello", "%llo"));
        assert!(like_match("hello", "h_llo"));
        assert!(like_match("hello", "%"));
        assert!(like_match("", "%"));
        assert!(!like_match("hello", "H%"));
        assert!(!like_match("hello", "h_lo"));
        assert!(like_match("a%b", "a%b"));

        assert_eq!(eval_str("'abc' LIKE 'a%'").unwrap(), Value::Boolean(true));
        assert_eq!(
            eval_str("'abc' NOT LIKE 'b%'").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(eval_str("NULL LIKE 'a%'").unwrap(), Value::Null);
        assert!(eval_str("1 LIKE 'a%'").is_err());
    }

    #[test]
    fn test_column_lookup() {
        let cols = [("age", Value::Integer(30))];
        assert_eq!(
            row_env_value(&cols, "age > 26").unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            row_env_value(&cols, "t.age + 1").unwrap(),
            Value::Integer(31)
        );
        assert!(row_env_value(&cols, "name").is_err());
    }

    #[test]
    fn test_aggregates_over_group() {
        let mut rows = Vec::new();
        for v in [Some(1i64), None, Some(3)] {
            let mut row = Row::new();
            row.insert(
                "v".to_string(),
                v.map(Value::Integer).unwrap_or(Value::Null),
            );
            let mut exec = ExecRow::new();
            exec.add_table("x", &row);
            rows.push(exec);
        }
        let env = Env::Group(&rows);

        let check = |sql: &str, expected: Value| {
            let mut parser = Parser::new(sql);
            let expr = parser.parse_expression().unwrap();
            assert_eq!(eval(&expr, &env).unwrap(), expected, "{}", sql);
        };

        check("COUNT(*)", Value::Integer(3));
        check("COUNT(v)", Value::Integer(2));
        check("SUM(v)", Value::Integer(4));
        check("AVG(v)", Value::Float(2.0));
        check("MIN(v)", Value::Integer(1));
        check("MAX(v)", Value::Integer(3));
    }

    #[test]
    fn test_aggregates_over_empty_group() {
        let rows: Vec<ExecRow> = Vec::new();
        let env = Env::Group(&rows);
        let check = |sql: &str, expected: Value| {
            let mut parser = Parser::new(sql);
            let expr = parser.parse_expression().unwrap();
            assert_eq!(eval(&expr, &env).unwrap(), expected, "{}", sql);
        };
        check("COUNT(*)", Value::Integer(0));
        check("SUM(v)", Value::Null);
        check("AVG(v)", Value::Null);
        check("MIN(v)", Value::Null);
    }

    #[test]
    fn test_aggregate_rejected_in_row_env() {
        let row = Row::new();
        let mut exec = ExecRow::new();
        exec.add_table("t", &row);
        let mut parser = Parser::new("COUNT(*)");
        let expr = parser.parse_expression().unwrap();
        assert!(eval(&expr, &Env::Row(&exec)).is_err());
    }

    #[test]
    fn test_sum_mixing_int_and_float_is_float() {
        let values = vec![Value::Integer(1), Value::Float(2.5)];
        assert_eq!(sum(&values).unwrap(), Value::Float(3.5));
    }
}
