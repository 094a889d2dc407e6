//! SQL values and named-parameter binding
//!
//! All user-supplied values flow through [`SqlValue`] and a named-parameter
//! map; statements are written with `:name` placeholders and rewritten to
//! positional `$n` placeholders just before dispatch. Identifier names and
//! `where`/`order_by`/`group_by` fragments remain caller-trusted raw SQL —
//! never pass untrusted strings into those.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, Postgres};
use uuid::Uuid;

use crate::error::{OrmError, OrmResult};

/// A value bindable into a SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl SqlValue {
    /// Render the value as a `serde_json::Value`, dates as ISO-8601 strings
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Bool(b) => serde_json::Value::Bool(*b),
            SqlValue::Int(i) => serde_json::Value::from(*i),
            SqlValue::Float(f) => serde_json::Value::from(*f),
            SqlValue::Text(s) => serde_json::Value::String(s.clone()),
            SqlValue::Uuid(u) => serde_json::Value::String(u.to_string()),
            SqlValue::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            SqlValue::Json(v) => v.clone(),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => SqlValue::Null,
        }
    }
}

/// Named bind-parameter map
pub type Params = HashMap<String, SqlValue>;

/// Build a [`Params`] map from an array of pairs
pub fn params<const N: usize>(pairs: [(&str, SqlValue); N]) -> Params {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Rewrite `:name` placeholders to positional `$n` placeholders.
///
/// Returns the rewritten statement together with the bind list in
/// placeholder order. `::` casts and single-quoted literals are left
/// untouched; a repeated placeholder re-binds the same `$n`; a placeholder
/// missing from `params` is a [`OrmError::Query`]; unused params are
/// ignored.
pub fn expand_placeholders(sql: &str, params: &Params) -> OrmResult<(String, Vec<SqlValue>)> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut values: Vec<SqlValue> = Vec::new();
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut in_literal = false;
    let mut i = 0;

    while i < bytes.len() {
        let ch = bytes[i] as char;
        if ch == '\'' {
            in_literal = !in_literal;
            out.push(ch);
            i += 1;
            continue;
        }
        if in_literal || ch != ':' {
            out.push(ch);
            i += 1;
            continue;
        }
        // Postgres cast, not a placeholder
        if i + 1 < bytes.len() && bytes[i + 1] == b':' {
            out.push_str("::");
            i += 2;
            continue;
        }
        let start = i + 1;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }
        if end == start || bytes[start].is_ascii_digit() {
            out.push(ch);
            i += 1;
            continue;
        }
        let name = &sql[start..end];
        let index = match seen.get(name) {
            Some(&index) => index,
            None => {
                let value = params
                    .get(name)
                    .ok_or_else(|| OrmError::Query(format!("unbound parameter :{}", name)))?;
                values.push(value.clone());
                seen.insert(name, values.len());
                values.len()
            }
        };
        out.push('$');
        out.push_str(&index.to_string());
        i = end;
    }

    Ok((out, values))
}

/// Bind an expanded value list onto a sqlx query in placeholder order
pub fn bind_values(
    sql: &str,
    values: Vec<SqlValue>,
) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for value in values {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Float(f) => query.bind(f),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Uuid(u) => query.bind(u),
            SqlValue::Timestamp(t) => query.bind(t),
            SqlValue::Json(j) => query.bind(j),
        };
    }
    query
}
