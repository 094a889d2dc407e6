//! Data view — generic CRUD/query builder over one table
//!
//! [`DataView`] composes a shared [`Database`] handle with a
//! [`TableSchema`] and join state, and translates verb calls into one
//! parameterized statement plus its bound-parameter map. Every verb has a
//! pure `*_sql` builder next to its async executor, so statement synthesis
//! can be inspected without a live connection.
//!
//! `where`/`order_by`/`group_by` fragments are caller-trusted raw SQL;
//! values always travel through named bind parameters.

use std::fmt;
use std::sync::Arc;

use sqlx::postgres::PgRow;
use tracing::debug;

use crate::connection::Database;
use crate::error::{Affected, OrmResult};
use crate::schema::TableSchema;
use crate::value::{Params, SqlValue};

/// Join types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
            JoinType::Full => write!(f, "FULL JOIN"),
        }
    }
}

/// Options for SELECT composition
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    /// Raw predicate fragment; empty means match everything
    pub where_sql: String,
    pub group_by: String,
    pub order_by: String,
    /// Appended as a bound `LIMIT` when positive
    pub limit: i64,
    /// Appended as a bound `OFFSET` when positive
    pub offset: i64,
    /// Add `count(*) OVER () AS all_count` so pagination UIs get the total
    /// row count in the same round trip
    pub count: bool,
    /// Append `FOR UPDATE`
    pub lock: bool,
}

impl SelectOptions {
    pub fn with_where(where_sql: &str) -> Self {
        Self {
            where_sql: where_sql.to_string(),
            ..Self::default()
        }
    }
}

/// Generic query builder and executor over one table
#[derive(Debug, Clone)]
pub struct DataView {
    db: Arc<Database>,
    schema: TableSchema,
    joins: Vec<String>,
    join_fields: Vec<String>,
}

impl DataView {
    pub fn new(db: Arc<Database>, schema: TableSchema) -> Self {
        Self {
            db,
            schema,
            joins: Vec::new(),
            join_fields: Vec::new(),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut TableSchema {
        &mut self.schema
    }

    fn table(&self) -> &str {
        self.schema.table()
    }

    /// Append a join clause and register its projected fields for
    /// subsequent SELECTs. Joins accumulate until [`clear_joins`](Self::clear_joins).
    pub fn join_as(&mut self, jtype: JoinType, table: &str, on: &str, fields: &[&str]) {
        self.joins.push(format!("{} {} ON {}", jtype, table, on));
        self.join_fields
            .extend(fields.iter().map(|f| f.to_string()));
    }

    /// `LEFT JOIN` shorthand
    pub fn join(&mut self, table: &str, on: &str, fields: &[&str]) {
        self.join_as(JoinType::Left, table, on, fields);
    }

    /// Remove all previously specified joins and their projected fields
    pub fn clear_joins(&mut self) {
        self.joins.clear();
        self.join_fields.clear();
    }

    /// Build the SELECT statement and the extra bound params (`limit`,
    /// `offset`) it introduces
    pub fn select_sql(&self, opts: &SelectOptions) -> (String, Params) {
        let mut columns = self.schema.attr_list();
        columns.extend(self.join_fields.iter().cloned());
        if opts.count {
            columns.push("count(*) OVER () AS all_count".to_string());
        }

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), self.table());
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        let predicate = if opts.where_sql.is_empty() {
            "true"
        } else {
            opts.where_sql.as_str()
        };
        sql.push_str(" WHERE ");
        sql.push_str(predicate);

        let mut extra = Params::new();
        if !opts.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&opts.group_by);
        }
        if !opts.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&opts.order_by);
        }
        if opts.limit > 0 {
            sql.push_str(" LIMIT :limit");
            extra.insert("limit".to_string(), SqlValue::Int(opts.limit));
        }
        if opts.offset > 0 {
            sql.push_str(" OFFSET :offset");
            extra.insert("offset".to_string(), SqlValue::Int(opts.offset));
        }
        if opts.lock {
            sql.push_str(" FOR UPDATE");
        }
        (sql, extra)
    }

    /// Run a SELECT and fetch every row
    pub async fn select(&self, opts: &SelectOptions, mut params: Params) -> OrmResult<Vec<PgRow>> {
        let (sql, extra) = self.select_sql(opts);
        params.extend(extra);
        self.db.fetch_all(&sql, &params).await
    }

    /// Select all records matching a predicate (convenience mirror of
    /// [`select`](Self::select))
    pub async fn all(&self, opts: &SelectOptions, params: Params) -> OrmResult<Vec<PgRow>> {
        self.select(opts, params).await
    }

    /// Select at most one row with the given conditions
    pub async fn find(
        &self,
        where_sql: &str,
        mut params: Params,
        order_by: &str,
        lock: bool,
    ) -> OrmResult<Option<PgRow>> {
        let opts = SelectOptions {
            where_sql: where_sql.to_string(),
            order_by: order_by.to_string(),
            limit: 1,
            lock,
            ..SelectOptions::default()
        };
        let (sql, extra) = self.select_sql(&opts);
        params.extend(extra);
        self.db.fetch_optional(&sql, &params).await
    }

    /// Build the INSERT statement and bind map, or `None` when the filtered
    /// field list is empty
    pub fn insert_sql(
        &self,
        values: Params,
        returning: Option<&str>,
    ) -> OrmResult<Option<(String, Params)>> {
        let writable = self.schema.writable(values)?;
        if writable.is_empty() {
            return Ok(None);
        }
        let names: Vec<&str> = writable.iter().map(|(name, _)| name.as_str()).collect();
        let placeholders: Vec<String> = names.iter().map(|name| format!(":{}", name)).collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(),
            names.join(", "),
            placeholders.join(", ")
        );
        if let Some(column) = returning {
            sql.push_str(" RETURNING ");
            sql.push_str(column);
        }
        let bind: Params = writable.into_iter().collect();
        Ok(Some((sql, bind)))
    }

    /// Insert one row. Read-only fields are dropped, unknown fields are a
    /// schema error; success means exactly one row was affected — this verb
    /// is not for bulk loads.
    pub async fn insert(&self, values: Params) -> OrmResult<Affected> {
        let Some((sql, bind)) = self.insert_sql(values, None)? else {
            debug!(table = %self.table(), "insert with no writable fields; skipping");
            return Ok(Affected::NoMatch);
        };
        let count = self.db.execute(&sql, &bind).await?;
        Ok(if count == 1 {
            Affected::Rows(1)
        } else {
            Affected::NoMatch
        })
    }

    /// Insert one row and fetch a generated column (e.g. the new id)
    pub async fn insert_returning(
        &self,
        values: Params,
        column: &str,
    ) -> OrmResult<Option<PgRow>> {
        let Some((sql, bind)) = self.insert_sql(values, Some(column))? else {
            return Ok(None);
        };
        self.db.fetch_optional(&sql, &bind).await
    }

    /// Build the UPDATE statement and bind map, or `None` when the filtered
    /// field list is empty. `condition` entries override colliding value
    /// keys in the bind map.
    pub fn update_sql(
        &self,
        values: Params,
        where_sql: &str,
        condition: Params,
    ) -> OrmResult<Option<(String, Params)>> {
        let writable = self.schema.writable(values)?;
        if writable.is_empty() {
            return Ok(None);
        }
        let assignments: Vec<String> = writable
            .iter()
            .map(|(name, _)| format!("{} = :{}", name, name))
            .collect();
        let predicate = if where_sql.is_empty() { "true" } else { where_sql };
        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table(),
            assignments.join(", "),
            predicate
        );
        let mut bind: Params = writable.into_iter().collect();
        bind.extend(condition);
        Ok(Some((sql, bind)))
    }

    /// Update matching rows; zero affected rows is a normal
    /// [`Affected::NoMatch`] outcome
    pub async fn update(
        &self,
        values: Params,
        where_sql: &str,
        condition: Params,
    ) -> OrmResult<Affected> {
        let Some((sql, bind)) = self.update_sql(values, where_sql, condition)? else {
            debug!(table = %self.table(), "update with no writable fields; skipping");
            return Ok(Affected::NoMatch);
        };
        let count = self.db.execute(&sql, &bind).await?;
        Ok(Affected::from_count(count))
    }

    /// Build the DELETE statement
    pub fn delete_sql(&self, where_sql: &str) -> String {
        let predicate = if where_sql.is_empty() { "true" } else { where_sql };
        format!("DELETE FROM {} WHERE {}", self.table(), predicate)
    }

    /// Delete matching rows
    pub async fn delete(&self, where_sql: &str, params: Params) -> OrmResult<Affected> {
        let sql = self.delete_sql(where_sql);
        let count = self.db.execute(&sql, &params).await?;
        Ok(Affected::from_count(count))
    }

    /// Truncate the table
    pub async fn truncate(&self) -> OrmResult<()> {
        self.db
            .execute(&format!("TRUNCATE {}", self.table()), &Params::new())
            .await?;
        Ok(())
    }

    /// Acquire a table-level lock. Advisory unless wrapped in an explicit
    /// transaction.
    pub async fn lock(&self) -> OrmResult<()> {
        self.db
            .execute(&format!("LOCK TABLE {}", self.table()), &Params::new())
            .await?;
        Ok(())
    }

    /// Begin an explicit transaction on the underlying connection
    pub async fn begin(&self) -> OrmResult<()> {
        self.db.begin().await
    }

    /// Commit the previously begun transaction
    pub async fn commit(&self) -> OrmResult<()> {
        self.db.commit().await
    }

    /// Roll back the current transaction
    pub async fn rollback(&self) -> OrmResult<()> {
        self.db.rollback().await
    }
}
