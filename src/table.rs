//! Table view — row and ordering conveniences over a data view
//!
//! Adds field-filtered lookup with operator inference, id-based verbs,
//! pagination, and the order-maintenance subsystem for singly-ordered
//! sibling lists keyed by a `parent_id` column (NULL-aware equality).
//!
//! The stack operations are individual statements, not an atomic sequence:
//! callers needing race-free reordering wrap them in a transaction and lock
//! the parent scope first.

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::connection::Database;
use crate::error::{Affected, OrmResult};
use crate::query::{DataView, SelectOptions};
use crate::schema::TableSchema;
use crate::value::{params, Params, SqlValue};

/// Default page size for [`TableView::select_page`]
pub const PAGE_SIZE: i64 = 10;

/// Options for [`TableView::get`]
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub order_by: String,
    pub lock: bool,
    /// Override the inferred operator for every non-null filter
    pub op: Option<String>,
}

/// Row-oriented view over one table
#[derive(Debug, Clone)]
pub struct TableView {
    view: DataView,
}

impl TableView {
    pub fn new(db: Arc<Database>, schema: TableSchema) -> Self {
        Self {
            view: DataView::new(db, schema),
        }
    }

    pub fn from_view(view: DataView) -> Self {
        Self { view }
    }

    pub fn view(&self) -> &DataView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut DataView {
        &mut self.view
    }

    fn table(&self) -> &str {
        self.view.schema().table()
    }

    /// Build the filter predicate for [`get`](Self::get).
    ///
    /// Text values that parse as positive decimal integers (no leading
    /// zero) are coerced to integer equality; other text defaults to
    /// `LIKE`; numeric values compare with `=`; `Null` renders `IS NULL`
    /// and binds nothing.
    pub fn filter_sql(
        &self,
        filters: Vec<(&str, SqlValue)>,
        op: Option<&str>,
    ) -> (String, Params) {
        let mut predicates = Vec::with_capacity(filters.len());
        let mut bind = Params::new();
        for (key, value) in filters {
            let value = coerce_decimal(value);
            match value {
                SqlValue::Null => {
                    predicates.push(format!("{}.{} IS NULL", self.table(), key));
                }
                _ => {
                    let operator = op.unwrap_or(infer_operator(&value));
                    predicates.push(format!("{}.{} {} :{}", self.table(), key, operator, key));
                    bind.insert(key.to_string(), value);
                }
            }
        }
        (predicates.join(" AND "), bind)
    }

    /// Find one record by field filters
    pub async fn get(
        &self,
        filters: Vec<(&str, SqlValue)>,
        opts: GetOptions,
    ) -> OrmResult<Option<PgRow>> {
        let (where_sql, bind) = self.filter_sql(filters, opts.op.as_deref());
        self.view
            .find(&where_sql, bind, &opts.order_by, opts.lock)
            .await
    }

    /// Find all records matching one field predicate
    pub async fn all_by_field(
        &self,
        field: &str,
        value: SqlValue,
        op: &str,
        order_by: &str,
    ) -> OrmResult<Vec<PgRow>> {
        let opts = SelectOptions {
            where_sql: format!("{} {} :value", field, op),
            order_by: order_by.to_string(),
            ..SelectOptions::default()
        };
        self.view.all(&opts, params([("value", value)])).await
    }

    /// Fetch one row by id
    pub async fn get_by_id(&self, item_id: i64) -> OrmResult<Option<PgRow>> {
        self.view
            .find("id = :item_id", params([("item_id", SqlValue::Int(item_id))]), "", false)
            .await
    }

    /// Update one row by id
    pub async fn update_by_id(&self, values: Params, item_id: i64) -> OrmResult<Affected> {
        self.view
            .update(
                values,
                "id = :item_id",
                params([("item_id", SqlValue::Int(item_id))]),
            )
            .await
    }

    /// Delete one row by id
    pub async fn delete_by_id(&self, item_id: i64) -> OrmResult<Affected> {
        self.view
            .delete("id = :item_id", params([("item_id", SqlValue::Int(item_id))]))
            .await
    }

    /// Select one page; `offset = (page - 1) * limit`. A non-positive
    /// `limit` falls back to [`PAGE_SIZE`], a non-positive `page` to 1.
    pub async fn select_page(
        &self,
        opts: &SelectOptions,
        page: i64,
        params: Params,
    ) -> OrmResult<Vec<PgRow>> {
        let limit = if opts.limit > 0 { opts.limit } else { PAGE_SIZE };
        let mut paged = opts.clone();
        paged.limit = limit;
        paged.offset = page_offset(limit, page);
        self.view.select(&paged, params).await
    }

    /// Build the max-order query and its bind map
    pub fn max_order_sql(&self, parent_id: SqlValue) -> (String, Params) {
        let (scope, bind) = parent_scope(parent_id);
        (
            format!(
                "SELECT MAX(order_id) AS order_id FROM {} WHERE {}",
                self.table(),
                scope
            ),
            bind,
        )
    }

    /// Maximum `order_id` among siblings sharing `parent_id`, or 0 when no
    /// sibling exists
    pub async fn get_max_order(&self, parent_id: SqlValue) -> OrmResult<i64> {
        let (sql, bind) = self.max_order_sql(parent_id);
        let row = self.view.db().fetch_optional(&sql, &bind).await?;
        match row {
            Some(row) => Ok(row.try_get::<Option<i64>, _>("order_id")?.unwrap_or(0)),
            None => Ok(0),
        }
    }

    /// Build the gap-opening shift and its bind map
    pub fn add_to_stack_sql(&self, parent_id: SqlValue, at: i64) -> (String, Params) {
        let (scope, mut bind) = parent_scope(parent_id);
        bind.insert("at".to_string(), SqlValue::Int(at + 1));
        (
            format!(
                "UPDATE {} SET order_id = order_id + 1 \
                 WHERE {} AND order_id >= :at",
                self.table(),
                scope
            ),
            bind,
        )
    }

    /// Open a gap at position `at`: siblings at or after `at + 1` shift up
    /// by one
    pub async fn add_to_stack(&self, parent_id: SqlValue, at: i64) -> OrmResult<u64> {
        let (sql, bind) = self.add_to_stack_sql(parent_id, at);
        self.view.db().execute(&sql, &bind).await
    }

    /// Build the gap-closing shift and its bind map
    pub fn remove_from_stack_sql(&self, parent_id: SqlValue, at: i64) -> (String, Params) {
        let (scope, mut bind) = parent_scope(parent_id);
        bind.insert("at".to_string(), SqlValue::Int(at));
        (
            format!(
                "UPDATE {} SET order_id = order_id - 1 \
                 WHERE {} AND order_id > :at",
                self.table(),
                scope
            ),
            bind,
        )
    }

    /// Close the gap left at position `at`: siblings after `at` shift down
    /// by one
    pub async fn remove_from_stack(&self, parent_id: SqlValue, at: i64) -> OrmResult<u64> {
        let (sql, bind) = self.remove_from_stack_sql(parent_id, at);
        self.view.db().execute(&sql, &bind).await
    }

    /// Build the in-between shift and its bind map
    pub fn order_between_sql(
        &self,
        parent_id: SqlValue,
        what: i64,
        where_pos: i64,
    ) -> (String, Params) {
        let (scope, mut bind) = parent_scope(parent_id);
        bind.insert("what".to_string(), SqlValue::Int(what));
        bind.insert("where_pos".to_string(), SqlValue::Int(where_pos));
        let sql = if what > where_pos {
            format!(
                "UPDATE {} SET order_id = order_id + 1 \
                 WHERE {} AND order_id > :where_pos AND order_id < :what",
                self.table(),
                scope
            )
        } else {
            format!(
                "UPDATE {} SET order_id = order_id - 1 \
                 WHERE {} AND order_id > :what AND order_id <= :where_pos",
                self.table(),
                scope
            )
        };
        (sql, bind)
    }

    /// Shift the sibling range between two positions when moving a row from
    /// `what` to `where_pos`; the caller writes the moved row's own new
    /// `order_id` separately.
    ///
    /// Moving earlier (`what > where_pos`) shifts the open interval
    /// `(where_pos, what)` up by one; moving later shifts `(what,
    /// where_pos]` down by one.
    pub async fn update_order_between(
        &self,
        parent_id: SqlValue,
        what: i64,
        where_pos: i64,
    ) -> OrmResult<u64> {
        let (sql, bind) = self.order_between_sql(parent_id, what, where_pos);
        self.view.db().execute(&sql, &bind).await
    }

    /// Recursively collect ancestor ids from `item_id` to the root,
    /// returned root-to-node. Empty when the row does not exist.
    pub async fn get_item_path(&self, item_id: i64) -> OrmResult<Vec<i64>> {
        let sql = format!(
            "WITH RECURSIVE parents AS ( \
             SELECT id, parent_id, ARRAY[id] AS path FROM {table} WHERE id = :item_id \
             UNION ALL \
             SELECT r.id, r.parent_id, r.id || p.path \
             FROM parents p JOIN {table} r ON p.parent_id = r.id \
             ) SELECT path FROM parents WHERE parent_id IS NULL",
            table = self.table()
        );
        let row = self
            .view
            .db()
            .fetch_optional(&sql, &params([("item_id", SqlValue::Int(item_id))]))
            .await?;
        match row {
            Some(row) => Ok(row.try_get::<Vec<i64>, _>("path")?),
            None => Ok(Vec::new()),
        }
    }
}

/// Offset for a 1-based page number
pub fn page_offset(limit: i64, page: i64) -> i64 {
    (page.max(1) - 1) * limit
}

/// NULL-aware sibling-scope predicate. A bound untyped null carries no
/// column type the server can resolve, so a `Null` parent renders
/// `parent_id IS NULL` and binds nothing.
fn parent_scope(parent_id: SqlValue) -> (&'static str, Params) {
    match parent_id {
        SqlValue::Null => ("parent_id IS NULL", Params::new()),
        value => (
            "parent_id IS NOT DISTINCT FROM :parent_id",
            params([("parent_id", value)]),
        ),
    }
}

/// Infer the comparison operator for a filter value
fn infer_operator(value: &SqlValue) -> &'static str {
    match value {
        SqlValue::Text(_) => "LIKE",
        _ => "=",
    }
}

/// Coerce a text value that is a positive decimal integer (no leading zero)
/// to an integer, switching its default operator from `LIKE` to `=`
fn coerce_decimal(value: SqlValue) -> SqlValue {
    if let SqlValue::Text(s) = &value {
        if !s.is_empty()
            && !s.starts_with('0')
            && s.bytes().all(|b| b.is_ascii_digit())
        {
            if let Ok(n) = s.parse::<i64>() {
                return SqlValue::Int(n);
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectConfig;
    use crate::schema::FieldSpec;

    fn table() -> TableView {
        let db = Arc::new(Database::new(ConnectConfig::new("h", "u", "p", "d")));
        let schema = TableSchema::new(
            "issue_comments",
            vec![
                ("id", FieldSpec::new().readonly()),
                ("issue_id", FieldSpec::new()),
                ("parent_id", FieldSpec::new()),
                ("order_id", FieldSpec::new()),
                ("email", FieldSpec::new()),
                ("status", FieldSpec::new()),
            ],
        )
        .unwrap();
        TableView::new(db, schema)
    }

    #[test]
    fn test_filter_defaults_text_to_like() {
        let t = table();
        let (sql, bind) = t.filter_sql(vec![("email", SqlValue::from("x@y.com"))], None);
        assert_eq!(sql, "issue_comments.email LIKE :email");
        assert_eq!(bind.get("email"), Some(&SqlValue::from("x@y.com")));
    }

    #[test]
    fn test_filter_coerces_decimal_string_to_integer_equality() {
        let t = table();
        let (sql, bind) = t.filter_sql(vec![("id", SqlValue::from("42"))], None);
        assert_eq!(sql, "issue_comments.id = :id");
        assert_eq!(bind.get("id"), Some(&SqlValue::Int(42)));
    }

    #[test]
    fn test_filter_leading_zero_stays_text() {
        let t = table();
        let (sql, bind) = t.filter_sql(vec![("status", SqlValue::from("042"))], None);
        assert_eq!(sql, "issue_comments.status LIKE :status");
        assert_eq!(bind.get("status"), Some(&SqlValue::from("042")));
    }

    #[test]
    fn test_filter_null_renders_is_null() {
        let t = table();
        let (sql, bind) = t.filter_sql(vec![("parent_id", SqlValue::Null)], None);
        assert_eq!(sql, "issue_comments.parent_id IS NULL");
        assert!(bind.is_empty());
    }

    #[test]
    fn test_filter_operator_override_and_combination() {
        let t = table();
        let (sql, _) = t.filter_sql(
            vec![
                ("issue_id", SqlValue::Int(3)),
                ("parent_id", SqlValue::Null),
                ("email", SqlValue::from("a@b.c")),
            ],
            Some("="),
        );
        assert_eq!(
            sql,
            "issue_comments.issue_id = :issue_id AND \
             issue_comments.parent_id IS NULL AND \
             issue_comments.email = :email"
        );
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(10, 1), 0);
        assert_eq!(page_offset(10, 3), 20);
        assert_eq!(page_offset(4, 2), 4);
        // non-positive pages clamp to the first page
        assert_eq!(page_offset(10, 0), 0);
        assert_eq!(page_offset(10, -2), 0);
    }

    #[test]
    fn test_order_between_sql_moving_earlier() {
        // moving row 5 to position 2: siblings strictly inside (2, 5) shift up
        let (sql, bind) = table().order_between_sql(SqlValue::Int(9), 5, 2);
        assert!(sql.contains("order_id = order_id + 1"));
        assert!(sql.contains("order_id > :where_pos AND order_id < :what"));
        assert_eq!(bind.get("what"), Some(&SqlValue::Int(5)));
        assert_eq!(bind.get("where_pos"), Some(&SqlValue::Int(2)));
    }

    #[test]
    fn test_order_between_sql_moving_later() {
        // moving row 2 to position 5: siblings in (2, 5] shift down
        let (sql, _) = table().order_between_sql(SqlValue::Int(9), 2, 5);
        assert!(sql.contains("order_id = order_id - 1"));
        assert!(sql.contains("order_id > :what AND order_id <= :where_pos"));
    }

    #[test]
    fn test_stack_scope_binds_concrete_parent() {
        let (sql, bind) = table().order_between_sql(SqlValue::Int(9), 5, 2);
        assert!(sql.contains("parent_id IS NOT DISTINCT FROM :parent_id"));
        assert_eq!(bind.get("parent_id"), Some(&SqlValue::Int(9)));
    }

    #[test]
    fn test_stack_scope_null_parent_binds_nothing() {
        // top-level rows have a NULL parent; the scope must not bind a
        // typeless null the server cannot compare against an integer column
        let t = table();

        let (sql, bind) = t.max_order_sql(SqlValue::Null);
        assert_eq!(
            sql,
            "SELECT MAX(order_id) AS order_id FROM issue_comments \
             WHERE parent_id IS NULL"
        );
        assert!(bind.is_empty());

        let (sql, bind) = t.add_to_stack_sql(SqlValue::Null, 3);
        assert!(sql.contains("parent_id IS NULL AND order_id >= :at"));
        assert!(!sql.contains(":parent_id"));
        assert_eq!(bind.get("at"), Some(&SqlValue::Int(4)));
        assert!(!bind.contains_key("parent_id"));

        let (sql, bind) = t.remove_from_stack_sql(SqlValue::Null, 3);
        assert!(sql.contains("parent_id IS NULL AND order_id > :at"));
        assert_eq!(bind.get("at"), Some(&SqlValue::Int(3)));
        assert!(!bind.contains_key("parent_id"));

        let (sql, bind) = t.order_between_sql(SqlValue::Null, 5, 2);
        assert!(sql.contains("parent_id IS NULL AND order_id > :where_pos"));
        assert!(!bind.contains_key("parent_id"));
    }

    #[test]
    fn test_max_order_sql_with_parent() {
        let (sql, bind) = table().max_order_sql(SqlValue::Int(4));
        assert_eq!(
            sql,
            "SELECT MAX(order_id) AS order_id FROM issue_comments \
             WHERE parent_id IS NOT DISTINCT FROM :parent_id"
        );
        assert_eq!(bind.get("parent_id"), Some(&SqlValue::Int(4)));
    }

    #[test]
    fn test_from_view_preserves_join_state() {
        let db = Arc::new(Database::new(ConnectConfig::new("h", "u", "p", "d")));
        let schema = TableSchema::new(
            "issues",
            vec![
                ("id", FieldSpec::new().readonly()),
                ("project_id", FieldSpec::new()),
                ("name", FieldSpec::new()),
            ],
        )
        .unwrap();
        let mut view = DataView::new(db, schema);
        view.join(
            "projects",
            "projects.id = issues.project_id",
            &["projects.name"],
        );

        let t = TableView::from_view(view);
        let (sql, _) = t.view().select_sql(&SelectOptions::default());
        assert!(sql.contains("LEFT JOIN projects ON projects.id = issues.project_id"));
        assert!(sql.contains("projects.name"));
    }
}
