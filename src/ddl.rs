//! Schema-definition helpers
//!
//! DDL statements are composed from a colon-delimited descriptor
//! mini-language: field descriptors are `name:type[:not_null[:default]]`
//! (e.g. `first_name:varchar(100):1`), index descriptors are
//! `column:kind`. Descriptor arity and emptiness are checked; type strings
//! are passed through unvalidated.

use crate::connection::Database;
use crate::error::{OrmError, OrmResult};
use crate::value::Params;

/// Render a field descriptor as a column definition
pub fn field_sql(descriptor: &str) -> OrmResult<String> {
    let parts: Vec<&str> = descriptor.split(':').collect();
    if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(OrmError::Schema(format!(
            "malformed field descriptor '{}'",
            descriptor
        )));
    }
    let mut sql = format!("{} {}", parts[0], parts[1]);
    if parts.get(2) == Some(&"1") {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = parts.get(3) {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    Ok(sql)
}

/// Render an index descriptor as a key definition
pub fn index_sql(descriptor: &str) -> OrmResult<String> {
    let parts: Vec<&str> = descriptor.split(':').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(OrmError::Schema(format!(
            "malformed index descriptor '{}'",
            descriptor
        )));
    }
    Ok(format!("{} KEY ({})", parts[1], parts[0]))
}

/// Build a CREATE TABLE statement from field and index descriptors
pub fn create_table_sql(name: &str, fields: &[&str], indexes: &[&str]) -> OrmResult<String> {
    if fields.is_empty() {
        return Err(OrmError::Schema(format!(
            "create_table '{}' requires at least one field",
            name
        )));
    }
    let mut parts = Vec::with_capacity(fields.len() + indexes.len());
    for field in fields {
        parts.push(field_sql(field)?);
    }
    for index in indexes {
        parts.push(index_sql(index)?);
    }
    Ok(format!("CREATE TABLE {} ({})", name, parts.join(", ")))
}

/// Create a table from descriptors
pub async fn create_table(
    db: &Database,
    name: &str,
    fields: &[&str],
    indexes: &[&str],
) -> OrmResult<()> {
    let sql = create_table_sql(name, fields, indexes)?;
    db.execute(&sql, &Params::new()).await?;
    Ok(())
}

/// Add a column described by a field descriptor
pub async fn add_column(db: &Database, table: &str, field: &str) -> OrmResult<()> {
    let sql = format!("ALTER TABLE {} ADD COLUMN {}", table, field_sql(field)?);
    db.execute(&sql, &Params::new()).await?;
    Ok(())
}

/// Rename a column; a no-op when the names already match
pub async fn rename_column(db: &Database, table: &str, old: &str, new: &str) -> OrmResult<()> {
    if old == new {
        return Ok(());
    }
    let sql = format!("ALTER TABLE {} RENAME COLUMN {} TO {}", table, old, new);
    db.execute(&sql, &Params::new()).await?;
    Ok(())
}

/// Change a column's type, casting existing values
pub async fn change_column_type(
    db: &Database,
    table: &str,
    column: &str,
    ty: &str,
) -> OrmResult<()> {
    let sql = format!(
        "ALTER TABLE {} ALTER COLUMN {} TYPE {} USING ({}::{})",
        table, column, ty, column, ty
    );
    db.execute(&sql, &Params::new()).await?;
    Ok(())
}

/// Rename a table
pub async fn rename_table(db: &Database, old: &str, new: &str) -> OrmResult<()> {
    let sql = format!("ALTER TABLE {} RENAME TO {}", old, new);
    db.execute(&sql, &Params::new()).await?;
    Ok(())
}

/// Drop a table and its dependents
pub async fn drop_table(db: &Database, table: &str) -> OrmResult<()> {
    let sql = format!("DROP TABLE {} CASCADE", table);
    db.execute(&sql, &Params::new()).await?;
    Ok(())
}

/// Drop a single column
pub async fn drop_column(db: &Database, table: &str, column: &str) -> OrmResult<()> {
    let sql = format!("ALTER TABLE {} DROP COLUMN {}", table, column);
    db.execute(&sql, &Params::new()).await?;
    Ok(())
}

/// Trigger definition
#[derive(Debug, Clone, Default)]
pub struct TriggerDef<'a> {
    pub name: &'a str,
    pub table: &'a str,
    pub function: &'a str,
    /// `BEFORE` / `AFTER` / `INSTEAD OF`
    pub when: &'a str,
    /// `INSERT` / `UPDATE` / `DELETE`, combined with `OR`
    pub events: &'a [&'a str],
    /// `ROW` or `STATEMENT`
    pub each: Option<&'a str>,
    pub condition: Option<&'a str>,
    pub arguments: &'a [&'a str],
}

/// Build a CREATE TRIGGER statement
pub fn create_trigger_sql(def: &TriggerDef<'_>) -> String {
    let mut sql = format!(
        "CREATE TRIGGER {} {} {} ON {}",
        def.name,
        def.when,
        def.events.join(" OR "),
        def.table
    );
    if let Some(each) = def.each {
        sql.push_str(" FOR EACH ");
        sql.push_str(each);
    }
    if let Some(condition) = def.condition {
        sql.push_str(" WHEN (");
        sql.push_str(condition);
        sql.push(')');
    }
    sql.push_str(" EXECUTE PROCEDURE ");
    sql.push_str(def.function);
    sql.push('(');
    sql.push_str(&def.arguments.join(", "));
    sql.push(')');
    sql
}

/// Create a trigger
pub async fn create_trigger(db: &Database, def: &TriggerDef<'_>) -> OrmResult<()> {
    db.execute(&create_trigger_sql(def), &Params::new()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_sql_variants() {
        assert_eq!(
            field_sql("first_name:varchar(100):1").unwrap(),
            "first_name varchar(100) NOT NULL"
        );
        assert_eq!(field_sql("age:integer").unwrap(), "age integer");
        assert_eq!(
            field_sql("status:integer:0:1").unwrap(),
            "status integer DEFAULT 1"
        );
        assert_eq!(
            field_sql("order_id:integer:1:0").unwrap(),
            "order_id integer NOT NULL DEFAULT 0"
        );
    }

    #[test]
    fn test_field_sql_rejects_malformed() {
        assert!(field_sql("name").is_err());
        assert!(field_sql(":integer").is_err());
        assert!(field_sql("name:").is_err());
    }

    #[test]
    fn test_index_sql() {
        assert_eq!(index_sql("email:UNIQUE").unwrap(), "UNIQUE KEY (email)");
        assert!(index_sql("email").is_err());
        assert!(index_sql("email:UNIQUE:extra").is_err());
    }

    #[test]
    fn test_create_table_sql() {
        let sql = create_table_sql(
            "users",
            &["id:serial:1", "email:varchar(255):1"],
            &["email:UNIQUE"],
        )
        .unwrap();
        assert_eq!(
            sql,
            "CREATE TABLE users (id serial NOT NULL, \
             email varchar(255) NOT NULL, UNIQUE KEY (email))"
        );
    }

    #[test]
    fn test_create_table_requires_fields() {
        assert!(create_table_sql("users", &[], &[]).is_err());
    }

    #[test]
    fn test_create_trigger_sql_full() {
        let def = TriggerDef {
            name: "set_issue_number",
            table: "issues",
            function: "assign_issue_number",
            when: "BEFORE",
            events: &["INSERT"],
            each: Some("ROW"),
            condition: Some("NEW.issue_id IS NULL"),
            arguments: &["'issues'"],
        };
        assert_eq!(
            create_trigger_sql(&def),
            "CREATE TRIGGER set_issue_number BEFORE INSERT ON issues \
             FOR EACH ROW WHEN (NEW.issue_id IS NULL) \
             EXECUTE PROCEDURE assign_issue_number('issues')"
        );
    }

    #[test]
    fn test_create_trigger_sql_minimal() {
        let def = TriggerDef {
            name: "audit",
            table: "projects",
            function: "log_change",
            when: "AFTER",
            events: &["UPDATE", "DELETE"],
            ..TriggerDef::default()
        };
        assert_eq!(
            create_trigger_sql(&def),
            "CREATE TRIGGER audit AFTER UPDATE OR DELETE ON projects \
             EXECUTE PROCEDURE log_change()"
        );
    }
}
