//! Field registry and table schema
//!
//! A [`TableSchema`] is the per-entity mapping from column name to a
//! [`FieldSpec`] options record. It drives column-list generation for
//! SELECT and read-only/JSON filtering for writes.

use serde::{Deserialize, Serialize};

use crate::error::{OrmError, OrmResult};
use crate::value::{Params, SqlValue};

/// Per-column metadata controlling aliasing, JSON encoding, and write
/// eligibility
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Projected column alias (`table.col AS alias`)
    pub alias: Option<String>,
    /// Serialize the bound value to its JSON text form before writing
    pub json: bool,
    /// Populated only by the backend; never accepted from write-verb input
    pub readonly: bool,
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }
}

/// Ordered field registry for one table
#[derive(Debug, Clone)]
pub struct TableSchema {
    table: String,
    fields: Vec<(String, FieldSpec)>,
    computed: Vec<String>,
}

impl TableSchema {
    /// Build a schema; every field gets a concrete spec and duplicate names
    /// are rejected
    pub fn new(table: &str, fields: Vec<(&str, FieldSpec)>) -> OrmResult<Self> {
        let mut owned: Vec<(String, FieldSpec)> = Vec::with_capacity(fields.len());
        for (name, spec) in fields {
            if owned.iter().any(|(existing, _)| existing == name) {
                return Err(OrmError::Schema(format!(
                    "duplicate field '{}' in schema for table '{}'",
                    name, table
                )));
            }
            owned.push((name.to_string(), spec));
        }
        Ok(Self {
            table: table.to_string(),
            fields: owned,
            computed: Vec::new(),
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == key)
    }

    pub fn spec(&self, key: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, spec)| spec)
    }

    /// Full column name for a registered field, with alias when configured
    pub fn column_name(&self, key: &str) -> OrmResult<String> {
        let spec = self
            .spec(key)
            .ok_or_else(|| OrmError::Schema(format!("unknown field '{}'", key)))?;
        Ok(match &spec.alias {
            Some(alias) => format!("{}.{} AS {}", self.table, key, alias),
            None => format!("{}.{}", self.table, key),
        })
    }

    /// Projected column list: every registered field plus any appended
    /// computed expressions
    pub fn attr_list(&self) -> Vec<String> {
        let mut attrs: Vec<String> = self
            .fields
            .iter()
            .map(|(name, spec)| match &spec.alias {
                Some(alias) => format!("{}.{} AS {}", self.table, name, alias),
                None => format!("{}.{}", self.table, name),
            })
            .collect();
        attrs.extend(self.computed.iter().cloned());
        attrs
    }

    /// Append a synthetic computed column (e.g. an aggregate expression)
    /// for subsequent SELECTs
    pub fn push_computed(&mut self, expr: &str) {
        self.computed.push(expr.to_string());
    }

    pub fn clear_computed(&mut self) {
        self.computed.clear();
    }

    /// Filter a write-value map through the registry.
    ///
    /// Read-only fields are dropped silently; a key absent from the
    /// registry is a schema error. JSON-flagged values are serialized to
    /// their text form. Output order follows registry order so generated
    /// statements are deterministic.
    pub fn writable(&self, mut values: Params) -> OrmResult<Vec<(String, SqlValue)>> {
        let mut out = Vec::new();
        for (name, spec) in &self.fields {
            let Some(value) = values.remove(name) else {
                continue;
            };
            if spec.readonly {
                continue;
            }
            out.push((name.clone(), encode_field(spec, value)?));
        }
        if let Some(unknown) = values.keys().next() {
            return Err(OrmError::Schema(format!(
                "unknown field '{}' for table '{}'",
                unknown, self.table
            )));
        }
        Ok(out)
    }
}

/// Serialize a JSON-flagged value to its text form; other values pass
/// through unchanged. Dates inside the encoding render as ISO-8601 strings.
pub fn encode_field(spec: &FieldSpec, value: SqlValue) -> OrmResult<SqlValue> {
    if !spec.json {
        return Ok(value);
    }
    let text = serde_json::to_string(&value.to_json())?;
    Ok(SqlValue::Text(text))
}
