//! # rowstack: schema-driven micro-ORM for PostgreSQL
//!
//! A small, reflection-free data-access layer: declarative field registries
//! mapped onto hand-composed SQL with named-parameter binding, join
//! composition, pagination, DDL helpers, and order maintenance for
//! hierarchical sibling rows.
//!
//! The layers compose rather than inherit:
//! - [`Database`](connection::Database) — one connection, explicit
//!   transaction control, reconnect-on-demand;
//! - [`TableSchema`](schema::TableSchema) — per-entity field registry
//!   driving column lists and write filtering;
//! - [`DataView`](query::DataView) — generic SELECT/INSERT/UPDATE/DELETE
//!   builder with joins;
//! - [`TableView`](table::TableView) — id-based verbs, pagination, ordered
//!   sibling stacks;
//! - [`Entity`](model::Entity) — lifecycle hooks around the mutators.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod model;
pub mod query;
pub mod schema;
pub mod table;
pub mod value;


// Re-export core types
pub use connection::{ConnectConfig, Database};
pub use error::{Affected, OrmError, OrmResult};
pub use model::Entity;
pub use query::{DataView, JoinType, SelectOptions};
pub use schema::{FieldSpec, TableSchema};
pub use table::{GetOptions, TableView, PAGE_SIZE};
pub use value::{params, Params, SqlValue};
