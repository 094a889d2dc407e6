//! Entity lifecycle hooks
//!
//! [`Entity`] wraps a [`TableView`]'s mutators with interception points so
//! concrete entities can adjust data before it reaches the database (e.g.
//! stamping an owner id, or assigning a per-project sequential issue
//! number). Every hook defaults to the identity.

use async_trait::async_trait;
use sqlx::postgres::PgRow;

use crate::error::{Affected, OrmResult};
use crate::table::TableView;
use crate::value::Params;

/// Lifecycle-hook surface over a table view
#[async_trait]
pub trait Entity: Send + Sync {
    /// The table view this entity operates on
    fn table(&self) -> &TableView;

    /// Adjust data before insertion
    async fn before_add(&self, data: Params) -> OrmResult<Params> {
        Ok(data)
    }

    /// Adjust data before an edit
    async fn before_edit(&self, _id: i64, data: Params) -> OrmResult<Params> {
        Ok(data)
    }

    /// Intercept a removal (veto by returning an error)
    async fn before_remove(&self, _id: i64) -> OrmResult<()> {
        Ok(())
    }

    /// Final normalization applied after `before_edit`
    async fn preprocess(&self, data: Params) -> OrmResult<Params> {
        Ok(data)
    }

    /// Insert a row through `before_add`
    async fn add(&self, data: Params) -> OrmResult<Affected> {
        let data = self.before_add(data).await?;
        self.table().view().insert(data).await
    }

    /// Insert a row through `before_add` and fetch a generated column
    async fn add_returning(&self, data: Params, column: &str) -> OrmResult<Option<PgRow>> {
        let data = self.before_add(data).await?;
        self.table().view().insert_returning(data, column).await
    }

    /// Update a row by id through `before_edit` and `preprocess`
    async fn edit(&self, id: i64, data: Params) -> OrmResult<Affected> {
        let data = self.before_edit(id, data).await?;
        let data = self.preprocess(data).await?;
        self.table().update_by_id(data, id).await
    }

    /// Delete a row by id through `before_remove`
    async fn remove(&self, id: i64) -> OrmResult<Affected> {
        self.before_remove(id).await?;
        self.table().delete_by_id(id).await
    }
}
