use async_trait::async_trait;
use std::collections::HashSet;

use crate::database::manager::DatabaseError;
use crate::database::models::{CallRecord, NewCall};

/// Relational store holding the `calls` and `clients` tables.
///
/// Reads and deletes run directly on a pooled connection. Anything that has to
/// validate a client reference goes through [`CallStore::begin`] so the check
/// and the write share one transaction.
#[async_trait]
pub trait CallStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn CallTransaction>, DatabaseError>;

    async fn count_calls(&self) -> Result<i64, DatabaseError>;

    /// Newest first.
    async fn list_calls(&self, limit: i64, offset: i64) -> Result<Vec<CallRecord>, DatabaseError>;

    async fn find_call(&self, call_id: i32) -> Result<Option<CallRecord>, DatabaseError>;

    /// Returns the removed row, or `None` when nothing matched.
    async fn delete_call(&self, call_id: i32) -> Result<Option<CallRecord>, DatabaseError>;

    /// Round trip used by the health endpoint.
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// One open transaction. Dropping it without `commit` discards every write.
#[async_trait]
pub trait CallTransaction: Send {
    /// Subset of `client_ids` present in `clients`. The matched rows stay
    /// protected from deletion until the transaction ends.
    async fn existing_client_ids(&mut self, client_ids: &[i32]) -> Result<HashSet<i32>, DatabaseError>;

    async fn insert_call(&mut self, call: &NewCall) -> Result<CallRecord, DatabaseError>;

    async fn update_call(&mut self, call_id: i32, call: &NewCall) -> Result<Option<CallRecord>, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError>;
}
