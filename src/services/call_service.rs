use serde::Serialize;
use std::slice;
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::models::{CallRecord, NewCall};
use crate::database::store::CallStore;
use crate::services::batch_writer::BatchRecordWriter;
use crate::services::error::ServiceError;
use crate::services::pagination::{Pagination, PaginationInfo};

/// One page of calls plus the numbers needed to fetch the rest
#[derive(Debug, Clone, Serialize)]
pub struct CallPage {
    pub calls: Vec<CallRecord>,
    pub pagination: PaginationInfo,
}

/// Single-record operations on calls. Inserts go through [`BatchRecordWriter`]
/// so every write path shares the same client check.
#[derive(Clone)]
pub struct CallService {
    store: Arc<dyn CallStore>,
    writer: BatchRecordWriter,
}

impl CallService {
    pub fn new(store: Arc<dyn CallStore>, max_batch_size: usize) -> Self {
        let writer = BatchRecordWriter::new(store.clone(), max_batch_size);
        Self { store, writer }
    }

    pub fn writer(&self) -> &BatchRecordWriter {
        &self.writer
    }

    pub async fn list(&self, pagination: Pagination) -> Result<CallPage, ServiceError> {
        let total = self.store.count_calls().await?;
        let calls = self
            .store
            .list_calls(pagination.limit, pagination.offset())
            .await?;

        Ok(CallPage {
            calls,
            pagination: PaginationInfo::new(pagination, total),
        })
    }

    pub async fn get(&self, call_id: i64) -> Result<CallRecord, ServiceError> {
        let id = checked_id(call_id)?;
        self.store
            .find_call(id)
            .await?
            .ok_or(ServiceError::NotFound(call_id))
    }

    pub async fn create(&self, call: NewCall) -> Result<CallRecord, ServiceError> {
        let mut created = self.writer.write_batch(slice::from_ref(&call)).await?;
        created
            .pop()
            .ok_or_else(|| ServiceError::Internal("insert returned no row".to_string()))
    }

    pub async fn write_batch(&self, calls: &[NewCall]) -> Result<Vec<CallRecord>, ServiceError> {
        self.writer.write_batch(calls).await
    }

    /// Replace every caller-owned field of an existing call
    pub async fn update(&self, call_id: i64, call: NewCall) -> Result<CallRecord, ServiceError> {
        let id = checked_id(call_id)?;
        let mut tx = self.store.begin().await?;

        let outcome: Result<CallRecord, ServiceError> = async {
            let existing = tx.existing_client_ids(&[call.client_id]).await?;
            if !existing.contains(&call.client_id) {
                return Err(ServiceError::ReferentialIntegrity {
                    client_id: Some(call.client_id),
                });
            }
            tx.update_call(id, &call)
                .await?
                .ok_or(ServiceError::NotFound(call_id))
        }
        .await;

        match outcome {
            Ok(updated) => {
                tx.commit().await?;
                info!(call_id, "Updated call");
                Ok(updated)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(call_id, error = %rollback_err, "Rollback of call update failed");
                }
                Err(err)
            }
        }
    }

    pub async fn delete(&self, call_id: i64) -> Result<CallRecord, ServiceError> {
        let id = checked_id(call_id)?;
        let deleted = self
            .store
            .delete_call(id)
            .await?
            .ok_or(ServiceError::NotFound(call_id))?;
        info!(call_id, "Deleted call");
        Ok(deleted)
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.store.ping().await?;
        Ok(())
    }
}

fn checked_id(call_id: i64) -> Result<i32, ServiceError> {
    if call_id <= 0 {
        return Err(ServiceError::InvalidId(call_id));
    }
    // Larger than any SERIAL value, so it cannot exist
    i32::try_from(call_id).map_err(|_| ServiceError::NotFound(call_id))
}
