use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::database::manager::DatabaseError;
use crate::database::models::{CallRecord, NewCall};
use crate::database::store::{CallStore, CallTransaction};
use crate::services::error::ServiceError;

/// Validates client references and persists a batch of calls atomically.
///
/// The whole batch shares one transaction: a single existence query for the
/// distinct client IDs, then one insert per record in input order. Any failure
/// rolls the transaction back, so either every record is stored or none is.
#[derive(Clone)]
pub struct BatchRecordWriter {
    store: Arc<dyn CallStore>,
    max_batch_size: usize,
}

impl BatchRecordWriter {
    pub fn new(store: Arc<dyn CallStore>, max_batch_size: usize) -> Self {
        Self { store, max_batch_size }
    }

    /// Size checks that must pass before the store is touched
    pub fn check_batch_size(&self, size: usize) -> Result<(), ServiceError> {
        if size == 0 {
            return Err(ServiceError::EmptyBatch);
        }
        if size > self.max_batch_size {
            return Err(ServiceError::BatchSizeExceeded {
                size,
                max: self.max_batch_size,
            });
        }
        Ok(())
    }

    /// Persist `records` and return the stored rows in the same order
    pub async fn write_batch(&self, records: &[NewCall]) -> Result<Vec<CallRecord>, ServiceError> {
        self.check_batch_size(records.len())?;

        let client_ids = distinct_client_ids(records);
        debug!(
            records = records.len(),
            distinct_clients = client_ids.len(),
            "Writing call batch"
        );

        let mut tx = self.store.begin().await?;

        match insert_checked(tx.as_mut(), records, &client_ids).await {
            Ok(created) => {
                // Deferred constraint failures surface here as the same kind as a pre-check miss
                tx.commit().await.map_err(ServiceError::from)?;
                info!(created = created.len(), "Committed call batch");
                Ok(created)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback of call batch failed");
                }
                warn!(error = %err, "Call batch aborted");
                Err(err)
            }
        }
    }
}

/// Existence check followed by the inserts, all on the caller's transaction
async fn insert_checked(
    tx: &mut dyn CallTransaction,
    records: &[NewCall],
    client_ids: &[i32],
) -> Result<Vec<CallRecord>, ServiceError> {
    let existing = tx.existing_client_ids(client_ids).await?;

    if let Some(missing) = records.iter().find(|r| !existing.contains(&r.client_id)) {
        return Err(ServiceError::ReferentialIntegrity {
            client_id: Some(missing.client_id),
        });
    }

    let mut created = Vec::with_capacity(records.len());
    for record in records {
        let row = tx.insert_call(record).await.map_err(|err| match err {
            // The storage foreign key caught what the pre-check let through
            DatabaseError::ForeignKeyViolation { .. } => ServiceError::ReferentialIntegrity {
                client_id: Some(record.client_id),
            },
            other => other.into(),
        })?;
        created.push(row);
    }

    Ok(created)
}

/// Distinct client IDs in first-seen order
pub(crate) fn distinct_client_ids(records: &[NewCall]) -> Vec<i32> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .iter()
        .map(|r| r.client_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_call, MemoryCallStore};

    fn writer(store: &MemoryCallStore, max: usize) -> BatchRecordWriter {
        BatchRecordWriter::new(Arc::new(store.clone()), max)
    }

    #[tokio::test]
    async fn writes_valid_batch_in_input_order() {
        let store = MemoryCallStore::with_clients([1, 2]);
        let batch = vec![new_call(1, "555-0001"), new_call(2, "555-0002")];

        let created = writer(&store, 10).write_batch(&batch).await.unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].phone_number, "555-0001");
        assert_eq!(created[1].phone_number, "555-0002");
        assert_eq!(created[0].client_id, 1);
        assert_eq!(created[1].client_id, 2);
        assert_ne!(created[0].call_id, created[1].call_id);
        assert_eq!(store.call_count(), 2);
    }

    #[tokio::test]
    async fn missing_client_aborts_whole_batch() {
        let store = MemoryCallStore::with_clients([1, 2]);
        let batch = vec![
            new_call(1, "555-0001"),
            new_call(3, "555-0003"),
            new_call(2, "555-0002"),
        ];

        let err = writer(&store, 10).write_batch(&batch).await.unwrap_err();

        assert_eq!(err, ServiceError::ReferentialIntegrity { client_id: Some(3) });
        assert_eq!(store.call_count(), 0);
        assert_eq!(store.rollbacks(), 1);
    }

    #[tokio::test]
    async fn reports_first_missing_client_in_input_order() {
        let store = MemoryCallStore::with_clients([1]);
        let batch = vec![new_call(7, "a"), new_call(5, "b"), new_call(1, "c")];

        let err = writer(&store, 10).write_batch(&batch).await.unwrap_err();

        assert_eq!(err, ServiceError::ReferentialIntegrity { client_id: Some(7) });
    }

    #[tokio::test]
    async fn issues_one_existence_query_over_distinct_clients() {
        let store = MemoryCallStore::with_clients([1, 2]);
        let batch: Vec<NewCall> = (0..6)
            .map(|i| new_call(if i % 2 == 0 { 1 } else { 2 }, &format!("555-00{:02}", i)))
            .collect();

        writer(&store, 10).write_batch(&batch).await.unwrap();

        let queries = store.existence_queries();
        assert_eq!(queries.len(), 1);
        let mut ids = queries[0].clone();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn empty_batch_is_rejected_without_store_access() {
        let store = MemoryCallStore::with_clients([1]);

        let err = writer(&store, 10).write_batch(&[]).await.unwrap_err();

        assert_eq!(err, ServiceError::EmptyBatch);
        assert_eq!(store.transactions_started(), 0);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_without_store_access() {
        let store = MemoryCallStore::with_clients([1]);
        let batch: Vec<NewCall> = (0..4).map(|i| new_call(1, &i.to_string())).collect();

        let err = writer(&store, 3).write_batch(&batch).await.unwrap_err();

        assert_eq!(err, ServiceError::BatchSizeExceeded { size: 4, max: 3 });
        assert_eq!(store.transactions_started(), 0);
    }

    #[tokio::test]
    async fn batch_at_exact_limit_is_accepted() {
        let store = MemoryCallStore::with_clients([1]);
        let batch: Vec<NewCall> = (0..3).map(|i| new_call(1, &i.to_string())).collect();

        let created = writer(&store, 3).write_batch(&batch).await.unwrap();

        assert_eq!(created.len(), 3);
    }

    #[tokio::test]
    async fn resubmitting_identical_batch_creates_duplicates() {
        let store = MemoryCallStore::with_clients([1, 2]);
        let batch = vec![new_call(1, "555-0001"), new_call(2, "555-0002")];
        let writer = writer(&store, 10);

        let first = writer.write_batch(&batch).await.unwrap();
        let second = writer.write_batch(&batch).await.unwrap();

        assert_eq!(store.call_count(), 4);
        assert_ne!(first[0].call_id, second[0].call_id);
        assert_eq!(first[0].phone_number, second[0].phone_number);
    }

    #[tokio::test]
    async fn client_deleted_after_check_reports_same_error_kind() {
        let store = MemoryCallStore::with_clients([1, 2]);
        store.delete_client_after_check(2);
        let batch = vec![new_call(1, "555-0001"), new_call(2, "555-0002")];

        let err = writer(&store, 10).write_batch(&batch).await.unwrap_err();

        assert_eq!(err, ServiceError::ReferentialIntegrity { client_id: Some(2) });
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn foreign_key_violation_at_commit_reports_same_error_kind() {
        let store = MemoryCallStore::with_clients([1, 2]);
        store.fail_commit_with_foreign_key(2);
        let batch = vec![new_call(1, "555-0001"), new_call(2, "555-0002")];

        let err = writer(&store, 10).write_batch(&batch).await.unwrap_err();

        assert_eq!(err, ServiceError::ReferentialIntegrity { client_id: Some(2) });
        assert!(!err.is_transient());
        assert_eq!(store.call_count(), 0);
        // A failed commit already ended the transaction
        assert_eq!(store.rollbacks(), 0);
    }

    #[tokio::test]
    async fn store_failure_mid_batch_leaves_no_rows() {
        let store = MemoryCallStore::with_clients([1]);
        store.fail_insert_at(2);
        let batch: Vec<NewCall> = (0..4).map(|i| new_call(1, &i.to_string())).collect();

        let err = writer(&store, 10).write_batch(&batch).await.unwrap_err();

        assert!(matches!(err, ServiceError::StoreUnavailable(_)));
        assert!(err.is_transient());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn unavailable_store_surfaces_as_store_unavailable() {
        let store = MemoryCallStore::with_clients([1]);
        store.set_unavailable(true);

        let err = writer(&store, 10)
            .write_batch(&[new_call(1, "555")])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::StoreUnavailable(_)));
    }

    #[test]
    fn distinct_ids_keep_first_seen_order() {
        let batch = vec![new_call(3, "a"), new_call(1, "b"), new_call(3, "c"), new_call(2, "d")];
        assert_eq!(distinct_client_ids(&batch), vec![3, 1, 2]);
    }
}
