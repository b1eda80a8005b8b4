use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::database::manager::DatabaseError;
use crate::database::models::{CallRecord, NewCall};
use crate::database::store::{CallStore, CallTransaction};

/// Minimal valid input for tests
pub fn new_call(client_id: i32, phone_number: &str) -> NewCall {
    NewCall {
        client_id,
        phone_number: phone_number.to_string(),
        response_category: None,
        recording_url: None,
        recording_length: None,
        list_id: None,
        final_transcription: None,
    }
}

#[derive(Default)]
struct MemoryState {
    clients: BTreeSet<i32>,
    calls: BTreeMap<i32, CallRecord>,
    next_id: i32,
    existence_queries: Vec<Vec<i32>>,
    transactions_started: usize,
    rollbacks: usize,
    unavailable: bool,
    delete_after_check: Option<i32>,
    fail_insert_at: Option<usize>,
    commit_foreign_key_violation: Option<i32>,
}

/// In-memory [`CallStore`] with snapshot transactions and fault injection.
///
/// A transaction works on a private copy of the tables and publishes it on
/// commit, so a rolled back or dropped transaction leaves no trace.
#[derive(Clone, Default)]
pub struct MemoryCallStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCallStore {
    pub fn with_clients(clients: impl IntoIterator<Item = i32>) -> Self {
        let store = Self::default();
        {
            let mut state = store.lock();
            state.clients.extend(clients);
            state.next_id = 1;
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn call_count(&self) -> usize {
        self.lock().calls.len()
    }

    /// Client ID sets passed to every existence query, in call order
    pub fn existence_queries(&self) -> Vec<Vec<i32>> {
        self.lock().existence_queries.clone()
    }

    pub fn transactions_started(&self) -> usize {
        self.lock().transactions_started
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Simulate a concurrent delete of `client_id` landing right after the existence check
    pub fn delete_client_after_check(&self, client_id: i32) {
        self.lock().delete_after_check = Some(client_id);
    }

    /// Make the n-th insert (0-based) of each transaction fail as if the connection dropped
    pub fn fail_insert_at(&self, index: usize) {
        self.lock().fail_insert_at = Some(index);
    }

    /// Make every commit fail with a foreign key violation on `client_id`, as a
    /// deferred constraint would
    pub fn fail_commit_with_foreign_key(&self, client_id: i32) {
        self.lock().commit_foreign_key_violation = Some(client_id);
    }

    fn check_available(state: &MemoryState) -> Result<(), DatabaseError> {
        if state.unavailable {
            return Err(DatabaseError::Unavailable(
                "timed out acquiring a pooled connection".to_string(),
            ));
        }
        Ok(())
    }
}

fn timestamp_for(call_id: i32) -> NaiveDateTime {
    let base = NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    base + Duration::seconds(i64::from(call_id))
}

#[async_trait]
impl CallStore for MemoryCallStore {
    async fn begin(&self) -> Result<Box<dyn CallTransaction>, DatabaseError> {
        let mut state = self.lock();
        Self::check_available(&state)?;
        state.transactions_started += 1;

        Ok(Box::new(MemoryTransaction {
            shared: self.state.clone(),
            clients: state.clients.clone(),
            calls: state.calls.clone(),
            next_id: state.next_id,
            inserts: 0,
        }))
    }

    async fn count_calls(&self) -> Result<i64, DatabaseError> {
        let state = self.lock();
        Self::check_available(&state)?;
        Ok(state.calls.len() as i64)
    }

    async fn list_calls(&self, limit: i64, offset: i64) -> Result<Vec<CallRecord>, DatabaseError> {
        let state = self.lock();
        Self::check_available(&state)?;
        let mut calls: Vec<CallRecord> = state.calls.values().cloned().collect();
        calls.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.call_id.cmp(&a.call_id))
        });
        Ok(calls
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn find_call(&self, call_id: i32) -> Result<Option<CallRecord>, DatabaseError> {
        let state = self.lock();
        Self::check_available(&state)?;
        Ok(state.calls.get(&call_id).cloned())
    }

    async fn delete_call(&self, call_id: i32) -> Result<Option<CallRecord>, DatabaseError> {
        let mut state = self.lock();
        Self::check_available(&state)?;
        Ok(state.calls.remove(&call_id))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        let state = self.lock();
        Self::check_available(&state)
    }
}

struct MemoryTransaction {
    shared: Arc<Mutex<MemoryState>>,
    clients: BTreeSet<i32>,
    calls: BTreeMap<i32, CallRecord>,
    next_id: i32,
    inserts: usize,
}

impl MemoryTransaction {
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.shared.lock().unwrap()
    }
}

#[async_trait]
impl CallTransaction for MemoryTransaction {
    async fn existing_client_ids(&mut self, client_ids: &[i32]) -> Result<HashSet<i32>, DatabaseError> {
        let delete_after_check = {
            let mut state = self.lock();
            MemoryCallStore::check_available(&state)?;
            state.existence_queries.push(client_ids.to_vec());
            state.delete_after_check
        };

        let found: HashSet<i32> = client_ids
            .iter()
            .copied()
            .filter(|id| self.clients.contains(id))
            .collect();

        if let Some(client_id) = delete_after_check {
            self.clients.remove(&client_id);
            self.lock().clients.remove(&client_id);
        }

        Ok(found)
    }

    async fn insert_call(&mut self, call: &NewCall) -> Result<CallRecord, DatabaseError> {
        let fail_at = self.lock().fail_insert_at;
        if fail_at == Some(self.inserts) {
            return Err(DatabaseError::Unavailable("connection reset by peer".to_string()));
        }
        self.inserts += 1;

        if !self.clients.contains(&call.client_id) {
            return Err(DatabaseError::ForeignKeyViolation {
                client_id: Some(call.client_id),
            });
        }

        let call_id = self.next_id;
        self.next_id += 1;
        let record = CallRecord {
            call_id,
            client_id: call.client_id,
            phone_number: call.phone_number.clone(),
            response_category: call.response_category.clone(),
            timestamp: timestamp_for(call_id),
            recording_url: call.recording_url.clone(),
            recording_length: call.recording_length,
            list_id: call.list_id.clone(),
            final_transcription: call.final_transcription.clone(),
        };
        self.calls.insert(call_id, record.clone());
        Ok(record)
    }

    async fn update_call(&mut self, call_id: i32, call: &NewCall) -> Result<Option<CallRecord>, DatabaseError> {
        if !self.clients.contains(&call.client_id) {
            return Err(DatabaseError::ForeignKeyViolation {
                client_id: Some(call.client_id),
            });
        }

        let Some(existing) = self.calls.get_mut(&call_id) else {
            return Ok(None);
        };
        existing.client_id = call.client_id;
        existing.phone_number = call.phone_number.clone();
        existing.response_category = call.response_category.clone();
        existing.recording_url = call.recording_url.clone();
        existing.recording_length = call.recording_length;
        existing.list_id = call.list_id.clone();
        existing.final_transcription = call.final_transcription.clone();
        Ok(Some(existing.clone()))
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        let MemoryTransaction { shared, calls, next_id, .. } = *self;
        let mut state = shared.lock().unwrap();
        MemoryCallStore::check_available(&state)?;
        if let Some(client_id) = state.commit_foreign_key_violation {
            return Err(DatabaseError::ForeignKeyViolation {
                client_id: Some(client_id),
            });
        }
        state.calls = calls;
        state.next_id = next_id;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.lock().rollbacks += 1;
        Ok(())
    }
}
