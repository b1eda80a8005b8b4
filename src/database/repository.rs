use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;

use crate::database::manager::DatabaseError;
use crate::database::models::call::CALL_COLUMNS;
use crate::database::models::{CallRecord, NewCall};
use crate::database::store::{CallStore, CallTransaction};

/// Postgres-backed [`CallStore`]
#[derive(Clone)]
pub struct PgCallStore {
    pool: PgPool,
}

impl PgCallStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallStore for PgCallStore {
    async fn begin(&self) -> Result<Box<dyn CallTransaction>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgCallTransaction { tx }))
    }

    async fn count_calls(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM calls")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_calls(&self, limit: i64, offset: i64) -> Result<Vec<CallRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM calls ORDER BY timestamp DESC, call_id DESC LIMIT $1 OFFSET $2",
            CALL_COLUMNS
        );
        let rows = sqlx::query_as::<_, CallRecord>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_call(&self, call_id: i32) -> Result<Option<CallRecord>, DatabaseError> {
        let sql = format!("SELECT {} FROM calls WHERE call_id = $1", CALL_COLUMNS);
        let row = sqlx::query_as::<_, CallRecord>(&sql)
            .bind(call_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn delete_call(&self, call_id: i32) -> Result<Option<CallRecord>, DatabaseError> {
        let sql = format!("DELETE FROM calls WHERE call_id = $1 RETURNING {}", CALL_COLUMNS);
        let row = sqlx::query_as::<_, CallRecord>(&sql)
            .bind(call_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgCallTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CallTransaction for PgCallTransaction {
    async fn existing_client_ids(&mut self, client_ids: &[i32]) -> Result<HashSet<i32>, DatabaseError> {
        if client_ids.is_empty() {
            return Ok(HashSet::new());
        }

        // FOR KEY SHARE blocks a concurrent DELETE of these clients until we commit
        let rows: Vec<i32> = sqlx::query_scalar(
            "SELECT client_id FROM clients WHERE client_id = ANY($1) FOR KEY SHARE",
        )
        .bind(client_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn insert_call(&mut self, call: &NewCall) -> Result<CallRecord, DatabaseError> {
        let sql = format!(
            "INSERT INTO calls (client_id, phone_number, response_category, \
             recording_url, recording_length, list_id, final_transcription) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            CALL_COLUMNS
        );
        let row = sqlx::query_as::<_, CallRecord>(&sql)
            .bind(call.client_id)
            .bind(&call.phone_number)
            .bind(&call.response_category)
            .bind(&call.recording_url)
            .bind(call.recording_length)
            .bind(&call.list_id)
            .bind(&call.final_transcription)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn update_call(&mut self, call_id: i32, call: &NewCall) -> Result<Option<CallRecord>, DatabaseError> {
        let sql = format!(
            "UPDATE calls \
             SET client_id = $1, phone_number = $2, response_category = $3, \
                 recording_url = $4, recording_length = $5, list_id = $6, \
                 final_transcription = $7 \
             WHERE call_id = $8 \
             RETURNING {}",
            CALL_COLUMNS
        );
        let row = sqlx::query_as::<_, CallRecord>(&sql)
            .bind(call.client_id)
            .bind(&call.phone_number)
            .bind(&call.response_category)
            .bind(&call.recording_url)
            .bind(call.recording_length)
            .bind(&call.list_id)
            .bind(&call.final_transcription)
            .bind(call_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
