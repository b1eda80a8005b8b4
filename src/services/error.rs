use thiserror::Error;

use crate::database::manager::DatabaseError;

/// Failure kinds of the call services.
///
/// Caller errors (`EmptyBatch`, `BatchSizeExceeded`, `ReferentialIntegrity`,
/// `NotFound`, `InvalidId`) need corrected input. Infrastructure errors
/// (`StoreUnavailable`, `TransactionFailure`) may succeed on resubmission, but
/// nothing here retries them. `Internal` is a deterministic store failure
/// (bad SQL, decode error) that resubmitting will not fix.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Calls list cannot be empty")]
    EmptyBatch,

    #[error("Maximum {max} calls per batch, got {size}")]
    BatchSizeExceeded { size: usize, max: usize },

    #[error("{}", referential_message(.client_id))]
    ReferentialIntegrity { client_id: Option<i32> },

    #[error("Call {0} not found")]
    NotFound(i64),

    #[error("Invalid call ID: {0}")]
    InvalidId(i64),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Transaction failure: {0}")]
    TransactionFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn referential_message(client_id: &Option<i32>) -> String {
    match client_id {
        Some(id) => format!("Client ID {} does not exist", id),
        None => "Referenced client does not exist".to_string(),
    }
}

impl ServiceError {
    /// Whether resubmitting the same request could succeed without changes
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ServiceError::StoreUnavailable(_) | ServiceError::TransactionFailure(_)
        )
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Unavailable(msg) => ServiceError::StoreUnavailable(msg),
            DatabaseError::ForeignKeyViolation { client_id } => {
                ServiceError::ReferentialIntegrity { client_id }
            }
            DatabaseError::Conflict(msg) => ServiceError::TransactionFailure(msg),
            DatabaseError::QueryError(msg) => ServiceError::Internal(msg),
            DatabaseError::InvalidDatabaseUrl => {
                ServiceError::StoreUnavailable("invalid database URL".to_string())
            }
        }
    }
}
