use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use std::collections::BTreeMap;

pub const PHONE_NUMBER_MAX_CHARS: usize = 20;
pub const LIST_ID_MAX_CHARS: usize = 50;

/// Column list shared by every statement that returns a call row
pub const CALL_COLUMNS: &str = "call_id, client_id, phone_number, response_category, \
     timestamp, recording_url, recording_length, list_id, final_transcription";

/// A persisted call record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub call_id: i32,
    pub client_id: i32,
    pub phone_number: String,
    pub response_category: Option<String>,
    pub timestamp: NaiveDateTime,
    pub recording_url: Option<String>,
    pub recording_length: Option<f64>,
    pub list_id: Option<String>,
    pub final_transcription: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for CallRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            call_id: row.try_get("call_id")?,
            client_id: row.try_get("client_id")?,
            phone_number: row.try_get("phone_number")?,
            response_category: row.try_get("response_category")?,
            timestamp: row.try_get("timestamp")?,
            recording_url: row.try_get("recording_url")?,
            recording_length: row.try_get("recording_length")?,
            list_id: row.try_get("list_id")?,
            final_transcription: row.try_get("final_transcription")?,
        })
    }
}

/// Caller-supplied fields for a new call (also used as the full replacement on update)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCall {
    pub client_id: i32,
    pub phone_number: String,
    #[serde(default)]
    pub response_category: Option<String>,
    #[serde(default)]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub recording_length: Option<f64>,
    #[serde(default)]
    pub list_id: Option<String>,
    #[serde(default)]
    pub final_transcription: Option<String>,
}

/// Batch payload: `{"calls": [...]}`
#[derive(Debug, Clone, Deserialize)]
pub struct CallBatch {
    pub calls: Vec<NewCall>,
}

/// Field name -> human readable problem, sorted so response bodies are stable
pub type FieldErrors = BTreeMap<String, String>;

impl NewCall {
    /// Apply field constraints and normalization. Returns the cleaned record or
    /// every field problem found.
    pub fn validated(self) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.client_id <= 0 {
            errors.insert("client_id".to_string(), "Client ID must be a positive integer".to_string());
        }

        let phone_number = self.phone_number.trim().to_string();
        if phone_number.is_empty() {
            errors.insert("phone_number".to_string(), "Phone number cannot be empty".to_string());
        } else if phone_number.chars().count() > PHONE_NUMBER_MAX_CHARS {
            errors.insert(
                "phone_number".to_string(),
                format!("Phone number must be at most {} characters", PHONE_NUMBER_MAX_CHARS),
            );
        }

        if let Some(length) = self.recording_length {
            if !length.is_finite() || length < 0.0 {
                errors.insert(
                    "recording_length".to_string(),
                    "Recording length must be a non-negative number of seconds".to_string(),
                );
            }
        }

        let list_id = blank_to_none(self.list_id);
        if let Some(list_id) = &list_id {
            if list_id.chars().count() > LIST_ID_MAX_CHARS {
                errors.insert(
                    "list_id".to_string(),
                    format!("List ID must be at most {} characters", LIST_ID_MAX_CHARS),
                );
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            client_id: self.client_id,
            phone_number,
            response_category: self.response_category,
            recording_url: blank_to_none(self.recording_url),
            recording_length: self.recording_length,
            list_id,
            final_transcription: blank_to_none(self.final_transcription),
        })
    }
}

impl CallBatch {
    /// Validate every element, keying problems as `calls[i].field`
    pub fn validated(self) -> Result<Vec<NewCall>, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut calls = Vec::with_capacity(self.calls.len());

        for (index, call) in self.calls.into_iter().enumerate() {
            match call.validated() {
                Ok(call) => calls.push(call),
                Err(field_errors) => {
                    for (field, message) in field_errors {
                        errors.insert(format!("calls[{}].{}", index, field), message);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(calls)
        } else {
            Err(errors)
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
