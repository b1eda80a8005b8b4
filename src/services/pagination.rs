use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::database::models::FieldErrors;

/// Raw `?page=&limit=` query parameters. Kept as text so a non-numeric value
/// is reported against its parameter like any other range violation.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Validated page window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_query(query: &PaginationQuery, api: &ApiConfig) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let page = match parse_param(query.page.as_deref()) {
            Ok(Some(page)) if page >= 1 => page,
            Ok(None) => 1,
            _ => {
                errors.insert("page".to_string(), "Page number must be an integer of at least 1".to_string());
                1
            }
        };

        let limit = match parse_param(query.limit.as_deref()) {
            Ok(Some(limit)) if (1..=api.max_page_size).contains(&limit) => limit,
            Ok(None) => api.default_page_size,
            _ => {
                errors.insert(
                    "limit".to_string(),
                    format!("Items per page must be an integer between 1 and {}", api.max_page_size),
                );
                api.default_page_size
            }
        };

        if errors.is_empty() {
            Ok(Self { page, limit })
        } else {
            Err(errors)
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Absent or blank means "use the default"
fn parse_param(raw: Option<&str>) -> Result<Option<i64>, std::num::ParseIntError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PaginationInfo {
    pub fn new(pagination: Pagination, total: i64) -> Self {
        let total_pages = if total > 0 {
            (total + pagination.limit - 1) / pagination.limit
        } else {
            0
        };
        Self {
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages,
        }
    }
}
