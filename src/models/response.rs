// src/models/response.rs

use serde::{Deserialize, Serialize};

/// Uniform `{statusCode, message, data?}` envelope returned by every
/// account operation. Errors produce the same shape via `AppError`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status_code: 201,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
            data: None,
        }
    }
}

/// Pagination envelope `{data, total, page, limit, totalPages}`.
/// `totalPages` is derived, never stored.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T: Serialize> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(data: Vec<T>, total: i64, page: i64, limit: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            data,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Shared query parameters for paginated listings.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).max(1)
    }

    pub fn offset(&self) -> i64 {
        // Caller-supplied page/limit can be arbitrarily large; an absurd
        // page must yield an empty page, not an arithmetic panic.
        (self.page() - 1).saturating_mul(self.limit())
    }
}
