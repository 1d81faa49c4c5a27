//! # Cursor Utilities
//!
//! Opaque pagination cursors for list endpoints. A cursor wraps the offset of
//! the next page as base64-encoded JSON so clients cannot depend on its shape.

use axum::http::StatusCode;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_PAGE_LIMIT: u64 = 50;
pub const MAX_PAGE_LIMIT: u64 = 100;
const MAX_CURSOR_LEN: usize = 200;

/// Decoded cursor payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorData {
    pub offset: u64,
}

/// Offset and limit resolved from a list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub limit: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl PageRequest {
    /// Builds a page request from the raw `cursor` and `limit` query parameters.
    pub fn from_query(cursor: Option<&str>, limit: Option<u64>) -> Result<Self, ApiError> {
        let limit = match limit {
            None => DEFAULT_PAGE_LIMIT,
            Some(value) if (1..=MAX_PAGE_LIMIT).contains(&value) => value,
            Some(_) => {
                return Err(ApiError::new(
                    StatusCode::BAD_REQUEST,
                    "VALIDATION_FAILED",
                    "limit must be between 1 and 100",
                )
                .with_details(serde_json::json!({ "field": "limit" })));
            }
        };

        let offset = match cursor.filter(|c| !c.is_empty()) {
            Some(raw) => decode_cursor(raw)?.offset,
            None => 0,
        };

        Ok(Self { offset, limit })
    }

    /// Number of rows to fetch: one extra to detect a following page.
    pub fn fetch_limit(&self) -> u64 {
        self.limit + 1
    }
}

/// One page of results
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Trims the over-fetched row and computes the next cursor.
    pub fn from_fetched(mut items: Vec<T>, page: PageRequest) -> Self {
        let has_more = items.len() as u64 > page.limit;
        items.truncate(page.limit as usize);
        let next_cursor = has_more.then(|| encode_cursor(page.offset + page.limit));
        Self {
            items,
            next_cursor,
            has_more,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
            has_more: self.has_more,
        }
    }
}

/// Encode cursor data as an opaque base64 string
pub fn encode_cursor(offset: u64) -> String {
    let json = serde_json::json!({ "offset": offset }).to_string();
    base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
}

fn invalid_cursor(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
        .with_details(serde_json::json!({ "field": "cursor" }))
}

/// Decode cursor data from an opaque base64 string with validation
pub fn decode_cursor(cursor: &str) -> Result<CursorData, ApiError> {
    if cursor.len() > MAX_CURSOR_LEN {
        return Err(invalid_cursor("cursor is too long"));
    }

    if !cursor
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return Err(invalid_cursor("cursor contains invalid characters"));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .map_err(|_| invalid_cursor("cursor is not valid base64"))?;

    let json =
        String::from_utf8(decoded).map_err(|_| invalid_cursor("cursor contains invalid UTF-8 data"))?;

    serde_json::from_str(&json).map_err(|_| invalid_cursor("cursor contains invalid JSON structure"))
}
