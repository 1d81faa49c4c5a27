//! # Common API Types
//!
//! Shared response envelopes and pagination query parameters.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::cursor::{Page, PageRequest};
use crate::error::ApiError;
use crate::telemetry;

/// Standard envelope for single-resource responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response metadata
    pub meta: ResponseMeta,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::current(),
        }
    }
}

/// Response metadata
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResponseMeta {
    /// Trace identifier of the request, also returned in `X-Trace-Id`
    #[schema(example = "6f1d3c0a9b8e4f2a8c7d6e5f4a3b2c1d")]
    pub trace_id: Option<String>,
    /// Response timestamp (RFC 3339)
    #[schema(example = "2025-01-15T10:30:00Z")]
    pub timestamp: String,
}

impl ResponseMeta {
    fn current() -> Self {
        Self {
            trace_id: telemetry::current_trace_id(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Generic paginated response wrapper for list endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// List of items for the current page
    pub data: Vec<T>,
    /// Opaque cursor for fetching the next page (null if this is the last page)
    pub next_cursor: Option<String>,
    /// Convenience field indicating if more pages exist
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    pub fn from_page<M>(page: Page<M>, f: impl FnMut(M) -> T) -> Self {
        let page = page.map(f);
        Self {
            data: page.items,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        }
    }
}

/// Cursor pagination parameters shared by list endpoints
#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Maximum number of items to return (default: 50, max: 100)
    pub limit: Option<u64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
}

impl PageQuery {
    pub fn page_request(&self) -> Result<PageRequest, ApiError> {
        PageRequest::from_query(self.cursor.as_deref(), self.limit)
    }
}

/// Acknowledgement returned by delete endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub id: String,
    pub deleted: bool,
}

/// RFC 3339 rendering used for every timestamp in responses
pub fn rfc3339(value: sea_orm::prelude::DateTimeWithTimeZone) -> String {
    value.with_timezone(&Utc).to_rfc3339()
}
