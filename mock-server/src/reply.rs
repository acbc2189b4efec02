use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

/// `{code, message, data}` body shared by every route.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub code: u16,
    pub message: String,
    pub data: Value,
}

/// A response whose HTTP status and envelope `code` agree.
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    envelope: Envelope,
}

impl Reply {
    pub fn new(status: StatusCode, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data).unwrap_or_default() {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Self {
            status,
            envelope: Envelope {
                code: status.as_u16(),
                message: message.into(),
                data,
            },
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

pub fn ok(message: &str, data: impl Serialize) -> Reply {
    Reply::new(StatusCode::OK, message, data)
}

pub fn created(message: &str, data: impl Serialize) -> Reply {
    Reply::new(StatusCode::CREATED, message, data)
}

pub fn fail(status: StatusCode, message: impl Into<String>) -> Reply {
    Reply::new(status, message, Value::Null)
}

/// Page-number pagination block used by list endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_items: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl Pagination {
    /// Clamp `page`/`page_size` the way the backend does and return the
    /// block plus the slice offset.
    pub fn clamp(total_items: usize, page: Option<usize>, page_size: Option<usize>) -> (Self, usize) {
        let page_size = match page_size.unwrap_or(20) {
            0 => 20,
            n => n.min(100),
        };
        let page = page.unwrap_or(1).max(1);
        let total_pages = if total_items == 0 {
            1
        } else {
            total_items.div_ceil(page_size)
        };
        let pagination = Self {
            total_items,
            page,
            page_size,
            total_pages,
        };
        (pagination, (page - 1).saturating_mul(page_size))
    }
}
