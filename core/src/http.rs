//! HTTP request/response data exchanged with a `Transport`.
//!
//! # Design
//! Requests are plain data built by `request::build_request`; a transport
//! turns them into exactly one network call. Keeping them as owned values
//! lets tests record and inspect what would have gone over the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Format;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A fully resolved request for one catalog operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL: base + path + format suffix + query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    /// Form-encoded payload; present only for POST.
    pub body: Option<String>,
    /// Whether Basic credentials should be attached.
    pub use_auth: bool,
    /// Format the response will be declared as.
    pub format: Format,
}

/// Transport attributes of a completed exchange.
///
/// Field names follow the attribute names callers already look up
/// (`http_code`, `content_type`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub http_code: u16,
    pub content_type: Option<String>,
    /// Effective URL of the request, after any redirects.
    pub url: String,
    pub total_time_ms: u64,
    pub size_download: u64,
    /// Every response header, lower-cased names.
    pub headers: BTreeMap<String, String>,
}

impl ResponseMetadata {
    /// Metadata carrying only a status code.
    pub fn with_status(http_code: u16) -> Self {
        Self {
            http_code,
            ..Self::default()
        }
    }
}

/// Raw result of a transport call, before it is wrapped in a `Response`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// Body bytes exactly as read from the connection.
    pub body: Vec<u8>,
    pub metadata: ResponseMetadata,
}
