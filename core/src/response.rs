//! Immutable wrapper around one completed exchange.
//!
//! # Design
//! The declared format is fixed at construction and never re-derived from
//! the body. The body is kept as the bytes the transport read; text views
//! decode it on demand and fail instead of substituting characters. Error
//! classification looks only at the status class. Attribute lookup goes
//! through an enumerated metadata record; anything it does not declare, or
//! an optional field the exchange did not produce, is an `AccessError`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{AccessError, ClientError};
use crate::http::ResponseMetadata;
use crate::types::Format;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    data: Vec<u8>,
    format: Format,
    metadata: ResponseMetadata,
}

impl Response {
    pub fn new(data: impl Into<Vec<u8>>, metadata: ResponseMetadata, format: Format) -> Self {
        Self {
            data: data.into(),
            format,
            metadata,
        }
    }

    /// The raw body, exactly as the transport returned it.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The body as UTF-8 text.
    pub fn text(&self) -> Result<&str, ClientError> {
        Ok(std::str::from_utf8(&self.data)?)
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn metadata(&self) -> &ResponseMetadata {
        &self.metadata
    }

    pub fn http_code(&self) -> u16 {
        self.metadata.http_code
    }

    /// True for 4xx and 5xx statuses.
    pub fn is_error(&self) -> bool {
        matches!(self.metadata.http_code / 100, 4 | 5)
    }

    pub fn is_json(&self) -> bool {
        self.format == Format::Json
    }

    pub fn is_xml(&self) -> bool {
        self.format == Format::Xml
    }

    /// Case-insensitive response header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.metadata
            .headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All metadata attributes plus the body under `data`. `content_type` is
    /// left out when the service sent none.
    pub fn to_map(&self) -> Result<Map<String, Value>, ClientError> {
        let meta = &self.metadata;
        let headers: Map<String, Value> = meta
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), Value::String(value.clone())))
            .collect();

        let mut map = Map::new();
        map.insert("http_code".to_string(), Value::from(meta.http_code));
        if let Some(content_type) = &meta.content_type {
            map.insert("content_type".to_string(), Value::String(content_type.clone()));
        }
        map.insert("url".to_string(), Value::String(meta.url.clone()));
        map.insert("total_time_ms".to_string(), Value::from(meta.total_time_ms));
        map.insert("size_download".to_string(), Value::from(meta.size_download));
        map.insert("headers".to_string(), Value::Object(headers));
        map.insert("data".to_string(), Value::String(self.text()?.to_string()));
        Ok(map)
    }

    /// The structured view rendered as a JSON document.
    pub fn to_json(&self) -> Result<String, ClientError> {
        Ok(Value::Object(self.to_map()?).to_string())
    }

    /// Looks up `data` or a metadata attribute by name.
    pub fn get(&self, attribute: &str) -> Result<Value, ClientError> {
        self.to_map()?.remove(attribute).ok_or_else(|| {
            ClientError::Access(AccessError {
                attribute: attribute.to_string(),
            })
        })
    }

    /// Decodes a json-format body into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        if !self.is_json() {
            return Err(ClientError::Deserialization(format!(
                "response was requested as {}, not json",
                self.format
            )));
        }
        serde_json::from_slice(&self.data).map_err(|e| ClientError::Deserialization(e.to_string()))
    }
}
