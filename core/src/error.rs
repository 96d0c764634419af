//! Error types for the micro-blogging client.
//!
//! # Design
//! Only local failures are errors here. An HTTP 4xx/5xx answer from the
//! service is not an error: it comes back as a `Response` whose `is_error()`
//! is true, and the caller branches on that. A request that never completes
//! (DNS, refused connection, timeout) is a `TransportError` and is never
//! turned into a `Response` with made-up metadata.

use thiserror::Error;

/// A caller-supplied argument failed a local check. Raised before any
/// network activity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid parameter ({parameter}): '{value}'; {constraint}")]
pub struct ValidationError {
    /// Name of the offending parameter (`format`, `page`, `status`, ...).
    pub parameter: String,
    /// The value as supplied (lower-cased for enumerated options).
    pub value: String,
    /// Human-readable description of the constraint that was violated.
    pub constraint: String,
}

impl ValidationError {
    pub fn new(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }
}

/// A response attribute was requested that the metadata record does not
/// declare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("response attribute '{attribute}' does not exist")]
pub struct AccessError {
    pub attribute: String,
}

/// The network call could not be completed at all.
#[derive(Debug, Error)]
#[error("transport failure for {url}: {source}")]
pub struct TransportError {
    pub url: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TransportError {
    pub fn new(url: impl Into<String>, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
        }
    }
}

/// Configuration could not be assembled from its sources.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Errors returned by `MicroblogClient` operations and `Response` helpers.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Access(#[from] AccessError),

    /// A response body could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A text view was requested of a body that is not UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

impl ClientError {
    /// The validation failure, if this error is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ClientError::Validation(err) => Some(err),
            _ => None,
        }
    }
}
