//! Blocking API client core for a REST micro-blogging service.
//!
//! # Overview
//! `MicroblogClient` exposes one method per remote operation (timelines,
//! statuses, direct messages, friendships, account, favorites, blocks,
//! help). Each call validates its arguments locally, builds a request from
//! the read-only operation catalog, performs one HTTP exchange through a
//! `Transport`, and returns a `Response` wrapper.
//!
//! # Design
//! - The catalog is data: `Operation::descriptor()` returns a static table
//!   entry, and request building is driven by it alone.
//! - HTTP 4xx/5xx are ordinary `Response`s (`is_error()`); only validation,
//!   transport and attribute-access failures are `Err`.
//! - `Transport` is a trait so the I/O boundary can be swapped in tests;
//!   `UreqTransport` is the default.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod transport;
pub mod types;
pub mod validate;

pub use catalog::{Operation, OperationDescriptor};
pub use client::MicroblogClient;
pub use config::ClientConfig;
pub use error::{AccessError, ClientError, ConfigError, TransportError, ValidationError};
pub use http::{HttpMethod, HttpRequest, ResponseMetadata, TransportResponse};
pub use request::{ParamValue, PathValue, RequestArgs};
pub use response::Response;
pub use transport::{Transport, UreqTransport};
pub use types::{Credentials, DirectMessage, Format, Status, User};
