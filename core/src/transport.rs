//! Executes one `HttpRequest` over the network.
//!
//! # Design
//! `Transport` is the seam between request building and I/O. The client is
//! generic over it so tests can record requests instead of sending them.
//! `UreqTransport` is the blocking default: one request per call, HTTP error
//! statuses returned as data, connection failures returned as
//! `TransportError`.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::debug;
use ureq::http::header::CONTENT_TYPE;
use ureq::ResponseExt;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, ResponseMetadata, TransportResponse, FORM_CONTENT_TYPE};
use crate::types::Credentials;

pub trait Transport {
    /// Performs exactly one request. `credentials` is `Some` only when the
    /// request must be authenticated.
    fn execute(
        &self,
        request: &HttpRequest,
        credentials: Option<&Credentials>,
    ) -> Result<TransportResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(
        &self,
        request: &HttpRequest,
        credentials: Option<&Credentials>,
    ) -> Result<TransportResponse, TransportError> {
        (**self).execute(request, credentials)
    }
}

/// Blocking transport backed by `ureq`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.user_agent.clone(),
        }
    }

    fn headers(&self, request: &HttpRequest, credentials: Option<&Credentials>) -> Vec<(String, String)> {
        let mut headers = vec![("user-agent".to_string(), self.user_agent.clone())];
        headers.extend(
            request
                .headers
                .iter()
                .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"))
                .cloned(),
        );
        if let Some(credentials) = credentials {
            headers.push(("authorization".to_string(), credentials.basic_authorization()));
        }
        headers
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(
        &self,
        request: &HttpRequest,
        credentials: Option<&Credentials>,
    ) -> Result<TransportResponse, TransportError> {
        let headers = self.headers(request, credentials);
        let started = Instant::now();

        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (name, value) in &headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                let body = request.body.as_deref().unwrap_or_default();
                builder.content_type(FORM_CONTENT_TYPE).send(body.as_bytes())
            }
        };

        let mut response = result.map_err(|e| {
            debug!(url = %request.url, error = %e, "transport failure");
            TransportError::new(&request.url, e)
        })?;

        let http_code = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let header_map: BTreeMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        let effective_url = response.get_uri().to_string();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportError::new(&request.url, e))?;

        let metadata = ResponseMetadata {
            http_code,
            content_type,
            url: effective_url,
            total_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            size_download: body.len() as u64,
            headers: header_map,
        };

        Ok(TransportResponse { body, metadata })
    }
}
