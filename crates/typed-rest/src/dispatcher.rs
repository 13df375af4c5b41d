//! Sends a request over the transport and returns the raw response

use std::sync::Arc;
use std::time::Instant;

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use url::Url;

use crate::error::{RestError, RestResult};
use crate::request::Request;
use crate::response::RawResponse;
use crate::transport::{Transport, TransportRequest};

/// Resolves requests against the base URL and hands them to the transport
///
/// The dispatcher does not look at status codes; whatever the transport
/// returned is passed through verbatim.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    base_url: Option<Url>,
    default_headers: Vec<(String, String)>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: Option<&str>,
        default_headers: Vec<(String, String)>,
    ) -> RestResult<Self> {
        let base_url = base_url.map(normalize_base).transpose()?;
        Ok(Self {
            transport,
            base_url,
            default_headers,
        })
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Send `request` and return the transport's response.
    ///
    /// Status, headers and body are passed through verbatim; only `latency`
    /// is overwritten with the time measured here.
    pub async fn send(&self, request: Request) -> RestResult<RawResponse> {
        let url = request.resolve_url(self.base_url.as_ref())?;
        let headers = self.build_headers(&request)?;
        let body = request.body().map(|b| b.to_bytes()).transpose()?;
        let method = request.method();

        tracing::debug!(%method, url = %sanitize_url(&url), "dispatching request");
        let start = Instant::now();

        let mut response = self
            .transport
            .send(TransportRequest {
                method,
                url,
                headers,
                body,
            })
            .await
            .map_err(|e| {
                tracing::warn!(%method, error = %e.sanitized_message(), "transport failed");
                RestError::from(e)
            })?;
        response.latency = start.elapsed();

        tracing::debug!(
            %method,
            status = response.status_code,
            elapsed_ms = response.latency_ms(),
            "received response"
        );

        Ok(response)
    }

    /// Default headers first (unless the request overrides the name), then
    /// the request's own headers, then the body's Content-Type if none was set
    fn build_headers(&self, request: &Request) -> RestResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        for (name, value) in &self.default_headers {
            if !request.has_header(name) {
                append_header(&mut headers, name, value)?;
            }
        }
        for (name, value) in request.headers() {
            append_header(&mut headers, name, value)?;
        }

        if let Some(body) = request.body() {
            if !headers.contains_key(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(body.content_type()));
            }
        }

        Ok(headers)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("default_headers", &self.default_headers.len())
            .finish_non_exhaustive()
    }
}

fn append_header(headers: &mut HeaderMap, name: &str, value: &str) -> RestResult<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| RestError::InvalidRequest(format!("Invalid header name '{}': {}", name, e)))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| RestError::InvalidRequest(format!("Invalid value for header '{}': {}", name, e)))?;
    headers.append(header_name, header_value);
    Ok(())
}

/// URL without userinfo, for logging
fn sanitize_url(url: &Url) -> String {
    let mut redacted = url.clone();
    if !redacted.username().is_empty() || redacted.password().is_some() {
        let _ = redacted.set_username("");
        let _ = redacted.set_password(None);
    }
    redacted.to_string()
}

/// Parse the base URL so that relative paths append to it
fn normalize_base(base: &str) -> RestResult<Url> {
    let mut url = Url::parse(base)?;
    if url.cannot_be_a_base() {
        return Err(RestError::InvalidUrl(format!("'{}' cannot be a base URL", base)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
