//! Raw and typed response types

use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use typed_rest_common::{HttpResponseLike, HttpStatus};

use crate::error::{RestError, RestResult};

/// Response exactly as the transport produced it
///
/// `body` is `None` when the response carried no body at all, which is not
/// the same as an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// HTTP status code
    pub status_code: u16,

    /// Response headers (repeated names are kept)
    pub headers: HeaderMap,

    /// Response body
    pub body: Option<Bytes>,

    /// Final URL (may differ from request URL due to redirects)
    pub url: String,

    /// HTTP version
    pub version: String,

    /// Time from dispatch to fully-read body
    pub latency: Duration,
}

impl RawResponse {
    /// True if a body is present and non-empty
    pub fn has_body(&self) -> bool {
        self.body.as_ref().is_some_and(|b| !b.is_empty())
    }

    /// Get body as text (UTF-8); an absent body reads as empty
    pub fn text(&self) -> RestResult<String> {
        let bytes = self.body.as_deref().unwrap_or_default();
        String::from_utf8(bytes.to_vec()).map_err(|e| RestError::Deserialization {
            status: self.status_code,
            type_name: "String",
            message: format!("Invalid UTF-8 in response: {}", e),
        })
    }

    /// Latency in whole milliseconds
    pub fn latency_ms(&self) -> u64 {
        self.latency.as_millis() as u64
    }

    /// Check if content type is JSON
    pub fn is_json(&self) -> bool {
        self.content_type()
            .map(|ct| ct.contains("application/json") || ct.contains("+json"))
            .unwrap_or(false)
    }
}

impl HttpResponseLike for RawResponse {
    fn status_code(&self) -> u16 {
        self.status_code
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body_bytes(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

/// Builder for creating RawResponse (used by transports and tests)
#[derive(Debug)]
pub struct RawResponseBuilder {
    status_code: u16,
    headers: HeaderMap,
    body: Option<Bytes>,
    url: String,
    version: String,
    latency: Duration,
}

impl RawResponseBuilder {
    pub fn new() -> Self {
        Self {
            status_code: 200,
            headers: HeaderMap::new(),
            body: None,
            url: String::new(),
            version: "HTTP/1.1".to_string(),
            latency: Duration::ZERO,
        }
    }

    pub fn status_code(mut self, code: u16) -> Self {
        self.status_code = code;
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Append a header; invalid names or values are skipped
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn no_body(mut self) -> Self {
        self.body = None;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn build(self) -> RawResponse {
        RawResponse {
            status_code: self.status_code,
            headers: self.headers,
            body: self.body,
            url: self.url,
            version: self.version,
            latency: self.latency,
        }
    }
}

impl Default for RawResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw response paired with its materialized content
///
/// `content` is only present for a success status with a non-empty body that
/// deserialized cleanly. Absent content alone does not say why: check the
/// status to tell "no body by design" from an error status.
#[derive(Debug, Clone, PartialEq)]
pub struct RestResponse<T> {
    raw: RawResponse,
    content: Option<T>,
}

impl<T> RestResponse<T> {
    pub(crate) fn new(raw: RawResponse, content: Option<T>) -> Self {
        Self { raw, content }
    }

    /// The transport response this envelope was built from
    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn status(&self) -> HttpStatus {
        HttpStatus(self.raw.status_code)
    }

    pub fn status_code(&self) -> u16 {
        self.raw.status_code
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.raw.headers
    }

    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    pub fn content(&self) -> Option<&T> {
        self.content.as_ref()
    }

    pub fn into_content(self) -> Option<T> {
        self.content
    }

    pub fn into_parts(self) -> (RawResponse, Option<T>) {
        (self.raw, self.content)
    }
}
