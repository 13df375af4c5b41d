//! Request description and builder

use bytes::Bytes;
use serde::Serialize;
use url::Url;

use crate::error::{RestError, RestResult};
pub use typed_rest_common::HttpMethod;

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// JSON document
    Json(serde_json::Value),
    /// URL-encoded form fields
    Form(Vec<(String, String)>),
    /// Plain text
    Text(String),
    /// Opaque bytes
    Bytes(Bytes),
}

impl RequestBody {
    /// Content-Type sent when the request does not set one explicitly
    pub fn content_type(&self) -> &'static str {
        match self {
            RequestBody::Json(_) => "application/json",
            RequestBody::Form(_) => "application/x-www-form-urlencoded",
            RequestBody::Text(_) => "text/plain; charset=utf-8",
            RequestBody::Bytes(_) => "application/octet-stream",
        }
    }

    /// Encode the body for the wire
    pub fn to_bytes(&self) -> RestResult<Bytes> {
        match self {
            RequestBody::Json(value) => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| RestError::InvalidRequest(format!("Failed to encode JSON body: {}", e))),
            RequestBody::Form(fields) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields)
                    .finish();
                Ok(Bytes::from(encoded))
            }
            RequestBody::Text(text) => Ok(Bytes::from(text.clone())),
            RequestBody::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Logical description of one HTTP call
///
/// The path is resolved against the client's base URL at send time. Headers
/// keep insertion order and may repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl Request {
    /// GET request for a path
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Get, path)
    }

    /// Request with an explicit method and no headers or body
    pub fn with_method(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Get, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::with_method(HttpMethod::Delete, path)
    }

    /// Start a builder for more complex requests
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, path)
    }

    /// Append a header; repeated names are kept
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Whether the caller set this header explicitly (case-insensitive)
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Resolve the path and query against a base URL.
    ///
    /// Paths are always relative to the base, including ones with a leading
    /// `/`. Only an absolute `http`/`https` URL is used as-is; anything else
    /// that happens to parse with a scheme (`api:books`, `localhost:9385/x`)
    /// is still a path under the base.
    pub fn resolve_url(&self, base: Option<&Url>) -> RestResult<Url> {
        let mut url = match Url::parse(&self.path) {
            Ok(absolute) if matches!(absolute.scheme(), "http" | "https") => absolute,
            Ok(_) | Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = base.ok_or_else(|| {
                    RestError::InvalidUrl(format!(
                        "relative path '{}' requires a base URL",
                        self.path
                    ))
                })?;
                // "./" keeps a colon in the first segment from reading as a scheme
                base.join(&format!("./{}", self.path.trim_start_matches('/')))?
            }
            Err(e) => return Err(e.into()),
        };

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        Ok(url)
    }
}

/// Builder for [`Request`]
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query_params: Vec<(String, String)>,
    pub url_segments: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    encode_error: Option<String>,
}

impl RequestBuilder {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            query_params: Vec::new(),
            url_segments: Vec::new(),
            body: None,
            encode_error: None,
        }
    }

    /// Append a header; repeated names are kept
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append a query-string parameter
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((name.into(), value.into()));
        self
    }

    /// Replace the `{name}` placeholder in the path
    pub fn url_segment(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.url_segments.push((name.into(), value.to_string()));
        self
    }

    /// Serialize a value as the JSON body
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(v) => self.body = Some(RequestBody::Json(v)),
            Err(e) => self.encode_error = Some(format!("Failed to encode JSON body: {}", e)),
        }
        self
    }

    /// Use an already-built JSON value as the body
    pub fn json_value(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// URL-encoded form body
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(RequestBody::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(text.into()));
        self
    }

    pub fn bytes(mut self, bytes: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes(bytes.into()));
        self
    }

    /// Finish the request, substituting URL segments
    pub fn build(self) -> RestResult<Request> {
        if let Some(err) = self.encode_error {
            return Err(RestError::InvalidRequest(err));
        }

        let mut path = self.path;
        for (name, value) in &self.url_segments {
            let placeholder = format!("{{{}}}", name);
            if !path.contains(&placeholder) {
                return Err(RestError::InvalidRequest(format!(
                    "URL segment '{}' has no placeholder in '{}'",
                    name, path
                )));
            }
            path = path.replace(&placeholder, &encode_segment(value));
        }

        if let Some(start) = path.find('{') {
            if path[start..].contains('}') {
                return Err(RestError::InvalidRequest(format!(
                    "Unresolved URL segment in '{}'",
                    path
                )));
            }
        }

        Ok(Request {
            method: self.method,
            path,
            query: self.query_params,
            headers: self.headers,
            body: self.body,
        })
    }
}

/// Percent-encode a value for use as a single path segment
fn encode_segment(value: &str) -> String {
    // form encoding turns spaces into '+', which paths do not decode
    url::form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
