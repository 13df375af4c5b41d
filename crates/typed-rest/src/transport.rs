//! Transport seam and the default reqwest-backed implementation

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use typed_rest_common::HttpMethod;
use url::Url;

use crate::config::RestClientConfig;
use crate::error::TransportError;
use crate::response::RawResponse;

/// Fully-resolved request handed to a transport
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Physically sends requests
///
/// Implementations report what the server said without interpreting it:
/// 4xx/5xx responses are `Ok`, only failures to obtain a status are `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError>;
}

/// Transport over a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the underlying client from the connection settings in `config`
    pub fn new(config: &RestClientConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent);

        if let Some(read_timeout) = config.read_timeout {
            builder = builder.read_timeout(read_timeout);
        }

        // Configure redirects
        if config.follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::limited(config.max_redirects));
        } else {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        // Configure compression
        builder = builder.gzip(config.gzip).brotli(config.brotli);

        // Danger: Accept invalid certificates (testing only)
        if config.danger_accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        if config.danger_accept_invalid_hostnames {
            builder = builder.danger_accept_invalid_hostnames(true);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportError> {
        let start = Instant::now();
        let method = request.method;

        let mut builder = self
            .client
            .request(method.into(), request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        from_reqwest(response, method, start).await
    }
}

/// Statuses whose responses never carry a body
fn forbids_body(method: HttpMethod, status: u16) -> bool {
    method == HttpMethod::Head || (100..200).contains(&status) || status == 204 || status == 304
}

/// Convert reqwest Response to RawResponse
async fn from_reqwest(
    response: reqwest::Response,
    method: HttpMethod,
    start: Instant,
) -> Result<RawResponse, TransportError> {
    let status_code = response.status().as_u16();
    let url = response.url().to_string();
    let version = format!("{:?}", response.version());
    let headers = response.headers().clone();

    let body = if forbids_body(method, status_code) {
        None
    } else {
        Some(response.bytes().await?)
    };

    Ok(RawResponse {
        status_code,
        headers,
        body,
        url,
        version,
        latency: start.elapsed(),
    })
}
