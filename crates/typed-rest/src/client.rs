//! REST client: dispatch, materialize, and the blocking-safe entry points

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::runtime::Handle;

use crate::config::RestClientConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{RestError, RestResult};
use crate::materializer::ResponseMaterializer;
use crate::request::{HttpMethod, Request, RequestBuilder};
use crate::response::RestResponse;
use crate::runtime;
use crate::transport::{ReqwestTransport, Transport};

/// Async REST client with typed responses
///
/// # Example
///
/// ```ignore
/// use typed_rest::{Request, RestClient, RestClientConfig};
///
/// let client = RestClient::new(RestClientConfig::new().base_url("http://localhost:9385/"))?;
///
/// // Awaiting works from any executor...
/// let response = client.send::<Vec<Book>>(Request::get("api/books")).await?;
///
/// // ...and so does blocking, even on a single-threaded context.
/// let response = client.send_blocking::<Vec<Book>>(Request::get("api/books"))?;
/// println!("{} -> {:?}", response.status(), response.content().map(Vec::len));
/// ```
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    dispatcher: Dispatcher,
    materializer: ResponseMaterializer,
    worker: Handle,
    config: RestClientConfig,
}

impl RestClient {
    /// Create a client that sends over reqwest
    pub fn new(config: RestClientConfig) -> RestResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client over a caller-supplied transport
    pub fn with_transport(
        config: RestClientConfig,
        transport: Arc<dyn Transport>,
    ) -> RestResult<Self> {
        let dispatcher = Dispatcher::new(
            transport,
            config.base_url.as_deref(),
            config.default_headers.clone(),
        )?;
        let materializer = ResponseMaterializer::new(config.deserializer.clone());
        let worker = match &config.runtime {
            Some(handle) => handle.clone(),
            None => runtime::shared_handle()?,
        };

        Ok(Self {
            inner: Arc::new(RestClientInner {
                dispatcher,
                materializer,
                worker,
                config,
            }),
        })
    }

    /// Create a client with default configuration
    pub fn default_client() -> RestResult<Self> {
        Self::new(RestClientConfig::default())
    }

    /// The normalized base URL, if one was configured
    pub fn base_url(&self) -> Option<&str> {
        self.inner.dispatcher.base_url().map(url::Url::as_str)
    }

    pub fn config(&self) -> &RestClientConfig {
        &self.inner.config
    }

    /// Send `request` and materialize the body as `T`.
    ///
    /// Error statuses resolve to an envelope with absent content; only
    /// transport failures and unreadable bodies are `Err`. The pipeline runs
    /// on the worker runtime, so this future may be awaited or blocked on
    /// from any thread.
    pub async fn send<T>(&self, request: Request) -> RestResult<RestResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        runtime::offload(&self.inner.worker, async move {
            let raw = inner.dispatcher.send(request).await?;
            inner.materializer.materialize::<T>(raw)
        })
        .await
    }

    /// Block the current thread until [`send`](Self::send) completes.
    ///
    /// Do not call this from a thread of the runtime the client offloads to.
    pub fn send_blocking<T>(&self, request: Request) -> RestResult<RestResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        futures::executor::block_on(self.send(request))
    }

    /// Send `request` and return only the content, failing on non-2xx statuses
    pub async fn execute<T>(&self, request: Request) -> RestResult<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let response = self.send::<T>(request).await?;
        if !response.is_success() {
            return Err(RestError::Status {
                code: response.status_code(),
            });
        }
        Ok(response.into_content())
    }

    // Convenience methods for common HTTP methods

    /// Send a GET request
    pub async fn get<T>(&self, path: &str) -> RestResult<RestResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.send(Request::get(path)).await
    }

    /// Send a DELETE request
    pub async fn delete<T>(&self, path: &str) -> RestResult<RestResponse<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.send(Request::delete(path)).await
    }

    /// Create a request builder for more complex requests
    pub fn request(&self, method: HttpMethod, path: &str) -> RequestBuilder {
        RequestBuilder::new(method, path)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url())
            .field("timeout", &self.inner.config.timeout)
            .field("deserializer", &self.inner.config.deserializer)
            .finish()
    }
}
