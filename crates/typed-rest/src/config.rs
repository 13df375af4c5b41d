//! Client configuration

use std::time::Duration;

use crate::deserializer::DeserializerConfig;

/// Configuration for [`RestClient`](crate::RestClient)
///
/// Built once and moved into the client; a live client has no way to change
/// it, so concurrent sends always observe the same settings.
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    /// Base URL that request paths resolve against (e.g., "https://api.example.com/")
    pub base_url: Option<String>,

    /// Total request timeout
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Read timeout (time between body chunks)
    pub read_timeout: Option<Duration>,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// Maximum number of redirects to follow
    pub max_redirects: usize,

    /// User-Agent header value
    pub user_agent: String,

    /// Headers sent with every request, before the request's own headers
    pub default_headers: Vec<(String, String)>,

    /// Whether to accept invalid certificates (for testing only)
    pub danger_accept_invalid_certs: bool,

    /// Whether to accept invalid hostnames (for testing only)
    pub danger_accept_invalid_hostnames: bool,

    /// Enable gzip compression
    pub gzip: bool,

    /// Enable brotli compression
    pub brotli: bool,

    /// Body decoder and custom converters used during materialization
    pub deserializer: DeserializerConfig,

    /// Runtime that executes the pipeline; the shared worker runtime when unset
    pub runtime: Option<tokio::runtime::Handle>,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            read_timeout: None,
            follow_redirects: true,
            max_redirects: 10,
            user_agent: format!("typed-rest/{}", env!("CARGO_PKG_VERSION")),
            default_headers: Vec::new(),
            danger_accept_invalid_certs: false,
            danger_accept_invalid_hostnames: false,
            gzip: true,
            brotli: true,
            deserializer: DeserializerConfig::default(),
            runtime: None,
        }
    }
}

impl RestClientConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the total timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout from seconds
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout = Duration::from_secs_f64(secs);
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set connection timeout from seconds
    pub fn connect_timeout_secs(mut self, secs: f64) -> Self {
        self.connect_timeout = Duration::from_secs_f64(secs);
        self
    }

    /// Set the read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set whether to follow redirects
    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Set maximum redirects
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Add a header sent with every request
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Accept invalid certificates (DANGER - testing only)
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }

    /// Accept invalid hostnames (DANGER - testing only)
    pub fn danger_accept_invalid_hostnames(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_hostnames = accept;
        self
    }

    /// Enable/disable gzip compression
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = enabled;
        self
    }

    /// Enable/disable brotli compression
    pub fn brotli(mut self, enabled: bool) -> Self {
        self.brotli = enabled;
        self
    }

    /// Set the deserializer configuration
    pub fn deserializer(mut self, deserializer: DeserializerConfig) -> Self {
        self.deserializer = deserializer;
        self
    }

    /// Run the pipeline on the given runtime instead of the shared worker.
    ///
    /// Blocking on a send is only safe while no caller blocks a thread this
    /// runtime needs, so a current-thread runtime is a poor choice here.
    pub fn runtime(mut self, handle: tokio::runtime::Handle) -> Self {
        self.runtime = Some(handle);
        self
    }
}
