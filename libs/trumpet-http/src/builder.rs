use crate::client::{ClientService, HttpClient};
use crate::config::{HttpClientConfig, RedirectConfig, TlsRootConfig, TransportSecurity};
use crate::error::HttpError;
use crate::layers::{DefaultHeadersLayer, GuardedRedirectPolicy};
use crate::tls;
use bytes::Bytes;
use http_body_util::Full;
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;
use tower::timeout::TimeoutLayer;
use tower::{ServiceBuilder, ServiceExt};
use tower_http::follow_redirect::FollowRedirectLayer;

/// Builder for constructing an [`HttpClient`] with a layered tower middleware stack.
#[derive(Debug, Default)]
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder with a specific configuration
    #[must_use]
    pub fn with_config(config: HttpClientConfig) -> Self {
        Self { config }
    }

    /// Set the per-request timeout, covering the response head and body
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the user agent string
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the `Accept-Encoding` sent by default; `None` sends none.
    #[must_use]
    pub fn accept_encoding(mut self, accept_encoding: Option<&str>) -> Self {
        self.config.accept_encoding = accept_encoding.map(str::to_owned);
        self
    }

    /// Set the cap on raw response bytes collected from the wire
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Set transport security mode
    #[must_use]
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.config.transport = transport;
        self
    }

    /// Allow plain `http://` URLs.
    ///
    /// Only available in debug builds or with the `allow-insecure-http` feature.
    #[must_use]
    #[cfg(any(debug_assertions, feature = "allow-insecure-http"))]
    pub fn allow_insecure_http(mut self) -> Self {
        self.config.transport = TransportSecurity::AllowInsecureHttp;
        self
    }

    /// Set the TLS root certificate source
    #[must_use]
    pub fn tls_roots(mut self, roots: TlsRootConfig) -> Self {
        self.config.tls_roots = roots;
        self
    }

    /// Set the redirect policy configuration
    ///
    /// Following is disabled by default so that redirect responses reach the
    /// response handler.
    #[must_use]
    pub fn redirect(mut self, config: RedirectConfig) -> Self {
        self.config.redirect = config;
        self
    }

    /// Set the idle connection timeout for the connection pool
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set the maximum number of idle connections per host
    #[must_use]
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Build the HTTP client
    ///
    /// Request flow (outer to inner):
    /// `Timeout → DefaultHeaders → FollowRedirect → hyper client`
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails or a default header value is invalid
    pub fn build(self) -> Result<HttpClient, HttpError> {
        let config = self.config;
        if config.transport == TransportSecurity::AllowInsecureHttp {
            tracing::warn!(
                "insecure HTTP enabled (TransportSecurity::AllowInsecureHttp); \
                 use only for testing with local servers"
            );
        }

        let https = tls::https_connector(config.tls_roots, config.transport)?;

        let mut client_builder = Client::builder(TokioExecutor::new());
        // pool_idle_timeout only takes effect with a pool timer
        client_builder
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host);
        if let Some(idle_timeout) = config.pool_idle_timeout {
            client_builder.pool_idle_timeout(idle_timeout);
        }
        let hyper_client = client_builder.build::<_, Full<Bytes>>(https);

        let default_headers =
            DefaultHeadersLayer::try_new(&config.user_agent, config.accept_encoding.as_deref())?;

        let timeout = config.request_timeout;
        let service = ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .layer(default_headers)
            .layer(FollowRedirectLayer::with_policy(GuardedRedirectPolicy::new(
                config.redirect,
            )))
            .service(hyper_client)
            .map_err(move |e: tower::BoxError| map_tower_error(e, timeout));

        Ok(HttpClient {
            service: ClientService::new(service),
            max_body_size: config.max_body_size,
            request_timeout: timeout,
            transport_security: config.transport,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }
}

/// Map tower errors to `HttpError` with the configured timeout duration
fn map_tower_error(err: tower::BoxError, timeout: Duration) -> HttpError {
    if err.is::<tower::timeout::error::Elapsed>() {
        return HttpError::Timeout(timeout);
    }

    match err.downcast::<hyper_util::client::legacy::Error>() {
        Ok(transport) => HttpError::from(*transport),
        Err(other) => HttpError::Transport(other),
    }
}
