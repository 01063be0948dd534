use std::collections::HashSet;
use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("trumpet-http/", env!("CARGO_PKG_VERSION"));

/// Default `Accept-Encoding` advertised to servers.
///
/// Only encodings the response pipeline can reverse are listed.
pub const DEFAULT_ACCEPT_ENCODING: &str = "gzip";

/// Redirect following performed by the transport.
///
/// Following is off by default: 3xx responses are handed to the response
/// handler, which can signal them with [`HttpError::Redirected`].
///
/// When enabled, the follow policy counts hops, blocks HTTPS → HTTP
/// downgrades, restricts targets to the original origin (plus
/// `allowed_redirect_hosts`) and strips credentials when the origin changes.
///
/// [`HttpError::Redirected`]: crate::HttpError::Redirected
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    /// Maximum number of redirects to follow; `0` disables following (default)
    pub max_redirects: usize,

    /// Only follow redirects that stay on the same scheme, host and port
    pub same_origin_only: bool,

    /// Host names that may be followed to even when `same_origin_only` is set
    pub allowed_redirect_hosts: HashSet<String>,

    /// Remove `Authorization`, `Cookie` and `Proxy-Authorization` once the origin changes
    pub strip_sensitive_headers: bool,

    /// Follow redirects from HTTPS to plain HTTP
    pub allow_https_downgrade: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self::disabled()
    }
}

impl RedirectConfig {
    /// Do not follow redirects.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_redirects: 0,
            same_origin_only: true,
            allowed_redirect_hosts: HashSet::new(),
            strip_sensitive_headers: true,
            allow_https_downgrade: false,
        }
    }

    /// Follow up to `max_redirects` same-origin redirects.
    #[must_use]
    pub fn same_origin(max_redirects: usize) -> Self {
        Self {
            max_redirects,
            ..Self::disabled()
        }
    }

    /// Follow up to 10 redirects to any host, still stripping credentials
    /// across origins and refusing downgrades.
    #[must_use]
    pub fn permissive() -> Self {
        Self {
            max_redirects: 10,
            same_origin_only: false,
            ..Self::disabled()
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.max_redirects > 0
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// OS native root certificate store
    Native,
}

/// Whether plain `http://` URLs are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// HTTPS only
    #[default]
    TlsOnly,
    /// Accept `http://` as well. Meant for local test servers.
    AllowInsecureHttp,
}

/// Overall HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Timeout for one request, from sending until the body is collected (default: 30s)
    pub request_timeout: Duration,

    /// Hard cap on the raw body collected from the wire (default: 10 MB)
    ///
    /// Independent of a handler's own `max_body_length`, which is usually smaller.
    pub max_body_size: usize,

    /// User-Agent header value, applied when the request has none
    pub user_agent: String,

    /// `Accept-Encoding` header value, applied when the request has none (`None` to omit)
    pub accept_encoding: Option<String>,

    /// Transport security mode (default: `TlsOnly`)
    pub transport: TransportSecurity,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Redirect following (default: disabled)
    pub redirect: RedirectConfig,

    /// Idle connection timeout for the pool (default: 90s, `None` keeps connections)
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum idle connections kept per host (default: 32, `0` disables reuse)
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * 1024 * 1024, // 10 MB
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            accept_encoding: Some(DEFAULT_ACCEPT_ENCODING.to_owned()),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            redirect: RedirectConfig::default(),
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpClientConfig {
    /// Short timeout, 1 MB body cap, no compression negotiation.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024, // 1 MB
            accept_encoding: None,
            pool_max_idle_per_host: 4,
            ..Self::default()
        }
    }

    /// Configuration for talking to local test servers over plain HTTP.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            transport: TransportSecurity::AllowInsecureHttp,
            pool_idle_timeout: None,
            ..Self::default()
        }
    }
}
