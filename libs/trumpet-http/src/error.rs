use crate::response::HttpClientResponse;
use std::fmt;
use std::io;
use thiserror::Error;

/// Classification of URL validation failures.
///
/// Provides programmatic matching for different failure modes without
/// relying on unstable error message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    /// URL could not be parsed (malformed syntax)
    ParseError,
    /// URL is missing required host/authority component
    MissingAuthority,
    /// URL is missing required scheme (http/https)
    MissingScheme,
}

/// A response body is (or claims to be) larger than the configured maximum.
///
/// Raised either up front, from a declared `Content-Length`, or while
/// streaming, when the byte after the limit is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeExceededError {
    limit: u64,
    declared: Option<u64>,
}

impl SizeExceededError {
    /// The server declared a body length above `limit`.
    #[must_use]
    pub fn declared(limit: u64, content_length: u64) -> Self {
        Self {
            limit,
            declared: Some(content_length),
        }
    }

    /// More than `limit` bytes were observed on the wire.
    #[must_use]
    pub fn observed(limit: u64) -> Self {
        Self {
            limit,
            declared: None,
        }
    }

    /// The configured maximum in bytes.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The declared `Content-Length`, if that is what tripped the limit.
    #[must_use]
    pub fn declared_length(&self) -> Option<u64> {
        self.declared
    }

    /// Wrap into an `io::Error` so it can travel through `Read` implementations.
    #[must_use]
    pub fn into_io(self) -> io::Error {
        io::Error::other(self)
    }

    /// Recover a size violation carried inside an `io::Error`.
    ///
    /// # Errors
    ///
    /// Hands the original error back when it does not carry a `SizeExceededError`.
    pub fn from_io(err: io::Error) -> Result<Self, io::Error> {
        let found = err
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<Self>())
            .copied();
        match found {
            Some(size) => Ok(size),
            None => Err(err),
        }
    }
}

impl fmt::Display for SizeExceededError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.declared {
            Some(length) => write!(
                f,
                "Response body too large: limit {} bytes, Content-Length: {length}",
                self.limit
            ),
            None => write!(
                f,
                "Response body too large: more than {} bytes read",
                self.limit
            ),
        }
    }
}

impl std::error::Error for SizeExceededError {}

/// Control signal raised instead of reading a redirect response.
///
/// Carries the untouched response so the caller can look at the status and
/// `Location` header and decide where to go next.
pub struct RedirectedError {
    response: Box<HttpClientResponse>,
}

impl RedirectedError {
    #[must_use]
    pub fn new(response: HttpClientResponse) -> Self {
        Self {
            response: Box::new(response),
        }
    }

    /// The response that triggered the signal.
    #[must_use]
    pub fn response(&self) -> &HttpClientResponse {
        &self.response
    }

    /// Take ownership of the response, body included.
    #[must_use]
    pub fn into_response(self) -> HttpClientResponse {
        *self.response
    }

    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        self.response.status()
    }

    /// Value of the `Location` header, if present and valid UTF-8.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.response.header(http::header::LOCATION.as_str())
    }
}

impl fmt::Debug for RedirectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectedError")
            .field("status", &self.status())
            .field("location", &self.location())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for RedirectedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location() {
            Some(location) => write!(f, "Redirected ({}) to '{location}'", self.status()),
            None => write!(f, "Redirected ({})", self.status()),
        }
    }
}

impl std::error::Error for RedirectedError {}

/// HTTP client error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    /// Server answered with a redirect and the handler was asked to signal it
    #[error(transparent)]
    Redirected(#[from] RedirectedError),

    /// Response body exceeded the configured size limit
    #[error(transparent)]
    SizeExceeded(#[from] SizeExceededError),

    /// I/O failure while reading or converting a response body
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Request building failed
    #[error("Failed to build request: {0}")]
    RequestBuild(#[from] http::Error),

    /// Invalid header name
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Invalid header value
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Request attempt timed out
    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Transport error (network, connection, etc)
    #[error("Transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// TLS error
    #[error("TLS error: {0}")]
    Tls(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON serialization of a request body failed
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Form URL encoding error
    #[error("Form encoding failed: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// The client was closed before the request was performed
    #[error("HTTP client has been closed")]
    ClientClosed,

    /// Invalid URL (failed to parse)
    ///
    /// Use the `kind` field for programmatic matching. The `reason` field contains
    /// a diagnostic message intended for logging only.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUri {
        /// The URL that failed to parse
        url: String,
        /// Structured failure classification for programmatic matching
        kind: InvalidUriKind,
        /// Diagnostic message (unstable format, for logging only)
        reason: String,
    },

    /// Invalid URL scheme for transport security configuration
    #[error("URL scheme '{scheme}' not allowed: {reason}")]
    InvalidScheme {
        /// The URL scheme that was rejected
        scheme: String,
        /// Reason the scheme was rejected
        reason: String,
    },
}

impl HttpError {
    /// True for the redirect control signal.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self, HttpError::Redirected(_))
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}
