//! Canned responses for exercising handlers without a network.
//!
//! ```ignore
//! use trumpet_http::testing::{FixedResponseConfig, FixedResponseGenerator};
//!
//! let generator = FixedResponseGenerator::new(
//!     FixedResponseConfig::default().with_status(StatusCode::NOT_FOUND),
//!     "not here",
//! );
//! let text = client
//!     .get("http://example.invalid/", &handler)
//!     .request()
//!     .respond_with(&generator)?;
//! ```

use crate::error::HttpError;
use crate::io::BodyReader;
use crate::response::{HttpClientResponse, ResponseHead};
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri};
use std::io;

/// Produces a response for a request that was never sent.
pub trait ResponseGenerator {
    /// Answer `request`.
    ///
    /// # Errors
    ///
    /// Whatever failure the generator wants to simulate.
    fn respond_to(&self, request: &Request<Bytes>) -> Result<HttpClientResponse, HttpError>;
}

/// Everything about a canned response except its body.
///
/// Defaults: `200`, empty status text, `text/plain` in `utf-8`, no URI,
/// `Content-Length` declared. Whether the response counts as redirected is
/// derived from the status and a `Location` header unless
/// [`with_redirected`](Self::with_redirected) overrides it.
#[derive(Debug, Clone)]
pub struct FixedResponseConfig {
    pub status: StatusCode,
    pub status_text: String,
    pub content_type: Option<String>,
    pub charset: Option<String>,
    /// Overrides the redirect flag derived from status and `Location`
    pub redirected: Option<bool>,
    pub uri: Option<Uri>,
    /// Leave out `Content-Length`, like a chunked response would
    pub chunked: bool,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl Default for FixedResponseConfig {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            status_text: String::new(),
            content_type: Some("text/plain".to_owned()),
            charset: Some("utf-8".to_owned()),
            redirected: None,
            uri: None,
            chunked: false,
            headers: Vec::new(),
        }
    }
}

impl FixedResponseConfig {
    /// Set the status code. Any code in `100..=999` can be built with
    /// [`StatusCode::from_u16`].
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_status_text(mut self, text: impl Into<String>) -> Self {
        self.status_text = text.into();
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: Option<&str>) -> Self {
        self.content_type = content_type.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn with_charset(mut self, charset: Option<&str>) -> Self {
        self.charset = charset.map(str::to_owned);
        self
    }

    #[must_use]
    pub fn with_redirected(mut self, redirected: bool) -> Self {
        self.redirected = Some(redirected);
        self
    }

    #[must_use]
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = Some(uri);
        self
    }

    #[must_use]
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    /// Append a header. Repeated names keep every value in insertion order.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

/// [`ResponseGenerator`] that always returns the same response.
///
/// Every call gets a fresh body stream over the same bytes.
#[derive(Debug, Clone)]
pub struct FixedResponseGenerator {
    config: FixedResponseConfig,
    body: Bytes,
}

impl FixedResponseGenerator {
    #[must_use]
    pub fn new(config: FixedResponseConfig, body: impl Into<Bytes>) -> Self {
        Self {
            config,
            body: body.into(),
        }
    }

    /// A `200 text/plain` response with `content`.
    #[must_use]
    pub fn text(content: &str) -> Self {
        Self::new(
            FixedResponseConfig::default(),
            Bytes::copy_from_slice(content.as_bytes()),
        )
    }

    #[must_use]
    pub fn config(&self) -> &FixedResponseConfig {
        &self.config
    }

    fn headers(&self) -> Result<HeaderMap, HttpError> {
        let config = &self.config;
        let mut headers = HeaderMap::new();

        if let Some(media_type) = &config.content_type {
            let value = match &config.charset {
                Some(charset) => format!("{media_type}; charset={charset}"),
                None => media_type.clone(),
            };
            headers.insert(CONTENT_TYPE, HeaderValue::try_from(value)?);
        }
        if !config.chunked {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(self.body.len()));
        }
        for (name, value) in &config.headers {
            headers.append(name.clone(), value.clone());
        }
        Ok(headers)
    }
}

impl ResponseGenerator for FixedResponseGenerator {
    fn respond_to(&self, request: &Request<Bytes>) -> Result<HttpClientResponse, HttpError> {
        tracing::debug!(method = %request.method(), uri = %request.uri(), "serving fixed response");

        let mut head = ResponseHead::new(self.config.status, self.headers()?);
        head.status_text.clone_from(&self.config.status_text);
        if let Some(redirected) = self.config.redirected {
            head.redirected = redirected;
        }
        head.uri = Some(
            self.config
                .uri
                .clone()
                .unwrap_or_else(|| request.uri().clone()),
        );

        let body: BodyReader = Box::new(io::Cursor::new(self.body.clone()));
        Ok(HttpClientResponse::new(head, Some(body)))
    }
}
