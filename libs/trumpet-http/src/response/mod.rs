//! Response model and the handler pipeline that turns responses into values.

mod converter;
mod handler;

pub use converter::{
    BytesContentConverter, ContentConverter, JsonContentConverter, StringContentConverter,
};
pub use handler::ContentResponseHandler;

use crate::error::{HttpError, SizeExceededError};
use crate::io::BodyReader;
use bytes::Bytes;
use http::{HeaderMap, StatusCode, Uri};
use http_body_util::BodyExt;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Turns one [`HttpClientResponse`] into a value.
///
/// Implemented by [`ContentResponseHandler`]; custom implementations can
/// bypass the decoding pipeline entirely.
pub trait HttpClientResponseHandler {
    type Output;

    /// Process a response.
    ///
    /// # Errors
    ///
    /// Whatever the handler decides; see [`ContentResponseHandler::handle`]
    /// for the pipeline's taxonomy.
    fn handle(&self, response: HttpClientResponse) -> Result<Self::Output, HttpError>;

    /// Whether `handle` will read the body of a response with this head.
    ///
    /// Returning `false` lets the transport skip downloading the body; the
    /// handler then sees a response without one.
    fn wants_body(&self, _head: &ResponseHead) -> bool {
        true
    }

    /// Most raw body bytes `handle` accepts before failing, if bounded.
    fn body_limit(&self) -> Option<u64> {
        None
    }
}

impl<H: HttpClientResponseHandler + ?Sized> HttpClientResponseHandler for &H {
    type Output = H::Output;

    fn handle(&self, response: HttpClientResponse) -> Result<Self::Output, HttpError> {
        (**self).handle(response)
    }

    fn wants_body(&self, head: &ResponseHead) -> bool {
        (**self).wants_body(head)
    }

    fn body_limit(&self) -> Option<u64> {
        (**self).body_limit()
    }
}

impl<H: HttpClientResponseHandler + ?Sized> HttpClientResponseHandler for Arc<H> {
    type Output = H::Output;

    fn handle(&self, response: HttpClientResponse) -> Result<Self::Output, HttpError> {
        (**self).handle(response)
    }

    fn wants_body(&self, head: &ResponseHead) -> bool {
        (**self).wants_body(head)
    }

    fn body_limit(&self) -> Option<u64> {
        (**self).body_limit()
    }
}

/// Status line, headers and origin of a response, without its body.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    /// Reason phrase as sent by the server (canonical phrase when unknown)
    pub status_text: String,
    /// Final request URI, after any followed redirects
    pub uri: Option<Uri>,
    pub headers: HeaderMap,
    /// Whether the server asked the client to go elsewhere
    pub redirected: bool,
}

impl ResponseHead {
    /// Build a head with the canonical reason phrase.
    ///
    /// A response counts as redirected when it has a 3xx status and a
    /// `Location` header (so `304 Not Modified` does not).
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        let redirected = status.is_redirection() && headers.contains_key(http::header::LOCATION);
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            uri: None,
            headers,
            redirected,
        }
    }

    /// Declared `Content-Length`, if present and well-formed
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get(http::header::CONTENT_LENGTH)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }

    /// Head of a transport response, with the server's reason phrase and the
    /// final URI after any followed redirects.
    pub(crate) fn from_transport(parts: http::response::Parts, request_uri: Uri) -> Self {
        let mut head = Self::new(parts.status, parts.headers);
        if let Some(reason) = parts.extensions.get::<hyper::ext::ReasonPhrase>() {
            head.status_text = String::from_utf8_lossy(reason.as_bytes()).into_owned();
        }
        head.uri = Some(
            parts
                .extensions
                .get::<tower_http::follow_redirect::RequestUri>()
                .map_or(request_uri, |final_uri| final_uri.0.clone()),
        );
        head
    }
}

/// An HTTP response as seen by response handlers.
///
/// Everything except the body is immutable. The body stream can be taken
/// exactly once via [`take_body`](Self::take_body).
pub struct HttpClientResponse {
    head: ResponseHead,
    body: Option<BodyReader>,
}

impl HttpClientResponse {
    /// Assemble a response from its head and an optional body stream.
    ///
    /// `None` models a response without a readable body (HEAD, 204, 304...).
    #[must_use]
    pub fn new(head: ResponseHead, body: Option<BodyReader>) -> Self {
        Self { head, body }
    }

    #[must_use]
    pub fn head(&self) -> &ResponseHead {
        &self.head
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.head.status
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.head.status.as_u16()
    }

    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.head.status_text
    }

    #[must_use]
    pub fn uri(&self) -> Option<&Uri> {
        self.head.uri.as_ref()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// First value of the named header (case-insensitive).
    ///
    /// Returns `None` for missing headers and for values that are not visible ASCII.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// All values of the named header, in the order they were received.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.head
            .headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Media type of the body, without parameters (`text/plain`).
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        let value = self.header(http::header::CONTENT_TYPE.as_str())?;
        let media_type = value.split(';').next().map(str::trim)?;
        (!media_type.is_empty()).then_some(media_type)
    }

    /// The `charset` parameter of `Content-Type`, if any.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        let value = self.header(http::header::CONTENT_TYPE.as_str())?;
        value.split(';').skip(1).find_map(|param| {
            let (key, val) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| val.trim().trim_matches('"'))
        })
    }

    /// Declared body length; `None` when absent or unparseable (chunked bodies).
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.head.content_length()
    }

    #[must_use]
    pub fn is_redirected(&self) -> bool {
        self.head.redirected
    }

    /// Take the body stream.
    ///
    /// # Errors
    ///
    /// Fails with `NotFound` when the response has no body or it was already taken.
    pub fn take_body(&mut self) -> io::Result<BodyReader> {
        self.body.take().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no response body available for status {}", self.head.status),
            )
        })
    }

    /// Attach a body that was already collected from the transport.
    pub(crate) fn from_collected(head: ResponseHead, body: Option<Bytes>) -> Self {
        let body = body.map(|bytes| Box::new(io::Cursor::new(bytes)) as BodyReader);
        Self::new(head, body)
    }
}

impl fmt::Debug for HttpClientResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClientResponse")
            .field("head", &self.head)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Whether a response to `method` with `status` can carry a body at all.
pub(crate) fn expects_body(method: &http::Method, status: StatusCode) -> bool {
    !(method == http::Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Collect the raw (still encoded) body, failing once more than `limit` bytes arrive.
pub(crate) async fn read_body_limited<B>(body: B, limit: usize) -> Result<Bytes, HttpError>
where
    B: hyper::body::Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let mut collected = Vec::new();
    let mut body = std::pin::pin!(body);

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(|e| HttpError::Transport(e.into()))?;
        if let Some(chunk) = frame.data_ref() {
            if collected.len() + chunk.len() > limit {
                return Err(SizeExceededError::observed(limit as u64).into());
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
