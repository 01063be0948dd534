use super::{ContentConverter, HttpClientResponse, HttpClientResponseHandler, ResponseHead};
use crate::error::{HttpError, RedirectedError, SizeExceededError};
use crate::io::{BodyReader, ContentEncoding, SizeLimitingReader, decode_body};

/// Generic response handler: redirect signalling, size limiting and
/// transfer decoding in front of a [`ContentConverter`].
///
/// The configuration is fixed at construction and no state is kept between
/// calls, so one handler can serve any number of responses concurrently.
///
/// # Example
///
/// ```ignore
/// use trumpet_http::{ContentResponseHandler, HttpClient, StringContentConverter};
///
/// let handler = ContentResponseHandler::new(StringContentConverter).with_max_body_length(64 * 1024);
/// let text = client.get("https://example.com/motd", &handler).perform().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ContentResponseHandler<C> {
    converter: C,
    max_body_length: Option<u64>,
    allow_redirect: bool,
}

impl<C> ContentResponseHandler<C> {
    /// Unlimited body length, redirects are not signalled.
    #[must_use]
    pub fn new(converter: C) -> Self {
        Self {
            converter,
            max_body_length: None,
            allow_redirect: false,
        }
    }

    /// Alias of [`new`](Self::new).
    #[must_use]
    pub fn for_converter(converter: C) -> Self {
        Self::new(converter)
    }

    /// Limit the (still encoded) body to `max` bytes. Zero means unlimited.
    #[must_use]
    pub fn with_max_body_length(mut self, max: u64) -> Self {
        self.max_body_length = (max > 0).then_some(max);
        self
    }

    /// Return [`HttpError::Redirected`] for redirect responses instead of reading them.
    #[must_use]
    pub fn with_allow_redirect(mut self, allow_redirect: bool) -> Self {
        self.allow_redirect = allow_redirect;
        self
    }

    #[must_use]
    pub fn converter(&self) -> &C {
        &self.converter
    }

    #[must_use]
    pub fn max_body_length(&self) -> Option<u64> {
        self.max_body_length
    }

    #[must_use]
    pub fn allow_redirect(&self) -> bool {
        self.allow_redirect
    }

    /// Put the size guard and the decoder around `body`.
    fn wrap_body(
        &self,
        response: &HttpClientResponse,
        body: BodyReader,
    ) -> Result<BodyReader, SizeExceededError> {
        let body: BodyReader = match self.max_body_length {
            Some(max) => {
                if let Some(length) = response.content_length()
                    && length > max
                {
                    return Err(SizeExceededError::declared(max, length));
                }
                tracing::debug!(limit = max, "limiting response body length");
                Box::new(SizeLimitingReader::new(body, max))
            }
            None => body,
        };

        let encoding =
            ContentEncoding::from_header(response.header(http::header::CONTENT_ENCODING.as_str()));
        Ok(decode_body(encoding, body))
    }
}

impl<C: ContentConverter> HttpClientResponseHandler for ContentResponseHandler<C> {
    type Output = C::Output;

    /// Run the pipeline for one response.
    ///
    /// # Errors
    ///
    /// - [`HttpError::Redirected`] when redirects are signalled and the response is one
    /// - [`HttpError::SizeExceeded`] when the declared or observed body length is over the limit
    /// - whatever [`ContentConverter::handle_error`] returns for I/O failures during conversion
    /// - any other converter error, unchanged
    fn handle(&self, mut response: HttpClientResponse) -> Result<C::Output, HttpError> {
        if self.allow_redirect && response.is_redirected() {
            tracing::debug!(
                status = response.status_code(),
                "redirecting based on response status"
            );
            return Err(RedirectedError::new(response).into());
        }

        let body: BodyReader = match response.take_body() {
            Ok(body) => body,
            Err(e) => {
                // Normal for 401/403/404 style responses and HEAD requests.
                tracing::debug!(error = %e, "could not locate response body stream");
                Box::new(std::io::empty())
            }
        };

        let mut body = self.wrap_body(&response, body)?;

        match self.converter.convert(&response, &mut body) {
            Ok(value) => Ok(value),
            Err(HttpError::Io(e)) => match SizeExceededError::from_io(e) {
                Ok(size) => Err(size.into()),
                Err(e) => self.converter.handle_error(&response, e),
            },
            Err(other) => Err(other),
        }
    }

    /// No body is needed for a signalled redirect or a declared length over the limit.
    fn wants_body(&self, head: &ResponseHead) -> bool {
        if self.allow_redirect && head.redirected {
            return false;
        }
        !matches!(
            (self.max_body_length, head.content_length()),
            (Some(max), Some(length)) if length > max
        )
    }

    fn body_limit(&self) -> Option<u64> {
        self.max_body_length
    }
}
