use super::HttpClientResponse;
use crate::entity::Charset;
use crate::error::HttpError;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::io::{self, Read};
use std::marker::PhantomData;

/// Converts a decoded response body into a typed value.
///
/// Used by [`ContentResponseHandler`](super::ContentResponseHandler), which
/// hands over a stream that is already size-limited and transfer-decoded.
pub trait ContentConverter {
    type Output;

    /// Convert the body of `response`.
    ///
    /// # Errors
    ///
    /// `HttpError::Io` marks a recoverable failure that is routed to
    /// [`handle_error`](Self::handle_error); any other error is final.
    fn convert(
        &self,
        response: &HttpClientResponse,
        body: &mut dyn Read,
    ) -> Result<Self::Output, HttpError>;

    /// Produce a fallback value for an I/O failure raised by `convert`.
    ///
    /// The default re-raises the failure.
    ///
    /// # Errors
    ///
    /// Returns the error that should become the outcome of the whole pipeline.
    fn handle_error(
        &self,
        _response: &HttpClientResponse,
        error: io::Error,
    ) -> Result<Self::Output, HttpError> {
        Err(HttpError::Io(error))
    }
}

/// Reads the body as text, honouring the response's `charset` hint.
///
/// Defaults to UTF-8; `ISO-8859-1` and `US-ASCII` are decoded byte-wise.
/// Invalid or unsupported encodings fail with `InvalidData` / `Unsupported`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringContentConverter;

impl ContentConverter for StringContentConverter {
    type Output = String;

    fn convert(
        &self,
        response: &HttpClientResponse,
        body: &mut dyn Read,
    ) -> Result<String, HttpError> {
        let charset = match response.charset() {
            None => Charset::Utf8,
            Some(label) => Charset::from_label(label).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::Unsupported,
                    format!("unsupported response charset '{label}'"),
                )
            })?,
        };

        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)?;
        Ok(charset.decode(bytes)?)
    }
}

/// Reads the decoded body into memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesContentConverter;

impl ContentConverter for BytesContentConverter {
    type Output = Bytes;

    fn convert(
        &self,
        _response: &HttpClientResponse,
        body: &mut dyn Read,
    ) -> Result<Bytes, HttpError> {
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes)?;
        Ok(Bytes::from(bytes))
    }
}

/// Deserializes a JSON body.
///
/// Parse failures are reported as `InvalidData` I/O errors, so they reach
/// [`ContentConverter::handle_error`] like any other read failure.
pub struct JsonContentConverter<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonContentConverter<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonContentConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for JsonContentConverter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonContentConverter")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: DeserializeOwned> ContentConverter for JsonContentConverter<T> {
    type Output = T;

    fn convert(&self, _response: &HttpClientResponse, body: &mut dyn Read) -> Result<T, HttpError> {
        serde_json::from_reader(body).map_err(|e| HttpError::Io(io::Error::from(e)))
    }
}
