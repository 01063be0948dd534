use super::BodyReader;
use flate2::read::{DeflateDecoder, MultiGzDecoder};
use std::io::Read;

/// Transfer encodings the response pipeline knows how to reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    /// `gzip` or `x-gzip`
    Gzip,
    /// `deflate`, read as raw (headerless) deflate data
    Deflate,
    /// Anything else, including a missing header
    Identity,
}

impl ContentEncoding {
    /// Select an encoding from a `Content-Encoding` header value.
    ///
    /// Surrounding whitespace is ignored and tokens compare case-insensitively.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Self {
        let token = value.map_or("", str::trim);
        if token.eq_ignore_ascii_case("gzip") || token.eq_ignore_ascii_case("x-gzip") {
            ContentEncoding::Gzip
        } else if token.eq_ignore_ascii_case("deflate") {
            ContentEncoding::Deflate
        } else {
            ContentEncoding::Identity
        }
    }
}

/// Wrap `inner` so that reads yield the decoded body.
///
/// Corrupt compressed data shows up as an `io::Error` from `read`.
pub fn decode_body<R>(encoding: ContentEncoding, inner: R) -> BodyReader
where
    R: Read + Send + Sync + 'static,
{
    match encoding {
        ContentEncoding::Gzip => {
            tracing::debug!("found gzip stream");
            Box::new(MultiGzDecoder::new(inner))
        }
        ContentEncoding::Deflate => {
            tracing::debug!("found deflate stream");
            Box::new(DeflateDecoder::new(inner))
        }
        ContentEncoding::Identity => Box::new(inner),
    }
}
