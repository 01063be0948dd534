//! Stream decorators used by the response pipeline.
//!
//! - [`SizeLimitingReader`] - fails once more than a fixed number of bytes is read
//! - [`ContentEncoding`] / [`decode_body`] - reverses a `Content-Encoding`

mod decoding;
mod limit;

pub use decoding::{ContentEncoding, decode_body};
pub use limit::SizeLimitingReader;

/// Boxed body stream handed between pipeline stages.
pub type BodyReader = Box<dyn std::io::Read + Send + Sync>;
