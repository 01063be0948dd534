//! Request entities.

use bytes::Bytes;
use std::fmt;
use std::io::{self, Write};

/// Character sets understood by [`StringEntity`] and the string converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Utf8,
    Iso8859_1,
    UsAscii,
}

impl Charset {
    /// Look up a charset by its IANA name or a common alias (case-insensitive).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        let is = |candidates: &[&str]| candidates.iter().any(|c| c.eq_ignore_ascii_case(label));
        if is(&["utf-8", "utf8"]) {
            Some(Charset::Utf8)
        } else if is(&["iso-8859-1", "iso8859-1", "iso_8859-1", "latin1", "l1"]) {
            Some(Charset::Iso8859_1)
        } else if is(&["us-ascii", "ascii"]) {
            Some(Charset::UsAscii)
        } else {
            None
        }
    }

    /// Canonical name, as used in `Content-Type` parameters.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "UTF-8",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::UsAscii => "US-ASCII",
        }
    }

    /// Encode `text`, replacing characters outside the charset with `?`.
    #[must_use]
    pub fn encode(self, text: &str) -> Vec<u8> {
        let max = match self {
            Charset::Utf8 => return text.as_bytes().to_vec(),
            Charset::Iso8859_1 => 0xFF,
            Charset::UsAscii => 0x7F,
        };
        text.chars()
            .map(|c| u8::try_from(u32::from(c)).ok().filter(|b| *b <= max).unwrap_or(b'?'))
            .collect()
    }

    /// Decode `bytes` into a string.
    ///
    /// # Errors
    ///
    /// `InvalidData` when the bytes are not valid in this charset.
    pub fn decode(self, bytes: Vec<u8>) -> io::Result<String> {
        match self {
            Charset::Utf8 => {
                String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            }
            Charset::Iso8859_1 => Ok(bytes.into_iter().map(char::from).collect()),
            Charset::UsAscii => {
                if let Some(pos) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("non-ASCII byte at offset {pos}"),
                    ));
                }
                Ok(bytes.into_iter().map(char::from).collect())
            }
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A repeatable text body, encoded once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntity {
    content: Bytes,
    charset: Charset,
}

impl StringEntity {
    /// Encode `text` as ISO-8859-1.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self::with_charset(text, None)
    }

    /// Encode `text` with `charset`, falling back to ISO-8859-1 when `None`.
    #[must_use]
    pub fn with_charset(text: &str, charset: Option<Charset>) -> Self {
        let charset = charset.unwrap_or(Charset::Iso8859_1);
        Self {
            content: Bytes::from(charset.encode(text)),
            charset,
        }
    }

    #[must_use]
    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// `text/plain; charset=<name>`
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("text/plain; charset={}", self.charset)
    }

    #[must_use]
    pub fn content_length(&self) -> u64 {
        self.content.len() as u64
    }

    /// A fresh reader over the encoded bytes; may be called any number of times.
    #[must_use]
    pub fn content(&self) -> io::Cursor<Bytes> {
        io::Cursor::new(self.content.clone())
    }

    /// Write the encoded bytes to `out` and flush it.
    ///
    /// # Errors
    ///
    /// Propagates write and flush failures of `out`.
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.content)?;
        out.flush()
    }

    #[must_use]
    pub fn is_repeatable(&self) -> bool {
        true
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        false
    }

    pub(crate) fn bytes(&self) -> Bytes {
        self.content.clone()
    }
}
