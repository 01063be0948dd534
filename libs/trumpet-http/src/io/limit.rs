use crate::error::SizeExceededError;
use std::io::{self, Read};

/// Reader wrapper that enforces a maximum body length.
///
/// Yields the inner bytes unchanged up to `limit`. The read that would
/// produce byte `limit + 1` fails with a [`SizeExceededError`] (wrapped in an
/// `io::Error`, see [`SizeExceededError::from_io`]), and every read after
/// that fails the same way. The guard is single-pass and never resets.
#[derive(Debug)]
pub struct SizeLimitingReader<R> {
    inner: R,
    limit: u64,
    remaining: u64,
    exceeded: bool,
}

impl<R> SizeLimitingReader<R> {
    #[must_use]
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            limit,
            remaining: limit,
            exceeded: false,
        }
    }

    /// Returns the number of bytes delivered so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Returns the configured size limit.
    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for SizeLimitingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.exceeded {
            return Err(SizeExceededError::observed(self.limit).into_io());
        }
        if buf.is_empty() {
            return Ok(0);
        }

        if self.remaining == 0 {
            // Budget spent: only a clean EOF is acceptable now.
            let mut probe = [0u8; 1];
            return match self.inner.read(&mut probe)? {
                0 => Ok(0),
                _ => {
                    self.exceeded = true;
                    tracing::debug!(limit = self.limit, "response body exceeded size limit");
                    Err(SizeExceededError::observed(self.limit).into_io())
                }
            };
        }

        let window = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
        let n = self.inner.read(&mut buf[..window])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}
