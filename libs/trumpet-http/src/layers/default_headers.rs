use crate::error::HttpError;
use http::header::{ACCEPT_ENCODING, HeaderName, USER_AGENT};
use http::{HeaderValue, Request, Response};
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Tower layer that fills in client-wide headers the request did not set itself.
///
/// Used for `User-Agent` and `Accept-Encoding`.
#[derive(Clone, Debug, Default)]
pub struct DefaultHeadersLayer {
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl DefaultHeadersLayer {
    /// Build the layer from the configured user agent and accept-encoding.
    ///
    /// # Errors
    /// Returns `HttpError::InvalidHeaderValue` if either value is not a valid header value
    pub fn try_new(user_agent: &str, accept_encoding: Option<&str>) -> Result<Self, HttpError> {
        let mut headers = vec![(USER_AGENT, HeaderValue::from_str(user_agent)?)];
        if let Some(encoding) = accept_encoding {
            headers.push((ACCEPT_ENCODING, HeaderValue::from_str(encoding)?));
        }
        Ok(Self {
            headers: Arc::new(headers),
        })
    }
}

impl<S> Layer<S> for DefaultHeadersLayer {
    type Service = DefaultHeadersService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DefaultHeadersService {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

/// Service produced by [`DefaultHeadersLayer`].
#[derive(Clone, Debug)]
pub struct DefaultHeadersService<S> {
    inner: S,
    headers: Arc<Vec<(HeaderName, HeaderValue)>>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for DefaultHeadersService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        for (name, value) in self.headers.iter() {
            if !req.headers().contains_key(name) {
                req.headers_mut().insert(name.clone(), value.clone());
            }
        }
        self.inner.call(req)
    }
}
