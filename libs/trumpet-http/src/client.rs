use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::request::HttpClientRequestBuilder;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use hyper::body::Incoming;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tower::util::BoxCloneSyncService;

/// Type-erased tower stack every request goes through
pub(crate) type ClientService =
    BoxCloneSyncService<Request<Full<Bytes>>, Response<Incoming>, HttpError>;

/// HTTP client over a hyper connection pool and a tower middleware stack.
///
/// Every request is bound to a response handler when it is created; the
/// handler turns the response into the value returned by `perform`.
///
/// # Thread Safety
///
/// `HttpClient` is `Clone + Send + Sync` and cheap to clone. Clones share the
/// connection pool and the closed flag.
///
/// # Example
///
/// ```ignore
/// use trumpet_http::{ContentResponseHandler, HttpClient, JsonContentConverter};
///
/// let client = HttpClient::new()?;
/// let handler = ContentResponseHandler::new(JsonContentConverter::<Status>::new())
///     .with_max_body_length(64 * 1024);
///
/// let status: Status = client
///     .get("https://api.example.com/status", &handler)
///     .perform()
///     .await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: ClientService,
    pub(crate) max_body_size: usize,
    pub(crate) request_timeout: Duration,
    pub(crate) transport_security: TransportSecurity,
    pub(crate) closed: Arc<AtomicBool>,
}

impl HttpClient {
    /// Create a new HTTP client with default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, HttpError> {
        HttpClientBuilder::new().build()
    }

    /// Create a builder for configuring the HTTP client
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Start a request with an arbitrary method.
    ///
    /// The URL must be absolute (`https://host/path`, or `http://` when the
    /// transport allows it); it is validated when the request is performed.
    pub fn request<H>(
        &self,
        method: impl Into<http::Method>,
        url: &str,
        handler: H,
    ) -> HttpClientRequestBuilder<H> {
        HttpClientRequestBuilder::new(self.clone(), method.into(), url, handler)
    }

    /// Start a GET request
    pub fn get<H>(&self, url: &str, handler: H) -> HttpClientRequestBuilder<H> {
        self.request(http::Method::GET, url, handler)
    }

    /// Start a HEAD request; the handler sees a response without body
    pub fn head<H>(&self, url: &str, handler: H) -> HttpClientRequestBuilder<H> {
        self.request(http::Method::HEAD, url, handler)
    }

    /// Start a POST request
    pub fn post<H>(&self, url: &str, handler: H) -> HttpClientRequestBuilder<H> {
        self.request(http::Method::POST, url, handler)
    }

    /// Start a PUT request
    pub fn put<H>(&self, url: &str, handler: H) -> HttpClientRequestBuilder<H> {
        self.request(http::Method::PUT, url, handler)
    }

    /// Start a DELETE request
    pub fn delete<H>(&self, url: &str, handler: H) -> HttpClientRequestBuilder<H> {
        self.request(http::Method::DELETE, url, handler)
    }

    /// Start an OPTIONS request
    pub fn options<H>(&self, url: &str, handler: H) -> HttpClientRequestBuilder<H> {
        self.request(http::Method::OPTIONS, url, handler)
    }

    /// Close the client and all its clones.
    ///
    /// Requests performed afterwards fail with [`HttpError::ClientClosed`].
    /// Requests already in flight are not interrupted.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("http client closed");
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_body_size", &self.max_body_size)
            .field("request_timeout", &self.request_timeout)
            .field("transport_security", &self.transport_security)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::{HttpClientConfig, RedirectConfig};
    use crate::request::HttpClientMethod;
    use crate::response::{
        BytesContentConverter, ContentResponseHandler, HttpClientResponse,
        HttpClientResponseHandler, JsonContentConverter, StringContentConverter,
    };
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, GzEncoder};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::io::{Read, Write};

    fn test_client() -> HttpClient {
        HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .build()
            .unwrap()
    }

    fn text_handler() -> ContentResponseHandler<StringContentConverter> {
        ContentResponseHandler::new(StringContentConverter)
    }

    fn gzip_compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    /// Reports status, final URI and body instead of converting content.
    struct Summary;

    impl HttpClientResponseHandler for Summary {
        type Output = (u16, String, String);

        fn handle(&self, mut response: HttpClientResponse) -> Result<Self::Output, HttpError> {
            let uri = response.uri().map(ToString::to_string).unwrap_or_default();
            let mut body = String::new();
            if let Ok(mut stream) = response.take_body() {
                stream.read_to_string(&mut body)?;
            }
            Ok((response.status_code(), uri, body))
        }
    }

    #[tokio::test]
    async fn test_http_client_get() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/test");
            then.status(200)
                .header("content-type", "text/plain")
                .body("hello");
        });

        let text = test_client()
            .get(&server.url("/test"), text_handler())
            .perform()
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_http_client_post_json() {
        #[derive(serde::Deserialize)]
        struct Created {
            id: u32,
        }

        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(Method::POST)
                .path("/users")
                .header("content-type", "application/json")
                .json_body(json!({"name": "Alice"}));
            then.status(201).json_body(json!({"id": 7}));
        });

        let handler = ContentResponseHandler::new(JsonContentConverter::<Created>::new());
        let created = test_client()
            .post(&server.url("/users"), &handler)
            .json(&json!({"name": "Alice"}))
            .unwrap()
            .perform()
            .await
            .unwrap();
        assert_eq!(created.id, 7);
        m.assert();
    }

    #[tokio::test]
    async fn test_every_method_reaches_server() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.path("/any");
            then.status(204);
        });

        let client = test_client();
        let url = server.url("/any");
        for method in [
            HttpClientMethod::Get,
            HttpClientMethod::Post,
            HttpClientMethod::Put,
            HttpClientMethod::Delete,
            HttpClientMethod::Head,
            HttpClientMethod::Options,
        ] {
            let (status, _, body) = client.request(method, &url, Summary).perform().await.unwrap();
            assert_eq!(status, 204, "{method}");
            assert!(body.is_empty());
        }
        m.assert_calls(6);
    }

    #[tokio::test]
    async fn test_non_2xx_goes_to_handler() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/missing");
            then.status(404).body("nothing here");
        });

        let (status, _, body) = test_client()
            .get(&server.url("/missing"), Summary)
            .perform()
            .await
            .unwrap();
        assert_eq!(status, 404);
        assert_eq!(body, "nothing here");
    }

    #[tokio::test]
    async fn test_head_response_has_no_body() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::HEAD).path("/head");
            then.status(200);
        });

        let text = test_client()
            .head(&server.url("/head"), text_handler())
            .perform()
            .await
            .unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_gzip_response_is_decoded() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/gzip");
            then.status(200)
                .header("content-encoding", "gzip")
                .body(gzip_compress(b"hello world"));
        });

        let text = test_client()
            .get(&server.url("/gzip"), text_handler())
            .perform()
            .await
            .unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_deflate_response_is_decoded() {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"deflated over the wire").unwrap();
        let body = encoder.finish().unwrap();

        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/deflate");
            then.status(200)
                .header("content-encoding", "deflate")
                .body(body);
        });

        let text = test_client()
            .get(&server.url("/deflate"), text_handler())
            .perform()
            .await
            .unwrap();
        assert_eq!(text, "deflated over the wire");
    }

    #[tokio::test]
    async fn test_accept_encoding_and_user_agent_sent() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(Method::GET)
                .path("/headers")
                .header("accept-encoding", "gzip")
                .header("user-agent", "custom/1.0");
            then.status(200);
        });

        let client = HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .user_agent("custom/1.0")
            .build()
            .unwrap();
        client
            .get(&server.url("/headers"), text_handler())
            .perform()
            .await
            .unwrap();
        m.assert();
    }

    #[tokio::test]
    async fn test_handler_size_limit_uses_declared_length() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/large");
            then.status(200).body("x".repeat(4096));
        });

        let handler = ContentResponseHandler::new(BytesContentConverter).with_max_body_length(100);
        let err = test_client()
            .get(&server.url("/large"), &handler)
            .perform()
            .await
            .unwrap_err();
        match err {
            HttpError::SizeExceeded(size) => {
                assert_eq!(size.limit(), 100);
                assert_eq!(size.declared_length(), Some(4096));
            }
            other => panic!("expected SizeExceeded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_body_cap() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/huge");
            then.status(200).body("x".repeat(64 * 1024));
        });

        let client = HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .max_body_size(1024)
            .build()
            .unwrap();
        let err = client
            .get(&server.url("/huge"), text_handler())
            .perform()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::SizeExceeded(_)));
    }

    #[tokio::test]
    async fn test_redirect_is_signalled() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(Method::GET).path("/old");
            then.status(302).header("location", "/new").body("moved");
        });

        let handler = text_handler().with_allow_redirect(true);
        let err = test_client()
            .get(&server.url("/old"), &handler)
            .perform()
            .await
            .unwrap_err();
        match err {
            HttpError::Redirected(redirect) => {
                assert_eq!(redirect.status(), http::StatusCode::FOUND);
                assert_eq!(redirect.location(), Some("/new"));
            }
            other => panic!("expected Redirected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_redirect_followed_when_enabled() {
        let server = MockServer::start();
        let _old = server.mock(|when, then| {
            when.method(Method::GET).path("/old");
            then.status(302).header("location", server.url("/new"));
        });
        let _new = server.mock(|when, then| {
            when.method(Method::GET).path("/new");
            then.status(200).body("arrived");
        });

        let client = HttpClientBuilder::with_config(HttpClientConfig::for_testing())
            .redirect(RedirectConfig::same_origin(3))
            .build()
            .unwrap();
        let (status, uri, body) = client
            .get(&server.url("/old"), Summary)
            .perform()
            .await
            .unwrap();
        assert_eq!(status, 200);
        assert_eq!(uri, server.url("/new"));
        assert_eq!(body, "arrived");
    }

    #[tokio::test]
    async fn test_closed_client() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.path("/never");
            then.status(200);
        });

        let client = test_client();
        let clone = client.clone();
        assert!(!clone.is_closed());
        client.close();
        client.close();
        assert!(clone.is_closed());

        let err = clone
            .get(&server.url("/never"), text_handler())
            .perform()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::ClientClosed));
        m.assert_calls(0);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let err = test_client()
            .get("http://127.0.0.1:1/", text_handler())
            .perform()
            .await
            .unwrap_err();
        assert!(matches!(err, HttpError::Transport(_)), "{err}");
    }

    #[test]
    fn test_http_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<HttpClient>();
    }
}
