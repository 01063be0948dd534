use crate::client::HttpClient;
use crate::config::TransportSecurity;
use crate::cookie::{HttpClientCookie, cookie_header};
use crate::entity::StringEntity;
use crate::error::{HttpError, InvalidUriKind};
use crate::response::{
    HttpClientResponse, HttpClientResponseHandler, ResponseHead, expects_body, read_body_limited,
};
use crate::testing::ResponseGenerator;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, COOKIE, HOST, HeaderName};
use http::{HeaderMap, HeaderValue, Method, Request, Uri};
use http_body_util::Full;
use serde::Serialize;
use std::fmt;
use tower::ServiceExt;

/// Request methods the client has shortcuts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpClientMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl HttpClientMethod {
    #[must_use]
    pub fn as_method(self) -> Method {
        match self {
            HttpClientMethod::Get => Method::GET,
            HttpClientMethod::Post => Method::POST,
            HttpClientMethod::Put => Method::PUT,
            HttpClientMethod::Delete => Method::DELETE,
            HttpClientMethod::Head => Method::HEAD,
            HttpClientMethod::Options => Method::OPTIONS,
        }
    }
}

impl From<HttpClientMethod> for Method {
    fn from(method: HttpClientMethod) -> Self {
        method.as_method()
    }
}

impl fmt::Display for HttpClientMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_method().as_str())
    }
}

/// Body type for the request builder
#[derive(Clone, Debug)]
enum BodyKind {
    Empty,
    Bytes(Bytes),
    Json(Bytes),
    Form(Bytes),
    Text(StringEntity),
}

impl BodyKind {
    fn default_content_type(&self) -> Option<String> {
        match self {
            BodyKind::Json(_) => Some("application/json".to_owned()),
            BodyKind::Form(_) => Some("application/x-www-form-urlencoded".to_owned()),
            BodyKind::Text(entity) => Some(entity.content_type()),
            BodyKind::Empty | BodyKind::Bytes(_) => None,
        }
    }

    fn into_bytes(self) -> Bytes {
        match self {
            BodyKind::Empty => Bytes::new(),
            BodyKind::Bytes(b) | BodyKind::Json(b) | BodyKind::Form(b) => b,
            BodyKind::Text(entity) => entity.bytes(),
        }
    }
}

/// Everything collected by the builder, shared with the finished request.
#[derive(Debug)]
struct RequestParts {
    method: Method,
    url: String,
    headers: HeaderMap,
    cookies: Vec<HttpClientCookie>,
    virtual_host: Option<(String, u16)>,
    body: BodyKind,
    /// Error captured during building (deferred to perform time)
    error: Option<HttpError>,
}

impl RequestParts {
    /// Validate URL and scheme against transport security configuration.
    fn validate_url(&self, transport: TransportSecurity) -> Result<Uri, HttpError> {
        let uri: Uri = self
            .url
            .parse()
            .map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::ParseError,
                reason: e.to_string(),
            })?;

        if uri.authority().is_none() {
            return Err(HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::MissingAuthority,
                reason: "missing host/authority".to_owned(),
            });
        }

        match (uri.scheme_str(), transport) {
            (Some("https"), _) | (Some("http"), TransportSecurity::AllowInsecureHttp) => Ok(uri),
            (Some("http"), TransportSecurity::TlsOnly) => Err(HttpError::InvalidScheme {
                scheme: "http".to_owned(),
                reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
            }),
            (Some(scheme), _) => Err(HttpError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            }),
            (None, _) => Err(HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::MissingScheme,
                reason: "missing scheme".to_owned(),
            }),
        }
    }

    /// Produce the wire request: headers, cookies, virtual host and body.
    fn into_http_request(mut self, client: &HttpClient) -> Result<Request<Bytes>, HttpError> {
        if client.is_closed() {
            return Err(HttpError::ClientClosed);
        }
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        let uri = self.validate_url(client.transport_security)?;
        let mut headers = self.headers;

        if !headers.contains_key(CONTENT_TYPE)
            && let Some(content_type) = self.body.default_content_type()
        {
            headers.insert(CONTENT_TYPE, HeaderValue::try_from(content_type)?);
        }

        if let Some(cookies) = cookie_header(&self.cookies, &uri) {
            let value = match headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{existing}; {cookies}"),
                None => cookies,
            };
            headers.insert(COOKIE, HeaderValue::try_from(value)?);
        }

        if let Some((host, port)) = &self.virtual_host {
            headers.insert(HOST, HeaderValue::try_from(format!("{host}:{port}"))?);
        }

        let mut request = Request::builder()
            .method(self.method)
            .uri(uri)
            .body(self.body.into_bytes())?;
        *request.headers_mut() = headers;
        Ok(request)
    }
}

/// Fluent builder for one request, bound to the handler that will consume its response.
///
/// Created by [`HttpClient::get`], [`HttpClient::post`], etc. Invalid header
/// names or values do not fail immediately; the first such error is returned
/// when the request is performed.
///
/// # Example
///
/// ```ignore
/// use trumpet_http::{ContentResponseHandler, HttpClient, HttpClientCookie, StringContentConverter};
///
/// let client = HttpClient::new()?;
/// let handler = ContentResponseHandler::new(StringContentConverter);
///
/// let body = client
///     .get("https://api.example.com/motd", &handler)
///     .add_header("x-request-id", "123")
///     .add_cookie(HttpClientCookie::new("session", "abc"))
///     .request()
///     .perform()
///     .await?;
/// ```
#[must_use = "HttpClientRequestBuilder does nothing until the request is performed"]
pub struct HttpClientRequestBuilder<H> {
    client: HttpClient,
    parts: RequestParts,
    handler: H,
}

impl<H> HttpClientRequestBuilder<H> {
    pub(crate) fn new(client: HttpClient, method: Method, url: &str, handler: H) -> Self {
        Self {
            client,
            parts: RequestParts {
                method,
                url: url.to_owned(),
                headers: HeaderMap::new(),
                cookies: Vec::new(),
                virtual_host: None,
                body: BodyKind::Empty,
                error: None,
            },
            handler,
        }
    }

    fn parse_header(&mut self, name: &str, value: &str) -> Option<(HeaderName, HeaderValue)> {
        if self.parts.error.is_some() {
            return None;
        }
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (Err(e), _) => {
                self.parts.error = Some(HttpError::InvalidHeaderName(e));
                None
            }
            (_, Err(e)) => {
                self.parts.error = Some(HttpError::InvalidHeaderValue(e));
                None
            }
        }
    }

    /// Add a header value. Repeated names are sent as repeated header lines.
    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        if let Some((name, value)) = self.parse_header(name, value) {
            self.parts.headers.append(name, value);
        }
        self
    }

    /// Set a header, replacing any values added before.
    pub fn set_header(mut self, name: &str, value: &str) -> Self {
        if let Some((name, value)) = self.parse_header(name, value) {
            self.parts.headers.insert(name, value);
        }
        self
    }

    /// Remove all values of a header. Unknown or invalid names are ignored.
    pub fn remove_header(mut self, name: &str) -> Self {
        self.parts.headers.remove(name);
        self
    }

    /// Send `cookie` when it matches the request URL.
    pub fn add_cookie(mut self, cookie: HttpClientCookie) -> Self {
        self.parts.cookies.push(cookie);
        self
    }

    /// Address the request to a different virtual host than the URL's authority.
    pub fn set_virtual_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.parts.virtual_host = Some((host.into(), port));
        self
    }

    /// Use `entity` as the body; `Content-Type` defaults to the entity's.
    pub fn set_content(mut self, entity: StringEntity) -> Self {
        self.parts.body = BodyKind::Text(entity);
        self
    }

    /// Set request body as raw bytes
    pub fn body_bytes(mut self, body: Bytes) -> Self {
        self.parts.body = BodyKind::Bytes(body);
        self
    }

    /// Set request body as JSON
    ///
    /// `Content-Type` becomes `application/json` unless one was set.
    ///
    /// # Errors
    ///
    /// Returns a deferred header error, or `HttpError::Json` if serialization fails.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, HttpError> {
        if let Some(e) = self.parts.error.take() {
            return Err(e);
        }
        self.parts.body = BodyKind::Json(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Set request body as form URL-encoded
    ///
    /// # Errors
    ///
    /// Returns a deferred header error, or `HttpError::FormEncode` if encoding fails.
    pub fn form(mut self, fields: &[(&str, &str)]) -> Result<Self, HttpError> {
        if let Some(e) = self.parts.error.take() {
            return Err(e);
        }
        self.parts.body = BodyKind::Form(Bytes::from(serde_urlencoded::to_string(fields)?));
        Ok(self)
    }

    /// Finish building.
    pub fn request(self) -> HttpClientRequest<H> {
        HttpClientRequest {
            client: self.client,
            parts: self.parts,
            handler: self.handler,
        }
    }
}

impl<H: HttpClientResponseHandler> HttpClientRequestBuilder<H> {
    /// Shorthand for `.request().perform()`.
    ///
    /// # Errors
    ///
    /// See [`HttpClientRequest::perform`].
    pub async fn perform(self) -> Result<H::Output, HttpError> {
        self.request().perform().await
    }
}

/// A finished request, ready to be performed once.
#[must_use = "HttpClientRequest does nothing until it is performed"]
pub struct HttpClientRequest<H> {
    client: HttpClient,
    parts: RequestParts,
    handler: H,
}

impl<H> HttpClientRequest<H> {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.parts.url
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    #[must_use]
    pub fn cookies(&self) -> &[HttpClientCookie] {
        &self.parts.cookies
    }

    #[must_use]
    pub fn virtual_host(&self) -> Option<(&str, u16)> {
        self.parts
            .virtual_host
            .as_ref()
            .map(|(host, port)| (host.as_str(), *port))
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H: HttpClientResponseHandler> HttpClientRequest<H> {
    /// Send the request and run the handler on the response.
    ///
    /// Every HTTP status is handed to the handler; only the handler decides
    /// whether a status is an error.
    ///
    /// # Errors
    ///
    /// - `ClientClosed` if the client was closed
    /// - deferred build errors (invalid headers, URL, scheme)
    /// - `Transport`, `Tls` or `Timeout` from the transport
    /// - `SizeExceeded` when the raw body is larger than the client's `max_body_size`
    /// - whatever the handler returns
    pub async fn perform(self) -> Result<H::Output, HttpError> {
        let HttpClientRequest {
            client,
            parts,
            handler,
        } = self;

        let request = parts.into_http_request(&client)?;
        let method = request.method().clone();
        let uri = request.uri().clone();
        tracing::debug!(%method, %uri, "performing request");

        let response = client
            .service
            .clone()
            .oneshot(request.map(Full::new))
            .await?;
        let (parts, body) = response.into_parts();
        let head = ResponseHead::from_transport(parts, uri.clone());
        tracing::debug!(status = head.status.as_u16(), %uri, "received response");

        let can_have_body = expects_body(&method, head.status);
        let body = if can_have_body && handler.wants_body(&head) {
            let timeout = client.request_timeout;
            let limit = collection_limit(handler.body_limit(), client.max_body_size);
            let collected = tokio::time::timeout(timeout, read_body_limited(body, limit))
                .await
                .map_err(|_| HttpError::Timeout(timeout))??;
            Some(collected)
        } else {
            if can_have_body {
                tracing::debug!(%uri, "handler does not need the body, skipping download");
            }
            None
        };

        handler.handle(HttpClientResponse::from_collected(head, body))
    }

    /// Run the request path against `generator` instead of the network.
    ///
    /// Headers, cookies, virtual host and body are prepared exactly as for
    /// [`perform`](Self::perform); the generator's response then goes through
    /// the handler.
    ///
    /// # Errors
    ///
    /// Build errors, the generator's error or the handler's error.
    pub fn respond_with<G>(self, generator: &G) -> Result<H::Output, HttpError>
    where
        G: ResponseGenerator + ?Sized,
    {
        let request = self.parts.into_http_request(&self.client)?;
        let response = generator.respond_to(&request)?;
        self.handler.handle(response)
    }
}

/// Raw bytes to collect: the handler's bound when it is tighter than the client cap.
fn collection_limit(handler_limit: Option<u64>, client_max: usize) -> usize {
    handler_limit
        .and_then(|limit| usize::try_from(limit).ok())
        .map_or(client_max, |limit| limit.min(client_max))
}
