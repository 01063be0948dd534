#![allow(dead_code, clippy::expect_used)]

//! Loopback HTTP server that records what it receives and answers with a
//! configurable response.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What the server saw for the last request.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub method: Option<Method>,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Cookie pairs from every `Cookie` header, in order.
    pub fn cookies(&self) -> Vec<(String, String)> {
        self.header_values("cookie")
            .into_iter()
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.to_owned(), value.to_owned()))
            })
            .collect()
    }
}

#[derive(Debug)]
struct Canned {
    status: StatusCode,
    headers: HeaderMap,
    content: Vec<u8>,
}

/// Answers every request with the same configured response.
#[derive(Debug)]
pub struct GenericTestHandler {
    canned: Mutex<Canned>,
    last: Mutex<RecordedRequest>,
    count: Mutex<usize>,
}

impl Default for GenericTestHandler {
    fn default() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            canned: Mutex::new(Canned {
                status: StatusCode::OK,
                headers,
                content: Vec::new(),
            }),
            last: Mutex::new(RecordedRequest::default()),
            count: Mutex::new(0),
        }
    }
}

impl GenericTestHandler {
    pub fn set_status(&self, status: StatusCode) {
        self.canned.lock().status = status;
    }

    pub fn set_content(&self, content: impl Into<Vec<u8>>) {
        self.canned.lock().content = content.into();
    }

    pub fn set_content_type(&self, content_type: &'static str) {
        self.canned.lock().headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static(content_type),
        );
    }

    pub fn add_header(&self, name: &'static str, value: &'static str) {
        self.canned.lock().headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    pub fn last_request(&self) -> RecordedRequest {
        self.last.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        *self.count.lock()
    }

    fn record(&self, request: RecordedRequest) -> (StatusCode, HeaderMap, Vec<u8>) {
        *self.last.lock() = request;
        *self.count.lock() += 1;
        let canned = self.canned.lock();
        (canned.status, canned.headers.clone(), canned.content.clone())
    }
}

async fn handle(
    State(handler): State<Arc<GenericTestHandler>>,
    method: Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, HeaderMap, Vec<u8>) {
    handler.record(RecordedRequest {
        method: Some(method),
        path: uri.path().to_owned(),
        headers,
        body,
    })
}

/// Axum server on an ephemeral loopback port.
pub struct LocalHttpService {
    addr: SocketAddr,
    handler: Arc<GenericTestHandler>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LocalHttpService {
    pub async fn start() -> Self {
        let handler = Arc::new(GenericTestHandler::default());
        let router = Router::new()
            .fallback(handle)
            .with_state(Arc::clone(&handler));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .expect("serve");
        });

        Self {
            addr,
            handler,
            cancel,
            task,
        }
    }

    pub fn handler(&self) -> &GenericTestHandler {
        &self.handler
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        _ = self.task.await;
    }
}
