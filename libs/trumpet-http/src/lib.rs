#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! HTTP client facade with a decoding response-handler pipeline.
//!
//! Requests are built fluently from an [`HttpClient`] and are bound to a
//! response handler up front. The stock [`ContentResponseHandler`] runs every
//! response through the same steps before a [`ContentConverter`] sees it:
//!
//! 1. optionally signal redirect responses as [`HttpError::Redirected`]
//! 2. reject bodies whose declared or observed length is over the limit
//!    ([`HttpError::SizeExceeded`]); the limit counts encoded bytes
//! 3. undo `gzip`/`x-gzip` or raw `deflate` content encoding
//! 4. convert, routing I/O failures to [`ContentConverter::handle_error`]
//!
//! The transport is hyper with rustls (HTTPS only by default), a pooled
//! connection manager and a tower stack for timeouts and default headers.
//! Redirects are not followed unless configured via [`RedirectConfig`].
//!
//! # Example
//!
//! ```ignore
//! use trumpet_http::{ContentResponseHandler, HttpClient, StringContentConverter};
//!
//! let client = HttpClient::builder()
//!     .timeout(std::time::Duration::from_secs(10))
//!     .user_agent("my-app/1.0")
//!     .build()?;
//!
//! let handler = ContentResponseHandler::new(StringContentConverter)
//!     .with_max_body_length(1024 * 1024);
//!
//! let page = client
//!     .get("https://example.com/", &handler)
//!     .add_header("accept", "text/html")
//!     .perform()
//!     .await?;
//! ```

mod builder;
mod client;
mod config;
mod cookie;
mod entity;
mod error;
pub mod io;
mod layers;
mod request;
mod response;
pub mod testing;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{
    DEFAULT_ACCEPT_ENCODING, DEFAULT_USER_AGENT, HttpClientConfig, RedirectConfig, TlsRootConfig,
    TransportSecurity,
};
pub use cookie::HttpClientCookie;
pub use entity::{Charset, StringEntity};
pub use error::{HttpError, InvalidUriKind, RedirectedError, SizeExceededError};
pub use layers::{DefaultHeadersLayer, DefaultHeadersService, GuardedRedirectPolicy};
pub use request::{HttpClientMethod, HttpClientRequest, HttpClientRequestBuilder};
pub use response::{
    BytesContentConverter, ContentConverter, ContentResponseHandler, HttpClientResponse,
    HttpClientResponseHandler, JsonContentConverter, ResponseHead, StringContentConverter,
};
