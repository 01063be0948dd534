//! Tower layers used by the client's service stack.
//!
//! - [`DefaultHeadersLayer`] - fills in `User-Agent` and `Accept-Encoding`
//! - [`GuardedRedirectPolicy`] - follow policy for `tower_http`'s `FollowRedirect`

mod default_headers;
mod redirect;

pub use default_headers::{DefaultHeadersLayer, DefaultHeadersService};
pub use redirect::GuardedRedirectPolicy;
