//! Follow policy used when redirect following is switched on.

use crate::config::RedirectConfig;
use http::{Request, Uri, header};
use tower_http::follow_redirect::policy::{Action, Attempt, Policy};

/// Stripped from follow-up requests once a redirect leaves the original origin
const CREDENTIAL_HEADERS: [header::HeaderName; 3] = [
    header::AUTHORIZATION,
    header::COOKIE,
    header::PROXY_AUTHORIZATION,
];

/// Scheme, host and effective port of a URI.
#[derive(Debug, PartialEq, Eq)]
struct Origin<'a> {
    scheme: &'a str,
    host: &'a str,
    port: u16,
}

impl<'a> Origin<'a> {
    /// Missing schemes count as `https` so comparisons never loosen security.
    fn of(uri: &'a Uri) -> Self {
        let scheme = uri.scheme_str().unwrap_or("https");
        let port = uri.port_u16().unwrap_or(match scheme {
            "http" => 80,
            "https" => 443,
            _ => 0,
        });
        Self {
            scheme,
            host: uri.host().unwrap_or_default(),
            port,
        }
    }
}

/// [`Policy`] for `tower_http`'s `FollowRedirect` driven by a [`RedirectConfig`].
///
/// The service clones the policy per request, so hop counting and the
/// cross-origin flag never leak between requests.
#[derive(Debug, Clone)]
pub struct GuardedRedirectPolicy {
    config: RedirectConfig,
    hops: usize,
    left_origin: bool,
}

impl GuardedRedirectPolicy {
    #[must_use]
    pub fn new(config: RedirectConfig) -> Self {
        Self {
            config,
            hops: 0,
            left_origin: false,
        }
    }

    /// Decide whether to follow a redirect from `from` to `to`.
    fn decide(&mut self, from: &Uri, to: &Uri) -> Action {
        self.hops += 1;
        if self.hops > self.config.max_redirects {
            tracing::debug!(
                hops = self.hops,
                max = self.config.max_redirects,
                "not following redirect, limit reached"
            );
            return Action::Stop;
        }

        let source = Origin::of(from);
        let target = Origin::of(to);

        if source.scheme == "https" && target.scheme == "http" && !self.config.allow_https_downgrade
        {
            tracing::warn!(from = %from, to = %to, "blocked HTTPS to HTTP redirect");
            return Action::Stop;
        }

        let same_origin = source == target;
        let trusted_host = self.config.allowed_redirect_hosts.contains(target.host);
        if self.config.same_origin_only && !same_origin && !trusted_host {
            tracing::warn!(from = %from, to = %to, "blocked cross-origin redirect");
            return Action::Stop;
        }

        if !same_origin {
            self.left_origin = true;
        }
        Action::Follow
    }
}

impl<B: Clone, E> Policy<B, E> for GuardedRedirectPolicy {
    fn redirect(&mut self, attempt: &Attempt<'_>) -> Result<Action, E> {
        Ok(self.decide(attempt.previous(), attempt.location()))
    }

    fn on_request(&mut self, request: &mut Request<B>) {
        if !(self.left_origin && self.config.strip_sensitive_headers) {
            return;
        }
        for name in &CREDENTIAL_HEADERS {
            if request.headers_mut().remove(name).is_some() {
                tracing::debug!(header = %name, "dropped credential header after leaving origin");
            }
        }
    }

    fn clone_body(&self, body: &B) -> Option<B> {
        Some(body.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    fn follows(policy: &mut GuardedRedirectPolicy, from: &str, to: &str) -> bool {
        matches!(policy.decide(&uri(from), &uri(to)), Action::Follow)
    }

    #[test]
    fn test_origin_uses_default_ports() {
        let a = uri("https://example.com/a");
        let b = uri("https://example.com:443/b");
        let c = uri("https://example.com:8443/c");
        assert_eq!(Origin::of(&a), Origin::of(&b));
        assert_ne!(Origin::of(&a), Origin::of(&c));
    }

    #[test]
    fn test_disabled_config_never_follows() {
        let mut policy = GuardedRedirectPolicy::new(RedirectConfig::disabled());
        assert!(!follows(&mut policy, "https://h/a", "https://h/b"));
    }

    #[test]
    fn test_hop_limit() {
        let mut policy = GuardedRedirectPolicy::new(RedirectConfig::same_origin(2));
        assert!(follows(&mut policy, "https://h/1", "https://h/2"));
        assert!(follows(&mut policy, "https://h/2", "https://h/3"));
        assert!(!follows(&mut policy, "https://h/3", "https://h/4"));
    }

    #[test]
    fn test_cross_origin_blocked_unless_allowed() {
        let mut policy = GuardedRedirectPolicy::new(RedirectConfig::same_origin(5));
        assert!(!follows(&mut policy, "https://a.com/", "https://b.com/"));

        let mut policy = GuardedRedirectPolicy::new(RedirectConfig {
            allowed_redirect_hosts: HashSet::from(["b.com".to_owned()]),
            ..RedirectConfig::same_origin(5)
        });
        assert!(follows(&mut policy, "https://a.com/", "https://b.com/"));
        assert!(policy.left_origin);
    }

    #[test]
    fn test_downgrade_blocked() {
        let mut policy = GuardedRedirectPolicy::new(RedirectConfig::permissive());
        assert!(!follows(&mut policy, "https://a.com/", "http://a.com/"));
        assert!(follows(&mut policy, "http://a.com/", "https://a.com/"));
    }

    #[test]
    fn test_credentials_stripped_after_leaving_origin() {
        let mut policy = GuardedRedirectPolicy::new(RedirectConfig::permissive());
        assert!(follows(&mut policy, "https://a.com/", "https://b.com/"));

        let mut request = Request::builder()
            .uri("https://b.com/")
            .header("authorization", "Bearer secret")
            .header("cookie", "session=1")
            .header("x-keep", "yes")
            .body(())
            .unwrap();
        Policy::<(), ()>::on_request(&mut policy, &mut request);

        assert!(request.headers().get("authorization").is_none());
        assert!(request.headers().get("cookie").is_none());
        assert_eq!(request.headers()["x-keep"], "yes");
    }
}
