use http::Uri;
use std::fmt;

/// A cookie to send along with a request.
///
/// Attributes mirror what a server would have set: an unset domain or path
/// matches every request, `secure` restricts the cookie to HTTPS and a
/// `max_age` of zero marks it as expired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientCookie {
    name: String,
    value: String,
    domain: Option<String>,
    path: Option<String>,
    max_age: Option<u64>,
    secure: bool,
}

impl HttpClientCookie {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            max_age: None,
            secure: false,
        }
    }

    /// Restrict the cookie to `domain` and its subdomains. A leading dot is ignored.
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.domain = Some(domain.trim_start_matches('.').to_ascii_lowercase());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Lifetime in seconds; zero means the cookie is expired.
    #[must_use]
    pub fn with_max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn max_age(&self) -> Option<u64> {
        self.max_age
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.max_age == Some(0)
    }

    /// Whether this cookie should be sent with a request to `uri`.
    #[must_use]
    pub fn matches(&self, uri: &Uri) -> bool {
        if self.is_expired() {
            return false;
        }
        if self.secure && uri.scheme_str() != Some("https") {
            return false;
        }
        if let Some(domain) = &self.domain {
            let Some(host) = uri.host() else {
                return false;
            };
            if !domain_matches(&host.to_ascii_lowercase(), domain) {
                return false;
            }
        }
        match &self.path {
            Some(path) => path_matches(uri.path(), path),
            None => true,
        }
    }
}

impl fmt::Display for HttpClientCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    let request_path = if request_path.is_empty() {
        "/"
    } else {
        request_path
    };
    if request_path == cookie_path {
        return true;
    }
    request_path.strip_prefix(cookie_path).is_some_and(|rest| {
        cookie_path.ends_with('/') || rest.starts_with('/')
    })
}

/// Render the `Cookie` header value for `uri`, or `None` if no cookie applies.
pub(crate) fn cookie_header(cookies: &[HttpClientCookie], uri: &Uri) -> Option<String> {
    let pairs: Vec<String> = cookies
        .iter()
        .filter(|cookie| cookie.matches(uri))
        .map(ToString::to_string)
        .collect();
    (!pairs.is_empty()).then(|| pairs.join("; "))
}
