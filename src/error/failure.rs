use thiserror::Error;

use crate::http::{Headers, Method, StatusCode};

/// A propagated non-success outcome: an HTTP status plus any headers the eventual
/// response must carry (a `WWW-Authenticate` challenge, an `Allow` list, ...).
///
/// It is not a response and has no body; [`ErrorTranslator`](super::ErrorTranslator)
/// renders one.
///
/// # Examples
///
/// ```
/// use routebin::error::StatusFailure;
/// use routebin::http::StatusCode;
///
/// let failure = StatusFailure::unauthorized("Fake Realm");
/// assert_eq!(failure.status(), StatusCode::UNAUTHORIZED);
/// assert_eq!(
///     failure.headers().get("www-authenticate"),
///     Some("Basic realm=\"Fake Realm\"")
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("request failed with status {status}")]
pub struct StatusFailure {
    status: StatusCode,
    headers: Headers,
}

impl StatusFailure {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
        }
    }

    /// `404`: no route, wrong segment count, or a malformed segment.
    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND)
    }

    /// `405` with an `Allow` header naming the one method the route accepts.
    pub fn method_not_allowed(allowed: &Method) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED).with_header("Allow", allowed.as_str())
    }

    /// `401` with a Basic challenge for `realm`.
    pub fn unauthorized(realm: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED)
            .with_header("WWW-Authenticate", format!("Basic realm=\"{realm}\""))
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Attaches a header to the eventual response.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn into_parts(self) -> (StatusCode, Headers) {
        (self.status, self.headers)
    }
}

impl From<StatusCode> for StatusFailure {
    fn from(status: StatusCode) -> Self {
        Self::new(status)
    }
}

impl From<serde_json::Error> for StatusFailure {
    fn from(error: serde_json::Error) -> Self {
        tracing::error!(%error, "failed to serialize response body");
        Self::internal()
    }
}
