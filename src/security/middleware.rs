use std::pin::Pin;

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::warn;

use crate::{
    Response,
    context::Context,
    middleware::{Middleware, Next},
};

/// Credentials carried by an `Authorization: Basic` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns `true` if both parts match exactly.
    pub fn authenticated(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

/// The parsed `Authorization` request header, stored in the request
/// [`Extensions`](crate::context::Extensions) by [`AuthorizationMiddleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Basic(Credentials),
    /// Any other scheme; the parameters are not interpreted.
    Other { scheme: String },
}

impl Authorization {
    /// Parses a header value such as `Basic YWxpY2U6c2VjcmV0`.
    ///
    /// Returns `None` for an empty value or a Basic payload that is not valid base64,
    /// not UTF-8, or lacks the `:` separator.
    ///
    /// # Examples
    ///
    /// ```
    /// use routebin::security::{Authorization, Credentials};
    ///
    /// let auth = Authorization::parse("Basic YWxpY2U6c2VjcmV0").unwrap();
    /// assert_eq!(auth, Authorization::Basic(Credentials::new("alice", "secret")));
    /// ```
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (scheme, rest) = value.split_once(' ').unwrap_or((value, ""));
        if scheme.is_empty() {
            return None;
        }
        if !scheme.eq_ignore_ascii_case("basic") {
            return Some(Self::Other {
                scheme: scheme.to_ascii_lowercase(),
            });
        }

        let decoded = STANDARD.decode(rest.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::Basic(Credentials::new(username, password)))
    }

    /// The Basic credentials, if that is the scheme.
    pub fn basic(&self) -> Option<&Credentials> {
        match self {
            Self::Basic(credentials) => Some(credentials),
            Self::Other { .. } => None,
        }
    }
}

/// Parses the `Authorization` header once per request and stores the result as an
/// [`Authorization`] extension.
///
/// The middleware never rejects a request: a missing or unparseable header simply
/// leaves no extension behind, and the handler that cares decides what to answer.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use routebin::middleware::from_middleware;
/// use routebin::security::AuthorizationMiddleware;
///
/// let handler = from_middleware(Arc::new(AuthorizationMiddleware));
/// ```
pub struct AuthorizationMiddleware;

impl Middleware for AuthorizationMiddleware {
    fn handle(
        &self,
        mut ctx: Context,
        next: Next,
    ) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let parsed = ctx
                .request()
                .headers()
                .get("authorization")
                .map(|value| (value.to_owned(), Authorization::parse(value)));

            match parsed {
                Some((_, Some(authorization))) => ctx.extensions_mut().insert(authorization),
                Some((raw, None)) => {
                    warn!(header = %raw, "ignoring malformed Authorization header");
                }
                None => {}
            }

            next.run(ctx).await
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::middleware::{MiddlewareHandler, from_middleware};
    use crate::{Method, Request, StatusCode};

    #[test]
    fn parse_basic() {
        // "alice:secret"
        let auth = Authorization::parse("Basic YWxpY2U6c2VjcmV0").unwrap();
        let credentials = auth.basic().unwrap();
        assert_eq!(credentials.username(), "alice");
        assert!(credentials.authenticated("alice", "secret"));
        assert!(!credentials.authenticated("alice", "wrong"));
    }

    #[test]
    fn parse_password_with_colon() {
        // "bob:pa:ss"
        let auth = Authorization::parse("basic Ym9iOnBhOnNz").unwrap();
        assert!(auth.basic().unwrap().authenticated("bob", "pa:ss"));
    }

    #[test]
    fn parse_other_scheme() {
        let auth = Authorization::parse("Bearer abc.def").unwrap();
        assert_eq!(
            auth,
            Authorization::Other {
                scheme: "bearer".to_owned()
            }
        );
        assert!(auth.basic().is_none());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Authorization::parse("").is_none());
        assert!(Authorization::parse("Basic !!!").is_none());
        // "nocolon"
        assert!(Authorization::parse("Basic bm9jb2xvbg==").is_none());
    }

    fn capture() -> MiddlewareHandler {
        Arc::new(|ctx: Context, _next: Next| {
            let found = ctx
                .extensions()
                .get::<Authorization>()
                .and_then(Authorization::basic)
                .map(|c| c.username().to_owned())
                .unwrap_or_default();
            Box::pin(async move { Response::new(StatusCode::OK).body(found) })
        })
    }

    async fn run(request: Request) -> String {
        let chain: Vec<MiddlewareHandler> =
            vec![from_middleware(Arc::new(AuthorizationMiddleware)), capture()];
        let response = Next::new(Arc::from(chain)).run(Context::new(request)).await;
        let bytes = response.into_body().collect().await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn stores_parsed_credentials() {
        let request = Request::new(Method::Get, "/")
            .with_header("Authorization", "Basic YWxpY2U6c2VjcmV0");
        assert_eq!(run(request).await, "alice");
    }

    #[tokio::test]
    async fn missing_header_leaves_no_extension() {
        assert_eq!(run(Request::new(Method::Get, "/")).await, "");
    }
}
