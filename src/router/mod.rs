//! Request routing: resolve a path to exactly one handler by backward trimming.
//!
//! Routes are registered under their *fixed key*: the literal segments in front of any
//! variable parameter. Resolving a path tries the whole segment sequence against the
//! [`RouteRegistry`] first, then drops one segment at a time from the right until a key
//! matches. Whatever was dropped becomes the handler's `bits`, in their original
//! left-to-right order.
//!
//! | Path                           | Key tried last           | Bits              |
//! |--------------------------------|--------------------------|-------------------|
//! | `/get`                         | `get`                    | *(none)*          |
//! | `/redirect/3`                  | `redirect`               | `3`               |
//! | `/cookies/set/name/value`      | `cookies/set`            | `name`, `value`   |
//! | `/nowhere/at/all`              | *(no match → 404)*       |                   |
//!
//! Because the longest candidate is tried first, the longest registered prefix always
//! wins. The router never checks how many bits a route expected; each handler decides
//! what arity it accepts.
//!
//! Two paths never reach the table: an empty path or `/` goes to the home handler, and
//! a path containing a run of slashes is answered with a `302` to its collapsed form.

use std::pin::Pin;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tracing::debug;

use crate::context::Context;
use crate::error::StatusFailure;
use crate::Response;

mod registry;
mod route;

pub use registry::{RegistryError, Route, RouteRegistry, RouteRegistryBuilder};
pub use route::RouteSpec;

/// What every handler returns: a response, or a failure for the
/// [`ErrorTranslator`](crate::error::ErrorTranslator) to render.
pub type HandlerResult = Result<Response, StatusFailure>;

/// Boxed future produced by a [`Handler`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Type-erased, heap-allocated async handler that processes a [`Context`].
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so they can be shared across
/// connection tasks without copying the underlying closure. In practice you never
/// construct this type directly; use [`RouteRegistryBuilder::route`] and
/// [`Router::home`].
pub type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync + 'static>;

/// Outcome of resolving a path, before any handler runs.
pub enum Resolution<'a> {
    /// Empty path or `/`.
    Home,
    /// The path held a run of slashes; redirect to the collapsed path.
    Redirect(String),
    /// A registered key matched.
    Matched { route: &'a Route, bits: Vec<String> },
    /// No prefix of the path is a registered key.
    NotFound,
}

/// The dispatcher: resolves request paths against a frozen [`RouteRegistry`],
/// enforces the matched route's method, and invokes its handler.
///
/// # Examples
///
/// ```rust,no_run
/// use routebin::router::{RouteRegistry, RouteSpec, Router};
/// use routebin::{Context, Response, StatusCode};
///
/// # async fn example(ctx: Context) {
/// let registry = RouteRegistry::builder()
///     .route(RouteSpec::get("ping"), |_ctx| async { Ok(Response::new(StatusCode::OK)) })
///     .build()
///     .unwrap();
/// let router = Router::new(registry);
///
/// let response = router.dispatch(ctx).await;
/// # }
/// ```
pub struct Router {
    registry: RouteRegistry,
    home: Option<Handler>,
}

impl Router {
    pub fn new(registry: RouteRegistry) -> Self {
        Self {
            registry,
            home: None,
        }
    }

    /// Sets the handler for the empty path and `/`.
    #[must_use]
    pub fn home<H, F>(mut self, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        self.home = Some(Arc::new(move |ctx: Context| -> HandlerFuture {
            Box::pin(handler(ctx))
        }));
        self
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// Resolves `path` without running anything.
    pub fn resolve<'a>(&'a self, path: &str) -> Resolution<'a> {
        if path.is_empty() || path == "/" {
            return Resolution::Home;
        }
        if path.contains("//") {
            return Resolution::Redirect(collapse_slashes(path));
        }

        let path = path.strip_prefix('/').unwrap_or(path);
        let path = path.strip_suffix('/').unwrap_or(path);
        let segments: Vec<String> = path
            .split('/')
            .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
            .collect();

        for split in (1..=segments.len()).rev() {
            if let Some(route) = self.registry.lookup(&segments[..split]) {
                return Resolution::Matched {
                    route,
                    bits: segments[split..].to_vec(),
                };
            }
        }

        Resolution::NotFound
    }

    /// Dispatches one request.
    ///
    /// # Errors
    ///
    /// - `404` when no prefix of the path is a registered key (or no home handler is
    ///   set for `/`).
    /// - `405` when the key matched but the request method differs from the route's.
    /// - Whatever failure the handler itself returns.
    pub async fn dispatch(&self, mut ctx: Context) -> HandlerResult {
        let path = ctx.request().path().to_owned();

        match self.resolve(&path) {
            Resolution::Home => match &self.home {
                Some(home) => home(ctx).await,
                None => Err(StatusFailure::not_found()),
            },
            Resolution::Redirect(location) => {
                debug!(%path, %location, "collapsing repeated slashes");
                Ok(Response::redirect(location))
            }
            Resolution::NotFound => {
                debug!(%path, "no route matched");
                Err(StatusFailure::not_found())
            }
            Resolution::Matched { route, bits } => {
                let spec = route.spec();
                if spec.method() != ctx.request().method() {
                    debug!(%path, expected = %spec.method(), got = %ctx.request().method(), "method mismatch");
                    return Err(StatusFailure::method_not_allowed(spec.method()));
                }
                debug!(%path, route = %spec.url(), bits = ?bits, "route matched");
                ctx.set_bits(bits, spec.param_names());
                (route.handler())(ctx).await
            }
        }
    }
}

/// Replaces every run of `/` with a single `/`.
fn collapse_slashes(path: &str) -> String {
    let mut collapsed = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && collapsed.ends_with('/') {
            continue;
        }
        collapsed.push(c);
    }
    collapsed
}
