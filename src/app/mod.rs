//! The httpbin application: the handler set registered on a [`Router`], wrapped in the
//! middleware pipeline, with the [`ErrorTranslator`] as the single recovery point.

use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::compression::Gzip;
use crate::config::Config;
use crate::context::Context;
use crate::error::ErrorTranslator;
use crate::middleware::{LoggerMiddleware, Middleware, MiddlewareHandler, Next, from_middleware};
use crate::router::{RegistryError, RouteRegistry, RouteSpec, Router};
use crate::security::AuthorizationMiddleware;
use crate::template::render_page;
use crate::{Request, Response, StatusCode};

pub mod handlers;

/// A ready-to-serve httpbin.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use routebin::{Config, HttpBin, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let app = Arc::new(HttpBin::new(Config::default())?);
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server
///         .run(move |request| {
///             let app = Arc::clone(&app);
///             async move { app.handle(request).await }
///         })
///         .await?;
///     Ok(())
/// }
/// ```
pub struct HttpBin {
    router: Arc<Router>,
    pipeline: Arc<[MiddlewareHandler]>,
}

impl HttpBin {
    /// Registers the handler set and pre-renders the route index.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] if two routes share a key. With the built-in handler
    /// set this never happens.
    pub fn new(config: Config) -> Result<Self, RegistryError> {
        let registry = routes(&config)?;
        debug!(routes = registry.len(), "route registry built");

        let index = index_page(&config.title, &registry);
        let router = Arc::new(Router::new(registry).home(move |_ctx| {
            let page = index.clone();
            async move { Ok(Response::html(StatusCode::OK, page)) }
        }));

        let dispatch = DispatchMiddleware {
            router: Arc::clone(&router),
            translator: Arc::new(ErrorTranslator::new()),
        };
        let pipeline: Vec<MiddlewareHandler> = vec![
            from_middleware(Arc::new(LoggerMiddleware)),
            from_middleware(Arc::new(AuthorizationMiddleware)),
            from_middleware(Arc::new(dispatch)),
        ];

        Ok(Self {
            router,
            pipeline: Arc::from(pipeline),
        })
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs one request through the pipeline. Never fails: every [`StatusFailure`]
    /// has been rendered by the time this returns.
    ///
    /// [`StatusFailure`]: crate::error::StatusFailure
    pub async fn handle(&self, request: Request) -> Response {
        Next::new(Arc::clone(&self.pipeline))
            .run(Context::new(request))
            .await
    }
}

/// The handler set, in the order the index lists it.
fn routes(config: &Config) -> Result<RouteRegistry, RegistryError> {
    let encoder = Gzip::new(config.gzip_min_size);
    let realm: Arc<str> = Arc::from(config.realm.as_str());

    RouteRegistry::builder()
        .route(
            RouteSpec::get("get").with_title("Returns GET data"),
            handlers::echo,
        )
        .route(
            RouteSpec::post("post").with_title("Returns POST data"),
            handlers::echo,
        )
        .route(
            RouteSpec::put("put").with_title("Returns PUT data"),
            handlers::echo,
        )
        .route(
            RouteSpec::get("redirect")
                .with_title("302 Redirect n times")
                .with_param("n", 6),
            handlers::redirect,
        )
        .route(
            RouteSpec::get("gzip").with_title("Returns gzip encoded data"),
            move |ctx| handlers::gzip(ctx, encoder),
        )
        .route(
            RouteSpec::get("cookies").with_title("Returns cookie data"),
            handlers::cookies,
        )
        .route(
            RouteSpec::get("cookies/set")
                .with_title("Sets a simple cookie")
                .with_param("name", "package")
                .with_param("value", "routebin"),
            handlers::cookies_set,
        )
        .route(
            RouteSpec::get("status")
                .with_title("Returns given HTTP Status code")
                .with_param("status", 418),
            handlers::status,
        )
        .route(
            RouteSpec::get("response-headers").with_title("Returns response headers"),
            handlers::response_headers,
        )
        .route(
            RouteSpec::get("basic-auth")
                .with_title("Challenges HTTPBasic Auth")
                .with_param("username", "username")
                .with_param("password", "password"),
            move |ctx| handlers::basic_auth(ctx, Arc::clone(&realm)),
        )
        .build()
}

fn index_page(title: &str, registry: &RouteRegistry) -> Bytes {
    let items: Vec<String> = registry.listing().iter().map(|spec| spec.render()).collect();
    let list = format!("<ul>\n{}\n</ul>", items.join("\n"));
    Bytes::from(render_page(title, &list))
}

/// Terminal pipeline stage: dispatch, then translate any failure.
struct DispatchMiddleware {
    router: Arc<Router>,
    translator: Arc<ErrorTranslator>,
}

impl Middleware for DispatchMiddleware {
    fn handle(&self, ctx: Context, _next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let router = Arc::clone(&self.router);
        let translator = Arc::clone(&self.translator);
        Box::pin(async move {
            let method = ctx.request().method().clone();
            match router.dispatch(ctx).await {
                Ok(response) => response,
                Err(failure) => translator.translate(failure, &method),
            }
        })
    }
}
