//! The route table: fixed key → (spec, handler), frozen once built.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::{Handler, HandlerFuture, HandlerResult, RouteSpec};
use crate::context::Context;

/// Errors raised while building a [`RouteRegistry`]. Both are programming mistakes in
/// the route declarations, caught before any request is served.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("two routes share the key /{key}")]
    DuplicateKey { key: String },

    #[error("route \"{title}\" has no fixed segment and could never be reached")]
    EmptyKey { title: String },
}

/// A registered route: its descriptor and the handler it dispatches to.
pub struct Route {
    spec: RouteSpec,
    handler: Handler,
}

impl Route {
    pub fn spec(&self) -> &RouteSpec {
        &self.spec
    }

    pub(crate) fn handler(&self) -> &Handler {
        &self.handler
    }
}

/// Immutable mapping from a route's fixed key to the route.
///
/// Built once through [`RouteRegistry::builder`]; there is no way to add or remove
/// routes afterwards, so it can be shared across requests without locking.
///
/// # Examples
///
/// ```
/// use routebin::router::{RouteRegistry, RouteSpec};
/// use routebin::{Response, StatusCode};
///
/// let registry = RouteRegistry::builder()
///     .route(RouteSpec::get("ping"), |_ctx| async { Ok(Response::new(StatusCode::OK)) })
///     .build()
///     .unwrap();
/// assert_eq!(registry.len(), 1);
/// ```
pub struct RouteRegistry {
    routes: HashMap<Vec<String>, Route>,
}

impl RouteRegistry {
    pub fn builder() -> RouteRegistryBuilder {
        RouteRegistryBuilder::default()
    }

    /// Exact lookup of a full key.
    pub fn lookup(&self, key: &[String]) -> Option<&Route> {
        self.routes.get(key)
    }

    /// Every route spec, in declaration order.
    pub fn listing(&self) -> Vec<&RouteSpec> {
        let mut specs: Vec<_> = self.routes.values().map(Route::spec).collect();
        specs.sort_by_key(|spec| spec.order());
        specs
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Collects `(spec, handler)` pairs for a [`RouteRegistry`].
#[derive(Default)]
pub struct RouteRegistryBuilder {
    entries: Vec<(RouteSpec, Handler)>,
}

impl RouteRegistryBuilder {
    /// Adds a route. Conflicts are reported by [`build`](Self::build).
    #[must_use]
    pub fn route<H, F>(mut self, spec: RouteSpec, handler: H) -> Self
    where
        H: Fn(Context) -> F + Send + Sync + 'static,
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |ctx: Context| -> HandlerFuture {
            Box::pin(handler(ctx))
        });
        self.entries.push((spec, handler));
        self
    }

    /// Freezes the collected routes.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicateKey`]: two specs share the same fixed key.
    /// - [`RegistryError::EmptyKey`]: a spec has no fixed segment.
    pub fn build(self) -> Result<RouteRegistry, RegistryError> {
        let mut routes = HashMap::with_capacity(self.entries.len());

        for (spec, handler) in self.entries {
            if spec.key().is_empty() {
                return Err(RegistryError::EmptyKey {
                    title: spec.title().to_owned(),
                });
            }
            let key = spec.key().to_vec();
            if routes.contains_key(&key) {
                return Err(RegistryError::DuplicateKey { key: key.join("/") });
            }
            routes.insert(key, Route { spec, handler });
        }

        Ok(RouteRegistry { routes })
    }
}
