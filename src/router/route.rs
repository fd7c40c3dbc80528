//! Route descriptors.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::Method;

// Process-wide declaration counter; values are handed out once and never reused.
static DECLARED: AtomicUsize = AtomicUsize::new(0);

/// An immutable description of one route: its fixed key, method, title and the
/// variable parameters it expects after the key.
///
/// A spec takes its `order` when it is *declared* (constructed), not when it is
/// registered, so the route index lists routes in the order the code declares them.
///
/// # Examples
///
/// ```
/// use routebin::router::RouteSpec;
///
/// let spec = RouteSpec::get("/cookies/set")
///     .with_title("Sets a simple cookie")
///     .with_param("name", "package")
///     .with_param("value", "routebin");
///
/// assert_eq!(spec.key(), ["cookies", "set"]);
/// assert_eq!(spec.url(), "/cookies/set/:name/:value");
/// assert_eq!(spec.href(), "/cookies/set/package/routebin");
/// ```
#[derive(Debug, Clone)]
pub struct RouteSpec {
    method: Method,
    title: String,
    key: Vec<String>,
    param_names: Vec<String>,
    param_examples: Vec<String>,
    order: usize,
}

impl RouteSpec {
    /// Declares a route for `method` at `pattern`.
    ///
    /// Leading, trailing and repeated slashes in `pattern` are insignificant; the
    /// remaining segments form the lookup key.
    pub fn new(method: Method, pattern: &str) -> Self {
        let key = pattern
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_owned)
            .collect();
        Self {
            method,
            title: "?".to_owned(),
            key,
            param_names: Vec::new(),
            param_examples: Vec::new(),
            order: DECLARED.fetch_add(1, Ordering::Relaxed) + 1,
        }
    }

    pub fn get(pattern: &str) -> Self {
        Self::new(Method::Get, pattern)
    }

    pub fn post(pattern: &str) -> Self {
        Self::new(Method::Post, pattern)
    }

    pub fn put(pattern: &str) -> Self {
        Self::new(Method::Put, pattern)
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Declares the next variable segment and an example value for the index link.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, example: impl ToString) -> Self {
        self.param_names.push(name.into());
        self.param_examples.push(example.to_string());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// The fixed segments preceding the first variable one.
    pub fn key(&self) -> &[String] {
        &self.key
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Declaration rank. The counter is shared by every spec in the process, so only
    /// comparisons between specs are meaningful, never the absolute value.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Full pattern: the key followed by one `:name` placeholder per parameter.
    pub fn pattern(&self) -> Vec<String> {
        self.key
            .iter()
            .cloned()
            .chain(self.param_names.iter().map(|name| format!(":{name}")))
            .collect()
    }

    /// Canonical URL, e.g. `/get/` or `/redirect/:n`.
    pub fn url(&self) -> String {
        if self.param_names.is_empty() {
            format!("/{}/", self.key.join("/"))
        } else {
            format!("/{}", self.pattern().join("/"))
        }
    }

    /// A clickable example URL built from the declared example values.
    pub fn href(&self) -> String {
        if self.param_examples.is_empty() {
            self.url()
        } else {
            format!("/{}/{}", self.key.join("/"), self.param_examples.join("/"))
        }
    }

    /// One `<li>` of the route index.
    pub fn render(&self) -> String {
        format!(
            "<li><a href='{}'>{}</a> {}.</li>",
            self.href(),
            self.url(),
            self.title
        )
    }
}
