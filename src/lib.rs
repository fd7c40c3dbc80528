//! # routebin
//!
//! An httpbin-style HTTP request and response service on a from-scratch async
//! HTTP/1.1 server.
//!
//! Requests are routed by *backward trimming*: the path's segments are looked up as a
//! whole, then with one trailing segment dropped at a time, until a registered key
//! matches. The dropped segments are handed to the handler as its `bits`. Handlers fail
//! with a [`StatusFailure`], which the [`ErrorTranslator`](error::ErrorTranslator) turns
//! into a response in exactly one place.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use routebin::{Config, HttpBin, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Arc::new(HttpBin::new(Config::default())?);
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     println!("Listening on http://{}", server.local_addr());
//!     server
//!         .run(move |request| {
//!             let app = Arc::clone(&app);
//!             async move { app.handle(request).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod compression;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod middleware;
pub mod router;
pub mod security;
pub mod server;
pub mod template;

pub use app::HttpBin;
pub use config::Config;
pub use context::Context;
pub use error::{ErrorTranslator, StatusFailure};
pub use http::{Body, Headers, Method, Request, Response, StatusCode};
pub use router::{RouteSpec, Router};
pub use server::{Server, ServerError};
