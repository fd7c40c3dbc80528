//! Security middleware: request authorization parsing.
//!
//! - [`AuthorizationMiddleware`]: parses the `Authorization` header into a typed
//!   [`Authorization`] extension for handlers to check.

mod middleware;

pub use middleware::{Authorization, AuthorizationMiddleware, Credentials};
