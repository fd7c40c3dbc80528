//! Status-coded failures and their translation into HTTP responses.
//!
//! Handlers and the router signal every non-success outcome by returning a
//! [`StatusFailure`]. Exactly one place turns those into responses: the
//! [`ErrorTranslator`], which sits directly around [`Router::dispatch`](crate::router::Router::dispatch).

mod failure;
mod translator;

pub use failure::StatusFailure;
pub use translator::ErrorTranslator;
