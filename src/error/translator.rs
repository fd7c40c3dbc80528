use std::collections::BTreeMap;

use tracing::debug;

use super::StatusFailure;
use crate::http::{Method, Response};
use crate::template::render_page;

/// Renders a [`StatusFailure`] into a [`Response`].
///
/// Statuses that never carry content (`1xx`, `204`, `304`) and any failure of a `HEAD`
/// request produce a bare response with the failure's headers. Everything else gets an
/// HTML page `<h1>{code} - {reason}</h1>{message}` where `message` is an optional
/// curated explanation for that status.
#[derive(Debug, Clone)]
pub struct ErrorTranslator {
    messages: BTreeMap<u16, String>,
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorTranslator {
    pub fn new() -> Self {
        let mut messages = BTreeMap::new();
        messages.insert(
            404,
            "<p>The requested URL was not found on the server.</p>".to_owned(),
        );
        Self { messages }
    }

    /// Sets (or replaces) the curated message shown under the heading for `status`.
    #[must_use]
    pub fn with_message(mut self, status: u16, message: impl Into<String>) -> Self {
        self.messages.insert(status, message.into());
        self
    }

    pub fn translate(&self, failure: StatusFailure, method: &Method) -> Response {
        let (status, headers) = failure.into_parts();
        debug!(status = status.as_u16(), method = %method, "translating status failure");

        if status.is_bodiless() || *method == Method::Head {
            return Response::new(status).headers_from(headers);
        }

        let reason = status.canonical_reason().unwrap_or_default();
        let message = self
            .messages
            .get(&status.as_u16())
            .map(String::as_str)
            .unwrap_or_default();
        let content = format!("<h1>{} - {}</h1>{}", status.as_u16(), reason, message);

        Response::html(status, render_page(reason, &content)).headers_from(headers)
    }
}
