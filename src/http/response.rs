//! HTTP/1.1 response builder.
//!
//! Provides a fluent builder API for constructing HTTP responses and
//! serializing their head to a byte buffer for transmission over TCP.

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::debug;

use super::{Body, Headers, StatusCode};

/// An HTTP/1.1 response, ready to be serialized and sent.
///
/// # Examples
///
/// ```
/// use routebin::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let (head, _body) = response.finish();
/// let text = std::str::from_utf8(&head).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Body,
    keep_alive: bool,
    headers_sent: Option<oneshot::Sender<Headers>>,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Body::empty(),
            keep_alive: true,
            headers_sent: None,
        }
    }

    /// `200 OK` with a pretty-printed JSON body.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec_pretty(value)?;
        Ok(Self::new(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(body))
    }

    /// An HTML page with the given status.
    pub fn html(status: StatusCode, page: impl Into<Body>) -> Self {
        Self::new(status)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(page)
    }

    /// `302 Found` pointing at `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(StatusCode::FOUND).header("Location", location)
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends every header of `headers`, keeping duplicates.
    #[must_use]
    pub fn headers_from(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends a header in-place. Intended for middleware pipelines that receive
    /// a `Response` from downstream and need to decorate it without consuming it.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the response body.
    ///
    /// The framing headers are written automatically by [`finish`](Self::finish).
    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the body in-place.
    pub fn set_body(&mut self, body: impl Into<Body>) {
        self.body = body.into();
    }

    /// Controls whether the `Connection: keep-alive` or `Connection: close` header is written.
    #[must_use]
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Registers the one-shot hook resolved with the final header block when the head
    /// is serialized. A second registration replaces the first.
    #[must_use]
    pub fn notify_headers_sent(mut self, hook: oneshot::Sender<Headers>) -> Self {
        self.headers_sent = Some(hook);
        self
    }

    /// Returns the status code of this response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the headers set so far (framing headers are added by `finish`).
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the body.
    pub fn payload(&self) -> &Body {
        &self.body
    }

    /// Consumes the response, returning only its body.
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Finalizes the header block and serializes the head using HTTP/1.1 wire format.
    ///
    /// Automatically adds:
    /// - `Content-Type: text/plain; charset=utf-8` if a fixed body is non-empty and no
    ///   `Content-Type` header was set.
    /// - `Connection: keep-alive` or `Connection: close`.
    /// - `Content-Length: <n>` for fixed bodies, or `Transfer-Encoding: chunked` for
    ///   streamed ones. Bodiless statuses get neither.
    ///
    /// The headers-sent hook, if registered, fires here with the final header block.
    /// Returns the head bytes (terminated by the blank line) and the body to write.
    pub fn finish(mut self) -> (BytesMut, Body) {
        let has_content = match &self.body {
            Body::Full(bytes) => !bytes.is_empty(),
            Body::Stream(_) => true,
        };
        if has_content && !self.headers.contains("content-type") {
            self.headers
                .insert("Content-Type", "text/plain; charset=utf-8");
        }

        let connection = if self.keep_alive {
            "keep-alive"
        } else {
            "close"
        };
        self.headers.set("Connection", connection);

        // Framing is always the last header before the blank line
        if !self.status.is_bodiless() {
            match &self.body {
                Body::Full(bytes) => self.headers.set("Content-Length", bytes.len().to_string()),
                Body::Stream(_) => self.headers.set("Transfer-Encoding", "chunked"),
            }
        }

        if let Some(hook) = self.headers_sent.take() {
            if hook.send(self.headers.clone()).is_err() {
                debug!("headers-sent listener went away before delivery");
            }
        }

        let estimated_size = 128 + self.headers.len() * 64;
        let mut buf = BytesMut::with_capacity(estimated_size);

        // Status line
        buf.put(
            format!(
                "HTTP/1.1 {} {}\r\n",
                self.status.as_u16(),
                self.status.canonical_reason().unwrap_or_default()
            )
            .as_bytes(),
        );

        // Headers
        buf.put(self.headers.to_string().as_bytes());

        // Header/body separator
        buf.put(&b"\r\n"[..]);

        let body = if self.status.is_bodiless() {
            Body::empty()
        } else {
            self.body
        };
        (buf, body)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}
