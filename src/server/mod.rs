//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and dispatches HTTP/1.1 requests to a handler function.
//! Supports HTTP/1.1 persistent connections (keep-alive) out of the box.
//!
//! Responses go out through [`Response::finish`], which fixes the header block and
//! resolves any headers-sent hook before the head is written. Fixed bodies follow with
//! a `Content-Length`; streamed bodies are written with chunked transfer coding. A
//! `HEAD` request gets the head only.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::http::{
    Body, BodyError, Method, StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("response body failed after the head was sent: {0}")]
    Body(#[from] BodyError),
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// The HTTP server.
///
/// Binds to a TCP address and dispatches incoming HTTP/1.1 requests to a
/// handler function.
///
/// # Examples
///
/// ```rust,no_run
/// use routebin::server::Server;
/// use routebin::http::{Response, StatusCode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server.run(|_req| async {
///         Response::new(StatusCode::OK).body("Hello!")
///     }).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting connections and dispatching requests to `handler`.
    ///
    /// The handler receives a [`Request`] and must return a [`Future`] that
    /// resolves to a [`Response`]. The handler is wrapped in an [`Arc`] and
    /// shared across all spawned Tokio tasks, so it must be `Send + Sync + 'static`.
    ///
    /// This method runs until the process is terminated or an unrecoverable
    /// listener error occurs.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr, "listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                if let Err(e) = Connection::new(stream, peer_addr).serve(handler).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

fn too_large() -> Response {
    Response::new(StatusCode::PAYLOAD_TOO_LARGE).body("Request entity too large")
}

/// Result of reading from a connection.
enum Inbound {
    Request(Request),
    /// The peer closed the connection between requests.
    Closed,
    /// The buffered bytes can never become a valid request; send this and close.
    Rejected(Response),
}

/// One client connection and its read buffer.
///
/// HTTP/1.1 connections are persistent by default, so a connection serves requests
/// until the peer closes it or either side signals `Connection: close`. Bytes already
/// buffered are parsed before reading again, so pipelined requests are answered in
/// order.
struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    buf: BytesMut,
}

impl Connection {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            buf: BytesMut::with_capacity(INITIAL_BUF_SIZE),
        }
    }

    async fn serve<H, F>(mut self, handler: Arc<H>) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        loop {
            let request = match self.read_request().await? {
                Inbound::Request(request) => request,
                Inbound::Closed => {
                    debug!(peer = %self.peer, "connection closed by peer");
                    return Ok(());
                }
                Inbound::Rejected(response) => {
                    self.write_response(response.keep_alive(false), false)
                        .await?;
                    return Ok(());
                }
            };

            let keep_alive = request.is_keep_alive();
            let head_only = *request.method() == Method::Head;
            debug!(
                peer = %self.peer,
                method = %request.method(),
                path = %request.path(),
                "dispatching request"
            );

            let response = handler(request).await.keep_alive(keep_alive);
            self.write_response(response, head_only).await?;

            if !keep_alive {
                debug!(peer = %self.peer, "Connection: close, shutting down");
                return Ok(());
            }
        }
    }

    /// Buffers input until one complete request (head plus `Content-Length` body) is
    /// available, then removes it from the buffer.
    async fn read_request(&mut self) -> Result<Inbound, ServerError> {
        loop {
            if !self.buf.is_empty() {
                match Request::parse(&self.buf) {
                    Ok((request, body_offset)) => {
                        let declared = request.content_length().unwrap_or(0);
                        let Some(total) = body_offset
                            .checked_add(declared)
                            .filter(|total| *total <= MAX_REQUEST_SIZE)
                        else {
                            warn!(
                                peer = %self.peer,
                                content_length = declared,
                                "declared body too large, sending 413"
                            );
                            return Ok(Inbound::Rejected(too_large()));
                        };
                        if self.buf.len() >= total {
                            self.buf.advance(total);
                            return Ok(Inbound::Request(request));
                        }
                    }
                    // Headers not yet fully received; read more data.
                    Err(RequestError::Incomplete) => {}
                    Err(e) => {
                        warn!(peer = %self.peer, error = %e, "bad request, sending 400");
                        return Ok(Inbound::Rejected(
                            Response::new(StatusCode::BAD_REQUEST)
                                .body(format!("Bad Request: {e}")),
                        ));
                    }
                }
            }

            if self.buf.len() > MAX_REQUEST_SIZE {
                warn!(peer = %self.peer, "request too large, sending 413");
                return Ok(Inbound::Rejected(too_large()));
            }

            if self.stream.read_buf(&mut self.buf).await? == 0 {
                return Ok(Inbound::Closed);
            }
        }
    }

    /// Writes one response: the head, then the body unless `head_only`.
    ///
    /// Streamed bodies are framed as `{len:x}\r\n{data}\r\n` chunks followed by the
    /// terminating `0\r\n\r\n`. Empty chunks are skipped since a zero-length chunk
    /// ends the body.
    async fn write_response(
        &mut self,
        response: Response,
        head_only: bool,
    ) -> Result<(), ServerError> {
        let (head, body) = response.finish();
        self.stream.write_all(&head).await?;

        if !head_only {
            match body {
                Body::Full(bytes) => self.stream.write_all(&bytes).await?,
                Body::Stream(mut chunks) => {
                    while let Some(chunk) = chunks.next().await {
                        let chunk = chunk?;
                        if chunk.is_empty() {
                            continue;
                        }
                        self.stream
                            .write_all(format!("{:x}\r\n", chunk.len()).as_bytes())
                            .await?;
                        self.stream.write_all(&chunk).await?;
                        self.stream.write_all(b"\r\n").await?;
                    }
                    self.stream.write_all(b"0\r\n\r\n").await?;
                }
            }
        }

        self.stream.flush().await?;
        Ok(())
    }
}
