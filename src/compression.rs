//! gzip content encoding for fixed response bodies.

use std::io::Write;

use bytes::Bytes;
use flate2::{Compression, write::GzEncoder};
use tracing::{debug, warn};

use crate::http::{Body, Headers, Response, StatusCode};

/// Compresses eligible responses with gzip.
///
/// A response is compressed only when all of these hold:
/// the client listed `gzip` in `Accept-Encoding`, the status is `200`, the body is a
/// fixed buffer of at least `min_size` bytes, and no `Content-Encoding` is set yet.
/// Anything else passes through untouched.
#[derive(Debug, Clone, Copy)]
pub struct Gzip {
    min_size: usize,
}

impl Gzip {
    pub fn new(min_size: usize) -> Self {
        Self { min_size }
    }

    pub fn apply(&self, request_headers: &Headers, mut response: Response) -> Response {
        if !accepts_gzip(request_headers)
            || response.status() != StatusCode::OK
            || response.headers().contains("content-encoding")
        {
            return response;
        }
        let Some(plain) = response.payload().as_bytes() else {
            return response;
        };
        if plain.len() < self.min_size {
            return response;
        }

        match encode(plain) {
            Ok(compressed) => {
                debug!(
                    before = plain.len(),
                    after = compressed.len(),
                    "gzip-encoded response body"
                );
                response.set_body(Body::Full(compressed));
                response.headers_mut().set("Content-Encoding", "gzip");
                response.headers_mut().insert("Vary", "Accept-Encoding");
                response
            }
            Err(error) => {
                warn!(%error, "gzip encoding failed; sending identity body");
                response
            }
        }
    }
}

fn accepts_gzip(headers: &Headers) -> bool {
    headers.get_all("accept-encoding").any(|value| {
        value.split(',').any(|coding| {
            let mut parts = coding.split(';');
            let name = parts.next().unwrap_or("").trim();
            let refused = parts.any(|p| {
                p.trim()
                    .strip_prefix("q=")
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            name.eq_ignore_ascii_case("gzip") && !refused
        })
    })
}

fn encode(plain: &[u8]) -> std::io::Result<Bytes> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(plain.len() / 2), Compression::default());
    encoder.write_all(plain)?;
    Ok(Bytes::from(encoder.finish()?))
}
