//! The httpbin handler set.
//!
//! Every handler receives the [`Context`] with the bits the router left over and decides
//! for itself how many it accepts; most accept none and answer `404` otherwise.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use cookie::Cookie;
use futures_util::stream;
use serde::Serialize;
use serde_json::json;
use tokio::sync::oneshot;
use tracing::debug;

use crate::compression::Gzip;
use crate::context::Context;
use crate::error::StatusFailure;
use crate::http::{Body, BodyError, Headers, Request, Response, StatusCode};
use crate::router::HandlerResult;
use crate::security::Authorization;

/// JSON echo of the interesting parts of a request.
#[derive(Debug, Serialize)]
struct RequestInfo {
    method: String,
    headers: BTreeMap<String, String>,
    args: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    gzipped: bool,
}

impl RequestInfo {
    fn of(request: &Request) -> Self {
        let pairs = if request.method().encodes_args_in_url() {
            request.query_pairs()
        } else {
            request.form_pairs()
        };
        let mut args: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in pairs {
            args.entry(name).or_default().push(value);
        }
        Self {
            method: request.method().as_str().to_owned(),
            headers: request.headers().to_map(),
            args,
            gzipped: false,
        }
    }
}

fn no_bits(ctx: &Context) -> Result<(), StatusFailure> {
    if ctx.bits().is_empty() {
        Ok(())
    } else {
        Err(StatusFailure::not_found())
    }
}

/// `/get`, `/post`, `/put`: echo method, headers and arguments.
pub async fn echo(ctx: Context) -> HandlerResult {
    no_bits(&ctx)?;
    Ok(Response::json(&RequestInfo::of(ctx.request()))?)
}

/// `/redirect/:n`: `302` to `/redirect/{n-1}`, or to `/get` once that would reach 0.
///
/// `n` must be a non-negative integer that fits a `u64`; anything else is `404`.
pub async fn redirect(ctx: Context) -> HandlerResult {
    let n: u64 = match ctx.bits() {
        [] => 1,
        [n] => n.parse().map_err(|_| {
            debug!(segment = %n, "redirect count is not a non-negative integer");
            StatusFailure::not_found()
        })?,
        _ => return Err(StatusFailure::not_found()),
    };

    let remaining = n.saturating_sub(1);
    if remaining > 0 {
        Ok(Response::redirect(format!("/redirect/{remaining}")))
    } else {
        Ok(Response::redirect("/get"))
    }
}

/// `/gzip`: the `/get` echo, flagged and handed to the gzip encoder.
pub async fn gzip(ctx: Context, encoder: Gzip) -> HandlerResult {
    no_bits(&ctx)?;
    let mut info = RequestInfo::of(ctx.request());
    info.gzipped = true;
    let response = Response::json(&info)?;
    Ok(encoder.apply(ctx.request().headers(), response))
}

/// `/cookies`: echo the raw `Cookie` header.
pub async fn cookies(ctx: Context) -> HandlerResult {
    let cookies = ctx.request().headers().get("cookie").unwrap_or_default();
    Ok(Response::json(&json!({ "cookies": cookies }))?)
}

/// `/cookies/set/:name/:value`: set one cookie and bounce to `/cookies`.
pub async fn cookies_set(ctx: Context) -> HandlerResult {
    if ctx.bits().len() != 2 {
        return Err(StatusFailure::not_found());
    }
    let (Some(name), Some(value)) = (ctx.params().get("name"), ctx.params().get("value")) else {
        return Err(StatusFailure::not_found());
    };
    if name.is_empty() || value.is_empty() {
        return Err(StatusFailure::not_found());
    }

    let cookie = Cookie::new(name.to_owned(), value.to_owned());
    Ok(Response::redirect("/cookies").header("Set-Cookie", cookie.encoded().to_string()))
}

/// `/status/:code`: always fails, with `code` when it is a valid status and `404`
/// otherwise.
pub async fn status(ctx: Context) -> HandlerResult {
    let status = match ctx.bits() {
        [code] => code
            .parse::<u16>()
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::NOT_FOUND),
        _ => StatusCode::NOT_FOUND,
    };
    Err(StatusFailure::new(status))
}

/// `/response-headers`: a body that waits for the final response headers and echoes
/// them as JSON.
///
/// The body is a single-chunk stream gated on the headers-sent hook, which the
/// transport resolves exactly once when it serializes the head.
pub async fn response_headers(ctx: Context) -> HandlerResult {
    no_bits(&ctx)?;

    let (hook, sent) = oneshot::channel::<Headers>();
    let body = stream::once(async move {
        let headers = sent.await.map_err(|_| BodyError::HeadersNeverSent)?;
        let json = serde_json::to_vec_pretty(&headers.to_map())?;
        Ok::<_, BodyError>(Bytes::from(json))
    });

    Ok(Response::new(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Body::stream(body))
        .notify_headers_sent(hook))
}

/// `/basic-auth/:user/:pass`: accept only Basic credentials equal to the two segments.
pub async fn basic_auth(ctx: Context, realm: Arc<str>) -> HandlerResult {
    if ctx.bits().len() != 2 {
        return Err(StatusFailure::not_found());
    }
    let params = ctx.params();
    let (Some(username), Some(password)) = (params.get("username"), params.get("password")) else {
        return Err(StatusFailure::not_found());
    };

    let authenticated = ctx
        .extensions()
        .get::<Authorization>()
        .and_then(Authorization::basic)
        .is_some_and(|credentials| credentials.authenticated(username, password));

    if !authenticated {
        return Err(StatusFailure::unauthorized(&realm));
    }

    Ok(Response::json(&json!({
        "authenticated": true,
        "username": username,
    }))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use crate::security::Credentials;

    fn ctx(method: Method, target: &str, bits: &[&str]) -> Context {
        let mut ctx = Context::new(Request::new(method, target));
        ctx.set_bits(bits.iter().map(|b| b.to_string()).collect(), &[]);
        ctx
    }

    // As the router leaves it for a route declaring `names`.
    fn routed(bits: &[&str], names: &[&str]) -> Context {
        let names: Vec<String> = names.iter().map(|n| n.to_string()).collect();
        let mut ctx = Context::new(Request::new(Method::Get, "/"));
        ctx.set_bits(bits.iter().map(|b| b.to_string()).collect(), &names);
        ctx
    }

    const COOKIE: &[&str] = &["name", "value"];
    const CREDENTIALS: &[&str] = &["username", "password"];

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn location(result: HandlerResult) -> String {
        let response = result.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        response.headers().get("location").unwrap().to_owned()
    }

    fn failure_status(result: HandlerResult) -> u16 {
        result.unwrap_err().status().as_u16()
    }

    #[tokio::test]
    async fn echo_reports_query_args() {
        let mut context = Context::new(
            Request::new(Method::Get, "/get?a=1&a=2&b=x").with_header("user-agent", "test"),
        );
        context.set_bits(Vec::new(), &[]);
        let value = json_body(echo(context).await.unwrap()).await;
        assert_eq!(value["method"], "GET");
        assert_eq!(value["args"]["a"], json!(["1", "2"]));
        assert_eq!(value["args"]["b"], json!(["x"]));
        assert_eq!(value["headers"]["User-Agent"], "test");
        assert!(value.get("gzipped").is_none());
    }

    #[tokio::test]
    async fn echo_reports_form_args_for_post() {
        let request = Request::new(Method::Post, "/post?ignored=1")
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body("name=routebin");
        let value = json_body(echo(Context::new(request)).await.unwrap()).await;
        assert_eq!(value["method"], "POST");
        assert_eq!(value["args"], json!({ "name": ["routebin"] }));
    }

    #[tokio::test]
    async fn echo_rejects_bits() {
        assert_eq!(failure_status(echo(ctx(Method::Get, "/get/x", &["x"])).await), 404);
    }

    #[tokio::test]
    async fn redirect_counts_down() {
        assert_eq!(location(redirect(ctx(Method::Get, "/", &["3"])).await), "/redirect/2");
        assert_eq!(location(redirect(ctx(Method::Get, "/", &["2"])).await), "/redirect/1");
        assert_eq!(location(redirect(ctx(Method::Get, "/", &["1"])).await), "/get");
        assert_eq!(location(redirect(ctx(Method::Get, "/", &["0"])).await), "/get");
        assert_eq!(location(redirect(ctx(Method::Get, "/", &[])).await), "/get");
    }

    #[tokio::test]
    async fn redirect_rejects_bad_input() {
        assert_eq!(failure_status(redirect(ctx(Method::Get, "/", &["x"])).await), 404);
        assert_eq!(failure_status(redirect(ctx(Method::Get, "/", &["1", "2"])).await), 404);
        for bad in ["-1", "-9223372036854775808", "18446744073709551616"] {
            assert_eq!(failure_status(redirect(ctx(Method::Get, "/", &[bad])).await), 404);
        }
    }

    #[tokio::test]
    async fn redirect_accepts_largest_count() {
        let result = redirect(ctx(Method::Get, "/", &["18446744073709551615"])).await;
        assert_eq!(location(result), "/redirect/18446744073709551614");
    }

    #[tokio::test]
    async fn gzip_flags_and_compresses() {
        let mut context = Context::new(
            Request::new(Method::Get, "/gzip").with_header("Accept-Encoding", "gzip"),
        );
        context.set_bits(Vec::new(), &[]);
        let response = gzip(context, Gzip::new(10)).await.unwrap();
        assert_eq!(response.headers().get("content-encoding"), Some("gzip"));
    }

    #[tokio::test]
    async fn gzip_without_accept_encoding_is_plain_json() {
        let response = gzip(ctx(Method::Get, "/gzip", &[]), Gzip::new(10)).await.unwrap();
        assert!(!response.headers().contains("content-encoding"));
        assert_eq!(json_body(response).await["gzipped"], true);
    }

    #[tokio::test]
    async fn cookies_echoes_header() {
        let request = Request::new(Method::Get, "/cookies").with_header("Cookie", "a=1; b=2");
        let value = json_body(cookies(Context::new(request)).await.unwrap()).await;
        assert_eq!(value, json!({ "cookies": "a=1; b=2" }));
    }

    #[tokio::test]
    async fn cookies_without_header_is_empty() {
        let value = json_body(cookies(ctx(Method::Get, "/cookies", &[])).await.unwrap()).await;
        assert_eq!(value, json!({ "cookies": "" }));
    }

    #[tokio::test]
    async fn cookies_set_sets_and_redirects() {
        let response = cookies_set(routed(&["foo", "bar"], COOKIE)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get("location"), Some("/cookies"));
        assert_eq!(response.headers().get("set-cookie"), Some("foo=bar"));
    }

    #[tokio::test]
    async fn cookies_set_requires_two_non_empty_bits() {
        for bits in [&["foo"][..], &["a", "b", "c"][..], &["", "bar"][..], &["foo", ""][..]] {
            assert_eq!(failure_status(cookies_set(routed(bits, COOKIE)).await), 404);
        }
    }

    #[tokio::test]
    async fn status_raises_given_code() {
        assert_eq!(failure_status(status(ctx(Method::Get, "/", &["418"])).await), 418);
        assert_eq!(failure_status(status(ctx(Method::Get, "/", &["204"])).await), 204);
    }

    #[tokio::test]
    async fn status_defaults_to_not_found() {
        for bits in [&[][..], &["teapot"][..], &["999"][..], &["1", "2"][..]] {
            assert_eq!(failure_status(status(ctx(Method::Get, "/", bits)).await), 404);
        }
    }

    #[tokio::test]
    async fn response_headers_waits_for_final_headers() {
        let response = response_headers(ctx(Method::Get, "/response-headers", &[]))
            .await
            .unwrap();
        assert!(response.payload().is_stream());

        let (_head, body) = response.finish();
        let bytes = body.collect().await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["Content-Type"], "application/json");
        assert_eq!(value["Transfer-Encoding"], "chunked");
        assert_eq!(value["Connection"], "keep-alive");
    }

    #[tokio::test]
    async fn response_headers_body_fails_if_never_sent() {
        let response = response_headers(ctx(Method::Get, "/response-headers", &[]))
            .await
            .unwrap();
        // Dropping the response without finishing drops the hook.
        let body = response.into_body();
        assert!(matches!(body.collect().await, Err(BodyError::HeadersNeverSent)));
    }

    #[tokio::test]
    async fn basic_auth_accepts_matching_credentials() {
        let mut context = routed(&["alice", "secret"], CREDENTIALS);
        context
            .extensions_mut()
            .insert(Authorization::Basic(Credentials::new("alice", "secret")));
        let response = basic_auth(context, Arc::from("R")).await.unwrap();
        let value = json_body(response).await;
        assert_eq!(value, json!({ "authenticated": true, "username": "alice" }));
    }

    #[tokio::test]
    async fn basic_auth_challenges_otherwise() {
        let mut wrong = routed(&["alice", "secret"], CREDENTIALS);
        wrong
            .extensions_mut()
            .insert(Authorization::Basic(Credentials::new("alice", "nope")));
        for context in [routed(&["alice", "secret"], CREDENTIALS), wrong] {
            let failure = basic_auth(context, Arc::from("R")).await.unwrap_err();
            assert_eq!(failure.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                failure.headers().get("www-authenticate"),
                Some("Basic realm=\"R\"")
            );
        }
    }

    #[tokio::test]
    async fn basic_auth_requires_two_bits() {
        let failure = basic_auth(routed(&["alice"], CREDENTIALS), Arc::from("R"))
            .await
            .unwrap_err();
        assert_eq!(failure.status(), StatusCode::NOT_FOUND);
    }
}
