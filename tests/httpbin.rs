//! End-to-end tests over a real socket: server, pipeline and wire framing together.

use std::net::SocketAddr;
use std::sync::Arc;

use routebin::{Config, HttpBin, Server};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

struct WireResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl WireResponse {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

async fn start() -> SocketAddr {
    let app = Arc::new(HttpBin::new(Config::default()).unwrap());
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    tokio::spawn(async move {
        server
            .run(move |request| {
                let app = Arc::clone(&app);
                async move { app.handle(request).await }
            })
            .await
    });
    addr
}

async fn read_response(reader: &mut BufReader<TcpStream>, head_only: bool) -> WireResponse {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let status = line.split_whitespace().nth(1).unwrap().parse().unwrap();

    let mut headers = Vec::new();
    loop {
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        let (name, value) = trimmed.split_once(':').unwrap();
        headers.push((name.trim().to_owned(), value.trim().to_owned()));
    }

    let mut response = WireResponse {
        status,
        headers,
        body: Vec::new(),
    };
    if head_only {
        return response;
    }

    if response.header("transfer-encoding") == Some("chunked") {
        loop {
            line.clear();
            reader.read_line(&mut line).await.unwrap();
            let size = usize::from_str_radix(line.trim_end(), 16).unwrap();
            let mut chunk = vec![0; size + 2];
            reader.read_exact(&mut chunk).await.unwrap();
            if size == 0 {
                break;
            }
            response.body.extend_from_slice(&chunk[..size]);
        }
    } else if let Some(length) = response.header("content-length") {
        let mut body = vec![0; length.parse().unwrap()];
        reader.read_exact(&mut body).await.unwrap();
        response.body = body;
    }
    response
}

async fn roundtrip(addr: SocketAddr, raw: &str) -> WireResponse {
    let head_only = raw.starts_with("HEAD ");
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    read_response(&mut BufReader::new(stream), head_only).await
}

#[tokio::test]
async fn get_echoes_query() {
    let addr = start().await;
    let response = roundtrip(
        addr,
        "GET /get?x=1 HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("content-type"), Some("application/json"));
    let value = response.json();
    assert_eq!(value["method"], "GET");
    assert_eq!(value["args"]["x"][0], "1");
    assert_eq!(value["headers"]["Host"], "test");
}

#[tokio::test]
async fn response_headers_echoes_what_was_sent() {
    let addr = start().await;
    let response = roundtrip(
        addr,
        "GET /response-headers HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.header("transfer-encoding"), Some("chunked"));

    let echoed = response.json();
    let echoed = echoed.as_object().unwrap();
    assert_eq!(echoed.len(), response.headers.len());
    for (name, value) in &response.headers {
        assert_eq!(echoed[name.as_str()], value.as_str(), "header {name}");
    }
}

#[tokio::test]
async fn head_on_get_route_is_not_allowed_and_bodiless() {
    let addr = start().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"HEAD /get HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut reader = BufReader::new(stream);
    let response = read_response(&mut reader, true).await;
    assert_eq!(response.status, 405);
    assert_eq!(response.header("allow"), Some("GET"));
    assert_eq!(response.header("content-length"), Some("0"));

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn oversized_content_length_is_rejected() {
    let addr = start().await;
    for length in ["18446744073709551615", "9000000"] {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let raw = format!(
            "POST /post HTTP/1.1\r\nHost: test\r\nContent-Length: {length}\r\n\r\n"
        );
        stream.write_all(raw.as_bytes()).await.unwrap();

        let mut reader = BufReader::new(stream);
        let response = read_response(&mut reader, false).await;
        assert_eq!(response.status, 413, "Content-Length {length}");
        assert_eq!(response.header("connection"), Some("close"));

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}

#[tokio::test]
async fn no_content_status_keeps_connection_usable() {
    let addr = start().await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut reader = BufReader::new(stream);

    reader
        .get_mut()
        .write_all(b"GET /status/204 HTTP/1.1\r\nHost: test\r\n\r\n")
        .await
        .unwrap();
    let first = read_response(&mut reader, false).await;
    assert_eq!(first.status, 204);
    assert!(first.header("content-length").is_none());
    assert!(first.header("content-type").is_none());
    assert!(first.body.is_empty());

    reader
        .get_mut()
        .write_all(b"GET /get HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let second = read_response(&mut reader, false).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.json()["method"], "GET");
}

#[tokio::test]
async fn unknown_path_renders_not_found_page() {
    let addr = start().await;
    let response = roundtrip(
        addr,
        "GET /nowhere HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
    )
    .await;
    assert_eq!(response.status, 404);
    assert_eq!(
        response.header("content-type"),
        Some("text/html; charset=utf-8")
    );
    let page = String::from_utf8(response.body).unwrap();
    assert!(page.contains("<h1>404 - Not Found</h1>"));
}

#[tokio::test]
async fn keep_alive_serves_sequential_requests() {
    let addr = start().await;
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut reader = BufReader::new(stream);

    reader
        .get_mut()
        .write_all(b"GET /redirect/2 HTTP/1.1\r\nHost: test\r\n\r\n")
        .await
        .unwrap();
    let first = read_response(&mut reader, false).await;
    assert_eq!(first.status, 302);
    assert_eq!(first.header("location"), Some("/redirect/1"));
    assert_eq!(first.header("connection"), Some("keep-alive"));

    reader
        .get_mut()
        .write_all(b"GET /cookies HTTP/1.1\r\nHost: test\r\nCookie: a=1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let second = read_response(&mut reader, false).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.json()["cookies"], "a=1");
}

#[tokio::test]
async fn pipelined_requests_are_answered_in_order() {
    let addr = start().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(
            b"GET /status/418 HTTP/1.1\r\nHost: test\r\n\r\n\
              POST /post HTTP/1.1\r\nHost: test\r\nContent-Type: application/x-www-form-urlencoded\r\n\
              Content-Length: 7\r\nConnection: close\r\n\r\nkey=val",
        )
        .await
        .unwrap();

    let mut reader = BufReader::new(stream);
    let first = read_response(&mut reader, false).await;
    assert_eq!(first.status, 418);
    let second = read_response(&mut reader, false).await;
    assert_eq!(second.status, 200);
    assert_eq!(second.json()["args"]["key"][0], "val");
}
