//! A single-request HTTP endpoint on localhost for exercising the client.

use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub const RESULTS_JSON: &str = "application/sparql-results+json";

/// Answers the first request with `status`, `content_type` and `body`, then
/// closes. The receiver yields that request's target (`/path?query`).
pub async fn serve_once(
    status: &str,
    content_type: &str,
    body: &str,
) -> (Url, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    );
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let request = String::from_utf8_lossy(&request);
        let target = request
            .lines()
            .next()
            .and_then(|line| line.split(' ').nth(1))
            .unwrap_or_default()
            .to_owned();
        let _ = tx.send(target);

        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
    });

    let endpoint = Url::parse(&format!("http://{}/sparql", addr)).unwrap();
    (endpoint, rx)
}

/// The `(name, value)` pairs of a request target's query string, decoded.
pub fn query_pairs(target: &str) -> Vec<(String, String)> {
    Url::parse(&format!("http://localhost{}", target))
        .unwrap()
        .query_pairs()
        .into_owned()
        .collect()
}

/// An address nothing listens on.
pub async fn unreachable_endpoint() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}/sparql", addr)).unwrap()
}
