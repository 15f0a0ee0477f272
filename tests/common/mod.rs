//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use automation_server::config::AutomationConfig;
use automation_server::http::{parse_response, ParsedResponse};
use automation_server::library::{InMemoryLibrary, PaperRecord};
use automation_server::AutomationServer;

/// Config for tests: ephemeral port, gate open, no rate limiting, fast restart.
pub fn test_config() -> AutomationConfig {
    let mut config = AutomationConfig::default();
    config.listener.port = 0;
    config.automation.enabled = true;
    config.rate_limit.enabled = false;
    config.restart_delay_ms = 20;
    config.timeouts.read_secs = 2;
    config
}

pub fn seeded_library() -> Arc<InMemoryLibrary> {
    Arc::new(InMemoryLibrary::with_papers([
        PaperRecord::new("Einstein1905", "On the Electrodynamics of Moving Bodies")
            .authors(&["Albert Einstein"])
            .year(1905)
            .doi("10.1002/andp.19053221004")
            .tag("physics"),
        PaperRecord::new("Vaswani2017", "Attention Is All You Need")
            .authors(&["Ashish Vaswani"])
            .year(2017)
            .arxiv("1706.03762")
            .tag("ml"),
    ]))
}

/// Start a server with the given config over the seeded library.
pub async fn start_server(config: AutomationConfig) -> (Arc<AutomationServer>, SocketAddr) {
    let server = Arc::new(AutomationServer::new(config, seeded_library()));
    server.start().await.unwrap();
    let addr = server.local_addr().await.expect("server should be listening");
    (server, addr)
}

/// Write raw bytes, half-close, and read until the server closes.
pub async fn send_raw(addr: SocketAddr, bytes: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(bytes).await.unwrap();
    read_all(&mut stream).await
}

/// Write the request in pieces with a pause between them.
pub async fn send_in_pieces(addr: SocketAddr, pieces: &[&[u8]]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    for piece in pieces {
        stream.write_all(piece).await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    read_all(&mut stream).await
}

async fn read_all(stream: &mut TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut out))
        .await
        .expect("server did not close the connection")
        .unwrap();
    out
}

/// Send a well-formed request and parse the response.
pub async fn request(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> ParsedResponse {
    let mut raw = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", method, path, addr);
    if let Some(body) = body {
        raw.push_str("Content-Type: application/json\r\n");
        raw.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
    } else {
        raw.push_str("\r\n");
    }
    let bytes = send_raw(addr, raw.as_bytes()).await;
    parse_response(&bytes).expect("unparseable response")
}
