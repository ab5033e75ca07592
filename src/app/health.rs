//! Liveness endpoint.
//!
//! A minimal HTTP/1.1 responder on a tokio listener: `GET /health` answers
//! `200 OK`, `GET /status` answers the loop snapshot as JSON, anything else
//! `404`. One request per connection. Only the request line is read, and
//! a client that does not send it in time is dropped without a response.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::stats::LoopStats;
use crate::error::Result;

/// How long a client has to send its request line.
pub const HEALTH_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest request line read before answering.
const MAX_REQUEST_HEAD: usize = 8 * 1024;

pub struct HealthServer {
    listener: TcpListener,
    stats: Arc<LoopStats>,
    read_timeout: Duration,
}

impl HealthServer {
    /// Bind the listener. A bind failure is a startup error.
    pub async fn bind(addr: &str, stats: Arc<LoopStats>) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            stats,
            read_timeout: HEALTH_READ_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.serve())
    }

    pub async fn serve(self) {
        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "Health server listening");
        }
        loop {
            match self.listener.accept().await {
                Ok((stream, _)) => {
                    let stats = Arc::clone(&self.stats);
                    let read_timeout = self.read_timeout;
                    tokio::spawn(async move {
                        if let Err(e) = respond(stream, &stats, read_timeout).await {
                            debug!(error = %e, "Health request failed");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "Health accept failed"),
            }
        }
    }
}

/// Read until the first line ending, EOF, or `MAX_REQUEST_HEAD` bytes.
async fn read_request_line(stream: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(256);
    let mut chunk = [0u8; 512];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(head);
        }
        head.extend_from_slice(&chunk[..n]);
        if let Some(end) = head.iter().position(|&b| b == b'\n') {
            head.truncate(end);
            return Ok(head);
        }
        if head.len() >= MAX_REQUEST_HEAD {
            return Ok(head);
        }
    }
}

async fn respond(
    mut stream: TcpStream,
    stats: &LoopStats,
    read_timeout: Duration,
) -> std::io::Result<()> {
    let head = match tokio::time::timeout(read_timeout, read_request_line(&mut stream)).await {
        Ok(head) => head?,
        Err(_) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "request line not received in time",
            ))
        }
    };
    let request = String::from_utf8_lossy(&head);
    let mut parts = request.trim_end().split_whitespace();
    let method = parts.next().unwrap_or_default();
    let path = parts.next().unwrap_or_default();

    let (status, content_type, body) = match (method, path) {
        ("GET", "/health") => ("200 OK", "text/plain", "OK".to_string()),
        ("GET", "/status") => match serde_json::to_string(&stats.snapshot()) {
            Ok(json) => ("200 OK", "application/json", json),
            Err(e) => ("500 Internal Server Error", "text/plain", e.to_string()),
        },
        _ => ("404 Not Found", "text/plain", "Not Found".to_string()),
    };

    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
