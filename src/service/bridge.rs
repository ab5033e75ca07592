//! Bridge transports between the orchestrator and the quote service.
//!
//! - [`LocalBridge`]: in-process, over an mpsc queue with a oneshot reply.
//! - [`TcpBridge`]: line-delimited JSON envelopes over TCP, served by
//!   [`serve_tcp`].
//!
//! Both report transport failures as `unavailable` error envelopes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::quote::QuoteService;
use crate::port::{QuoteChannel, QuoteErrorKind, QuoteRequestEnvelope, QuoteResponseEnvelope};

/// Longest request line `serve_tcp` accepts, newline excluded.
pub const MAX_REQUEST_LINE: usize = 64 * 1024;

/// A request in flight on the local bridge.
struct BridgeMessage {
    request: QuoteRequestEnvelope,
    reply: oneshot::Sender<QuoteResponseEnvelope>,
}

/// In-process bridge to a [`QuoteService`] task.
pub struct LocalBridge {
    tx: mpsc::Sender<BridgeMessage>,
    timeout: Duration,
}

impl LocalBridge {
    /// Spawn the quote service behind a bounded queue.
    ///
    /// The service task ends once every bridge handle is dropped.
    pub fn spawn(
        service: Arc<QuoteService>,
        capacity: usize,
        timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<BridgeMessage>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    let response = service.handle(message.request).await;
                    // Receiver gone means the caller timed out.
                    let _ = message.reply.send(response);
                });
            }
            debug!("Local quote bridge closed");
        });
        (Self { tx, timeout }, handle)
    }
}

#[async_trait]
impl QuoteChannel for LocalBridge {
    async fn request(&self, request: QuoteRequestEnvelope) -> QuoteResponseEnvelope {
        let id = request.id.clone();
        let (reply, response) = oneshot::channel();

        if self.tx.send(BridgeMessage { request, reply }).await.is_err() {
            return unavailable(id, "quote service stopped");
        }

        match tokio::time::timeout(self.timeout, response).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => unavailable(id, "quote service dropped the request"),
            Err(_) => unavailable(id, format!("no response within {:?}", self.timeout)),
        }
    }

    fn transport_name(&self) -> &'static str {
        "local"
    }
}

/// Bridge to a quote service in another process.
///
/// Opens one connection per request; the peer answers each line with one line.
pub struct TcpBridge {
    address: String,
    timeout: Duration,
}

impl TcpBridge {
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    async fn exchange(&self, request: &QuoteRequestEnvelope) -> Result<String, String> {
        let stream = TcpStream::connect(&self.address)
            .await
            .map_err(|e| format!("connect to {}: {e}", self.address))?;
        let (read_half, mut write_half) = stream.into_split();

        let mut line = serde_json::to_string(request).map_err(|e| e.to_string())?;
        line.push('\n');
        write_half
            .write_all(line.as_bytes())
            .await
            .map_err(|e| format!("write: {e}"))?;

        let mut reader = BufReader::new(read_half);
        let mut response = String::new();
        let read = reader
            .read_line(&mut response)
            .await
            .map_err(|e| format!("read: {e}"))?;
        if read == 0 {
            return Err("peer closed the connection".into());
        }
        Ok(response)
    }
}

#[async_trait]
impl QuoteChannel for TcpBridge {
    async fn request(&self, request: QuoteRequestEnvelope) -> QuoteResponseEnvelope {
        let id = request.id.clone();
        let line = match tokio::time::timeout(self.timeout, self.exchange(&request)).await {
            Ok(Ok(line)) => line,
            Ok(Err(reason)) => return unavailable(id, reason),
            Err(_) => return unavailable(id, format!("no response within {:?}", self.timeout)),
        };

        match serde_json::from_str::<QuoteResponseEnvelope>(line.trim()) {
            Ok(response) if response.id() == id => response,
            Ok(response) => unavailable(
                id,
                format!("response id {} does not match request", response.id()),
            ),
            Err(e) => unavailable(id, format!("malformed response: {e}")),
        }
    }

    fn transport_name(&self) -> &'static str {
        "tcp"
    }
}

/// Serve quote requests on `listener` until the task is aborted.
///
/// Each connection may carry any number of request lines; each gets exactly
/// one response line. A line longer than [`MAX_REQUEST_LINE`] is answered
/// with `invalid_request` and the connection is closed.
pub async fn serve_tcp(service: Arc<QuoteService>, listener: TcpListener) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Quote bridge listening");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "Quote bridge accept failed");
                continue;
            }
        };
        debug!(%peer, "Quote bridge connection");

        let service = Arc::clone(&service);
        tokio::spawn(async move {
            let (read_half, mut write_half) = stream.into_split();
            let mut reader = BufReader::new(read_half);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                let read = (&mut reader)
                    .take(MAX_REQUEST_LINE as u64 + 1)
                    .read_until(b'\n', &mut buf)
                    .await;
                let (response, close) = match read {
                    Ok(0) => break,
                    Err(e) => {
                        debug!(%peer, error = %e, "Quote bridge read failed");
                        break;
                    }
                    Ok(_) if buf.len() > MAX_REQUEST_LINE && buf.last() != Some(&b'\n') => {
                        warn!(%peer, limit = MAX_REQUEST_LINE, "Quote request line too long");
                        let response = QuoteResponseEnvelope::error(
                            String::new(),
                            QuoteErrorKind::InvalidRequest,
                            format!("request line exceeds {MAX_REQUEST_LINE} bytes"),
                        );
                        (response, true)
                    }
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf);
                        if line.trim().is_empty() {
                            continue;
                        }
                        (service.handle_raw(line.trim()).await, false)
                    }
                };

                let Ok(mut out) = serde_json::to_string(&response) else {
                    break;
                };
                out.push('\n');
                if let Err(e) = write_half.write_all(out.as_bytes()).await {
                    debug!(%peer, error = %e, "Quote bridge write failed");
                    break;
                }
                // The rest of an oversized line cannot be resynchronised.
                if close {
                    break;
                }
            }
        });
    }
}

fn unavailable(id: String, reason: impl Into<String>) -> QuoteResponseEnvelope {
    let reason = reason.into();
    warn!(request_id = %id, reason = %reason, "Quote bridge unavailable");
    QuoteResponseEnvelope::error(id, QuoteErrorKind::Unavailable, reason)
}
