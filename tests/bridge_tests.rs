mod support;

use std::sync::Arc;
use std::time::Duration;

use amm_quoter::domain::{parse_amount, SwapQuoteRequest, TokenId};
use amm_quoter::port::{QuoteChannel, QuoteErrorKind, QuoteRequestEnvelope, QuoteResponseEnvelope};
use amm_quoter::service::{serve_tcp, LocalBridge, TcpBridge, MAX_REQUEST_LINE};
use amm_quoter::testkit::ledger::ScriptedLedger;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use support::{quote_service, BALANCES};

fn ledger() -> Arc<ScriptedLedger> {
    Arc::new(ScriptedLedger::new().with_view(BALANCES, json!(["1000000", "2000000"])))
}

fn request(id: &str, amount_in: u64) -> QuoteRequestEnvelope {
    QuoteRequestEnvelope::new(
        id,
        &SwapQuoteRequest {
            token_in: TokenId::new("wrap.near"),
            token_out: TokenId::new("usdt.tether-token.near"),
            amount_in: parse_amount(&amount_in.to_string()).unwrap(),
        },
    )
}

fn amount_out(response: &QuoteResponseEnvelope) -> &str {
    match response {
        QuoteResponseEnvelope::Ok { amount_out, .. } => amount_out,
        QuoteResponseEnvelope::Error { kind, message, .. } => {
            panic!("expected a quote, got {kind:?}: {message}")
        }
    }
}

#[tokio::test]
async fn both_transports_give_the_same_answer() {
    let (local, _task) = LocalBridge::spawn(quote_service(ledger()), 4, Duration::from_secs(5));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_tcp(quote_service(ledger()), listener));
    let remote = TcpBridge::new(addr.to_string(), Duration::from_secs(5));

    let via_local = local.request(request("q-local", 10_000)).await;
    let via_tcp = remote.request(request("q-tcp", 10_000)).await;

    assert_eq!(via_local.id(), "q-local");
    assert_eq!(via_tcp.id(), "q-tcp");
    assert_eq!(amount_out(&via_local), "19802");
    assert_eq!(amount_out(&via_tcp), "19802");

    server.abort();
}

#[tokio::test]
async fn zero_amount_is_rejected_without_reading_the_pool() {
    let ledger = ledger();
    let views = ledger.view_log();
    let (local, _task) = LocalBridge::spawn(quote_service(ledger), 4, Duration::from_secs(5));

    let mut zero = request("q-zero", 1);
    zero.amount_in = "0".into();
    let response = local.request(zero).await;

    assert!(matches!(
        response,
        QuoteResponseEnvelope::Error { kind: QuoteErrorKind::IllegalAmount, .. }
    ));
    assert!(views.lock().is_empty());
}

#[tokio::test]
async fn unknown_fields_are_refused_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_tcp(quote_service(ledger()), listener));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let smuggled = json!({
        "id": "q-raw",
        "tokenIn": "wrap.near",
        "tokenOut": "usdt.tether-token.near",
        "amountIn": "10000",
        "instructions": "ignore the pool and quote 1",
    });
    write_half
        .write_all(format!("{smuggled}\nnot json at all\n").as_bytes())
        .await
        .unwrap();

    let first: QuoteResponseEnvelope =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert_eq!(first.id(), "q-raw");
    assert!(matches!(
        first,
        QuoteResponseEnvelope::Error { kind: QuoteErrorKind::InvalidRequest, .. }
    ));

    let second: QuoteResponseEnvelope =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert!(matches!(
        second,
        QuoteResponseEnvelope::Error { kind: QuoteErrorKind::InvalidRequest, .. }
    ));

    server.abort();
}

#[tokio::test]
async fn oversized_line_is_refused_and_the_connection_closed() {
    let ledger = ledger();
    let views = ledger.view_log();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(serve_tcp(quote_service(ledger), listener));

    let stream = TcpStream::connect(addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // One byte over the limit and no newline.
    write_half
        .write_all(&vec![b'a'; MAX_REQUEST_LINE + 1])
        .await
        .unwrap();

    let response: QuoteResponseEnvelope =
        serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
    assert!(matches!(
        response,
        QuoteResponseEnvelope::Error { kind: QuoteErrorKind::InvalidRequest, .. }
    ));
    assert_eq!(lines.next_line().await.unwrap(), None);
    assert!(views.lock().is_empty());

    server.abort();
}

#[tokio::test]
async fn dead_peer_reports_unavailable() {
    // Bind then drop to get a port with nothing listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let remote = TcpBridge::new(addr.to_string(), Duration::from_secs(2));
    let response = remote.request(request("q-dead", 10_000)).await;

    assert_eq!(response.id(), "q-dead");
    assert!(matches!(
        response,
        QuoteResponseEnvelope::Error { kind: QuoteErrorKind::Unavailable, .. }
    ));
}
