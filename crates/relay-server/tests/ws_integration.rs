//! End-to-end tests: a real `RelayServer` on a loopback port, driven by
//! `tokio-tungstenite` clients.
//!
//! Every test binds port 0 so the OS picks a free port, which lets the tests
//! run in parallel.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relay_core::{decode, encode, EndpointId, Envelope, MessageType, ResultCode};
use relay_server::application::Dispatch;
use relay_server::domain::RelayConfig;
use relay_server::infrastructure::{RelayServer, StopMode};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const STEP: Duration = Duration::from_secs(5);

// ── Helpers ───────────────────────────────────────────────────────────────────

fn test_config() -> RelayConfig {
    RelayConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        shutdown_grace: Duration::from_millis(500),
        ..RelayConfig::default()
    }
}

async fn start(config: RelayConfig) -> (RelayServer, String) {
    let server = RelayServer::new(config);
    let addr = server.start(0).await.expect("start relay");
    (server, format!("ws://{addr}"))
}

/// Connects and consumes the connect ack, returning the assigned id.
async fn connect(url: &str) -> (Client, EndpointId) {
    let (mut ws, _) = connect_async(format!("{url}/any/path")).await.expect("connect");
    let ack = next_envelope(&mut ws).await;
    assert_eq!(ack.kind, MessageType::Bind);
    assert_eq!(ack.message, "targetId");
    let id = EndpointId::parse_declared(&ack.client_id).expect("ack carries an id");
    (ws, id)
}

async fn next_text(ws: &mut Client) -> String {
    loop {
        let frame = timeout(STEP, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("read error");
        match frame {
            Message::Text(text) => return text,
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("unexpected frame: {other:?}"),
        }
    }
}

async fn next_envelope(ws: &mut Client) -> Envelope {
    decode(&next_text(ws).await).expect("relay sends valid envelopes")
}

async fn send(ws: &mut Client, envelope: &Envelope) {
    ws.send(Message::Text(encode(envelope).unwrap()))
        .await
        .expect("send");
}

async fn pair(url: &str) -> (Client, EndpointId, Client, EndpointId) {
    let (mut client, c) = connect(url).await;
    let (mut target, t) = connect(url).await;
    send(&mut target, &Envelope::bind_request(c, t)).await;
    assert_eq!(next_envelope(&mut client).await.message, "200");
    assert_eq!(next_envelope(&mut target).await.message, "200");
    (client, c, target, t)
}

// ── Session flow ──────────────────────────────────────────────────────────────

/// Full flow over real sockets: connect, bind, forward, disconnect → break.
#[tokio::test]
async fn test_end_to_end_bind_forward_break() {
    // Arrange
    let (server, url) = start(test_config()).await;
    let (mut client, c, mut target, t) = pair(&url).await;

    // Act: forward a command from client to target.
    let text = encode(&Envelope::forward(c, t, "strength-1+2+50")).unwrap();
    client.send(Message::Text(text.clone())).await.unwrap();

    // Assert: identical text arrives.
    assert_eq!(next_text(&mut target).await, text);

    // Act: the client disconnects.
    client.close(None).await.unwrap();

    // Assert: the target gets the break notice.
    let notice = next_envelope(&mut target).await;
    assert_eq!(notice, Envelope::break_notice(c, t));

    server.stop(StopMode::Graceful).await;
}

/// Rejections travel back over the socket with the right envelope type.
#[tokio::test]
async fn test_rejections_over_the_wire() {
    let (server, url) = start(test_config()).await;
    let (mut a, ida) = connect(&url).await;
    let (mut b, idb) = connect(&url).await;

    // msg while unbound → error 402
    send(&mut a, &Envelope::forward(ida, idb, "clear-1")).await;
    let reply = next_envelope(&mut a).await;
    assert_eq!(reply.kind, MessageType::Error);
    assert_eq!(reply.result_code(), Some(ResultCode::NotBound));

    // bind with the wrong token → bind 403
    send(
        &mut b,
        &Envelope::new(MessageType::Bind, ida.to_string(), idb.to_string(), "nope"),
    )
    .await;
    let reply = next_envelope(&mut b).await;
    assert_eq!(reply.kind, MessageType::Bind);
    assert_eq!(reply.result_code(), Some(ResultCode::InvalidBindFormat));

    server.stop(StopMode::Forced).await;
}

/// Binary and undecodable frames are ignored without closing the session.
#[tokio::test]
async fn test_garbage_does_not_kill_session() {
    let (server, url) = start(test_config()).await;
    let (mut client, c, mut target, t) = pair(&url).await;

    client.send(Message::Binary(vec![1, 2, 3])).await.unwrap();
    client.send(Message::Text("{not json".to_string())).await.unwrap();
    let text = encode(&Envelope::forward(c, t, "clear-2")).unwrap();
    client.send(Message::Text(text.clone())).await.unwrap();

    assert_eq!(next_text(&mut target).await, text);
    server.stop(StopMode::Forced).await;
}

/// Heartbeats arrive once per period and name the bound peer.
#[tokio::test]
async fn test_heartbeat_over_the_wire() {
    let config = RelayConfig {
        heartbeat_interval: Duration::from_millis(500),
        ..test_config()
    };
    let (server, url) = start(config).await;
    let (mut client, c, _target, t) = pair(&url).await;

    let hb = next_envelope(&mut client).await;

    assert_eq!(hb, Envelope::heartbeat(c, Some(t)));
    server.stop(StopMode::Forced).await;
}

/// The length limit, when configured, is enforced with 405.
#[tokio::test]
async fn test_message_length_limit() {
    let config = RelayConfig {
        max_message_len: Some(16),
        ..test_config()
    };
    let (server, url) = start(config).await;
    let (mut client, c, _target, t) = pair(&url).await;

    send(&mut client, &Envelope::forward(c, t, "x".repeat(17))).await;

    let reply = next_envelope(&mut client).await;
    assert_eq!(reply.result_code(), Some(ResultCode::MessageTooLong));
    server.stop(StopMode::Forced).await;
}

// ── Local endpoints ───────────────────────────────────────────────────────────

/// A local endpoint can act as the client for a network target.
#[tokio::test]
async fn test_local_client_pairs_with_network_target() {
    // Arrange
    let (server, url) = start(test_config()).await;
    let inbox = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&inbox);
    let local = server
        .open_local_endpoint(move |t| sink.lock().unwrap().push(t.to_string()))
        .expect("server is running");
    let (mut target, t) = connect(&url).await;

    // Act: the device scans the pairing URL and binds.
    let scanned = relay_core::protocol::pairing::parse_pairing_url(&local.pairing_url(&url));
    assert_eq!(scanned, Some(local.id()));
    send(&mut target, &Envelope::bind_request(local.id(), t)).await;
    assert_eq!(next_envelope(&mut target).await.message, "200");

    // Assert: the local side was told too, and can now forward.
    assert_eq!(decode(&inbox.lock().unwrap()[0]).unwrap().message, "200");
    let text = encode(&Envelope::forward(local.id(), t, "pulse-B:[\"0000000000000000\"]")).unwrap();
    assert_eq!(local.submit(&text), Dispatch::Forwarded);
    assert_eq!(next_text(&mut target).await, text);

    // Closing the local endpoint breaks the pair.
    assert!(server.close_local_endpoint(local.id()));
    assert_eq!(next_envelope(&mut target).await.kind, MessageType::Break);

    server.stop(StopMode::Graceful).await;
}

// ── Lifecycle ─────────────────────────────────────────────────────────────────

/// A graceful stop sends open sessions a close frame.
#[tokio::test]
async fn test_graceful_stop_closes_sessions() {
    let (server, url) = start(test_config()).await;
    let (mut ws, _) = connect(&url).await;

    server.stop(StopMode::Graceful).await;

    let frame = timeout(STEP, ws.next()).await.expect("closed in time");
    assert!(matches!(frame, Some(Ok(Message::Close(_))) | None | Some(Err(_))));
    assert_eq!(server.connection_count(), 0);
}

/// Restarting on a different port drops every endpoint from the old run.
#[tokio::test]
async fn test_restart_on_new_port_starts_fresh() {
    // Arrange
    let server = RelayServer::new(test_config());
    let first = server.start(0).await.unwrap();
    let (_ws, _) = connect(&format!("ws://{first}")).await;
    assert_eq!(server.connection_count(), 1);

    // Act: pick a different free port.
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);
    let second = server.start(port).await.unwrap();

    // Assert
    assert_eq!(second.port(), port);
    assert!(server.is_running());
    assert_eq!(server.connection_count(), 0);
    assert!(TcpStream::connect(first).await.is_err());

    server.stop(StopMode::Forced).await;
}

/// Local endpoints are refused once the server has stopped.
#[tokio::test]
async fn test_open_local_after_stop_is_refused() {
    let (server, _) = start(test_config()).await;
    server.stop(StopMode::Graceful).await;

    assert!(server.open_local_endpoint(|_| {}).is_none());
    assert!(!server.close_local_endpoint(EndpointId::random()));
}
