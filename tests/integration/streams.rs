use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use fano_services::TransportKind;

use crate::*;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Read an event stream until `needle` shows up, returning everything read.
async fn read_until(resp: &mut reqwest::Response, needle: &str) -> Result<String> {
    let mut seen = String::new();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while !seen.contains(needle) {
        let chunk = tokio::time::timeout_at(deadline, resp.chunk())
            .await
            .with_context(|| format!("timed out waiting for {needle:?}; got {seen:?}"))??;
        match chunk {
            Some(bytes) => seen.push_str(&String::from_utf8_lossy(&bytes)),
            None => bail!("stream ended before {needle:?}; got {seen:?}"),
        }
    }
    Ok(seen)
}

#[tokio::test]
async fn test_event_stream_greets_then_follows_position() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let mut events = server.get("/events").await?;
    assert_eq!(events.status(), 200);
    let content_type = events
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"), "{content_type}");

    let greeting = read_until(&mut events, "\n\n").await?;
    assert!(greeting.contains("event: status"), "{greeting}");
    assert!(greeting.contains(r#""chunks":3"#), "{greeting}");

    let subs = server.get_json("/subscribers").await?;
    assert_eq!(subs["event_stream"], 1);
    assert_eq!(subs["socket"], 0);

    server.get_json("/seek?position=0.5").await?;
    let update = read_until(&mut events, r#""current":1"#).await?;
    assert!(
        update.contains(r#"event: canon"#) && update.contains(r#""chunk":1"#),
        "{update}"
    );
    assert!(update.contains(r#""matrix":[3,2,1,0,3,2,1]"#), "{update}");

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_event_stream_capacity_and_cleanup() -> Result<()> {
    let server = TestServer::start(CANON, Some(1)).await?;

    let mut first = server.get("/events").await?;
    read_until(&mut first, "event: status").await?;

    let second = server.get("/events").await?;
    assert_eq!(second.status(), 503);
    assert_eq!(server.hub.subscriber_count(TransportKind::EventStream), 1);

    // Once the peer is gone, the next writes fail and the slot is released.
    drop(first);
    let mut released = false;
    for _ in 0..100 {
        server.engine.seek(0.5)?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        if server.hub.subscriber_count(TransportKind::EventStream) == 0 {
            released = true;
            break;
        }
    }
    assert!(released, "closed event stream was never removed");

    let mut third = server.get("/events").await?;
    assert_eq!(third.status(), 200);
    read_until(&mut third, "event: status").await?;

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_ws_info() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let info = server.get_json("/ws/info").await?;
    assert_eq!(info["path"], "/api/ws");
    assert_eq!(info["protocol"], "fano-protocol");

    // a plain GET without the upgrade handshake is refused
    let resp = server.get("/ws").await?;
    assert!(resp.status().is_client_error());

    server.stop().await;
    Ok(())
}

// ── /ws ───────────────────────────────────────────────────────────────────────

/// Open `/api/ws`, offering the fano subprotocol.
async fn connect_socket(server: &TestServer) -> Result<Socket> {
    let url = format!("{}/ws", server.base.replacen("http://", "ws://", 1));
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static("fano-protocol"));
    let (socket, response) = tokio_tungstenite::connect_async(request).await?;
    assert_eq!(
        response.headers().get(SEC_WEBSOCKET_PROTOCOL),
        Some(&HeaderValue::from_static("fano-protocol"))
    );
    Ok(socket)
}

/// Next message from the server, skipping pings.
async fn next_message(socket: &mut Socket) -> Result<Message> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(3), socket.next())
            .await
            .context("timed out waiting for a socket frame")?;
        match msg {
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            Some(Ok(msg)) => return Ok(msg),
            Some(Err(e)) => return Err(e.into()),
            None => bail!("socket ended"),
        }
    }
}

async fn next_json(socket: &mut Socket) -> Result<Value> {
    match next_message(socket).await? {
        Message::Text(text) => Ok(serde_json::from_str(text.as_str())?),
        other => bail!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn test_socket_greets_then_follows_position() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let mut socket = connect_socket(&server).await?;
    let greeting = next_json(&mut socket).await?;
    assert_eq!(greeting["type"], "status");
    assert_eq!(greeting["chunks"], 3);
    assert_eq!(greeting["current"], 0);
    assert_eq!(server.hub.subscriber_count(TransportKind::Socket), 1);

    server.get_json("/seek?position=0.5").await?;
    let canon = next_json(&mut socket).await?;
    assert_eq!(canon["type"], "canon");
    assert_eq!(canon["chunk"], 1);
    assert_eq!(canon["matrix"], serde_json::json!([3, 2, 1, 0, 3, 2, 1]));
    assert_eq!(canon["angle"], 120.0);

    let status = next_json(&mut socket).await?;
    assert_eq!(status["type"], "status");
    assert_eq!(status["current"], 1);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_socket_unsubscribe_and_resubscribe() -> Result<()> {
    let server = TestServer::start(CANON, None).await?;

    let mut socket = connect_socket(&server).await?;
    next_json(&mut socket).await?;

    socket
        .send(Message::text(r#"{"type":"unsubscribe"}"#))
        .await?;
    eventually("socket unsubscribed", || {
        server.hub.subscribed_count(TransportKind::Socket) == 0
    })
    .await?;
    // still registered, just quiet
    assert_eq!(server.hub.subscriber_count(TransportKind::Socket), 1);
    server.engine.seek(0.5)?;

    socket.send(Message::text(r#"{"type":"subscribe"}"#)).await?;
    eventually("socket resubscribed", || {
        server.hub.subscribed_count(TransportKind::Socket) == 1
    })
    .await?;
    server.engine.seek(1.0)?;

    // the move to chunk 1 was never queued
    let canon = next_json(&mut socket).await?;
    assert_eq!(canon["type"], "canon");
    assert_eq!(canon["chunk"], 2);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_socket_capacity_closes_with_try_again() -> Result<()> {
    let server = TestServer::start(CANON, Some(1)).await?;

    let mut first = connect_socket(&server).await?;
    next_json(&mut first).await?;

    let mut second = connect_socket(&server).await?;
    match next_message(&mut second).await? {
        Message::Close(Some(CloseFrame { code, .. })) => {
            assert_eq!(code, CloseCode::Again);
            assert_eq!(u16::from(code), 1013);
        }
        other => bail!("expected a close frame, got {other:?}"),
    }
    assert_eq!(server.hub.subscriber_count(TransportKind::Socket), 1);

    // the first subscriber is unaffected
    server.engine.seek(0.5)?;
    assert_eq!(next_json(&mut first).await?["chunk"], 1);

    server.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_socket_disconnect_releases_slot() -> Result<()> {
    let server = TestServer::start(CANON, Some(1)).await?;

    let mut socket = connect_socket(&server).await?;
    next_json(&mut socket).await?;
    assert_eq!(server.hub.subscriber_count(TransportKind::Socket), 1);

    socket.close(None).await?;
    eventually("socket subscriber removed", || {
        server.hub.subscriber_count(TransportKind::Socket) == 0
    })
    .await?;

    let mut again = connect_socket(&server).await?;
    assert_eq!(next_json(&mut again).await?["type"], "status");

    server.stop().await;
    Ok(())
}
