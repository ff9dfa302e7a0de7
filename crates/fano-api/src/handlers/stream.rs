//! Subscriber endpoints: /ws (WebSocket) and /events (server-sent events).
//!
//! Each connection registers a `ChannelTransport` with the hub and owns the
//! receiving end of its queue. The hub pushes frames with `try_send`; this
//! task is the only thing that ever waits on the socket.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Response;
use axum::Json;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};

use fano_services::{
    BroadcastHub, ChannelTransport, Frame, Notification, SubscriberId, TransportKind,
};

use super::{reject, ApiError, ApiState};

pub const WS_PROTOCOL: &str = "fano-protocol";

/// Removes the subscriber when the connection task or stream is dropped.
struct Registration {
    hub: Arc<BroadcastHub>,
    kind: TransportKind,
    id: SubscriberId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.hub.remove_subscriber(self.kind, self.id);
    }
}

// ── /ws/info ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct WsInfoResponse {
    pub path: &'static str,
    pub protocol: &'static str,
}

pub async fn handle_ws_info() -> Json<WsInfoResponse> {
    Json(WsInfoResponse {
        path: "/api/ws",
        protocol: WS_PROTOCOL,
    })
}

// ── /ws ───────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ClientMessage {
    #[serde(rename = "type")]
    kind: String,
}

pub async fn handle_ws(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.protocols([WS_PROTOCOL])
        .on_upgrade(move |socket| socket_session(socket, state))
}

async fn socket_session(mut socket: WebSocket, state: ApiState) {
    let (transport, mut rx) = ChannelTransport::channel(state.queue_depth);
    let id = match state
        .hub
        .add_subscriber(TransportKind::Socket, Arc::new(transport))
    {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting socket subscriber");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::AGAIN,
                    reason: e.to_string().into(),
                })))
                .await;
            return;
        }
    };
    let _registration = Registration {
        hub: state.hub.clone(),
        kind: TransportKind::Socket,
        id,
    };
    tracing::debug!(%id, "socket subscriber connected");

    state.hub.send_to(
        TransportKind::Socket,
        id,
        &state.engine.status().socket_frame(),
    );

    let mut shutdown = state.shutdown_tx.subscribe();
    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if socket.send(Message::Text(frame.to_wire().into())).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(m) if m.kind == "subscribe" => {
                                state.hub.set_subscribed(TransportKind::Socket, id, true);
                            }
                            Ok(m) if m.kind == "unsubscribe" => {
                                state.hub.set_subscribed(TransportKind::Socket, id, false);
                            }
                            _ => tracing::trace!(%id, "ignoring client message"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = shutdown.recv() => {
                let _ = socket.send(Message::Close(Some(CloseFrame {
                    code: close_code::AWAY,
                    reason: "server shutting down".into(),
                }))).await;
                break;
            }
        }
    }
    tracing::debug!(%id, "socket subscriber disconnected");
}

// ── /events ───────────────────────────────────────────────────────────────────

pub async fn handle_events(
    State(state): State<ApiState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (transport, mut rx) = ChannelTransport::channel(state.queue_depth);
    let id = state
        .hub
        .add_subscriber(TransportKind::EventStream, Arc::new(transport))
        .map_err(|e| {
            tracing::warn!(error = %e, "rejecting event-stream subscriber");
            reject(e)
        })?;
    let registration = Registration {
        hub: state.hub.clone(),
        kind: TransportKind::EventStream,
        id,
    };
    tracing::debug!(%id, "event-stream subscriber connected");

    state.hub.send_to(
        TransportKind::EventStream,
        id,
        &state.engine.status().event_frame(),
    );

    let mut shutdown = state.shutdown_tx.subscribe();
    let stream = async_stream::stream! {
        let _registration = registration;
        loop {
            let frame = tokio::select! {
                frame = rx.recv() => frame,
                _ = shutdown.recv() => None,
            };
            let Some(frame) = frame else { break };
            yield Ok(match frame {
                Frame::Event { name, data } => Event::default().event(name).data(data),
                Frame::Text(text) => Event::default().data(text),
            });
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
