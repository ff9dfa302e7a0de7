//! Transport capability contract.
//!
//! The hub only ever asks a subscriber handle to take one frame. Whether the
//! frame goes out over a WebSocket or an SSE response is the connection
//! task's business: it owns the receiving end of the queue.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::payload::Frame;

/// Which push transport a subscriber is attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Socket,
    EventStream,
}

impl TransportKind {
    pub const ALL: [TransportKind; 2] = [TransportKind::Socket, TransportKind::EventStream];

    pub fn name(self) -> &'static str {
        match self {
            TransportKind::Socket => "socket",
            TransportKind::EventStream => "event_stream",
        }
    }
}

/// Result of handing one frame to a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for the connection writer.
    Delivered,
    /// Queue full; this frame is lost but the subscriber stays.
    Dropped,
    /// Peer is gone; the subscriber should be removed.
    Closed,
}

/// A subscriber handle. `send` must never block.
pub trait Transport: Send + Sync {
    fn send(&self, frame: &Frame) -> SendOutcome;
}

/// Bounded in-memory queue drained by a per-connection writer task.
pub struct ChannelTransport {
    tx: mpsc::Sender<Frame>,
}

impl ChannelTransport {
    /// Create a transport and the receiver its writer task drains.
    pub fn channel(depth: usize) -> (Self, mpsc::Receiver<Frame>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&self, frame: &Frame) -> SendOutcome {
        match self.tx.try_send(frame.clone()) {
            Ok(()) => SendOutcome::Delivered,
            Err(TrySendError::Full(_)) => SendOutcome::Dropped,
            Err(TrySendError::Closed(_)) => SendOutcome::Closed,
        }
    }
}
