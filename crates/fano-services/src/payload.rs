//! Notification payloads and the frames they are rendered into.
//!
//! One payload, two envelopes:
//!   socket       → `{"type":"canon","chunk":4,"matrix":[..],"angle":120.0}`
//!   event-stream → `event: canon\ndata: {"chunk":4,...}\n\n`

use serde::{Deserialize, Serialize};

use fano_core::state::Matrix;

/// Sent whenever the playback position moves to a new chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonUpdate {
    pub chunk: usize,
    pub matrix: Matrix,
    pub angle: f32,
}

/// Snapshot of the playback state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub chunks: usize,
    pub current: usize,
    pub playing: bool,
    pub speed: f32,
}

/// A notification ready to be put on one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// JSON text message for socket subscribers.
    Text(String),
    /// Named server-sent event.
    Event { name: &'static str, data: String },
}

impl Frame {
    /// Serialized bytes as they go over the wire.
    pub fn to_wire(&self) -> String {
        match self {
            Frame::Text(text) => text.clone(),
            Frame::Event { name, data } => format!("event: {name}\ndata: {data}\n\n"),
        }
    }
}

/// Envelope type carried in the socket `type` field and as the SSE event name.
pub trait Notification: Serialize + Sized {
    const KIND: &'static str;

    fn socket_frame(&self) -> Frame {
        let tagged = Tagged {
            kind: Self::KIND,
            body: self,
        };
        Frame::Text(serde_json::to_string(&tagged).unwrap_or_default())
    }

    fn event_frame(&self) -> Frame {
        Frame::Event {
            name: Self::KIND,
            data: serde_json::to_string(self).unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct Tagged<'a, T> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

impl Notification for CanonUpdate {
    const KIND: &'static str = "canon";
}

impl Notification for StatusSnapshot {
    const KIND: &'static str = "status";
}
