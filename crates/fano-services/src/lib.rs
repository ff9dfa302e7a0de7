//! fano-services: playback engine, broadcast hub and the timing loop.

pub mod hub;
pub mod payload;
pub mod playback;
pub mod ticker;
pub mod transport;

pub use hub::{BroadcastHub, Fanout, SubscriberId};
pub use payload::{CanonUpdate, Frame, Notification, StatusSnapshot};
pub use playback::{PlaybackEngine, TICK_MS};
pub use transport::{ChannelTransport, SendOutcome, Transport, TransportKind};
