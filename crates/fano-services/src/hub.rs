//! Broadcast hub: fan-out of canon notifications to every live subscriber.
//!
//! One concurrent table per transport. Broadcasting snapshots the handles,
//! releases the shard locks, sends to each, then removes the subscribers
//! whose transport reported `Closed`. A slow or dead subscriber never holds
//! up the others.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;

use fano_core::state::Matrix;
use fano_core::CanonError;

use crate::payload::{CanonUpdate, Frame, Notification, StatusSnapshot};
use crate::transport::{SendOutcome, Transport, TransportKind};

/// Opaque handle returned by [`BroadcastHub::add_subscriber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

struct Subscriber {
    transport: Arc<dyn Transport>,
    subscribed: AtomicBool,
}

#[derive(Default)]
struct Table {
    subscribers: DashMap<SubscriberId, Subscriber>,
    /// Tracks occupancy so the capacity check and the insert cannot race.
    len: AtomicUsize,
}

/// What a single broadcast did on one or both transports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fanout {
    pub delivered: usize,
    pub dropped: usize,
    pub removed: usize,
}

impl std::ops::AddAssign for Fanout {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.dropped += other.dropped;
        self.removed += other.removed;
    }
}

pub struct BroadcastHub {
    socket: Table,
    event_stream: Table,
    /// `None` = unbounded.
    capacity: Option<usize>,
    next_id: AtomicU64,
}

impl BroadcastHub {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            socket: Table::default(),
            event_stream: Table::default(),
            capacity,
            next_id: AtomicU64::new(1),
        }
    }

    fn table(&self, kind: TransportKind) -> &Table {
        match kind {
            TransportKind::Socket => &self.socket,
            TransportKind::EventStream => &self.event_stream,
        }
    }

    /// Register a subscriber. New subscribers start subscribed.
    pub fn add_subscriber(
        &self,
        kind: TransportKind,
        transport: Arc<dyn Transport>,
    ) -> Result<SubscriberId, CanonError> {
        let table = self.table(kind);
        if let Some(cap) = self.capacity {
            table
                .len
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                    (n < cap).then_some(n + 1)
                })
                .map_err(|_| CanonError::CapacityExceeded(cap))?;
        } else {
            table.len.fetch_add(1, Ordering::AcqRel);
        }

        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        table.subscribers.insert(
            id,
            Subscriber {
                transport,
                subscribed: AtomicBool::new(true),
            },
        );
        tracing::debug!(%id, transport = kind.name(), "subscriber added");
        Ok(id)
    }

    /// Remove a subscriber. Removing an unknown id is a no-op.
    pub fn remove_subscriber(&self, kind: TransportKind, id: SubscriberId) -> bool {
        let table = self.table(kind);
        let removed = table.subscribers.remove(&id).is_some();
        if removed {
            table.len.fetch_sub(1, Ordering::AcqRel);
            tracing::debug!(%id, transport = kind.name(), "subscriber removed");
        }
        removed
    }

    /// Toggle delivery for one subscriber. Returns false if the id is unknown.
    pub fn set_subscribed(&self, kind: TransportKind, id: SubscriberId, subscribed: bool) -> bool {
        match self.table(kind).subscribers.get(&id) {
            Some(sub) => {
                sub.subscribed.store(subscribed, Ordering::Relaxed);
                tracing::debug!(%id, subscribed, "subscription toggled");
                true
            }
            None => false,
        }
    }

    pub fn subscriber_count(&self, kind: TransportKind) -> usize {
        self.table(kind).subscribers.len()
    }

    /// Subscribers on `kind` that currently receive broadcasts.
    pub fn subscribed_count(&self, kind: TransportKind) -> usize {
        self.table(kind)
            .subscribers
            .iter()
            .filter(|sub| sub.subscribed.load(Ordering::Relaxed))
            .count()
    }

    pub fn broadcast_canon_update(&self, index: usize, matrix: Matrix, angle: f32) -> Fanout {
        self.broadcast(&CanonUpdate {
            chunk: index,
            matrix,
            angle,
        })
    }

    pub fn broadcast_status(&self, chunks: usize, current: usize, playing: bool, speed: f32) -> Fanout {
        self.broadcast(&StatusSnapshot {
            chunks,
            current,
            playing,
            speed,
        })
    }

    /// Render once per transport, deliver to every subscribed handle.
    pub fn broadcast<N: Notification>(&self, notification: &N) -> Fanout {
        let mut fanout = self.fan_out(TransportKind::Socket, &notification.socket_frame());
        fanout += self.fan_out(TransportKind::EventStream, &notification.event_frame());
        tracing::trace!(
            kind = N::KIND,
            delivered = fanout.delivered,
            dropped = fanout.dropped,
            removed = fanout.removed,
            "broadcast"
        );
        fanout
    }

    /// Send one frame to a single subscriber, e.g. the greeting status on connect.
    pub fn send_to(&self, kind: TransportKind, id: SubscriberId, frame: &Frame) -> SendOutcome {
        let transport = match self.table(kind).subscribers.get(&id) {
            Some(sub) => Arc::clone(&sub.transport),
            None => return SendOutcome::Closed,
        };
        let outcome = transport.send(frame);
        if outcome == SendOutcome::Closed {
            self.remove_subscriber(kind, id);
        }
        outcome
    }

    fn fan_out(&self, kind: TransportKind, frame: &Frame) -> Fanout {
        let table = self.table(kind);
        let targets: Vec<(SubscriberId, Arc<dyn Transport>)> = table
            .subscribers
            .iter()
            .filter(|e| e.value().subscribed.load(Ordering::Relaxed))
            .map(|e| (*e.key(), Arc::clone(&e.value().transport)))
            .collect();

        let mut fanout = Fanout::default();
        let mut closed = Vec::new();
        for (id, transport) in targets {
            match transport.send(frame) {
                SendOutcome::Delivered => fanout.delivered += 1,
                SendOutcome::Dropped => {
                    fanout.dropped += 1;
                    tracing::trace!(%id, "subscriber queue full, frame dropped");
                }
                SendOutcome::Closed => closed.push(id),
            }
        }

        for id in closed {
            if self.remove_subscriber(kind, id) {
                fanout.removed += 1;
            }
        }
        fanout
    }
}
