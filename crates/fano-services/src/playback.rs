//! Playback engine: the canon position, its transport controls and the tick.
//!
//! All state lives behind one lock. Every operation, including the broadcast
//! it triggers, runs inside a single critical section, so no subscriber can
//! see an index that was not announced and no two commands interleave.
//! Hub sends are `try_send`, so holding the lock across fan-out never waits
//! on a socket.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use fano_core::{CanonError, Chunk};

use crate::hub::BroadcastHub;
use crate::payload::StatusSnapshot;

/// Logical tick period at speed 1.0.
pub const TICK_MS: u64 = 100;

#[derive(Debug)]
struct PlaybackState {
    index: usize,
    playing: bool,
    speed: f32,
    /// Speed-scaled milliseconds not yet spent on a whole step.
    carry_ms: f64,
    last_broadcast: usize,
}

pub struct PlaybackEngine {
    chunks: Vec<Chunk>,
    state: Mutex<PlaybackState>,
    hub: Arc<BroadcastHub>,
}

impl PlaybackEngine {
    /// Build an engine over a fixed chunk sequence. Starts stopped at 0.
    pub fn new(chunks: Vec<Chunk>, speed: f32, hub: Arc<BroadcastHub>) -> Self {
        let speed = if speed.is_finite() && speed > 0.0 { speed } else { 1.0 };
        Self {
            chunks,
            state: Mutex::new(PlaybackState {
                index: 0,
                playing: false,
                speed,
                carry_ms: 0.0,
                last_broadcast: 0,
            }),
            hub,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    // ── Controls ──────────────────────────────────────────────────────────────

    /// Start playback. Returns false if already playing.
    pub fn play(&self) -> bool {
        let mut state = self.state.lock();
        if state.playing {
            return false;
        }
        state.playing = true;
        tracing::info!(index = state.index, "playback started");
        self.announce_status(&state);
        true
    }

    /// Pause playback. Returns false if already paused.
    pub fn pause(&self) -> bool {
        let mut state = self.state.lock();
        if !state.playing {
            return false;
        }
        state.playing = false;
        state.carry_ms = 0.0;
        tracing::info!(index = state.index, "playback paused");
        self.announce_status(&state);
        true
    }

    /// Stop and rewind to the first chunk.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.playing = false;
        state.index = 0;
        state.carry_ms = 0.0;
        tracing::info!("playback stopped");
        self.announce_position(&mut state);
    }

    /// Jump to `position` in [0, 1] of the canon. No-op on an empty canon.
    pub fn seek(&self, position: f32) -> Result<usize, CanonError> {
        if !position.is_finite() {
            return Err(CanonError::InvalidInput(format!(
                "seek position must be a finite number, got {position}"
            )));
        }
        let mut state = self.state.lock();
        let len = self.chunks.len();
        if len == 0 {
            return Ok(0);
        }
        let target = (f64::from(position) * len as f64).floor();
        state.index = target.clamp(0.0, (len - 1) as f64) as usize;
        state.carry_ms = 0.0;
        tracing::debug!(position, index = state.index, "seek");
        self.announce_position(&mut state);
        Ok(state.index)
    }

    /// Change the playback speed multiplier. Must be finite and positive.
    pub fn set_speed(&self, speed: f32) -> Result<(), CanonError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(CanonError::InvalidInput(format!(
                "speed must be a positive number, got {speed}"
            )));
        }
        let mut state = self.state.lock();
        state.speed = speed;
        tracing::debug!(speed, "speed changed");
        self.announce_status(&state);
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn get_chunk(&self, index: usize) -> Result<Chunk, CanonError> {
        self.chunks
            .get(index)
            .copied()
            .ok_or(CanonError::chunk_not_found(index as u64))
    }

    pub fn status(&self) -> StatusSnapshot {
        let state = self.state.lock();
        self.snapshot(&state)
    }

    // ── Tick ──────────────────────────────────────────────────────────────────

    /// Advance by however many steps fit into `elapsed` at the current speed.
    ///
    /// Time left over after the last whole step carries into the next call,
    /// so speeds below 1.0 or between whole numbers keep their true rate
    /// however the calls are spaced. Broadcasts one canon update and one status snapshot when the index
    /// lands somewhere other than the last announced position. Returns the
    /// number of steps taken.
    pub fn tick(&self, elapsed: Duration) -> usize {
        let mut state = self.state.lock();
        let len = self.chunks.len();
        if !state.playing || len == 0 || state.speed <= 0.0 {
            return 0;
        }

        let period = TICK_MS as f64;
        state.carry_ms += elapsed.as_micros() as f64 / 1000.0 * f64::from(state.speed);
        let steps = (state.carry_ms / period).floor();
        state.carry_ms -= steps * period;
        let steps = steps as usize;
        if steps == 0 {
            return 0;
        }

        state.index = state.index.saturating_add(steps);
        if state.index >= len {
            state.index = 0;
        }
        tracing::trace!(steps, index = state.index, "tick");

        if state.index != state.last_broadcast {
            self.announce_position(&mut state);
        }
        steps
    }

    // ── Broadcast helpers (caller holds the lock) ─────────────────────────────

    fn snapshot(&self, state: &PlaybackState) -> StatusSnapshot {
        StatusSnapshot {
            chunks: self.chunks.len(),
            current: state.index,
            playing: state.playing,
            speed: state.speed,
        }
    }

    fn announce_status(&self, state: &PlaybackState) {
        let s = self.snapshot(state);
        self.hub
            .broadcast_status(s.chunks, s.current, s.playing, s.speed);
    }

    /// Canon update for the current chunk, then status. Records the index.
    fn announce_position(&self, state: &mut PlaybackState) {
        if let Some(chunk) = self.chunks.get(state.index) {
            self.hub
                .broadcast_canon_update(state.index, chunk.matrix(), chunk.angle());
        }
        state.last_broadcast = state.index;
        self.announce_status(state);
    }
}
