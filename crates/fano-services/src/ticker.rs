//! Timing loop: drives `PlaybackEngine::tick` for the life of the daemon.
//!
//! Wakes every `poll` interval on the monotonic clock but only ticks once a
//! full period has passed since the previous tick, handing the real elapsed
//! time to the engine. The engine carries any partial step forward, so a
//! late wake-up or a fractional speed never loses time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

use crate::playback::{PlaybackEngine, TICK_MS};

pub async fn run(engine: Arc<PlaybackEngine>, poll: Duration, mut shutdown: broadcast::Receiver<()>) {
    let period = Duration::from_millis(TICK_MS);
    let mut interval = tokio::time::interval(poll.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_tick = Instant::now();

    tracing::info!(poll_ms = poll.as_millis() as u64, "timing loop started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let now = Instant::now();
                let elapsed = now.duration_since(last_tick);
                if elapsed < period {
                    continue;
                }
                engine.tick(elapsed);
                last_tick = now;
            }
            _ = shutdown.recv() => {
                tracing::info!("timing loop stopping");
                break;
            }
        }
    }
}
