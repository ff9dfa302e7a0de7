//! Status and transport control commands.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::http::{base_url, get_json, post_json};

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    chunks: usize,
    current: usize,
    playing: bool,
    speed: f32,
}

#[derive(Deserialize)]
struct SubscribersResponse {
    socket: usize,
    event_stream: usize,
}

#[derive(Deserialize)]
struct Ack {
    ok: bool,
}

#[derive(Deserialize)]
struct ShutdownResponse {
    message: String,
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/canon", base_url(port))).await?;
    let subs: SubscribersResponse = get_json(&format!("{}/subscribers", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Fano Canon Status");
    println!("═══════════════════════════════════════");
    println!("  State       : {}", if resp.playing { "playing" } else { "paused" });
    if resp.chunks == 0 {
        println!("  Position    : - (no chunks loaded)");
    } else {
        println!("  Position    : {} / {}", resp.current + 1, resp.chunks);
    }
    println!("  Speed       : {:.2}x", resp.speed);
    println!("  WebSocket   : {} subscriber(s)", subs.socket);
    println!("  EventStream : {} subscriber(s)", subs.event_stream);

    Ok(())
}

/// play, pause or stop.
pub async fn cmd_control(port: u16, action: &str) -> Result<()> {
    let resp: Ack = post_json(&format!("{}/{}", base_url(port), action)).await?;
    if resp.ok {
        println!("{action}: ok");
    }
    Ok(())
}

pub async fn cmd_seek(port: u16, position: &str) -> Result<()> {
    let position: f32 = position
        .parse()
        .context("seek position must be a number between 0 and 1")?;
    let _: Ack = post_json(&format!("{}/seek?position={}", base_url(port), position)).await?;
    let resp: StatusResponse = get_json(&format!("{}/canon", base_url(port))).await?;
    println!("Seeked to chunk {} of {}.", resp.current + 1, resp.chunks);
    Ok(())
}

pub async fn cmd_speed(port: u16, speed: &str) -> Result<()> {
    let speed: f32 = speed.parse().context("speed must be a number")?;
    let _: Ack = post_json(&format!("{}/speed?speed={}", base_url(port), speed)).await?;
    println!("Speed set to {:.2}x.", speed);
    Ok(())
}

pub async fn cmd_subscribers(port: u16) -> Result<()> {
    let resp: SubscribersResponse = get_json(&format!("{}/subscribers", base_url(port))).await?;
    println!("WebSocket   : {}", resp.socket);
    println!("EventStream : {}", resp.event_stream);
    Ok(())
}

pub async fn cmd_shutdown(port: u16) -> Result<()> {
    let resp: ShutdownResponse = post_json(&format!("{}/daemon/shutdown", base_url(port))).await?;
    println!("{}", resp.message);
    Ok(())
}
