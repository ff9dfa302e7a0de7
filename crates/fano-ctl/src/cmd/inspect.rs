//! Chunk, Fano point and wire packet inspection.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::http::{base_url, get_json};

const QUADRANTS: [&str; 4] = ["KK", "KU", "UK", "UU"];

#[derive(Deserialize)]
struct ChunkResponse {
    index: usize,
    matrix: [u8; 7],
    angle: f32,
    seed: u32,
    timestamp: u64,
}

#[derive(Deserialize)]
struct FanoResponse {
    point: u8,
    name: String,
    hue: u16,
    ratio: f32,
}

#[derive(Deserialize)]
struct PacketResponse {
    index: usize,
    len: usize,
    hex: String,
}

fn quadrant_names(matrix: &[u8; 7]) -> String {
    matrix
        .iter()
        .map(|&m| QUADRANTS.get(usize::from(m)).copied().unwrap_or("??"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub async fn cmd_chunk(port: u16, index: &str) -> Result<()> {
    let index: usize = index.parse().context("chunk index must be a number")?;
    let resp: ChunkResponse = get_json(&format!("{}/chunk/{}", base_url(port), index)).await?;

    println!("  ┌─ chunk {}", resp.index);
    println!("  │  matrix    : {:?}", resp.matrix);
    println!("  │  quadrants : {}", quadrant_names(&resp.matrix));
    println!("  │  angle     : {:.1}°", resp.angle);
    println!("  │  seed      : 0x{:06x}", resp.seed);
    println!("  └─ timestamp : {}", resp.timestamp);
    Ok(())
}

pub async fn cmd_fano(port: u16, point: &str) -> Result<()> {
    let point: usize = point.parse().context("fano point must be 0..7")?;
    let resp: FanoResponse = get_json(&format!("{}/fano/{}", base_url(port), point)).await?;
    println!(
        "Point {} {:<10} hue {:>3}  ratio {:.3}",
        resp.point, resp.name, resp.hue, resp.ratio
    );
    Ok(())
}

pub async fn cmd_packet(port: u16, index: &str) -> Result<()> {
    let index: usize = index.parse().context("chunk index must be a number")?;
    let resp: PacketResponse = get_json(&format!("{}/packet/{}", base_url(port), index)).await?;
    println!("chunk {} ({} bytes): {}", resp.index, resp.len, resp.hex);
    Ok(())
}
