//! fano-ctl: command-line interface for the Fano canon daemon.

use anyhow::{Context, Result};

mod cmd;

use cmd::{inspect, playback};

const DEFAULT_PORT: u16 = 8080;

fn print_usage() {
    println!("Usage: fano-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status            Show playback position, speed and subscribers");
    println!("  play              Start playback");
    println!("  pause             Pause playback");
    println!("  stop              Stop and rewind to the first chunk");
    println!("  seek <0..1>       Jump to a fraction of the canon");
    println!("  speed <x>         Set the playback speed multiplier");
    println!("  chunk <n>         Show one chunk");
    println!("  fano <0..7>       Show a Fano point");
    println!("  packet <n>        Show the wire packet for a chunk");
    println!("  subscribers       Count live subscribers per transport");
    println!("  shutdown          Stop the daemon");
    println!();
    println!("Options:");
    println!("  --port <port>   API port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | []                         => playback::cmd_status(port).await,
        [action @ ("play" | "pause" | "stop")]  => playback::cmd_control(port, action).await,
        ["seek", position]                      => playback::cmd_seek(port, position).await,
        ["speed", speed]                        => playback::cmd_speed(port, speed).await,
        ["subscribers"]                         => playback::cmd_subscribers(port).await,
        ["shutdown"]                            => playback::cmd_shutdown(port).await,
        ["chunk", index]                        => inspect::cmd_chunk(port, index).await,
        ["fano", point]                         => inspect::cmd_fano(port, point).await,
        ["packet", index]                       => inspect::cmd_packet(port, index).await,
        ["help"] | ["--help"] | ["-h"]          => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
