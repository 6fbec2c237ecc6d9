//! mcping - Minecraft server status and latency checker
//!
//! Queries a server over the Server List Ping protocol and prints its
//! status document and round-trip latency.

mod config;
mod discovery;
mod protocol;
mod session;

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use session::{ping, ping_uri, ServerStatus, SessionConfig};

/// mcping - Minecraft server status checker
#[derive(Parser)]
#[command(name = "mcping")]
#[command(author = "mcping Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Ping a Minecraft server for its status and latency", long_about = None)]
struct Cli {
    /// Server to query: hostname, IP address, or minecraft:// URI
    address: Option<String>,

    /// Server port (ignored when the address is a URI carrying one)
    #[arg(short, long)]
    port: Option<u16>,

    /// Number of concurrent pings to issue
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,

    /// Overall timeout per ping in milliseconds
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    let address = cli
        .address
        .or(config.server.address)
        .ok_or_else(|| anyhow::anyhow!("no server address given (argument or config file)"))?;
    let port = cli.port.unwrap_or(config.server.port);

    let session_config = SessionConfig {
        timeout_ms: cli.timeout_ms.unwrap_or(config.session.timeout_ms),
        protocol_version: config.session.protocol_version,
    };

    tracing::info!(%address, count = cli.count, "pinging");

    // Each ping runs as its own task; they share nothing.
    let mut handles = Vec::with_capacity(cli.count as usize);
    for attempt in 1..=cli.count {
        let address = address.clone();
        let session_config = session_config.clone();
        handles.push(tokio::spawn(async move {
            let result = if address.contains("://") {
                ping_uri(&address, &session_config).await
            } else {
                ping(&address, port, &session_config).await
            };
            (attempt, result)
        }));
    }

    let mut failures = 0;
    for handle in handles {
        let (attempt, result) = handle.await?;
        match result {
            Ok(status) => print_status(attempt, cli.count, &status),
            Err(e) => {
                failures += 1;
                eprintln!("PING [{attempt:02}/{:02}] failed: {e}", cli.count);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} of {} pings failed", cli.count);
    }
    Ok(())
}

fn print_status(attempt: u32, count: u32, status: &ServerStatus) {
    let metadata = serde_json::to_string_pretty(&status.metadata)
        .unwrap_or_else(|_| status.metadata.to_string());
    println!("PING [{attempt:02}/{count:02}] {} ms", status.latency_ms);
    println!("{metadata}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["mcping", "play.example.com", "-n", "3"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["mcping", "127.0.0.1"]).unwrap();
        assert_eq!(cli.count, 1);
        assert!(cli.port.is_none());
        assert!(cli.timeout_ms.is_none());
    }
}
