//! Runnable Callboard server.
//!
//! # Usage
//!
//! ```bash
//! # Local development
//! callboard-server --addr 127.0.0.1:8080
//!
//! # Behind a platform that hands out the port
//! PORT=9000 callboard-server --think-delay-ms 500
//! ```

use std::time::Duration;

use callboard::prelude::*;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Callboard game server
#[derive(Parser, Debug)]
#[command(name = "callboard-server")]
#[command(about = "Server for the two-player call-a-number board game")]
#[command(version)]
struct Args {
    /// Full address to bind to. Takes precedence over --port
    #[arg(long, env = "CALLBOARD_ADDR")]
    addr: Option<String>,

    /// Port to bind on all interfaces
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// How long the computer opponent thinks before calling, in milliseconds
    #[arg(long, env = "CALLBOARD_THINK_DELAY_MS")]
    think_delay_ms: Option<u64>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::default();
        if let Some(addr) = &self.addr {
            config.bind_addr = addr.clone();
        } else if let Some(port) = self.port {
            config.bind_addr = format!("0.0.0.0:{port}");
        }
        if let Some(ms) = self.think_delay_ms {
            config.room.simulated_think_delay = Duration::from_millis(ms);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), CallboardError> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    let config = args.server_config();
    tracing::info!(
        addr = %config.bind_addr,
        think_delay = ?config.room.simulated_think_delay,
        "starting callboard server"
    );

    let server = CallboardServer::builder().config(config).build().await?;
    server.run().await
}
