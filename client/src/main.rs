use clap::Parser;
use client::network::{Client, ClientConfig};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,

    /// Display name; the server picks one if omitted
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,

    /// Seconds between scene changes (0 stays in the starting scene)
    #[arg(long, default_value = "0")]
    scene_hop: u64,

    /// Disconnect after this many seconds
    #[arg(short = 'd', long)]
    duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ClientConfig {
        server_addr: args.server,
        name: args.name,
        fake_ping_ms: args.fake_ping,
        scene_hop_interval: (args.scene_hop > 0).then(|| Duration::from_secs(args.scene_hop)),
        ..ClientConfig::default()
    };
    if config.fake_ping_ms > 0 {
        info!("Simulating {}ms latency", config.fake_ping_ms);
    }

    let mut client = Client::connect(config).await?;
    client.request_scene_state().await?;

    tokio::select! {
        result = client.run(args.duration.map(Duration::from_secs)) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
