use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use std::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "3000")]
    port: u16,
    /// Maximum number of connected players
    #[clap(short, long, default_value = "64")]
    max_clients: usize,
    /// Minimum gap between accepted move commands, in milliseconds
    #[clap(long, default_value = "50")]
    move_interval: u64,
    /// Seconds without activity before a player is disconnected
    #[clap(long, default_value = "300")]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients,
        ..ServerConfig::default()
    };
    config.game.move_interval_ms = args.move_interval;
    config.game.idle_timeout = Duration::from_secs(args.idle_timeout);

    let mut server = Server::bind(config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
