//! `filemesh-tracker`: the coordination server. Loads configuration, bootstraps tracker state
//! from its snapshot (or seed snapshot), and serves the TCP control channel until `Ctrl+C`.

use std::path::PathBuf;

use clap::Parser;
use filemesh::config::Config;
use filemesh::tracker;

/// The filemesh tracker: registry of users, active peers, advertised files, reputation, and
/// chat rooms.
#[derive(Parser, Debug)]
#[command(name = "filemesh-tracker")]
struct Cli {
    /// Path to a JSON configuration file. Falls back to built-in defaults when omitted or
    /// missing; see `Config::load_or_default`.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the listen host (also settable via FILEMESH_TRACKER_HOST).
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port (also settable via FILEMESH_TRACKER_PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    filemesh::logging::init_logging_safe();

    let cli = Cli::parse();
    let mut config = Config::load_or_default(cli.config)?;
    if let Some(host) = cli.host {
        config.tracker.host = host;
    }
    if let Some(port) = cli.port {
        config.tracker.port = port;
    }

    tracker::server::run(config).await?;
    Ok(())
}
