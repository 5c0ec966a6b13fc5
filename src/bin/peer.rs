//! `filemesh-peer`: the peer daemon and its scriptable CLI.
//!
//! `spec.md` §6 treats the interactive menu as an external collaborator; this binary is the
//! minimum non-interactive surface the in-scope engines need to be exercised (`SPEC_FULL.md`
//! §4.7). `login` binds the peer service endpoint and runs it in the foreground; every other
//! subcommand is a short-lived invocation that reads the session `login` wrote to identify
//! itself to the tracker (see `filemesh::peer::session`).

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use filemesh::chunking;
use filemesh::config::Config;
use filemesh::error::{FilemeshError, FilemeshResult};
use filemesh::peer::chat::DefaultChatHandler;
use filemesh::peer::download::download_file_with_progress;
use filemesh::peer::session::PeerSession;
use filemesh::peer::{PeerService, TrackerClient};
use filemesh::protocol::{AnnouncedFile, PeerRequest, RoomEvent};
use filemesh::ui;
use filemesh::wire;
use tokio::net::{TcpListener, TcpStream};

#[derive(Parser, Debug)]
#[command(name = "filemesh-peer")]
struct Cli {
    /// Path to a JSON configuration file. Falls back to built-in defaults when omitted.
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a new account with the tracker.
    Register {
        #[arg(long)]
        username: String,
        /// Prompted interactively if omitted.
        #[arg(long)]
        password: Option<String>,
    },

    /// Log in, bind the peer service endpoint, and serve chunk requests until Ctrl+C.
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: Option<String>,
        /// Port for the peer service endpoint. 0 lets the OS assign one.
        #[arg(long, default_value_t = 0)]
        port: u16,
    },

    /// Log out of the tracker and clear the local session.
    Logout,

    /// Chunk and advertise every file under the configured shared directory.
    Announce,

    /// List files the tracker knows about, with their source peers.
    List,

    /// Download a file by name using the parallel chunk-fetching engine.
    Download {
        file_name: String,
    },

    /// Print the reputation leaderboard.
    Ranking,

    /// Chat room lifecycle, served by the tracker.
    #[command(subcommand)]
    Rooms(RoomsCommand),

    /// Open a chat handshake with another logged-in peer.
    Chat {
        username: String,
    },
}

#[derive(Subcommand, Debug)]
enum RoomsCommand {
    Create { room_name: String },
    List,
    Delete { room_name: String },
    Join { room_name: String },
    Leave { room_name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    filemesh::logging::init_logging_safe();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config)?;

    if let Err(e) = run(config, cli.command).await {
        ui::print_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

async fn run(config: Config, command: Commands) -> FilemeshResult<()> {
    let client = TrackerClient::new(config.tracker_addr());

    match command {
        Commands::Register { username, password } => {
            let password = password.unwrap_or_else(|| prompt_password("Password: "));
            let response = client.register(&username, &password).await?;
            report(&response, "registered");
        }

        Commands::Login {
            username,
            password,
            port,
        } => {
            let password = password.unwrap_or_else(|| prompt_password("Password: "));
            login_and_serve(&config, &client, username, password, port).await?;
        }

        Commands::Logout => logout(&client).await?,

        Commands::Announce => announce(&config, &client).await?,

        Commands::List => list_files(&client).await?,

        Commands::Download { file_name } => download(&config, &client, &file_name).await?,

        Commands::Ranking => ranking(&client).await?,

        Commands::Rooms(cmd) => rooms(&client, cmd).await?,

        Commands::Chat { username } => chat(&client, &username).await?,
    }

    Ok(())
}

fn prompt_password(prompt: &str) -> String {
    rpassword::prompt_password(prompt).unwrap_or_default()
}

fn report(response: &filemesh::protocol::TrackerResponse, verb: &str) {
    if response.is_ok() {
        ui::print_success(response.message.as_deref().unwrap_or(verb));
    } else {
        let reason = response
            .message
            .as_deref()
            .or(response.error.as_deref())
            .unwrap_or("request failed");
        ui::print_error(reason);
    }
}

fn current_session() -> FilemeshResult<PeerSession> {
    PeerSession::load().ok_or_else(|| {
        FilemeshError::Auth("not logged in; run `filemesh-peer login` first".to_string())
    })
}

async fn login_and_serve(
    config: &Config,
    client: &TrackerClient,
    username: String,
    password: String,
    port: u16,
) -> FilemeshResult<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    let bound_port = listener.local_addr()?.port();

    let response = client.login(&username, &password, bound_port).await?;
    if !response.is_ok() {
        return Err(FilemeshError::Auth(
            response.message.unwrap_or_else(|| "login rejected".to_string()),
        ));
    }

    let session = PeerSession {
        username: username.clone(),
        port: bound_port,
        tracker_addr: config.tracker_addr(),
    };
    session.save()?;
    ui::print_success(&format!(
        "logged in as '{}', serving on port {}",
        username, bound_port
    ));

    let service_tracker_client = Arc::new(TrackerClient::new(config.tracker_addr()));
    let service = Arc::new(PeerService::new(
        config.peer.shared_dir.clone(),
        username.clone(),
        bound_port,
        service_tracker_client.clone(),
        Arc::new(DefaultChatHandler::new(service_tracker_client)),
    ));

    tokio::select! {
        result = service.run(listener) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "peer service endpoint exited");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, logging out");
        }
    }

    let _ = client.logout(&username, bound_port).await;
    PeerSession::clear();
    Ok(())
}

async fn logout(client: &TrackerClient) -> FilemeshResult<()> {
    let session = current_session()?;
    let response = client.logout(&session.username, session.port).await?;
    PeerSession::clear();
    report(&response, "logged out");
    Ok(())
}

/// Chunks and advertises every regular file under `config.peer.shared_dir`.
async fn announce(config: &Config, client: &TrackerClient) -> FilemeshResult<()> {
    let session = current_session()?;

    let mut entries = tokio::fs::read_dir(&config.peer.shared_dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let size = entry.metadata().await?.len();

        let split = chunking::split_file(&path)?;
        files.push(AnnouncedFile {
            name: file_name,
            size,
            hash: split.file_hash,
            chunk_hashes: split.chunk_hashes,
        });
    }

    if files.is_empty() {
        ui::print_info("no files found under the shared directory");
        return Ok(());
    }

    let names: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    let response = client.announce(&session.username, session.port, files).await?;
    if response.is_ok() {
        ui::print_success(&format!("announced {} file(s): {}", names.len(), names.join(", ")));
    } else {
        report(&response, "announce");
    }
    Ok(())
}

async fn list_files(client: &TrackerClient) -> FilemeshResult<()> {
    let files = client.list_files().await?;
    if files.is_empty() {
        ui::print_info("no files advertised yet");
        return Ok(());
    }

    ui::print_section("Files");
    let rows: Vec<Vec<String>> = files
        .iter()
        .map(|(name, listing)| {
            let peers = listing
                .peers
                .iter()
                .map(|p| format!("{} ({:.2}/{})", p.peer, p.score, p.tier))
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                name.clone(),
                ui::format_file_size(listing.size),
                listing.chunk_hashes.len().to_string(),
                peers,
            ]
        })
        .collect();
    ui::print_table(&["name", "size", "chunks", "peers"], &rows);
    Ok(())
}

async fn download(config: &Config, client: &TrackerClient, file_name: &str) -> FilemeshResult<()> {
    let session = current_session()?;
    let files = client.list_files().await?;
    let listing = files
        .get(file_name)
        .ok_or_else(|| FilemeshError::Generic(format!("'{}' is not advertised by any peer", file_name)))?
        .clone();

    let (_, tier) = client.get_peer_score(&session.username).await?;
    let peer_addrs: Vec<String> = listing.peers.iter().map(|p| p.peer.clone()).collect();

    ui::print_info(&format!(
        "downloading '{}' ({}) from {} peer(s) as {} tier",
        file_name,
        ui::format_file_size(listing.size),
        peer_addrs.len(),
        ui::colored_tier(&tier.to_string())
    ));

    let progress = Arc::new(ui::DownloadProgress::new(listing.chunk_hashes.len() as u64));
    let hook = {
        let progress = progress.clone();
        Arc::new(move || progress.inc()) as filemesh::peer::download::ProgressHook
    };

    let path = download_file_with_progress(
        file_name,
        &listing.hash,
        listing.chunk_hashes,
        peer_addrs,
        tier,
        session.username,
        &config.peer.downloads_dir,
        Some(hook),
    )
    .await;
    progress.finish_with_message(if path.is_ok() { "done" } else { "failed" });
    let path = path?;

    ui::print_success(&format!("downloaded to {}", path.display()));
    Ok(())
}

async fn ranking(client: &TrackerClient) -> FilemeshResult<()> {
    let scores = client.get_scores().await?;
    if scores.is_empty() {
        ui::print_info("no scores recorded yet");
        return Ok(());
    }

    ui::print_section("Reputation Ranking");
    let rows: Vec<Vec<String>> = scores
        .iter()
        .map(|(username, score)| {
            vec![
                username.clone(),
                format!("{:.2}", score.score),
                score.tier.to_string(),
                score.uploads.to_string(),
                score.uptime_seconds.to_string(),
            ]
        })
        .collect();
    ui::print_table(&["username", "score", "tier", "uploads", "uptime(s)"], &rows);
    Ok(())
}

async fn rooms(client: &TrackerClient, cmd: RoomsCommand) -> FilemeshResult<()> {
    match cmd {
        RoomsCommand::Create { room_name } => {
            let session = current_session()?;
            let response = client
                .create_room(&session.username, session.port, &room_name)
                .await?;
            report(&response, "room created");
        }
        RoomsCommand::List => {
            let rooms = client.list_rooms().await?;
            if rooms.is_empty() {
                ui::print_info("no active rooms");
                return Ok(());
            }
            ui::print_section("Rooms");
            for (name, room) in rooms {
                ui::print_key_value(&name, &format!("moderator={} members={}", room.moderator, room.members.len()));
            }
        }
        RoomsCommand::Delete { room_name } => {
            let session = current_session()?;
            let response = client.delete_room(&session.username, &room_name).await?;
            report(&response, "room deleted");
        }
        RoomsCommand::Join { room_name } => {
            let session = current_session()?;
            let response = client
                .room_member_update(&session.username, &room_name, RoomEvent::Join)
                .await?;
            report(&response, "joined room");
        }
        RoomsCommand::Leave { room_name } => {
            let session = current_session()?;
            let response = client
                .room_member_update(&session.username, &room_name, RoomEvent::Leave)
                .await?;
            report(&response, "left room");
        }
    }
    Ok(())
}

/// Opens a chat handshake with `target_username`'s peer service endpoint and blocks until the
/// remote side closes the connection. Interactive chat sessions are out of scope (`spec.md` §1);
/// this exercises the hand-off hook the endpoint provides (`spec.md` §4.5).
async fn chat(client: &TrackerClient, target_username: &str) -> FilemeshResult<()> {
    let session = current_session()?;
    let peers = client
        .get_active_peers(&session.username, session.port)
        .await?;
    let target = peers
        .into_iter()
        .find(|p| p.username == target_username)
        .ok_or_else(|| FilemeshError::Generic(format!("'{}' is not currently online", target_username)))?;

    let mut stream = TcpStream::connect(&target.address).await?;
    wire::write_json(
        &mut stream,
        &PeerRequest::InitiateChat {
            from_user: session.username,
        },
    )
    .await?;
    let _ = wire::read_to_eof(&mut stream).await;
    ui::print_info(&format!("chat session with '{}' ended", target_username));
    Ok(())
}
