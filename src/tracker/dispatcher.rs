//! Per-connection request handling: one JSON request in, one JSON response out, then the
//! connection closes. Mirrors `original_source/tracker/tracker_server.py`'s `handle_request`
//! action table, but as an exhaustive match over [`TrackerRequest`] instead of a chain of
//! `if action == "..."` string comparisons.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpStream;

use crate::protocol::{TrackerRequest, TrackerResponse};
use crate::tracker::registry::Tracker;
use crate::tracker::snapshot::{self, SnapshotData};
use crate::wire;

/// Handle a single accepted connection end to end: read one request, dispatch it, write one
/// response. Any error — malformed JSON, an unknown action, a registry rejection — becomes a
/// `status: false` response rather than dropping the connection, except when the peer disconnects
/// before sending anything.
///
/// `snapshot_path` is `None` in tests that exercise dispatch logic without touching disk.
pub async fn handle_connection(
    tracker: Arc<Tracker>,
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    snapshot_path: Option<Arc<std::path::PathBuf>>,
) {
    let request: TrackerRequest = match wire::read_json(&mut stream).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(%peer_addr, error = %e, "failed to read request");
            let _ = wire::write_json(&mut stream, &TrackerResponse::exception(e.to_string())).await;
            return;
        }
    };

    let response = dispatch(&tracker, peer_addr, request, snapshot_path.as_deref()).await;

    if let Err(e) = wire::write_json(&mut stream, &response).await {
        tracing::warn!(%peer_addr, error = %e, "failed to write response");
    }
}

/// Write-through persistence for the durable parts of tracker state (users, scores, rooms), per
/// `spec.md` §4.2: "every mutation that changes users/scores/rooms triggers a snapshot write".
/// Failures are logged and swallowed — in-memory state remains authoritative (PersistenceError,
/// `spec.md` §7).
async fn persist(tracker: &Tracker, snapshot_path: Option<&Path>) {
    let Some(path) = snapshot_path else {
        return;
    };
    let view = tracker.snapshot().await;
    let data = SnapshotData::from(&view);
    if let Err(e) = snapshot::save(&data, path) {
        tracing::error!(error = %e, "failed to persist tracker snapshot");
    }
}

async fn dispatch(
    tracker: &Tracker,
    peer_addr: SocketAddr,
    request: TrackerRequest,
    snapshot_path: Option<&Path>,
) -> TrackerResponse {
    let ip = peer_addr.ip();

    match request {
        TrackerRequest::Register { username, password } => {
            match tracker.register(&username, &password).await {
                Ok(()) => {
                    persist(tracker, snapshot_path).await;
                    TrackerResponse::ok_with_message("registered")
                }
                Err(e) => TrackerResponse::fail(e.to_string()),
            }
        }

        TrackerRequest::Login {
            username,
            password,
            port,
        } => match tracker.login(ip, &username, &password, port).await {
            Ok(()) => TrackerResponse::ok_with_message("logged in"),
            Err(e) => TrackerResponse::fail(e.to_string()),
        },

        TrackerRequest::Logout { username, port } => match tracker.logout(ip, &username, port).await
        {
            Ok(()) => {
                persist(tracker, snapshot_path).await;
                TrackerResponse::ok_with_message("logged out")
            }
            Err(e) => TrackerResponse::fail(e.to_string()),
        },

        TrackerRequest::Announce {
            port,
            username,
            files,
        } => match tracker.announce(ip, &username, port, files).await {
            Ok(()) => TrackerResponse::ok(),
            Err(e) => TrackerResponse::fail(e.to_string()),
        },

        TrackerRequest::ListFiles {} => TrackerResponse {
            files: Some(tracker.list_files().await),
            ..Default::default()
        },

        TrackerRequest::ReportUpload { username, port } => {
            match tracker.report_upload(ip, &username, port).await {
                Ok(()) => {
                    persist(tracker, snapshot_path).await;
                    TrackerResponse::ok()
                }
                Err(e) => TrackerResponse::fail(e.to_string()),
            }
        }

        TrackerRequest::GetScores {} => TrackerResponse {
            status: Some(true),
            scores: Some(tracker.get_scores().await),
            ..Default::default()
        },

        TrackerRequest::GetPeerScore { target_username } => {
            match tracker.get_peer_score(&target_username).await {
                Ok(score) => TrackerResponse {
                    status: Some(true),
                    score: Some(score.score),
                    tier: Some(score.tier),
                    ..Default::default()
                },
                Err(e) => TrackerResponse::fail(e.to_string()),
            }
        }

        TrackerRequest::GetActivePeers { port, username } => {
            match tracker.get_active_peers(ip, &username, port).await {
                Ok(peers) => TrackerResponse {
                    status: Some(true),
                    peers: Some(peers),
                    ..Default::default()
                },
                Err(e) => TrackerResponse::fail(e.to_string()),
            }
        }

        TrackerRequest::CreateRoom {
            room_name,
            port,
            username,
        } => match tracker.create_room(ip, &username, port, &room_name).await {
            Ok(()) => {
                persist(tracker, snapshot_path).await;
                TrackerResponse::ok()
            }
            Err(e) => TrackerResponse::fail(e.to_string()),
        },

        TrackerRequest::ListRooms {} => TrackerResponse {
            status: Some(true),
            rooms: Some(tracker.list_rooms().await),
            ..Default::default()
        },

        TrackerRequest::DeleteRoom {
            room_name,
            username,
        } => match tracker.delete_room(&username, &room_name).await {
            Ok(()) => {
                persist(tracker, snapshot_path).await;
                TrackerResponse::ok()
            }
            Err(e) => TrackerResponse::fail(e.to_string()),
        },

        TrackerRequest::RoomMemberUpdate {
            room_name,
            username,
            event,
        } => match tracker.room_member_update(&username, &room_name, event).await {
            Ok(()) => {
                persist(tracker, snapshot_path).await;
                TrackerResponse::ok()
            }
            Err(e) => TrackerResponse::fail(e.to_string()),
        },
    }
}
