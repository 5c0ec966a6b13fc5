/// End-to-end integration tests for filemesh's tracker and download engine.
///
/// These exercise the scenarios in `spec.md` §8 against a real tracker bound to a loopback
/// TCP port and, where a scenario needs a chunk source, a minimal hand-rolled peer listener
/// that stands in for `filemesh::peer::service::PeerService`.
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use filemesh::protocol::{PeerRequest, RoomEvent, TrackerRequest, TrackerResponse};
use filemesh::reputation::Tier;
use filemesh::tracker::dispatcher::handle_connection;
use filemesh::tracker::registry::Tracker;
use filemesh::{chunking, wire};

/// Spins up a tracker on an OS-assigned loopback port, with snapshotting disabled. Returns the
/// bound address; the tracker runs for the lifetime of the test process (connections close
/// themselves, so nothing needs shutting down).
async fn spawn_tracker() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let tracker = Arc::new(Tracker::new());

    tokio::spawn(async move {
        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => continue,
            };
            let tracker = tracker.clone();
            tokio::spawn(async move {
                handle_connection(tracker, stream, peer_addr, None).await;
            });
        }
    });

    addr
}

async fn call(addr: SocketAddr, request: TrackerRequest) -> TrackerResponse {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    wire::write_json(&mut stream, &request).await.unwrap();
    wire::read_json(&mut stream).await.unwrap()
}

/// A single-shot peer listener that replies to exactly one `request_chunk` per item in
/// `responses`, in order, then stops accepting. Stands in for the real peer service endpoint
/// for download-engine tests that don't need tier delays or tracker upload reporting.
async fn spawn_chunk_source(responses: Vec<Vec<u8>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for response in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let _request: PeerRequest = wire::read_json(&mut stream).await.unwrap();
            wire::write_chunk_and_shutdown(&mut stream, &response).await.unwrap();
        }
    });

    addr
}

/// A long-lived peer listener that answers every `request_chunk` with the bytes for that
/// chunk index, regardless of connection order. Used where more than one chunk/peer is in
/// play and a single-shot mock would make the round-robin peer assignment order-sensitive.
async fn spawn_indexed_chunk_source(chunks: std::collections::HashMap<usize, Vec<u8>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(pair) => pair,
                Err(_) => break,
            };
            let chunks = chunks.clone();
            tokio::spawn(async move {
                let request: PeerRequest = match wire::read_json(&mut stream).await {
                    Ok(r) => r,
                    Err(_) => return,
                };
                if let PeerRequest::RequestChunk { chunk_index, .. } = request {
                    if let Some(bytes) = chunks.get(&chunk_index) {
                        let _ = wire::write_chunk_and_shutdown(&mut stream, bytes).await;
                    }
                }
            });
        }
    });

    addr
}

/// A listener that accepts and immediately drops every connection, simulating a peer that
/// refuses to serve a chunk.
async fn spawn_refusing_source() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => drop(stream),
                Err(_) => break,
            }
        }
    });

    addr
}

/// Scenario A (`spec.md` §8): register, login, announce, list_files.
#[tokio::test]
async fn register_login_announce_list_round_trip() {
    let addr = spawn_tracker().await;

    let reg = call(
        addr,
        TrackerRequest::Register {
            username: "u1".to_string(),
            password: "pw".to_string(),
        },
    )
    .await;
    assert_eq!(reg.status, Some(true));

    let login = call(
        addr,
        TrackerRequest::Login {
            username: "u1".to_string(),
            password: "pw".to_string(),
            port: 7001,
        },
    )
    .await;
    assert_eq!(login.status, Some(true));

    let announce = call(
        addr,
        TrackerRequest::Announce {
            port: 7001,
            username: "u1".to_string(),
            files: vec![filemesh::protocol::AnnouncedFile {
                name: "doc.bin".to_string(),
                size: 3 * 1024 * 1024,
                hash: "H".to_string(),
                chunk_hashes: vec!["h0".to_string(), "h1".to_string(), "h2".to_string()],
            }],
        },
    )
    .await;
    assert_eq!(announce.status, Some(true));

    let register_u2 = call(
        addr,
        TrackerRequest::Register {
            username: "u2".to_string(),
            password: "pw2".to_string(),
        },
    )
    .await;
    assert_eq!(register_u2.status, Some(true));
    call(
        addr,
        TrackerRequest::Login {
            username: "u2".to_string(),
            password: "pw2".to_string(),
            port: 7002,
        },
    )
    .await;

    let listing = call(addr, TrackerRequest::ListFiles {}).await;
    let files = listing.files.unwrap();
    assert_eq!(files.len(), 1);
    let doc = &files["doc.bin"];
    assert_eq!(doc.size, 3 * 1024 * 1024);
    assert_eq!(doc.hash, "H");
    assert_eq!(doc.chunk_hashes, vec!["h0", "h1", "h2"]);
    assert_eq!(doc.peers.len(), 1);
    assert_eq!(doc.peers[0].score, 0.0);
    assert_eq!(doc.peers[0].tier, Tier::Bronze);
}

/// Scenario F (`spec.md` §8): only the room's moderator may delete it.
#[tokio::test]
async fn only_moderator_can_delete_room_end_to_end() {
    let addr = spawn_tracker().await;

    call(
        addr,
        TrackerRequest::Register {
            username: "u1".to_string(),
            password: "pw".to_string(),
        },
    )
    .await;
    call(
        addr,
        TrackerRequest::Login {
            username: "u1".to_string(),
            password: "pw".to_string(),
            port: 7100,
        },
    )
    .await;
    call(
        addr,
        TrackerRequest::Register {
            username: "u2".to_string(),
            password: "pw".to_string(),
        },
    )
    .await;
    call(
        addr,
        TrackerRequest::Login {
            username: "u2".to_string(),
            password: "pw".to_string(),
            port: 7101,
        },
    )
    .await;

    let create = call(
        addr,
        TrackerRequest::CreateRoom {
            room_name: "R".to_string(),
            port: 7100,
            username: "u1".to_string(),
        },
    )
    .await;
    assert_eq!(create.status, Some(true));

    let denied = call(
        addr,
        TrackerRequest::DeleteRoom {
            room_name: "R".to_string(),
            username: "u2".to_string(),
        },
    )
    .await;
    assert_eq!(denied.status, Some(false));

    let allowed = call(
        addr,
        TrackerRequest::DeleteRoom {
            room_name: "R".to_string(),
            username: "u1".to_string(),
        },
    )
    .await;
    assert_eq!(allowed.status, Some(true));

    let rooms = call(addr, TrackerRequest::ListRooms {}).await;
    assert!(!rooms.rooms.unwrap().contains_key("R"));
}

#[tokio::test]
async fn room_member_join_and_leave_updates_membership() {
    let addr = spawn_tracker().await;
    call(
        addr,
        TrackerRequest::Register {
            username: "mod".to_string(),
            password: "pw".to_string(),
        },
    )
    .await;
    call(
        addr,
        TrackerRequest::Login {
            username: "mod".to_string(),
            password: "pw".to_string(),
            port: 7200,
        },
    )
    .await;
    call(
        addr,
        TrackerRequest::CreateRoom {
            room_name: "lobby".to_string(),
            port: 7200,
            username: "mod".to_string(),
        },
    )
    .await;

    call(
        addr,
        TrackerRequest::RoomMemberUpdate {
            room_name: "lobby".to_string(),
            username: "guest".to_string(),
            event: RoomEvent::Join,
        },
    )
    .await;
    let rooms = call(addr, TrackerRequest::ListRooms {}).await.rooms.unwrap();
    assert!(rooms["lobby"].members.contains(&"guest".to_string()));

    call(
        addr,
        TrackerRequest::RoomMemberUpdate {
            room_name: "lobby".to_string(),
            username: "guest".to_string(),
            event: RoomEvent::Leave,
        },
    )
    .await;
    let rooms = call(addr, TrackerRequest::ListRooms {}).await.rooms.unwrap();
    assert!(!rooms["lobby"].members.contains(&"guest".to_string()));
}

/// `spec.md` §3/§4.4: logging out removes the peer from `active_peers` and from every
/// `FileRecord.peers`, so it drops out of subsequent `list_files` replies.
#[tokio::test]
async fn logout_removes_peer_from_active_set_and_file_listings() {
    let addr = spawn_tracker().await;
    call(
        addr,
        TrackerRequest::Register {
            username: "u1".to_string(),
            password: "pw".to_string(),
        },
    )
    .await;
    call(
        addr,
        TrackerRequest::Login {
            username: "u1".to_string(),
            password: "pw".to_string(),
            port: 7300,
        },
    )
    .await;
    call(
        addr,
        TrackerRequest::Announce {
            port: 7300,
            username: "u1".to_string(),
            files: vec![filemesh::protocol::AnnouncedFile {
                name: "f.bin".to_string(),
                size: 10,
                hash: "h".to_string(),
                chunk_hashes: vec!["c0".to_string()],
            }],
        },
    )
    .await;

    call(
        addr,
        TrackerRequest::Logout {
            username: "u1".to_string(),
            port: 7300,
        },
    )
    .await;

    let files = call(addr, TrackerRequest::ListFiles {}).await.files.unwrap();
    assert!(files["f.bin"].peers.is_empty());
}

/// Scenario D (`spec.md` §8): a source peer returns corrupt bytes twice before the correct
/// bytes; the download completes with the chunk retried rather than failing outright.
#[tokio::test]
async fn corrupted_chunk_is_retried_until_correct() {
    let correct = b"the real chunk payload".to_vec();
    let correct_hash = chunking::sha256_hex(&correct);

    let peer_addr = spawn_chunk_source(vec![
        b"garbage one".to_vec(),
        b"garbage two".to_vec(),
        correct.clone(),
    ])
    .await;

    let downloads_dir = tempfile::tempdir().unwrap();
    let result = filemesh::peer::download::download_file(
        "f.bin",
        &correct_hash,
        vec![correct_hash.clone()],
        vec![peer_addr.to_string()],
        Tier::Bronze,
        "alice".to_string(),
        downloads_dir.path(),
    )
    .await
    .unwrap();

    let bytes = tokio::fs::read(&result).await.unwrap();
    assert_eq!(bytes, correct);
}

/// Scenario E (`spec.md` §8): a chunk whose only source refuses every connection fails
/// permanently and leaves no reassembled file behind.
#[tokio::test]
async fn permanently_unreachable_peer_fails_the_download() {
    let peer_addr = spawn_refusing_source().await;

    let downloads_dir = tempfile::tempdir().unwrap();
    let err = filemesh::peer::download::download_file(
        "f.bin",
        "deadbeef",
        vec!["expected-hash".to_string()],
        vec![peer_addr.to_string()],
        Tier::Bronze,
        "alice".to_string(),
        downloads_dir.path(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, filemesh::error::FilemeshError::Integrity(_)));
    assert!(!downloads_dir.path().join("f.bin").exists());
}

/// Scenario C (`spec.md` §8): a multi-chunk download with several live sources opens exactly
/// `min(tier_workers, peer_count)` workers worth of concurrency, observable as every chunk
/// landing correctly regardless of which peer answered it.
#[tokio::test]
async fn multi_chunk_download_pulls_from_every_peer() {
    let chunk0 = b"chunk zero bytes".to_vec();
    let chunk1 = b"chunk one bytes!".to_vec();
    let hash0 = chunking::sha256_hex(&chunk0);
    let hash1 = chunking::sha256_hex(&chunk1);

    let peer_a = spawn_indexed_chunk_source(std::collections::HashMap::from([(0, chunk0.clone())])).await;
    let peer_b = spawn_indexed_chunk_source(std::collections::HashMap::from([(1, chunk1.clone())])).await;

    let downloads_dir = tempfile::tempdir().unwrap();
    let mut combined = chunk0.clone();
    combined.extend_from_slice(&chunk1);
    let file_hash = chunking::sha256_hex(&combined);

    let result = filemesh::peer::download::download_file(
        "multi.bin",
        &file_hash,
        vec![hash0, hash1],
        vec![peer_a.to_string(), peer_b.to_string()],
        Tier::Diamante,
        "alice".to_string(),
        downloads_dir.path(),
    )
    .await
    .unwrap();

    let bytes = tokio::fs::read(&result).await.unwrap();
    assert_eq!(bytes, combined);
}
