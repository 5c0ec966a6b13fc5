//! The tracker's in-memory indices and the mutations the dispatcher drives.
//!
//! All state lives behind one `tokio::sync::Mutex`, matching the single coarse lock `spec.md` §5
//! explicitly allows in place of `original_source/tracker/tracker_server.py`'s unsynchronized
//! module-level dicts (that script is single-threaded; this tracker is not). The lock is always
//! released before writing to a socket.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{FilemeshError, FilemeshResult};
use crate::models::{ActivePeer, ChatRoom, FileRecord, PeerKey, User};
use crate::protocol::{ActivePeerInfo, AnnouncedFile, FileListing, FilePeerEntry, RoomEvent};
use crate::reputation::Score;

#[derive(Default)]
pub struct TrackerState {
    pub users: HashMap<String, User>,
    pub active_peers: HashMap<PeerKey, ActivePeer>,
    pub files: HashMap<String, FileRecord>,
    pub scores: HashMap<String, Score>,
    pub rooms: HashMap<String, ChatRoom>,
}

/// A point-in-time copy of the durable parts of the registry, for snapshotting.
pub struct SnapshotView {
    pub users: HashMap<String, User>,
    pub scores: HashMap<String, Score>,
    pub rooms: HashMap<String, ChatRoom>,
}

pub struct Tracker {
    state: Mutex<TrackerState>,
}

impl Tracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn from_state(state: TrackerState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> FilemeshResult<()> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(username) {
            return Err(FilemeshError::Conflict(format!(
                "username '{}' is already registered",
                username
            )));
        }
        state
            .users
            .insert(username.to_string(), User::new(username.to_string(), password));
        state.scores.entry(username.to_string()).or_default();
        Ok(())
    }

    pub async fn login(
        &self,
        ip: IpAddr,
        username: &str,
        password: &str,
        port: u16,
    ) -> FilemeshResult<()> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get(username)
            .ok_or_else(|| FilemeshError::Auth(format!("unknown user '{}'", username)))?;
        if !user.verify(password) {
            return Err(FilemeshError::Auth("incorrect password".to_string()));
        }

        // spec.md §3: "a second login for the same user replaces the previous entry" — fold the
        // stale session's uptime into its score and drop it before the new key is inserted,
        // exactly as `logout` would have.
        if let Some(stale_key) = state
            .active_peers
            .iter()
            .find(|(_, peer)| peer.username == username)
            .map(|(key, _)| *key)
        {
            let peer = state.active_peers.remove(&stale_key).expect("key just found");
            let elapsed = (Utc::now() - peer.login_time).num_seconds().max(0) as u64;
            if let Some(score) = state.scores.get_mut(username) {
                score.add_uptime(elapsed);
            }
            for file in state.files.values_mut() {
                file.peers.remove(&stale_key);
            }
        }

        state.active_peers.insert(
            (ip, port),
            ActivePeer {
                username: username.to_string(),
                login_time: Utc::now(),
            },
        );
        state.scores.entry(username.to_string()).or_default();
        Ok(())
    }

    /// Checks that `(ip, port)` is logged in as `username`, per the authorization rule in
    /// `spec.md` §9: every action other than `register`/`login`/`list_files`/`get_scores` must
    /// match the caller's claimed identity against its live session.
    async fn require_active(
        state: &TrackerState,
        ip: IpAddr,
        username: &str,
        port: u16,
    ) -> FilemeshResult<()> {
        match state.active_peers.get(&(ip, port)) {
            Some(peer) if peer.username == username => Ok(()),
            Some(_) => Err(FilemeshError::Auth(
                "session does not belong to the claimed user".to_string(),
            )),
            None => Err(FilemeshError::Auth(
                "not logged in from this address".to_string(),
            )),
        }
    }

    pub async fn logout(&self, ip: IpAddr, username: &str, port: u16) -> FilemeshResult<()> {
        let mut state = self.state.lock().await;
        Self::require_active(&state, ip, username, port).await?;
        if let Some(peer) = state.active_peers.remove(&(ip, port)) {
            let elapsed = (Utc::now() - peer.login_time).num_seconds().max(0) as u64;
            if let Some(score) = state.scores.get_mut(username) {
                score.add_uptime(elapsed);
            }
        }
        for file in state.files.values_mut() {
            file.peers.remove(&(ip, port));
        }
        Ok(())
    }

    pub async fn announce(
        &self,
        ip: IpAddr,
        username: &str,
        port: u16,
        files: Vec<AnnouncedFile>,
    ) -> FilemeshResult<()> {
        let mut state = self.state.lock().await;
        Self::require_active(&state, ip, username, port).await?;
        for f in files {
            let record = state
                .files
                .entry(f.name.clone())
                .or_insert_with(|| FileRecord::new(f.size, f.hash.clone(), f.chunk_hashes.clone()));
            // First-seen metadata wins on conflicting re-announces; only the peer set grows.
            record.peers.insert((ip, port));
        }
        Ok(())
    }

    pub async fn report_upload(&self, ip: IpAddr, username: &str, port: u16) -> FilemeshResult<()> {
        let mut state = self.state.lock().await;
        Self::require_active(&state, ip, username, port).await?;
        state.scores.entry(username.to_string()).or_default().record_upload();
        Ok(())
    }

    pub async fn list_files(&self) -> HashMap<String, FileListing> {
        let state = self.state.lock().await;
        state
            .files
            .iter()
            .map(|(name, record)| {
                let mut peers: Vec<FilePeerEntry> = record
                    .peers
                    .iter()
                    .filter(|key| state.active_peers.contains_key(key))
                    .map(|(ip, port)| {
                        let owner = state
                            .active_peers
                            .get(&(*ip, *port))
                            .map(|p| p.username.clone())
                            .unwrap_or_default();
                        let score = state.scores.get(&owner).cloned().unwrap_or_default();
                        FilePeerEntry {
                            peer: format!("{}:{}", ip, port),
                            score: score.score,
                            tier: score.tier,
                        }
                    })
                    .collect();
                peers.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
                (
                    name.clone(),
                    FileListing {
                        size: record.size,
                        hash: record.file_hash.clone(),
                        chunk_hashes: record.chunk_hashes.clone(),
                        peers,
                    },
                )
            })
            .collect()
    }

    pub async fn get_scores(&self) -> Vec<(String, Score)> {
        let state = self.state.lock().await;
        let mut scores: Vec<(String, Score)> = state
            .scores
            .iter()
            .map(|(name, score)| (name.clone(), score.clone()))
            .collect();
        scores.sort_by(|a, b| b.1.score.partial_cmp(&a.1.score).unwrap());
        scores
    }

    /// `spec.md` §4.4: `get_peer_score` of an unknown user defaults to `0, bronze` rather than
    /// failing, matching `original_source/tracker/tracker_server.py`'s unconditional
    /// `{"status": True, "score": sc}` reply.
    pub async fn get_peer_score(&self, target_username: &str) -> FilemeshResult<Score> {
        let state = self.state.lock().await;
        Ok(state
            .scores
            .get(target_username)
            .cloned()
            .unwrap_or_default())
    }

    pub async fn get_active_peers(
        &self,
        ip: IpAddr,
        username: &str,
        port: u16,
    ) -> FilemeshResult<Vec<ActivePeerInfo>> {
        let state = self.state.lock().await;
        Self::require_active(&state, ip, username, port).await?;
        Ok(state
            .active_peers
            .iter()
            .filter(|(key, _)| **key != (ip, port))
            .map(|((peer_ip, peer_port), peer)| ActivePeerInfo {
                username: peer.username.clone(),
                address: format!("{}:{}", peer_ip, peer_port),
            })
            .collect())
    }

    pub async fn create_room(
        &self,
        ip: IpAddr,
        username: &str,
        port: u16,
        room_name: &str,
    ) -> FilemeshResult<()> {
        let mut state = self.state.lock().await;
        Self::require_active(&state, ip, username, port).await?;
        if let Some(existing) = state.rooms.get(room_name) {
            if !existing.old {
                return Err(FilemeshError::Conflict(format!(
                    "room '{}' already exists",
                    room_name
                )));
            }
        }
        state.rooms.insert(
            room_name.to_string(),
            ChatRoom::new(username.to_string(), format!("{}:{}", ip, port)),
        );
        Ok(())
    }

    pub async fn list_rooms(&self) -> HashMap<String, ChatRoom> {
        let state = self.state.lock().await;
        state
            .rooms
            .iter()
            .filter(|(_, room)| !room.old)
            .map(|(name, room)| (name.clone(), room.clone()))
            .collect()
    }

    pub async fn delete_room(&self, username: &str, room_name: &str) -> FilemeshResult<()> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .get(room_name)
            .ok_or_else(|| FilemeshError::Conflict(format!("room '{}' does not exist", room_name)))?;
        if room.moderator != username {
            return Err(FilemeshError::Auth(
                "only the moderator may delete this room".to_string(),
            ));
        }
        state.rooms.remove(room_name);
        Ok(())
    }

    pub async fn room_member_update(
        &self,
        username: &str,
        room_name: &str,
        event: RoomEvent,
    ) -> FilemeshResult<()> {
        let mut state = self.state.lock().await;
        let room = state
            .rooms
            .get_mut(room_name)
            .ok_or_else(|| FilemeshError::Conflict(format!("room '{}' does not exist", room_name)))?;
        match event {
            RoomEvent::Join => {
                if !room.members.iter().any(|m| m == username) {
                    room.members.push(username.to_string());
                }
            }
            RoomEvent::Leave => {
                room.members.retain(|m| m != username);
            }
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> SnapshotView {
        let state = self.state.lock().await;
        SnapshotView {
            users: state.users.clone(),
            scores: state.scores.clone(),
            rooms: state.rooms.clone(),
        }
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}
