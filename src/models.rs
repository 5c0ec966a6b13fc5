//! Core data model: users, active peer sessions, advertised files, and chat rooms. See
//! `spec.md` §3.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::net::IpAddr;

/// Key identifying a peer's session: the IP address it connected from plus the TCP port its
/// peer service endpoint listens on.
pub type PeerKey = (IpAddr, u16);

/// SHA-256 hex of a UTF-8 password. No salt, no KDF — see DESIGN.md.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub password_hash: String,
}

impl User {
    pub fn new(username: String, password: &str) -> Self {
        Self {
            username,
            password_hash: hash_password(password),
        }
    }

    pub fn verify(&self, password: &str) -> bool {
        self.password_hash == hash_password(password)
    }
}

/// A peer currently logged in, keyed by `(ip, listening_port)`. Not persisted: session-lived
/// only.
#[derive(Debug, Clone)]
pub struct ActivePeer {
    pub username: String,
    pub login_time: chrono::DateTime<chrono::Utc>,
}

/// Metadata for an advertised file, keyed by filename. Not persisted: `peers` only makes sense
/// relative to the current set of active peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub size: u64,
    pub file_hash: String,
    pub chunk_hashes: Vec<String>,
    pub peers: HashSet<PeerKey>,
}

impl FileRecord {
    pub fn new(size: u64, file_hash: String, chunk_hashes: Vec<String>) -> Self {
        Self {
            size,
            file_hash,
            chunk_hashes,
            peers: HashSet::new(),
        }
    }
}

/// A chat room. `old` is set when the room is loaded from a snapshot, hiding it from
/// `list_rooms` because its moderator peer is not currently live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    pub moderator: String,
    pub address: String,
    pub members: Vec<String>,
    #[serde(default)]
    pub old: bool,
}

impl ChatRoom {
    pub fn new(moderator: String, address: String) -> Self {
        Self {
            moderator,
            address,
            members: Vec::new(),
            old: false,
        }
    }
}
