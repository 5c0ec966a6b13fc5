//! Wire protocol: the tagged-variant request unions for the tracker and the peer service
//! endpoint, and the reply shapes they produce. The on-wire JSON shape is unchanged from
//! `original_source/tracker/tracker_server.py`'s ad hoc dicts; only the Rust-side representation
//! is a tagged enum + exhaustive match, per the REDESIGN FLAG in `spec.md` §9.

use crate::reputation::{Score, Tier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::ChatRoom;

/// A file entry as sent in an `announce` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncedFile {
    pub name: String,
    pub size: u64,
    pub hash: String,
    #[serde(default)]
    pub chunk_hashes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomEvent {
    Join,
    Leave,
}

/// Every action the tracker's request dispatcher accepts. See `spec.md` §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TrackerRequest {
    Register {
        username: String,
        password: String,
    },
    Login {
        username: String,
        password: String,
        port: u16,
    },
    Logout {
        username: String,
        port: u16,
    },
    Announce {
        port: u16,
        username: String,
        #[serde(default)]
        files: Vec<AnnouncedFile>,
    },
    ListFiles {},
    ReportUpload {
        username: String,
        port: u16,
    },
    GetScores {},
    GetPeerScore {
        target_username: String,
    },
    GetActivePeers {
        port: u16,
        username: String,
    },
    CreateRoom {
        room_name: String,
        port: u16,
        username: String,
    },
    ListRooms {},
    DeleteRoom {
        room_name: String,
        username: String,
    },
    RoomMemberUpdate {
        room_name: String,
        username: String,
        event: RoomEvent,
    },
}

/// One peer entry inside a `list_files` reply: address, score, and tier, already sorted by
/// score descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePeerEntry {
    pub peer: String,
    pub score: f64,
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileListing {
    pub size: u64,
    pub hash: String,
    pub chunk_hashes: Vec<String>,
    pub peers: Vec<FilePeerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivePeerInfo {
    pub username: String,
    pub address: String,
}

/// Tracker reply. Field presence mirrors the per-action wire shapes in `spec.md` §4.4: most
/// actions carry `status` and optionally `message`; `list_files` carries only `files`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<HashMap<String, FileListing>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<(String, Score)>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<Vec<ActivePeerInfo>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rooms: Option<HashMap<String, ChatRoom>>,
}

impl TrackerResponse {
    pub fn ok() -> Self {
        Self {
            status: Some(true),
            ..Default::default()
        }
    }

    pub fn ok_with_message(message: impl Into<String>) -> Self {
        Self {
            status: Some(true),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Some(false),
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn exception(error: impl Into<String>) -> Self {
        Self {
            status: Some(false),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.unwrap_or(false)
    }
}

/// Every action the peer service endpoint accepts. See `spec.md` §4.5.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PeerRequest {
    RequestChunk {
        file_name: String,
        chunk_index: usize,
        username: String,
    },
    InitiateChat {
        from_user: String,
    },
    JoinRoom {
        room_name: String,
        username: String,
    },
}
