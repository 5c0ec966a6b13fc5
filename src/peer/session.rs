//! Local session state for the peer CLI.
//!
//! The tracker's notion of a session is `(ip, port) -> username` (`spec.md` §3 `ActivePeer`),
//! established once by `login` and referenced by every subsequent mutating action via an
//! explicit `port`/`username` pair in the request body — not by holding a TCP connection open.
//! That lets a scriptable, one-shot-per-invocation CLI (`filemesh-peer announce`, `filemesh-peer
//! list`, ...) act as the same peer across separate process invocations: `login` binds the peer
//! service endpoint and runs in the foreground, while it writes the listening port and username
//! here so later invocations know which identity to present.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::FilemeshResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerSession {
    pub username: String,
    pub port: u16,
    pub tracker_addr: String,
}

fn session_path() -> PathBuf {
    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    config_dir.join("filemesh").join("peer_session.json")
}

impl PeerSession {
    pub fn save(&self) -> FilemeshResult<()> {
        let path = session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load the session written by the last successful `login`. `None` if no peer is currently
    /// logged in from this machine.
    pub fn load() -> Option<PeerSession> {
        let raw = std::fs::read_to_string(session_path()).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn clear() {
        let _ = std::fs::remove_file(session_path());
    }
}
