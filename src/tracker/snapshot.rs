//! Single-file JSON persistence for the tracker's durable state: users, reputation scores, and
//! chat rooms. Session state (`active_peers`) and file announcements are never persisted — they
//! only make sense relative to peers that are currently connected.
//!
//! Writes go to a temporary file in the same directory followed by a rename, so a crash mid-write
//! never leaves a truncated snapshot in place, per `spec.md` §6.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::PersistenceConfig;
use crate::error::{FilemeshError, FilemeshResult};
use crate::models::{ChatRoom, User};
use crate::reputation::Score;
use crate::tracker::registry::{SnapshotView, TrackerState};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SnapshotData {
    #[serde(default)]
    pub users: HashMap<String, User>,
    #[serde(default)]
    pub scores: HashMap<String, Score>,
    #[serde(default)]
    pub rooms: HashMap<String, ChatRoom>,
}

impl From<&SnapshotView> for SnapshotData {
    fn from(view: &SnapshotView) -> Self {
        Self {
            users: view.users.clone(),
            scores: view.scores.clone(),
            rooms: view.rooms.clone(),
        }
    }
}

/// Write `data` atomically to `path`: serialize to a sibling `.tmp` file, then rename it over the
/// destination. Failures are reported as `FilemeshError::Persistence` (`spec.md` §7
/// PersistenceError), distinct from a general `Io` error, so callers can log-and-continue rather
/// than treat a failed snapshot write as fatal.
pub fn save(data: &SnapshotData, path: &Path) -> FilemeshResult<()> {
    save_inner(data, path).map_err(|e| FilemeshError::Persistence(e.to_string()))
}

fn save_inner(data: &SnapshotData, path: &Path) -> FilemeshResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rendered = serde_json::to_string_pretty(data)?;
    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, rendered)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tmp.set_file_name(format!("{}.tmp", file_name));
    tmp
}

fn load_file(path: &Path) -> FilemeshResult<SnapshotData> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Build initial tracker state at startup: load the snapshot if it exists, otherwise fall back to
/// a seed snapshot (for bootstrapping a fresh tracker with known users/scores), otherwise start
/// empty. Scores are recomputed from `uploads`/`uptime_seconds` in case the formula has changed
/// since the snapshot was written; rooms loaded this way are marked `old` since their moderator's
/// session did not survive the restart.
pub fn bootstrap(persistence: &PersistenceConfig) -> FilemeshResult<TrackerState> {
    let data = if persistence.snapshot_path.exists() {
        tracing::info!("loading tracker snapshot from {:?}", persistence.snapshot_path);
        load_file(&persistence.snapshot_path)?
    } else if let Some(seed_path) = &persistence.seed_path {
        if seed_path.exists() {
            tracing::info!("seeding tracker state from {:?}", seed_path);
            load_file(seed_path)?
        } else {
            SnapshotData::default()
        }
    } else {
        SnapshotData::default()
    };

    let mut scores = data.scores;
    for score in scores.values_mut() {
        score.recompute();
    }

    let rooms = data
        .rooms
        .into_iter()
        .map(|(name, mut room)| {
            room.old = true;
            (name, room)
        })
        .collect();

    Ok(TrackerState {
        users: data.users,
        active_peers: HashMap::new(),
        files: HashMap::new(),
        scores,
        rooms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    #[test]
    fn save_then_bootstrap_round_trips_users_and_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let mut users = HashMap::new();
        users.insert("alice".to_string(), User::new("alice".to_string(), "pw"));
        let mut scores = HashMap::new();
        let mut score = Score::new();
        score.record_upload();
        scores.insert("alice".to_string(), score);

        let data = SnapshotData {
            users,
            scores,
            rooms: HashMap::new(),
        };
        save(&data, &path).unwrap();

        let persistence = PersistenceConfig {
            snapshot_path: path,
            seed_path: None,
        };
        let state = bootstrap(&persistence).unwrap();
        assert!(state.users.contains_key("alice"));
        assert_eq!(state.scores["alice"].uploads, 1);
        assert!(state.active_peers.is_empty());
    }

    #[test]
    fn rooms_loaded_from_snapshot_are_marked_old() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        let mut rooms = HashMap::new();
        rooms.insert(
            "lobby".to_string(),
            ChatRoom::new("alice".to_string(), "127.0.0.1:6000".to_string()),
        );
        let data = SnapshotData {
            users: HashMap::new(),
            scores: HashMap::new(),
            rooms,
        };
        save(&data, &path).unwrap();

        let persistence = PersistenceConfig {
            snapshot_path: path,
            seed_path: None,
        };
        let state = bootstrap(&persistence).unwrap();
        assert!(state.rooms["lobby"].old);
    }

    #[test]
    fn missing_snapshot_and_seed_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = PersistenceConfig {
            snapshot_path: dir.path().join("does_not_exist.json"),
            seed_path: None,
        };
        let state = bootstrap(&persistence).unwrap();
        assert!(state.users.is_empty());
    }
}
