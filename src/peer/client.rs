//! Tracker client: one short-lived TCP connection per call, matching the tracker's
//! one-request-per-connection dispatcher. Grounded on
//! `original_source/peer/peer_client.py`'s per-action `send_tracker_request` calls.

use std::collections::HashMap;

use tokio::net::TcpStream;

use crate::error::FilemeshResult;
use crate::models::ChatRoom;
use crate::protocol::{
    ActivePeerInfo, AnnouncedFile, FileListing, RoomEvent, TrackerRequest, TrackerResponse,
};
use crate::reputation::{Score, Tier};
use crate::wire;

pub struct TrackerClient {
    tracker_addr: String,
}

impl TrackerClient {
    pub fn new(tracker_addr: String) -> Self {
        Self { tracker_addr }
    }

    async fn call(&self, request: TrackerRequest) -> FilemeshResult<TrackerResponse> {
        let mut stream = TcpStream::connect(&self.tracker_addr).await?;
        wire::write_json(&mut stream, &request).await?;
        wire::read_json(&mut stream).await
    }

    pub async fn register(&self, username: &str, password: &str) -> FilemeshResult<TrackerResponse> {
        self.call(TrackerRequest::Register {
            username: username.to_string(),
            password: password.to_string(),
        })
        .await
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
        port: u16,
    ) -> FilemeshResult<TrackerResponse> {
        self.call(TrackerRequest::Login {
            username: username.to_string(),
            password: password.to_string(),
            port,
        })
        .await
    }

    pub async fn logout(&self, username: &str, port: u16) -> FilemeshResult<TrackerResponse> {
        self.call(TrackerRequest::Logout {
            username: username.to_string(),
            port,
        })
        .await
    }

    pub async fn announce(
        &self,
        username: &str,
        port: u16,
        files: Vec<AnnouncedFile>,
    ) -> FilemeshResult<TrackerResponse> {
        self.call(TrackerRequest::Announce {
            port,
            username: username.to_string(),
            files,
        })
        .await
    }

    pub async fn list_files(&self) -> FilemeshResult<HashMap<String, FileListing>> {
        let response = self.call(TrackerRequest::ListFiles {}).await?;
        Ok(response.files.unwrap_or_default())
    }

    pub async fn report_upload(&self, username: &str, port: u16) -> FilemeshResult<TrackerResponse> {
        self.call(TrackerRequest::ReportUpload {
            username: username.to_string(),
            port,
        })
        .await
    }

    pub async fn get_scores(&self) -> FilemeshResult<Vec<(String, Score)>> {
        let response = self.call(TrackerRequest::GetScores {}).await?;
        Ok(response.scores.unwrap_or_default())
    }

    pub async fn get_peer_score(&self, target_username: &str) -> FilemeshResult<(f64, Tier)> {
        let response = self
            .call(TrackerRequest::GetPeerScore {
                target_username: target_username.to_string(),
            })
            .await?;
        Ok((response.score.unwrap_or(0.0), response.tier.unwrap_or(Tier::Bronze)))
    }

    pub async fn get_active_peers(
        &self,
        username: &str,
        port: u16,
    ) -> FilemeshResult<Vec<ActivePeerInfo>> {
        let response = self
            .call(TrackerRequest::GetActivePeers {
                port,
                username: username.to_string(),
            })
            .await?;
        Ok(response.peers.unwrap_or_default())
    }

    pub async fn create_room(
        &self,
        username: &str,
        port: u16,
        room_name: &str,
    ) -> FilemeshResult<TrackerResponse> {
        self.call(TrackerRequest::CreateRoom {
            room_name: room_name.to_string(),
            port,
            username: username.to_string(),
        })
        .await
    }

    pub async fn list_rooms(&self) -> FilemeshResult<HashMap<String, ChatRoom>> {
        let response = self.call(TrackerRequest::ListRooms {}).await?;
        Ok(response.rooms.unwrap_or_default())
    }

    pub async fn delete_room(&self, username: &str, room_name: &str) -> FilemeshResult<TrackerResponse> {
        self.call(TrackerRequest::DeleteRoom {
            room_name: room_name.to_string(),
            username: username.to_string(),
        })
        .await
    }

    pub async fn room_member_update(
        &self,
        username: &str,
        room_name: &str,
        event: RoomEvent,
    ) -> FilemeshResult<TrackerResponse> {
        self.call(TrackerRequest::RoomMemberUpdate {
            room_name: room_name.to_string(),
            username: username.to_string(),
            event,
        })
        .await
    }
}
