//! Hand-off point for chat and room sessions.
//!
//! `original_source/peer/features/chat.py` and `group_chat.py` implement full interactive 1:1 and
//! room chat sessions once a peer accepts an `initiate_chat`/`join_room` request. Interactive chat
//! is out of scope here (see `spec.md` Non-goals), but the peer service endpoint still needs
//! somewhere to hand the accepted connection off to, so the dispatch point is a trait rather than
//! a dead match arm.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::peer::client::TrackerClient;
use crate::protocol::RoomEvent;
use crate::wire;

/// Receives an accepted connection after the peer service endpoint has decided it's a chat
/// hand-off rather than a chunk request.
#[async_trait]
pub trait ChatHandler: Send + Sync {
    async fn handle_initiate_chat(&self, from_user: String, stream: TcpStream);
    async fn handle_join_room(&self, room_name: String, username: String, stream: TcpStream);
}

/// Default handler: performs the tracker-side bookkeeping a hand-off implies, then blocks on the
/// connection until the remote side closes it, without implementing the interactive read/print
/// loop `original_source/peer/features/chat.py`/`group_chat.py` build on top of the same hand-off.
pub struct DefaultChatHandler {
    tracker_client: Arc<TrackerClient>,
}

impl DefaultChatHandler {
    pub fn new(tracker_client: Arc<TrackerClient>) -> Self {
        Self { tracker_client }
    }
}

#[async_trait]
impl ChatHandler for DefaultChatHandler {
    async fn handle_initiate_chat(&self, from_user: String, mut stream: TcpStream) {
        tracing::info!(%from_user, "chat handshake accepted; interactive session is not implemented");
        let _ = wire::read_to_eof(&mut stream).await;
    }

    /// Records the joining user as a room member with the tracker, blocks until the connection
    /// closes, then records the leave — the membership bookkeeping a `join_room` hand-off implies,
    /// without the interactive room chat loop itself.
    async fn handle_join_room(&self, room_name: String, username: String, mut stream: TcpStream) {
        if let Err(e) = self
            .tracker_client
            .room_member_update(&username, &room_name, RoomEvent::Join)
            .await
        {
            tracing::warn!(%room_name, %username, error = %e, "failed to record room join with tracker");
        }

        let _ = wire::read_to_eof(&mut stream).await;

        if let Err(e) = self
            .tracker_client
            .room_member_update(&username, &room_name, RoomEvent::Leave)
            .await
        {
            tracing::warn!(%room_name, %username, error = %e, "failed to record room leave with tracker");
        }
    }
}
