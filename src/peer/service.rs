//! Peer service endpoint: the TCP listener a peer runs so other peers can pull chunks from it,
//! gated by the requester's reputation tier. Grounded on
//! `original_source/peer/peer_client.py`'s `handle_peer_request`/`peer_server_logic`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};

use crate::chunking;
use crate::error::FilemeshResult;
use crate::peer::chat::ChatHandler;
use crate::peer::client::TrackerClient;
use crate::protocol::PeerRequest;
use crate::reputation::Tier;
use crate::wire;

pub struct PeerService {
    shared_dir: PathBuf,
    username: String,
    port: u16,
    tracker_client: Arc<TrackerClient>,
    chat_handler: Arc<dyn ChatHandler>,
}

impl PeerService {
    pub fn new(
        shared_dir: PathBuf,
        username: String,
        port: u16,
        tracker_client: Arc<TrackerClient>,
        chat_handler: Arc<dyn ChatHandler>,
    ) -> Self {
        Self {
            shared_dir,
            username,
            port,
            tracker_client,
            chat_handler,
        }
    }

    pub async fn run(self: Arc<Self>, listener: TcpListener) -> FilemeshResult<()> {
        tracing::info!(port = self.port, "peer service endpoint listening");
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let this = self.clone();
            tokio::spawn(async move {
                if let Err(e) = this.handle_connection(stream).await {
                    tracing::warn!(%peer_addr, error = %e, "peer connection failed");
                }
            });
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream) -> FilemeshResult<()> {
        let request: PeerRequest = wire::read_json(&mut stream).await?;

        match request {
            PeerRequest::RequestChunk {
                file_name,
                chunk_index,
                username,
            } => self.serve_chunk(stream, &file_name, chunk_index, &username).await,

            PeerRequest::InitiateChat { from_user } => {
                self.chat_handler.handle_initiate_chat(from_user, stream).await;
                Ok(())
            }

            PeerRequest::JoinRoom { room_name, username } => {
                self.chat_handler.handle_join_room(room_name, username, stream).await;
                Ok(())
            }
        }
    }

    /// Delay before serving is gated by the *requester's* tier, looked up from the tracker, per
    /// `spec.md` §4.3. A requester the tracker doesn't recognize is treated as the lowest tier.
    async fn serve_chunk(
        &self,
        mut stream: TcpStream,
        file_name: &str,
        chunk_index: usize,
        requester: &str,
    ) -> FilemeshResult<()> {
        let tier = self
            .tracker_client
            .get_peer_score(requester)
            .await
            .map(|(_, tier)| tier)
            .unwrap_or(Tier::Bronze);

        tokio::time::sleep(tier.service_delay()).await;

        let chunks_dir = chunking::chunks_dir_for(&self.shared_dir.join(file_name));
        let chunk_path = chunking::chunk_path(&chunks_dir, chunk_index);
        let data = tokio::fs::read(&chunk_path).await?;

        wire::write_chunk_and_shutdown(&mut stream, &data).await?;

        let tracker_client = self.tracker_client.clone();
        let username = self.username.clone();
        let port = self.port;
        tokio::spawn(async move {
            if let Err(e) = tracker_client.report_upload(&username, port).await {
                tracing::warn!(error = %e, "failed to report upload to tracker");
            }
        });

        Ok(())
    }
}
