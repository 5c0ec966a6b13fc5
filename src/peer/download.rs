//! Parallel chunk-download engine.
//!
//! Grounded on `original_source/peer/features/download.py`'s `DownloaderThread`/`download_file`:
//! a FIFO queue of chunks, a worker pool sized by the downloader's own tier, peers picked
//! round-robin, and up to `MAX_CHUNK_RETRIES` attempts per chunk before giving up on the whole
//! download. Reassembly and a final whole-file hash check happen only once every chunk has
//! landed.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::chunking::{self, sha256_hex};
use crate::error::{FilemeshError, FilemeshResult};
use crate::protocol::PeerRequest;
use crate::reputation::Tier;
use crate::wire;

/// Matches `original_source/peer/features/download.py`'s per-request socket timeout.
const CHUNK_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_CHUNK_RETRIES: u32 = 3;

/// Invoked once per chunk that lands successfully, so a caller can drive a progress indicator
/// (`ui::DownloadProgress`) without the download engine depending on any particular UI crate.
pub type ProgressHook = Arc<dyn Fn() + Send + Sync>;

struct SharedState {
    queue: Mutex<VecDeque<(usize, String)>>,
    peers: Vec<String>,
    next_peer: Mutex<usize>,
    attempts: Mutex<HashMap<usize, u32>>,
    permanently_failed: Mutex<Vec<usize>>,
    scratch_dir: PathBuf,
    file_name: String,
    requester_username: String,
    on_chunk_done: Option<ProgressHook>,
}

impl SharedState {
    async fn next_peer_addr(&self) -> String {
        let mut i = self.next_peer.lock().await;
        let peer = self.peers[*i % self.peers.len()].clone();
        *i = (*i + 1) % self.peers.len();
        peer
    }
}

/// Download `file_name` from `peers` (addresses of peers that have announced it), verifying every
/// chunk against `chunk_hashes` and the reassembled file against `file_hash`. Returns the path to
/// the completed file in `downloads_dir` on success. On failure the scratch directory of
/// already-downloaded chunks is left in place for forensics.
pub async fn download_file(
    file_name: &str,
    file_hash: &str,
    chunk_hashes: Vec<String>,
    peers: Vec<String>,
    tier: Tier,
    requester_username: String,
    downloads_dir: &Path,
) -> FilemeshResult<PathBuf> {
    download_file_with_progress(
        file_name,
        file_hash,
        chunk_hashes,
        peers,
        tier,
        requester_username,
        downloads_dir,
        None,
    )
    .await
}

/// Same as [`download_file`], but invokes `on_chunk_done` once per chunk that lands
/// successfully, so a caller can drive a progress indicator.
#[allow(clippy::too_many_arguments)]
pub async fn download_file_with_progress(
    file_name: &str,
    file_hash: &str,
    chunk_hashes: Vec<String>,
    peers: Vec<String>,
    tier: Tier,
    requester_username: String,
    downloads_dir: &Path,
    on_chunk_done: Option<ProgressHook>,
) -> FilemeshResult<PathBuf> {
    if peers.is_empty() {
        return Err(FilemeshError::Network(format!(
            "no peers currently hold '{}'",
            file_name
        )));
    }

    let scratch_dir = chunking::chunks_dir_for(&downloads_dir.join(file_name));
    tokio::fs::create_dir_all(&scratch_dir).await?;

    let queue: VecDeque<(usize, String)> = chunk_hashes
        .iter()
        .cloned()
        .enumerate()
        .collect();
    let worker_count = tier.max_workers().min(peers.len()).max(1);

    let state = Arc::new(SharedState {
        queue: Mutex::new(queue),
        peers,
        next_peer: Mutex::new(0),
        attempts: Mutex::new(HashMap::new()),
        permanently_failed: Mutex::new(Vec::new()),
        scratch_dir: scratch_dir.clone(),
        file_name: file_name.to_string(),
        requester_username,
        on_chunk_done,
    });

    let workers: Vec<_> = (0..worker_count)
        .map(|_| {
            let state = state.clone();
            tokio::spawn(async move { worker_loop(state).await })
        })
        .collect();
    futures::future::join_all(workers).await;

    let failed = state.permanently_failed.lock().await.clone();
    if !failed.is_empty() {
        return Err(FilemeshError::Integrity(format!(
            "chunks {:?} of '{}' failed after {} attempts each",
            failed, file_name, MAX_CHUNK_RETRIES
        )));
    }

    let final_path = downloads_dir.join(file_name);
    chunking::reassemble(&scratch_dir, &final_path, chunk_hashes.len())?;

    let reassembled = tokio::fs::read(&final_path).await?;
    if sha256_hex(&reassembled) != file_hash {
        return Err(FilemeshError::Integrity(format!(
            "whole-file hash mismatch for '{}' after reassembly",
            file_name
        )));
    }

    tokio::fs::remove_dir_all(&scratch_dir).await.ok();
    Ok(final_path)
}

async fn worker_loop(state: Arc<SharedState>) {
    loop {
        let item = { state.queue.lock().await.pop_front() };
        let Some((index, expected_hash)) = item else {
            break;
        };

        let attempt_count = {
            let mut attempts = state.attempts.lock().await;
            let count = attempts.entry(index).or_insert(0);
            *count += 1;
            *count
        };

        // One acquisition tries up to `len(peers)` peers in round-robin order before the
        // attempt counts as exhausted, per spec.md §4.6 step 4b.
        let mut acquired = false;
        for _ in 0..state.peers.len() {
            let peer_addr = state.next_peer_addr().await;
            match fetch_chunk_with_timeout(
                &peer_addr,
                &state.file_name,
                index,
                &state.requester_username,
            )
            .await
            {
                Ok(bytes) if sha256_hex(&bytes) == expected_hash => {
                    if let Err(e) =
                        tokio::fs::write(chunking::chunk_path(&state.scratch_dir, index), &bytes)
                            .await
                    {
                        tracing::warn!(index, error = %e, "failed to write chunk to scratch dir");
                        break;
                    }
                    acquired = true;
                    if let Some(hook) = &state.on_chunk_done {
                        hook();
                    }
                    break;
                }
                Ok(_) => {
                    tracing::warn!(index, %peer_addr, "chunk hash mismatch");
                }
                Err(e) => {
                    tracing::warn!(index, %peer_addr, error = %e, "chunk fetch failed");
                }
            }
        }

        if !acquired {
            if attempt_count >= MAX_CHUNK_RETRIES {
                state.permanently_failed.lock().await.push(index);
            } else {
                state.queue.lock().await.push_back((index, expected_hash));
            }
        }
    }
}

async fn fetch_chunk(
    peer_addr: &str,
    file_name: &str,
    chunk_index: usize,
    username: &str,
) -> FilemeshResult<Vec<u8>> {
    let mut stream = TcpStream::connect(peer_addr).await?;
    wire::write_json(
        &mut stream,
        &PeerRequest::RequestChunk {
            file_name: file_name.to_string(),
            chunk_index,
            username: username.to_string(),
        },
    )
    .await?;
    wire::read_to_eof(&mut stream).await
}

async fn fetch_chunk_with_timeout(
    peer_addr: &str,
    file_name: &str,
    chunk_index: usize,
    username: &str,
) -> FilemeshResult<Vec<u8>> {
    match tokio::time::timeout(
        CHUNK_TIMEOUT,
        fetch_chunk(peer_addr, file_name, chunk_index, username),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(FilemeshError::Network(format!(
            "chunk {} request to {} timed out",
            chunk_index, peer_addr
        ))),
    }
}
