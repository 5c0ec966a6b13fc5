//! filemesh — a small peer-to-peer file-sharing network coordinated by a central tracker.
//!
//! The library is shared by the two binaries this crate ships:
//! - `filemesh-tracker`: the coordination server (user registry, active-peer sessions, file
//!   index, reputation, chat rooms).
//! - `filemesh-peer`: the download engine, the chunk-serving endpoint, and the peer CLI.
//!
//! Module map, leaves first:
//! - [`chunking`]: content-addressed chunk store (split/reassemble, SHA-256).
//! - [`reputation`]: score derivation and tier-gated parallelism/delay tables.
//! - [`models`]: the core data model (`User`, `ActivePeer`, `FileRecord`, `ChatRoom`).
//! - [`wire`]: connection framing for the JSON control channel and raw chunk transfers.
//! - [`protocol`]: the tagged-variant request/response shapes for both TCP services.
//! - [`tracker`]: the registry, request dispatcher, snapshot persistence, and TCP server.
//! - [`peer`]: the download engine, service endpoint, tracker client, and chat hand-off.
//! - [`config`]: JSON configuration with environment variable overrides.
//! - [`error`]: the crate-wide error type and result alias.
//! - [`logging`]: structured logging setup shared by both binaries.

pub mod chunking;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod peer;
pub mod protocol;
pub mod reputation;
pub mod tracker;
pub mod ui;
pub mod wire;

pub use error::{FilemeshError, FilemeshResult};
pub use reputation::{Score, Tier};
pub use tracker::Tracker;
