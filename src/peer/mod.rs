//! The peer side: the parallel download engine, the chunk-serving TCP endpoint, the tracker
//! client, chat hand-off, and local CLI session state.

pub mod chat;
pub mod client;
pub mod download;
pub mod service;
pub mod session;

pub use client::TrackerClient;
pub use service::PeerService;
