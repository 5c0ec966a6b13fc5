//! The central tracker: user registry, active sessions, file index, reputation scores, and chat
//! rooms, served over a plain TCP/JSON control channel.

pub mod dispatcher;
pub mod registry;
pub mod server;
pub mod snapshot;

pub use registry::Tracker;
