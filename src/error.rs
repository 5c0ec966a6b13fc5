// ===================================================================================================
// Error Handling System - Error Types and Result Alias for Filemesh
// ===================================================================================================
//
// Structured error categories for the tracker, the peer service endpoint, and the download
// engine. Each variant carries a descriptive string rather than a source error chain, following
// the flat-variant-plus-Display shape used throughout this codebase's lineage.
// ===================================================================================================

use std::error::Error as StdError;
use std::fmt;

/// Error categories produced by the tracker registry, dispatcher, peer service endpoint, and
/// download engine.
#[derive(Debug)]
pub enum FilemeshError {
    /// File system I/O failures: chunk read/write, snapshot read/write, shared directory scans.
    Io(String),

    /// Connectivity and protocol-transport failures: refused connections, resets, timeouts.
    Network(String),

    /// Malformed or incomplete wire messages: unparseable JSON, missing required field, unknown
    /// action.
    Protocol(String),

    /// Authentication and session failures: unknown user, bad password, action requires login.
    Auth(String),

    /// Conflicting mutations: duplicate registration, duplicate room, non-moderator deletion.
    Conflict(String),

    /// Content-integrity failures: chunk hash mismatch, whole-file hash mismatch after
    /// reassembly, missing chunk during reassembly.
    Integrity(String),

    /// Snapshot persistence failures. Logged and swallowed by the registry; in-memory state
    /// remains authoritative.
    Persistence(String),

    /// Configuration loading/parsing failures.
    Config(String),

    /// Catch-all for errors that don't fit another category.
    Generic(String),
}

impl fmt::Display for FilemeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilemeshError::Io(e) => write!(f, "IO error: {}", e),
            FilemeshError::Network(e) => write!(f, "Network error: {}", e),
            FilemeshError::Protocol(e) => write!(f, "Protocol error: {}", e),
            FilemeshError::Auth(e) => write!(f, "Authentication error: {}", e),
            FilemeshError::Conflict(e) => write!(f, "Conflict: {}", e),
            FilemeshError::Integrity(e) => write!(f, "Integrity error: {}", e),
            FilemeshError::Persistence(e) => write!(f, "Persistence error: {}", e),
            FilemeshError::Config(e) => write!(f, "Configuration error: {}", e),
            FilemeshError::Generic(e) => write!(f, "Error: {}", e),
        }
    }
}

impl StdError for FilemeshError {}

impl From<std::io::Error> for FilemeshError {
    fn from(error: std::io::Error) -> Self {
        FilemeshError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for FilemeshError {
    fn from(error: serde_json::Error) -> Self {
        FilemeshError::Protocol(error.to_string())
    }
}

impl From<anyhow::Error> for FilemeshError {
    fn from(error: anyhow::Error) -> Self {
        FilemeshError::Generic(error.to_string())
    }
}

/// Result type alias used across the tracker, peer, and download engine.
pub type FilemeshResult<T> = Result<T, FilemeshError>;
