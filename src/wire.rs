//! Connection framing.
//!
//! `spec.md` §9 calls out a buffer-truncation bug in the original: each side read a single fixed
//! 4096-byte `recv()` and assumed it held the whole JSON message. Large `announce` or `list_files`
//! payloads silently truncated. Here a control message is read incrementally until a full JSON
//! value parses, with no size cap. Chunk payloads are not framed at all: the sender writes the
//! raw bytes and closes (or half-closes) the connection, and the receiver reads to EOF.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{FilemeshError, FilemeshResult};

const READ_STEP: usize = 4096;

/// Read bytes from `reader` incrementally until they parse as a complete `T`, then return it.
/// Unlike a single fixed-size `read()`, this keeps reading as long as the accumulated bytes are a
/// valid-but-incomplete JSON prefix, so message size is unbounded.
pub async fn read_json<T, R>(reader: &mut R) -> FilemeshResult<T>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut step = [0u8; READ_STEP];

    loop {
        if !buf.is_empty() {
            match serde_json::from_slice::<T>(&buf) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_eof() => {}
                Err(e) => return Err(FilemeshError::Protocol(e.to_string())),
            }
        }

        let n = reader.read(&mut step).await?;
        if n == 0 {
            return if buf.is_empty() {
                Err(FilemeshError::Network(
                    "connection closed before any data was received".to_string(),
                ))
            } else {
                Err(FilemeshError::Protocol(
                    "connection closed mid-message".to_string(),
                ))
            };
        }
        buf.extend_from_slice(&step[..n]);
    }
}

/// Serialize `value` and write it in full, flushing afterward. Does not close the connection:
/// callers that need to signal EOF (chunk transfer) do that explicitly.
pub async fn write_json<T, W>(writer: &mut W, value: &T) -> FilemeshResult<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let bytes = serde_json::to_vec(value)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read a chunk payload: every byte up to EOF. The sender signals "end of chunk" by closing (or
/// half-closing) its side rather than length-prefixing the payload.
pub async fn read_to_eof<R>(reader: &mut R) -> FilemeshResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Write a chunk payload and half-close the write side so the peer's `read_to_eof` returns.
pub async fn write_chunk_and_shutdown<W>(writer: &mut W, data: &[u8]) -> FilemeshResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.shutdown().await?;
    Ok(())
}
