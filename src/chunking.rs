//! Content-addressed chunk store.
//!
//! Splits a file into fixed-size chunks, hashing each chunk and the whole file with SHA-256,
//! and reassembles a chunk directory back into a file. Grounded on
//! `original_source/utils/chunk_manager.py`, translated to streaming reads with a running
//! `Sha256` digest the way `ioustamora-datamesh::file_storage` streams large files.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{FilemeshError, FilemeshResult};

/// Fixed chunk size. Changing this invalidates every previously advertised hash.
pub const CHUNK_SIZE: usize = 1_048_576;

/// The result of splitting a file: the whole-file hash and the ordered per-chunk hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    pub file_hash: String,
    pub chunk_hashes: Vec<String>,
}

/// Directory holding the chunk files for `file_name`, sibling to the file itself.
pub fn chunks_dir_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}_chunks", file_name))
}

pub fn chunk_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("chunk_{}", index))
}

/// Read `path` in `CHUNK_SIZE` increments, writing each chunk to `<path>_chunks/chunk_<i>` and
/// returning the whole-file hash plus the ordered chunk hashes. An empty file produces an empty
/// `chunk_hashes` list and no chunk directory entries.
pub fn split_file(path: &Path) -> FilemeshResult<SplitResult> {
    let chunks_dir = chunks_dir_for(path);
    fs::create_dir_all(&chunks_dir)?;

    let mut file = File::open(path)?;
    let mut file_hasher = Sha256::new();
    let mut chunk_hashes = Vec::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut index = 0usize;

    loop {
        let mut filled = 0usize;
        while filled < CHUNK_SIZE {
            let n = file.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }

        let chunk = &buf[..filled];
        file_hasher.update(chunk);

        let mut chunk_hasher = Sha256::new();
        chunk_hasher.update(chunk);
        chunk_hashes.push(hex::encode(chunk_hasher.finalize()));

        let mut chunk_file = File::create(chunk_path(&chunks_dir, index))?;
        chunk_file.write_all(chunk)?;

        index += 1;
        if filled < CHUNK_SIZE {
            break;
        }
    }

    Ok(SplitResult {
        file_hash: hex::encode(file_hasher.finalize()),
        chunk_hashes,
    })
}

/// Concatenate `chunk_0 .. chunk_{n-1}` from `dir` into `out`, in order.
pub fn reassemble(dir: &Path, out: &Path, n: usize) -> FilemeshResult<()> {
    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut out_file = File::create(out)?;
    for i in 0..n {
        let path = chunk_path(dir, i);
        if !path.exists() {
            return Err(FilemeshError::Integrity(format!("missing chunk {}", i)));
        }
        let mut chunk_file = File::open(&path)?;
        std::io::copy(&mut chunk_file, &mut out_file)?;
    }
    Ok(())
}

/// SHA-256 hex digest of an in-memory buffer, used to verify downloaded chunks and reassembled
/// files.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Number of chunks a file of `size` bytes splits into: `ceil(size / CHUNK_SIZE)`, or 0 iff
/// `size == 0`.
pub fn expected_chunk_count(size: u64) -> usize {
    if size == 0 {
        0
    } else {
        ((size as usize) + CHUNK_SIZE - 1) / CHUNK_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn empty_file_has_no_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        File::create(&path).unwrap();

        let result = split_file(&path).unwrap();
        assert!(result.chunk_hashes.is_empty());
        assert_eq!(expected_chunk_count(0), 0);
    }

    #[test]
    fn chunk_count_matches_ceil_division() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("three_chunks.bin");
        let mut file = File::create(&path).unwrap();
        let data = vec![7u8; CHUNK_SIZE * 2 + 123];
        file.write_all(&data).unwrap();
        drop(file);

        let result = split_file(&path).unwrap();
        assert_eq!(result.chunk_hashes.len(), 3);
        assert_eq!(expected_chunk_count(data.len() as u64), 3);
        assert_eq!(result.file_hash, sha256_hex(&data));
    }

    #[test]
    fn reassemble_round_trips_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.bin");
        let data: Vec<u8> = (0..CHUNK_SIZE * 2 + 500).map(|i| (i % 251) as u8).collect();
        fs::write(&path, &data).unwrap();

        let result = split_file(&path).unwrap();
        let chunks_dir = chunks_dir_for(&path);
        let out_path = dir.path().join("reassembled.bin");
        reassemble(&chunks_dir, &out_path, result.chunk_hashes.len()).unwrap();

        let reassembled = fs::read(&out_path).unwrap();
        assert_eq!(reassembled, data);
        assert_eq!(sha256_hex(&reassembled), result.file_hash);
    }

    #[test]
    fn reassemble_fails_on_missing_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let chunks_dir = dir.path().join("missing_chunks");
        fs::create_dir_all(&chunks_dir).unwrap();
        fs::write(chunk_path(&chunks_dir, 0), b"only chunk").unwrap();

        let out_path = dir.path().join("out.bin");
        let err = reassemble(&chunks_dir, &out_path, 2).unwrap_err();
        assert!(matches!(err, FilemeshError::Integrity(_)));
    }
}
