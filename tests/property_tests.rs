/// Property-based tests for the chunk store and reputation model, covering the invariants
/// listed in `spec.md` §8.
use proptest::prelude::*;

use filemesh::chunking::{self, CHUNK_SIZE};
use filemesh::reputation::{compute_score, Tier};

proptest! {
    /// Invariant 2: `len(chunk_hashes) == ceil(size / CHUNK_SIZE)`, or 0 iff `size == 0`.
    #[test]
    fn chunk_count_matches_ceil_division(size in 0usize..(CHUNK_SIZE * 5 + 777)) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, vec![7u8; size]).unwrap();

        let result = chunking::split_file(&path).unwrap();
        prop_assert_eq!(result.chunk_hashes.len(), chunking::expected_chunk_count(size as u64));
        if size == 0 {
            prop_assert!(result.chunk_hashes.is_empty());
        }
    }

    /// Invariant 5: `reassemble(split(path))` yields a file byte-identical to `path`.
    #[test]
    fn split_then_reassemble_round_trips(size in 0usize..(CHUNK_SIZE * 2 + 500), seed in 0u8..=255) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.bin");
        let data: Vec<u8> = (0..size).map(|i| seed.wrapping_add(i as u8)).collect();
        std::fs::write(&path, &data).unwrap();

        let result = chunking::split_file(&path).unwrap();
        let chunks_dir = chunking::chunks_dir_for(&path);
        let out_path = dir.path().join("out.bin");
        chunking::reassemble(&chunks_dir, &out_path, result.chunk_hashes.len()).unwrap();

        let reassembled = std::fs::read(&out_path).unwrap();
        prop_assert_eq!(reassembled, data);
    }

    /// Invariant 3: `score = round(uploads + 0.01 * uptime_seconds, 2)` and `tier` is the band
    /// containing `score`.
    #[test]
    fn score_formula_and_tier_bands_hold(uploads in 0u64..500, uptime in 0u64..20_000) {
        let score = compute_score(uploads, uptime);
        let expected = ((uploads as f64 + 0.01 * uptime as f64) * 100.0).round() / 100.0;
        prop_assert_eq!(score, expected);

        let tier = Tier::from_score(score);
        let expected_tier = if score < 10.0 {
            Tier::Bronze
        } else if score < 20.0 {
            Tier::Prata
        } else if score < 30.0 {
            Tier::Ouro
        } else {
            Tier::Diamante
        };
        prop_assert_eq!(tier, expected_tier);
    }
}
