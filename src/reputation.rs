//! Reputation model: score derivation, tier bands, and the parallelism/delay tables the tiers
//! govern. Grounded on `original_source/tracker/tracker_server.py` (`calculate_score`) and
//! `original_source/peer/features/download.py` (`TIER_THREADS`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reputation tier, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Bronze,
    Prata,
    Ouro,
    Diamante,
}

impl Tier {
    pub fn from_score(score: f64) -> Tier {
        if score < 10.0 {
            Tier::Bronze
        } else if score < 20.0 {
            Tier::Prata
        } else if score < 30.0 {
            Tier::Ouro
        } else {
            Tier::Diamante
        }
    }

    /// Maximum parallel download workers a peer of this tier may use.
    pub fn max_workers(self) -> usize {
        match self {
            Tier::Bronze => 1,
            Tier::Prata => 2,
            Tier::Ouro => 3,
            Tier::Diamante => 4,
        }
    }

    /// Service delay an uploading peer applies before sending a chunk to a requester of this
    /// tier.
    pub fn service_delay(self) -> Duration {
        match self {
            Tier::Bronze => Duration::from_secs(10),
            Tier::Prata => Duration::from_secs(5),
            Tier::Ouro => Duration::from_secs(2),
            Tier::Diamante => Duration::from_secs(0),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Tier::Bronze => "bronze",
            Tier::Prata => "prata",
            Tier::Ouro => "ouro",
            Tier::Diamante => "diamante",
        };
        write!(f, "{}", s)
    }
}

/// `score = uploads + 0.01 * uptime_seconds`, rounded to 2 decimals.
pub fn compute_score(uploads: u64, uptime_seconds: u64) -> f64 {
    let raw = uploads as f64 + 0.01 * uptime_seconds as f64;
    (raw * 100.0).round() / 100.0
}

/// A user's reputation stats, always kept consistent: `score` and `tier` are derived from
/// `uploads`/`uptime_seconds` whenever either changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub uploads: u64,
    pub uptime_seconds: u64,
    pub score: f64,
    pub tier: Tier,
}

impl Score {
    pub fn new() -> Self {
        Self {
            uploads: 0,
            uptime_seconds: 0,
            score: 0.0,
            tier: Tier::Bronze,
        }
    }

    /// Recompute `score`/`tier` from `uploads`/`uptime_seconds`. Called after every mutation and
    /// once more when reloading from a snapshot, since the formula may have evolved since the
    /// snapshot was written.
    pub fn recompute(&mut self) {
        self.score = compute_score(self.uploads, self.uptime_seconds);
        self.tier = Tier::from_score(self.score);
    }

    pub fn record_upload(&mut self) {
        self.uploads += 1;
        self.recompute();
    }

    pub fn add_uptime(&mut self, seconds: u64) {
        self.uptime_seconds += seconds;
        self.recompute();
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}
