//! Leaderboard ranking
//!
//! Top 5 by score (descending), then time (ascending, faster wins). Ranking
//! is a stable sort, so entries tied on both keys keep arrival order.

pub mod client;
pub mod service;

pub use client::{InProcessLeaderboard, LeaderboardClient, LeaderboardError};
pub use service::{LeaderboardService, MemoryScoreStore, ScoreStore, ServiceRequest, ServiceResponse};

use std::cmp::Ordering;

use serde::{Deserialize, Deserializer, Serialize};

use crate::consts::LEADERBOARD_SIZE;
use crate::persistence::{Envelope, KeyValueStore};

/// A stored result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(rename = "username")]
    pub name: String,
    pub score: u32,
    /// Session time in ms
    pub time: f64,
    /// Unix timestamp (ms) when stored
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: f64,
}

/// `createdAt` arrives as epoch ms or as an RFC 3339 date string
#[derive(Deserialize)]
#[serde(untagged)]
enum Timestamp {
    Millis(f64),
    Rfc3339(String),
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Timestamp::deserialize(deserializer)? {
        Timestamp::Millis(ms) => Ok(ms),
        Timestamp::Rfc3339(text) => chrono::DateTime::parse_from_rfc3339(&text)
            .map(|date| date.timestamp_millis() as f64)
            .map_err(|e| serde::de::Error::custom(format!("invalid createdAt {text:?}: {e}"))),
    }
}

/// What a finished session sends to the leaderboard service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub username: String,
    pub score: u32,
    pub time: f64,
}

/// Ranking order: higher score first, then lower time
pub fn rank_order(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.score.cmp(&a.score).then(a.time.total_cmp(&b.time))
}

/// Merge `entry` into `current` and keep the top 5
pub fn insert(entry: LeaderboardEntry, mut current: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    current.push(entry);
    current.sort_by(rank_order);
    current.truncate(LEADERBOARD_SIZE);
    current
}

/// Ranked top-5 list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    /// Storage key for the local snapshot
    const STORAGE_KEY: &'static str = "circle_ace_leaderboard";
    const VERSION: u32 = 1;

    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Rank and truncate an arbitrary list (e.g. a server response)
    pub fn from_entries(mut entries: Vec<LeaderboardEntry>) -> Self {
        entries.sort_by(rank_order);
        entries.truncate(LEADERBOARD_SIZE);
        Self { entries }
    }

    pub fn entries(&self) -> &[LeaderboardEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best entry, if any
    pub fn top(&self) -> Option<&LeaderboardEntry> {
        self.entries.first()
    }

    /// Rank (1-indexed) a result would take, None if it falls off the board
    ///
    /// Equal results rank after the ones already present.
    pub fn potential_rank(&self, score: u32, time: f64) -> Option<usize> {
        let ahead = self
            .entries
            .iter()
            .filter(|e| e.score > score || (e.score == score && e.time <= time))
            .count();
        (ahead < LEADERBOARD_SIZE).then_some(ahead + 1)
    }

    /// Check if a result makes the board
    pub fn qualifies(&self, score: u32, time: f64) -> bool {
        self.potential_rank(score, time).is_some()
    }

    /// Insert an entry; returns its rank or None if it was cut
    pub fn insert(&mut self, entry: LeaderboardEntry) -> Option<usize> {
        let rank = self.potential_rank(entry.score, entry.time);
        self.entries = insert(entry, std::mem::take(&mut self.entries));
        rank
    }

    /// Strict improvement over the current best: higher score, or the same
    /// score in strictly less time. An empty board needs a positive score.
    pub fn is_new_high_score(&self, score: u32, time: f64) -> bool {
        match self.top() {
            None => score > 0,
            Some(top) => score > top.score || (score == top.score && time < top.time),
        }
    }

    /// Load the cached snapshot; corrupt or missing data gives an empty board
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let entries: Vec<LeaderboardEntry> = Envelope::load(store, Self::STORAGE_KEY, Self::VERSION);
        if entries.is_empty() {
            log::info!("No cached leaderboard, starting fresh");
        } else {
            log::info!("Loaded {} cached leaderboard entries", entries.len());
        }
        Self::from_entries(entries)
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        if Envelope::save(store, Self::STORAGE_KEY, Self::VERSION, &self.entries) {
            log::info!("Leaderboard cached ({} entries)", self.entries.len());
        }
    }
}

/// Format a timestamp as a relative date string
pub fn format_date(timestamp_ms: f64, now_ms: f64) -> String {
    let diff_mins = (now_ms - timestamp_ms) / 60_000.0;
    let diff_hours = diff_mins / 60.0;
    let diff_days = diff_hours / 24.0;

    if diff_days >= 1.0 {
        let days = diff_days.floor() as i64;
        if days == 1 {
            "Yesterday".to_string()
        } else {
            format!("{} days ago", days)
        }
    } else if diff_hours >= 1.0 {
        let hours = diff_hours.floor() as i64;
        if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{} hours ago", hours)
        }
    } else if diff_mins >= 1.0 {
        let mins = diff_mins.floor() as i64;
        if mins == 1 {
            "1 min ago".to_string()
        } else {
            format!("{} mins ago", mins)
        }
    } else {
        "Just now".to_string()
    }
}

/// `m:ss.t` for a session time in ms
pub fn format_time(ms: f64) -> String {
    let tenths = (ms.max(0.0) / 100.0).floor() as u64;
    let secs = tenths / 10;
    format!("{}:{:02}.{}", secs / 60, secs % 60, tenths % 10)
}

#[cfg(test)]
pub(crate) fn entry(name: &str, score: u32, time: f64) -> LeaderboardEntry {
    LeaderboardEntry {
        name: name.to_string(),
        score,
        time,
        created_at: 0.0,
    }
}
