//! CircleAce - trace the target circle, let the judge score it
//!
//! Core modules:
//! - `sim`: Round state machine, target generation, path capture
//! - `renderer`: CPU rasterization of strokes (judge artifact, preview)
//! - `judge`: Judge collaborator contract plus an offline geometric judge
//! - `leaderboard`: Top-5 ranking, service boundary, client
//! - `persistence`: Key-value store with versioned envelopes
//! - `platform`: Clock and storage backends (native / browser)

pub mod judge;
pub mod leaderboard;
pub mod names;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod runner;
pub mod settings;
pub mod sim;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use judge::{GeometricJudge, Judge, JudgeError, JudgeRequest, JudgeVerdict};
pub use leaderboard::{Leaderboard, LeaderboardEntry};
pub use runner::{Collaborators, GameRunner};
pub use settings::{Settings, Theme};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Default canvas edge length (pixels)
    pub const DEFAULT_CANVAS_SIZE: u32 = 600;
    /// Smallest canvas the target generator accepts
    pub const MIN_CANVAS_SIZE: u32 = 100;
    /// Largest canvas the target generator accepts
    pub const MAX_CANVAS_SIZE: u32 = 4096;

    /// Lives per session
    pub const STARTING_LIVES: u8 = 3;

    /// Leaderboard keeps this many entries
    pub const LEADERBOARD_SIZE: usize = 5;
    /// Longest player name the leaderboard stores (chars)
    pub const MAX_NAME_LEN: usize = 20;

    /// Final score weighting
    pub const ACCURACY_WEIGHT: f64 = 0.70;
    pub const PERFECTION_WEIGHT: f64 = 0.30;
    /// Upper bound of every judge score
    pub const MAX_SCORE: u8 = 100;

    /// Stroke width of the exported artifact (pixels)
    pub const ARTIFACT_STROKE_WIDTH: f32 = 5.0;
    /// Elapsed-time display refresh interval (ms)
    pub const DISPLAY_TICK_MS: f64 = 100.0;
}

/// Weighted final score from already-rounded sub-scores
#[inline]
pub fn weighted_final_score(accuracy: u8, perfection: u8) -> u8 {
    let weighted = consts::ACCURACY_WEIGHT * accuracy as f64
        + consts::PERFECTION_WEIGHT * perfection as f64;
    weighted.round().clamp(0.0, consts::MAX_SCORE as f64) as u8
}

/// Point on a circle, screen coordinates (y grows downward)
#[inline]
pub fn point_on_circle(center: Vec2, radius: f32, theta: f32) -> Vec2 {
    center + Vec2::new(theta.cos(), theta.sin()) * radius
}
