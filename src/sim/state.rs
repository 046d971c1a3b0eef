//! Game state types
//!
//! Everything a session carries between rounds lives here; the transitions
//! that mutate it are in `round`.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::target::TargetCircle;
use super::timer::SessionClock;
use crate::consts::STARTING_LIVES;
use crate::weighted_final_score;

/// Where the game is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Waiting for a player name
    EnteringName,
    /// Target shown, capture enabled
    Playing,
    /// Drawing submitted, judge working, capture disabled
    Assessing,
    /// Showing the last result until acknowledged
    Feedback,
    /// Session over, result submitted
    GameOver,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::EnteringName => "enteringName",
            Phase::Playing => "playing",
            Phase::Assessing => "assessing",
            Phase::Feedback => "feedback",
            Phase::GameOver => "gameOver",
        }
    }

    /// Pointer input is recorded only here
    pub fn accepts_drawing(&self) -> bool {
        matches!(self, Phase::Playing)
    }
}

/// Normalised judge result for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub accuracy_score: u8,
    pub perfection_score: u8,
    pub final_score: u8,
    pub feedback: String,
}

impl AssessmentResult {
    /// Build from rounded sub-scores; the final score is always derived
    pub fn new(accuracy_score: u8, perfection_score: u8, feedback: impl Into<String>) -> Self {
        let accuracy_score = accuracy_score.min(100);
        let perfection_score = perfection_score.min(100);
        Self {
            accuracy_score,
            perfection_score,
            final_score: weighted_final_score(accuracy_score, perfection_score),
            feedback: feedback.into(),
        }
    }
}

/// One player's run from name entry to game over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSession {
    pub player_name: String,
    pub score: u32,
    pub lives: u8,
    pub clock: SessionClock,
}

impl GameSession {
    pub fn new(player_name: String, now_ms: f64) -> Self {
        Self {
            player_name,
            score: 0,
            lives: STARTING_LIVES,
            clock: SessionClock::start(now_ms),
        }
    }

    /// Apply a judged round: add the score, spend a life
    pub fn record_round(&mut self, result: &AssessmentResult) {
        self.score += result.final_score as u32;
        self.lives = self.lives.saturating_sub(1);
    }

    pub fn is_over(&self) -> bool {
        self.lives == 0
    }

    pub fn elapsed_ms(&self, now_ms: f64) -> f64 {
        self.clock.elapsed_ms(now_ms)
    }
}

/// RNG state wrapper for serialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
}

impl RngState {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed)
    }
}

/// Read-only snapshot for a UI layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub phase: Phase,
    pub player_name: String,
    pub score: u32,
    pub lives: u8,
    pub elapsed_ms: f64,
    pub target: Option<TargetCircle>,
    pub path: Vec<[f32; 2]>,
    pub last_result: Option<AssessmentResult>,
    pub new_high_score: bool,
}
