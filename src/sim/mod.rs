//! Deterministic game module
//!
//! All gameplay logic lives here. This module stays pure and deterministic:
//! - Seeded RNG only
//! - Time passed in as timestamps, never read from a clock
//! - No rendering backends, storage or network calls

pub mod capture;
pub mod round;
pub mod sdf;
pub mod state;
pub mod target;
pub mod timer;

pub use capture::{CaptureError, MIN_GESTURE_SAMPLES, PathCapture};
pub use round::{
    Advance, GameState, PendingAssessment, PendingSubmission, RoundResolution, RoundTicket,
    TransitionError,
};
pub use sdf::{sd_capsule, sd_circle, sd_ring, sd_segment};
pub use state::{AssessmentResult, GameSession, GameView, Phase, RngState};
pub use target::{TargetBounds, TargetCircle, TargetConfig, TargetError, generate_target};
pub use timer::{DisplayTicker, SessionClock};
