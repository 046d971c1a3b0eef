//! Round state machine
//!
//! `EnteringName -> Playing -> Assessing -> Feedback -> Playing | GameOver`
//!
//! Transitions are plain methods on `GameState`. The two suspending calls
//! (judge, leaderboard submission) are not made here: a transition hands back
//! a pending request tagged with a `RoundTicket`, and the caller feeds the
//! outcome back in. Outcomes whose ticket no longer matches are dropped.

use glam::Vec2;
use rand_pcg::Pcg32;
use thiserror::Error;

use super::capture::{CaptureError, PathCapture};
use super::state::{AssessmentResult, GameSession, GameView, Phase, RngState};
use super::target::{TargetCircle, TargetError, generate_target};
use super::timer::DisplayTicker;
use crate::judge::{JudgeError, JudgeRequest};
use crate::leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardError, Submission};
use crate::names::{NameError, sanitize_player_name};
use crate::settings::{Settings, SettingsError};

#[derive(Debug, Error)]
pub enum TransitionError {
    #[error("cannot {action} while {phase:?}")]
    InvalidTransition { action: &'static str, phase: Phase },
    #[error("invalid player name: {0}")]
    InvalidName(#[from] NameError),
    #[error("target generation failed: {0}")]
    Target(#[from] TargetError),
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),
}

/// Identifies the session and attempt an async outcome belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundTicket {
    epoch: u64,
    attempt: u32,
}

/// Judge call to make after a gesture produced an artifact
#[derive(Debug, Clone)]
pub struct PendingAssessment {
    pub ticket: RoundTicket,
    pub request: JudgeRequest,
}

/// Leaderboard submission to make after game over
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub ticket: RoundTicket,
    pub submission: Submission,
    /// Evaluated against the cached board before submitting
    pub new_high_score: bool,
}

/// What a judge outcome did to the round
#[derive(Debug, Clone, PartialEq)]
pub enum RoundResolution {
    /// Round judged: score added, one life spent, now in Feedback
    Scored {
        result: AssessmentResult,
        score: u32,
        lives: u8,
    },
    /// Judge failed: back to Playing with the same target, no penalty
    Retry,
    /// Outcome for a session or attempt that is no longer current
    Stale,
}

/// Result of acknowledging feedback
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    NextRound(TargetCircle),
    GameOver(PendingSubmission),
}

/// Owns all mutable game state for one player's device
pub struct GameState {
    settings: Settings,
    phase: Phase,
    /// Name field contents while entering a name; session name otherwise
    player_name: String,
    session: Option<GameSession>,
    target: Option<TargetCircle>,
    capture: PathCapture,
    ticker: DisplayTicker,
    /// Last known leaderboard, used for the high-score flag
    leaderboard: Leaderboard,
    rng_state: RngState,
    rng: Pcg32,
    /// Bumped when a session is abandoned
    epoch: u64,
    /// Bumped for every judge call
    attempt: u32,
    last_result: Option<AssessmentResult>,
    new_high_score: bool,
}

impl GameState {
    pub fn new(settings: Settings, seed: u64) -> Result<Self, SettingsError> {
        settings.validate()?;
        let rng_state = RngState::new(seed);
        Ok(Self {
            capture: PathCapture::new(settings.canvas_size, settings.artifact_stroke_width),
            ticker: DisplayTicker::new(settings.display_tick_ms),
            settings,
            phase: Phase::EnteringName,
            player_name: String::new(),
            session: None,
            target: None,
            leaderboard: Leaderboard::new(),
            rng: rng_state.to_rng(),
            rng_state,
            epoch: 0,
            attempt: 0,
            last_result: None,
            new_high_score: false,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn player_name(&self) -> &str {
        &self.player_name
    }

    pub fn session(&self) -> Option<&GameSession> {
        self.session.as_ref()
    }

    pub fn target(&self) -> Option<&TargetCircle> {
        self.target.as_ref()
    }

    pub fn capture(&self) -> &PathCapture {
        &self.capture
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn last_result(&self) -> Option<&AssessmentResult> {
        self.last_result.as_ref()
    }

    pub fn new_high_score(&self) -> bool {
        self.new_high_score
    }

    pub fn seed(&self) -> u64 {
        self.rng_state.seed
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_running()
    }

    fn ticket(&self) -> RoundTicket {
        RoundTicket {
            epoch: self.epoch,
            attempt: self.attempt,
        }
    }

    fn require(&self, expected: Phase, action: &'static str) -> Result<(), TransitionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition {
                action,
                phase: self.phase,
            })
        }
    }

    /// Fresh target, cleared path, capture on, ticker running
    fn begin_round(&mut self, now_ms: f64) -> Result<TargetCircle, TransitionError> {
        let target = generate_target(&mut self.rng, self.settings.canvas_size, &self.settings.target_config())?;
        self.target = Some(target);
        self.capture.reset();
        self.capture.set_enabled(true);
        self.ticker.start(now_ms);
        self.phase = Phase::Playing;
        log::debug!("New target at ({}, {}) r={}", target.x, target.y, target.radius);
        Ok(target)
    }

    fn start_session(&mut self, name: String, now_ms: f64) -> Result<TargetCircle, TransitionError> {
        self.session = Some(GameSession::new(name.clone(), now_ms));
        self.player_name = name;
        self.last_result = None;
        self.new_high_score = false;
        let target = self.begin_round(now_ms)?;
        log::info!("Session started for {}", self.player_name);
        Ok(target)
    }

    /// Edit the name field (e.g. a generated suggestion)
    pub fn set_player_name(&mut self, name: impl Into<String>) -> Result<(), TransitionError> {
        self.require(Phase::EnteringName, "change the name")?;
        self.player_name = name.into();
        Ok(())
    }

    /// EnteringName -> Playing with the name field contents
    pub fn start_game(&mut self, now_ms: f64) -> Result<TargetCircle, TransitionError> {
        self.require(Phase::EnteringName, "start a game")?;
        let name = sanitize_player_name(&self.player_name)?;
        self.start_session(name, now_ms)
    }

    /// GameOver -> Playing, same name
    pub fn play_again(&mut self, now_ms: f64) -> Result<TargetCircle, TransitionError> {
        self.require(Phase::GameOver, "play again")?;
        let name = self.player_name.clone();
        self.start_session(name, now_ms)
    }

    /// GameOver -> EnteringName, keeping the old name as a pre-fill
    pub fn change_name(&mut self) -> Result<(), TransitionError> {
        self.require(Phase::GameOver, "change name")?;
        self.session = None;
        self.target = None;
        self.phase = Phase::EnteringName;
        Ok(())
    }

    /// Drop the current session; any outcome still in flight goes stale
    pub fn abandon(&mut self) {
        self.epoch += 1;
        self.session = None;
        self.target = None;
        self.capture.set_enabled(false);
        self.capture.reset();
        self.ticker.stop();
        self.last_result = None;
        self.new_high_score = false;
        self.phase = Phase::EnteringName;
        log::info!("Session abandoned");
    }

    pub fn gesture_start(&mut self, point: Vec2) {
        self.capture.on_gesture_start(point);
    }

    pub fn gesture_move(&mut self, point: Vec2) {
        self.capture.on_gesture_move(point);
    }

    /// Playing -> Assessing when the gesture produced an artifact
    ///
    /// `Ok(None)` leaves the round untouched (short or ignored gesture).
    pub fn gesture_end(&mut self, now_ms: f64) -> Result<Option<PendingAssessment>, TransitionError> {
        let Some(artifact) = self.capture.on_gesture_end()? else {
            return Ok(None);
        };
        let Some(target) = self.target.filter(|_| self.phase == Phase::Playing) else {
            return Err(TransitionError::InvalidTransition {
                action: "submit a drawing",
                phase: self.phase,
            });
        };

        self.capture.set_enabled(false);
        self.ticker.stop();
        self.attempt += 1;
        self.phase = Phase::Assessing;
        log::debug!(
            "Assessing attempt {} at {:.0} ms",
            self.attempt,
            self.session.as_ref().map_or(0.0, |s| s.elapsed_ms(now_ms))
        );

        Ok(Some(PendingAssessment {
            ticket: self.ticket(),
            request: JudgeRequest {
                drawn_artifact: artifact,
                target_circle: target,
            },
        }))
    }

    /// Feed back the judge outcome for `ticket`
    pub fn resolve_assessment(
        &mut self,
        ticket: RoundTicket,
        outcome: Result<AssessmentResult, JudgeError>,
        now_ms: f64,
    ) -> RoundResolution {
        if ticket != self.ticket() || self.phase != Phase::Assessing {
            log::debug!("Dropping stale judge outcome {:?}", ticket);
            return RoundResolution::Stale;
        }
        let Some(session) = self.session.as_mut() else {
            return RoundResolution::Stale;
        };

        match outcome {
            Ok(result) => {
                session.record_round(&result);
                log::info!(
                    "Round scored {} (accuracy {}, perfection {}); total {}, lives {}",
                    result.final_score,
                    result.accuracy_score,
                    result.perfection_score,
                    session.score,
                    session.lives
                );
                let resolution = RoundResolution::Scored {
                    result: result.clone(),
                    score: session.score,
                    lives: session.lives,
                };
                self.last_result = Some(result);
                self.phase = Phase::Feedback;
                resolution
            }
            Err(e) => {
                log::warn!("Judge failed, redraw without penalty: {e}");
                self.capture.reset();
                self.capture.set_enabled(true);
                self.ticker.start(now_ms);
                self.phase = Phase::Playing;
                RoundResolution::Retry
            }
        }
    }

    /// Close the feedback: next round, or game over with a submission
    pub fn acknowledge_feedback(&mut self, now_ms: f64) -> Result<Advance, TransitionError> {
        self.require(Phase::Feedback, "acknowledge feedback")?;
        let ticket = self.ticket();
        let Some(session) = self.session.as_mut() else {
            return Err(TransitionError::InvalidTransition {
                action: "acknowledge feedback",
                phase: self.phase,
            });
        };

        if !session.is_over() {
            return self.begin_round(now_ms).map(Advance::NextRound);
        }

        session.clock.stop(now_ms);
        let time = session.elapsed_ms(now_ms);
        let new_high_score = self.leaderboard.is_new_high_score(session.score, time);
        let submission = Submission {
            username: session.player_name.clone(),
            score: session.score,
            time,
        };
        log::info!(
            "Game over: {} scored {} in {:.1} s{}",
            submission.username,
            submission.score,
            time / 1000.0,
            if new_high_score { " (new high score)" } else { "" }
        );

        self.new_high_score = new_high_score;
        self.target = None;
        self.phase = Phase::GameOver;
        Ok(Advance::GameOver(PendingSubmission {
            ticket,
            submission,
            new_high_score,
        }))
    }

    /// Feed back the submission outcome; returns the cached rank if stored
    pub fn record_submission(
        &mut self,
        ticket: RoundTicket,
        outcome: Result<LeaderboardEntry, LeaderboardError>,
    ) -> Option<usize> {
        if ticket.epoch != self.epoch {
            log::debug!("Dropping stale submission outcome {:?}", ticket);
            return None;
        }
        match outcome {
            Ok(entry) => self.leaderboard.insert(entry),
            Err(e) => {
                log::warn!("Score submission failed: {e}");
                None
            }
        }
    }

    /// Replace the cached board with a fetched one
    pub fn apply_leaderboard(&mut self, entries: Vec<LeaderboardEntry>) {
        self.leaderboard = Leaderboard::from_entries(entries);
    }

    pub fn set_leaderboard(&mut self, leaderboard: Leaderboard) {
        self.leaderboard = leaderboard;
    }

    /// Elapsed time to display, when a refresh is due
    pub fn display_tick(&mut self, now_ms: f64) -> Option<f64> {
        if !self.ticker.poll(now_ms) {
            return None;
        }
        self.session.as_ref().map(|s| s.elapsed_ms(now_ms))
    }

    pub fn view(&self, now_ms: f64) -> GameView {
        GameView {
            phase: self.phase,
            player_name: self.player_name.clone(),
            score: self.session.as_ref().map_or(0, |s| s.score),
            lives: self.session.as_ref().map_or(0, |s| s.lives),
            elapsed_ms: self.session.as_ref().map_or(0.0, |s| s.elapsed_ms(now_ms)),
            target: self.target,
            path: self.capture.samples().iter().map(|p| p.to_array()).collect(),
            last_result: self.last_result.clone(),
            new_high_score: self.new_high_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::entry;
    use crate::point_on_circle;

    fn started(name: &str) -> GameState {
        let mut state = GameState::new(Settings::default(), 9).unwrap();
        state.set_player_name(name).unwrap();
        state.start_game(0.0).unwrap();
        state
    }

    fn trace_target(state: &mut GameState) {
        let target = *state.target().unwrap();
        for i in 0..=36 {
            let theta = i as f32 / 36.0 * std::f32::consts::TAU;
            let p = point_on_circle(target.center(), target.radius as f32, theta);
            if i == 0 {
                state.gesture_start(p);
            } else {
                state.gesture_move(p);
            }
        }
    }

    fn submit(state: &mut GameState, now_ms: f64) -> PendingAssessment {
        trace_target(state);
        state.gesture_end(now_ms).unwrap().expect("assessment")
    }

    fn play_round(state: &mut GameState, result: AssessmentResult, now_ms: f64) -> Advance {
        let pending = submit(state, now_ms);
        state.resolve_assessment(pending.ticket, Ok(result), now_ms);
        state.acknowledge_feedback(now_ms).unwrap()
    }

    #[test]
    fn test_start_requires_name() {
        let mut state = GameState::new(Settings::default(), 1).unwrap();
        state.set_player_name("   ").unwrap();
        assert!(matches!(state.start_game(0.0), Err(TransitionError::InvalidName(NameError::Empty))));
        assert_eq!(state.phase(), Phase::EnteringName);
    }

    #[test]
    fn test_start_initialises_session() {
        let state = started("  RingRider ");
        let session = state.session().unwrap();
        assert_eq!(session.player_name, "RingRider");
        assert_eq!((session.score, session.lives), (0, 3));
        assert_eq!(state.phase(), Phase::Playing);
        assert!(state.target().is_some());
        assert!(state.capture().is_enabled());
        assert!(state.is_ticking());
    }

    #[test]
    fn test_short_gesture_stays_playing() {
        let mut state = started("A");
        state.gesture_start(Vec2::new(10.0, 10.0));
        assert!(state.gesture_end(5.0).unwrap().is_none());
        assert_eq!(state.phase(), Phase::Playing);
    }

    #[test]
    fn test_assessing_disables_capture_and_ticker() {
        let mut state = started("A");
        let pending = submit(&mut state, 1_000.0);
        assert_eq!(state.phase(), Phase::Assessing);
        assert!(!state.capture().is_enabled());
        assert!(!state.is_ticking());
        assert_eq!(pending.request.target_circle, *state.target().unwrap());

        // A second gesture cannot start another judge call
        state.gesture_start(Vec2::new(1.0, 1.0));
        state.gesture_move(Vec2::new(2.0, 2.0));
        assert!(state.gesture_end(1_100.0).unwrap().is_none());
    }

    #[test]
    fn test_scored_round() {
        let mut state = started("A");
        let pending = submit(&mut state, 1_000.0);
        let resolution = state.resolve_assessment(pending.ticket, Ok(AssessmentResult::new(80, 50, "ok")), 2_000.0);
        assert_eq!(
            resolution,
            RoundResolution::Scored {
                result: AssessmentResult::new(80, 50, "ok"),
                score: 71,
                lives: 2,
            }
        );
        assert_eq!(state.phase(), Phase::Feedback);
        assert_eq!(state.last_result().unwrap().final_score, 71);
    }

    #[test]
    fn test_judge_failure_is_free_retry() {
        let mut state = started("A");
        let target = *state.target().unwrap();
        let pending = submit(&mut state, 1_000.0);
        let resolution = state.resolve_assessment(
            pending.ticket,
            Err(JudgeError::Unavailable("timeout".into())),
            1_500.0,
        );
        assert_eq!(resolution, RoundResolution::Retry);
        assert_eq!(state.phase(), Phase::Playing);
        assert_eq!(state.target(), Some(&target));
        let session = state.session().unwrap();
        assert_eq!((session.score, session.lives), (0, 3));
        assert!(state.capture().is_enabled());
        assert!(state.is_ticking());
    }

    #[test]
    fn test_new_target_each_round_and_path_cleared() {
        let mut state = started("A");
        let first = *state.target().unwrap();
        let advance = play_round(&mut state, AssessmentResult::new(90, 90, "ok"), 1_000.0);
        let Advance::NextRound(second) = advance else {
            panic!("expected next round");
        };
        assert_eq!(state.target(), Some(&second));
        assert!(state.capture().samples().is_empty());
        // Seeded generator moves on; consecutive targets differ
        assert_ne!(first, second);
    }

    #[test]
    fn test_game_over_after_three_rounds() {
        let mut state = started("A");
        let mut submissions = Vec::new();
        for round in 0..3 {
            let now = (round + 1) as f64 * 10_000.0;
            if let Advance::GameOver(pending) = play_round(&mut state, AssessmentResult::new(100, 100, "ok"), now) {
                submissions.push(pending);
            }
        }
        assert_eq!(submissions.len(), 1);
        assert_eq!(state.phase(), Phase::GameOver);
        let submission = &submissions[0].submission;
        assert_eq!(submission.score, 300);
        assert_eq!(submission.time, 30_000.0);
        assert!(submissions[0].new_high_score);

        // No second game over
        assert!(state.acknowledge_feedback(40_000.0).is_err());
        assert!(!state.is_ticking());
        assert_eq!(state.view(99_000.0).elapsed_ms, 30_000.0);
    }

    #[test]
    fn test_high_score_flag_uses_board_before_submit() {
        let mut state = started("A");
        state.apply_leaderboard(vec![entry("Top", 300, 10_000.0)]);
        let mut last = None;
        for _ in 0..3 {
            last = Some(play_round(&mut state, AssessmentResult::new(100, 100, "ok"), 50_000.0));
        }
        let Some(Advance::GameOver(pending)) = last else {
            panic!("expected game over");
        };
        // Equal score, slower: not a new high score
        assert!(!pending.new_high_score);

        let rank = state.record_submission(
            pending.ticket,
            Ok(LeaderboardEntry {
                name: pending.submission.username.clone(),
                score: pending.submission.score,
                time: pending.submission.time,
                created_at: 0.0,
            }),
        );
        assert_eq!(rank, Some(2));
    }

    #[test]
    fn test_failed_submission_keeps_board() {
        let mut state = started("A");
        state.apply_leaderboard(vec![entry("Top", 10, 1.0)]);
        let ticket = state.ticket();
        let rank = state.record_submission(ticket, Err(LeaderboardError::Unavailable("offline".into())));
        assert_eq!(rank, None);
        assert_eq!(state.leaderboard().entries().len(), 1);
    }

    #[test]
    fn test_stale_judge_outcome_ignored_after_abandon() {
        let mut state = started("A");
        let pending = submit(&mut state, 1_000.0);
        state.abandon();
        assert_eq!(state.phase(), Phase::EnteringName);

        let resolution = state.resolve_assessment(pending.ticket, Ok(AssessmentResult::new(100, 100, "late")), 2_000.0);
        assert_eq!(resolution, RoundResolution::Stale);
        assert!(state.session().is_none());
        assert!(state.last_result().is_none());

        let late = state.record_submission(pending.ticket, Ok(entry("A", 1, 1.0)));
        assert_eq!(late, None);
        assert!(state.leaderboard().is_empty());
    }

    #[test]
    fn test_stale_ticket_after_retry() {
        let mut state = started("A");
        let first = submit(&mut state, 1_000.0);
        state.resolve_assessment(first.ticket, Err(JudgeError::Unavailable("x".into())), 1_100.0);
        let second = submit(&mut state, 2_000.0);
        assert_eq!(
            state.resolve_assessment(first.ticket, Ok(AssessmentResult::new(1, 1, "")), 2_100.0),
            RoundResolution::Stale
        );
        assert!(matches!(
            state.resolve_assessment(second.ticket, Ok(AssessmentResult::new(1, 1, "")), 2_200.0),
            RoundResolution::Scored { .. }
        ));
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut state = GameState::new(Settings::default(), 1).unwrap();
        assert!(matches!(
            state.acknowledge_feedback(0.0),
            Err(TransitionError::InvalidTransition { phase: Phase::EnteringName, .. })
        ));
        assert!(state.play_again(0.0).is_err());
        assert!(state.change_name().is_err());

        let mut state = started("A");
        assert!(state.set_player_name("B").is_err());
        assert!(state.start_game(0.0).is_err());
    }

    #[test]
    fn test_play_again_and_change_name() {
        let mut state = started("OrbitAce");
        for _ in 0..3 {
            play_round(&mut state, AssessmentResult::new(50, 50, "ok"), 1_000.0);
        }
        assert_eq!(state.phase(), Phase::GameOver);

        state.play_again(5_000.0).unwrap();
        let session = state.session().unwrap();
        assert_eq!(session.player_name, "OrbitAce");
        assert_eq!((session.score, session.lives), (0, 3));
        assert_eq!(state.view(5_000.0).elapsed_ms, 0.0);

        for _ in 0..3 {
            play_round(&mut state, AssessmentResult::new(50, 50, "ok"), 6_000.0);
        }
        state.change_name().unwrap();
        assert_eq!(state.phase(), Phase::EnteringName);
        assert_eq!(state.player_name(), "OrbitAce");
        assert!(state.session().is_none());
    }

    #[test]
    fn test_display_tick_only_while_playing() {
        let mut state = started("A");
        assert_eq!(state.display_tick(0.0), Some(0.0));
        assert_eq!(state.display_tick(50.0), None);
        assert_eq!(state.display_tick(120.0), Some(120.0));
        submit(&mut state, 200.0);
        assert_eq!(state.display_tick(1_000.0), None);
    }

    #[test]
    fn test_view_snapshot() {
        let mut state = started("A");
        state.gesture_start(Vec2::new(1.0, 2.0));
        state.gesture_move(Vec2::new(3.0, 4.0));
        let view = state.view(500.0);
        assert_eq!(view.phase, Phase::Playing);
        assert_eq!(view.path, vec![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(view.lives, 3);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "playing");
        assert_eq!(json["elapsedMs"], 500.0);
    }
}
