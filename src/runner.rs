//! Game runner
//!
//! Drives `GameState` with real collaborators: makes the judge call after a
//! gesture, submits the result at game over, refreshes the leaderboard and
//! keeps the local profile and leaderboard snapshot saved.

use glam::Vec2;
use image::RgbaImage;

use crate::judge::{Judge, normalize};
use crate::leaderboard::{Leaderboard, LeaderboardClient, LeaderboardError};
use crate::names::NameGenerator;
use crate::persistence::{KeyValueStore, PlayerProfile};
use crate::platform::Clock;
use crate::renderer::preview::render_preview;
use crate::settings::{Settings, SettingsError};
use crate::sim::round::{Advance, GameState, RoundResolution, TransitionError};
use crate::sim::state::GameView;
use crate::sim::target::TargetCircle;

/// Everything the runner talks to outside the game state
pub struct Collaborators {
    pub judge: Box<dyn Judge>,
    pub leaderboard: Box<dyn LeaderboardClient>,
    pub names: Box<dyn NameGenerator>,
    pub store: Box<dyn KeyValueStore>,
    pub clock: Box<dyn Clock>,
}

pub struct GameRunner {
    state: GameState,
    profile: PlayerProfile,
    judge: Box<dyn Judge>,
    leaderboard: Box<dyn LeaderboardClient>,
    names: Box<dyn NameGenerator>,
    store: Box<dyn KeyValueStore>,
    clock: Box<dyn Clock>,
}

impl GameRunner {
    /// Build the runner and restore the profile and leaderboard snapshot
    pub fn new(settings: Settings, collaborators: Collaborators, seed: u64) -> Result<Self, SettingsError> {
        let Collaborators {
            judge,
            leaderboard,
            names,
            store,
            clock,
        } = collaborators;

        let mut state = GameState::new(settings, seed)?;
        let profile = PlayerProfile::load(&*store);
        state.set_leaderboard(Leaderboard::load(&*store));
        if let Some(name) = &profile.last_name {
            if let Err(e) = state.set_player_name(name.clone()) {
                log::warn!("Could not pre-fill name: {e}");
            }
        }

        Ok(Self {
            state,
            profile,
            judge,
            leaderboard,
            names,
            store,
            clock,
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        &*self.store
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn view(&self) -> GameView {
        self.state.view(self.now_ms())
    }

    /// Themed preview of the current target and stroke
    pub fn preview(&self) -> RgbaImage {
        let settings = self.state.settings();
        render_preview(
            settings.canvas_size,
            self.state.target(),
            self.state.capture().samples(),
            &settings.theme,
        )
    }

    /// Fetch the top 5; on failure the cached board stays as it was
    ///
    /// Call once before the first game: `new` only has the local snapshot,
    /// which is empty on a fresh device.
    pub async fn refresh_leaderboard(&mut self) -> Result<(), LeaderboardError> {
        let entries = self.leaderboard.top().await?;
        self.state.apply_leaderboard(entries);
        self.state.leaderboard().save(&mut *self.store);
        Ok(())
    }

    /// Ask the name generator for a suggestion and put it in the name field
    ///
    /// On failure the field is left unchanged.
    pub async fn suggest_name(&mut self) -> Option<String> {
        let name = match self.names.generate().await {
            Ok(name) => name,
            Err(e) => {
                log::warn!("Name generator failed: {e}");
                return None;
            }
        };
        match self.state.set_player_name(name.clone()) {
            Ok(()) => Some(name),
            Err(e) => {
                log::debug!("Suggestion dropped: {e}");
                None
            }
        }
    }

    pub fn set_name(&mut self, name: &str) -> Result<(), TransitionError> {
        self.state.set_player_name(name)
    }

    /// Start a session with the name in the name field
    pub fn start(&mut self) -> Result<TargetCircle, TransitionError> {
        let target = self.state.start_game(self.clock.now_ms())?;
        if self.profile.remember(self.state.player_name()) {
            self.profile.save(&mut *self.store);
        }
        Ok(target)
    }

    pub fn pointer_down(&mut self, point: Vec2) {
        self.state.gesture_start(point);
    }

    pub fn pointer_move(&mut self, point: Vec2) {
        self.state.gesture_move(point);
    }

    /// End the gesture and, if it produced a drawing, judge it
    pub async fn pointer_up(&mut self) -> Result<Option<RoundResolution>, TransitionError> {
        let Some(pending) = self.state.gesture_end(self.clock.now_ms())? else {
            return Ok(None);
        };
        let outcome = normalize(self.judge.assess(&pending.request).await);
        let now = self.clock.now_ms();
        Ok(Some(self.state.resolve_assessment(pending.ticket, outcome, now)))
    }

    /// Close the feedback; at game over, submit and refresh the board
    pub async fn acknowledge(&mut self) -> Result<Advance, TransitionError> {
        let advance = self.state.acknowledge_feedback(self.clock.now_ms())?;
        if let Advance::GameOver(pending) = &advance {
            let outcome = self.leaderboard.submit(&pending.submission).await;
            let submitted = outcome.is_ok();
            if let Some(rank) = self.state.record_submission(pending.ticket, outcome) {
                log::info!("{} placed #{rank}", pending.submission.username);
            }
            if submitted {
                if let Err(e) = self.refresh_leaderboard().await {
                    log::warn!("Leaderboard refresh failed: {e}");
                }
            }
            self.state.leaderboard().save(&mut *self.store);
        }
        Ok(advance)
    }

    pub fn play_again(&mut self) -> Result<TargetCircle, TransitionError> {
        self.state.play_again(self.clock.now_ms())
    }

    pub fn change_name(&mut self) -> Result<(), TransitionError> {
        self.state.change_name()
    }

    pub fn abandon(&mut self) {
        self.state.abandon();
    }

    pub fn display_tick(&mut self) -> Option<f64> {
        let now = self.clock.now_ms();
        self.state.display_tick(now)
    }
}
