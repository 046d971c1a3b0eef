//! Browser bridge
//!
//! `WebGame` is driven by the page: pointer events in, JSON view snapshots
//! out. The judge and the leaderboard are JavaScript callbacks returning
//! promises. No `RefCell` borrow is held across an await; async outcomes
//! come back through `RoundTicket`s so late answers for an abandoned session
//! are dropped.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use glam::Vec2;
use js_sys::{Function, JSON, Promise};
use serde::Deserialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise, spawn_local};

use crate::judge::{Judge, JudgeError, JudgeRequest, JudgeVerdict, normalize};
use crate::leaderboard::client::parse_data;
use crate::leaderboard::service::ServiceResponse;
use crate::leaderboard::{LeaderboardClient, LeaderboardEntry, LeaderboardError, Submission};
use crate::names::{NameGenerator, RandomNameGenerator};
use crate::persistence::{KeyValueStore, MemoryStore, PlayerProfile};
use crate::platform::{Clock, LocalStorage, SystemClock};
use crate::settings::Settings;
use crate::sim::round::{Advance, GameState};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&JsValue::from_str("Logger already initialised"));
    }
    log::info!("CircleAce starting...");
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn js_message(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Call `callback(arg)` and await the promise it returns, as a JSON string
async fn call_json(callback: &Function, arg: Option<&str>) -> Result<String, String> {
    let returned = match arg {
        Some(arg) => callback.call1(&JsValue::NULL, &JsValue::from_str(arg)),
        None => callback.call0(&JsValue::NULL),
    }
    .map_err(|e| js_message(&e))?;
    let promise: Promise = returned
        .dyn_into()
        .map_err(|_| "callback did not return a promise".to_string())?;
    let value = JsFuture::from(promise).await.map_err(|e| js_message(&e))?;
    if let Some(text) = value.as_string() {
        return Ok(text);
    }
    JSON::stringify(&value)
        .map(String::from)
        .map_err(|e| js_message(&e))
}

/// `judge(requestJson) -> Promise<verdict>`
struct JsJudge {
    callback: Function,
}

#[async_trait(?Send)]
impl Judge for JsJudge {
    async fn assess(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        let payload = serde_json::to_string(request).map_err(|e| JudgeError::InvalidVerdict(e.to_string()))?;
        let text = call_json(&self.callback, Some(&payload))
            .await
            .map_err(JudgeError::Unavailable)?;
        serde_json::from_str(&text).map_err(|e| JudgeError::InvalidVerdict(e.to_string()))
    }
}

/// Resolved value of the leaderboard callbacks, shaped like a fetch response
#[derive(Deserialize)]
struct JsResponse {
    status: u16,
    body: serde_json::Value,
}

/// `submit(bodyJson)` and `fetchTop()`, both `-> Promise<{status, body}>`
struct JsLeaderboard {
    submit: Function,
    fetch_top: Function,
}

impl JsLeaderboard {
    async fn request(&self, callback: &Function, arg: Option<&str>) -> Result<ServiceResponse, LeaderboardError> {
        let text = call_json(callback, arg)
            .await
            .map_err(LeaderboardError::Unavailable)?;
        let response: JsResponse =
            serde_json::from_str(&text).map_err(|e| LeaderboardError::Malformed(e.to_string()))?;
        Ok(ServiceResponse {
            status: response.status,
            body: response.body,
        })
    }
}

#[async_trait(?Send)]
impl LeaderboardClient for JsLeaderboard {
    async fn submit(&self, submission: &Submission) -> Result<LeaderboardEntry, LeaderboardError> {
        let body = serde_json::to_string(submission).map_err(|e| LeaderboardError::Malformed(e.to_string()))?;
        parse_data(self.request(&self.submit, Some(&body)).await?)
    }

    async fn top(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        parse_data(self.request(&self.fetch_top, None).await?)
    }
}

struct Shared {
    state: RefCell<GameState>,
    store: RefCell<Box<dyn KeyValueStore>>,
    profile: RefCell<PlayerProfile>,
    judge: JsJudge,
    leaderboard: JsLeaderboard,
    names: RandomNameGenerator,
    clock: SystemClock,
}

impl Shared {
    fn view_json(&self) -> Result<JsValue, JsValue> {
        let view = self.state.borrow().view(self.clock.now_ms());
        serde_json::to_string(&view).map(JsValue::from).map_err(to_js)
    }

    fn save_leaderboard(&self) {
        let state = self.state.borrow();
        state.leaderboard().save(&mut **self.store.borrow_mut());
    }

    async fn refresh_leaderboard(&self) -> Result<(), LeaderboardError> {
        let entries = self.leaderboard.top().await?;
        self.state.borrow_mut().apply_leaderboard(entries);
        self.save_leaderboard();
        Ok(())
    }
}

#[wasm_bindgen]
pub struct WebGame {
    shared: Rc<Shared>,
}

#[wasm_bindgen]
impl WebGame {
    #[wasm_bindgen(constructor)]
    pub fn new(judge: Function, submit: Function, fetch_top: Function) -> Result<WebGame, JsValue> {
        let store: Box<dyn KeyValueStore> = match LocalStorage::open() {
            Ok(storage) => Box::new(storage),
            Err(e) => {
                log::warn!("{e}, progress will not be kept");
                Box::new(MemoryStore::new())
            }
        };
        let settings = Settings::load(&*store);
        let seed = (js_sys::Math::random() * u32::MAX as f64) as u64 ^ js_sys::Date::now() as u64;
        let mut state = GameState::new(settings, seed).map_err(to_js)?;
        state.set_leaderboard(crate::leaderboard::Leaderboard::load(&*store));
        let profile = PlayerProfile::load(&*store);
        if let Some(name) = &profile.last_name {
            state.set_player_name(name.clone()).map_err(to_js)?;
        }

        let shared = Rc::new(Shared {
            state: RefCell::new(state),
            store: RefCell::new(store),
            profile: RefCell::new(profile),
            judge: JsJudge { callback: judge },
            leaderboard: JsLeaderboard { submit, fetch_top },
            names: RandomNameGenerator::new(seed),
            clock: SystemClock::new(),
        });

        // Fetch the live board so the first game's high-score check is not
        // made against an empty snapshot
        let initial = Rc::clone(&shared);
        spawn_local(async move {
            if let Err(e) = initial.refresh_leaderboard().await {
                log::warn!("Leaderboard refresh failed, using cached snapshot: {e}");
            }
        });

        Ok(WebGame { shared })
    }

    /// Current view as a JSON string
    pub fn view(&self) -> Result<JsValue, JsValue> {
        self.shared.view_json()
    }

    /// Cached top 5 as a JSON string
    pub fn leaderboard(&self) -> Result<JsValue, JsValue> {
        let state = self.shared.state.borrow();
        serde_json::to_string(state.leaderboard().entries())
            .map(JsValue::from)
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = setName)]
    pub fn set_name(&self, name: &str) -> Result<(), JsValue> {
        self.shared.state.borrow_mut().set_player_name(name).map_err(to_js)
    }

    /// Resolves to the suggested name, or undefined if none was applied
    #[wasm_bindgen(js_name = suggestName)]
    pub fn suggest_name(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let name = match shared.names.generate().await {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("Name generator failed: {e}");
                    return Ok(JsValue::UNDEFINED);
                }
            };
            match shared.state.borrow_mut().set_player_name(name.clone()) {
                Ok(()) => Ok(JsValue::from(name)),
                Err(_) => Ok(JsValue::UNDEFINED),
            }
        })
    }

    pub fn start(&self) -> Result<JsValue, JsValue> {
        let now = self.shared.clock.now_ms();
        let name = {
            let mut state = self.shared.state.borrow_mut();
            state.start_game(now).map_err(to_js)?;
            state.player_name().to_string()
        };
        let mut profile = self.shared.profile.borrow_mut();
        if profile.remember(&name) {
            profile.save(&mut **self.shared.store.borrow_mut());
        }
        self.shared.view_json()
    }

    #[wasm_bindgen(js_name = pointerDown)]
    pub fn pointer_down(&self, x: f32, y: f32) {
        self.shared.state.borrow_mut().gesture_start(Vec2::new(x, y));
    }

    #[wasm_bindgen(js_name = pointerMove)]
    pub fn pointer_move(&self, x: f32, y: f32) {
        self.shared.state.borrow_mut().gesture_move(Vec2::new(x, y));
    }

    /// Resolves to the view after the judge answered (or at once if the
    /// gesture was too short)
    #[wasm_bindgen(js_name = pointerUp)]
    pub fn pointer_up(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let now = shared.clock.now_ms();
            let pending = shared.state.borrow_mut().gesture_end(now).map_err(to_js)?;
            if let Some(pending) = pending {
                let outcome = normalize(shared.judge.assess(&pending.request).await);
                let now = shared.clock.now_ms();
                shared
                    .state
                    .borrow_mut()
                    .resolve_assessment(pending.ticket, outcome, now);
            }
            shared.view_json()
        })
    }

    /// Close the feedback; at game over this submits and refreshes the board
    pub fn acknowledge(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            let now = shared.clock.now_ms();
            let advance = shared.state.borrow_mut().acknowledge_feedback(now).map_err(to_js)?;
            if let Advance::GameOver(pending) = advance {
                let outcome = shared.leaderboard.submit(&pending.submission).await;
                let submitted = outcome.is_ok();
                shared
                    .state
                    .borrow_mut()
                    .record_submission(pending.ticket, outcome);
                if submitted {
                    if let Err(e) = shared.refresh_leaderboard().await {
                        log::warn!("Leaderboard refresh failed: {e}");
                    }
                }
                shared.save_leaderboard();
            }
            shared.view_json()
        })
    }

    #[wasm_bindgen(js_name = refreshLeaderboard)]
    pub fn refresh_leaderboard(&self) -> Promise {
        let shared = Rc::clone(&self.shared);
        future_to_promise(async move {
            shared.refresh_leaderboard().await.map_err(to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = playAgain)]
    pub fn play_again(&self) -> Result<JsValue, JsValue> {
        let now = self.shared.clock.now_ms();
        self.shared.state.borrow_mut().play_again(now).map_err(to_js)?;
        self.shared.view_json()
    }

    #[wasm_bindgen(js_name = changeName)]
    pub fn change_name(&self) -> Result<(), JsValue> {
        self.shared.state.borrow_mut().change_name().map_err(to_js)
    }

    /// Leave the session (navigation away); late results are ignored
    pub fn abandon(&self) {
        self.shared.state.borrow_mut().abandon();
    }

    /// Elapsed ms to display when a refresh is due, for a `setInterval` loop
    pub fn tick(&self) -> Option<f64> {
        let now = self.shared.clock.now_ms();
        self.shared.state.borrow_mut().display_tick(now)
    }

    /// Display tick interval (ms) for the page's timer
    #[wasm_bindgen(js_name = tickInterval)]
    pub fn tick_interval(&self) -> f64 {
        self.shared.state.borrow().settings().display_tick_ms
    }
}
