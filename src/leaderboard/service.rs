//! Leaderboard service
//!
//! Transport-agnostic handler for the two leaderboard calls:
//! - `POST` `{username, score, time}` stores a result (201)
//! - `GET` returns the top 5 as `{data: [...]}` (200)
//!
//! Bodies are JSON values so a real HTTP layer only has to move bytes.

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use super::{LeaderboardEntry, rank_order};
use crate::consts::{LEADERBOARD_SIZE, MAX_NAME_LEN};
use crate::platform::Clock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("score store failure: {0}")]
    Failure(String),
}

/// Durable score storage behind the service
pub trait ScoreStore {
    fn insert(&mut self, entry: LeaderboardEntry) -> Result<(), StoreError>;
    /// Best `limit` entries in ranking order
    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

/// Keeps every submitted entry in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    entries: Vec<LeaderboardEntry>,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ScoreStore for MemoryScoreStore {
    fn insert(&mut self, entry: LeaderboardEntry) -> Result<(), StoreError> {
        self.entries.push(entry);
        Ok(())
    }

    fn top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(rank_order);
        ranked.truncate(limit);
        Ok(ranked)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRequest {
    pub method: Method,
    pub body: Option<String>,
}

impl ServiceRequest {
    pub fn get() -> Self {
        Self {
            method: Method::Get,
            body: None,
        }
    }

    pub fn post(body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: Value,
}

impl ServiceResponse {
    fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, json!({ "error": message.into() }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw POST body; field types are checked by hand for precise 400s
#[derive(Debug, Deserialize)]
struct RawSubmission {
    username: Option<Value>,
    score: Option<Value>,
    time: Option<Value>,
}

const MISSING_FIELDS: &str = "Username, score, and time are required";

fn validate(raw: RawSubmission) -> Result<(String, u32, f64), String> {
    let username = match raw.username {
        Some(Value::String(name)) => name.trim().to_string(),
        _ => return Err(MISSING_FIELDS.to_string()),
    };
    if username.is_empty() {
        return Err(MISSING_FIELDS.to_string());
    }
    if username.chars().count() > MAX_NAME_LEN {
        return Err(format!("Username cannot exceed {MAX_NAME_LEN} characters"));
    }

    let (Some(Value::Number(score)), Some(Value::Number(time))) = (raw.score, raw.time) else {
        return Err(MISSING_FIELDS.to_string());
    };
    let score = match score.as_i64() {
        Some(s) if s < 0 => return Err("Score cannot be negative".to_string()),
        Some(s) => u32::try_from(s).map_err(|_| "Score is out of range".to_string())?,
        None => return Err("Score must be a whole number".to_string()),
    };
    let time = time.as_f64().filter(|t| t.is_finite()).ok_or(MISSING_FIELDS)?;
    if time < 0.0 {
        return Err("Time cannot be negative".to_string());
    }
    Ok((username, score, time))
}

/// Handles leaderboard requests against a score store
pub struct LeaderboardService<S: ScoreStore, C: Clock> {
    store: S,
    clock: C,
}

impl<S: ScoreStore, C: Clock> LeaderboardService<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn handle(&mut self, request: &ServiceRequest) -> ServiceResponse {
        match request.method {
            Method::Get => self.top_scores(),
            Method::Post => self.save_score(request.body.as_deref().unwrap_or("")),
        }
    }

    fn save_score(&mut self, body: &str) -> ServiceResponse {
        let raw: RawSubmission = match serde_json::from_str(body) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Rejected score submission: {e}");
                return ServiceResponse::error(400, MISSING_FIELDS);
            }
        };
        let (username, score, time) = match validate(raw) {
            Ok(fields) => fields,
            Err(message) => {
                log::warn!("Rejected score submission: {message}");
                return ServiceResponse::error(400, message);
            }
        };

        let entry = LeaderboardEntry {
            name: username,
            score,
            time,
            created_at: self.clock.now_ms(),
        };
        match self.store.insert(entry.clone()) {
            Ok(()) => {
                log::info!("Score saved: {} {} in {:.0} ms", entry.name, entry.score, entry.time);
                ServiceResponse::new(
                    201,
                    json!({ "message": "Score saved successfully", "data": entry }),
                )
            }
            Err(e) => {
                log::error!("Error saving score: {e}");
                ServiceResponse::error(500, "Failed to save score")
            }
        }
    }

    fn top_scores(&self) -> ServiceResponse {
        match self.store.top(LEADERBOARD_SIZE) {
            Ok(entries) => ServiceResponse::new(200, json!({ "data": entries })),
            Err(e) => {
                log::error!("Error fetching leaderboard: {e}");
                ServiceResponse::error(500, "Failed to fetch leaderboard")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ManualClock;

    struct FailingStore;

    impl ScoreStore for FailingStore {
        fn insert(&mut self, _entry: LeaderboardEntry) -> Result<(), StoreError> {
            Err(StoreError::Failure("disk full".into()))
        }

        fn top(&self, _limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
            Err(StoreError::Failure("offline".into()))
        }
    }

    fn service() -> LeaderboardService<MemoryScoreStore, ManualClock> {
        LeaderboardService::new(MemoryScoreStore::new(), ManualClock::new(1_000.0))
    }

    fn post(service: &mut LeaderboardService<MemoryScoreStore, ManualClock>, body: Value) -> ServiceResponse {
        service.handle(&ServiceRequest::post(body.to_string()))
    }

    #[test]
    fn test_post_then_get() {
        let mut service = service();
        let response = post(&mut service, json!({"username": "  ArcAngel ", "score": 250, "time": 41_500}));
        assert_eq!(response.status, 201);
        assert_eq!(response.body["message"], "Score saved successfully");
        assert_eq!(response.body["data"]["username"], "ArcAngel");
        assert_eq!(response.body["data"]["createdAt"], 1_000.0);

        let response = service.handle(&ServiceRequest::get());
        assert_eq!(response.status, 200);
        assert_eq!(response.body["data"][0]["score"], 250);
    }

    #[test]
    fn test_get_ranks_and_limits() {
        let mut service = service();
        for (name, score, time) in [("A", 100, 5), ("B", 100, 3), ("C", 90, 1), ("D", 10, 1), ("E", 20, 1), ("F", 30, 1)] {
            post(&mut service, json!({"username": name, "score": score, "time": time}));
        }
        let response = service.handle(&ServiceRequest::get());
        let names: Vec<_> = response.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["username"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["B", "A", "C", "F", "E"]);
        assert_eq!(service.store().len(), 6);
    }

    #[test]
    fn test_post_validation() {
        let mut service = service();
        let bad = [
            json!({"score": 10, "time": 1}),
            json!({"username": "   ", "score": 10, "time": 1}),
            json!({"username": "A", "score": "10", "time": 1}),
            json!({"username": "A", "score": 10}),
            json!({"username": "A", "score": -1, "time": 1}),
            json!({"username": "A", "score": 1.5, "time": 1}),
            json!({"username": "A", "score": 10, "time": -1}),
            json!({"username": "ThisNameIsWayTooLongToKeep", "score": 10, "time": 1}),
        ];
        for body in bad {
            let response = post(&mut service, body.clone());
            assert_eq!(response.status, 400, "{body}");
            assert!(response.body["error"].is_string());
        }
        let response = service.handle(&ServiceRequest::post("not json"));
        assert_eq!(response.status, 400);
        assert!(service.store().is_empty());
    }

    #[test]
    fn test_store_failures_are_500() {
        let mut service = LeaderboardService::new(FailingStore, ManualClock::new(0.0));
        let response = service.handle(&ServiceRequest::post(
            json!({"username": "A", "score": 1, "time": 1}).to_string(),
        ));
        assert_eq!(response.status, 500);
        assert_eq!(response.body["error"], "Failed to save score");

        let response = service.handle(&ServiceRequest::get());
        assert_eq!(response.status, 500);
        assert_eq!(response.body["error"], "Failed to fetch leaderboard");
    }
}
