//! Leaderboard client
//!
//! The game talks to the leaderboard through `LeaderboardClient`; the
//! in-process client routes JSON through a `LeaderboardService` so the wire
//! format is exercised even without a network.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::service::{LeaderboardService, ScoreStore, ServiceRequest, ServiceResponse};
use super::{LeaderboardEntry, Submission};
use crate::platform::Clock;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("leaderboard server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("malformed leaderboard response: {0}")]
    Malformed(String),
    #[error("leaderboard unavailable: {0}")]
    Unavailable(String),
}

impl LeaderboardError {
    fn from_response(response: &ServiceResponse) -> Self {
        let message = response.body["error"]
            .as_str()
            .unwrap_or("unknown error")
            .to_string();
        if response.status < 500 {
            LeaderboardError::Rejected {
                status: response.status,
                message,
            }
        } else {
            LeaderboardError::Server {
                status: response.status,
                message,
            }
        }
    }
}

/// Remote leaderboard as seen by the game
#[async_trait(?Send)]
pub trait LeaderboardClient {
    /// Store one finished session
    async fn submit(&self, submission: &Submission) -> Result<LeaderboardEntry, LeaderboardError>;
    /// Current top 5
    async fn top(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}

#[async_trait(?Send)]
impl<L: LeaderboardClient + ?Sized> LeaderboardClient for Rc<L> {
    async fn submit(&self, submission: &Submission) -> Result<LeaderboardEntry, LeaderboardError> {
        (**self).submit(submission).await
    }

    async fn top(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        (**self).top().await
    }
}

#[async_trait(?Send)]
impl<L: LeaderboardClient + ?Sized> LeaderboardClient for Box<L> {
    async fn submit(&self, submission: &Submission) -> Result<LeaderboardEntry, LeaderboardError> {
        (**self).submit(submission).await
    }

    async fn top(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        (**self).top().await
    }
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

pub(crate) fn parse_data<T: for<'de> Deserialize<'de>>(response: ServiceResponse) -> Result<T, LeaderboardError> {
    if !response.is_success() {
        return Err(LeaderboardError::from_response(&response));
    }
    serde_json::from_value::<DataEnvelope<T>>(response.body)
        .map(|envelope| envelope.data)
        .map_err(|e| LeaderboardError::Malformed(e.to_string()))
}

/// Client bound to a service in the same process
pub struct InProcessLeaderboard<S: ScoreStore, C: Clock> {
    service: RefCell<LeaderboardService<S, C>>,
}

impl<S: ScoreStore, C: Clock> InProcessLeaderboard<S, C> {
    pub fn new(service: LeaderboardService<S, C>) -> Self {
        Self {
            service: RefCell::new(service),
        }
    }

    fn call(&self, request: ServiceRequest) -> ServiceResponse {
        self.service.borrow_mut().handle(&request)
    }
}

#[async_trait(?Send)]
impl<S: ScoreStore, C: Clock> LeaderboardClient for InProcessLeaderboard<S, C> {
    async fn submit(&self, submission: &Submission) -> Result<LeaderboardEntry, LeaderboardError> {
        let body = serde_json::to_string(submission).map_err(|e| LeaderboardError::Malformed(e.to_string()))?;
        parse_data(self.call(ServiceRequest::post(body)))
    }

    async fn top(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        parse_data(self.call(ServiceRequest::get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::MemoryScoreStore;
    use crate::platform::ManualClock;

    fn client() -> InProcessLeaderboard<MemoryScoreStore, ManualClock> {
        InProcessLeaderboard::new(LeaderboardService::new(MemoryScoreStore::new(), ManualClock::new(5_000.0)))
    }

    fn submission(name: &str, score: u32, time: f64) -> Submission {
        Submission {
            username: name.into(),
            score,
            time,
        }
    }

    #[test]
    fn test_submit_and_fetch() {
        let client = client();
        let saved = pollster::block_on(client.submit(&submission("OrbitAce", 180, 30_000.0))).unwrap();
        assert_eq!(saved.name, "OrbitAce");
        assert_eq!(saved.created_at, 5_000.0);

        pollster::block_on(client.submit(&submission("RingRider", 200, 45_000.0))).unwrap();
        let top = pollster::block_on(client.top()).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "RingRider");
    }

    #[test]
    fn test_rejection_maps_to_error() {
        let client = client();
        let err = pollster::block_on(client.submit(&submission("   ", 10, 1.0))).unwrap_err();
        assert!(matches!(err, LeaderboardError::Rejected { status: 400, .. }));
    }

    #[test]
    fn test_hosted_response_shape() {
        let response = ServiceResponse {
            status: 200,
            body: serde_json::json!({"data": [
                {"_id": "665b1f", "username": "RingRider", "score": 200, "time": 45000,
                 "createdAt": "2025-06-01T12:00:00.000Z", "__v": 0},
                {"_id": "665b20", "username": "OrbitAce", "score": 180, "time": 30000,
                 "createdAt": "2025-06-02T08:30:00+02:00", "__v": 0}
            ]}),
        };
        let top = parse_data::<Vec<LeaderboardEntry>>(response).unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "RingRider");
        assert_eq!(top[1].created_at, 1_748_845_800_000.0);
    }

    #[test]
    fn test_malformed_body() {
        let response = ServiceResponse {
            status: 200,
            body: serde_json::json!({"rows": []}),
        };
        let err = parse_data::<Vec<LeaderboardEntry>>(response).unwrap_err();
        assert!(matches!(err, LeaderboardError::Malformed(_)));
    }
}
