//! Judge collaborator
//!
//! The judge receives the encoded drawing plus the target and answers with
//! three scores and feedback. Whatever it returns is normalised here before
//! the round loop sees it: finite, clamped to [0, 100], rounded, and the final
//! score recomputed from the 70/30 weighting.

pub mod geometric;

pub use geometric::GeometricJudge;

use std::rc::Rc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::MAX_SCORE;
use crate::renderer::artifact::{ArtifactError, EncodedArtifact};
use crate::sim::state::AssessmentResult;
use crate::sim::target::TargetCircle;
use crate::weighted_final_score;

/// What the judge is asked to score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeRequest {
    /// `data:image/png;base64,...`
    pub drawn_artifact: EncodedArtifact,
    pub target_circle: TargetCircle,
}

/// Raw judge answer, before normalisation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeVerdict {
    pub accuracy_score: f64,
    pub perfection_score: f64,
    pub final_score: f64,
    pub feedback: String,
}

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge unavailable: {0}")]
    Unavailable(String),
    #[error("judge returned an unusable verdict: {0}")]
    InvalidVerdict(String),
    #[error("artifact unreadable: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Scores one drawing per call
#[async_trait(?Send)]
pub trait Judge {
    async fn assess(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError>;
}

#[async_trait(?Send)]
impl<J: Judge + ?Sized> Judge for Rc<J> {
    async fn assess(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        (**self).assess(request).await
    }
}

#[async_trait(?Send)]
impl<J: Judge + ?Sized> Judge for Box<J> {
    async fn assess(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        (**self).assess(request).await
    }
}

/// Round to an integer score in [0, 100]
fn to_score(field: &str, value: f64) -> Result<u8, JudgeError> {
    if !value.is_finite() {
        return Err(JudgeError::InvalidVerdict(format!("{field} is {value}")));
    }
    Ok(value.round().clamp(0.0, MAX_SCORE as f64) as u8)
}

impl TryFrom<JudgeVerdict> for AssessmentResult {
    type Error = JudgeError;

    fn try_from(verdict: JudgeVerdict) -> Result<Self, Self::Error> {
        let accuracy = to_score("accuracyScore", verdict.accuracy_score)?;
        let perfection = to_score("perfectionScore", verdict.perfection_score)?;
        let reported = to_score("finalScore", verdict.final_score)?;

        let result = AssessmentResult::new(accuracy, perfection, verdict.feedback);
        if reported.abs_diff(result.final_score) > 1 {
            log::warn!(
                "Judge final score {reported} disagrees with weighted {}, using weighted",
                result.final_score
            );
        }
        Ok(result)
    }
}

/// Normalise a verdict, keeping the judge's error if it failed
pub fn normalize(outcome: Result<JudgeVerdict, JudgeError>) -> Result<AssessmentResult, JudgeError> {
    outcome.and_then(AssessmentResult::try_from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn verdict(accuracy: f64, perfection: f64, final_score: f64) -> JudgeVerdict {
        JudgeVerdict {
            accuracy_score: accuracy,
            perfection_score: perfection,
            final_score,
            feedback: "ok".into(),
        }
    }

    #[test]
    fn test_scores_rounded_before_weighting() {
        let result = AssessmentResult::try_from(verdict(79.6, 49.5, 71.0)).unwrap();
        assert_eq!(result.accuracy_score, 80);
        assert_eq!(result.perfection_score, 50);
        assert_eq!(result.final_score, 71);
    }

    #[test]
    fn test_out_of_range_clamped() {
        let result = AssessmentResult::try_from(verdict(140.0, -3.0, 90.0)).unwrap();
        assert_eq!(result.accuracy_score, 100);
        assert_eq!(result.perfection_score, 0);
        assert_eq!(result.final_score, 70);
    }

    #[test]
    fn test_diverging_final_is_overridden() {
        let result = AssessmentResult::try_from(verdict(100.0, 0.0, 12.0)).unwrap();
        assert_eq!(result.final_score, 70);
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = AssessmentResult::try_from(verdict(f64::NAN, 10.0, 10.0)).unwrap_err();
        assert!(matches!(err, JudgeError::InvalidVerdict(_)));
    }

    #[test]
    fn test_verdict_wire_names() {
        let json = r#"{"accuracyScore":91.2,"perfectionScore":80,"finalScore":88,"feedback":"Nice"}"#;
        let parsed: JudgeVerdict = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.accuracy_score, 91.2);
        assert_eq!(parsed.feedback, "Nice");
    }

    #[test]
    fn test_normalize_passes_errors_through() {
        let err = normalize(Err(JudgeError::Unavailable("timeout".into()))).unwrap_err();
        assert!(matches!(err, JudgeError::Unavailable(_)));
    }

    proptest! {
        #[test]
        fn prop_final_score_is_weighted(acc in -50.0f64..150.0, perf in -50.0f64..150.0, fin in 0.0f64..100.0) {
            let result = AssessmentResult::try_from(verdict(acc, perf, fin)).unwrap();
            let expected = 0.7 * result.accuracy_score as f64 + 0.3 * result.perfection_score as f64;
            prop_assert!((result.final_score as f64 - expected).abs() <= 0.5 + 1e-9);
            prop_assert!(result.accuracy_score <= 100 && result.perfection_score <= 100);
        }
    }
}
