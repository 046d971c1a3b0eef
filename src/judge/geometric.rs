//! Offline judge that scores the drawing by fitting a circle to the ink
//!
//! Accuracy compares the fitted circle with the target (center offset plus
//! radius error, relative to the target radius). Perfection is the radial
//! spread of the ink around its own fit. Both are scaled by how much of a
//! full turn the stroke covers, so arcs and straight lines score low.

use std::f32::consts::TAU;

use async_trait::async_trait;
use glam::Vec2;
use image::GrayImage;

use super::{Judge, JudgeError, JudgeRequest, JudgeVerdict};
use crate::consts::{ACCURACY_WEIGHT, ARTIFACT_STROKE_WIDTH, PERFECTION_WEIGHT};
use crate::sim::target::TargetCircle;

/// Angular resolution of the coverage check
const ANGLE_BINS: usize = 36;
/// Fewer ink pixels than this counts as an empty canvas
const MIN_INK_PIXELS: usize = 10;
/// Pixels closer to the fit center than this fraction of the radius are
/// ignored for coverage
const COVERAGE_INNER_FRACTION: f32 = 0.5;
/// Relative spread at which perfection reaches zero
const SPREAD_TOLERANCE: f32 = 0.25;

/// Circle fitted to the ink of an artifact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleFit {
    pub center: Vec2,
    pub radius: f32,
    /// Radial standard deviation, stroke thickness removed
    pub spread: f32,
    /// Fraction of angle bins around the center that contain ink
    pub coverage: f32,
}

/// Fit a circle to the dark pixels of `image`
pub fn fit_circle(image: &GrayImage, stroke_width: f32) -> Option<CircleFit> {
    let ink: Vec<Vec2> = image
        .enumerate_pixels()
        .filter(|(_, _, px)| px.0[0] < 128)
        .map(|(x, y, _)| Vec2::new(x as f32 + 0.5, y as f32 + 0.5))
        .collect();
    if ink.len() < MIN_INK_PIXELS {
        return None;
    }

    let n = ink.len() as f32;
    let center = ink.iter().copied().sum::<Vec2>() / n;
    let distances: Vec<f32> = ink.iter().map(|p| p.distance(center)).collect();
    let radius = distances.iter().sum::<f32>() / n;
    if radius < 1.0 {
        return None;
    }

    let variance = distances.iter().map(|d| (d - radius).powi(2)).sum::<f32>() / n;
    // A uniform band of width w contributes w^2 / 12 on its own
    let spread = (variance - stroke_width * stroke_width / 12.0).max(0.0).sqrt();

    let mut bins = [false; ANGLE_BINS];
    for (p, d) in ink.iter().zip(&distances) {
        if *d < radius * COVERAGE_INNER_FRACTION {
            continue;
        }
        let offset = *p - center;
        let angle = offset.y.atan2(offset.x).rem_euclid(TAU);
        let bin = ((angle / TAU) * ANGLE_BINS as f32) as usize;
        bins[bin.min(ANGLE_BINS - 1)] = true;
    }
    let coverage = bins.iter().filter(|b| **b).count() as f32 / ANGLE_BINS as f32;

    Some(CircleFit {
        center,
        radius,
        spread,
        coverage,
    })
}

fn drift_direction(offset: Vec2) -> &'static str {
    if offset.x.abs() >= offset.y.abs() {
        if offset.x > 0.0 { "right" } else { "left" }
    } else if offset.y > 0.0 {
        // Canvas y grows downward
        "below"
    } else {
        "above"
    }
}

/// Scores a drawing against its target without any external service
#[derive(Debug, Clone, Copy)]
pub struct GeometricJudge {
    stroke_width: f32,
}

impl Default for GeometricJudge {
    fn default() -> Self {
        Self::new(ARTIFACT_STROKE_WIDTH)
    }
}

impl GeometricJudge {
    pub fn new(stroke_width: f32) -> Self {
        Self { stroke_width }
    }

    /// Score an already decoded drawing
    pub fn score(&self, image: &GrayImage, target: &TargetCircle) -> JudgeVerdict {
        let Some(fit) = fit_circle(image, self.stroke_width) else {
            return JudgeVerdict {
                accuracy_score: 0.0,
                perfection_score: 0.0,
                final_score: 0.0,
                feedback: "No stroke found in the drawing.".to_string(),
            };
        };

        let target_radius = (target.radius as f32).max(1.0);
        let offset = fit.center - target.center();
        let center_error = offset.length();
        let radius_error = (fit.radius - target_radius).abs();
        let closeness = (1.0 - (center_error + radius_error) / target_radius).clamp(0.0, 1.0);
        let relative_spread = fit.spread / fit.radius;
        let roundness = (1.0 - relative_spread / SPREAD_TOLERANCE).clamp(0.0, 1.0);

        let accuracy = 100.0 * closeness * fit.coverage;
        let perfection = 100.0 * roundness * fit.coverage;

        let mut notes = Vec::new();
        if fit.coverage < 0.9 {
            notes.push(format!(
                "Close the loop: the stroke covers only {:.0}% of a full turn.",
                fit.coverage * 100.0
            ));
        }
        let ratio = fit.radius / target_radius;
        if ratio < 0.9 {
            notes.push("Too small: aim for a wider circle.".to_string());
        } else if ratio > 1.1 {
            notes.push("Too large: pull the circle in.".to_string());
        }
        if center_error > 0.1 * target_radius {
            notes.push(format!(
                "The circle drifts {} of the target.",
                drift_direction(offset)
            ));
        }
        if relative_spread > 0.08 {
            notes.push("Keep a steadier hand, the curve wobbles.".to_string());
        }
        if notes.is_empty() {
            notes.push("Excellent trace, nearly perfect!".to_string());
        }

        log::debug!(
            "Fit center=({:.1}, {:.1}) r={:.1} spread={:.2} coverage={:.2}",
            fit.center.x,
            fit.center.y,
            fit.radius,
            fit.spread,
            fit.coverage
        );

        let accuracy = accuracy as f64;
        let perfection = perfection as f64;
        JudgeVerdict {
            accuracy_score: accuracy,
            perfection_score: perfection,
            final_score: ACCURACY_WEIGHT * accuracy + PERFECTION_WEIGHT * perfection,
            feedback: notes.join(" "),
        }
    }
}

#[async_trait(?Send)]
impl Judge for GeometricJudge {
    async fn assess(&self, request: &JudgeRequest) -> Result<JudgeVerdict, JudgeError> {
        let image = request.drawn_artifact.decode()?;
        Ok(self.score(&image, &request.target_circle))
    }
}
