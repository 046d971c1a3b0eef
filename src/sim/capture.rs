//! Freehand path capture
//!
//! One gesture, pointer-down to pointer-up. The captured samples are rendered
//! onto a blank canvas of the target's size and encoded; the result is the
//! only thing the judge ever sees.

use glam::Vec2;
use thiserror::Error;

use crate::renderer::artifact::{ArtifactError, EncodedArtifact};
use crate::renderer::stroke::rasterize_stroke;

/// Fewer samples than this and the gesture is discarded
pub const MIN_GESTURE_SAMPLES: usize = 2;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("artifact encoding failed: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Pointer samples for the gesture in progress
#[derive(Debug, Clone)]
pub struct PathCapture {
    canvas_size: u32,
    stroke_width: f32,
    samples: Vec<Vec2>,
    /// Pointer is down and we are recording
    active: bool,
    /// Input accepted at all (off while the judge works)
    enabled: bool,
}

impl PathCapture {
    pub fn new(canvas_size: u32, stroke_width: f32) -> Self {
        Self {
            canvas_size,
            stroke_width,
            samples: Vec::new(),
            active: false,
            enabled: false,
        }
    }

    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    pub fn samples(&self) -> &[Vec2] {
        &self.samples
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn input on or off; turning it off abandons a gesture in progress
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.active = false;
        }
    }

    /// Drop any samples (new target, abandoned session)
    pub fn reset(&mut self) {
        self.samples.clear();
        self.active = false;
    }

    pub fn on_gesture_start(&mut self, point: Vec2) {
        if !self.enabled {
            return;
        }
        self.samples.clear();
        self.samples.push(point);
        self.active = true;
    }

    pub fn on_gesture_move(&mut self, point: Vec2) {
        if self.enabled && self.active {
            self.samples.push(point);
        }
    }

    /// Finish the gesture
    ///
    /// `Ok(None)` when capture was idle or the path is too short to judge.
    /// Samples are cleared either way.
    pub fn on_gesture_end(&mut self) -> Result<Option<EncodedArtifact>, CaptureError> {
        if !self.enabled || !self.active {
            return Ok(None);
        }
        self.active = false;

        let samples = std::mem::take(&mut self.samples);
        if samples.len() < MIN_GESTURE_SAMPLES {
            log::debug!("Gesture discarded ({} sample)", samples.len());
            return Ok(None);
        }

        let image = rasterize_stroke(self.canvas_size, &samples, self.stroke_width);
        let artifact = EncodedArtifact::encode(&image)?;
        log::debug!(
            "Captured gesture: {} samples, {} png bytes",
            samples.len(),
            artifact.png_bytes().len()
        );
        Ok(Some(artifact))
    }
}
