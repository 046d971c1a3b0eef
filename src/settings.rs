//! Game settings and preview theme
//!
//! Persisted separately from the player profile, through the same key-value
//! store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{ARTIFACT_STROKE_WIDTH, DEFAULT_CANVAS_SIZE, DISPLAY_TICK_MS};
use crate::persistence::{Envelope, KeyValueStore};
use crate::sim::target::{TargetConfig, TargetError};

/// Preview colors and line styles (RGBA, straight alpha)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: [u8; 4],
    /// Dashed target outline
    pub target: [u8; 4],
    /// Player stroke
    pub stroke: [u8; 4],
    pub target_line_width: f32,
    pub dash_length: f32,
    pub gap_length: f32,
    pub stroke_width: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: [250, 248, 255, 255],
            // Accent at half opacity
            target: [147, 112, 219, 128],
            stroke: [75, 0, 130, 255],
            target_line_width: 3.0,
            dash_length: 8.0,
            gap_length: 8.0,
            stroke_width: 5.0,
        }
    }
}

impl Theme {
    /// High contrast variant: opaque black on white
    pub fn high_contrast() -> Self {
        Self {
            background: [255, 255, 255, 255],
            target: [90, 90, 90, 255],
            stroke: [0, 0, 0, 255],
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("invalid target geometry: {0}")]
    Target(#[from] TargetError),
    #[error("{field} must be positive (got {value})")]
    NotPositive { field: &'static str, value: f64 },
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Square canvas edge, used for targets and artifacts alike
    pub canvas_size: u32,
    /// Padding as a fraction of the canvas edge
    pub padding_fraction: f64,
    /// Smallest target radius as a fraction of the canvas edge
    pub min_radius_fraction: f64,
    /// Stroke width of the judged artifact
    pub artifact_stroke_width: f32,
    /// Elapsed-time display refresh (ms)
    pub display_tick_ms: f64,
    /// Preview styling
    pub theme: Theme,
}

impl Default for Settings {
    fn default() -> Self {
        let target = TargetConfig::default();
        Self {
            canvas_size: DEFAULT_CANVAS_SIZE,
            padding_fraction: target.padding_fraction,
            min_radius_fraction: target.min_radius_fraction,
            artifact_stroke_width: ARTIFACT_STROKE_WIDTH,
            display_tick_ms: DISPLAY_TICK_MS,
            theme: Theme::default(),
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "circle_ace_settings";
    /// Bump when the stored shape changes
    const VERSION: u32 = 1;

    /// Settings with a different canvas edge
    pub fn with_canvas_size(canvas_size: u32) -> Self {
        Self {
            canvas_size,
            ..Self::default()
        }
    }

    pub fn target_config(&self) -> TargetConfig {
        TargetConfig {
            padding_fraction: self.padding_fraction,
            min_radius_fraction: self.min_radius_fraction,
        }
    }

    /// Reject settings the round loop cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.target_config().bounds(self.canvas_size)?;
        positive("artifact_stroke_width", self.artifact_stroke_width as f64)?;
        positive("display_tick_ms", self.display_tick_ms)?;
        Ok(())
    }

    /// Load from the store, falling back to defaults on missing or invalid data
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let settings: Settings = Envelope::load(store, Self::STORAGE_KEY, Self::VERSION);
        match settings.validate() {
            Ok(()) => settings,
            Err(err) => {
                log::warn!("Stored settings rejected ({err}), using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) {
        if Envelope::save(store, Self::STORAGE_KEY, Self::VERSION, self) {
            log::info!("Settings saved");
        }
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), SettingsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SettingsError::NotPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(Settings::default().validate(), Ok(()));
        assert_eq!(Settings::default().canvas_size, 600);
    }

    #[test]
    fn test_small_canvas_rejected() {
        let settings = Settings::with_canvas_size(50);
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::Target(TargetError::CanvasTooSmall { .. }))
        ));
    }

    #[test]
    fn test_zero_tick_rejected() {
        let settings = Settings {
            display_tick_ms: 0.0,
            ..Settings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::NotPositive {
                field: "display_tick_ms",
                value: 0.0
            })
        );
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MemoryStore::new();
        let settings = Settings {
            theme: Theme::high_contrast(),
            ..Settings::with_canvas_size(800)
        };
        settings.save(&mut store);
        assert_eq!(Settings::load(&store), settings);
    }

    #[test]
    fn test_invalid_stored_settings_fall_back() {
        let mut store = MemoryStore::new();
        Settings::with_canvas_size(10).save(&mut store);
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_oversized_stored_canvas_falls_back() {
        let mut store = MemoryStore::new();
        store
            .set(
                "circle_ace_settings",
                r#"{"version":1,"payload":{"canvas_size":3000000}}"#,
            )
            .unwrap();
        assert!(matches!(
            Settings::with_canvas_size(3_000_000).validate(),
            Err(SettingsError::Target(TargetError::CanvasTooLarge { .. }))
        ));
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let mut store = MemoryStore::new();
        store
            .set(
                "circle_ace_settings",
                r#"{"version":1,"payload":{"canvas_size":400}}"#,
            )
            .unwrap();
        let settings = Settings::load(&store);
        assert_eq!(settings.canvas_size, 400);
        assert_eq!(settings.theme, Theme::default());
    }
}
