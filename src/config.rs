use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchor::DynamicAnchor;

/// Alignment of a symbol part against the map surface or the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    Map,
    Viewport,
}

/// Layout properties of one symbol layer, resolved once per bucket instead
/// of looked up by name during the pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SymbolLayerConfig {
    pub text_pitch_alignment: Alignment,
    pub text_rotation_alignment: Alignment,
    pub icon_pitch_alignment: Alignment,
    pub icon_rotation_alignment: Alignment,
    /// Whether text may be dropped while the icon stays, and vice versa.
    pub text_optional: bool,
    pub icon_optional: bool,
    pub text_allow_overlap: bool,
    pub icon_allow_overlap: bool,
    /// Drawn but never inserted into the collision index.
    pub text_ignore_placement: bool,
    pub icon_ignore_placement: bool,
    /// Ranked anchor candidates; empty means the anchor is fixed by the
    /// layout and placement makes a single attempt.
    pub dynamic_text_anchor: Vec<DynamicAnchor>,
    pub text_size: f32,
}

impl Default for SymbolLayerConfig {
    fn default() -> Self {
        Self {
            text_pitch_alignment: Alignment::Viewport,
            text_rotation_alignment: Alignment::Viewport,
            icon_pitch_alignment: Alignment::Viewport,
            icon_rotation_alignment: Alignment::Viewport,
            text_optional: false,
            icon_optional: false,
            text_allow_overlap: false,
            icon_allow_overlap: false,
            text_ignore_placement: false,
            icon_ignore_placement: false,
            dynamic_text_anchor: Vec::new(),
            text_size: 16.0,
        }
    }
}

impl SymbolLayerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.text_size.is_finite() || self.text_size <= 0.0 {
            return Err(ConfigError::InvalidTextSize(self.text_size));
        }
        Ok(())
    }
}

/// Global placement settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacementConfig {
    /// Fade window in milliseconds; 0 makes transitions instantaneous.
    pub fade_duration: f64,
    /// When false each source gets an exclusive collision group and labels
    /// from different sources never block each other.
    pub cross_source_collisions: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            fade_duration: 300.0,
            cross_source_collisions: true,
        }
    }
}

impl PlacementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fade_duration.is_finite() || self.fade_duration < 0.0 {
            return Err(ConfigError::InvalidFadeDuration(self.fade_duration));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("textSize must be positive and finite, got {0}")]
    InvalidTextSize(f32),
    #[error("fadeDuration must be non-negative and finite, got {0}")]
    InvalidFadeDuration(f64),
}

/// Placement settings plus per-layer symbol layout, as read from a style
/// config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleConfig {
    pub placement: PlacementConfig,
    pub layers: BTreeMap<String, SymbolLayerConfig>,
}

impl StyleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.placement.validate()?;
        for layer in self.layers.values() {
            layer.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StyleConfigFile {
    placement: Option<PlacementConfig>,
    layers: Option<BTreeMap<String, SymbolLayerConfig>>,
}

/// Load a style config, overlaying the file's sections onto defaults. A
/// missing path yields the default config.
pub fn load_style_config(path: Option<&Path>) -> anyhow::Result<StyleConfig> {
    let mut config = StyleConfig::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let parsed: StyleConfigFile = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse config {}", path.display()))?;

    if let Some(placement) = parsed.placement {
        config.placement = placement;
    }
    if let Some(layers) = parsed.layers {
        config.layers = layers;
    }
    config.validate()?;
    Ok(config)
}
