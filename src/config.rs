//! Session and model configuration.
//!
//! One-shot session options mirror the tracking engine's enumerated config
//! surface. `resolve()` checks requested options against backend
//! capabilities: unsupported depth degrades to disabled plus a persistent
//! user-visible warning instead of failing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LightEstimationMode {
    Disabled,
    AmbientIntensity,
    #[default]
    EnvironmentalHdr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FocusMode {
    Fixed,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlaneFindingMode {
    Disabled,
    Horizontal,
    Vertical,
    #[default]
    HorizontalAndVertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    #[default]
    Automatic,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstantPlacementMode {
    #[default]
    Disabled,
    LocalYUp,
}

/// One-shot session setup options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub light_estimation: LightEstimationMode,
    pub focus: FocusMode,
    pub plane_finding: PlaneFindingMode,
    pub depth: DepthMode,
    pub instant_placement: InstantPlacementMode,
    /// Names of registered reference images. A configured session only
    /// recognizes (and reports) images named here.
    pub reference_images: Vec<String>,
    /// Whether the presentation layer draws detected planes. Carried for
    /// renderers; headless runs have nothing to draw.
    pub plane_renderer: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            light_estimation: LightEstimationMode::default(),
            focus: FocusMode::default(),
            plane_finding: PlaneFindingMode::default(),
            depth: DepthMode::default(),
            instant_placement: InstantPlacementMode::default(),
            reference_images: Vec::new(),
            plane_renderer: true,
        }
    }
}

/// Requested config reconciled with backend capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub config: SessionConfig,
    /// Depth was requested but the backend cannot provide it.
    pub depth_degraded: bool,
}

impl SessionConfig {
    /// Reconcile against capabilities. Unsupported depth is degraded to
    /// disabled and flagged; everything else passes through.
    pub fn resolve(&self, depth_supported: bool) -> ResolvedConfig {
        let mut config = self.clone();
        let depth_degraded = config.depth == DepthMode::Automatic && !depth_supported;
        if depth_degraded {
            config.depth = DepthMode::Disabled;
        }
        ResolvedConfig {
            config,
            depth_degraded,
        }
    }
}

/// A placeable 3D model the placement experience can cycle through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Asset path the renderer loads the model from.
    pub asset: String,
    /// Uniform scale applied at placement.
    pub scale_to_units: f32,
    /// Allowed uniform-scale range while editing.
    pub scale_range: (f32, f32),
}

impl ModelConfig {
    pub fn new(asset: &str, scale_to_units: f32) -> Self {
        Self {
            asset: asset.to_string(),
            scale_to_units,
            scale_range: (0.1, 3.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_demo_setup() {
        let cfg = SessionConfig::default();
        assert_eq!(cfg.light_estimation, LightEstimationMode::EnvironmentalHdr);
        assert_eq!(cfg.focus, FocusMode::Auto);
        assert_eq!(cfg.plane_finding, PlaneFindingMode::HorizontalAndVertical);
        assert_eq!(cfg.depth, DepthMode::Automatic);
        assert_eq!(cfg.instant_placement, InstantPlacementMode::Disabled);
    }

    #[test]
    fn test_depth_degrades_when_unsupported() {
        let resolved = SessionConfig::default().resolve(false);
        assert!(resolved.depth_degraded);
        assert_eq!(resolved.config.depth, DepthMode::Disabled);

        let resolved = SessionConfig::default().resolve(true);
        assert!(!resolved.depth_degraded);
        assert_eq!(resolved.config.depth, DepthMode::Automatic);
    }

    #[test]
    fn test_disabled_depth_never_degrades() {
        let cfg = SessionConfig {
            depth: DepthMode::Disabled,
            ..Default::default()
        };
        let resolved = cfg.resolve(false);
        assert!(!resolved.depth_degraded);
    }

    #[test]
    fn test_config_json_roundtrip() {
        let cfg = SessionConfig {
            reference_images: vec!["mario".into(), "pom".into()],
            plane_renderer: false,
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SessionConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
