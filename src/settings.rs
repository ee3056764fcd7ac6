//! Player settings and preferences
//!
//! Host-side only; never part of a document. Read from LocalStorage in the
//! browser player.

use serde::{Deserialize, Serialize};

use crate::consts::GRAPH_HISTORY_LEN;
use crate::sim::SimOptions;

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    /// Particle pool capacity for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }
}

/// Player preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,
    /// Particle effects (emitters, bursts)
    pub particles: bool,
    /// Seed for documents that do not carry one
    pub seed: u64,
    /// Samples kept by graph controls
    pub graph_history: usize,
    /// Reduced motion: play documents at half speed
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            particles: true,
            seed: 0,
            graph_history: GRAPH_HISTORY_LEN,
            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective particle cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    /// Frame delta multiplier applied by the player
    pub fn playback_speed(&self) -> f32 {
        if self.reduced_motion { 0.5 } else { 1.0 }
    }

    /// Options for building a simulation
    pub fn sim_options(&self) -> SimOptions {
        SimOptions {
            particle_capacity: self.max_particles(),
            seed: self.seed,
            graph_history: Some(self.graph_history.max(1)),
        }
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "sim_sandbox_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(settings) = serde_json::from_str(&json) {
                    log::info!("Loaded settings from LocalStorage");
                    return settings;
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Native stub
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_options_follow_settings() {
        let mut settings = Settings::from_preset(QualityPreset::Low);
        settings.seed = 42;
        let options = settings.sim_options();
        assert_eq!(options.particle_capacity, 100);
        assert_eq!(options.seed, 42);
        assert_eq!(options.graph_history, Some(GRAPH_HISTORY_LEN));

        settings.particles = false;
        assert_eq!(settings.sim_options().particle_capacity, 0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{ "quality": "High" }"#).unwrap();
        assert_eq!(settings.quality, QualityPreset::High);
        assert!(settings.particles);
        assert_eq!(settings.graph_history, GRAPH_HISTORY_LEN);
    }
}
