//! Sim Sandbox - deterministic 2D behavior/physics kernel
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, collisions, particles, behaviors, bindings)
//! - `document`: Object/control document schema and validation
//! - `export`: Self-contained replay artifact
//! - `render`: Abstract 2D drawing surface and scene drawing
//! - `platform`: Frame clock and host adapters
//! - `settings`: Host preferences (quality, seed)
//! - `templates`: Preset documents

pub mod document;
pub mod error;
pub mod export;
pub mod platform;
pub mod render;
pub mod settings;
pub mod sim;
pub mod templates;

pub use document::Document;
pub use error::{DocumentError, ExportError, PathError, ScriptError, TemplateError};
pub use settings::{QualityPreset, Settings};
pub use sim::{BehaviorRegistry, Simulation};

use glam::Vec2;

/// Kernel configuration constants
pub mod consts {
    /// Kernel version embedded in export artifacts
    pub const KERNEL_VERSION: &str = env!("CARGO_PKG_VERSION");
    /// Largest frame delta accepted by `Simulation::step` (tab-switch stalls)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Default simulation area
    pub const DEFAULT_CANVAS_WIDTH: f32 = 800.0;
    pub const DEFAULT_CANVAS_HEIGHT: f32 = 600.0;

    /// Default global physics
    pub const DEFAULT_GRAVITY: f32 = 980.0;
    pub const DEFAULT_WALL_BOUNCINESS: f32 = 0.7;

    /// Particle pool capacity when no settings are given
    pub const DEFAULT_PARTICLE_CAPACITY: usize = 500;
    /// Highest accepted emitter rate (particles per second)
    pub const MAX_EMITTER_RATE: f32 = 10_000.0;
    /// Samples kept by a graph control
    pub const GRAPH_HISTORY_LEN: usize = 120;
    /// Upward velocity applied by the jump button action (pixels/s, unit mass)
    pub const DEFAULT_JUMP_IMPULSE: f32 = 500.0;

    /// Estimated glyph advance as a fraction of font size (no measured width)
    pub const TEXT_WIDTH_FACTOR: f32 = 0.6;
    /// Line height as a multiple of font size
    pub const TEXT_LINE_HEIGHT: f32 = 1.2;
}

/// Linear interpolation between two scalars
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Unit vector for an angle in degrees (screen space, y down)
#[inline]
pub fn direction_from_degrees(degrees: f32) -> Vec2 {
    let rad = degrees.to_radians();
    Vec2::new(rad.cos(), rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(4.0, 2.0, 1.0), 2.0);
    }

    #[test]
    fn test_direction_from_degrees() {
        let right = direction_from_degrees(0.0);
        assert!((right.x - 1.0).abs() < 1e-6);
        let down = direction_from_degrees(90.0);
        assert!((down.y - 1.0).abs() < 1e-6);
        assert!(down.x.abs() < 1e-6);
    }
}
