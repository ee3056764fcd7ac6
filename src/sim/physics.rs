//! Per-object physics integration and wall reflection
//!
//! Order per object and frame is fixed: gravity and wind, friction damping,
//! position integration, then boundary clamp/reflect. Export replays depend on it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::object::SimObject;
use crate::consts::{DEFAULT_GRAVITY, DEFAULT_WALL_BOUNCINESS};

/// Global physics parameters of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    /// Vertical acceleration (pixels/s², positive = down)
    pub gravity: f32,
    /// Horizontal acceleration (pixels/s²)
    pub wind: f32,
    /// Damping per second, applied as `v *= 1 - friction * dt`
    pub friction: f32,
    /// Restitution for objects without their own bounciness
    pub wall_bounciness: f32,
    /// Multiplier applied to every frame delta
    pub time_scale: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            wind: 0.0,
            friction: 0.0,
            wall_bounciness: DEFAULT_WALL_BOUNCINESS,
            time_scale: 1.0,
        }
    }
}

/// Semi-implicit Euler step for one object. Returns false when physics is off.
pub fn integrate(obj: &mut SimObject, settings: &PhysicsSettings, dt: f32) -> bool {
    let Some(physics) = obj.physics.as_mut() else {
        return false;
    };
    if !physics.enabled {
        return false;
    }

    physics.velocity.y += settings.gravity * dt;
    physics.velocity.x += settings.wind * dt;
    physics.velocity *= 1.0 - settings.friction * dt;
    obj.position += physics.velocity * dt;
    true
}

/// Clamp an object inside `[0, area]` and reflect the crossing velocity axis.
/// Returns true if any wall was hit.
pub fn reflect_walls(obj: &mut SimObject, area: Vec2, default_bounciness: f32) -> bool {
    let radius = obj.effective_radius();
    let Some(physics) = obj.physics.as_mut() else {
        return false;
    };
    let bounce = physics.bounciness.unwrap_or(default_bounciness);
    let pos = &mut obj.position;
    let vel = &mut physics.velocity;
    let mut hit = false;

    if pos.x - radius < 0.0 {
        pos.x = radius;
        vel.x = -vel.x * bounce;
        hit = true;
    } else if pos.x + radius > area.x {
        pos.x = area.x - radius;
        vel.x = -vel.x * bounce;
        hit = true;
    }

    if pos.y - radius < 0.0 {
        pos.y = radius;
        vel.y = -vel.y * bounce;
        hit = true;
    } else if pos.y + radius > area.y {
        pos.y = area.y - radius;
        vel.y = -vel.y * bounce;
        hit = true;
    }

    hit
}

/// Integrate and reflect every enabled object, skipping the one being dragged
pub fn step_physics(
    objects: &mut [SimObject],
    settings: &PhysicsSettings,
    area: Vec2,
    dt: f32,
    dragging: Option<&str>,
) {
    for obj in objects.iter_mut() {
        if dragging == Some(obj.id.as_str()) {
            continue;
        }
        if integrate(obj, settings, dt) {
            reflect_walls(obj, area, settings.wall_bounciness);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::object::PhysicsState;

    fn ball(y: f32, bounciness: Option<f32>) -> SimObject {
        SimObject::circle("ball", Vec2::new(100.0, y), 30.0).with_physics(PhysicsState {
            bounciness,
            ..Default::default()
        })
    }

    #[test]
    fn test_bounce_law() {
        let settings = PhysicsSettings {
            gravity: 1500.0,
            friction: 0.0,
            ..Default::default()
        };
        let area = Vec2::new(800.0, 600.0);
        let dt = 1.0 / 120.0;
        let mut obj = ball(0.0, Some(0.8));

        let mut pre_contact = 0.0;
        for _ in 0..1000 {
            let before = obj.physics.as_ref().unwrap().velocity.y;
            step_physics(std::slice::from_mut(&mut obj), &settings, area, dt, None);
            let after = obj.physics.as_ref().unwrap().velocity.y;
            if after < 0.0 {
                pre_contact = before + settings.gravity * dt;
                break;
            }
        }

        let expected = (2.0f32 * 1500.0 * 570.0).sqrt();
        assert!(
            (pre_contact - expected).abs() / expected < 0.02,
            "contact speed {pre_contact} vs {expected}"
        );
        let post = obj.physics.as_ref().unwrap().velocity.y;
        assert!((post + 0.8 * pre_contact).abs() < 1e-2);
        assert!((post - (-0.8 * expected)).abs() / expected < 0.02);
        assert_eq!(obj.position.y, 570.0);
    }

    #[test]
    fn test_order_gravity_friction_position() {
        let settings = PhysicsSettings {
            gravity: 100.0,
            wind: 50.0,
            friction: 0.5,
            ..Default::default()
        };
        let mut obj = ball(300.0, None);
        integrate(&mut obj, &settings, 0.1);
        let vel = obj.physics.as_ref().unwrap().velocity;
        // (0 + 100*0.1) * (1 - 0.05) = 9.5 ; (0 + 50*0.1) * 0.95 = 4.75
        assert!((vel.y - 9.5).abs() < 1e-5);
        assert!((vel.x - 4.75).abs() < 1e-5);
        assert!((obj.position.y - (300.0 + 0.95)).abs() < 1e-4);
        assert!((obj.position.x - (100.0 + 0.475)).abs() < 1e-4);
    }

    #[test]
    fn test_default_wall_bounciness() {
        let mut obj = ball(100.0, None);
        obj.position.x = 10.0;
        obj.physics.as_mut().unwrap().velocity = Vec2::new(-200.0, 0.0);
        assert!(reflect_walls(&mut obj, Vec2::new(800.0, 600.0), 0.5));
        assert_eq!(obj.position.x, 30.0);
        assert_eq!(obj.physics.as_ref().unwrap().velocity.x, 100.0);
    }

    #[test]
    fn test_rect_uses_half_max_extent() {
        let mut obj = SimObject::rect("box", Vec2::new(400.0, 590.0), 40.0, 100.0)
            .with_physics(PhysicsState::default());
        reflect_walls(&mut obj, Vec2::new(800.0, 600.0), 1.0);
        assert_eq!(obj.position.y, 550.0);
    }

    #[test]
    fn test_disabled_and_dragged_objects_untouched() {
        let settings = PhysicsSettings::default();
        let area = Vec2::new(800.0, 600.0);
        let mut objects = vec![
            ball(100.0, None),
            SimObject::circle("static", Vec2::new(50.0, 50.0), 10.0),
        ];
        objects[0].physics.as_mut().unwrap().enabled = false;
        step_physics(&mut objects, &settings, area, 0.1, None);
        assert_eq!(objects[0].position.y, 100.0);
        assert_eq!(objects[1].position.y, 50.0);

        objects[0].physics.as_mut().unwrap().enabled = true;
        step_physics(&mut objects, &settings, area, 0.1, Some("ball"));
        assert_eq!(objects[0].position.y, 100.0);
    }
}
