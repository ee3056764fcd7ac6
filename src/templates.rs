//! Preset documents
//!
//! The host asks a `TemplateSource` for a named document and builds a fresh
//! simulation from it. Built-in presets are constructed in code.

use glam::Vec2;

use crate::document::Document;
use crate::error::TemplateError;
use crate::sim::{
    ActivationConfig, ActivationMode, BehaviorRegistry, Binding, ButtonAction, Color, Control,
    ControlKind, Emitter, PhysicsState, Shape, SimObject, SimOptions, Simulation, SpawnConfig,
};

/// Provider of named preset documents
pub trait TemplateSource {
    fn names(&self) -> Vec<&'static str>;

    fn document(&self, name: &str) -> Option<Document>;

    /// Validate the preset and build a simulation from it
    fn instantiate(
        &self,
        name: &str,
        registry: BehaviorRegistry,
        options: SimOptions,
    ) -> Result<Simulation, TemplateError> {
        let doc = self
            .document(name)
            .ok_or_else(|| TemplateError::Unknown(name.to_string()))?;
        log::info!("instantiating template '{}'", name);
        Ok(Simulation::from_document(doc, registry, options)?)
    }
}

/// Presets shipped with the kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

impl TemplateSource for BuiltinTemplates {
    fn names(&self) -> Vec<&'static str> {
        vec!["bouncing_balls", "playground"]
    }

    fn document(&self, name: &str) -> Option<Document> {
        match name {
            "bouncing_balls" => Some(bouncing_balls()),
            "playground" => Some(playground()),
            _ => None,
        }
    }
}

fn bouncing_balls() -> Document {
    let mut doc = Document {
        seed: Some(1),
        ..Document::default()
    };

    for i in 0..5 {
        let t = i as f32 / 4.0;
        let mut ball = SimObject::circle(
            format!("ball{i}"),
            Vec2::new(120.0 + i as f32 * 140.0, 80.0 + i as f32 * 30.0),
            18.0 + i as f32 * 4.0,
        )
        .with_physics(PhysicsState {
            velocity: Vec2::new(150.0 - i as f32 * 75.0, 0.0),
            bounciness: Some(0.5 + 0.4 * t),
            ..Default::default()
        })
        .with_behavior("flash_on_collision");
        ball.fill = Color::from_hsl(200.0 + 40.0 * i as f32, 0.7, 0.55);
        ball.draggable = true;
        doc.objects.push(ball);
    }

    let ids: Vec<String> = doc.objects.iter().map(|o| o.id.clone()).collect();
    let targets: Vec<&str> = ids.iter().map(String::as_str).collect();

    doc.controls = vec![
        Control::new(
            "mass",
            ControlKind::Slider,
            Some(Binding::property(&targets, "physics.mass")),
        )
        .with_value(1.0),
        Control::new("jump", ControlKind::Button, Some(Binding::action(&targets, ButtonAction::Jump)))
            .with_value(600.0),
        Control::new(
            "reset",
            ControlKind::Button,
            Some(Binding::action(&targets, ButtonAction::ResetPosition)),
        ),
        Control::new(
            "colors",
            ControlKind::Button,
            Some(Binding::action(&targets, ButtonAction::RandomizeColor)),
        ),
        Control::new(
            "height",
            ControlKind::Graph,
            Some(Binding::property(&["ball0"], "velocity.y")),
        ),
    ];
    doc
}

fn playground() -> Document {
    let mut doc = Document {
        seed: Some(7),
        ..Document::default()
    };
    doc.physics.gravity = 0.0;

    let title = SimObject::text("title", Vec2::new(400.0, 60.0), "Click anything", 32.0)
        .with_behavior("typewriter")
        .with_param("typewriter", "chars_per_second", 12.0);

    let mut spinner = SimObject::rect("spinner", Vec2::new(150.0, 220.0), 80.0, 80.0)
        .with_behavior("rotate")
        .with_activation("rotate", ActivationConfig::new(ActivationMode::OnHover));
    spinner.fill = Color::rgb(0.95, 0.6, 0.2);

    let star = SimObject::new(
        "star",
        Shape::Symbol {
            glyph: "★".into(),
            size: 64.0,
        },
        Vec2::new(400.0, 240.0),
    )
    .with_behavior("pulse")
    .with_activation("pulse", ActivationConfig::new(ActivationMode::OnClickToggle));

    let moon = SimObject::circle("moon", Vec2::new(650.0, 240.0), 20.0)
        .with_behavior("orbit")
        .with_param("orbit", "radius", 60.0)
        .with_activation("orbit", ActivationConfig::manual("orbit"));

    let firework = SimObject::circle("firework", Vec2::new(150.0, 450.0), 24.0)
        .with_behavior("burst")
        .with_param("burst", "count", 40.0)
        .with_activation("burst", ActivationConfig::new(ActivationMode::OnClick));

    let mut fountain = SimObject::rect("fountain", Vec2::new(650.0, 560.0), 40.0, 12.0);
    fountain.emitter = Some(Emitter::new(
        20.0,
        SpawnConfig {
            speed: 220.0,
            spread: 30.0,
            gravity: 300.0,
            end_color: Some(Color::rgb(0.2, 0.4, 1.0).with_alpha(0.0)),
            ..SpawnConfig::default()
        },
    ));

    let mut crate_box = SimObject::rect("crate", Vec2::new(400.0, 450.0), 60.0, 60.0)
        .with_behavior("wander")
        .with_activation("wander", ActivationConfig::new(ActivationMode::OnClickToggle));
    crate_box.draggable = true;
    crate_box.stroke = Some(Color::BLACK);
    crate_box.stroke_width = 2.0;

    doc.objects = vec![title, spinner, star, moon, firework, fountain, crate_box];

    let mut orbit_toggle = Binding::action(&["moon"], ButtonAction::ToggleBehavior);
    orbit_toggle.action_id = Some("orbit".into());
    doc.controls = vec![
        Control::new("orbit", ControlKind::Button, Some(orbit_toggle)),
        Control::new(
            "spin",
            ControlKind::Slider,
            Some(Binding::property(&["spinner"], "rotate.speed")),
        )
        .with_value(180.0),
        Control::new(
            "fountain",
            ControlKind::Checkbox,
            Some(Binding::property(&["fountain"], "emitter.enabled")),
        )
        .with_value(true),
    ];
    doc.script = Some("# slowly tilt the title\nrate title.rotation 2\n".into());
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_presets_validate_and_run() {
        let templates = BuiltinTemplates;
        for name in templates.names() {
            let mut sim = templates
                .instantiate(name, BehaviorRegistry::with_builtins(), SimOptions::default())
                .unwrap();
            assert!(sim.script_errors().is_empty(), "{name}");
            for _ in 0..120 {
                assert!(sim.step(1.0 / 60.0));
            }
            assert!(sim.objects().iter().all(|o| o.position.is_finite()), "{name}");
        }
    }

    #[test]
    fn test_unknown_template() {
        let err = BuiltinTemplates
            .instantiate("nope", BehaviorRegistry::with_builtins(), SimOptions::default())
            .unwrap_err();
        assert!(matches!(err, TemplateError::Unknown(_)));
    }

    #[test]
    fn test_graph_samples_each_frame() {
        let mut sim = BuiltinTemplates
            .instantiate("bouncing_balls", BehaviorRegistry::with_builtins(), SimOptions::default())
            .unwrap();
        for _ in 0..10 {
            sim.step(1.0 / 60.0);
        }
        assert_eq!(sim.control("height").unwrap().history().len(), 10);
    }
}
