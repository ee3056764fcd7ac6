//! Object/control document
//!
//! The persisted form of a simulation, shared by the authoring session,
//! templates and export artifacts. `validate` runs before anything is
//! admitted into a `Simulation`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, MAX_EMITTER_RATE};
use crate::error::DocumentError;
use crate::sim::behavior::BehaviorRegistry;
use crate::sim::binding::{ButtonAction, Control, ControlKind};
use crate::sim::object::{Color, Shape, SimObject};
use crate::sim::physics::PhysicsSettings;

/// Current document schema version
pub const DOCUMENT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

/// Simulation area and background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
    pub background: Color,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
            background: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub canvas: Canvas,
    #[serde(default)]
    pub physics: PhysicsSettings,
    /// RNG seed; replays are only reproducible when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub objects: Vec<SimObject>,
    #[serde(default)]
    pub controls: Vec<Control>,
    /// Global script rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            canvas: Canvas::default(),
            physics: PhysicsSettings::default(),
            seed: None,
            objects: Vec::new(),
            controls: Vec::new(),
            script: None,
        }
    }
}

impl Document {
    /// Parse without validating references (needs a registry, see `validate`)
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the whole document; the first problem found is returned
    pub fn validate(&self, registry: &BehaviorRegistry) -> Result<(), DocumentError> {
        if self.version != DOCUMENT_VERSION {
            return Err(DocumentError::Version {
                found: self.version,
                expected: DOCUMENT_VERSION,
            });
        }
        self.validate_globals()?;

        let mut ids = BTreeSet::new();
        for obj in &self.objects {
            if obj.id.trim().is_empty() {
                return Err(DocumentError::EmptyId("object"));
            }
            if !ids.insert(obj.id.as_str()) {
                return Err(DocumentError::DuplicateObject(obj.id.clone()));
            }
            validate_object(obj, registry)?;
        }

        let mut control_ids = BTreeSet::new();
        for control in &self.controls {
            if control.id.trim().is_empty() {
                return Err(DocumentError::EmptyId("control"));
            }
            if !control_ids.insert(control.id.as_str()) {
                return Err(DocumentError::DuplicateControl(control.id.clone()));
            }
            validate_control(control, &ids)?;
        }
        Ok(())
    }

    fn validate_globals(&self) -> Result<(), DocumentError> {
        let canvas = &self.canvas;
        if !(canvas.width.is_finite() && canvas.height.is_finite())
            || canvas.width <= 0.0
            || canvas.height <= 0.0
        {
            return Err(DocumentError::InvalidSettings {
                field: "canvas",
                reason: format!("size {}x{} must be positive", canvas.width, canvas.height),
            });
        }

        let p = &self.physics;
        let finite = [p.gravity, p.wind, p.friction, p.wall_bounciness, p.time_scale]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(DocumentError::InvalidSettings {
                field: "physics",
                reason: "values must be finite".into(),
            });
        }
        if p.friction < 0.0 {
            return Err(DocumentError::InvalidSettings {
                field: "physics.friction",
                reason: "must not be negative".into(),
            });
        }
        if !(0.0..=1.0).contains(&p.wall_bounciness) {
            return Err(DocumentError::InvalidSettings {
                field: "physics.wall_bounciness",
                reason: "must be between 0 and 1".into(),
            });
        }
        if p.time_scale < 0.0 {
            return Err(DocumentError::InvalidSettings {
                field: "physics.time_scale",
                reason: "must not be negative".into(),
            });
        }
        Ok(())
    }
}

fn invalid(obj: &SimObject, reason: impl Into<String>) -> DocumentError {
    DocumentError::InvalidObject {
        id: obj.id.clone(),
        reason: reason.into(),
    }
}

fn validate_object(obj: &SimObject, registry: &BehaviorRegistry) -> Result<(), DocumentError> {
    if !obj.position.is_finite() {
        return Err(invalid(obj, "position must be finite"));
    }
    if !(0.0..=1.0).contains(&obj.opacity) {
        return Err(invalid(obj, "opacity must be between 0 and 1"));
    }

    let lengths = match &obj.shape {
        Shape::Circle { radius } => vec![("radius", *radius)],
        Shape::Rect { width, height } => vec![("width", *width), ("height", *height)],
        Shape::Text { font_size, .. } => vec![("font_size", *font_size)],
        Shape::Symbol { size, .. } => vec![("size", *size)],
    };
    for (name, value) in lengths {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(obj, format!("{name} must be positive")));
        }
    }

    if let Some(physics) = &obj.physics {
        if !physics.mass.is_finite() || physics.mass <= 0.0 {
            return Err(invalid(obj, "physics.mass must be positive"));
        }
        if physics.bounciness.is_some_and(|b| !(0.0..=1.0).contains(&b)) {
            return Err(invalid(obj, "physics.bounciness must be between 0 and 1"));
        }
        if !physics.velocity.is_finite() {
            return Err(invalid(obj, "physics.velocity must be finite"));
        }
    }

    if let Some(emitter) = &obj.emitter {
        if !(0.0..=MAX_EMITTER_RATE).contains(&emitter.rate) {
            return Err(invalid(obj, "emitter.rate must be between 0 and 10000"));
        }
        if emitter.template.lifetime <= 0.0 {
            return Err(invalid(obj, "emitter lifetime must be positive"));
        }
    }

    for behavior in &obj.behaviors {
        if !registry.contains(behavior) {
            return Err(DocumentError::UnknownBehavior {
                object: obj.id.clone(),
                behavior: behavior.clone(),
            });
        }
    }
    for behavior in obj.params.keys().chain(obj.activation.keys()) {
        if !obj.has_behavior(behavior) {
            return Err(invalid(obj, format!("settings for behavior '{behavior}' it does not use")));
        }
    }
    Ok(())
}

fn validate_control(control: &Control, objects: &BTreeSet<&str>) -> Result<(), DocumentError> {
    let fail = |reason: &str| DocumentError::InvalidBinding {
        control: control.id.clone(),
        reason: reason.to_string(),
    };

    let Some(binding) = &control.binding else {
        return Ok(());
    };
    for target in &binding.targets {
        if !objects.contains(target.as_str()) {
            return Err(DocumentError::UnknownTarget {
                control: control.id.clone(),
                object: target.clone(),
            });
        }
    }

    match control.kind {
        ControlKind::Button => match binding.action {
            None => Err(fail("button without an action")),
            Some(
                ButtonAction::StartBehavior | ButtonAction::StopBehavior | ButtonAction::ToggleBehavior,
            ) if binding.action_id.as_deref().is_none_or(str::is_empty) => {
                Err(fail("behavior trigger without an action id"))
            }
            Some(_) => Ok(()),
        },
        ControlKind::Graph if binding.targets.is_empty() => Err(fail("graph without a target")),
        ControlKind::Graph if control.history_len == 0 => Err(fail("graph history must hold samples")),
        _ if binding.property.trim().is_empty() => Err(fail("binding without a property path")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::binding::Binding;
    use glam::Vec2;

    fn registry() -> BehaviorRegistry {
        BehaviorRegistry::with_builtins()
    }

    const SAMPLE: &str = r##"{
        "canvas": { "width": 640, "height": 480, "background": "#101010" },
        "physics": { "gravity": 1500, "wall_bounciness": 0.8 },
        "seed": 7,
        "objects": [
            { "id": "ball", "shape": "circle", "radius": 30, "position": [100, 0],
              "physics": { "bounciness": 0.8 } },
            { "id": "title", "shape": "text", "text": "Hi", "font_size": 24,
              "position": [320, 40], "behaviors": ["typewriter"],
              "params": { "typewriter": { "chars_per_second": 10 } },
              "activation": { "typewriter": { "mode": "on_click" } } }
        ],
        "controls": [
            { "id": "g", "kind": "slider", "value": 900,
              "binding": { "targets": ["ball"], "property": "physics.mass" } }
        ]
    }"##;

    #[test]
    fn test_parse_sample() {
        let doc = Document::from_json(SAMPLE).unwrap();
        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert_eq!(doc.canvas.width, 640.0);
        assert_eq!(doc.physics.gravity, 1500.0);
        assert_eq!(doc.physics.time_scale, 1.0);
        assert_eq!(doc.seed, Some(7));
        assert_eq!(doc.objects[0].shape, Shape::Circle { radius: 30.0 });
        assert_eq!(doc.objects[0].position, Vec2::new(100.0, 0.0));
        assert!(doc.objects[0].physics.as_ref().unwrap().enabled);
        assert_eq!(doc.controls[0].kind, ControlKind::Slider);
        doc.validate(&registry()).unwrap();
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let err = Document::from_json(r#"{ "objects": [ { "id": "a", "shape": "circle" } ] }"#)
            .unwrap_err();
        assert!(matches!(err, DocumentError::Json(_)));

        assert!(Document::from_json(r#"{ "canvas": {} }"#).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_references() {
        let mut doc = Document::from_json(SAMPLE).unwrap();
        doc.objects[1].behaviors.push("teleport".into());
        assert!(matches!(
            doc.validate(&registry()),
            Err(DocumentError::UnknownBehavior { .. })
        ));

        let mut doc = Document::from_json(SAMPLE).unwrap();
        doc.controls[0].binding.as_mut().unwrap().targets.push("ghost".into());
        assert!(matches!(
            doc.validate(&registry()),
            Err(DocumentError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn test_validate_geometry_and_settings() {
        let mut doc = Document::default();
        doc.objects.push(SimObject::circle("c", Vec2::ZERO, -1.0));
        assert!(matches!(
            doc.validate(&registry()),
            Err(DocumentError::InvalidObject { .. })
        ));

        let mut doc = Document::default();
        doc.physics.wall_bounciness = 1.5;
        assert!(matches!(
            doc.validate(&registry()),
            Err(DocumentError::InvalidSettings { .. })
        ));

        let mut doc = Document::default();
        doc.version = 9;
        assert!(matches!(
            doc.validate(&registry()),
            Err(DocumentError::Version { found: 9, .. })
        ));
    }

    #[test]
    fn test_validate_controls() {
        let mut doc = Document::default();
        doc.objects.push(SimObject::circle("c", Vec2::ZERO, 5.0));
        doc.controls.push(Control::new(
            "b",
            ControlKind::Button,
            Some(Binding::action(&["c"], ButtonAction::StartBehavior)),
        ));
        assert!(matches!(
            doc.validate(&registry()),
            Err(DocumentError::InvalidBinding { .. })
        ));

        doc.controls[0] = Control::new("s", ControlKind::Slider, Some(Binding::property(&["c"], "")));
        assert!(matches!(
            doc.validate(&registry()),
            Err(DocumentError::InvalidBinding { .. })
        ));

        doc.controls.push(Control::new("s", ControlKind::Checkbox, None));
        doc.controls[0] = Control::new("s", ControlKind::Slider, Some(Binding::property(&["c"], "x")));
        assert!(matches!(
            doc.validate(&registry()),
            Err(DocumentError::DuplicateControl(_))
        ));
    }

    #[test]
    fn test_json_round_trip_keeps_overrides() {
        let doc = Document::from_json(SAMPLE).unwrap();
        let back = Document::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(back.objects[1].params, doc.objects[1].params);
        assert_eq!(back.objects[1].activation, doc.objects[1].activation);
        assert_eq!(back.canvas, doc.canvas);
    }
}
