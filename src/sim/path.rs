//! Dotted property paths
//!
//! Shared by data bindings, the inspector and scripts. The first segment
//! decides the namespace: `physics` addresses the physics state, one of the
//! object's own behavior ids addresses that behavior's parameters, anything
//! else is a direct field.

use super::behavior::BehaviorRegistry;
use super::object::{PhysicsState, Shape, SimObject, Value};
use crate::consts::MAX_EMITTER_RATE;
use crate::error::PathError;

fn number(path: &str, value: &Value) -> Result<f32, PathError> {
    value.as_f32().ok_or_else(|| PathError::TypeMismatch {
        path: path.to_string(),
        expected: "a number",
    })
}

fn flag(path: &str, value: &Value) -> Result<bool, PathError> {
    value.as_bool().ok_or_else(|| PathError::TypeMismatch {
        path: path.to_string(),
        expected: "a boolean",
    })
}

fn text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
    }
}

fn color(path: &str, value: &Value) -> Result<super::object::Color, PathError> {
    value.as_color().ok_or_else(|| PathError::TypeMismatch {
        path: path.to_string(),
        expected: "a color",
    })
}

/// Read a property; behavior parameters fall back to the registered default
pub fn get_property(
    obj: &SimObject,
    path: &str,
    registry: &BehaviorRegistry,
) -> Result<Value, PathError> {
    let (head, rest) = split(path)?;

    if head == "physics" {
        let physics = obj
            .physics
            .as_ref()
            .ok_or_else(|| PathError::NoPhysics(path.to_string()))?;
        return get_physics(physics, rest.unwrap_or(""), path);
    }

    if let Some(param) = rest.filter(|_| obj.has_behavior(head)) {
        let value = obj
            .params
            .get(head)
            .and_then(|p| p.get(param))
            .or_else(|| registry.get(head).and_then(|b| b.defaults.get(param)));
        return value
            .cloned()
            .ok_or_else(|| PathError::UnknownField(path.to_string()));
    }

    get_field(obj, path)
}

/// Write a property. Physics paths create a (disabled) physics state on demand.
pub fn set_property(obj: &mut SimObject, path: &str, value: &Value) -> Result<(), PathError> {
    let (head, rest) = split(path)?;

    if head == "physics" {
        let field = rest.unwrap_or("");
        let physics = obj.physics.get_or_insert_with(|| PhysicsState {
            enabled: false,
            ..Default::default()
        });
        return set_physics(physics, field, value, path);
    }

    if let Some(param) = rest.filter(|_| obj.has_behavior(head)) {
        obj.params
            .entry(head.to_string())
            .or_default()
            .insert(param.to_string(), value.clone());
        return Ok(());
    }

    set_field(obj, path, value)
}

fn split(path: &str) -> Result<(&str, Option<&str>), PathError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    })
}

fn get_physics(physics: &PhysicsState, field: &str, path: &str) -> Result<Value, PathError> {
    Ok(match field {
        "enabled" => Value::Bool(physics.enabled),
        "mass" => physics.mass.into(),
        "bounciness" => physics.bounciness.map(Value::from).unwrap_or(Value::Number(0.0)),
        "velocity.x" | "vx" => physics.velocity.x.into(),
        "velocity.y" | "vy" => physics.velocity.y.into(),
        "speed" => physics.velocity.length().into(),
        _ => return Err(PathError::UnknownField(path.to_string())),
    })
}

fn set_physics(
    physics: &mut PhysicsState,
    field: &str,
    value: &Value,
    path: &str,
) -> Result<(), PathError> {
    match field {
        "enabled" => physics.enabled = flag(path, value)?,
        "mass" => physics.mass = number(path, value)?.max(1e-3),
        "bounciness" => physics.bounciness = Some(number(path, value)?.clamp(0.0, 1.0)),
        "velocity.x" | "vx" => physics.velocity.x = number(path, value)?,
        "velocity.y" | "vy" => physics.velocity.y = number(path, value)?,
        _ => return Err(PathError::UnknownField(path.to_string())),
    }
    Ok(())
}

fn get_field(obj: &SimObject, path: &str) -> Result<Value, PathError> {
    let unknown = || PathError::UnknownField(path.to_string());
    Ok(match (path, &obj.shape) {
        ("x" | "position.x", _) => obj.position.x.into(),
        ("y" | "position.y", _) => obj.position.y.into(),
        ("rotation", _) => obj.rotation.into(),
        ("opacity", _) => obj.opacity.into(),
        ("fill", _) => obj.fill.into(),
        ("stroke", _) => obj.stroke.map(Value::from).unwrap_or(Value::Text(String::new())),
        ("stroke_width", _) => obj.stroke_width.into(),
        ("draggable", _) => obj.draggable.into(),
        ("velocity.x" | "velocity.y", _) => {
            let physics = obj
                .physics
                .as_ref()
                .ok_or_else(|| PathError::NoPhysics(path.to_string()))?;
            get_physics(physics, path, path)?
        }
        ("radius", Shape::Circle { radius }) => (*radius).into(),
        ("width", Shape::Rect { width, .. }) => (*width).into(),
        ("height", Shape::Rect { height, .. }) => (*height).into(),
        ("size", Shape::Symbol { size, .. }) => (*size).into(),
        ("glyph", Shape::Symbol { glyph, .. }) => Value::Text(glyph.clone()),
        ("text", Shape::Text { text, .. }) => Value::Text(text.clone()),
        ("font_size", Shape::Text { font_size, .. }) => (*font_size).into(),
        ("emitter.rate", _) => obj.emitter.as_ref().ok_or_else(unknown)?.rate.into(),
        ("emitter.enabled", _) => obj.emitter.as_ref().ok_or_else(unknown)?.enabled.into(),
        _ => return Err(unknown()),
    })
}

fn set_field(obj: &mut SimObject, path: &str, value: &Value) -> Result<(), PathError> {
    let unknown = || PathError::UnknownField(path.to_string());
    match path {
        "x" | "position.x" => obj.position.x = number(path, value)?,
        "y" | "position.y" => obj.position.y = number(path, value)?,
        "rotation" => obj.rotation = number(path, value)?,
        "opacity" => obj.opacity = number(path, value)?.clamp(0.0, 1.0),
        "fill" => obj.fill = color(path, value)?,
        "stroke" => obj.stroke = Some(color(path, value)?),
        "stroke_width" => obj.stroke_width = number(path, value)?.max(0.0),
        "draggable" => obj.draggable = flag(path, value)?,
        "velocity.x" | "velocity.y" => {
            let physics = obj.physics.get_or_insert_with(|| PhysicsState {
                enabled: false,
                ..Default::default()
            });
            set_physics(physics, path, value, path)?;
        }
        "emitter.rate" => {
            obj.emitter.as_mut().ok_or_else(unknown)?.rate =
                number(path, value)?.clamp(0.0, MAX_EMITTER_RATE)
        }
        "emitter.enabled" => obj.emitter.as_mut().ok_or_else(unknown)?.enabled = flag(path, value)?,
        _ => return set_geometry(obj, path, value),
    }
    Ok(())
}

fn set_geometry(obj: &mut SimObject, path: &str, value: &Value) -> Result<(), PathError> {
    match (path, &mut obj.shape) {
        ("radius", Shape::Circle { radius }) => *radius = number(path, value)?.max(0.0),
        ("width", Shape::Rect { width, .. }) => *width = number(path, value)?.max(0.0),
        ("height", Shape::Rect { height, .. }) => *height = number(path, value)?.max(0.0),
        ("size", Shape::Symbol { size, .. }) => *size = number(path, value)?.max(0.0),
        ("glyph", Shape::Symbol { glyph, .. }) => *glyph = text(value),
        ("text", Shape::Text { text: t, .. }) => {
            *t = text(value);
            obj.measured_width = None;
        }
        ("font_size", Shape::Text { font_size, .. }) => {
            *font_size = number(path, value)?.max(0.0);
            obj.measured_width = None;
        }
        _ => return Err(PathError::UnknownField(path.to_string())),
    }
    Ok(())
}
