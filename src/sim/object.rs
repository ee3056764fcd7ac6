//! Simulated objects and the value types they carry
//!
//! Everything persisted in a document lives on `SimObject`; per-frame
//! transient state is `#[serde(skip)]` and rebuilt by the pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::activation::ActivationConfig;
use super::particles::Emitter;
use crate::consts::{TEXT_LINE_HEIGHT, TEXT_WIDTH_FACTOR};

/// Behavior parameters keyed by name
pub type Params = BTreeMap<String, Value>;

/// RGBA color, serialized as a `#rrggbb` / `#rrggbbaa` hex string
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build from hue (degrees), saturation and lightness (0-1)
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(360.0) / 60.0;
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        Self::rgb(r + m, g + m, b + m)
    }

    /// Component-wise interpolation toward `other`
    pub fn mix(self, other: Color, t: f32) -> Color {
        Color {
            r: crate::lerp(self.r, other.r, t),
            g: crate::lerp(self.g, other.g, t),
            b: crate::lerp(self.b, other.b, t),
            a: crate::lerp(self.a, other.a, t),
        }
    }

    pub fn with_alpha(self, a: f32) -> Color {
        Color { a, ..self }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::rgb(0.29, 0.56, 0.89)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| format!("color '{s}' must start with '#'"))?;
        let nibble = |c: u8| -> Result<f32, String> {
            (c as char)
                .to_digit(16)
                .map(|d| d as f32)
                .ok_or_else(|| format!("invalid hex digit in color '{s}'"))
        };
        let bytes = hex.as_bytes();
        let channel = |i: usize| -> Result<f32, String> {
            Ok((nibble(bytes[i])? * 16.0 + nibble(bytes[i + 1])?) / 255.0)
        };
        match bytes.len() {
            3 => Ok(Color::rgb(
                nibble(bytes[0])? * 17.0 / 255.0,
                nibble(bytes[1])? * 17.0 / 255.0,
                nibble(bytes[2])? * 17.0 / 255.0,
            )),
            6 => Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Color {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
            _ => Err(format!("color '{s}' must have 3, 6 or 8 hex digits")),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> String {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        write!(f, "#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))?;
        if self.a < 1.0 {
            write!(f, "{:02x}", byte(self.a))?;
        }
        Ok(())
    }
}

/// Loosely typed value exchanged with controls, parameters and scripts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Finite numbers only; NaN, infinities and f32 overflow are rejected
    pub fn as_f32(&self) -> Option<f32> {
        let n = match self {
            Value::Number(n) => *n as f32,
            Value::Bool(b) => if *b { 1.0 } else { 0.0 },
            Value::Text(s) => s.trim().parse().ok()?,
        };
        n.is_finite().then_some(n)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            Value::Text(s) => match s.as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Number(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Text(c.to_string())
    }
}

/// Geometry, exactly one kind per object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum Shape {
    Circle { radius: f32 },
    Rect { width: f32, height: f32 },
    Text { text: String, font_size: f32 },
    Symbol { glyph: String, size: f32 },
}

impl Shape {
    /// Same shape with every length multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Shape {
        match self {
            Shape::Circle { radius } => Shape::Circle {
                radius: radius * factor,
            },
            Shape::Rect { width, height } => Shape::Rect {
                width: width * factor,
                height: height * factor,
            },
            Shape::Text { text, font_size } => Shape::Text {
                text: text.clone(),
                font_size: font_size * factor,
            },
            Shape::Symbol { glyph, size } => Shape::Symbol {
                glyph: glyph.clone(),
                size: size * factor,
            },
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Shape::Circle { .. } => "circle",
            Shape::Rect { .. } => "rect",
            Shape::Text { .. } => "text",
            Shape::Symbol { .. } => "symbol",
        }
    }
}

/// Per-object physics; owned exclusively by its object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsState {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub velocity: Vec2,
    #[serde(default = "default_mass")]
    pub mass: f32,
    /// Wall restitution (0-1); falls back to the simulation default when unset
    #[serde(default)]
    pub bounciness: Option<f32>,
}

impl Default for PhysicsState {
    fn default() -> Self {
        Self {
            enabled: true,
            velocity: Vec2::ZERO,
            mass: 1.0,
            bounciness: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_mass() -> f32 {
    1.0
}

fn default_opacity() -> f32 {
    1.0
}

/// How much of a text object is currently shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextReveal {
    /// Whole text visible
    #[default]
    Full,
    /// A reveal behavior is attached but has not started: nothing is shown
    Pending,
    /// First `n` characters visible
    Partial(usize),
}

/// A simulated entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimObject {
    pub id: String,
    #[serde(flatten)]
    pub shape: Shape,
    /// Center position
    pub position: Vec2,
    /// Rotation in degrees
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub fill: Color,
    #[serde(default)]
    pub stroke: Option<Color>,
    #[serde(default)]
    pub stroke_width: f32,
    /// Behavior ids, run in order every frame
    #[serde(default)]
    pub behaviors: Vec<String>,
    /// Per-behavior parameter overrides
    #[serde(default)]
    pub params: BTreeMap<String, Params>,
    /// Per-behavior activation policy (OnEnter when absent)
    #[serde(default)]
    pub activation: BTreeMap<String, ActivationConfig>,
    #[serde(default)]
    pub physics: Option<PhysicsState>,
    #[serde(default)]
    pub emitter: Option<Emitter>,
    /// Follows the pointer while pressed
    #[serde(default)]
    pub draggable: bool,

    /// Pointer is over the object (this frame)
    #[serde(skip)]
    pub hovered: bool,
    /// Object received the press this frame (one-shot)
    #[serde(skip)]
    pub click_edge: bool,
    /// Objects overlapping this one (this frame)
    #[serde(skip)]
    pub active_collisions: Vec<String>,
    #[serde(skip)]
    pub reveal: TextReveal,
    /// Text width reported by the render surface
    #[serde(skip)]
    pub measured_width: Option<f32>,
    /// Position at load time (reset-position target)
    #[serde(skip)]
    pub home: Vec2,
}

impl SimObject {
    pub fn new(id: impl Into<String>, shape: Shape, position: Vec2) -> Self {
        Self {
            id: id.into(),
            shape,
            position,
            rotation: 0.0,
            opacity: 1.0,
            fill: Color::default(),
            stroke: None,
            stroke_width: 0.0,
            behaviors: Vec::new(),
            params: BTreeMap::new(),
            activation: BTreeMap::new(),
            physics: None,
            emitter: None,
            draggable: false,
            hovered: false,
            click_edge: false,
            active_collisions: Vec::new(),
            reveal: TextReveal::Full,
            measured_width: None,
            home: position,
        }
    }

    pub fn circle(id: impl Into<String>, position: Vec2, radius: f32) -> Self {
        Self::new(id, Shape::Circle { radius }, position)
    }

    pub fn rect(id: impl Into<String>, position: Vec2, width: f32, height: f32) -> Self {
        Self::new(id, Shape::Rect { width, height }, position)
    }

    pub fn text(id: impl Into<String>, position: Vec2, text: &str, font_size: f32) -> Self {
        Self::new(
            id,
            Shape::Text {
                text: text.to_string(),
                font_size,
            },
            position,
        )
    }

    pub fn with_physics(mut self, physics: PhysicsState) -> Self {
        self.physics = Some(physics);
        self
    }

    pub fn with_behavior(mut self, behavior: &str) -> Self {
        self.behaviors.push(behavior.to_string());
        self
    }

    pub fn with_param(mut self, behavior: &str, name: &str, value: impl Into<Value>) -> Self {
        self.params
            .entry(behavior.to_string())
            .or_default()
            .insert(name.to_string(), value.into());
        self
    }

    pub fn with_activation(mut self, behavior: &str, config: ActivationConfig) -> Self {
        self.activation.insert(behavior.to_string(), config);
        self
    }

    pub fn has_behavior(&self, behavior: &str) -> bool {
        self.behaviors.iter().any(|b| b == behavior)
    }

    /// Bounding box size used for hit testing and the radius approximation
    pub fn box_size(&self) -> Vec2 {
        match &self.shape {
            Shape::Circle { radius } => Vec2::splat(radius * 2.0),
            Shape::Rect { width, height } => Vec2::new(*width, *height),
            Shape::Symbol { size, .. } => Vec2::splat(*size),
            Shape::Text { text, font_size } => {
                let lines = text.lines().count().max(1);
                let width = self.measured_width.unwrap_or_else(|| {
                    let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
                    longest as f32 * font_size * TEXT_WIDTH_FACTOR
                });
                Vec2::new(width, lines as f32 * font_size * TEXT_LINE_HEIGHT)
            }
        }
    }

    /// Circle approximation used for wall reflection and broad-phase overlap
    pub fn effective_radius(&self) -> f32 {
        match &self.shape {
            Shape::Circle { radius } => *radius,
            _ => {
                let size = self.box_size();
                size.x.max(size.y) / 2.0
            }
        }
    }

    /// Clear per-frame flags that must not survive a reload
    pub fn reset_transient(&mut self) {
        self.hovered = false;
        self.click_edge = false;
        self.active_collisions.clear();
        self.reveal = TextReveal::Full;
        self.home = self.position;
    }
}
