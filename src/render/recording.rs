//! Surface that records draw calls (headless runs, tests)

use glam::Vec2;

use super::Surface;
use crate::sim::object::Color;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear(Color),
    Alpha(f32),
    Circle {
        center: Vec2,
        radius: f32,
        color: Color,
        stroke: Option<f32>,
    },
    Rect {
        center: Vec2,
        size: Vec2,
        rotation: f32,
        color: Color,
        stroke: Option<f32>,
    },
    Text {
        text: String,
        center: Vec2,
        font_size: f32,
        color: Color,
    },
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
    /// Fixed advance per character; `None` leaves text unmeasured
    glyph_width: Option<f32>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_glyph_width(mut self, width: f32) -> Self {
        self.glyph_width = Some(width);
        self
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Drawn text, in order
    pub fn texts(&self) -> Vec<String> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }
}

impl Surface for RecordingSurface {
    fn clear(&mut self, color: Color) {
        self.commands.push(DrawCommand::Clear(color));
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.commands.push(DrawCommand::Alpha(alpha));
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
            stroke: None,
        });
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
            stroke: Some(width),
        });
    }

    fn fill_rect(&mut self, center: Vec2, size: Vec2, rotation: f32, color: Color) {
        self.commands.push(DrawCommand::Rect {
            center,
            size,
            rotation,
            color,
            stroke: None,
        });
    }

    fn stroke_rect(&mut self, center: Vec2, size: Vec2, rotation: f32, color: Color, width: f32) {
        self.commands.push(DrawCommand::Rect {
            center,
            size,
            rotation,
            color,
            stroke: Some(width),
        });
    }

    fn fill_text(&mut self, text: &str, center: Vec2, font_size: f32, _rotation: f32, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            center,
            font_size,
            color,
        });
    }

    fn measure_text(&mut self, text: &str, _font_size: f32) -> Option<f32> {
        self.glyph_width.map(|w| w * text.chars().count() as f32)
    }
}
