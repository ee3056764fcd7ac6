//! Rendering module
//!
//! The kernel draws through the abstract [`Surface`] contract only. Hosts
//! provide a surface: `CanvasSurface` on the web, `RecordingSurface` for
//! headless runs and tests.

#[cfg(target_arch = "wasm32")]
pub mod canvas;
pub mod recording;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;
pub use recording::{DrawCommand, RecordingSurface};

use glam::Vec2;

use crate::consts::TEXT_LINE_HEIGHT;
use crate::sim::object::{Color, Shape, SimObject, TextReveal};
use crate::sim::particles::ParticlePool;

/// 2D drawing primitives. Positions are centers, rotation is in degrees.
pub trait Surface {
    fn clear(&mut self, color: Color);

    /// Global alpha multiplier for subsequent draws
    fn set_alpha(&mut self, alpha: f32);

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color);

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32);

    fn fill_rect(&mut self, center: Vec2, size: Vec2, rotation: f32, color: Color);

    fn stroke_rect(&mut self, center: Vec2, size: Vec2, rotation: f32, color: Color, width: f32);

    /// One line of text centered on `center`
    fn fill_text(&mut self, text: &str, center: Vec2, font_size: f32, rotation: f32, color: Color);

    /// Rendered width of one line, when the surface can measure it
    fn measure_text(&mut self, _text: &str, _font_size: f32) -> Option<f32> {
        None
    }
}

/// Cache measured text widths so hit testing uses real metrics
pub fn measure_text(objects: &mut [SimObject], surface: &mut dyn Surface) {
    for obj in objects.iter_mut().filter(|o| o.measured_width.is_none()) {
        if let Shape::Text { text, font_size } = &obj.shape {
            let mut widest: Option<f32> = None;
            for line in text.lines() {
                match surface.measure_text(line, *font_size) {
                    Some(w) => widest = Some(widest.map_or(w, |c| c.max(w))),
                    None => break,
                }
            }
            obj.measured_width = widest;
        }
    }
}

/// Draw one frame: background, objects in document order, then particles
pub fn draw_scene(
    surface: &mut dyn Surface,
    background: Color,
    objects: &[SimObject],
    particles: &ParticlePool,
) {
    surface.set_alpha(1.0);
    surface.clear(background);

    for obj in objects {
        if obj.opacity <= 0.0 {
            continue;
        }
        surface.set_alpha(obj.opacity.min(1.0));
        draw_object(surface, obj);
    }

    surface.set_alpha(1.0);
    for p in particles.iter() {
        let color = p.color.with_alpha(p.color.a * p.alpha);
        surface.fill_circle(p.pos, p.size.max(0.0), color);
    }
}

fn draw_object(surface: &mut dyn Surface, obj: &SimObject) {
    let stroke = obj.stroke.filter(|_| obj.stroke_width > 0.0);

    match &obj.shape {
        Shape::Circle { radius } => {
            surface.fill_circle(obj.position, *radius, obj.fill);
            if let Some(color) = stroke {
                surface.stroke_circle(obj.position, *radius, color, obj.stroke_width);
            }
        }
        Shape::Rect { width, height } => {
            let size = Vec2::new(*width, *height);
            surface.fill_rect(obj.position, size, obj.rotation, obj.fill);
            if let Some(color) = stroke {
                surface.stroke_rect(obj.position, size, obj.rotation, color, obj.stroke_width);
            }
        }
        Shape::Symbol { glyph, size } => {
            surface.fill_text(glyph, obj.position, *size, obj.rotation, obj.fill);
        }
        Shape::Text { text, font_size } => {
            let shown: String = match obj.reveal {
                TextReveal::Full => text.clone(),
                TextReveal::Pending => return,
                TextReveal::Partial(n) => text.chars().take(n).collect(),
            };
            let line_height = font_size * TEXT_LINE_HEIGHT;
            let total = text.lines().count().max(1) as f32;
            // Lines keep the layout of the full text so a reveal does not shift
            let top = obj.position.y - line_height * (total - 1.0) / 2.0;
            for (i, line) in shown.lines().enumerate() {
                let center = Vec2::new(obj.position.x, top + i as f32 * line_height);
                surface.fill_text(line, center, *font_size, obj.rotation, obj.fill);
            }
        }
    }
}
