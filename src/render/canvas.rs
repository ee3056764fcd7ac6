//! `CanvasRenderingContext2d` surface for the browser player

use std::f64::consts::TAU;

use glam::Vec2;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::Surface;
use crate::sim::object::Color;

pub struct CanvasSurface {
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl CanvasSurface {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, String> {
        let ctx = canvas
            .get_context("2d")
            .map_err(|e| format!("get_context failed: {e:?}"))?
            .ok_or("2d context unavailable")?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| "not a 2d context")?;
        Ok(Self {
            ctx,
            width: canvas.width() as f64,
            height: canvas.height() as f64,
        })
    }

    fn css(color: Color) -> String {
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "rgba({}, {}, {}, {:.3})",
            byte(color.r),
            byte(color.g),
            byte(color.b),
            color.a.clamp(0.0, 1.0)
        )
    }

    /// Run `draw` with the origin moved to `center` and rotated
    fn transformed(&self, center: Vec2, rotation: f32, draw: impl FnOnce(&CanvasRenderingContext2d)) {
        self.ctx.save();
        let moved = self
            .ctx
            .translate(center.x as f64, center.y as f64)
            .and_then(|_| self.ctx.rotate((rotation as f64).to_radians()));
        if moved.is_ok() {
            draw(&self.ctx);
        }
        self.ctx.restore();
    }

    fn circle_path(&self, center: Vec2, radius: f32) -> bool {
        self.ctx.begin_path();
        self.ctx
            .arc(center.x as f64, center.y as f64, radius as f64, 0.0, TAU)
            .is_ok()
    }
}

impl Surface for CanvasSurface {
    fn clear(&mut self, color: Color) {
        self.ctx.set_fill_style_str(&Self::css(color));
        self.ctx.fill_rect(0.0, 0.0, self.width, self.height);
    }

    fn set_alpha(&mut self, alpha: f32) {
        self.ctx.set_global_alpha(alpha.clamp(0.0, 1.0) as f64);
    }

    fn fill_circle(&mut self, center: Vec2, radius: f32, color: Color) {
        if self.circle_path(center, radius) {
            self.ctx.set_fill_style_str(&Self::css(color));
            self.ctx.fill();
        }
    }

    fn stroke_circle(&mut self, center: Vec2, radius: f32, color: Color, width: f32) {
        if self.circle_path(center, radius) {
            self.ctx.set_stroke_style_str(&Self::css(color));
            self.ctx.set_line_width(width as f64);
            self.ctx.stroke();
        }
    }

    fn fill_rect(&mut self, center: Vec2, size: Vec2, rotation: f32, color: Color) {
        let style = Self::css(color);
        self.transformed(center, rotation, |ctx| {
            ctx.set_fill_style_str(&style);
            ctx.fill_rect(
                -size.x as f64 / 2.0,
                -size.y as f64 / 2.0,
                size.x as f64,
                size.y as f64,
            );
        });
    }

    fn stroke_rect(&mut self, center: Vec2, size: Vec2, rotation: f32, color: Color, width: f32) {
        let style = Self::css(color);
        self.transformed(center, rotation, |ctx| {
            ctx.set_stroke_style_str(&style);
            ctx.set_line_width(width as f64);
            ctx.stroke_rect(
                -size.x as f64 / 2.0,
                -size.y as f64 / 2.0,
                size.x as f64,
                size.y as f64,
            );
        });
    }

    fn fill_text(&mut self, text: &str, center: Vec2, font_size: f32, rotation: f32, color: Color) {
        let style = Self::css(color);
        self.transformed(center, rotation, |ctx| {
            ctx.set_fill_style_str(&style);
            ctx.set_font(&format!("{font_size}px sans-serif"));
            ctx.set_text_align("center");
            ctx.set_text_baseline("middle");
            let _ = ctx.fill_text(text, 0.0, 0.0);
        });
    }

    fn measure_text(&mut self, text: &str, font_size: f32) -> Option<f32> {
        self.ctx.set_font(&format!("{font_size}px sans-serif"));
        self.ctx.measure_text(text).ok().map(|m| m.width() as f32)
    }
}
