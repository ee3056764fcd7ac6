//! Fixed-capacity particle pool and emitters
//!
//! Particles are visual only and never referenced outside the pool.
//! When the free list is empty a spawn request is dropped: the pool never grows.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::object::Color;
use crate::consts::MAX_EMITTER_RATE;
use crate::{direction_from_degrees, lerp};

/// Template a particle is spawned from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Pixels per second
    pub speed: f32,
    /// Fractional speed jitter band (0.2 = ±20%)
    pub speed_variance: f32,
    /// Direction in degrees (0 = right, -90 = up)
    pub angle: f32,
    /// Total angular jitter in degrees (±spread/2)
    pub spread: f32,
    /// Seconds
    pub lifetime: f32,
    pub lifetime_variance: f32,
    pub size: f32,
    pub size_variance: f32,
    pub color: Color,
    pub end_color: Option<Color>,
    pub end_size: Option<f32>,
    /// Vertical acceleration applied to each particle
    pub gravity: f32,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            speed: 120.0,
            speed_variance: 0.2,
            angle: -90.0,
            spread: 60.0,
            lifetime: 1.0,
            lifetime_variance: 0.2,
            size: 4.0,
            size_variance: 0.25,
            color: Color::rgb(1.0, 0.8, 0.3),
            end_color: None,
            end_size: None,
            gravity: 0.0,
        }
    }
}

/// A single pooled particle
#[derive(Debug, Clone, Default)]
pub struct Particle {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Seconds left
    pub life: f32,
    pub max_life: f32,
    pub size: f32,
    pub start_size: f32,
    pub end_size: f32,
    pub color: Color,
    pub start_color: Color,
    pub end_color: Color,
    pub gravity: f32,
    /// `life / max_life`
    pub alpha: f32,
}

/// Jitter in [-1, 1]
fn jitter(rng: &mut impl Rng) -> f32 {
    rng.random_range(-1.0f32..=1.0)
}

/// Free-list backed particle storage
#[derive(Debug, Clone)]
pub struct ParticlePool {
    particles: Vec<Particle>,
    active: Vec<usize>,
    free: Vec<usize>,
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: vec![Particle::default(); capacity],
            active: Vec::with_capacity(capacity),
            free: (0..capacity).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.particles.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Live particles in spawn order
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.active.iter().map(|&i| &self.particles[i])
    }

    /// Spawn one particle; returns false when the pool is exhausted
    pub fn spawn(&mut self, position: Vec2, config: &SpawnConfig, rng: &mut impl Rng) -> bool {
        let Some(index) = self.free.pop() else {
            return false;
        };

        let angle = config.angle + jitter(rng) * config.spread / 2.0;
        let speed = config.speed * (1.0 + jitter(rng) * config.speed_variance);
        let life = (config.lifetime * (1.0 + jitter(rng) * config.lifetime_variance)).max(1e-3);
        let size = (config.size * (1.0 + jitter(rng) * config.size_variance)).max(0.0);

        self.particles[index] = Particle {
            pos: position,
            vel: direction_from_degrees(angle) * speed,
            life,
            max_life: life,
            size,
            start_size: size,
            end_size: config.end_size.unwrap_or(size),
            color: config.color,
            start_color: config.color,
            end_color: config.end_color.unwrap_or(config.color),
            gravity: config.gravity,
            alpha: 1.0,
        };
        self.active.push(index);
        true
    }

    /// Age, move and fade every live particle; expired ones return to the free list
    pub fn update(&mut self, dt: f32) {
        let particles = &mut self.particles;
        let free = &mut self.free;
        self.active.retain(|&index| {
            let p = &mut particles[index];
            p.life -= dt;
            if p.life <= 0.0 {
                p.alpha = 0.0;
                free.push(index);
                return false;
            }
            p.vel.y += p.gravity * dt;
            p.pos += p.vel * dt;
            p.alpha = p.life / p.max_life;
            let t = 1.0 - p.alpha;
            p.size = lerp(p.start_size, p.end_size, t);
            p.color = p.start_color.mix(p.end_color, t);
            true
        });
    }

    /// Return every particle to the free list
    pub fn clear(&mut self) {
        self.free.extend(self.active.drain(..));
    }
}

/// Continuous particle source attached to an object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emitter {
    /// Particles per second
    pub rate: f32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub template: SpawnConfig,
    /// Time since the last emission
    #[serde(skip)]
    pub accumulator: f32,
}

fn default_enabled() -> bool {
    true
}

impl Emitter {
    pub fn new(rate: f32, template: SpawnConfig) -> Self {
        Self {
            rate,
            enabled: true,
            template,
            accumulator: 0.0,
        }
    }

    /// Accumulate `dt` and spawn once per elapsed `1/rate`, carrying the remainder.
    /// Spawns never exceed the pool's free slots; the surplus is dropped.
    /// Returns the number of particles spawned.
    pub fn emit(
        &mut self,
        position: Vec2,
        dt: f32,
        pool: &mut ParticlePool,
        rng: &mut impl Rng,
    ) -> u32 {
        if !self.enabled || !self.rate.is_finite() || self.rate <= 0.0 || !dt.is_finite() {
            return 0;
        }
        let interval = 1.0 / self.rate.min(MAX_EMITTER_RATE);
        self.accumulator += dt.max(0.0);
        if self.accumulator < interval {
            return 0;
        }
        let due = (self.accumulator / interval).floor();
        self.accumulator %= interval;

        let count = due.min(pool.free_count() as f32) as u32;
        for _ in 0..count {
            pool.spawn(position, &self.template, rng);
        }
        count
    }
}
