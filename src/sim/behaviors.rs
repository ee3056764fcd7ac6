//! Built-in behavior library
//!
//! Animations are computed from the baseline captured at first activation
//! and the behavior's running time, so pausing and resuming is stable.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::activation::Baseline;
use super::behavior::{Behavior, BehaviorContext, BehaviorFault, BehaviorRegistry};
use super::object::{Shape, SimObject, TextReveal};
use super::particles::SpawnConfig;

type BehaviorResult = Result<(), BehaviorFault>;

/// Register every built-in behavior
pub fn register_builtins(registry: &mut BehaviorRegistry) {
    registry.register(Behavior::new("rotate", rotate).param("speed", 90.0));
    registry.register(
        Behavior::new("pulse", pulse)
            .param("amplitude", 0.2)
            .param("frequency", 1.0),
    );
    registry.register(
        Behavior::new("float", float)
            .param("amplitude", 10.0)
            .param("frequency", 0.5),
    );
    registry.register(
        Behavior::new("orbit", orbit)
            .param("radius", 50.0)
            .param("speed", 0.25),
    );
    registry.register(
        Behavior::new("blink", blink)
            .param("frequency", 1.0)
            .param("min", 0.2)
            .param("max", 1.0),
    );
    registry.register(Behavior::new("follow_pointer", follow_pointer).param("speed", 5.0));
    registry.register(
        Behavior::new("wander", wander)
            .param("speed", 60.0)
            .param("interval", 1.0),
    );
    registry.register(
        Behavior::new("grow", grow)
            .param("factor", 1.2)
            .on_idle(restore_shape),
    );
    registry.register(
        Behavior::new("flash_on_collision", flash_on_collision).param("color", "#ff4444"),
    );
    registry.register(
        Behavior::new("typewriter", typewriter)
            .param("chars_per_second", 20.0)
            .param("repeat", false)
            .param("hold", 1.0)
            .on_idle(hide_until_started),
    );
    registry.register(
        Behavior::new("burst", burst)
            .param("count", 20.0)
            .param("interval", 0.0),
    );
}

/// `sin(τ·f·t)`
fn wave(frequency: f32, elapsed: f32) -> f32 {
    (TAU * frequency * elapsed).sin()
}

fn rotate(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let speed = ctx.params.number(obj, "speed")?;
    obj.rotation = (obj.rotation + speed * ctx.dt).rem_euclid(360.0);
    Ok(())
}

fn pulse(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let amplitude = ctx.params.number(obj, "amplitude")?;
    let frequency = ctx.params.number(obj, "frequency")?;
    let factor = (1.0 + amplitude * wave(frequency, ctx.elapsed)).max(0.0);
    obj.shape = ctx.baseline.shape.scaled(factor);
    Ok(())
}

fn float(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let amplitude = ctx.params.number(obj, "amplitude")?;
    let frequency = ctx.params.number(obj, "frequency")?;
    obj.position.y = ctx.baseline.position.y + amplitude * wave(frequency, ctx.elapsed);
    Ok(())
}

fn orbit(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let radius = ctx.params.number(obj, "radius")?;
    let speed = ctx.params.number(obj, "speed")?;
    let angle = TAU * speed * ctx.elapsed;
    obj.position = ctx.baseline.position + Vec2::new(angle.cos(), angle.sin()) * radius;
    Ok(())
}

fn blink(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let frequency = ctx.params.number(obj, "frequency")?;
    let min = ctx.params.number(obj, "min")?;
    let max = ctx.params.number(obj, "max")?;
    let t = 0.5 + 0.5 * (TAU * frequency * ctx.elapsed).cos();
    obj.opacity = crate::lerp(min, max, t).clamp(0.0, 1.0);
    Ok(())
}

fn follow_pointer(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let speed = ctx.params.number(obj, "speed")?;
    let t = (speed * ctx.dt).min(1.0);
    obj.position += (ctx.world.pointer - obj.position) * t;
    if let Some(physics) = obj.physics.as_mut() {
        physics.velocity = Vec2::ZERO;
    }
    Ok(())
}

fn wander(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let speed = ctx.params.number(obj, "speed")?;
    let interval = ctx.params.number(obj, "interval")?.max(0.01);

    let timer = ctx.scratch.entry("timer".into()).or_insert(0.0);
    *timer -= ctx.dt;
    if *timer <= 0.0 {
        *timer += interval;
        let heading = ctx.rng.random_range(0.0..TAU);
        ctx.scratch.insert("heading".into(), heading);
    }
    let heading = ctx.scratch.get("heading").copied().unwrap_or(0.0);

    obj.position += Vec2::new(heading.cos(), heading.sin()) * speed * ctx.dt;
    let radius = obj.effective_radius();
    let area = ctx.world.area;
    if area.x > 2.0 * radius && area.y > 2.0 * radius {
        obj.position = obj
            .position
            .clamp(Vec2::splat(radius), area - Vec2::splat(radius));
    }
    Ok(())
}

fn grow(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let factor = ctx.params.number(obj, "factor")?;
    obj.shape = ctx.baseline.shape.scaled(factor.max(0.0));
    Ok(())
}

fn restore_shape(obj: &mut SimObject, baseline: Option<&Baseline>) {
    if let Some(baseline) = baseline {
        obj.shape = baseline.shape.clone();
    }
}

fn flash_on_collision(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    obj.fill = if obj.active_collisions.is_empty() {
        ctx.baseline.fill
    } else {
        ctx.params.color(obj, "color")?
    };
    Ok(())
}

fn typewriter(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let Shape::Text { text, .. } = &obj.shape else {
        return Err(BehaviorFault::Failed(format!(
            "typewriter needs a text object, '{}' is a {}",
            obj.id,
            obj.shape.kind_name()
        )));
    };
    let total = text.chars().count();
    let cps = ctx.params.number(obj, "chars_per_second")?.max(0.0);
    let repeat = ctx.params.flag(obj, "repeat")?;
    let hold = ctx.params.number(obj, "hold")?.max(0.0);

    let mut elapsed = ctx.elapsed;
    if repeat && cps > 0.0 {
        let cycle = total as f32 / cps + hold;
        if cycle > 0.0 {
            elapsed %= cycle;
        }
    }
    let shown = (elapsed * cps).floor() as usize;
    obj.reveal = if shown >= total {
        TextReveal::Full
    } else {
        TextReveal::Partial(shown)
    };
    Ok(())
}

/// Before the first run nothing is shown; the text itself stays intact
fn hide_until_started(obj: &mut SimObject, baseline: Option<&Baseline>) {
    if baseline.is_none() {
        obj.reveal = TextReveal::Pending;
    }
}

fn burst(obj: &mut SimObject, ctx: &mut BehaviorContext<'_>) -> BehaviorResult {
    let count = ctx.params.number(obj, "count")?.max(0.0);
    let interval = ctx.params.number(obj, "interval")?;

    let next = ctx.scratch.entry("next".into()).or_insert(0.0);
    *next -= ctx.dt;
    // Fires on the first run, then every `interval` seconds if positive
    if *next > 0.0 || ctx.scratch.get("fired").is_some() && interval <= 0.0 {
        return Ok(());
    }
    ctx.scratch.insert("next".into(), interval.max(0.0));
    ctx.scratch.insert("fired".into(), 1.0);

    let template = obj
        .emitter
        .as_ref()
        .map(|e| e.template.clone())
        .unwrap_or_else(|| SpawnConfig {
            color: obj.fill,
            spread: 360.0,
            ..Default::default()
        });
    // Requests beyond the free slots would be dropped anyway
    let count = count.min(ctx.particles.free_count() as f32) as usize;
    for _ in 0..count {
        ctx.particles.spawn(obj.position, &template, &mut *ctx.rng);
    }
    Ok(())
}
