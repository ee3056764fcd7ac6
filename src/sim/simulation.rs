//! Simulation aggregate and the per-frame pipeline
//!
//! Order of one `step`:
//! physics → collisions → behaviors → emitters/particles → input routing →
//! script rules → bindings. Rendering is a separate call.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::activation::{ActivationTable, ManualTrigger};
use super::behavior::{BehaviorRegistry, ExecutorEnv, WorldView, run_behaviors};
use super::binding::{BridgeEnv, Control, apply_bindings};
use super::collision::tag_collisions;
use super::input::{Pointer, route_input};
use super::object::{SimObject, Value};
use super::particles::ParticlePool;
use super::path;
use super::physics::{PhysicsSettings, step_physics};
use super::script::Script;
use crate::consts::{DEFAULT_PARTICLE_CAPACITY, MAX_FRAME_DT};
use crate::document::{Canvas, Document};
use crate::error::{DocumentError, PathError, ScriptError};
use crate::render::{self, Surface};

/// Host-side knobs that are not part of a document
#[derive(Debug, Clone, PartialEq)]
pub struct SimOptions {
    pub particle_capacity: usize,
    /// Used when the document carries no seed
    pub seed: u64,
    /// Overrides every graph control's history length
    pub graph_history: Option<usize>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            particle_capacity: DEFAULT_PARTICLE_CAPACITY,
            seed: 0,
            graph_history: None,
        }
    }
}

#[derive(Debug)]
pub struct Simulation {
    objects: Vec<SimObject>,
    controls: Vec<Control>,
    canvas: Canvas,
    physics: PhysicsSettings,
    registry: BehaviorRegistry,
    activation: ActivationTable,
    particles: ParticlePool,
    rng: Pcg32,
    pointer: Pointer,
    script: Option<Script>,
    script_source: Option<String>,
    script_errors: Vec<ScriptError>,
    /// Document as loaded, for `reset`
    initial: Document,
    options: SimOptions,
    time: f32,
    frame: u64,
}

impl Simulation {
    /// Empty simulation with the default canvas
    pub fn new(registry: BehaviorRegistry, options: SimOptions) -> Self {
        let initial = Document::default();
        Self {
            objects: Vec::new(),
            controls: Vec::new(),
            canvas: initial.canvas.clone(),
            physics: initial.physics.clone(),
            registry,
            activation: ActivationTable::new(),
            particles: ParticlePool::new(options.particle_capacity),
            rng: Pcg32::seed_from_u64(options.seed),
            pointer: Pointer::new(),
            script: None,
            script_source: None,
            script_errors: Vec::new(),
            initial,
            options,
            time: 0.0,
            frame: 0,
        }
    }

    /// Validate and load a document; nothing is built when validation fails
    pub fn from_document(
        doc: Document,
        registry: BehaviorRegistry,
        options: SimOptions,
    ) -> Result<Self, DocumentError> {
        doc.validate(&registry)?;
        let mut sim = Self::new(registry, options);
        sim.install(doc);
        Ok(sim)
    }

    /// Replace the current document. On error the simulation is left untouched.
    pub fn load_document(&mut self, doc: Document) -> Result<(), DocumentError> {
        doc.validate(&self.registry)?;
        self.install(doc);
        Ok(())
    }

    /// Reload the last loaded document: positions, latches, particles and RNG
    pub fn reset(&mut self) {
        self.install(self.initial.clone());
    }

    fn install(&mut self, doc: Document) {
        log::info!(
            "loading document: {} objects, {} controls",
            doc.objects.len(),
            doc.controls.len()
        );
        self.initial = doc.clone();

        let Document {
            canvas,
            physics,
            seed,
            mut objects,
            mut controls,
            script,
            ..
        } = doc;

        for obj in objects.iter_mut() {
            obj.reset_transient();
            if let Some(emitter) = obj.emitter.as_mut() {
                emitter.accumulator = 0.0;
            }
        }
        if let Some(len) = self.options.graph_history {
            controls.iter_mut().for_each(|c| c.history_len = len);
        }

        self.objects = objects;
        self.controls = controls;
        self.canvas = canvas;
        self.physics = physics;
        self.activation.clear();
        self.particles = ParticlePool::new(self.options.particle_capacity);
        self.rng = Pcg32::seed_from_u64(seed.unwrap_or(self.options.seed));
        self.pointer = Pointer::new();
        self.time = 0.0;
        self.frame = 0;

        match script {
            Some(source) => {
                // Errors are kept on the simulation; it runs without the script
                let _ = self.install_script(&source);
            }
            None => {
                self.script = None;
                self.script_source = None;
                self.script_errors.clear();
            }
        }
    }

    /// Snapshot of the current state as a document (transient state excluded)
    pub fn document(&self) -> Document {
        Document {
            canvas: self.canvas.clone(),
            physics: self.physics.clone(),
            seed: self.initial.seed,
            objects: self.objects.clone(),
            controls: self.controls.clone(),
            script: self.script_source.clone(),
            ..Document::default()
        }
    }

    /// Advance one frame. Returns false when `dt` was rejected.
    pub fn step(&mut self, dt: f32) -> bool {
        if !dt.is_finite() || dt <= 0.0 {
            return false;
        }
        let dt = dt.min(MAX_FRAME_DT) * self.physics.time_scale.max(0.0);
        let area = self.area();

        step_physics(
            &mut self.objects,
            &self.physics,
            area,
            dt,
            self.pointer.dragging(),
        );
        tag_collisions(&mut self.objects);

        self.time += dt;
        let world = self.world_view();
        let mut env = ExecutorEnv {
            registry: &self.registry,
            table: &mut self.activation,
            world: &world,
            particles: &mut self.particles,
            rng: &mut self.rng,
        };
        let faults = run_behaviors(&mut self.objects, &mut env, dt);
        if faults > 0 {
            log::debug!("frame {}: {} behavior faults", self.frame, faults);
        }

        for obj in self.objects.iter_mut() {
            if let Some(emitter) = obj.emitter.as_mut() {
                emitter.emit(obj.position, dt, &mut self.particles, &mut self.rng);
            }
        }
        self.particles.update(dt);

        route_input(&mut self.objects, &mut self.pointer);

        if let Some(script) = &self.script {
            script.apply(&mut self.objects, &self.registry, dt);
        }

        let mut bridge = BridgeEnv {
            registry: &self.registry,
            table: &mut self.activation,
            rng: &mut self.rng,
        };
        apply_bindings(&mut self.controls, &mut self.objects, &mut bridge);

        self.frame += 1;
        true
    }

    /// Draw the current state; caches text metrics reported by the surface
    pub fn render(&mut self, surface: &mut dyn Surface) {
        render::measure_text(&mut self.objects, surface);
        render::draw_scene(surface, self.canvas.background, &self.objects, &self.particles);
    }

    fn world_view(&self) -> WorldView {
        WorldView {
            area: self.area(),
            pointer: self.pointer.position,
        }
    }

    pub fn area(&self) -> Vec2 {
        Vec2::new(self.canvas.width, self.canvas.height)
    }

    // Input

    /// Host pointer event (canvas coordinates)
    pub fn inject_pointer(&mut self, x: f32, y: f32, down: bool) {
        self.pointer.inject(x, y, down);
    }

    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    // Controls

    /// Queue a button press; it fires during the next step
    pub fn press_button(&mut self, control_id: &str) -> bool {
        match self.control_mut(control_id) {
            Some(control) => {
                control.press();
                true
            }
            None => {
                log::warn!("press on unknown control '{}'", control_id);
                false
            }
        }
    }

    pub fn set_control_value(&mut self, control_id: &str, value: impl Into<Value>) -> bool {
        match self.control_mut(control_id) {
            Some(control) => {
                control.value = Some(value.into());
                true
            }
            None => false,
        }
    }

    fn control_mut(&mut self, id: &str) -> Option<&mut Control> {
        self.controls.iter_mut().find(|c| c.id == id)
    }

    // Activation

    /// Move a behavior's latch from the host. Any activation mode accepts it,
    /// but only Manual behaviors are otherwise left alone by clicks.
    pub fn trigger_behavior(&mut self, object: &str, behavior: &str, trigger: ManualTrigger) -> bool {
        let known = self.object(object).is_some_and(|o| o.has_behavior(behavior));
        if !known {
            log::warn!("trigger for unknown behavior '{}' on '{}'", behavior, object);
            return false;
        }
        self.activation.entry(object, behavior).trigger(trigger);
        true
    }

    /// Clear latch, baseline and counters for one (object, behavior)
    pub fn reset_activation(&mut self, object: &str, behavior: &str) -> bool {
        self.activation.reset(object, behavior)
    }

    pub fn activation(&self) -> &ActivationTable {
        &self.activation
    }

    // Inspector

    pub fn get_property(&self, object: &str, path: &str) -> Result<Value, PathError> {
        let obj = self
            .object(object)
            .ok_or_else(|| PathError::UnknownObject(object.to_string()))?;
        path::get_property(obj, path, &self.registry)
    }

    pub fn set_property(&mut self, object: &str, path: &str, value: &Value) -> Result<(), PathError> {
        let obj = self
            .objects
            .iter_mut()
            .find(|o| o.id == object)
            .ok_or_else(|| PathError::UnknownObject(object.to_string()))?;
        path::set_property(obj, path, value)
    }

    // Script

    /// Compile and install a global script. On failure the previous script is
    /// dropped, the errors are kept and the simulation runs without one.
    pub fn install_script(&mut self, source: &str) -> Result<(), Vec<ScriptError>> {
        self.script_source = Some(source.to_string());
        match Script::compile(source) {
            Ok(script) => {
                for rule in script.rules() {
                    if self.object(&rule.object).is_none() {
                        log::warn!("script line {}: no object '{}'", rule.line, rule.object);
                    }
                }
                self.script = Some(script);
                self.script_errors.clear();
                Ok(())
            }
            Err(errors) => {
                for err in &errors {
                    log::warn!("script: {}", err);
                }
                self.script = None;
                self.script_errors = errors.clone();
                Err(errors)
            }
        }
    }

    pub fn script_errors(&self) -> &[ScriptError] {
        &self.script_errors
    }

    // Accessors

    pub fn objects(&self) -> &[SimObject] {
        &self.objects
    }

    pub fn object(&self, id: &str) -> Option<&SimObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn control(&self, id: &str) -> Option<&Control> {
        self.controls.iter().find(|c| c.id == id)
    }

    pub fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    pub fn physics(&self) -> &PhysicsSettings {
        &self.physics
    }

    pub fn registry(&self) -> &BehaviorRegistry {
        &self.registry
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Simulated seconds (scaled dt)
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }
}
