//! Behavior registry and executor
//!
//! Behaviors are stateless update functions registered by id. All mutable
//! state lives on the object (parameter overrides) or in the activation
//! side-table. The registry is owned by the `Simulation`; there is no global.
//!
//! Fault isolation is the `Result` returned by each update: a behavior that
//! reports a `BehaviorFault` is logged and the frame continues. Panics are
//! also caught where the target unwinds (native builds). On
//! `wasm32-unknown-unknown` panics abort, so a panicking behavior ends the
//! player. Registered behaviors must report failures, not panic.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use glam::Vec2;
use rand_pcg::Pcg32;
use thiserror::Error;

use super::activation::{ActivationTable, Baseline};
use super::object::{Color, Params, SimObject, Value};
use super::particles::ParticlePool;

/// A behavior call that did not complete. Logged, never propagated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BehaviorFault {
    #[error("behavior '{behavior}' has no parameter '{param}'")]
    MissingParam { behavior: String, param: String },

    #[error("behavior '{behavior}' parameter '{param}' expects {expected}")]
    InvalidParam {
        behavior: String,
        param: String,
        expected: &'static str,
    },

    #[error("{0}")]
    Failed(String),
}

/// Per-frame update of one behavior on one object. Returning `Err` is the
/// supported way to fail.
pub type UpdateFn = Box<dyn Fn(&mut SimObject, &mut BehaviorContext<'_>) -> Result<(), BehaviorFault>>;

/// Puts an object into the behavior's "not running" state.
/// Receives the baseline if the behavior has ever run.
pub type IdleFn = fn(&mut SimObject, Option<&Baseline>);

/// A registered behavior: id, parameter defaults, update function
pub struct Behavior {
    pub id: String,
    pub defaults: Params,
    update: UpdateFn,
    idle: Option<IdleFn>,
}

impl Behavior {
    pub fn new<F>(id: &str, update: F) -> Self
    where
        F: Fn(&mut SimObject, &mut BehaviorContext<'_>) -> Result<(), BehaviorFault> + 'static,
    {
        Self {
            id: id.to_string(),
            defaults: Params::new(),
            update: Box::new(update),
            idle: None,
        }
    }

    /// Declare a parameter and its default
    pub fn param(mut self, name: &str, default: impl Into<Value>) -> Self {
        self.defaults.insert(name.to_string(), default.into());
        self
    }

    pub fn on_idle(mut self, idle: IdleFn) -> Self {
        self.idle = Some(idle);
        self
    }
}

impl std::fmt::Debug for Behavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Behavior")
            .field("id", &self.id)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Behaviors available to a simulation, keyed by id
#[derive(Debug, Default)]
pub struct BehaviorRegistry {
    behaviors: BTreeMap<String, Behavior>,
}

impl BehaviorRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in behavior library
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        super::behaviors::register_builtins(&mut registry);
        registry
    }

    /// Add a behavior, returning the one it replaced
    pub fn register(&mut self, behavior: Behavior) -> Option<Behavior> {
        self.behaviors.insert(behavior.id.clone(), behavior)
    }

    pub fn get(&self, id: &str) -> Option<&Behavior> {
        self.behaviors.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.behaviors.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.behaviors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

/// Parameter lookup: object override first, then the registered default
#[derive(Debug, Clone, Copy)]
pub struct ParamResolver<'a> {
    behavior: &'a str,
    defaults: &'a Params,
}

impl<'a> ParamResolver<'a> {
    pub fn new(behavior: &'a str, defaults: &'a Params) -> Self {
        Self { behavior, defaults }
    }

    pub fn get(&self, obj: &SimObject, name: &str) -> Option<Value> {
        obj.params
            .get(self.behavior)
            .and_then(|p| p.get(name))
            .or_else(|| self.defaults.get(name))
            .cloned()
    }

    fn require(&self, obj: &SimObject, name: &str) -> Result<Value, BehaviorFault> {
        self.get(obj, name).ok_or_else(|| BehaviorFault::MissingParam {
            behavior: self.behavior.to_string(),
            param: name.to_string(),
        })
    }

    fn invalid(&self, name: &str, expected: &'static str) -> BehaviorFault {
        BehaviorFault::InvalidParam {
            behavior: self.behavior.to_string(),
            param: name.to_string(),
            expected,
        }
    }

    pub fn number(&self, obj: &SimObject, name: &str) -> Result<f32, BehaviorFault> {
        self.require(obj, name)?
            .as_f32()
            .ok_or_else(|| self.invalid(name, "a number"))
    }

    pub fn flag(&self, obj: &SimObject, name: &str) -> Result<bool, BehaviorFault> {
        self.require(obj, name)?
            .as_bool()
            .ok_or_else(|| self.invalid(name, "a boolean"))
    }

    pub fn color(&self, obj: &SimObject, name: &str) -> Result<Color, BehaviorFault> {
        self.require(obj, name)?
            .as_color()
            .ok_or_else(|| self.invalid(name, "a color"))
    }
}

/// Read-only snapshot of the simulation taken before behaviors run
#[derive(Debug, Clone, Default)]
pub struct WorldView {
    pub area: Vec2,
    pub pointer: Vec2,
}

/// Everything a behavior may use besides its own object
pub struct BehaviorContext<'a> {
    pub dt: f32,
    /// Seconds this behavior has been running on this object
    pub elapsed: f32,
    pub world: &'a WorldView,
    pub params: ParamResolver<'a>,
    /// Object values at first activation
    pub baseline: &'a Baseline,
    pub scratch: &'a mut BTreeMap<String, f32>,
    pub particles: &'a mut ParticlePool,
    pub rng: &'a mut Pcg32,
}

/// Mutable pieces of the simulation the executor threads through behavior calls
pub struct ExecutorEnv<'a> {
    pub registry: &'a BehaviorRegistry,
    pub table: &'a mut ActivationTable,
    pub world: &'a WorldView,
    pub particles: &'a mut ParticlePool,
    pub rng: &'a mut Pcg32,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Run every object's behaviors in order under their activation policy.
/// Each (object, behavior) call is isolated; returns the number of faults.
pub fn run_behaviors(objects: &mut [SimObject], env: &mut ExecutorEnv<'_>, dt: f32) -> usize {
    let mut faults = 0;

    for obj in objects.iter_mut() {
        for index in 0..obj.behaviors.len() {
            let behavior_id = obj.behaviors[index].clone();
            let Some(behavior) = env.registry.get(&behavior_id) else {
                log::debug!("object '{}': behavior '{}' not registered", obj.id, behavior_id);
                continue;
            };

            let mode = obj
                .activation
                .get(&behavior_id)
                .map(|c| c.mode)
                .unwrap_or_default();
            let state = env.table.entry(&obj.id, &behavior_id);

            if !state.should_run(mode, obj.hovered, obj.click_edge) {
                if let Some(idle) = behavior.idle {
                    idle(obj, state.baseline.as_ref());
                }
                continue;
            }

            state.capture_once(obj);
            state.elapsed += dt;

            let Some(baseline) = state.baseline.as_ref() else {
                continue;
            };
            let mut ctx = BehaviorContext {
                dt,
                elapsed: state.elapsed,
                world: env.world,
                params: ParamResolver::new(&behavior.id, &behavior.defaults),
                baseline,
                scratch: &mut state.scratch,
                particles: &mut *env.particles,
                rng: &mut *env.rng,
            };

            // Only effective where panics unwind
            let outcome = catch_unwind(AssertUnwindSafe(|| (behavior.update)(obj, &mut ctx)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(fault)) => {
                    faults += 1;
                    log::warn!("object '{}' behavior '{}': {}", obj.id, behavior_id, fault);
                }
                Err(payload) => {
                    faults += 1;
                    log::warn!(
                        "object '{}' behavior '{}' panicked: {}",
                        obj.id,
                        behavior_id,
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        // Click edges are consumed by this frame's behaviors
        obj.click_edge = false;
    }

    faults
}
