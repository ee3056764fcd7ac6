//! Deterministic simulation module
//!
//! The whole kernel lives here and is shared by the authoring session and
//! exported players. This module must be pure and deterministic:
//! - Caller-supplied dt only, clamped in one place (`Simulation::step`)
//! - Seeded RNG only
//! - Stable iteration order (document order, ordered maps)
//! - No rendering or platform dependencies beyond the `Surface` contract

pub mod activation;
pub mod behavior;
pub mod behaviors;
pub mod binding;
pub mod collision;
pub mod input;
pub mod object;
pub mod particles;
pub mod path;
pub mod physics;
pub mod script;
pub mod simulation;

pub use activation::{ActivationConfig, ActivationMode, ActivationTable, ManualTrigger};
pub use behavior::{Behavior, BehaviorContext, BehaviorFault, BehaviorRegistry};
pub use binding::{Binding, ButtonAction, Control, ControlKind};
pub use input::Pointer;
pub use object::{Color, PhysicsState, Shape, SimObject, TextReveal, Value};
pub use particles::{Emitter, ParticlePool, SpawnConfig};
pub use physics::PhysicsSettings;
pub use script::Script;
pub use simulation::{SimOptions, Simulation};
