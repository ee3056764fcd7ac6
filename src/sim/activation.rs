//! Behavior activation policy and per-(object, behavior) state
//!
//! Latches, baselines and run counters live in a side-table keyed by
//! `(object id, behavior id)` rather than on the object record.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::object::{Color, Shape, SimObject};

/// When a behavior runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationMode {
    /// Every frame
    #[default]
    OnEnter,
    /// While the pointer is over the object
    OnHover,
    /// From the first click on, until externally reset
    OnClick,
    /// Each click flips the latch
    OnClickToggle,
    /// Only external triggers (bound buttons, host calls) move the latch
    Manual,
}

/// Persisted activation policy for one behavior on one object
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivationConfig {
    #[serde(default)]
    pub mode: ActivationMode,
    /// Id a button action must carry to trigger a Manual behavior
    #[serde(default)]
    pub action_id: Option<String>,
}

impl ActivationConfig {
    pub fn new(mode: ActivationMode) -> Self {
        Self {
            mode,
            action_id: None,
        }
    }

    pub fn manual(action_id: &str) -> Self {
        Self {
            mode: ActivationMode::Manual,
            action_id: Some(action_id.to_string()),
        }
    }
}

/// External latch command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualTrigger {
    Start,
    Stop,
    Toggle,
}

/// Object values captured the first time a behavior runs
#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub position: Vec2,
    pub rotation: f32,
    pub opacity: f32,
    pub fill: Color,
    pub shape: Shape,
}

impl Baseline {
    pub fn capture(obj: &SimObject) -> Self {
        Self {
            position: obj.position,
            rotation: obj.rotation,
            opacity: obj.opacity,
            fill: obj.fill,
            shape: obj.shape.clone(),
        }
    }
}

/// Mutable state of one behavior on one object
#[derive(Debug, Clone, Default)]
pub struct ActivationState {
    pub latch: bool,
    /// Captured at most once, on first activation
    pub baseline: Option<Baseline>,
    /// Seconds spent running
    pub elapsed: f32,
    /// Named counters owned by the behavior
    pub scratch: BTreeMap<String, f32>,
}

impl ActivationState {
    /// Apply this frame's pointer edges to the latch and decide whether to run
    pub fn should_run(&mut self, mode: ActivationMode, hovered: bool, click_edge: bool) -> bool {
        match mode {
            ActivationMode::OnEnter => true,
            ActivationMode::OnHover => hovered,
            ActivationMode::OnClick => {
                if click_edge {
                    self.latch = true;
                }
                self.latch
            }
            ActivationMode::OnClickToggle => {
                if click_edge {
                    self.latch = !self.latch;
                }
                self.latch
            }
            ActivationMode::Manual => self.latch,
        }
    }

    pub fn trigger(&mut self, trigger: ManualTrigger) {
        self.latch = match trigger {
            ManualTrigger::Start => true,
            ManualTrigger::Stop => false,
            ManualTrigger::Toggle => !self.latch,
        };
    }

    /// Capture the baseline unless it already exists
    pub fn capture_once(&mut self, obj: &SimObject) -> bool {
        if self.baseline.is_some() {
            return false;
        }
        self.baseline = Some(Baseline::capture(obj));
        true
    }

    pub fn started(&self) -> bool {
        self.baseline.is_some()
    }
}

/// Side-table of activation state, iterated in key order
#[derive(Debug, Clone, Default)]
pub struct ActivationTable {
    entries: BTreeMap<(String, String), ActivationState>,
}

impl ActivationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: &str, behavior: &str) -> Option<&ActivationState> {
        self.entries.get(&(object.to_string(), behavior.to_string()))
    }

    pub fn entry(&mut self, object: &str, behavior: &str) -> &mut ActivationState {
        self.entries
            .entry((object.to_string(), behavior.to_string()))
            .or_default()
    }

    /// Forget latch, baseline and counters for one pair
    pub fn reset(&mut self, object: &str, behavior: &str) -> bool {
        self.entries
            .remove(&(object.to_string(), behavior.to_string()))
            .is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_click_latches_permanently() {
        let mut state = ActivationState::default();
        assert!(!state.should_run(ActivationMode::OnClick, true, false));

        assert!(state.should_run(ActivationMode::OnClick, true, true));
        // Further clicks and hover changes do not re-arm
        assert!(state.should_run(ActivationMode::OnClick, false, false));
        assert!(state.should_run(ActivationMode::OnClick, true, true));
        assert!(state.should_run(ActivationMode::OnClick, false, false));
    }

    #[test]
    fn test_on_click_toggle() {
        let mut state = ActivationState::default();
        assert!(state.should_run(ActivationMode::OnClickToggle, false, true));
        assert!(state.should_run(ActivationMode::OnClickToggle, false, false));
        assert!(!state.should_run(ActivationMode::OnClickToggle, false, true));
        assert!(!state.should_run(ActivationMode::OnClickToggle, true, false));
    }

    #[test]
    fn test_hover_and_enter() {
        let mut state = ActivationState::default();
        assert!(state.should_run(ActivationMode::OnEnter, false, false));
        assert!(state.should_run(ActivationMode::OnHover, true, false));
        assert!(!state.should_run(ActivationMode::OnHover, false, true));
    }

    #[test]
    fn test_manual_ignores_pointer() {
        let mut state = ActivationState::default();
        assert!(!state.should_run(ActivationMode::Manual, true, true));
        state.trigger(ManualTrigger::Start);
        assert!(state.should_run(ActivationMode::Manual, false, false));
        state.trigger(ManualTrigger::Toggle);
        assert!(!state.should_run(ActivationMode::Manual, true, true));
        state.trigger(ManualTrigger::Toggle);
        state.trigger(ManualTrigger::Stop);
        assert!(!state.latch);
    }

    #[test]
    fn test_baseline_captured_once() {
        let mut obj = SimObject::circle("a", Vec2::new(10.0, 20.0), 5.0);
        let mut state = ActivationState::default();
        assert!(!state.started());
        assert!(state.capture_once(&obj));

        obj.position = Vec2::new(99.0, 99.0);
        assert!(!state.capture_once(&obj));
        assert_eq!(state.baseline.as_ref().unwrap().position, Vec2::new(10.0, 20.0));
    }

    #[test]
    fn test_table_reset() {
        let mut table = ActivationTable::new();
        table.entry("a", "rotate").latch = true;
        assert_eq!(table.len(), 1);
        assert!(table.get("a", "rotate").unwrap().latch);
        assert!(table.reset("a", "rotate"));
        assert!(table.get("a", "rotate").is_none());
        assert!(!table.reset("a", "rotate"));
    }
}
