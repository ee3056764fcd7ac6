//! Controls, bindings and the data-binding bridge
//!
//! Controls are rendered by the host; the kernel only sees their values.
//! Value controls write onto their targets every frame, graphs sample their
//! target into a bounded history, buttons fire one action per press.

use std::collections::{BTreeMap, VecDeque};

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::activation::{ActivationMode, ActivationTable, ManualTrigger};
use super::behavior::BehaviorRegistry;
use super::object::{Color, PhysicsState, SimObject, Value};
use super::path::{get_property, set_property};
use crate::consts::{DEFAULT_JUMP_IMPULSE, GRAPH_HISTORY_LEN};
use crate::error::PathError;

/// Kind of host widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Slider,
    Checkbox,
    Button,
    Graph,
    TextInput,
    Dropdown,
    ColorPicker,
}

impl ControlKind {
    /// Writes its value onto bound targets every frame
    pub fn produces_value(self) -> bool {
        !matches!(self, ControlKind::Button | ControlKind::Graph)
    }
}

/// One-shot button actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonAction {
    ResetPosition,
    Stop,
    Jump,
    TogglePhysics,
    RandomizeColor,
    StartBehavior,
    StopBehavior,
    ToggleBehavior,
}

impl ButtonAction {
    fn manual_trigger(self) -> Option<ManualTrigger> {
        match self {
            ButtonAction::StartBehavior => Some(ManualTrigger::Start),
            ButtonAction::StopBehavior => Some(ManualTrigger::Stop),
            ButtonAction::ToggleBehavior => Some(ManualTrigger::Toggle),
            _ => None,
        }
    }
}

/// Link from a control to object properties
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Binding {
    #[serde(default)]
    pub targets: Vec<String>,
    /// Dotted property path (unused by buttons)
    #[serde(default)]
    pub property: String,
    #[serde(default)]
    pub action: Option<ButtonAction>,
    /// Must equal a target behavior's Manual activation id
    #[serde(default)]
    pub action_id: Option<String>,
}

impl Binding {
    pub fn property(targets: &[&str], property: &str) -> Self {
        Self {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            property: property.to_string(),
            ..Default::default()
        }
    }

    pub fn action(targets: &[&str], action: ButtonAction) -> Self {
        Self {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            action: Some(action),
            ..Default::default()
        }
    }
}

fn default_history_len() -> usize {
    GRAPH_HISTORY_LEN
}

/// A host widget's data contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Control {
    pub id: String,
    pub kind: ControlKind,
    #[serde(default)]
    pub label: String,
    /// Current value (buttons: optional action amount, e.g. jump impulse)
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub binding: Option<Binding>,
    /// Samples kept by a graph
    #[serde(default = "default_history_len")]
    pub history_len: usize,

    #[serde(skip)]
    history: VecDeque<f32>,
    #[serde(skip)]
    pending_presses: u32,
    /// Last path error per target, to avoid logging the same failure every frame
    #[serde(skip)]
    last_errors: BTreeMap<String, PathError>,
}

impl Control {
    pub fn new(id: &str, kind: ControlKind, binding: Option<Binding>) -> Self {
        Self {
            id: id.to_string(),
            kind,
            label: String::new(),
            value: None,
            binding,
            history_len: GRAPH_HISTORY_LEN,
            history: VecDeque::new(),
            pending_presses: 0,
            last_errors: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Queue one button activation for the next bridge pass
    pub fn press(&mut self) {
        self.pending_presses += 1;
    }

    /// Graph samples, oldest first
    pub fn history(&self) -> &VecDeque<f32> {
        &self.history
    }

    /// Returns true when the failure is new for this target and was logged
    fn record_error(&mut self, target: &str, result: Result<(), PathError>) -> bool {
        match result {
            Ok(()) => {
                self.last_errors.remove(target);
                false
            }
            Err(err) => {
                if self.last_errors.get(target) == Some(&err) {
                    return false;
                }
                log::warn!("control '{}' -> '{}': {}", self.id, target, err);
                self.last_errors.insert(target.to_string(), err);
                true
            }
        }
    }
}

/// Mutable simulation pieces the bridge writes to
pub struct BridgeEnv<'a> {
    pub registry: &'a BehaviorRegistry,
    pub table: &'a mut ActivationTable,
    pub rng: &'a mut Pcg32,
}

/// Apply every control once: queued button presses, value writes, graph samples
pub fn apply_bindings(controls: &mut [Control], objects: &mut [SimObject], env: &mut BridgeEnv<'_>) {
    for control in controls.iter_mut() {
        let Some(binding) = control.binding.clone() else {
            continue;
        };

        match control.kind {
            ControlKind::Button => {
                while control.pending_presses > 0 {
                    control.pending_presses -= 1;
                    fire_button(control, &binding, objects, env);
                }
            }
            ControlKind::Graph => {
                let Some(target) = binding.targets.first() else {
                    continue;
                };
                let sample = objects
                    .iter()
                    .find(|o| &o.id == target)
                    .ok_or_else(|| PathError::UnknownObject(target.clone()))
                    .and_then(|o| get_property(o, &binding.property, env.registry))
                    .and_then(|v| {
                        v.as_f32().ok_or(PathError::TypeMismatch {
                            path: binding.property.clone(),
                            expected: "a number",
                        })
                    });
                match sample {
                    Ok(value) => {
                        control.history.push_back(value);
                        while control.history.len() > control.history_len.max(1) {
                            control.history.pop_front();
                        }
                        control.record_error(target, Ok(()));
                    }
                    Err(err) => {
                        control.record_error(target, Err(err));
                    }
                }
            }
            _ => {
                let Some(value) = control.value.clone() else {
                    continue;
                };
                for target in &binding.targets {
                    let result = match objects.iter_mut().find(|o| &o.id == target) {
                        Some(obj) => set_property(obj, &binding.property, &value),
                        None => Err(PathError::UnknownObject(target.clone())),
                    };
                    control.record_error(target, result);
                }
            }
        }
    }
}

fn fire_button(
    control: &Control,
    binding: &Binding,
    objects: &mut [SimObject],
    env: &mut BridgeEnv<'_>,
) {
    let Some(action) = binding.action else {
        log::warn!("button '{}' has no action", control.id);
        return;
    };
    log::debug!("button '{}' fired {:?}", control.id, action);

    for obj in objects
        .iter_mut()
        .filter(|o| binding.targets.iter().any(|t| t == &o.id))
    {
        match action {
            ButtonAction::ResetPosition => {
                obj.position = obj.home;
                if let Some(physics) = obj.physics.as_mut() {
                    physics.velocity = Vec2::ZERO;
                }
            }
            ButtonAction::Stop => {
                if let Some(physics) = obj.physics.as_mut() {
                    physics.velocity = Vec2::ZERO;
                }
            }
            ButtonAction::Jump => {
                let impulse = control
                    .value
                    .as_ref()
                    .and_then(Value::as_f32)
                    .unwrap_or(DEFAULT_JUMP_IMPULSE);
                match obj.physics.as_mut() {
                    Some(physics) => physics.velocity.y = -impulse / physics.mass.max(1e-3),
                    None => log::warn!("jump on '{}' without physics", obj.id),
                }
            }
            ButtonAction::TogglePhysics => match obj.physics.as_mut() {
                Some(physics) => physics.enabled = !physics.enabled,
                None => obj.physics = Some(PhysicsState::default()),
            },
            ButtonAction::RandomizeColor => {
                let hue = env.rng.random_range(0.0..360.0);
                obj.fill = Color::from_hsl(hue, 0.7, 0.55);
            }
            ButtonAction::StartBehavior | ButtonAction::StopBehavior | ButtonAction::ToggleBehavior => {
                let Some(trigger) = action.manual_trigger() else {
                    continue;
                };
                let Some(action_id) = binding.action_id.as_deref() else {
                    log::warn!("button '{}' has no action id", control.id);
                    return;
                };
                for behavior in &obj.behaviors {
                    let Some(config) = obj.activation.get(behavior) else {
                        continue;
                    };
                    if config.mode == ActivationMode::Manual
                        && config.action_id.as_deref() == Some(action_id)
                    {
                        env.table.entry(&obj.id, behavior).trigger(trigger);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::activation::ActivationConfig;
    use rand::SeedableRng;

    struct Bridge {
        registry: BehaviorRegistry,
        table: ActivationTable,
        rng: Pcg32,
    }

    impl Bridge {
        fn new() -> Self {
            Self {
                registry: BehaviorRegistry::with_builtins(),
                table: ActivationTable::new(),
                rng: Pcg32::seed_from_u64(3),
            }
        }

        fn apply(&mut self, controls: &mut [Control], objects: &mut [SimObject]) {
            let mut env = BridgeEnv {
                registry: &self.registry,
                table: &mut self.table,
                rng: &mut self.rng,
            };
            apply_bindings(controls, objects, &mut env);
        }
    }

    fn ball() -> SimObject {
        SimObject::circle("ball", Vec2::new(100.0, 100.0), 20.0)
            .with_physics(PhysicsState::default())
            .with_behavior("rotate")
    }

    #[test]
    fn test_slider_writes_every_target() {
        let mut bridge = Bridge::new();
        let mut objects = vec![ball(), SimObject::circle("other", Vec2::ZERO, 5.0)];
        let mut controls = vec![
            Control::new(
                "size",
                ControlKind::Slider,
                Some(Binding::property(&["ball", "other"], "radius")),
            )
            .with_value(42.0),
        ];
        bridge.apply(&mut controls, &mut objects);
        assert!(objects.iter().all(|o| o.effective_radius() == 42.0));
    }

    #[test]
    fn test_value_kinds_address_all_namespaces() {
        let mut bridge = Bridge::new();
        let mut objects = vec![ball()];
        let mut controls = vec![
            Control::new("m", ControlKind::Slider, Some(Binding::property(&["ball"], "physics.mass")))
                .with_value(4.0),
            Control::new("s", ControlKind::Slider, Some(Binding::property(&["ball"], "rotate.speed")))
                .with_value(10.0),
            Control::new("c", ControlKind::ColorPicker, Some(Binding::property(&["ball"], "fill")))
                .with_value("#112233"),
            Control::new("p", ControlKind::Checkbox, Some(Binding::property(&["ball"], "physics.enabled")))
                .with_value(false),
        ];
        bridge.apply(&mut controls, &mut objects);

        let obj = &objects[0];
        let physics = obj.physics.as_ref().unwrap();
        assert_eq!(physics.mass, 4.0);
        assert!(!physics.enabled);
        assert_eq!(obj.params["rotate"]["speed"], Value::Number(10.0));
        assert_eq!(obj.fill.to_string(), "#112233");
    }

    #[test]
    fn test_graph_history_is_bounded() {
        let mut bridge = Bridge::new();
        let mut objects = vec![ball()];
        let mut graph = Control::new("g", ControlKind::Graph, Some(Binding::property(&["ball"], "velocity.y")));
        graph.history_len = 3;
        let mut controls = vec![graph];

        for v in 1..=5 {
            objects[0].physics.as_mut().unwrap().velocity.y = v as f32;
            bridge.apply(&mut controls, &mut objects);
        }
        let history: Vec<f32> = controls[0].history().iter().copied().collect();
        assert_eq!(history, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_button_fires_once_per_press() {
        let mut bridge = Bridge::new();
        let mut objects = vec![ball()];
        let mut controls = vec![
            Control::new("jump", ControlKind::Button, Some(Binding::action(&["ball"], ButtonAction::Jump)))
                .with_value(300.0),
        ];

        bridge.apply(&mut controls, &mut objects);
        assert_eq!(objects[0].physics.as_ref().unwrap().velocity.y, 0.0);

        controls[0].press();
        bridge.apply(&mut controls, &mut objects);
        assert_eq!(objects[0].physics.as_ref().unwrap().velocity.y, -300.0);

        objects[0].physics.as_mut().unwrap().velocity.y = 0.0;
        bridge.apply(&mut controls, &mut objects);
        assert_eq!(objects[0].physics.as_ref().unwrap().velocity.y, 0.0);
    }

    #[test]
    fn test_reset_stop_toggle_randomize() {
        let mut bridge = Bridge::new();
        let mut objects = vec![ball()];
        objects[0].position = Vec2::new(500.0, 500.0);
        objects[0].physics.as_mut().unwrap().velocity = Vec2::new(10.0, 10.0);
        let original_fill = objects[0].fill;

        let mut controls: Vec<Control> = [
            ButtonAction::ResetPosition,
            ButtonAction::TogglePhysics,
            ButtonAction::RandomizeColor,
        ]
        .iter()
        .enumerate()
        .map(|(i, a)| Control::new(&format!("b{i}"), ControlKind::Button, Some(Binding::action(&["ball"], *a))))
        .collect();
        controls.iter_mut().for_each(Control::press);
        bridge.apply(&mut controls, &mut objects);

        let obj = &objects[0];
        assert_eq!(obj.position, Vec2::new(100.0, 100.0));
        assert_eq!(obj.physics.as_ref().unwrap().velocity, Vec2::ZERO);
        assert!(!obj.physics.as_ref().unwrap().enabled);
        assert_ne!(obj.fill, original_fill);
    }

    #[test]
    fn test_manual_triggers_match_action_id() {
        let mut bridge = Bridge::new();
        let mut objects = vec![
            ball()
                .with_behavior("pulse")
                .with_activation("rotate", ActivationConfig::manual("spin"))
                .with_activation("pulse", ActivationConfig::manual("throb")),
        ];
        let mut start = Binding::action(&["ball"], ButtonAction::StartBehavior);
        start.action_id = Some("spin".into());
        let mut toggle = Binding::action(&["ball"], ButtonAction::ToggleBehavior);
        toggle.action_id = Some("spin".into());
        let mut controls = vec![
            Control::new("start", ControlKind::Button, Some(start)),
            Control::new("toggle", ControlKind::Button, Some(toggle)),
        ];

        controls[0].press();
        bridge.apply(&mut controls, &mut objects);
        assert!(bridge.table.get("ball", "rotate").unwrap().latch);
        assert!(bridge.table.get("ball", "pulse").is_none());

        controls[1].press();
        bridge.apply(&mut controls, &mut objects);
        assert!(!bridge.table.get("ball", "rotate").unwrap().latch);
    }

    #[test]
    fn test_unknown_target_does_not_panic() {
        let mut bridge = Bridge::new();
        let mut objects = vec![ball()];
        let mut controls = vec![
            Control::new("s", ControlKind::Slider, Some(Binding::property(&["ghost"], "x"))).with_value(1.0),
        ];
        bridge.apply(&mut controls, &mut objects);
        bridge.apply(&mut controls, &mut objects);
        assert!(controls[0].last_errors.contains_key("ghost"));
    }

    #[test]
    fn test_error_logged_once_per_target_despite_other_successes() {
        let mut bridge = Bridge::new();
        let mut objects = vec![ball()];
        let mut controls = vec![
            Control::new("s", ControlKind::Slider, Some(Binding::property(&["ghost", "ball"], "x")))
                .with_value(3.0),
        ];
        bridge.apply(&mut controls, &mut objects);
        bridge.apply(&mut controls, &mut objects);
        assert_eq!(objects[0].position.x, 3.0);
        assert_eq!(controls[0].last_errors.len(), 1);

        let missing = Err(PathError::UnknownObject("ghost".into()));
        assert!(!controls[0].record_error("ghost", missing.clone()));
        assert!(!controls[0].record_error("ball", Ok(())));
        assert!(!controls[0].record_error("ghost", missing.clone()));

        // Recovery clears the entry, so a later failure is reported again
        controls[0].record_error("ghost", Ok(()));
        assert!(controls[0].record_error("ghost", missing));
    }
}
