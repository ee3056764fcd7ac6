//! Global script rules
//!
//! A document may carry a small line-oriented script applied every frame
//! after input routing:
//!
//! ```text
//! # comment
//! set  title.opacity        0.5
//! add  spinner.rotation     1
//! rate ball.physics.mass    0.2     # per second
//! ```
//!
//! `set` writes the number, `add` adds it once per frame, `rate` adds it
//! scaled by the frame delta. Targets are `<objectId>.<property path>`.

use super::behavior::BehaviorRegistry;
use super::object::{SimObject, Value};
use super::path::{get_property, set_property};
use crate::error::{PathError, ScriptError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOp {
    Set,
    Add,
    Rate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    /// 1-based source line
    pub line: usize,
    pub op: RuleOp,
    pub object: String,
    pub path: String,
    pub amount: f32,
}

/// A compiled script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    rules: Vec<Rule>,
}

impl Script {
    /// Compile every line, collecting all errors rather than stopping at the first
    pub fn compile(source: &str) -> Result<Self, Vec<ScriptError>> {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let code = raw.split('#').next().unwrap_or("").trim();
            if code.is_empty() {
                continue;
            }
            match parse_rule(line, code) {
                Ok(rule) => rules.push(rule),
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            Ok(Self { rules })
        } else {
            Err(errors)
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule once. Returns the number of rules that failed this frame.
    pub fn apply(&self, objects: &mut [SimObject], registry: &BehaviorRegistry, dt: f32) -> usize {
        let mut failed = 0;
        for rule in &self.rules {
            if let Err(err) = apply_rule(rule, objects, registry, dt) {
                failed += 1;
                log::debug!("script line {}: {}", rule.line, err);
            }
        }
        failed
    }
}

fn parse_rule(line: usize, code: &str) -> Result<Rule, ScriptError> {
    let tokens: Vec<&str> = code.split_whitespace().collect();
    let [command, target, amount] = tokens.as_slice() else {
        return Err(ScriptError::Syntax { line });
    };

    let op = match command.to_ascii_lowercase().as_str() {
        "set" => RuleOp::Set,
        "add" => RuleOp::Add,
        "rate" => RuleOp::Rate,
        _ => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: command.to_string(),
            });
        }
    };

    let (object, path) = target
        .split_once('.')
        .filter(|(o, p)| !o.is_empty() && !p.is_empty())
        .ok_or_else(|| ScriptError::Target {
            line,
            target: target.to_string(),
        })?;

    let amount = amount
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ScriptError::Number {
            line,
            value: amount.to_string(),
        })?;

    Ok(Rule {
        line,
        op,
        object: object.to_string(),
        path: path.to_string(),
        amount,
    })
}

fn apply_rule(
    rule: &Rule,
    objects: &mut [SimObject],
    registry: &BehaviorRegistry,
    dt: f32,
) -> Result<(), PathError> {
    let obj = objects
        .iter_mut()
        .find(|o| o.id == rule.object)
        .ok_or_else(|| PathError::UnknownObject(rule.object.clone()))?;

    let delta = match rule.op {
        RuleOp::Set => return set_property(obj, &rule.path, &Value::from(rule.amount)),
        RuleOp::Add => rule.amount,
        RuleOp::Rate => rule.amount * dt,
    };
    let current = get_property(obj, &rule.path, registry)?
        .as_f32()
        .ok_or_else(|| PathError::TypeMismatch {
            path: rule.path.clone(),
            expected: "a number",
        })?;
    set_property(obj, &rule.path, &Value::from(current + delta))
}
