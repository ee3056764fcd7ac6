//! Error types for the sandbox kernel
//!
//! Nothing in the per-frame pipeline returns these to the host: behavior
//! faults are isolated and logged, pool exhaustion is a silent drop. They
//! surface from document loading, property access, scripts and export.

use thiserror::Error;

/// Rejection of a document at load time. No object is admitted when this is returned.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Malformed JSON or a missing required field
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Two objects share an id
    #[error("duplicate object id '{0}'")]
    DuplicateObject(String),

    /// Two controls share an id
    #[error("duplicate control id '{0}'")]
    DuplicateControl(String),

    /// Empty id on an object or control
    #[error("{0} with an empty id")]
    EmptyId(&'static str),

    /// Geometry or physics value out of range
    #[error("object '{id}': {reason}")]
    InvalidObject { id: String, reason: String },

    /// Object references a behavior the registry does not know
    #[error("object '{object}' uses unknown behavior '{behavior}'")]
    UnknownBehavior { object: String, behavior: String },

    /// Binding targets an object that does not exist
    #[error("control '{control}' binds unknown object '{object}'")]
    UnknownTarget { control: String, object: String },

    /// Binding is incomplete for its control kind
    #[error("control '{control}': {reason}")]
    InvalidBinding { control: String, reason: String },

    /// Canvas or global physics out of range
    #[error("invalid {field}: {reason}")]
    InvalidSettings { field: &'static str, reason: String },

    /// Document was produced by an incompatible schema
    #[error("unsupported document version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
}

/// Failure to read or write an object property through a dotted path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("no object with id '{0}'")]
    UnknownObject(String),

    #[error("empty property path")]
    Empty,

    #[error("unknown property '{0}'")]
    UnknownField(String),

    #[error("property '{0}' requires physics")]
    NoPhysics(String),

    #[error("property '{path}' expects {expected}")]
    TypeMismatch { path: String, expected: &'static str },
}

/// Script compile failure, tied to its 1-based source line.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{command}' (expected set, add or rate)")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: expected '<command> <object>.<property> <number>'")]
    Syntax { line: usize },

    #[error("line {line}: target '{target}' needs an object id and a property")]
    Target { line: usize, target: String },

    #[error("line {line}: '{value}' is not a number")]
    Number { line: usize, value: String },
}

impl ScriptError {
    pub fn line(&self) -> usize {
        match self {
            ScriptError::UnknownCommand { line, .. }
            | ScriptError::Syntax { line }
            | ScriptError::Target { line, .. }
            | ScriptError::Number { line, .. } => *line,
        }
    }
}

/// Failure to instantiate a named template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unknown template '{0}'")]
    Unknown(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Failure to produce or read an export artifact.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown artifact format '{0}'")]
    Format(String),

    #[error("kernel bundle: {0}")]
    Bundle(String),

    #[error("artifact built by kernel {found}, this kernel is {expected}")]
    KernelMismatch { found: String, expected: String },

    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DocumentError::DuplicateObject("ball".into());
        assert_eq!(err.to_string(), "duplicate object id 'ball'");

        let err = PathError::TypeMismatch {
            path: "fill".into(),
            expected: "a color",
        };
        assert_eq!(err.to_string(), "property 'fill' expects a color");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: DocumentError = json_err.into();
        assert!(matches!(err, DocumentError::Json(_)));
    }
}
