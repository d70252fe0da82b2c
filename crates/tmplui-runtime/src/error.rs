#![forbid(unsafe_code)]

use thiserror::Error;

use crate::template::registry::HandlerShape;

/// Which registry namespace a name lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Action,
    Evaluator,
}

impl std::fmt::Display for CallKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action => f.write_str("function"),
            Self::Evaluator => f.write_str("evaluator"),
        }
    }
}

/// Startup-time failure while populating a [`FunctionRegistry`].
///
/// The registry is left unchanged by a failed registration.
///
/// [`FunctionRegistry`]: crate::template::FunctionRegistry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("{kind} {name:?} is already registered")]
    Duplicate { kind: CallKind, name: String },

    #[error("invalid arity for {kind} {name:?}: minArgs={min} maxArgs={}", fmt_max(.max))]
    InvalidArity {
        kind: CallKind,
        name: String,
        min: usize,
        max: Option<usize>,
    },

    #[error("invalid handler signature for function {name:?}: expected {expected}, got {actual}")]
    InvalidHandlerShape {
        name: String,
        expected: HandlerShape,
        actual: HandlerShape,
    },
}

fn fmt_max(max: &Option<usize>) -> String {
    max.map_or_else(|| "unbounded".to_string(), |m| m.to_string())
}

/// Reason reported by an action validator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Expression-time failure from the executor.
///
/// Surfaces to whoever asked for a callback or a rendered string; usually it
/// aborts building one view and leaves its siblings alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("invalid template expression: {expr}")]
    MalformedExpression { expr: String },

    #[error("unknown function: {name}")]
    UnknownAction { name: String },

    #[error("unknown evaluator: {name}")]
    UnknownEvaluator { name: String },

    #[error("function {name:?} requires at least {min} argument(s), got {got}")]
    TooFewArguments { name: String, min: usize, got: usize },

    #[error("function {name:?} accepts at most {max} argument(s), got {got}")]
    TooManyArguments { name: String, max: usize, got: usize },

    #[error("evaluator {name:?} expects {min}-{max} args, got {got}")]
    EvaluatorArity {
        name: String,
        min: usize,
        max: usize,
        got: usize,
    },

    #[error("validation failed for function {name:?}: {source}")]
    Validation {
        name: String,
        #[source]
        source: ValidationError,
    },
}

impl TemplateError {
    /// Whether the failure is an argument-count mismatch.
    #[must_use]
    pub const fn is_arity(&self) -> bool {
        matches!(
            self,
            Self::TooFewArguments { .. } | Self::TooManyArguments { .. } | Self::EvaluatorArity { .. }
        )
    }
}

/// Failure to hand work to the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("no UI update queue is attached to this context")]
    NoQueue,

    #[error("UI update queue is closed")]
    Closed,

    #[error("UI update queue is full")]
    Full,

    #[error("synchronous UI update requested from the UI thread")]
    WouldDeadlock,
}
