#![forbid(unsafe_code)]

//! Expression language: parsing, the function registry, and execution.

pub mod builtins;
pub mod executor;
pub mod parse;
pub mod registry;

pub use executor::{Executor, PreparedCall, STATE_READ_EVALUATOR, extract_referenced_keys};
pub use registry::{
    ActionDescriptor, ActionHandler, EvaluatorDescriptor, EvaluatorFn, FunctionRegistry,
    HandlerShape, Validator,
};
