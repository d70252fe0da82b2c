#![forbid(unsafe_code)]

//! Name-keyed catalogs of actions and evaluators.
//!
//! Actions and evaluators live in separate namespaces: registering an action
//! named `x` does not conflict with an evaluator named `x`.
//!
//! # Handler shapes
//!
//! Every action handler is one of a closed set of typed variants
//! ([`ActionHandler`]). The variant fixes the parameter shape at compile
//! time, and [`FunctionRegistry::register_action`] checks that shape against
//! the declared arity once, at startup:
//!
//! | declared `max`  | required handler                               |
//! |-----------------|------------------------------------------------|
//! | `Some(n)`       | a fixed handler taking exactly `n` strings     |
//! | `None`          | [`ActionHandler::Variadic`]                    |
//!
//! # Invariants
//!
//! 1. Names are unique within their namespace.
//! 2. `min <= max` for every bounded descriptor.
//! 3. A failed registration leaves the registry unchanged.
//! 4. Descriptors are immutable once registered.

use std::sync::Arc;

use ahash::AHashMap;

use crate::context::Context;
use crate::error::{CallKind, RegistrationError, ValidationError};

type NullaryFn = dyn Fn(&Context) + Send + Sync;
type UnaryFn = dyn Fn(&Context, &str) + Send + Sync;
type BinaryFn = dyn Fn(&Context, &str, &str) + Send + Sync;
type TernaryFn = dyn Fn(&Context, &str, &str, &str) + Send + Sync;
type SliceFn = dyn Fn(&Context, &[String]) + Send + Sync;

/// Argument check run after the arity check and before the callback is built.
pub type Validator = Arc<dyn Fn(&Context, &[String]) -> Result<(), ValidationError> + Send + Sync>;

/// Evaluator body: receives the parsed arguments and returns replacement text.
pub type EvaluatorFn = Arc<dyn Fn(&Context, &[String]) -> String + Send + Sync>;

/// Parameter shape of a handler, excluding the leading `&Context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerShape {
    /// Exactly `n` string parameters.
    Fixed(usize),
    /// One slice parameter carrying every argument.
    Variadic,
}

impl std::fmt::Display for HandlerShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "(&Context + {n} string args)"),
            Self::Variadic => f.write_str("(&Context, &[String])"),
        }
    }
}

/// A pre-bound action body.
#[derive(Clone)]
pub enum ActionHandler {
    Nullary(Arc<NullaryFn>),
    Unary(Arc<UnaryFn>),
    Binary(Arc<BinaryFn>),
    Ternary(Arc<TernaryFn>),
    /// Any fixed count; the slice always has exactly `params` entries.
    Positional { params: usize, f: Arc<SliceFn> },
    Variadic(Arc<SliceFn>),
}

impl ActionHandler {
    pub fn nullary(f: impl Fn(&Context) + Send + Sync + 'static) -> Self {
        Self::Nullary(Arc::new(f))
    }

    pub fn unary(f: impl Fn(&Context, &str) + Send + Sync + 'static) -> Self {
        Self::Unary(Arc::new(f))
    }

    pub fn binary(f: impl Fn(&Context, &str, &str) + Send + Sync + 'static) -> Self {
        Self::Binary(Arc::new(f))
    }

    pub fn ternary(f: impl Fn(&Context, &str, &str, &str) + Send + Sync + 'static) -> Self {
        Self::Ternary(Arc::new(f))
    }

    pub fn positional(params: usize, f: impl Fn(&Context, &[String]) + Send + Sync + 'static) -> Self {
        Self::Positional {
            params,
            f: Arc::new(f),
        }
    }

    pub fn variadic(f: impl Fn(&Context, &[String]) + Send + Sync + 'static) -> Self {
        Self::Variadic(Arc::new(f))
    }

    #[must_use]
    pub fn shape(&self) -> HandlerShape {
        match self {
            Self::Nullary(_) => HandlerShape::Fixed(0),
            Self::Unary(_) => HandlerShape::Fixed(1),
            Self::Binary(_) => HandlerShape::Fixed(2),
            Self::Ternary(_) => HandlerShape::Fixed(3),
            Self::Positional { params, .. } => HandlerShape::Fixed(*params),
            Self::Variadic(_) => HandlerShape::Variadic,
        }
    }

    /// Invoke with already-validated arguments.
    ///
    /// Fixed handlers receive arguments positionally; missing trailing
    /// arguments (allowed when `min < max`) arrive as empty strings.
    pub(crate) fn invoke(&self, ctx: &Context, args: &[String]) {
        let arg = |i: usize| args.get(i).map_or("", String::as_str);
        match self {
            Self::Nullary(f) => f(ctx),
            Self::Unary(f) => f(ctx, arg(0)),
            Self::Binary(f) => f(ctx, arg(0), arg(1)),
            Self::Ternary(f) => f(ctx, arg(0), arg(1), arg(2)),
            Self::Positional { params, f } => {
                if args.len() >= *params {
                    f(ctx, &args[..*params]);
                } else {
                    let mut padded = args.to_vec();
                    padded.resize(*params, String::new());
                    f(ctx, &padded);
                }
            }
            Self::Variadic(f) => f(ctx, args),
        }
    }
}

impl std::fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ActionHandler").field(&self.shape()).finish()
    }
}

/// A registered action.
pub struct ActionDescriptor {
    pub name: String,
    pub min_args: usize,
    /// `None` marks a variadic action.
    pub max_args: Option<usize>,
    pub validator: Option<Validator>,
    pub handler: ActionHandler,
}

impl ActionDescriptor {
    #[must_use]
    pub const fn is_variadic(&self) -> bool {
        self.max_args.is_none()
    }
}

impl std::fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("validator", &self.validator.is_some())
            .field("handler", &self.handler)
            .finish()
    }
}

/// A registered evaluator.
pub struct EvaluatorDescriptor {
    pub name: String,
    pub min_args: usize,
    pub max_args: usize,
    pub handler: EvaluatorFn,
}

impl std::fmt::Debug for EvaluatorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorDescriptor")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}

/// Catalog of actions and evaluators.
///
/// Populated at startup through `&mut self`, then shared read-only behind an
/// `Arc`.
#[derive(Debug, Default)]
pub struct FunctionRegistry {
    actions: AHashMap<String, Arc<ActionDescriptor>>,
    evaluators: AHashMap<String, Arc<EvaluatorDescriptor>>,
}

impl FunctionRegistry {
    /// A registry pre-populated with the built-in actions and evaluators.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        super::builtins::register_builtins(&mut registry);
        registry
    }

    /// A registry with nothing registered.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register an action.
    ///
    /// `max_args == None` declares a variadic action, which requires an
    /// [`ActionHandler::Variadic`] handler. A bounded action requires a fixed
    /// handler taking exactly `max_args` strings.
    pub fn register_action(
        &mut self,
        name: impl Into<String>,
        min_args: usize,
        max_args: Option<usize>,
        validator: Option<Validator>,
        handler: ActionHandler,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if let Some(max) = max_args
            && max < min_args
        {
            return Err(RegistrationError::InvalidArity {
                kind: CallKind::Action,
                name,
                min: min_args,
                max: max_args,
            });
        }
        if self.actions.contains_key(&name) {
            return Err(RegistrationError::Duplicate {
                kind: CallKind::Action,
                name,
            });
        }
        let expected = max_args.map_or(HandlerShape::Variadic, HandlerShape::Fixed);
        let actual = handler.shape();
        if expected != actual {
            return Err(RegistrationError::InvalidHandlerShape {
                name,
                expected,
                actual,
            });
        }

        tracing::debug!(name = %name, min_args, ?max_args, "template action registered");
        self.actions.insert(
            name.clone(),
            Arc::new(ActionDescriptor {
                name,
                min_args,
                max_args,
                validator,
                handler,
            }),
        );
        Ok(())
    }

    /// Register a value-producing evaluator with a bounded arity.
    pub fn register_evaluator(
        &mut self,
        name: impl Into<String>,
        min_args: usize,
        max_args: usize,
        handler: impl Fn(&Context, &[String]) -> String + Send + Sync + 'static,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if max_args < min_args {
            return Err(RegistrationError::InvalidArity {
                kind: CallKind::Evaluator,
                name,
                min: min_args,
                max: Some(max_args),
            });
        }
        if self.evaluators.contains_key(&name) {
            return Err(RegistrationError::Duplicate {
                kind: CallKind::Evaluator,
                name,
            });
        }

        tracing::debug!(name = %name, min_args, max_args, "template evaluator registered");
        self.evaluators.insert(
            name.clone(),
            Arc::new(EvaluatorDescriptor {
                name,
                min_args,
                max_args,
                handler: Arc::new(handler),
            }),
        );
        Ok(())
    }

    #[must_use]
    pub fn action(&self, name: &str) -> Option<Arc<ActionDescriptor>> {
        self.actions.get(name).cloned()
    }

    #[must_use]
    pub fn evaluator(&self, name: &str) -> Option<Arc<EvaluatorDescriptor>> {
        self.evaluators.get(name).cloned()
    }

    #[must_use]
    pub fn contains_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    #[must_use]
    pub fn contains_evaluator(&self, name: &str) -> bool {
        self.evaluators.contains_key(name)
    }

    /// Registered action names, sorted.
    #[must_use]
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered evaluator names, sorted.
    #[must_use]
    pub fn evaluator_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.evaluators.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
