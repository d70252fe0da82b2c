#![forbid(unsafe_code)]

//! Turns expression text into rendered strings and deferred callbacks.
//!
//! # Rendering
//!
//! [`Executor::evaluate_to_string`] copies literals and replaces every closed
//! `{{ ... }}` span with the output of the named evaluator. Evaluator
//! arguments may be bare words.
//!
//! # Callbacks
//!
//! [`Executor::execute_callback`] accepts a single action call, optionally
//! wrapped in one pair of markers. Arguments must be double-quoted. All
//! checks (lookup, arity, validator) happen while building; the returned
//! callback never fails on its own account.
//!
//! Only one call is understood. Text such as `{{ a }} {{ b }}` loses its
//! outer markers and is read as the call `a` with whatever quoted arguments
//! follow.

use std::sync::Arc;

use super::parse::{
    CLOSE, OPEN, Segment, parse_callback_call, parse_evaluator_call, split_template,
    template_expressions,
};
use super::registry::{ActionDescriptor, FunctionRegistry};
use crate::context::Context;
use crate::error::TemplateError;
use crate::state::{BoundView, Callback};

/// Evaluator that reads a state key.
pub const STATE_READ_EVALUATOR: &str = "bindState";

/// A checked action call that has not run yet.
#[derive(Debug, Clone)]
pub enum PreparedCall {
    /// The empty expression.
    Noop,
    Action {
        descriptor: Arc<ActionDescriptor>,
        args: Vec<String>,
    },
}

impl PreparedCall {
    /// Run the call with `ctx`.
    pub fn invoke(&self, ctx: &Context) {
        if let Self::Action { descriptor, args } = self {
            descriptor.handler.invoke(ctx, args);
        }
    }

    /// Name of the action, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Noop => None,
            Self::Action { descriptor, .. } => Some(&descriptor.name),
        }
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        match self {
            Self::Noop => &[],
            Self::Action { args, .. } => args,
        }
    }

    /// Bind to `ctx`, producing a callback suitable for UI events.
    #[must_use]
    pub fn into_callback(self, ctx: Arc<Context>) -> Callback {
        match self {
            Self::Noop => Arc::new(|| {}),
            call @ Self::Action { .. } => Arc::new(move || call.invoke(&ctx)),
        }
    }
}

/// Look up, arity-check and validate an action expression.
pub(crate) fn prepare_call(
    registry: &FunctionRegistry,
    ctx: &Context,
    text: &str,
) -> Result<PreparedCall, TemplateError> {
    if text.is_empty() {
        return Ok(PreparedCall::Noop);
    }
    let trimmed = text.trim();
    let inner = trimmed.strip_prefix(OPEN).unwrap_or(trimmed);
    let inner = inner.strip_suffix(CLOSE).unwrap_or(inner).trim();

    let call = parse_callback_call(inner).ok_or_else(|| TemplateError::MalformedExpression {
        expr: inner.to_string(),
    })?;
    let descriptor = registry
        .action(&call.name)
        .ok_or_else(|| TemplateError::UnknownAction {
            name: call.name.clone(),
        })?;

    let got = call.args.len();
    if got < descriptor.min_args {
        return Err(TemplateError::TooFewArguments {
            name: call.name,
            min: descriptor.min_args,
            got,
        });
    }
    if let Some(max) = descriptor.max_args
        && got > max
    {
        return Err(TemplateError::TooManyArguments {
            name: call.name,
            max,
            got,
        });
    }
    if let Some(validator) = &descriptor.validator {
        validator(ctx, &call.args).map_err(|source| TemplateError::Validation {
            name: call.name.clone(),
            source,
        })?;
    }

    Ok(PreparedCall::Action {
        descriptor,
        args: call.args,
    })
}

fn render(registry: &FunctionRegistry, ctx: &Context, text: &str) -> Result<String, TemplateError> {
    let segments = split_template(text);
    let mut out = String::with_capacity(text.len() + segments.len() * 16);
    for segment in segments {
        let expr = match segment {
            Segment::Literal(literal) => {
                out.push_str(&literal);
                continue;
            }
            Segment::Expr(expr) => expr,
        };
        let Some(call) = parse_evaluator_call(expr) else {
            return Err(TemplateError::UnknownEvaluator {
                name: String::new(),
            });
        };
        let evaluator = registry
            .evaluator(&call.name)
            .ok_or_else(|| TemplateError::UnknownEvaluator {
                name: call.name.clone(),
            })?;
        let got = call.args.len();
        if got < evaluator.min_args || got > evaluator.max_args {
            return Err(TemplateError::EvaluatorArity {
                name: call.name,
                min: evaluator.min_args,
                max: evaluator.max_args,
                got,
            });
        }
        out.push_str(&(evaluator.handler)(ctx, &call.args));
    }
    Ok(out)
}

/// Keys read through [`STATE_READ_EVALUATOR`], first-seen order, no repeats.
#[must_use]
pub fn extract_referenced_keys(text: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for expr in template_expressions(text) {
        let Some(call) = parse_evaluator_call(expr) else {
            continue;
        };
        if call.name != STATE_READ_EVALUATOR {
            continue;
        }
        if let Some(key) = call.args.into_iter().next()
            && !keys.contains(&key)
        {
            keys.push(key);
        }
    }
    keys
}

/// Builds callbacks and rendered strings against one context and registry.
#[derive(Debug, Clone)]
pub struct Executor {
    ctx: Arc<Context>,
    registry: Arc<FunctionRegistry>,
}

impl Executor {
    #[must_use]
    pub fn new(ctx: Arc<Context>, registry: Arc<FunctionRegistry>) -> Self {
        Self { ctx, registry }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<FunctionRegistry> {
        &self.registry
    }

    /// Render `text`, replacing each expression with its evaluator's output.
    ///
    /// Stops at the first failing expression. An unclosed `{{` is literal.
    pub fn evaluate_to_string(&self, text: &str) -> Result<String, TemplateError> {
        if text.is_empty() {
            return Ok(String::new());
        }
        render(&self.registry, &self.ctx, text).inspect_err(|err| {
            tracing::debug!(text, error = %err, "template render failed");
        })
    }

    /// Check an action expression without binding it to a callback.
    pub fn prepare(&self, text: &str) -> Result<PreparedCall, TemplateError> {
        prepare_call(&self.registry, &self.ctx, text).inspect_err(|err| {
            tracing::debug!(text, error = %err, "action expression rejected");
        })
    }

    /// Build a deferred callback for an action expression.
    ///
    /// The empty string yields a callback that does nothing.
    pub fn execute_callback(&self, text: &str) -> Result<Callback, TemplateError> {
        Ok(self.prepare(text)?.into_callback(Arc::clone(&self.ctx)))
    }

    /// See [`extract_referenced_keys`].
    #[must_use]
    pub fn extract_referenced_keys(&self, text: &str) -> Vec<String> {
        extract_referenced_keys(text)
    }

    /// Render `text` once and keep it current.
    ///
    /// Registers one [`BoundView`] per referenced state key. Each view
    /// re-renders the whole text and hands it to `apply`. Returns the initial
    /// rendering; on error nothing is registered.
    pub fn bind_text(
        &self,
        text: &str,
        apply: impl Fn(&str) + Send + Sync + 'static,
    ) -> Result<String, TemplateError> {
        let initial = self.evaluate_to_string(text)?;
        let keys = extract_referenced_keys(text);
        if keys.is_empty() {
            return Ok(initial);
        }

        let apply: Arc<dyn Fn(&str) + Send + Sync> = Arc::new(apply);
        let template: Arc<str> = Arc::from(text);
        for key in keys {
            // Weak: the view is stored inside the context it renders against.
            let ctx = Arc::downgrade(&self.ctx);
            let registry = Arc::clone(&self.registry);
            let template = Arc::clone(&template);
            let apply = Arc::clone(&apply);
            self.ctx.register_bound_view(
                key,
                BoundView::new(
                    move || match ctx.upgrade() {
                        Some(ctx) => render(&registry, &ctx, &template),
                        None => Ok(String::new()),
                    },
                    move |rendered| apply(rendered),
                ),
            );
        }
        Ok(initial)
    }
}
