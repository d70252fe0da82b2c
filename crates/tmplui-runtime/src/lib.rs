#![forbid(unsafe_code)]

//! Template callbacks, reactive state, and the reconciliation loop.
//!
//! # Role in tmplui
//! `tmplui-runtime` turns `{{ name "arg" }}` expressions from configuration
//! documents into deferred callbacks and rendered strings, and keeps rendered
//! strings current as state changes.
//!
//! # Flow
//!
//! 1. At startup, populate a [`FunctionRegistry`] (built-ins plus your own).
//! 2. While building views, call [`Executor::execute_callback`] for event
//!    handlers and [`Executor::bind_text`] for text that reads state.
//! 3. Handlers write state with [`Context::set_direct`]; workers use
//!    [`Context::set_deferred`].
//! 4. A [`Reconciler`] posts passes to the UI queue, and the UI loop runs
//!    them, pushing the latest values to bound views.
//!
//! # Example
//!
//! ```
//! use std::sync::{Arc, Mutex};
//! use tmplui_runtime::{Context, Executor, FunctionRegistry};
//!
//! let ctx = Arc::new(Context::new());
//! let exec = Executor::new(Arc::clone(&ctx), Arc::new(FunctionRegistry::new()));
//!
//! let shown = Arc::new(Mutex::new(String::new()));
//! let sink = Arc::clone(&shown);
//! let initial = exec
//!     .bind_text("Status: {{ bindState notification }}", move |text| {
//!         *sink.lock().unwrap() = text.to_string();
//!     })
//!     .unwrap();
//! assert_eq!(initial, "Status: ");
//!
//! let on_save = exec.execute_callback(r#"{{ showNotification "Saved" }}"#).unwrap();
//! on_save();
//! ctx.reconcile();
//! assert_eq!(*shown.lock().unwrap(), "Status: Saved");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod keybinding;
pub mod reconcile;
pub mod state;
pub mod template;
pub mod update_queue;

pub use config::RuntimeConfig;
pub use context::Context;
pub use error::{CallKind, QueueError, RegistrationError, TemplateError, ValidationError};
pub use host::Host;
pub use keybinding::{KeyBinding, KeyDispatch, dispatch_key, matches};
pub use reconcile::Reconciler;
pub use state::{
    BoundView, Callback, NamedSlots, ReconcileReport, StateStore, StateValue, Subscriber,
};
pub use template::{
    ActionHandler, Executor, FunctionRegistry, HandlerShape, PreparedCall, Validator,
};
pub use update_queue::{UpdateJob, UpdateReceiver, UpdateSender, update_queue};
