#![forbid(unsafe_code)]

//! tmplui public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use tmplui_core as core;
pub use tmplui_runtime as runtime;

pub mod prelude {
    pub use tmplui_core::cx::{Cx, CxController};
    pub use tmplui_core::event::{KeyCode, KeyEvent, KeyEventKind, Modifiers};
    pub use tmplui_core::keys::{KeySpec, parse_key};
    pub use tmplui_runtime::{
        ActionHandler, BoundView, Callback, Context, Executor, FunctionRegistry, Host,
        KeyBinding, KeyDispatch, QueueError, Reconciler, RegistrationError, RuntimeConfig,
        StateValue, TemplateError, UpdateReceiver, UpdateSender, ValidationError, dispatch_key,
        update_queue,
    };

    pub use tmplui_core as core;
    pub use tmplui_runtime as runtime;
}
