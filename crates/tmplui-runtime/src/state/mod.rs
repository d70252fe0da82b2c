#![forbid(unsafe_code)]

//! Reactive state: values, the store, and named callback slots.

mod slots;
mod store;
mod value;

pub use slots::{Callback, FORM_CANCEL, FORM_SUBMIT, NamedSlots};
pub use store::{BoundView, ReconcileReport, StateStore, Subscriber};
pub use value::StateValue;
