#![forbid(unsafe_code)]

//! Core: key events, key-description parsing, and cancellation contexts.

pub mod cx;
pub mod event;
pub mod keys;
#[cfg(feature = "tracing-json")]
pub mod logging;
