#![forbid(unsafe_code)]

//! Application-side capabilities the built-in actions drive.
//!
//! The engine does not own pages, modals or the application loop. An
//! embedding supplies a [`Host`] when building the [`Context`]; built-ins
//! that need one log a warning and do nothing when none is attached.
//!
//! [`Context`]: crate::Context

/// Page/modal/application control surface.
///
/// Methods are called from action callbacks, which run on the UI thread.
pub trait Host: Send + Sync {
    /// Bring the page named `name` to the front.
    fn switch_to_page(&self, name: &str);

    /// Remove the page named `name`.
    fn remove_page(&self, name: &str);

    /// Stop the application loop.
    fn stop(&self);

    /// Show a modal with `text` and one button per label. `buttons` is never
    /// empty.
    fn show_modal(&self, text: &str, buttons: &[String]);
}
