#![forbid(unsafe_code)]

//! Named single-slot callback registries (`slot -> name -> callback`).
//!
//! Used for form submit/cancel dispatch: a form registers its handler under
//! its own name, and a button elsewhere triggers it by name. Registering the
//! same `(slot, name)` again replaces the previous callback.

use std::sync::{Arc, RwLock};

use ahash::AHashMap;

/// A deferred, argument-less action.
pub type Callback = Arc<dyn Fn() + Send + Sync>;

/// Slot used by form submit handlers.
pub const FORM_SUBMIT: &str = "formSubmit";
/// Slot used by form cancel handlers.
pub const FORM_CANCEL: &str = "formCancel";

#[derive(Default)]
pub struct NamedSlots {
    slots: RwLock<AHashMap<String, AHashMap<String, Callback>>>,
}

impl NamedSlots {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `callback` under `(slot, name)`, replacing any previous entry.
    pub fn register(&self, slot: impl Into<String>, name: impl Into<String>, callback: Callback) {
        let mut slots = self.slots.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots
            .entry(slot.into())
            .or_default()
            .insert(name.into(), callback);
    }

    #[must_use]
    pub fn get(&self, slot: &str, name: &str) -> Option<Callback> {
        let slots = self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.get(slot).and_then(|names| names.get(name)).cloned()
    }

    /// Invoke the callback at `(slot, name)` outside the lock.
    ///
    /// Returns `false` (and does nothing) when nothing is registered there.
    pub fn run(&self, slot: &str, name: &str) -> bool {
        match self.get(slot, name) {
            Some(callback) => {
                callback();
                true
            }
            None => {
                tracing::debug!(slot, name, "no callback registered for named slot");
                false
            }
        }
    }
}

impl std::fmt::Debug for NamedSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<(&str, usize)> = slots.iter().map(|(k, v)| (k.as_str(), v.len())).collect();
        names.sort_unstable();
        f.debug_struct("NamedSlots").field("slots", &names).finish()
    }
}
