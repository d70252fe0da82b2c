#![forbid(unsafe_code)]

//! Execution context handed to every action, validator and evaluator.
//!
//! A [`Context`] bundles the shared state store, the named callback slots,
//! and the optional links to the outside world: the UI update queue, the
//! [`Host`], and the registry used by [`Context::run_callback`].
//!
//! # Writing state
//!
//! | method                     | where it may run          | effect                        |
//! |----------------------------|---------------------------|-------------------------------|
//! | [`Context::set_direct`]    | any thread, incl. UI      | write + mark dirty            |
//! | [`Context::set_deferred`]  | background threads only   | same, performed on UI thread  |
//!
//! Neither pushes to views; the next [`Context::reconcile`] does.

use std::sync::{Arc, RwLock};

use crate::error::QueueError;
use crate::host::Host;
use crate::state::{
    BoundView, Callback, FORM_CANCEL, FORM_SUBMIT, NamedSlots, ReconcileReport, StateStore,
    StateValue,
};
use crate::template::FunctionRegistry;
use crate::template::executor::prepare_call;
use crate::update_queue::UpdateSender;

pub struct Context {
    store: Arc<StateStore>,
    slots: NamedSlots,
    updates: Option<UpdateSender>,
    host: Option<Arc<dyn Host>>,
    registry: RwLock<Option<Arc<FunctionRegistry>>>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context with an empty store and no queue, host or registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(StateStore::new()),
            slots: NamedSlots::new(),
            updates: None,
            host: None,
            registry: RwLock::new(None),
        }
    }

    /// Route [`Context::set_deferred`] through `sender`.
    #[must_use]
    pub fn with_update_queue(mut self, sender: UpdateSender) -> Self {
        self.updates = Some(sender);
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    #[must_use]
    pub fn host(&self) -> Option<&Arc<dyn Host>> {
        self.host.as_ref()
    }

    #[must_use]
    pub fn update_sender(&self) -> Option<&UpdateSender> {
        self.updates.as_ref()
    }

    // --- state -------------------------------------------------------------

    /// Write `key` on the UI thread and wait for the write to land.
    ///
    /// For background workers. From the UI thread (for example inside an
    /// action callback) this returns [`QueueError::WouldDeadlock`]; use
    /// [`Context::set_direct`] there.
    ///
    /// The UI thread is only recognized once it has drained the queue or
    /// called [`UpdateReceiver::claim_current_thread`]. Claim it before
    /// running any setup code that may reach this method, or that call
    /// blocks forever.
    ///
    /// [`UpdateReceiver::claim_current_thread`]: crate::update_queue::UpdateReceiver::claim_current_thread
    pub fn set_deferred(
        &self,
        key: impl Into<String>,
        value: impl Into<StateValue>,
    ) -> Result<(), QueueError> {
        let Some(updates) = &self.updates else {
            return Err(QueueError::NoQueue);
        };
        let store = Arc::clone(&self.store);
        let key = key.into();
        let value = value.into();
        updates.run_sync(move || store.set(key, value))
    }

    /// Write `key` and mark it dirty under the store lock.
    pub fn set_direct(&self, key: impl Into<String>, value: impl Into<StateValue>) {
        self.store.set(key, value);
    }

    #[must_use]
    pub fn get_state(&self, key: &str) -> Option<StateValue> {
        self.store.get(key)
    }

    #[must_use]
    pub fn has_dirty_keys(&self) -> bool {
        self.store.has_dirty_keys()
    }

    /// See [`StateStore::register_bound_view`]; views are never removed.
    pub fn register_bound_view(&self, key: impl Into<String>, view: BoundView) {
        self.store.register_bound_view(key, view);
    }

    /// Call `subscriber` with the raw value after each pass that saw `key`
    /// change.
    pub fn on_change(
        &self,
        key: impl Into<String>,
        subscriber: impl Fn(&StateValue) + Send + Sync + 'static,
    ) {
        self.store.subscribe(key, Arc::new(subscriber));
    }

    /// Push dirty keys to views and subscribers. UI thread only.
    pub fn reconcile(&self) -> ReconcileReport {
        self.store.reconcile()
    }

    // --- named callbacks ---------------------------------------------------

    pub fn register_named_callback(
        &self,
        slot: impl Into<String>,
        name: impl Into<String>,
        callback: Callback,
    ) {
        self.slots.register(slot, name, callback);
    }

    /// Run the callback at `(slot, name)`; `false` if none is registered.
    pub fn run_named(&self, slot: &str, name: &str) -> bool {
        self.slots.run(slot, name)
    }

    pub fn register_form_submit(&self, form: impl Into<String>, callback: Callback) {
        self.slots.register(FORM_SUBMIT, form, callback);
    }

    pub fn register_form_cancel(&self, form: impl Into<String>, callback: Callback) {
        self.slots.register(FORM_CANCEL, form, callback);
    }

    pub fn run_form_submit(&self, form: &str) -> bool {
        self.slots.run(FORM_SUBMIT, form)
    }

    pub fn run_form_cancel(&self, form: &str) -> bool {
        self.slots.run(FORM_CANCEL, form)
    }

    // --- immediate actions -------------------------------------------------

    /// Make `registry` available to [`Context::run_callback`].
    pub fn attach_registry(&self, registry: Arc<FunctionRegistry>) {
        let mut slot = self.registry.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(registry);
    }

    #[must_use]
    pub fn registry(&self) -> Option<Arc<FunctionRegistry>> {
        self.registry
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Build and run an action expression right away with this context.
    ///
    /// Returns `false` when no registry is attached or the expression does
    /// not build; the reason is logged.
    pub fn run_callback(&self, text: &str) -> bool {
        let Some(registry) = self.registry() else {
            tracing::warn!(expr = text, "run_callback without an attached registry");
            return false;
        };
        match prepare_call(&registry, self, text) {
            Ok(call) => {
                call.invoke(self);
                true
            }
            Err(err) => {
                tracing::debug!(expr = text, error = %err, "run_callback rejected expression");
                false
            }
        }
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("store", &self.store)
            .field("slots", &self.slots)
            .field("updates", &self.updates.is_some())
            .field("host", &self.host.is_some())
            .finish_non_exhaustive()
    }
}
