#![forbid(unsafe_code)]

//! Key/value state with dirty tracking and lazy propagation.
//!
//! Writers mark keys dirty; nothing is pushed to views at write time. A
//! [`StateStore::reconcile`] pass, run on the UI thread, drains the dirty set
//! and delivers the latest value of each key to its bound views and
//! subscribers.
//!
//! # Invariants
//!
//! 1. The map, the dirty set, the bound views and the subscribers share one
//!    lock; it is never held while user code runs.
//! 2. A key written several times between passes is delivered once, with the
//!    value current at drain time.
//! 3. A key dirtied while a pass is running waits for the next pass.
//! 4. A failing or panicking view or subscriber affects only itself.
//!
//! # Failure Modes
//!
//! | Failure                      | Effect                                   |
//! |------------------------------|------------------------------------------|
//! | `refresh` returns `Err`      | `apply` skipped for that view, `warn`    |
//! | `refresh`/`apply` panics     | panic caught, `warn`, pass continues     |
//! | subscriber panics            | panic caught, `warn`, pass continues     |
//! | lock poisoned                | recovered; the data is still consistent  |

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ahash::{AHashMap, AHashSet};

use super::value::StateValue;
use crate::error::TemplateError;

type RefreshFn = dyn Fn() -> Result<String, TemplateError> + Send + Sync;
type ApplyFn = dyn Fn(&str) + Send + Sync;

/// Change listener receiving the raw stored value.
pub type Subscriber = Arc<dyn Fn(&StateValue) + Send + Sync>;

/// A view that knows how to recompute its text and accept the result.
#[derive(Clone)]
pub struct BoundView {
    refresh: Arc<RefreshFn>,
    apply: Arc<ApplyFn>,
}

impl BoundView {
    pub fn new(
        refresh: impl Fn() -> Result<String, TemplateError> + Send + Sync + 'static,
        apply: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        Self {
            refresh: Arc::new(refresh),
            apply: Arc::new(apply),
        }
    }

    /// Run `refresh` then `apply`.
    pub fn update(&self) -> Result<(), TemplateError> {
        let text = (self.refresh)()?;
        (self.apply)(&text);
        Ok(())
    }
}

impl std::fmt::Debug for BoundView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundView").finish_non_exhaustive()
    }
}

/// Outcome counters of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Dirty keys drained by the pass.
    pub keys: usize,
    pub views_updated: usize,
    pub view_failures: usize,
    pub subscribers_notified: usize,
    pub subscriber_failures: usize,
}

impl ReconcileReport {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.keys == 0
    }

    #[must_use]
    pub const fn failures(&self) -> usize {
        self.view_failures + self.subscriber_failures
    }
}

#[derive(Default)]
struct StoreInner {
    values: AHashMap<String, StateValue>,
    dirty: AHashSet<String>,
    views: AHashMap<String, Vec<BoundView>>,
    subscribers: AHashMap<String, Vec<Subscriber>>,
}

/// Work captured for one key under the lock.
struct KeySnapshot {
    key: String,
    value: Option<StateValue>,
    views: Vec<BoundView>,
    subscribers: Vec<Subscriber>,
}

/// Thread-safe state map.
#[derive(Default)]
pub struct StateStore {
    inner: RwLock<StoreInner>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `value` and mark `key` dirty.
    pub fn set(&self, key: impl Into<String>, value: impl Into<StateValue>) {
        let key = key.into();
        let mut inner = self.write();
        inner.values.insert(key.clone(), value.into());
        inner.dirty.insert(key);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<StateValue> {
        self.read().values.get(key).cloned()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.read().values.contains_key(key)
    }

    #[must_use]
    pub fn has_dirty_keys(&self) -> bool {
        !self.read().dirty.is_empty()
    }

    /// Dirty keys, sorted.
    #[must_use]
    pub fn dirty_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().dirty.iter().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Attach a view to `key`.
    ///
    /// Views are never removed; rebinding the same widget repeatedly grows
    /// the list for the life of the store.
    pub fn register_bound_view(&self, key: impl Into<String>, view: BoundView) {
        self.write().views.entry(key.into()).or_default().push(view);
    }

    /// Attach a change listener to `key`. Never removed.
    pub fn subscribe(&self, key: impl Into<String>, subscriber: Subscriber) {
        self.write()
            .subscribers
            .entry(key.into())
            .or_default()
            .push(subscriber);
    }

    #[must_use]
    pub fn bound_view_count(&self, key: &str) -> usize {
        self.read().views.get(key).map_or(0, Vec::len)
    }

    /// Drain the dirty set and push current values to views and subscribers.
    ///
    /// Must run on the UI thread. Keys are processed in sorted order.
    pub fn reconcile(&self) -> ReconcileReport {
        let batch = self.take_dirty_snapshot();
        let mut report = ReconcileReport {
            keys: batch.len(),
            ..ReconcileReport::default()
        };
        if batch.is_empty() {
            return report;
        }
        tracing::trace!(keys = batch.len(), "reconcile pass start");

        for snapshot in &batch {
            for view in &snapshot.views {
                match catch_unwind(AssertUnwindSafe(|| view.update())) {
                    Ok(Ok(())) => report.views_updated += 1,
                    Ok(Err(err)) => {
                        report.view_failures += 1;
                        tracing::warn!(key = %snapshot.key, error = %err, "bound view refresh failed");
                    }
                    Err(payload) => {
                        report.view_failures += 1;
                        tracing::warn!(
                            key = %snapshot.key,
                            panic = panic_message(payload.as_ref()),
                            "bound view panicked during reconcile"
                        );
                    }
                }
            }

            let Some(value) = &snapshot.value else {
                continue;
            };
            for subscriber in &snapshot.subscribers {
                match catch_unwind(AssertUnwindSafe(|| subscriber(value))) {
                    Ok(()) => report.subscribers_notified += 1,
                    Err(payload) => {
                        report.subscriber_failures += 1;
                        tracing::warn!(
                            key = %snapshot.key,
                            panic = panic_message(payload.as_ref()),
                            "state subscriber panicked during reconcile"
                        );
                    }
                }
            }
        }

        tracing::trace!(
            keys = report.keys,
            views = report.views_updated,
            failures = report.failures(),
            "reconcile pass done"
        );
        report
    }

    fn take_dirty_snapshot(&self) -> Vec<KeySnapshot> {
        let mut inner = self.write();
        if inner.dirty.is_empty() {
            return Vec::new();
        }
        let mut keys: Vec<String> = std::mem::take(&mut inner.dirty).into_iter().collect();
        keys.sort_unstable();
        keys.into_iter()
            .map(|key| KeySnapshot {
                value: inner.values.get(&key).cloned(),
                views: inner.views.get(&key).cloned().unwrap_or_default(),
                subscribers: inner.subscribers.get(&key).cloned().unwrap_or_default(),
                key,
            })
            .collect()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.read();
        f.debug_struct("StateStore")
            .field("values", &inner.values.len())
            .field("dirty", &inner.dirty.len())
            .field("views", &inner.views.len())
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
