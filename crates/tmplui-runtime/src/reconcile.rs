#![forbid(unsafe_code)]

//! Periodic reconciliation trigger.
//!
//! The [`Reconciler`] owns a named background thread that wakes every
//! [`RuntimeConfig::reconcile_interval`]. When the store has dirty keys it
//! posts one reconciliation job to the UI queue; the pass itself always runs
//! on the UI thread.
//!
//! # Coalescing
//!
//! At most one job is queued at a time. The pending flag is cleared when the
//! job starts, so keys dirtied during a pass schedule the next one. A job the
//! queue discards unrun clears it too.
//!
//! The thread never blocks on the queue. When the queue is full the pass is
//! retried on the next tick.
//!
//! # Shutdown
//!
//! [`Reconciler::stop`] cancels the thread's [`Cx`] and joins it. Calling it
//! again, or never (drop does the same), is fine.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tmplui_core::cx::{Cx, CxController};

use crate::config::RuntimeConfig;
use crate::context::Context;
use crate::error::QueueError;
use crate::update_queue::UpdateSender;

/// Handle to the running reconciliation thread.
pub struct Reconciler {
    controller: CxController,
    handle: Option<JoinHandle<()>>,
    pending: Arc<AtomicBool>,
}

impl Reconciler {
    /// Spawn the trigger thread.
    pub fn spawn(
        ctx: Arc<Context>,
        updates: UpdateSender,
        config: &RuntimeConfig,
    ) -> io::Result<Self> {
        let (cx, controller) = Cx::background();
        let pending = Arc::new(AtomicBool::new(false));
        let interval = config.reconcile_interval;

        let loop_pending = Arc::clone(&pending);
        let handle = thread::Builder::new()
            .name("tmplui-reconcile".into())
            .spawn(move || reconcile_loop(&cx, &ctx, &updates, &loop_pending, interval))?;

        tracing::info!(?interval, "reconciler started");
        Ok(Self {
            controller,
            handle: Some(handle),
            pending,
        })
    }

    /// Whether a reconciliation job is queued but has not started.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel and join the thread. Idempotent.
    pub fn stop(&mut self) {
        self.controller.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("reconciler thread panicked");
            }
            tracing::info!("reconciler stopped");
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("running", &self.is_running())
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Clears the pending flag when the posted job starts, or when the queue
/// drops the job without running it.
struct PendingGuard(Arc<AtomicBool>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn reconcile_loop(
    cx: &Cx,
    ctx: &Arc<Context>,
    updates: &UpdateSender,
    pending: &Arc<AtomicBool>,
    interval: web_time::Duration,
) {
    while cx.sleep(interval) {
        if !ctx.has_dirty_keys() || pending.swap(true, Ordering::AcqRel) {
            continue;
        }
        let job_ctx = Arc::clone(ctx);
        let guard = PendingGuard(Arc::clone(pending));
        // Never block here: a full queue must not keep `stop` from joining.
        let posted = updates.try_post(Box::new(move || {
            drop(guard);
            job_ctx.reconcile();
        }));
        match posted {
            Ok(()) => {}
            Err(QueueError::Closed) => {
                tracing::debug!("update queue closed; reconciler exiting");
                return;
            }
            Err(QueueError::Full) => {
                tracing::debug!("update queue full; retrying reconcile pass next tick");
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to post reconcile pass");
            }
        }
    }
    tracing::debug!(cx_id = cx.id(), "reconcile loop cancelled");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{BoundView, StateValue};
    use crate::update_queue::update_queue;
    use std::sync::Mutex;
    use web_time::{Duration, Instant};

    fn fast() -> RuntimeConfig {
        RuntimeConfig::default().with_reconcile_interval(Duration::from_millis(5))
    }

    #[test]
    fn dirty_keys_reach_views_via_queue() {
        let (tx, rx) = update_queue(8);
        let ctx = Arc::new(Context::new().with_update_queue(tx.clone()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reader = Arc::clone(&ctx);
        ctx.register_bound_view(
            "k",
            BoundView::new(
                move || Ok(reader.get_state("k").map(|v| v.to_string()).unwrap_or_default()),
                move |text| sink.lock().expect("lock").push(text.to_string()),
            ),
        );

        let mut reconciler = Reconciler::spawn(Arc::clone(&ctx), tx, &fast()).expect("spawn");
        ctx.set_direct("k", "v1");
        ctx.set_direct("k", "v2");

        let deadline = Instant::now() + Duration::from_secs(5);
        while seen.lock().expect("lock").is_empty() && Instant::now() < deadline {
            rx.run_pending();
            thread::sleep(Duration::from_millis(2));
        }
        reconciler.stop();

        assert_eq!(*seen.lock().expect("lock"), vec!["v2"]);
        assert!(!ctx.has_dirty_keys());
        assert_eq!(ctx.get_state("k"), Some(StateValue::from("v2")));
    }

    #[test]
    fn posts_are_coalesced_while_pending() {
        let (tx, rx) = update_queue(8);
        let ctx = Arc::new(Context::new());
        let mut reconciler = Reconciler::spawn(Arc::clone(&ctx), tx, &fast()).expect("spawn");
        ctx.set_direct("k", 1_i64);

        // Nobody drains the queue for a while: many ticks, one job.
        thread::sleep(Duration::from_millis(60));
        assert!(reconciler.is_pending());
        assert_eq!(rx.run_pending(), 1);
        assert!(!ctx.has_dirty_keys());
        reconciler.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let (tx, _rx) = update_queue(1);
        let mut reconciler =
            Reconciler::spawn(Arc::new(Context::new()), tx, &fast()).expect("spawn");
        assert!(reconciler.is_running());
        reconciler.stop();
        reconciler.stop();
        assert!(!reconciler.is_running());
        drop(reconciler);
    }

    #[test]
    fn stop_returns_while_queue_is_full() {
        let (tx, rx) = update_queue(1);
        tx.post(Box::new(|| {})).expect("fill queue");
        let ctx = Arc::new(Context::new());
        ctx.set_direct("k", 1_i64);
        let mut reconciler =
            Reconciler::spawn(Arc::clone(&ctx), tx, &fast()).expect("spawn");
        thread::sleep(Duration::from_millis(40));

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let stopper = thread::spawn(move || {
            reconciler.stop();
            let _ = done_tx.send(());
        });
        assert!(
            done_rx.recv_timeout(Duration::from_secs(3)).is_ok(),
            "stop blocked behind a full queue"
        );
        stopper.join().expect("stopper");

        // The filler job is still the only one queued; dirty keys remain.
        assert_eq!(rx.run_pending(), 1);
        assert!(ctx.has_dirty_keys());
    }

    #[test]
    fn exits_when_queue_closes_after_a_post() {
        let (tx, rx) = update_queue(4);
        let ctx = Arc::new(Context::new());
        ctx.set_direct("k", 1_i64);
        let reconciler = Reconciler::spawn(Arc::clone(&ctx), tx, &fast()).expect("spawn");

        let deadline = Instant::now() + Duration::from_secs(5);
        while !reconciler.is_pending() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(reconciler.is_pending());

        // The queued pass is discarded unrun along with the receiver.
        drop(rx);
        let deadline = Instant::now() + Duration::from_secs(5);
        while reconciler.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!reconciler.is_pending());
        assert!(!reconciler.is_running());
    }

    #[test]
    fn exits_when_queue_closes() {
        let (tx, rx) = update_queue(1);
        let ctx = Arc::new(Context::new());
        let reconciler = Reconciler::spawn(Arc::clone(&ctx), tx, &fast()).expect("spawn");
        drop(rx);
        ctx.set_direct("k", true);

        let deadline = Instant::now() + Duration::from_secs(5);
        while reconciler.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert!(!reconciler.is_running());
    }
}
