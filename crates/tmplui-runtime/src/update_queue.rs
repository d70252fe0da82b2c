#![forbid(unsafe_code)]

//! Work queue onto the UI thread.
//!
//! Background threads hand closures to the UI thread through an
//! [`UpdateSender`]; the UI loop drains them with
//! [`UpdateReceiver::run_pending`] or [`UpdateReceiver::run_until`]. The
//! first thread that drains the queue is recorded as the UI thread.
//!
//! # Deadlock Avoidance
//!
//! [`UpdateSender::run_sync`] blocks until its job has run. Called from the
//! UI thread, that wait could never finish, so it fails with
//! [`QueueError::WouldDeadlock`] instead. For the same reason a
//! [`UpdateSender::post`] from the UI thread into a full queue fails rather
//! than blocking.
//!
//! UI-thread detection only works once the UI thread is known. A thread that
//! will drain the queue but still calls into it during setup must call
//! [`UpdateReceiver::claim_current_thread`] first; otherwise a
//! [`UpdateSender::run_sync`] from it waits for a drain that never comes.
//!
//! # Example
//!
//! ```
//! use tmplui_runtime::update_queue::update_queue;
//!
//! let (tx, rx) = update_queue(8);
//! let worker = std::thread::spawn(move || tx.post(Box::new(|| println!("on UI"))));
//! worker.join().unwrap().unwrap();
//! assert_eq!(rx.run_pending(), 1);
//! ```

use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TryRecvError, TrySendError};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use tmplui_core::cx::Cx;
use web_time::Duration;

use crate::error::QueueError;

/// A unit of work for the UI thread.
pub type UpdateJob = Box<dyn FnOnce() + Send>;

/// How often [`UpdateReceiver::run_until`] rechecks cancellation while idle.
const IDLE_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct QueueShared {
    ui_thread: OnceLock<ThreadId>,
}

impl QueueShared {
    fn is_ui_thread(&self) -> bool {
        self.ui_thread.get() == Some(&thread::current().id())
    }

    fn claim_current(&self) {
        let current = thread::current().id();
        let owner = self.ui_thread.get_or_init(|| current);
        if *owner != current {
            tracing::warn!("update queue drained from a thread other than the UI thread");
        }
    }
}

/// Create a bounded UI update queue.
#[must_use]
pub fn update_queue(capacity: usize) -> (UpdateSender, UpdateReceiver) {
    let (tx, rx) = mpsc::sync_channel(capacity);
    let shared = Arc::new(QueueShared::default());
    (
        UpdateSender {
            tx,
            shared: Arc::clone(&shared),
        },
        UpdateReceiver { rx, shared },
    )
}

/// Producer side. Cheap to clone; usable from any thread.
#[derive(Clone)]
pub struct UpdateSender {
    tx: SyncSender<UpdateJob>,
    shared: Arc<QueueShared>,
}

impl UpdateSender {
    /// Enqueue `job` without waiting for it to run.
    ///
    /// Blocks while the queue is full, except on the UI thread, where a full
    /// queue is reported as [`QueueError::WouldDeadlock`].
    pub fn post(&self, job: UpdateJob) -> Result<(), QueueError> {
        if self.shared.is_ui_thread() {
            return self.tx.try_send(job).map_err(|err| match err {
                TrySendError::Full(_) => QueueError::WouldDeadlock,
                TrySendError::Disconnected(_) => QueueError::Closed,
            });
        }
        self.tx.send(job).map_err(|_| QueueError::Closed)
    }

    /// Enqueue `job` only if there is room right now.
    ///
    /// Never blocks. A full queue is [`QueueError::Full`] and drops `job`.
    pub fn try_post(&self, job: UpdateJob) -> Result<(), QueueError> {
        self.tx.try_send(job).map_err(|err| match err {
            TrySendError::Full(_) => QueueError::Full,
            TrySendError::Disconnected(_) => QueueError::Closed,
        })
    }

    /// Enqueue `job` and wait until the UI thread has run it.
    ///
    /// Refused on the UI thread. Before any thread has drained or claimed the
    /// queue, the caller is not recognized as the UI thread, so call
    /// [`UpdateReceiver::claim_current_thread`] on the UI thread first.
    pub fn run_sync(&self, job: impl FnOnce() + Send + 'static) -> Result<(), QueueError> {
        if self.shared.is_ui_thread() {
            return Err(QueueError::WouldDeadlock);
        }
        let (done_tx, done_rx) = mpsc::sync_channel::<()>(1);
        self.post(Box::new(move || {
            job();
            let _ = done_tx.send(());
        }))?;
        // A dropped job (receiver gone, or job panicked) closes the channel.
        done_rx.recv().map_err(|_| QueueError::Closed)
    }

    /// Whether the calling thread is the recorded UI thread.
    #[must_use]
    pub fn is_ui_thread(&self) -> bool {
        self.shared.is_ui_thread()
    }
}

impl std::fmt::Debug for UpdateSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateSender")
            .field("ui_thread", &self.shared.ui_thread.get())
            .finish()
    }
}

/// Consumer side, owned by the UI loop.
pub struct UpdateReceiver {
    rx: mpsc::Receiver<UpdateJob>,
    shared: Arc<QueueShared>,
}

impl UpdateReceiver {
    /// Record the calling thread as the UI thread without draining.
    pub fn claim_current_thread(&self) {
        self.shared.claim_current();
    }

    /// Run every job already queued. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.shared.claim_current();
        let mut ran = 0;
        loop {
            match self.rx.try_recv() {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        ran
    }

    /// Run jobs as they arrive until `cx` is cancelled or every sender is
    /// gone. Returns how many ran.
    pub fn run_until(&self, cx: &Cx) -> usize {
        self.shared.claim_current();
        let mut ran = 0;
        while !cx.is_cancelled() {
            match self.rx.recv_timeout(IDLE_POLL) {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        tracing::debug!(ran, cancelled = cx.is_cancelled(), "update loop exited");
        ran
    }
}

impl std::fmt::Debug for UpdateReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateReceiver")
            .field("ui_thread", &self.shared.ui_thread.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn post_then_drain() {
        let (tx, rx) = update_queue(4);
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            tx.post(Box::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }))
            .expect("post");
        }
        assert_eq!(rx.run_pending(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(rx.run_pending(), 0);
    }

    #[test]
    fn run_sync_from_ui_thread_refuses() {
        let (tx, rx) = update_queue(4);
        rx.claim_current_thread();
        assert!(tx.is_ui_thread());
        assert_eq!(tx.run_sync(|| {}), Err(QueueError::WouldDeadlock));
    }

    #[test]
    fn full_queue_on_ui_thread_does_not_block() {
        let (tx, rx) = update_queue(1);
        rx.claim_current_thread();
        tx.post(Box::new(|| {})).expect("first fits");
        assert_eq!(tx.post(Box::new(|| {})), Err(QueueError::WouldDeadlock));
    }

    #[test]
    fn try_post_never_blocks() {
        let (tx, rx) = update_queue(1);
        tx.try_post(Box::new(|| {})).expect("first fits");

        let dropped = Arc::new(AtomicUsize::new(0));
        let marker = DropCounter(Arc::clone(&dropped));
        let refused = tx.try_post(Box::new(move || drop(marker)));
        assert_eq!(refused, Err(QueueError::Full));
        assert_eq!(dropped.load(Ordering::SeqCst), 1);

        assert_eq!(rx.run_pending(), 1);
        drop(rx);
        assert_eq!(tx.try_post(Box::new(|| {})), Err(QueueError::Closed));
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn run_sync_waits_for_ui_thread() {
        let (tx, rx) = update_queue(4);
        let (cx, ctrl) = Cx::background();
        let hits = Arc::new(AtomicUsize::new(0));

        let worker_hits = Arc::clone(&hits);
        let worker = thread::spawn(move || {
            let inner = Arc::clone(&worker_hits);
            let result = tx.run_sync(move || {
                inner.fetch_add(1, Ordering::SeqCst);
            });
            // The job has already run when run_sync returns.
            (result, worker_hits.load(Ordering::SeqCst))
        });

        let ui = thread::spawn(move || rx.run_until(&cx));
        let (result, seen) = worker.join().expect("worker");
        ctrl.cancel();
        assert_eq!(ui.join().expect("ui"), 1);
        assert_eq!(result, Ok(()));
        assert_eq!(seen, 1);
    }

    #[test]
    fn closed_queue_reports_closed() {
        let (tx, rx) = update_queue(1);
        drop(rx);
        assert_eq!(tx.post(Box::new(|| {})), Err(QueueError::Closed));
        assert_eq!(tx.run_sync(|| {}), Err(QueueError::Closed));
    }

    #[test]
    fn run_until_exits_when_senders_drop() {
        let (tx, rx) = update_queue(1);
        let (cx, _ctrl) = Cx::background();
        tx.post(Box::new(|| {})).expect("post");
        drop(tx);
        assert_eq!(rx.run_until(&cx), 1);
    }
}
