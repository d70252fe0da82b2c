#![forbid(unsafe_code)]

//! Cooperative cancellation context (`Cx`) for background workers.
//!
//! A `Cx` is handed to every periodic worker (the reconciliation loop,
//! application tickers such as a clock). The worker polls
//! [`Cx::is_cancelled`] or sleeps through [`Cx::sleep`], which wakes early on
//! cancellation. The owner holds the companion [`CxController`].
//!
//! Cancellation is sticky and [`CxController::cancel`] is idempotent.
//! Dropping the controller does **not** cancel.
//!
//! # Example
//!
//! ```
//! use tmplui_core::cx::Cx;
//! use web_time::Duration;
//!
//! let (cx, ctrl) = Cx::background();
//! assert!(!cx.is_cancelled());
//! ctrl.cancel();
//! ctrl.cancel();
//! assert!(cx.is_cancelled());
//! assert!(!cx.sleep(Duration::from_secs(5)));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use web_time::Duration;

/// Upper bound on how late a sleeper notices a cancel.
const SLEEP_CHUNK: Duration = Duration::from_millis(5);

static NEXT_CX_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct Shared {
    id: u64,
    cancelled: AtomicBool,
}

/// Worker-side handle. Cheaply cloneable.
#[derive(Clone, Debug)]
pub struct Cx {
    shared: Arc<Shared>,
}

impl Cx {
    /// A fresh, live context and its controller.
    #[must_use]
    pub fn background() -> (Self, CxController) {
        let shared = Arc::new(Shared {
            id: NEXT_CX_ID.fetch_add(1, Ordering::Relaxed),
            cancelled: AtomicBool::new(false),
        });
        let cx = Self {
            shared: Arc::clone(&shared),
        };
        (cx, CxController { shared })
    }

    /// Identifier carried in log events.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Sleep for `duration` in short steps.
    ///
    /// Returns `true` if the full duration elapsed, `false` if cancelled
    /// before or during the sleep.
    pub fn sleep(&self, duration: Duration) -> bool {
        let mut remaining = duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            if remaining.is_zero() {
                return true;
            }
            let step = remaining.min(SLEEP_CHUNK);
            std::thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
    }
}

/// Owner-side handle for a [`Cx`].
#[derive(Debug)]
pub struct CxController {
    shared: Arc<Shared>,
}

impl CxController {
    /// Cancel the context. Later calls do nothing.
    pub fn cancel(&self) {
        if !self.shared.cancelled.swap(true, Ordering::AcqRel) {
            tracing::debug!(cx_id = self.shared.id, "cx cancelled");
        }
    }

    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }
}
