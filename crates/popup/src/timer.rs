//! One-shot timers for auto-dismissing popups.
//!
//! A [`Scheduler`] runs a task once after a delay and hands back a
//! [`TimerHandle`]. Dropping or cancelling the handle before the delay
//! elapses prevents the task from running.
//!
//! - [`ThreadScheduler`] waits on a dedicated thread (the default)
//! - `TokioScheduler` sleeps on a tokio runtime (`tokio` feature)
//! - [`ManualScheduler`] runs on a virtual clock advanced by the caller

use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

/// The work a timer runs when it expires.
pub type TimerTask = Box<dyn FnOnce() + Send>;

/// Runs tasks once after a delay.
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to run once after `delay`.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

// -----------------------------------------------------------------------------
// TimerHandle
// -----------------------------------------------------------------------------

/// Handle to a scheduled timer. Dropping it cancels the timer.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    /// Creates a handle that runs `cancel` when the timer is cancelled.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates a handle for a timer that cannot be cancelled.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Cancels the timer. Has no effect if it already fired.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// ThreadScheduler
// -----------------------------------------------------------------------------

/// Runs each timer on its own thread.
///
/// The thread waits on a channel with a timeout; cancelling the handle
/// disconnects the channel and the thread exits without running the task.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let (tx, rx) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("popup-timer".to_string())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(delay) {
                    task();
                }
            });

        match spawned {
            Ok(_) => TimerHandle::new(move || drop(tx)),
            Err(err) => {
                warn!(error = %err, "failed to spawn popup timer thread");
                TimerHandle::detached()
            }
        }
    }
}

// -----------------------------------------------------------------------------
// TokioScheduler
// -----------------------------------------------------------------------------

/// Runs each timer as a task on a tokio runtime.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio")]
impl TokioScheduler {
    /// Creates a scheduler spawning onto the given runtime.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a scheduler spawning onto the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(tokio::runtime::Handle::current())
    }
}

#[cfg(feature = "tokio")]
impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerHandle::new(move || join.abort())
    }
}

// -----------------------------------------------------------------------------
// ManualScheduler
// -----------------------------------------------------------------------------

struct PendingTimer {
    id: u64,
    deadline: Duration,
    task: TimerTask,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    pending: Vec<PendingTimer>,
}

/// A scheduler driven by a virtual clock.
///
/// Nothing fires until [`ManualScheduler::advance`] moves the clock past a
/// timer's deadline. Tasks run on the thread calling `advance`, in deadline
/// order.
///
/// # Example
///
/// ```rust
/// use popup::{ManualScheduler, Scheduler};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::time::Duration;
///
/// let clock = ManualScheduler::new();
/// let fired = Arc::new(AtomicBool::new(false));
/// let flag = fired.clone();
/// let _timer = clock.schedule(
///     Duration::from_secs(5),
///     Box::new(move || flag.store(true, Ordering::SeqCst)),
/// );
///
/// clock.advance(Duration::from_secs(4));
/// assert!(!fired.load(Ordering::SeqCst));
/// clock.advance(Duration::from_secs(1));
/// assert!(fired.load(Ordering::SeqCst));
/// ```
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualScheduler {
    /// Creates a scheduler at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Returns how many timers are waiting to fire.
    pub fn pending(&self) -> usize {
        self.clock.lock().pending.len()
    }

    /// Moves the clock forward, running every timer that comes due.
    ///
    /// Returns the number of timers that fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.lock().now + by;
        let mut fired = 0;

        loop {
            // The lock is released before the task runs; tasks may cancel
            // or schedule timers on this clock.
            let due = {
                let mut clock = self.clock.lock();
                let next = clock
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.deadline <= target)
                    .min_by_key(|(_, timer)| (timer.deadline, timer.id))
                    .map(|(pos, _)| pos);
                next.map(|pos| {
                    let timer = clock.pending.remove(pos);
                    clock.now = timer.deadline;
                    timer.task
                })
            };

            match due {
                Some(task) => {
                    task();
                    fired += 1;
                }
                None => break,
            }
        }

        self.clock.lock().now = target;
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let id = {
            let mut clock = self.clock.lock();
            let id = clock.next_id;
            clock.next_id += 1;
            let deadline = clock.now + delay;
            clock.pending.push(PendingTimer { id, deadline, task });
            id
        };

        let clock: Weak<Mutex<ManualClock>> = Arc::downgrade(&self.clock);
        TimerHandle::new(move || {
            if let Some(clock) = clock.upgrade() {
                clock.lock().pending.retain(|timer| timer.id != id);
            }
        })
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = self.clock.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("pending", &clock.pending.len())
            .finish()
    }
}
