//! Background interval timer primitive
//!
//! Each timer owns a worker thread that sleeps on a condvar and invokes its
//! callback off the UI thread. Stopping flips a flag and notifies the condvar;
//! the thread is never joined, so `stop()` returns immediately and a callback
//! that was already past its wait re-checks the flag before acting.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct TimerShared {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl TimerShared {
    /// Wait for `period` or until stopped, absorbing spurious wakeups.
    /// Returns true if the timer should keep running.
    fn wait(&self, period: Duration) -> bool {
        let deadline = Instant::now() + period;
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.condvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        !*stopped
    }
}

/// A cancellable background timer: fires once after `initial`, then on every
/// `period` if one is given.
pub struct IntervalTimer {
    shared: Arc<TimerShared>,
}

impl IntervalTimer {
    pub fn spawn<F>(name: &str, initial: Duration, period: Option<Duration>, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(TimerShared {
            stopped: Mutex::new(false),
            condvar: Condvar::new(),
        });

        let thread_shared = shared.clone();
        let builder = thread::Builder::new().name(format!("lifetimer-{}", name));
        let spawned = builder.spawn(move || {
            if !thread_shared.wait(initial) {
                return;
            }
            tick();

            let Some(period) = period else { return };
            loop {
                if !thread_shared.wait(period) {
                    return;
                }
                tick();
            }
        });
        if let Err(e) = spawned {
            // The timer silently never fires; callers keep working.
            log::error!("Failed to spawn timer thread: {}", e);
        }

        Self { shared }
    }

    /// One-shot helper: fire once after `delay`.
    pub fn once<F>(name: &str, delay: Duration, tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Self::spawn(name, delay, None, tick)
    }

    /// Cancel the timer. Does not wait for an in-flight callback.
    pub fn stop(&self) {
        let mut stopped = self.shared.stopped.lock();
        *stopped = true;
        self.shared.condvar.notify_all();
    }
}

impl Drop for IntervalTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
