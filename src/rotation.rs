//! Automatic timer rotation
//!
//! A background ticker counts down the configured interval at 1 Hz. At zero it
//! picks the next timer from the rotation snapshot and posts the switch to the
//! UI thread; every tick also posts the remaining-seconds display so the UI
//! can show a live countdown. The rotator never touches the settings
//! aggregate: the controller mirrors the timer list and current index into
//! [`RotationShared`] whenever they change, and applies the switch when the
//! posted message is drained.

#![allow(dead_code)]

use log::{info, warn};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::events::{UiDispatcher, UiMessage};
use crate::timers::IntervalTimer;

const DEFAULT_INTERVAL_SECS: u32 = 30;

/// Thread-safe mirror of the rotation inputs.
#[derive(Debug, Default)]
pub struct RotationShared {
    pub timer_ids: Vec<Uuid>,
    pub current_index: Option<usize>,
}

/// Advance the rotation index. Absent and out-of-range indices both land on 0,
/// so rotation always resumes at the head after list edits.
pub fn next_rotation_index(current: Option<usize>, len: usize) -> usize {
    debug_assert!(len > 0);
    match current {
        Some(index) if index + 1 < len => index + 1,
        _ => 0,
    }
}

/// Stopped/Running interval rotator.
pub struct TimerRotator {
    dispatcher: UiDispatcher,
    shared: Arc<RwLock<RotationShared>>,
    interval_secs: u32,
    timer: Option<IntervalTimer>,
    running: bool,
}

impl TimerRotator {
    pub fn new(dispatcher: UiDispatcher, shared: Arc<RwLock<RotationShared>>) -> Self {
        Self {
            dispatcher,
            shared,
            interval_secs: DEFAULT_INTERVAL_SECS,
            timer: None,
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval_seconds(&self) -> u32 {
        self.interval_secs
    }

    /// Change the rotation period. If running, the countdown restarts with
    /// the new period.
    pub fn set_interval_seconds(&mut self, secs: u32) {
        self.interval_secs = secs.max(1);
        if self.running {
            self.stop();
            self.start();
        }
    }

    /// Start ticking. No-op while already running.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        info!("Starting timer rotation with interval {}s", self.interval_secs);

        let interval = self.interval_secs;
        let dispatcher = self.dispatcher.clone();
        let shared = self.shared.clone();
        let mut remaining = interval;

        self.timer = Some(IntervalTimer::spawn(
            "rotator",
            Duration::from_secs(1),
            Some(Duration::from_secs(1)),
            move || {
                remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    rotate(&dispatcher, &shared);
                    remaining = interval;
                }
                dispatcher.post(UiMessage::RotationTick(remaining.to_string()));
            },
        ));
        self.running = true;
        self.dispatcher
            .post(UiMessage::RotationTick(self.interval_secs.to_string()));
    }

    /// Stop ticking and clear the countdown display. No-op while stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        info!("Stopping timer rotation");
        self.timer = None;
        self.running = false;
        self.dispatcher.post(UiMessage::RotationTick(String::new()));
    }
}

fn rotate(dispatcher: &UiDispatcher, shared: &Arc<RwLock<RotationShared>>) {
    let snapshot = shared.read();
    if snapshot.timer_ids.is_empty() {
        warn!("Cannot rotate: timer list is empty");
        return;
    }

    let index = next_rotation_index(snapshot.current_index, snapshot.timer_ids.len());
    let timer_id = snapshot.timer_ids[index];
    info!("Rotating to timer {} (index {})", timer_id, index);
    dispatcher.post(UiMessage::RotateTo { timer_id, index });
}
