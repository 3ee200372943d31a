//! Controller notifications and cross-thread message passing
//!
//! Two channels of communication live here. [`Observers`] is the
//! fire-and-forget notification hub UI controls subscribe to; it runs
//! strictly on the UI thread. [`UiDispatcher`] is the single handoff point
//! for background timer threads: they post a [`UiMessage`] and the controller
//! drains the queue on the UI thread, so every cross-thread mutation funnels
//! through one auditable drain.

#![allow(dead_code)]

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use uuid::Uuid;

use crate::bounds::WindowBounds;

/// Notifications raised to UI observers. Fire and forget, no return value.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    SettingsChanged,
    BoundsChanged,
    ModeChanged,
    VersionChanged,
    RotationStatusChanged(String),
    RotationTimerTick(String),
    TimerStatusChanged(String),
    SettingsStatusChanged(String),
    SettingsWindowRequested,
    TimerDisplayChanged { title: String, time: String },
    Tick,
}

/// Subscriber list for [`ControllerEvent`] notifications.
#[derive(Default)]
pub struct Observers {
    subscribers: Vec<Box<dyn Fn(&ControllerEvent)>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: Fn(&ControllerEvent) + 'static,
    {
        self.subscribers.push(Box::new(subscriber));
    }

    pub fn emit(&self, event: &ControllerEvent) {
        for subscriber in &self.subscribers {
            subscriber(event);
        }
    }
}

/// Messages posted to the UI thread from background timers and the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    /// Rotation countdown display update, every rotator tick.
    RotationTick(String),
    /// Rotation period elapsed; switch to this timer.
    RotateTo { timer_id: Uuid, index: usize },
    ShowNagOverlay(String),
    ChangeNagText(String),
    HideNagOverlay,
    /// 1 Hz global tick.
    GlobalTick,
    /// Save pipeline progress ("Saving", "Settings Saved ...").
    SaveStatusChanged(String),
    /// The OS moved or resized the main window.
    WindowBoundsChanged(WindowBounds),
    /// The main window received its first activation.
    WindowActivated,
    /// User gesture on the overlay window.
    ToggleInteractive,
    ExitRequested,
}

type Waker = dyn Fn() + Send + Sync;

/// Clonable sender half of the UI queue. Posting also invokes a waker so a
/// blocking OS message loop gets pumped; without a waker posts just enqueue.
#[derive(Clone)]
pub struct UiDispatcher {
    tx: Sender<UiMessage>,
    waker: Arc<parking_lot::RwLock<Option<Arc<Waker>>>>,
}

impl UiDispatcher {
    /// Create the dispatcher and the receiver the controller will drain.
    pub fn new() -> (Self, Receiver<UiMessage>) {
        let (tx, rx) = channel();
        (
            Self {
                tx,
                waker: Arc::new(parking_lot::RwLock::new(None)),
            },
            rx,
        )
    }

    /// Install the waker that pumps the UI message loop (set once the window
    /// exists).
    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.waker.write() = Some(Arc::new(waker));
    }

    pub fn post(&self, message: UiMessage) {
        // Send fails only when the controller is gone; nothing left to notify.
        let _ = self.tx.send(message);
        let waker = self.waker.read().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}
