//! Debounced settings persistence
//!
//! Mutations hand an owned settings snapshot to [`SettingsManager::request_save`];
//! each request restarts a short debounce timer, and only when the debounce
//! settles is the save-required flag raised. A slower periodic flush ticker
//! picks the flag up and writes the latest snapshot, so a burst of mutations
//! collapses into a single write shortly after the burst ends, off the UI
//! thread. A save already in flight drops concurrent attempts; the flag stays
//! observable and the next flush tick retries naturally.

#![allow(dead_code)]

use chrono::Local;
use log::{error, info};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::events::{UiDispatcher, UiMessage};
use crate::settings::{Settings, SettingsStore};
use crate::timers::IntervalTimer;

/// Timing knobs, overridable in tests.
#[derive(Debug, Clone, Copy)]
pub struct PersistTiming {
    pub debounce: Duration,
    pub flush_startup_delay: Duration,
    pub flush_interval: Duration,
}

impl Default for PersistTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            flush_startup_delay: Duration::from_secs(5),
            flush_interval: Duration::from_millis(250),
        }
    }
}

pub struct SettingsManager {
    store: Arc<SettingsStore>,
    dispatcher: UiDispatcher,
    timing: PersistTiming,
    pending: Arc<Mutex<Option<Settings>>>,
    save_required: Arc<AtomicBool>,
    saving: Arc<AtomicBool>,
    debounce_timer: Option<IntervalTimer>,
    flush_timer: Option<IntervalTimer>,
}

impl SettingsManager {
    pub fn new(store: Arc<SettingsStore>, dispatcher: UiDispatcher) -> Self {
        Self::with_timing(store, dispatcher, PersistTiming::default())
    }

    pub fn with_timing(
        store: Arc<SettingsStore>,
        dispatcher: UiDispatcher,
        timing: PersistTiming,
    ) -> Self {
        Self {
            store,
            dispatcher,
            timing,
            pending: Arc::new(Mutex::new(None)),
            save_required: Arc::new(AtomicBool::new(false)),
            saving: Arc::new(AtomicBool::new(false)),
            debounce_timer: None,
            flush_timer: None,
        }
    }

    /// Start the flush ticker. Until this runs, requests only accumulate.
    pub fn start_auto_save(&mut self) {
        if self.flush_timer.is_some() {
            return;
        }
        info!("Settings auto-save started");

        let store = self.store.clone();
        let dispatcher = self.dispatcher.clone();
        let pending = self.pending.clone();
        let save_required = self.save_required.clone();
        let saving = self.saving.clone();

        self.flush_timer = Some(IntervalTimer::spawn(
            "settings-flush",
            self.timing.flush_startup_delay,
            Some(self.timing.flush_interval),
            move || {
                if saving.load(Ordering::SeqCst) || !save_required.load(Ordering::SeqCst) {
                    return;
                }
                perform_save(&store, &dispatcher, &pending, &save_required, &saving);
            },
        ));
    }

    /// Record the latest snapshot and restart the debounce window.
    pub fn request_save(&mut self, snapshot: Settings) {
        *self.pending.lock() = Some(snapshot);

        let save_required = self.save_required.clone();
        // Replacing the previous debounce timer cancels it: only the last
        // request in a burst raises the flag.
        self.debounce_timer = Some(IntervalTimer::once(
            "settings-debounce",
            self.timing.debounce,
            move || {
                save_required.store(true, Ordering::SeqCst);
            },
        ));
    }

    /// Immediate synchronous write, bypassing the debounce (explicit
    /// save-now requests).
    pub fn save_now(&self, snapshot: &Settings) {
        match self.store.save(snapshot) {
            Ok(()) => {
                self.dispatcher.post(UiMessage::SaveStatusChanged(format!(
                    "Settings Saved {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S")
                )));
            }
            Err(e) => error!("Error saving settings: {}", e),
        }
    }

    /// Stop both timers. Pending unsaved changes are dropped, matching the
    /// shutdown path of the auto-save pipeline.
    pub fn shutdown(&mut self) {
        self.debounce_timer = None;
        self.flush_timer = None;
    }
}

fn perform_save(
    store: &SettingsStore,
    dispatcher: &UiDispatcher,
    pending: &Mutex<Option<Settings>>,
    save_required: &AtomicBool,
    saving: &AtomicBool,
) {
    if saving.swap(true, Ordering::SeqCst) {
        return;
    }

    dispatcher.post(UiMessage::SaveStatusChanged("Saving".to_string()));

    let snapshot = pending.lock().clone();
    if let Some(snapshot) = snapshot {
        match store.save(&snapshot) {
            Ok(()) => {
                info!("Debounced settings save completed");
                dispatcher.post(UiMessage::SaveStatusChanged(format!(
                    "Settings Saved {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S")
                )));
            }
            // Leave no trace on the caller; the flag was already cleared and
            // a later mutation will schedule a retry.
            Err(e) => error!("Error saving settings: {}", e),
        }
    }

    save_required.store(false, Ordering::SeqCst);
    saving.store(false, Ordering::SeqCst);
}
