//! Free-tier promotional overlay timer
//!
//! While the app sits in background mode on the free tier, a sleep timer
//! periodically shows the upgrade overlay. Each showing arms a one-shot
//! visibility timer that hides it again and a text timer that cycles the
//! promotional messages while it is visible. All effects are posted to the UI
//! thread; the controller suppresses showing while interactive and for paid
//! tiers.

use log::info;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use crate::events::{UiDispatcher, UiMessage};
use crate::timers::IntervalTimer;

/// Timing knobs, overridable in tests.
#[derive(Debug, Clone, Copy)]
pub struct NagIntervals {
    pub first_fire: Duration,
    pub repeat: Duration,
    pub visible: Duration,
    pub text_rotate: Duration,
}

impl Default for NagIntervals {
    fn default() -> Self {
        Self {
            first_fire: Duration::from_secs(10),
            repeat: Duration::from_secs(5 * 60),
            visible: Duration::from_secs(30),
            text_rotate: Duration::from_secs(10),
        }
    }
}

fn overlay_messages() -> Vec<String> {
    vec![
        "LifeTimer Free Version".to_string(),
        "Use Help Page To Upgrade".to_string(),
    ]
}

/// Timers for one show/hide cycle of the overlay. Replaced wholesale each
/// time the sleep timer fires; dropping the old cycle cancels its timers.
#[derive(Default)]
struct OverlayCycle {
    // Held for cancellation only.
    _visibility: Option<IntervalTimer>,
    text: Option<IntervalTimer>,
}

pub struct NagTimer {
    dispatcher: UiDispatcher,
    intervals: NagIntervals,
    sleep_timer: Option<IntervalTimer>,
    cycle: Arc<Mutex<OverlayCycle>>,
    running: bool,
}

impl NagTimer {
    pub fn new(dispatcher: UiDispatcher) -> Self {
        Self::with_intervals(dispatcher, NagIntervals::default())
    }

    pub fn with_intervals(dispatcher: UiDispatcher, intervals: NagIntervals) -> Self {
        Self {
            dispatcher,
            intervals,
            sleep_timer: None,
            cycle: Arc::new(Mutex::new(OverlayCycle::default())),
            running: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop if running, then start a fresh sleep cycle. Safe to call
    /// repeatedly without leaking timers.
    pub fn restart(&mut self) {
        info!("Restarting nag timer");
        if self.running {
            self.stop();
        }

        let dispatcher = self.dispatcher.clone();
        let cycle = self.cycle.clone();
        let intervals = self.intervals;

        self.sleep_timer = Some(IntervalTimer::spawn(
            "nag-sleep",
            intervals.first_fire,
            Some(intervals.repeat),
            move || on_sleep_elapsed(&dispatcher, &cycle, intervals),
        ));
        self.running = true;
    }

    /// Cancel the sleep timer and any in-flight show/hide cycle. No-op while
    /// stopped.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        info!("Stopping nag timer");
        self.sleep_timer = None;
        *self.cycle.lock() = OverlayCycle::default();
        self.running = false;
    }
}

fn on_sleep_elapsed(
    dispatcher: &UiDispatcher,
    cycle: &Arc<Mutex<OverlayCycle>>,
    intervals: NagIntervals,
) {
    let messages = overlay_messages();
    dispatcher.post(UiMessage::ShowNagOverlay(messages[0].clone()));

    let hide_dispatcher = dispatcher.clone();
    let hide_cycle = cycle.clone();
    let visibility = IntervalTimer::once("nag-visibility", intervals.visible, move || {
        hide_dispatcher.post(UiMessage::HideNagOverlay);
        // The overlay is gone; stop cycling its text.
        hide_cycle.lock().text = None;
    });

    let text_dispatcher = dispatcher.clone();
    // Index resets on every show so the sequence always starts at the top.
    let mut index = 0usize;
    let text = IntervalTimer::spawn(
        "nag-text",
        intervals.text_rotate,
        Some(intervals.text_rotate),
        move || {
            index = (index + 1) % messages.len();
            text_dispatcher.post(UiMessage::ChangeNagText(messages[index].clone()));
        },
    );

    // Replacing the previous cycle cancels any timers still pending from it.
    *cycle.lock() = OverlayCycle {
        _visibility: Some(visibility),
        text: Some(text),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::UiDispatcher;
    use std::thread;

    fn fast_intervals() -> NagIntervals {
        NagIntervals {
            first_fire: Duration::from_millis(20),
            repeat: Duration::from_millis(500),
            visible: Duration::from_millis(80),
            text_rotate: Duration::from_millis(25),
        }
    }

    #[test]
    fn show_text_hide_sequence() {
        let (dispatcher, rx) = UiDispatcher::new();
        let mut nag = NagTimer::with_intervals(dispatcher, fast_intervals());
        nag.restart();

        thread::sleep(Duration::from_millis(250));
        nag.stop();

        let messages: Vec<UiMessage> = rx.try_iter().collect();
        let show_at = messages
            .iter()
            .position(|m| matches!(m, UiMessage::ShowNagOverlay(_)))
            .expect("overlay shown");
        let hide_at = messages
            .iter()
            .position(|m| matches!(m, UiMessage::HideNagOverlay))
            .expect("overlay hidden");
        assert!(show_at < hide_at);

        // At least one text rotation lands between show and hide, starting at
        // the second message.
        let first_text = messages
            .iter()
            .find_map(|m| match m {
                UiMessage::ChangeNagText(s) => Some(s.clone()),
                _ => None,
            })
            .expect("text rotated");
        assert_eq!(first_text, "Use Help Page To Upgrade");
    }

    #[test]
    fn restart_is_idempotent_and_stop_twice_is_safe() {
        let (dispatcher, _rx) = UiDispatcher::new();
        let mut nag = NagTimer::with_intervals(dispatcher, fast_intervals());

        nag.restart();
        assert!(nag.is_running());
        nag.restart();
        nag.restart();
        assert!(nag.is_running());

        nag.stop();
        assert!(!nag.is_running());
        nag.stop();
        assert!(!nag.is_running());
    }

    #[test]
    fn stop_before_first_fire_suppresses_overlay() {
        let (dispatcher, rx) = UiDispatcher::new();
        let mut nag = NagTimer::with_intervals(
            dispatcher,
            NagIntervals {
                first_fire: Duration::from_millis(150),
                ..fast_intervals()
            },
        );
        nag.restart();
        nag.stop();

        thread::sleep(Duration::from_millis(250));
        assert!(rx.try_iter().next().is_none());
    }
}
