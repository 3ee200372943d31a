//! Application controller: the interaction-mode state machine
//!
//! Owns the settings aggregate and every mode decision. UI surfaces and the
//! overlay window call `request_*` methods on the UI thread; background
//! timers post [`UiMessage`]s that are drained here, also on the UI thread.
//! The controller drives the window through the [`MainWindow`] capability
//! interface and never touches OS windowing directly.

#![allow(dead_code)]

use chrono::Local;
use log::{error, info, warn};
use parking_lot::RwLock;
use std::rc::Rc;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::bounds::{FrameAdjustment, WindowBounds};
use crate::countdown;
use crate::error::{LifeTimerError, LifeTimerResult};
use crate::events::{ControllerEvent, Observers, UiDispatcher, UiMessage};
use crate::licensing::{LicenseOracle, PurchaseStatus};
use crate::nag::NagTimer;
use crate::persist::SettingsManager;
use crate::pomodoro::PomodoroTimer;
use crate::rotation::{RotationShared, TimerRotator};
use crate::settings::{
    AppearanceSettings, DisplayMode, PomodoroSettings, Settings, SettingsStore, TimerDefinition,
    INITIAL_WINDOW_HEIGHT, INITIAL_WINDOW_WIDTH,
};
use crate::timers::IntervalTimer;
use crate::window::MainWindow;

/// Maximum timer-list sizes per tier; list-editing UI gates adds on these.
pub const MAX_TIMER_COUNT_FREE: usize = 3;
pub const MAX_TIMER_COUNT_PRO: usize = 15;

/// How the overlay window currently behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatingMode {
    /// Framed, focusable, draggable, editable.
    Interactive,
    /// Borderless, non-activating, bottom of the z-order.
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitPhase {
    Uninitialized,
    PreMain,
    PostMain,
}

pub struct ApplicationController {
    settings: Settings,
    mode: OperatingMode,
    phase: InitPhase,
    window: Option<Rc<dyn MainWindow>>,
    license: Arc<dyn LicenseOracle>,
    persist: SettingsManager,
    rotator: TimerRotator,
    nag: NagTimer,
    global_timer: Option<IntervalTimer>,
    pomodoro: PomodoroTimer,
    observers: Observers,
    dispatcher: UiDispatcher,
    rx: Receiver<UiMessage>,
    rotation_shared: Arc<RwLock<RotationShared>>,

    /// Window bounds currently carry the interactive frame adjustment.
    resized_for_interactive: bool,
    /// Cached once per window-handle lifetime.
    frame_adjustment: Option<FrameAdjustment>,
    rotation_disabled: bool,
    nag_visible: bool,
    exit_requested: bool,

    last_settings_status: String,
    last_rotation_status: String,
    last_timer_status: String,
}

impl ApplicationController {
    pub fn new(
        settings: Settings,
        store: Arc<SettingsStore>,
        license: Arc<dyn LicenseOracle>,
    ) -> Self {
        let (dispatcher, rx) = UiDispatcher::new();
        let rotation_shared = Arc::new(RwLock::new(RotationShared::default()));
        let rotator = TimerRotator::new(dispatcher.clone(), rotation_shared.clone());
        let nag = NagTimer::new(dispatcher.clone());
        let persist = SettingsManager::new(store, dispatcher.clone());
        let pomodoro = PomodoroTimer::new(settings.pomodoro.minutes);

        info!("ApplicationController initialized");

        Self {
            settings,
            mode: OperatingMode::Background,
            phase: InitPhase::Uninitialized,
            window: None,
            license,
            persist,
            rotator,
            nag,
            global_timer: None,
            pomodoro,
            observers: Observers::new(),
            dispatcher,
            rx,
            rotation_shared,
            resized_for_interactive: false,
            frame_adjustment: None,
            rotation_disabled: false,
            nag_visible: false,
            exit_requested: false,
            last_settings_status: String::new(),
            last_rotation_status: String::new(),
            last_timer_status: String::new(),
        }
    }

    pub fn register_main_window(&mut self, window: Rc<dyn MainWindow>) {
        self.window = Some(window);
    }

    pub fn subscribe<F>(&mut self, subscriber: F)
    where
        F: Fn(&ControllerEvent) + 'static,
    {
        self.observers.subscribe(subscriber);
    }

    /// Sender half of the UI queue, for the window and background workers.
    pub fn dispatcher(&self) -> UiDispatcher {
        self.dispatcher.clone()
    }

    /// Read-only view of the settings aggregate. All mutation goes through
    /// `request_*` methods.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn is_interactive_mode(&self) -> bool {
        self.mode == OperatingMode::Interactive
    }

    pub fn should_exit(&self) -> bool {
        self.exit_requested
    }

    pub fn last_settings_status(&self) -> &str {
        &self.last_settings_status
    }

    pub fn last_rotation_status(&self) -> &str {
        &self.last_rotation_status
    }

    pub fn last_timer_status(&self) -> &str {
        &self.last_timer_status
    }

    pub fn is_rotation_disabled(&self) -> bool {
        self.rotation_disabled
    }

    pub fn is_rotation_active(&self) -> bool {
        self.rotator.is_running()
    }

    // ---- two-phase initialization -------------------------------------

    /// First phase: apply persisted bounds and appearance to the registered
    /// window and enter the startup mode. Must run exactly once, before the
    /// window is shown.
    pub fn initialise_pre_main(&mut self) -> LifeTimerResult<()> {
        info!("Pre-main initialisation start");

        if self.phase != InitPhase::Uninitialized {
            return Err(LifeTimerError::InvalidState(
                "pre-main initialisation already ran",
            ));
        }
        if self.window.is_none() {
            return Err(LifeTimerError::InvalidState(
                "main window is not registered",
            ));
        }

        // Shown when the settings window first opens.
        self.last_settings_status = format!("LifeTimer Version {}", env!("CARGO_PKG_VERSION"));

        self.apply_settings_to_main_window();

        if self.settings.interactive_startup {
            self.set_to_interactive_mode();
        } else {
            self.set_to_background_mode();
        }

        self.phase = InitPhase::PreMain;
        info!("Pre-main initialisation completed");
        Ok(())
    }

    /// Second phase, run exactly once after the window's first activation:
    /// fix up first-activation focus, surface startup UI, start rotation and
    /// the global tick.
    pub fn initialise_post_main(&mut self) -> LifeTimerResult<()> {
        info!("Post-main initialisation start");

        match self.phase {
            InitPhase::Uninitialized => {
                return Err(LifeTimerError::InvalidState(
                    "pre-main initialisation has not run",
                ));
            }
            InitPhase::PostMain => {
                return Err(LifeTimerError::InvalidState(
                    "post-main initialisation already ran",
                ));
            }
            InitPhase::PreMain => {}
        }
        if self.window.is_none() {
            return Err(LifeTimerError::InvalidState(
                "main window is not registered",
            ));
        }

        if !self.settings.interactive_startup {
            self.first_activation_focus_workaround();
        }

        if self.settings.show_settings_on_startup {
            self.observers.emit(&ControllerEvent::SettingsWindowRequested);
        }

        if self.settings.show_operation_hints {
            if let Some(window) = self.window.clone() {
                window.display_interactive_hints();
            }
        }

        self.rotator
            .set_interval_seconds(self.settings.timer_rotation_delay_secs);
        self.update_link_rotation();

        self.persist.start_auto_save();

        let dispatcher = self.dispatcher.clone();
        self.global_timer = Some(IntervalTimer::spawn(
            "global-tick",
            Duration::from_secs(1),
            Some(Duration::from_secs(1)),
            move || dispatcher.post(UiMessage::GlobalTick),
        ));

        self.phase = InitPhase::PostMain;
        info!("Post-main initialisation completed");
        Ok(())
    }

    /// The first activation of the native window steals foreground focus even
    /// when we start as a background overlay. Re-entering background mode
    /// after activation pushes the window back down. Windowing-stack quirk;
    /// keep isolated so other platforms can drop it.
    fn first_activation_focus_workaround(&mut self) {
        self.set_to_background_mode();
    }

    // ---- message pump --------------------------------------------------

    /// Drain messages posted by background timers and the window. Runs on the
    /// UI thread; this is the only place cross-thread effects touch state.
    pub fn process_pending_messages(&mut self) {
        loop {
            let Ok(message) = self.rx.try_recv() else {
                break;
            };
            self.handle_message(message);
        }
    }

    fn handle_message(&mut self, message: UiMessage) {
        match message {
            UiMessage::RotationTick(display) => {
                self.observers
                    .emit(&ControllerEvent::RotationTimerTick(display));
            }
            UiMessage::RotateTo { timer_id, index } => {
                self.settings.current_rotation_index = Some(index);
                self.settings.current_timer_id = Some(timer_id);
                self.refresh_rotation_shared();
                self.get_current_timer();
                self.schedule_save();
            }
            UiMessage::ShowNagOverlay(text) => self.show_freemium_nag_screen(&text),
            UiMessage::ChangeNagText(text) => {
                if self.nag_visible {
                    if let Some(window) = self.window.clone() {
                        window.change_nag_text(&text);
                    }
                }
            }
            UiMessage::HideNagOverlay => self.hide_freemium_nag_screen(),
            UiMessage::GlobalTick => self.on_global_tick(),
            UiMessage::SaveStatusChanged(status) => self.process_settings_status_change(status),
            UiMessage::WindowBoundsChanged(bounds) => {
                self.register_main_window_bounds_change(bounds);
            }
            UiMessage::WindowActivated => {
                if self.phase == InitPhase::PreMain {
                    if let Err(e) = self.initialise_post_main() {
                        error!("Post-main initialisation failed: {}", e);
                    }
                }
            }
            UiMessage::ToggleInteractive => self.request_interactive_toggle(),
            UiMessage::ExitRequested => self.request_application_exit(),
        }
    }

    // ---- mode transitions ----------------------------------------------

    pub fn request_interactive_toggle(&mut self) {
        if self.is_interactive_mode() {
            self.set_to_background_mode();
        } else {
            self.set_to_interactive_mode();
        }
    }

    pub fn request_interactive_mode(&mut self) {
        self.set_to_interactive_mode();
    }

    pub fn request_background_mode(&mut self) {
        self.set_to_background_mode();
    }

    fn set_to_interactive_mode(&mut self) {
        let Some(window) = self.window.clone() else {
            warn!("Mode change requested with no registered window");
            return;
        };

        self.mode = OperatingMode::Interactive;
        self.hide_nag_now();
        if self.license.is_free_version() {
            // Nag screens never show while the user is interacting.
            self.nag.stop();
        }

        window.configure_for_interactive_mode();

        if !self.resized_for_interactive && !self.settings.bounds.is_unsized() {
            // Grow the persisted background geometry by the frame delta so the
            // framed window keeps the client area in place. Later toggles work
            // from current geometry; re-deriving each time would compound.
            let adjustment = self.ensure_frame_adjustment(&window);
            let interactive = adjustment.to_interactive(self.settings.bounds);
            self.settings.bounds = interactive;
            window.set_window_bounds(interactive);
            self.resized_for_interactive = true;
        }

        self.observers.emit(&ControllerEvent::ModeChanged);
        self.schedule_save();
    }

    fn set_to_background_mode(&mut self) {
        let Some(window) = self.window.clone() else {
            warn!("Mode change requested with no registered window");
            return;
        };

        self.mode = OperatingMode::Background;
        self.hide_nag_now();

        if self.resized_for_interactive {
            // Undo the frame delta before the chrome goes away.
            let adjustment = self.ensure_frame_adjustment(&window);
            let background = adjustment.to_background(self.settings.bounds);
            self.settings.bounds = background;
            window.set_window_bounds(background);
            self.resized_for_interactive = false;
        }

        window.configure_for_background_mode();

        if self.license.is_free_version() {
            self.nag.restart();
        }

        self.observers.emit(&ControllerEvent::ModeChanged);
        self.schedule_save();
    }

    fn ensure_frame_adjustment(&mut self, window: &Rc<dyn MainWindow>) -> FrameAdjustment {
        *self
            .frame_adjustment
            .get_or_insert_with(|| window.frame_adjustment())
    }

    fn apply_settings_to_main_window(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };

        if self.settings.bounds.is_unsized() {
            // First run: pick a sensible size for the monitor's DPI.
            let (width, height) = window
                .first_run_scaled_dimensions(INITIAL_WINDOW_WIDTH, INITIAL_WINDOW_HEIGHT);
            self.settings.bounds.width = width;
            self.settings.bounds.height = height;
        }

        window.set_window_bounds(self.settings.bounds);
        window.set_window_appearance(&self.settings.appearance, self.settings.window_opacity);
    }

    /// The OS moved or resized the window; record the new geometry.
    pub fn register_main_window_bounds_change(&mut self, bounds: WindowBounds) {
        self.settings.bounds = bounds;
        self.observers.emit(&ControllerEvent::BoundsChanged);
        self.schedule_save();
    }

    // ---- timers and rotation -------------------------------------------

    /// Replace the timer list wholesale (list editor commit).
    pub fn request_update_timer_list(&mut self, timers: Vec<TimerDefinition>) {
        self.settings.timers = timers;
        self.update_link_rotation();
        self.process_settings_change();
    }

    /// Select the displayed timer. The id is not validated against the list;
    /// a dangling id degrades to "no active timer" on lookup.
    pub fn request_set_current_timer_id(&mut self, id: Option<Uuid>) {
        self.settings.current_timer_id = id;
        self.get_current_timer();
        self.schedule_save();
    }

    /// Look up the current timer, emitting the matching status notification.
    pub fn get_current_timer(&mut self) -> Option<TimerDefinition> {
        match self.find_current_timer() {
            Some(timer) => {
                let title = if timer.title.trim().is_empty() {
                    "(untitled timer)"
                } else {
                    timer.title.as_str()
                };
                self.process_timer_status_change(format!("Active Timer: {}", title));
                Some(timer)
            }
            None => {
                self.process_timer_status_change("No Active Timer".to_string());
                None
            }
        }
    }

    fn find_current_timer(&self) -> Option<TimerDefinition> {
        let id = self.settings.current_timer_id?;
        self.settings.timers.iter().find(|t| t.id == id).cloned()
    }

    pub fn request_change_rotation_delay(&mut self, delay_secs: u32) {
        self.settings.timer_rotation_delay_secs = delay_secs;
        self.rotator.set_interval_seconds(delay_secs);
        self.process_settings_change();
    }

    pub fn request_change_rotation_enabled(&mut self, enabled: bool) {
        self.settings.rotate_timers = enabled;
        self.update_link_rotation();
        self.process_settings_change();
    }

    /// Reconcile the rotator with the timer list and the rotate flag. An
    /// empty list force-disables rotation regardless of the flag.
    fn update_link_rotation(&mut self) {
        self.refresh_rotation_shared();

        if self.settings.timers.is_empty() {
            self.rotator.stop();
            self.rotation_disabled = true;
            self.settings.rotate_timers = false;
            self.process_rotation_status_change("Rotation Disabled".to_string());
            return;
        }

        self.rotation_disabled = false;
        if self.settings.rotate_timers {
            self.rotator.start();
            self.process_rotation_status_change("Rotation Active".to_string());
        } else {
            self.rotator.stop();
            self.process_rotation_status_change("Rotation Stopped".to_string());
        }
    }

    fn refresh_rotation_shared(&self) {
        let mut shared = self.rotation_shared.write();
        shared.timer_ids = self.settings.timers.iter().map(|t| t.id).collect();
        shared.current_index = self.settings.current_rotation_index;
    }

    fn on_global_tick(&mut self) {
        let now = Local::now();
        let (title, time) = match self.settings.display_mode {
            DisplayMode::Timer => match self.find_current_timer() {
                Some(timer) => {
                    let title = if timer.title.trim().is_empty() {
                        "(untitled timer)".to_string()
                    } else {
                        timer.title.clone()
                    };
                    (title, countdown::timer_display(&timer, now))
                }
                None => ("No Active Timer".to_string(), String::new()),
            },
            DisplayMode::Pomodoro => {
                self.pomodoro.tick(now);
                let title = format!(
                    "{} {}",
                    self.settings.pomodoro.title,
                    self.pomodoro.state_label()
                );
                let time = self.pomodoro.display(&self.settings.pomodoro.finished_text);
                (title, time)
            }
        };

        self.observers
            .emit(&ControllerEvent::TimerDisplayChanged { title, time });
        self.observers.emit(&ControllerEvent::Tick);
    }

    // ---- pomodoro -------------------------------------------------------

    pub fn request_pomodoro_start(&mut self) {
        self.pomodoro.start(Local::now());
    }

    pub fn request_pomodoro_pause(&mut self) {
        self.pomodoro.pause(Local::now());
    }

    pub fn request_pomodoro_reset(&mut self) {
        self.pomodoro.reset();
    }

    pub fn pomodoro(&self) -> &PomodoroTimer {
        &self.pomodoro
    }

    // ---- freemium nag ---------------------------------------------------

    fn show_freemium_nag_screen(&mut self, text: &str) {
        if !self.license.is_free_version() {
            return;
        }
        if self.is_interactive_mode() {
            // The timer may fire while the user is editing; never surface it.
            return;
        }
        if let Some(window) = self.window.clone() {
            window.show_nag_overlay(text);
            self.nag_visible = true;
        }
    }

    fn hide_freemium_nag_screen(&mut self) {
        self.hide_nag_now();
    }

    fn hide_nag_now(&mut self) {
        if let Some(window) = self.window.clone() {
            window.hide_nag_overlay();
        }
        self.nag_visible = false;
    }

    // ---- licensing ------------------------------------------------------

    pub fn check_is_free_version(&self) -> bool {
        self.license.is_free_version()
    }

    /// True when `count` timers already reach the tier's list limit.
    pub fn check_timer_count_exceeded(&self, count: usize) -> bool {
        if self.license.is_free_version() {
            count >= MAX_TIMER_COUNT_FREE
        } else {
            count >= MAX_TIMER_COUNT_PRO
        }
    }

    /// Run a store purchase for `product_id` and, on success, promote the
    /// running app to the purchased tier.
    pub fn request_version_upgrade(&mut self, product_id: &str) -> LifeTimerResult<()> {
        if product_id.is_empty() {
            return Err(LifeTimerError::InvalidState("product id is empty"));
        }

        info!("Attempting store purchase upgrade");
        match self.license.perform_purchase(product_id) {
            Ok(PurchaseStatus::Succeeded) => {
                info!("Store purchase successful");
                self.process_inflight_version_upgrade();
                self.process_settings_status_change("Upgrade complete".to_string());
            }
            Ok(status) => {
                info!("Store purchase did not complete: {:?}", status);
            }
            Err(e) => {
                error!("Upgrade error: {}", e);
                self.process_settings_status_change("Store upgrade error".to_string());
            }
        }
        Ok(())
    }

    /// Free-to-paid transition while running: refresh the license cache, kill
    /// the nag machinery and let dependent controls re-read the tier.
    fn process_inflight_version_upgrade(&mut self) {
        self.license.invalidate_cache();
        self.license.refresh();

        self.nag.stop();
        self.hide_nag_now();

        self.observers.emit(&ControllerEvent::VersionChanged);
    }

    // ---- settings mutation ----------------------------------------------

    pub fn request_settings_start_interactive_mode_change(&mut self, interactive_startup: bool) {
        self.settings.interactive_startup = interactive_startup;
        self.process_settings_change();
    }

    pub fn request_settings_show_settings_on_startup(&mut self, show: bool) {
        self.settings.show_settings_on_startup = show;
        self.process_settings_change();
    }

    pub fn request_settings_show_operation_hints(&mut self, show: bool) {
        self.settings.show_operation_hints = show;
        self.process_settings_change();
    }

    pub fn request_settings_window_opacity(&mut self, opacity: u8) {
        self.settings.window_opacity = opacity;
        if let Some(window) = self.window.clone() {
            window.set_window_appearance(&self.settings.appearance, opacity);
        }
        self.process_settings_change();
    }

    pub fn request_settings_appearance(&mut self, appearance: AppearanceSettings) {
        self.settings.appearance = appearance;
        if let Some(window) = self.window.clone() {
            window.set_window_appearance(&self.settings.appearance, self.settings.window_opacity);
        }
        self.process_settings_change();
    }

    pub fn request_settings_display_mode(&mut self, mode: DisplayMode) {
        self.settings.display_mode = mode;
        self.process_settings_change();
    }

    pub fn request_settings_pomodoro(&mut self, pomodoro: PomodoroSettings) {
        self.pomodoro.set_minutes(pomodoro.minutes);
        self.settings.pomodoro = pomodoro;
        self.process_settings_change();
    }

    pub fn request_show_settings_window(&mut self) {
        self.observers.emit(&ControllerEvent::SettingsWindowRequested);
    }

    /// Explicit save-now request, bypassing the debounce.
    pub fn request_save_settings(&mut self) {
        self.persist.save_now(&self.settings);
    }

    // ---- shutdown -------------------------------------------------------

    pub fn request_application_exit(&mut self) {
        self.process_main_window_shutdown();
        if let Some(window) = self.window.clone() {
            window.shutdown();
        }
        self.exit_requested = true;
    }

    /// Teardown invoked from the window-close path. Safe when subsystems were
    /// never started.
    pub fn process_main_window_shutdown(&mut self) {
        info!("Main window shutdown");
        if self.rotator.is_running() {
            self.rotator.stop();
        }
        self.global_timer = None;
        self.nag.stop();
        self.persist.shutdown();
    }

    // ---- notification plumbing ------------------------------------------

    fn schedule_save(&mut self) {
        self.persist.request_save(self.settings.clone());
    }

    fn process_settings_change(&mut self) {
        self.observers.emit(&ControllerEvent::SettingsChanged);
        self.schedule_save();
    }

    fn process_settings_status_change(&mut self, status: String) {
        self.last_settings_status = status.clone();
        self.observers
            .emit(&ControllerEvent::SettingsStatusChanged(status));
    }

    fn process_rotation_status_change(&mut self, status: String) {
        self.last_rotation_status = status.clone();
        self.observers
            .emit(&ControllerEvent::RotationStatusChanged(status));
    }

    fn process_timer_status_change(&mut self, status: String) {
        self.last_timer_status = status.clone();
        self.observers
            .emit(&ControllerEvent::TimerStatusChanged(status));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::licensing::{ForcedTierBackend, ProductTier, StoreBackend, StoreLicense};
    use std::cell::RefCell;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    enum WindowCall {
        Interactive,
        Background,
        SetBounds(WindowBounds),
        SetAppearance(u8),
        ShowNag(String),
        ChangeNag(String),
        HideNag,
        Hints,
        Shutdown,
    }

    struct TestWindow {
        calls: RefCell<Vec<WindowCall>>,
        dispatcher: UiDispatcher,
        adjustment: FrameAdjustment,
    }

    impl TestWindow {
        fn new(dispatcher: UiDispatcher) -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                dispatcher,
                adjustment: FrameAdjustment::new(-8, -31, 8, 8),
            }
        }

        fn calls(&self) -> Vec<WindowCall> {
            self.calls.borrow().clone()
        }

        fn count(&self, call: &WindowCall) -> usize {
            self.calls.borrow().iter().filter(|c| *c == call).count()
        }
    }

    impl MainWindow for TestWindow {
        fn configure_for_interactive_mode(&self) {
            self.calls.borrow_mut().push(WindowCall::Interactive);
        }

        fn configure_for_background_mode(&self) {
            self.calls.borrow_mut().push(WindowCall::Background);
        }

        fn set_window_bounds(&self, bounds: WindowBounds) {
            self.calls.borrow_mut().push(WindowCall::SetBounds(bounds));
            // Echo the geometry change the way the OS notification path does.
            self.dispatcher.post(UiMessage::WindowBoundsChanged(bounds));
        }

        fn set_window_appearance(&self, _appearance: &AppearanceSettings, opacity: u8) {
            self.calls.borrow_mut().push(WindowCall::SetAppearance(opacity));
        }

        fn show_nag_overlay(&self, text: &str) {
            self.calls.borrow_mut().push(WindowCall::ShowNag(text.to_string()));
        }

        fn change_nag_text(&self, text: &str) {
            self.calls.borrow_mut().push(WindowCall::ChangeNag(text.to_string()));
        }

        fn hide_nag_overlay(&self) {
            self.calls.borrow_mut().push(WindowCall::HideNag);
        }

        fn first_run_scaled_dimensions(&self, width: i32, height: i32) -> (i32, i32) {
            // Pretend we sit on a 192-DPI monitor.
            (width * 2, height * 2)
        }

        fn frame_adjustment(&self) -> FrameAdjustment {
            self.adjustment
        }

        fn display_interactive_hints(&self) {
            self.calls.borrow_mut().push(WindowCall::Hints);
        }

        fn shutdown(&self) {
            self.calls.borrow_mut().push(WindowCall::Shutdown);
        }
    }

    fn test_store() -> Arc<SettingsStore> {
        let path = std::env::temp_dir()
            .join("lifetimer-controller-tests")
            .join(format!("{}.json", Uuid::new_v4()));
        Arc::new(SettingsStore::with_path(path))
    }

    fn license_with_tier(tier: ProductTier) -> Arc<dyn LicenseOracle> {
        let license = StoreLicense::new(Box::new(ForcedTierBackend::new(tier)));
        license.refresh();
        Arc::new(license)
    }

    struct Harness {
        controller: ApplicationController,
        window: Rc<TestWindow>,
        events: Rc<RefCell<Vec<ControllerEvent>>>,
    }

    fn build(settings: Settings, tier: ProductTier) -> Harness {
        build_with_license(settings, license_with_tier(tier))
    }

    fn build_with_license(settings: Settings, license: Arc<dyn LicenseOracle>) -> Harness {
        let mut controller = ApplicationController::new(settings, test_store(), license);
        let window = Rc::new(TestWindow::new(controller.dispatcher()));
        controller.register_main_window(window.clone());

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        controller.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        Harness { controller, window, events }
    }

    fn sized_settings() -> Settings {
        let mut settings = Settings::with_default_timer();
        settings.bounds = WindowBounds::new(100, 200, 640, 480);
        settings.interactive_startup = false;
        settings.show_operation_hints = false;
        settings
    }

    fn statuses(events: &RefCell<Vec<ControllerEvent>>) -> Vec<String> {
        events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                ControllerEvent::TimerStatusChanged(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn post_main_before_pre_main_is_an_invalid_state() {
        let mut h = build(sized_settings(), ProductTier::Free);
        let err = h.controller.initialise_post_main().unwrap_err();
        assert!(matches!(err, LifeTimerError::InvalidState(_)));
    }

    #[test]
    fn pre_main_without_window_is_an_invalid_state() {
        let mut controller = ApplicationController::new(
            sized_settings(),
            test_store(),
            license_with_tier(ProductTier::Free),
        );
        let err = controller.initialise_pre_main().unwrap_err();
        assert!(matches!(err, LifeTimerError::InvalidState(_)));
    }

    #[test]
    fn pre_main_runs_exactly_once() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        let err = h.controller.initialise_pre_main().unwrap_err();
        assert!(matches!(err, LifeTimerError::InvalidState(_)));

        h.controller.initialise_post_main().unwrap();
        let err = h.controller.initialise_post_main().unwrap_err();
        assert!(matches!(err, LifeTimerError::InvalidState(_)));
    }

    #[test]
    fn first_run_computes_dpi_scaled_default_size() {
        let mut settings = Settings::with_default_timer();
        settings.interactive_startup = false;
        settings.show_operation_hints = false;
        assert!(settings.bounds.is_unsized());

        let mut h = build(settings, ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();

        assert_eq!(
            h.window.calls()[0],
            WindowCall::SetBounds(WindowBounds::new(100, 100, 700, 200))
        );
        assert_eq!(h.controller.settings().bounds.width, 700);
        assert_eq!(h.controller.settings().bounds.height, 200);
    }

    #[test]
    fn background_startup_bounces_mode_after_first_activation() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        assert_eq!(h.window.count(&WindowCall::Background), 1);

        h.controller.initialise_post_main().unwrap();
        assert_eq!(h.window.count(&WindowCall::Background), 2);
        assert!(!h.controller.is_interactive_mode());
    }

    #[test]
    fn interactive_startup_skips_the_bounce() {
        let mut settings = sized_settings();
        settings.interactive_startup = true;
        let mut h = build(settings, ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller.initialise_post_main().unwrap();

        assert_eq!(h.window.count(&WindowCall::Background), 0);
        assert_eq!(h.window.count(&WindowCall::Interactive), 1);
        assert!(h.controller.is_interactive_mode());
    }

    #[test]
    fn hints_shown_after_activation_when_enabled() {
        let mut settings = sized_settings();
        settings.show_operation_hints = true;
        let mut h = build(settings, ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller.initialise_post_main().unwrap();
        assert_eq!(h.window.count(&WindowCall::Hints), 1);
    }

    #[test]
    fn mode_toggling_round_trips_bounds_without_drift() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller.process_pending_messages();

        let background = WindowBounds::new(100, 200, 640, 480);
        let interactive = WindowBounds::new(92, 169, 656, 519);
        assert_eq!(h.controller.settings().bounds, background);

        for _ in 0..3 {
            h.controller.request_interactive_mode();
            h.controller.process_pending_messages();
            assert_eq!(h.controller.settings().bounds, interactive);

            h.controller.request_background_mode();
            h.controller.process_pending_messages();
            assert_eq!(h.controller.settings().bounds, background);
        }
    }

    #[test]
    fn repeated_interactive_requests_resize_only_once() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller.process_pending_messages();
        let initial_resizes = h.window.calls().len();

        h.controller.request_interactive_mode();
        h.controller.request_interactive_mode();
        h.controller.process_pending_messages();

        let resizes = h
            .window
            .calls()
            .iter()
            .skip(initial_resizes)
            .filter(|c| matches!(c, WindowCall::SetBounds(_)))
            .count();
        assert_eq!(resizes, 1);
    }

    #[test]
    fn nag_show_is_suppressed_while_interactive() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller.request_interactive_mode();
        h.controller.process_pending_messages();

        for _ in 0..5 {
            h.controller
                .dispatcher()
                .post(UiMessage::ShowNagOverlay("upgrade".to_string()));
        }
        h.controller.process_pending_messages();

        assert_eq!(h.window.count(&WindowCall::ShowNag("upgrade".to_string())), 0);
    }

    #[test]
    fn nag_shows_in_background_mode_on_free_tier() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller.process_pending_messages();

        h.controller
            .dispatcher()
            .post(UiMessage::ShowNagOverlay("upgrade".to_string()));
        h.controller
            .dispatcher()
            .post(UiMessage::ChangeNagText("second".to_string()));
        h.controller.process_pending_messages();

        assert_eq!(h.window.count(&WindowCall::ShowNag("upgrade".to_string())), 1);
        assert_eq!(h.window.count(&WindowCall::ChangeNag("second".to_string())), 1);
    }

    #[test]
    fn nag_show_is_a_no_op_for_paid_tiers() {
        let mut h = build(sized_settings(), ProductTier::ProLifetime);
        h.controller.initialise_pre_main().unwrap();
        h.controller.process_pending_messages();

        h.controller
            .dispatcher()
            .post(UiMessage::ShowNagOverlay("upgrade".to_string()));
        h.controller.process_pending_messages();

        assert_eq!(h.window.count(&WindowCall::ShowNag("upgrade".to_string())), 0);
    }

    #[test]
    fn nag_text_change_without_visible_overlay_is_dropped() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller
            .dispatcher()
            .post(UiMessage::ChangeNagText("stale".to_string()));
        h.controller.process_pending_messages();
        assert_eq!(h.window.count(&WindowCall::ChangeNag("stale".to_string())), 0);
    }

    #[test]
    fn mode_transitions_hide_a_visible_nag() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller
            .dispatcher()
            .post(UiMessage::ShowNagOverlay("upgrade".to_string()));
        h.controller.process_pending_messages();

        let hides_before = h.window.count(&WindowCall::HideNag);
        h.controller.request_interactive_mode();
        assert!(h.window.count(&WindowCall::HideNag) > hides_before);
    }

    #[test]
    fn empty_timer_list_force_disables_rotation() {
        let mut settings = sized_settings();
        settings.rotate_timers = true;
        let mut h = build(settings, ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();

        h.controller.request_update_timer_list(Vec::new());

        assert!(h.controller.is_rotation_disabled());
        assert!(!h.controller.settings().rotate_timers);
        assert!(!h.controller.is_rotation_active());
        assert_eq!(h.controller.last_rotation_status(), "Rotation Disabled");
    }

    #[test]
    fn rotation_follows_the_rotate_flag_when_list_is_nonempty() {
        let mut settings = sized_settings();
        settings.rotate_timers = true;
        let mut h = build(settings, ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller.initialise_post_main().unwrap();

        assert!(h.controller.is_rotation_active());
        assert_eq!(h.controller.last_rotation_status(), "Rotation Active");

        h.controller.request_change_rotation_enabled(false);
        assert!(!h.controller.is_rotation_active());
        assert_eq!(h.controller.last_rotation_status(), "Rotation Stopped");

        h.controller.request_change_rotation_enabled(true);
        assert!(h.controller.is_rotation_active());
    }

    #[test]
    fn rotate_message_selects_the_posted_timer() {
        let mut settings = sized_settings();
        let second = TimerDefinition {
            title: "Second".to_string(),
            ..TimerDefinition::default()
        };
        let second_id = second.id;
        settings.timers.push(second);

        let mut h = build(settings, ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();

        h.controller.dispatcher().post(UiMessage::RotateTo {
            timer_id: second_id,
            index: 1,
        });
        h.controller.process_pending_messages();

        assert_eq!(h.controller.settings().current_timer_id, Some(second_id));
        assert_eq!(h.controller.settings().current_rotation_index, Some(1));
        assert!(statuses(&h.events).contains(&"Active Timer: Second".to_string()));
    }

    #[test]
    fn current_timer_lookup_degrades_gracefully() {
        let mut h = build(sized_settings(), ProductTier::Free);

        // Unset id.
        h.controller.request_set_current_timer_id(None);
        assert!(h.controller.get_current_timer().is_none());
        assert_eq!(h.controller.last_timer_status(), "No Active Timer");

        // Dangling id is tolerated, not an error.
        h.controller.request_set_current_timer_id(Some(Uuid::new_v4()));
        assert!(h.controller.get_current_timer().is_none());
        assert_eq!(h.controller.last_timer_status(), "No Active Timer");

        // Valid id resolves and reports the title.
        let existing = h.controller.settings().timers[0].id;
        h.controller.request_set_current_timer_id(Some(existing));
        assert!(h.controller.get_current_timer().is_some());
        assert_eq!(h.controller.last_timer_status(), "Active Timer: Current Time");
    }

    #[test]
    fn blank_titles_display_as_untitled() {
        let mut settings = sized_settings();
        let untitled = TimerDefinition::default();
        let untitled_id = untitled.id;
        settings.timers.push(untitled);

        let mut h = build(settings, ProductTier::Free);
        h.controller.request_set_current_timer_id(Some(untitled_id));
        assert_eq!(
            h.controller.last_timer_status(),
            "Active Timer: (untitled timer)"
        );
    }

    #[test]
    fn tier_limits_gate_timer_count() {
        let free = build(sized_settings(), ProductTier::Free);
        assert!(!free.controller.check_timer_count_exceeded(2));
        assert!(free.controller.check_timer_count_exceeded(3));

        let pro = build(sized_settings(), ProductTier::ProSubscription);
        assert!(!pro.controller.check_timer_count_exceeded(14));
        assert!(pro.controller.check_timer_count_exceeded(15));
    }

    struct UpgradingBackend {
        purchased: AtomicBool,
    }

    impl StoreBackend for UpgradingBackend {
        fn query_tier(&self) -> LifeTimerResult<ProductTier> {
            Ok(if self.purchased.load(Ordering::SeqCst) {
                ProductTier::ProLifetime
            } else {
                ProductTier::Free
            })
        }

        fn request_purchase(&self, _product_id: &str) -> LifeTimerResult<PurchaseStatus> {
            self.purchased.store(true, Ordering::SeqCst);
            Ok(PurchaseStatus::Succeeded)
        }
    }

    #[test]
    fn successful_upgrade_promotes_tier_and_notifies() {
        let license = StoreLicense::new(Box::new(UpgradingBackend {
            purchased: AtomicBool::new(false),
        }));
        license.refresh();
        let mut h = build_with_license(sized_settings(), Arc::new(license));
        h.controller.initialise_pre_main().unwrap();

        assert!(h.controller.check_is_free_version());
        h.controller
            .request_version_upgrade(crate::licensing::PRO_LIFETIME_PRODUCT_ID)
            .unwrap();

        assert!(!h.controller.check_is_free_version());
        assert_eq!(h.controller.last_settings_status(), "Upgrade complete");
        assert!(h
            .events
            .borrow()
            .iter()
            .any(|e| matches!(e, ControllerEvent::VersionChanged)));
    }

    #[test]
    fn failed_upgrade_reports_status_without_erroring() {
        let mut h = build(sized_settings(), ProductTier::Free);
        // ForcedTierBackend refuses purchases.
        h.controller
            .request_version_upgrade(crate::licensing::PRO_LIFETIME_PRODUCT_ID)
            .unwrap();
        assert_eq!(h.controller.last_settings_status(), "Store upgrade error");
    }

    #[test]
    fn upgrade_with_empty_product_id_is_an_invalid_state() {
        let mut h = build(sized_settings(), ProductTier::Free);
        let err = h.controller.request_version_upgrade("").unwrap_err();
        assert!(matches!(err, LifeTimerError::InvalidState(_)));
    }

    #[test]
    fn shutdown_is_safe_before_and_after_startup() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.process_main_window_shutdown();

        h.controller.initialise_pre_main().unwrap();
        h.controller.initialise_post_main().unwrap();
        h.controller.process_main_window_shutdown();
        assert!(!h.controller.is_rotation_active());
    }

    #[test]
    fn exit_request_tears_down_and_flags_exit() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.initialise_pre_main().unwrap();
        h.controller.initialise_post_main().unwrap();

        h.controller.dispatcher().post(UiMessage::ExitRequested);
        h.controller.process_pending_messages();

        assert!(h.controller.should_exit());
        assert_eq!(h.window.count(&WindowCall::Shutdown), 1);
    }

    #[test]
    fn bounds_reports_update_settings_and_notify() {
        let mut h = build(sized_settings(), ProductTier::Free);
        let moved = WindowBounds::new(5, 6, 640, 480);
        h.controller.register_main_window_bounds_change(moved);

        assert_eq!(h.controller.settings().bounds, moved);
        assert!(h
            .events
            .borrow()
            .iter()
            .any(|e| matches!(e, ControllerEvent::BoundsChanged)));
    }

    #[test]
    fn global_tick_publishes_the_current_timer_display() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.dispatcher().post(UiMessage::GlobalTick);
        h.controller.process_pending_messages();

        let display = h.events.borrow().iter().find_map(|e| match e {
            ControllerEvent::TimerDisplayChanged { title, time } => {
                Some((title.clone(), time.clone()))
            }
            _ => None,
        });
        let (title, time) = display.expect("display published");
        assert_eq!(title, "Current Time");
        assert!(!time.is_empty());
    }

    #[test]
    fn global_tick_drives_the_pomodoro_in_pomodoro_mode() {
        let mut settings = sized_settings();
        settings.display_mode = DisplayMode::Pomodoro;
        let mut h = build(settings, ProductTier::Free);

        h.controller.dispatcher().post(UiMessage::GlobalTick);
        h.controller.process_pending_messages();

        let title = h.events.borrow().iter().find_map(|e| match e {
            ControllerEvent::TimerDisplayChanged { title, .. } => Some(title.clone()),
            _ => None,
        });
        assert_eq!(title.unwrap(), "Pomodoro Stopped");

        h.controller.request_pomodoro_start();
        h.controller.dispatcher().post(UiMessage::GlobalTick);
        h.controller.process_pending_messages();
        let running = h.events.borrow().iter().any(|e| {
            matches!(e, ControllerEvent::TimerDisplayChanged { title, .. } if title == "Pomodoro Running")
        });
        assert!(running);
    }

    #[test]
    fn settings_mutations_notify_observers() {
        let mut h = build(sized_settings(), ProductTier::Free);
        h.controller.request_settings_window_opacity(42);

        assert_eq!(h.window.count(&WindowCall::SetAppearance(42)), 1);
        assert!(h
            .events
            .borrow()
            .iter()
            .any(|e| matches!(e, ControllerEvent::SettingsChanged)));
        assert_eq!(h.controller.settings().window_opacity, 42);
    }
}
