//! LifeTimer - an always-on-top desktop overlay for countdown and count-up timers
//!
//! A transparent, borderless window displays the configured timers over the
//! desktop. Double-clicking toggles between the background overlay and an
//! interactive, framed window that can be moved, resized and edited.

#![windows_subsystem = "windows"]

mod bounds;
mod controller;
mod countdown;
mod error;
mod events;
mod licensing;
mod nag;
mod persist;
mod pomodoro;
mod rotation;
mod settings;
mod timers;
mod window;

use anyhow::Result;
use log::{info, LevelFilter};
use std::sync::Arc;

use crate::controller::ApplicationController;
use crate::licensing::{ForcedTierBackend, LicenseOracle, ProductTier, StoreLicense};
use crate::settings::SettingsStore;

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(LevelFilter::Info)
        .format_timestamp_millis()
        .init();

    info!("Starting LifeTimer v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(SettingsStore::at_default_location());
    let settings = store.load_or_default();

    // Sideloaded builds have no store context; packaged builds query the
    // store through the same oracle interface.
    let license: Arc<dyn LicenseOracle> =
        Arc::new(StoreLicense::new(Box::new(ForcedTierBackend::new(
            ProductTier::Free,
        ))));
    license.refresh();

    let controller = ApplicationController::new(settings, store, license);

    run(controller)?;

    info!("LifeTimer shutting down gracefully");
    Ok(())
}

#[cfg(target_os = "windows")]
fn run(mut controller: ApplicationController) -> Result<()> {
    use crate::events::ControllerEvent;
    use crate::window::{overlay, OverlayWindow};
    use std::rc::Rc;

    let window = Rc::new(OverlayWindow::create(controller.dispatcher())?);
    controller.register_main_window(window.clone());

    // Push freshly-formatted timer text into the overlay on every tick.
    let display_window = window.clone();
    controller.subscribe(move |event| {
        if let ControllerEvent::TimerDisplayChanged { title, time } = event {
            display_window.update_display(title, time);
        }
    });

    controller.initialise_pre_main()?;
    window.show();

    // Post-main initialisation runs from the first WM_ACTIVATE, inside the
    // message loop.
    overlay::run_message_loop(&mut controller)
}

#[cfg(not(target_os = "windows"))]
fn run(_controller: ApplicationController) -> Result<()> {
    anyhow::bail!("the LifeTimer overlay window requires Windows");
}
