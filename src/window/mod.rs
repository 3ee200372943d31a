//! Windowing layer
//!
//! [`MainWindow`] is the capability interface the controller drives; the
//! Win32 overlay window implements it on Windows. The controller never calls
//! OS windowing APIs itself, so the whole core stays testable against an
//! in-memory window.

#[cfg(target_os = "windows")]
pub mod native;
#[cfg(target_os = "windows")]
pub mod overlay;

#[cfg(target_os = "windows")]
pub use overlay::OverlayWindow;

use crate::bounds::{FrameAdjustment, WindowBounds};
use crate::settings::AppearanceSettings;

/// Capabilities the controller requires of the main overlay window.
///
/// Gestures and OS notifications flow the other way: implementations post
/// [`crate::events::UiMessage`]s through the controller's dispatcher.
pub trait MainWindow {
    /// Framed, activatable, not click-through.
    fn configure_for_interactive_mode(&self);

    /// Borderless, non-activating, sent to the bottom of the z-order.
    fn configure_for_background_mode(&self);

    fn set_window_bounds(&self, bounds: WindowBounds);

    fn set_window_appearance(&self, appearance: &AppearanceSettings, opacity: u8);

    fn show_nag_overlay(&self, text: &str);

    fn change_nag_text(&self, text: &str);

    fn hide_nag_overlay(&self);

    /// Physical pixel size for a logical size on the window's monitor.
    fn first_run_scaled_dimensions(&self, width: i32, height: i32) -> (i32, i32);

    /// Client-to-frame deltas for the framed style, cached per window handle.
    fn frame_adjustment(&self) -> FrameAdjustment;

    /// One-time onboarding hint overlay.
    fn display_interactive_hints(&self);

    fn shutdown(&self);
}
