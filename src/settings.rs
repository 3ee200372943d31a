//! Persisted application settings
//!
//! The whole settings aggregate is serialized as a single JSON blob. Loading
//! never fails: absence or corruption falls back to a defaulted model seeded
//! with one "Current Time" timer.

#![allow(dead_code)]

use chrono::{DateTime, Local, TimeZone};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::bounds::WindowBounds;
use crate::error::LifeTimerResult;

/// Logical size used to compute the DPI-scaled default window size on first run.
pub const INITIAL_WINDOW_WIDTH: i32 = 350;
pub const INITIAL_WINDOW_HEIGHT: i32 = 100;

/// What the overlay displays: the configured timers or the Pomodoro work timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DisplayMode {
    #[default]
    Timer,
    Pomodoro,
}

/// A single countdown/count-up timer definition. Identity is `id`; list order
/// is rotation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerDefinition {
    pub id: Uuid,
    pub title: String,
    pub target_date_time: DateTime<Local>,
    pub is_current_time: bool,
    pub display_days_only: bool,
    pub display_hours: bool,
    pub display_minutes: bool,
    pub display_seconds: bool,
}

impl Default for TimerDefinition {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            title: String::new(),
            target_date_time: Local::now(),
            is_current_time: false,
            display_days_only: false,
            display_hours: false,
            display_minutes: false,
            display_seconds: false,
        }
    }
}

/// ARGB color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Self { a, r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Medium,
    Bold,
}

/// Font selection for one of the overlay text elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontDefinition {
    pub family: String,
    pub size: f32,
    pub weight: FontWeight,
    pub italic: bool,
}

impl FontDefinition {
    pub fn new(family: &str, size: f32) -> Self {
        Self {
            family: family.to_string(),
            size,
            weight: FontWeight::Normal,
            italic: false,
        }
    }
}

impl Default for FontDefinition {
    fn default() -> Self {
        Self::new("Segoe UI", 14.0)
    }
}

/// Appearance settings for the overlay window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceSettings {
    pub title_font: FontDefinition,
    pub timer_font: FontDefinition,
    pub foreground_color: Color,
    pub background_color: Color,
    pub border_color: Color,
    /// Non-negative, pixels.
    pub border_thickness: i32,
    /// Non-negative, pixels.
    pub border_radius: i32,
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            title_font: FontDefinition::new("Segoe UI", 18.0),
            timer_font: FontDefinition::new("Segoe UI", 36.0),
            foreground_color: Color::argb(255, 0, 128, 255),
            background_color: Color::argb(200, 0, 0, 0),
            border_color: Color::argb(255, 0, 127, 255),
            border_thickness: 1,
            border_radius: 20,
        }
    }
}

/// Pomodoro work-timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PomodoroSettings {
    pub minutes: u32,
    pub title: String,
    pub finished_text: String,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            minutes: 20,
            title: "Pomodoro".to_string(),
            finished_text: "Finished".to_string(),
        }
    }
}

/// Root settings aggregate, persisted as one JSON blob.
///
/// Owned by the application controller; UI observers only ever see `&Settings`
/// borrows, so every mutation goes through a controller `request_*` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timers: Vec<TimerDefinition>,
    /// May dangle after list edits; lookup degrades to "no active timer".
    pub current_timer_id: Option<Uuid>,
    pub current_rotation_index: Option<usize>,
    pub rotate_timers: bool,
    pub timer_rotation_delay_secs: u32,
    pub appearance: AppearanceSettings,
    pub pomodoro: PomodoroSettings,
    pub display_mode: DisplayMode,
    /// Layered-window alpha, 0-255.
    pub window_opacity: u8,
    /// Start in interactive mode instead of as a background overlay.
    pub interactive_startup: bool,
    pub show_settings_on_startup: bool,
    pub show_operation_hints: bool,
    pub bounds: WindowBounds,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timers: Vec::new(),
            current_timer_id: None,
            current_rotation_index: None,
            rotate_timers: false,
            timer_rotation_delay_secs: 30,
            appearance: AppearanceSettings::default(),
            pomodoro: PomodoroSettings::default(),
            display_mode: DisplayMode::Timer,
            window_opacity: 128,
            interactive_startup: true,
            show_settings_on_startup: false,
            show_operation_hints: true,
            bounds: WindowBounds::default(),
        }
    }
}

impl Settings {
    /// Defaults plus one seeded wall-clock timer, selected as current.
    pub fn with_default_timer() -> Self {
        let mut settings = Self::default();
        let timer = default_current_time_timer();
        settings.current_timer_id = Some(timer.id);
        settings.timers.push(timer);
        settings
    }
}

fn default_current_time_timer() -> TimerDefinition {
    TimerDefinition {
        id: Uuid::new_v4(),
        title: "Current Time".to_string(),
        target_date_time: Local::now(),
        is_current_time: true,
        display_days_only: false,
        display_hours: true,
        display_minutes: true,
        display_seconds: true,
    }
}

/// An example count-up timer offered by the first-run flow.
pub fn default_epoch_timer() -> TimerDefinition {
    TimerDefinition {
        id: Uuid::new_v4(),
        title: "Time Since Unix Epoch".to_string(),
        target_date_time: Local
            .with_ymd_and_hms(1970, 1, 1, 0, 0, 0)
            .earliest()
            .unwrap_or_else(Local::now),
        is_current_time: false,
        display_days_only: false,
        display_hours: true,
        display_minutes: true,
        display_seconds: true,
    }
}

/// On-disk settings store.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    /// Settings file under the per-user config directory.
    pub fn at_default_location() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lifetimer")
            .join("settings.json");
        Self { path }
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load settings, falling back to the seeded defaults on absence or
    /// corruption. Never fails.
    pub fn load_or_default(&self) -> Settings {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    info!("Settings loaded from {:?}", self.path);
                    return settings;
                }
                Err(e) => {
                    warn!("Failed to parse settings, using defaults: {}", e);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings file at {:?}, using defaults", self.path);
            }
            Err(e) => {
                warn!("Failed to read settings, using defaults: {}", e);
            }
        }

        Settings::with_default_timer()
    }

    /// Write the settings blob. Failures surface to the save pipeline, which
    /// logs them and retries on the next debounce cycle.
    pub fn save(&self, settings: &Settings) -> LifeTimerResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        std::fs::write(&self.path, content)?;
        info!("Settings saved to {:?}", self.path);
        Ok(())
    }
}
