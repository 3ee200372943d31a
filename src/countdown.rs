//! Countdown, count-up and wall-clock display formatting
//!
//! Timers display either time remaining until a target, time elapsed since a
//! target, or the current wall clock, with per-timer flags controlling which
//! units appear. Formats:
//!
//! - days-only: `D[:HH[:MM[:SS]]]`
//! - full:      `Y:D[:HH[:MM[:SS]]]` where years are whole 365-day blocks
//!
//! Each finer unit only appears when all coarser optional units are enabled,
//! so the string never skips a place value.

#![allow(dead_code)]

use chrono::{DateTime, Local, Timelike};

use crate::settings::TimerDefinition;

/// Per-timer display unit flags.
#[derive(Debug, Clone, Copy)]
pub struct DisplayUnits {
    pub days_only: bool,
    pub hours: bool,
    pub minutes: bool,
    pub seconds: bool,
}

impl From<&TimerDefinition> for DisplayUnits {
    fn from(timer: &TimerDefinition) -> Self {
        Self {
            days_only: timer.display_days_only,
            hours: timer.display_hours,
            minutes: timer.display_minutes,
            seconds: timer.display_seconds,
        }
    }
}

/// Time remaining until `target`, or "Timer expired" at and after it.
pub fn format_countdown(now: DateTime<Local>, target: DateTime<Local>, units: DisplayUnits) -> String {
    let remaining = (target - now).num_seconds();
    if remaining <= 0 {
        return "Timer expired".to_string();
    }
    format_span(remaining, units)
}

/// Time elapsed since `target`, or "Not started" before it.
pub fn format_countup(now: DateTime<Local>, target: DateTime<Local>, units: DisplayUnits) -> String {
    let elapsed = (now - target).num_seconds();
    if elapsed <= 0 {
        return "Not started".to_string();
    }
    format_span(elapsed, units)
}

/// The current wall clock, honoring the hours/minutes/seconds flags.
pub fn format_wall_clock(now: DateTime<Local>, units: DisplayUnits) -> String {
    let mut parts = Vec::new();
    if units.hours {
        parts.push(format!("{:02}", now.hour()));
        if units.minutes {
            parts.push(format!("{:02}", now.minute()));
            if units.seconds {
                parts.push(format!("{:02}", now.second()));
            }
        }
    }

    if parts.is_empty() {
        return now.format("%H:%M").to_string();
    }
    parts.join(":")
}

/// Display string for a timer definition: wall clock for current-time timers,
/// countdown while the target lies ahead, count-up once it has passed.
pub fn timer_display(timer: &TimerDefinition, now: DateTime<Local>) -> String {
    let units = DisplayUnits::from(timer);
    if timer.is_current_time {
        format_wall_clock(now, units)
    } else if timer.target_date_time > now {
        format_countdown(now, timer.target_date_time, units)
    } else {
        format_countup(now, timer.target_date_time, units)
    }
}

/// Target date shown in the timer editor.
pub fn format_target(target: DateTime<Local>) -> String {
    format!("Target: {}", target.format("%b %d, %Y %H:%M:%S"))
}

fn format_span(total_seconds: i64, units: DisplayUnits) -> String {
    let total_days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut parts = if units.days_only {
        vec![total_days.to_string()]
    } else {
        let years = total_days / 365;
        let days = total_days % 365;
        vec![years.to_string(), days.to_string()]
    };

    if units.hours {
        parts.push(format!("{:02}", hours));
        if units.minutes {
            parts.push(format!("{:02}", minutes));
            if units.seconds {
                parts.push(format!("{:02}", seconds));
            }
        }
    }

    parts.join(":")
}
