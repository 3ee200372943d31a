//! Pomodoro work-timer state machine
//!
//! Driven by the controller's 1 Hz global tick. Running state recomputes the
//! remaining time from a fixed target instant, so display updates can't
//! accumulate drift.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PomodoroState {
    Idle,
    Running,
    Paused,
    Finished,
}

pub struct PomodoroTimer {
    state: PomodoroState,
    target: Option<DateTime<Local>>,
    remaining: Duration,
    duration: Duration,
}

impl PomodoroTimer {
    pub fn new(minutes: u32) -> Self {
        let duration = Duration::seconds(i64::from(minutes) * 60);
        Self {
            state: PomodoroState::Idle,
            target: None,
            remaining: duration,
            duration,
        }
    }

    pub fn state(&self) -> PomodoroState {
        self.state
    }

    /// Change the configured work duration. Takes effect on the next reset;
    /// a session in flight keeps its original target.
    pub fn set_minutes(&mut self, minutes: u32) {
        self.duration = Duration::seconds(i64::from(minutes) * 60);
        if self.state == PomodoroState::Idle {
            self.remaining = self.duration;
        }
    }

    /// Start or resume. Starting from Finished resets to a full session first.
    pub fn start(&mut self, now: DateTime<Local>) {
        if self.state == PomodoroState::Finished {
            self.reset();
        }

        let remaining = match self.state {
            PomodoroState::Paused => self.remaining,
            _ => self.duration,
        };

        self.target = Some(now + remaining);
        self.remaining = remaining;
        self.state = PomodoroState::Running;
    }

    /// Freeze the countdown, keeping the remaining time for resume.
    pub fn pause(&mut self, now: DateTime<Local>) {
        if self.state != PomodoroState::Running {
            return;
        }
        if let Some(target) = self.target {
            self.remaining = target - now;
        }
        self.state = PomodoroState::Paused;
    }

    pub fn reset(&mut self) {
        self.state = PomodoroState::Idle;
        self.target = None;
        self.remaining = self.duration;
    }

    /// Advance the machine; called every second. Returns the state after the
    /// tick so callers can react to the Running -> Finished edge.
    pub fn tick(&mut self, now: DateTime<Local>) -> PomodoroState {
        if self.state == PomodoroState::Running {
            if let Some(target) = self.target {
                self.remaining = target - now;
                if self.remaining <= Duration::zero() {
                    self.remaining = Duration::zero();
                    self.state = PomodoroState::Finished;
                }
            }
        }
        self.state
    }

    /// Suffix appended to the configured title, e.g. "Pomodoro Running".
    pub fn state_label(&self) -> &'static str {
        match self.state {
            PomodoroState::Idle => "Stopped",
            PomodoroState::Running => "Running",
            PomodoroState::Paused => "Paused",
            PomodoroState::Finished => "Completed",
        }
    }

    /// `MM:SS` while counting, the configured finished text when done.
    pub fn display(&self, finished_text: &str) -> String {
        if self.state == PomodoroState::Finished {
            return finished_text.to_string();
        }
        let total = self.remaining.num_seconds().max(0);
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}
