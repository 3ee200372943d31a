//! Custom error types for the LifeTimer application

#![allow(dead_code)]

use thiserror::Error;

/// Main error type for LifeTimer operations
#[derive(Error, Debug)]
pub enum LifeTimerError {
    /// Initialization-order or wiring defect; fail fast, not recoverable at runtime.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Window creation failed: {0}")]
    WindowCreation(String),

    #[cfg(target_os = "windows")]
    #[error("Windows API error: {0}")]
    WindowsApi(#[from] windows::core::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for LifeTimer operations
pub type LifeTimerResult<T> = Result<T, LifeTimerError>;
