//! Error types for the airsinkd service.
//!
//! This module defines all error types that can occur while polling the
//! accessory status and while driving the external audio server. Sink
//! operations never let these escape past their boundary; they are caught,
//! logged and converted to a boolean failure signal at the call site.

use std::time::Duration;

use thiserror::Error;

/// Main error type for the airsinkd service.
#[derive(Error, Debug)]
pub enum AirSinkError {
   #[error("I/O error: {0}")]
   Io(#[from] std::io::Error),

   #[error("`{command}` timed out after {timeout:?}")]
   CommandTimeout { command: String, timeout: Duration },

   #[error("`{command}` failed: {message}")]
   CommandFailed { command: String, message: String },

   #[error("command produced non-UTF-8 output: {0}")]
   InvalidOutput(#[from] std::string::FromUtf8Error),

   #[error("failed to parse status payload: {0}")]
   StatusParse(#[from] serde_json::Error),

   #[error("invalid status payload: {0}")]
   InvalidStatus(&'static str),

   #[error("status_command must not be empty")]
   EmptyStatusCommand,

   #[error("pactl is not installed or not in PATH")]
   PactlNotFound,

   #[error("Could not determine config directory")]
   ConfigDirNotFound,

   #[error("TOML parsing error: {0}")]
   TomlParse(#[from] toml::de::Error),

   #[error("TOML serialization error: {0}")]
   TomlSerialize(#[from] toml::ser::Error),
}

/// Convenience type alias for Results with `AirSinkError`.
pub type Result<T> = std::result::Result<T, AirSinkError>;
