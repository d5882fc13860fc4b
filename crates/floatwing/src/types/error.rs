/*! Error types for floatwing operations. */

use super::WindowId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use ts_rs::TS;

/// Errors that can occur during floatwing operations.
///
/// Lookups of unknown window ids are not errors: registry operations
/// return `None` for them.
#[derive(Debug, thiserror::Error)]
pub enum FloatwingError {
  #[error("Overlay permission not granted")]
  PermissionDenied,

  #[error("Window not found: {0}")]
  WindowNotFound(WindowId),

  #[error("Window already exists: {0}")]
  DuplicateWindow(WindowId),

  #[error("Invalid request [{code}]: {message}")]
  InvalidRequest { code: &'static str, message: String },

  #[error("Schema mismatch: {0}")]
  SchemaMismatch(String),

  #[error("Entrypoint could not be resolved: {0}")]
  EntrypointUnresolved(String),

  #[error("Launch callback could not be resolved: {0}")]
  CallbackUnresolved(i64),

  #[error("Window has been destroyed: {0}")]
  WindowDestroyed(WindowId),

  #[error("Service is not running")]
  ServiceUnavailable,

  #[error("No reply after {0:?}")]
  Timeout(Duration),

  #[error("Channel error: {0}")]
  Channel(String),

  #[error("Remote error [{code}]: {message}")]
  Remote { code: String, message: String },

  #[error("Settings error: {0}")]
  Settings(String),

  #[error("Platform error: {0}")]
  Platform(String),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl FloatwingError {
  pub fn invalid_request(code: &'static str, message: impl Into<String>) -> Self {
    Self::InvalidRequest {
      code,
      message: message.into(),
    }
  }

  /// Stable short code used on the wire.
  pub fn code(&self) -> &str {
    match self {
      Self::PermissionDenied => "permission_denied",
      Self::WindowNotFound(_) => "not_found",
      Self::DuplicateWindow(_) => "duplicate",
      Self::InvalidRequest { code, .. } => *code,
      Self::SchemaMismatch(_) => "schema_mismatch",
      Self::EntrypointUnresolved(_) | Self::CallbackUnresolved(_) => "unresolved_entrypoint",
      Self::WindowDestroyed(_) => "destroyed",
      Self::ServiceUnavailable => "service_unavailable",
      Self::Timeout(_) => "timeout",
      Self::Channel(_) => "channel",
      Self::Remote { code, .. } => code.as_str(),
      Self::Settings(_) => "settings",
      Self::Platform(_) => "platform",
      Self::Internal(_) => "internal",
    }
  }

  /// True for configuration errors that no retry can fix.
  pub const fn is_fatal(&self) -> bool {
    matches!(
      self,
      Self::EntrypointUnresolved(_) | Self::CallbackUnresolved(_)
    )
  }
}

impl From<serde_json::Error> for FloatwingError {
  fn from(e: serde_json::Error) -> Self {
    Self::SchemaMismatch(e.to_string())
  }
}

/// Result type for floatwing operations.
pub type FloatwingResult<T> = Result<T, FloatwingError>;

/// Error result as carried over a channel: a short code and a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorPayload {
  pub code: String,
  pub message: String,
}

impl ErrorPayload {
  pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
    Self {
      code: code.into(),
      message: message.into(),
    }
  }
}

impl From<&FloatwingError> for ErrorPayload {
  fn from(e: &FloatwingError) -> Self {
    let message = match e {
      FloatwingError::InvalidRequest { message, .. } | FloatwingError::Remote { message, .. } => {
        message.clone()
      }
      other => other.to_string(),
    };
    Self {
      code: e.code().to_string(),
      message,
    }
  }
}

impl From<ErrorPayload> for FloatwingError {
  fn from(payload: ErrorPayload) -> Self {
    Self::Remote {
      code: payload.code,
      message: payload.message,
    }
  }
}
