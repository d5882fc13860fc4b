/*! Branded ID types for windows and their engines. */

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Prefix namespacing engine cache keys away from other cached engines.
pub const ENGINE_KEY_PREFIX: &str = "floatwing_engine_";

/// Window identifier. Unique within a service's registry.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, Display, From, Into,
)]
#[ts(export)]
pub struct WindowId(pub String);

impl WindowId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl Default for WindowId {
  fn default() -> Self {
    Self("default".to_string())
  }
}

impl From<&str> for WindowId {
  fn from(id: &str) -> Self {
    Self(id.to_string())
  }
}

/// Key of a window's engine in the engine cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct EngineKey(String);

impl EngineKey {
  /// Cache key for the engine backing `window`.
  pub fn for_window(window: &WindowId) -> Self {
    Self(format!("{ENGINE_KEY_PREFIX}{window}"))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_window_id() {
    assert_eq!(WindowId::default().as_str(), "default");
  }

  #[test]
  fn engine_key_is_namespaced() {
    let key = EngineKey::for_window(&WindowId::from("w1"));
    assert_eq!(key.as_str(), "floatwing_engine_w1");
    assert_ne!(key, EngineKey::for_window(&WindowId::from("w2")));
  }

  #[test]
  fn window_id_serializes_as_plain_string() {
    let json = serde_json::to_string(&WindowId::from("w1")).unwrap();
    assert_eq!(json, "\"w1\"");
  }
}
