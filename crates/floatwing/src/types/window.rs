/*! Public representations of windows and of the service state. */

use super::{Config, WindowId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

/// Window representation returned by create, update and sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WindowInfo {
  pub id: WindowId,
  /// Effective config. Only fields that are set appear on the wire.
  pub config: Config,
  pub pixel_ratio: f64,
  /// Opaque system config blob shared by every window.
  #[ts(type = "Record<string, unknown>")]
  pub system: Map<String, Value>,
}

/// Lifecycle state of a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Lifecycle {
  Constructed,
  Initialized,
  Started,
  Paused,
  /// Terminal. The window is out of the registry and its engine is gone.
  Destroyed,
}

/// Options for the notification shown while the service runs in the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct NotificationOptions {
  pub title: String,
  pub description: String,
  pub show_when: bool,
  pub ticker: Option<String>,
  pub sub_text: Option<String>,
}

impl Default for NotificationOptions {
  fn default() -> Self {
    Self {
      title: "Floatwing Service".to_string(),
      description: "Floatwing service is running".to_string(),
      show_when: false,
      ticker: None,
      sub_text: None,
    }
  }
}

/// Result of the host's first-run bootstrap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InitStatus {
  pub permission_granted: bool,
  pub service_running: bool,
  pub windows: Vec<WindowInfo>,
  /// True if this call persisted the pixel ratio.
  pub pixel_ratio_updated: bool,
  /// True if this call persisted the system config.
  pub system_config_updated: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn window_info_wire_shape() {
    let info = WindowInfo {
      id: WindowId::from("w1"),
      config: Config {
        width: Some(100),
        ..Config::default()
      },
      pixel_ratio: 2.0,
      system: Map::new(),
    };
    assert_eq!(
      serde_json::to_value(&info).unwrap(),
      json!({ "id": "w1", "config": { "width": 100 }, "pixelRatio": 2.0, "system": {} })
    );
  }

  #[test]
  fn notification_options_fill_defaults() {
    let options: NotificationOptions =
      serde_json::from_value(json!({ "title": "Timer", "subText": "3 min" })).unwrap();
    assert_eq!(options.title, "Timer");
    assert_eq!(options.description, "Floatwing service is running");
    assert_eq!(options.sub_text.as_deref(), Some("3 min"));
    assert!(!options.show_when);
  }
}
