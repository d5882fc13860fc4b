/*! Event types delivered over engine message channels. */

use super::{Point, WindowId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use ts_rs::TS;

/// Namespace of window lifecycle and gesture events.
pub const WINDOW_PREFIX: &str = "window";
/// Namespace of data exchange events and calls.
pub const DATA_PREFIX: &str = "data";
/// Method name of the point-to-point data exchange.
pub const SHARE_METHOD: &str = "data.share";

/// Envelope every event travels in: `{name, id, data}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Envelope {
  /// Dot-namespaced event name, e.g. `window.started`.
  pub name: String,
  /// Window the event originates from.
  pub id: WindowId,
  #[ts(type = "unknown")]
  pub data: Value,
}

impl Envelope {
  pub fn new(prefix: &str, name: &str, id: WindowId, data: Value) -> Self {
    Self {
      name: format!("{prefix}.{name}"),
      id,
      data,
    }
  }
}

/// Events a window emits about itself.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
  /// Window constructed. `fresh_engine` is false when the engine came from cache.
  Created { fresh_engine: bool },
  Resumed,
  Started,
  Paused,
  Destroy,
  Visible(bool),
  /// First qualifying drag move, with the window's new position.
  DragStart(Point),
  /// Window moved by a drag, with its new position.
  Dragging(Point),
  /// Drag released, with the raw pointer position.
  DragEnd(Point),
}

impl WindowEvent {
  /// Event name without the `window.` namespace.
  pub const fn name(&self) -> &'static str {
    match self {
      Self::Created { .. } => "created",
      Self::Resumed => "resumed",
      Self::Started => "started",
      Self::Paused => "paused",
      Self::Destroy => "destroy",
      Self::Visible(_) => "visible",
      Self::DragStart(_) => "drag_start",
      Self::Dragging(_) => "dragging",
      Self::DragEnd(_) => "drag_end",
    }
  }

  pub fn data(&self) -> Value {
    match self {
      Self::Created { fresh_engine } => json!(fresh_engine),
      Self::Visible(visible) => json!(visible),
      Self::DragStart(p) | Self::Dragging(p) | Self::DragEnd(p) => json!([p.x, p.y]),
      Self::Resumed | Self::Started | Self::Paused | Self::Destroy => Value::Null,
    }
  }

  pub fn into_envelope(self, id: WindowId) -> Envelope {
    Envelope::new(WINDOW_PREFIX, self.name(), id, self.data())
  }
}
