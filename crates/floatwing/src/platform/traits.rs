/*!
Platform abstraction traits.

These traits define the contract between core code and the platform: the UI
runtime that runs engines, the window manager that composites surfaces, and
the OS service/permission/storage facilities. Core code only uses these
traits, never platform types directly.

Implementations are called from whatever thread drives the core and must not
call back into the `Service` synchronously.
*/

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::oneshot;

use crate::types::{
  EngineKey, Envelope, ErrorPayload, FloatwingResult, LayoutParams, NotificationOptions, WindowId,
};

/// Reply to an `invoke` on an engine's control channel.
///
/// Dropping the sender without replying is reported as a channel error.
pub type PendingReply = oneshot::Receiver<Result<Value, ErrorPayload>>;

/// One running UI engine instance.
pub trait UiEngine: Send + Sync {
  /// Signal the application lifecycle as resumed.
  fn app_resumed(&self);

  /// Signal the application lifecycle as paused.
  fn app_paused(&self);

  /// Tear the engine down. No further calls follow.
  fn destroy(&self);

  /// Deliver an event on the engine's message channel. Fire-and-forget.
  fn send_message(&self, envelope: &Envelope);

  /// Invoke a method on the engine's control channel and wait for its result.
  fn invoke(&self, method: &str, args: Value) -> PendingReply;
}

/// Starts new engines. Shares resources between the engines it creates.
pub trait EngineGroup: Send + Sync {
  /// Start an engine running `entrypoint`, navigated to `route`.
  ///
  /// `key` names the engine for diagnostics only.
  fn run_entrypoint(
    &self,
    key: &EngineKey,
    entrypoint: &str,
    route: Option<&str>,
  ) -> FloatwingResult<Arc<dyn UiEngine>>;

  /// Start an engine through a pre-registered launch callback.
  fn run_callback(&self, key: &EngineKey, handle: i64) -> FloatwingResult<Arc<dyn UiEngine>>;
}

/// Native display surface an engine renders into.
pub trait Surface: Send + Sync {
  /// Window this surface belongs to.
  fn window_id(&self) -> &WindowId;

  fn attach(&self, engine: &Arc<dyn UiEngine>);

  fn detach(&self);

  fn set_visible(&self, visible: bool);

  fn set_focusable(&self, focusable: bool);
}

/// Creates surfaces for new windows.
pub trait SurfaceFactory: Send + Sync {
  fn create_surface(&self, window: &WindowId) -> Box<dyn Surface>;
}

/// System window manager. One per process, shared by every window.
pub trait WindowManager: Send + Sync {
  fn add_view(&self, surface: &dyn Surface, params: &LayoutParams) -> FloatwingResult<()>;

  fn update_view_layout(&self, surface: &dyn Surface, params: &LayoutParams)
    -> FloatwingResult<()>;

  fn remove_view(&self, surface: &dyn Surface) -> FloatwingResult<()>;
}

/// Capabilities of the OS service component hosting the `Service`.
pub trait ServiceHost: Send + Sync {
  /// Ask the OS to stop the service. Returns whether a running service was stopped.
  ///
  /// On true the `Service` destroys its windows and withdraws itself from its
  /// `ServiceSlot`; the host does not need to call back.
  fn stop_self(&self) -> bool;

  /// Move the service to the foreground with a notification.
  fn promote(&self, options: &NotificationOptions) -> bool;

  /// Move the service back to the background.
  fn demote(&self) -> bool;
}

/// Overlay permission checks.
pub trait Permissions: Send + Sync {
  fn has_overlay_permission(&self) -> bool;

  /// Open the system settings page granting the permission.
  ///
  /// Returns false when the platform has no such page. The platform reports
  /// the user's return through `Plugin::on_permission_result`.
  fn open_permission_setting(&self) -> bool;
}

/// Starts the OS service process that will publish a `Service`.
pub trait ServiceLauncher: Send + Sync {
  fn is_running(&self) -> bool;

  /// Request the service start. Readiness is signalled through a `ServiceSlot`.
  fn launch(&self) -> bool;
}

/// Persisted key-value settings that outlive the process.
pub trait SettingsStore: Send + Sync {
  fn get(&self, key: &str) -> Option<Value>;

  fn put(&self, key: &str, value: Value) -> FloatwingResult<()>;
}
