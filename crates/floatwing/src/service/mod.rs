/*!
Service - the long-lived owner of every overlay window.

# Module Structure

- `mod.rs` - Service struct, builder, config, events, display settings
- `registry.rs` - id → window map
- `windows.rs` - create/start/close/show/update by id
- `share.rs` - request/response data exchange between windows and the host
- `readiness.rs` - `ServiceSlot`, the "service is running" signal

# Example

```ignore
let service = Service::builder(window_manager, engine_group, surfaces)
    .host(host)
    .settings(settings)
    .build();

let info = service.create_window("w1".into(), config, true)?;

let mut events = service.subscribe();
while let Ok(envelope) = events.recv().await {
    // window.started, window.dragging, ...
}
```
*/

mod readiness;
mod registry;
mod share;
mod windows;

pub use readiness::ServiceSlot;
pub(crate) use registry::Registry;

use readiness::WeakServiceSlot;

use std::sync::Arc;
use std::time::Duration;

use async_broadcast::{InactiveReceiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};

use crate::engine::EngineCache;
use crate::platform::{EngineGroup, ServiceHost, SurfaceFactory, UiEngine, WindowManager};
use crate::settings::{Settings, DEFAULT_PIXEL_RATIO};
use crate::types::{Envelope, NotificationOptions, PlatformPolicy, WindowId, WindowInfo};
use crate::window::Window;

/// Default capacity of the event broadcast channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Default time to wait for a `share_data` reply.
pub const SHARE_TIMEOUT: Duration = Duration::from_secs(5);

/// Service tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
  /// Capacity of the event broadcast channel. Oldest events are dropped when full.
  /// Default: 1000.
  pub event_channel_capacity: usize,
  /// How long `share_data` waits for the receiving side. Default: 5s.
  pub share_timeout: Duration,
  /// Version-dependent platform choices.
  pub policy: PlatformPolicy,
}

impl Default for ServiceConfig {
  fn default() -> Self {
    Self {
      event_channel_capacity: EVENT_CHANNEL_CAPACITY,
      share_timeout: SHARE_TIMEOUT,
      policy: PlatformPolicy::default(),
    }
  }
}

struct Display {
  pixel_ratio: f64,
  system: Map<String, Value>,
}

pub(crate) struct ServiceInner {
  registry: RwLock<Registry>,
  engines: Mutex<EngineCache>,
  window_manager: Arc<dyn WindowManager>,
  engine_group: Arc<dyn EngineGroup>,
  surfaces: Arc<dyn SurfaceFactory>,
  host: Option<Arc<dyn ServiceHost>>,
  slot: Option<WeakServiceSlot>,
  main_channel: RwLock<Option<Arc<dyn UiEngine>>>,
  events_tx: Sender<Envelope>,
  events_keepalive: InactiveReceiver<Envelope>,
  display: RwLock<Display>,
  config: ServiceConfig,
}

/// Handle to the running service. Clone is cheap (Arc bump).
#[derive(Clone)]
pub struct Service {
  inner: Arc<ServiceInner>,
}

impl std::fmt::Debug for Service {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Service")
      .field("windows", &self.read(Registry::len))
      .finish_non_exhaustive()
  }
}

/// Builder for a [`Service`].
///
/// # Example
///
/// ```ignore
/// let service = Service::builder(window_manager, engine_group, surfaces)
///     .share_timeout(Duration::from_secs(2))
///     .build();
/// ```
#[must_use = "Builder does nothing until .build() is called"]
pub struct ServiceBuilder {
  window_manager: Arc<dyn WindowManager>,
  engine_group: Arc<dyn EngineGroup>,
  surfaces: Arc<dyn SurfaceFactory>,
  host: Option<Arc<dyn ServiceHost>>,
  slot: Option<WeakServiceSlot>,
  settings: Option<Settings>,
  config: ServiceConfig,
}

impl std::fmt::Debug for ServiceBuilder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ServiceBuilder")
      .field("config", &self.config)
      .finish_non_exhaustive()
  }
}

impl ServiceBuilder {
  /// OS service component, needed for stop/promote/demote.
  pub fn host(mut self, host: Arc<dyn ServiceHost>) -> Self {
    self.host = Some(host);
    self
  }

  /// Slot this service is published to. A successful `stop` withdraws it from there.
  pub fn slot(mut self, slot: &ServiceSlot) -> Self {
    self.slot = Some(slot.downgrade());
    self
  }

  /// Persisted display settings. Defaults apply when absent.
  pub fn settings(mut self, settings: Settings) -> Self {
    self.settings = Some(settings);
    self
  }

  pub const fn config(mut self, config: ServiceConfig) -> Self {
    self.config = config;
    self
  }

  pub const fn policy(mut self, policy: PlatformPolicy) -> Self {
    self.config.policy = policy;
    self
  }

  pub const fn share_timeout(mut self, timeout: Duration) -> Self {
    self.config.share_timeout = timeout;
    self
  }

  #[must_use]
  pub fn build(self) -> Service {
    let pixel_ratio = self
      .settings
      .as_ref()
      .and_then(Settings::pixel_ratio)
      .unwrap_or(DEFAULT_PIXEL_RATIO);
    let system = self
      .settings
      .as_ref()
      .and_then(Settings::system_config)
      .unwrap_or_default();
    log::info!("[service] starting with pixel ratio {pixel_ratio}");

    let (mut tx, rx) = async_broadcast::broadcast(self.config.event_channel_capacity.max(1));
    tx.set_overflow(true); // Drop oldest messages when full

    Service {
      inner: Arc::new(ServiceInner {
        registry: RwLock::new(Registry::new()),
        engines: Mutex::new(EngineCache::new()),
        window_manager: self.window_manager,
        engine_group: self.engine_group,
        surfaces: self.surfaces,
        host: self.host,
        slot: self.slot,
        main_channel: RwLock::new(None),
        events_tx: tx,
        events_keepalive: rx.deactivate(),
        display: RwLock::new(Display { pixel_ratio, system }),
        config: self.config,
      }),
    }
  }
}

impl Service {
  pub fn builder(
    window_manager: Arc<dyn WindowManager>,
    engine_group: Arc<dyn EngineGroup>,
    surfaces: Arc<dyn SurfaceFactory>,
  ) -> ServiceBuilder {
    ServiceBuilder {
      window_manager,
      engine_group,
      surfaces,
      host: None,
      slot: None,
      settings: None,
      config: ServiceConfig::default(),
    }
  }

  pub(crate) fn from_inner(inner: Arc<ServiceInner>) -> Self {
    Self { inner }
  }

  pub fn config(&self) -> &ServiceConfig {
    &self.inner.config
  }

  /// Same service instance.
  pub fn same_as(&self, other: &Service) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  /// Subscribe to every envelope the host engine is sent.
  pub fn subscribe(&self) -> async_broadcast::Receiver<Envelope> {
    self.inner.events_keepalive.activate_cloned()
  }

  /// Install the service request channel on the host engine.
  ///
  /// Events with `notify_plugin` set are delivered to it from now on.
  pub fn install_main_channel(&self, engine: Arc<dyn UiEngine>) {
    log::info!("[service] main engine channel installed");
    *self.inner.main_channel.write() = Some(engine);
  }

  pub fn has_main_channel(&self) -> bool {
    self.inner.main_channel.read().is_some()
  }

  pub(crate) fn main_channel(&self) -> Option<Arc<dyn UiEngine>> {
    self.inner.main_channel.read().clone()
  }

  /// Deliver to the host engine and to subscribers.
  pub(crate) fn notify_main(&self, envelope: &Envelope) {
    if let Some(main) = self.main_channel() {
      main.send_message(envelope);
    }
    match self.inner.events_tx.try_broadcast(envelope.clone()) {
      Ok(_) | Err(async_broadcast::TrySendError::Inactive(_)) => {}
      Err(e) => log::warn!("[service] failed to broadcast {}: {e}", envelope.name),
    }
  }

  /// Pixel ratio and system config shared by every window.
  pub fn display(&self) -> (f64, Map<String, Value>) {
    let display = self.inner.display.read();
    (display.pixel_ratio, display.system.clone())
  }

  pub fn set_pixel_ratio(&self, pixel_ratio: f64) {
    self.inner.display.write().pixel_ratio = pixel_ratio;
  }

  pub fn set_system_config(&self, system: Map<String, Value>) {
    self.inner.display.write().system = system;
  }

  /// Look a window up by id.
  pub fn window(&self, id: &WindowId) -> Option<Window> {
    self.read(|r| r.get(id))
  }

  /// Public representation of every window, ordered by id.
  pub fn windows(&self) -> Vec<WindowInfo> {
    self
      .read(Registry::windows)
      .iter()
      .map(Window::info)
      .collect()
  }

  pub fn window_count(&self) -> usize {
    self.read(Registry::len)
  }

  /// Drop a hard-destroyed window's registry entry and cached engine.
  pub(crate) fn forget_window(&self, window: &Window) {
    if self.write(|r| r.remove(window)).is_none() {
      log::debug!("[service] {} was not registered", window.id());
    }
    self.inner.engines.lock().evict(window.engine_key());
  }

  /// Ask the OS to stop the service.
  ///
  /// Once the host agrees, every window is destroyed and the service is
  /// withdrawn from its slot, so the next request starts a fresh one.
  pub fn stop(&self) -> bool {
    log::info!("[service] stop requested");
    let stopped = self.inner.host.as_ref().is_some_and(|host| host.stop_self());
    if !stopped {
      log::warn!("[service] host refused to stop");
      return false;
    }

    self.shutdown();
    if let Some(slot) = self.inner.slot.as_ref().and_then(WeakServiceSlot::upgrade) {
      slot.withdraw(self);
    }
    true
  }

  /// Move the service to the foreground with a notification.
  pub fn promote(&self, options: &NotificationOptions) -> bool {
    if !self.inner.config.policy.supports_foreground_promotion() {
      log::error!(
        "[service] foreground promotion needs sdk {} or newer",
        PlatformPolicy::SDK_OVERLAY_TYPE
      );
      return false;
    }
    log::info!("[service] promote to foreground: {}", options.title);
    self.inner.host.as_ref().is_some_and(|host| host.promote(options))
  }

  pub fn demote(&self) -> bool {
    log::info!("[service] demote to background");
    self.inner.host.as_ref().is_some_and(|host| host.demote())
  }

  /// Hard-destroy every window and clear the registry.
  pub fn shutdown(&self) {
    let windows = self.read(Registry::windows);
    log::info!("[service] shutting down {} window(s)", windows.len());
    for window in windows {
      window.destroy(true);
    }
    self.write(Registry::clear);
    *self.inner.main_channel.write() = None;
  }

  /// Read the registry. Never call into windows or the platform inside the closure.
  #[inline]
  pub(crate) fn read<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
    f(&self.inner.registry.read())
  }

  /// Write the registry. Never call into windows or the platform inside the closure.
  #[inline]
  pub(crate) fn write<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
    f(&mut self.inner.registry.write())
  }
}
