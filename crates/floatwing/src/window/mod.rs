/*!
Overlay window - one engine, one surface, one layout.

A `Window` is a cheap-clone handle. The service registry is its only
long-lived owner; everything else (the RPC layer, children, the simulator)
looks windows up by id and holds them briefly.

# Lifecycle

```text
Constructed -> Initialized -> Started <-> Paused
                                 \         /
                                  Destroyed
```

Soft destroy pauses the window and keeps its engine cached so a later
`start` resumes it. Hard destroy evicts the engine and drops the window from
the registry; every operation after that fails with `WindowDestroyed`.

# Events

Every event goes to the window's own engine, to the host engine when
`notify_plugin` is set, and to the parent window's engine if there is one.
Parents are looked up by id at delivery time, so a destroyed parent just
stops receiving.
*/

mod drag;

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;

use crate::platform::{PendingReply, Surface, UiEngine, WindowManager};
use crate::service::{Service, ServiceInner};
use crate::types::{
  Config, EngineKey, Envelope, FloatwingError, FloatwingResult, LayoutParams, Lifecycle,
  PlatformPolicy, Point, PointerEvent, WindowEvent, WindowId, WindowInfo, WINDOW_PREFIX,
};

use drag::{DragStep, DragTracker};

/// Everything a window is built from. Assembled by the service.
pub(crate) struct WindowParts {
  pub(crate) id: WindowId,
  pub(crate) engine_key: EngineKey,
  pub(crate) engine: Arc<dyn UiEngine>,
  pub(crate) surface: Box<dyn Surface>,
  pub(crate) window_manager: Arc<dyn WindowManager>,
  pub(crate) policy: PlatformPolicy,
  pub(crate) config: Config,
  pub(crate) parent: Option<WindowId>,
  pub(crate) service: Weak<ServiceInner>,
}

struct WindowInner {
  id: WindowId,
  engine_key: EngineKey,
  engine: Arc<dyn UiEngine>,
  surface: Box<dyn Surface>,
  window_manager: Arc<dyn WindowManager>,
  policy: PlatformPolicy,
  parent: Option<WindowId>,
  service: Weak<ServiceInner>,
  state: Mutex<WindowState>,
}

struct WindowState {
  config: Config,
  layout: LayoutParams,
  lifecycle: Lifecycle,
  drag: DragTracker,
}

/// Handle to an overlay window. Clone is cheap.
#[derive(Clone)]
pub struct Window {
  inner: Arc<WindowInner>,
}

impl std::fmt::Debug for Window {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Window")
      .field("id", &self.inner.id)
      .field("parent", &self.inner.parent)
      .field("lifecycle", &self.lifecycle())
      .finish_non_exhaustive()
  }
}

impl Window {
  pub(crate) fn new(parts: WindowParts) -> Self {
    let layout = parts.config.to_layout_params(&parts.policy);
    Self {
      inner: Arc::new(WindowInner {
        id: parts.id,
        engine_key: parts.engine_key,
        engine: parts.engine,
        surface: parts.surface,
        window_manager: parts.window_manager,
        policy: parts.policy,
        parent: parts.parent,
        service: parts.service,
        state: Mutex::new(WindowState {
          config: parts.config,
          layout,
          lifecycle: Lifecycle::Constructed,
          drag: DragTracker::default(),
        }),
      }),
    }
  }

  pub fn id(&self) -> &WindowId {
    &self.inner.id
  }

  pub fn engine_key(&self) -> &EngineKey {
    &self.inner.engine_key
  }

  /// Id of the window that created this one, if any.
  pub fn parent(&self) -> Option<&WindowId> {
    self.inner.parent.as_ref()
  }

  pub fn lifecycle(&self) -> Lifecycle {
    self.inner.state.lock().lifecycle
  }

  pub fn is_started(&self) -> bool {
    self.lifecycle() == Lifecycle::Started
  }

  /// Effective config (launch fields plus every applied patch).
  pub fn config(&self) -> Config {
    self.inner.state.lock().config.clone()
  }

  pub fn layout_params(&self) -> LayoutParams {
    self.inner.state.lock().layout
  }

  /// Public representation, with the service's display settings.
  pub fn info(&self) -> WindowInfo {
    let config = self.config();
    let (pixel_ratio, system) = match self.service() {
      Some(service) => service.display(),
      None => (crate::settings::DEFAULT_PIXEL_RATIO, serde_json::Map::new()),
    };
    WindowInfo {
      id: self.inner.id.clone(),
      config,
      pixel_ratio,
      system,
    }
  }

  /// Same window instance, not merely the same id.
  pub(crate) fn same_as(&self, other: &Window) -> bool {
    Arc::ptr_eq(&self.inner, &other.inner)
  }

  fn service(&self) -> Option<Service> {
    self.inner.service.upgrade().map(Service::from_inner)
  }

  /// Apply the focus and visibility the config asks for.
  pub(crate) fn init(&self) {
    let (focusable, visible) = {
      let mut state = self.inner.state.lock();
      if state.lifecycle != Lifecycle::Constructed {
        return;
      }
      state.lifecycle = Lifecycle::Initialized;
      (state.config.focusable, state.config.visible)
    };

    if let Some(focusable) = focusable {
      self.inner.surface.set_focusable(focusable);
    }
    if let Some(visible) = visible {
      self.emit(WindowEvent::Visible(visible));
      self.inner.surface.set_visible(visible);
    }
    log::debug!("[window] initialized {}", self.inner.id);
  }

  /// Attach the surface to the window manager. Returns `Ok(true)` if already started.
  pub fn start(&self) -> FloatwingResult<bool> {
    let mut state = self.inner.state.lock();
    match state.lifecycle {
      Lifecycle::Started => {
        log::debug!("[window] {} already started", self.inner.id);
        return Ok(true);
      }
      Lifecycle::Destroyed => return Err(FloatwingError::WindowDestroyed(self.inner.id.clone())),
      Lifecycle::Constructed | Lifecycle::Initialized | Lifecycle::Paused => {}
    }

    log::info!("[window] start {}", self.inner.id);
    self.inner.engine.app_resumed();
    self.emit(WindowEvent::Resumed);

    self.inner.surface.attach(&self.inner.engine);
    if let Err(e) = self
      .inner
      .window_manager
      .add_view(self.inner.surface.as_ref(), &state.layout)
    {
      log::error!("[window] failed to add {} to the window manager: {e}", self.inner.id);
      self.inner.surface.detach();
      self.inner.engine.app_paused();
      return Err(e);
    }

    state.lifecycle = Lifecycle::Started;
    self.emit(WindowEvent::Started);
    Ok(true)
  }

  /// Show or hide the surface. Leaves the lifecycle alone.
  pub fn set_visible(&self, visible: bool) -> FloatwingResult<bool> {
    self.ensure_alive()?;
    log::debug!("[window] set {} visible: {visible}", self.inner.id);
    self.emit(WindowEvent::Visible(visible));
    self.inner.surface.set_visible(visible);
    Ok(true)
  }

  /// Merge `patch` into the config and relayout if attached.
  pub fn update(&self, patch: &Config) -> FloatwingResult<WindowInfo> {
    {
      let mut state = self.inner.state.lock();
      self.update_locked(&mut state, patch)?;
    }
    Ok(self.info())
  }

  fn update_locked(&self, state: &mut WindowState, patch: &Config) -> FloatwingResult<()> {
    if state.lifecycle == Lifecycle::Destroyed {
      return Err(FloatwingError::WindowDestroyed(self.inner.id.clone()));
    }

    state.config.apply(patch);
    state.layout = state.config.to_layout_params(&self.inner.policy);
    if state.lifecycle == Lifecycle::Started {
      self
        .inner
        .window_manager
        .update_view_layout(self.inner.surface.as_ref(), &state.layout)?;
    }
    Ok(())
  }

  /// Tear the window down.
  ///
  /// Soft (`force = false`) detaches and pauses, keeping the engine cached.
  /// Hard also evicts and destroys the engine and unregisters the window.
  /// Returns false if the window was already destroyed.
  pub fn destroy(&self, force: bool) -> bool {
    let mut state = self.inner.state.lock();
    if state.lifecycle == Lifecycle::Destroyed {
      log::warn!("[window] {} is already destroyed", self.inner.id);
      return false;
    }

    log::info!("[window] destroy {} (force: {force})", self.inner.id);
    if state.lifecycle == Lifecycle::Started {
      if let Err(e) = self.inner.window_manager.remove_view(self.inner.surface.as_ref()) {
        log::warn!("[window] failed to remove {} from the window manager: {e}", self.inner.id);
      }
    }
    self.inner.surface.detach();

    if force {
      state.lifecycle = Lifecycle::Destroyed;
      if let Some(service) = self.service() {
        service.forget_window(self);
      }
      self.emit(WindowEvent::Destroy);
      self.inner.engine.destroy();
    } else {
      self.inner.engine.app_paused();
      state.lifecycle = Lifecycle::Paused;
      self.emit(WindowEvent::Paused);
    }
    true
  }

  /// Emit a lifecycle or gesture event.
  pub fn emit(&self, event: WindowEvent) {
    let data = event.data();
    self.emit_with(WINDOW_PREFIX, event.name(), data, true);
  }

  /// Emit an arbitrary event under `prefix`.
  pub fn emit_with(&self, prefix: &str, name: &str, data: Value, notify_plugin: bool) {
    let envelope = Envelope::new(prefix, name, self.inner.id.clone(), data);
    log::debug!("[window] emit {} from {}", envelope.name, self.inner.id);

    self.deliver(&envelope);

    let service = self.service();
    if notify_plugin {
      if let Some(service) = &service {
        service.notify_main(&envelope);
      }
    }

    let Some(parent_id) = &self.inner.parent else {
      return;
    };
    match service.and_then(|s| s.window(parent_id)) {
      Some(parent) => parent.deliver(&envelope),
      None => log::debug!("[window] parent {parent_id} of {} is gone", self.inner.id),
    }
  }

  /// Deliver on this window's own message channel only.
  pub(crate) fn deliver(&self, envelope: &Envelope) {
    self.inner.engine.send_message(envelope);
  }

  /// Call a method on this window's control channel.
  pub(crate) fn invoke(&self, method: &str, args: Value) -> PendingReply {
    self.inner.engine.invoke(method, args)
  }

  /// Share `data` with another window, or with the host when `target` is `None`.
  pub async fn share_data(&self, target: Option<WindowId>, data: Value) -> FloatwingResult<Value> {
    self.ensure_alive()?;
    let service = self.service().ok_or(FloatwingError::ServiceUnavailable)?;
    service
      .share_data(Some(self.inner.id.clone()), target, data)
      .await
  }

  /// Create a window whose events are also delivered to this one.
  pub fn create_child(
    &self,
    id: WindowId,
    config: Config,
    start: bool,
  ) -> FloatwingResult<Option<WindowInfo>> {
    self.ensure_alive()?;
    let service = self.service().ok_or(FloatwingError::ServiceUnavailable)?;
    service.create_child(&self.inner.id, id, config, start)
  }

  /// Feed a pointer sample. Returns true if the touch was consumed by a drag.
  pub fn on_touch(&self, event: &PointerEvent) -> bool {
    let mut state = self.inner.state.lock();
    if state.lifecycle == Lifecycle::Destroyed || !state.config.is_draggable() {
      return false;
    }

    match state.drag.on_pointer(event) {
      DragStep::Pass => false,
      DragStep::Move { dx, dy, first } => {
        let (ox, oy) = state.layout.origin();
        let (x, y) = (offset(ox, dx), offset(oy, dy));
        let position = Point::from((x, y));
        if first {
          self.emit(WindowEvent::DragStart(position));
        }
        if let Err(e) = self.update_locked(&mut state, &Config::position(x, y)) {
          log::warn!("[window] failed to move {} while dragging: {e}", self.inner.id);
        }
        self.emit(WindowEvent::Dragging(position));
        true
      }
      DragStep::End(raw) => {
        self.emit(WindowEvent::DragEnd(raw));
        true
      }
    }
  }

  fn ensure_alive(&self) -> FloatwingResult<()> {
    if self.lifecycle() == Lifecycle::Destroyed {
      return Err(FloatwingError::WindowDestroyed(self.inner.id.clone()));
    }
    Ok(())
  }
}

#[allow(clippy::cast_possible_truncation)]
fn offset(origin: i32, delta: f64) -> i32 {
  origin.saturating_add(delta.round() as i32)
}
