/*!
Headless platform - in-memory implementations of every platform trait.

Everything records what it was asked to do so tests (and the simulator) can
inspect it afterwards. The window manager is strict: adding a view twice or
removing one that is not there is an error, the same way the real one
throws.
*/

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;

use super::{
  EngineGroup, PendingReply, Permissions, ServiceHost, ServiceLauncher, Surface, SurfaceFactory,
  UiEngine, WindowManager,
};
use crate::plugin::{Plugin, PluginBuilder};
use crate::service::{Service, ServiceBuilder, ServiceConfig, ServiceSlot};
use crate::settings::Settings;
use crate::types::{
  EngineKey, Envelope, ErrorPayload, FloatwingError, FloatwingResult, LayoutParams,
  NotificationOptions, WindowId, ENGINE_KEY_PREFIX,
};

/// Called with the engine label and every envelope an engine receives.
pub type MessageListener = Arc<dyn Fn(&str, &Envelope) + Send + Sync>;

type Reply = Result<Value, ErrorPayload>;

/// How a headless engine answers `invoke`.
#[derive(Debug, Clone, Default)]
pub enum ReplyMode {
  /// Answer with the call's arguments.
  #[default]
  Echo,
  Value(Value),
  Error(ErrorPayload),
  /// Keep the reply sender and never answer.
  Hold,
  /// Drop the reply sender without answering.
  Drop,
}

#[derive(Default)]
struct EngineState {
  resumed: usize,
  paused: usize,
  destroyed: bool,
  messages: Vec<Envelope>,
  invocations: Vec<(String, Value)>,
  reply: ReplyMode,
  held: Vec<oneshot::Sender<Reply>>,
}

/// Recording UI engine.
pub struct HeadlessEngine {
  label: String,
  state: Mutex<EngineState>,
  listener: Option<MessageListener>,
}

impl std::fmt::Debug for HeadlessEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HeadlessEngine")
      .field("label", &self.label)
      .finish_non_exhaustive()
  }
}

impl HeadlessEngine {
  pub fn new(label: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      state: Mutex::new(EngineState::default()),
      listener: None,
    }
  }

  #[must_use]
  pub fn with_listener(mut self, listener: MessageListener) -> Self {
    self.listener = Some(listener);
    self
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn set_reply(&self, reply: ReplyMode) {
    self.state.lock().reply = reply;
  }

  pub fn resumed(&self) -> usize {
    self.state.lock().resumed
  }

  pub fn paused(&self) -> usize {
    self.state.lock().paused
  }

  pub fn is_destroyed(&self) -> bool {
    self.state.lock().destroyed
  }

  /// Every envelope received, oldest first.
  pub fn messages(&self) -> Vec<Envelope> {
    self.state.lock().messages.clone()
  }

  pub fn message_names(&self) -> Vec<String> {
    self.state.lock().messages.iter().map(|m| m.name.clone()).collect()
  }

  /// Every `(method, args)` invoked, oldest first.
  pub fn invocations(&self) -> Vec<(String, Value)> {
    self.state.lock().invocations.clone()
  }
}

impl UiEngine for HeadlessEngine {
  fn app_resumed(&self) {
    self.state.lock().resumed += 1;
  }

  fn app_paused(&self) {
    self.state.lock().paused += 1;
  }

  fn destroy(&self) {
    self.state.lock().destroyed = true;
  }

  fn send_message(&self, envelope: &Envelope) {
    self.state.lock().messages.push(envelope.clone());
    if let Some(listener) = &self.listener {
      listener(&self.label, envelope);
    }
  }

  fn invoke(&self, method: &str, args: Value) -> PendingReply {
    let (tx, rx) = oneshot::channel();
    let mut state = self.state.lock();
    state.invocations.push((method.to_string(), args.clone()));
    match state.reply.clone() {
      ReplyMode::Echo => drop(tx.send(Ok(args))),
      ReplyMode::Value(value) => drop(tx.send(Ok(value))),
      ReplyMode::Error(error) => drop(tx.send(Err(error))),
      ReplyMode::Hold => state.held.push(tx),
      ReplyMode::Drop => drop(tx),
    }
    rx
  }
}

/// One engine launch, as requested by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
  Entrypoint { entry: String, route: Option<String> },
  Callback(i64),
}

#[derive(Default)]
struct GroupState {
  launches: Vec<Launch>,
  callbacks: Vec<i64>,
  rejected: Vec<String>,
  engines: HashMap<EngineKey, Arc<HeadlessEngine>>,
  listener: Option<MessageListener>,
}

/// Engine group handing out [`HeadlessEngine`]s labelled with their key.
#[derive(Default)]
pub struct HeadlessEngineGroup {
  state: Mutex<GroupState>,
}

impl std::fmt::Debug for HeadlessEngineGroup {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HeadlessEngineGroup")
      .field("launches", &self.state.lock().launches.len())
      .finish_non_exhaustive()
  }
}

impl HeadlessEngineGroup {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make `handle` a resolvable launch callback.
  pub fn register_callback(&self, handle: i64) {
    self.state.lock().callbacks.push(handle);
  }

  /// Make launches of `entry` fail.
  pub fn reject_entrypoint(&self, entry: &str) {
    self.state.lock().rejected.push(entry.to_string());
  }

  /// Listener attached to every engine started from now on.
  pub fn set_listener(&self, listener: MessageListener) {
    self.state.lock().listener = Some(listener);
  }

  pub fn launches(&self) -> Vec<Launch> {
    self.state.lock().launches.clone()
  }

  /// Latest engine started for `window`.
  pub fn engine(&self, window: &str) -> Option<Arc<HeadlessEngine>> {
    let key = EngineKey::for_window(&WindowId::from(window));
    self.state.lock().engines.get(&key).cloned()
  }

  fn spawn(&self, key: &EngineKey, launch: Launch) -> Arc<dyn UiEngine> {
    let mut state = self.state.lock();
    state.launches.push(launch);
    let mut engine = HeadlessEngine::new(key.as_str());
    if let Some(listener) = &state.listener {
      engine = engine.with_listener(Arc::clone(listener));
    }
    let engine = Arc::new(engine);
    state.engines.insert(key.clone(), Arc::clone(&engine));
    engine
  }
}

impl EngineGroup for HeadlessEngineGroup {
  fn run_entrypoint(
    &self,
    key: &EngineKey,
    entrypoint: &str,
    route: Option<&str>,
  ) -> FloatwingResult<Arc<dyn UiEngine>> {
    if self.state.lock().rejected.iter().any(|e| e == entrypoint) {
      return Err(FloatwingError::EntrypointUnresolved(entrypoint.to_string()));
    }
    let launch = Launch::Entrypoint {
      entry: entrypoint.to_string(),
      route: route.map(str::to_string),
    };
    Ok(self.spawn(key, launch))
  }

  fn run_callback(&self, key: &EngineKey, handle: i64) -> FloatwingResult<Arc<dyn UiEngine>> {
    if !self.state.lock().callbacks.contains(&handle) {
      return Err(FloatwingError::CallbackUnresolved(handle));
    }
    Ok(self.spawn(key, Launch::Callback(handle)))
  }
}

/// Observable state of one headless surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceProbe {
  pub visible: bool,
  pub focusable: Option<bool>,
  pub attached: bool,
  pub attach_count: usize,
}

impl Default for SurfaceProbe {
  fn default() -> Self {
    Self {
      visible: true,
      focusable: None,
      attached: false,
      attach_count: 0,
    }
  }
}

struct HeadlessSurface {
  window: WindowId,
  probe: Arc<Mutex<SurfaceProbe>>,
}

impl Surface for HeadlessSurface {
  fn window_id(&self) -> &WindowId {
    &self.window
  }

  fn attach(&self, _engine: &Arc<dyn UiEngine>) {
    let mut probe = self.probe.lock();
    probe.attached = true;
    probe.attach_count += 1;
  }

  fn detach(&self) {
    self.probe.lock().attached = false;
  }

  fn set_visible(&self, visible: bool) {
    self.probe.lock().visible = visible;
  }

  fn set_focusable(&self, focusable: bool) {
    self.probe.lock().focusable = Some(focusable);
  }
}

/// Surface factory keeping a probe per window id.
#[derive(Debug, Default)]
pub struct HeadlessSurfaces {
  probes: Mutex<HashMap<WindowId, Arc<Mutex<SurfaceProbe>>>>,
}

impl HeadlessSurfaces {
  pub fn new() -> Self {
    Self::default()
  }

  /// State of the latest surface created for `window`.
  pub fn probe(&self, window: &WindowId) -> Option<SurfaceProbe> {
    self.probes.lock().get(window).map(|p| p.lock().clone())
  }
}

impl SurfaceFactory for HeadlessSurfaces {
  fn create_surface(&self, window: &WindowId) -> Box<dyn Surface> {
    let probe = Arc::new(Mutex::new(SurfaceProbe::default()));
    self.probes.lock().insert(window.clone(), Arc::clone(&probe));
    Box::new(HeadlessSurface {
      window: window.clone(),
      probe,
    })
  }
}

/// A window manager call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WmOp {
  Add(WindowId, LayoutParams),
  Update(WindowId, LayoutParams),
  Remove(WindowId),
}

#[derive(Debug, Default)]
struct WmState {
  ops: Vec<WmOp>,
  views: HashMap<WindowId, LayoutParams>,
}

/// Strict recording window manager.
#[derive(Debug, Default)]
pub struct HeadlessWindowManager {
  state: Mutex<WmState>,
}

impl HeadlessWindowManager {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn ops(&self) -> Vec<WmOp> {
    self.state.lock().ops.clone()
  }

  /// Windows whose views are attached, ordered by id.
  pub fn views(&self) -> Vec<WindowId> {
    let mut views: Vec<WindowId> = self.state.lock().views.keys().cloned().collect();
    views.sort();
    views
  }

  pub fn is_attached(&self, window: &WindowId) -> bool {
    self.state.lock().views.contains_key(window)
  }

  /// Layout of an attached view.
  pub fn layout(&self, window: &WindowId) -> Option<LayoutParams> {
    self.state.lock().views.get(window).copied()
  }
}

impl WindowManager for HeadlessWindowManager {
  fn add_view(&self, surface: &dyn Surface, params: &LayoutParams) -> FloatwingResult<()> {
    let id = surface.window_id().clone();
    let mut state = self.state.lock();
    if state.views.contains_key(&id) {
      return Err(FloatwingError::Platform(format!("view of {id} has already been added")));
    }
    state.views.insert(id.clone(), *params);
    state.ops.push(WmOp::Add(id, *params));
    Ok(())
  }

  fn update_view_layout(
    &self,
    surface: &dyn Surface,
    params: &LayoutParams,
  ) -> FloatwingResult<()> {
    let id = surface.window_id().clone();
    let mut state = self.state.lock();
    let Some(layout) = state.views.get_mut(&id) else {
      return Err(FloatwingError::Platform(format!("view of {id} is not attached")));
    };
    *layout = *params;
    state.ops.push(WmOp::Update(id, *params));
    Ok(())
  }

  fn remove_view(&self, surface: &dyn Surface) -> FloatwingResult<()> {
    let id = surface.window_id().clone();
    let mut state = self.state.lock();
    if state.views.remove(&id).is_none() {
      return Err(FloatwingError::Platform(format!("view of {id} is not attached")));
    }
    state.ops.push(WmOp::Remove(id));
    Ok(())
  }
}

/// Service host recording stop/promote/demote requests.
#[derive(Debug, Default)]
pub struct HeadlessHost {
  stops: AtomicUsize,
  demotions: AtomicUsize,
  promotions: Mutex<Vec<NotificationOptions>>,
}

impl HeadlessHost {
  pub fn stops(&self) -> usize {
    self.stops.load(Ordering::SeqCst)
  }

  pub fn demotions(&self) -> usize {
    self.demotions.load(Ordering::SeqCst)
  }

  pub fn promotions(&self) -> Vec<NotificationOptions> {
    self.promotions.lock().clone()
  }
}

impl ServiceHost for HeadlessHost {
  fn stop_self(&self) -> bool {
    self.stops.fetch_add(1, Ordering::SeqCst);
    true
  }

  fn promote(&self, options: &NotificationOptions) -> bool {
    self.promotions.lock().push(options.clone());
    true
  }

  fn demote(&self) -> bool {
    self.demotions.fetch_add(1, Ordering::SeqCst);
    true
  }
}

/// Overlay permission switch.
#[derive(Debug)]
pub struct HeadlessPermissions {
  granted: AtomicBool,
  has_settings_page: AtomicBool,
  opened: AtomicUsize,
}

impl Default for HeadlessPermissions {
  fn default() -> Self {
    Self {
      granted: AtomicBool::new(false),
      has_settings_page: AtomicBool::new(true),
      opened: AtomicUsize::new(0),
    }
  }
}

impl HeadlessPermissions {
  pub fn set_granted(&self, granted: bool) {
    self.granted.store(granted, Ordering::SeqCst);
  }

  pub fn set_has_settings_page(&self, available: bool) {
    self.has_settings_page.store(available, Ordering::SeqCst);
  }

  /// How often the settings page was opened.
  pub fn opened(&self) -> usize {
    self.opened.load(Ordering::SeqCst)
  }
}

impl Permissions for HeadlessPermissions {
  fn has_overlay_permission(&self) -> bool {
    self.granted.load(Ordering::SeqCst)
  }

  fn open_permission_setting(&self) -> bool {
    if !self.has_settings_page.load(Ordering::SeqCst) {
      return false;
    }
    self.opened.fetch_add(1, Ordering::SeqCst);
    true
  }
}

type ServiceFactory = Box<dyn Fn() -> Service + Send + Sync>;

/// Launcher that builds the service in-process and publishes it to a slot.
pub struct HeadlessLauncher {
  factory: ServiceFactory,
  slot: ServiceSlot,
  delay: Mutex<Option<Duration>>,
  launches: AtomicUsize,
}

impl std::fmt::Debug for HeadlessLauncher {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HeadlessLauncher")
      .field("launches", &self.launches())
      .finish_non_exhaustive()
  }
}

impl HeadlessLauncher {
  pub fn new(slot: ServiceSlot, factory: impl Fn() -> Service + Send + Sync + 'static) -> Self {
    Self {
      factory: Box::new(factory),
      slot,
      delay: Mutex::new(None),
      launches: AtomicUsize::new(0),
    }
  }

  /// Publish from a background thread after `delay`, like a slow OS start.
  pub fn set_delay(&self, delay: Option<Duration>) {
    *self.delay.lock() = delay;
  }

  pub fn launches(&self) -> usize {
    self.launches.load(Ordering::SeqCst)
  }
}

impl ServiceLauncher for HeadlessLauncher {
  fn is_running(&self) -> bool {
    self.slot.current().is_some()
  }

  fn launch(&self) -> bool {
    self.launches.fetch_add(1, Ordering::SeqCst);
    if self.is_running() {
      return true;
    }

    let service = (self.factory)();
    match *self.delay.lock() {
      Some(delay) => {
        let slot = self.slot.clone();
        std::thread::spawn(move || {
          std::thread::sleep(delay);
          slot.publish(service);
        });
      }
      None => {
        self.slot.publish(service);
      }
    }
    true
  }
}

/// A complete headless platform sharing one set of collaborators.
#[derive(Clone)]
pub struct HeadlessPlatform {
  pub window_manager: Arc<HeadlessWindowManager>,
  pub engines: Arc<HeadlessEngineGroup>,
  pub surfaces: Arc<HeadlessSurfaces>,
  pub host: Arc<HeadlessHost>,
  pub permissions: Arc<HeadlessPermissions>,
  pub settings: Settings,
  pub slot: ServiceSlot,
  pub launcher: Arc<HeadlessLauncher>,
  host_engine: Arc<HeadlessEngine>,
}

impl std::fmt::Debug for HeadlessPlatform {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("HeadlessPlatform").finish_non_exhaustive()
  }
}

impl Default for HeadlessPlatform {
  fn default() -> Self {
    Self::new()
  }
}

impl HeadlessPlatform {
  pub fn new() -> Self {
    Self::with_config(ServiceConfig::default())
  }

  pub fn with_config(config: ServiceConfig) -> Self {
    Self::build(config, None)
  }

  /// Platform whose engines (host included) report every envelope to `listener`.
  pub fn with_listener(config: ServiceConfig, listener: MessageListener) -> Self {
    Self::build(config, Some(listener))
  }

  fn build(config: ServiceConfig, listener: Option<MessageListener>) -> Self {
    let window_manager = Arc::new(HeadlessWindowManager::new());
    let engines = Arc::new(HeadlessEngineGroup::new());
    let surfaces = Arc::new(HeadlessSurfaces::new());
    let host = Arc::new(HeadlessHost::default());
    let settings = Settings::in_memory();
    let slot = ServiceSlot::new();

    let mut host_engine = HeadlessEngine::new("host");
    if let Some(listener) = listener {
      engines.set_listener(Arc::clone(&listener));
      host_engine = host_engine.with_listener(listener);
    }

    let launcher = {
      let (window_manager, engines, surfaces, host, settings, home) = (
        Arc::clone(&window_manager),
        Arc::clone(&engines),
        Arc::clone(&surfaces),
        Arc::clone(&host),
        settings.clone(),
        slot.clone(),
      );
      Arc::new(HeadlessLauncher::new(slot.clone(), move || {
        Service::builder(window_manager.clone(), engines.clone(), surfaces.clone())
          .host(host.clone())
          .slot(&home)
          .settings(settings.clone())
          .config(config)
          .build()
      }))
    };

    Self {
      window_manager,
      engines,
      surfaces,
      host,
      permissions: Arc::new(HeadlessPermissions::default()),
      settings,
      slot,
      launcher,
      host_engine: Arc::new(host_engine),
    }
  }

  /// Builder wired to this platform, not yet published anywhere.
  pub fn service_builder(&self) -> ServiceBuilder {
    Service::builder(
      self.window_manager.clone(),
      self.engines.clone(),
      self.surfaces.clone(),
    )
    .host(self.host.clone())
    .slot(&self.slot)
    .settings(self.settings.clone())
  }

  /// A standalone service that is not published to the slot.
  pub fn build_service(&self) -> Service {
    self.service_builder().build()
  }

  pub fn plugin_builder(&self) -> PluginBuilder {
    Plugin::builder(
      self.permissions.clone(),
      self.launcher.clone(),
      self.slot.clone(),
    )
    .settings(self.settings.clone())
  }

  pub fn plugin(&self) -> Plugin {
    self.plugin_builder().build()
  }

  /// The host application's engine.
  pub fn host_engine(&self) -> Arc<HeadlessEngine> {
    Arc::clone(&self.host_engine)
  }
}

/// Window id an engine label belongs to, or `None` for the host engine.
pub fn window_of(label: &str) -> Option<WindowId> {
  label.strip_prefix(ENGINE_KEY_PREFIX).map(WindowId::from)
}
