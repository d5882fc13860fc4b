/*!
Host-side façade.

The host application talks to the plugin; the plugin checks the overlay
permission, starts the service on demand, waits for it to publish itself,
then forwards window creation to it.
*/

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::platform::{Permissions, ServiceLauncher, UiEngine};
use crate::service::{Service, ServiceSlot};
use crate::settings::Settings;
use crate::types::{Config, FloatwingError, FloatwingResult, InitStatus, WindowId, WindowInfo};

/// Default time to wait for a launched service to become ready.
pub const READY_TIMEOUT: Duration = Duration::from_secs(5);

struct PluginInner {
  permissions: Arc<dyn Permissions>,
  launcher: Arc<dyn ServiceLauncher>,
  slot: ServiceSlot,
  settings: Settings,
  ready_timeout: Duration,
  pending_grant: Mutex<Option<oneshot::Sender<bool>>>,
}

/// Host-facing plugin handle. Clone is cheap.
#[derive(Clone)]
pub struct Plugin {
  inner: Arc<PluginInner>,
}

impl std::fmt::Debug for Plugin {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Plugin")
      .field("slot", &self.inner.slot)
      .finish_non_exhaustive()
  }
}

/// Builder for a [`Plugin`].
#[must_use = "Builder does nothing until .build() is called"]
pub struct PluginBuilder {
  permissions: Arc<dyn Permissions>,
  launcher: Arc<dyn ServiceLauncher>,
  slot: ServiceSlot,
  settings: Option<Settings>,
  ready_timeout: Duration,
}

impl std::fmt::Debug for PluginBuilder {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PluginBuilder")
      .field("ready_timeout", &self.ready_timeout)
      .finish_non_exhaustive()
  }
}

impl PluginBuilder {
  /// Where first-run display settings are persisted. Default: in memory.
  pub fn settings(mut self, settings: Settings) -> Self {
    self.settings = Some(settings);
    self
  }

  /// How long to wait for a launched service. Default: 5s.
  pub const fn ready_timeout(mut self, timeout: Duration) -> Self {
    self.ready_timeout = timeout;
    self
  }

  #[must_use]
  pub fn build(self) -> Plugin {
    Plugin {
      inner: Arc::new(PluginInner {
        permissions: self.permissions,
        launcher: self.launcher,
        slot: self.slot,
        settings: self.settings.unwrap_or_else(Settings::in_memory),
        ready_timeout: self.ready_timeout,
        pending_grant: Mutex::new(None),
      }),
    }
  }
}

impl Plugin {
  pub fn builder(
    permissions: Arc<dyn Permissions>,
    launcher: Arc<dyn ServiceLauncher>,
    slot: ServiceSlot,
  ) -> PluginBuilder {
    PluginBuilder {
      permissions,
      launcher,
      slot,
      settings: None,
      ready_timeout: READY_TIMEOUT,
    }
  }

  /// The running service, if any.
  pub fn service(&self) -> Option<Service> {
    self.inner.slot.current()
  }

  /// Register the host application's engine.
  ///
  /// The service channel is installed on it now if the service runs, or as
  /// soon as it starts.
  pub fn attach_main_engine(&self, engine: Arc<dyn UiEngine>) {
    log::info!("[plugin] host engine attached");
    self.inner.slot.set_host_engine(engine);
  }

  /// First-run bootstrap: persist display settings once and report state.
  pub fn initialize(
    &self,
    pixel_ratio: Option<f64>,
    system: Option<Map<String, Value>>,
  ) -> FloatwingResult<InitStatus> {
    let pixel_ratio_updated = match pixel_ratio {
      Some(ratio) => self.inner.settings.store_pixel_ratio_once(ratio)?,
      None => false,
    };
    let system_config_updated = match system {
      Some(system) => self.inner.settings.store_system_config_once(system)?,
      None => false,
    };

    let service = self.service();
    if let Some(service) = &service {
      // a running service was built before these were stored
      if pixel_ratio_updated {
        if let Some(ratio) = self.inner.settings.pixel_ratio() {
          service.set_pixel_ratio(ratio);
        }
      }
      if system_config_updated {
        if let Some(system) = self.inner.settings.system_config() {
          service.set_system_config(system);
        }
      }
    }

    let status = InitStatus {
      permission_granted: self.has_permission(),
      service_running: self.is_service_running(),
      windows: service.map(|s| s.windows()).unwrap_or_default(),
      pixel_ratio_updated,
      system_config_updated,
    };
    log::info!(
      "[plugin] initialized: permission {}, service running {}, {} window(s)",
      status.permission_granted,
      status.service_running,
      status.windows.len()
    );
    Ok(status)
  }

  pub fn has_permission(&self) -> bool {
    self.inner.permissions.has_overlay_permission()
  }

  pub fn open_permission_setting(&self) -> bool {
    self.inner.permissions.open_permission_setting()
  }

  /// Open the permission settings and wait for the user to come back.
  ///
  /// Resolves with the permission state once the platform calls
  /// [`Plugin::on_permission_result`]. A newer request supersedes an older
  /// one, which then resolves to false.
  pub async fn grant_permission(&self) -> bool {
    if self.has_permission() {
      return true;
    }

    let (tx, rx) = oneshot::channel();
    if self.inner.pending_grant.lock().replace(tx).is_some() {
      log::debug!("[plugin] superseding an earlier permission request");
    }
    if !self.open_permission_setting() {
      log::warn!("[plugin] no permission settings page to open");
      self.inner.pending_grant.lock().take();
      return false;
    }
    rx.await.unwrap_or(false)
  }

  /// The user returned from the permission settings page.
  ///
  /// Returns false if no request was waiting.
  pub fn on_permission_result(&self) -> bool {
    let Some(tx) = self.inner.pending_grant.lock().take() else {
      return false;
    };
    let granted = self.has_permission();
    log::info!("[plugin] permission request finished, granted: {granted}");
    drop(tx.send(granted));
    true
  }

  pub fn is_service_running(&self) -> bool {
    self.inner.slot.current().is_some() || self.inner.launcher.is_running()
  }

  /// Start the service if needed. False if it could not be started.
  pub async fn start_service(&self) -> bool {
    match self.ensure_service().await {
      Ok(_) => true,
      Err(e) => {
        log::warn!("[plugin] failed to start service: {e}");
        false
      }
    }
  }

  /// The running service, launching it and waiting for it if needed.
  pub async fn ensure_service(&self) -> FloatwingResult<Service> {
    if let Some(service) = self.service() {
      return Ok(service);
    }
    if !self.has_permission() {
      log::error!("[plugin] overlay permission not granted");
      return Err(FloatwingError::PermissionDenied);
    }

    log::info!("[plugin] launching service");
    if !self.inner.launcher.launch() {
      return Err(FloatwingError::ServiceUnavailable);
    }
    self.inner.slot.ready(self.inner.ready_timeout).await
  }

  /// Create a window, starting the service first if needed.
  pub async fn create_window(
    &self,
    id: WindowId,
    config: Config,
    start: bool,
  ) -> FloatwingResult<Option<WindowInfo>> {
    log::info!("[plugin] create window {id}");
    let service = self.ensure_service().await?;
    service.create_window(id, config, start)
  }
}
