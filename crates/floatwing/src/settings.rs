/*!
Persisted display settings.

The host reports its pixel ratio and system config once, on first run. Both
are written only if absent, so a service restarted by the OS (with no host
around) still lays windows out with the values the host saw.
*/

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::platform::SettingsStore;
use crate::types::{FloatwingError, FloatwingResult};

pub const PIXEL_RATIO_KEY: &str = "pixel_ratio";
pub const SYSTEM_CONFIG_KEY: &str = "system_config";

/// Pixel ratio used until the host reports one.
pub const DEFAULT_PIXEL_RATIO: f64 = 2.0;

/// Typed access to a [`SettingsStore`]. Clone is cheap.
#[derive(Clone)]
pub struct Settings {
  store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for Settings {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Settings").finish_non_exhaustive()
  }
}

impl Settings {
  pub fn new(store: Arc<dyn SettingsStore>) -> Self {
    Self { store }
  }

  /// Settings that live as long as the process.
  pub fn in_memory() -> Self {
    Self::new(Arc::new(MemoryStore::default()))
  }

  pub fn pixel_ratio(&self) -> Option<f64> {
    self.store.get(PIXEL_RATIO_KEY).and_then(|v| v.as_f64())
  }

  pub fn system_config(&self) -> Option<Map<String, Value>> {
    match self.store.get(SYSTEM_CONFIG_KEY) {
      Some(Value::Object(map)) => Some(map),
      _ => None,
    }
  }

  /// Persist the pixel ratio unless one is stored. Returns whether it was written.
  pub fn store_pixel_ratio_once(&self, pixel_ratio: f64) -> FloatwingResult<bool> {
    if !pixel_ratio.is_finite() || pixel_ratio <= 0.0 {
      return Err(FloatwingError::invalid_request(
        "invalid_pixel_ratio",
        format!("pixel ratio must be positive, got {pixel_ratio}"),
      ));
    }
    self.put_once(PIXEL_RATIO_KEY, Value::from(pixel_ratio))
  }

  /// Persist the system config unless one is stored. Returns whether it was written.
  pub fn store_system_config_once(&self, system: Map<String, Value>) -> FloatwingResult<bool> {
    self.put_once(SYSTEM_CONFIG_KEY, Value::Object(system))
  }

  fn put_once(&self, key: &str, value: Value) -> FloatwingResult<bool> {
    if self.store.get(key).is_some() {
      log::debug!("[settings] {key} already stored, keeping it");
      return Ok(false);
    }
    self.store.put(key, value)?;
    log::info!("[settings] stored {key}");
    Ok(true)
  }
}

/// Process-lifetime store.
#[derive(Debug, Default)]
pub struct MemoryStore {
  values: Mutex<Map<String, Value>>,
}

impl SettingsStore for MemoryStore {
  fn get(&self, key: &str) -> Option<Value> {
    self.values.lock().get(key).cloned()
  }

  fn put(&self, key: &str, value: Value) -> FloatwingResult<()> {
    self.values.lock().insert(key.to_string(), value);
    Ok(())
  }
}

/// Store backed by a JSON object file, rewritten on every put.
#[derive(Debug)]
pub struct JsonFileStore {
  path: PathBuf,
  values: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
  /// Open `path`, starting empty if it does not exist yet.
  pub fn open(path: impl AsRef<Path>) -> FloatwingResult<Self> {
    let path = path.as_ref().to_path_buf();
    let values = match std::fs::read_to_string(&path) {
      Ok(text) => match serde_json::from_str(&text) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
          return Err(FloatwingError::Settings(format!(
            "{} does not hold a JSON object",
            path.display()
          )))
        }
        Err(e) => {
          return Err(FloatwingError::Settings(format!(
            "failed to parse {}: {e}",
            path.display()
          )))
        }
      },
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
      Err(e) => {
        return Err(FloatwingError::Settings(format!(
          "failed to read {}: {e}",
          path.display()
        )))
      }
    };
    Ok(Self {
      path,
      values: Mutex::new(values),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl SettingsStore for JsonFileStore {
  fn get(&self, key: &str) -> Option<Value> {
    self.values.lock().get(key).cloned()
  }

  fn put(&self, key: &str, value: Value) -> FloatwingResult<()> {
    let mut values = self.values.lock();
    values.insert(key.to_string(), value);
    let text = serde_json::to_string_pretty(&*values)
      .map_err(|e| FloatwingError::Settings(e.to_string()))?;
    std::fs::write(&self.path, text).map_err(|e| {
      FloatwingError::Settings(format!("failed to write {}: {e}", self.path.display()))
    })
  }
}
