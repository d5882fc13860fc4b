/*!
Engine cache - started engines keyed by window.

Engines outlive soft-destroyed windows so a window can be restarted without
re-running its entrypoint. Only a hard destroy evicts an engine.
*/

use std::collections::HashMap;
use std::sync::Arc;

use crate::platform::{EngineGroup, UiEngine};
use crate::types::{Config, EngineKey, FloatwingResult};

/// Entrypoint used when a config names none.
pub const DEFAULT_ENTRYPOINT: &str = "main";

/// How to start an engine that is not cached yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaunchSpec<'a> {
  pub entry: Option<&'a str>,
  pub route: Option<&'a str>,
  pub callback: Option<i64>,
}

impl<'a> From<&'a Config> for LaunchSpec<'a> {
  fn from(config: &'a Config) -> Self {
    Self {
      entry: config.entry.as_deref(),
      route: config.route.as_deref(),
      callback: config.callback,
    }
  }
}

/// An engine handed out by the cache.
pub struct ResolvedEngine {
  pub engine: Arc<dyn UiEngine>,
  /// True if the engine was already running. Its launch spec was ignored.
  pub was_cached: bool,
}

impl std::fmt::Debug for ResolvedEngine {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ResolvedEngine")
      .field("was_cached", &self.was_cached)
      .finish_non_exhaustive()
  }
}

/// Started engines owned by the service.
#[derive(Default)]
pub(crate) struct EngineCache {
  engines: HashMap<EngineKey, Arc<dyn UiEngine>>,
}

impl std::fmt::Debug for EngineCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("EngineCache")
      .field("len", &self.engines.len())
      .finish()
  }
}

impl EngineCache {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn get(&self, key: &EngineKey) -> Option<Arc<dyn UiEngine>> {
    self.engines.get(key).cloned()
  }

  pub(crate) fn contains(&self, key: &EngineKey) -> bool {
    self.engines.contains_key(key)
  }

  pub(crate) fn len(&self) -> usize {
    self.engines.len()
  }

  /// Return the cached engine for `key`, or start and cache a new one.
  ///
  /// A failed launch leaves the cache untouched.
  pub(crate) fn get_or_create(
    &mut self,
    key: &EngineKey,
    launch: LaunchSpec<'_>,
    group: &dyn EngineGroup,
  ) -> FloatwingResult<ResolvedEngine> {
    if let Some(engine) = self.get(key) {
      log::info!("[engine] reusing cached engine {key}");
      return Ok(ResolvedEngine {
        engine,
        was_cached: true,
      });
    }

    log::debug!("[engine] cache miss for {key}, starting a new engine");
    let engine = start_engine(key, launch, group)?;
    self.engines.insert(key.clone(), Arc::clone(&engine));

    Ok(ResolvedEngine {
      engine,
      was_cached: false,
    })
  }

  /// Remove an engine from the cache. The caller decides whether to destroy it.
  pub(crate) fn evict(&mut self, key: &EngineKey) -> Option<Arc<dyn UiEngine>> {
    self.engines.remove(key)
  }
}

fn start_engine(
  key: &EngineKey,
  launch: LaunchSpec<'_>,
  group: &dyn EngineGroup,
) -> FloatwingResult<Arc<dyn UiEngine>> {
  if let Some(callback) = launch.callback.filter(|&c| c > 0) {
    log::info!("[engine] starting {key} from callback {callback}");
    return group.run_callback(key, callback);
  }

  let entry = launch.entry.unwrap_or_else(|| {
    log::warn!("[engine] no entrypoint for {key}, falling back to `{DEFAULT_ENTRYPOINT}`");
    DEFAULT_ENTRYPOINT
  });
  if entry == DEFAULT_ENTRYPOINT && launch.route.is_none() {
    log::warn!("[engine] {key} uses the main entrypoint and default route");
  }

  log::info!(
    "[engine] starting {key} at entrypoint `{entry}`, route {:?}",
    launch.route
  );
  group.run_entrypoint(key, entry, launch.route)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::headless::{HeadlessEngineGroup, Launch};
  use crate::types::{FloatwingError, WindowId};

  fn key(id: &str) -> EngineKey {
    EngineKey::for_window(&WindowId::from(id))
  }

  #[test]
  fn second_resolve_hits_cache() {
    let group = HeadlessEngineGroup::new();
    let mut cache = EngineCache::new();
    let launch = LaunchSpec {
      entry: Some("overlay"),
      ..LaunchSpec::default()
    };

    let first = cache.get_or_create(&key("w1"), launch, &group).unwrap();
    assert!(!first.was_cached);

    let second = cache
      .get_or_create(&key("w1"), LaunchSpec::default(), &group)
      .unwrap();
    assert!(second.was_cached);
    assert!(Arc::ptr_eq(&first.engine, &second.engine));
    assert_eq!(group.launches().len(), 1, "entrypoint should run once");
  }

  #[test]
  fn positive_callback_takes_precedence() {
    let group = HeadlessEngineGroup::new();
    group.register_callback(99);
    let mut cache = EngineCache::new();
    let launch = LaunchSpec {
      entry: Some("overlay"),
      route: Some("/x"),
      callback: Some(99),
    };
    cache.get_or_create(&key("w1"), launch, &group).unwrap();
    assert_eq!(group.launches(), vec![Launch::Callback(99)]);
  }

  #[test]
  fn non_positive_callback_falls_back_to_entry() {
    let group = HeadlessEngineGroup::new();
    let mut cache = EngineCache::new();
    let launch = LaunchSpec {
      entry: Some("overlay"),
      route: None,
      callback: Some(0),
    };
    cache.get_or_create(&key("w1"), launch, &group).unwrap();
    assert_eq!(
      group.launches(),
      vec![Launch::Entrypoint {
        entry: "overlay".into(),
        route: None
      }]
    );
  }

  #[test]
  fn missing_entry_defaults_to_main() {
    let group = HeadlessEngineGroup::new();
    let mut cache = EngineCache::new();
    cache
      .get_or_create(&key("w1"), LaunchSpec::default(), &group)
      .unwrap();
    assert_eq!(
      group.launches(),
      vec![Launch::Entrypoint {
        entry: DEFAULT_ENTRYPOINT.into(),
        route: None
      }]
    );
  }

  #[test]
  fn failed_launch_leaves_nothing_cached() {
    let group = HeadlessEngineGroup::new();
    group.reject_entrypoint("broken");
    let mut cache = EngineCache::new();
    let launch = LaunchSpec {
      entry: Some("broken"),
      ..LaunchSpec::default()
    };

    let err = cache.get_or_create(&key("w1"), launch, &group).unwrap_err();
    assert!(matches!(err, FloatwingError::EntrypointUnresolved(_)));
    assert!(!cache.contains(&key("w1")));
    assert_eq!(cache.len(), 0);
  }

  #[test]
  fn unregistered_callback_is_fatal() {
    let group = HeadlessEngineGroup::new();
    let mut cache = EngineCache::new();
    let launch = LaunchSpec {
      callback: Some(5),
      ..LaunchSpec::default()
    };
    let err = cache.get_or_create(&key("w1"), launch, &group).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(cache.len(), 0);
  }

  #[test]
  fn evict_removes_only_that_key() {
    let group = HeadlessEngineGroup::new();
    let mut cache = EngineCache::new();
    cache
      .get_or_create(&key("a"), LaunchSpec::default(), &group)
      .unwrap();
    cache
      .get_or_create(&key("b"), LaunchSpec::default(), &group)
      .unwrap();

    assert!(cache.evict(&key("a")).is_some());
    assert!(cache.evict(&key("a")).is_none());
    assert!(cache.contains(&key("b")));
  }
}
