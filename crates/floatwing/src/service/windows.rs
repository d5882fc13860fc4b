/*!
Window operations addressed by id.

Unknown ids are not errors here: every lookup-based operation yields `None`
and leaves it to the caller to report.
*/

use std::sync::Arc;

use super::Service;
use crate::engine::LaunchSpec;
use crate::types::{
  Config, EngineKey, FloatwingError, FloatwingResult, WindowEvent, WindowId, WindowInfo,
};
use crate::window::{Window, WindowParts};

impl Service {
  /// Create a window, reusing a cached engine for `id` if there is one.
  ///
  /// Returns `Ok(None)` if a window with `id` already exists.
  pub fn create_window(
    &self,
    id: WindowId,
    config: Config,
    start: bool,
  ) -> FloatwingResult<Option<WindowInfo>> {
    self.create(id, config, start, None)
  }

  /// Create a window whose events are also delivered to `parent`.
  ///
  /// The parent must exist. Like `create_window`, an existing `id` yields `Ok(None)`.
  pub fn create_child(
    &self,
    parent: &WindowId,
    id: WindowId,
    config: Config,
    start: bool,
  ) -> FloatwingResult<Option<WindowInfo>> {
    if !self.read(|r| r.contains(parent)) {
      return Err(FloatwingError::WindowNotFound(parent.clone()));
    }
    self.create(id, config, start, Some(parent.clone()))
  }

  fn create(
    &self,
    id: WindowId,
    config: Config,
    start: bool,
    parent: Option<WindowId>,
  ) -> FloatwingResult<Option<WindowInfo>> {
    if !self.write(|r| r.reserve(&id)) {
      log::error!("[service] window {id} already exists");
      return Ok(None);
    }

    let (window, fresh_engine) = match self.build_window(&id, config, parent) {
      Ok(built) => built,
      Err(e) => {
        self.write(|r| r.release(&id));
        return Err(e);
      }
    };
    if self.write(|r| r.insert(window.clone())).is_err() {
      // the id is reserved, nobody else can register it
      log::error!("[service] window {id} was registered behind a reservation");
      return Ok(None);
    }
    log::debug!("[service] registered window {id}");

    window.init();
    window.emit(WindowEvent::Created { fresh_engine });

    if start {
      if let Err(e) = window.start() {
        log::error!("[service] failed to start window {id}, discarding it: {e}");
        window.destroy(true);
        return Err(e);
      }
    }
    Ok(Some(window.info()))
  }

  fn build_window(
    &self,
    id: &WindowId,
    config: Config,
    parent: Option<WindowId>,
  ) -> FloatwingResult<(Window, bool)> {
    let engine_key = EngineKey::for_window(id);
    let resolved = self.inner.engines.lock().get_or_create(
      &engine_key,
      LaunchSpec::from(&config),
      self.inner.engine_group.as_ref(),
    )?;

    let window = Window::new(WindowParts {
      surface: self.inner.surfaces.create_surface(id),
      id: id.clone(),
      engine_key,
      engine: resolved.engine,
      window_manager: Arc::clone(&self.inner.window_manager),
      policy: self.inner.config.policy,
      config,
      parent,
      service: Arc::downgrade(&self.inner),
    });
    Ok((window, !resolved.was_cached))
  }

  /// Start a window. `None` if there is no such window.
  pub fn start_window(&self, id: &WindowId) -> FloatwingResult<Option<bool>> {
    let Some(window) = self.lookup(id) else {
      return Ok(None);
    };
    window.start().map(Some)
  }

  /// Destroy a window, softly unless `force`. `None` if there is no such window.
  pub fn close_window(&self, id: &WindowId, force: bool) -> Option<bool> {
    self.lookup(id).map(|window| window.destroy(force))
  }

  /// Show or hide a window. `None` if there is no such window.
  pub fn show_window(&self, id: &WindowId, visible: bool) -> FloatwingResult<Option<bool>> {
    let Some(window) = self.lookup(id) else {
      return Ok(None);
    };
    window.set_visible(visible).map(Some)
  }

  /// Merge `patch` into a window's config. `None` if there is no such window.
  pub fn update_window(
    &self,
    id: &WindowId,
    patch: &Config,
  ) -> FloatwingResult<Option<WindowInfo>> {
    let Some(window) = self.lookup(id) else {
      return Ok(None);
    };
    window.update(patch).map(Some)
  }

  fn lookup(&self, id: &WindowId) -> Option<Window> {
    let window = self.window(id);
    if window.is_none() {
      log::debug!("[service] no window with id {id}");
    }
    window
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::headless::{HeadlessPlatform, WmOp};
  use crate::types::{Lifecycle, WindowFlags};

  fn overlay(entry: &str) -> Config {
    Config {
      entry: Some(entry.into()),
      ..Config::default()
    }
  }

  mod create {
    use super::*;

    #[test]
    fn registers_and_starts() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();

      let info = service
        .create_window("w1".into(), overlay("overlay"), true)
        .unwrap()
        .unwrap();
      assert_eq!(info.id, WindowId::from("w1"));
      assert_eq!(info.config.entry.as_deref(), Some("overlay"));

      let window = service.window(&"w1".into()).unwrap();
      assert!(window.is_started());
      assert!(platform.window_manager.is_attached(&"w1".into()));
    }

    #[test]
    fn without_start_stays_detached() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), false).unwrap();

      let window = service.window(&"w1".into()).unwrap();
      assert_eq!(window.lifecycle(), Lifecycle::Initialized);
      assert!(platform.window_manager.ops().is_empty());
    }

    #[test]
    fn duplicate_id_yields_none() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      let config = Config {
        visible: Some(false),
        ..overlay("a")
      };
      service.create_window("w1".into(), config, false).unwrap();
      let engine = platform.engines.engine("w1").unwrap();
      let sent = engine.message_names();

      let loser = Config {
        visible: Some(true),
        ..overlay("b")
      };
      let second = service.create_window("w1".into(), loser, false).unwrap();
      assert!(second.is_none());
      assert_eq!(service.window_count(), 1);
      assert_eq!(platform.engines.launches().len(), 1);
      // the existing window's engine and surface are left alone
      assert_eq!(engine.message_names(), sent);
      assert!(!platform.surfaces.probe(&"w1".into()).unwrap().visible);
    }

    #[test]
    fn failed_engine_launch_registers_nothing() {
      let platform = HeadlessPlatform::new();
      platform.engines.reject_entrypoint("broken");
      let service = platform.build_service();

      let err = service
        .create_window("w1".into(), overlay("broken"), true)
        .unwrap_err();
      assert!(matches!(err, FloatwingError::EntrypointUnresolved(_)));
      assert_eq!(service.window_count(), 0);
    }

    #[test]
    fn failed_start_unregisters_and_evicts() {
      use crate::platform::{SurfaceFactory, WindowManager};

      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      // occupy the window manager slot so add_view is rejected
      let blocker = platform.surfaces.create_surface(&"w1".into());
      let params = Config::default().to_layout_params(&service.config().policy);
      platform.window_manager.add_view(blocker.as_ref(), &params).unwrap();

      let err = service
        .create_window("w1".into(), Config::default(), true)
        .unwrap_err();
      assert_eq!(err.code(), "platform");
      assert!(service.window(&"w1".into()).is_none());
      assert_eq!(service.inner.engines.lock().len(), 0);
      assert!(platform.engines.engine("w1").unwrap().is_destroyed());

      // the same request succeeds once the platform lets it
      platform.window_manager.remove_view(blocker.as_ref()).unwrap();
      let info = service
        .create_window("w1".into(), Config::default(), true)
        .unwrap();
      assert!(info.is_some());
      assert!(service.window(&"w1".into()).unwrap().is_started());
    }

    #[test]
    fn created_event_reports_fresh_engine() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), false).unwrap();

      let engine = platform.engines.engine("w1").unwrap();
      let created = &engine.messages()[0];
      assert_eq!(created.name, "window.created");
      assert_eq!(created.data, serde_json::json!(true));
    }

    #[test]
    fn focusable_and_visible_applied_at_init() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      let config = Config {
        focusable: Some(true),
        visible: Some(false),
        ..Config::default()
      };
      service.create_window("w1".into(), config, false).unwrap();

      let surface = platform.surfaces.probe(&"w1".into()).unwrap();
      assert_eq!(surface.focusable, Some(true));
      assert!(!surface.visible);
    }

    #[test]
    fn layout_follows_config() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      let config = Config {
        width: Some(200),
        clickable: Some(false),
        ..Config::default()
      };
      service.create_window("w1".into(), config, true).unwrap();

      let layout = platform.window_manager.layout(&"w1".into()).unwrap();
      assert_eq!(layout.width, 200);
      assert_eq!(layout.height, 1);
      assert!(layout.flags.contains(WindowFlags::NOT_TOUCHABLE));
      assert!(layout.flags.contains(WindowFlags::NOT_FOCUSABLE));
    }
  }

  mod children {
    use super::*;

    #[test]
    fn child_requires_parent() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      let err = service
        .create_child(&"missing".into(), "c".into(), Config::default(), false)
        .unwrap_err();
      assert!(matches!(err, FloatwingError::WindowNotFound(_)));
    }

    #[test]
    fn child_events_reach_parent_engine() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("p".into(), overlay("parent"), true).unwrap();
      service
        .create_child(&"p".into(), "c".into(), overlay("child"), true)
        .unwrap()
        .unwrap();

      let parent_engine = platform.engines.engine("p").unwrap();
      let from_child: Vec<String> = parent_engine
        .messages()
        .into_iter()
        .filter(|m| m.id == WindowId::from("c"))
        .map(|m| m.name)
        .collect();
      assert_eq!(
        from_child,
        vec!["window.created", "window.resumed", "window.started"]
      );
      assert_eq!(
        service.window(&"c".into()).unwrap().parent(),
        Some(&WindowId::from("p"))
      );
    }

    #[test]
    fn child_with_existing_id_yields_none() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("p".into(), Config::default(), false).unwrap();
      service
        .create_child(&"p".into(), "c".into(), Config::default(), false)
        .unwrap();
      let engine = platform.engines.engine("c").unwrap();
      let before = engine.messages().len();

      let second = service
        .create_child(&"p".into(), "c".into(), Config::default(), false)
        .unwrap();
      assert!(second.is_none());
      assert_eq!(service.window_count(), 2);
      assert_eq!(engine.messages().len(), before, "nothing sent to the existing window");
    }

    #[test]
    fn destroyed_parent_stops_receiving() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("p".into(), Config::default(), true).unwrap();
      service
        .create_child(&"p".into(), "c".into(), Config::default(), true)
        .unwrap();
      let parent_engine = platform.engines.engine("p").unwrap();

      service.close_window(&"p".into(), true);
      let before = parent_engine.messages().len();
      service.show_window(&"c".into(), false).unwrap();
      assert_eq!(parent_engine.messages().len(), before);
    }
  }

  mod by_id {
    use super::*;

    #[test]
    fn unknown_ids_yield_none() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      let id = WindowId::from("ghost");
      assert_eq!(service.start_window(&id).unwrap(), None);
      assert_eq!(service.close_window(&id, true), None);
      assert_eq!(service.show_window(&id, true).unwrap(), None);
      assert_eq!(service.update_window(&id, &Config::default()).unwrap(), None);
    }

    #[test]
    fn start_twice_adds_view_once() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), false).unwrap();

      assert_eq!(service.start_window(&"w1".into()).unwrap(), Some(true));
      assert_eq!(service.start_window(&"w1".into()).unwrap(), Some(true));

      let adds = platform
        .window_manager
        .ops()
        .iter()
        .filter(|op| matches!(op, WmOp::Add(..)))
        .count();
      assert_eq!(adds, 1);
      let engine = platform.engines.engine("w1").unwrap();
      assert_eq!(engine.resumed(), 1);
    }

    #[test]
    fn update_relayouts_started_window() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), true).unwrap();

      let patch = Config {
        x: Some(10),
        y: Some(20),
        ..Config::default()
      };
      let info = service.update_window(&"w1".into(), &patch).unwrap().unwrap();
      assert_eq!(info.config.x, Some(10));

      let layout = platform.window_manager.layout(&"w1".into()).unwrap();
      assert_eq!((layout.x, layout.y), (Some(10), Some(20)));
    }

    #[test]
    fn update_before_start_only_changes_config() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), false).unwrap();

      let patch = Config {
        width: Some(50),
        ..Config::default()
      };
      service.update_window(&"w1".into(), &patch).unwrap();
      assert!(platform.window_manager.ops().is_empty());

      service.start_window(&"w1".into()).unwrap();
      assert_eq!(platform.window_manager.layout(&"w1".into()).unwrap().width, 50);
    }

    #[test]
    fn show_keeps_lifecycle() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), true).unwrap();

      assert_eq!(service.show_window(&"w1".into(), false).unwrap(), Some(true));
      let window = service.window(&"w1".into()).unwrap();
      assert!(window.is_started());
      assert!(!platform.surfaces.probe(&"w1".into()).unwrap().visible);
    }
  }

  mod destroy {
    use super::*;

    #[test]
    fn soft_close_keeps_engine_for_restart() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), overlay("overlay"), true).unwrap();

      assert_eq!(service.close_window(&"w1".into(), false), Some(true));
      let window = service.window(&"w1".into()).unwrap();
      assert_eq!(window.lifecycle(), Lifecycle::Paused);
      assert!(!platform.window_manager.is_attached(&"w1".into()));

      service.start_window(&"w1".into()).unwrap();
      assert!(window.is_started());
      assert_eq!(platform.engines.launches().len(), 1);
      let engine = platform.engines.engine("w1").unwrap();
      assert_eq!(engine.resumed(), 2);
      assert_eq!(engine.paused(), 1);
    }

    #[test]
    fn hard_close_removes_everything() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), true).unwrap();
      let window = service.window(&"w1".into()).unwrap();

      assert_eq!(service.close_window(&"w1".into(), true), Some(true));
      assert!(service.window(&"w1".into()).is_none());
      assert_eq!(window.lifecycle(), Lifecycle::Destroyed);
      assert!(platform.engines.engine("w1").unwrap().is_destroyed());
      assert!(!service.inner.engines.lock().contains(window.engine_key()));

      // a new window with the same id gets a new engine
      service.create_window("w1".into(), Config::default(), false).unwrap();
      assert_eq!(platform.engines.launches().len(), 2);
    }

    #[test]
    fn recreate_after_soft_close_is_duplicate() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), true).unwrap();
      service.close_window(&"w1".into(), false);
      assert!(service
        .create_window("w1".into(), Config::default(), true)
        .unwrap()
        .is_none());
    }

    #[test]
    fn soft_close_of_unstarted_window_skips_window_manager() {
      let platform = HeadlessPlatform::new();
      let service = platform.build_service();
      service.create_window("w1".into(), Config::default(), false).unwrap();
      service.close_window(&"w1".into(), false);
      assert!(platform.window_manager.ops().is_empty());
    }
  }
}
