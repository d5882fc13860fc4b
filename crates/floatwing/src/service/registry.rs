/*!
Window registry - every live window, keyed by id.

Plain data. Callers take the service's lock around it and never call into a
window or the platform while holding it.
*/

use std::collections::{HashMap, HashSet};

use crate::types::WindowId;
use crate::window::Window;

#[derive(Debug, Default)]
pub(crate) struct Registry {
  windows: HashMap<WindowId, Window>,
  /// Ids claimed by a create that has not registered its window yet.
  reserved: HashSet<WindowId>,
}

impl Registry {
  pub(crate) fn new() -> Self {
    Self::default()
  }

  pub(crate) fn get(&self, id: &WindowId) -> Option<Window> {
    self.windows.get(id).cloned()
  }

  pub(crate) fn contains(&self, id: &WindowId) -> bool {
    self.windows.contains_key(id)
  }

  /// Claim `id` for a window under construction. False if the id is taken or claimed.
  pub(crate) fn reserve(&mut self, id: &WindowId) -> bool {
    if self.windows.contains_key(id) {
      return false;
    }
    self.reserved.insert(id.clone())
  }

  /// Give up a claim made with `reserve`.
  pub(crate) fn release(&mut self, id: &WindowId) {
    self.reserved.remove(id);
  }

  /// Register a window, settling any claim on its id. Hands it back if the id is taken.
  pub(crate) fn insert(&mut self, window: Window) -> Result<(), Window> {
    if self.windows.contains_key(window.id()) {
      return Err(window);
    }
    self.reserved.remove(window.id());
    self.windows.insert(window.id().clone(), window);
    Ok(())
  }

  /// Remove `window`'s entry, but only if it still maps to that instance.
  pub(crate) fn remove(&mut self, window: &Window) -> Option<Window> {
    match self.windows.get(window.id()) {
      Some(existing) if existing.same_as(window) => self.windows.remove(window.id()),
      Some(_) | None => None,
    }
  }

  /// Snapshot of every window, ordered by id.
  pub(crate) fn windows(&self) -> Vec<Window> {
    let mut windows: Vec<Window> = self.windows.values().cloned().collect();
    windows.sort_by(|a, b| a.id().cmp(b.id()));
    windows
  }

  pub(crate) fn len(&self) -> usize {
    self.windows.len()
  }

  pub(crate) fn clear(&mut self) {
    self.windows.clear();
    self.reserved.clear();
  }
}
