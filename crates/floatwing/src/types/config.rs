/*!
Overlay window configuration.

Every field is optional. A `Config` received from a caller is either a full
description (on create) or a patch (on update): patches only overwrite the
fields they carry, and never touch the launch fields (`entry`, `route`,
`callback`).
*/

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use super::layout::{gravity, LayoutParams, PlatformPolicy, WindowFlags, PIXEL_FORMAT_TRANSPARENT};
use super::FloatwingResult;

/// Typed, partially-optional overlay window configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Config {
  // Launch: fixed once the window exists
  /// Entrypoint name the window's engine runs.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entry: Option<String>,
  /// Initial navigation route.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub route: Option<String>,
  /// Handle of a pre-registered launch callback. Takes precedence over `entry`.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  #[ts(type = "number | null")]
  pub callback: Option<i64>,

  // Geometry
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub width: Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub height: Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub x: Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub y: Option<i32>,

  // Presentation
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub format: Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub gravity: Option<i32>,
  /// Platform window category.
  #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
  pub window_type: Option<i32>,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub clickable: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub draggable: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub focusable: Option<bool>,
  /// Lift the screen-bounds restriction on layout.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub immersion: Option<bool>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub visible: Option<bool>,
  /// Let the renderer size the overlay to its content.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub autosize: Option<bool>,
}

fn overwrite<T: Copy>(slot: &mut Option<T>, patch: Option<T>) {
  if patch.is_some() {
    *slot = patch;
  }
}

impl Config {
  /// Parse a config from an untyped value, failing on wrongly-typed fields.
  ///
  /// Unknown keys are ignored.
  pub fn from_value(value: Value) -> FloatwingResult<Self> {
    Ok(serde_json::from_value(value)?)
  }

  /// Merge `patch` into `self` in place.
  pub fn apply(&mut self, patch: &Config) {
    // entry, route and callback are fixed at creation
    overwrite(&mut self.width, patch.width);
    overwrite(&mut self.height, patch.height);
    overwrite(&mut self.x, patch.x);
    overwrite(&mut self.y, patch.y);

    overwrite(&mut self.format, patch.format);
    overwrite(&mut self.gravity, patch.gravity);
    overwrite(&mut self.window_type, patch.window_type);

    overwrite(&mut self.clickable, patch.clickable);
    overwrite(&mut self.draggable, patch.draggable);
    overwrite(&mut self.focusable, patch.focusable);
    overwrite(&mut self.immersion, patch.immersion);
    overwrite(&mut self.visible, patch.visible);
    overwrite(&mut self.autosize, patch.autosize);
  }

  /// Return a copy of `self` with `patch` merged in.
  #[must_use]
  pub fn merge(&self, patch: &Config) -> Config {
    let mut merged = self.clone();
    merged.apply(patch);
    merged
  }

  /// Patch that only moves the window.
  pub fn position(x: i32, y: i32) -> Self {
    Self {
      x: Some(x),
      y: Some(y),
      ..Self::default()
    }
  }

  pub fn is_draggable(&self) -> bool {
    self.draggable == Some(true)
  }

  /// Derive platform layout parameters.
  pub fn to_layout_params(&self, policy: &PlatformPolicy) -> LayoutParams {
    let mut flags = WindowFlags::LAYOUT_IN_SCREEN | WindowFlags::NOT_TOUCH_MODAL;
    if self.immersion == Some(true) {
      flags.insert(WindowFlags::LAYOUT_NO_LIMITS);
    }
    if self.clickable == Some(false) {
      flags.insert(WindowFlags::NOT_TOUCHABLE);
    }
    if !self.focusable.unwrap_or(policy.focusable_by_default) {
      flags.insert(WindowFlags::NOT_FOCUSABLE);
    }

    LayoutParams {
      // 1px placeholder so the renderer can work out its pixel ratio
      width: self.width.unwrap_or(1),
      height: self.height.unwrap_or(1),
      x: self.x,
      y: self.y,
      format: self.format.unwrap_or(PIXEL_FORMAT_TRANSPARENT),
      gravity: self.gravity.unwrap_or(policy.default_gravity),
      flags,
      window_type: self.window_type.unwrap_or_else(|| policy.overlay_window_type()),
    }
  }
}


#[cfg(test)]
mod proptests {
  use super::*;
  use proptest::option;
  use proptest::prelude::*;

  fn config() -> impl Strategy<Value = Config> {
    (
      (
        option::of("[a-z]{1,8}"),
        option::of("/[a-z]{0,8}"),
        option::of(1i64..1000),
        option::of(-2i32..2000),
        option::of(-2i32..2000),
        option::of(-2000i32..2000),
        option::of(-2000i32..2000),
      ),
      (
        option::of(-3i32..5),
        option::of(0i32..128),
        option::of(2000i32..2050),
        option::of(any::<bool>()),
        option::of(any::<bool>()),
        option::of(any::<bool>()),
        option::of(any::<bool>()),
        option::of(any::<bool>()),
        option::of(any::<bool>()),
      ),
    )
      .prop_map(
        |(
          (entry, route, callback, width, height, x, y),
          (format, gravity, window_type, clickable, draggable, focusable, immersion, visible, autosize),
        )| Config {
          entry,
          route,
          callback,
          width,
          height,
          x,
          y,
          format,
          gravity,
          window_type,
          clickable,
          draggable,
          focusable,
          immersion,
          visible,
          autosize,
        },
      )
  }

  proptest! {
    /// Each field takes the patch value when present, the base value otherwise
    #[test]
    fn merge_overrides_if_present(base in config(), patch in config()) {
      let merged = base.merge(&patch);
      prop_assert_eq!(merged.width, patch.width.or(base.width));
      prop_assert_eq!(merged.height, patch.height.or(base.height));
      prop_assert_eq!(merged.x, patch.x.or(base.x));
      prop_assert_eq!(merged.y, patch.y.or(base.y));
      prop_assert_eq!(merged.format, patch.format.or(base.format));
      prop_assert_eq!(merged.gravity, patch.gravity.or(base.gravity));
      prop_assert_eq!(merged.window_type, patch.window_type.or(base.window_type));
      prop_assert_eq!(merged.clickable, patch.clickable.or(base.clickable));
      prop_assert_eq!(merged.draggable, patch.draggable.or(base.draggable));
      prop_assert_eq!(merged.focusable, patch.focusable.or(base.focusable));
      prop_assert_eq!(merged.immersion, patch.immersion.or(base.immersion));
      prop_assert_eq!(merged.visible, patch.visible.or(base.visible));
      prop_assert_eq!(merged.autosize, patch.autosize.or(base.autosize));
    }

    /// Launch fields always come from the base
    #[test]
    fn merge_keeps_launch_fields(base in config(), patch in config()) {
      let merged = base.merge(&patch);
      prop_assert_eq!(merged.entry, base.entry);
      prop_assert_eq!(merged.route, base.route);
      prop_assert_eq!(merged.callback, base.callback);
    }

    /// Applying patches one by one equals applying their merge
    #[test]
    fn sequential_patches_compose(base in config(), p1 in config(), p2 in config()) {
      let sequential = base.merge(&p1).merge(&p2);
      let combined = base.merge(&p1.merge(&p2));
      prop_assert_eq!(sequential, combined);
    }

    /// Width and height are never zero-sized placeholders
    #[test]
    fn layout_size_defaults_to_one(c in config()) {
      let params = c.to_layout_params(&PlatformPolicy::default());
      prop_assert_eq!(params.width, c.width.unwrap_or(1));
      prop_assert_eq!(params.height, c.height.unwrap_or(1));
    }
  }
}
