/*!
Platform layout descriptor handed to the window manager.

Constants mirror the Android `WindowManager.LayoutParams` values so a JNI
bridge can pass them through untouched.
*/

use serde::Serialize;
use std::ops::BitOr;

/// `PixelFormat.TRANSPARENT`
pub const PIXEL_FORMAT_TRANSPARENT: i32 = -2;

/// `TYPE_APPLICATION_OVERLAY`, available from SDK 26.
pub const TYPE_APPLICATION_OVERLAY: i32 = 2038;
/// `TYPE_PHONE`, the overlay category before SDK 26.
pub const TYPE_PHONE: i32 = 2002;

/// Anchor values for `gravity`.
pub mod gravity {
  pub const CENTER: i32 = 17;
  pub const TOP: i32 = 48;
  pub const BOTTOM: i32 = 80;
  pub const LEFT: i32 = 3;
  pub const RIGHT: i32 = 5;
  pub const TOP_LEFT: i32 = TOP | LEFT;
}

/// Window flag bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct WindowFlags(u32);

impl WindowFlags {
  pub const NOT_FOCUSABLE: Self = Self(0x0000_0008);
  pub const NOT_TOUCHABLE: Self = Self(0x0000_0010);
  pub const NOT_TOUCH_MODAL: Self = Self(0x0000_0020);
  pub const LAYOUT_IN_SCREEN: Self = Self(0x0000_0100);
  pub const LAYOUT_NO_LIMITS: Self = Self(0x0000_0200);

  pub const fn empty() -> Self {
    Self(0)
  }

  pub const fn bits(self) -> u32 {
    self.0
  }

  pub const fn contains(self, other: Self) -> bool {
    self.0 & other.0 == other.0
  }

  pub fn insert(&mut self, other: Self) {
    self.0 |= other.0;
  }
}

impl BitOr for WindowFlags {
  type Output = Self;

  fn bitor(self, rhs: Self) -> Self {
    Self(self.0 | rhs.0)
  }
}

/// Layout parameters for one overlay surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutParams {
  pub width: i32,
  pub height: i32,
  /// Fixed position. `None` lets the platform place the window by `gravity`.
  pub x: Option<i32>,
  pub y: Option<i32>,
  pub format: i32,
  pub gravity: i32,
  pub flags: WindowFlags,
  pub window_type: i32,
}

impl LayoutParams {
  /// Current position, treating an unset coordinate as the gravity origin.
  pub fn origin(&self) -> (i32, i32) {
    (self.x.unwrap_or(0), self.y.unwrap_or(0))
  }
}

/// Platform-version dependent layout choices.
///
/// Older releases of the overlay plugin anchored windows differently and only
/// blocked focus when asked to; both are explicit here instead of implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformPolicy {
  /// Platform SDK level of the device.
  pub sdk_int: u32,
  /// Gravity used when a config leaves it unset.
  pub default_gravity: i32,
  /// Whether a window whose config leaves `focusable` unset takes focus.
  pub focusable_by_default: bool,
}

impl PlatformPolicy {
  /// First SDK level with `TYPE_APPLICATION_OVERLAY` and foreground promotion.
  pub const SDK_OVERLAY_TYPE: u32 = 26;

  /// Overlay window category for this platform level.
  pub const fn overlay_window_type(&self) -> i32 {
    if self.sdk_int >= Self::SDK_OVERLAY_TYPE {
      TYPE_APPLICATION_OVERLAY
    } else {
      TYPE_PHONE
    }
  }

  pub const fn supports_foreground_promotion(&self) -> bool {
    self.sdk_int >= Self::SDK_OVERLAY_TYPE
  }
}

impl Default for PlatformPolicy {
  fn default() -> Self {
    Self {
      sdk_int: Self::SDK_OVERLAY_TYPE,
      default_gravity: gravity::CENTER,
      focusable_by_default: false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_union_and_contains() {
    let flags = WindowFlags::LAYOUT_IN_SCREEN | WindowFlags::NOT_TOUCH_MODAL;
    assert!(flags.contains(WindowFlags::LAYOUT_IN_SCREEN));
    assert!(flags.contains(WindowFlags::NOT_TOUCH_MODAL));
    assert!(!flags.contains(WindowFlags::NOT_FOCUSABLE));
    assert_eq!(flags.bits(), 0x120);
  }

  #[test]
  fn empty_flags_contain_only_empty() {
    assert!(WindowFlags::empty().contains(WindowFlags::empty()));
    assert!(!WindowFlags::empty().contains(WindowFlags::NOT_TOUCHABLE));
  }

  #[test]
  fn origin_defaults_unset_axes_to_zero() {
    let mut params = crate::types::Config::default().to_layout_params(&PlatformPolicy::default());
    assert_eq!(params.origin(), (0, 0));
    params.x = Some(12);
    assert_eq!(params.origin(), (12, 0));
  }

  #[test]
  fn window_type_depends_on_sdk() {
    let modern = PlatformPolicy::default();
    let legacy = PlatformPolicy {
      sdk_int: 22,
      ..modern
    };
    assert_eq!(modern.overlay_window_type(), TYPE_APPLICATION_OVERLAY);
    assert_eq!(legacy.overlay_window_type(), TYPE_PHONE);
    assert!(!legacy.supports_foreground_promotion());
  }
}
