/*! Pointer input delivered to an overlay surface. */

use super::Point;

/// Phase of a pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
  Down,
  Move,
  Up,
  Cancel,
}

/// One pointer sample in raw screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
  pub action: PointerAction,
  pub raw: Point,
}

impl PointerEvent {
  pub const fn new(action: PointerAction, x: f64, y: f64) -> Self {
    Self {
      action,
      raw: Point::new(x, y),
    }
  }

  pub const fn down(x: f64, y: f64) -> Self {
    Self::new(PointerAction::Down, x, y)
  }

  pub const fn moved(x: f64, y: f64) -> Self {
    Self::new(PointerAction::Move, x, y)
  }

  pub const fn up(x: f64, y: f64) -> Self {
    Self::new(PointerAction::Up, x, y)
  }
}
