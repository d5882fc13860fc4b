/*! Geometry types for screen coordinates. */

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A 2D point in screen coordinates (pixels).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, TS)]
#[ts(export)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  pub const fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  /// Offset of this point from `origin`.
  pub fn delta_from(&self, origin: Point) -> (f64, f64) {
    (self.x - origin.x, self.y - origin.y)
  }

  /// Squared euclidean distance to another point.
  pub fn distance_squared(&self, other: Point) -> f64 {
    let (dx, dy) = self.delta_from(other);
    dx * dx + dy * dy
  }
}

impl From<(i32, i32)> for Point {
  fn from((x, y): (i32, i32)) -> Self {
    Self::new(f64::from(x), f64::from(y))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn delta_is_signed() {
    let origin = Point::new(10.0, 10.0);
    assert_eq!(Point::new(7.0, 14.0).delta_from(origin), (-3.0, 4.0));
  }

  #[test]
  fn distance_squared_of_3_4_5_triangle() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(3.0, 4.0);
    assert_eq!(a.distance_squared(b), 25.0);
    assert_eq!(b.distance_squared(a), 25.0, "distance should be symmetric");
  }

  #[test]
  fn from_integer_pair() {
    assert_eq!(Point::from((-5, 12)), Point::new(-5.0, 12.0));
  }
}

#[cfg(test)]
mod proptests {
  use super::*;
  use proptest::prelude::*;

  fn coord() -> impl Strategy<Value = f64> {
    -10000.0..10000.0f64
  }

  proptest! {
    /// Distance to self is always zero
    #[test]
    fn distance_to_self_is_zero(x in coord(), y in coord()) {
      let p = Point::new(x, y);
      prop_assert_eq!(p.distance_squared(p), 0.0);
    }

    /// Distance is never negative
    #[test]
    fn distance_non_negative(x1 in coord(), y1 in coord(), x2 in coord(), y2 in coord()) {
      let d = Point::new(x1, y1).distance_squared(Point::new(x2, y2));
      prop_assert!(d >= 0.0);
    }
  }
}
