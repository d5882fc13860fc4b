/*!
Drag gesture tracking.

Pure state machine over pointer samples; the window turns its steps into
position updates and events. Motion is measured from the last accepted
sample, so a run of tiny moves only counts once it adds up past the
threshold. That keeps taps from turning into drags.
*/

use crate::types::{Point, PointerAction, PointerEvent};

/// Squared distance (px²) a pointer must travel before a move counts.
pub(crate) const DRAG_THRESHOLD_SQUARED: f64 = 25.0;

/// What a pointer sample means for the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum DragStep {
  /// Not (yet) a drag. The touch is left to the surface.
  Pass,
  /// Window should move by the delta. `first` marks the move that starts the drag.
  Move { dx: f64, dy: f64, first: bool },
  /// Drag released at this raw pointer position.
  End(Point),
}

#[derive(Debug, Default)]
pub(crate) struct DragTracker {
  last: Option<Point>,
  dragging: bool,
}

impl DragTracker {
  pub(crate) const fn is_dragging(&self) -> bool {
    self.dragging
  }

  pub(crate) fn on_pointer(&mut self, event: &PointerEvent) -> DragStep {
    match event.action {
      PointerAction::Down => {
        self.last = Some(event.raw);
        self.dragging = false;
        DragStep::Pass
      }
      PointerAction::Move => {
        let Some(last) = self.last else {
          // move without a press: start measuring from here
          self.last = Some(event.raw);
          return DragStep::Pass;
        };
        if event.raw.distance_squared(last) < DRAG_THRESHOLD_SQUARED {
          return DragStep::Pass;
        }

        let (dx, dy) = event.raw.delta_from(last);
        self.last = Some(event.raw);
        let first = !self.dragging;
        self.dragging = true;
        DragStep::Move { dx, dy, first }
      }
      PointerAction::Up | PointerAction::Cancel => {
        let was_dragging = self.dragging;
        self.dragging = false;
        self.last = None;
        if was_dragging {
          DragStep::End(event.raw)
        } else {
          DragStep::Pass
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tap_is_not_a_drag() {
    let mut tracker = DragTracker::default();
    assert_eq!(tracker.on_pointer(&PointerEvent::down(0.0, 0.0)), DragStep::Pass);
    assert_eq!(tracker.on_pointer(&PointerEvent::moved(2.0, 2.0)), DragStep::Pass);
    assert_eq!(tracker.on_pointer(&PointerEvent::up(2.0, 2.0)), DragStep::Pass);
    assert!(!tracker.is_dragging());
  }

  #[test]
  fn exactly_threshold_distance_starts_drag() {
    let mut tracker = DragTracker::default();
    tracker.on_pointer(&PointerEvent::down(0.0, 0.0));
    assert_eq!(
      tracker.on_pointer(&PointerEvent::moved(3.0, 4.0)),
      DragStep::Move {
        dx: 3.0,
        dy: 4.0,
        first: true
      }
    );
  }

  #[test]
  fn small_moves_accumulate_from_last_accepted_sample() {
    let mut tracker = DragTracker::default();
    tracker.on_pointer(&PointerEvent::down(0.0, 0.0));
    assert_eq!(tracker.on_pointer(&PointerEvent::moved(2.0, 0.0)), DragStep::Pass);
    assert_eq!(tracker.on_pointer(&PointerEvent::moved(4.0, 0.0)), DragStep::Pass);
    assert_eq!(
      tracker.on_pointer(&PointerEvent::moved(6.0, 0.0)),
      DragStep::Move {
        dx: 6.0,
        dy: 0.0,
        first: true
      }
    );
  }

  #[test]
  fn later_moves_are_not_first() {
    let mut tracker = DragTracker::default();
    tracker.on_pointer(&PointerEvent::down(0.0, 0.0));
    tracker.on_pointer(&PointerEvent::moved(10.0, 0.0));
    assert_eq!(
      tracker.on_pointer(&PointerEvent::moved(10.0, 10.0)),
      DragStep::Move {
        dx: 0.0,
        dy: 10.0,
        first: false
      }
    );
  }

  #[test]
  fn release_after_drag_reports_raw_position() {
    let mut tracker = DragTracker::default();
    tracker.on_pointer(&PointerEvent::down(0.0, 0.0));
    tracker.on_pointer(&PointerEvent::moved(10.0, 0.0));
    assert_eq!(
      tracker.on_pointer(&PointerEvent::up(11.0, 1.0)),
      DragStep::End(Point::new(11.0, 1.0))
    );
    assert!(!tracker.is_dragging());
  }

  #[test]
  fn cancel_ends_a_drag_too() {
    let mut tracker = DragTracker::default();
    tracker.on_pointer(&PointerEvent::down(0.0, 0.0));
    tracker.on_pointer(&PointerEvent::moved(0.0, 10.0));
    let cancel = PointerEvent::new(PointerAction::Cancel, 0.0, 12.0);
    assert_eq!(tracker.on_pointer(&cancel), DragStep::End(Point::new(0.0, 12.0)));
  }

  #[test]
  fn new_press_resets_state() {
    let mut tracker = DragTracker::default();
    tracker.on_pointer(&PointerEvent::down(0.0, 0.0));
    tracker.on_pointer(&PointerEvent::moved(10.0, 0.0));
    tracker.on_pointer(&PointerEvent::down(50.0, 50.0));
    assert!(!tracker.is_dragging());
    assert_eq!(tracker.on_pointer(&PointerEvent::moved(52.0, 50.0)), DragStep::Pass);
  }
}

#[cfg(test)]
mod proptests {
  use super::*;
  use proptest::prelude::*;

  proptest! {
    /// Moves that stay inside the threshold circle around the press never start a drag
    #[test]
    fn sub_threshold_wiggle_never_drags(
      moves in prop::collection::vec((-3.5..3.5f64, -3.5..3.5f64), 0..50)
    ) {
      let mut tracker = DragTracker::default();
      tracker.on_pointer(&PointerEvent::down(100.0, 100.0));
      for (dx, dy) in moves {
        if dx * dx + dy * dy >= DRAG_THRESHOLD_SQUARED {
          continue;
        }
        let step = tracker.on_pointer(&PointerEvent::moved(100.0 + dx, 100.0 + dy));
        prop_assert_eq!(step, DragStep::Pass);
      }
      prop_assert_eq!(tracker.on_pointer(&PointerEvent::up(100.0, 100.0)), DragStep::Pass);
    }

    /// Exactly one move is flagged as first, and a release after it ends the drag
    #[test]
    fn one_start_one_end(
      moves in prop::collection::vec((-20.0..20.0f64, -20.0..20.0f64), 1..50)
    ) {
      let mut tracker = DragTracker::default();
      let (mut x, mut y) = (0.0, 0.0);
      tracker.on_pointer(&PointerEvent::down(x, y));
      let mut starts = 0;
      let mut moved = 0;
      for (dx, dy) in moves {
        x += dx;
        y += dy;
        if let DragStep::Move { first, .. } = tracker.on_pointer(&PointerEvent::moved(x, y)) {
          moved += 1;
          if first {
            starts += 1;
          }
        }
      }
      prop_assert_eq!(starts, usize::from(moved > 0));
      let end = tracker.on_pointer(&PointerEvent::up(x, y));
      if moved > 0 {
        prop_assert_eq!(end, DragStep::End(Point::new(x, y)));
      } else {
        prop_assert_eq!(end, DragStep::Pass);
      }
    }
  }
}
