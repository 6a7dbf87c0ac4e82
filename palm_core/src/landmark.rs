//! Hand landmarks and the two derived measurements the gestures use.
//!
//! The estimator reports 21 normalized points per hand in the standard hand
//! topology.  Only three of them matter here: the wrist (0), the thumb tip (4)
//! and the middle-finger base (9).

use serde::{Deserialize, Serialize};

use crate::error::GestureError;

/// Number of points in one hand's landmark set.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices used by the gesture logic.
pub mod index {
    pub const WRIST:             usize = 0;
    pub const THUMB_TIP:         usize = 4;
    pub const MIDDLE_FINGER_MCP: usize = 9;
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// A single normalized 2D keypoint.  `x` grows to the right, `y` grows
/// downward; both nominally in `[0, 1]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Landmark { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(&self, other: Landmark) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Midpoint between `self` and `other`.
    pub fn midpoint(&self, other: Landmark) -> Landmark {
        Landmark {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Hand
// ════════════════════════════════════════════════════════════════════════════

/// One detected hand: exactly [`LANDMARK_COUNT`] landmarks.
///
/// The fixed-size array makes every index the gesture code reads valid by
/// construction; short landmark sets are rejected in [`Hand::from_points`].
#[derive(Clone, Debug, PartialEq)]
pub struct Hand {
    points: [Landmark; LANDMARK_COUNT],
}

impl Hand {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Hand { points }
    }

    /// Build a hand from an estimator's point list.
    ///
    /// Fewer than 21 points is a [`GestureError::MalformedLandmarkSet`].
    /// Points past the 21st are ignored.
    pub fn from_points(points: &[Landmark]) -> Result<Self, GestureError> {
        if points.len() < LANDMARK_COUNT {
            return Err(GestureError::MalformedLandmarkSet { got: points.len() });
        }
        let mut out = [Landmark::default(); LANDMARK_COUNT];
        out.copy_from_slice(&points[..LANDMARK_COUNT]);
        Ok(Hand { points: out })
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] { &self.points }

    pub fn wrist(&self)       -> Landmark { self.points[index::WRIST] }
    pub fn thumb_tip(&self)   -> Landmark { self.points[index::THUMB_TIP] }
    pub fn middle_base(&self) -> Landmark { self.points[index::MIDDLE_FINGER_MCP] }

    /// Stabilised palm position: midpoint of wrist and middle-finger base.
    pub fn palm_center(&self) -> Landmark {
        self.wrist().midpoint(self.middle_base())
    }

    /// Thumb tip to palm center distance; small when the hand is clenched.
    pub fn fist_distance(&self) -> f32 {
        self.thumb_tip().distance_to(self.palm_center())
    }

    /// Both derived measurements at once.
    pub fn geometry(&self) -> HandGeometry {
        let palm = self.palm_center();
        HandGeometry {
            palm,
            fist_distance: self.thumb_tip().distance_to(palm),
        }
    }
}

/// Per-frame derived points; never retained across frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandGeometry {
    pub palm:          Landmark,
    pub fist_distance: f32,
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hands
// ════════════════════════════════════════════════════════════════════════════

/// Build a plausible hand whose palm center sits at `(palm_x, palm_y)`.
///
/// With `fist` the thumb tip is placed on the palm center (fist distance 0);
/// otherwise it is spread well beyond any sensible fist threshold.  Used by
/// the simulation source and by tests.
pub fn synthetic_hand(palm_x: f32, palm_y: f32, fist: bool) -> Hand {
    const HALF_PALM: f32 = 0.08;
    let mut points = [Landmark::new(palm_x, palm_y); LANDMARK_COUNT];

    points[index::WRIST]             = Landmark::new(palm_x, palm_y + HALF_PALM);
    points[index::MIDDLE_FINGER_MCP] = Landmark::new(palm_x, palm_y - HALF_PALM);
    points[index::THUMB_TIP] = if fist {
        Landmark::new(palm_x, palm_y)
    } else {
        Landmark::new(palm_x - 0.3, palm_y - 0.1)
    };

    // Remaining fingers fan out above the palm; purely cosmetic.
    for (i, p) in points.iter_mut().enumerate().skip(5) {
        if i == index::MIDDLE_FINGER_MCP { continue; }
        let finger = (i - 5) / 4;
        let joint  = (i - 5) % 4;
        let dx = (finger as f32 - 1.5) * 0.04;
        let dy = if fist { 0.02 } else { 0.05 * joint as f32 };
        *p = Landmark::new(palm_x + dx, palm_y - HALF_PALM - dy);
    }

    Hand { points }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_with(wrist: Landmark, thumb: Landmark, middle: Landmark) -> Hand {
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[index::WRIST]             = wrist;
        points[index::THUMB_TIP]         = thumb;
        points[index::MIDDLE_FINGER_MCP] = middle;
        Hand::new(points)
    }

    #[test]
    fn palm_center_is_wrist_middle_midpoint() {
        let h = hand_with(
            Landmark::new(0.4, 0.8),
            Landmark::new(0.0, 0.0),
            Landmark::new(0.6, 0.4),
        );
        let c = h.palm_center();
        assert!((c.x - 0.5).abs() < 1e-6);
        assert!((c.y - 0.6).abs() < 1e-6);
    }

    #[test]
    fn fist_distance_is_thumb_to_palm() {
        // palm = (0.5, 0.5); thumb 0.3 right, 0.4 down → 0.5
        let h = hand_with(
            Landmark::new(0.5, 0.6),
            Landmark::new(0.8, 0.9),
            Landmark::new(0.5, 0.4),
        );
        assert!((h.fist_distance() - 0.5).abs() < 1e-6);
        assert_eq!(h.geometry().fist_distance, h.fist_distance());
    }

    #[test]
    fn short_landmark_set_is_rejected() {
        let pts = vec![Landmark::default(); 20];
        assert_eq!(
            Hand::from_points(&pts),
            Err(GestureError::MalformedLandmarkSet { got: 20 })
        );
        assert!(Hand::from_points(&[]).is_err());
    }

    #[test]
    fn extra_landmarks_are_ignored() {
        let mut pts = vec![Landmark::new(0.1, 0.1); 25];
        pts[21] = Landmark::new(0.9, 0.9);
        let h = Hand::from_points(&pts).unwrap();
        assert_eq!(h.points().len(), LANDMARK_COUNT);
        assert_eq!(h.points()[20], Landmark::new(0.1, 0.1));
    }

    #[test]
    fn synthetic_hand_places_palm() {
        let h = synthetic_hand(0.3, 0.7, false);
        let c = h.palm_center();
        assert!((c.x - 0.3).abs() < 1e-6);
        assert!((c.y - 0.7).abs() < 1e-6);
        assert!(h.fist_distance() > 0.2);
    }

    #[test]
    fn synthetic_fist_closes_thumb() {
        let h = synthetic_hand(0.5, 0.5, true);
        assert!(h.fist_distance() < 1e-6);
    }
}
