//! Per-frame update: geometry → lock → mapping → compose.

use std::time::Instant;

use crate::command::{compose, Command};
use crate::config::GestureConfig;
use crate::landmark::Hand;
use crate::lock::detect_and_toggle;
use crate::mapper::map_position;
use crate::state::ControlState;

/// Advance the state machine by one hand-bearing frame.
///
/// The lock check runs first, so a frame that engages the lock does not also
/// move brightness or color.
pub fn step(state: ControlState, hand: &Hand, now: Instant, cfg: &GestureConfig) -> ControlState {
    let geo   = hand.geometry();
    let state = detect_and_toggle(geo.fist_distance, now, state, cfg);
    map_position(geo.palm, now, state, cfg)
}

/// [`step`] followed by [`compose`]: the next state and the command to send.
pub fn process(
    state: ControlState,
    hand:  &Hand,
    now:   Instant,
    cfg:   &GestureConfig,
) -> (ControlState, Command) {
    let next = step(state, hand, now, cfg);
    let cmd  = compose(&next, &cfg.palette);
    (next, cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::synthetic_hand;
    use std::time::Duration;

    #[test]
    fn open_hand_maps_position() {
        let cfg = GestureConfig::default();
        let (s, cmd) = process(ControlState::new(), &synthetic_hand(0.8, 0.0, false), Instant::now(), &cfg);
        assert!(!s.lock_engaged);
        assert_eq!(s.brightness, 255);
        assert_eq!(s.color_index, cfg.right_zone_color);
        assert_eq!(cmd.wire_line(), "0,255,255,0\n");
    }

    #[test]
    fn locking_frame_does_not_map() {
        let cfg = GestureConfig::default();
        let (s, cmd) = process(ControlState::new(), &synthetic_hand(0.1, 1.0, true), Instant::now(), &cfg);
        assert!(s.lock_engaged);
        assert_eq!(s.brightness, 128);
        assert_eq!(s.color_index, 0);
        assert_eq!(cmd.wire_line(), "128,0,0,1\n");
    }

    #[test]
    fn unlocking_frame_maps_immediately() {
        let cfg = GestureConfig::default();
        let t0 = Instant::now();
        let s = step(ControlState::new(), &synthetic_hand(0.5, 0.5, true), t0, &cfg);
        assert!(s.lock_engaged);
        let s = step(s, &synthetic_hand(0.5, 0.0, true), t0 + Duration::from_millis(500), &cfg);
        assert!(!s.lock_engaged);
        assert_eq!(s.brightness, 255);
    }
}
