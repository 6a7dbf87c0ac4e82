//! Fist-driven lock toggle.
//!
//! # Algorithm
//!
//! * A hand is a **fist** when its fist distance is strictly below the
//!   configured threshold.
//! * Every frame with a fist re-checks the lock debounce; if the window has
//!   elapsed the lock flips and the toggle time is recorded.
//!
//! The check is level-triggered: holding a fist keeps flipping the lock once
//! per debounce interval (lock, unlock, lock, ...).  Releasing the fist is
//! not required between toggles.

use std::time::Instant;

use crate::config::GestureConfig;
use crate::debounce;
use crate::state::ControlState;

/// True if `fist_distance` counts as a clenched hand.
pub fn is_fist(fist_distance: f32, cfg: &GestureConfig) -> bool {
    fist_distance < cfg.fist_threshold
}

/// Flip the lock if a fist is present and the lock debounce has elapsed.
/// Otherwise the state is returned unchanged.
pub fn detect_and_toggle(
    fist_distance: f32,
    now:           Instant,
    state:         ControlState,
    cfg:           &GestureConfig,
) -> ControlState {
    if !is_fist(fist_distance, cfg) {
        return state;
    }
    if !debounce::ready(state.last_lock_toggle, now, cfg.lock_debounce) {
        return state;
    }

    let next = ControlState {
        lock_engaged:     !state.lock_engaged,
        last_lock_toggle: Some(now),
        ..state
    };
    log::info!(
        "lock {} (fist distance {:.3})",
        if next.lock_engaged { "engaged" } else { "released" },
        fist_distance
    );
    next
}
