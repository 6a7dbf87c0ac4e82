//! Palm position → brightness and color selection.
//!
//! Vertical position drives brightness continuously (palm near the top of the
//! frame is brighter).  Horizontal position selects a color through three
//! zones around the frame center:
//!
//! ```text
//!   0.0        0.5-step   0.5   0.5+step        1.0
//!    |   Left     |    dead-band    |    Right    |
//! ```
//!
//! Left and Right each select one fixed palette index; the dead-band leaves
//! the color alone.  Zone switches are rate-limited by the color debounce.

use std::time::Instant;

use crate::config::GestureConfig;
use crate::debounce;
use crate::landmark::Landmark;
use crate::state::ControlState;

/// Horizontal zone of the palm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorZone {
    Left,
    Center,
    Right,
}

/// Classify `palm_x` against `0.5 ± step`.  Both boundaries belong to the
/// dead-band.
pub fn color_zone(palm_x: f32, step: f32) -> ColorZone {
    if palm_x > 0.5 + step {
        ColorZone::Right
    } else if palm_x < 0.5 - step {
        ColorZone::Left
    } else {
        ColorZone::Center
    }
}

/// `clamp(round(255 · (1 − palm_y)), 0, 255)`, rounding halves away from zero.
pub fn brightness_for(palm_y: f32) -> u8 {
    let level = (255.0 * (1.0 - f64::from(palm_y))).round();
    level.clamp(0.0, 255.0) as u8
}

/// Update brightness and color from the palm position.
///
/// A locked state is returned untouched.  A palm with non-finite coordinates
/// is ignored for the frame.
pub fn map_position(
    palm:  Landmark,
    now:   Instant,
    state: ControlState,
    cfg:   &GestureConfig,
) -> ControlState {
    if state.lock_engaged {
        return state;
    }
    if !palm.x.is_finite() || !palm.y.is_finite() {
        return state;
    }

    let mut next = ControlState { brightness: brightness_for(palm.y), ..state };

    let target = match color_zone(palm.x, cfg.color_step) {
        ColorZone::Right  => cfg.right_zone_color,
        ColorZone::Left   => cfg.left_zone_color,
        ColorZone::Center => return next,
    };

    if debounce::ready(state.last_color_change, now, cfg.color_debounce) {
        if target != state.color_index {
            log::info!("color {} → {}", state.color_index, target);
        }
        next.color_index       = target;
        next.last_color_change = Some(now);
    }
    next
}
