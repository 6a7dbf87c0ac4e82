//! Output commands and their wire format.
//!
//! One line per command, ASCII, comma separated, newline terminated:
//!
//! ```text
//! <r>,<g>,<b>,<lock>\n        r,g,b ∈ 0..=255   lock ∈ {0, 1}
//! ```
//!
//! The receiving firmware parses exactly this shape; field order, the comma
//! delimiter and the `\n` terminator must not change.

use std::fmt;

use rgb::RGB8;

use crate::state::ControlState;

/// A single light command: the scaled color plus the lock flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Command {
    pub r:      u8,
    pub g:      u8,
    pub b:      u8,
    pub locked: bool,
}

impl Command {
    pub fn color(&self) -> RGB8 {
        RGB8 { r: self.r, g: self.g, b: self.b }
    }

    /// The full wire line including the trailing newline.
    pub fn wire_line(&self) -> String {
        format!("{}\n", self)
    }
}

/// `r,g,b,lock` without the line terminator.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.r, self.g, self.b, u8::from(self.locked))
    }
}

/// Scale one channel by `brightness / 255`, rounding to nearest.
fn scale_channel(base: u8, brightness: u8) -> u8 {
    let v = f64::from(base) * f64::from(brightness) / 255.0;
    v.round().clamp(0.0, 255.0) as u8
}

/// Build the command for `state` against `palette`.
///
/// Runs every hand-bearing frame, locked or not, so the lock flag is always
/// transmitted.  An index outside the palette composes black.
pub fn compose(state: &ControlState, palette: &[RGB8]) -> Command {
    let base = palette.get(state.color_index).copied().unwrap_or_default();
    Command {
        r:      scale_channel(base.r, state.brightness),
        g:      scale_channel(base.g, state.brightness),
        b:      scale_channel(base.b, state.brightness),
        locked: state.lock_engaged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PALETTE;

    #[test]
    fn full_red_unlocked() {
        let s = ControlState { brightness: 255, color_index: 0, ..ControlState::new() };
        let c = compose(&s, &DEFAULT_PALETTE);
        assert_eq!(c, Command { r: 255, g: 0, b: 0, locked: false });
        assert_eq!(c.wire_line(), "255,0,0,0\n");
    }

    #[test]
    fn lock_flag_is_one_when_locked() {
        let s = ControlState { lock_engaged: true, brightness: 0, ..ControlState::new() };
        assert_eq!(compose(&s, &DEFAULT_PALETTE).wire_line(), "0,0,0,1\n");
    }

    #[test]
    fn half_brightness_rounds() {
        // purple (128, 0, 128) at 128/255 → 64.25 → 64
        let s = ControlState { brightness: 128, color_index: 5, ..ControlState::new() };
        let c = compose(&s, &DEFAULT_PALETTE);
        assert_eq!((c.r, c.g, c.b), (64, 0, 64));
        // cyan (0, 255, 255) at 128 → 128
        let s = ControlState { color_index: 3, ..s };
        assert_eq!(compose(&s, &DEFAULT_PALETTE).color(), RGB8 { r: 0, g: 128, b: 128 });
    }

    #[test]
    fn compose_is_idempotent() {
        let s = ControlState { brightness: 77, color_index: 4, ..ControlState::new() };
        let a = compose(&s, &DEFAULT_PALETTE);
        let b = compose(&s, &DEFAULT_PALETTE);
        assert_eq!(a, b);
        assert_eq!(a.wire_line().as_bytes(), b.wire_line().as_bytes());
    }

    #[test]
    fn index_outside_palette_composes_black() {
        let s = ControlState { color_index: 99, brightness: 255, ..ControlState::new() };
        assert_eq!(compose(&s, &DEFAULT_PALETTE).color(), RGB8::default());
    }

    #[test]
    fn display_has_no_terminator() {
        let c = Command { r: 1, g: 22, b: 255, locked: true };
        assert_eq!(c.to_string(), "1,22,255,1");
    }
}
