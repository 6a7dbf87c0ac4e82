//! The control state carried from frame to frame.

use std::time::Instant;

/// Brightness at process start.
pub const INITIAL_BRIGHTNESS: u8 = 128;

/// Everything the gesture state machine remembers between frames.
///
/// Values are threaded explicitly: [`step`](crate::step) takes a state and
/// returns the next one.  `brightness` is a `u8`, so it cannot leave
/// `[0, 255]`; `color_index` is only ever set to validated palette indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlState {
    pub lock_engaged:      bool,
    pub brightness:        u8,
    pub color_index:       usize,
    /// When the lock last flipped; `None` until the first toggle.
    pub last_lock_toggle:  Option<Instant>,
    /// When a color zone last fired; `None` until the first switch.
    pub last_color_change: Option<Instant>,
}

impl Default for ControlState {
    fn default() -> Self {
        ControlState {
            lock_engaged:      false,
            brightness:        INITIAL_BRIGHTNESS,
            color_index:       0,
            last_lock_toggle:  None,
            last_color_change: None,
        }
    }
}

impl ControlState {
    pub fn new() -> Self { Self::default() }

    pub fn is_locked(&self) -> bool { self.lock_engaged }
}
