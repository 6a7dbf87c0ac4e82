//! Non-blocking rate limiting for discrete gesture actions.
//!
//! Each rate-limited action keeps its own last-trigger timestamp; an action
//! may fire again only once its interval has elapsed.  Nothing here sleeps,
//! so frame consumption is never stalled by a debounce window.

use std::time::{Duration, Instant};

/// True if an action last fired at `last` may fire again at `now`.
///
/// `None` means the action has never fired.  A `now` earlier than `last`
/// counts as zero elapsed time.
pub fn ready(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    match last {
        None    => true,
        Some(t) => now.saturating_duration_since(t) >= interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn never_fired_is_ready() {
        assert!(ready(None, Instant::now(), WINDOW));
    }

    #[test]
    fn blocks_inside_window() {
        let t0 = Instant::now();
        assert!(!ready(Some(t0), t0 + Duration::from_millis(499), WINDOW));
    }

    #[test]
    fn opens_exactly_at_interval() {
        let t0 = Instant::now();
        assert!(ready(Some(t0), t0 + WINDOW, WINDOW));
    }

    #[test]
    fn clock_going_backwards_blocks() {
        let t0 = Instant::now() + Duration::from_secs(5);
        assert!(!ready(Some(t0), t0 - Duration::from_secs(1), WINDOW));
    }
}
