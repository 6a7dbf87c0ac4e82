//! Error type for the gesture core.

use std::fmt;

/// Errors raised by the gesture core.
///
/// None of these are fatal to a control loop: a malformed hand is skipped for
/// its frame, and a bad configuration is rejected before the loop starts.
#[derive(Clone, Debug, PartialEq)]
pub enum GestureError {
    /// A hand arrived with fewer than 21 landmarks.
    MalformedLandmarkSet { got: usize },
    /// A [`GestureConfig`](crate::GestureConfig) failed validation.
    InvalidConfig(String),
}

impl fmt::Display for GestureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureError::MalformedLandmarkSet { got } => {
                write!(f, "malformed landmark set: expected 21 points, got {}", got)
            }
            GestureError::InvalidConfig(why) => write!(f, "invalid gesture config: {}", why),
        }
    }
}

impl std::error::Error for GestureError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_point_count() {
        let e = GestureError::MalformedLandmarkSet { got: 7 };
        assert_eq!(e.to_string(), "malformed landmark set: expected 21 points, got 7");
    }
}
