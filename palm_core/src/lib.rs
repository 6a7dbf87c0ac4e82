//! # palm_core
//!
//! Gesture-interpretation state machine for a hand-controlled RGB light.
//!
//! An external hand-pose estimator reports 21 normalized landmarks per hand.
//! Each frame this crate derives the palm center and the fist distance, then
//! updates a [`ControlState`] and composes a [`Command`] for the light.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Condition | Action |
//! |---|---|---|
//! | Fist | thumb tip within `fist_threshold` of palm | Toggle lock (debounced; repeats while held) |
//! | Palm up / down | palm `y` | Brightness `round(255·(1−y))` while unlocked |
//! | Palm right | palm `x > 0.5 + color_step` | Select `right_zone_color` (debounced) |
//! | Palm left | palm `x < 0.5 − color_step` | Select `left_zone_color` (debounced) |
//!
//! ## Quick start
//!
//! ```rust
//! use std::time::Instant;
//! use palm_core::{process, synthetic_hand, ControlState, GestureConfig};
//!
//! let cfg = GestureConfig::default();
//! let hand = synthetic_hand(0.5, 0.0, false);   // open hand, top center
//! let (state, cmd) = process(ControlState::new(), &hand, Instant::now(), &cfg);
//! assert_eq!(state.brightness, 255);
//! assert_eq!(cmd.wire_line(), "255,0,0,0\n");
//! ```

pub mod command;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod landmark;
pub mod lock;
pub mod mapper;
pub mod state;

pub use command::{compose, Command};
pub use config::{GestureConfig, DEFAULT_PALETTE};
pub use engine::{process, step};
pub use error::GestureError;
pub use landmark::{synthetic_hand, Hand, HandGeometry, Landmark, LANDMARK_COUNT};
pub use lock::detect_and_toggle;
pub use mapper::{brightness_for, color_zone, map_position, ColorZone};
pub use state::ControlState;
