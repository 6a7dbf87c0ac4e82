//! # palm_light
//!
//! Hand-gesture controller for a serial RGB light.  Landmark frames from an
//! external hand-pose estimator (or a mouse-driven simulation window) run
//! through the [`palm_core`] state machine; every hand-bearing frame yields
//! one `r,g,b,lock` line on the serial link.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Action |
//! |---|---|
//! | Fist (thumb tip near palm center) | Toggle lock; repeats every 0.5 s while held |
//! | Palm up / down | Brighter / darker (unlocked only) |
//! | Palm right of center | Cyan (unlocked only) |
//! | Palm left of center | Yellow (unlocked only) |
//!
//! ## Inputs
//!
//! * `--sim` (default) — **Simulation mode**: the mouse is the palm, `F` is
//!   the fist.
//! * `--stdin`, `--replay <file>`, `--estimator <cmd> [args…]` — JSON lines,
//!   one detection per line (see [`source::JsonLinesSource`]).
//!
//! ### Simulation keys
//!
//! | Key | Gesture |
//! |---|---|
//! | mouse | Palm position |
//! | `F` / hold | Fist |
//! | `Q` / `Esc` | Quit |

pub mod source;
pub mod transport;
pub mod visualizer;
pub mod app;
