//! Software-rendered simulation window using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌────────────────────────────────────────────┬──────────────┐
//! │ LEFT ZONE   ┆  dead-band  ┆   RIGHT ZONE   │  COMMAND     │
//! │             ┆             ┆                │  [swatch]    │
//! │             ┆      ◆ palm ┆                │  brightness  │
//! │             ┆             ┆                │  [████░░░]   │
//! │             ┆             ┆                │  LOCKED      │
//! ├────────────────────────────────────────────┴──────────────┤
//! │  status bar                                               │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The field on the left stands in for the camera image: the mouse position
//! inside it is the palm center, and holding `F` closes the hand.

use std::sync::mpsc::Sender;

use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};
use palm_core::{Command, ControlState, Landmark};
use rgb::RGB8;

use crate::source::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:      usize = 840;
pub const WIN_H:      usize = 520;
const PANEL_W:        usize = 220;
const FIELD_W:        usize = WIN_W - PANEL_W;
const STATUS_H:       usize = 44;
const FIELD_H:        usize = WIN_H - STATUS_H;
const STATUS_Y:       usize = FIELD_H;
const BG_COLOR:       u32   = 0xFF101018;
const PANEL_BG:       u32   = 0xFF16213E;
const TEXT_BG:        u32   = 0xFF0F3460;
const BAND_COLOR:     u32   = 0xFF2A2A3A;
const PALM_COLOR:     u32   = 0xFFEEEEEE;
const FIST_COLOR:     u32   = 0xFFFF5050;
const LOCK_COLOR:     u32   = 0xFFFFD700;

// ════════════════════════════════════════════════════════════════════════════
// PanelView — per-frame snapshot handed over by the app
// ════════════════════════════════════════════════════════════════════════════

pub struct PanelView<'a> {
    pub palm:           Option<Landmark>,
    pub fist_distance:  Option<f32>,
    pub fist_threshold: f32,
    pub color_step:     f32,
    pub command:        Command,
    pub control:        ControlState,
    pub status:         &'a str,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window: Window,
    buf:    Vec<u32>,
    sim_tx: Sender<SimInput>,
}

impl Visualizer {
    pub fn new(sim_tx: Sender<SimInput>) -> Result<Self, String> {
        let mut window = Window::new(
            "Palm Light — gesture simulator",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| e.to_string())?;

        window.limit_update_rate(Some(std::time::Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Sample the pointer and keys into one [`SimInput`].
    /// Returns false once the user asked to quit.
    pub fn poll_input(&mut self) -> bool {
        if !self.window.is_open() { return false; }

        if self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_pressed(Key::Escape, KeyRepeat::No)
        {
            let _ = self.sim_tx.send(SimInput::Quit);
            return false;
        }

        let fist = self.window.is_key_down(Key::F);
        let input = match self.window.get_mouse_pos(MouseMode::Discard) {
            Some((mx, my)) if (mx as usize) < FIELD_W && (my as usize) < FIELD_H => {
                SimInput::Hand {
                    x: mx / FIELD_W as f32,
                    y: my / FIELD_H as f32,
                    fist,
                }
            }
            _ => SimInput::NoHand,
        };
        self.sim_tx.send(input).is_ok()
    }

    /// Render one frame.
    pub fn render(&mut self, view: &PanelView<'_>) {
        // Clear
        self.buf.fill(BG_COLOR);

        // ── Field: dead-band and zone labels ──────────────────────────────
        let band_l = ((0.5 - view.color_step).max(0.0) * FIELD_W as f32) as usize;
        let band_r = ((0.5 + view.color_step).min(1.0) * FIELD_W as f32) as usize;
        self.fill_rect(band_l, 0, band_r.saturating_sub(band_l), FIELD_H, BAND_COLOR);
        self.draw_label("LEFT ZONE",  10, 10, 0xFF888888);
        self.draw_label("RIGHT ZONE", FIELD_W - 50, 10, 0xFF888888);

        // ── Palm marker ───────────────────────────────────────────────────
        if let Some(palm) = view.palm {
            let is_fist = view.fist_distance.is_some_and(|d| d < view.fist_threshold);
            let color = if is_fist { FIST_COLOR } else { PALM_COLOR };
            let px = (palm.x.clamp(0.0, 1.0) * FIELD_W as f32) as usize;
            let py = (palm.y.clamp(0.0, 1.0) * FIELD_H as f32) as usize;
            let r  = (view.fist_threshold * FIELD_H as f32 * 0.25) as usize + 4;
            self.draw_diamond(px, py, r, color);
            self.draw_diamond(px, py, 2, color);
        }

        // ── Panel ─────────────────────────────────────────────────────────
        self.fill_rect(FIELD_W, 0, PANEL_W, FIELD_H, PANEL_BG);
        self.draw_panel(view);

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, STATUS_H, TEXT_BG);
        self.draw_label(view.status, 10, STATUS_Y + 10, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "mouse=palm  F=fist  Q/Esc=quit",
            10, WIN_H - 14, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Command panel ─────────────────────────────────────────────────────

    fn draw_panel(&mut self, view: &PanelView<'_>) {
        let x0 = FIELD_W + 16;
        let cmd = view.command;

        self.draw_label("COMMAND", x0, 12, 0xFFFFD700);
        self.draw_label(&cmd.to_string(), x0, 26, 0xFFEEEEEE);

        // Swatch of the composed (already brightness-scaled) color
        self.fill_rect(x0, 44, PANEL_W - 32, 90, rgb_to_argb(cmd.color()));
        let border = if cmd.locked { LOCK_COLOR } else { 0xFF000000 };
        self.draw_border(x0, 44, PANEL_W - 32, 90, border);

        // Brightness bar
        let bar_w  = PANEL_W - 32;
        let filled = bar_w * usize::from(view.control.brightness) / 255;
        self.draw_label(&format!("BRIGHTNESS {}", view.control.brightness), x0, 150, 0xFFAADDFF);
        self.fill_rect(x0, 162, bar_w, 12, 0xFF222222);
        self.fill_rect(x0, 162, filled, 12, blend(0xFF222222, 0xFFFFFFFF, 0.8));

        self.draw_label(&format!("COLOR {}", view.control.color_index), x0, 190, 0xFFAADDFF);

        if let Some(d) = view.fist_distance {
            self.draw_label(
                &format!("FIST {:.2} / {:.2}", d, view.fist_threshold),
                x0, 210, 0xFFAADDFF,
            );
        }

        let (text, color) = if view.control.lock_engaged {
            ("LOCKED", LOCK_COLOR)
        } else {
            ("UNLOCKED", 0xFF66CC66)
        };
        self.fill_rect(x0, 236, PANEL_W - 32, 20, blend(PANEL_BG, color, 0.25));
        self.draw_label(text, x0 + 6, 243, color);
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        let x_end = (x + w).min(WIN_W);
        if x >= x_end { return; }
        for row in y..(y + h).min(WIN_H) {
            let base = row * WIN_W;
            self.buf[base + x..base + x_end].fill(color);
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        self.fill_rect(x, y, w, 1, color);
        self.fill_rect(x, y + h - 1, w, 1, color);
        self.fill_rect(x, y, 1, h, color);
        self.fill_rect(x + w - 1, y, 1, h, color);
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    /// Outline of a square rotated 45°, clipped at the window edges.
    fn draw_diamond(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        for dy in 0..=r {
            let dx = r - dy;
            let xs = [cx.checked_sub(dx), cx.checked_add(dx)];
            let ys = [cy.checked_sub(dy), cy.checked_add(dy)];
            for (x, y) in xs.iter().flatten().flat_map(|&x| ys.iter().flatten().map(move |&y| (x, y))) {
                self.set_pixel(x, y, color);
            }
        }
    }

    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        for (i, ch) in text.chars().enumerate() {
            let left = x + i * GLYPH_ADVANCE;
            if left + GLYPH_ADVANCE > WIN_W { break; }
            for (row, bits) in glyph(ch).into_iter().enumerate() {
                for col in (0..3usize).filter(|&c| bits & (0b100u8 >> c) != 0) {
                    self.set_pixel(left + col, y + row, color);
                }
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Colors
// ────────────────────────────────────────────────────────────────────────────

fn rgb_to_argb(c: RGB8) -> u32 {
    0xFF000000 | (u32::from(c.r) << 16) | (u32::from(c.g) << 8) | u32::from(c.b)
}

/// Per-channel mix of two opaque colors; `t` is the weight of `b`.
fn blend(a: u32, b: u32, t: f32) -> u32 {
    let t = t.clamp(0.0, 1.0);
    [16u32, 8, 0].iter().fold(0xFF000000, |acc, &shift| {
        let ca = ((a >> shift) & 0xFF) as f32;
        let cb = ((b >> shift) & 0xFF) as f32;
        acc | (((ca + (cb - ca) * t).round() as u32) << shift)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// 3×5 bitmap font: digits, the letters the panel and status line use, and
// the punctuation of the wire line and key legend.  Case-insensitive.
// ────────────────────────────────────────────────────────────────────────────

const GLYPH_ADVANCE: usize = 4;

fn glyph(c: char) -> [u8; 5] {
    match c.to_ascii_uppercase() {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        ' ' => [0; 5],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000],
    }
}
