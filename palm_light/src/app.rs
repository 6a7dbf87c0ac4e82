//! Top-level control loop.
//!
//! `AppState` owns the [`ControlState`] and the gesture configuration.  It
//! consumes [`Frame`]s in order, runs the gesture state machine on the first
//! hand of each, and produces the [`Command`] to transmit.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use palm_core::{compose, process, Command, ControlState, GestureConfig, Hand, HandGeometry};

use crate::source::{
    spawn_source, Frame, JsonLinesSource, SimInput, SimSource, SourceEvent, DEFAULT_MIN_SCORE,
};
use crate::transport::{
    CommandSink, NullSink, SerialSink, StdoutSink, TransmitReport, Transmitter,
};
use crate::visualizer::{PanelView, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// Where landmark frames come from.
#[derive(Clone, Debug, PartialEq)]
pub enum InputKind {
    /// Mouse-driven simulation window.
    Sim,
    /// JSON lines on standard input.
    Stdin,
    /// JSON lines from a file (recorded session).
    File(PathBuf),
    /// JSON lines from a spawned estimator's stdout.
    Estimator { program: String, args: Vec<String> },
}

/// Where commands go.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportKind {
    Serial { port: String, baud: u32, settle: Duration },
    Stdout,
    Null,
}

/// What to transmit for a frame without a hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoHandPolicy {
    /// Send nothing.
    #[default]
    Silent,
    /// Re-send the last composed command, if there is one.
    Repeat,
}

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gesture:   GestureConfig,
    pub input:     InputKind,
    pub transport: TransportKind,
    pub no_hand:   NoHandPolicy,
    /// Hands scoring below this are ignored (estimator input only).
    pub min_score: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            gesture:   GestureConfig::default(),
            input:     InputKind::Sim,
            transport: TransportKind::Stdout,
            no_hand:   NoHandPolicy::Silent,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameStats
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames:    u64,
    pub stale:     u64,
    pub no_hand:   u64,
    pub malformed: u64,
    pub composed:  u64,
    pub sent:      u64,
    pub failed:    u64,
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    gesture:  GestureConfig,
    no_hand:  NoHandPolicy,

    // ── gesture state ─────────────────────────────────────────────────────
    control:       ControlState,
    last_command:  Option<Command>,
    last_seq:      Option<u64>,
    last_geometry: Option<HandGeometry>,
    /// Wall time and recorded offset of the first timestamped frame.
    replay_origin: Option<(Instant, Duration)>,

    // ── bookkeeping ───────────────────────────────────────────────────────
    pub stats:  FrameStats,
    pub status: String,
}

impl AppState {
    pub fn new(gesture: GestureConfig, no_hand: NoHandPolicy) -> Self {
        AppState {
            gesture,
            no_hand,
            control:       ControlState::new(),
            last_command:  None,
            last_seq:      None,
            last_geometry: None,
            replay_origin: None,
            stats:         FrameStats::default(),
            status:        "Waiting for a hand".to_string(),
        }
    }

    // ── process one frame ────────────────────────────────────────────────

    /// Run one frame through the state machine and return the command to
    /// transmit, if any.
    ///
    /// * A frame whose sequence number is not newer than the last one seen
    ///   is stale and ignored.
    /// * Only the first hand is used; later hands in the frame are ignored.
    /// * A hand with fewer than 21 landmarks is skipped: no state change, no
    ///   command.
    /// * A frame carrying a capture time is processed at that time, measured
    ///   from the first timestamped frame, instead of at `now`.
    pub fn handle_frame(&mut self, frame: &Frame, now: Instant) -> Option<Command> {
        if self.last_seq.is_some_and(|last| frame.seq <= last) {
            self.stats.stale += 1;
            log::debug!("dropping stale frame {}", frame.seq);
            return None;
        }
        self.last_seq = Some(frame.seq);
        self.stats.frames += 1;
        let now = self.frame_time(frame, now);

        let Some(points) = frame.hands.first() else {
            self.stats.no_hand += 1;
            self.last_geometry = None;
            self.status = "No hand".to_string();
            return match self.no_hand {
                NoHandPolicy::Silent => None,
                NoHandPolicy::Repeat => self.last_command,
            };
        };

        let hand = match Hand::from_points(points) {
            Ok(h)  => h,
            Err(e) => {
                self.stats.malformed += 1;
                log::debug!("frame {}: {}", frame.seq, e);
                return None;
            }
        };

        let (control, cmd) = process(self.control, &hand, now, &self.gesture);
        self.control       = control;
        self.last_command  = Some(cmd);
        self.last_geometry = Some(hand.geometry());
        self.stats.composed += 1;
        self.status = format!(
            "brightness {}  color {}  {}",
            control.brightness,
            control.color_index,
            if control.lock_engaged { "LOCKED" } else { "unlocked" },
        );
        Some(cmd)
    }

    fn frame_time(&mut self, frame: &Frame, now: Instant) -> Instant {
        let Some(at) = frame.at else { return now };
        let (wall, first) = *self.replay_origin.get_or_insert((now, at));
        wall + at.saturating_sub(first)
    }

    /// Fold a transmit outcome into the counters.
    pub fn handle_report(&mut self, report: &TransmitReport) {
        match report {
            TransmitReport::Sent(_)            => self.stats.sent += 1,
            TransmitReport::Failed { error, .. } => {
                self.stats.failed += 1;
                self.status = error.to_string();
            }
        }
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn control(&self)       -> &ControlState          { &self.control }
    pub fn last_command(&self)  -> Option<Command>        { self.last_command }
    pub fn last_geometry(&self) -> Option<HandGeometry>   { self.last_geometry }
    pub fn gesture(&self)       -> &GestureConfig         { &self.gesture }

    /// The command the current state would produce, whether or not a hand
    /// has been seen yet.
    pub fn preview_command(&self) -> Command {
        compose(&self.control, &self.gesture.palette)
    }

    pub fn panel(&self) -> PanelView<'_> {
        PanelView {
            palm:           self.last_geometry.map(|g| g.palm),
            fist_distance:  self.last_geometry.map(|g| g.fist_distance),
            fist_threshold: self.gesture.fist_threshold,
            color_step:     self.gesture.color_step,
            command:        self.last_command.unwrap_or_else(|| self.preview_command()),
            control:        self.control,
            status:         &self.status,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Open the configured sink.  An unavailable serial port falls back to the
/// null sink so the control loop still runs.
fn open_sink(kind: &TransportKind) -> Box<dyn CommandSink> {
    match kind {
        TransportKind::Serial { port, baud, settle } => {
            match SerialSink::open(port, *baud, *settle) {
                Ok(s)  => Box::new(s),
                Err(e) => {
                    log::warn!("{}; commands will be discarded", e);
                    Box::new(NullSink)
                }
            }
        }
        TransportKind::Stdout => Box::new(StdoutSink),
        TransportKind::Null   => Box::new(NullSink),
    }
}

/// Run the full application until the source ends or the user quits.
pub fn run(cfg: AppConfig) -> Result<FrameStats> {
    cfg.gesture.validate().context("Invalid gesture configuration")?;

    let transmitter = Transmitter::spawn(open_sink(&cfg.transport));
    let mut app = AppState::new(cfg.gesture, cfg.no_hand);

    match cfg.input {
        InputKind::Sim => run_sim(&mut app, &transmitter)?,
        InputKind::Stdin => {
            let rx = spawn_source(JsonLinesSource::stdin().min_score(cfg.min_score));
            run_stream(&mut app, &transmitter, rx);
        }
        InputKind::File(path) => {
            let rx = spawn_source(JsonLinesSource::open(&path)?.min_score(cfg.min_score));
            run_stream(&mut app, &transmitter, rx);
        }
        InputKind::Estimator { program, args } => {
            let rx = spawn_source(JsonLinesSource::spawn(&program, &args)?.min_score(cfg.min_score));
            run_stream(&mut app, &transmitter, rx);
        }
    }

    for report in transmitter.shutdown() {
        app.handle_report(&report);
    }

    let s = app.stats;
    log::info!(
        "done: {} frames, {} commands, {} sent, {} failed, {} without hand, {} malformed, {} stale",
        s.frames, s.composed, s.sent, s.failed, s.no_hand, s.malformed, s.stale
    );
    Ok(s)
}

/// Feed one event into the app; returns false when the source has ended.
fn dispatch(app: &mut AppState, transmitter: &Transmitter, event: SourceEvent) -> bool {
    match event {
        SourceEvent::Frame(frame) => {
            if let Some(cmd) = app.handle_frame(&frame, Instant::now()) {
                if !transmitter.send(cmd) {
                    log::error!("transmit thread is gone");
                    return false;
                }
            }
            true
        }
        SourceEvent::End => false,
    }
}

/// Headless loop for estimator / file / stdin input.
fn run_stream(app: &mut AppState, transmitter: &Transmitter, rx: Receiver<SourceEvent>) {
    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                if !dispatch(app, transmitter, event) { break; }
            }
            Err(RecvTimeoutError::Timeout)      => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        for report in transmitter.drain_reports() {
            app.handle_report(&report);
        }
    }
}

/// Windowed loop: the visualizer drives a [`SimSource`] and shows the state.
fn run_sim(app: &mut AppState, transmitter: &Transmitter) -> Result<()> {
    let (sim_tx, sim_rx) = mpsc::channel::<SimInput>();
    let source_rx = spawn_source(SimSource { rx: sim_rx });

    let mut vis = Visualizer::new(sim_tx)
        .map_err(|e| anyhow::anyhow!("Failed to open simulation window: {}", e))?;

    while vis.is_open() {
        // 1. Poll window input → SimInput
        let keep_going = vis.poll_input();

        // 2. Drain frames in order
        loop {
            match source_rx.try_recv() {
                Ok(event) => {
                    if !dispatch(app, transmitter, event) { return Ok(()); }
                }
                Err(TryRecvError::Empty)        => break,
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }

        // 3. Transmit outcomes
        for report in transmitter.drain_reports() {
            app.handle_report(&report);
        }

        if !keep_going { break; }

        // 4. Render
        vis.render(&app.panel());
    }

    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::tests::MockSink;
    use crate::transport::TransportError;
    use palm_core::{synthetic_hand, Landmark};

    fn make_app() -> AppState {
        AppState::new(GestureConfig::default(), NoHandPolicy::Silent)
    }

    fn frame(seq: u64, hands: Vec<Vec<Landmark>>) -> Frame {
        Frame { seq, at: None, hands }
    }

    fn hand_line(t: f64, x: f32, y: f32, fist: bool) -> String {
        let pts: Vec<String> = synthetic_hand(x, y, fist).points().iter()
            .map(|p| format!(r#"{{"x":{},"y":{}}}"#, p.x, p.y))
            .collect();
        format!(r#"{{"t":{},"hands":[{{"landmarks":[{}]}}]}}"#, t, pts.join(","))
    }

    fn temp_file(name: &str, lines: &[String]) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("palm_light_{}_{}.jsonl", name, std::process::id()));
        std::fs::write(&path, lines.join("\n") + "\n").unwrap();
        path
    }

    /// Read a recorded file as fast as possible, as `--replay` does.
    fn replay(app: &mut AppState, path: &PathBuf) -> Vec<Command> {
        let rx = spawn_source(JsonLinesSource::open(path).unwrap());
        let mut out = Vec::new();
        for event in rx.iter() {
            if let SourceEvent::Frame(f) = event {
                out.extend(app.handle_frame(&f, Instant::now()));
            }
        }
        let _ = std::fs::remove_file(path);
        out
    }

    fn hand(x: f32, y: f32, fist: bool) -> Vec<Landmark> {
        synthetic_hand(x, y, fist).points().to_vec()
    }

    #[test]
    fn hand_frame_produces_command() {
        let mut app = make_app();
        let cmd = app.handle_frame(&frame(0, vec![hand(0.5, 0.0, false)]), Instant::now());
        assert_eq!(cmd.map(|c| c.wire_line()), Some("255,0,0,0\n".to_string()));
        assert_eq!(app.stats.composed, 1);
    }

    #[test]
    fn no_hand_silent_sends_nothing() {
        let mut app = make_app();
        let t0 = Instant::now();
        app.handle_frame(&frame(0, vec![hand(0.5, 0.0, false)]), t0);
        assert_eq!(app.handle_frame(&frame(1, vec![]), t0), None);
        assert_eq!(app.stats.no_hand, 1);
    }

    #[test]
    fn no_hand_repeat_resends_last() {
        let mut app = AppState::new(GestureConfig::default(), NoHandPolicy::Repeat);
        let t0 = Instant::now();
        assert_eq!(app.handle_frame(&frame(0, vec![]), t0), None);
        let first = app.handle_frame(&frame(1, vec![hand(0.5, 0.0, false)]), t0);
        assert_eq!(app.handle_frame(&frame(2, vec![]), t0), first);
    }

    #[test]
    fn malformed_hand_skipped_without_mutation() {
        let mut app = make_app();
        let before = *app.control();
        let short = vec![Landmark::new(0.5, 0.0); 12];
        assert_eq!(app.handle_frame(&frame(0, vec![short]), Instant::now()), None);
        assert_eq!(*app.control(), before);
        assert_eq!(app.stats.malformed, 1);
        assert_eq!(app.last_command(), None);
    }

    #[test]
    fn only_first_hand_is_used() {
        let mut app = make_app();
        // Second hand is a fist at the bottom; it must not lock or dim.
        let cmd = app.handle_frame(
            &frame(0, vec![hand(0.5, 0.0, false), hand(0.5, 1.0, true)]),
            Instant::now(),
        ).unwrap();
        assert!(!cmd.locked);
        assert_eq!(app.control().brightness, 255);
    }

    #[test]
    fn malformed_first_hand_does_not_fall_back_to_second() {
        let mut app = make_app();
        let short = vec![Landmark::default(); 3];
        let cmd = app.handle_frame(&frame(0, vec![short, hand(0.5, 0.0, false)]), Instant::now());
        assert_eq!(cmd, None);
    }

    #[test]
    fn stale_frames_are_dropped() {
        let mut app = make_app();
        let t0 = Instant::now();
        app.handle_frame(&frame(5, vec![hand(0.5, 0.0, false)]), t0);
        // An older frame arriving late must not overwrite the newer state.
        assert_eq!(app.handle_frame(&frame(3, vec![hand(0.5, 1.0, false)]), t0), None);
        assert_eq!(app.handle_frame(&frame(5, vec![hand(0.5, 1.0, false)]), t0), None);
        assert_eq!(app.control().brightness, 255);
        assert_eq!(app.stats.stale, 2);
    }

    #[test]
    fn lock_then_palm_move_keeps_color() {
        let mut app = make_app();
        let t0 = Instant::now();
        app.handle_frame(&frame(0, vec![hand(0.5, 0.0, false)]), t0);
        let locked = app.handle_frame(&frame(1, vec![hand(0.5, 0.0, true)]), t0 + Duration::from_millis(50)).unwrap();
        assert!(locked.locked);
        let moved = app.handle_frame(&frame(2, vec![hand(0.9, 1.0, false)]), t0 + Duration::from_millis(200)).unwrap();
        assert_eq!(moved, locked);
    }

    #[test]
    fn replayed_held_fist_toggles_at_recorded_pace() {
        // Two seconds of a held fist at ~30 fps.
        let lines: Vec<String> = (0..60)
            .map(|i| hand_line(f64::from(i) * 0.033, 0.5, 0.5, true))
            .collect();
        let path = temp_file("held_fist", &lines);
        let mut app = make_app();

        let cmds = replay(&mut app, &path);
        assert_eq!(cmds.len(), 60);
        let toggles = cmds.windows(2).filter(|w| w[0].locked != w[1].locked).count() + 1;
        assert_eq!(toggles, 4);
        assert!(!app.control().lock_engaged);
    }

    #[test]
    fn replayed_swipe_reaches_both_zone_colors() {
        let lines = vec![
            hand_line(0.0, 0.9, 0.5, false),
            hand_line(0.4, 0.1, 0.5, false),
        ];
        let path = temp_file("swipe", &lines);
        let mut app = make_app();

        replay(&mut app, &path);
        assert_eq!(app.control().color_index, 4);
    }

    #[test]
    fn frames_without_capture_time_use_wall_clock() {
        let mut app = make_app();
        let t0 = Instant::now();
        app.handle_frame(&frame(0, vec![hand(0.5, 0.5, true)]), t0);
        app.handle_frame(&frame(1, vec![hand(0.5, 0.5, true)]), t0 + Duration::from_millis(100));
        assert!(app.control().lock_engaged);
        app.handle_frame(&frame(2, vec![hand(0.5, 0.5, true)]), t0 + Duration::from_millis(600));
        assert!(!app.control().lock_engaged);
    }

    #[test]
    fn unavailable_serial_port_falls_back_to_null_sink() {
        let mut sink = open_sink(&TransportKind::Serial {
            port:   "/nonexistent/tty".to_string(),
            baud:   9600,
            settle: Duration::ZERO,
        });
        assert_eq!(sink.describe(), "null");
        assert!(sink.write_line("255,0,0,0\n").is_ok());
    }

    #[test]
    fn transport_failure_counts_but_state_survives() {
        let mut app = make_app();
        let before = *app.control();
        app.handle_report(&TransmitReport::Failed {
            command: Command::default(),
            error:   TransportError::WriteFailed("unplugged".into()),
        });
        assert_eq!(app.stats.failed, 1);
        assert_eq!(*app.control(), before);
        assert!(app.status.contains("unplugged"));
    }

    #[test]
    fn stream_loop_sends_commands_until_end() {
        let mock = MockSink::default();
        let lines = mock.lines.clone();
        let transmitter = Transmitter::spawn(Box::new(mock));
        let mut app = make_app();

        let (tx, rx) = mpsc::channel();
        tx.send(SourceEvent::Frame(frame(0, vec![hand(0.5, 0.0, false)]))).unwrap();
        tx.send(SourceEvent::Frame(frame(1, vec![]))).unwrap();
        tx.send(SourceEvent::End).unwrap();
        // Never reached: the loop stops at End.
        tx.send(SourceEvent::Frame(frame(2, vec![hand(0.5, 1.0, false)]))).unwrap();

        run_stream(&mut app, &transmitter, rx);
        for r in transmitter.shutdown() { app.handle_report(&r); }

        assert_eq!(app.stats.frames, 2);
        assert_eq!(app.stats.sent, 1);
        assert_eq!(*lines.lock().unwrap(), vec!["255,0,0,0\n".to_string()]);
    }

    #[test]
    fn run_rejects_invalid_gesture_config() {
        let cfg = AppConfig {
            gesture:   GestureConfig { palette: Vec::new(), ..GestureConfig::default() },
            input:     InputKind::Stdin,
            transport: TransportKind::Null,
            ..AppConfig::default()
        };
        assert!(run(cfg).is_err());
    }

    #[test]
    fn run_replays_a_recorded_file() {
        let path = std::env::temp_dir().join(format!("palm_light_replay_{}.jsonl", std::process::id()));
        let pts: Vec<String> = synthetic_hand(0.5, 0.0, false).points().iter()
            .map(|p| format!(r#"{{"x":{},"y":{}}}"#, p.x, p.y))
            .collect();
        let line = format!(r#"{{"hands":[{{"landmarks":[{}]}}]}}"#, pts.join(","));
        std::fs::write(&path, format!("{}\n{{\"hands\":[]}}\n{}\n", line, line)).unwrap();

        let stats = run(AppConfig {
            input:     InputKind::File(path.clone()),
            transport: TransportKind::Null,
            ..AppConfig::default()
        }).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.composed, 2);
        assert_eq!(stats.no_hand, 1);
        assert!(stats.sent >= 1);
    }
}
