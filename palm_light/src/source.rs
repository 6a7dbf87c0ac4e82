//! Landmark sources — an external estimator's JSON output, or the simulation
//! window.
//!
//! The public interface is [`SourceEvent`] delivered over an `mpsc` channel.
//! The control loop doesn't need to know whether frames came from a real
//! estimator or the mouse.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use palm_core::{synthetic_hand, Landmark};
use serde::Deserialize;

// ════════════════════════════════════════════════════════════════════════════
// Frame / SourceEvent
// ════════════════════════════════════════════════════════════════════════════

/// One estimator frame: zero or more hands, each a raw landmark list.
///
/// Point counts are not checked here; a short hand is the control loop's
/// business (it skips it).
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Monotonically increasing per source, starting at 0.
    pub seq:   u64,
    /// Capture time relative to the start of the recording, when the line
    /// carried one.
    pub at:    Option<Duration>,
    pub hands: Vec<Vec<Landmark>>,
}

/// What a source delivers.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    Frame(Frame),
    /// The source is exhausted (EOF, estimator exited, window closed).
    End,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`SourceEvent`]s over a channel.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>);
}

/// Spawn a landmark source on its own thread and return the receiving end.
pub fn spawn_source<S: LandmarkSource>(source: S) -> Receiver<SourceEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// JSON line format
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    landmarks: Vec<LandmarkJson>,
    #[serde(default)]
    score: Option<f32>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    t:     Option<f64>,
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Hands the estimator scores below this are ignored unless overridden.
pub const DEFAULT_MIN_SCORE: f32 = 0.7;

/// One parsed line: optional capture time plus the hands that passed the
/// score filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detection {
    pub at:    Option<Duration>,
    pub hands: Vec<Vec<Landmark>>,
}

/// Parse one estimator line.
///
/// Blank lines and the estimator's `READY` handshake yield `Ok(None)`.
/// Hands scoring below `min_score` are dropped; hands without a score are
/// kept.  An estimator-reported `error` is logged and treated as no hands.
/// A negative or non-finite `t` is ignored.
pub fn parse_line(line: &str, min_score: f32) -> Result<Option<Detection>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() || line == "READY" {
        return Ok(None);
    }

    let det: DetectionJson = serde_json::from_str(line)?;
    let at = det.t.and_then(|t| Duration::try_from_secs_f64(t).ok());
    if let Some(err) = det.error {
        log::warn!("estimator reported: {}", err);
        return Ok(Some(Detection { at, hands: Vec::new() }));
    }

    let hands = det.hands.into_iter()
        .filter(|h| h.score.map_or(true, |s| s >= min_score))
        .map(|h| h.landmarks.into_iter().map(|p| Landmark::new(p.x, p.y)).collect())
        .collect();
    Ok(Some(Detection { at, hands }))
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource — external estimator output
// ════════════════════════════════════════════════════════════════════════════

/// Reads one JSON detection per line from stdin, a file, or a spawned
/// estimator process:
///
/// ```text
/// {"t":1.25,"hands":[{"score":0.93,"landmarks":[{"x":0.51,"y":0.62,"z":0.0}, ... 21 points]}]}
/// ```
///
/// `t` (seconds since the recording started) is optional; recorded sessions
/// carry it so replay keeps the original timing.
pub struct JsonLinesSource {
    reader:    Box<dyn BufRead + Send>,
    /// Estimator subprocess, killed when the source is dropped.
    child:     Option<Child>,
    min_score: f32,
}

impl JsonLinesSource {
    pub fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        JsonLinesSource { reader: Box::new(reader), child: None, min_score: DEFAULT_MIN_SCORE }
    }

    pub fn stdin() -> Self {
        Self::from_reader(BufReader::new(io::stdin()))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open landmark file {}", path.display()))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }

    /// Start an estimator process and read its stdout.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self> {
        log::info!("Starting estimator: {} {}", program, args.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start estimator `{}`", program))?;
        let stdout = child.stdout.take().context("Failed to get estimator stdout")?;
        Ok(JsonLinesSource {
            reader:    Box::new(BufReader::new(stdout)),
            child:     Some(child),
            min_score: DEFAULT_MIN_SCORE,
        })
    }

    /// Drop hands whose reported score is below `score`.
    pub fn min_score(mut self, score: f32) -> Self {
        self.min_score = score.clamp(0.0, 1.0);
        self
    }
}

impl LandmarkSource for JsonLinesSource {
    fn run(mut self: Box<Self>, tx: Sender<SourceEvent>) {
        let mut seq  = 0u64;
        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0)  => break,
                Ok(_)  => {}
                Err(e) => {
                    log::warn!("landmark input read error: {}", e);
                    break;
                }
            }

            let det = match parse_line(&line, self.min_score) {
                Ok(Some(d)) => d,
                Ok(None)    => continue,
                Err(e)      => {
                    log::warn!("skipping unparseable landmark line: {}", e);
                    continue;
                }
            };

            let frame = Frame { seq, at: det.at, hands: det.hands };
            if tx.send(SourceEvent::Frame(frame)).is_err() { return; }
            seq += 1;
        }

        let _ = tx.send(SourceEvent::End);
    }
}

impl Drop for JsonLinesSource {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimSource — mouse/keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the simulation window, one per rendered frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Pointer inside the window: palm at `(x, y)` normalized.
    Hand { x: f32, y: f32, fist: bool },
    /// Pointer outside the window.
    NoHand,
    Quit,
}

/// Landmark source driven by [`SimInput`] events from the visualizer window.
///
/// Each pointer sample becomes a synthetic 21-point hand, so the gesture
/// geometry runs exactly as it does on estimator output.
pub struct SimSource {
    pub rx: Receiver<SimInput>,
}

impl LandmarkSource for SimSource {
    fn run(self: Box<Self>, tx: Sender<SourceEvent>) {
        let mut seq = 0u64;
        for input in self.rx {
            let hands = match input {
                SimInput::Hand { x, y, fist } => {
                    vec![synthetic_hand(x, y, fist).points().to_vec()]
                }
                SimInput::NoHand => Vec::new(),
                SimInput::Quit   => break,
            };
            if tx.send(SourceEvent::Frame(Frame { seq, at: None, hands })).is_err() { return; }
            seq += 1;
        }
        let _ = tx.send(SourceEvent::End);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn hand_json(n: usize, score: Option<f32>) -> String {
        let pts: Vec<String> = (0..n)
            .map(|i| format!(r#"{{"x":{},"y":0.5,"z":0.0}}"#, i as f32 / 100.0))
            .collect();
        match score {
            Some(s) => format!(r#"{{"score":{},"landmarks":[{}]}}"#, s, pts.join(",")),
            None    => format!(r#"{{"landmarks":[{}]}}"#, pts.join(",")),
        }
    }

    #[test]
    fn parses_hands_and_ignores_z() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json(21, Some(0.9)));
        let det = parse_line(&line, 0.5).unwrap().unwrap();
        assert_eq!(det.at, None);
        assert_eq!(det.hands.len(), 1);
        assert_eq!(det.hands[0].len(), 21);
        assert_eq!(det.hands[0][3], Landmark::new(0.03, 0.5));
    }

    #[test]
    fn handshake_and_blank_lines_are_skipped() {
        assert_eq!(parse_line("READY\n", 0.0).unwrap(), None);
        assert_eq!(parse_line("   ", 0.0).unwrap(), None);
    }

    #[test]
    fn empty_detection_is_a_frame_without_hands() {
        assert_eq!(parse_line(r#"{"hands":[]}"#, 0.0).unwrap(), Some(Detection::default()));
        assert_eq!(parse_line(r#"{"error":"camera busy"}"#, 0.0).unwrap(), Some(Detection::default()));
    }

    #[test]
    fn low_score_hands_dropped() {
        let line = format!(
            r#"{{"hands":[{},{}]}}"#,
            hand_json(21, Some(0.3)),
            hand_json(21, None)
        );
        let det = parse_line(&line, 0.5).unwrap().unwrap();
        assert_eq!(det.hands.len(), 1);
    }

    #[test]
    fn default_min_score_drops_unconfident_hands() {
        let line = format!(
            r#"{{"hands":[{},{}]}}"#,
            hand_json(21, Some(0.6)),
            hand_json(21, Some(0.8))
        );
        let det = parse_line(&line, DEFAULT_MIN_SCORE).unwrap().unwrap();
        assert_eq!(det.hands.len(), 1);

        let rx = spawn_source(JsonLinesSource::from_reader(Cursor::new(line.into_bytes())));
        match rx.recv().unwrap() {
            SourceEvent::Frame(f) => assert_eq!(f.hands.len(), 1),
            other => panic!("expected frame, got {:?}", other),
        }
    }

    #[test]
    fn capture_time_is_carried() {
        let det = parse_line(r#"{"t":1.25,"hands":[]}"#, 0.0).unwrap().unwrap();
        assert_eq!(det.at, Some(Duration::from_millis(1250)));
        let det = parse_line(r#"{"t":-3.0,"hands":[]}"#, 0.0).unwrap().unwrap();
        assert_eq!(det.at, None);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_line("{not json", 0.0).is_err());
    }

    #[test]
    fn json_source_numbers_frames_and_ends() {
        let input = format!(
            "READY\n{{\"hands\":[{}]}}\nnonsense\n{{\"hands\":[]}}\n",
            hand_json(21, None)
        );
        let rx = spawn_source(JsonLinesSource::from_reader(Cursor::new(input.into_bytes())));
        let events: Vec<SourceEvent> = rx.iter().collect();

        assert_eq!(events.len(), 3);
        match &events[0] {
            SourceEvent::Frame(f) => { assert_eq!(f.seq, 0); assert_eq!(f.hands.len(), 1); }
            other => panic!("expected frame, got {:?}", other),
        }
        match &events[1] {
            SourceEvent::Frame(f) => { assert_eq!(f.seq, 1); assert!(f.hands.is_empty()); }
            other => panic!("expected frame, got {:?}", other),
        }
        assert_eq!(events[2], SourceEvent::End);
    }

    #[test]
    fn sim_source_builds_synthetic_hands() {
        let (tx, rx) = mpsc::channel();
        let events = spawn_source(SimSource { rx });
        tx.send(SimInput::Hand { x: 0.2, y: 0.4, fist: false }).unwrap();
        tx.send(SimInput::NoHand).unwrap();
        tx.send(SimInput::Quit).unwrap();

        let got: Vec<SourceEvent> = events.iter().collect();
        assert_eq!(got.len(), 3);
        if let SourceEvent::Frame(f) = &got[0] {
            assert_eq!(f.hands[0].len(), 21);
        } else {
            panic!("expected frame");
        }
        if let SourceEvent::Frame(f) = &got[1] {
            assert_eq!(f.seq, 1);
            assert!(f.hands.is_empty());
        } else {
            panic!("expected frame");
        }
        assert_eq!(got[2], SourceEvent::End);
    }
}
