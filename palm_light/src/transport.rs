//! Command transmission thread.
//!
//! The control loop hands immutable [`Command`] snapshots to a
//! [`Transmitter`], which owns the output sink on its own thread, writes the
//! wire line and reports the outcome back.  Sink failures never reach the
//! control state.

use std::fmt;
use std::io::{self, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use palm_core::Command;

// ════════════════════════════════════════════════════════════════════════════
// TransportError
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The link could not be opened.
    Unavailable(String),
    /// The link is open but rejected a write.
    WriteFailed(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Unavailable(why) => write!(f, "transport unavailable: {}", why),
            TransportError::WriteFailed(why) => write!(f, "transport write failed: {}", why),
        }
    }
}

impl std::error::Error for TransportError {}

// ════════════════════════════════════════════════════════════════════════════
// CommandSink — abstraction over serial / stdout / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

/// Something that accepts wire lines.
pub trait CommandSink: Send {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Short description for logs.
    fn describe(&self) -> String;
}

// ── serialport backend ────────────────────────────────────────────────────

pub struct SerialSink {
    port: Box<dyn serialport::SerialPort>,
    name: String,
}

impl SerialSink {
    /// Open `path` at `baud` and wait `settle` for the board to come out of
    /// its open-triggered reset.
    pub fn open(path: &str, baud: u32, settle: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud)
            .timeout(Duration::from_millis(200))
            .open()
            .map_err(|e| TransportError::Unavailable(format!("{}: {}", path, e)))?;
        log::info!("Opened serial port {} at {} baud", path, baud);
        if !settle.is_zero() {
            log::debug!("Waiting {:?} for the controller to reset", settle);
            thread::sleep(settle);
        }
        Ok(SerialSink { port, name: path.to_string() })
    }
}

impl CommandSink for SerialSink {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.port.write_all(line.as_bytes())
            .and_then(|_| self.port.flush())
            .map_err(|e| TransportError::WriteFailed(format!("{}: {}", self.name, e)))
    }

    fn describe(&self) -> String { format!("serial {}", self.name) }
}

// ── stdout backend ────────────────────────────────────────────────────────

/// Writes wire lines to standard output (pipe into another tool, or watch).
pub struct StdoutSink;

impl CommandSink for StdoutSink {
    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| TransportError::WriteFailed(format!("stdout: {}", e)))
    }

    fn describe(&self) -> String { "stdout".to_string() }
}

// ── null backend (used when no port is available) ─────────────────────────

pub struct NullSink;

impl CommandSink for NullSink {
    fn write_line(&mut self, _line: &str) -> Result<(), TransportError> { Ok(()) }
    fn describe(&self) -> String { "null".to_string() }
}

// ════════════════════════════════════════════════════════════════════════════
// Messages to / from the transmit thread
// ════════════════════════════════════════════════════════════════════════════

pub enum TransmitCommand {
    /// Write this command's wire line.
    Send(Command),
    /// Terminate the thread after any pending write.
    Quit,
}

/// Outcome of one write, reported back to the control loop.
#[derive(Clone, Debug, PartialEq)]
pub enum TransmitReport {
    Sent(Command),
    Failed { command: Command, error: TransportError },
}

// ════════════════════════════════════════════════════════════════════════════
// Transmitter — the transmit thread
// ════════════════════════════════════════════════════════════════════════════

/// Handle to the transmit thread.
pub struct Transmitter {
    cmd_tx:    Sender<TransmitCommand>,
    report_rx: Receiver<TransmitReport>,
    handle:    Option<JoinHandle<()>>,
}

impl Transmitter {
    /// Spawn the transmit thread; `sink` is moved onto it.
    pub fn spawn(sink: Box<dyn CommandSink>) -> Self {
        let (cmd_tx, cmd_rx)       = mpsc::channel::<TransmitCommand>();
        let (report_tx, report_rx) = mpsc::channel::<TransmitReport>();

        let handle = thread::spawn(move || transmit_thread(sink, cmd_rx, report_tx));

        Transmitter { cmd_tx, report_rx, handle: Some(handle) }
    }

    /// Queue `cmd`.  Returns false if the thread has gone away.
    pub fn send(&self, cmd: Command) -> bool {
        self.cmd_tx.send(TransmitCommand::Send(cmd)).is_ok()
    }

    /// Drain any pending reports (non-blocking).
    pub fn drain_reports(&self) -> Vec<TransmitReport> {
        let mut out = Vec::new();
        while let Ok(r) = self.report_rx.try_recv() { out.push(r); }
        out
    }

    /// Stop the thread, wait for it, and return the reports it left behind.
    pub fn shutdown(mut self) -> Vec<TransmitReport> {
        let _ = self.cmd_tx.send(TransmitCommand::Quit);
        if let Some(h) = self.handle.take() {
            if h.join().is_err() {
                log::error!("transmit thread panicked");
            }
        }
        self.drain_reports()
    }
}

impl Drop for Transmitter {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.cmd_tx.send(TransmitCommand::Quit);
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// transmit_thread — the actual loop
// ════════════════════════════════════════════════════════════════════════════

fn transmit_thread(
    mut sink:  Box<dyn CommandSink>,
    cmd_rx:    Receiver<TransmitCommand>,
    report_tx: Sender<TransmitReport>,
) {
    log::debug!("transmitter writing to {}", sink.describe());

    loop {
        // ── wait for work ─────────────────────────────────────────────────
        let mut latest = match cmd_rx.recv() {
            Ok(TransmitCommand::Send(c)) => c,
            Ok(TransmitCommand::Quit) | Err(_) => return,
        };

        // ── coalesce: a slow link only ever writes the newest command ────
        let mut quit = false;
        loop {
            match cmd_rx.try_recv() {
                Ok(TransmitCommand::Send(c)) => latest = c,
                Ok(TransmitCommand::Quit)    => { quit = true; break; }
                Err(_) => break,
            }
        }

        let line = latest.wire_line();
        let report = match sink.write_line(&line) {
            Ok(()) => {
                log::debug!("sent {}", line.trim_end());
                TransmitReport::Sent(latest)
            }
            Err(error) => {
                log::warn!("{}", error);
                TransmitReport::Failed { command: latest, error }
            }
        };
        let _ = report_tx.send(report);

        if quit { return; }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
