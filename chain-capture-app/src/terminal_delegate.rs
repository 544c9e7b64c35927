use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use chain_capture_core::{CaptureDelegate, CaptureError, CaptureState, DisplayFrame, RecordingResult, StreamStatus};

/// Minimum time between two meter redraws.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

/// Width of the level bar in characters; full scale is 120 dB.
const BAR_WIDTH: usize = 40;
const BAR_FULL_SCALE_DB: f64 = 120.0;

/// CaptureDelegate that draws a one-line live meter on stderr.
pub struct TerminalDelegate {
    last_redraw: Mutex<Option<Instant>>,
}

impl TerminalDelegate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            last_redraw: Mutex::new(None),
        })
    }

    fn end_meter_line(&self) {
        if self.last_redraw.lock().take().is_some() {
            eprintln!();
        }
    }
}

impl CaptureDelegate for TerminalDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        if !state.is_recording() {
            self.end_meter_line();
        }
        log::debug!("Session state: {}", state.name());
    }

    fn on_display_frame(&self, frame: &DisplayFrame) {
        {
            let mut last = self.last_redraw.lock();
            if last.is_some_and(|t| t.elapsed() < REDRAW_INTERVAL) {
                return;
            }
            *last = Some(Instant::now());
        }

        let peak = frame
            .spectrum
            .peak()
            .map(|bin| format!("{:7.1} Hz", bin.frequency_hz))
            .unwrap_or_else(|| "      - Hz".to_string());
        let mut stderr = io::stderr().lock();
        let _ = write!(
            stderr,
            "\r{:7.2} s  {:6.1} dB  [{}]  peak {}",
            frame.elapsed_secs,
            frame.level.db,
            level_bar(frame.level.db),
            peak
        );
        let _ = stderr.flush();
    }

    fn on_stream_warning(&self, status: &StreamStatus) {
        self.end_meter_line();
        eprintln!("warning: input stream reported {:?}", status);
    }

    fn on_error(&self, error: &CaptureError) {
        self.end_meter_line();
        eprintln!("error: {}", error);
    }

    fn on_capture_finished(&self, result: &RecordingResult) {
        self.end_meter_line();
        match result.file_path {
            Some(ref path) => eprintln!("saved {} samples to {}", result.total_samples, path.display()),
            None => eprintln!("nothing was captured"),
        }
    }
}

fn level_bar(db: f64) -> String {
    let filled = ((db / BAR_FULL_SCALE_DB).clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("{}{}", "#".repeat(filled), " ".repeat(BAR_WIDTH - filled))
}
