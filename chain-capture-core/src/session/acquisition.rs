use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::display;
use crate::models::audio_models::{
    AudioSource, CaptureSessionDiagnostics, DisplayFrame, LevelReading, SampleBlock, StreamFormat, StreamStatus,
};
use crate::models::config::SessionConfig;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::CaptureState;
use crate::processing::capture_buffer::CaptureBuffer;
use crate::processing::filter::BandpassFilter;
use crate::processing::level::LevelEstimator;
use crate::processing::spectrum::{SpectrumAnalyzer, FULL_BAND_HZ, LIVE_BAND_HZ};
use crate::storage::metadata;
use crate::storage::wav_writer::PcmFileWriter;
use crate::traits::capture_delegate::CaptureDelegate;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

/// Mutable session state, protected by `parking_lot::Mutex`.
///
/// Never touched by the capture callback.
struct SessionState {
    state: CaptureState,
    capture_start: Option<Instant>,
    latest_frame: Option<DisplayFrame>,
    display_ticks: u64,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            capture_start: None,
            latest_frame: None,
            display_ticks: 0,
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.capture_start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Lock-free counters updated from the capture callback.
#[derive(Default)]
struct CallbackStats {
    callback_count: AtomicU64,
    samples_total: AtomicU64,
    stream_warnings: AtomicU64,
    latest_level_bits: AtomicU64,
    last_warning: Mutex<Option<StreamStatus>>,
}

impl CallbackStats {
    fn clear(&self) {
        self.callback_count.store(0, Ordering::Relaxed);
        self.samples_total.store(0, Ordering::Relaxed);
        self.stream_warnings.store(0, Ordering::Relaxed);
        self.latest_level_bits.store(0f64.to_bits(), Ordering::Relaxed);
        *self.last_warning.lock() = None;
    }

    fn latest_level(&self) -> LevelReading {
        LevelReading {
            db: f64::from_bits(self.latest_level_bits.load(Ordering::Relaxed)),
        }
    }
}

/// Everything the display tick needs, shared with the tick thread.
#[derive(Clone)]
struct TickContext {
    buffer: Arc<CaptureBuffer>,
    session_state: Arc<Mutex<SessionState>>,
    stats: Arc<CallbackStats>,
    sample_rate: u32,
}

impl TickContext {
    /// Render the trailing one-second view. `None` unless recording.
    fn tick(&self, analyzer: &mut SpectrumAnalyzer) -> Option<DisplayFrame> {
        let elapsed = {
            let s = self.session_state.lock();
            if !s.state.is_recording() {
                return None;
            }
            s.elapsed_secs()
        };

        let window = self.buffer.snapshot(self.sample_rate as usize);
        let frame = display::render_frame(
            analyzer,
            window,
            self.sample_rate,
            elapsed,
            LIVE_BAND_HZ,
            self.stats.latest_level(),
        );

        let mut s = self.session_state.lock();
        if s.state.is_recording() {
            s.state = CaptureState::Recording { duration_secs: elapsed };
        }
        s.latest_frame = Some(frame.clone());
        s.display_ticks += 1;
        Some(frame)
    }
}

/// Orchestrates one microphone stream through the filter/buffer/level pipeline.
///
/// Data flow:
/// ```text
/// [CaptureProvider] → callback: [BandpassFilter] → [CaptureBuffer] + [LevelEstimator]
///                                                        │
///            display tick (every update_interval) ← snapshot(sample_rate)
///                                                        │
///                                  stop → [PcmFileWriter] + metadata sidecar
/// ```
pub struct AcquisitionSession<P: CaptureProvider> {
    provider: P,
    config: SessionConfig,
    session_state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn CaptureDelegate>>,

    // Written only by the capture callback; read by the tick and the flush.
    buffer: Arc<CaptureBuffer>,
    stats: Arc<CallbackStats>,
    accepting: Arc<AtomicBool>,

    // Display tick thread control
    tick_running: Arc<AtomicBool>,
    tick_handle: Option<thread::JoinHandle<()>>,

    last_result: Option<RecordingResult>,
}

impl<P: CaptureProvider> AcquisitionSession<P> {
    pub fn new(provider: P, config: SessionConfig) -> Self {
        Self {
            provider,
            config,
            session_state: Arc::new(Mutex::new(SessionState::new())),
            delegate: None,
            buffer: Arc::new(CaptureBuffer::new()),
            stats: Arc::new(CallbackStats::default()),
            accepting: Arc::new(AtomicBool::new(false)),
            tick_running: Arc::new(AtomicBool::new(false)),
            tick_handle: None,
            last_result: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn CaptureDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn state(&self) -> CaptureState {
        self.session_state.lock().state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Replace the configuration. Rejected while recording.
    pub fn set_config(&mut self, config: SessionConfig) -> Result<(), CaptureError> {
        if self.state().is_recording() {
            return Err(CaptureError::InvalidState(
                "cannot change configuration while recording".into(),
            ));
        }
        self.config = config;
        Ok(())
    }

    /// Read-only handle to the captured samples.
    pub fn buffer(&self) -> Arc<CaptureBuffer> {
        Arc::clone(&self.buffer)
    }

    pub fn total_samples(&self) -> usize {
        self.buffer.total_samples()
    }

    /// Level of the most recently captured block.
    pub fn latest_level(&self) -> LevelReading {
        self.stats.latest_level()
    }

    /// Newest frame rendered by the display tick (or the final frame after stop).
    pub fn latest_frame(&self) -> Option<DisplayFrame> {
        self.session_state.lock().latest_frame.clone()
    }

    pub fn last_result(&self) -> Option<&RecordingResult> {
        self.last_result.as_ref()
    }

    pub fn device_info(&self) -> AudioSource {
        self.provider.device_info()
    }

    pub fn diagnostics(&self) -> CaptureSessionDiagnostics {
        CaptureSessionDiagnostics {
            callback_count: self.stats.callback_count.load(Ordering::Relaxed),
            samples_total: self.stats.samples_total.load(Ordering::Relaxed),
            stream_warnings: self.stats.stream_warnings.load(Ordering::Relaxed),
            display_ticks: self.session_state.lock().display_ticks,
        }
    }

    /// Render the live view now, on the caller's thread.
    ///
    /// For shells that drive their own timer instead of relying on the
    /// delegate. Returns `None` unless recording.
    pub fn tick(&self) -> Option<DisplayFrame> {
        self.tick_context().tick(&mut SpectrumAnalyzer::new())
    }

    /// Start recording. Transitions: idle/stopped → recording.
    ///
    /// On `InvalidParameter` or `InvalidFilterSpec` nothing changes. On
    /// `DeviceUnavailable` the session is left idle with an empty buffer.
    pub fn start_recording(&mut self) -> Result<(), CaptureError> {
        if self.state().is_recording() {
            return Err(CaptureError::InvalidState("already recording".into()));
        }

        self.config.validate()?;
        let filter = BandpassFilter::new(self.config.filter_spec())?;
        let sample_rate = self.config.sample_rate;

        self.buffer.reset()?;
        self.stats.clear();
        self.last_result = None;
        self.session_state.lock().latest_frame = None;

        let callback = self.build_callback(filter, sample_rate);
        self.buffer.begin_capture();
        self.accepting.store(true, Ordering::SeqCst);

        if let Err(e) = self.provider.start(StreamFormat::mono(sample_rate), callback) {
            self.accepting.store(false, Ordering::SeqCst);
            self.buffer.end_capture();
            log::error!("Failed to start recording: {}", e);
            self.notify_error(&e);
            self.set_state(CaptureState::Idle);
            return Err(e);
        }

        {
            let mut s = self.session_state.lock();
            s.capture_start = Some(Instant::now());
            s.display_ticks = 0;
        }
        self.set_state(CaptureState::Recording { duration_secs: 0.0 });

        if let Err(e) = self.start_display_tick() {
            log::error!("Failed to start display tick: {}", e);
            let _ = self.provider.stop();
            self.accepting.store(false, Ordering::SeqCst);
            self.buffer.end_capture();
            self.set_state(CaptureState::Idle);
            self.notify_error(&e);
            return Err(e);
        }

        log::info!(
            "Recording at {} Hz, band {}-{} Hz, display every {} ms",
            sample_rate,
            self.config.filter.low_hz,
            self.config.filter.high_hz,
            self.config.update_interval_ms
        );
        Ok(())
    }

    /// Stop recording and flush the buffer to the configured file.
    /// Transitions: recording → stopped.
    ///
    /// The transition always completes. A flush failure is returned as
    /// `IoFailure` with the captured samples left intact; call
    /// [`save`](Self::save) to retry.
    pub fn stop_recording(&mut self) -> Result<RecordingResult, CaptureError> {
        if !self.state().is_recording() {
            return Err(CaptureError::InvalidState("not recording".into()));
        }

        self.stop_display_tick();

        // Blocks delivered before the stream closes are kept.
        if let Err(e) = self.provider.stop() {
            log::warn!("Input stream did not stop cleanly: {}", e);
        }
        self.accepting.store(false, Ordering::SeqCst);
        self.buffer.end_capture();

        let duration_secs = self.session_state.lock().elapsed_secs();
        self.set_state(CaptureState::Stopped { duration_secs });
        log::info!(
            "Stopped after {:.2} s with {} samples in {} blocks",
            duration_secs,
            self.buffer.total_samples(),
            self.buffer.block_count()
        );

        self.finish(duration_secs)
    }

    /// Flush the stopped recording again, e.g. after an `IoFailure`.
    pub fn save(&mut self) -> Result<RecordingResult, CaptureError> {
        match self.state() {
            CaptureState::Stopped { duration_secs } => self.finish(duration_secs),
            _ => Err(CaptureError::InvalidState("can only save a stopped recording".into())),
        }
    }

    /// Clear captured data and delete the persisted file. Transitions: stopped/idle → idle.
    pub fn reset(&mut self) -> Result<(), CaptureError> {
        if self.state().is_recording() || self.buffer.is_capturing() {
            return Err(CaptureError::InvalidState("cannot reset while recording".into()));
        }

        if metadata::remove_recording(&self.config.output_path)? {
            log::info!("Deleted {}", self.config.output_path.display());
        }
        self.buffer.reset()?;
        self.stats.clear();
        self.last_result = None;
        {
            let mut s = self.session_state.lock();
            s.capture_start = None;
            s.latest_frame = None;
            s.display_ticks = 0;
        }
        self.set_state(CaptureState::Idle);
        Ok(())
    }

    // --- Internal helpers ---

    fn set_state(&self, new_state: CaptureState) {
        self.session_state.lock().state = new_state;
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    fn notify_error(&self, error: &CaptureError) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(error);
        }
    }

    fn tick_context(&self) -> TickContext {
        TickContext {
            buffer: Arc::clone(&self.buffer),
            session_state: Arc::clone(&self.session_state),
            stats: Arc::clone(&self.stats),
            sample_rate: self.config.sample_rate,
        }
    }

    /// The per-block capture path: filter → append → level.
    ///
    /// Runs on the driver thread. No I/O; the only lock is the buffer's push.
    fn build_callback(&self, filter: BandpassFilter, sample_rate: u32) -> AudioBufferCallback {
        let filter = Mutex::new(filter);
        let buffer = Arc::clone(&self.buffer);
        let stats = Arc::clone(&self.stats);
        let accepting = Arc::clone(&self.accepting);

        Arc::new(move |samples: &[f32], frame_count: usize, status: &StreamStatus| {
            if !status.is_clear() {
                log::warn!("Input stream status: {:?}", status);
                stats.stream_warnings.fetch_add(1, Ordering::Relaxed);
                *stats.last_warning.lock() = Some(status.clone());
            }

            let frames = &samples[..frame_count.min(samples.len())];
            if frames.is_empty() || !accepting.load(Ordering::Acquire) {
                return;
            }

            let filtered = filter.lock().process_block(frames);
            let level = LevelEstimator::estimate(&filtered);
            stats.latest_level_bits.store(level.db.to_bits(), Ordering::Relaxed);
            stats.callback_count.fetch_add(1, Ordering::Relaxed);
            stats.samples_total.fetch_add(filtered.len() as u64, Ordering::Relaxed);

            buffer.append(SampleBlock::new(filtered, sample_rate));
        })
    }

    /// Start the display tick thread (every `update_interval_ms`).
    fn start_display_tick(&mut self) -> Result<(), CaptureError> {
        self.tick_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.tick_running);
        let context = self.tick_context();
        let delegate = self.delegate.clone();
        let interval = Duration::from_millis(self.config.update_interval_ms);

        let handle = thread::Builder::new()
            .name("display-tick".into())
            .spawn(move || {
                let mut analyzer = SpectrumAnalyzer::new();
                let mut warnings_seen = 0;
                let mut next_tick = Instant::now() + interval;

                while running.load(Ordering::SeqCst) {
                    let now = Instant::now();
                    if now < next_tick {
                        thread::park_timeout(next_tick - now);
                        continue;
                    }
                    next_tick = (next_tick + interval).max(now);

                    let Some(frame) = context.tick(&mut analyzer) else {
                        continue;
                    };
                    let Some(ref d) = delegate else {
                        continue;
                    };

                    let warnings = context.stats.stream_warnings.load(Ordering::Relaxed);
                    if warnings > warnings_seen {
                        warnings_seen = warnings;
                        let status = context.stats.last_warning.lock().clone();
                        if let Some(status) = status {
                            d.on_stream_warning(&status);
                        }
                    }
                    d.on_display_frame(&frame);
                }
            })
            .map_err(|e| {
                self.tick_running.store(false, Ordering::SeqCst);
                CaptureError::IoFailure(format!("failed to spawn display thread: {}", e))
            })?;

        self.tick_handle = Some(handle);
        Ok(())
    }

    fn stop_display_tick(&mut self) {
        self.tick_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.tick_handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }

    /// Render the whole-recording frame and flush the buffer to disk.
    fn finish(&mut self, duration_secs: f64) -> Result<RecordingResult, CaptureError> {
        let sample_rate = self.config.sample_rate;
        let final_frame = display::render_frame(
            &mut SpectrumAnalyzer::new(),
            self.buffer.to_vec(),
            sample_rate,
            duration_secs,
            FULL_BAND_HZ,
            self.stats.latest_level(),
        );
        self.session_state.lock().latest_frame = Some(final_frame.clone());

        let (file_path, metadata) = match self.flush() {
            Ok(flushed) => flushed,
            Err(e) => {
                log::error!("Failed to save recording: {}", e);
                self.notify_error(&e);
                return Err(e);
            }
        };

        let result = RecordingResult {
            file_path,
            duration_secs,
            total_samples: self.buffer.total_samples(),
            sample_rate,
            final_frame,
            metadata,
        };

        if let Some(ref delegate) = self.delegate {
            delegate.on_capture_finished(&result);
        }
        self.last_result = Some(result.clone());
        Ok(result)
    }

    /// Write every captured block to the PCM file and its metadata sidecar.
    ///
    /// An empty buffer writes nothing.
    fn flush(&self) -> Result<(Option<PathBuf>, Option<RecordingMetadata>), CaptureError> {
        if self.buffer.is_empty() {
            log::info!("Nothing captured; no file written");
            return Ok((None, None));
        }

        let path = self.config.output_path.clone();
        let mut writer = PcmFileWriter::create(path.clone(), self.config.sample_rate, self.config.bits_per_sample)?;
        for block in self.buffer.blocks() {
            writer.write_samples(block.samples())?;
        }
        let total_samples = writer.samples_written() as usize;
        let checksum = writer.finish()?;

        let metadata = RecordingMetadata::new_mono(
            &self.config.label,
            &path.to_string_lossy(),
            self.config.sample_rate,
            total_samples,
            self.config.filter,
            &checksum,
        );
        metadata::write_metadata(&metadata, &path)?;
        log::info!("Saved {} samples to {}", total_samples, path.display());

        Ok((Some(path), Some(metadata)))
    }
}

impl<P: CaptureProvider> Drop for AcquisitionSession<P> {
    fn drop(&mut self) {
        if self.state().is_recording() {
            self.stop_display_tick();
            let _ = self.provider.stop();
            self.accepting.store(false, Ordering::SeqCst);
            self.buffer.end_capture();
        }
    }
}
