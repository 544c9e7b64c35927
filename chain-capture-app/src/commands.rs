use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use crossbeam_channel::{after, bounded, never, select};

use chain_capture_core::storage::metadata;
use chain_capture_core::{
    read_wav, AcquisitionSession, CaptureProvider, HttpUploader, LevelEstimator, SessionConfig, SpectrumAnalyzer,
    UploadConfig, Uploader, FULL_BAND_HZ,
};
use chain_capture_cpal::{CpalMicCapture, CpalPlayback, DeviceEnumerator};

use crate::terminal_delegate::TerminalDelegate;
use crate::{RecordArgs, UploadArgs};

pub fn record(args: RecordArgs) -> anyhow::Result<()> {
    let defaults = SessionConfig::default();
    let config = SessionConfig {
        sample_rate: args.sample_rate,
        update_interval_ms: u64::from(args.update_interval_ms),
        output_path: args.output,
        label: args.label.unwrap_or(defaults.label.clone()),
        ..defaults
    };

    let mic = match args.device {
        Some(name) => CpalMicCapture::with_device(name),
        None => CpalMicCapture::default_device(),
    };
    if !mic.is_available() {
        bail!("no usable input device (see `chain-capture devices`)");
    }

    let mut session = AcquisitionSession::new(mic, config);
    session.set_delegate(TerminalDelegate::new());
    log::info!("Recording from '{}'", session.device_info().name);

    session.start_recording()?;
    match args.duration {
        Some(secs) => eprintln!("recording for {:.1} s (press Enter to stop early)", secs),
        None => eprintln!("recording, press Enter to stop"),
    }

    let (enter_tx, enter_rx) = bounded::<()>(1);
    thread::Builder::new()
        .name("stdin-stop".into())
        .spawn(move || {
            let mut line = String::new();
            let _ = io::stdin().read_line(&mut line);
            let _ = enter_tx.send(());
        })
        .context("failed to spawn stdin reader")?;
    let deadline = match args.duration {
        Some(secs) => after(Duration::from_secs_f64(secs)),
        None => never(),
    };
    select! {
        recv(enter_rx) -> _ => {},
        recv(deadline) -> _ => {},
    }

    let result = session.stop_recording()?;
    let diagnostics = session.diagnostics();
    log::info!(
        "{} callbacks, {} stream warnings, {} display ticks",
        diagnostics.callback_count,
        diagnostics.stream_warnings,
        diagnostics.display_ticks
    );

    println!("duration: {:.2} s", result.duration_secs);
    println!("samples:  {} at {} Hz", result.total_samples, result.sample_rate);
    println!("level:    {:.1} dB", result.final_frame.level.db);
    if let Some(peak) = result.final_frame.spectrum.peak() {
        println!("peak:     {:.1} Hz", peak.frequency_hz);
    }
    if let Some(meta) = result.metadata {
        println!("sha256:   {}", meta.checksum);
    }
    Ok(())
}

pub fn replay(input: &Path) -> anyhow::Result<()> {
    let (sample_rate, samples) = read_wav(input)?;
    eprintln!(
        "playing {} ({:.2} s at {} Hz)",
        input.display(),
        samples.len() as f64 / sample_rate as f64,
        sample_rate
    );
    CpalPlayback::new().play_blocking(&samples, sample_rate)?;
    Ok(())
}

pub fn upload(args: UploadArgs) -> anyhow::Result<()> {
    let uploader = HttpUploader::new(UploadConfig {
        endpoint: args.endpoint,
        timeout: Duration::from_secs(u64::from(args.timeout)),
    })?;
    let message = uploader.upload(&args.input, &args.label, &args.api_key)?;
    println!("{}", message);
    Ok(())
}

pub fn reset(input: &Path) -> anyhow::Result<()> {
    if metadata::remove_recording(input)? {
        println!("deleted {}", input.display());
    } else {
        println!("{} does not exist", input.display());
    }
    Ok(())
}

pub fn analyze(input: &Path) -> anyhow::Result<()> {
    let (sample_rate, samples) = read_wav(input)?;
    if samples.is_empty() {
        bail!("{} contains no samples", input.display());
    }

    let level = LevelEstimator::estimate(&samples);
    let spectrum = SpectrumAnalyzer::new().analyze(&samples, sample_rate, FULL_BAND_HZ.0, FULL_BAND_HZ.1);

    println!("file:     {}", input.display());
    println!(
        "duration: {:.2} s ({} samples at {} Hz)",
        samples.len() as f64 / sample_rate as f64,
        samples.len(),
        sample_rate
    );
    println!("level:    {:.1} dB", level.db);
    match spectrum.peak() {
        Some(peak) => println!("peak:     {:.1} Hz", peak.frequency_hz),
        None => println!("peak:     -"),
    }
    if let Ok(meta) = metadata::read_metadata(input) {
        println!("label:    {}", meta.label);
        println!("recorded: {}", meta.created_at);
    }
    Ok(())
}

pub fn devices() -> anyhow::Result<()> {
    let devices = DeviceEnumerator::new().list_capture_devices()?;
    if devices.is_empty() {
        println!("no input devices found");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}
