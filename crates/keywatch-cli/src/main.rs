//! # kwatch — Keywatch CLI
//!
//! Reads keyboard events from a Linux evdev device and appends them to a
//! line-oriented log until the stop key is released or Ctrl+C arrives.

mod sink;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use keywatch_common::config::TrackerConfig;
use keywatch_common::types::TrackerState;
use keywatch_core::control::{StopGestureObserver, StopWatcher};
use keywatch_core::device::EvdevBackend;
use keywatch_core::tracker::{EventTracker, StopSignal};

use crate::sink::FileLogSink;

/// Keyboard event tracker.
#[derive(Parser, Debug)]
#[command(name = "kwatch", version, about)]
struct Args {
    /// Path to a JSON configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Evdev device to read (overrides the config file).
    #[arg(short, long)]
    device: Option<PathBuf>,

    /// Event log file (overrides the config file).
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Key code whose release stops tracking (overrides the config file).
    #[arg(long)]
    stop_key: Option<u16>,

    /// Detect the stop gesture on a separate device handle instead of
    /// the tracker's own event stream.
    #[arg(long)]
    separate_watcher: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    tracing::info!(
        device = %config.device_path.display(),
        log_file = %config.log_file.display(),
        stop_key = config.stop_key,
        "configuration resolved"
    );

    let tracker = Arc::new(EventTracker::new(config.clone()));
    tracker.add_observer(Box::new(FileLogSink::new(&config.log_file)));

    let signal = tracker.stop_signal();
    let watcher = if args.separate_watcher {
        Some(StopWatcher::spawn(
            Arc::new(EvdevBackend),
            config.device_path.clone(),
            config.stop_key,
            Arc::clone(&tracker),
        )?)
    } else {
        tracker.add_observer(Box::new(StopGestureObserver::new(
            config.stop_key,
            signal.clone(),
        )));
        None
    };

    tracker.start()?;

    let ctrlc_signal = signal.clone();
    ctrlc::set_handler(move || ctrlc_signal.raise())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    eprintln!(
        "Tracking {} — release key {} or press Ctrl+C to stop.",
        config.device_path.display(),
        config.stop_key
    );

    wait_for_shutdown(&signal, &tracker);

    tracker.stop();
    if let Some(watcher) = watcher {
        watcher.join();
    }
    Ok(())
}

/// Blocks until a stop is requested or the worker has already stopped
/// on its own (a failed device open ends the run without any gesture).
fn wait_for_shutdown(signal: &StopSignal, tracker: &EventTracker) {
    while !signal.is_raised() && tracker.state() != TrackerState::Stopped {
        std::thread::sleep(Duration::from_millis(250));
    }
}

/// Builds the effective configuration: file (or defaults), then flag
/// overrides.
fn resolve_config(args: &Args) -> anyhow::Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(device) = &args.device {
        config.device_path.clone_from(device);
    }
    if let Some(log_file) = &args.log_file {
        config.log_file.clone_from(log_file);
    }
    if let Some(stop_key) = args.stop_key {
        config.stop_key = stop_key;
    }
    config.validate()?;
    Ok(config)
}
