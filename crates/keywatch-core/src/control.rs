//! Stop gesture detection.
//!
//! Two mechanisms end a tracking session from the keyboard itself:
//!
//! - [`StopGestureObserver`] rides the tracker's own dispatch path and
//!   raises the stop signal when it sees the configured key released.
//!   One device handle, no contention; this is the default wiring.
//! - [`StopWatcher`] is an independent thread with its own handle to the
//!   same device path. The device driver decides which handle sees which
//!   events, so the watcher and the worker race for records; the
//!   single-handle observer avoids that entirely and the watcher exists
//!   for setups that want detection fully decoupled from dispatch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use keywatch_common::constants::WATCHER_RETRY_INTERVAL;
use keywatch_common::error::{KeywatchError, Result};
use keywatch_common::types::{KeyEvent, KeyPhase};

use crate::classify::classify;
use crate::device::DeviceBackend;
use crate::observer::Observer;
use crate::tracker::{EventTracker, StopSignal};

/// Observer that raises the stop signal on the configured key release.
///
/// Register it alongside the regular observers; when the stop key is
/// released it raises the signal, the worker notices at the top of its
/// next iteration, and the controlling thread's `stop` completes the
/// shutdown. The observer never calls `stop` itself — joining the worker
/// from inside its own dispatch would deadlock.
pub struct StopGestureObserver {
    stop_key: u16,
    signal: StopSignal,
}

impl StopGestureObserver {
    /// Creates a gesture observer for the given key code.
    #[must_use]
    pub fn new(stop_key: u16, signal: StopSignal) -> Self {
        Self { stop_key, signal }
    }
}

impl Observer for StopGestureObserver {
    fn on_event(&self, event: &KeyEvent) {
        if event.code == self.stop_key && event.phase == KeyPhase::Released {
            tracing::info!(code = event.code, "stop gesture detected");
            self.signal.raise();
        }
    }

    fn on_complete(&self) {}

    fn on_error(&self, _message: &str) {}
}

/// Independent watcher thread polling a device for the stop gesture.
///
/// Opens its own handle to the device path; a failed open is retried on
/// the next iteration rather than terminating the watcher. On detecting
/// the gesture it invokes [`EventTracker::stop`] exactly once and exits.
/// It also exits on its own once the tracker's stop signal is raised by
/// anyone else.
pub struct StopWatcher {
    handle: JoinHandle<()>,
}

impl StopWatcher {
    /// Spawns the watcher thread.
    ///
    /// # Errors
    ///
    /// Returns [`KeywatchError::Start`] if the thread cannot be spawned.
    pub fn spawn(
        backend: Arc<dyn DeviceBackend>,
        device_path: PathBuf,
        stop_key: u16,
        tracker: Arc<EventTracker>,
    ) -> Result<Self> {
        let handle = std::thread::Builder::new()
            .name("keywatch-stop-watcher".to_string())
            .spawn(move || watch(&*backend, &device_path, stop_key, &tracker))
            .map_err(|e| KeywatchError::Start { source: e })?;
        Ok(Self { handle })
    }

    /// Waits for the watcher thread to exit.
    pub fn join(self) {
        if self.handle.join().is_err() {
            tracing::warn!("stop watcher panicked");
        }
    }
}

fn watch(backend: &dyn DeviceBackend, device_path: &Path, stop_key: u16, tracker: &EventTracker) {
    let signal = tracker.stop_signal();
    while !signal.is_raised() {
        let mut source = match backend.open(device_path) {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!(error = %e, "watcher open failed, retrying");
                std::thread::sleep(WATCHER_RETRY_INTERVAL);
                continue;
            }
        };

        while !signal.is_raised() {
            match source.read_next() {
                Ok(raw) => {
                    let Some(event) = classify(&raw) else { continue };
                    if event.code == stop_key && event.phase == KeyPhase::Released {
                        tracing::info!(code = stop_key, "stop gesture detected by watcher");
                        tracker.stop();
                        return;
                    }
                }
                // Reopen after a failed read; the handle may be stale.
                // The same backoff as a failed open keeps a broken
                // device from turning the watcher into a busy loop.
                Err(e) => {
                    tracing::debug!(error = %e, "watcher read failed, reopening");
                    std::thread::sleep(WATCHER_RETRY_INTERVAL);
                    break;
                }
            }
        }
    }
}
