//! Event tracker lifecycle and worker loop.
//!
//! The tracker owns the observer registry, the shared stop flag, and the
//! worker thread handle. `start` spawns the read-classify-notify loop;
//! `stop` raises the flag and joins the worker. Cancellation is
//! cooperative: the flag is polled once per loop iteration, so `stop`
//! can block for up to one device read. A permanently silent device
//! therefore blocks `stop` indefinitely; this is a known limitation of
//! the blocking-read design, not something the tracker papers over.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use keywatch_common::config::TrackerConfig;
use keywatch_common::error::{KeywatchError, Result};
use keywatch_common::types::TrackerState;

use crate::classify::classify;
use crate::device::{DeviceBackend, EvdevBackend};
use crate::observer::{Observer, ObserverRegistry};

/// Shared stop request flag.
///
/// Single-writer-many-reader: raised at most once by the controlling
/// side, polled once per iteration by the worker. `raise` stores with
/// `Release` and `is_raised` loads with `Acquire`, so a worker that
/// observes the flag also observes everything the raising thread wrote
/// before it.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    /// Creates a lowered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a stop. Idempotent.
    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Tracks keyboard events on one device and fans them out to observers.
///
/// All methods take `&self`; the tracker is designed to be shared behind
/// an [`Arc`] between the controlling thread and a stop watcher.
pub struct EventTracker {
    config: TrackerConfig,
    backend: Arc<dyn DeviceBackend>,
    registry: Arc<ObserverRegistry>,
    stop: StopSignal,
    state: Arc<Mutex<TrackerState>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventTracker {
    /// Creates a tracker that reads the real evdev device named in the
    /// configuration.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_backend(config, Arc::new(EvdevBackend))
    }

    /// Creates a tracker with a custom device backend.
    #[must_use]
    pub fn with_backend(config: TrackerConfig, backend: Arc<dyn DeviceBackend>) -> Self {
        Self {
            config,
            backend,
            registry: Arc::new(ObserverRegistry::new()),
            stop: StopSignal::new(),
            state: Arc::new(Mutex::new(TrackerState::Idle)),
            worker: Mutex::new(None),
        }
    }

    /// Registers an observer. The registry owns it until the tracker is
    /// torn down; there is no unregister operation.
    pub fn add_observer(&self, observer: Box<dyn Observer>) {
        self.registry.add(observer);
    }

    /// Returns a handle to the shared stop flag.
    ///
    /// Raising the signal requests a stop without blocking; a later call
    /// to [`stop`](Self::stop) performs the join.
    #[must_use]
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Current lifecycle state, as last observed by either side.
    #[must_use]
    pub fn state(&self) -> TrackerState {
        *lock(&self.state)
    }

    /// Spawns the worker thread and enters `Running`.
    ///
    /// # Errors
    ///
    /// Returns [`KeywatchError::AlreadyRunning`] if the tracker has left
    /// `Idle`, or [`KeywatchError::Start`] if the thread cannot be
    /// spawned — in which case every observer receives `on_error` before
    /// this returns and the tracker stays `Idle`.
    pub fn start(&self) -> Result<()> {
        let mut worker = lock(&self.worker);
        if *lock(&self.state) != TrackerState::Idle {
            return Err(KeywatchError::AlreadyRunning);
        }

        let registry = Arc::clone(&self.registry);
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let stop = self.stop.clone();
        let device_path = self.config.device_path.clone();

        // A worker whose device open fails writes Stopped the moment it
        // runs; Running must already be in place so that transition
        // always lands last.
        *lock(&self.state) = TrackerState::Running;

        let spawned = std::thread::Builder::new()
            .name("keywatch-tracker".to_string())
            .spawn(move || run_loop(&*backend, &device_path, &registry, &stop, &state));

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                tracing::info!(device = %self.config.device_path.display(), "tracker started");
                Ok(())
            }
            Err(e) => {
                *lock(&self.state) = TrackerState::Idle;
                self.registry
                    .notify_error("tracker thread could not be started");
                Err(KeywatchError::Start { source: e })
            }
        }
    }

    /// Requests a stop and blocks until the worker has joined.
    ///
    /// On return the device handle is released and every observer has
    /// received its completion (or open-failure) notification.
    /// Idempotent: a second call finds no worker and returns
    /// immediately. `Stopped` is terminal.
    pub fn stop(&self) {
        let handle = lock(&self.worker).take();
        let Some(handle) = handle else {
            return;
        };

        {
            let mut state = lock(&self.state);
            if *state == TrackerState::Running {
                *state = TrackerState::Stopping;
            }
        }
        self.stop.raise();
        tracing::debug!("stop requested, joining worker");

        if handle.join().is_err() {
            tracing::warn!("tracker worker panicked");
        }
        *lock(&self.state) = TrackerState::Stopped;
        tracing::info!("tracker stopped");
    }
}

impl Drop for EventTracker {
    fn drop(&mut self) {
        // The worker must not outlive the tracker; joining here covers
        // callers that never invoke stop explicitly.
        self.stop();
    }
}

/// The worker loop: open once, then read-classify-notify until the stop
/// flag is observed at the top of an iteration.
///
/// Classification and notification for one event complete before the
/// next read begins; ordering across observers follows registration
/// order.
fn run_loop(
    backend: &dyn DeviceBackend,
    device_path: &Path,
    registry: &ObserverRegistry,
    stop: &StopSignal,
    state: &Arc<Mutex<TrackerState>>,
) {
    let mut source = match backend.open(device_path) {
        Ok(source) => source,
        Err(e) => {
            // Open failure is fatal to this loop instance: one error
            // notification per observer, no completion.
            tracing::error!(error = %e, "device open failed");
            registry.notify_error(&e.to_string());
            *lock(state) = TrackerState::Stopped;
            return;
        }
    };

    while !stop.is_raised() {
        match source.read_next() {
            Ok(raw) => {
                if let Some(event) = classify(&raw) {
                    tracing::trace!(code = event.code, phase = %event.phase, "key event");
                    registry.notify_event(&event);
                }
            }
            Err(e) => {
                // Read failures are non-fatal; a flaky device shows up
                // as a stream of error notifications, not a dead loop.
                tracing::warn!(error = %e, "device read failed");
                registry.notify_error(&e.to_string());
            }
        }
    }

    drop(source);
    registry.notify_complete();
    *lock(state) = TrackerState::Stopped;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
