//! End-to-end tests for the tracker lifecycle.
//!
//! A scripted device backend stands in for the evdev device so the full
//! start → read → classify → notify → stop pipeline runs deterministically:
//! 1. Clean press/release delivery in read order
//! 2. Read failures as non-fatal error notifications
//! 3. Open failure ending the run without a completion
//! 4. Stop idempotency and terminal state
//! 5. The independent stop watcher driving shutdown

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use keywatch_common::config::TrackerConfig;
use keywatch_common::constants::{EV_KEY, EV_SYN, KEY_ESC};
use keywatch_common::error::{KeywatchError, Result};
use keywatch_common::types::{KeyEvent, RawEvent, TrackerState};
use keywatch_core::control::StopWatcher;
use keywatch_core::device::{DeviceBackend, EventSource};
use keywatch_core::observer::Observer;
use keywatch_core::tracker::{EventTracker, StopSignal};

// ── Scripted device ──────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Step {
    Key { code: u16, value: i32 },
    Raw { kind: u16, code: u16, value: i32 },
    Fail,
}

/// What the source does once its script is exhausted.
#[derive(Clone, Copy)]
enum OnEmpty {
    /// Raise the tracker's stop signal, then idle on sync records.
    RaiseStop,
    /// Idle on sync records until someone else raises the signal.
    Idle,
}

struct ScriptedSource {
    // Shared with the backend so a reopened source resumes the script
    // where the previous handle left off.
    steps: Arc<Mutex<VecDeque<Step>>>,
    on_empty: OnEmpty,
    signal: StopSignal,
}

impl EventSource for ScriptedSource {
    fn read_next(&mut self) -> Result<RawEvent> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Key { code, value }) => Ok(RawEvent {
                kind: EV_KEY,
                code,
                value,
            }),
            Some(Step::Raw { kind, code, value }) => Ok(RawEvent { kind, code, value }),
            Some(Step::Fail) => Err(KeywatchError::ReadFailed {
                message: "scripted read failure".to_string(),
            }),
            None => {
                if matches!(self.on_empty, OnEmpty::RaiseStop) {
                    self.signal.raise();
                }
                // Keyboards emit EV_SYN markers between bursts; idling on
                // them keeps the loop honest without busy-spinning.
                std::thread::sleep(Duration::from_millis(1));
                Ok(RawEvent {
                    kind: EV_SYN,
                    code: 0,
                    value: 0,
                })
            }
        }
    }
}

struct ScriptedBackend {
    script: Arc<Mutex<VecDeque<Step>>>,
    on_empty: OnEmpty,
    signal: Mutex<Option<StopSignal>>,
    fail_open: bool,
}

impl ScriptedBackend {
    fn new(steps: Vec<Step>, on_empty: OnEmpty) -> Arc<Self> {
        Arc::new(Self {
            script: Arc::new(Mutex::new(steps.into())),
            on_empty,
            signal: Mutex::new(None),
            fail_open: false,
        })
    }

    fn failing_open() -> Arc<Self> {
        Arc::new(Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            on_empty: OnEmpty::Idle,
            signal: Mutex::new(None),
            fail_open: true,
        })
    }

    /// Hands the tracker's stop signal to sources opened later.
    fn connect(&self, signal: StopSignal) {
        *self.signal.lock().unwrap() = Some(signal);
    }
}

impl DeviceBackend for ScriptedBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn EventSource>> {
        if self.fail_open {
            return Err(KeywatchError::DeviceUnavailable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such device"),
            });
        }
        let signal = self
            .signal
            .lock()
            .unwrap()
            .clone()
            .expect("backend connected to a stop signal");
        Ok(Box::new(ScriptedSource {
            steps: Arc::clone(&self.script),
            on_empty: self.on_empty,
            signal,
        }))
    }
}

// ── Recording observer ───────────────────────────────────────────────

#[derive(Clone, Default)]
struct RecordingObserver {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingObserver {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count_of(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl Observer for RecordingObserver {
    fn on_event(&self, event: &KeyEvent) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("event:{}:{}", event.code, event.phase));
    }

    fn on_complete(&self) {
        self.calls.lock().unwrap().push("complete".to_string());
    }

    fn on_error(&self, _message: &str) {
        self.calls.lock().unwrap().push("error".to_string());
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn test_config() -> TrackerConfig {
    TrackerConfig {
        device_path: PathBuf::from("/dev/input/event-test"),
        ..TrackerConfig::default()
    }
}

fn wait_for_state(tracker: &EventTracker, expected: TrackerState) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while tracker.state() != expected {
        assert!(
            Instant::now() < deadline,
            "timed out waiting for state {expected}, still {}",
            tracker.state()
        );
        std::thread::sleep(Duration::from_millis(2));
    }
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[test]
fn press_release_delivered_in_order_before_completion() {
    let backend = ScriptedBackend::new(
        vec![
            Step::Key { code: 30, value: 1 },
            Step::Raw {
                kind: EV_SYN,
                code: 0,
                value: 0,
            },
            Step::Key { code: 30, value: 0 },
        ],
        OnEmpty::RaiseStop,
    );
    let tracker = EventTracker::with_backend(test_config(), backend.clone());
    backend.connect(tracker.stop_signal());

    let observer = RecordingObserver::default();
    tracker.add_observer(Box::new(observer.clone()));

    tracker.start().expect("start");
    wait_for_state(&tracker, TrackerState::Stopped);
    tracker.stop();

    assert_eq!(
        observer.calls(),
        vec!["event:30:pressed", "event:30:released", "complete"],
        "sync records must be filtered and completion must come last"
    );
}

#[test]
fn every_observer_sees_every_event() {
    let backend = ScriptedBackend::new(
        (0..4).map(|code| Step::Key { code, value: 1 }).collect(),
        OnEmpty::RaiseStop,
    );
    let tracker = EventTracker::with_backend(test_config(), backend.clone());
    backend.connect(tracker.stop_signal());

    let first = RecordingObserver::default();
    let second = RecordingObserver::default();
    tracker.add_observer(Box::new(first.clone()));
    tracker.add_observer(Box::new(second.clone()));

    tracker.start().expect("start");
    wait_for_state(&tracker, TrackerState::Stopped);
    tracker.stop();

    for observer in [&first, &second] {
        assert_eq!(observer.count_of("event:"), 4);
        assert_eq!(observer.count_of("complete"), 1);
    }
}

#[test]
fn read_failures_do_not_terminate_the_loop() {
    let backend = ScriptedBackend::new(
        vec![
            Step::Fail,
            Step::Fail,
            Step::Fail,
            Step::Key { code: 30, value: 1 },
        ],
        OnEmpty::RaiseStop,
    );
    let tracker = EventTracker::with_backend(test_config(), backend.clone());
    backend.connect(tracker.stop_signal());

    let observer = RecordingObserver::default();
    tracker.add_observer(Box::new(observer.clone()));

    tracker.start().expect("start");
    wait_for_state(&tracker, TrackerState::Stopped);
    tracker.stop();

    assert_eq!(
        observer.calls(),
        vec!["error", "error", "error", "event:30:pressed", "complete"],
        "the loop must keep reading through consecutive failed reads"
    );
}

#[test]
fn open_failure_reports_one_error_and_never_completes() {
    let backend = ScriptedBackend::failing_open();
    let tracker = EventTracker::with_backend(test_config(), backend);

    let first = RecordingObserver::default();
    let second = RecordingObserver::default();
    tracker.add_observer(Box::new(first.clone()));
    tracker.add_observer(Box::new(second.clone()));

    tracker.start().expect("start");
    wait_for_state(&tracker, TrackerState::Stopped);
    tracker.stop();

    for observer in [&first, &second] {
        assert_eq!(observer.calls(), vec!["error"]);
    }
}

#[test]
fn open_failure_settles_to_stopped_even_when_the_worker_exits_first() {
    // A worker that cannot open its device writes Stopped as soon as it
    // is scheduled, which can be before start() has even returned; the
    // tracker must never report Running after that.
    for _ in 0..200 {
        let backend = ScriptedBackend::failing_open();
        let tracker = EventTracker::with_backend(test_config(), backend);
        tracker.start().expect("start");
        wait_for_state(&tracker, TrackerState::Stopped);
        tracker.stop();
        assert_eq!(tracker.state(), TrackerState::Stopped);
    }
}

#[test]
fn stop_is_idempotent_and_terminal() {
    let backend = ScriptedBackend::new(Vec::new(), OnEmpty::Idle);
    let tracker = EventTracker::with_backend(test_config(), backend.clone());
    backend.connect(tracker.stop_signal());

    let observer = RecordingObserver::default();
    tracker.add_observer(Box::new(observer.clone()));

    tracker.start().expect("start");
    assert_eq!(tracker.state(), TrackerState::Running);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(
        tracker.state(),
        TrackerState::Running,
        "an idle device must not end the run"
    );

    tracker.stop();
    assert_eq!(tracker.state(), TrackerState::Stopped);
    tracker.stop();
    assert_eq!(tracker.state(), TrackerState::Stopped);

    assert_eq!(observer.count_of("complete"), 1);
}

#[test]
fn start_twice_is_rejected() {
    let backend = ScriptedBackend::new(Vec::new(), OnEmpty::Idle);
    let tracker = EventTracker::with_backend(test_config(), backend.clone());
    backend.connect(tracker.stop_signal());

    tracker.start().expect("first start");
    assert!(matches!(
        tracker.start(),
        Err(KeywatchError::AlreadyRunning)
    ));
    tracker.stop();

    assert!(
        matches!(tracker.start(), Err(KeywatchError::AlreadyRunning)),
        "stopped is terminal, the tracker never restarts"
    );
}

// ── Stop watcher ─────────────────────────────────────────────────────

#[test]
fn watcher_gesture_stops_the_tracker() {
    let tracker_backend = ScriptedBackend::new(
        vec![Step::Key { code: 30, value: 1 }],
        OnEmpty::Idle,
    );
    let tracker = Arc::new(EventTracker::with_backend(
        test_config(),
        tracker_backend.clone(),
    ));
    tracker_backend.connect(tracker.stop_signal());

    let observer = RecordingObserver::default();
    tracker.add_observer(Box::new(observer.clone()));
    tracker.start().expect("start");

    // The watcher reads its own handle and sees the ESC release there.
    let watcher_backend = ScriptedBackend::new(
        vec![
            Step::Key {
                code: KEY_ESC,
                value: 1,
            },
            Step::Key {
                code: KEY_ESC,
                value: 0,
            },
        ],
        OnEmpty::Idle,
    );
    watcher_backend.connect(tracker.stop_signal());
    let watcher = StopWatcher::spawn(
        watcher_backend,
        PathBuf::from("/dev/input/event-test"),
        KEY_ESC,
        Arc::clone(&tracker),
    )
    .expect("spawn watcher");

    watcher.join();
    assert_eq!(tracker.state(), TrackerState::Stopped);
    assert_eq!(observer.count_of("complete"), 1);
}

#[test]
fn watcher_reopens_after_a_read_failure_and_still_catches_the_gesture() {
    let tracker_backend = ScriptedBackend::new(Vec::new(), OnEmpty::Idle);
    let tracker = Arc::new(EventTracker::with_backend(
        test_config(),
        tracker_backend.clone(),
    ));
    tracker_backend.connect(tracker.stop_signal());
    tracker.start().expect("start");

    // The failed read forces the watcher to drop its handle and reopen;
    // the reopened source resumes the script at the ESC release.
    let watcher_backend = ScriptedBackend::new(
        vec![
            Step::Fail,
            Step::Key {
                code: KEY_ESC,
                value: 0,
            },
        ],
        OnEmpty::Idle,
    );
    watcher_backend.connect(tracker.stop_signal());
    let watcher = StopWatcher::spawn(
        watcher_backend,
        PathBuf::from("/dev/input/event-test"),
        KEY_ESC,
        Arc::clone(&tracker),
    )
    .expect("spawn watcher");

    watcher.join();
    assert_eq!(tracker.state(), TrackerState::Stopped);
}
