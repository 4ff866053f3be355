//! Domain primitive types used across the Keywatch workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One raw evdev record, with the device timestamp already dropped.
///
/// Ephemeral: produced by the device source, consumed by the classifier,
/// never retained. Only records with `kind == EV_KEY` carry key
/// information; everything else (sync markers, LED state, autorepeat
/// configuration) is filtered out downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Event type tag (`EV_KEY`, `EV_SYN`, ...).
    pub kind: u16,
    /// Key code, meaningful only for `EV_KEY` records.
    pub code: u16,
    /// Event value: 1 press, 0 release, 2 autorepeat.
    pub value: i32,
}

/// Phase of a key event, derived from the raw record's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyPhase {
    /// The key went down (raw value 1).
    Pressed,
    /// The key came up (raw value 0).
    Released,
    /// The key is held and autorepeating (raw value 2).
    Repeating,
    /// Any other raw value.
    Unknown,
}

impl KeyPhase {
    /// Maps a raw event value to its phase.
    #[must_use]
    pub const fn from_raw_value(value: i32) -> Self {
        match value {
            1 => Self::Pressed,
            0 => Self::Released,
            2 => Self::Repeating,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for KeyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pressed => write!(f, "pressed"),
            Self::Released => write!(f, "released"),
            Self::Repeating => write!(f, "repeating"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A classified keyboard event. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Identifier of the physical key (Linux `KEY_*` code).
    pub code: u16,
    /// What the key did.
    pub phase: KeyPhase,
}

impl KeyEvent {
    /// Creates a key event from a code and a raw value.
    #[must_use]
    pub const fn new(code: u16, value: i32) -> Self {
        Self {
            code,
            phase: KeyPhase::from_raw_value(value),
        }
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {} {}", self.code, self.phase)
    }
}

/// Lifecycle state of an event tracker.
///
/// `Stopped` is terminal; a tracker is never restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerState {
    /// Created but not yet started.
    Idle,
    /// The worker thread is reading and dispatching events.
    Running,
    /// A stop has been requested; the worker has not yet observed it.
    Stopping,
    /// The worker has exited and the device handle is released.
    Stopped,
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
