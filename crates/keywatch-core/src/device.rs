//! Raw input device access.
//!
//! An evdev character device delivers fixed-size `struct input_event`
//! records through blocking reads. [`DeviceBackend`] abstracts the open
//! step so tests can substitute scripted sources for the real device;
//! [`EventSource`] abstracts the per-record read.
//!
//! The device handle lives inside the source and is closed exactly once,
//! when the source drops, on every exit path.

use std::fs::File;
use std::io::Read;
use std::mem;
use std::path::Path;

use keywatch_common::error::{KeywatchError, Result};
use keywatch_common::types::RawEvent;

/// Size in bytes of one `struct input_event` record on this platform.
pub const EVENT_RECORD_SIZE: usize = mem::size_of::<libc::input_event>();

/// A stream of raw input records.
///
/// `read_next` blocks until a full record arrives. A short or failed
/// read yields [`KeywatchError::ReadFailed`] without invalidating the
/// source; the caller decides whether to retry or abort.
pub trait EventSource: Send {
    /// Reads the next fixed-size record from the device.
    ///
    /// # Errors
    ///
    /// Returns `ReadFailed` on a short or failed read.
    fn read_next(&mut self) -> Result<RawEvent>;
}

/// Opens event sources for a device path.
///
/// This is the seam between the tracker and the operating system:
/// production code uses [`EvdevBackend`], tests inject scripted
/// implementations.
pub trait DeviceBackend: Send + Sync {
    /// Opens the device at `path` for blocking reads.
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if the device cannot be opened.
    fn open(&self, path: &Path) -> Result<Box<dyn EventSource>>;
}

/// Backend that reads real evdev devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvdevBackend;

impl DeviceBackend for EvdevBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn EventSource>> {
        let file = File::open(path).map_err(|e| KeywatchError::DeviceUnavailable {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "device opened");
        Ok(Box::new(EvdevSource { file }))
    }
}

/// A single opened evdev device.
struct EvdevSource {
    file: File,
}

impl EventSource for EvdevSource {
    fn read_next(&mut self) -> Result<RawEvent> {
        let mut buf = [0u8; EVENT_RECORD_SIZE];
        match self.file.read(&mut buf) {
            Ok(EVENT_RECORD_SIZE) => Ok(parse_record(&buf)),
            Ok(n) => Err(KeywatchError::ReadFailed {
                message: format!("short read: {n} of {EVENT_RECORD_SIZE} bytes"),
            }),
            Err(e) => Err(KeywatchError::ReadFailed {
                message: e.to_string(),
            }),
        }
    }
}

/// Extracts the type, code, and value fields from one raw record.
///
/// The buffer is laid out as `struct input_event`; the leading timestamp
/// is dropped, since events are dispatched as they arrive.
#[must_use]
pub fn parse_record(buf: &[u8; EVENT_RECORD_SIZE]) -> RawEvent {
    const KIND: usize = mem::offset_of!(libc::input_event, type_);
    const CODE: usize = mem::offset_of!(libc::input_event, code);
    const VALUE: usize = mem::offset_of!(libc::input_event, value);

    RawEvent {
        kind: u16::from_ne_bytes([buf[KIND], buf[KIND + 1]]),
        code: u16::from_ne_bytes([buf[CODE], buf[CODE + 1]]),
        value: i32::from_ne_bytes([
            buf[VALUE],
            buf[VALUE + 1],
            buf[VALUE + 2],
            buf[VALUE + 3],
        ]),
    }
}
