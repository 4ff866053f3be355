//! System-wide constants and default paths.

use std::time::Duration;

/// Default keyboard device path.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/input/event2";

/// Default path of the line-oriented event log.
pub const DEFAULT_LOG_FILE: &str = "keyboard_events.log";

/// Evdev type tag for synchronization markers.
pub const EV_SYN: u16 = 0x00;

/// Evdev type tag for key events.
pub const EV_KEY: u16 = 0x01;

/// Key code of the Escape key, the default stop gesture.
pub const KEY_ESC: u16 = 1;

/// Delay before the stop watcher retries a failed device open.
pub const WATCHER_RETRY_INTERVAL: Duration = Duration::from_millis(250);
