//! Raw record classification.

use keywatch_common::constants::EV_KEY;
use keywatch_common::types::{KeyEvent, RawEvent};

/// Maps a raw record to a semantic key event.
///
/// Returns `None` for records that are not key events (sync markers,
/// LED state, and so on). Pure: no state, no side effects.
#[must_use]
pub const fn classify(raw: &RawEvent) -> Option<KeyEvent> {
    if raw.kind != EV_KEY {
        return None;
    }
    Some(KeyEvent::new(raw.code, raw.value))
}
