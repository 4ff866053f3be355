//! Observer contract and registry.
//!
//! Listeners implement [`Observer`] and are registered once; there is no
//! removal primitive. The registry owns each observer for its whole
//! lifetime and drops them together with the tracker.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Mutex, PoisonError};

use keywatch_common::types::KeyEvent;

/// A listener for classified keyboard events.
///
/// Implementations must be `Send + Sync`: notifications are delivered
/// from the tracker's worker thread while the registry handle stays
/// shared with the controlling thread.
pub trait Observer: Send + Sync {
    /// Called for every classified key event, in read order.
    fn on_event(&self, event: &KeyEvent);

    /// Called exactly once when the tracking loop finishes cleanly.
    fn on_complete(&self);

    /// Called for every device- or read-level failure.
    fn on_error(&self, message: &str);
}

/// An ordered collection of observers with fan-out notification.
///
/// A panic inside one observer's callback is caught and logged so the
/// remaining observers are still notified; failure isolation per
/// observer is part of the contract.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Box<dyn Observer>>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer. O(1); order of registration is the order
    /// of notification.
    pub fn add(&self, observer: Box<dyn Observer>) {
        self.lock().push(observer);
    }

    /// Number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the registry has no observers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Fans out a key event to every observer.
    pub fn notify_event(&self, event: &KeyEvent) {
        self.for_each(|observer| observer.on_event(event));
    }

    /// Fans out the completion notification to every observer.
    pub fn notify_complete(&self) {
        self.for_each(|observer| observer.on_complete());
    }

    /// Fans out an error message to every observer.
    pub fn notify_error(&self, message: &str) {
        self.for_each(|observer| observer.on_error(message));
    }

    fn for_each(&self, f: impl Fn(&dyn Observer)) {
        for observer in self.lock().iter() {
            // Callbacks are caught so one misbehaving observer cannot
            // starve its siblings or poison the registry lock.
            if catch_unwind(AssertUnwindSafe(|| f(observer.as_ref()))).is_err() {
                tracing::warn!("observer panicked during notification");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Box<dyn Observer>>> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
