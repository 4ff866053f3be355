//! # keywatch-core
//!
//! The keyboard event tracking engine.
//!
//! A background worker thread performs blocking reads on a Linux evdev
//! device, classifies each raw record into a [`KeyEvent`], and fans it out
//! to every registered [`Observer`]. The controlling thread drives the
//! lifecycle through [`EventTracker::start`] and [`EventTracker::stop`];
//! a shared [`StopSignal`] is the only mutable state crossing the thread
//! boundary.
//!
//! Pipeline: [`device`] → [`classify`] → [`observer`], orchestrated by
//! [`tracker`], with the stop gesture handled in [`control`].
//!
//! [`KeyEvent`]: keywatch_common::types::KeyEvent
//! [`Observer`]: crate::observer::Observer
//! [`StopSignal`]: crate::tracker::StopSignal
//! [`EventTracker::start`]: crate::tracker::EventTracker::start
//! [`EventTracker::stop`]: crate::tracker::EventTracker::stop

pub mod classify;
pub mod control;
pub mod device;
pub mod observer;
pub mod tracker;
