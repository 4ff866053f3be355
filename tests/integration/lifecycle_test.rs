//! Integration tests for the tracker lifecycle.
//!
//! These tests are implemented in:
//! `crates/keywatch-core/tests/lifecycle_test.rs`
//!
//! Covered scenarios:
//! - `press_release_delivered_in_order_before_completion`: read order and completion
//! - `every_observer_sees_every_event`: fan-out to multiple observers
//! - `read_failures_do_not_terminate_the_loop`: non-fatal read errors
//! - `open_failure_reports_one_error_and_never_completes`: fatal open failure
//! - `stop_is_idempotent_and_terminal`: stop/stop-again semantics
//! - `start_twice_is_rejected`: no restart after stop
//! - `watcher_gesture_stops_the_tracker`: the independent stop watcher
