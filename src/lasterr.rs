// lasterr.rs - Process-wide last-error sink.
//
// Holds the message of the most recent failure of any public entry point.
// Each failure overwrites the previous message; no history is kept.

use std::sync::{Mutex, MutexGuard};

use crate::error::GenError;

static LAST_ERROR: Mutex<Option<String>> = Mutex::new(None);

fn slot() -> MutexGuard<'static, Option<String>> {
    // A panic while holding the lock leaves a plain string behind.
    LAST_ERROR.lock().unwrap_or_else(|e| e.into_inner())
}

pub fn set_last_error(message: impl Into<String>) {
    *slot() = Some(message.into());
}

/// The most recent error message, if any failure happened since start-up
/// or the last [`clear_last_error`].
pub fn last_error() -> Option<String> {
    slot().clone()
}

pub fn clear_last_error() {
    *slot() = None;
}

/// Record the error of `result`, if any, and pass it through.
pub(crate) fn record<T>(result: Result<T, GenError>) -> Result<T, GenError> {
    if let Err(e) = &result {
        set_last_error(e.to_string());
    }
    result
}
