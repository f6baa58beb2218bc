//! Bridge errors and the host "last error" string.
//!
//! Mixer callbacks such as `get_samples` or `seek` have no error channel of
//! their own. Backends report failures by writing a message the host can read
//! back with [`get_error`]. The message is stored per thread, like the host's
//! own error slot.

use std::cell::RefCell;
use thiserror::Error;

/// Errors in the values exchanged with the mixer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Invalid audio spec: {0}")]
    InvalidSpec(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Replace the current thread's error message.
pub fn set_error(message: impl Into<String>) {
    let message = message.into();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Current thread's error message, or an empty string if none was set.
pub fn get_error() -> String {
    LAST_ERROR.with(|slot| slot.borrow().clone())
}

/// Reset the current thread's error message.
pub fn clear_error() {
    LAST_ERROR.with(|slot| slot.borrow_mut().clear());
}
