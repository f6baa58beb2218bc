//! # Host Bridge Traits
//!
//! Conventions of the host audio mixer that music backends plug into.
//!
//! ## Overview
//!
//! This crate defines the contract between a music backend and the mixer that
//! drives it. The mixer owns the audio device and calls the backend from its
//! audio callback thread; the backend only has to honour the mixer's buffer
//! format and lifecycle callbacks.
//!
//! ## Contents
//!
//! ### Mixer conventions
//! - [`SampleFormat`](mixer::SampleFormat) / [`AudioSpec`](mixer::AudioSpec) - negotiated output format
//! - [`MusicBackend`](mixer::MusicBackend) - lifecycle callbacks (start, stop, feed, seek, volume)
//! - [`MIX_MAX_VOLUME`](mixer::MIX_MAX_VOLUME) - full-scale volume
//!
//! ### Sources
//! - [`RwOps`](source::RwOps) - seekable byte source handed to a backend
//!
//! ### Errors & Logging
//! - [`set_error`](error::set_error) / [`get_error`](error::get_error) - host "last error" string
//! - [`LoggerSink`](time::LoggerSink) - forward structured logs to host logging
//!
//! ## Threading
//!
//! Every callback is synchronous. The mixer serialises calls on one backend,
//! so implementations do not lock internally. Backends must still be `Send`
//! because the mixer may open a stream on one thread and play it on the audio
//! thread.

pub mod error;
pub mod mixer;
pub mod source;
pub mod time;

pub use error::{clear_error, get_error, set_error, BridgeError};

// Re-export commonly used types
pub use mixer::{AudioSpec, MusicBackend, SampleFormat, MIX_MAX_VOLUME};
pub use source::RwOps;
pub use time::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
