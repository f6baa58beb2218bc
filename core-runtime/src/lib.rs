//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the music backends:
//! - Logging and tracing infrastructure
//! - Configuration loading
//!
//! ## Overview
//!
//! This crate contains the ambient utilities the backends depend on. It
//! establishes the logging conventions (`tracing` events mirrored to a host
//! `LoggerSink`) and the JSON configuration format shared by every backend.

pub mod config;
pub mod error;
pub mod logging;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
