//! Workspace facade crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-runtime`, `core-playback`). Host mixers can depend
//! on `mpg-music-workspace` and enable the documented features without needing
//! to wire each crate individually.

pub use bridge_traits as bridge;

#[cfg(feature = "runtime")]
pub use core_runtime as runtime;

#[cfg(feature = "mp3")]
pub use core_playback as playback;
