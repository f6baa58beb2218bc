//! # Backend Configuration
//!
//! Tuning knobs for the MP3 backend.

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};

/// MP3 backend configuration.
///
/// Controls the raw decode block size, the resampler chunk size and how
/// tolerant the decoder is of corrupt packets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mp3Config {
    /// Size of the fixed raw-decode buffer in bytes.
    ///
    /// Each mixer fetch decodes exactly one block of this size (less at end
    /// of stream). Must be a multiple of 4 so every supported frame layout
    /// up to stereo S16 divides it.
    ///
    /// Default: 8192 bytes.
    #[serde(default = "default_raw_block_bytes")]
    pub raw_block_bytes: usize,

    /// Input frames handed to the resampler per processing call.
    ///
    /// Only used when the stream rate differs from the mixer rate.
    ///
    /// Default: 1024 frames.
    #[serde(default = "default_resampler_chunk_frames")]
    pub resampler_chunk_frames: usize,

    /// Corrupt packets skipped in a row before decoding gives up.
    ///
    /// Default: 10.
    #[serde(default = "default_max_consecutive_errors")]
    pub max_consecutive_errors: usize,

    /// Rewind to the start after the initial format discovery.
    ///
    /// Default: true.
    #[serde(default = "default_rewind_after_probe")]
    pub rewind_after_probe: bool,
}

impl Default for Mp3Config {
    fn default() -> Self {
        Self {
            raw_block_bytes: default_raw_block_bytes(),
            resampler_chunk_frames: default_resampler_chunk_frames(),
            max_consecutive_errors: default_max_consecutive_errors(),
            rewind_after_probe: default_rewind_after_probe(),
        }
    }
}

impl Mp3Config {
    /// Parse the backend section of a runtime configuration.
    ///
    /// `null` yields the defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }

        let config: Self = serde_json::from_value(value)
            .map_err(|e| PlaybackError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.raw_block_bytes == 0 {
            return Err(PlaybackError::InvalidConfig(
                "raw_block_bytes must be > 0".to_string(),
            ));
        }

        if self.raw_block_bytes % 4 != 0 {
            return Err(PlaybackError::InvalidConfig(
                "raw_block_bytes must be a multiple of 4".to_string(),
            ));
        }

        if self.resampler_chunk_frames == 0 {
            return Err(PlaybackError::InvalidConfig(
                "resampler_chunk_frames must be > 0".to_string(),
            ));
        }

        if self.max_consecutive_errors == 0 {
            return Err(PlaybackError::InvalidConfig(
                "max_consecutive_errors must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_raw_block_bytes() -> usize {
    8192
}

fn default_resampler_chunk_frames() -> usize {
    1024
}

fn default_max_consecutive_errors() -> usize {
    10
}

fn default_rewind_after_probe() -> bool {
    true
}
