//! Host Mixer Conventions
//!
//! Output format descriptors and the lifecycle contract every music backend
//! implements.

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Full-scale volume. Volumes are integers in `0..=MIX_MAX_VOLUME`.
pub const MIX_MAX_VOLUME: i32 = 128;

/// PCM sample formats understood by the mixer.
///
/// All multi-byte formats are in native byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Unsigned 8-bit, silence at 0x80
    U8,
    /// Signed 8-bit
    S8,
    /// Unsigned 16-bit, silence at 0x8000
    U16,
    /// Signed 16-bit
    S16,
    /// Signed 32-bit
    S32,
    /// 32-bit float in `[-1.0, 1.0]`
    F32,
}

impl SampleFormat {
    /// Size of one sample in bytes.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::U8 | SampleFormat::S8 => 1,
            SampleFormat::U16 | SampleFormat::S16 => 2,
            SampleFormat::S32 | SampleFormat::F32 => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::U8 => "U8",
            SampleFormat::S8 => "S8",
            SampleFormat::U16 => "U16SYS",
            SampleFormat::S16 => "S16SYS",
            SampleFormat::S32 => "S32SYS",
            SampleFormat::F32 => "F32SYS",
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Audio format negotiated with the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSpec {
    /// Sample rate in Hz
    pub freq: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Sample format
    pub format: SampleFormat,
}

impl AudioSpec {
    pub fn new(freq: u32, channels: u16, format: SampleFormat) -> Self {
        Self {
            freq,
            channels,
            format,
        }
    }

    /// The mixer's usual default: 44.1 kHz signed 16-bit stereo.
    pub fn cd_quality() -> Self {
        Self::new(44100, 2, SampleFormat::S16)
    }

    /// Bytes per interleaved frame.
    pub fn frame_size(&self) -> usize {
        self.channels as usize * self.format.bytes_per_sample()
    }

    /// Bytes needed for one second of audio.
    pub fn bytes_per_second(&self) -> usize {
        self.frame_size() * self.freq as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.freq == 0 {
            return Err(BridgeError::InvalidSpec("freq must be > 0".to_string()));
        }

        if self.channels == 0 {
            return Err(BridgeError::InvalidSpec(
                "channels must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Display for AudioSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz {}ch {}", self.freq, self.channels, self.format)
    }
}

/// Lifecycle callbacks a music backend exposes to the mixer.
///
/// The mixer opens a backend through the backend's own constructor, then
/// drives it through this trait from its audio callback. Closing is `Drop`.
///
/// ## Threading
///
/// All methods are synchronous and are never called concurrently on the same
/// backend. They must not block on I/O beyond reading the backend's source.
pub trait MusicBackend: Send {
    /// Begin (or resume) producing audio.
    fn start(&mut self);

    /// Stop producing audio. `get_samples` fills nothing until `start`.
    fn stop(&mut self);

    /// Whether the backend will still produce audio.
    ///
    /// Becomes `false` on `stop`, at end of stream, and after any error.
    fn is_playing(&self) -> bool;

    /// Fill `stream` with audio in the mixer's format.
    ///
    /// Returns the number of bytes at the end of `stream` that were left
    /// untouched because playback stopped. Zero means the buffer was filled.
    fn get_samples(&mut self, stream: &mut [u8]) -> usize;

    /// Jump to an absolute position in seconds.
    ///
    /// Failures are reported through [`set_error`](crate::error::set_error).
    /// A failed seek leaves playback running unless the stream can no longer
    /// be decoded.
    fn seek(&mut self, position_secs: f64);

    /// Set the playback volume in `0..=MIX_MAX_VOLUME`.
    fn set_volume(&mut self, volume: i32);

    /// Current playback volume.
    fn volume(&self) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_format_sizes() {
        assert_eq!(SampleFormat::U8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::S8.bytes_per_sample(), 1);
        assert_eq!(SampleFormat::U16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::S16.bytes_per_sample(), 2);
        assert_eq!(SampleFormat::S32.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::F32.bytes_per_sample(), 4);
    }

    #[test]
    fn audio_spec_sizes() {
        let spec = AudioSpec::cd_quality();
        assert_eq!(spec.frame_size(), 4);
        assert_eq!(spec.bytes_per_second(), 176400);
        assert!(spec.validate().is_ok());

        let mono_float = AudioSpec::new(48000, 1, SampleFormat::F32);
        assert_eq!(mono_float.frame_size(), 4);
    }

    #[test]
    fn audio_spec_validation() {
        assert_eq!(
            AudioSpec::new(0, 2, SampleFormat::S16).validate(),
            Err(BridgeError::InvalidSpec("freq must be > 0".to_string()))
        );
        let err = AudioSpec::new(44100, 0, SampleFormat::S16)
            .validate()
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid audio spec: channels must be > 0");
    }

    #[test]
    fn audio_spec_display() {
        assert_eq!(AudioSpec::cd_quality().to_string(), "44100Hz 2ch S16SYS");
    }
}
