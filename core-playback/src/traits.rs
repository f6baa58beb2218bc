//! # Decoder Traits
//!
//! The seam between the music handle and the decoding library.
//!
//! ## Decoder state machine
//!
//! A [`PcmDecoder`] hands out fixed-size blocks of raw PCM on request. Its
//! `read` reports one of three outcomes:
//!
//! - [`ReadStatus::NewFormat`]: the output format changed. No bytes were
//!   written; query [`PcmDecoder::format`] before reading again. This is also
//!   what the very first `read` of a stream returns.
//! - [`ReadStatus::Ok`]: the block was filled with audio in the announced
//!   format.
//! - [`ReadStatus::Done`]: end of stream. May carry a final partial block.
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use core_playback::{PcmDecoder, ReadStatus};
//!
//! fn drain(decoder: &mut impl PcmDecoder) -> core_playback::Result<usize> {
//!     let mut block = vec![0u8; 8192];
//!     let mut total = 0;
//!     loop {
//!         match decoder.read(&mut block)? {
//!             ReadStatus::NewFormat => println!("format: {:?}", decoder.format()?),
//!             ReadStatus::Ok(n) => total += n,
//!             ReadStatus::Done(n) => return Ok(total + n),
//!         }
//!     }
//! }
//! ```

use crate::error::{PlaybackError, Result};
use bridge_traits::SampleFormat;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Codec & Encoding Types
// ============================================================================

/// MPEG audio layers the decoder can identify.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// MPEG-1/2 Audio Layer III
    Mp3,
    /// MPEG-1/2 Audio Layer II
    Mp2,
    /// MPEG-1/2 Audio Layer I
    Mp1,
    /// Anything else
    Unknown,
}

/// Output encodings the decoder can produce.
///
/// These are the integer formats the decoder negotiates with the mixer.
/// Float output is not offered, so a float mixer cannot be fed directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    U8,
    U16,
    S8,
    S16,
    S32,
}

impl Encoding {
    /// Decoder encoding matching a mixer sample format, if any.
    pub fn from_sample_format(format: SampleFormat) -> Option<Self> {
        match format {
            SampleFormat::U8 => Some(Encoding::U8),
            SampleFormat::U16 => Some(Encoding::U16),
            SampleFormat::S8 => Some(Encoding::S8),
            SampleFormat::S16 => Some(Encoding::S16),
            SampleFormat::S32 => Some(Encoding::S32),
            SampleFormat::F32 => None,
        }
    }

    /// Mixer sample format with the same memory layout.
    pub fn to_sample_format(self) -> SampleFormat {
        match self {
            Encoding::U8 => SampleFormat::U8,
            Encoding::U16 => SampleFormat::U16,
            Encoding::S8 => SampleFormat::S8,
            Encoding::S16 => SampleFormat::S16,
            Encoding::S32 => SampleFormat::S32,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::U8 => "ENC_UNSIGNED_8",
            Encoding::U16 => "ENC_UNSIGNED_16",
            Encoding::S8 => "ENC_SIGNED_8",
            Encoding::S16 => "ENC_SIGNED_16",
            Encoding::S32 => "ENC_SIGNED_32",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Format of the PCM the decoder is currently producing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFormat {
    /// Sample rate in Hz
    pub rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Sample encoding
    pub encoding: Encoding,
}

impl StreamFormat {
    pub fn new(rate: u32, channels: u16, encoding: Encoding) -> Self {
        Self {
            rate,
            channels,
            encoding,
        }
    }

    /// Bytes per interleaved frame.
    pub fn frame_size(&self) -> usize {
        self.channels as usize * self.encoding.to_sample_format().bytes_per_sample()
    }
}

/// Outcome of one [`PcmDecoder::read`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// `n` bytes of audio were written.
    Ok(usize),
    /// Output format changed; nothing was written.
    NewFormat,
    /// End of stream; `n` trailing bytes were written.
    Done(usize),
}

impl ReadStatus {
    /// Bytes written by the call.
    pub fn len(&self) -> usize {
        match self {
            ReadStatus::Ok(n) | ReadStatus::Done(n) => *n,
            ReadStatus::NewFormat => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Core Traits
// ============================================================================

/// Trait for decoders that turn a compressed stream into blocks of raw PCM.
///
/// Calls are synchronous and come from the mixer's audio thread.
///
/// ## Implementation Notes
///
/// - `read` should fill the whole block unless the stream ends.
/// - `Ok(0)` is allowed but the caller treats repeated empty reads as a
///   stalled stream.
/// - Seeking keeps the announced format; no `NewFormat` is needed afterwards
///   unless the format really changes.
#[cfg_attr(test, mockall::automock)]
pub trait PcmDecoder: Send {
    /// Restrict output to one format.
    ///
    /// The decoder must honour `encoding`. It honours `rate` and `channels`
    /// where it can do so without resampling; the format it actually produces
    /// is reported through [`PcmDecoder::format`].
    fn set_output_format(&mut self, rate: u32, channels: u16, encoding: Encoding) -> Result<()>;

    /// Decode into `buf`. See the module docs for the state machine.
    fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus>;

    /// Format of the bytes returned since the last `NewFormat`.
    fn format(&self) -> Result<StreamFormat>;

    /// Jump to an absolute position in seconds.
    fn seek_seconds(&mut self, position_secs: f64) -> Result<()>;

    /// Jump back to the start of the stream.
    fn rewind(&mut self) -> Result<()> {
        self.seek_seconds(0.0)
    }
}

/// Reject positions the decoder can never reach.
pub(crate) fn validate_seek_position(position_secs: f64) -> Result<()> {
    if position_secs.is_finite() && position_secs >= 0.0 {
        Ok(())
    } else {
        Err(PlaybackError::SeekFailed(format!(
            "invalid position {}",
            position_secs
        )))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_maps_integer_formats() {
        for format in [
            SampleFormat::U8,
            SampleFormat::S8,
            SampleFormat::U16,
            SampleFormat::S16,
            SampleFormat::S32,
        ] {
            let encoding = Encoding::from_sample_format(format).unwrap();
            assert_eq!(encoding.to_sample_format(), format);
        }
    }

    #[test]
    fn encoding_rejects_float() {
        assert_eq!(Encoding::from_sample_format(SampleFormat::F32), None);
    }

    #[test]
    fn stream_format_frame_size() {
        let format = StreamFormat::new(44100, 2, Encoding::S16);
        assert_eq!(format.frame_size(), 4);

        let mono32 = StreamFormat::new(48000, 1, Encoding::S32);
        assert_eq!(mono32.frame_size(), 4);
    }

    #[test]
    fn read_status_length() {
        assert_eq!(ReadStatus::Ok(512).len(), 512);
        assert_eq!(ReadStatus::Done(10).len(), 10);
        assert!(ReadStatus::NewFormat.is_empty());
        assert!(ReadStatus::Done(0).is_empty());
    }

    #[test]
    fn seek_position_validation() {
        assert!(validate_seek_position(0.0).is_ok());
        assert!(validate_seek_position(12.5).is_ok());
        assert!(validate_seek_position(-1.0).is_err());
        assert!(validate_seek_position(f64::NAN).is_err());
    }

    #[test]
    fn encoding_names() {
        assert_eq!(Encoding::S16.to_string(), "ENC_SIGNED_16");
        assert_eq!(Encoding::U8.name(), "ENC_UNSIGNED_8");
    }
}
