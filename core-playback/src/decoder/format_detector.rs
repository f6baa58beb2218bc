//! # Format Detection Module
//!
//! Probe hints and codec checks for MPEG audio streams.

use crate::error::{PlaybackError, Result};
use crate::traits::AudioCodec;
use symphonia::core::codecs::CodecType;
use symphonia::core::probe::Hint;
use tracing::warn;

/// Format detector for MPEG audio streams.
///
/// Builds hints for Symphonia's probe and maps its codec identifiers onto
/// [`AudioCodec`].
pub struct FormatDetector;

impl FormatDetector {
    /// Extension and MIME type of an MP3 stream.
    pub const MP3_EXTENSION: &'static str = "mp3";
    pub const MP3_MIME_TYPE: &'static str = "audio/mpeg";

    /// Hint used for byte sources that carry no name.
    ///
    /// The mixer only hands this backend streams it already believes are
    /// MP3, so the probe is steered straight to the MPEG reader.
    pub fn mp3_hint() -> Hint {
        let mut hint = Hint::new();
        hint.with_extension(Self::MP3_EXTENSION);
        hint.mime_type(Self::MP3_MIME_TYPE);
        hint
    }

    /// Map a Symphonia codec type onto [`AudioCodec`].
    pub fn detect_codec(codec_type: CodecType) -> AudioCodec {
        use symphonia::core::codecs::{CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3};

        if codec_type == CODEC_TYPE_MP3 {
            AudioCodec::Mp3
        } else if codec_type == CODEC_TYPE_MP2 {
            AudioCodec::Mp2
        } else if codec_type == CODEC_TYPE_MP1 {
            AudioCodec::Mp1
        } else {
            warn!("Unknown codec type: {:?}", codec_type);
            AudioCodec::Unknown
        }
    }

    /// Check that MP3 decoding was compiled in.
    ///
    /// Called before any stream is opened.
    pub fn ensure_mp3_support() -> Result<()> {
        Self::validate_codec_support(&AudioCodec::Mp3)
    }

    /// Validate if a codec is supported by current feature flags.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Codec is supported
    /// - `Err(PlaybackError::UnsupportedCodec)` - Codec not enabled
    pub fn validate_codec_support(codec: &AudioCodec) -> Result<()> {
        match codec {
            AudioCodec::Mp3 => {
                #[cfg(not(feature = "decoder-mp3"))]
                return Err(PlaybackError::UnsupportedCodec(
                    "MP3 support not available. Enable 'decoder-mp3' feature".to_string(),
                ));
                #[cfg(feature = "decoder-mp3")]
                Ok(())
            }
            AudioCodec::Mp2 | AudioCodec::Mp1 => Err(PlaybackError::UnsupportedCodec(format!(
                "{:?} streams are not supported",
                codec
            ))),
            AudioCodec::Unknown => Err(PlaybackError::UnsupportedCodec(
                "Unknown audio codec".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use symphonia::core::codecs::{CODEC_TYPE_FLAC, CODEC_TYPE_MP2, CODEC_TYPE_MP3};

    #[test]
    fn test_detect_codec() {
        assert_eq!(FormatDetector::detect_codec(CODEC_TYPE_MP3), AudioCodec::Mp3);
        assert_eq!(FormatDetector::detect_codec(CODEC_TYPE_MP2), AudioCodec::Mp2);
        assert_eq!(
            FormatDetector::detect_codec(CODEC_TYPE_FLAC),
            AudioCodec::Unknown
        );
    }

    #[test]
    fn test_codec_validation() {
        #[cfg(feature = "decoder-mp3")]
        assert!(FormatDetector::ensure_mp3_support().is_ok());

        assert!(FormatDetector::validate_codec_support(&AudioCodec::Mp2).is_err());
        assert!(FormatDetector::validate_codec_support(&AudioCodec::Unknown).is_err());
    }
}
