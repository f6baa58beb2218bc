//! # Playback Error Types
//!
//! Error types for the MP3 backend and the host error string they map to.

use thiserror::Error;

/// Errors that can occur while opening or playing a stream.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// Failed to open or read the byte source.
    #[error("Failed to open audio source: {0}")]
    SourceError(String),

    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// Stream is not recognized as MP3 or cannot be parsed.
    #[error("Unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// Codec is not supported or not compiled in.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    /// Sample format has no mapping between the mixer and the decoder.
    #[error("Format {0} is not supported")]
    UnsupportedFormat(String),

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// The decoder refused an operation.
    #[error("{0}")]
    DecoderError(String),

    /// Error occurred while decoding a packet.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Too many consecutive corrupt packets.
    #[error("Corrupted audio stream: {0}")]
    CorruptedStream(String),

    // ========================================================================
    // Conversion Errors
    // ========================================================================
    /// A conversion or scratch buffer could not be allocated.
    #[error("Out of memory")]
    OutOfMemory,

    /// Building or running the format conversion failed.
    #[error("Conversion error: {0}")]
    ConversionError(String),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// Seek was rejected by the decoder.
    #[error("Seek failed: {0}")]
    SeekFailed(String),

    /// Backend configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PlaybackError {
    /// Returns `true` if this error is related to audio format/codec issues.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::InvalidFormat(_)
                | PlaybackError::UnsupportedCodec(_)
                | PlaybackError::UnsupportedFormat(_)
        )
    }

    /// Returns `true` if the handle cannot produce any more audio.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PlaybackError::SeekFailed(_) | PlaybackError::InvalidConfig(_)
        )
    }
}

/// Publish `err` as the host error string, prefixed with the failing call.
///
/// Allocation failures are published without a prefix, matching the host's
/// own wording.
pub(crate) fn report(context: &str, err: &PlaybackError) {
    match err {
        PlaybackError::OutOfMemory => bridge_traits::set_error(err.to_string()),
        _ => bridge_traits::set_error(format!("{}: {}", context, err)),
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
