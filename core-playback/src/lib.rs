//! # MP3 Playback Backend
//!
//! Plays MP3 streams through a host audio mixer.
//!
//! ## Overview
//!
//! This crate handles:
//! - Opening a host byte source as an MP3 stream (symphonia, feature-gated)
//! - Negotiating the decoder's output encoding with the mixer
//! - Converting decoded PCM to the mixer's rate, layout and sample format
//! - Serving fixed-size chunks to the mixer callback at a given volume
//!
//! The entry point is [`Mp3Music`], which implements
//! [`bridge_traits::MusicBackend`].

pub mod config;
pub mod convert;
#[cfg(feature = "core-decoder")]
pub mod decoder;
pub mod error;
pub mod mix;
pub mod music;
pub mod sample;
pub mod source;
pub mod traits;

pub use config::Mp3Config;
pub use convert::AudioCvt;
#[cfg(feature = "core-decoder")]
pub use decoder::{FormatDetector, SampleConverter, SymphoniaDecoder};
pub use error::{PlaybackError, Result};
pub use mix::mix_audio_format;
#[cfg(feature = "core-decoder")]
pub use music::SymphoniaMusic;
pub use music::Mp3Music;
pub use source::SharedSource;
pub use traits::{AudioCodec, Encoding, PcmDecoder, ReadStatus, StreamFormat};
