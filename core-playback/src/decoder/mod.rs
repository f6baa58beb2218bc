//! # MP3 Decoder Module
//!
//! MPEG audio decoding through the Symphonia library.
//!
//! ## Architecture
//!
//! The decoder uses Symphonia's three-layer architecture:
//!
//! 1. **MediaSource**: the host's byte source, wrapped in [`SharedSource`](crate::SharedSource)
//! 2. **FormatReader**: the MPEG audio demuxer, reads packets
//! 3. **Decoder**: decodes packets to PCM samples
//!
//! ```text
//! RwOps → MediaSourceStream → FormatReader → Decoder → SampleConverter → PCM block
//! ```
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_playback::{Encoding, Mp3Config, PcmDecoder, ReadStatus, SharedSource, SymphoniaDecoder};
//!
//! # fn example() -> core_playback::Result<()> {
//! let file = std::fs::File::open("/path/to/song.mp3")?;
//! let source = SharedSource::new(Box::new(file));
//!
//! let mut decoder = SymphoniaDecoder::new(source, &Mp3Config::default())?;
//! decoder.set_output_format(44100, 2, Encoding::S16)?;
//!
//! let mut block = vec![0u8; 8192];
//! loop {
//!     match decoder.read(&mut block)? {
//!         ReadStatus::NewFormat => println!("Format: {:?}", decoder.format()?),
//!         ReadStatus::Ok(n) => println!("Decoded {} bytes", n),
//!         ReadStatus::Done(_) => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The MPEG layer I and II codecs are not enabled; only layer III streams
//! are accepted.

mod format_detector;
mod sample_converter;
mod symphonia;

pub use self::symphonia::SymphoniaDecoder;
pub use format_detector::FormatDetector;
pub use sample_converter::SampleConverter;
