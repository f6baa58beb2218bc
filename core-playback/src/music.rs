//! # MP3 Music Handle
//!
//! [`Mp3Music`] is the object the host mixer drives: it owns a decoder, a
//! fixed-size raw block, the conversion to the mixer's format and a cursor
//! into converted audio the mixer has not consumed yet.
//!
//! ## Data flow
//!
//! ```text
//! PcmDecoder::read → raw block → AudioCvt → scratch buffer → cursor → mixer stream
//! ```
//!
//! One raw block is decoded whenever the cursor runs dry. A `NewFormat` from
//! the decoder rebuilds the conversion and its scratch buffer before the next
//! block is read.
//!
//! ## Errors
//!
//! The lifecycle callbacks cannot return errors to the mixer. Failures stop
//! playback and are published through the host error string
//! ([`bridge_traits::get_error`]), prefixed with the decoder call that
//! failed.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use bridge_traits::{AudioSpec, MusicBackend};
//! use core_playback::{Mp3Config, Mp3Music, SharedSource};
//!
//! # fn example() -> core_playback::Result<()> {
//! let file = std::fs::File::open("/path/to/song.mp3")?;
//! let source = SharedSource::new(Box::new(file));
//! let mut music = Mp3Music::open(source, AudioSpec::cd_quality(), true, Mp3Config::default())?;
//!
//! music.start();
//! let mut stream = vec![0u8; 4096];
//! while music.is_playing() {
//!     let unfilled = music.get_samples(&mut stream);
//!     // hand stream[..stream.len() - unfilled] to the device
//! #   let _ = unfilled;
//! }
//! # Ok(())
//! # }
//! ```

use crate::config::Mp3Config;
use crate::convert::AudioCvt;
use crate::error::{report, PlaybackError, Result};
use crate::mix::mix_audio_format;
use crate::source::SharedSource;
use crate::traits::{Encoding, PcmDecoder, ReadStatus, StreamFormat};
use bridge_traits::{AudioSpec, MusicBackend, MIX_MAX_VOLUME};
use std::fmt;
use tracing::{debug, instrument, trace, warn};

#[cfg(feature = "core-decoder")]
use crate::decoder::{FormatDetector, SymphoniaDecoder};

/// Music handle backed by the Symphonia MP3 decoder.
#[cfg(feature = "core-decoder")]
pub type SymphoniaMusic = Mp3Music<SymphoniaDecoder>;

/// One MP3 stream being played by the host mixer.
pub struct Mp3Music<D: PcmDecoder> {
    decoder: D,
    source: Option<SharedSource>,
    free_src: bool,
    playing: bool,
    volume: i32,
    mixer: AudioSpec,
    config: Mp3Config,

    /// Fixed-size raw decode block
    raw: Vec<u8>,

    cvt: Option<AudioCvt>,
    /// Converted audio, sized `raw.len() * len_mult`
    cvt_buf: Vec<u8>,
    /// Resampler tail of a format that has since been replaced
    tail: Vec<u8>,

    available_pos: usize,
    available_len: usize,

    got_format: bool,
    /// Decoder reported end of stream; stop once the cursor runs dry
    draining: bool,
    decoder_format: Option<StreamFormat>,
    empty_fetches: usize,
    closed: bool,
}

#[cfg(feature = "core-decoder")]
impl Mp3Music<SymphoniaDecoder> {
    /// Open an MP3 stream for playback through `mixer`.
    ///
    /// When `free_src` is set the handle owns `source` and closes it on
    /// teardown, including when opening fails. Otherwise the caller's clones
    /// of `source` stay usable after the handle is gone.
    #[instrument(skip(source, mixer, config), fields(mixer = %mixer))]
    pub fn open(
        source: SharedSource,
        mixer: AudioSpec,
        free_src: bool,
        config: Mp3Config,
    ) -> Result<Self> {
        let result = Self::open_decoder(source.clone(), mixer, free_src, config);
        close_on_failure(result, &source, free_src)
    }

    fn open_decoder(
        source: SharedSource,
        mixer: AudioSpec,
        free_src: bool,
        config: Mp3Config,
    ) -> Result<Self> {
        FormatDetector::ensure_mp3_support().map_err(|err| {
            report("decoder init", &err);
            err
        })?;

        let encoding = Self::check_mixer(&mixer, &config)?;

        let decoder = SymphoniaDecoder::new(source.clone(), &config).map_err(|err| {
            report("decoder open", &err);
            err
        })?;

        Self::from_parts(decoder, Some(source), free_src, mixer, config, encoding)
    }
}

impl<D: PcmDecoder> Mp3Music<D> {
    /// Build a handle around an already opened decoder.
    pub fn with_decoder(decoder: D, mixer: AudioSpec, config: Mp3Config) -> Result<Self> {
        let encoding = Self::check_mixer(&mixer, &config)?;
        Self::from_parts(decoder, None, false, mixer, config, encoding)
    }

    /// Build a handle around a decoder reading from `source`.
    ///
    /// With `free_src` the source is closed when the handle is torn down.
    pub fn with_decoder_and_source(
        decoder: D,
        source: SharedSource,
        free_src: bool,
        mixer: AudioSpec,
        config: Mp3Config,
    ) -> Result<Self> {
        let result = Self::check_mixer(&mixer, &config).and_then(|encoding| {
            Self::from_parts(decoder, Some(source.clone()), free_src, mixer, config, encoding)
        });
        close_on_failure(result, &source, free_src)
    }

    /// Validate the mixer format and pick the decoder encoding for it.
    fn check_mixer(mixer: &AudioSpec, config: &Mp3Config) -> Result<Encoding> {
        let checked = config
            .validate()
            .and_then(|_| {
                mixer
                    .validate()
                    .map_err(|e| PlaybackError::InvalidConfig(e.to_string()))
            })
            .and_then(|_| {
                Encoding::from_sample_format(mixer.format)
                    .ok_or_else(|| PlaybackError::UnsupportedFormat(mixer.format.to_string()))
            });

        checked.map_err(|err| {
            report("mixer format", &err);
            err
        })
    }

    fn from_parts(
        decoder: D,
        source: Option<SharedSource>,
        free_src: bool,
        mixer: AudioSpec,
        config: Mp3Config,
        encoding: Encoding,
    ) -> Result<Self> {
        let mut music = Self {
            decoder,
            source,
            free_src,
            playing: false,
            volume: MIX_MAX_VOLUME,
            mixer,
            raw: vec![0; config.raw_block_bytes],
            config,
            cvt: None,
            cvt_buf: Vec::new(),
            tail: Vec::new(),
            available_pos: 0,
            available_len: 0,
            got_format: false,
            draining: false,
            decoder_format: None,
            empty_fetches: 0,
            closed: false,
        };

        music
            .decoder
            .set_output_format(mixer.freq, mixer.channels, encoding)
            .map_err(|err| {
                report("decoder format", &err);
                err
            })?;

        // Decode until the stream format is known, then start over
        while !music.got_format {
            music.get_some()?;
        }

        if music.config.rewind_after_probe {
            music.decoder.rewind().map_err(|err| {
                report("decoder seek", &err);
                err
            })?;
            if let Some(cvt) = music.cvt.as_mut() {
                cvt.reset();
            }
            music.tail.clear();
            music.draining = false;
        }

        music.clear_cursor();
        debug!(
            mixer = %music.mixer,
            decoder_format = ?music.decoder_format,
            "MP3 music opened"
        );
        Ok(music)
    }

    /// The mixer format this handle produces.
    pub fn mixer_spec(&self) -> AudioSpec {
        self.mixer
    }

    /// The format the decoder last announced.
    pub fn decoder_format(&self) -> Option<StreamFormat> {
        self.decoder_format
    }

    /// Converted bytes waiting to be handed to the mixer.
    pub fn available(&self) -> usize {
        self.available_len
    }

    /// `true` if decoded audio is converted before mixing.
    pub fn conversion_needed(&self) -> bool {
        self.cvt.as_ref().map(AudioCvt::needed).unwrap_or(false)
    }

    pub fn config(&self) -> &Mp3Config {
        &self.config
    }

    /// Tear the handle down now instead of on drop.
    ///
    /// Returns the error from closing an owned source, if any.
    pub fn close(mut self) -> Result<()> {
        self.teardown()
    }

    fn clear_cursor(&mut self) {
        self.available_pos = 0;
        self.available_len = 0;
    }

    /// Rebuild the conversion for the format the decoder just announced.
    fn update_format(&mut self) -> Result<()> {
        self.got_format = true;

        let format = self.decoder.format().map_err(|err| {
            report("decoder getformat", &err);
            err
        })?;

        let src = AudioSpec::new(format.rate, format.channels, format.encoding.to_sample_format());
        let cvt = AudioCvt::build(src, self.mixer, self.config.resampler_chunk_frames).map_err(
            |err| {
                report("decoder getformat", &err);
                err
            },
        )?;

        // Keep whatever the old resampler still holds
        if let Some(mut old) = self.cvt.take() {
            self.tail.clear();
            if let Err(err) = old.flush(&mut self.tail) {
                warn!("Dropping resampler tail: {}", err);
                self.tail.clear();
            }
        }

        let size = self.raw.len() * cvt.len_mult();
        self.cvt_buf = Vec::new();
        if self.cvt_buf.try_reserve_exact(size).is_err() {
            self.playing = false;
            let err = PlaybackError::OutOfMemory;
            report("decoder getformat", &err);
            return Err(err);
        }

        debug!(
            format = ?format,
            needed = cvt.needed(),
            scratch_bytes = size,
            "Decoder format changed"
        );
        self.decoder_format = Some(format);
        self.cvt = Some(cvt);
        Ok(())
    }

    /// Decode one raw block and convert it for the mixer.
    fn get_some(&mut self) -> Result<()> {
        let status = loop {
            match self.decoder.read(&mut self.raw) {
                Ok(ReadStatus::NewFormat) => self.update_format()?,
                Ok(status) => break status,
                Err(err) => {
                    report("decoder read", &err);
                    return Err(err);
                }
            }
        };

        let done = matches!(status, ReadStatus::Done(_));
        if done {
            debug!("Decoder reached end of stream");
            self.draining = true;
        }

        let Some(cvt) = self.cvt.as_mut() else {
            let err = if done {
                PlaybackError::InvalidFormat("stream ended before any audio was found".to_string())
            } else {
                PlaybackError::DecoderError("audio arrived before its format".to_string())
            };
            report("decoder read", &err);
            return Err(err);
        };

        let len = status.len().min(self.raw.len());
        let converted = cvt
            .convert(&self.raw[..len], &mut self.cvt_buf)
            .and_then(|n| {
                if done {
                    cvt.flush(&mut self.cvt_buf).map(|tail| n + tail)
                } else {
                    Ok(n)
                }
            });

        if let Err(err) = converted {
            self.playing = false;
            report("decoder read", &err);
            return Err(err);
        }

        if !self.tail.is_empty() {
            let tail = std::mem::take(&mut self.tail);
            self.cvt_buf.splice(0..0, tail);
        }

        self.available_pos = 0;
        self.available_len = self.cvt_buf.len();
        trace!(raw = len, converted = self.available_len, "Fetched block");
        Ok(())
    }

    fn teardown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.playing = false;
        self.clear_cursor();
        self.cvt = None;
        self.cvt_buf = Vec::new();
        self.tail = Vec::new();
        self.raw = Vec::new();

        let source = self.source.take();
        if self.free_src {
            if let Some(source) = source {
                source.close()?;
            }
        }

        debug!("MP3 music closed");
        Ok(())
    }
}

/// Close an owned source when building a handle around it failed.
fn close_on_failure<T>(result: Result<T>, source: &SharedSource, free_src: bool) -> Result<T> {
    if result.is_err() && free_src {
        if let Err(err) = source.close() {
            warn!("Failed to close source after open failure: {}", err);
        }
    }
    result
}

impl<D: PcmDecoder> MusicBackend for Mp3Music<D> {
    fn start(&mut self) {
        trace!("start");
        self.playing = true;
    }

    fn stop(&mut self) {
        trace!("stop");
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn get_samples(&mut self, stream: &mut [u8]) -> usize {
        let mut offset = 0;

        while offset < stream.len() && self.playing {
            if self.available_len == 0 {
                if self.draining {
                    self.playing = false;
                    break;
                }

                if self.get_some().is_err() {
                    self.playing = false;
                    return stream.len() - offset;
                }

                if self.available_len == 0 && !self.draining {
                    self.empty_fetches += 1;
                    if self.empty_fetches >= self.config.max_consecutive_errors {
                        warn!(
                            "Decoder returned {} empty blocks in a row, stopping",
                            self.empty_fetches
                        );
                        self.playing = false;
                    }
                    continue;
                }
                self.empty_fetches = 0;
            }

            let mixable = (stream.len() - offset).min(self.available_len);
            let src = &self.cvt_buf[self.available_pos..self.available_pos + mixable];
            let dst = &mut stream[offset..offset + mixable];

            if self.volume == MIX_MAX_VOLUME {
                dst.copy_from_slice(src);
            } else {
                mix_audio_format(dst, src, self.mixer.format, self.volume);
            }

            self.available_len -= mixable;
            self.available_pos += mixable;
            offset += mixable;

            if self.draining && self.available_len == 0 {
                self.playing = false;
            }
        }

        stream.len() - offset
    }

    fn seek(&mut self, position_secs: f64) {
        match self.decoder.seek_seconds(position_secs) {
            Ok(()) => {
                self.clear_cursor();
                self.tail.clear();
                self.draining = false;
                if let Some(cvt) = self.cvt.as_mut() {
                    cvt.reset();
                }
                debug!("Seeked to {:.3}s", position_secs);
            }
            Err(err) => {
                warn!("Seek to {:.3}s failed: {}", position_secs, err);
                report("decoder seek", &err);
                if err.is_fatal() {
                    self.playing = false;
                }
            }
        }
    }

    fn set_volume(&mut self, volume: i32) {
        self.volume = volume.clamp(0, MIX_MAX_VOLUME);
    }

    fn volume(&self) -> i32 {
        self.volume
    }
}

impl<D: PcmDecoder> Drop for Mp3Music<D> {
    fn drop(&mut self) {
        if let Err(err) = self.teardown() {
            warn!("Failed to close source: {}", err);
        }
    }
}

impl<D: PcmDecoder> fmt::Debug for Mp3Music<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mp3Music")
            .field("mixer", &self.mixer)
            .field("decoder_format", &self.decoder_format)
            .field("playing", &self.playing)
            .field("draining", &self.draining)
            .field("volume", &self.volume)
            .field("available", &self.available_len)
            .field("free_src", &self.free_src)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockPcmDecoder;
    use bridge_traits::SampleFormat;

    const BLOCK: usize = 16;

    fn config() -> Mp3Config {
        Mp3Config {
            raw_block_bytes: BLOCK,
            ..Default::default()
        }
    }

    fn cd_format() -> StreamFormat {
        StreamFormat::new(44100, 2, Encoding::S16)
    }

    /// Mock that announces CD format, serves one block for format discovery
    /// and expects the rewind. Later reads are answered by `after_open`.
    fn opened_mock(
        mut after_open: impl FnMut(&mut [u8]) -> Result<ReadStatus> + Send + 'static,
    ) -> MockPcmDecoder {
        let mut decoder = MockPcmDecoder::new();
        decoder
            .expect_set_output_format()
            .times(1)
            .returning(|_, _, _| Ok(()));
        decoder.expect_format().returning(|| Ok(cd_format()));
        decoder.expect_rewind().times(1).returning(|| Ok(()));

        let mut calls = 0;
        decoder.expect_read().returning(move |buf| {
            calls += 1;
            match calls {
                1 => Ok(ReadStatus::NewFormat),
                2 => {
                    buf.fill(0x11);
                    Ok(ReadStatus::Ok(buf.len()))
                }
                _ => after_open(buf),
            }
        });
        decoder
    }

    fn open(decoder: MockPcmDecoder) -> Mp3Music<MockPcmDecoder> {
        Mp3Music::with_decoder(decoder, AudioSpec::cd_quality(), config()).unwrap()
    }

    fn unreachable_read(_: &mut [u8]) -> Result<ReadStatus> {
        panic!("unexpected read");
    }

    #[test]
    fn test_open_discovers_format_and_rewinds() {
        let music = open(opened_mock(unreachable_read));

        assert_eq!(music.decoder_format(), Some(cd_format()));
        assert_eq!(music.available(), 0);
        assert_eq!(music.volume(), MIX_MAX_VOLUME);
        assert!(!music.is_playing());
        assert!(!music.conversion_needed());
    }

    #[test]
    fn test_float_mixer_rejected() {
        let decoder = MockPcmDecoder::new();
        let mixer = AudioSpec::new(44100, 2, SampleFormat::F32);

        let err = Mp3Music::with_decoder(decoder, mixer, config()).unwrap_err();
        assert!(matches!(err, PlaybackError::UnsupportedFormat(_)));
        assert!(bridge_traits::get_error().contains("F32SYS"));
    }

    #[test]
    fn test_end_of_stream_during_discovery() {
        let mut decoder = MockPcmDecoder::new();
        decoder.expect_set_output_format().returning(|_, _, _| Ok(()));
        decoder.expect_read().returning(|_| Ok(ReadStatus::Done(0)));

        let err = Mp3Music::with_decoder(decoder, AudioSpec::cd_quality(), config()).unwrap_err();
        assert!(err.is_format_error());
        assert!(bridge_traits::get_error().starts_with("decoder read:"));
    }

    #[test]
    fn test_getformat_failure_reported() {
        let mut decoder = MockPcmDecoder::new();
        decoder.expect_set_output_format().returning(|_, _, _| Ok(()));
        decoder.expect_read().returning(|_| Ok(ReadStatus::NewFormat));
        decoder
            .expect_format()
            .returning(|| Err(PlaybackError::DecoderError("no stream".into())));

        assert!(Mp3Music::with_decoder(decoder, AudioSpec::cd_quality(), config()).is_err());
        assert_eq!(bridge_traits::get_error(), "decoder getformat: no stream");
    }

    #[test]
    fn test_get_samples_copies_at_full_volume() {
        let mut music = open(opened_mock(|buf| {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = i as u8;
            }
            Ok(ReadStatus::Ok(buf.len()))
        }));
        music.start();

        let mut stream = vec![0xFFu8; BLOCK + BLOCK / 2];
        assert_eq!(music.get_samples(&mut stream), 0);

        let block: Vec<u8> = (0..BLOCK as u8).collect();
        assert_eq!(&stream[..BLOCK], &block[..]);
        assert_eq!(&stream[BLOCK..], &block[..BLOCK / 2]);
        assert_eq!(music.available(), BLOCK / 2);
    }

    #[test]
    fn test_get_samples_mixes_below_full_volume() {
        let mut music = open(opened_mock(|buf| {
            for pair in buf.chunks_exact_mut(2) {
                pair.copy_from_slice(&1000i16.to_ne_bytes());
            }
            Ok(ReadStatus::Ok(buf.len()))
        }));
        music.set_volume(64);
        music.start();

        let mut stream = vec![0u8; 4];
        assert_eq!(music.get_samples(&mut stream), 0);
        assert_eq!(i16::from_ne_bytes([stream[0], stream[1]]), 500);
    }

    #[test]
    fn test_done_stops_playback() {
        let mut music = open(opened_mock(|buf| {
            buf[..4].fill(0x22);
            Ok(ReadStatus::Done(4))
        }));
        music.start();

        let mut stream = vec![0u8; 10];
        assert_eq!(music.get_samples(&mut stream), 6);
        assert_eq!(&stream[..4], &[0x22; 4]);
        assert!(!music.is_playing());

        // Stopped handles leave the stream alone
        assert_eq!(music.get_samples(&mut stream), 10);
    }

    #[test]
    fn test_final_block_outlasts_one_chunk() {
        let mut music = open(opened_mock(|buf| {
            buf.fill(0x44);
            Ok(ReadStatus::Done(buf.len()))
        }));
        music.start();

        let mut stream = vec![0u8; BLOCK / 4];
        for _ in 0..3 {
            assert_eq!(music.get_samples(&mut stream), 0);
            assert!(music.is_playing());
        }
        assert_eq!(music.get_samples(&mut stream), 0);
        assert_eq!(stream, vec![0x44; BLOCK / 4]);
        assert!(!music.is_playing());
    }

    #[test]
    fn test_read_error_stops_and_reports() {
        let mut music = open(opened_mock(|_| {
            Err(PlaybackError::DecodingError("bad frame".into()))
        }));
        music.start();

        let mut stream = vec![0u8; 8];
        assert_eq!(music.get_samples(&mut stream), 8);
        assert!(!music.is_playing());
        assert_eq!(
            bridge_traits::get_error(),
            "decoder read: Decoding error: bad frame"
        );
    }

    #[test]
    fn test_repeated_empty_blocks_stop_playback() {
        let mut music = open(opened_mock(|_| Ok(ReadStatus::Ok(0))));
        music.start();

        let mut stream = vec![0u8; 8];
        assert_eq!(music.get_samples(&mut stream), 8);
        assert!(!music.is_playing());
    }

    #[test]
    fn test_seek_clears_cursor() {
        let mut decoder = opened_mock(|buf| {
            buf.fill(0x33);
            Ok(ReadStatus::Ok(buf.len()))
        });
        decoder
            .expect_seek_seconds()
            .withf(|secs| (*secs - 12.5).abs() < f64::EPSILON)
            .times(1)
            .returning(|_| Ok(()));

        let mut music = open(decoder);
        music.start();

        let mut stream = vec![0u8; 4];
        music.get_samples(&mut stream);
        assert_eq!(music.available(), BLOCK - 4);

        music.seek(12.5);
        assert_eq!(music.available(), 0);
    }

    #[test]
    fn test_seek_failure_reports() {
        let mut decoder = opened_mock(unreachable_read);
        decoder
            .expect_seek_seconds()
            .returning(|_| Err(PlaybackError::SeekFailed("out of range".into())));

        let mut music = open(decoder);
        music.seek(9999.0);
        assert_eq!(
            bridge_traits::get_error(),
            "decoder seek: Seek failed: out of range"
        );
    }

    #[test]
    fn test_fatal_seek_error_stops_playback() {
        let mut decoder = opened_mock(unreachable_read);
        decoder
            .expect_seek_seconds()
            .returning(|_| Err(PlaybackError::DecodingError("lost sync".into())));

        let mut music = open(decoder);
        music.start();
        music.seek(1.0);
        assert!(!music.is_playing());
        assert_eq!(
            bridge_traits::get_error(),
            "decoder seek: Decoding error: lost sync"
        );
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut music = open(opened_mock(unreachable_read));

        music.set_volume(500);
        assert_eq!(music.volume(), MIX_MAX_VOLUME);
        music.set_volume(-3);
        assert_eq!(music.volume(), 0);
        music.set_volume(77);
        assert_eq!(music.volume(), 77);
    }

    #[test]
    fn test_start_stop() {
        let mut music = open(opened_mock(unreachable_read));

        music.start();
        assert!(music.is_playing());
        music.stop();
        assert!(!music.is_playing());
    }
}
