//! # Symphonia Decoder Implementation
//!
//! [`PcmDecoder`] backed by the Symphonia MP3 bundle.

use crate::config::Mp3Config;
use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::error::{PlaybackError, Result};
use crate::source::SharedSource;
use crate::traits::{validate_seek_position, Encoding, PcmDecoder, ReadStatus, StreamFormat};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::units::Time;
use tracing::{debug, error, info, instrument, trace, warn};

/// MP3 decoder serving fixed-size PCM blocks.
///
/// Decoded packets are converted to the negotiated encoding and queued in a
/// pending buffer; each [`PcmDecoder::read`] drains that buffer into the
/// caller's block and decodes more packets as needed.
///
/// ## State Management
///
/// - `announced`: format last reported through `NewFormat`
/// - `pending_format`: format of the bytes in the pending buffer
/// - `eof`: the format reader ran out of packets
///
/// A block never mixes two formats. When the pending bytes differ from the
/// announced format, `read` returns what it has so far and reports
/// `NewFormat` on the following call.
pub struct SymphoniaDecoder {
    /// Format reader (demuxer), owns the media source stream
    format_reader: Box<dyn FormatReader>,

    /// Codec decoder
    decoder: Box<dyn Decoder>,

    /// Selected track ID
    track_id: u32,

    /// Negotiated output encoding
    encoding: Encoding,

    /// Channel count requested by the caller, if the decoder can honour it
    requested_channels: Option<u16>,

    announced: Option<StreamFormat>,
    pending_format: Option<StreamFormat>,
    pending: Vec<u8>,
    pending_pos: usize,

    /// Scratch buffers reused across packets
    samples: Vec<f32>,
    remixed: Vec<f32>,

    max_consecutive_errors: usize,

    /// Current decode position in frames
    position_frames: u64,

    /// Frames still to drop after a seek landed before its target
    skip_frames: u64,

    /// End-of-stream flag
    eof: bool,
}

impl SymphoniaDecoder {
    /// Open an MP3 stream.
    ///
    /// Probes the source, selects the first decodable track and builds the
    /// codec. Output defaults to signed 16-bit at the stream's own layout
    /// until [`PcmDecoder::set_output_format`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - MP3 support is not compiled in
    /// - the stream is not recognised as MPEG audio
    /// - no supported audio track is found
    /// - the codec cannot be instantiated
    #[instrument(skip(source, config), fields(len = ?source.byte_len()))]
    pub fn new(source: SharedSource, config: &Mp3Config) -> Result<Self> {
        FormatDetector::ensure_mp3_support()?;

        let mss = MediaSourceStream::new(Box::new(source), Default::default());

        let probe_result = symphonia::default::get_probe()
            .format(
                &FormatDetector::mp3_hint(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Format probe failed: {}", e);
                PlaybackError::InvalidFormat(format!("Failed to probe format: {}", e))
            })?;

        let format_reader = probe_result.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| {
                error!("No supported audio tracks found");
                PlaybackError::InvalidFormat("No supported audio tracks".to_string())
            })?;

        let track_id = track.id;
        let codec = FormatDetector::detect_codec(track.codec_params.codec);
        FormatDetector::validate_codec_support(&codec)?;

        debug!(
            track_id,
            rate = ?track.codec_params.sample_rate,
            channels = ?track.codec_params.channels.map(|c| c.count()),
            "Selected MP3 track"
        );

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                error!("Failed to create decoder: {}", e);
                PlaybackError::DecoderError(format!("Failed to create codec decoder: {}", e))
            })?;

        info!("Decoder initialized successfully");

        Ok(Self {
            format_reader,
            decoder,
            track_id,
            encoding: Encoding::S16,
            requested_channels: None,
            announced: None,
            pending_format: None,
            pending: Vec::with_capacity(config.raw_block_bytes),
            pending_pos: 0,
            samples: Vec::new(),
            remixed: Vec::new(),
            max_consecutive_errors: config.max_consecutive_errors,
            position_frames: 0,
            skip_frames: 0,
            eof: false,
        })
    }

    fn output_channels(&self, decoded_channels: u16) -> u16 {
        match self.requested_channels {
            Some(requested) if (1..=2).contains(&requested) && (1..=2).contains(&decoded_channels) => {
                requested
            }
            _ => decoded_channels,
        }
    }

    /// Decode the next packet into the pending buffer.
    ///
    /// Skips corrupted packets up to the configured limit.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` - pending buffer holds freshly decoded bytes
    /// - `Ok(false)` - end of stream reached
    /// - `Err(PlaybackError)` - unrecoverable error
    #[instrument(skip(self), level = "trace")]
    fn decode_next_packet(&mut self) -> Result<bool> {
        let max_errors = self.max_consecutive_errors;
        let mut consecutive_errors = 0;

        loop {
            let packet = match self.format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    debug!("Reached end of stream at {} frames", self.position_frames);
                    return Ok(false);
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Decoder reset required for track list change");
                    return Err(PlaybackError::DecoderError(
                        "Track list changed, reset required".to_string(),
                    ));
                }
                Err(SymphoniaError::IoError(e)) => {
                    consecutive_errors += 1;
                    warn!(
                        "I/O error reading packet (attempt {}/{}): {}",
                        consecutive_errors, max_errors, e
                    );

                    if consecutive_errors >= max_errors {
                        error!("Too many consecutive I/O errors, giving up");
                        return Err(PlaybackError::SourceError(format!(
                            "Stream I/O failure after {} attempts: {}",
                            max_errors, e
                        )));
                    }
                    continue;
                }
                Err(e) => {
                    error!("Fatal format reader error: {}", e);
                    return Err(PlaybackError::DecodingError(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let frames = decoded.frames();
                    SampleConverter::to_interleaved_f32(&decoded, &mut self.samples);

                    if frames == 0 {
                        continue;
                    }
                    self.position_frames += frames as u64;

                    let decoded_channels = spec.channels.count() as u16;
                    if self.skip_frames > 0 {
                        let skip = self.skip_frames.min(frames as u64);
                        self.skip_frames -= skip;
                        self.samples.drain(..skip as usize * decoded_channels as usize);
                        if self.samples.is_empty() {
                            continue;
                        }
                    }

                    let channels = self.output_channels(decoded_channels);
                    let format = StreamFormat::new(spec.rate, channels, self.encoding);

                    self.pending.clear();
                    self.pending_pos = 0;
                    SampleConverter::append_encoded(
                        &self.samples,
                        decoded_channels,
                        channels,
                        self.encoding,
                        &mut self.remixed,
                        &mut self.pending,
                    );

                    if self.pending_format != Some(format) {
                        debug!(?format, "Decoded format changed");
                    }
                    self.pending_format = Some(format);

                    trace!(
                        "Decoded packet: {} frames at position {}",
                        frames,
                        self.position_frames
                    );
                    return Ok(true);
                }
                Err(SymphoniaError::IoError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping corrupted packet (I/O error, attempt {}/{}): {}",
                        consecutive_errors, max_errors, err
                    );

                    if consecutive_errors >= max_errors {
                        error!("Too many consecutive decode errors, stream may be corrupted");
                        return Err(PlaybackError::CorruptedStream(format!(
                            "Stream corruption after {} failed packets",
                            max_errors
                        )));
                    }
                    continue;
                }
                Err(SymphoniaError::DecodeError(err)) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping packet with decode error (attempt {}/{}): {}",
                        consecutive_errors, max_errors, err
                    );

                    if consecutive_errors >= max_errors {
                        error!("Too many consecutive decode errors");
                        return Err(PlaybackError::DecodingError(format!(
                            "Decoder failure after {} failed packets: {}",
                            max_errors, err
                        )));
                    }
                    continue;
                }
                Err(e) => {
                    error!("Fatal decode error: {}", e);
                    return Err(PlaybackError::DecoderError(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }
    }

    fn drop_pending(&mut self) {
        self.pending.clear();
        self.pending_pos = 0;
    }
}

impl PcmDecoder for SymphoniaDecoder {
    fn set_output_format(&mut self, rate: u32, channels: u16, encoding: Encoding) -> Result<()> {
        if channels == 0 {
            return Err(PlaybackError::DecoderError(
                "channel count must be > 0".to_string(),
            ));
        }

        debug!(
            rate,
            channels,
            encoding = %encoding,
            "Restricting decoder output format"
        );
        self.encoding = encoding;
        self.requested_channels = Some(channels);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<ReadStatus> {
        let mut written = 0;

        loop {
            if self.pending_pos < self.pending.len() {
                if self.announced != self.pending_format {
                    if written > 0 {
                        return Ok(ReadStatus::Ok(written));
                    }
                    self.announced = self.pending_format;
                    return Ok(ReadStatus::NewFormat);
                }

                let n = (buf.len() - written).min(self.pending.len() - self.pending_pos);
                buf[written..written + n]
                    .copy_from_slice(&self.pending[self.pending_pos..self.pending_pos + n]);
                written += n;
                self.pending_pos += n;

                if written == buf.len() {
                    return Ok(ReadStatus::Ok(written));
                }
                continue;
            }

            if self.eof {
                return Ok(ReadStatus::Done(written));
            }

            if !self.decode_next_packet()? {
                self.eof = true;
                self.drop_pending();
            }
        }
    }

    fn format(&self) -> Result<StreamFormat> {
        self.announced.ok_or_else(|| {
            PlaybackError::DecoderError("No output format negotiated yet".to_string())
        })
    }

    fn seek_seconds(&mut self, position_secs: f64) -> Result<()> {
        validate_seek_position(position_secs)?;
        debug!("Seeking to {:.3}s", position_secs);

        let seeked = self
            .format_reader
            .seek(
                SeekMode::Accurate,
                SeekTo::Time {
                    time: Time::from(position_secs),
                    track_id: Some(self.track_id),
                },
            )
            .map_err(|e| {
                error!("Seek failed: {}", e);
                PlaybackError::SeekFailed(e.to_string())
            })?;

        self.decoder.reset();
        self.drop_pending();
        self.position_frames = seeked.actual_ts;
        // Accurate seeks may land on an earlier packet
        self.skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);
        self.eof = false;

        debug!(
            "Seek completed to ts {} (skipping {} frames)",
            seeked.actual_ts, self.skip_frames
        );
        Ok(())
    }
}
