//! # Audio Conversion
//!
//! [`AudioCvt`] turns the decoder's PCM into the mixer's format: sample
//! encoding, channel layout and sample rate.
//!
//! ```text
//! src bytes → f32 → remix channels → resample (rubato) → dst bytes
//! ```
//!
//! Conversion is streaming. Bytes that do not complete a frame and input
//! that does not fill a resampler chunk are carried over to the next call.
//! [`AudioCvt::flush`] drains what is left at end of stream.

use crate::error::{PlaybackError, Result};
use crate::sample::{decode_samples, encode_samples, remix_channels};
use bridge_traits::AudioSpec;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

/// Conversion descriptor between two PCM formats.
pub struct AudioCvt {
    src: AudioSpec,
    dst: AudioSpec,
    needed: bool,
    len_mult: usize,
    resampler: Option<StreamResampler>,
    carry: Vec<u8>,
    decoded: Vec<f32>,
    remixed: Vec<f32>,
    resampled: Vec<f32>,
}

impl AudioCvt {
    /// Build a converter from `src` to `dst`.
    ///
    /// `chunk_frames` is the resampler's input chunk size and is only used
    /// when the rates differ.
    pub fn build(src: AudioSpec, dst: AudioSpec, chunk_frames: usize) -> Result<Self> {
        src.validate()
            .and_then(|_| dst.validate())
            .map_err(|e| PlaybackError::ConversionError(e.to_string()))?;

        let needed = src != dst;
        let resampler = if src.freq != dst.freq {
            Some(StreamResampler::new(
                src.freq,
                dst.freq,
                dst.channels,
                chunk_frames,
            )?)
        } else {
            None
        };

        let len_mult = len_mult(&src, &dst);
        debug!(src = %src, dst = %dst, needed, len_mult, "Built audio conversion");

        Ok(Self {
            src,
            dst,
            needed,
            len_mult,
            resampler,
            carry: Vec::new(),
            decoded: Vec::new(),
            remixed: Vec::new(),
            resampled: Vec::new(),
        })
    }

    /// `false` when source and destination are identical.
    pub fn needed(&self) -> bool {
        self.needed
    }

    /// Worst-case factor of output bytes over input bytes.
    pub fn len_mult(&self) -> usize {
        self.len_mult
    }

    /// Convert `input`, replacing the contents of `out`.
    ///
    /// Returns the converted length.
    pub fn convert(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<usize> {
        out.clear();

        if !self.needed {
            out.try_reserve(input.len())
                .map_err(|_| PlaybackError::OutOfMemory)?;
            out.extend_from_slice(input);
            return Ok(out.len());
        }

        let frame = self.src.frame_size();
        self.carry.extend_from_slice(input);
        let whole = self.carry.len() - self.carry.len() % frame;

        self.decoded.clear();
        decode_samples(&self.carry[..whole], self.src.format, &mut self.decoded);
        self.carry.drain(..whole);

        self.remixed.clear();
        remix_channels(
            &self.decoded,
            self.src.channels,
            self.dst.channels,
            &mut self.remixed,
        );

        let samples = match self.resampler.as_mut() {
            Some(resampler) => {
                self.resampled.clear();
                resampler.process(&self.remixed, &mut self.resampled)?;
                &self.resampled
            }
            None => &self.remixed,
        };

        encode_into(samples, &self.dst, out)?;
        Ok(out.len())
    }

    /// Append whatever the resampler still holds to `out`.
    ///
    /// Returns the number of bytes appended.
    pub fn flush(&mut self, out: &mut Vec<u8>) -> Result<usize> {
        self.carry.clear();

        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(0);
        };

        self.resampled.clear();
        resampler.flush(&mut self.resampled)?;

        let before = out.len();
        encode_into(&self.resampled, &self.dst, out)?;
        Ok(out.len() - before)
    }

    /// Drop carried bytes and resampler history.
    pub fn reset(&mut self) {
        self.carry.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }
}

fn encode_into(samples: &[f32], dst: &AudioSpec, out: &mut Vec<u8>) -> Result<()> {
    out.try_reserve(samples.len() * dst.format.bytes_per_sample())
        .map_err(|_| PlaybackError::OutOfMemory)?;
    encode_samples(samples, dst.format, out);
    Ok(())
}

fn len_mult(src: &AudioSpec, dst: &AudioSpec) -> usize {
    let num = dst.frame_size() as u64 * dst.freq as u64;
    let den = src.frame_size() as u64 * src.freq as u64;
    let mult = num.div_ceil(den).max(1) as usize;

    // Room for the resampler's carried chunk
    if src.freq != dst.freq {
        mult + 1
    } else {
        mult
    }
}

// ============================================================================
// Streaming Resampler
// ============================================================================

/// Zero chunks fed at flush to push the last input through the filter.
const FLUSH_CHUNKS: usize = 3;

/// Fixed-chunk rubato resampler fed with arbitrary-length interleaved input.
///
/// The first `output_delay` frames rubato produces are filter warm-up and are
/// dropped. Between two resets the frames emitted by `process` plus `flush`
/// add up to `ceil(frames_in * ratio)`; before the flush, `process` lags
/// that count by the filter delay plus the queued remainder.
struct StreamResampler {
    inner: FastFixedIn<f32>,
    channels: usize,
    ratio: f64,
    pending: Vec<Vec<f32>>,
    delay_left: usize,
    frames_in: u64,
    frames_out: u64,
}

impl StreamResampler {
    fn new(input_rate: u32, output_rate: u32, channels: u16, chunk_frames: usize) -> Result<Self> {
        let ratio = output_rate as f64 / input_rate as f64;
        let inner = FastFixedIn::<f32>::new(
            ratio,
            1.0,
            PolynomialDegree::Septic,
            chunk_frames,
            channels as usize,
        )
        .map_err(|e| PlaybackError::ConversionError(format!("Failed to create resampler: {}", e)))?;

        debug!(
            "Resampling {}Hz -> {}Hz ({} channels, {} frame chunks, {} frames delay)",
            input_rate,
            output_rate,
            channels,
            chunk_frames,
            inner.output_delay()
        );

        Ok(Self {
            delay_left: inner.output_delay(),
            inner,
            channels: channels as usize,
            ratio,
            pending: vec![Vec::with_capacity(chunk_frames); channels as usize],
            frames_in: 0,
            frames_out: 0,
        })
    }

    /// Queue `interleaved` and resample every complete chunk into `out`.
    fn process(&mut self, interleaved: &[f32], out: &mut Vec<f32>) -> Result<()> {
        for frame in interleaved.chunks_exact(self.channels) {
            for (plane, &sample) in self.pending.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }
        self.frames_in += (interleaved.len() / self.channels) as u64;

        loop {
            let need = self.inner.input_frames_next();
            if self.pending[0].len() < need {
                return Ok(());
            }

            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|plane| plane.drain(..need).collect())
                .collect();

            let planar = self
                .inner
                .process(&chunk, None)
                .map_err(|e| PlaybackError::ConversionError(format!("Resampling failed: {}", e)))?;
            self.emit(&planar, u64::MAX, out);
        }
    }

    /// Resample the queued remainder and the filter tail into `out`.
    fn flush(&mut self, out: &mut Vec<f32>) -> Result<()> {
        if self.frames_in == 0 {
            return Ok(());
        }

        let target = (self.frames_in as f64 * self.ratio).ceil() as u64;
        let pending = std::mem::take(&mut self.pending);
        let mut remainder = (!pending[0].is_empty()).then_some(pending.as_slice());

        for _ in 0..FLUSH_CHUNKS {
            if self.frames_out >= target {
                break;
            }
            let planar = self
                .inner
                .process_partial(remainder.take(), None)
                .map_err(|e| PlaybackError::ConversionError(format!("Resampling failed: {}", e)))?;
            self.emit(&planar, target, out);
        }

        if self.frames_out < target {
            debug!(
                "Resampler flush ended {} frames short",
                target - self.frames_out
            );
        }

        self.pending = pending;
        self.reset();
        Ok(())
    }

    /// Interleave `planar` into `out`, skipping warm-up frames and stopping
    /// once `limit` frames have been emitted in total.
    fn emit(&mut self, planar: &[Vec<f32>], limit: u64, out: &mut Vec<f32>) {
        let frames = planar[0].len();
        let skip = self.delay_left.min(frames);
        self.delay_left -= skip;

        let room = limit.saturating_sub(self.frames_out);
        let count = ((frames - skip) as u64).min(room) as usize;
        interleave_into(planar, skip, count, out);
        self.frames_out += count as u64;
    }

    fn reset(&mut self) {
        self.inner.reset();
        for plane in &mut self.pending {
            plane.clear();
        }
        self.delay_left = self.inner.output_delay();
        self.frames_in = 0;
        self.frames_out = 0;
    }
}

/// Append `frames` frames of `planar`, starting at frame `start`, to `out`
/// interleaved.
fn interleave_into(planar: &[Vec<f32>], start: usize, frames: usize, out: &mut Vec<f32>) {
    out.reserve(frames * planar.len());
    for frame_idx in start..start + frames {
        for plane in planar {
            out.push(plane[frame_idx]);
        }
    }
}
