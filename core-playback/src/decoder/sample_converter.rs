//! # Sample Format Converter
//!
//! Turns decoded Symphonia buffers into interleaved PCM bytes of a
//! negotiated [`Encoding`].

use crate::sample::{encode_samples, remix_channels};
use crate::traits::Encoding;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;

/// Sample converter that normalizes audio to f32 and re-encodes it.
///
/// Symphonia outputs audio in various formats (i16, i24, i32, f32, f64)
/// as planar buffers. Everything is first normalised to interleaved f32
/// in `[-1.0, 1.0]`, then remixed and encoded for the caller.
pub struct SampleConverter;

impl SampleConverter {
    /// Convert a Symphonia buffer to interleaved f32 samples, replacing the
    /// contents of `out`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let decoded = decoder.decode(&packet)?;
    /// SampleConverter::to_interleaved_f32(&decoded, &mut samples);
    /// ```
    pub fn to_interleaved_f32(buffer: &AudioBufferRef<'_>, out: &mut Vec<f32>) {
        out.clear();
        match buffer {
            AudioBufferRef::F32(buf) => Self::interleave(&**buf, |sample: f32| sample, out),
            AudioBufferRef::F64(buf) => {
                Self::interleave(&**buf, |sample: f64| sample.into_sample(), out)
            }
            AudioBufferRef::S32(buf) => {
                Self::interleave(&**buf, |sample: i32| sample.into_sample(), out)
            }
            AudioBufferRef::S16(buf) => {
                Self::interleave(&**buf, |sample: i16| sample.into_sample(), out)
            }
            AudioBufferRef::S24(buf) => {
                Self::interleave(&**buf, |sample| IntoSample::into_sample(sample), out)
            }
            AudioBufferRef::S8(buf) => {
                Self::interleave(&**buf, |sample: i8| sample.into_sample(), out)
            }
            AudioBufferRef::U32(buf) => {
                Self::interleave(&**buf, |sample: u32| sample.into_sample(), out)
            }
            AudioBufferRef::U16(buf) => {
                Self::interleave(&**buf, |sample: u16| sample.into_sample(), out)
            }
            AudioBufferRef::U24(buf) => {
                Self::interleave(&**buf, |sample| IntoSample::into_sample(sample), out)
            }
            AudioBufferRef::U8(buf) => {
                Self::interleave(&**buf, |sample: u8| sample.into_sample(), out)
            }
        }
    }

    /// Append interleaved f32 `samples` to `out` as `to_channels` channels of
    /// `encoding`.
    ///
    /// `scratch` holds the remixed samples between calls.
    pub fn append_encoded(
        samples: &[f32],
        from_channels: u16,
        to_channels: u16,
        encoding: Encoding,
        scratch: &mut Vec<f32>,
        out: &mut Vec<u8>,
    ) {
        let format = encoding.to_sample_format();
        if from_channels == to_channels {
            encode_samples(samples, format, out);
            return;
        }

        scratch.clear();
        remix_channels(samples, from_channels, to_channels, scratch);
        encode_samples(scratch, format, out);
    }

    /// Convert and interleave a planar buffer of any sample type.
    fn interleave<T>(buf: &AudioBuffer<T>, convert: fn(T) -> f32, out: &mut Vec<f32>)
    where
        T: Sample + Copy,
    {
        let num_channels = buf.spec().channels.count();
        let num_frames = buf.frames();
        out.reserve(num_frames * num_channels);

        for frame_idx in 0..num_frames {
            for chan_idx in 0..num_channels {
                out.push(convert(buf.chan(chan_idx)[frame_idx]));
            }
        }
    }
}
