//! # PCM Sample Codec
//!
//! Moves native-endian PCM bytes of any mixer [`SampleFormat`] to and from
//! normalised `f32` samples in `[-1.0, 1.0]`, and remaps channel layouts.

use bridge_traits::SampleFormat;

const S8_SCALE: f32 = 128.0;
const S16_SCALE: f32 = 32_768.0;
const S32_SCALE: f64 = 2_147_483_648.0;

/// Append the samples held in `bytes` to `out` as normalised `f32`.
///
/// Trailing bytes that do not form a whole sample are ignored.
pub fn decode_samples(bytes: &[u8], format: SampleFormat, out: &mut Vec<f32>) {
    let width = format.bytes_per_sample();
    out.reserve(bytes.len() / width);

    match format {
        SampleFormat::U8 => {
            out.extend(bytes.iter().map(|&b| (b as f32 - 128.0) / S8_SCALE));
        }
        SampleFormat::S8 => {
            out.extend(bytes.iter().map(|&b| b as i8 as f32 / S8_SCALE));
        }
        SampleFormat::U16 => out.extend(bytes.chunks_exact(2).map(|c| {
            (u16::from_ne_bytes([c[0], c[1]]) as f32 - 32_768.0) / S16_SCALE
        })),
        SampleFormat::S16 => out.extend(
            bytes
                .chunks_exact(2)
                .map(|c| i16::from_ne_bytes([c[0], c[1]]) as f32 / S16_SCALE),
        ),
        SampleFormat::S32 => out.extend(bytes.chunks_exact(4).map(|c| {
            (i32::from_ne_bytes([c[0], c[1], c[2], c[3]]) as f64 / S32_SCALE) as f32
        })),
        SampleFormat::F32 => out.extend(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]])),
        ),
    }
}

/// Append `samples` to `out` encoded as `format`, clipping out-of-range values.
pub fn encode_samples(samples: &[f32], format: SampleFormat, out: &mut Vec<u8>) {
    out.reserve(samples.len() * format.bytes_per_sample());

    match format {
        SampleFormat::U8 => {
            out.extend(samples.iter().map(|&s| (quantize_8(s) + 128) as u8));
        }
        SampleFormat::S8 => {
            out.extend(samples.iter().map(|&s| quantize_8(s) as i8 as u8));
        }
        SampleFormat::U16 => {
            for &s in samples {
                let v = (quantize_16(s) + 32_768) as u16;
                out.extend_from_slice(&v.to_ne_bytes());
            }
        }
        SampleFormat::S16 => {
            for &s in samples {
                out.extend_from_slice(&(quantize_16(s) as i16).to_ne_bytes());
            }
        }
        SampleFormat::S32 => {
            for &s in samples {
                let v = (s as f64 * S32_SCALE)
                    .round()
                    .clamp(i32::MIN as f64, i32::MAX as f64) as i32;
                out.extend_from_slice(&v.to_ne_bytes());
            }
        }
        SampleFormat::F32 => {
            for &s in samples {
                out.extend_from_slice(&s.clamp(-1.0, 1.0).to_ne_bytes());
            }
        }
    }
}

fn quantize_8(sample: f32) -> i32 {
    (sample * S8_SCALE).round().clamp(-128.0, 127.0) as i32
}

fn quantize_16(sample: f32) -> i32 {
    (sample * S16_SCALE).round().clamp(-32_768.0, 32_767.0) as i32
}

/// Append interleaved `samples` with `from` channels to `out` as `to` channels.
///
/// - mono to N: the mono signal goes to every channel
/// - N to mono: channels are averaged
/// - stereo to 4 or more: the front pair is duplicated onto the rear pair,
///   remaining channels are silent
/// - anything else: extra channels are dropped or filled with silence
pub fn remix_channels(samples: &[f32], from: u16, to: u16, out: &mut Vec<f32>) {
    let from = from as usize;
    let to = to as usize;
    if from == 0 || to == 0 {
        return;
    }
    if from == to {
        out.extend_from_slice(samples);
        return;
    }

    let frames = samples.len() / from;
    out.reserve(frames * to);

    for frame in samples.chunks_exact(from) {
        if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else if from == 1 {
            out.extend(std::iter::repeat(frame[0]).take(to));
        } else if from == 2 && to >= 4 {
            out.extend_from_slice(frame);
            out.extend_from_slice(frame);
            out.extend(std::iter::repeat(0.0).take(to - 4));
        } else {
            for ch in 0..to {
                out.push(frame.get(ch).copied().unwrap_or(0.0));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s16_bytes(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_ne_bytes()).collect()
    }

    #[test]
    fn test_s16_exact_round_trip() {
        let bytes = s16_bytes(&[0, 1, -1, 12_345, i16::MIN, i16::MAX]);
        let mut samples = Vec::new();
        decode_samples(&bytes, SampleFormat::S16, &mut samples);

        let mut encoded = Vec::new();
        encode_samples(&samples, SampleFormat::S16, &mut encoded);
        assert_eq!(encoded, bytes);
    }

    #[test]
    fn test_unsigned_formats_are_biased() {
        let mut samples = Vec::new();
        decode_samples(&[0x80, 0x00, 0xFF], SampleFormat::U8, &mut samples);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[1], -1.0);
        assert!(samples[2] > 0.99);

        let mut bytes = Vec::new();
        encode_samples(&[0.0], SampleFormat::U16, &mut bytes);
        assert_eq!(bytes, 0x8000u16.to_ne_bytes());
    }

    #[test]
    fn test_encode_clips() {
        let mut bytes = Vec::new();
        encode_samples(&[2.0, -2.0], SampleFormat::S16, &mut bytes);
        assert_eq!(bytes, s16_bytes(&[i16::MAX, i16::MIN]));

        let mut bytes = Vec::new();
        encode_samples(&[1.5], SampleFormat::S8, &mut bytes);
        assert_eq!(bytes, vec![127u8]);

        let mut bytes = Vec::new();
        encode_samples(&[3.0], SampleFormat::F32, &mut bytes);
        assert_eq!(bytes, 1.0f32.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_s32_scale() {
        let bytes: Vec<u8> = i32::MIN.to_ne_bytes().to_vec();
        let mut samples = Vec::new();
        decode_samples(&bytes, SampleFormat::S32, &mut samples);
        assert_eq!(samples, vec![-1.0]);

        let mut out = Vec::new();
        encode_samples(&[0.5], SampleFormat::S32, &mut out);
        assert_eq!(out, (1i32 << 30).to_ne_bytes().to_vec());
    }

    #[test]
    fn test_partial_sample_ignored() {
        let mut samples = Vec::new();
        decode_samples(&[0, 0, 0], SampleFormat::S16, &mut samples);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_remix_mono_to_stereo() {
        let mut out = Vec::new();
        remix_channels(&[0.25, -0.5], 1, 2, &mut out);
        assert_eq!(out, vec![0.25, 0.25, -0.5, -0.5]);
    }

    #[test]
    fn test_remix_stereo_to_mono() {
        let mut out = Vec::new();
        remix_channels(&[0.5, 0.0, -1.0, 1.0], 2, 1, &mut out);
        assert_eq!(out, vec![0.25, 0.0]);
    }

    #[test]
    fn test_remix_stereo_to_surround() {
        let mut out = Vec::new();
        remix_channels(&[0.1, 0.2], 2, 6, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.1, 0.2, 0.0, 0.0]);
    }

    #[test]
    fn test_remix_truncates_and_fills() {
        let mut out = Vec::new();
        remix_channels(&[0.1, 0.2, 0.3], 3, 2, &mut out);
        assert_eq!(out, vec![0.1, 0.2]);

        let mut out = Vec::new();
        remix_channels(&[0.1, 0.2, 0.3], 3, 4, &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3, 0.0]);
    }
}
