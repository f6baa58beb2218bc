//! # Volume Mixing
//!
//! Additive mixing of one PCM buffer into another at a given volume, the
//! way the host mixer combines channels.

use bridge_traits::{SampleFormat, MIX_MAX_VOLUME};

/// Mix `src` into `dst` at `volume` (`0..=MIX_MAX_VOLUME`).
///
/// Each sample becomes `clip(dst + src * volume / MIX_MAX_VOLUME)` in the
/// range of `format`. Unsigned formats are re-centred on their bias before
/// adding. Only `min(dst.len(), src.len())` bytes are touched, rounded down
/// to whole samples. A volume of zero leaves `dst` untouched.
pub fn mix_audio_format(dst: &mut [u8], src: &[u8], format: SampleFormat, volume: i32) {
    let volume = volume.min(MIX_MAX_VOLUME);
    if volume <= 0 {
        return;
    }

    let len = dst.len().min(src.len());
    let (dst, src) = (&mut dst[..len], &src[..len]);

    match format {
        SampleFormat::U8 => {
            for (d, &s) in dst.iter_mut().zip(src) {
                let mixed = adjust(s as i32 - 128, volume) + (*d as i32 - 128);
                *d = (mixed.clamp(-128, 127) + 128) as u8;
            }
        }
        SampleFormat::S8 => {
            for (d, &s) in dst.iter_mut().zip(src) {
                let mixed = adjust(s as i8 as i32, volume) + *d as i8 as i32;
                *d = mixed.clamp(-128, 127) as i8 as u8;
            }
        }
        SampleFormat::U16 => {
            for (d, s) in dst.chunks_exact_mut(2).zip(src.chunks_exact(2)) {
                let a = u16::from_ne_bytes([s[0], s[1]]) as i32 - 32_768;
                let b = u16::from_ne_bytes([d[0], d[1]]) as i32 - 32_768;
                let mixed = (adjust(a, volume) + b).clamp(-32_768, 32_767) + 32_768;
                d.copy_from_slice(&(mixed as u16).to_ne_bytes());
            }
        }
        SampleFormat::S16 => {
            for (d, s) in dst.chunks_exact_mut(2).zip(src.chunks_exact(2)) {
                let a = i16::from_ne_bytes([s[0], s[1]]) as i32;
                let b = i16::from_ne_bytes([d[0], d[1]]) as i32;
                let mixed = (adjust(a, volume) + b).clamp(i16::MIN as i32, i16::MAX as i32);
                d.copy_from_slice(&(mixed as i16).to_ne_bytes());
            }
        }
        SampleFormat::S32 => {
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                let a = i32::from_ne_bytes([s[0], s[1], s[2], s[3]]) as i64;
                let b = i32::from_ne_bytes([d[0], d[1], d[2], d[3]]) as i64;
                let mixed = (a * volume as i64 / MIX_MAX_VOLUME as i64 + b)
                    .clamp(i32::MIN as i64, i32::MAX as i64);
                d.copy_from_slice(&(mixed as i32).to_ne_bytes());
            }
        }
        SampleFormat::F32 => {
            let gain = volume as f32 / MIX_MAX_VOLUME as f32;
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
                let a = f32::from_ne_bytes([s[0], s[1], s[2], s[3]]);
                let b = f32::from_ne_bytes([d[0], d[1], d[2], d[3]]);
                let mixed = (a * gain + b).clamp(-1.0, 1.0);
                d.copy_from_slice(&mixed.to_ne_bytes());
            }
        }
    }
}

fn adjust(sample: i32, volume: i32) -> i32 {
    sample * volume / MIX_MAX_VOLUME
}
