//! # Render an MP3 file to WAV
//!
//! Drives the MP3 backend the way a host mixer would and writes everything
//! it produces to a 16-bit stereo WAV file.
//!
//! Run with:
//! `cargo run --example render_mp3 --package core-playback -- song.mp3 out.wav [config.json]`

use anyhow::{bail, Context};
use bridge_traits::{AudioSpec, MusicBackend, SampleFormat};
use core_playback::{Mp3Config, Mp3Music, SharedSource};
use core_runtime::logging::init_logging;
use core_runtime::RuntimeConfig;
use hound::{WavSpec, WavWriter};
use std::fs::File;
use tracing::info;

/// Bytes requested from the backend per mixer callback.
const CALLBACK_BYTES: usize = 4096;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        bail!("usage: {} <input.mp3> <output.wav> [config.json]", args[0]);
    }

    let runtime = match args.get(3) {
        Some(path) => RuntimeConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path))?,
        None => RuntimeConfig::default(),
    };
    init_logging(runtime.logging())?;

    let config = Mp3Config::from_value(runtime.playback.clone())?;
    let mixer = AudioSpec::new(44100, 2, SampleFormat::S16);

    let file = File::open(&args[1]).with_context(|| format!("opening {}", args[1]))?;
    let mut music = Mp3Music::open(SharedSource::new(Box::new(file)), mixer, true, config)
        .with_context(bridge_traits::get_error)?;

    info!(
        decoder_format = ?music.decoder_format(),
        conversion = music.conversion_needed(),
        "Rendering"
    );

    let spec = WavSpec {
        channels: mixer.channels,
        sample_rate: mixer.freq,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(&args[2], spec)?;

    music.start();
    let mut stream = vec![0u8; CALLBACK_BYTES];
    let mut rendered = 0usize;
    while music.is_playing() {
        let unfilled = music.get_samples(&mut stream);
        let filled = &stream[..CALLBACK_BYTES - unfilled];
        for sample in filled.chunks_exact(2) {
            writer.write_sample(i16::from_ne_bytes([sample[0], sample[1]]))?;
        }
        rendered += filled.len();
    }

    writer.finalize()?;
    music.close()?;

    let error = bridge_traits::get_error();
    if !error.is_empty() {
        bail!("playback stopped early: {}", error);
    }

    info!(
        frames = rendered / mixer.frame_size(),
        seconds = rendered as f64 / mixer.bytes_per_second() as f64,
        "Wrote {}",
        args[2]
    );
    Ok(())
}
