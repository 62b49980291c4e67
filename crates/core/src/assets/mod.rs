use std::{
    collections::HashMap,
    f32::consts::TAU,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{config::AssetConfig, AudioFormat, DemoError, Result, Sample};

/// The role a sample plays in the demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundEffect {
    Intro,
    Shoot,
    Explosion,
}

impl SoundEffect {
    pub const ALL: [SoundEffect; 3] = [Self::Intro, Self::Shoot, Self::Explosion];
}

/// Owns every decoded sample for the life of the process.
///
/// All samples are converted to the store's [`AudioFormat`] when they are
/// registered, so playback never has to look at format metadata.
#[derive(Debug)]
pub struct SampleStore {
    format: AudioFormat,
    samples: HashMap<SoundEffect, Sample>,
}

impl SampleStore {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            samples: HashMap::new(),
        }
    }

    /// Decodes the intro, shoot and explosion clips named in `assets`.
    pub fn load(assets: &AssetConfig, format: AudioFormat) -> Result<Self> {
        let mut store = Self::new(format);
        for (effect, file) in [
            (SoundEffect::Intro, &assets.intro),
            (SoundEffect::Shoot, &assets.shoot),
            (SoundEffect::Explosion, &assets.explosion),
        ] {
            store.load_wav(effect, &assets.directory.join(file))?;
        }
        info!(directory = ?assets.directory, "loaded sound effects");
        Ok(store)
    }

    /// Fills the store with generated clips so the demo can run without
    /// asset files.
    pub fn synthesize(format: AudioFormat) -> Self {
        let mut store = Self::new(format);
        let rate = format.sample_rate as f32;

        let intro = tone(format, 0.6, |t| {
            let freq = 220.0 + 440.0 * t / 0.6;
            (TAU * freq * t).sin() * 0.5
        });
        let shoot = tone(format, 0.12, |t| {
            let period = (rate / 880.0).max(1.0);
            let phase = (t * rate) % period;
            if phase < period / 2.0 {
                0.4
            } else {
                -0.4
            }
        });
        let mut seed = 0x2545_f491_u32;
        let explosion = tone(format, 0.5, move |t| {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let noise = seed as f32 / u32::MAX as f32 * 2.0 - 1.0;
            noise * 0.6 * (1.0 - t / 0.5)
        });

        store.insert(SoundEffect::Intro, intro);
        store.insert(SoundEffect::Shoot, shoot);
        store.insert(SoundEffect::Explosion, explosion);
        store
    }

    /// Registers an already converted sample.
    pub fn insert(&mut self, effect: SoundEffect, sample: Sample) {
        debug!(?effect, bytes = sample.len(), "registered sample");
        self.samples.insert(effect, sample);
    }

    pub fn load_wav(&mut self, effect: SoundEffect, path: &Path) -> Result<()> {
        let sample = File::open(path)
            .map_err(hound::Error::IoError)
            .and_then(|file| decode_wav(BufReader::new(file), self.format))
            .map_err(|source| DemoError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        self.insert(effect, sample);
        Ok(())
    }

    /// Returns a handle to the sample registered for `effect`.
    pub fn get(&self, effect: SoundEffect) -> Result<Sample> {
        self.samples
            .get(&effect)
            .cloned()
            .ok_or(DemoError::MissingAsset(effect))
    }
}

/// Decodes a WAV stream into 16-bit little-endian PCM in `format`.
///
/// Any integer depth up to 32 bits and 32-bit float are accepted. Channels
/// are averaged down to mono or duplicated up from mono; other channel
/// changes are rejected. The rate is converted by linear interpolation.
pub fn decode_wav<R: Read>(reader: R, format: AudioFormat) -> hound::Result<Sample> {
    let mut reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();

    let samples: Vec<i16> = match spec.sample_format {
        hound::SampleFormat::Int => match spec.bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|s| i16::from(s) << 8))
                .collect::<hound::Result<_>>()?,
            16 => reader.samples::<i16>().collect::<hound::Result<_>>()?,
            17..=32 => {
                let shift = spec.bits_per_sample - 16;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|s| (s >> shift) as i16))
                    .collect::<hound::Result<_>>()?
            }
            _ => return Err(hound::Error::Unsupported),
        },
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|s| (s.clamp(-1.0, 1.0) * 32_767.0) as i16))
            .collect::<hound::Result<_>>()?,
    };

    let samples = remix(&samples, spec.channels, format.channels)?;
    let samples = resample(
        &samples,
        format.channels as usize,
        spec.sample_rate,
        format.sample_rate,
    );
    Ok(Sample::from_pcm16(&samples))
}

fn remix(samples: &[i16], from: u16, to: u16) -> hound::Result<Vec<i16>> {
    if from == to {
        return Ok(samples.to_vec());
    }
    if to == 1 {
        let from = from as usize;
        return Ok(samples
            .chunks_exact(from)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                (sum / from as i32) as i16
            })
            .collect());
    }
    if from == 1 {
        return Ok(samples
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(to as usize))
            .collect());
    }
    Err(hound::Error::Unsupported)
}

/// Linear interpolation between neighbouring frames.
fn resample(samples: &[i16], channels: usize, src_rate: u32, dst_rate: u32) -> Vec<i16> {
    if src_rate == dst_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let frames = samples.len() / channels;
    let ratio = src_rate as f64 / dst_rate as f64;
    let output_frames = (frames as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_frames * channels);

    for i in 0..output_frames {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;
        for ch in 0..channels {
            let a = samples[src_idx.min(frames - 1) * channels + ch] as f64;
            let b = samples[(src_idx + 1).min(frames - 1) * channels + ch] as f64;
            output.push((a + (b - a) * frac) as i16);
        }
    }

    output
}

fn tone(format: AudioFormat, seconds: f32, mut wave: impl FnMut(f32) -> f32) -> Sample {
    let frames = (seconds * format.sample_rate as f32) as usize;
    let channels = format.channels as usize;
    let mut pcm = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f32 / format.sample_rate as f32;
        let value = (wave(t).clamp(-1.0, 1.0) * 32_767.0) as i16;
        pcm.extend(std::iter::repeat(value).take(channels));
    }
    Sample::from_pcm16(&pcm)
}
