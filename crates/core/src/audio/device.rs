//! Audio output through cpal, pulling from a [`PlaybackController`].

use std::sync::Arc;

use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    BufferSize, Device, SampleFormat, SampleRate, StreamConfig, SupportedBufferSize,
    SupportedStreamConfigRange,
};
use tracing::{debug, error, info, warn};

use super::PlaybackController;
use crate::{AudioFormat, DemoError, Result};

/// An open output stream whose callback thread drives
/// [`PlaybackController::produce`].
///
/// The stream starts paused; call [`resume`](Self::resume) once the
/// controller has something to play. Close the device before the last
/// handle to the controller goes away.
pub struct AudioDevice {
    stream: cpal::Stream,
    name: String,
    sample_format: SampleFormat,
    buffer_size: BufferSize,
}

impl AudioDevice {
    /// Opens `device_name` (or the host default) for `format` and registers
    /// `controller` as the fill callback.
    pub fn open(
        format: &AudioFormat,
        controller: Arc<PlaybackController>,
        device_name: Option<&str>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = select_device(&host, device_name)?;
        let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        let supported = find_config(&device, format)?;
        let sample_format = supported.sample_format();
        let buffer_size = match supported.buffer_size() {
            SupportedBufferSize::Range { min, max }
                if (*min..=*max).contains(&format.chunk_frames) =>
            {
                BufferSize::Fixed(format.chunk_frames)
            }
            _ => BufferSize::Default,
        };

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: SampleRate(format.sample_rate),
            buffer_size: buffer_size.clone(),
        };

        let stream = match sample_format {
            SampleFormat::I16 => device.build_output_stream(
                &config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    controller.produce_pcm16(data);
                },
                |err| error!(%err, "audio stream error"),
                None,
            ),
            SampleFormat::F32 => {
                let mut scratch =
                    vec![0_i16; (format.chunk_frames as usize * format.channels as usize).max(1)];
                device.build_output_stream(
                    &config,
                    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        fill_f32(&controller, &mut scratch, data);
                    },
                    |err| error!(%err, "audio stream error"),
                    None,
                )
            }
            other => {
                return Err(DemoError::Audio(format!(
                    "unsupported sample format {other:?}"
                )))
            }
        }
        .map_err(DemoError::audio)?;

        // Nothing should reach the speakers until the first sample is queued.
        stream.pause().map_err(DemoError::audio)?;

        info!(
            device = %name,
            ?sample_format,
            ?buffer_size,
            sample_rate = format.sample_rate,
            channels = format.channels,
            "opened audio device"
        );

        Ok(Self {
            stream,
            name,
            sample_format,
            buffer_size,
        })
    }

    /// Starts the callback thread pulling audio.
    pub fn resume(&self) -> Result<()> {
        self.stream.play().map_err(DemoError::audio)?;
        debug!(device = %self.name, "audio stream started");
        Ok(())
    }

    /// Stops the stream and releases the device.
    pub fn close(self) {
        if let Err(err) = self.stream.pause() {
            warn!(%err, device = %self.name, "failed to pause audio stream before close");
        }
        drop(self.stream);
        debug!(device = %self.name, "audio device closed");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_format(&self) -> SampleFormat {
        self.sample_format
    }

    pub fn buffer_size(&self) -> &BufferSize {
        &self.buffer_size
    }
}

impl std::fmt::Debug for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDevice")
            .field("name", &self.name)
            .field("sample_format", &self.sample_format)
            .field("buffer_size", &self.buffer_size)
            .finish()
    }
}

/// Fills a float device buffer through `scratch`, one scratch-sized chunk
/// at a time, so the callback never allocates.
fn fill_f32(controller: &PlaybackController, scratch: &mut [i16], data: &mut [f32]) {
    for chunk in data.chunks_mut(scratch.len()) {
        let pcm = &mut scratch[..chunk.len()];
        controller.produce_pcm16(pcm);
        for (out, &sample) in chunk.iter_mut().zip(pcm.iter()) {
            *out = f32::from(sample) / 32_768.0;
        }
    }
}

/// Names of the output devices on the default host.
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host.output_devices().map_err(DemoError::audio)?;
    Ok(devices.filter_map(|device| device.name().ok()).collect())
}

fn select_device(host: &cpal::Host, device_name: Option<&str>) -> Result<Device> {
    match device_name {
        Some(wanted) => host
            .output_devices()
            .map_err(DemoError::audio)?
            .find(|device| device.name().map(|name| name == wanted).unwrap_or(false))
            .ok_or_else(|| DemoError::Audio(format!("no output device named `{wanted}`"))),
        None => host
            .default_output_device()
            .ok_or_else(|| DemoError::Audio("no audio output device available".to_string())),
    }
}

/// Picks a stream config matching the channel count and rate exactly,
/// preferring native 16-bit output over float.
fn find_config(device: &Device, format: &AudioFormat) -> Result<SupportedStreamConfigRange> {
    let candidates: Vec<SupportedStreamConfigRange> = device
        .supported_output_configs()
        .map_err(DemoError::audio)?
        .filter(|range| {
            range.channels() == format.channels
                && range.min_sample_rate().0 <= format.sample_rate
                && range.max_sample_rate().0 >= format.sample_rate
        })
        .collect();

    [SampleFormat::I16, SampleFormat::F32]
        .into_iter()
        .find_map(|wanted| {
            candidates
                .iter()
                .find(|range| range.sample_format() == wanted)
                .cloned()
        })
        .ok_or_else(|| {
            DemoError::Audio(format!(
                "device supports no i16/f32 output at {} Hz with {} channel(s)",
                format.sample_rate, format.channels
            ))
        })
}
