use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use std::sync::{Arc, Mutex};

use crate::constants::audio::SAMPLE_RATE;

/// Microphone capture delivering mono f32 samples at the pipeline rate.
///
/// The device callback only converts to mono and appends to a shared buffer;
/// resampling happens on the draining thread so the audio callback stays
/// cheap.
pub struct AudioCapture {
    device: Device,
    config: StreamConfig,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
}

impl AudioCapture {
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .context("No input device available")?;

        println!("Using audio input device: {}", device.name()?);

        let default_config = device
            .default_input_config()
            .context("Failed to get default input config")?;

        let mut config: StreamConfig = default_config.into();

        // Prefer capturing directly at the pipeline rate if the device can
        let supported_configs = device.supported_input_configs()?;
        for supported_config in supported_configs {
            if supported_config.min_sample_rate().0 <= SAMPLE_RATE
                && supported_config.max_sample_rate().0 >= SAMPLE_RATE
            {
                config.sample_rate = cpal::SampleRate(SAMPLE_RATE);
                break;
            }
        }

        if config.sample_rate.0 != SAMPLE_RATE {
            println!(
                "16kHz not supported, capturing at {} Hz and resampling",
                config.sample_rate.0
            );
        }

        println!(
            "Audio config: {} channels, {} Hz",
            config.channels, config.sample_rate.0
        );

        Ok(AudioCapture {
            device,
            config,
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(()); // Already recording
        }

        self.buffer.lock().unwrap().clear();

        let buffer = Arc::clone(&self.buffer);
        let channels = self.config.channels as usize;

        let err_fn = |err| eprintln!("🔴 Audio stream error: {}", err);

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Handle poisoned mutex gracefully in the audio callback
                    let Ok(mut buf) = buffer.lock() else {
                        eprintln!("⚠️  Audio buffer mutex poisoned, dropping audio data");
                        return;
                    };

                    // Convert to mono if needed and store samples
                    if channels == 1 {
                        buf.extend_from_slice(data);
                    } else {
                        for frame in data.chunks(channels) {
                            let mono_sample: f32 = frame.iter().sum::<f32>() / channels as f32;
                            buf.push(mono_sample);
                        }
                    }
                },
                err_fn,
                None,
            )
            .context("Failed to build input stream (microphone permissions?)")?;

        stream.play().context("Failed to start audio stream")?;

        self.stream = Some(stream);
        println!("Recording started");

        Ok(())
    }

    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            println!("Recording stopped");
        }
    }

    pub fn is_recording(&self) -> bool {
        self.stream.is_some()
    }

    /// Take everything captured since the last drain, resampled to 16kHz.
    pub fn drain_samples(&self) -> Vec<f32> {
        let captured = {
            let mut buffer = self.buffer.lock().unwrap();
            std::mem::take(&mut *buffer)
        }; // Lock released before resampling

        let actual_sample_rate = self.config.sample_rate.0;
        if actual_sample_rate != SAMPLE_RATE {
            resample(&captured, actual_sample_rate, SAMPLE_RATE)
        } else {
            captured
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

// Simple linear interpolation resampling - adequate for voice
fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (input.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_idx = i as f64 * ratio;
        let src_idx_floor = src_idx.floor() as usize;
        let src_idx_ceil = (src_idx_floor + 1).min(input.len() - 1);
        let frac = src_idx - src_idx_floor as f64;

        let sample = input[src_idx_floor] * (1.0 - frac) as f32
            + input[src_idx_ceil] * frac as f32;

        output.push(sample);
    }

    output
}
