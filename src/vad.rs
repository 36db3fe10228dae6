/// Voice activity detection seam and the built-in energy detector
///
/// The segmentation engine only needs a yes/no "currently speaking" answer
/// per chunk; everything else (hysteresis, thresholds, model inference) is
/// the detector's business. `EnergyVad` is the default implementation; a
/// model-based detector can slot in through the same trait.

use crate::constants::audio::SAMPLE_RATE;

/// Per-chunk voice activity interface.
///
/// Contract: `accept_waveform` must be called before `is_speech_detected`
/// for the same chunk. `reset` clears internal hysteresis and is called by
/// the engine after a forced cutoff, when the detector may still be primed
/// with a stale speech hypothesis.
pub trait VoiceActivityDetector {
    fn accept_waveform(&mut self, chunk: &[f32]);
    fn is_speech_detected(&self) -> bool;
    fn reset(&mut self);
}

/// RMS-energy detector with onset/offset hysteresis.
///
/// A chunk counts as speech-energy when its RMS exceeds the threshold.
/// Sustained energy for `min_speech_ms` flips the detector to speaking;
/// sustained quiet for `min_silence_ms` flips it back. Short pops and brief
/// dips don't move the needle.
pub struct EnergyVad {
    threshold: f32,
    min_speech_ms: u64,
    min_silence_ms: u64,

    is_speaking: bool,
    consecutive_speech_ms: u64,
    consecutive_silence_ms: u64,
}

impl EnergyVad {
    pub fn new(threshold: f32, min_speech_ms: u64, min_silence_ms: u64) -> Self {
        EnergyVad {
            threshold,
            min_speech_ms,
            min_silence_ms,
            is_speaking: false,
            consecutive_speech_ms: 0,
            consecutive_silence_ms: 0,
        }
    }
}

impl VoiceActivityDetector for EnergyVad {
    fn accept_waveform(&mut self, chunk: &[f32]) {
        if chunk.is_empty() {
            return;
        }

        let rms = calculate_rms(chunk);
        let chunk_ms = (chunk.len() as u64 * 1000) / SAMPLE_RATE as u64;

        if rms > self.threshold {
            self.consecutive_speech_ms += chunk_ms;
            self.consecutive_silence_ms = 0;

            if !self.is_speaking && self.consecutive_speech_ms >= self.min_speech_ms {
                self.is_speaking = true;
            }
        } else {
            self.consecutive_silence_ms += chunk_ms;
            self.consecutive_speech_ms = 0;

            if self.is_speaking && self.consecutive_silence_ms >= self.min_silence_ms {
                self.is_speaking = false;
            }
        }
    }

    fn is_speech_detected(&self) -> bool {
        self.is_speaking
    }

    fn reset(&mut self) {
        self.is_speaking = false;
        self.consecutive_speech_ms = 0;
        self.consecutive_silence_ms = 0;
    }
}

/// RMS (Root Mean Square) energy of a sample buffer
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
