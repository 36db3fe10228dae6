/// Rolling pre-speech audio buffer
///
/// While the engine is idle, every chunk lands here so that when speech is
/// detected the decoder still sees the audio from just before the VAD fired.
/// Without this, word onsets get clipped and the first word of every
/// utterance comes back mangled.

use std::collections::VecDeque;

use crate::constants::segmentation::LOOKBACK_SAMPLES;

/// Bounded FIFO of the most recent lookback samples.
///
/// Oldest samples are dropped first once the bound is reached. The ring is
/// only written while the engine is idle; at speech onset it is read via
/// [`snapshot`](LookbackRing::snapshot) and left untouched for the duration
/// of the utterance.
pub struct LookbackRing {
    buf: VecDeque<f32>,
    capacity: usize,
}

impl LookbackRing {
    pub fn new() -> Self {
        Self::with_capacity(LOOKBACK_SAMPLES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        LookbackRing {
            buf: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append chunk samples, dropping the oldest excess from the front.
    pub fn push(&mut self, chunk: &[f32]) {
        self.buf.extend(chunk.iter().copied());
        while self.buf.len() > self.capacity {
            self.buf.pop_front();
        }
    }

    /// Copy the current contents in chronological order. Never mutates.
    pub fn snapshot(&self) -> Vec<f32> {
        self.buf.iter().copied().collect()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Drop all but the newest `keep` samples. No-op if fewer are present.
    pub fn truncate_to_last(&mut self, keep: usize) {
        while self.buf.len() > keep {
            self.buf.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for LookbackRing {
    fn default() -> Self {
        Self::new()
    }
}
