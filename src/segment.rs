/// Accumulation buffer for the utterance currently being recorded
///
/// Seeded from the lookback ring at speech onset, grown one chunk at a time
/// while speech continues, and taken whole when the utterance ends.

use crate::constants::audio::SAMPLE_RATE;

pub struct SegmentBuffer {
    samples: Vec<f32>,
}

impl SegmentBuffer {
    pub fn new() -> Self {
        SegmentBuffer {
            samples: Vec::new(),
        }
    }

    /// Replace contents with a lookback snapshot at speech onset.
    pub fn seed(&mut self, snapshot: Vec<f32>) {
        self.samples = snapshot;
    }

    /// Append one chunk of speech audio.
    pub fn append(&mut self, chunk: &[f32]) {
        self.samples.extend_from_slice(chunk);
    }

    /// Copy the current window for an interim decode.
    pub fn window(&self) -> Vec<f32> {
        self.samples.clone()
    }

    /// Take all accumulated audio, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / SAMPLE_RATE as f32
    }
}

impl Default for SegmentBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_replaces_contents() {
        let mut buf = SegmentBuffer::new();
        buf.append(&[9.0, 9.0]);
        buf.seed(vec![1.0, 2.0, 3.0]);
        assert_eq!(buf.window(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_append_grows_in_order() {
        let mut buf = SegmentBuffer::new();
        buf.seed(vec![1.0]);
        buf.append(&[2.0, 3.0]);
        buf.append(&[4.0]);
        assert_eq!(buf.window(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn test_take_empties_buffer() {
        let mut buf = SegmentBuffer::new();
        buf.append(&[1.0, 2.0]);
        let taken = buf.take();
        assert_eq!(taken, vec![1.0, 2.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_duration() {
        let mut buf = SegmentBuffer::new();
        buf.append(&vec![0.0; 16000]);
        assert!((buf.duration_secs() - 1.0).abs() < f32::EPSILON);
    }
}
