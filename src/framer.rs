/// Chunk framing for arbitrary-length capture buffers
///
/// Audio arrives from the capture layer in whatever buffer sizes the device
/// driver felt like delivering. The VAD and the segmentation engine only ever
/// see fixed-size chunks, so this module slices an input buffer into
/// `CHUNK_SIZE` pieces, zero-padding the final short chunk.

use crate::constants::audio::CHUNK_SIZE;

/// Lazy iterator over fixed-size chunks of a sample buffer.
///
/// The final chunk is right-padded with zeros if the input doesn't divide
/// evenly. An empty input yields no chunks at all. Cloning the framer (or
/// calling [`frame`] again) restarts iteration from the beginning.
#[derive(Debug, Clone)]
pub struct ChunkFramer<'a> {
    samples: &'a [f32],
    pos: usize,
}

/// Frame a sample buffer into `CHUNK_SIZE` chunks.
pub fn frame(samples: &[f32]) -> ChunkFramer<'_> {
    ChunkFramer { samples, pos: 0 }
}

impl<'a> Iterator for ChunkFramer<'a> {
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Vec<f32>> {
        if self.pos >= self.samples.len() {
            return None;
        }

        let end = (self.pos + CHUNK_SIZE).min(self.samples.len());
        let mut chunk = Vec::with_capacity(CHUNK_SIZE);
        chunk.extend_from_slice(&self.samples[self.pos..end]);
        chunk.resize(CHUNK_SIZE, 0.0);
        self.pos = end;

        Some(chunk)
    }
}
