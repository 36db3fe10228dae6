/// Decoder seam
///
/// The engine hands out sample windows; something has to turn them into
/// text. That something may block for as long as it likes, which is exactly
/// why it only ever runs on a worker thread (see `worker`).

use anyhow::Result;

/// Speech-to-text over a complete buffered window.
///
/// No partial hypotheses, no timestamps: one window in, one string out. An
/// empty string means "no recognizable speech", which is not an error.
pub trait Decoder {
    fn decode(&mut self, samples: &[f32]) -> Result<String>;
}
