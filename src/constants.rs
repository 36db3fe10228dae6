/// Application-wide constants for audio framing, segmentation policy, and decode workers

pub mod audio {
    /// Sample rate the whole pipeline runs at; capture resamples to this,
    /// the engine never renegotiates it
    pub const SAMPLE_RATE: u32 = 16_000;

    /// Fixed chunk size for VAD evaluation and buffer growth (32ms at 16kHz)
    pub const CHUNK_SIZE: usize = 512;

    /// Minimum samples before a window is worth decoding (1.0 second)
    /// Segments below this floor are discarded as noise
    pub const MIN_DECODE_SAMPLES: usize = 16_000;
}

pub mod segmentation {
    use super::audio::CHUNK_SIZE;

    /// Number of chunks of pre-speech audio retained while idle
    pub const LOOKBACK_CHUNKS: usize = 40;

    /// Lookback bound in samples (40 * 512 = 20480, ~1.28s at 16kHz)
    pub const LOOKBACK_SAMPLES: usize = LOOKBACK_CHUNKS * CHUNK_SIZE;

    /// Maximum utterance duration before a forced cutoff
    /// Bounds worst-case decoder latency and segment memory
    pub const MAX_SPEECH_SECS: f32 = 15.0;

    /// Minimum wall-clock time between interim refresh emissions
    pub const MIN_REFRESH_SECS: f32 = 0.1;

    /// Samples of lookback kept across a pause (~62.5ms at 16kHz)
    /// A resume shortly after a pause keeps a little pre-roll context
    pub const PAUSE_CARRYOVER_SAMPLES: usize = 1000;
}

pub mod worker {
    /// Maximum number of pending decode requests per worker lane
    /// This prevents unbounded memory growth when the decoder is slow
    pub const MAX_PENDING_REQUESTS: usize = 2;
}
