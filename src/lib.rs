// Library exports
pub mod config;
pub mod constants;
pub mod decoder;
pub mod dedup;
pub mod engine;
pub mod framer;
pub mod lookback;
pub mod pipeline;
pub mod refresh;
pub mod segment;
pub mod vad;
pub mod worker;

#[cfg(feature = "capture")]
pub mod capture;

#[cfg(feature = "whisper")]
pub mod whisper;
