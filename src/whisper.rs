use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState};

use crate::config::DecoderConfig;
use crate::decoder::Decoder;

/// Whisper-backed decoder implementing the [`Decoder`] seam.
///
/// Each decode worker lane needs its own state, but the model context is
/// shared so it only gets loaded once - loading it per lane costs an extra
/// 300-600MB of memory for nothing.
pub struct WhisperDecoder {
    ctx: Arc<WhisperContext>,
    state: WhisperState,
    config: DecoderConfig,
}

impl WhisperDecoder {
    pub fn new(config: DecoderConfig) -> Result<Self> {
        let model_path = Self::get_model_path(&config.model)?;

        println!("Loading Whisper model from: {}", model_path.display());

        let ctx_params = WhisperContextParameters {
            use_gpu: config.use_gpu,
            ..Default::default()
        };

        let ctx = WhisperContext::new_with_params(&model_path.to_string_lossy(), ctx_params)
            .context("Failed to load Whisper model")?;

        println!("Whisper model loaded successfully (GPU: {})", config.use_gpu);

        let ctx = Arc::new(ctx);
        let state = ctx.create_state()
            .context("Failed to create Whisper state")?;

        Ok(WhisperDecoder { ctx, state, config })
    }

    /// Create a second decoder sharing this one's model context (one per
    /// worker lane).
    pub fn with_shared_context(ctx: Arc<WhisperContext>, config: DecoderConfig) -> Result<Self> {
        let state = ctx.create_state()
            .context("Failed to create Whisper state")?;

        Ok(WhisperDecoder { ctx, state, config })
    }

    pub fn shared_context(&self) -> Arc<WhisperContext> {
        self.ctx.clone()
    }

    fn get_model_path(model_name: &str) -> Result<PathBuf> {
        // Models live in the config folder
        let config_dir = dirs::home_dir()
            .context("Failed to get home directory")?
            .join(".speech-segmenter")
            .join("models");

        let model_filename = format!("ggml-{}.bin", model_name);
        let model_path = config_dir.join(&model_filename);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\n\
                Please download the model from:\n\
                https://huggingface.co/ggerganov/whisper.cpp/tree/main\n\
                and place it in: {}",
                model_filename,
                config_dir.display()
            );
        }

        Ok(model_path)
    }
}

impl Decoder for WhisperDecoder {
    fn decode(&mut self, samples: &[f32]) -> Result<String> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        if !self.config.language.is_empty() && self.config.language != "auto" {
            params.set_language(Some(&self.config.language));
        }

        params.set_translate(false);

        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        // Disable special tokens to avoid annotations like [BLANK_AUDIO], (coughs), etc.
        params.set_suppress_blank(true);
        params.set_suppress_non_speech_tokens(true);

        // Greedy decoding at temperature 0 with a strict probability floor
        // keeps hallucinations down on short windows
        params.set_temperature(0.0);
        params.set_temperature_inc(0.0);
        params.set_logprob_thold(0.0);

        // Reuse the existing state
        self.state.full(params, samples)
            .context("Failed to run Whisper transcription")?;

        let num_segments = self.state.full_n_segments()
            .context("Failed to get number of segments")?;

        let mut result = String::new();
        for i in 0..num_segments {
            let segment = self.state.full_get_segment_text(i)
                .context("Failed to get segment text")?;
            result.push_str(&segment);
            result.push(' ');
        }

        Ok(result.trim().to_string())
    }
}
