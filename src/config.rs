use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub vad: VadConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VadConfig {
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    #[serde(default = "default_min_speech_ms")]
    pub min_speech_ms: u64,
    #[serde(default = "default_min_silence_ms")]
    pub min_silence_ms: u64,
}

fn default_silence_threshold() -> f32 {
    0.003 // RMS threshold for silence detection (picks up quieter speech)
}

fn default_min_speech_ms() -> u64 {
    96 // Three 32ms chunks of sustained energy before onset
}

fn default_min_silence_ms() -> u64 {
    640 // Twenty 32ms chunks of quiet before offset
}

impl Default for VadConfig {
    fn default() -> Self {
        VadConfig {
            silence_threshold: default_silence_threshold(),
            min_speech_ms: default_min_speech_ms(),
            min_silence_ms: default_min_silence_ms(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DecoderConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_use_gpu")]
    pub use_gpu: bool,
}

fn default_model() -> String {
    "small.en".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_use_gpu() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            model: default_model(),
            language: default_language(),
            use_gpu: default_use_gpu(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vad: VadConfig::default(),
            decoder: DecoderConfig::default(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".speech-segmenter"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("settings.yaml"))
    }

    pub fn load_or_create() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: Config = serde_yaml::from_str(&contents)
                .context("Failed to parse config file")?;

            // Validate configuration after loading
            config.validate()?;

            Ok(config)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            println!("Created default config at: {}", config_path.display());
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate silence threshold
        if self.vad.silence_threshold < 0.0 {
            bail!("silence_threshold must be >= 0.0");
        }
        if self.vad.silence_threshold > 1.0 {
            bail!("silence_threshold must be <= 1.0");
        }

        // Validate hysteresis windows
        if self.vad.min_speech_ms == 0 {
            bail!("min_speech_ms must be greater than 0");
        }
        if self.vad.min_speech_ms > 2000 {
            bail!("min_speech_ms must be <= 2000 (2 seconds)");
        }
        if self.vad.min_silence_ms == 0 {
            bail!("min_silence_ms must be greater than 0");
        }
        if self.vad.min_silence_ms > 5000 {
            bail!("min_silence_ms must be <= 5000 (5 seconds)");
        }

        // Validate model name (basic check)
        if self.decoder.model.is_empty() {
            bail!("model name cannot be empty");
        }

        // Validate language code (basic check)
        if self.decoder.language.is_empty() {
            bail!("language code cannot be empty");
        }

        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        fs::create_dir_all(&config_dir)
            .context("Failed to create config directory")?;

        let config_path = Self::config_path()?;
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs::write(&config_path, yaml)
            .context("Failed to write config file")?;

        Ok(())
    }
}
