use crate::error::AnalysisError;
use crate::models::generation::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CHUNK_SIZE: usize = 5;
pub const DEFAULT_CHUNK_DELAY_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_MIN_RESPONSE_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    pub min_response_length: usize,
    /// Probe the credential with a real call before generating.
    pub validate_before_generate: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay_ms: DEFAULT_CHUNK_DELAY_MS,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            min_response_length: DEFAULT_MIN_RESPONSE_LENGTH,
            validate_before_generate: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `HANDLENS_*` environment variables.
    /// Values that fail to parse or fall outside the accepted range are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(size) = env_parse::<usize>("HANDLENS_CHUNK_SIZE") {
            if size > 0 {
                config.chunk_size = size;
            }
        }

        if let Some(delay) = env_parse::<u64>("HANDLENS_CHUNK_DELAY_MS") {
            config.chunk_delay_ms = delay;
        }

        if let Some(timeout) = env_parse::<u64>("HANDLENS_TIMEOUT") {
            if (10..=300).contains(&timeout) {
                config.timeout_seconds = timeout;
            }
        }

        if let Some(temperature) = env_parse::<f32>("HANDLENS_TEMPERATURE") {
            if (0.0..=2.0).contains(&temperature) {
                config.temperature = temperature;
            }
        }

        if let Some(max_tokens) = env_parse::<u32>("HANDLENS_MAX_TOKENS") {
            if max_tokens > 0 {
                config.max_tokens = max_tokens;
            }
        }

        config
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_min_response_length(mut self, length: usize) -> Self {
        self.min_response_length = length;
        self
    }

    pub fn without_credential_probe(mut self) -> Self {
        self.validate_before_generate = false;
        self
    }

    pub fn chunk_delay(&self) -> Duration {
        Duration::from_millis(self.chunk_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.chunk_size == 0 {
            return Err(AnalysisError::Configuration(
                "Chunk size must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AnalysisError::Configuration(
                "Temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if !(10..=300).contains(&self.timeout_seconds) {
            return Err(AnalysisError::Configuration(
                "Timeout must be between 10 and 300 seconds".to_string(),
            ));
        }

        if self.max_tokens == 0 {
            return Err(AnalysisError::Configuration(
                "Max tokens must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
