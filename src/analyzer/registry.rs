use crate::analyzer::llm_client::{GenerationClient, RigGenerationClient};
use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::models::{redact_credential, ProviderCapabilities, ProviderId};
use std::sync::Arc;
use std::time::Duration;

const GEMINI_KEY_PREFIX: &str = "AIza";
const GEMINI_KEY_MIN_LEN: usize = 30;
const OPENAI_KEY_PREFIX: &str = "sk-";
const OPENAI_KEY_MIN_LEN: usize = 20;

/// Constructs provider clients. Implementors only supply `build_client`;
/// `create_client` runs the offline credential format check first so a
/// malformed key never reaches a constructor.
pub trait ClientFactory: Send + Sync {
    fn build_client(
        &self,
        provider: ProviderId,
        credential: &str,
        model: &str,
    ) -> Arc<dyn GenerationClient>;

    fn create_client(
        &self,
        provider: ProviderId,
        credential: &str,
        model: Option<&str>,
    ) -> Result<Arc<dyn GenerationClient>, AnalysisError> {
        validate_credential_format(provider, credential)?;
        let model = model.unwrap_or(provider.default_model());
        Ok(self.build_client(provider, credential, model))
    }
}

/// Heuristic length/prefix check per provider. No network involved.
pub fn validate_credential_format(
    provider: ProviderId,
    credential: &str,
) -> Result<(), AnalysisError> {
    let (prefix, min_len) = match provider {
        ProviderId::Gemini => (GEMINI_KEY_PREFIX, GEMINI_KEY_MIN_LEN),
        ProviderId::OpenAi => (OPENAI_KEY_PREFIX, OPENAI_KEY_MIN_LEN),
    };

    if credential.is_empty() {
        return Err(AnalysisError::Configuration(format!(
            "No API key supplied for {}",
            provider.display_name()
        )));
    }

    if credential.chars().any(char::is_whitespace)
        || !credential.starts_with(prefix)
        || credential.len() < min_len
    {
        return Err(AnalysisError::Configuration(format!(
            "Malformed {} API key ({}): expected '{}' prefix and at least {} characters",
            provider.display_name(),
            redact_credential(credential),
            prefix,
            min_len
        )));
    }

    Ok(())
}

/// Factory for the real rig-backed clients plus the static capability table.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    request_timeout: Duration,
}

impl ProviderRegistry {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.request_timeout())
    }

    pub fn list_available_providers() -> Vec<ProviderId> {
        ProviderId::ALL.to_vec()
    }

    pub fn capabilities(provider: ProviderId) -> ProviderCapabilities {
        provider.capabilities()
    }

    pub fn default_model(provider: ProviderId) -> &'static str {
        provider.default_model()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ClientFactory for ProviderRegistry {
    fn build_client(
        &self,
        provider: ProviderId,
        credential: &str,
        model: &str,
    ) -> Arc<dyn GenerationClient> {
        Arc::new(RigGenerationClient::new(
            provider,
            credential,
            model,
            self.request_timeout,
        ))
    }
}
