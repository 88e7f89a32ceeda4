use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProviderId {
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "openai")]
    OpenAi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimits {
    pub requests_per_minute: u32,
    pub tokens_per_minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    pub max_tokens: u32,
    /// When false the provider has no native system role and the system
    /// text is sent as the head of a single user prompt.
    pub supports_system_prompt: bool,
    pub supports_streaming: bool,
    pub rate_limits: RateLimits,
}

const GEMINI_CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    max_tokens: 8192,
    supports_system_prompt: false,
    supports_streaming: true,
    rate_limits: RateLimits {
        requests_per_minute: 60,
        tokens_per_minute: 32_000,
    },
};

const OPENAI_CAPABILITIES: ProviderCapabilities = ProviderCapabilities {
    max_tokens: 4096,
    supports_system_prompt: true,
    supports_streaming: true,
    rate_limits: RateLimits {
        requests_per_minute: 500,
        tokens_per_minute: 90_000,
    },
};

impl ProviderId {
    pub const ALL: [ProviderId; 2] = [ProviderId::Gemini, ProviderId::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::OpenAi => "openai",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "Google Gemini",
            ProviderId::OpenAi => "OpenAI",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AnalysisError> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "openai" | "gpt" | "chatgpt" => Ok(ProviderId::OpenAi),
            other => Err(AnalysisError::Configuration(format!(
                "Unsupported provider '{}'. Use one of: gemini, openai",
                other
            ))),
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini-1.5-flash",
            ProviderId::OpenAi => "gpt-4o-mini",
        }
    }

    pub fn capabilities(&self) -> ProviderCapabilities {
        match self {
            ProviderId::Gemini => GEMINI_CAPABILITIES,
            ProviderId::OpenAi => OPENAI_CAPABILITIES,
        }
    }

    /// The alternate used for failover in the default two-provider topology.
    pub fn default_alternate(&self) -> ProviderId {
        match self {
            ProviderId::Gemini => ProviderId::OpenAi,
            ProviderId::OpenAi => ProviderId::Gemini,
        }
    }

    pub fn credential_env_var(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "GEMINI_API_KEY",
            ProviderId::OpenAi => "OPENAI_API_KEY",
        }
    }
}

const CREDENTIAL_PREFIX_LEN: usize = 8;

/// Leading characters of a credential that are safe to show in logs and
/// cache keys. Short secrets expose a quarter of their length at most.
pub fn credential_prefix(credential: &str) -> String {
    let len = credential.chars().count();
    let visible = if len > CREDENTIAL_PREFIX_LEN * 2 {
        CREDENTIAL_PREFIX_LEN
    } else {
        len / 4
    };
    credential.chars().take(visible).collect()
}

pub fn redact_credential(credential: &str) -> String {
    if credential.is_empty() {
        return "<none>".to_string();
    }
    format!("{}…", credential_prefix(credential))
}

/// Replaces every occurrence of `credential` in `text` with its redacted form.
pub fn scrub_credential(text: &str, credential: &str) -> String {
    if credential.len() < 4 || !text.contains(credential) {
        return text.to_string();
    }
    text.replace(credential, &redact_credential(credential))
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
