use crate::error::AnalysisError;
use crate::models::ProviderId;
use std::collections::HashMap;
use std::fmt;

pub const ALLOW_FALLBACK_ENV: &str = "HANDLENS_ALLOW_FALLBACK_CREDENTIALS";

#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub secret: String,
    /// True when the caller supplied nothing and a deployment key was used.
    pub from_fallback: bool,
}

impl fmt::Debug for ResolvedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedCredential")
            .field("secret", &crate::models::redact_credential(&self.secret))
            .field("from_fallback", &self.from_fallback)
            .finish()
    }
}

/// Decides which credential a provider call actually uses.
pub trait CredentialResolver: Send + Sync {
    fn resolve(
        &self,
        provider: ProviderId,
        supplied: &str,
    ) -> Result<ResolvedCredential, AnalysisError>;
}

/// Uses the caller's credential when present, otherwise a per-provider
/// deployment fallback if the policy allows it.
#[derive(Clone, Default)]
pub struct FallbackCredentialResolver {
    fallbacks: HashMap<ProviderId, String>,
    allow_fallback: bool,
}

impl FallbackCredentialResolver {
    pub fn new(allow_fallback: bool) -> Self {
        Self {
            fallbacks: HashMap::new(),
            allow_fallback,
        }
    }

    /// Reads `GEMINI_API_KEY` / `OPENAI_API_KEY` as fallbacks;
    /// `HANDLENS_ALLOW_FALLBACK_CREDENTIALS=false` disables substitution.
    pub fn from_env() -> Self {
        let allow_fallback = std::env::var(ALLOW_FALLBACK_ENV)
            .map(|v| !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | "off"))
            .unwrap_or(true);

        let mut resolver = Self::new(allow_fallback);
        for provider in ProviderId::ALL {
            if let Ok(key) = std::env::var(provider.credential_env_var()) {
                if !key.trim().is_empty() {
                    resolver = resolver.with_fallback(provider, key.trim());
                }
            }
        }
        resolver
    }

    pub fn with_fallback(mut self, provider: ProviderId, credential: impl Into<String>) -> Self {
        self.fallbacks.insert(provider, credential.into());
        self
    }
}

impl CredentialResolver for FallbackCredentialResolver {
    fn resolve(
        &self,
        provider: ProviderId,
        supplied: &str,
    ) -> Result<ResolvedCredential, AnalysisError> {
        let supplied = supplied.trim();
        if !supplied.is_empty() {
            return Ok(ResolvedCredential {
                secret: supplied.to_string(),
                from_fallback: false,
            });
        }

        if !self.allow_fallback {
            return Err(AnalysisError::Configuration(format!(
                "No API key supplied for {} and fallback credentials are disabled",
                provider.display_name()
            )));
        }

        self.fallbacks
            .get(&provider)
            .map(|secret| ResolvedCredential {
                secret: secret.clone(),
                from_fallback: true,
            })
            .ok_or_else(|| {
                AnalysisError::Configuration(format!(
                    "No API key supplied for {} and no fallback is configured (set {})",
                    provider.display_name(),
                    provider.credential_env_var()
                ))
            })
    }
}

impl fmt::Debug for FallbackCredentialResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut configured: Vec<_> = self.fallbacks.keys().map(|p| p.as_str()).collect();
        configured.sort();
        f.debug_struct("FallbackCredentialResolver")
            .field("fallbacks", &configured)
            .field("allow_fallback", &self.allow_fallback)
            .finish()
    }
}
