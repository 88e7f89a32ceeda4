use crate::analyzer::client_cache::ClientCache;
use crate::analyzer::credentials::{CredentialResolver, ResolvedCredential};
use crate::analyzer::llm_client::GenerationClient;
use crate::error::AnalysisError;
use crate::models::{FailoverOutcome, GenerationRequest, GenerationResponse, ProviderId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailoverState {
    Primary,
    FailedOver { original: ProviderId, reason: String },
}

/// A validated client for one job, plus whether it was reached by failing over.
pub struct ProviderSession {
    client: Arc<dyn GenerationClient>,
    provider: ProviderId,
    state: FailoverState,
    used_fallback_credential: bool,
}

impl ProviderSession {
    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn client(&self) -> &Arc<dyn GenerationClient> {
        &self.client
    }

    pub fn state(&self) -> &FailoverState {
        &self.state
    }

    pub fn is_failed_over(&self) -> bool {
        matches!(self.state, FailoverState::FailedOver { .. })
    }

    pub fn used_fallback_credential(&self) -> bool {
        self.used_fallback_credential
    }

    pub fn outcome(&self) -> Option<FailoverOutcome> {
        match &self.state {
            FailoverState::Primary => None,
            FailoverState::FailedOver { original, reason } => Some(FailoverOutcome {
                success: true,
                provider_used: self.provider,
                original_provider: *original,
                reason: reason.clone(),
            }),
        }
    }
}

/// Moves a job from a failing provider to its configured alternate, once.
pub struct FailoverCoordinator {
    cache: Arc<ClientCache>,
    resolver: Arc<dyn CredentialResolver>,
    alternates: HashMap<ProviderId, ProviderId>,
    probe_primary: bool,
}

impl FailoverCoordinator {
    /// Starts with the symmetric Gemini/OpenAI pairing.
    pub fn new(cache: Arc<ClientCache>, resolver: Arc<dyn CredentialResolver>) -> Self {
        let alternates = ProviderId::ALL
            .iter()
            .map(|p| (*p, p.default_alternate()))
            .collect();

        Self {
            cache,
            resolver,
            alternates,
            probe_primary: true,
        }
    }

    pub fn with_alternate(mut self, provider: ProviderId, alternate: ProviderId) -> Self {
        if provider != alternate {
            self.alternates.insert(provider, alternate);
        }
        self
    }

    pub fn without_alternate(mut self, provider: ProviderId) -> Self {
        self.alternates.remove(&provider);
        self
    }

    /// Skip the probe call on the primary; only a failed generation triggers failover.
    pub fn with_primary_probe(mut self, enabled: bool) -> Self {
        self.probe_primary = enabled;
        self
    }

    pub fn alternate_for(&self, provider: ProviderId) -> Option<ProviderId> {
        self.alternates.get(&provider).copied()
    }

    /// Builds and validates the client for `provider`, failing over when the
    /// credential is malformed or rejected by the probe.
    pub async fn establish(
        &self,
        provider: ProviderId,
        credential: &ResolvedCredential,
        model: Option<&str>,
    ) -> Result<ProviderSession, AnalysisError> {
        let client = match self.cache.get_or_create(provider, &credential.secret, model) {
            Ok(client) => client,
            Err(e) => {
                let reason = e.to_string();
                warn!(provider = %provider, reason = %reason, "primary credential rejected, failing over");
                return self
                    .fail_over(provider, reason, credential.from_fallback)
                    .await;
            }
        };

        if self.probe_primary && !client.validate().await {
            let reason = format!("{} credential failed validation", provider.display_name());
            warn!(provider = %provider, reason = %reason, "primary credential rejected, failing over");
            return self
                .fail_over(provider, reason, credential.from_fallback)
                .await;
        }

        Ok(ProviderSession {
            client,
            provider,
            state: FailoverState::Primary,
            used_fallback_credential: credential.from_fallback,
        })
    }

    /// Resolves, builds and probes the alternate for `failing`.
    pub async fn fail_over(
        &self,
        failing: ProviderId,
        reason: String,
        used_fallback_credential: bool,
    ) -> Result<ProviderSession, AnalysisError> {
        let both_failed = |alternate: ProviderId, detail: String| {
            AnalysisError::Provider(format!(
                "{} failed ({}); failover to {} failed: {}",
                failing.display_name(),
                reason,
                alternate.display_name(),
                detail
            ))
        };

        let Some(alternate) = self.alternate_for(failing) else {
            return Err(AnalysisError::Provider(format!(
                "{} failed ({}) and no alternate provider is configured",
                failing.display_name(),
                reason
            )));
        };

        let resolved = self
            .resolver
            .resolve(alternate, "")
            .map_err(|e| both_failed(alternate, e.to_string()))?;

        let client = self
            .cache
            .get_or_create(alternate, &resolved.secret, None)
            .map_err(|e| both_failed(alternate, e.to_string()))?;

        if !client.validate().await {
            return Err(both_failed(
                alternate,
                format!("{} credential failed validation", alternate.display_name()),
            ));
        }

        info!(from = %failing, to = %alternate, "failed over to alternate provider");

        Ok(ProviderSession {
            client,
            provider: alternate,
            state: FailoverState::FailedOver {
                original: failing,
                reason,
            },
            used_fallback_credential: used_fallback_credential || resolved.from_fallback,
        })
    }

    /// Runs `request` on the session's client. A failure on the primary
    /// moves the session to the alternate and reissues the request there
    /// with the model override cleared; a failure after that is terminal.
    pub async fn generate(
        &self,
        session: &mut ProviderSession,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, AnalysisError> {
        let response = session.client.generate(request).await;
        if response.success && response.has_content() {
            return Ok(response);
        }

        let error = response.error_message();

        if let FailoverState::FailedOver { original, reason } = &session.state {
            return Err(AnalysisError::Provider(format!(
                "{} failed ({}); {} also failed: {}",
                original.display_name(),
                reason,
                session.provider.display_name(),
                error
            )));
        }

        let failing = session.provider;
        let reason = format!("{} generation failed: {}", failing.display_name(), error);
        warn!(provider = %failing, reason = %reason, "generation failed, failing over");

        *session = self
            .fail_over(failing, reason.clone(), session.used_fallback_credential)
            .await?;

        let mut retry = request.clone();
        retry.model = None;

        let response = session.client.generate(&retry).await;
        if response.success && response.has_content() {
            Ok(response)
        } else {
            Err(AnalysisError::Provider(format!(
                "{} failed ({}); {} also failed: {}",
                failing.display_name(),
                reason,
                session.provider.display_name(),
                response.error_message()
            )))
        }
    }
}
