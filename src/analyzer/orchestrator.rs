use crate::analyzer::client_cache::ClientCache;
use crate::analyzer::credentials::{CredentialResolver, FallbackCredentialResolver};
use crate::analyzer::failover::{FailoverCoordinator, ProviderSession};
use crate::analyzer::prompts::{PromptFormatter, TemplatePromptFormatter};
use crate::analyzer::registry::{ClientFactory, ProviderRegistry};
use crate::analyzer::repository::HandRepository;
use crate::analyzer::validation::{
    check_plausibility, flatten_hand, flatten_session, validate_hand, PlausibilityTokens,
};
use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::models::{
    AnalysisJob, AnalysisMetadata, AnalysisResult, AnalysisType, ExperienceLevel,
    GenerationRequest, GenerationResponse, HandRecord, ProviderCapabilities, ProviderId,
    PromptCategory,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs one analysis end to end: credential, provider session (with
/// failover), hand data, prompt, generation and plausibility check.
pub struct AnalysisOrchestrator {
    config: EngineConfig,
    cache: Arc<ClientCache>,
    failover: FailoverCoordinator,
    resolver: Arc<dyn CredentialResolver>,
    repository: Arc<dyn HandRepository>,
    formatter: Arc<dyn PromptFormatter>,
}

/// Bookkeeping for a single job while it moves through the pipeline.
struct JobContext {
    started: Instant,
    provider_used: ProviderId,
    prompt_used: String,
    metadata: AnalysisMetadata,
}

impl JobContext {
    fn new(provider: ProviderId, prompt_used: String) -> Self {
        Self {
            started: Instant::now(),
            provider_used: provider,
            prompt_used,
            metadata: AnalysisMetadata::default(),
        }
    }

    fn record_session(&mut self, session: &ProviderSession) {
        self.provider_used = session.provider();
        self.metadata.used_fallback_credential = session.used_fallback_credential();
        if let Some(outcome) = session.outcome() {
            self.metadata.failover_used = true;
            self.metadata.original_provider = Some(outcome.original_provider);
            self.metadata.failover_reason = Some(outcome.reason);
        }
    }

    fn finish(mut self) -> (ProviderId, String, AnalysisMetadata) {
        self.metadata.duration_ms = self.started.elapsed().as_millis() as u64;
        (self.provider_used, self.prompt_used, self.metadata)
    }

    fn succeed(self, response: GenerationResponse) -> AnalysisResult {
        let usage = response.usage;
        let content = response.content.unwrap_or_default();
        let (provider, prompt, metadata) = self.finish();

        AnalysisResult::success(provider, content)
            .with_prompt(prompt)
            .with_usage(usage)
            .with_metadata(metadata)
    }

    fn fail(self, error: &AnalysisError) -> AnalysisResult {
        let (provider, prompt, metadata) = self.finish();

        AnalysisResult::failure(provider, error)
            .with_prompt(prompt)
            .with_metadata(metadata)
    }
}

impl AnalysisOrchestrator {
    pub fn new(
        config: EngineConfig,
        factory: Arc<dyn ClientFactory>,
        resolver: Arc<dyn CredentialResolver>,
        repository: Arc<dyn HandRepository>,
        formatter: Arc<dyn PromptFormatter>,
    ) -> Self {
        let cache = Arc::new(ClientCache::new(factory));
        let failover = FailoverCoordinator::new(Arc::clone(&cache), Arc::clone(&resolver))
            .with_primary_probe(config.validate_before_generate);

        Self {
            config,
            cache,
            failover,
            resolver,
            repository,
            formatter,
        }
    }

    /// Real rig-backed providers, environment credential fallbacks and the
    /// built-in templates.
    pub fn with_defaults(config: EngineConfig, repository: Arc<dyn HandRepository>) -> Self {
        let factory = Arc::new(ProviderRegistry::from_config(&config));
        Self::new(
            config,
            factory,
            Arc::new(FallbackCredentialResolver::from_env()),
            repository,
            Arc::new(TemplatePromptFormatter::new()),
        )
    }

    pub fn with_alternate(mut self, provider: ProviderId, alternate: ProviderId) -> Self {
        self.failover = self.failover.with_alternate(provider, alternate);
        self
    }

    pub fn without_alternate(mut self, provider: ProviderId) -> Self {
        self.failover = self.failover.without_alternate(provider);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn client_cache(&self) -> &ClientCache {
        &self.cache
    }

    pub fn list_available_providers(&self) -> Vec<ProviderId> {
        ProviderRegistry::list_available_providers()
    }

    pub fn default_model(&self, provider: ProviderId) -> &'static str {
        ProviderRegistry::default_model(provider)
    }

    pub fn capabilities(&self, provider: ProviderId) -> ProviderCapabilities {
        ProviderRegistry::capabilities(provider)
    }

    pub fn clear_client_cache(&self) {
        debug!(entries = self.cache.len(), "clearing client cache");
        self.cache.clear();
    }

    /// One probe call against the provider. Malformed credentials are
    /// rejected without any call.
    pub async fn validate_credential(&self, provider: ProviderId, credential: &str) -> bool {
        match self.cache.get_or_create(provider, credential, None) {
            Ok(client) => client.validate().await,
            Err(e) => {
                debug!(provider = %provider, error = %e, "credential rejected before probe");
                false
            }
        }
    }

    /// Analyses a single hand. Every failure comes back as a result with
    /// `success == false`.
    pub async fn analyze(
        &self,
        job: &AnalysisJob,
        extra_params: &BTreeMap<String, String>,
    ) -> AnalysisResult {
        let prompt_name =
            TemplatePromptFormatter::template_name(PromptCategory::Hand, job.analysis_type);
        let mut ctx = JobContext::new(job.provider, prompt_name);
        debug!(?job, "analysis started");

        match self.run_hand(job, extra_params, &mut ctx).await {
            Ok(response) => {
                debug!(hand_id = %job.hand_id, provider = %ctx.provider_used, "analysis finished");
                ctx.succeed(response)
            }
            Err(e) => {
                warn!(hand_id = %job.hand_id, provider = %ctx.provider_used, error = %e, "analysis failed");
                ctx.fail(&e)
            }
        }
    }

    /// One aggregate analysis over the owner's hands among `hand_ids`.
    /// Hands that fail structural validation are left out; the session
    /// fails only when none remain.
    pub async fn analyze_session(
        &self,
        hand_ids: &[String],
        owner_id: &str,
        provider: ProviderId,
        credential: &str,
        experience_level: ExperienceLevel,
    ) -> AnalysisResult {
        let prompt_name =
            TemplatePromptFormatter::template_name(PromptCategory::Session, AnalysisType::Session);
        let mut ctx = JobContext::new(provider, prompt_name);

        match self
            .run_session(hand_ids, owner_id, provider, credential, experience_level, &mut ctx)
            .await
        {
            Ok(response) => {
                info!(hands = ctx.metadata.hand_count, provider = %ctx.provider_used, "session analysis finished");
                ctx.succeed(response)
            }
            Err(e) => {
                warn!(provider = %ctx.provider_used, error = %e, "session analysis failed");
                ctx.fail(&e)
            }
        }
    }

    async fn run_hand(
        &self,
        job: &AnalysisJob,
        extra_params: &BTreeMap<String, String>,
        ctx: &mut JobContext,
    ) -> Result<GenerationResponse, AnalysisError> {
        let mut session = self.open_session(job.provider, &job.credential, ctx).await?;

        let hand = self
            .repository
            .fetch(&job.hand_id, &job.owner_id)
            .await?
            .ok_or_else(|| AnalysisError::not_found(&job.hand_id))?;
        ctx.metadata.hand_count = 1;

        if let Err(e) = validate_hand(&hand) {
            warn!(hand_id = %job.hand_id, error = %e, "hand rejected before generation");
            return Err(e);
        }

        let mut fields = flatten_hand(&hand, job.experience_level);
        fields.extend(extra_params.iter().map(|(k, v)| (k.clone(), v.clone())));

        let tokens = PlausibilityTokens::from_hands(std::slice::from_ref(&hand));
        self.generate(
            &mut session,
            PromptCategory::Hand,
            job.analysis_type,
            &fields,
            &tokens,
            ctx,
        )
        .await
    }

    async fn run_session(
        &self,
        hand_ids: &[String],
        owner_id: &str,
        provider: ProviderId,
        credential: &str,
        experience_level: ExperienceLevel,
        ctx: &mut JobContext,
    ) -> Result<GenerationResponse, AnalysisError> {
        let mut session = self.open_session(provider, credential, ctx).await?;

        let fetched = self.repository.fetch_many(hand_ids, owner_id).await?;
        if fetched.is_empty() {
            return Err(AnalysisError::not_found(hand_ids.join(", ")));
        }

        let mut rejected = Vec::new();
        let hands: Vec<HandRecord> = fetched
            .into_iter()
            .filter(|hand| match validate_hand(hand) {
                Ok(()) => true,
                Err(e) => {
                    warn!(hand_id = %hand.id, error = %e, "hand left out of session analysis");
                    rejected.push(format!("{}: {}", hand.id, e));
                    false
                }
            })
            .collect();

        if hands.is_empty() {
            return Err(AnalysisError::Validation { fields: rejected });
        }
        ctx.metadata.hand_count = hands.len();

        let fields = flatten_session(&hands, experience_level);
        let tokens = PlausibilityTokens::from_hands(&hands);
        self.generate(
            &mut session,
            PromptCategory::Session,
            AnalysisType::Session,
            &fields,
            &tokens,
            ctx,
        )
        .await
    }

    /// Resolves the effective credential and establishes a validated
    /// session. A credential that cannot be resolved at all is a
    /// configuration error and does not fail over.
    async fn open_session(
        &self,
        provider: ProviderId,
        supplied: &str,
        ctx: &mut JobContext,
    ) -> Result<ProviderSession, AnalysisError> {
        let resolved = self.resolver.resolve(provider, supplied)?;
        ctx.metadata.used_fallback_credential = resolved.from_fallback;

        let session = self.failover.establish(provider, &resolved, None).await?;
        ctx.record_session(&session);
        Ok(session)
    }

    async fn generate(
        &self,
        session: &mut ProviderSession,
        category: PromptCategory,
        analysis_type: AnalysisType,
        fields: &BTreeMap<String, String>,
        tokens: &PlausibilityTokens,
        ctx: &mut JobContext,
    ) -> Result<GenerationResponse, AnalysisError> {
        let prompt = self
            .formatter
            .format(category, analysis_type, fields)
            .ok_or_else(|| {
                AnalysisError::Configuration(format!(
                    "No prompt template for {}",
                    TemplatePromptFormatter::template_name(category, analysis_type)
                ))
            })?;

        if let Some(Value::String(name)) = prompt.metadata.get("template") {
            ctx.prompt_used = name.clone();
        }

        let request = GenerationRequest::new(prompt.system_text, prompt.user_text)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        let outcome = self.failover.generate(session, &request).await;
        ctx.record_session(session);
        let response = outcome?;

        ctx.metadata.model = response
            .metadata
            .get("model")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(session.client().model_name().to_string()));

        let content = response.content.as_deref().unwrap_or_default();
        let validation = check_plausibility(content, tokens, self.config.min_response_length);
        if !validation.plausible {
            warn!(
                provider = %session.provider(),
                score = validation.score,
                issues = ?validation.issues,
                "response may not describe the analysed hands"
            );
        }
        ctx.metadata.data_validation = validation;

        Ok(response)
    }
}
