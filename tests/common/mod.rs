#![allow(dead_code)]

use handlens::analyzer::{
    AnalysisOrchestrator, ClientFactory, FallbackCredentialResolver, GenerationClient,
    InMemoryHandRepository, TemplatePromptFormatter,
};
use handlens::config::EngineConfig;
use handlens::models::{
    GenerationRequest, GenerationResponse, HandRecord, ProviderId, TokenUsage,
};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GEMINI_KEY: &str = "AIzaTestKey000000000000000000000";
pub const OPENAI_KEY: &str = "sk-test-primary-0000000000";
pub const GEMINI_FALLBACK_KEY: &str = "AIzaFallbackKey00000000000000000";
pub const OPENAI_FALLBACK_KEY: &str = "sk-fallback-000000000000";

pub const PLAUSIBLE_REPLY: &str = "From the button with As Kd you played this hand well: \
     the preflop raise was standard and you won a decent pot by value betting the flop.";

#[derive(Debug, Clone)]
pub struct MockSpec {
    pub valid: bool,
    pub reply: Result<String, String>,
    pub latency: Duration,
    pub panic_on: Option<String>,
    pub fail_on: Option<String>,
}

impl MockSpec {
    pub fn healthy() -> Self {
        Self {
            valid: true,
            reply: Ok(PLAUSIBLE_REPLY.to_string()),
            latency: Duration::ZERO,
            panic_on: None,
            fail_on: None,
        }
    }

    pub fn invalid() -> Self {
        Self {
            valid: false,
            ..Self::healthy()
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::healthy()
        }
    }

    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            ..Self::healthy()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Panics when the rendered prompt contains `marker`.
    pub fn panicking_on(mut self, marker: &str) -> Self {
        self.panic_on = Some(marker.to_string());
        self
    }

    /// Fails the generation when the rendered prompt contains `marker`.
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_on = Some(marker.to_string());
        self
    }
}

pub struct MockClient {
    provider: ProviderId,
    model: String,
    spec: MockSpec,
    pub generate_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl MockClient {
    pub fn new(provider: ProviderId, model: &str, spec: MockSpec) -> Self {
        Self {
            provider,
            model: model.to_string(),
            spec,
            generate_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl GenerationClient for MockClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = GenerationResponse> + Send + 'a>> {
        Box::pin(async move {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());

            if !self.spec.latency.is_zero() {
                tokio::time::sleep(self.spec.latency).await;
            }

            if let Some(marker) = &self.spec.panic_on {
                if request.user_text.contains(marker.as_str()) {
                    panic!("mock provider exploded");
                }
            }

            if let Some(marker) = &self.spec.fail_on {
                if request.user_text.contains(marker.as_str()) {
                    return GenerationResponse::failed(format!("{} rejected the prompt", self.provider));
                }
            }

            match &self.spec.reply {
                Ok(text) => GenerationResponse::succeeded(text.clone())
                    .with_usage(TokenUsage::new(120, 40))
                    .with_metadata("model", self.model.clone()),
                Err(message) => GenerationResponse::failed(format!("{} {}", self.provider, message)),
            }
        })
    }

    fn validate<'a>(&'a self) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            self.validate_calls.fetch_add(1, Ordering::SeqCst);
            self.spec.valid
        })
    }

    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Builds `MockClient`s from per-provider specs and keeps every client it
/// built so tests can count calls.
pub struct MockFactory {
    specs: Mutex<HashMap<ProviderId, MockSpec>>,
    built: Mutex<Vec<Arc<MockClient>>>,
}

impl MockFactory {
    pub fn new() -> Self {
        let specs = ProviderId::ALL
            .iter()
            .map(|p| (*p, MockSpec::healthy()))
            .collect();

        Self {
            specs: Mutex::new(specs),
            built: Mutex::new(Vec::new()),
        }
    }

    pub fn with(self, provider: ProviderId, spec: MockSpec) -> Self {
        self.specs.lock().unwrap().insert(provider, spec);
        self
    }

    pub fn built(&self) -> usize {
        self.built.lock().unwrap().len()
    }

    pub fn clients(&self, provider: ProviderId) -> Vec<Arc<MockClient>> {
        self.built
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.provider == provider)
            .cloned()
            .collect()
    }

    pub fn generate_calls(&self, provider: ProviderId) -> usize {
        self.clients(provider)
            .iter()
            .map(|c| c.generate_calls.load(Ordering::SeqCst))
            .sum()
    }

    pub fn validate_calls(&self, provider: ProviderId) -> usize {
        self.clients(provider)
            .iter()
            .map(|c| c.validate_calls.load(Ordering::SeqCst))
            .sum()
    }

    pub fn total_generate_calls(&self) -> usize {
        ProviderId::ALL.iter().map(|p| self.generate_calls(*p)).sum()
    }
}

impl ClientFactory for MockFactory {
    fn build_client(
        &self,
        provider: ProviderId,
        _credential: &str,
        model: &str,
    ) -> Arc<dyn GenerationClient> {
        let spec = self
            .specs
            .lock()
            .unwrap()
            .get(&provider)
            .cloned()
            .unwrap_or_else(MockSpec::healthy);
        let client = Arc::new(MockClient::new(provider, model, spec));
        self.built.lock().unwrap().push(Arc::clone(&client));
        client
    }
}

/// Fallback keys for both providers, so failover can always resolve one.
pub fn resolver() -> FallbackCredentialResolver {
    FallbackCredentialResolver::new(true)
        .with_fallback(ProviderId::Gemini, GEMINI_FALLBACK_KEY)
        .with_fallback(ProviderId::OpenAi, OPENAI_FALLBACK_KEY)
}

pub fn sample_hand(id: &str, owner: &str) -> HandRecord {
    HandRecord {
        id: id.to_string(),
        owner_id: owner.to_string(),
        hand_number: Some(format!("{}-no", id)),
        played_at: Some(Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).unwrap()),
        game_type: Some("NLHE".to_string()),
        stakes: Some("1/2".to_string()),
        big_blind: Some(2.0),
        table_size: Some(6),
        position: Some("BTN".to_string()),
        hole_cards: Some("As Kd".to_string()),
        board_cards: Some("Qh Jc 2s".to_string()),
        preflop_actions: Some("Hero raises to 6, BB calls".to_string()),
        flop_actions: Some("BB checks, Hero bets 8, BB folds".to_string()),
        pot_size: Some(20.0),
        stack_size: Some(200.0),
        result: Some(7.0),
        notes: Some(format!("note for {}", id)),
        ..HandRecord::default()
    }
}

pub fn hand_ids(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("h{}", i)).collect()
}

pub fn repository_with(ids: &[String], owner: &str) -> InMemoryHandRepository {
    InMemoryHandRepository::from_hands(ids.iter().map(|id| sample_hand(id, owner)))
}

pub fn orchestrator(
    factory: &Arc<MockFactory>,
    repository: InMemoryHandRepository,
) -> AnalysisOrchestrator {
    orchestrator_with(factory, repository, EngineConfig::default())
}

pub fn orchestrator_with(
    factory: &Arc<MockFactory>,
    repository: InMemoryHandRepository,
    config: EngineConfig,
) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(
        config,
        Arc::clone(factory) as Arc<dyn ClientFactory>,
        Arc::new(resolver()),
        Arc::new(repository),
        Arc::new(TemplatePromptFormatter::new()),
    )
}
