#[path = "../common/mod.rs"]
mod common;

use common::{
    orchestrator, repository_with, resolver, MockFactory, MockSpec, GEMINI_KEY,
    OPENAI_FALLBACK_KEY, OPENAI_KEY,
};
use handlens::analyzer::{
    AnalysisOrchestrator, ClientCache, ClientFactory, FailoverCoordinator, FailoverState,
    FallbackCredentialResolver, ResolvedCredential, TemplatePromptFormatter,
};
use handlens::config::EngineConfig;
use handlens::error::ErrorKind;
use handlens::models::{AnalysisJob, AnalysisResult, GenerationRequest, ProviderId};
use std::collections::BTreeMap;
use std::sync::Arc;

fn ids() -> Vec<String> {
    vec!["h1".to_string()]
}

async fn run(factory: &Arc<MockFactory>, provider: ProviderId, credential: &str) -> AnalysisResult {
    let orchestrator = orchestrator(factory, repository_with(&ids(), "u1"));
    let job = AnalysisJob::new("h1", "u1", provider, credential);
    orchestrator.analyze(&job, &BTreeMap::new()).await
}

fn assert_failover_invariant(result: &AnalysisResult) {
    if result.metadata.failover_used {
        assert_ne!(Some(result.provider_used), result.metadata.original_provider);
    }
}

#[test]
fn default_pairing_is_symmetric() {
    for provider in ProviderId::ALL {
        assert_eq!(provider.default_alternate().default_alternate(), provider);
        assert_ne!(provider.default_alternate(), provider);
    }
}

#[tokio::test]
async fn invalid_primary_fails_over_to_alternate() {
    let factory = Arc::new(MockFactory::new().with(ProviderId::Gemini, MockSpec::invalid()));

    let result = run(&factory, ProviderId::Gemini, GEMINI_KEY).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.provider_used, ProviderId::OpenAi);
    assert!(result.metadata.failover_used);
    assert_eq!(result.metadata.original_provider, Some(ProviderId::Gemini));
    assert!(result
        .metadata
        .failover_reason
        .as_deref()
        .unwrap()
        .contains("Google Gemini"));
    assert!(result.metadata.used_fallback_credential);
    assert_eq!(factory.generate_calls(ProviderId::Gemini), 0);
    assert_eq!(factory.generate_calls(ProviderId::OpenAi), 1);
    assert_failover_invariant(&result);
}

#[tokio::test]
async fn failover_works_in_both_directions() {
    let factory = Arc::new(MockFactory::new().with(ProviderId::OpenAi, MockSpec::invalid()));

    let result = run(&factory, ProviderId::OpenAi, OPENAI_KEY).await;

    assert!(result.success);
    assert_eq!(result.provider_used, ProviderId::Gemini);
    assert_eq!(result.metadata.original_provider, Some(ProviderId::OpenAi));
    assert_failover_invariant(&result);
}

#[tokio::test]
async fn both_invalid_names_both_providers() {
    let factory = Arc::new(
        MockFactory::new()
            .with(ProviderId::Gemini, MockSpec::invalid())
            .with(ProviderId::OpenAi, MockSpec::invalid()),
    );

    let result = run(&factory, ProviderId::Gemini, GEMINI_KEY).await;

    assert!(!result.success);
    assert_eq!(result.error_kind, Some(ErrorKind::Provider));
    let message = result.error_message();
    assert!(message.contains("Google Gemini"));
    assert!(message.contains("OpenAI"));
    assert_eq!(factory.total_generate_calls(), 0);
    assert!(!message.contains(GEMINI_KEY));
    assert!(!message.contains(OPENAI_FALLBACK_KEY));
}

#[tokio::test]
async fn malformed_primary_key_fails_over_without_building() {
    let factory = Arc::new(MockFactory::new());

    // An OpenAI key handed to Gemini fails the format check.
    let result = run(&factory, ProviderId::Gemini, OPENAI_KEY).await;

    assert!(result.success);
    assert_eq!(result.provider_used, ProviderId::OpenAi);
    assert!(factory.clients(ProviderId::Gemini).is_empty());
    assert!(result
        .metadata
        .failover_reason
        .as_deref()
        .unwrap()
        .contains("Malformed"));
}

#[tokio::test]
async fn failed_generation_is_reissued_on_alternate() {
    let factory = Arc::new(
        MockFactory::new().with(ProviderId::Gemini, MockSpec::failing("quota exhausted")),
    );

    let result = run(&factory, ProviderId::Gemini, GEMINI_KEY).await;

    assert!(result.success);
    assert_eq!(result.provider_used, ProviderId::OpenAi);
    assert!(result
        .metadata
        .failover_reason
        .as_deref()
        .unwrap()
        .contains("quota exhausted"));
    assert_eq!(factory.generate_calls(ProviderId::Gemini), 1);
    assert_eq!(factory.generate_calls(ProviderId::OpenAi), 1);

    let gemini = &factory.clients(ProviderId::Gemini)[0];
    let openai = &factory.clients(ProviderId::OpenAi)[0];
    let original = gemini.requests.lock().unwrap()[0].clone();
    let reissued = openai.requests.lock().unwrap()[0].clone();
    assert_eq!(original.user_text, reissued.user_text);
    assert_eq!(original.system_text, reissued.system_text);
}

#[tokio::test]
async fn failure_on_both_generations_is_terminal() {
    let factory = Arc::new(
        MockFactory::new()
            .with(ProviderId::Gemini, MockSpec::failing("overloaded"))
            .with(ProviderId::OpenAi, MockSpec::failing("rate limited")),
    );

    let result = run(&factory, ProviderId::Gemini, GEMINI_KEY).await;

    assert!(!result.success);
    let message = result.error_message();
    assert!(message.contains("overloaded"));
    assert!(message.contains("rate limited"));
    assert!(result.metadata.failover_used);
    assert_eq!(result.provider_used, ProviderId::OpenAi);
    assert_failover_invariant(&result);
}

#[tokio::test]
async fn at_most_one_hop_per_job() {
    let factory = Arc::new(
        MockFactory::new()
            .with(ProviderId::Gemini, MockSpec::invalid())
            .with(ProviderId::OpenAi, MockSpec::failing("server error")),
    );

    let result = run(&factory, ProviderId::Gemini, GEMINI_KEY).await;

    assert!(!result.success);
    assert_eq!(factory.generate_calls(ProviderId::OpenAi), 1);
    assert_eq!(factory.generate_calls(ProviderId::Gemini), 0);
    assert_eq!(factory.validate_calls(ProviderId::Gemini), 1);
    assert_eq!(factory.validate_calls(ProviderId::OpenAi), 1);
}

#[tokio::test]
async fn missing_alternate_fails_the_job() {
    let factory = Arc::new(MockFactory::new().with(ProviderId::Gemini, MockSpec::invalid()));
    let orchestrator =
        orchestrator(&factory, repository_with(&ids(), "u1")).without_alternate(ProviderId::Gemini);

    let job = AnalysisJob::new("h1", "u1", ProviderId::Gemini, GEMINI_KEY);
    let result = orchestrator.analyze(&job, &BTreeMap::new()).await;

    assert!(!result.success);
    assert!(result.error_message().contains("no alternate provider"));
    assert!(factory.clients(ProviderId::OpenAi).is_empty());
}

#[tokio::test]
async fn alternate_without_credential_fails_the_job() {
    let factory = Arc::new(MockFactory::new().with(ProviderId::Gemini, MockSpec::invalid()));
    let orchestrator = AnalysisOrchestrator::new(
        EngineConfig::default(),
        Arc::clone(&factory) as Arc<dyn ClientFactory>,
        Arc::new(FallbackCredentialResolver::new(true)),
        Arc::new(repository_with(&ids(), "u1")),
        Arc::new(TemplatePromptFormatter::new()),
    );

    let job = AnalysisJob::new("h1", "u1", ProviderId::Gemini, GEMINI_KEY);
    let result = orchestrator.analyze(&job, &BTreeMap::new()).await;

    assert!(!result.success);
    let message = result.error_message();
    assert!(message.contains("Google Gemini"));
    assert!(message.contains("OPENAI_API_KEY"));
}

#[tokio::test]
async fn coordinator_clears_model_override_on_reissue() {
    let factory = Arc::new(MockFactory::new().with(ProviderId::Gemini, MockSpec::failing("boom")));
    let cache = Arc::new(ClientCache::new(Arc::clone(&factory) as Arc<dyn ClientFactory>));
    let coordinator = FailoverCoordinator::new(cache, Arc::new(resolver()));

    assert_eq!(coordinator.alternate_for(ProviderId::Gemini), Some(ProviderId::OpenAi));

    let primary = ResolvedCredential {
        secret: GEMINI_KEY.to_string(),
        from_fallback: false,
    };
    let mut session = coordinator
        .establish(ProviderId::Gemini, &primary, None)
        .await
        .unwrap();
    assert_eq!(session.state(), &FailoverState::Primary);
    assert!(session.outcome().is_none());

    let request = GenerationRequest::new("system", "user").with_model("gemini-1.5-pro");
    let response = coordinator.generate(&mut session, &request).await.unwrap();

    assert!(response.success);
    assert!(session.is_failed_over());
    let outcome = session.outcome().unwrap();
    assert_eq!(outcome.original_provider, ProviderId::Gemini);
    assert_eq!(outcome.provider_used, ProviderId::OpenAi);

    let openai = &factory.clients(ProviderId::OpenAi)[0];
    assert_eq!(openai.requests.lock().unwrap()[0].model, None);
}
