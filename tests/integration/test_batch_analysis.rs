#[path = "../common/mod.rs"]
mod common;

use common::{
    hand_ids, orchestrator, orchestrator_with, repository_with, sample_hand, MockFactory,
    MockSpec, GEMINI_KEY,
};
use handlens::analyzer::{BatchOrchestrator, InMemoryHandRepository};
use handlens::config::EngineConfig;
use handlens::error::ErrorKind;
use handlens::models::{BatchRequest, BatchResult, ProviderId};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const LATENCY: Duration = Duration::from_millis(100);

fn batch_for(factory: &Arc<MockFactory>, repository: InMemoryHandRepository) -> BatchOrchestrator {
    BatchOrchestrator::new(Arc::new(orchestrator(factory, repository)))
}

fn request(ids: Vec<String>) -> BatchRequest {
    BatchRequest::new(ids, "u1", ProviderId::Gemini, GEMINI_KEY)
}

fn assert_tally(batch: &BatchResult) {
    assert_eq!(batch.success_count + batch.failure_count, batch.total_jobs);
    assert!(batch.success_count <= batch.total_jobs);
    assert_eq!(batch.results.len(), batch.total_jobs);
}

/// Hands whose `hand_number` is missing fail validation without a provider call.
fn repository_with_invalid(ids: &[String], invalid: &[&str]) -> InMemoryHandRepository {
    InMemoryHandRepository::from_hands(ids.iter().map(|id| {
        let mut hand = sample_hand(id, "u1");
        if invalid.contains(&id.as_str()) {
            hand.hand_number = None;
        }
        hand
    }))
}

#[tokio::test]
async fn empty_request_does_nothing() {
    let factory = Arc::new(MockFactory::new());
    let batch = batch_for(&factory, InMemoryHandRepository::new());

    let result = batch.batch_analyze(&request(Vec::new())).await;

    assert!(!result.success);
    assert_eq!(result.total_jobs, 0);
    assert_eq!(result.success_count, 0);
    assert_eq!(result.failure_count, 0);
    assert_eq!(result.chunk_count, 0);
    assert_eq!(factory.built(), 0);
}

#[tokio::test(start_paused = true)]
async fn single_chunk_runs_concurrently_without_delay() {
    let ids = hand_ids(3);
    let factory = Arc::new(MockFactory::new().with(ProviderId::Gemini, MockSpec::healthy().with_latency(LATENCY)));
    let batch = batch_for(&factory, repository_with(&ids, "u1"));

    let started = Instant::now();
    let result = batch.batch_analyze(&request(ids)).await;
    let elapsed = started.elapsed();

    assert!(result.success);
    assert_eq!(result.success_count, 3);
    assert_eq!(result.chunk_count, 1);
    assert_eq!(result.inter_chunk_delays(), 0);
    assert!(elapsed >= LATENCY);
    assert!(elapsed < LATENCY * 2, "took {:?}", elapsed);
    assert_tally(&result);
}

#[tokio::test(start_paused = true)]
async fn twelve_jobs_run_in_three_chunks_with_two_delays() {
    let ids = hand_ids(12);
    let factory = Arc::new(MockFactory::new().with(ProviderId::Gemini, MockSpec::healthy().with_latency(LATENCY)));
    let batch = batch_for(&factory, repository_with(&ids, "u1"));

    let started = Instant::now();
    let result = batch.batch_analyze(&request(ids.clone())).await;
    let elapsed = started.elapsed();

    assert_eq!(result.chunk_count, 3);
    assert_eq!(result.inter_chunk_delays(), 2);
    assert_eq!(result.success_count, 12);

    // 3 chunks of one latency each plus 2 delays of 1s
    let expected = LATENCY * 3 + Duration::from_millis(2000);
    assert!(elapsed >= expected, "took {:?}", elapsed);
    assert!(elapsed < expected + LATENCY, "took {:?}", elapsed);
    assert!(result.processing_time_ms >= expected.as_millis() as u64);
    assert_eq!(factory.generate_calls(ProviderId::Gemini), 12);
    assert_tally(&result);
}

#[tokio::test(start_paused = true)]
async fn chunk_size_and_delay_are_configurable() {
    let ids = hand_ids(4);
    let factory = Arc::new(MockFactory::new());
    let config = EngineConfig::default()
        .with_chunk_size(2)
        .with_chunk_delay(Duration::from_millis(250));
    let batch = BatchOrchestrator::new(Arc::new(orchestrator_with(
        &factory,
        repository_with(&ids, "u1"),
        config,
    )));

    let started = Instant::now();
    let result = batch.batch_analyze(&request(ids)).await;

    assert_eq!(result.chunk_count, 2);
    assert_eq!(started.elapsed(), Duration::from_millis(250));
}

#[test]
fn chunk_size_is_clamped() {
    let factory = Arc::new(MockFactory::new());
    let batch = batch_for(&factory, InMemoryHandRepository::new());

    assert_eq!(batch.chunk_size_for(ProviderId::Gemini), 5);

    let batch = batch.with_chunk_size(1000);
    assert_eq!(batch.chunk_size_for(ProviderId::Gemini), 60);
    assert_eq!(batch.chunk_size_for(ProviderId::OpenAi), 500);

    let batch = batch.with_chunk_size(0);
    assert_eq!(batch.chunk_size_for(ProviderId::OpenAi), 1);
}

#[tokio::test]
async fn partial_failure_keeps_order_and_succeeds() {
    let ids = hand_ids(5);
    let factory = Arc::new(MockFactory::new());
    let batch = batch_for(&factory, repository_with_invalid(&ids, &["h3"]));

    let result = batch.batch_analyze(&request(ids)).await;

    assert!(result.success);
    assert_eq!(result.success_count, 4);
    assert_eq!(result.failure_count, 1);
    assert!(!result.results[2].success);
    assert_eq!(result.results[2].error_kind, Some(ErrorKind::Validation));
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("h3: "));
    assert_tally(&result);
}

#[tokio::test]
async fn all_failures_mean_batch_failure() {
    let ids = hand_ids(3);
    let factory = Arc::new(MockFactory::new());
    let batch = batch_for(&factory, repository_with_invalid(&ids, &["h1", "h2", "h3"]));

    let result = batch.batch_analyze(&request(ids).with_session_analysis()).await;

    assert!(!result.success);
    assert_eq!(result.failure_count, 3);
    assert_eq!(result.errors.len(), 3);
    assert!(result.session_result.is_none());
    assert_eq!(factory.total_generate_calls(), 0);
}

#[tokio::test]
async fn panicking_job_is_isolated() {
    let ids = hand_ids(4);
    let factory = Arc::new(
        MockFactory::new().with(ProviderId::Gemini, MockSpec::healthy().panicking_on("PANIC-ME")),
    );
    let mut hands: Vec<_> = ids.iter().map(|id| sample_hand(id, "u1")).collect();
    hands[1].notes = Some("PANIC-ME".to_string());
    let batch = batch_for(&factory, InMemoryHandRepository::from_hands(hands));

    let result = batch.batch_analyze(&request(ids)).await;

    assert!(result.success);
    assert_eq!(result.success_count, 3);
    assert!(!result.results[1].success);
    assert_eq!(result.results[1].error_kind, Some(ErrorKind::Internal));
    assert!(result.errors[0].starts_with("h2: "));
    assert!(result.errors[0].contains("panicked"));
    assert_tally(&result);
}

#[tokio::test]
async fn session_analysis_runs_after_jobs() {
    let ids = hand_ids(3);
    let factory = Arc::new(MockFactory::new());
    let batch = batch_for(&factory, repository_with(&ids, "u1"));

    let result = batch.batch_analyze(&request(ids).with_session_analysis()).await;

    let session = result.session_result.as_ref().unwrap();
    assert!(session.success);
    assert_eq!(session.prompt_used.as_deref(), Some("session/session"));
    assert_eq!(session.metadata.hand_count, 3);
    assert!(result.errors.is_empty());
    assert_eq!(factory.generate_calls(ProviderId::Gemini), 4);
}

#[tokio::test]
async fn session_failure_does_not_change_tally() {
    let ids = hand_ids(2);
    let factory = Arc::new(
        MockFactory::new()
            .with(ProviderId::Gemini, MockSpec::healthy().failing_on("SESSION REVIEW"))
            .with(ProviderId::OpenAi, MockSpec::healthy().failing_on("SESSION REVIEW")),
    );
    let batch = batch_for(&factory, repository_with(&ids, "u1"));

    let result = batch.batch_analyze(&request(ids).with_session_analysis()).await;

    assert!(result.success);
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failure_count, 0);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("session analysis: "));
    let session = result.session_result.as_ref().unwrap();
    assert!(!session.success);
    assert_eq!(session.error_kind, Some(ErrorKind::Aggregate));
}

#[tokio::test]
async fn batch_jobs_share_cached_clients() {
    let ids = hand_ids(7);
    let factory = Arc::new(MockFactory::new());
    let batch = batch_for(&factory, repository_with(&ids, "u1"))
        .with_chunk_delay(Duration::ZERO);

    let result = batch.batch_analyze(&request(ids)).await;

    assert_eq!(result.success_count, 7);
    assert_eq!(factory.built(), 1);
    assert_eq!(batch.orchestrator().client_cache().len(), 1);
}

#[tokio::test]
async fn repeated_ids_count_once_in_session() {
    let factory = Arc::new(MockFactory::new());
    let batch = batch_for(&factory, repository_with(&hand_ids(2), "u1"));
    let ids: Vec<String> = vec!["h1".into(), "h1".into(), "h2".into()];

    let result = batch.batch_analyze(&request(ids).with_session_analysis()).await;

    assert_eq!(result.total_jobs, 3);
    let session = result.session_result.as_ref().unwrap();
    assert!(session.success);
    assert_eq!(session.metadata.hand_count, 2);

    let client = &factory.clients(ProviderId::Gemini)[0];
    let requests = client.requests.lock().unwrap();
    let session_prompt = &requests.last().unwrap().user_text;
    assert!(session_prompt.contains("Hands reviewed: 2"));
    assert!(session_prompt.contains("Net result: 14"));
}
