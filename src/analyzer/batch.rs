use crate::analyzer::orchestrator::AnalysisOrchestrator;
use crate::error::{AnalysisError, ErrorKind};
use crate::models::{scrub_credential, AnalysisJob, AnalysisResult, BatchRequest, BatchResult, ProviderId};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Runs many hand analyses in fixed-size concurrent chunks with a pause
/// between chunks, then an optional session analysis over all of them.
pub struct BatchOrchestrator {
    orchestrator: Arc<AnalysisOrchestrator>,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl BatchOrchestrator {
    pub fn new(orchestrator: Arc<AnalysisOrchestrator>) -> Self {
        let chunk_size = orchestrator.config().chunk_size;
        let chunk_delay = orchestrator.config().chunk_delay();

        Self {
            orchestrator,
            chunk_size,
            chunk_delay,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn orchestrator(&self) -> &Arc<AnalysisOrchestrator> {
        &self.orchestrator
    }

    /// Configured chunk size, capped by the provider's requests-per-minute
    /// envelope and never below one.
    pub fn chunk_size_for(&self, provider: ProviderId) -> usize {
        let rpm = provider.capabilities().rate_limits.requests_per_minute as usize;
        self.chunk_size.min(rpm.max(1)).max(1)
    }

    pub async fn batch_analyze(&self, request: &BatchRequest) -> BatchResult {
        if request.is_empty() {
            debug!("empty batch request");
            return BatchResult::empty();
        }

        let started = Instant::now();
        let chunk_size = self.chunk_size_for(request.provider);
        let chunks: Vec<&[String]> = request.hand_ids.chunks(chunk_size).collect();
        let chunk_count = chunks.len();
        let extra_params = BTreeMap::new();

        info!(
            jobs = request.hand_ids.len(),
            chunks = chunk_count,
            chunk_size,
            provider = %request.provider,
            "batch analysis started"
        );

        let mut results = Vec::with_capacity(request.hand_ids.len());

        for (index, chunk) in chunks.iter().enumerate() {
            debug!(chunk = index + 1, of = chunk_count, jobs = chunk.len(), "dispatching chunk");

            let jobs: Vec<AnalysisJob> = chunk.iter().map(|id| request.job_for(id)).collect();
            let outcomes = join_all(jobs.iter().map(|job| {
                AssertUnwindSafe(self.orchestrator.analyze(job, &extra_params)).catch_unwind()
            }))
            .await;

            for (job, outcome) in jobs.iter().zip(outcomes) {
                let result = outcome.unwrap_or_else(|payload| {
                    let error = AnalysisError::Internal(format!(
                        "analysis of {} panicked: {}",
                        job.hand_id,
                        scrub_credential(&panic_message(&*payload), &job.credential)
                    ));
                    warn!(hand_id = %job.hand_id, error = %error, "job panicked");
                    AnalysisResult::failure(job.provider, &error)
                });
                results.push(result);
            }

            if index + 1 < chunk_count {
                debug!(delay_ms = self.chunk_delay.as_millis() as u64, "waiting before next chunk");
                tokio::time::sleep(self.chunk_delay).await;
            }
        }

        let mut batch = BatchResult::from_results(&request.hand_ids, results, chunk_count);

        if request.include_session_analysis && batch.success_count > 0 {
            batch = batch.with_session_result(self.session_step(request).await);
        }

        let batch = batch.with_processing_time(started.elapsed().as_millis() as u64);

        info!(
            total = batch.total_jobs,
            succeeded = batch.success_count,
            failed = batch.failure_count,
            duration_ms = batch.processing_time_ms,
            "batch analysis finished"
        );

        batch
    }

    async fn session_step(&self, request: &BatchRequest) -> AnalysisResult {
        let outcome = AssertUnwindSafe(self.orchestrator.analyze_session(
            &request.hand_ids,
            &request.owner_id,
            request.provider,
            &request.credential,
            request.experience_level,
        ))
        .catch_unwind()
        .await;

        let mut session = outcome.unwrap_or_else(|payload| {
            let error = AnalysisError::Aggregate(format!(
                "session step panicked: {}",
                scrub_credential(&panic_message(&*payload), &request.credential)
            ));
            AnalysisResult::failure(request.provider, &error)
        });

        if !session.success {
            session.error_kind = Some(ErrorKind::Aggregate);
        }
        session
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
