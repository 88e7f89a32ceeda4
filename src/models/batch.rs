use crate::models::analysis::{AnalysisJob, AnalysisResult, AnalysisType, ExperienceLevel};
use crate::models::provider::{redact_credential, ProviderId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub hand_ids: Vec<String>,
    pub owner_id: String,
    pub provider: ProviderId,
    #[serde(skip)]
    pub credential: String,
    pub analysis_type: AnalysisType,
    pub experience_level: ExperienceLevel,
    pub include_session_analysis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub success: bool,
    pub total_jobs: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// One entry per requested hand, in request order.
    pub results: Vec<AnalysisResult>,
    pub session_result: Option<AnalysisResult>,
    pub errors: Vec<String>,
    pub processing_time_ms: u64,
    pub chunk_count: usize,
}

impl BatchRequest {
    pub fn new(
        hand_ids: Vec<String>,
        owner_id: impl Into<String>,
        provider: ProviderId,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            hand_ids,
            owner_id: owner_id.into(),
            provider,
            credential: credential.into(),
            analysis_type: AnalysisType::Basic,
            experience_level: ExperienceLevel::default(),
            include_session_analysis: false,
        }
    }

    pub fn with_analysis_type(mut self, analysis_type: AnalysisType) -> Self {
        self.analysis_type = analysis_type;
        self
    }

    pub fn with_experience_level(mut self, level: ExperienceLevel) -> Self {
        self.experience_level = level;
        self
    }

    pub fn with_session_analysis(mut self) -> Self {
        self.include_session_analysis = true;
        self
    }

    pub fn job_for(&self, hand_id: &str) -> AnalysisJob {
        AnalysisJob::new(hand_id, &self.owner_id, self.provider, &self.credential)
            .with_analysis_type(self.analysis_type)
            .with_experience_level(self.experience_level)
    }

    pub fn is_empty(&self) -> bool {
        self.hand_ids.is_empty()
    }
}

impl fmt::Debug for BatchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRequest")
            .field("hand_ids", &self.hand_ids)
            .field("owner_id", &self.owner_id)
            .field("provider", &self.provider)
            .field("credential", &redact_credential(&self.credential))
            .field("analysis_type", &self.analysis_type)
            .field("experience_level", &self.experience_level)
            .field("include_session_analysis", &self.include_session_analysis)
            .finish()
    }
}

impl BatchResult {
    /// Tallies per-hand results. `errors` gets one `"<hand_id>: <error>"`
    /// line per failed hand; `hand_ids` must be in the same order as `results`.
    pub fn from_results(hand_ids: &[String], results: Vec<AnalysisResult>, chunk_count: usize) -> Self {
        let total_jobs = results.len();
        let success_count = results.iter().filter(|r| r.success).count();

        let errors = hand_ids
            .iter()
            .zip(results.iter())
            .filter(|(_, r)| !r.success)
            .map(|(id, r)| format!("{}: {}", id, r.error_message()))
            .collect();

        Self {
            success: success_count > 0,
            total_jobs,
            success_count,
            failure_count: total_jobs - success_count,
            results,
            session_result: None,
            errors,
            processing_time_ms: 0,
            chunk_count,
        }
    }

    pub fn empty() -> Self {
        Self::from_results(&[], Vec::new(), 0)
    }

    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }

    /// Attaches the session step. Its failure is recorded as an extra error
    /// and never alters the per-hand tally.
    pub fn with_session_result(mut self, session: AnalysisResult) -> Self {
        if !session.success {
            self.errors
                .push(format!("session analysis: {}", session.error_message()));
        }
        self.session_result = Some(session);
        self
    }

    pub fn inter_chunk_delays(&self) -> usize {
        self.chunk_count.saturating_sub(1)
    }
}
