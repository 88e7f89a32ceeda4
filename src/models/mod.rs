pub mod analysis;
pub mod batch;
pub mod generation;
pub mod hand;
pub mod provider;

pub use analysis::{
    AnalysisJob, AnalysisMetadata, AnalysisResult, AnalysisType, DataValidation, ExperienceLevel,
    FailoverOutcome, PromptCategory,
};
pub use batch::{BatchRequest, BatchResult};
pub use generation::{GenerationRequest, GenerationResponse, TokenUsage};
pub use hand::{HandOutcome, HandRecord};
pub use provider::{
    credential_prefix, redact_credential, scrub_credential, ProviderCapabilities, ProviderId,
    RateLimits,
};
