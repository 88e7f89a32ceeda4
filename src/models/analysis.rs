use crate::error::{AnalysisError, ErrorKind};
use crate::models::generation::TokenUsage;
use crate::models::provider::{redact_credential, ProviderId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Basic,    // Short walkthrough of the key decisions
    Detailed, // Street-by-street review with alternatives
    Quick,    // One-paragraph verdict
    Session,  // Aggregate review over many hands
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptCategory {
    Hand,
    Session,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub hand_id: String,
    pub owner_id: String,
    pub provider: ProviderId,
    #[serde(skip)]
    pub credential: String,
    pub analysis_type: AnalysisType,
    pub experience_level: ExperienceLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataValidation {
    pub checked: bool,
    pub plausible: bool,
    pub score: f32,
    pub matched_tokens: Vec<String>,
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverOutcome {
    pub success: bool,
    pub provider_used: ProviderId,
    pub original_provider: ProviderId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub failover_used: bool,
    pub original_provider: Option<ProviderId>,
    pub failover_reason: Option<String>,
    pub data_validation: DataValidation,
    pub used_fallback_credential: bool,
    pub model: Option<String>,
    pub duration_ms: u64,
    pub hand_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub content: Option<String>,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    /// The provider that produced `content`, which differs from the
    /// requested one after a failover.
    pub provider_used: ProviderId,
    /// Template identifier, e.g. `hand/basic`.
    pub prompt_used: Option<String>,
    pub usage: Option<TokenUsage>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Basic => "basic",
            AnalysisType::Detailed => "detailed",
            AnalysisType::Quick => "quick",
            AnalysisType::Session => "session",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AnalysisError> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(AnalysisType::Basic),
            "detailed" | "advanced" => Ok(AnalysisType::Detailed),
            "quick" => Ok(AnalysisType::Quick),
            "session" => Ok(AnalysisType::Session),
            other => Err(AnalysisError::Configuration(format!(
                "Unknown analysis type '{}'",
                other
            ))),
        }
    }

    pub fn category(&self) -> PromptCategory {
        match self {
            AnalysisType::Session => PromptCategory::Session,
            _ => PromptCategory::Hand,
        }
    }
}

impl PromptCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptCategory::Hand => "hand",
            PromptCategory::Session => "session",
        }
    }
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, AnalysisError> {
        match s.trim().to_lowercase().as_str() {
            "beginner" | "novice" => Ok(ExperienceLevel::Beginner),
            "intermediate" => Ok(ExperienceLevel::Intermediate),
            "advanced" | "expert" => Ok(ExperienceLevel::Advanced),
            other => Err(AnalysisError::Configuration(format!(
                "Unknown experience level '{}'",
                other
            ))),
        }
    }
}

impl AnalysisJob {
    pub fn new(
        hand_id: impl Into<String>,
        owner_id: impl Into<String>,
        provider: ProviderId,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            hand_id: hand_id.into(),
            owner_id: owner_id.into(),
            provider,
            credential: credential.into(),
            analysis_type: AnalysisType::Basic,
            experience_level: ExperienceLevel::default(),
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
}

// Hand-written so the credential never reaches logs through `{:?}`.
impl fmt::Debug for AnalysisJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisJob")
            .field("hand_id", &self.hand_id)
            .field("owner_id", &self.owner_id)
            .field("provider", &self.provider)
            .field("credential", &redact_credential(&self.credential))
            .field("analysis_type", &self.analysis_type)
            .field("experience_level", &self.experience_level)
            .finish()
    }
}

impl AnalysisResult {
    pub fn success(provider_used: ProviderId, content: String) -> Self {
        Self {
            success: true,
            content: Some(content),
            error: None,
            error_kind: None,
            provider_used,
            prompt_used: None,
            usage: None,
            metadata: AnalysisMetadata::default(),
        }
    }

    pub fn failure(provider_used: ProviderId, error: &AnalysisError) -> Self {
        Self {
            success: false,
            content: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            provider_used,
            prompt_used: None,
            usage: None,
            metadata: AnalysisMetadata::default(),
        }
    }

    pub fn with_prompt(mut self, prompt_used: impl Into<String>) -> Self {
        self.prompt_used = Some(prompt_used.into());
        self
    }

    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_metadata(mut self, metadata: AnalysisMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn error_message(&self) -> &str {
        self.error.as_deref().unwrap_or("unknown error")
    }
}
