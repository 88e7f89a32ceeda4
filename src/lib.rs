pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;

pub use error::{AnalysisError, ErrorKind};

// Re-export commonly used types
pub use models::{
    AnalysisJob, AnalysisResult, AnalysisType, BatchRequest, BatchResult, ExperienceLevel,
    HandRecord, ProviderId,
};

pub use analyzer::{AnalysisOrchestrator, BatchOrchestrator};
pub use config::EngineConfig;

pub use cli::CliHandler;
