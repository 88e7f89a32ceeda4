use crate::error::AnalysisError;
use crate::models::{AnalysisType, ExperienceLevel, ProviderId};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "handlens")]
#[command(about = "Poker hand history analysis through interchangeable LLM providers")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    /// JSON file containing an array of hand records
    #[arg(long, value_name = "FILE")]
    pub hands: PathBuf,

    /// Owner whose hands are analysed
    #[arg(long)]
    pub owner: String,

    /// Provider to use first (gemini, openai)
    #[arg(short = 'p', long, default_value = "gemini")]
    pub provider: String,

    /// API key for the provider; falls back to GEMINI_API_KEY / OPENAI_API_KEY
    #[arg(long)]
    pub api_key: Option<String>,

    /// Analysis type per hand (basic, detailed, quick)
    #[arg(short = 't', long = "type", default_value = "basic")]
    pub analysis_type: String,

    /// Player experience level (beginner, intermediate, advanced)
    #[arg(short = 'l', long, default_value = "intermediate")]
    pub level: String,

    /// Also run one aggregate analysis over all hands
    #[arg(long)]
    pub session: bool,

    /// Hands analysed concurrently per chunk
    #[arg(long, value_parser = validate_chunk_size)]
    pub chunk_size: Option<usize>,

    /// Maximum time per provider request in seconds (10-300)
    #[arg(long, default_value = "60", value_parser = validate_timeout)]
    pub timeout: u64,

    /// Only check the API key and exit
    #[arg(long)]
    pub validate_only: bool,

    /// Print the batch result as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output to stderr
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Enable debug output including provider traffic summaries
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Hand ids to analyse
    #[arg(value_name = "HAND_ID")]
    pub hand_ids: Vec<String>,
}

impl Cli {
    pub fn parse_args() -> Result<Self, AnalysisError> {
        let cli = Self::try_parse().map_err(|e| AnalysisError::InvalidArguments(e.to_string()))?;

        cli.validate()?;

        Ok(cli)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(10..=300).contains(&self.timeout) {
            return Err(AnalysisError::InvalidArguments(
                "Timeout must be between 10 and 300 seconds".to_string(),
            ));
        }

        if self.owner.trim().is_empty() {
            return Err(AnalysisError::InvalidArguments(
                "Owner must not be empty".to_string(),
            ));
        }

        if self.hand_ids.is_empty() && !self.validate_only {
            return Err(AnalysisError::InvalidArguments(
                "At least one hand id is required".to_string(),
            ));
        }

        self.get_provider()?;
        self.get_experience_level()?;

        if self.get_analysis_type()? == AnalysisType::Session {
            return Err(AnalysisError::InvalidArguments(
                "Use --session for session analysis; --type selects the per-hand analysis"
                    .to_string(),
            ));
        }

        Ok(())
    }

    pub fn get_provider(&self) -> Result<ProviderId, AnalysisError> {
        ProviderId::from_str(&self.provider).map_err(|e| AnalysisError::InvalidArguments(e.to_string()))
    }

    pub fn get_analysis_type(&self) -> Result<AnalysisType, AnalysisError> {
        AnalysisType::from_str(&self.analysis_type)
            .map_err(|e| AnalysisError::InvalidArguments(e.to_string()))
    }

    pub fn get_experience_level(&self) -> Result<ExperienceLevel, AnalysisError> {
        ExperienceLevel::from_str(&self.level)
            .map_err(|e| AnalysisError::InvalidArguments(e.to_string()))
    }

    /// Supplied key, or empty so the resolver may substitute a fallback.
    pub fn get_api_key(&self) -> String {
        self.api_key.clone().unwrap_or_default()
    }

    pub fn get_timeout_seconds(&self) -> u64 {
        if let Ok(timeout_str) = std::env::var("HANDLENS_TIMEOUT") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                if (10..=300).contains(&timeout) {
                    return timeout;
                }
            }
        }
        self.timeout
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose || self.debug
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn should_use_color(&self) -> bool {
        std::env::var("NO_COLOR").is_err() && !self.json
    }

    /// Default `RUST_LOG` directive when the variable is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "warn,handlens=debug"
        } else if self.verbose {
            "warn,handlens=info"
        } else {
            "warn"
        }
    }
}

fn validate_timeout(s: &str) -> Result<u64, String> {
    let timeout: u64 = s.parse().map_err(|_| "Timeout must be a number")?;

    if (10..=300).contains(&timeout) {
        Ok(timeout)
    } else {
        Err("Timeout must be between 10 and 300 seconds".to_string())
    }
}

fn validate_chunk_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("Chunk size must be at least 1".to_string()),
        Ok(size) => Ok(size),
        Err(_) => Err("Chunk size must be a number".to_string()),
    }
}
