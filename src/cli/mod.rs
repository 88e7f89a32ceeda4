pub mod args;
pub mod reporter;

pub use args::Cli;
pub use reporter::ReportFormatter;

use crate::analyzer::{
    AnalysisOrchestrator, BatchOrchestrator, CredentialResolver, FallbackCredentialResolver,
    InMemoryHandRepository,
};
use crate::config::EngineConfig;
use crate::error::AnalysisError;
use crate::models::BatchRequest;
use std::sync::Arc;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_BATCH_FAILED: i32 = 1;
pub const EXIT_INVALID_ARGUMENTS: i32 = 2;
pub const EXIT_CREDENTIAL_REJECTED: i32 = 5;

pub struct CliHandler {
    cli: Cli,
}

impl CliHandler {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub async fn run(&self) -> Result<i32, AnalysisError> {
        let formatter = ReportFormatter::new(&self.cli);
        let provider = self.cli.get_provider()?;

        let config = self.engine_config();
        config.validate()?;

        // Step 1: Load hand records
        let repository = InMemoryHandRepository::from_json_file(&self.cli.hands)?;
        if self.cli.is_verbose() {
            eprintln!(
                "{}",
                formatter.format_progress(&format!(
                    "Loaded {} hands from {}",
                    repository.len(),
                    self.cli.hands.display()
                ))
            );
        }

        let orchestrator = Arc::new(AnalysisOrchestrator::with_defaults(
            config,
            Arc::new(repository),
        ));

        // Step 2: Credential check only
        if self.cli.validate_only {
            return self.validate_only(&orchestrator, &formatter).await;
        }

        // Step 3: Run the batch
        let request = BatchRequest::new(
            self.cli.hand_ids.clone(),
            &self.cli.owner,
            provider,
            self.cli.get_api_key(),
        )
        .with_analysis_type(self.cli.get_analysis_type()?)
        .with_experience_level(self.cli.get_experience_level()?);
        let request = if self.cli.session {
            request.with_session_analysis()
        } else {
            request
        };

        if self.cli.is_verbose() {
            eprintln!(
                "{}",
                formatter.format_progress(&format!(
                    "Analysing {} hands with {} ({})",
                    request.hand_ids.len(),
                    provider.display_name(),
                    orchestrator.default_model(provider)
                ))
            );
        }

        let batch = BatchOrchestrator::new(orchestrator)
            .batch_analyze(&request)
            .await;

        // Step 4: Report
        if self.cli.json {
            println!("{}", formatter.format_json(&batch)?);
        } else {
            println!("{}", formatter.format_batch_report(&request.hand_ids, &batch));
        }

        Ok(if batch.success {
            EXIT_SUCCESS
        } else {
            EXIT_BATCH_FAILED
        })
    }

    async fn validate_only(
        &self,
        orchestrator: &AnalysisOrchestrator,
        formatter: &ReportFormatter,
    ) -> Result<i32, AnalysisError> {
        let provider = self.cli.get_provider()?;

        let credential = match FallbackCredentialResolver::from_env().resolve(provider, &self.cli.get_api_key()) {
            Ok(resolved) => resolved,
            Err(e) => {
                eprintln!("{}", formatter.format_error(&e));
                return Ok(EXIT_CREDENTIAL_REJECTED);
            }
        };

        let valid = orchestrator
            .validate_credential(provider, &credential.secret)
            .await;
        println!("{}", formatter.format_validation(provider, valid));

        Ok(if valid {
            EXIT_SUCCESS
        } else {
            EXIT_CREDENTIAL_REJECTED
        })
    }

    fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::from_env().with_timeout(self.cli.get_timeout_seconds());
        match self.cli.chunk_size {
            Some(size) => config.with_chunk_size(size),
            None => config,
        }
    }
}
