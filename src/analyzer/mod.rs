// Analyzer module - provider clients, failover and analysis orchestration

pub mod batch;
pub mod client_cache;
pub mod credentials;
pub mod failover;
pub mod llm_client;
pub mod orchestrator;
pub mod prompts;
pub mod registry;
pub mod repository;
pub mod validation;

pub use batch::BatchOrchestrator;
pub use client_cache::{ClientCache, ClientKey};
pub use credentials::{CredentialResolver, FallbackCredentialResolver, ResolvedCredential};
pub use failover::{FailoverCoordinator, FailoverState, ProviderSession};
pub use llm_client::{GenerationClient, RigGenerationClient};
pub use orchestrator::AnalysisOrchestrator;
pub use prompts::{FormattedPrompt, PromptFormatter, TemplatePromptFormatter};
pub use registry::{validate_credential_format, ClientFactory, ProviderRegistry};
pub use repository::{HandRepository, InMemoryHandRepository};
