use crate::models::{
    scrub_credential, GenerationRequest, GenerationResponse, ProviderCapabilities, ProviderId,
    TokenUsage,
};
use rig::client::CompletionClient;
use rig::completion::{AssistantContent, CompletionModel};
use rig::providers::{gemini, openai};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tracing::debug;

pub const PROBE_SYSTEM_PROMPT: &str = "You are a connectivity check.";
pub const PROBE_USER_PROMPT: &str = "Reply with the single word OK.";
pub const PROBE_MAX_TOKENS: u32 = 10;

/// One interchangeable text-generation backend.
///
/// `generate` never fails at the type level: provider and transport errors
/// come back as a response with `success == false`. `validate` is a separate
/// entry point so that credential checks can be told apart from real work.
pub trait GenerationClient: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = GenerationResponse> + Send + 'a>>;

    /// Valid iff one minimal generation succeeds with non-empty content.
    fn validate<'a>(&'a self) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

    fn provider(&self) -> ProviderId;

    fn model_name(&self) -> &str;
}

pub fn probe_request() -> GenerationRequest {
    GenerationRequest::new(PROBE_SYSTEM_PROMPT, PROBE_USER_PROMPT)
        .with_temperature(0.0)
        .with_max_tokens(PROBE_MAX_TOKENS)
}

/// Reasoning models reject an explicit temperature.
pub fn accepts_temperature(model_name: &str) -> bool {
    !model_name.starts_with("gpt-5") && !model_name.starts_with("o1")
}

pub struct RigGenerationClient {
    provider: ProviderId,
    model: String,
    credential: String,
    capabilities: ProviderCapabilities,
    timeout: Duration,
    backend: RigBackend,
}

enum RigBackend {
    OpenAi(openai::Client),
    Gemini(gemini::Client),
}

impl RigGenerationClient {
    /// Builds the client without touching the network. Credential format
    /// is expected to have been checked by the registry already.
    pub fn new(provider: ProviderId, credential: &str, model: &str, timeout: Duration) -> Self {
        let backend = match provider {
            ProviderId::OpenAi => RigBackend::OpenAi(openai::Client::new(credential)),
            ProviderId::Gemini => RigBackend::Gemini(gemini::Client::new(credential)),
        };

        Self {
            provider,
            model: model.to_string(),
            credential: credential.to_string(),
            capabilities: provider.capabilities(),
            timeout,
            backend,
        }
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<(String, TokenUsage), String> {
        let model_name = request.model.as_deref().unwrap_or(&self.model);
        let max_tokens = request.max_tokens.min(self.capabilities.max_tokens);

        // Providers without a system role get one concatenated prompt.
        let (prompt, preamble) = if self.capabilities.supports_system_prompt {
            (request.user_text.clone(), Some(request.system_text.clone()))
        } else {
            (request.combined_prompt(), None)
        };

        match &self.backend {
            RigBackend::OpenAi(client) => {
                let model = client.completion_model(model_name);
                self.send_completion_request(
                    model,
                    model_name,
                    &prompt,
                    preamble,
                    request.temperature,
                    max_tokens,
                )
                .await
            }
            RigBackend::Gemini(client) => {
                let model = client.completion_model(model_name);
                self.send_completion_request(
                    model,
                    model_name,
                    &prompt,
                    preamble,
                    request.temperature,
                    max_tokens,
                )
                .await
            }
        }
    }

    async fn send_completion_request<M: CompletionModel>(
        &self,
        model: M,
        model_name: &str,
        prompt: &str,
        preamble: Option<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<(String, TokenUsage), String> {
        let mut builder = model.completion_request(prompt);

        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }

        if accepts_temperature(model_name) {
            builder = builder.temperature(temperature as f64);
        }

        builder = builder.max_tokens(max_tokens as u64);

        let response = tokio::time::timeout(self.timeout, builder.send())
            .await
            .map_err(|_| format!("request timed out after {} seconds", self.timeout.as_secs()))?
            .map_err(|e| format!("request failed: {}", e))?;

        let mut extracted_text = String::new();
        for content in response.choice.iter() {
            if let AssistantContent::Text(text_content) = content {
                extracted_text.push_str(&text_content.text);
            }
        }

        let usage = TokenUsage {
            prompt_tokens: response.usage.input_tokens,
            completion_tokens: response.usage.output_tokens,
            total_tokens: response.usage.total_tokens,
        };

        Ok((extracted_text, usage))
    }
}

impl GenerationClient for RigGenerationClient {
    fn generate<'a>(
        &'a self,
        request: &'a GenerationRequest,
    ) -> Pin<Box<dyn Future<Output = GenerationResponse> + Send + 'a>> {
        Box::pin(async move {
            let start_time = Instant::now();
            let outcome = self.complete(request).await;
            let duration_ms = start_time.elapsed().as_millis() as u64;

            let response = match outcome {
                Ok((text, _)) if text.trim().is_empty() => GenerationResponse::failed(format!(
                    "{} returned an empty response",
                    self.provider
                )),
                Ok((text, usage)) => GenerationResponse::succeeded(text).with_usage(usage),
                Err(e) => GenerationResponse::failed(format!(
                    "{} {}",
                    self.provider,
                    scrub_credential(&e, &self.credential)
                )),
            };

            debug!(
                provider = %self.provider,
                model = %self.model,
                success = response.success,
                duration_ms,
                "generation finished"
            );

            response
                .with_metadata("model", request.model.clone().unwrap_or_else(|| self.model.clone()))
                .with_metadata("duration_ms", duration_ms)
        })
    }

    fn validate<'a>(&'a self) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(async move {
            let probe = probe_request();
            match self.complete(&probe).await {
                Ok((text, _)) => !text.trim().is_empty(),
                Err(e) => {
                    debug!(
                        provider = %self.provider,
                        error = %scrub_credential(&e, &self.credential),
                        "credential probe failed"
                    );
                    false
                }
            }
        })
    }

    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
