use crate::cli::args::Cli;
use crate::error::AnalysisError;
use crate::models::{AnalysisResult, BatchResult, ProviderId};

pub struct ReportFormatter {
    use_colors: bool,
    verbose: bool,
}

impl ReportFormatter {
    pub fn new(cli: &Cli) -> Self {
        Self {
            use_colors: cli.should_use_color(),
            verbose: cli.is_verbose(),
        }
    }

    pub fn plain() -> Self {
        Self {
            use_colors: false,
            verbose: false,
        }
    }

    pub fn format_batch_report(&self, hand_ids: &[String], batch: &BatchResult) -> String {
        let mut output = String::new();

        output.push_str(&self.format_header(batch));
        output.push_str("\n\n");

        for (hand_id, result) in hand_ids.iter().zip(batch.results.iter()) {
            output.push_str(&self.format_result(&format!("Hand {}", hand_id), result));
            output.push_str("\n\n");
        }

        if let Some(ref session) = batch.session_result {
            output.push_str(&self.format_result("Session", session));
            output.push_str("\n\n");
        }

        if !batch.errors.is_empty() {
            let errors = batch
                .errors
                .iter()
                .enumerate()
                .map(|(i, e)| format!("{}. {}", i + 1, e))
                .collect::<Vec<_>>()
                .join("\n");
            output.push_str(&self.format_section("Errors", &errors));
            output.push('\n');
        }

        output
    }

    fn format_header(&self, batch: &BatchResult) -> String {
        let summary = format!(
            "{} of {} hands analysed ({} failed) in {} chunk(s), {}ms",
            batch.success_count,
            batch.total_jobs,
            batch.failure_count,
            batch.chunk_count,
            batch.processing_time_ms
        );

        if self.use_colors {
            format!("\x1b[1m\x1b[36m♠ ═══ Hand Analysis Report ═══ ♥\x1b[0m\n{}", summary)
        } else {
            format!("=== Hand Analysis Report ===\n{}", summary)
        }
    }

    pub fn format_result(&self, title: &str, result: &AnalysisResult) -> String {
        let mut body = String::new();

        if result.metadata.failover_used {
            let original = result
                .metadata
                .original_provider
                .map(|p| p.display_name())
                .unwrap_or("unknown");
            body.push_str(&format!(
                "Provider: {} (failed over from {})\n",
                result.provider_used.display_name(),
                original
            ));
        } else {
            body.push_str(&format!("Provider: {}\n", result.provider_used.display_name()));
        }

        if self.verbose {
            if let Some(ref model) = result.metadata.model {
                body.push_str(&format!("Model: {} ({}ms)\n", model, result.metadata.duration_ms));
            }
            if let Some(ref reason) = result.metadata.failover_reason {
                body.push_str(&format!("Failover reason: {}\n", reason));
            }
            if let Some(usage) = result.usage {
                body.push_str(&format!("Tokens: {}\n", usage.total_tokens));
            }
        }

        if result.success {
            let validation = &result.metadata.data_validation;
            if validation.checked && !validation.plausible {
                body.push_str(&self.colorize(
                    "\x1b[33m",
                    &format!(
                        "Warning: response may not match the hand ({})\n",
                        validation.issues.join("; ")
                    ),
                ));
            }
            body.push('\n');
            body.push_str(result.content.as_deref().unwrap_or_default());
        } else {
            body.push_str(&self.colorize(
                "\x1b[31m",
                &format!("Failed: {}", result.error_message()),
            ));
        }

        self.format_section(title, &body)
    }

    pub fn format_json(&self, batch: &BatchResult) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string_pretty(batch)?)
    }

    pub fn format_validation(&self, provider: ProviderId, valid: bool) -> String {
        if valid {
            self.colorize(
                "\x1b[1m\x1b[32m",
                &format!("✅ {} API key is valid", provider.display_name()),
            )
        } else {
            self.colorize(
                "\x1b[1m\x1b[31m",
                &format!("❌ {} API key was rejected", provider.display_name()),
            )
        }
    }

    fn format_section(&self, title: &str, content: &str) -> String {
        if self.use_colors {
            format!("\x1b[1m\x1b[37m{}\x1b[0m\n{}", title, content)
        } else {
            format!("{}\n{}\n{}", title, "-".repeat(title.chars().count()), content)
        }
    }

    fn colorize(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_error(&self, error: &AnalysisError) -> String {
        self.colorize("\x1b[1m\x1b[31m", &format!("❌ Error: {}", error))
    }

    pub fn format_progress(&self, message: &str) -> String {
        if self.use_colors {
            format!("\x1b[36m♠ {}\x1b[0m", message)
        } else {
            format!("♠ {}", message)
        }
    }
}
