use handlens::analyzer::registry::validate_credential_format;
use handlens::analyzer::{CredentialResolver, FallbackCredentialResolver};
use handlens::config::EngineConfig;
use handlens::error::{AnalysisError, ErrorKind};
use handlens::models::{redact_credential, scrub_credential, AnalysisResult, ProviderId};

#[test]
fn provider_error_text_is_scrubbed() {
    let credential = "sk-live-abcdefghijklmnopqrstuvwxyz";
    let raw = format!("401 Unauthorized: invalid key {} supplied", credential);

    let scrubbed = scrub_credential(&raw, credential);

    assert!(!scrubbed.contains(credential));
    assert!(scrubbed.contains("sk-live-…"));
}

#[test]
fn redaction_of_empty_and_short_credentials() {
    assert_eq!(redact_credential(""), "<none>");
    assert_eq!(redact_credential("abcdefgh"), "ab…");
}

#[test]
fn malformed_key_error_shows_prefix_only() {
    let key = "AIzaShort";
    let err = validate_credential_format(ProviderId::Gemini, key).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(!err.to_string().contains(key));
}

#[test]
fn unresolvable_credential_is_configuration_error() {
    let resolver = FallbackCredentialResolver::new(true);
    let err = resolver.resolve(ProviderId::Gemini, "").unwrap_err();

    assert!(matches!(err, AnalysisError::Configuration(_)));
    assert!(err.to_string().contains("GEMINI_API_KEY"));
}

#[test]
fn failed_result_carries_kind_and_message() {
    let cases = [
        (AnalysisError::Configuration("bad".into()), ErrorKind::Configuration),
        (AnalysisError::not_found("h9"), ErrorKind::DataNotFound),
        (
            AnalysisError::Validation {
                fields: vec!["id: missing".into()],
            },
            ErrorKind::Validation,
        ),
        (AnalysisError::Provider("quota".into()), ErrorKind::Provider),
        (AnalysisError::Aggregate("quota".into()), ErrorKind::Aggregate),
        (AnalysisError::Internal("panic".into()), ErrorKind::Internal),
    ];

    for (error, kind) in cases {
        let result = AnalysisResult::failure(ProviderId::OpenAi, &error);

        assert!(!result.success);
        assert!(result.content.is_none());
        assert_eq!(result.error_kind, Some(kind));
        assert_eq!(result.error_message(), error.to_string());
    }
}

#[test]
fn error_kind_serializes_snake_case() {
    let json = serde_json::to_string(&ErrorKind::DataNotFound).unwrap();
    assert_eq!(json, "\"data_not_found\"");
    assert_eq!(ErrorKind::DataNotFound.as_str(), "data_not_found");
}

#[test]
fn invalid_engine_config_is_rejected() {
    let err = EngineConfig::default().with_chunk_size(0).validate().unwrap_err();
    assert!(matches!(err, AnalysisError::Configuration(_)));
}

#[test]
fn unknown_provider_name_is_rejected() {
    assert!(ProviderId::from_str("anthropic").is_err());
    assert_eq!(ProviderId::from_str("GPT").unwrap(), ProviderId::OpenAi);
}
