use secrecy::SecretString;

use crate::pipeline::annotation::AnnotationError;

/// Application-level constants
pub const APP_NAME: &str = "cnergen";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the Gemini API key.
pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Default Gemini model used for extraction and correction.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

/// Default local Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default Ollama model when the local backend is selected.
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma3:4b";

/// Oracle HTTP timeout. Batch prompts of 50 sentences take a while to answer.
pub const ORACLE_TIMEOUT_SECS: u64 = 300;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "cnergen_lib=info,cnergen=info,warn"
}

/// Log filter used with `--verbose`.
pub fn verbose_log_filter() -> &'static str {
    "cnergen_lib=debug,cnergen=debug,warn"
}

/// Load `.env` from the working directory (if any) into the process environment.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Failed to load .env file"),
    }
}

/// Read the Gemini API key from the environment.
///
/// A missing or blank key is one of the fatal startup errors.
pub fn gemini_api_key() -> Result<SecretString, AnnotationError> {
    api_key_from(std::env::var(GEMINI_API_KEY_VAR).ok())
}

fn api_key_from(value: Option<String>) -> Result<SecretString, AnnotationError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(SecretString::from(key.trim().to_string())),
        _ => Err(AnnotationError::MissingCredentials(GEMINI_API_KEY_VAR)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn app_name_is_cnergen() {
        assert_eq!(APP_NAME, "cnergen");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn api_key_is_trimmed() {
        let key = api_key_from(Some("  abc123\n".into())).unwrap();
        assert_eq!(key.expose_secret(), "abc123");
    }

    #[test]
    fn blank_api_key_is_missing() {
        let err = api_key_from(Some("   ".into())).unwrap_err();
        assert!(matches!(err, AnnotationError::MissingCredentials(GEMINI_API_KEY_VAR)));
    }

    #[test]
    fn absent_api_key_is_missing() {
        assert!(api_key_from(None).is_err());
    }

    #[test]
    fn default_filter_targets_crate() {
        assert!(default_log_filter().contains("cnergen_lib=info"));
        assert!(verbose_log_filter().contains("cnergen_lib=debug"));
    }
}
