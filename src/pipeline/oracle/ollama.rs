use serde::{Deserialize, Serialize};

use super::{classify_send_error, Oracle, OracleError};

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at a local Ollama instance.
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OracleError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    /// Check whether the configured model has been pulled.
    pub fn is_model_available(&self) -> Result<bool, OracleError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| model_matches(m, &self.model)))
    }

    pub fn list_models(&self) -> Result<Vec<String>, OracleError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| classify_send_error(&e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::from_status(status.as_u16(), body));
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| OracleError::Other(format!("Unreadable Ollama tag list: {e}")))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// `llama3` matches `llama3:latest`; a tagged name must match exactly.
fn model_matches(available: &str, wanted: &str) -> bool {
    if wanted.contains(':') {
        available == wanted
    } else {
        available == wanted || available.split(':').next() == Some(wanted)
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl Oracle for OllamaClient {
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        require_json: bool,
    ) -> Result<String, OracleError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: require_json.then_some("json"),
            options: OllamaOptions { temperature },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| classify_send_error(&e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::from_status(status.as_u16(), body));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| OracleError::Other(format!("Unreadable Ollama response: {e}")))?;

        Ok(parsed.response)
    }

    fn describe(&self) -> String {
        format!("ollama/{}", self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ollama_client_constructor() {
        let client = OllamaClient::new("http://localhost:11434", "gemma3:4b", 120).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.timeout_secs, 120);
        assert_eq!(client.describe(), "ollama/gemma3:4b");
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "m", 60).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn json_request_sets_format() {
        let body = OllamaGenerateRequest {
            model: "m",
            prompt: "p",
            stream: false,
            format: true.then_some("json"),
            options: OllamaOptions { temperature: 0.0 },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["format"], "json");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["temperature"], 0.0);
    }

    #[test]
    fn untagged_model_matches_any_tag() {
        assert!(model_matches("llama3:latest", "llama3"));
        assert!(model_matches("llama3", "llama3"));
        assert!(!model_matches("llama3.1:8b", "llama3"));
    }

    #[test]
    fn tagged_model_must_match_exactly() {
        assert!(model_matches("gemma3:4b", "gemma3:4b"));
        assert!(!model_matches("gemma3:27b", "gemma3:4b"));
    }
}
