use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{classify_send_error, Oracle, OracleError};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` client.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: SecretString,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, model: &str, timeout_secs: u64) -> Result<Self, OracleError> {
        Self::with_base_url(GEMINI_BASE_URL, api_key, model, timeout_secs)
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(
        base_url: &str,
        api_key: SecretString,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OracleError::Other(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
            timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

/// Response body from `generateContent`
#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

fn build_request(prompt: &str, temperature: f32, require_json: bool) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature,
            response_mime_type: require_json.then_some("application/json"),
        },
    }
}

/// Concatenate the text parts of the first candidate.
fn first_candidate_text(response: GenerateContentResponse) -> Result<String, OracleError> {
    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| OracleError::Other("Gemini response has no candidates".into()))?;

    let text: String = content.parts.into_iter().map(|p| p.text).collect();
    if text.trim().is_empty() {
        return Err(OracleError::Other("Gemini response candidate is empty".into()));
    }
    Ok(text)
}

impl Oracle for GeminiClient {
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        require_json: bool,
    ) -> Result<String, OracleError> {
        let body = build_request(prompt, temperature, require_json);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .map_err(|e| classify_send_error(&e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::from_status(status.as_u16(), body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|e| OracleError::Other(format!("Unreadable Gemini response: {e}")))?;

        first_candidate_text(parsed)
    }

    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }
}
