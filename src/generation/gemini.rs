use super::{GenerationEndpoint, GenerationError, GenerationRequest, ResponseSchema};
use async_trait::async_trait;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

pub const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
const CONNECTION_TEST_TIMEOUT_SECS: u64 = 10;
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    status: Option<String>,
    #[allow(dead_code)]
    code: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: GEMINI_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Client for the `generateContent` endpoint of the Generative Language API.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, GenerationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Client(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Request URL for `model`. The key goes in a header, never in the URL.
    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn send(
        &self,
        model: &str,
        request: &GeminiRequest,
        timeout: Option<Duration>,
    ) -> Result<String, GenerationError> {
        if self.config.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let mut builder = self
            .http
            .post(self.endpoint(model))
            .header("Content-Type", "application/json")
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            let e = e.without_url();
            error!("Gemini API request failed: {}", e);
            if e.is_timeout() {
                GenerationError::Timeout
            } else if e.is_connect() {
                GenerationError::Network(e.to_string())
            } else {
                GenerationError::Network(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| {
                GenerationError::Network(format!("Failed to read response: {}", e.without_url()))
            })?;

        debug!("Gemini API response status: {}", status);

        if !status.is_success() {
            error!("Gemini API error: status={}, body={}", status, response_text);
            return Err(map_error_body(status.as_u16(), &response_text));
        }

        extract_text(&response_text)
    }

    /// Transcribes a base64 WAV clip. `language` is a BCP 47 tag such as `id-ID`.
    pub async fn transcribe(
        &self,
        wav_base64: String,
        model: &str,
        language: Option<&str>,
    ) -> Result<String, GenerationError> {
        info!(
            "Gemini transcribe: model={}, audio_chars={}, language={:?}",
            model,
            wav_base64.len(),
            language
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: "audio/wav".to_string(),
                            data: wav_base64,
                        },
                    },
                    GeminiPart::Text {
                        text: build_transcription_prompt(language),
                    },
                ],
            }],
            generation_config: None,
        };

        let text = self.send(model, &request, None).await?;
        info!("Transcription successful: {} chars", text.len());
        Ok(text.trim().to_string())
    }

    pub async fn test_connection(&self, model: &str) -> Result<bool, GenerationError> {
        info!("Testing Gemini API connection");

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart::Text {
                    text: "Say 'ok'".to_string(),
                }],
            }],
            generation_config: None,
        };

        self.send(
            model,
            &request,
            Some(Duration::from_secs(CONNECTION_TEST_TIMEOUT_SECS)),
        )
        .await?;
        info!("Gemini API connection test successful");
        Ok(true)
    }
}

#[async_trait]
impl GenerationEndpoint for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        info!(
            "Gemini generate: model={}, prompt_chars={}, json={}",
            request.model,
            request.prompt.len(),
            request.response_schema.is_some()
        );
        let body = build_request(&request);
        let text = self.send(&request.model, &body, None).await?;
        info!("Generation successful: {} chars", text.len());
        Ok(text)
    }
}

fn build_transcription_prompt(language: Option<&str>) -> String {
    let base_prompt =
        "Transcribe this audio accurately. Return only the transcription text, nothing else.";

    match language {
        Some(lang) => format!(
            "{} The audio is in {} language. Transcribe in that language.",
            base_prompt, lang
        ),
        None => base_prompt.to_string(),
    }
}

fn build_request(request: &GenerationRequest) -> GeminiRequest {
    GeminiRequest {
        contents: vec![GeminiContent {
            parts: vec![GeminiPart::Text {
                text: request.prompt.clone(),
            }],
        }],
        generation_config: request
            .response_schema
            .as_ref()
            .map(|schema| GeminiGenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema_to_gemini(schema),
            }),
    }
}

fn schema_to_gemini(schema: &ResponseSchema) -> serde_json::Value {
    let properties: serde_json::Map<String, serde_json::Value> = schema
        .required_string_fields
        .iter()
        .map(|field| (field.clone(), json!({ "type": "STRING" })))
        .collect();

    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": schema.required_string_fields,
    })
}

fn extract_text(response_text: &str) -> Result<String, GenerationError> {
    let gemini_response: GeminiResponse = serde_json::from_str(response_text)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    if let Some(error) = gemini_response.error {
        return Err(GenerationError::Api {
            status: 200,
            message: error.message,
        });
    }

    let text: String = gemini_response
        .candidates
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

fn map_error_body(status: u16, response_text: &str) -> GenerationError {
    if let Ok(gemini_response) = serde_json::from_str::<GeminiResponse>(response_text) {
        if let Some(error) = gemini_response.error {
            return match error.status.as_deref() {
                Some("INVALID_ARGUMENT") if error.message.contains("API key") => {
                    GenerationError::InvalidApiKey
                }
                Some("PERMISSION_DENIED") => GenerationError::InvalidApiKey,
                Some("RESOURCE_EXHAUSTED") => GenerationError::QuotaExceeded,
                _ => GenerationError::Api {
                    status,
                    message: error.message,
                },
            };
        }
    }

    if (status == 400 || status == 403) && response_text.contains("API key") {
        return GenerationError::InvalidApiKey;
    }

    GenerationError::Api {
        status,
        message: response_text.to_string(),
    }
}
