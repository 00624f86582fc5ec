pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shape constraint for a JSON reply: an object whose named fields are all
/// required strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub required_string_fields: Vec<String>,
}

impl ResponseSchema {
    pub fn object_of_strings<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required_string_fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    pub response_schema: Option<ResponseSchema>,
}

impl GenerationRequest {
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            response_schema: None,
        }
    }

    pub fn json(model: impl Into<String>, prompt: impl Into<String>, schema: ResponseSchema) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            response_schema: Some(schema),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Request timeout - please try again")]
    Timeout,
    #[error("Network error - please check your connection")]
    Network(String),
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("No API key configured")]
    MissingApiKey,
    #[error("API quota exceeded - please check your account")]
    QuotaExceeded,
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    MalformedResponse(String),
    #[error("No text in response")]
    EmptyResponse,
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// A hosted text-generation service. Implementations return the generated
/// text as-is; callers own any parsing of it.
#[async_trait]
pub trait GenerationEndpoint: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError>;
}
