use crate::generation::{GenerationEndpoint, GenerationRequest};
use crate::types::Context;
use log::{debug, info, warn};
use std::sync::Arc;

pub fn build_situation_prompt(situation_prompt: &str, context: &Context) -> String {
    format!(
        r#"Buatkan satu contoh kalimat singkat dalam Bahasa Indonesia yang wajar diucapkan pada situasi berikut.

Situasi: "{situation_prompt}"
Lawan bicara: "{context}"

Jawab hanya dengan kalimat tersebut, tanpa penjelasan dan tanpa tanda kutip."#
    )
}

/// Trims the reply, then drops one leading and one trailing `"`.
pub fn clean_generated_text(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix('"').unwrap_or(text);
    text.strip_suffix('"').unwrap_or(text)
}

/// Produces example input sentences. Never fails: any upstream problem
/// yields the situation prompt itself.
#[derive(Clone)]
pub struct SituationWriter {
    endpoint: Arc<dyn GenerationEndpoint>,
    model: String,
}

impl SituationWriter {
    pub fn new(endpoint: Arc<dyn GenerationEndpoint>, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
        }
    }

    pub async fn generate_example(&self, situation_prompt: &str, context: &Context) -> String {
        let prompt = build_situation_prompt(situation_prompt, context);
        debug!(
            "Generating example for context '{}' (prompt {} chars)",
            context,
            prompt.len()
        );

        match self
            .endpoint
            .generate(GenerationRequest::text(&self.model, prompt))
            .await
        {
            Ok(text) => {
                let cleaned = clean_generated_text(&text);
                if cleaned.is_empty() {
                    warn!("Example generation returned blank text, keeping the situation prompt");
                    return situation_prompt.to_string();
                }
                info!("Example generated: {} chars", cleaned.len());
                cleaned.to_string()
            }
            Err(e) => {
                warn!(
                    "Example generation failed: {}. Falling back to the situation prompt.",
                    e
                );
                situation_prompt.to_string()
            }
        }
    }
}
