//! Indonesian to Javanese translation through the generation endpoint.
//!
//! The register suggested in the prompt is only a hint; the level the model
//! reports back is what ends up in the [`TranslationResult`].

use crate::generation::{GenerationEndpoint, GenerationRequest, ResponseSchema};
use crate::types::{Context, Register, TranslationResult, CONTEXT_ELDER, CONTEXT_PEER};
use log::{debug, error, info};
use std::sync::Arc;
use thiserror::Error;

pub const RESULT_FIELDS: [&str; 3] = ["translatedText", "level", "explanation"];

const ELDER_MARKERS: [&str; 8] = [
    "orang tua", "simbah", "mbah", "eyang", "kakek", "nenek", "mertua", "guru",
];
const PEER_MARKERS: [&str; 4] = ["teman", "sebaya", "kawan", "sahabat"];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("Teks masukan masih kosong.")]
    EmptyInput,
    #[error("Gagal menerjemahkan teks. Silakan coba lagi.")]
    Failed,
}

/// Register hinted to the model for `context`: elders get Krama Alus, peers
/// Ngoko, everyone else Krama Madya.
pub fn suggested_register(context: &Context) -> Register {
    let label = context.label();
    let lowered = label.to_lowercase();
    if label == CONTEXT_ELDER || ELDER_MARKERS.iter().any(|m| lowered.contains(m)) {
        Register::KramaAlus
    } else if label == CONTEXT_PEER || PEER_MARKERS.iter().any(|m| lowered.contains(m)) {
        Register::Ngoko
    } else {
        Register::KramaMadya
    }
}

pub fn build_translation_prompt(input_text: &str, context: &Context) -> String {
    let level = suggested_register(context);
    format!(
        r#"Anda adalah ahli bahasa Jawa.
Terjemahkan teks Bahasa Indonesia berikut ke dalam Bahasa Jawa dengan tingkatan yang tepat.

Teks Input: "{input_text}"
Target Konteks: "{context}"
Tingkatan yang Direkomendasikan: "{level}"

Ketentuan:
- Jika konteksnya "Orang Tua/Simbah", gunakan Krama Alus yang sangat sopan.
- Jika konteksnya "Teman Sebaya", gunakan Ngoko yang akrab.
- Jika konteksnya "Anak Kecil", gunakan bahasa yang mendidik dan mudah dimengerti (Ngoko Alus atau Krama Madya yang sederhana).
- Untuk konteks lain, sesuaikan tingkat kesopanan dengan hubungan tersebut.

Berikan respons dalam format JSON dengan struktur:
{{
  "translatedText": "hasil terjemahan",
  "level": "Tingkatan yang digunakan (Ngoko/Krama Madya/Krama Alus)",
  "explanation": "Penjelasan singkat mengapa gaya bahasa ini dipilih untuk konteks tersebut dalam 1 kalimat"
}}"#
    )
}

/// Parses the model's JSON reply. All three fields must be present as strings.
pub fn parse_translation(text: &str) -> Result<TranslationResult, serde_json::Error> {
    serde_json::from_str(text.trim())
}

#[derive(Clone)]
pub struct Translator {
    endpoint: Arc<dyn GenerationEndpoint>,
    model: String,
}

impl Translator {
    pub fn new(endpoint: Arc<dyn GenerationEndpoint>, model: impl Into<String>) -> Self {
        Self {
            endpoint,
            model: model.into(),
        }
    }

    /// Translates `input_text` for `context`. One upstream call, no retry.
    pub async fn translate(
        &self,
        input_text: &str,
        context: &Context,
    ) -> Result<TranslationResult, TranslateError> {
        if input_text.trim().is_empty() {
            return Err(TranslateError::EmptyInput);
        }

        let prompt = build_translation_prompt(input_text, context);
        debug!(
            "Translating {} chars for context '{}' (prompt {} chars)",
            input_text.len(),
            context,
            prompt.len()
        );

        let request =
            GenerationRequest::json(&self.model, prompt, ResponseSchema::object_of_strings(RESULT_FIELDS));

        let text = self.endpoint.generate(request).await.map_err(|e| {
            error!("Translation Error: {}", e);
            TranslateError::Failed
        })?;

        let result = parse_translation(&text).map_err(|e| {
            error!("Translation Error: reply is not a valid result: {}", e);
            TranslateError::Failed
        })?;

        info!("Translation successful: level={}", result.level);
        Ok(result)
    }
}
