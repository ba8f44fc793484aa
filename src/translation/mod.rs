pub mod gemini;
pub mod traits;

pub use gemini::GeminiClient;
pub use traits::LanguageService;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

pub const UNTRANSLATED_MARKER: &str = "[UNTRANSLATED]";
pub const FAILED_MARKER: &str = "[TRANSLATION_FAILED]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    Translated,
    /// No service credential configured
    Untranslated,
    Failed,
}

/// Result of translating one field map into one language. Always the same
/// keys as the input.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub values: BTreeMap<String, String>,
    pub status: TranslationStatus,
    pub error: Option<String>,
}

/// Per-language report returned to admin callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageOutcome {
    pub language: String,
    pub status: TranslationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn language_name(code: &str) -> &str {
    match code {
        "el" => "Greek",
        "en" => "English",
        "sr" => "Serbian",
        "bg" => "Bulgarian",
        "de" => "German",
        "ro" => "Romanian",
        other => other,
    }
}

/// Translates Greek field maps. Never fails outward: errors turn every value
/// into a marked placeholder.
#[derive(Clone)]
pub struct Translator {
    service: Option<Arc<dyn LanguageService>>,
}

impl Translator {
    pub fn new(service: Option<Arc<dyn LanguageService>>) -> Self {
        Self { service }
    }

    pub async fn translate(&self, fields: &BTreeMap<String, String>, target: &str) -> Translation {
        let Some(service) = &self.service else {
            return Translation {
                values: mark_all(fields, UNTRANSLATED_MARKER),
                status: TranslationStatus::Untranslated,
                error: None,
            };
        };

        match self.request(service.as_ref(), fields, target).await {
            Ok(values) => Translation {
                values,
                status: TranslationStatus::Translated,
                error: None,
            },
            Err(e) => {
                warn!(service = service.service_name(), language = target, error = %e, "translation failed");
                Translation {
                    values: mark_all(fields, FAILED_MARKER),
                    status: TranslationStatus::Failed,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn request(
        &self,
        service: &dyn LanguageService,
        fields: &BTreeMap<String, String>,
        target: &str,
    ) -> anyhow::Result<BTreeMap<String, String>> {
        let payload = serde_json::to_string_pretty(fields)?;
        let prompt = format!(
            "Translate the values of the following JSON object from Greek to {language}.\n\
             Translate only the values. Keep every key and the JSON structure exactly as they are.\n\
             Respond with the JSON object only.\n\n{payload}",
            language = language_name(target),
        );

        let raw = service.generate(&prompt).await?;
        let parsed: BTreeMap<String, String> = serde_json::from_str(strip_code_fence(&raw))?;

        fields
            .keys()
            .map(|key| match parsed.get(key) {
                Some(value) => Ok((key.clone(), value.clone())),
                None => Err(anyhow::anyhow!("translation is missing key '{}'", key)),
            })
            .collect()
    }
}

fn mark_all(fields: &BTreeMap<String, String>, marker: &str) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|(key, text)| (key.clone(), format!("{marker} {text}")))
        .collect()
}

/// Remove a Markdown code fence the model may wrap structured output in.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}
