use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::credentials;
use super::{BatchRequest, Translator};
use crate::error::{Result, SyncError};

const TIMEOUT_SECS: u64 = 60;
const ENDPOINT_BASE: &str = "https://translation.googleapis.com/v3";

/// Cloud Translation v3 `translateText`, authenticated with a bearer token.
pub struct GoogleTranslator {
    client: Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    #[serde(default)]
    translated_text: String,
}

pub fn endpoint_for(project: &str) -> String {
    format!("{ENDPOINT_BASE}/projects/{project}/locations/global:translateText")
}

impl GoogleTranslator {
    pub fn from_env(project: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::provider(e.to_string()))?;

        let token = credentials::resolve_access_token(&client)?;
        Ok(Self::with_token(client, project, token))
    }

    pub fn with_token(client: Client, project: &str, token: String) -> Self {
        Self {
            client,
            endpoint: endpoint_for(project),
            token,
        }
    }
}

impl Translator for GoogleTranslator {
    fn translate_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<String>> {
        let body = json!({
            "contents": req.texts,
            "mimeType": req.mode.mime_type(),
            "sourceLanguageCode": req.source_lang,
            "targetLanguageCode": req.target_lang,
        });

        debug!(
            target_lang = req.target_lang,
            count = req.texts.len(),
            mime = req.mode.mime_type(),
            "google translateText"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|e| SyncError::provider(e.to_string()))?;

        let status = resp.status();
        // Read as text first so error bodies survive a failed JSON parse.
        let text = resp
            .text()
            .map_err(|e| SyncError::provider(e.to_string()))?;

        if !status.is_success() {
            return Err(SyncError::provider(extract_error_message(status, &text)));
        }

        parse_translations(&text, req.texts.len())
    }
}

fn parse_translations(body: &str, expected: usize) -> Result<Vec<String>> {
    let parsed: TranslateResponse = serde_json::from_str(body)
        .map_err(|e| SyncError::provider(format!("invalid JSON from provider: {e}")))?;

    if parsed.translations.len() != expected {
        return Err(SyncError::provider(format!(
            "expected {expected} translations, provider returned {}",
            parsed.translations.len()
        )));
    }

    Ok(parsed
        .translations
        .into_iter()
        .map(|t| t.translated_text)
        .collect())
}

pub(crate) fn extract_error_message(status: StatusCode, body_text: &str) -> String {
    // Google: { "error": { "message": "..." } }; OAuth: { "error_description": "..." }
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body_text) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
        if let Some(msg) = v.get("error_description").and_then(|m| m.as_str()) {
            return format!("HTTP {}: {}", status.as_u16(), msg);
        }
    }

    let trimmed = body_text.trim();
    let snippet: String = if trimmed.chars().count() > 400 {
        let head: String = trimmed.chars().take(400).collect();
        format!("{head}...")
    } else {
        trimmed.to_string()
    };

    format!("HTTP {}: {}", status.as_u16(), snippet)
}
