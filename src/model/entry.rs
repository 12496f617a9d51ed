use serde::{Deserialize, Serialize};

use crate::services::mask::MaskedText;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentMode {
    #[default]
    Plain,
    Html,
}

impl ContentMode {
    pub fn mime_type(self) -> &'static str {
        match self {
            ContentMode::Plain => "text/plain",
            ContentMode::Html => "text/html",
        }
    }
}

/// A base string that must be sent to the provider for one target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub key: String,
    pub mode: ContentMode,
    pub masked: MaskedText,
}

impl PendingEntry {
    pub fn source(&self) -> &str {
        &self.masked.text
    }
}
