use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::error::{Result, SyncError};
use crate::model::entry::ContentMode;

pub mod credentials;
pub mod google;

/// One call's worth of work for a provider.
#[derive(Debug, Clone, Copy)]
pub struct BatchRequest<'a> {
    pub source_lang: &'a str,
    pub target_lang: &'a str,
    pub mode: ContentMode,
    pub texts: &'a [&'a str],
}

/// A machine translation backend. Implementations must return exactly one
/// translated string per input, in input order.
pub trait Translator {
    fn translate_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
}

impl FromStr for Provider {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Provider::Google),
            other => Err(SyncError::config(format!(
                "unsupported provider `{other}` (supported: google)"
            ))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Google => f.write_str("google"),
        }
    }
}

pub struct ProviderConfig<'a> {
    pub project: Option<&'a str>,
}

impl Provider {
    pub fn connect(self, cfg: ProviderConfig<'_>) -> Result<Box<dyn Translator>> {
        match self {
            Provider::Google => {
                let project = cfg
                    .project
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| SyncError::config("set --project <GCP_PROJECT_ID>"))?;
                info!(provider = %self, project, "connecting to translation provider");
                Ok(Box::new(google::GoogleTranslator::from_env(project)?))
            }
        }
    }
}
