use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SyncError};
use crate::model::catalog::LayoutKind;

pub const DEFAULT_CONFIG_FILE: &str = "locale-sync.toml";

fn default_from() -> String {
    "en".to_string()
}

fn default_locales_dir() -> PathBuf {
    PathBuf::from("assets/locales")
}

fn default_namespace() -> String {
    "translation".to_string()
}

fn default_provider() -> String {
    "google".to_string()
}

fn default_delay_ms() -> u64 {
    crate::services::translate::DEFAULT_DELAY_MS
}

/// Settings shared by every command. Values from the config file are
/// overridden by command-line flags.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_from")]
    pub from: String,

    #[serde(default)]
    pub to: Vec<String>,

    #[serde(default = "default_locales_dir")]
    pub locales_dir: PathBuf,

    #[serde(default)]
    pub layout: LayoutKind,

    #[serde(default = "default_namespace")]
    pub namespace: String,

    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            from: default_from(),
            to: Vec::new(),
            locales_dir: default_locales_dir(),
            layout: LayoutKind::default(),
            namespace: default_namespace(),
            provider: default_provider(),
            project: None,
            delay_ms: default_delay_ms(),
        }
    }
}

/// Flag values as given on the command line; `None` means "not passed".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub from: Option<String>,
    pub to: Option<String>,
    pub locales_dir: Option<PathBuf>,
    pub layout: Option<LayoutKind>,
    pub namespace: Option<String>,
    pub provider: Option<String>,
    pub project: Option<String>,
    pub delay_ms: Option<u64>,
}

impl Settings {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| SyncError::config(format!("invalid config: {e}")))
    }

    /// An explicit path must exist; otherwise `locale-sync.toml` is used when present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|e| SyncError::io(&path, e))?;
        Self::from_toml(&text)
            .map_err(|e| SyncError::config(format!("{}: {e}", path.display())))
    }

    pub fn apply(mut self, o: Overrides) -> Self {
        if let Some(v) = o.from {
            self.from = v;
        }
        if let Some(v) = o.to {
            self.to = split_csv(&v);
        }
        if let Some(v) = o.locales_dir {
            self.locales_dir = v;
        }
        if let Some(v) = o.layout {
            self.layout = v;
        }
        if let Some(v) = o.namespace {
            self.namespace = v;
        }
        if let Some(v) = o.provider {
            self.provider = v;
        }
        if o.project.is_some() {
            self.project = o.project;
        }
        if let Some(v) = o.delay_ms {
            self.delay_ms = v;
        }
        self
    }
}

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
