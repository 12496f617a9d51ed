use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One language's catalog as read from disk. Key order follows the file.
pub type ResourceTree = Map<String, Value>;

/// Dot-joined key path -> leaf value, in depth-first order of the tree.
pub type FlatMap = Map<String, Value>;

pub const KEY_SEPARATOR: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    /// `<dir>/<lang>/<namespace>.json`
    #[default]
    Nested,
    /// `<dir>/<lang>.json`
    Flat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocaleLayout {
    Nested { namespace: String },
    Flat,
}

impl LocaleLayout {
    pub fn new(kind: LayoutKind, namespace: &str) -> Self {
        match kind {
            LayoutKind::Nested => LocaleLayout::Nested {
                namespace: namespace.to_string(),
            },
            LayoutKind::Flat => LocaleLayout::Flat,
        }
    }

    pub fn catalog_path(&self, locales_dir: &Path, lang: &str) -> PathBuf {
        match self {
            LocaleLayout::Nested { namespace } => {
                locales_dir.join(lang).join(format!("{namespace}.json"))
            }
            LocaleLayout::Flat => locales_dir.join(format!("{lang}.json")),
        }
    }
}

/// A leaf is "missing" for a target when absent, null, the empty string or `{}`.
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Object(m)) => m.is_empty(),
        Some(_) => false,
    }
}
