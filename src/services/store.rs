use std::fs;
use std::path::{Path, PathBuf};

use encoding_rs::UTF_8;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::model::catalog::{LocaleLayout, ResourceTree};

/// Catalog files of every language under one locales directory.
#[derive(Debug, Clone)]
pub struct LocaleStore {
    pub dir: PathBuf,
    pub layout: LocaleLayout,
}

impl LocaleStore {
    pub fn new(dir: impl Into<PathBuf>, layout: LocaleLayout) -> Self {
        Self {
            dir: dir.into(),
            layout,
        }
    }

    pub fn path(&self, lang: &str) -> PathBuf {
        self.layout.catalog_path(&self.dir, lang)
    }

    /// Missing files load as an empty tree.
    pub fn load(&self, lang: &str) -> Result<ResourceTree> {
        read_catalog(&self.path(lang))
    }

    pub fn load_base(&self, lang: &str) -> Result<ResourceTree> {
        let path = self.path(lang);
        let tree = read_catalog(&path)?;
        if tree.is_empty() {
            return Err(SyncError::config(format!(
                "base file not found or empty: {}",
                path.display()
            )));
        }
        Ok(tree)
    }

    pub fn save(&self, lang: &str, tree: &ResourceTree) -> Result<PathBuf> {
        let path = self.path(lang);
        write_catalog(&path, tree)?;
        Ok(path)
    }

    /// Languages present on disk, sorted, without `exclude`.
    pub fn discover_languages(&self, exclude: &str) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| SyncError::io(&self.dir, e))?;
        let mut langs: Vec<String> = Vec::new();

        for entry in entries.flatten() {
            let path = entry.path();
            let lang = match self.layout {
                LocaleLayout::Nested { .. } if path.is_dir() => {
                    path.file_name().and_then(|s| s.to_str()).map(str::to_string)
                }
                LocaleLayout::Flat
                    if path.is_file()
                        && path.extension().and_then(|s| s.to_str()) == Some("json") =>
                {
                    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
                }
                _ => None,
            };

            if let Some(lang) = lang {
                if lang != exclude && !lang.starts_with('.') {
                    langs.push(lang);
                }
            }
        }

        langs.sort();
        Ok(langs)
    }

    /// Explicit targets win; otherwise every language found on disk.
    pub fn resolve_targets(&self, explicit: &[String], base: &str) -> Result<Vec<String>> {
        let explicit: Vec<String> = explicit
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty() && s != base)
            .collect();

        if !explicit.is_empty() {
            return Ok(explicit);
        }
        self.discover_languages(base)
    }
}

pub fn read_catalog(path: &Path) -> Result<ResourceTree> {
    if !path.exists() {
        debug!(path = %path.display(), "catalog missing, using empty tree");
        return Ok(ResourceTree::new());
    }

    let bytes = fs::read(path).map_err(|e| SyncError::io(path, e))?;
    let text = decode(&bytes, path);
    if text.trim().is_empty() {
        return Ok(ResourceTree::new());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(SyncError::InvalidCatalog {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(SyncError::Json {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// BOM-aware decode; files without a BOM are read as UTF-8.
fn decode(bytes: &[u8], path: &Path) -> String {
    let (text, used, had_errors) = UTF_8.decode(bytes);
    if had_errors {
        warn!(path = %path.display(), encoding = used.name(), "catalog contains invalid byte sequences");
    }
    text.into_owned()
}

/// Pretty JSON, 2-space indent, trailing newline.
pub fn render(tree: &ResourceTree) -> Result<String> {
    let mut out = serde_json::to_string_pretty(tree).map_err(|e| SyncError::Json {
        path: PathBuf::new(),
        source: e,
    })?;
    out.push('\n');
    Ok(out)
}

pub fn write_catalog(path: &Path, tree: &ResourceTree) -> Result<()> {
    let json = render(tree)?;
    write_atomic(path, json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);

    if let Some(parent) = tmp.parent() {
        fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }

    fs::write(&tmp, bytes).map_err(|e| SyncError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(SyncError::io(path, e));
    }

    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.to_path_buf();
    let file_name = match path.file_name().and_then(|s| s.to_str()) {
        Some(n) => n.to_string(),
        None => "catalog".to_string(),
    };
    p.set_file_name(format!("{file_name}.tmp"));
    p
}
