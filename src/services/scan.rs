use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::model::catalog::{ResourceTree, KEY_SEPARATOR};
use crate::parsers::html_keys;
use crate::services::store::{self, LocaleStore};

#[derive(Debug, Serialize, Default)]
pub struct ScanReport {
    pub files: usize,
    pub keys: Vec<String>,
    /// Languages whose catalog was (or in a dry run, would be) rewritten.
    pub updated: Vec<String>,
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// `.html` files under `root`, skipping dot-entries and anything under `skip`.
pub fn html_files(root: &Path, skip: &Path) -> Vec<PathBuf> {
    let skip = skip.canonicalize().unwrap_or_else(|_| skip.to_path_buf());

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            !is_hidden(e)
                && e.path()
                    .canonicalize()
                    .map(|p| p != skip)
                    .unwrap_or(true)
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|s| s.to_str())
                .map(|s| s.eq_ignore_ascii_case("html"))
                .unwrap_or(false)
        })
        .collect();

    files.sort();
    files
}

pub fn scan_keys(files: &[PathBuf]) -> Result<BTreeSet<String>> {
    let mut keys = BTreeSet::new();
    for path in files {
        let html = fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        let found = html_keys::collect_keys(&html);
        debug!(path = %path.display(), count = found.len(), "scanned");
        keys.extend(found);
    }
    Ok(keys)
}

/// Inserts `""` at `key` unless something is already there.
/// Returns `false` when the path runs through an existing non-object value.
fn set_if_absent(tree: &mut ResourceTree, key: &str) -> bool {
    let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    let Some((last, parents)) = parts.split_last() else {
        return true;
    };

    let mut cur = tree;
    for p in parents {
        let slot = cur
            .entry(p.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        cur = match slot {
            Value::Object(m) => m,
            _ => return false,
        };
    }

    cur.entry(last.to_string())
        .or_insert_with(|| Value::String(String::new()));
    true
}

pub fn ensure_keys(tree: &mut ResourceTree, keys: &BTreeSet<String>) {
    for key in keys {
        if !set_if_absent(tree, key) {
            warn!(key = %key, "an existing value blocks this key; skipped");
        }
    }
}

pub fn sort_keys(tree: &ResourceTree) -> ResourceTree {
    let mut entries: Vec<(&String, &Value)> = tree.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    entries
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::Object(child) => Value::Object(sort_keys(child)),
                other => other.clone(),
            };
            (k.clone(), v)
        })
        .collect()
}

/// Ensures every scanned key exists in the base and every other catalog.
pub fn run(store: &LocaleStore, root: &Path, base_lang: &str, dry_run: bool) -> Result<ScanReport> {
    let files = html_files(root, &store.dir);
    let keys = scan_keys(&files)?;

    let mut langs = vec![base_lang.to_string()];
    langs.extend(store.discover_languages(base_lang)?);

    let mut report = ScanReport {
        files: files.len(),
        keys: keys.iter().cloned().collect(),
        updated: Vec::new(),
    };

    for lang in langs {
        let path = store.path(&lang);
        let mut tree = store.load(&lang)?;
        ensure_keys(&mut tree, &keys);
        let sorted = sort_keys(&tree);

        let rendered = store::render(&sorted)?;
        let on_disk = fs::read_to_string(&path).ok();
        if on_disk.as_deref() == Some(rendered.as_str()) {
            debug!(lang = %lang, "up to date");
            continue;
        }

        if !dry_run {
            store::write_catalog(&path, &sorted)?;
        }
        info!(lang = %lang, path = %path.display(), dry_run, "catalog updated");
        report.updated.push(lang);
    }

    Ok(report)
}
