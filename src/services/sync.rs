use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::Result;
use crate::model::catalog::{ResourceTree, KEY_SEPARATOR};
use crate::services::store::LocaleStore;

pub const PRUNE_ENV: &str = "PRUNE_UNUSED";

pub struct SyncOptions<'a> {
    pub base_lang: &'a str,
    pub targets: &'a [String],
    pub prune: bool,
    pub dry_run: bool,
}

#[derive(Debug, Serialize, Default, PartialEq, Eq)]
pub struct SyncLanguage {
    pub lang: String,
    pub added: usize,
    pub removed: usize,
    pub written: bool,
}

#[derive(Debug, Serialize, Default)]
pub struct SyncReport {
    pub languages: Vec<SyncLanguage>,
}

impl SyncReport {
    pub fn total_added(&self) -> usize {
        self.languages.iter().map(|l| l.added).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.languages.iter().map(|l| l.removed).sum()
    }
}

pub fn prune_from_env() -> bool {
    std::env::var(PRUNE_ENV).map(|v| v == "1").unwrap_or(false)
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}{KEY_SEPARATOR}{key}")
    }
}

/// Copies every base key the target lacks. Null base values become `""`.
/// A target leaf where the base has an object is kept as-is.
pub fn add_missing(base: &ResourceTree, target: &mut ResourceTree, prefix: &str) -> usize {
    let mut added = 0;

    for (k, v) in base {
        match v {
            Value::Object(child) => {
                let slot = target
                    .entry(k.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                match slot {
                    Value::Object(t) => added += add_missing(child, t, &join(prefix, k)),
                    _ => warn!(key = %join(prefix, k), "target has a value where base has a group; skipped"),
                }
            }
            _ => {
                if !target.contains_key(k) {
                    let value = if v.is_null() { Value::String(String::new()) } else { v.clone() };
                    target.insert(k.clone(), value);
                    added += 1;
                }
            }
        }
    }

    added
}

/// Removes target keys absent from the base, and groups left empty by it.
pub fn prune_extras(base: &ResourceTree, target: &mut ResourceTree) -> usize {
    let mut removed = 0;
    let keys: Vec<String> = target.keys().cloned().collect();

    for k in keys {
        let Some(base_value) = base.get(&k) else {
            target.shift_remove(&k);
            removed += 1;
            continue;
        };

        let emptied = match (target.get_mut(&k), base_value) {
            (Some(Value::Object(t)), Value::Object(b)) => {
                let had_entries = !t.is_empty();
                removed += prune_extras(b, t);
                had_entries && t.is_empty()
            }
            _ => false,
        };
        if emptied {
            target.shift_remove(&k);
        }
    }

    removed
}

pub fn run(store: &LocaleStore, opts: &SyncOptions<'_>) -> Result<SyncReport> {
    let base = store.load_base(opts.base_lang)?;
    let langs = store.resolve_targets(opts.targets, opts.base_lang)?;
    let mut report = SyncReport::default();

    if langs.is_empty() {
        warn!(dir = %store.dir.display(), "no target languages detected");
        return Ok(report);
    }

    for lang in langs {
        let mut current = store.load(&lang)?;
        let added = add_missing(&base, &mut current, "");
        let removed = if opts.prune {
            prune_extras(&base, &mut current)
        } else {
            0
        };

        let mut written = false;
        if (added > 0 || removed > 0) && !opts.dry_run {
            store.save(&lang, &current)?;
            written = true;
        }

        info!(lang = %lang, added, removed, written, "sync");
        report.languages.push(SyncLanguage {
            lang,
            added,
            removed,
            written,
        });
    }

    Ok(report)
}
