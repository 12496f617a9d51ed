use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::model::catalog::{is_missing, FlatMap, KEY_SEPARATOR};
use crate::model::entry::{ContentMode, PendingEntry};
use crate::services::mask;

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("html pattern"));

pub fn classify(text: &str) -> ContentMode {
    if HTML_TAG_RE.is_match(text) {
        ContentMode::Html
    } else {
        ContentMode::Plain
    }
}

/// What has to happen to one target catalog to cover the base key set.
#[derive(Debug, Default)]
pub struct TranslationPlan {
    /// Strings that need the provider, in base key order.
    pub pending: Vec<PendingEntry>,
    /// Keys filled without the provider (blank or non-string base values).
    pub copied: Vec<(String, Value)>,
}

impl TranslationPlan {
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.copied.is_empty()
    }

    pub fn pending_keys(&self) -> Vec<&str> {
        self.pending.iter().map(|p| p.key.as_str()).collect()
    }

    pub fn partition(&self) -> (Vec<&PendingEntry>, Vec<&PendingEntry>) {
        self.pending
            .iter()
            .partition(|p| p.mode == ContentMode::Plain)
    }
}

/// Proper prefixes of `key`, shortest first.
fn parents(key: &str) -> impl Iterator<Item = &str> {
    key.match_indices(KEY_SEPARATOR).map(move |(i, _)| &key[..i])
}

/// Paths that are groups in the target catalog.
fn target_groups(target: &FlatMap) -> HashSet<&str> {
    target.keys().flat_map(|k| parents(k)).collect()
}

/// Whether writing `key` would need to replace a target leaf with a group,
/// or a target group with a leaf.
fn blocked(key: &str, target: &FlatMap, groups: &HashSet<&str>) -> bool {
    if groups.contains(key) {
        return true;
    }
    parents(key).any(|p| match target.get(p) {
        None => false,
        Some(Value::Object(m)) => !m.is_empty(),
        Some(_) => true,
    })
}

/// Base keys whose path clashes with the target structure are skipped with a warning.
pub fn plan(base: &FlatMap, target: &FlatMap) -> TranslationPlan {
    let mut out = TranslationPlan::default();
    let groups = target_groups(target);

    for (key, value) in base {
        if !is_missing(target.get(key)) {
            continue;
        }
        if blocked(key, target, &groups) {
            warn!(key = %key, "target catalog has a conflicting value at this path; skipped");
            continue;
        }

        let source = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => {
                out.copied.push((key.clone(), other.clone()));
                continue;
            }
        };

        if source.trim().is_empty() {
            out.copied.push((key.clone(), Value::String(source)));
            continue;
        }

        out.pending.push(PendingEntry {
            key: key.clone(),
            mode: classify(&source),
            masked: mask::mask(&source),
        });
    }

    out
}

/// Applies the verbatim copies; returns how many target values actually changed.
pub fn apply_copies(plan: &TranslationPlan, target: &mut FlatMap) -> usize {
    let mut changed = 0;
    for (key, value) in &plan.copied {
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changed += 1;
        }
    }
    changed
}
