use serde::Serialize;

use crate::error::Result;
use crate::model::catalog::{is_missing, FlatMap};
use crate::services::flatten::flatten;
use crate::services::store::LocaleStore;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct MissingKeys {
    pub lang: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct CoverageReport {
    pub languages: Vec<MissingKeys>,
}

impl CoverageReport {
    pub fn total_missing(&self) -> usize {
        self.languages.iter().map(|l| l.keys.len()).sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for l in &self.languages {
            if l.keys.is_empty() {
                out.push_str(&format!("\n[{}] OK\n", l.lang));
            } else {
                out.push_str(&format!("\n[{}] MISSING ({})\n", l.lang, l.keys.len()));
                for k in &l.keys {
                    out.push_str(&format!("  - {k}\n"));
                }
            }
        }
        out.push_str(&format!(
            "\nSummary: {} missing/blank keys across {} locales.\n",
            self.total_missing(),
            self.languages.len()
        ));
        out
    }
}

pub fn missing_keys(base: &FlatMap, target: &FlatMap) -> Vec<String> {
    base.keys()
        .filter(|k| is_missing(target.get(k.as_str())))
        .cloned()
        .collect()
}

pub fn run(store: &LocaleStore, base_lang: &str, targets: &[String]) -> Result<CoverageReport> {
    let base = flatten(&store.load_base(base_lang)?)?;
    let langs = store.resolve_targets(targets, base_lang)?;

    let mut report = CoverageReport::default();
    for lang in langs {
        let target = flatten(&store.load(&lang)?)?;
        report.languages.push(MissingKeys {
            keys: missing_keys(&base, &target),
            lang,
        });
    }
    Ok(report)
}
