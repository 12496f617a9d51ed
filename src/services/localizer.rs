use serde_json::Value;
use tracing::warn;

use crate::model::catalog::{ResourceTree, KEY_SEPARATOR};
use crate::services::store::LocaleStore;

/// The active language and its catalog. Switching languages produces a new
/// context instead of mutating shared state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocaleContext {
    pub lang: String,
    data: ResourceTree,
}

impl LocaleContext {
    pub fn new(lang: impl Into<String>, data: ResourceTree) -> Self {
        Self {
            lang: lang.into(),
            data,
        }
    }

    /// A catalog that fails to load leaves the context usable with no strings.
    pub fn load(store: &LocaleStore, lang: &str) -> Self {
        let data = match store.load(lang) {
            Ok(tree) => tree,
            Err(e) => {
                warn!(lang, error = %e, "locale load failed");
                ResourceTree::new()
            }
        };
        Self::new(lang, data)
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        let mut segs = key.split(KEY_SEPARATOR);
        let first = segs.next()?;
        let mut cur = self.data.get(first)?;
        for s in segs {
            cur = cur.as_object()?.get(s)?;
        }
        Some(cur)
    }

    /// Missing, null and empty values fall back to `fallback`, or to the key.
    pub fn t(&self, key: &str, fallback: Option<&str>) -> String {
        match self.lookup(key) {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s.is_empty() => {}
            Some(Value::String(s)) => return s.clone(),
            Some(other) => return other.to_string(),
        }
        fallback.unwrap_or(key).to_string()
    }
}

/// Stored choice first, then the first supported code the navigator language
/// starts with, then `default`.
pub fn preferred_language<'a>(
    stored: Option<&'a str>,
    navigator: &str,
    supported: &'a [&'a str],
    default: &'a str,
) -> &'a str {
    if let Some(s) = stored.filter(|s| !s.trim().is_empty()) {
        return s;
    }
    let nav = navigator.to_ascii_lowercase();
    supported
        .iter()
        .copied()
        .find(|code| nav.starts_with(&code.to_ascii_lowercase()))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::LocaleLayout;
    use serde_json::json;
    use std::fs;

    fn ctx(v: Value) -> LocaleContext {
        match v {
            Value::Object(m) => LocaleContext::new("ta", m),
            _ => unreachable!(),
        }
    }

    #[test]
    fn resolves_dotted_keys_with_fallbacks() {
        let c = ctx(json!({ "nav": { "home": "முகப்பு", "blank": "", "nil": null }, "n": 3 }));
        assert_eq!(c.t("nav.home", None), "முகப்பு");
        assert_eq!(c.t("nav.blank", Some("Blank")), "Blank");
        assert_eq!(c.t("nav.nil", None), "nav.nil");
        assert_eq!(c.t("nav.home.deeper", Some("x")), "x");
        assert_eq!(c.t("missing", None), "missing");
        assert_eq!(c.t("n", None), "3");
    }

    #[test]
    fn load_returns_new_context_and_degrades_on_error() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("hi.json"), json!({ "hello": "नमस्ते" }).to_string()).unwrap();
        fs::write(tmp.path().join("bad.json"), "{ not json").unwrap();
        let store = LocaleStore::new(tmp.path(), LocaleLayout::Flat);

        let en = LocaleContext::default();
        let hi = LocaleContext::load(&store, "hi");
        assert_eq!(en.lang, "");
        assert_eq!(hi.lang, "hi");
        assert_eq!(hi.t("hello", None), "नमस्ते");

        let bad = LocaleContext::load(&store, "bad");
        assert_eq!(bad.lang, "bad");
        assert_eq!(bad.t("hello", Some("Hello")), "Hello");
    }

    #[test]
    fn picks_preferred_language() {
        let supported = ["en", "ta", "te", "hi"];
        assert_eq!(preferred_language(Some("hi"), "ta-IN", &supported, "en"), "hi");
        assert_eq!(preferred_language(None, "te-IN", &supported, "en"), "te");
        assert_eq!(preferred_language(Some(""), "TA", &supported, "en"), "ta");
        assert_eq!(preferred_language(None, "fr-FR", &supported, "en"), "en");
    }
}
