//! Best-effort extraction of translation keys from `data-i18n*` attributes.
//! This is a regex scan, not a markup parser; malformed markup may be missed.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bdata-i18n(-html|-placeholder|-title)?\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("data-i18n pattern")
});

static TARGET_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[[^\]]+\]").expect("attribute prefix pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAttr {
    Text,
    Html,
    Placeholder,
    Title,
}

impl KeyAttr {
    fn from_suffix(suffix: Option<&str>) -> Self {
        match suffix {
            Some("-html") => KeyAttr::Html,
            Some("-placeholder") => KeyAttr::Placeholder,
            Some("-title") => KeyAttr::Title,
            _ => KeyAttr::Text,
        }
    }
}

/// Every (attribute, key) reference in document order.
pub fn references(html: &str) -> Vec<(KeyAttr, String)> {
    let mut out = Vec::new();

    for caps in ATTR_RE.captures_iter(html) {
        let attr = KeyAttr::from_suffix(caps.get(1).map(|m| m.as_str()));
        let raw = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or("");

        match attr {
            // `data-i18n="[title]nav.tip;nav.label"`
            KeyAttr::Text => {
                for part in raw.split(';') {
                    let key = TARGET_PREFIX_RE.replace(part.trim(), "");
                    let key = key.trim();
                    if !key.is_empty() {
                        out.push((attr, key.to_string()));
                    }
                }
            }
            _ => {
                let key = raw.trim();
                if !key.is_empty() {
                    out.push((attr, key.to_string()));
                }
            }
        }
    }

    out
}

pub fn collect_keys(html: &str) -> BTreeSet<String> {
    references(html).into_iter().map(|(_, k)| k).collect()
}
