use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*[^}]+\s*\}\}").expect("placeholder pattern"));

const TOKEN_PREFIX: &str = "__VAR_";
const TOKEN_SUFFIX: &str = "__";

/// A string with its `{{...}}` spans replaced by positional tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedText {
    pub text: String,
    pub vars: Vec<String>,
    /// Token prefix guaranteed not to occur in the unmasked source.
    pub prefix: String,
}

fn token(prefix: &str, idx: usize) -> String {
    format!("{prefix}{idx}{TOKEN_SUFFIX}")
}

/// Picks `__VAR_`, or `__VAR0_`, `__VAR1_`, ... if the source already contains it.
fn free_prefix(source: &str) -> String {
    if !source.contains(TOKEN_PREFIX) {
        return TOKEN_PREFIX.to_string();
    }
    let mut salt = 0usize;
    loop {
        let candidate = format!("__VAR{salt}_");
        if !source.contains(&candidate) {
            return candidate;
        }
        salt += 1;
    }
}

pub fn mask(source: &str) -> MaskedText {
    let prefix = free_prefix(source);
    let mut vars: Vec<String> = Vec::new();

    let text = PLACEHOLDER_RE
        .replace_all(source, |caps: &Captures| {
            vars.push(caps[0].to_string());
            token(&prefix, vars.len() - 1)
        })
        .into_owned();

    MaskedText { text, vars, prefix }
}

/// Single pass over `translated`: tokens are replaced by their recorded span,
/// substituted text is never rescanned. Unknown indices are left as-is.
pub fn unmask(translated: &str, masked: &MaskedText) -> String {
    if masked.vars.is_empty() {
        return translated.to_string();
    }

    let pattern = format!(
        "{}([0-9]+){}",
        regex::escape(&masked.prefix),
        regex::escape(TOKEN_SUFFIX)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return translated.to_string(),
    };

    re.replace_all(translated, |caps: &Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| masked.vars.get(i))
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}
