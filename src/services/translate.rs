use std::{thread, time::Duration};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Result, SyncError};
use crate::model::catalog::FlatMap;
use crate::model::entry::PendingEntry;
use crate::services::diff::{self, TranslationPlan};
use crate::services::flatten::{flatten, unflatten};
use crate::services::mask;
use crate::services::provider::{BatchRequest, Translator};
use crate::services::store::LocaleStore;

/// Upper bound on strings per provider request.
pub const BATCH_SIZE: usize = 100;
pub const DEFAULT_DELAY_MS: u64 = 200;

pub struct TranslateOptions<'a> {
    pub base_lang: &'a str,
    pub targets: &'a [String],
    pub dry_run: bool,
    /// Pause between two consecutive provider calls.
    pub delay: Duration,
}

#[derive(Debug, Serialize, Default, PartialEq, Eq)]
pub struct LanguageReport {
    pub lang: String,
    pub pending: usize,
    pub copied: usize,
    pub translated: usize,
    pub provider_calls: usize,
    pub written: bool,
    /// Keys that were (or in a dry run, would be) sent to the provider.
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize, Default)]
pub struct TranslateReport {
    pub dry_run: bool,
    pub languages: Vec<LanguageReport>,
}

impl TranslateReport {
    pub fn total_pending(&self) -> usize {
        self.languages.iter().map(|l| l.pending).sum()
    }
}

/// Spaces provider calls by a fixed delay; the first call of a run is not delayed.
pub struct Pacer {
    delay: Duration,
    calls: usize,
}

impl Pacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, calls: 0 }
    }

    fn before_call(&mut self) {
        if self.calls > 0 && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.calls += 1;
    }
}

/// Sends `pending` in batches of at most [`BATCH_SIZE`], plain strings first,
/// then HTML, and writes the unmasked results into `target`.
/// Returns the number of provider calls made.
pub fn translate_pending(
    translator: &dyn Translator,
    source_lang: &str,
    target_lang: &str,
    plan: &TranslationPlan,
    pacer: &mut Pacer,
    target: &mut FlatMap,
) -> Result<usize> {
    let (plain, html) = plan.partition();
    let start = pacer.calls;

    for group in [plain, html] {
        for batch in group.chunks(BATCH_SIZE) {
            let mode = batch[0].mode;
            let texts: Vec<&str> = batch.iter().map(|p| p.source()).collect();

            pacer.before_call();
            debug!(target_lang, mode = mode.mime_type(), size = texts.len(), "submitting batch");

            let results = translator.translate_batch(&BatchRequest {
                source_lang,
                target_lang,
                mode,
                texts: &texts,
            })?;

            if results.len() != batch.len() {
                return Err(SyncError::provider(format!(
                    "expected {} translations for {target_lang}, got {}",
                    batch.len(),
                    results.len()
                )));
            }

            merge(batch, results, target);
        }
    }

    Ok(pacer.calls - start)
}

fn merge(batch: &[&PendingEntry], results: Vec<String>, target: &mut FlatMap) {
    for (entry, translated) in batch.iter().zip(results) {
        let value = mask::unmask(&translated, &entry.masked);
        target.insert(entry.key.clone(), Value::String(value));
    }
}

/// Translates every target language in turn. The provider is only connected
/// once some language actually has strings to send, so dry runs and up-to-date
/// catalogs never need credentials.
pub fn run<F>(store: &LocaleStore, opts: &TranslateOptions<'_>, mut connect: F) -> Result<TranslateReport>
where
    F: FnMut() -> Result<Box<dyn Translator>>,
{
    let base = store.load_base(opts.base_lang)?;
    let base_flat = flatten(&base)?;

    let langs = store.resolve_targets(opts.targets, opts.base_lang)?;
    if langs.is_empty() {
        return Err(SyncError::config(format!(
            "no target languages detected under {}; pass --to",
            store.dir.display()
        )));
    }

    let mut report = TranslateReport {
        dry_run: opts.dry_run,
        languages: Vec::with_capacity(langs.len()),
    };
    let mut translator: Option<Box<dyn Translator>> = None;
    let mut pacer = Pacer::new(opts.delay);

    for lang in &langs {
        let current = store.load(lang)?;
        let mut target_flat = flatten(&current)?;
        let plan = diff::plan(&base_flat, &target_flat);

        let mut lang_report = LanguageReport {
            lang: lang.clone(),
            pending: plan.pending.len(),
            copied: plan.copied.len(),
            keys: plan.pending_keys().into_iter().map(str::to_string).collect(),
            ..LanguageReport::default()
        };

        if plan.is_empty() {
            info!(lang = %lang, "nothing to translate");
            report.languages.push(lang_report);
            continue;
        }

        if opts.dry_run {
            info!(lang = %lang, count = plan.pending.len(), "dry run: would translate");
            report.languages.push(lang_report);
            continue;
        }

        let mut changed = diff::apply_copies(&plan, &mut target_flat);

        if !plan.pending.is_empty() {
            let t = match translator.take() {
                Some(t) => t,
                None => connect()?,
            };
            info!(lang = %lang, count = plan.pending.len(), "translating");
            let calls = translate_pending(
                t.as_ref(),
                opts.base_lang,
                lang,
                &plan,
                &mut pacer,
                &mut target_flat,
            );
            translator = Some(t);
            lang_report.provider_calls = calls?;
            lang_report.translated = plan.pending.len();
            changed += plan.pending.len();
        }

        if changed > 0 {
            let merged = unflatten(&target_flat)?;
            let path = store.save(lang, &merged)?;
            lang_report.written = true;
            info!(lang = %lang, path = %path.display(), translated = lang_report.translated, "catalog written");
        }

        report.languages.push(lang_report);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::{LayoutKind, LocaleLayout};
    use crate::model::entry::ContentMode;
    use serde_json::json;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    /// Records every call and answers with `<lang>:<text>`.
    #[derive(Default)]
    struct EchoTranslator {
        pub calls: RefCell<Vec<(String, ContentMode, Vec<String>)>>,
    }

    impl Translator for EchoTranslator {
        fn translate_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<String>> {
            let texts: Vec<String> = req.texts.iter().map(|s| s.to_string()).collect();
            self.calls
                .borrow_mut()
                .push((req.target_lang.to_string(), req.mode, texts.clone()));
            Ok(texts
                .into_iter()
                .map(|t| format!("{}:{}", req.target_lang, t))
                .collect())
        }
    }

    impl Translator for std::rc::Rc<EchoTranslator> {
        fn translate_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<String>> {
            self.as_ref().translate_batch(req)
        }
    }

    /// Echoes every language except `fail_on`, which gets a quota error.
    struct FailOn {
        fail_on: &'static str,
    }

    impl Translator for FailOn {
        fn translate_batch(&self, req: &BatchRequest<'_>) -> Result<Vec<String>> {
            if req.target_lang == self.fail_on {
                return Err(SyncError::provider("HTTP 429: quota exceeded"));
            }
            EchoTranslator::default().translate_batch(req)
        }
    }

    fn flat_store(dir: &Path) -> LocaleStore {
        LocaleStore::new(dir, LocaleLayout::new(LayoutKind::Flat, "translation"))
    }

    fn write(dir: &Path, lang: &str, v: serde_json::Value) {
        fs::write(dir.join(format!("{lang}.json")), v.to_string()).unwrap();
    }

    fn opts<'a>(targets: &'a [String], dry_run: bool) -> TranslateOptions<'a> {
        TranslateOptions {
            base_lang: "en",
            targets,
            dry_run,
            delay: Duration::ZERO,
        }
    }

    fn read(dir: &Path, lang: &str) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(dir.join(format!("{lang}.json"))).unwrap()).unwrap()
    }

    #[test]
    fn placeholder_survives_translation() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "en", json!({ "a": { "b": "Hello {{name}}" } }));
        write(tmp.path(), "ta", json!({}));

        let echo = std::rc::Rc::new(EchoTranslator::default());
        let handle = echo.clone();
        let report = run(&flat_store(tmp.path()), &opts(&[], false), || {
            Ok(Box::new(handle.clone()) as Box<dyn Translator>)
        })
        .unwrap();

        assert_eq!(report.languages[0].translated, 1);
        assert_eq!(read(tmp.path(), "ta"), json!({ "a": { "b": "ta:Hello {{name}}" } }));
        assert_eq!(echo.calls.borrow()[0].2, vec!["Hello __VAR_0__"]);
    }

    #[test]
    fn existing_values_are_not_resent() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "en", json!({ "x": "1", "y": "2" }));
        write(tmp.path(), "hi", json!({ "x": "1-already" }));

        let echo = std::rc::Rc::new(EchoTranslator::default());
        let handle = echo.clone();
        run(&flat_store(tmp.path()), &opts(&[], false), || {
            Ok(Box::new(handle.clone()) as Box<dyn Translator>)
        })
        .unwrap();

        let calls = echo.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2, vec!["2"]);
        assert_eq!(read(tmp.path(), "hi"), json!({ "x": "1-already", "y": "hi:2" }));
    }

    #[test]
    fn second_run_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "en", json!({ "a": "A", "blank": " ", "nested": { "b": "B" } }));
        write(tmp.path(), "ml", json!({}));
        let store = flat_store(tmp.path());

        let echo = std::rc::Rc::new(EchoTranslator::default());
        let handle = echo.clone();
        let first = run(&store, &opts(&[], false), || {
            Ok(Box::new(handle.clone()) as Box<dyn Translator>)
        })
        .unwrap();
        assert!(first.languages[0].written);
        let after_first = fs::read_to_string(tmp.path().join("ml.json")).unwrap();

        let second = run(&store, &opts(&[], false), || {
            panic!("provider must not be contacted")
        })
        .unwrap();
        assert!(!second.languages[0].written);
        assert_eq!(second.total_pending(), 0);
        assert_eq!(fs::read_to_string(tmp.path().join("ml.json")).unwrap(), after_first);
        assert_eq!(echo.calls.borrow().len(), 1);
    }

    #[test]
    fn blank_base_values_are_copied_without_provider() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "en", json!({ "a": "  ", "b": "" }));
        let targets = vec!["kn".to_string()];
        let report = run(&flat_store(tmp.path()), &opts(&targets, false), || {
            panic!("provider must not be contacted")
        })
        .unwrap();
        assert_eq!(report.languages[0].copied, 2);
        assert_eq!(read(tmp.path(), "kn"), json!({ "a": "  ", "b": "" }));
    }

    #[test]
    fn dry_run_reports_and_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "en",
            json!({ "k1": "1", "k2": "2", "k3": "3", "k4": "4", "k5": "5", "k6": "6" }),
        );
        write(tmp.path(), "te", json!({ "k6": "six" }));
        let before = fs::read_to_string(tmp.path().join("te.json")).unwrap();

        let report = run(&flat_store(tmp.path()), &opts(&[], true), || {
            panic!("dry run must not connect")
        })
        .unwrap();

        assert_eq!(report.languages[0].pending, 5);
        assert_eq!(report.languages[0].keys, vec!["k1", "k2", "k3", "k4", "k5"]);
        assert!(!report.languages[0].written);
        assert_eq!(fs::read_to_string(tmp.path().join("te.json")).unwrap(), before);
    }

    #[test]
    fn splits_into_capped_batches_in_order() {
        let mut base = serde_json::Map::new();
        for i in 0..250 {
            base.insert(format!("k{i:03}"), json!(format!("text {i} {{{{n}}}}")));
        }
        let plan = diff::plan(&base, &FlatMap::new());
        let echo = EchoTranslator::default();
        let mut target = FlatMap::new();

        let calls = translate_pending(&echo, "en", "pa", &plan, &mut Pacer::new(Duration::ZERO), &mut target).unwrap();

        assert_eq!(calls, 3);
        let sizes: Vec<usize> = echo.calls.borrow().iter().map(|c| c.2.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
        assert_eq!(echo.calls.borrow()[1].2[0], "text 100 __VAR_0__");
        assert_eq!(target["k000"], json!("pa:text 0 {{n}}"));
        assert_eq!(target["k249"], json!("pa:text 249 {{n}}"));
        let keys: Vec<&String> = target.keys().collect();
        assert_eq!(keys.first().map(|k| k.as_str()), Some("k000"));
        assert_eq!(target.len(), 250);
    }

    #[test]
    fn html_is_sent_separately_with_html_mode() {
        let base = match json!({ "p1": "One", "h": "<b>Bold</b>", "p2": "Two" }) {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        };
        let plan = diff::plan(&base, &FlatMap::new());
        let echo = EchoTranslator::default();
        let mut target = FlatMap::new();
        translate_pending(&echo, "en", "bn", &plan, &mut Pacer::new(Duration::ZERO), &mut target).unwrap();

        let calls = echo.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, ContentMode::Plain);
        assert_eq!(calls[0].2, vec!["One", "Two"]);
        assert_eq!(calls[1].1, ContentMode::Html);
        assert_eq!(target["h"], json!("bn:<b>Bold</b>"));
    }

    #[test]
    fn provider_failure_keeps_completed_languages_and_stops() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "en", json!({ "a": "A" }));
        for lang in ["as", "bn", "gu"] {
            write(tmp.path(), lang, json!({}));
        }

        let err = run(&flat_store(tmp.path()), &opts(&[], false), || {
            Ok(Box::new(FailOn { fail_on: "bn" }) as Box<dyn Translator>)
        })
        .unwrap_err();

        assert!(matches!(err, SyncError::Provider(_)));
        assert_eq!(read(tmp.path(), "as"), json!({ "a": "as:A" }));
        assert_eq!(read(tmp.path(), "bn"), json!({}));
        assert_eq!(read(tmp.path(), "gu"), json!({}));
    }

    #[test]
    fn no_targets_is_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "en", json!({ "a": "A" }));
        let err = run(&flat_store(tmp.path()), &opts(&[], false), || {
            panic!("unreachable")
        })
        .unwrap_err();
        assert!(matches!(err, SyncError::Configuration(_)));
    }

    #[test]
    fn delay_applies_between_languages() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "en", json!({ "a": "A" }));
        write(tmp.path(), "hi", json!({}));
        write(tmp.path(), "ta", json!({}));

        let paced = TranslateOptions {
            delay: Duration::from_millis(40),
            ..opts(&[], false)
        };
        let started = std::time::Instant::now();
        let report = run(&flat_store(tmp.path()), &paced, || {
            Ok(Box::new(EchoTranslator::default()) as Box<dyn Translator>)
        })
        .unwrap();

        assert_eq!(report.languages.iter().map(|l| l.provider_calls).sum::<usize>(), 2);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn structural_conflict_skips_key_and_continues() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "en", json!({ "a": { "b": "B" }, "c": "C" }));
        write(tmp.path(), "ta", json!({ "a": "flat" }));
        write(tmp.path(), "zz", json!({}));

        let echo = std::rc::Rc::new(EchoTranslator::default());
        let handle = echo.clone();
        let report = run(&flat_store(tmp.path()), &opts(&[], false), || {
            Ok(Box::new(handle.clone()) as Box<dyn Translator>)
        })
        .unwrap();

        assert_eq!(report.languages[0].keys, vec!["c"]);
        assert_eq!(read(tmp.path(), "ta"), json!({ "a": "flat", "c": "ta:C" }));
        assert_eq!(read(tmp.path(), "zz"), json!({ "a": { "b": "zz:B" }, "c": "zz:C" }));
        assert_eq!(echo.calls.borrow()[0].2, vec!["C"]);
    }
}
