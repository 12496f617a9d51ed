use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use locale_sync::config::{Overrides, Settings};
use locale_sync::model::catalog::{LayoutKind, LocaleLayout};
use locale_sync::services::localizer::LocaleContext;
use locale_sync::services::provider::{Provider, ProviderConfig};
use locale_sync::services::store::LocaleStore;
use locale_sync::services::{report, scan, sync, translate};

#[derive(Parser)]
#[command(name = "locale-sync", version, about = "Keep i18n JSON catalogs in step with the base language")]
struct Cli {
    /// TOML settings file (defaults to ./locale-sync.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct CatalogArgs {
    /// Base language code
    #[arg(long)]
    from: Option<String>,

    /// Directory holding the catalogs
    #[arg(long = "localesDir", alias = "locales-dir")]
    locales_dir: Option<PathBuf>,

    #[arg(long, value_enum)]
    layout: Option<LayoutKind>,

    /// Catalog file name for the nested layout
    #[arg(long)]
    namespace: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Machine-translate missing or empty keys for every target language
    Translate {
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Comma-separated target languages (default: every language on disk)
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        provider: Option<String>,
        /// Google Cloud project id
        #[arg(long)]
        project: Option<String>,
        /// Report what would be translated without calling the provider
        #[arg(long, alias = "dry-run")]
        dry: bool,
        /// Pause between provider calls
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Copy base keys missing from target catalogs
    Sync {
        #[command(flatten)]
        catalog: CatalogArgs,
        #[arg(long)]
        to: Option<String>,
        /// Also remove keys that are not in the base catalog
        #[arg(long)]
        prune: bool,
        #[arg(long, alias = "dry-run")]
        dry: bool,
    },

    /// List missing or blank keys per language
    Report {
        #[command(flatten)]
        catalog: CatalogArgs,
        #[arg(long)]
        to: Option<String>,
    },

    /// Harvest data-i18n keys from HTML files into every catalog
    Scan {
        #[command(flatten)]
        catalog: CatalogArgs,
        /// Site root to scan for .html files
        #[arg(long, default_value = ".")]
        root: PathBuf,
        #[arg(long, alias = "dry-run")]
        dry: bool,
    },

    /// Resolve one key the way the site runtime does
    Lookup {
        #[command(flatten)]
        catalog: CatalogArgs,
        #[arg(long)]
        lang: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        fallback: Option<String>,
    },
}

fn overrides(catalog: &CatalogArgs) -> Overrides {
    Overrides {
        from: catalog.from.clone(),
        locales_dir: catalog.locales_dir.clone(),
        layout: catalog.layout,
        namespace: catalog.namespace.clone(),
        ..Overrides::default()
    }
}

fn store_for(settings: &Settings) -> LocaleStore {
    LocaleStore::new(
        settings.locales_dir.clone(),
        LocaleLayout::new(settings.layout, &settings.namespace),
    )
}

trait Runnable {
    fn run(self, base: Settings) -> Result<()>;
}

impl Runnable for Commands {
    fn run(self, base: Settings) -> Result<()> {
        debug!(cmd = ?self, "parsed command");

        match self {
            Commands::Translate {
                catalog,
                to,
                provider,
                project,
                dry,
                delay_ms,
            } => {
                let settings = base.apply(Overrides {
                    to,
                    provider,
                    project,
                    delay_ms,
                    ..overrides(&catalog)
                });
                // Validated up front so a bad provider aborts before any file is read.
                let provider: Provider = settings.provider.parse()?;
                let store = store_for(&settings);
                let opts = translate::TranslateOptions {
                    base_lang: &settings.from,
                    targets: &settings.to,
                    dry_run: dry,
                    delay: Duration::from_millis(settings.delay_ms),
                };

                let project = settings.project.clone();
                let report = translate::run(&store, &opts, || {
                    provider.connect(ProviderConfig {
                        project: project.as_deref(),
                    })
                })?;

                for l in &report.languages {
                    if l.pending == 0 {
                        if l.written {
                            println!("{}: filled {} blank keys", l.lang, l.copied);
                        } else {
                            println!("{}: nothing to translate", l.lang);
                        }
                    } else if report.dry_run {
                        println!("{}: would translate {} keys", l.lang, l.pending);
                        for k in &l.keys {
                            println!("  - {k}");
                        }
                    } else {
                        println!(
                            "{}: translated {} keys in {} calls",
                            l.lang, l.translated, l.provider_calls
                        );
                    }
                }
                println!("All done.");
                Ok(())
            }

            Commands::Sync {
                catalog,
                to,
                prune,
                dry,
            } => {
                let settings = base.apply(Overrides {
                    to,
                    ..overrides(&catalog)
                });
                let store = store_for(&settings);
                let report = sync::run(
                    &store,
                    &sync::SyncOptions {
                        base_lang: &settings.from,
                        targets: &settings.to,
                        prune: prune || sync::prune_from_env(),
                        dry_run: dry,
                    },
                )?;

                if report.languages.is_empty() {
                    println!("No target languages detected under {}", store.dir.display());
                    return Ok(());
                }
                for l in &report.languages {
                    if l.removed > 0 {
                        println!("{}: +{}, -{}", l.lang, l.added, l.removed);
                    } else {
                        println!("{}: +{}", l.lang, l.added);
                    }
                }
                println!(
                    "Done. Missing keys added: {} | Pruned: {}",
                    report.total_added(),
                    report.total_removed()
                );
                Ok(())
            }

            Commands::Report { catalog, to } => {
                let settings = base.apply(Overrides {
                    to,
                    ..overrides(&catalog)
                });
                let store = store_for(&settings);
                let report = report::run(&store, &settings.from, &settings.to)?;
                if report.languages.is_empty() {
                    println!("No target languages detected under {}", store.dir.display());
                    return Ok(());
                }
                print!("{}", report.render());
                Ok(())
            }

            Commands::Scan { catalog, root, dry } => {
                let settings = base.apply(overrides(&catalog));
                let store = store_for(&settings);
                let report = scan::run(&store, &root, &settings.from, dry)?;
                for lang in &report.updated {
                    println!("Updated {}", store.path(lang).display());
                }
                println!(
                    "Scanned {} HTML files. Keys found: {}",
                    report.files,
                    report.keys.len()
                );
                Ok(())
            }

            Commands::Lookup {
                catalog,
                lang,
                key,
                fallback,
            } => {
                let settings = base.apply(overrides(&catalog));
                let ctx = LocaleContext::load(&store_for(&settings), &lang);
                println!("{}", ctx.t(&key, fallback.as_deref()));
                Ok(())
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!(config = ?cli.config, "locale-sync starting");
    let settings = Settings::load(cli.config.as_deref())?;

    cli.cmd.run(settings)
}
