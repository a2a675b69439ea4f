//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use destinos_core::{
    CuratedLinks, DynamicResolver, EnrichOptions, EnrichReport, LinkPolicy, LinkResolver,
    ProgressReporter, attach_links, clean_descriptions,
};
use destinos_crawler::SearchClient;
use destinos_shared::{AppConfig, EnrichedDocument, ResolverConfig, init_config, load_config};
use destinos_storage::{CatalogStore, load_catalog};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Destinos: enrich a travel-destination catalog.
#[derive(Parser)]
#[command(
    name = "destinos",
    version,
    about = "Merge, classify and annotate a catalog of travel destinations.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Where new reference links come from during enrichment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum LinkMode {
    /// Query the configured search page for every Nth place.
    Search,
    /// Exact-name lookup in the curated table for every place.
    Curated,
    /// Keep whatever links the places already carry.
    None,
}

/// Flags shared by commands that resolve links.
#[derive(clap::Args, Debug)]
pub(crate) struct LinkArgs {
    /// Link strategy.
    #[arg(long, value_enum, default_value = "search")]
    pub links: LinkMode,

    /// Search every Nth place (0 = never, 1 = all). Overrides config.
    #[arg(long)]
    pub crawl_every: Option<u32>,

    /// Maximum concurrent lookups. Overrides config.
    #[arg(long)]
    pub concurrency: Option<u32>,

    /// Curated link table (JSON). Defaults to config, then the built-in table.
    #[arg(long)]
    pub curated: Option<PathBuf>,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Merge source catalogs and write a freshly enriched document.
    Enrich {
        /// Base catalog (nested destino → categoria JSON).
        #[arg(long)]
        base: PathBuf,

        /// Additional catalogs merged on top, in order (repeatable).
        #[arg(long = "add")]
        additions: Vec<PathBuf>,

        /// Skip the built-in additional locations.
        #[arg(long)]
        no_builtin: bool,

        /// Output file (defaults to config `defaults.output`).
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        link_args: LinkArgs,
    },

    /// Re-run enrichment over an existing enriched document.
    Refresh {
        /// Enriched document to read.
        input: PathBuf,

        /// Output file (defaults to overwriting the input).
        #[arg(short, long)]
        out: Option<PathBuf>,

        #[command(flatten)]
        link_args: LinkArgs,
    },

    /// Attach curated links by exact place name, touching nothing else.
    Links {
        /// Enriched document to patch.
        input: PathBuf,

        /// Curated link table (JSON). Defaults to config, then the built-in table.
        #[arg(long)]
        curated: Option<PathBuf>,

        /// Output file (defaults to overwriting the input).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Strip markdown links and citation artifacts from descriptions.
    Clean {
        /// Enriched document to clean.
        input: PathBuf,

        /// Output file (defaults to overwriting the input).
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "destinos=info",
        1 => "destinos=debug",
        _ => "destinos=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Enrich {
            base,
            additions,
            no_builtin,
            out,
            link_args,
        } => cmd_enrich(&base, &additions, no_builtin, out.as_deref(), &link_args).await,
        Command::Refresh {
            input,
            out,
            link_args,
        } => cmd_refresh(&input, out.as_deref(), &link_args).await,
        Command::Links {
            input,
            curated,
            out,
        } => cmd_links(&input, curated.as_deref(), out.as_deref()),
        Command::Clean { input, out } => cmd_clean(&input, out.as_deref()),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Enrichment commands
// ---------------------------------------------------------------------------

/// What a resolving command runs on: nested sources or a flat document.
enum Input {
    Sources {
        base: destinos_shared::Catalog,
        additions: Vec<destinos_shared::Catalog>,
    },
    Document(EnrichedDocument),
}

async fn cmd_enrich(
    base: &Path,
    additions: &[PathBuf],
    no_builtin: bool,
    out: Option<&Path>,
    link_args: &LinkArgs,
) -> Result<()> {
    let config = load_config()?;

    let base_catalog = load_catalog(base)?;
    let mut extra = Vec::with_capacity(additions.len() + 1);
    if !no_builtin {
        extra.push(destinos_core::seed::additional_locations()?);
    }
    for path in additions {
        extra.push(load_catalog(path)?);
    }

    let out = out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output));

    info!(
        base = %base.display(),
        additions = extra.len(),
        out = %out.display(),
        links = ?link_args.links,
        "enriching catalog"
    );

    let input = Input::Sources {
        base: base_catalog,
        additions: extra,
    };
    dispatch(input, &out, &config, link_args).await
}

async fn cmd_refresh(input: &Path, out: Option<&Path>, link_args: &LinkArgs) -> Result<()> {
    let config = load_config()?;
    let doc = CatalogStore::new(input).load_document()?;
    let out = out.unwrap_or(input).to_path_buf();

    info!(
        input = %input.display(),
        places = doc.places.len(),
        links = ?link_args.links,
        "refreshing enriched document"
    );

    dispatch(Input::Document(doc), &out, &config, link_args).await
}

/// Pick the resolver for `link_args.links` and run the pipeline with it.
async fn dispatch(input: Input, out: &Path, config: &AppConfig, link_args: &LinkArgs) -> Result<()> {
    let mut resolver_config = ResolverConfig::from(config);
    if let Some(n) = link_args.crawl_every {
        resolver_config.crawl_every = n;
    }
    if let Some(c) = link_args.concurrency {
        resolver_config.concurrency = c.max(1);
    }

    let mut options = EnrichOptions::new(chrono::Local::now().date_naive());
    options.concurrency = resolver_config.concurrency as usize;
    options.version = config.defaults.document_version.clone();

    match link_args.links {
        LinkMode::Search => {
            options.policy = LinkPolicy::from_crawl_every(resolver_config.crawl_every);
            let client = SearchClient::new(&resolver_config)?;
            let resolver = DynamicResolver::new(client, &resolver_config);
            execute(input, out, Arc::new(resolver), &options).await
        }
        LinkMode::Curated => {
            options.policy = LinkPolicy::All;
            let curated = load_curated(link_args.curated.as_deref(), config)?;
            execute(input, out, Arc::new(curated), &options).await
        }
        LinkMode::None => {
            options.policy = LinkPolicy::Never;
            execute(input, out, Arc::new(CuratedLinks::default()), &options).await
        }
    }
}

async fn execute<R>(input: Input, out: &Path, resolver: Arc<R>, options: &EnrichOptions) -> Result<()>
where
    R: LinkResolver + 'static,
{
    let reporter = CliProgress::new();

    let (doc, report) = match input {
        Input::Sources { base, additions } => {
            destinos_core::run(base, additions, resolver, options, &reporter).await
        }
        Input::Document(doc) => destinos_core::refresh(doc, resolver, options, &reporter).await,
    };

    CatalogStore::new(out).save_document(&doc)?;
    print_report(&report, out);
    Ok(())
}

fn print_report(report: &EnrichReport, out: &Path) {
    println!();
    println!("  Catalog enriched!");
    println!("  Places:      {}", report.total_places);
    println!("  Lookups:     {}", report.links_requested);
    println!("  Resolved:    {}", report.links_resolved);
    println!("  Failed:      {}", report.links_failed);
    println!("  With links:  {}", report.places_with_links);
    println!("  Output:      {}", out.display());
    println!("  Time:        {:.1}s", report.elapsed.as_secs_f64());
    println!();
}

// ---------------------------------------------------------------------------
// Patch commands
// ---------------------------------------------------------------------------

fn cmd_links(input: &Path, curated: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let table = load_curated(curated, &config)?;

    let mut doc = CatalogStore::new(input).load_document()?;
    let patched = attach_links(&mut doc, &table);

    let out = out.unwrap_or(input);
    CatalogStore::new(out).save_document(&doc)?;

    println!();
    println!("  Curated links attached to {patched} of {} places.", doc.places.len());
    println!("  Output: {}", out.display());
    println!();
    Ok(())
}

fn cmd_clean(input: &Path, out: Option<&Path>) -> Result<()> {
    let mut doc = CatalogStore::new(input).load_document()?;
    let changed = clean_descriptions(&mut doc);

    let out = out.unwrap_or(input);
    CatalogStore::new(out).save_document(&doc)?;

    println!();
    println!("  {changed} descriptions cleaned.");
    println!("  Output: {}", out.display());
    println!();
    Ok(())
}

/// `--curated`, else `links.curated_table` from config, else the built-in table.
fn load_curated(flag: Option<&Path>, config: &AppConfig) -> Result<CuratedLinks> {
    let from_config = config.links.curated_table.as_deref().map(Path::new);
    let table = match flag.or(from_config) {
        Some(path) => CuratedLinks::load(path)?,
        None => CuratedLinks::builtin()?,
    };
    if table.is_empty() {
        return Err(eyre!("curated link table is empty"));
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn place_enriched(&self, nombre: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Enriching [{current}/{total}] {nombre}"));
    }

    fn done(&self, _report: &EnrichReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
