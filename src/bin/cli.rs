//! Collector CLI
//!
//! `collector <site> [simple|detail] [local|s3] [new|all]`

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use collector::{
    config::{Environment, Settings},
    crawler::{CrawlContext, run_crawler},
    error::Result,
    models::{CrawlOptions, ResultDetail, Scope, StorageType},
    registry::Registry,
    storage,
};

/// Legal consultation collector
#[derive(Parser, Debug)]
#[command(
    name = "collector",
    version,
    about = "Collects legal Q&A and precedents as JSON batches"
)]
struct Cli {
    /// Site to crawl (see --list-sites)
    #[arg(required_unless_present = "list_sites")]
    site: Option<String>,

    /// Record shape
    #[arg(value_enum, default_value_t = ResultDetail::Simple)]
    result_detail: ResultDetail,

    /// Where batches are written
    #[arg(value_enum, default_value_t = StorageType::Local)]
    storage_type: StorageType,

    /// `new` stops at the last checkpoint, `all` crawls everything
    #[arg(value_enum, default_value_t = Scope::All)]
    scope: Scope,

    /// Path to the TOML config file
    #[arg(short, long, default_value = "collector.toml")]
    config: PathBuf,

    /// Print the registered sites and exit
    #[arg(long)]
    list_sites: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging from `LOG_LEVEL`, or `debug` when verbose.
fn init_logging(verbose: bool, env: &Environment) {
    let level = if verbose {
        "debug"
    } else {
        env.log_level().unwrap_or("info")
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

async fn run(cli: Cli, env: Environment) -> Result<()> {
    let registry = Registry::builtin();

    if cli.list_sites {
        for site in registry.list_available() {
            println!("{site}");
        }
        return Ok(());
    }

    let site = cli.site.unwrap_or_default();
    let options = CrawlOptions::new(&site)
        .with_detail(cli.result_detail)
        .with_storage(cli.storage_type)
        .with_scope(cli.scope);

    let factory = registry.resolve(&site)?;
    let settings = Arc::new(Settings::load(&cli.config, env)?);
    let mut crawler = factory(&settings)?;

    log::info!("Collector starting: {options}");
    let sink = storage::create_sink(&settings, options.storage_type).await?;
    let ctx = CrawlContext::new(options, settings, sink);

    let report = run_crawler(crawler.as_mut(), &ctx).await?;
    for category in &report.categories {
        log::info!(
            "{}/{}: {} records in {} batches ({} pages)",
            report.site,
            category.category,
            category.records_written,
            category.batches_written,
            category.pages_fetched
        );
    }
    log::info!(
        "Crawl complete for {}: {} records in {} batches",
        report.site,
        report.total_records(),
        report.total_batches()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let env = Environment::from_env();
    init_logging(cli.verbose, &env);

    match run(cli, env).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
