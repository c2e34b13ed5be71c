use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use dataset_scraper::application::{RunOutcome, RunRequest, RunSummary, RunnerConfig, execute};
use dataset_scraper::infrastructure::config::{ConfigManager, Settings};
use dataset_scraper::infrastructure::dataset_store::OutputFormat;
use dataset_scraper::infrastructure::http_client::HttpClientConfig;
use dataset_scraper::infrastructure::logging::init_logging_with_config;
use dataset_scraper::infrastructure::script::load_handler;

/// Exit status after a graceful Ctrl-C stop
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "dataset-scraper",
    version,
    about = "Enrich selected items of a JSON dataset, resumably"
)]
struct Cli {
    /// Path to JSON file with the dataset
    #[arg(short = 'd', long)]
    dataset: PathBuf,

    /// Path to the handler script
    #[arg(short = 's', long)]
    script: PathBuf,

    /// Path query selecting the items to scrape
    #[arg(short = 'q', long, default_value = "$")]
    query: String,

    /// Output file (default: output.json next to the dataset)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Store the output with indentation
    #[arg(short = 'p', long)]
    pretty: bool,

    /// Resolve the query and list the items without scraping
    #[arg(short = 't', long)]
    dry_run: bool,

    /// Delay in ms before each item
    #[arg(short = 'w', long, value_name = "MS")]
    delay: Option<u64>,

    /// Maximum number of items to scrape in this run
    #[arg(short = 'l', long)]
    limit: Option<usize>,

    /// Extra configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Flags win over every configuration layer.
    fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(delay) = self.delay {
            settings.run.delay_ms = delay;
        }
        if self.limit.is_some() {
            settings.run.limit = self.limit;
        }
        settings.run.pretty |= self.pretty;
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }

    fn run_request(&self, settings: &Settings) -> RunRequest {
        RunRequest {
            dataset: self.dataset.clone(),
            output: self.output.clone(),
            script: self.script.clone(),
            query: self.query.clone(),
            format: OutputFormat::from_pretty_flag(settings.run.pretty),
            runner: RunnerConfig {
                delay: Duration::from_millis(settings.run.delay_ms),
                item_limit: settings.run.limit,
                dry_run: self.dry_run,
            },
        }
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "On" } else { "Off" }
}

fn log_banner(request: &RunRequest) {
    info!("Starting dataset-scraper");
    info!("===========================================");
    info!(" - Script:       {}", request.script.display());
    info!(" - Dataset:      {}", request.dataset.display());
    match &request.output {
        Some(output) => info!(" - Output:       {}", output.display()),
        None => info!(" - Output:       output.json next to the dataset"),
    }
    info!(" - Query:        {}", request.query);
    match request.runner.item_limit {
        Some(limit) => info!(" - Limit:        {}", limit),
        None => info!(" - Limit:        Off"),
    }
    info!(" - Delay:        {}ms", request.runner.delay.as_millis());
    info!(" - Pretty:       {}", on_off(request.format == OutputFormat::Pretty));
    info!(" - Dry Run:      {}", on_off(request.runner.dry_run));
    info!("===========================================");
}

/// Cancel `token` on the first Ctrl-C; the runner stops before the next item
/// or drops the item in flight. A second Ctrl-C exits at once.
fn spawn_interrupt_listener(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, stopping after the current step (Ctrl-C again to abort)");
        token.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            error!("Second interrupt, aborting");
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });
}

async fn run(cli: Cli) -> Result<RunSummary> {
    let mut settings = ConfigManager::new()
        .load_settings(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply_overrides(&mut settings);

    init_logging_with_config(&settings.logging)?;

    let request = cli.run_request(&settings);
    log_banner(&request);

    let handler = load_handler(&cli.script, &HttpClientConfig::from(&settings.http)).await?;

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    let summary = execute(&request, handler, cancel).await?;
    info!(
        "Processed {} of {} selected items (progress {})",
        summary.visited, summary.selected, summary.progress
    );
    info!("The job is done. Bye!");
    Ok(summary)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(summary) if summary.outcome == RunOutcome::Interrupted => ExitCode::from(EXIT_INTERRUPTED),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
