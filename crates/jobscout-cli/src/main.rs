use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use jobscout_client::{FetcherConfig, GoogleJobsAdapter, IndeedAdapter, ReqwestFetcher};
use jobscout_core::models::{RunStats, Source};
use jobscout_core::traits::{Fetcher, SourceAdapter};
use jobscout_core::{GovernorConfig, JsonLinesSink, Orchestrator, RunInput, TracingRunReporter};

#[derive(Parser)]
#[command(name = "jobscout", version, about = "Job listing collector")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect listings for every query and source, write them as JSON lines
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// JSON run input file (camelCase fields); flags below override it
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Search query; repeat for several
    #[arg(short, long = "query")]
    queries: Vec<String>,

    /// Location appended to every query
    #[arg(short, long)]
    location: Option<String>,

    /// Maximum listings per query and source
    #[arg(long)]
    max_results: Option<usize>,

    /// Requests per minute allowed per source
    #[arg(long)]
    rpm: Option<u32>,

    /// Source to enable (google, indeed); repeat for several
    #[arg(short, long = "source")]
    sources: Vec<Source>,

    /// Connect directly even if a proxy is configured
    #[arg(long, default_value_t = false)]
    no_proxy: bool,

    /// Proxy URL used when proxying is enabled
    #[arg(long, env = "JOBSCOUT_PROXY_URL")]
    proxy_url: Option<String>,

    /// Append records to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render pages with headless Chromium (requires the `browser` feature)
    #[arg(long, default_value_t = false)]
    browser: bool,
}

impl RunArgs {
    /// Load the input file (or defaults) and apply flag overrides on top.
    fn resolve_input(&self) -> Result<RunInput> {
        let mut input = match &self.input {
            Some(path) => RunInput::from_path(path)?,
            None => RunInput::default(),
        };

        if !self.queries.is_empty() {
            input.search_queries = self.queries.clone();
        }
        if let Some(location) = &self.location {
            input.location = Some(location.clone());
        }
        if let Some(max_results) = self.max_results {
            input.max_results = max_results;
        }
        if let Some(rpm) = self.rpm {
            input.rate_limit_rpm = rpm;
        }
        if !self.sources.is_empty() {
            input.sources = self.sources.clone();
        }
        if self.no_proxy {
            input.proxy = false;
        }

        input.validate()?;
        Ok(input)
    }

    fn fetcher_config(&self, input: &RunInput) -> FetcherConfig {
        let proxy_url = match (input.proxy, &self.proxy_url) {
            (true, Some(url)) => Some(url.clone()),
            (true, None) => {
                tracing::warn!("Proxy enabled but JOBSCOUT_PROXY_URL is not set, connecting directly");
                None
            }
            (false, _) => None,
        };
        FetcherConfig::default().with_proxy(proxy_url)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("jobscout=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => cmd_run(args).await?,
    }

    Ok(())
}

async fn cmd_run(args: RunArgs) -> Result<()> {
    let input = args.resolve_input()?;
    let config = args.fetcher_config(&input);

    let stats = if args.browser {
        run_with_browser(&args, &input, &config).await?
    } else {
        let fetcher = ReqwestFetcher::from_config(&config).context("Failed to create HTTP client")?;
        collect(fetcher, &args, &input).await?
    };

    tracing::info!(
        saved = stats.saved,
        duplicates = stats.duplicates,
        errors = stats.errors,
        blocked_events = stats.blocked_events,
        "Run complete"
    );
    Ok(())
}

#[cfg(feature = "browser")]
async fn run_with_browser(args: &RunArgs, input: &RunInput, config: &FetcherConfig) -> Result<RunStats> {
    let fetcher = jobscout_client::BrowserFetcher::launch(config)
        .await
        .context("Failed to launch headless browser")?;
    collect(fetcher, args, input).await
}

#[cfg(not(feature = "browser"))]
async fn run_with_browser(_: &RunArgs, _: &RunInput, _: &FetcherConfig) -> Result<RunStats> {
    anyhow::bail!("--browser requires jobscout to be built with the `browser` feature")
}

fn build_adapter<F: Fetcher + 'static>(source: Source, fetcher: F) -> Box<dyn SourceAdapter> {
    match source {
        Source::GoogleJobs => Box::new(GoogleJobsAdapter::new(fetcher)),
        Source::Indeed => Box::new(IndeedAdapter::new(fetcher)),
    }
}

async fn collect<F: Fetcher + 'static>(fetcher: F, args: &RunArgs, input: &RunInput) -> Result<RunStats> {
    let sink = match &args.output {
        Some(path) => JsonLinesSink::open(path).await?,
        None => JsonLinesSink::stdout(),
    };
    let skills = input.skill_matcher()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current source");
            on_signal.cancel();
        }
    });

    let mut orchestrator = Orchestrator::new(
        sink,
        skills,
        GovernorConfig::per_minute(input.rate_limit_rpm),
    )
    .with_cancellation(cancel);
    for source in input.enabled_sources() {
        orchestrator = orchestrator.with_boxed_adapter(build_adapter(source, fetcher.clone()));
    }

    let requests = input.search_requests();
    tracing::info!(
        queries = requests.len(),
        sources = ?orchestrator.sources(),
        rpm = input.rate_limit_rpm,
        "Starting collection"
    );

    orchestrator
        .run(&requests, &TracingRunReporter)
        .await
        .context("Failed to write run stats")
}
