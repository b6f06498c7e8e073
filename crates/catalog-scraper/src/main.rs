// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use catalog_scraper::config::PartialPolicy;
use catalog_scraper::progress::{self, ProgressEventKind, ProgressReceiver, ProgressReporter};
use catalog_scraper::renderer::chromium::ChromiumRenderer;
use catalog_scraper::renderer::Renderer;
use catalog_scraper::{Pipeline, RunReport, ScrapeConfig, ScrapeError};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "catalog-scraper",
    about = "Scrape a catalog page and enrich every listing from its detail page",
    version,
    after_help = "With no flags, scrapes the built-in catalog page into scraped_data.csv."
)]
struct Cli {
    /// Output CSV path
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Maximum number of concurrent detail-page fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Run Chromium without a window
    #[arg(long)]
    headless: bool,

    /// Write completed records to a .partial file if enrichment aborts
    #[arg(long)]
    keep_partial: bool,

    /// Output the run report as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> ScrapeConfig {
        let mut config = ScrapeConfig::default();
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(n) = self.concurrency {
            config.max_concurrent = n;
        }
        if self.headless {
            config.browser.headless = true;
            config.browser.fullscreen = false;
        }
        if self.keep_partial {
            config.partial = PartialPolicy::WritePartial;
        }
        config
    }

    fn log_directive(&self) -> &'static str {
        if self.verbose {
            "catalog_scraper=debug"
        } else if self.quiet || self.json {
            "catalog_scraper=warn"
        } else {
            "catalog_scraper=info"
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(cli.log_directive().parse()?),
        )
        .init();

    let result = run(&cli).await;

    // Consistent exit codes: 0=success, 1=error
    match &result {
        Ok(report) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(report)?);
            } else if !cli.quiet {
                println!(
                    "Scraped {} listings ({} with merchant, {} with rating) into {}",
                    report.records,
                    report.merchants_found,
                    report.ratings_found,
                    report.output.display()
                );
            }
        }
        Err(e) => {
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "error": true,
                        "message": format!("{e:#}"),
                    })
                );
            } else if !cli.quiet {
                eprintln!("  Error: {e:#}");
            }
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn run(cli: &Cli) -> Result<RunReport> {
    let config = cli.config();
    info!("starting catalog-scraper v{}", env!("CARGO_PKG_VERSION"));
    debug!("configuration: {}", serde_json::to_string(&config)?);

    let renderer = ChromiumRenderer::launch(&config.browser)
        .await
        .map_err(ScrapeError::Browser)?;
    let renderer: Arc<dyn Renderer> = Arc::new(renderer);
    info!("Chromium renderer initialized");

    let (tx, rx) = progress::channel();
    let listener = (!cli.quiet && !cli.json).then(|| tokio::spawn(print_progress(rx)));

    let pipeline =
        Pipeline::new(Arc::clone(&renderer), config).with_progress(ProgressReporter::new(tx));
    let result = pipeline.run().await;
    drop(pipeline);

    if let Some(listener) = listener {
        let _ = listener.await;
    }
    if let Err(e) = renderer.shutdown().await {
        debug!("browser shutdown: {e}");
    }

    Ok(result?)
}

/// Print one line per phase and per enriched listing until the channel closes.
async fn print_progress(mut rx: ProgressReceiver) {
    let mut total = 0usize;
    let mut done = 0usize;
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                debug!("progress listener skipped {skipped} events");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event.event {
            ProgressEventKind::PhaseStarted { phase } => eprintln!("  {phase}..."),
            ProgressEventKind::PhaseCompleted {
                phase,
                records,
                duration_ms,
            } => {
                total = records;
                eprintln!("  {phase} done: {records} records ({duration_ms}ms)");
            }
            ProgressEventKind::DetailStarted { url, .. } => {
                eprintln!("  Processing detail product URL: {url}");
            }
            ProgressEventKind::DetailEnriched {
                merchant_found,
                rating_found,
                ..
            } => {
                done += 1;
                let miss = match (merchant_found, rating_found) {
                    (true, true) => "",
                    (false, true) => " (no merchant)",
                    (true, false) => " (no rating)",
                    (false, false) => " (no merchant, no rating)",
                };
                eprintln!("  [{done}/{total}] enriched{miss}");
            }
            ProgressEventKind::DetailFailed { index, error } => {
                done += 1;
                eprintln!("  [{done}/{total}] listing {index} failed: {error}");
            }
            ProgressEventKind::Warning { message } => eprintln!("  warning: {message}"),
            ProgressEventKind::ListingCollected { .. } | ProgressEventKind::RunComplete { .. } => {}
        }
    }
}
