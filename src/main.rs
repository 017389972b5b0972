use anyhow::{bail, Context};
use clap::Parser;
use log::{error, info, warn};
use std::path::PathBuf;

use turbolistings::{crawl_all, logging, CrawlPlan, JsonFileSink, ResultSink};

/// Crawl paginated listing sites described in a JSON crawl plan.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Crawl plan (JSON) listing the crawls to run
    #[arg(short, long)]
    config: PathBuf,

    /// Directory for the JSON output, overrides the plan
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Only run the crawl with this name
    #[arg(long)]
    only: Option<String>,

    /// Override `max_pages` for every crawl
    #[arg(long)]
    max_pages: Option<usize>,

    /// Fetch each listing's own page for address, price and characteristics
    #[arg(long)]
    details: bool,

    /// Also append log records to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref()).context("cannot open log file")?;

    let mut plan = CrawlPlan::from_file(&args.config)
        .with_context(|| format!("failed to load crawl plan {}", args.config.display()))?;

    if let Some(output_dir) = args.output_dir {
        plan.output_dir = output_dir;
    }
    if let Some(only) = &args.only {
        plan.crawls.retain(|crawl| &crawl.name == only);
        if plan.crawls.is_empty() {
            bail!("no crawl named `{}` in {}", only, args.config.display());
        }
    }
    for crawl in &mut plan.crawls {
        if let Some(max_pages) = args.max_pages {
            crawl.max_pages = max_pages;
        }
        if args.details {
            crawl.enrich_details = true;
        }
    }

    let sink = JsonFileSink::new(&plan.output_dir)
        .with_context(|| format!("cannot create {}", plan.output_dir.display()))?;

    info!("Running {} crawl(s)", plan.crawls.len());
    let total = plan.crawls.len();
    let mut failed = 0;

    for result in crawl_all(&plan.crawls).await {
        match result {
            Ok(report) => sink.store(&report).await?,
            Err(err) => {
                failed += 1;
                error!("{}", err);
                match err.partial() {
                    Some(partial) if !partial.listings.is_empty() => {
                        warn!(
                            "[{}] Saving {} listings gathered before the crawl stopped",
                            partial.name,
                            partial.listings.len()
                        );
                        sink.store(partial).await?;
                    }
                    _ => {}
                }
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} crawl(s) ended early", failed, total);
    }
    Ok(())
}
