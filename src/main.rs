use clap::Parser;
use std::process::ExitCode;
use yield_listing::{CrawlOutcome, Listing, ListingConfig};

mod args;
use args::Args;

/// Exit code when the search control never appeared
const EXIT_SEARCH_UNAVAILABLE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    match run(&args).await {
        Ok(code) => code,
        Err(e) => {
            ::log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> yield_listing::Result<ExitCode> {
    let config = match &args.config {
        Some(path) => ListingConfig::from_file(path)?,
        None => ListingConfig::default(),
    };

    let mut listing = Listing::new(&config.seed_url).with_config(config);
    if let Some(seed_url) = &args.seed_url {
        listing = listing.with_seed_url(seed_url);
    }
    if let Some(webdriver_url) = &args.webdriver_url {
        listing = listing.with_webdriver_url(webdriver_url);
    }
    if let Some(max_pages) = args.max_pages {
        listing = listing.with_max_pages(max_pages);
    }
    if args.headless {
        listing = listing.with_headless(true);
    }

    println!("Note: crawling requires a WebDriver server (e.g., ChromeDriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using {}",
        listing.config().webdriver_url
    );

    let start_time = std::time::Instant::now();
    let report = listing.crawl(&args.query).await?;
    ::log::info!(
        "Crawled {} pages in {:.2} seconds",
        report.pages,
        start_time.elapsed().as_secs_f64()
    );
    if !report.outcome.is_complete() {
        ::log::warn!(
            "Result pages were not walked to the end ({:?}), the PDF holds a partial listing",
            report.outcome
        );
    }

    if let Some(path) = &args.dump_json {
        yield_listing::write_report_json(&report, path)?;
        ::log::info!("Records written to {}", path.display());
    }

    let output = args.output_path();
    let blocks = yield_listing::write_document(&report.records, &output, &args.query)?;
    println!("PDF saved as {} ({} products)", output.display(), blocks);

    Ok(match report.outcome {
        CrawlOutcome::SearchUnavailable => ExitCode::from(EXIT_SEARCH_UNAVAILABLE),
        _ => ExitCode::SUCCESS,
    })
}
