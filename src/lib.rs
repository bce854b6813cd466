// Re-export modules
pub mod config;
pub mod crawlers;
pub mod document;
pub mod error;
pub mod loader;
pub mod pagination;
pub mod parsers;
pub mod results;
pub mod surface;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::{ListingConfig, Selectors};
pub use error::{Result, ScrapeError};
pub use results::{CrawlOutcome, CrawlReport, Record};

use crawlers::CrawlOrchestrator;
use document::{DocumentAssembler, PdfLayout};
use parsers::HttpImageFetcher;
use std::path::Path;
use surface::WebDriverSurface;

/// Main builder for crawling a product listing
pub struct Listing {
    config: ListingConfig,
}

impl Listing {
    /// Create a new Listing builder for the given landing page
    pub fn new(seed_url: &str) -> Self {
        Self {
            config: ListingConfig::new(seed_url),
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ListingConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a file
    pub fn with_config_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let config = ListingConfig::from_file(path)?;
        Ok(self.with_config(config))
    }

    /// Load configuration from a string
    pub fn with_config_str(self, config_str: &str) -> Result<Self> {
        let config = ListingConfig::from_json(config_str)?;
        Ok(self.with_config(config))
    }

    pub fn with_seed_url(mut self, seed_url: &str) -> Self {
        self.config.seed_url = seed_url.to_string();
        self
    }

    pub fn with_webdriver_url(mut self, webdriver_url: &str) -> Self {
        self.config.webdriver_url = webdriver_url.to_string();
        self
    }

    /// Set the maximum number of result pages visited
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.config.headless = headless;
        self
    }

    pub fn config(&self) -> &ListingConfig {
        &self.config
    }

    /// Effective configuration, with `WEBDRIVER_URL` taking precedence when set
    fn resolved_config(&self) -> ListingConfig {
        let mut config = self.config.clone();
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.webdriver_url = webdriver_url;
            }
        }
        config
    }

    /// Searches for `query` and collects records from every result page.
    ///
    /// Fails only when the configuration is unusable or no WebDriver session
    /// can be started; everything after that degrades into the report.
    pub async fn crawl(&self, query: &str) -> Result<CrawlReport> {
        let config = self.resolved_config();
        config.selectors.validate()?;

        let fetcher = HttpImageFetcher::from_config(&config)?;
        let surface = WebDriverSurface::connect(&config).await?;

        let mut orchestrator = CrawlOrchestrator::new(surface, fetcher, &config)?;
        Ok(orchestrator.crawl_all(&config.seed_url, query).await)
    }
}

/// Lays out `records` as a PDF at `path`, returning the number of product blocks
pub fn write_document(records: &[Record], path: impl AsRef<Path>, title: &str) -> Result<usize> {
    let mut assembler = DocumentAssembler::new(PdfLayout::new(title));
    for record in records {
        assembler.add_record(record);
    }
    let blocks = assembler.block_count();
    assembler.finalize(path)?;
    Ok(blocks)
}

/// Writes the crawl report (without image bytes) as pretty JSON
pub fn write_report_json(report: &CrawlReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let write_error = |reason: String| ScrapeError::DocumentWrite {
        path: path.display().to_string(),
        reason,
    };

    let json = serde_json::to_string_pretty(report).map_err(|e| write_error(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| write_error(e.to_string()))
}
