use crate::error::{Result, ScrapeError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

/// CSS selectors describing the listing markup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selectors {
    /// Search input on the landing page
    #[serde(default = "default_search_input")]
    pub search_input: String,

    /// One match per listing entry
    #[serde(default = "default_container")]
    pub container: String,

    /// Title node inside a container
    #[serde(default = "default_title")]
    pub title: String,

    /// Price node inside a container
    #[serde(default = "default_price")]
    pub price: String,

    /// Anchor inside a container; its `href` is the product link
    #[serde(default = "default_link")]
    pub link: String,

    /// Image inside a container; its `src` is fetched
    #[serde(default = "default_image")]
    pub image: String,

    /// Forward pagination control, only matching while enabled
    #[serde(default = "default_next_page")]
    pub next_page: String,
}

impl Selectors {
    /// Checks that every selector parses
    pub fn validate(&self) -> Result<()> {
        for selector in [
            &self.search_input,
            &self.container,
            &self.title,
            &self.price,
            &self.link,
            &self.image,
            &self.next_page,
        ] {
            scraper::Selector::parse(selector).map_err(|e| ScrapeError::Selector {
                selector: selector.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            search_input: default_search_input(),
            container: default_container(),
            title: default_title(),
            price: default_price(),
            link: default_link(),
            image: default_image(),
            next_page: default_next_page(),
        }
    }
}

/// Configuration for a listing crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Landing page holding the search control
    #[serde(default = "default_seed_url")]
    pub seed_url: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Run Chrome without a visible window
    #[serde(default)]
    pub headless: bool,

    /// User agent passed to the browser and the image client
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default)]
    pub selectors: Selectors,

    /// Pixels scrolled per step while materializing a page
    #[serde(default = "default_scroll_step_px")]
    pub scroll_step_px: u64,

    /// Pause after each scroll step, in milliseconds
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,

    /// Extra scroll-and-recount rounds once the height heuristic is satisfied
    #[serde(default = "default_stability_checks")]
    pub stability_checks: usize,

    /// Upper bound on every element wait, in milliseconds
    #[serde(default = "default_wait_timeout_ms")]
    pub wait_timeout_ms: u64,

    /// Pause after activating the next-page control, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Safety bound on the number of pages visited
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Maximum number of concurrent image downloads
    #[serde(default = "default_image_concurrency")]
    pub image_concurrency: usize,

    /// Per-image request timeout, in milliseconds
    #[serde(default = "default_image_timeout_ms")]
    pub image_timeout_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            seed_url: default_seed_url(),
            webdriver_url: default_webdriver_url(),
            headless: false,
            user_agent: default_user_agent(),
            selectors: Selectors::default(),
            scroll_step_px: default_scroll_step_px(),
            scroll_delay_ms: default_scroll_delay_ms(),
            stability_checks: default_stability_checks(),
            wait_timeout_ms: default_wait_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            max_pages: default_max_pages(),
            image_concurrency: default_image_concurrency(),
            image_timeout_ms: default_image_timeout_ms(),
        }
    }
}

impl ListingConfig {
    /// Create a configuration for the given landing page with default values
    pub fn new(seed_url: &str) -> Self {
        Self {
            seed_url: seed_url.to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path)
            .map_err(|e| ScrapeError::Config(format!("{}: {}", path.display(), e)))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ScrapeError::Config(format!("{}: {}", path.display(), e)))?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScrapeError::Config(e.to_string()))
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }
}

fn default_seed_url() -> String {
    "https://www.daraz.pk/".to_string()
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string()
}

fn default_search_input() -> String {
    "#q".to_string()
}

fn default_container() -> String {
    ".Bm3ON".to_string()
}

fn default_title() -> String {
    ".RfADt".to_string()
}

fn default_price() -> String {
    ".ooOxS".to_string()
}

fn default_link() -> String {
    "a".to_string()
}

fn default_image() -> String {
    "img".to_string()
}

fn default_next_page() -> String {
    "li.ant-pagination-next[title='Next Page'][aria-disabled='false']".to_string()
}

fn default_scroll_step_px() -> u64 {
    800
}

fn default_scroll_delay_ms() -> u64 {
    300
}

fn default_stability_checks() -> usize {
    3
}

fn default_wait_timeout_ms() -> u64 {
    15_000
}

fn default_settle_delay_ms() -> u64 {
    2_000
}

fn default_max_pages() -> usize {
    100
}

/// Default value for image_concurrency
fn default_image_concurrency() -> usize {
    4
}

fn default_image_timeout_ms() -> u64 {
    15_000
}
