use serde::Serialize;

/// Placeholder for a text field that could not be extracted
pub const UNKNOWN: &str = "unknown";

/// One listing entry extracted from a results page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    /// Product title, or `UNKNOWN`
    pub title: String,

    /// Price as displayed, or `UNKNOWN`
    pub price: String,

    /// Absolute product URL (if available)
    pub link: Option<String>,

    /// Raw image bytes (if the image could be fetched)
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
}

impl Record {
    /// Create a new record
    pub fn new(title: String, price: String, link: Option<String>, image: Option<Vec<u8>>) -> Self {
        Self {
            title,
            price,
            link,
            image,
        }
    }

    /// True when no text field was extracted, so nothing identifies the entry
    pub fn is_blank(&self) -> bool {
        self.title == UNKNOWN && self.price == UNKNOWN && self.link.is_none()
    }
}

/// How a crawl ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrawlOutcome {
    /// The forward pagination control was absent or disabled
    Exhausted,
    /// The page bound was reached while a next page was still offered
    PageLimit { pages: usize },
    /// A page advance produced the same records as the page before it
    Stuck { page: usize },
    /// The search control never appeared, nothing was crawled
    SearchUnavailable,
    /// The driver stopped answering mid-crawl
    Interrupted { page: usize, reason: String },
}

impl CrawlOutcome {
    /// Whether the series was walked to its natural end
    pub fn is_complete(&self) -> bool {
        matches!(self, CrawlOutcome::Exhausted)
    }
}

/// Everything a crawl produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub records: Vec<Record>,

    /// Number of pages materialized
    pub pages: usize,

    pub outcome: CrawlOutcome,
}
