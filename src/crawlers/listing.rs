use crate::config::ListingConfig;
use crate::error::Result;
use crate::loader::ContentLoader;
use crate::pagination::PaginationController;
use crate::parsers::{ImageFetcher, RecordExtractor};
use crate::results::{CrawlOutcome, CrawlReport, Record};
use crate::surface::RenderSurface;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Progress of one crawl, threaded by value through the page loop
#[derive(Debug, Default)]
pub struct CrawlState {
    accumulated: Vec<Record>,
    current_page_loaded: bool,
    has_next_page: bool,
    pages: usize,
    last_fingerprint: Option<u64>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self {
            has_next_page: true,
            ..Self::default()
        }
    }

    /// Appends one page's records, keeping page order then document order
    pub fn absorb(mut self, records: Vec<Record>) -> Self {
        self.last_fingerprint = fingerprint(&records);
        self.accumulated.extend(records);
        self.current_page_loaded = true;
        self.pages += 1;
        self
    }

    /// Records the pagination verdict; the loaded page is now stale
    pub fn advanced(mut self, has_next_page: bool) -> Self {
        self.has_next_page = has_next_page;
        self.current_page_loaded = false;
        self
    }

    /// True when `records` are the same non-empty page that was absorbed last
    pub fn repeats(&self, records: &[Record]) -> bool {
        match (fingerprint(records), self.last_fingerprint) {
            (Some(current), Some(last)) => current == last,
            _ => false,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.accumulated
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    pub fn current_page_loaded(&self) -> bool {
        self.current_page_loaded
    }

    /// 1-based number of the page being worked on
    pub fn pending_page(&self) -> usize {
        if self.current_page_loaded {
            self.pages
        } else {
            self.pages + 1
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    pub fn finish(self, outcome: CrawlOutcome) -> CrawlReport {
        CrawlReport {
            records: self.accumulated,
            pages: self.pages,
            outcome,
        }
    }
}

/// Identity of a page's visible content.
///
/// Blank records carry nothing that tells one page from another, so they are
/// left out; a page with no identifiable record has no fingerprint.
fn fingerprint(records: &[Record]) -> Option<u64> {
    let mut hasher = DefaultHasher::new();
    let mut identified = 0;
    for record in records.iter().filter(|r| !r.is_blank()) {
        record.title.hash(&mut hasher);
        record.price.hash(&mut hasher);
        record.link.hash(&mut hasher);
        identified += 1;
    }
    (identified > 0).then(|| hasher.finish())
}

/// Walks a search's result pages: materialize, extract, advance
pub struct CrawlOrchestrator<S: RenderSurface, F: ImageFetcher> {
    loader: ContentLoader<S>,
    extractor: RecordExtractor<F>,
    pagination: PaginationController,
    max_pages: usize,
}

impl<S: RenderSurface, F: ImageFetcher> CrawlOrchestrator<S, F> {
    pub fn new(surface: S, fetcher: F, config: &ListingConfig) -> Result<Self> {
        Ok(Self {
            loader: ContentLoader::new(surface, config),
            extractor: RecordExtractor::new(
                &config.selectors,
                fetcher,
                config.image_concurrency,
            )?,
            pagination: PaginationController::new(config),
            max_pages: config.max_pages.max(1),
        })
    }

    pub fn surface(&self) -> &S {
        self.loader.surface()
    }

    /// Runs the search and collects records from every result page.
    ///
    /// The rendering session is released before returning, whatever the outcome.
    pub async fn crawl_all(&mut self, seed_url: &str, query: &str) -> CrawlReport {
        let report = self.run(seed_url, query).await;

        if let Err(e) = self.loader.release().await {
            ::log::warn!("Failed to release rendering session: {}", e);
        }

        ::log::info!(
            "Crawl finished after {} pages with {} records: {:?}",
            report.pages,
            report.records.len(),
            report.outcome
        );
        report
    }

    async fn run(&mut self, seed_url: &str, query: &str) -> CrawlReport {
        let mut state = CrawlState::new();

        if let Err(e) = self.loader.open(seed_url, query).await {
            ::log::error!("Search could not be submitted: {}", e);
            return state.advanced(false).finish(CrawlOutcome::SearchUnavailable);
        }

        loop {
            ::log::info!("Scraping page {}...", self.loader.page());

            let handle = match self.loader.materialize().await {
                Ok(handle) => handle,
                Err(e) => {
                    let page = state.pending_page();
                    ::log::error!("Page {} could not be rendered: {}", page, e);
                    return state.finish(CrawlOutcome::Interrupted {
                        page,
                        reason: e.to_string(),
                    });
                }
            };

            let records = self.extractor.extract(&handle).await;
            if state.repeats(&records) {
                ::log::warn!(
                    "Page {} repeats the previous page, pagination is stuck",
                    handle.page()
                );
                return state.finish(CrawlOutcome::Stuck {
                    page: handle.page(),
                });
            }
            state = state.absorb(records);

            if state.pages() >= self.max_pages {
                if self.pagination.has_next(self.loader.surface()).await {
                    ::log::warn!("Stopping at page limit of {}", self.max_pages);
                    let pages = state.pages();
                    return state.finish(CrawlOutcome::PageLimit { pages });
                }
                return state.advanced(false).finish(CrawlOutcome::Exhausted);
            }

            ::log::info!("Trying next page...");
            let has_next = self.pagination.advance(self.loader.surface()).await;
            state = state.advanced(has_next);
            if !state.has_next_page() {
                return state.finish(CrawlOutcome::Exhausted);
            }
            self.loader.page_advanced();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, DocumentAssembler, LinkCell, NO_LINK, PdfLayout};
    use crate::error::{Result, ScrapeError};
    use crate::results::UNKNOWN;
    use crate::surface::scripted::{ScriptedPage, ScriptedSurface, listing_page};
    use async_trait::async_trait;

    const SEED: &str = "https://shop.example.com/";

    /// Every image request fails
    struct NoImages;

    #[async_trait]
    impl ImageFetcher for NoImages {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            Err(ScrapeError::Fetch {
                url: url.to_string(),
                reason: "offline".to_string(),
            })
        }
    }

    fn quick_config() -> ListingConfig {
        let mut config = ListingConfig::new(SEED);
        config.scroll_delay_ms = 0;
        config.settle_delay_ms = 0;
        config.wait_timeout_ms = 10;
        config
    }

    fn card(title: &str, price: Option<&str>, link: Option<&str>) -> String {
        let price = price
            .map(|p| format!(r#"<span class="ooOxS">{}</span>"#, p))
            .unwrap_or_default();
        let link = link
            .map(|l| format!(r#"<a href="{}">open</a>"#, l))
            .unwrap_or_default();
        format!(
            r#"<div class="Bm3ON"><img src="//img.example.com/{title}.jpg"><div class="RfADt">{title}</div>{price}{link}</div>"#
        )
    }

    fn results_page(cards: &[String], has_next: bool) -> ScriptedPage {
        let pager = format!(
            r#"<ul class="ant-pagination"><li title="1" class="ant-pagination-item">1</li><li title="Next Page" class="ant-pagination-next" aria-disabled="{}"><button>&gt;</button></li></ul>"#,
            !has_next
        );
        ScriptedPage::new(listing_page(&format!("{}{}", cards.concat(), pager)))
    }

    fn numbered_pages(counts: &[usize]) -> Vec<ScriptedPage> {
        counts
            .iter()
            .enumerate()
            .map(|(page, &count)| {
                let cards: Vec<String> = (0..count)
                    .map(|i| card(&format!("p{}-{}", page + 1, i), Some("Rs. 1"), None))
                    .collect();
                results_page(&cards, page + 1 < counts.len())
            })
            .collect()
    }

    async fn crawl(pages: Vec<ScriptedPage>, config: &ListingConfig) -> (CrawlReport, bool) {
        let mut orchestrator =
            CrawlOrchestrator::new(ScriptedSurface::new(pages), NoImages, config).unwrap();
        let report = orchestrator.crawl_all(SEED, "mug").await;
        (report, orchestrator.surface().released())
    }

    #[tokio::test]
    async fn test_two_page_scenario() {
        let pages = vec![
            results_page(
                &[
                    card("Mug", Some("Rs. 499"), Some("//shop.example.com/mug")),
                    card("Kettle", None, None),
                ],
                true,
            ),
            results_page(&[], false),
        ];

        let (report, released) = crawl(pages, &quick_config()).await;

        assert_eq!(report.outcome, CrawlOutcome::Exhausted);
        assert_eq!(report.pages, 2);
        assert!(released);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].link.as_deref(), Some("https://shop.example.com/mug"));
        assert_eq!(report.records[1].title, "Kettle");
        assert_eq!(report.records[1].price, UNKNOWN);
        assert_eq!(report.records[1].link, None);
        assert!(report.records.iter().all(|r| r.image.is_none()));

        assert_eq!(
            Block::from_record(&report.records[1]).link,
            LinkCell::Placeholder(NO_LINK)
        );

        let dir = tempfile::tempdir().unwrap();
        let mut assembler = DocumentAssembler::new(PdfLayout::new("mug"));
        for record in &report.records {
            assembler.add_record(record);
        }
        assert_eq!(assembler.block_count(), 2);
        assembler.finalize(dir.path().join("mug.pdf")).unwrap();
    }

    #[tokio::test]
    async fn test_records_concatenate_in_page_order() {
        let (report, _) = crawl(numbered_pages(&[3, 1, 0, 2]), &quick_config()).await;

        assert_eq!(report.outcome, CrawlOutcome::Exhausted);
        assert_eq!(report.pages, 4);
        let titles: Vec<_> = report.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["p1-0", "p1-1", "p1-2", "p2-0", "p4-0", "p4-1"]);
    }

    #[tokio::test]
    async fn test_page_limit_outcome() {
        let mut config = quick_config();
        config.max_pages = 2;

        let (report, released) = crawl(numbered_pages(&[1, 1, 1, 1]), &config).await;

        assert_eq!(report.outcome, CrawlOutcome::PageLimit { pages: 2 });
        assert_eq!(report.records.len(), 2);
        assert!(released);
    }

    #[tokio::test]
    async fn test_limit_on_last_page_is_exhausted() {
        let mut config = quick_config();
        config.max_pages = 2;

        let (report, _) = crawl(numbered_pages(&[1, 1]), &config).await;

        assert_eq!(report.outcome, CrawlOutcome::Exhausted);
    }

    #[tokio::test]
    async fn test_repeated_page_is_stuck() {
        let same = vec![card("Mug", Some("Rs. 499"), None)];
        let pages = vec![
            results_page(&same, true),
            results_page(&same, true),
            results_page(&same, true),
        ];

        let (report, _) = crawl(pages, &quick_config()).await;

        assert_eq!(report.outcome, CrawlOutcome::Stuck { page: 2 });
        assert_eq!(report.records.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_pages_are_not_mistaken_for_repeats() {
        let blank = r#"<div class="Bm3ON"><p>sold out</p></div>"#.to_string();
        let pages = vec![
            results_page(&[blank.clone(), blank.clone()], true),
            results_page(&[blank.clone(), blank.clone()], true),
            results_page(&[blank.clone(), blank], false),
        ];

        let (report, _) = crawl(pages, &quick_config()).await;

        assert_eq!(report.outcome, CrawlOutcome::Exhausted);
        assert_eq!(report.pages, 3);
        assert_eq!(report.records.len(), 6);
        assert!(report.records.iter().all(Record::is_blank));
    }

    #[test]
    fn test_blank_records_do_not_fingerprint() {
        let blank = Record::new(UNKNOWN.into(), UNKNOWN.into(), None, None);
        let named = Record::new("Mug".into(), UNKNOWN.into(), None, None);

        assert_eq!(fingerprint(&[blank.clone(), blank.clone()]), None);
        assert_eq!(
            fingerprint(&[blank, named.clone()]),
            fingerprint(&[named])
        );
    }

    #[tokio::test]
    async fn test_markup_failure_interrupts_and_keeps_earlier_pages() {
        let surface = ScriptedSurface::new(numbered_pages(&[2, 1, 3])).failing_markup_on(2);
        let mut orchestrator = CrawlOrchestrator::new(surface, NoImages, &quick_config()).unwrap();

        let report = orchestrator.crawl_all(SEED, "mug").await;

        assert!(matches!(report.outcome, CrawlOutcome::Interrupted { page: 3, .. }));
        assert_eq!(report.pages, 2);
        let titles: Vec<_> = report.records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["p1-0", "p1-1", "p2-0"]);
        assert!(orchestrator.surface().released());
    }

    #[tokio::test]
    async fn test_missing_search_control_degrades_to_empty_crawl() {
        let surface = ScriptedSurface::new(numbered_pages(&[2])).without_search();
        let mut orchestrator = CrawlOrchestrator::new(surface, NoImages, &quick_config()).unwrap();

        let report = orchestrator.crawl_all(SEED, "mug").await;

        assert_eq!(report.outcome, CrawlOutcome::SearchUnavailable);
        assert!(report.records.is_empty());
        assert_eq!(report.pages, 0);
        assert!(orchestrator.surface().released());
    }

    #[test]
    fn test_state_threading() {
        let record = Record::new("a".into(), "1".into(), None, None);
        let state = CrawlState::new();
        assert!(state.has_next_page());
        assert!(!state.current_page_loaded());
        assert_eq!(state.pending_page(), 1);

        let state = state.absorb(vec![record.clone()]);
        assert!(state.current_page_loaded());
        assert_eq!(state.pending_page(), 1);
        assert!(state.repeats(&[record.clone()]));
        assert!(!state.repeats(&[]));

        let state = state.advanced(true);
        assert!(!state.current_page_loaded());
        assert_eq!(state.pending_page(), 2);
        assert!(state.has_next_page());

        let report = state.finish(CrawlOutcome::Exhausted);
        assert_eq!(report.records, vec![record]);
        assert_eq!(report.pages, 1);
    }
}
