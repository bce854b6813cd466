use crate::config::ListingConfig;
use crate::error::{Result, ScrapeError};
use crate::surface::RenderSurface;
use serde_json::{Value, json};
use std::time::Duration;

/// Hard stop for the scroll loop should the page height never settle
const MAX_SCROLL_STEPS: usize = 500;

const SCROLL_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight;";
const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";
const CONTAINER_COUNT_SCRIPT: &str = "return document.querySelectorAll(arguments[0]).length;";

/// Snapshot of the rendered markup of one results page.
///
/// A handle is only meaningful for the page it was taken on; after the
/// pagination control advances, materialize again.
#[derive(Debug, Clone)]
pub struct PageHandle {
    page: usize,
    markup: String,
}

impl PageHandle {
    pub fn new(page: usize, markup: String) -> Self {
        Self { page, markup }
    }

    /// 1-based page number within the series
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }
}

/// Drives the rendering surface: search submission and lazy-load scrolling
pub struct ContentLoader<S: RenderSurface> {
    surface: S,
    search_selector: String,
    container_selector: String,
    scroll_step_px: u64,
    scroll_delay: Duration,
    stability_checks: usize,
    wait_timeout: Duration,
    page: usize,
}

impl<S: RenderSurface> ContentLoader<S> {
    pub fn new(surface: S, config: &ListingConfig) -> Self {
        Self {
            surface,
            search_selector: config.selectors.search_input.clone(),
            container_selector: config.selectors.container.clone(),
            scroll_step_px: config.scroll_step_px.max(1),
            scroll_delay: config.scroll_delay(),
            stability_checks: config.stability_checks,
            wait_timeout: config.wait_timeout(),
            page: 0,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Current 1-based page number, 0 before a search was submitted
    pub fn page(&self) -> usize {
        self.page
    }

    /// Navigates to the landing page and submits `query` into its search control
    pub async fn open(&mut self, seed_url: &str, query: &str) -> Result<()> {
        ::log::info!("Opening {} and searching for {:?}", seed_url, query);
        self.surface.navigate(seed_url).await?;

        let search = self
            .surface
            .wait_for(&self.search_selector, self.wait_timeout)
            .await?
            .ok_or_else(|| ScrapeError::Navigation {
                url: seed_url.to_string(),
                selector: self.search_selector.clone(),
            })?;

        self.surface.type_and_submit(&search, query).await?;
        self.page = 1;
        Ok(())
    }

    /// Records that the pagination control moved to the next page
    pub fn page_advanced(&mut self) {
        self.page += 1;
    }

    /// Scrolls the current page until lazy content stops appearing and returns its markup
    pub async fn materialize(&mut self) -> Result<PageHandle> {
        match self.scroll_through().await {
            Ok(steps) => ::log::debug!("Page {} scrolled in {} steps", self.page, steps),
            Err(e) => ::log::warn!("Scrolling page {} failed: {}", self.page, e),
        }

        if self.stability_checks > 0 {
            match self.settle_container_count().await {
                Ok(count) => ::log::debug!("Page {} settled at {} containers", self.page, count),
                Err(e) => ::log::warn!("Container count check on page {} failed: {}", self.page, e),
            }
        }

        let markup = self.surface.current_markup().await?;
        Ok(PageHandle::new(self.page, markup))
    }

    /// Steps down the page in fixed increments until the offset reaches the
    /// (possibly growing) scroll height. Returns the number of steps taken.
    async fn scroll_through(&self) -> Result<usize> {
        let mut offset = 0u64;
        let mut steps = 0;

        while steps < MAX_SCROLL_STEPS {
            self.surface
                .execute_script(&format!("window.scrollTo(0, {});", offset), vec![])
                .await?;
            tokio::time::sleep(self.scroll_delay).await;
            offset += self.scroll_step_px;
            steps += 1;

            let height = self.scroll_height().await?;
            if offset >= height {
                return Ok(steps);
            }
        }

        ::log::warn!(
            "Page {} still growing after {} scroll steps",
            self.page,
            MAX_SCROLL_STEPS
        );
        Ok(steps)
    }

    /// Scrolls to the bottom until two consecutive container counts agree
    async fn settle_container_count(&self) -> Result<u64> {
        let mut previous = self.container_count().await?;

        for _ in 0..self.stability_checks {
            self.surface
                .execute_script(SCROLL_TO_BOTTOM_SCRIPT, vec![])
                .await?;
            tokio::time::sleep(self.scroll_delay).await;

            let current = self.container_count().await?;
            if current == previous {
                return Ok(current);
            }
            previous = current;
        }

        Ok(previous)
    }

    async fn scroll_height(&self) -> Result<u64> {
        let value = self
            .surface
            .execute_script(SCROLL_HEIGHT_SCRIPT, vec![])
            .await?;
        as_count(&value, "scrollHeight")
    }

    async fn container_count(&self) -> Result<u64> {
        let value = self
            .surface
            .execute_script(CONTAINER_COUNT_SCRIPT, vec![json!(self.container_selector)])
            .await?;
        as_count(&value, "container count")
    }

    /// Releases the rendering session
    pub async fn release(&self) -> Result<()> {
        self.surface.release().await
    }
}

fn as_count(value: &Value, what: &str) -> Result<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|f| f.max(0.0) as u64))
        .ok_or_else(|| ScrapeError::Driver(format!("{} is not a number: {}", what, value)))
}
