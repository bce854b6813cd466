use crate::error::{Result, ScrapeError};
use crate::surface::RenderSurface;
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::time::Duration;

/// A results page as the scripted surface renders it
#[derive(Debug, Clone)]
pub struct ScriptedPage {
    pub html: String,
    /// Successive `scrollHeight` readings; the last one repeats
    pub heights: Vec<u64>,
}

impl ScriptedPage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            heights: vec![600],
        }
    }

    pub fn with_heights(mut self, heights: Vec<u64>) -> Self {
        self.heights = heights;
        self
    }
}

#[derive(Debug, Default)]
struct ScriptedState {
    on_landing: bool,
    page: usize,
    height_reads: usize,
    scroll_offsets: Vec<u64>,
    submitted: Option<String>,
    visited: Vec<String>,
    activations: usize,
    released: bool,
}

/// In-memory rendering surface walking a fixed sequence of pages
pub struct ScriptedSurface {
    landing: String,
    pages: Vec<ScriptedPage>,
    /// Results page (0-based) whose markup cannot be read
    markup_failure: Option<usize>,
    scripts_fail: bool,
    state: Mutex<ScriptedState>,
}

/// Element handle: the selector that located it
#[derive(Debug, Clone)]
pub struct ScriptedElement(pub String);

pub fn listing_page(body: &str) -> String {
    format!("<html><body>{}</body></html>", body)
}

impl ScriptedSurface {
    pub fn new(pages: Vec<ScriptedPage>) -> Self {
        Self {
            landing: listing_page(r#"<form><input id="q" name="q"></form>"#),
            pages,
            markup_failure: None,
            scripts_fail: false,
            state: Mutex::new(ScriptedState {
                on_landing: true,
                ..ScriptedState::default()
            }),
        }
    }

    /// Landing page without a search control
    pub fn without_search(mut self) -> Self {
        self.landing = listing_page("<p>maintenance</p>");
        self
    }

    /// `current_markup` fails once the crawl reaches results page `page` (0-based)
    pub fn failing_markup_on(mut self, page: usize) -> Self {
        self.markup_failure = Some(page);
        self
    }

    /// Every `execute_script` call fails, as with a crashed renderer
    pub fn failing_scripts(mut self) -> Self {
        self.scripts_fail = true;
        self
    }

    /// Start on the first results page, as if a search had already run
    pub fn on_results(self) -> Self {
        self.state.lock().unwrap().on_landing = false;
        self
    }

    pub fn submitted(&self) -> Option<String> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn visited(&self) -> Vec<String> {
        self.state.lock().unwrap().visited.clone()
    }

    pub fn scroll_offsets(&self) -> Vec<u64> {
        self.state.lock().unwrap().scroll_offsets.clone()
    }

    pub fn activations(&self) -> usize {
        self.state.lock().unwrap().activations
    }

    pub fn released(&self) -> bool {
        self.state.lock().unwrap().released
    }

    fn markup(&self, state: &ScriptedState) -> String {
        if state.on_landing {
            self.landing.clone()
        } else {
            self.pages
                .get(state.page)
                .map(|p| p.html.clone())
                .unwrap_or_else(|| listing_page(""))
        }
    }
}

fn count(html: &str, selector: &str) -> Result<usize> {
    let parsed = Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Html::parse_document(html).select(&parsed).count())
}

#[async_trait]
impl RenderSurface for ScriptedSurface {
    type Element = ScriptedElement;

    async fn navigate(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.visited.push(url.to_string());
        state.on_landing = true;
        Ok(())
    }

    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        if self.scripts_fail {
            return Err(ScrapeError::Driver("javascript error: renderer crashed".into()));
        }
        let mut state = self.state.lock().unwrap();
        if let Some(rest) = script.strip_prefix("window.scrollTo(0, ") {
            // Scrolls to `document.body.scrollHeight` are not recorded
            if let Ok(offset) = rest.trim_end_matches(");").parse::<u64>() {
                state.scroll_offsets.push(offset);
            }
            return Ok(Value::Null);
        }
        if script.contains("scrollHeight") {
            let heights = self
                .pages
                .get(state.page)
                .map(|p| p.heights.clone())
                .unwrap_or_else(|| vec![0]);
            let idx = state.height_reads.min(heights.len().saturating_sub(1));
            state.height_reads += 1;
            return Ok(json!(heights.get(idx).copied().unwrap_or(0)));
        }
        if script.contains("querySelectorAll") {
            let selector = args
                .first()
                .and_then(|v| v.as_str())
                .ok_or_else(|| ScrapeError::Driver("missing selector argument".into()))?;
            return Ok(json!(count(&self.markup(&state), selector)?));
        }
        Err(ScrapeError::Driver(format!("unscripted script: {}", script)))
    }

    async fn current_markup(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        if !state.on_landing && self.markup_failure == Some(state.page) {
            return Err(ScrapeError::Driver("session not reachable".into()));
        }
        Ok(self.markup(&state))
    }

    async fn wait_for(&self, selector: &str, _within: Duration) -> Result<Option<ScriptedElement>> {
        let state = self.state.lock().unwrap();
        if count(&self.markup(&state), selector)? > 0 {
            Ok(Some(ScriptedElement(selector.to_string())))
        } else {
            Ok(None)
        }
    }

    async fn type_and_submit(&self, _element: &ScriptedElement, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.submitted = Some(text.to_string());
        state.on_landing = false;
        state.page = 0;
        state.height_reads = 0;
        Ok(())
    }

    async fn activate(&self, _element: &ScriptedElement) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.activations += 1;
        state.page += 1;
        state.height_reads = 0;
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.state.lock().unwrap().released = true;
        Ok(())
    }
}
