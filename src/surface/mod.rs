//! Seam between the crawl logic and whatever renders the listing.
//!
//! Production code drives a real browser through WebDriver; tests drive a
//! scripted surface that evaluates selectors against fixture HTML.

pub mod webdriver;

#[cfg(test)]
pub(crate) mod scripted;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub use webdriver::WebDriverSurface;

/// Capabilities the crawler needs from a rendering surface
#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Opaque reference to an element located on the current page
    type Element: Send + Sync;

    /// Load the given URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Run a script in the page and return its value
    async fn execute_script(&self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Current rendered markup
    async fn current_markup(&self) -> Result<String>;

    /// Wait up to `within` for an element matching `selector`.
    ///
    /// Returns `Ok(None)` when nothing matched before the bound expired.
    async fn wait_for(&self, selector: &str, within: Duration) -> Result<Option<Self::Element>>;

    /// Replace the element's value with `text` and press Enter
    async fn type_and_submit(&self, element: &Self::Element, text: &str) -> Result<()>;

    /// Dispatch a synthetic click on the element and let it bubble
    async fn activate(&self, element: &Self::Element) -> Result<()>;

    /// Release the underlying session
    async fn release(&self) -> Result<()>;
}
