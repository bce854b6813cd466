use crate::config::ListingConfig;
use crate::surface::RenderSurface;
use std::time::Duration;

/// Finds and activates the forward pagination control.
///
/// The configured selector must only match the forward control of the
/// pagination widget while it is enabled, so "not found within the wait
/// bound" means the current page is the last one.
pub struct PaginationController {
    next_selector: String,
    wait_timeout: Duration,
    settle_delay: Duration,
}

impl PaginationController {
    pub fn new(config: &ListingConfig) -> Self {
        Self {
            next_selector: config.selectors.next_page.clone(),
            wait_timeout: config.wait_timeout(),
            settle_delay: config.settle_delay(),
        }
    }

    /// Whether an enabled forward control is present, without activating it
    pub async fn has_next<S: RenderSurface>(&self, surface: &S) -> bool {
        matches!(
            surface.wait_for(&self.next_selector, self.wait_timeout).await,
            Ok(Some(_))
        )
    }

    /// Moves to the next page. Returns `false` once the series is exhausted.
    pub async fn advance<S: RenderSurface>(&self, surface: &S) -> bool {
        let control = match surface.wait_for(&self.next_selector, self.wait_timeout).await {
            Ok(Some(control)) => control,
            Ok(None) => {
                ::log::info!("No enabled next-page control found, reached last page");
                return false;
            }
            Err(e) => {
                ::log::warn!("Looking for next-page control failed: {}", e);
                return false;
            }
        };

        // Click the control's container and let the event reach the inner button
        if let Err(e) = surface.activate(&control).await {
            ::log::warn!("Activating next-page control failed: {}", e);
            return false;
        }

        tokio::time::sleep(self.settle_delay).await;
        true
    }
}
