pub mod listing;

pub use listing::{CrawlOrchestrator, CrawlState};
