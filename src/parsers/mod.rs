pub mod images;
pub mod listing;

#[cfg(test)]
mod tests;

pub use images::{HttpImageFetcher, ImageFetcher};
pub use listing::{ParsedContainer, RecordExtractor};
