use crate::config::Selectors;
use crate::error::{Result, ScrapeError};
use crate::loader::PageHandle;
use crate::parsers::images::ImageFetcher;
use crate::results::{Record, UNKNOWN};
use crate::utils::{collapse_whitespace, normalize_link};
use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};

/// Where a field's value lives on the matched node
#[derive(Debug, Clone, Copy)]
enum Source {
    Text,
    Attr(&'static str),
}

/// One field of a container: a selector plus where to read the value from
#[derive(Debug)]
struct FieldProbe {
    name: &'static str,
    selector: Selector,
    source: Source,
}

impl FieldProbe {
    fn new(name: &'static str, selector: &str, source: Source) -> Result<Self> {
        Ok(Self {
            name,
            selector: compile(selector)?,
            source,
        })
    }

    /// First matching node's value, `None` on a missing node, attribute, or empty value
    fn read(&self, container: ElementRef<'_>) -> Option<String> {
        let node = container.select(&self.selector).next()?;
        let value = match self.source {
            Source::Text => collapse_whitespace(&node.text().collect::<String>()),
            Source::Attr(attr) => node.value().attr(attr)?.trim().to_string(),
        };
        Some(value).filter(|v| !v.is_empty())
    }
}

/// Reads one field, degrading any miss to `sentinel`. Every field goes through
/// here so a failing field can never take its container down with it.
fn extract_or<T>(
    container: ElementRef<'_>,
    index: usize,
    probe: &FieldProbe,
    convert: impl FnOnce(String) -> T,
    sentinel: T,
) -> T {
    match probe.read(container) {
        Some(value) => convert(value),
        None => {
            ::log::trace!("Container {} has no {}", index, probe.name);
            sentinel
        }
    }
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::Selector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Text fields of one container, before its image is fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContainer {
    pub title: String,
    pub price: String,
    pub link: Option<String>,
    pub image_url: Option<String>,
}

/// Turns rendered listing markup into records
pub struct RecordExtractor<F: ImageFetcher> {
    container: Selector,
    title: FieldProbe,
    price: FieldProbe,
    link: FieldProbe,
    image: FieldProbe,
    fetcher: F,
    image_concurrency: usize,
}

impl<F: ImageFetcher> RecordExtractor<F> {
    /// Compiles the configured selectors; an unparsable selector is rejected here
    pub fn new(selectors: &Selectors, fetcher: F, image_concurrency: usize) -> Result<Self> {
        Ok(Self {
            container: compile(&selectors.container)?,
            title: FieldProbe::new("title", &selectors.title, Source::Text)?,
            price: FieldProbe::new("price", &selectors.price, Source::Text)?,
            link: FieldProbe::new("link", &selectors.link, Source::Attr("href"))?,
            image: FieldProbe::new("image", &selectors.image, Source::Attr("src"))?,
            fetcher,
            image_concurrency: image_concurrency.max(1),
        })
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Extracts every container on the page, in document order
    pub async fn extract(&self, handle: &PageHandle) -> Vec<Record> {
        let containers = self.parse(handle);
        let image_urls = containers.iter().map(|c| c.image_url.clone()).collect();
        let images = self.fetch_images(image_urls).await;

        let records: Vec<Record> = containers
            .into_iter()
            .zip(images)
            .map(|(c, image)| Record::new(c.title, c.price, c.link, image))
            .collect();

        ::log::info!("Extracted {} records from page {}", records.len(), handle.page());
        records
    }

    /// Reads the text fields of each container without touching the network
    pub fn parse(&self, handle: &PageHandle) -> Vec<ParsedContainer> {
        let doc = Html::parse_document(handle.markup());

        doc.select(&self.container)
            .enumerate()
            .map(|(index, container)| ParsedContainer {
                title: extract_or(container, index, &self.title, |t| t, UNKNOWN.to_string()),
                price: extract_or(container, index, &self.price, |p| p, UNKNOWN.to_string()),
                link: extract_or(container, index, &self.link, |l| Some(normalize_link(&l)), None),
                image_url: extract_or(
                    container,
                    index,
                    &self.image,
                    |src| Some(normalize_link(&src)),
                    None,
                ),
            })
            .collect()
    }

    /// Fetches images concurrently and joins them back by container index
    async fn fetch_images(&self, urls: Vec<Option<String>>) -> Vec<Option<Vec<u8>>> {
        let mut slots: Vec<Option<Vec<u8>>> = vec![None; urls.len()];
        let fetcher = &self.fetcher;

        let jobs = urls
            .into_iter()
            .enumerate()
            .filter_map(|(index, url)| url.map(|url| (index, url)));

        let mut results = stream::iter(jobs)
            .map(|(index, url)| async move {
                let result = fetcher.fetch(&url).await;
                (index, result)
            })
            .buffer_unordered(self.image_concurrency);

        while let Some((index, result)) = results.next().await {
            match result {
                Ok(bytes) => slots[index] = Some(bytes),
                Err(e) => ::log::warn!("Image for container {} unavailable: {}", index, e),
            }
        }

        slots
    }
}
