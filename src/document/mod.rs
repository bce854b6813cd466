//! Turns extracted records into a laid-out product document.

pub mod pdf;

use crate::error::Result;
use crate::results::Record;
use image::DynamicImage;
use std::path::Path;

pub use pdf::PdfLayout;

pub const NO_IMAGE: &str = "No Image";
pub const IMAGE_ERROR: &str = "Image error";
pub const NO_LINK: &str = "No product link available";
pub const LINK_LABEL: &str = "View Product";

/// Vertical gap between two product blocks, in points
pub const BLOCK_SPACING_PT: f32 = 12.0;

/// Left cell of a product block
#[derive(Debug, Clone)]
pub enum ImageCell {
    Picture(DynamicImage),
    Placeholder(&'static str),
}

/// Last line of the text cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCell {
    Link(String),
    Placeholder(&'static str),
}

/// One product row: picture beside title, price and link
#[derive(Debug, Clone)]
pub struct Block {
    pub image: ImageCell,
    /// Rendered in bold
    pub title: String,
    pub price_line: String,
    pub link: LinkCell,
}

impl Block {
    /// Builds the block for a record, substituting placeholders for absent fields
    pub fn from_record(record: &Record) -> Self {
        let image = match &record.image {
            None => ImageCell::Placeholder(NO_IMAGE),
            Some(bytes) => match image::load_from_memory(bytes) {
                Ok(picture) => ImageCell::Picture(picture),
                Err(e) => {
                    ::log::debug!("Undecodable image for {:?}: {}", record.title, e);
                    ImageCell::Placeholder(IMAGE_ERROR)
                }
            },
        };

        let link = match &record.link {
            Some(url) => LinkCell::Link(url.clone()),
            None => LinkCell::Placeholder(NO_LINK),
        };

        Self {
            image,
            title: record.title.clone(),
            price_line: format!("Price: {}", record.price),
            link,
        }
    }
}

/// Items a layout engine flows onto pages
#[derive(Debug, Clone)]
pub enum Flowable {
    Block(Block),
    /// Vertical space, in points
    Spacer(f32),
}

/// Flows blocks onto pages and writes the result
pub trait LayoutEngine {
    fn push(&mut self, flowable: Flowable);

    /// Composes every pushed flowable and persists the document at `path`
    fn render_to(&mut self, path: &Path) -> Result<()>;
}

/// Collects records as blocks and hands them to a layout engine
pub struct DocumentAssembler<L: LayoutEngine> {
    engine: L,
    blocks: usize,
}

impl<L: LayoutEngine> DocumentAssembler<L> {
    pub fn new(engine: L) -> Self {
        Self { engine, blocks: 0 }
    }

    /// Appends the record's block followed by the standard spacing
    pub fn add_record(&mut self, record: &Record) {
        self.engine.push(Flowable::Block(Block::from_record(record)));
        self.engine.push(Flowable::Spacer(BLOCK_SPACING_PT));
        self.blocks += 1;
    }

    pub fn block_count(&self) -> usize {
        self.blocks
    }

    /// Renders the document. Consumes the assembler, so a document is written at most once.
    pub fn finalize(mut self, path: impl AsRef<Path>) -> Result<L> {
        let path = path.as_ref();
        self.engine.render_to(path)?;
        ::log::info!("Document with {} products saved as {}", self.blocks, path.display());
        Ok(self.engine)
    }
}
