use crate::document::{Block, Flowable, ImageCell, LINK_LABEL, LayoutEngine, LinkCell};
use crate::error::{Result, ScrapeError};
use image::{DynamicImage, GenericImageView};
use printpdf::{
    Actions, BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, LinkAnnotation,
    Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Point, Pt, Rect, Rgb,
};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

// US Letter, in points
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN: f32 = 36.0;

const IMAGE_COLUMN: f32 = 130.0;
const TEXT_COLUMN: f32 = 400.0;
const PADDING: f32 = 6.0;
const MAX_IMAGE_SIZE: f32 = 120.0;

const FONT_SIZE: f32 = 10.0;
const LEADING: f32 = 12.0;
/// Average Helvetica glyph width relative to the font size
const AVG_GLYPH_WIDTH: f32 = 0.55;
/// Title lines that fit one page next to the price and link lines
const MAX_TITLE_LINES: usize =
    ((PAGE_HEIGHT - 2.0 * MARGIN - 2.0 * PADDING) / LEADING) as usize - 2;
const ELLIPSIS: &str = "...";

fn mm(points: f32) -> Mm {
    Mm::from(Pt(points))
}

/// Greedy word wrap to at most `max_chars` per line; overlong words are split
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..max_chars).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Size an image is drawn at: shrunk to fit the image cell, never enlarged
pub(crate) fn fitted_size(picture: &DynamicImage) -> (f32, f32) {
    let (w, h) = (picture.width() as f32, picture.height() as f32);
    if w == 0.0 || h == 0.0 {
        return (0.0, 0.0);
    }
    let scale = (MAX_IMAGE_SIZE / w).min(MAX_IMAGE_SIZE / h).min(1.0);
    (w * scale, h * scale)
}

/// Wrapped title, cut short with an ellipsis so a block never outgrows a page
fn title_lines(block: &Block) -> Vec<String> {
    let max_chars = ((TEXT_COLUMN - 2.0 * PADDING) / (FONT_SIZE * AVG_GLYPH_WIDTH)) as usize;
    let mut lines = wrap_text(&block.title, max_chars);
    if lines.len() > MAX_TITLE_LINES {
        lines.truncate(MAX_TITLE_LINES);
        if let Some(last) = lines.last_mut() {
            let room = max_chars.saturating_sub(ELLIPSIS.len());
            if last.chars().count() > room {
                *last = last.chars().take(room).collect();
            }
            last.push_str(ELLIPSIS);
        }
    }
    lines
}

/// Row height of a block, in points
pub(crate) fn block_height(block: &Block) -> f32 {
    let image = match &block.image {
        ImageCell::Picture(picture) => fitted_size(picture).1,
        ImageCell::Placeholder(_) => LEADING,
    };
    // title lines, price line, link line
    let text = (title_lines(block).len() + 2) as f32 * LEADING;
    image.max(text) + 2.0 * PADDING
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Two-column product table on US Letter pages, written with `printpdf`
pub struct PdfLayout {
    title: String,
    flowables: Vec<Flowable>,
}

impl PdfLayout {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            flowables: Vec::new(),
        }
    }

    fn compose(&self) -> std::result::Result<PdfDocumentReference, printpdf::Error> {
        let (doc, page, layer) =
            PdfDocument::new(&self.title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
        let fonts = Fonts {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
        };

        let mut layer = doc.get_page(page).get_layer(layer);
        let top = PAGE_HEIGHT - MARGIN;
        let mut cursor = top;
        let mut pages = 1;

        for flowable in &self.flowables {
            match flowable {
                Flowable::Spacer(height) => cursor -= height,
                Flowable::Block(block) => {
                    let height = block_height(block);
                    if cursor - height < MARGIN && cursor < top {
                        let (page, index) =
                            doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), "Layer 1");
                        layer = doc.get_page(page).get_layer(index);
                        cursor = top;
                        pages += 1;
                    }
                    draw_block(&layer, &fonts, block, cursor, height);
                    cursor -= height;
                }
            }
        }

        ::log::debug!("Composed {} flowables onto {} pages", self.flowables.len(), pages);
        Ok(doc)
    }
}

fn grey() -> Color {
    Color::Rgb(Rgb::new(0.5, 0.5, 0.5, None))
}

fn black() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None))
}

fn blue() -> Color {
    Color::Rgb(Rgb::new(0.0, 0.0, 1.0, None))
}

fn stroke(layer: &PdfLayerReference, points: &[(f32, f32)], closed: bool) {
    layer.add_line(Line {
        points: points
            .iter()
            .map(|&(x, y)| (Point::new(mm(x), mm(y)), false))
            .collect(),
        is_closed: closed,
    });
}

fn draw_block(layer: &PdfLayerReference, fonts: &Fonts, block: &Block, top: f32, height: f32) {
    let left = (PAGE_WIDTH - IMAGE_COLUMN - TEXT_COLUMN) / 2.0;
    let divider = left + IMAGE_COLUMN;
    let right = divider + TEXT_COLUMN;
    let bottom = top - height;

    // outer box and inner grid
    layer.set_outline_color(grey());
    layer.set_outline_thickness(0.25);
    stroke(
        layer,
        &[(left, bottom), (right, bottom), (right, top), (left, top)],
        true,
    );
    stroke(layer, &[(divider, bottom), (divider, top)], false);

    // image cell, top aligned
    layer.set_fill_color(black());
    match &block.image {
        ImageCell::Picture(picture) => {
            let (w, h) = fitted_size(picture);
            let rgb = DynamicImage::ImageRgb8(picture.to_rgb8());
            let scale = if picture.width() > 0 {
                w / picture.width() as f32
            } else {
                1.0
            };
            Image::from_dynamic_image(&rgb).add_to_layer(
                layer.clone(),
                ImageTransform {
                    translate_x: Some(mm(left + PADDING)),
                    translate_y: Some(mm(top - PADDING - h)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(72.0),
                    ..Default::default()
                },
            );
        }
        ImageCell::Placeholder(text) => {
            layer.use_text(
                *text,
                FONT_SIZE,
                mm(left + PADDING),
                mm(top - PADDING - FONT_SIZE),
                &fonts.regular,
            );
        }
    }

    // text cell
    let x = divider + PADDING;
    let mut baseline = top - PADDING - FONT_SIZE;
    for line in title_lines(block) {
        layer.use_text(line, FONT_SIZE, mm(x), mm(baseline), &fonts.bold);
        baseline -= LEADING;
    }
    layer.use_text(
        block.price_line.clone(),
        FONT_SIZE,
        mm(x),
        mm(baseline),
        &fonts.regular,
    );
    baseline -= LEADING;

    match &block.link {
        LinkCell::Link(url) => {
            let width = LINK_LABEL.len() as f32 * FONT_SIZE * AVG_GLYPH_WIDTH;
            layer.set_fill_color(blue());
            layer.use_text(LINK_LABEL, FONT_SIZE, mm(x), mm(baseline), &fonts.regular);
            layer.set_fill_color(black());

            layer.set_outline_color(blue());
            stroke(layer, &[(x, baseline - 1.5), (x + width, baseline - 1.5)], false);
            layer.add_link_annotation(LinkAnnotation::new(
                Rect::new(mm(x), mm(baseline - 3.0), mm(x + width), mm(baseline + FONT_SIZE)),
                None,
                None,
                Actions::uri(url.clone()),
                None,
            ));
        }
        LinkCell::Placeholder(text) => {
            layer.use_text(*text, FONT_SIZE, mm(x), mm(baseline), &fonts.regular);
        }
    }
}

impl LayoutEngine for PdfLayout {
    fn push(&mut self, flowable: Flowable) {
        self.flowables.push(flowable);
    }

    fn render_to(&mut self, path: &Path) -> Result<()> {
        let write_error = |reason: String| ScrapeError::DocumentWrite {
            path: path.display().to_string(),
            reason,
        };

        let doc = self.compose().map_err(|e| write_error(e.to_string()))?;
        let file = File::create(path).map_err(|e| write_error(e.to_string()))?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| write_error(e.to_string()))?;
        Ok(())
    }
}
