//! The drawing surface a report is rendered onto.
//!
//! A surface only knows absolute positions: the page writer owns the cursor
//! and decides where every piece of text goes. Coordinates are inches from the
//! top-left corner of the page.
//!
//! [`PdfSurface`](crate::pdf_generator::PdfSurface) produces a real document;
//! [`RecordingSurface`] keeps the calls so layout decisions can be checked
//! without parsing PDF output.

use crate::error::{ReportError, Result};
use crate::image::ReportImage;
use crate::metrics::Font;

/// Placeholder for the total page count, replaced when the document is
/// serialized.
pub const TOTAL_PAGES_ALIAS: &str = "{nb}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const BLACK: Rgb = Rgb(0, 0, 0);

    pub const fn gray(level: u8) -> Rgb {
        Rgb(level, level, level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageOrientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US letter in the given orientation.
    pub fn letter(orientation: PageOrientation) -> Self {
        match orientation {
            PageOrientation::Portrait => PageSize { width: 8.5, height: 11.0 },
            PageOrientation::Landscape => PageSize { width: 11.0, height: 8.5 },
        }
    }
}

pub trait DrawingSurface {
    /// Start a new page; later calls draw onto it.
    fn begin_page(&mut self, size: PageSize);

    fn set_font(&mut self, font: Font);

    fn set_text_color(&mut self, color: Rgb);

    /// Color used for lines and rectangles.
    fn set_draw_color(&mut self, color: Rgb);

    /// Draw a run of text with its baseline at `y`.
    fn text(&mut self, x: f32, y: f32, text: &str);

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32);

    /// Stroke (not fill) a rectangle.
    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32);

    fn image(&mut self, image: &ReportImage, x: f32, y: f32, width: f32, height: f32);

    /// Make an area of the current page a link to `url`.
    fn link(&mut self, x: f32, y: f32, width: f32, height: f32, url: &str);

    /// Serialize the document. Occurrences of [`TOTAL_PAGES_ALIAS`] in drawn
    /// text are replaced with the number of pages.
    fn finish(&mut self) -> Result<Vec<u8>>;
}

/// A call made on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    BeginPage(PageSize),
    Text { x: f32, y: f32, text: String, font: Font, color: Rgb },
    Line { x1: f32, y1: f32, x2: f32, y2: f32, color: Rgb },
    Rect { x: f32, y: f32, width: f32, height: f32 },
    Image { source: String, x: f32, y: f32, width: f32, height: f32 },
    Link { x: f32, y: f32, width: f32, height: f32, url: String },
}

/// Keeps every drawing call in order.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
    font: Font,
    text_color: Rgb,
    draw_color: Rgb,
    fail_on_finish: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            font: Font::regular(12.0),
            text_color: Rgb::BLACK,
            draw_color: Rgb::BLACK,
            fail_on_finish: false,
        }
    }

    /// A surface whose `finish` fails, for exercising error paths.
    pub fn failing() -> Self {
        Self { fail_on_finish: true, ..Self::new() }
    }

    pub fn page_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, DrawOp::BeginPage(_))).count()
    }

    pub fn image_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, DrawOp::Image { .. })).count()
    }

    /// All drawn text runs, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of text runs exactly equal to `text`.
    pub fn count_text(&self, text: &str) -> usize {
        self.texts().iter().filter(|t| **t == text).count()
    }

    /// Text runs drawn on each page, one vector per page.
    pub fn texts_by_page(&self) -> Vec<Vec<&str>> {
        let mut pages: Vec<Vec<&str>> = Vec::new();
        for op in &self.ops {
            match op {
                DrawOp::BeginPage(_) => pages.push(Vec::new()),
                DrawOp::Text { text, .. } => {
                    if let Some(page) = pages.last_mut() {
                        page.push(text.as_str());
                    }
                }
                _ => {}
            }
        }
        pages
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawingSurface for RecordingSurface {
    fn begin_page(&mut self, size: PageSize) {
        self.ops.push(DrawOp::BeginPage(size));
    }

    fn set_font(&mut self, font: Font) {
        self.font = font;
    }

    fn set_text_color(&mut self, color: Rgb) {
        self.text_color = color;
    }

    fn set_draw_color(&mut self, color: Rgb) {
        self.draw_color = color;
    }

    fn text(&mut self, x: f32, y: f32, text: &str) {
        self.ops.push(DrawOp::Text {
            x,
            y,
            text: text.to_string(),
            font: self.font,
            color: self.text_color,
        });
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        self.ops.push(DrawOp::Line { x1, y1, x2, y2, color: self.draw_color });
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::Rect { x, y, width, height });
    }

    fn image(&mut self, image: &ReportImage, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(DrawOp::Image { source: image.source.clone(), x, y, width, height });
    }

    fn link(&mut self, x: f32, y: f32, width: f32, height: f32, url: &str) {
        self.ops.push(DrawOp::Link { x, y, width, height, url: url.to_string() });
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if self.fail_on_finish {
            return Err(ReportError::Serialization("recording surface set to fail".to_string()));
        }
        let pages = self.page_count().to_string();
        let listing: Vec<String> = self
            .ops
            .iter()
            .map(|op| format!("{:?}", op).replace(TOTAL_PAGES_ALIAS, &pages))
            .collect();
        Ok(listing.join("\n").into_bytes())
    }
}
