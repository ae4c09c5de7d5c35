//! Cursor-based page writer.
//!
//! The writer owns the [`ReportContext`] of one render call and turns flowing
//! cell and multi-line cell calls into absolutely positioned drawing calls.
//! Every page gets the same furniture: a header line with the site title, an
//! optional deep link and a rule, and a footer with the date and page number.

use crate::error::Result;
use crate::image::ReportImage;
use crate::metrics::{string_width, wrap_lines, Font, CELL_MARGIN};
use crate::surface::{DrawingSurface, PageOrientation, PageSize, Rgb, TOTAL_PAGES_ALIAS};

pub const PAGE_MARGIN: f32 = 0.75;
/// Distance from the bottom edge at which flowing content breaks to a new page (2 cm).
pub const AUTO_BREAK_MARGIN: f32 = 0.7875;
pub const HEADER_RULE_Y: f32 = 1.1;
pub const HEADER_RULE_LEFT: f32 = 0.8;
/// Where the body starts on every page.
pub const BODY_TOP: f32 = 1.25;

const HEADER_HEIGHT: f32 = 0.2;
const HEADER_FONT_SIZE: f32 = 10.0;
const HEADER_LINK_FONT_SIZE: f32 = 9.0;
const FOOTER_OFFSET: f32 = 0.5;
const FOOTER_FONT_SIZE: f32 = 8.0;
const FURNITURE_GRAY: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    HeaderEmitted,
    BodyFlowing,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub left: f32,
    pub top: f32,
    pub right: f32,
}

/// Page geometry, cursor and phase of a report being rendered.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub orientation: PageOrientation,
    pub page_size: PageSize,
    pub margins: Margins,
    pub break_margin: f32,
    pub x: f32,
    pub y: f32,
    /// Current page, 0 before the first page exists.
    pub page_number: u32,
    /// Private values are only drawn for authenticated viewers.
    pub viewer_is_authenticated: bool,
    pub phase: ReportPhase,
}

impl ReportContext {
    pub fn new(orientation: PageOrientation, viewer_is_authenticated: bool) -> Self {
        let margins = Margins { left: PAGE_MARGIN, top: PAGE_MARGIN, right: PAGE_MARGIN };
        Self {
            orientation,
            page_size: PageSize::letter(orientation),
            margins,
            break_margin: AUTO_BREAK_MARGIN,
            x: margins.left,
            y: margins.top,
            page_number: 0,
            viewer_is_authenticated,
            phase: ReportPhase::HeaderEmitted,
        }
    }

    /// Y position beyond which content no longer fits on the page.
    pub fn page_break_trigger(&self) -> f32 {
        self.page_size.height - self.break_margin
    }

    /// Width between the side margins.
    pub fn content_width(&self) -> f32 {
        self.page_size.width - self.margins.left - self.margins.right
    }

    /// Right end of the header rule and detail separators.
    pub fn rule_right(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => 7.70,
            PageOrientation::Landscape => 10.20,
        }
    }
}

/// Text drawn on every page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFurniture {
    pub title: String,
    /// Deep link shown right-aligned in the header
    pub link: Option<String>,
    /// Date shown in the footer
    pub date: String,
}

impl PageFurniture {
    pub fn new(title: impl Into<String>, link: Option<String>) -> Self {
        Self {
            title: title.into(),
            link,
            date: chrono::Local::now().format("%-m/%-d/%Y").to_string(),
        }
    }
}

pub struct PageWriter<S: DrawingSurface> {
    surface: S,
    ctx: ReportContext,
    furniture: PageFurniture,
    font: Font,
    text_color: Rgb,
    draw_color: Rgb,
}

impl<S: DrawingSurface> PageWriter<S> {
    pub fn new(surface: S, ctx: ReportContext, furniture: PageFurniture) -> Self {
        Self {
            surface,
            ctx,
            furniture,
            font: Font::regular(HEADER_FONT_SIZE),
            text_color: Rgb::BLACK,
            draw_color: Rgb::BLACK,
        }
    }

    pub fn context(&self) -> &ReportContext {
        &self.ctx
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn x(&self) -> f32 {
        self.ctx.x
    }

    pub fn y(&self) -> f32 {
        self.ctx.y
    }

    pub fn page_number(&self) -> u32 {
        self.ctx.page_number
    }

    pub fn font(&self) -> Font {
        self.font
    }

    /// Move to `y` and back to the left margin.
    pub fn set_y(&mut self, y: f32) {
        self.ctx.x = self.ctx.margins.left;
        self.ctx.y = y;
    }

    /// Line break: back to the left margin and `h` down.
    pub fn ln(&mut self, h: f32) {
        self.ctx.x = self.ctx.margins.left;
        self.ctx.y += h;
    }

    pub fn set_font(&mut self, font: Font) {
        self.font = font;
        self.surface.set_font(font);
    }

    pub fn set_text_color(&mut self, color: Rgb) {
        self.text_color = color;
        self.surface.set_text_color(color);
    }

    pub fn set_draw_color(&mut self, color: Rgb) {
        self.draw_color = color;
        self.surface.set_draw_color(color);
    }

    /// Whether something `height` tall drawn at the cursor would cross the
    /// page-break trigger.
    pub fn would_overflow(&self, height: f32) -> bool {
        self.ctx.y + height > self.ctx.page_break_trigger()
    }

    fn enter_phase(&mut self, phase: ReportPhase) {
        if self.ctx.phase != phase {
            log::debug!("Report phase {:?} -> {:?}", self.ctx.phase, phase);
            self.ctx.phase = phase;
        }
    }

    /// Mark the end of the report header; everything after is body content.
    pub fn begin_body(&mut self) {
        self.enter_phase(ReportPhase::BodyFlowing);
    }

    /// Close the current page (if any) and start a new one with its header.
    pub fn add_page(&mut self) {
        if self.ctx.page_number > 0 {
            self.draw_footer();
            log::debug!("Page break after page {}", self.ctx.page_number);
        }
        self.ctx.page_number += 1;
        self.surface.begin_page(self.ctx.page_size);
        self.draw_header();

        // Furniture changes the drawing state; put the caller's back.
        self.surface.set_font(self.font);
        self.surface.set_text_color(self.text_color);
        self.surface.set_draw_color(self.draw_color);
        self.ctx.x = self.ctx.margins.left;
        self.ctx.y = BODY_TOP;
    }

    fn draw_header(&mut self) {
        let left = self.ctx.margins.left;
        let top = self.ctx.margins.top;
        let width = self.ctx.content_width();

        self.surface.set_text_color(Rgb::gray(FURNITURE_GRAY));
        let title_font = Font::regular(HEADER_FONT_SIZE);
        self.surface.set_font(title_font);
        let title = self.furniture.title.clone();
        self.draw_text_in_cell(left, top, width, HEADER_HEIGHT, &title, Align::Left, title_font);

        if let Some(link) = self.furniture.link.clone() {
            let link_font = Font::regular(HEADER_LINK_FONT_SIZE);
            self.surface.set_font(link_font);
            self.surface.set_draw_color(Rgb::gray(FURNITURE_GRAY));
            self.draw_link_text(left, top, width, HEADER_HEIGHT, &link, Align::Right, link_font);
        }

        self.surface.set_draw_color(Rgb::BLACK);
        self.surface.line(HEADER_RULE_LEFT, HEADER_RULE_Y, self.ctx.rule_right(), HEADER_RULE_Y);
    }

    fn draw_footer(&mut self) {
        let left = self.ctx.margins.left;
        let width = self.ctx.content_width();
        let y = self.ctx.page_size.height - FOOTER_OFFSET;
        let font = Font::regular(FOOTER_FONT_SIZE);

        self.surface.set_text_color(Rgb::gray(FURNITURE_GRAY));
        self.surface.set_font(font);
        let date = self.furniture.date.clone();
        self.draw_text_in_cell(left, y, width, 0.0, &date, Align::Left, font);
        let page_label = format!("Page {} of {}", self.ctx.page_number, TOTAL_PAGES_ALIAS);
        self.draw_text_in_cell(left, y, width, 0.0, &page_label, Align::Right, font);
    }

    /// X where text of the given width starts inside a cell.
    fn aligned_x(x: f32, width: f32, text_width: f32, align: Align) -> f32 {
        match align {
            Align::Left => x + CELL_MARGIN,
            Align::Right => x + width - CELL_MARGIN - text_width,
        }
    }

    fn baseline(y: f32, height: f32, font: Font) -> f32 {
        y + height / 2.0 + 0.3 * font.size_in_inches()
    }

    fn draw_text_in_cell(&mut self, x: f32, y: f32, width: f32, height: f32, text: &str, align: Align, font: Font) {
        if text.is_empty() {
            return;
        }
        let tx = Self::aligned_x(x, width, string_width(text, font), align);
        self.surface.text(tx, Self::baseline(y, height, font), text);
    }

    /// Underlined text with a link annotation over it. The underline uses the
    /// current draw color.
    fn draw_link_text(&mut self, x: f32, y: f32, width: f32, height: f32, text: &str, align: Align, font: Font) {
        if text.is_empty() {
            return;
        }
        let text_width = string_width(text, font);
        let tx = Self::aligned_x(x, width, text_width, align);
        let baseline = Self::baseline(y, height, font);
        let size = font.size_in_inches();
        self.surface.text(tx, baseline, text);
        let underline_y = baseline + 0.1 * size;
        self.surface.line(tx, underline_y, tx + text_width, underline_y);
        self.surface.link(tx, baseline - 0.75 * size, text_width, size, text);
    }

    fn resolve_width(&self, width: f32) -> f32 {
        if width > 0.0 {
            width
        } else {
            self.ctx.page_size.width - self.ctx.margins.right - self.ctx.x
        }
    }

    /// Break to a new page, keeping the current x, when `height` does not fit.
    fn break_if_needed(&mut self, height: f32) {
        if self.ctx.page_number > 0 && self.would_overflow(height) {
            let x = self.ctx.x;
            self.add_page();
            self.ctx.x = x;
        }
    }

    /// A single-line cell at the cursor. A width of 0 extends to the right
    /// margin. With `line_break` the cursor moves to the start of the next
    /// line, otherwise to the right of the cell.
    pub fn cell(&mut self, width: f32, height: f32, text: &str, align: Align, line_break: bool) {
        self.break_if_needed(height);
        let width = self.resolve_width(width);
        let font = self.font;
        self.draw_text_in_cell(self.ctx.x, self.ctx.y, width, height, text, align, font);
        if line_break {
            self.ln(height);
        } else {
            self.ctx.x += width;
        }
    }

    /// Wrapped text flowing down from the cursor, one `line_height` per line.
    /// Each line may break the page. The cursor ends at the left margin below
    /// the last line.
    pub fn multi_cell(&mut self, width: f32, line_height: f32, text: &str, align: Align) {
        let width = self.resolve_width(width);
        let start_x = self.ctx.x;
        for line in wrap_lines(text, width, self.font) {
            self.ctx.x = start_x;
            self.cell(width, line_height, &line, align, true);
        }
        self.ctx.x = self.ctx.margins.left;
    }

    /// Wrapped text at a fixed position without page breaks, for table cells
    /// whose row has already been fitted onto the page. Returns the number of
    /// lines drawn.
    pub fn multi_cell_fixed(&mut self, x: f32, y: f32, width: f32, line_height: f32, text: &str) -> usize {
        let font = self.font;
        let lines = wrap_lines(text, width, font);
        for (index, line) in lines.iter().enumerate() {
            self.draw_text_in_cell(x, y + index as f32 * line_height, width, line_height, line, Align::Left, font);
        }
        lines.len()
    }

    /// Underlined link text at the cursor, in the current font and text color.
    pub fn link_cell(&mut self, width: f32, height: f32, text: &str, url: &str) {
        self.break_if_needed(height);
        let width = self.resolve_width(width);
        let font = self.font;
        let (x, y) = (self.ctx.x, self.ctx.y);
        let text_width = string_width(text, font);
        let tx = Self::aligned_x(x, width, text_width, Align::Left);
        let baseline = Self::baseline(y, height, font);
        let size = font.size_in_inches();

        self.surface.text(tx, baseline, text);
        self.surface.set_draw_color(self.text_color);
        let underline_y = baseline + 0.1 * size;
        self.surface.line(tx, underline_y, tx + text_width, underline_y);
        self.surface.set_draw_color(self.draw_color);
        self.surface.link(tx, baseline - 0.75 * size, text_width, size, url);
        self.ctx.x += width;
    }

    /// Horizontal rule in the current draw color.
    pub fn rule(&mut self, x1: f32, x2: f32, y: f32) {
        self.surface.line(x1, y, x2, y);
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.surface.rect(x, y, width, height);
    }

    /// Place an image at a fixed position; the cursor does not move.
    pub fn image(&mut self, image: &ReportImage, x: f32, y: f32, width: f32, height: f32) {
        self.surface.image(image, x, y, width, height);
    }

    /// Place an image at the cursor's y, breaking the page first if it does
    /// not fit, and move the cursor below it.
    pub fn image_flow(&mut self, image: &ReportImage, x: f32, width: f32, height: f32) {
        self.break_if_needed(height);
        let y = self.ctx.y;
        self.surface.image(image, x, y, width, height);
        self.ctx.y = y + height;
    }

    /// Close the last page and serialize the document.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        if self.ctx.page_number == 0 {
            self.add_page();
        }
        self.draw_footer();
        self.enter_phase(ReportPhase::Finalized);
        self.surface.finish()
    }
}
