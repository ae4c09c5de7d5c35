//! Page flow: how records become pages.
//!
//! Two strategies share one page writer. The detail layout gives each record
//! a block with its title, an optional thumbnail and a two-column list of
//! field labels and values. The compressed layout is a table with one row per
//! record and one column per planned field.

use crate::columns::ColumnPlan;
use crate::config::ReportConfig;
use crate::image::{load_image, ImageFetcher};
use crate::metrics::{estimate_line_count, Font};
use crate::page_writer::{Align, PageWriter, BODY_TOP};
use crate::record::{RecordView, StoreItem};
use crate::surface::{DrawingSurface, PageOrientation, Rgb};

/// Detail blocks starting below this y begin on a new page.
pub const DETAIL_PAGE_BREAK_Y: f32 = 8.5;
/// Combined width of the label and value columns.
pub const FIELD_AREA_WIDTH: f32 = 7.0;
pub const FIELD_LINE_HEIGHT: f32 = 0.18;
pub const NARROW_LABEL_WIDTH: f32 = 1.0;
/// Label column width next to a thumbnail.
pub const WIDE_LABEL_WIDTH: f32 = 3.5;
pub const THUMBNAIL_LEFT: f32 = 0.8;
pub const THUMBNAIL_HEIGHT: f32 = 1.0;
pub const TABLE_LINE_HEIGHT: f32 = 0.15;

const FIELD_GAP: f32 = 0.02;
const FIELD_FONT_SIZE: f32 = 8.0;
const THUMBNAIL_TOP_OFFSET: f32 = 0.05;
// Leaves room for right-aligned labels in the wide column.
const THUMBNAIL_MAX_WIDTH: f32 = 2.4;
const SEPARATOR_SPACING: f32 = 0.1;
const SEPARATOR_GRAY: u8 = 160;
const TITLE_GRAY: u8 = 64;
const PRIVATE_LABEL_GRAY: u8 = 120;
const SUMMARY_FONT_SIZE: f32 = 9.0;
const SUMMARY_GRAY: u8 = 80;
const ITEM_TITLE_FONT_SIZE: f32 = 10.0;
const ITEM_IMAGE_WIDTH: f32 = 3.5;

/// How a search results report lays out its records.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsLayout {
    Detail,
    Compressed(ColumnPlan),
}

impl ResultsLayout {
    pub fn orientation(&self) -> PageOrientation {
        match self {
            ResultsLayout::Detail => PageOrientation::Portrait,
            ResultsLayout::Compressed(_) => PageOrientation::Landscape,
        }
    }
}

/// What an item report shows besides the record's fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemExtras {
    /// Local path or URL of the first attachment's image
    pub image_location: Option<String>,
    /// Link to the original when the first attachment is a PDF
    pub pdf_attachment_url: Option<String>,
}

impl ItemExtras {
    pub fn from_item(item: &StoreItem, config: &ReportConfig) -> Self {
        let Some(file) = item.files.first() else {
            return Self::default();
        };
        let image_path = config.files_dir.join("fullsize").join(file.image_filename());
        Self {
            image_location: Some(image_path.to_string_lossy().into_owned()),
            pdf_attachment_url: file.is_pdf().then(|| config.attachment_url(&file.filename)),
        }
    }
}

pub struct ReportRenderer<'a> {
    fetcher: &'a dyn ImageFetcher,
    max_images_in_detail_layout: usize,
}

impl<'a> ReportRenderer<'a> {
    pub fn new(fetcher: &'a dyn ImageFetcher, max_images_in_detail_layout: usize) -> Self {
        Self { fetcher, max_images_in_detail_layout }
    }

    /// One item on a portrait page: title, attachment image, PDF link and
    /// all fields.
    pub fn render_item_report<S: DrawingSurface>(
        &self,
        writer: &mut PageWriter<S>,
        record: &RecordView,
        extras: &ItemExtras,
    ) {
        writer.add_page();
        writer.begin_body();

        writer.set_font(Font::bold(ITEM_TITLE_FONT_SIZE));
        writer.multi_cell(0.0, 0.2, &record.title(), Align::Left);
        writer.ln(0.2);

        if let Some(image) = extras.image_location.as_deref().and_then(|loc| load_image(self.fetcher, loc)) {
            let max_height = writer.context().page_break_trigger() - BODY_TOP;
            let (width, height) = image.fit_within(ITEM_IMAGE_WIDTH, max_height);
            writer.image_flow(&image, THUMBNAIL_LEFT, width, height);
            writer.ln(0.2);
        }

        if let Some(url) = &extras.pdf_attachment_url {
            writer.set_font(Font::regular(ITEM_TITLE_FONT_SIZE));
            writer.cell(NARROW_LABEL_WIDTH, 0.2, "PDF:", Align::Right, false);
            writer.link_cell(0.0, 0.2, url, url);
            writer.ln(0.3);
        }

        emit_field_pairs(writer, record, NARROW_LABEL_WIDTH);
    }

    /// Summary text followed by the records in the chosen layout.
    pub fn render_search_results_report<S: DrawingSurface>(
        &self,
        writer: &mut PageWriter<S>,
        records: &[RecordView],
        layout: &ResultsLayout,
        summary_text: &str,
    ) {
        writer.add_page();
        writer.set_font(Font::regular(SUMMARY_FONT_SIZE));
        writer.set_text_color(Rgb::gray(SUMMARY_GRAY));
        writer.multi_cell(0.0, 0.2, summary_text, Align::Left);
        writer.ln(0.1);
        writer.begin_body();

        writer.set_text_color(Rgb::BLACK);
        writer.set_font(Font::regular(FIELD_FONT_SIZE));

        match layout {
            ResultsLayout::Detail => self.render_detail_layout(writer, records),
            ResultsLayout::Compressed(plan) => render_compressed_layout(writer, records, plan),
        }
    }

    fn render_detail_layout<S: DrawingSurface>(&self, writer: &mut PageWriter<S>, records: &[RecordView]) {
        let images_allowed = records.len() <= self.max_images_in_detail_layout;
        if !images_allowed {
            log::info!(
                "{} records exceed the image limit of {}, rendering without thumbnails",
                records.len(),
                self.max_images_in_detail_layout
            );
        }

        for record in records {
            if writer.y() > DETAIL_PAGE_BREAK_Y {
                writer.add_page();
            } else {
                writer.ln(SEPARATOR_SPACING);
                writer.set_draw_color(Rgb::gray(SEPARATOR_GRAY));
                let (y, right) = (writer.y(), writer.context().rule_right());
                writer.rule(THUMBNAIL_LEFT, right, y);
                writer.ln(SEPARATOR_SPACING);
            }

            writer.set_font(Font::bold(FIELD_FONT_SIZE));
            writer.set_text_color(Rgb::gray(TITLE_GRAY));
            writer.multi_cell(0.0, 0.2, &record.title(), Align::Left);

            let mut label_width = NARROW_LABEL_WIDTH;
            // (bottom y, page) of a placed thumbnail
            let mut image_extent = None;
            if images_allowed {
                let thumbnail = record.thumbnail_url().and_then(|url| load_image(self.fetcher, url));
                if let Some(image) = thumbnail {
                    let top = writer.y() + THUMBNAIL_TOP_OFFSET;
                    let (width, height) = image.size_for_height(THUMBNAIL_HEIGHT, THUMBNAIL_MAX_WIDTH);
                    writer.image(&image, THUMBNAIL_LEFT, top, width, height);
                    image_extent = Some((top + height, writer.page_number()));
                    label_width = WIDE_LABEL_WIDTH;
                }
            }

            emit_field_pairs(writer, record, label_width);

            if let Some((bottom, page)) = image_extent {
                if writer.page_number() == page && writer.y() < bottom {
                    writer.set_y(bottom);
                }
            }
        }
    }
}

/// The two-column label/value list of one record.
///
/// A label is drawn only for the first value of each run of equal field
/// names; further values get a blank label.
pub fn emit_field_pairs<S: DrawingSurface>(writer: &mut PageWriter<S>, record: &RecordView, label_width: f32) {
    let value_width = FIELD_AREA_WIDTH - label_width;
    let show_private = writer.context().viewer_is_authenticated;

    record.pairs().filter(|pair| show_private || !pair.is_private).fold(None::<&str>, |last_name, pair| {
        let name = pair.field_name.as_str();
        let label = if last_name == Some(name) {
            String::new()
        } else {
            if pair.is_private {
                writer.set_font(Font::italic(FIELD_FONT_SIZE));
                writer.set_text_color(Rgb::gray(PRIVATE_LABEL_GRAY));
            } else {
                writer.set_font(Font::regular(FIELD_FONT_SIZE));
                writer.set_text_color(Rgb::BLACK);
            }
            format!("{}:", name)
        };

        writer.cell(label_width, FIELD_LINE_HEIGHT, &label, Align::Right, false);

        writer.set_font(Font::regular(FIELD_FONT_SIZE));
        writer.set_text_color(Rgb::BLACK);
        writer.multi_cell(value_width, FIELD_LINE_HEIGHT, &pair.value, Align::Left);
        writer.ln(FIELD_GAP);
        Some(name)
    });
}

fn render_compressed_layout<S: DrawingSurface>(writer: &mut PageWriter<S>, records: &[RecordView], plan: &ColumnPlan) {
    if records.is_empty() || plan.is_empty() {
        return;
    }

    let header = plan.names();
    for (index, record) in records.iter().enumerate() {
        if index == 0 {
            emit_row(writer, plan, &header, None);
        }
        let cells: Vec<String> = plan.columns.iter().map(|column| record.cell_text(&column.name)).collect();
        emit_row(writer, plan, &cells, Some(header.as_slice()));
    }
}

/// Height of a table row: its tallest cell.
pub fn row_height(plan: &ColumnPlan, cells: &[String], font: Font) -> f32 {
    let lines = plan
        .columns
        .iter()
        .zip(cells)
        .map(|(column, text)| estimate_line_count(column.width, text, font))
        .max()
        .unwrap_or(1);
    lines as f32 * TABLE_LINE_HEIGHT
}

/// Draw one table row. `header` is `None` when the row is the header row
/// itself; otherwise it is redrawn at the top of a new page when the row
/// forces a page break.
fn emit_row<S: DrawingSurface>(writer: &mut PageWriter<S>, plan: &ColumnPlan, cells: &[String], header: Option<&[String]>) {
    let font = if header.is_none() { Font::bold(FIELD_FONT_SIZE) } else { Font::regular(FIELD_FONT_SIZE) };
    let height = row_height(plan, cells, font);

    if writer.would_overflow(height) {
        writer.add_page();
        if let Some(header) = header {
            emit_row(writer, plan, header, None);
        }
    }

    writer.set_font(font);
    let top = writer.y();
    let mut x = writer.context().margins.left + plan.indent;
    for (column, text) in plan.columns.iter().zip(cells) {
        writer.rect(x, top, column.width, height);
        writer.multi_cell_fixed(x, top, column.width, TABLE_LINE_HEIGHT, text);
        x += column.width;
    }
    writer.ln(height);
}
