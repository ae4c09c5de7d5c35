use crate::compression::compress_deflate;
use crate::error::{ReportError, Result};
use crate::image::{create_image_content_stream, create_image_object, ReportImage};
use crate::metrics::{Font, FontStyle, POINTS_PER_INCH};
use crate::surface::{DrawingSurface, PageSize, Rgb, TOTAL_PAGES_ALIAS};
use std::collections::HashMap;

/// Stroke width for rules and cell borders (0.2 mm).
const LINE_WIDTH_PT: f32 = 0.567;

// --- Low-level PDF object model ---

pub struct PdfGenerator {
    pub objects: Vec<PdfObj>,
    pub next_id: u32,
}

#[derive(Debug)]
pub struct PdfObj {
    pub id: u32,
    pub generation: u32,
    pub content: String,
    pub is_stream: bool,
    pub stream_data: Option<Vec<u8>>,
}

impl PdfGenerator {
    pub fn new() -> Self {
        PdfGenerator {
            objects: Vec::new(),
            next_id: 1,
        }
    }

    /// Claim an object id now and supply its content later with
    /// [`add_object_with_id`](Self::add_object_with_id).
    pub fn reserve_object_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add_object(&mut self, content: String) -> u32 {
        let id = self.reserve_object_id();
        self.add_object_with_id(id, content);
        id
    }

    pub fn add_object_with_id(&mut self, id: u32, content: String) {
        self.objects.push(PdfObj {
            id,
            generation: 0,
            content,
            is_stream: false,
            stream_data: None,
        });
    }

    pub fn add_stream_object(&mut self, dictionary: String, data: Vec<u8>) -> u32 {
        let id = self.reserve_object_id();
        self.objects.push(PdfObj {
            id,
            generation: 0,
            content: dictionary,
            is_stream: true,
            stream_data: Some(data),
        });
        id
    }

    /// Serialize all objects. Ids that were reserved but never filled are
    /// written as free entries.
    pub fn generate(&self, root_id: u32, info_id: Option<u32>) -> Vec<u8> {
        let mut pdf = Vec::new();

        // PDF header
        pdf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut ordered: Vec<&PdfObj> = self.objects.iter().collect();
        ordered.sort_by_key(|obj| obj.id);

        let mut offsets: HashMap<u32, usize> = HashMap::new();
        for obj in ordered {
            offsets.insert(obj.id, pdf.len());
            let obj_header = format!("{} {} obj\n", obj.id, obj.generation);
            pdf.extend_from_slice(obj_header.as_bytes());
            pdf.extend_from_slice(obj.content.as_bytes());

            if obj.is_stream {
                if let Some(data) = &obj.stream_data {
                    pdf.extend_from_slice(b"stream\n");
                    pdf.extend_from_slice(data);
                    pdf.extend_from_slice(b"\nendstream\n");
                }
            }

            pdf.extend_from_slice(b"endobj\n");
        }

        // xref table
        let size = self.next_id;
        let xref_offset = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for id in 1..size {
            match offsets.get(&id) {
                Some(offset) => pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes()),
                None => pdf.extend_from_slice(b"0000000000 00001 f \n"),
            }
        }

        // trailer
        pdf.extend_from_slice(b"trailer\n");
        pdf.extend_from_slice(b"<<\n");
        pdf.extend_from_slice(format!("/Size {}\n", size).as_bytes());
        pdf.extend_from_slice(format!("/Root {} 0 R\n", root_id).as_bytes());
        if let Some(info) = info_id {
            pdf.extend_from_slice(format!("/Info {} 0 R\n", info).as_bytes());
        }
        pdf.extend_from_slice(b">>\n");
        pdf.extend_from_slice(b"startxref\n");
        pdf.extend_from_slice(format!("{}\n", xref_offset).as_bytes());
        pdf.extend_from_slice(b"%%EOF\n");

        pdf
    }
}

impl Default for PdfGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a string for a PDF literal. Characters up to U+00FF are written as
/// single WinAnsi bytes, anything above becomes `?`.
pub fn escape_pdf_string(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.extend_from_slice(b"\\\\"),
            '(' => out.extend_from_slice(b"\\("),
            ')' => out.extend_from_slice(b"\\)"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x80 => out.push(c as u8),
            c if (c as u32) <= 0xFF => out.extend_from_slice(format!("\\{:03o}", c as u32).as_bytes()),
            _ => out.push(b'?'),
        }
    }
    out
}

fn replace_bytes(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(needle) {
            out.extend_from_slice(replacement);
            i += needle.len();
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    out
}

fn font_resource_name(style: FontStyle) -> &'static str {
    match style {
        FontStyle::Regular => "F1",
        FontStyle::Bold => "F2",
        FontStyle::Italic => "F3",
    }
}

fn color_components(color: Rgb) -> (f32, f32, f32) {
    (color.0 as f32 / 255.0, color.1 as f32 / 255.0, color.2 as f32 / 255.0)
}

// --- Drawing surface ---

struct PageLink {
    rect: [f32; 4],
    url: String,
}

struct PdfPage {
    size: PageSize,
    content: Vec<u8>,
    images: Vec<(String, u32)>,
    links: Vec<PageLink>,
}

impl PdfPage {
    fn to_points_x(&self, x: f32) -> f32 {
        x * POINTS_PER_INCH
    }

    fn to_points_y(&self, y: f32) -> f32 {
        (self.size.height - y) * POINTS_PER_INCH
    }
}

/// A [`DrawingSurface`] that writes a PDF document with the standard
/// Helvetica fonts.
pub struct PdfSurface {
    generator: PdfGenerator,
    title: String,
    pages_id: u32,
    font_ids: [(FontStyle, u32); 3],
    pages: Vec<PdfPage>,
    // source -> (resource name, object id)
    image_cache: HashMap<String, (String, u32)>,
    font: Font,
    text_color: Rgb,
    draw_color: Rgb,
    finished: bool,
}

impl PdfSurface {
    pub fn new(title: &str) -> Self {
        let mut generator = PdfGenerator::new();
        let pages_id = generator.reserve_object_id();
        let font_ids = [FontStyle::Regular, FontStyle::Bold, FontStyle::Italic].map(|style| {
            let font_dict = format!(
                "<< /Type /Font\n/Subtype /Type1\n/BaseFont /{}\n/Encoding /WinAnsiEncoding\n>>\n",
                Font { style, size: 0.0 }.base_font_name()
            );
            (style, generator.add_object(font_dict))
        });

        PdfSurface {
            generator,
            title: title.to_string(),
            pages_id,
            font_ids,
            pages: Vec::new(),
            image_cache: HashMap::new(),
            font: Font::regular(12.0),
            text_color: Rgb::BLACK,
            draw_color: Rgb::BLACK,
            finished: false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn current_page(&mut self) -> Option<&mut PdfPage> {
        self.pages.last_mut()
    }

    fn image_resource(&mut self, image: &ReportImage) -> (String, u32) {
        if let Some(entry) = self.image_cache.get(&image.source) {
            return entry.clone();
        }
        let id = create_image_object(&mut self.generator, image);
        let entry = (format!("Im{}", self.image_cache.len() + 1), id);
        self.image_cache.insert(image.source.clone(), entry.clone());
        entry
    }

    fn write_page(&mut self, page: PdfPage, total_pages: &str) -> u32 {
        let content = replace_bytes(&page.content, TOTAL_PAGES_ALIAS.as_bytes(), total_pages.as_bytes());
        let compressed = compress_deflate(&content);
        let content_id = self.generator.add_stream_object(
            format!("<< /Length {} /Filter /FlateDecode >>\n", compressed.len()),
            compressed,
        );

        let mut annot_ids = Vec::new();
        for link in &page.links {
            let mut annot = b"<< /Type /Annot\n/Subtype /Link\n".to_vec();
            annot.extend_from_slice(
                format!(
                    "/Rect [{:.2} {:.2} {:.2} {:.2}]\n/Border [0 0 0]\n/A << /S /URI /URI (",
                    link.rect[0], link.rect[1], link.rect[2], link.rect[3]
                )
                .as_bytes(),
            );
            annot.extend_from_slice(&escape_pdf_string(&link.url));
            annot.extend_from_slice(b") >>\n>>\n");
            annot_ids.push(self.generator.add_object(String::from_utf8_lossy(&annot).into_owned()));
        }

        let fonts: Vec<String> = self
            .font_ids
            .iter()
            .map(|(style, id)| format!("/{} {} 0 R", font_resource_name(*style), id))
            .collect();
        let mut resources = format!("/Font << {} >>", fonts.join(" "));
        if !page.images.is_empty() {
            let xobjects: Vec<String> = page.images.iter().map(|(name, id)| format!("/{} {} 0 R", name, id)).collect();
            resources.push_str(&format!(" /XObject << {} >>", xobjects.join(" ")));
        }

        let mut page_dict = format!(
            "<< /Type /Page\n\
             /Parent {} 0 R\n\
             /MediaBox [0 0 {:.2} {:.2}]\n\
             /Contents {} 0 R\n\
             /Resources << {} >>\n",
            self.pages_id,
            page.size.width * POINTS_PER_INCH,
            page.size.height * POINTS_PER_INCH,
            content_id,
            resources
        );
        if !annot_ids.is_empty() {
            let refs: Vec<String> = annot_ids.iter().map(|id| format!("{} 0 R", id)).collect();
            page_dict.push_str(&format!("/Annots [{}]\n", refs.join(" ")));
        }
        page_dict.push_str(">>\n");
        self.generator.add_object(page_dict)
    }
}

impl DrawingSurface for PdfSurface {
    fn begin_page(&mut self, size: PageSize) {
        self.pages.push(PdfPage {
            size,
            content: Vec::new(),
            images: Vec::new(),
            links: Vec::new(),
        });
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
        let font = self.font;
        let (r, g, b) = color_components(self.text_color);
        let Some(page) = self.current_page() else { return };
        let (px, py) = (page.to_points_x(x), page.to_points_y(y));
        let mut ops = format!(
            "BT\n/{} {:.2} Tf\n{:.3} {:.3} {:.3} rg\n{:.2} {:.2} Td\n(",
            font_resource_name(font.style),
            font.size,
            r,
            g,
            b,
            px,
            py
        )
        .into_bytes();
        ops.extend_from_slice(&escape_pdf_string(text));
        ops.extend_from_slice(b") Tj\nET\n");
        page.content.extend_from_slice(&ops);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32) {
        let (r, g, b) = color_components(self.draw_color);
        let Some(page) = self.current_page() else { return };
        let ops = format!(
            "q\n{:.3} {:.3} {:.3} RG\n{:.3} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
            r,
            g,
            b,
            LINE_WIDTH_PT,
            page.to_points_x(x1),
            page.to_points_y(y1),
            page.to_points_x(x2),
            page.to_points_y(y2)
        );
        page.content.extend_from_slice(ops.as_bytes());
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let (r, g, b) = color_components(self.draw_color);
        let Some(page) = self.current_page() else { return };
        let ops = format!(
            "q\n{:.3} {:.3} {:.3} RG\n{:.3} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
            r,
            g,
            b,
            LINE_WIDTH_PT,
            page.to_points_x(x),
            page.to_points_y(y + height),
            width * POINTS_PER_INCH,
            height * POINTS_PER_INCH
        );
        page.content.extend_from_slice(ops.as_bytes());
    }

    fn image(&mut self, image: &ReportImage, x: f32, y: f32, width: f32, height: f32) {
        if self.pages.is_empty() {
            return;
        }
        let (name, id) = self.image_resource(image);
        let Some(page) = self.current_page() else { return };
        let stream = create_image_content_stream(
            page.to_points_x(x),
            page.to_points_y(y + height),
            width * POINTS_PER_INCH,
            height * POINTS_PER_INCH,
            &name,
        );
        page.content.extend_from_slice(&stream);
        if !page.images.iter().any(|(existing, _)| *existing == name) {
            page.images.push((name, id));
        }
    }

    fn link(&mut self, x: f32, y: f32, width: f32, height: f32, url: &str) {
        let Some(page) = self.current_page() else { return };
        let rect = [
            page.to_points_x(x),
            page.to_points_y(y + height),
            page.to_points_x(x + width),
            page.to_points_y(y),
        ];
        page.links.push(PageLink { rect, url: url.to_string() });
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if self.finished {
            return Err(ReportError::Serialization("document was already finished".to_string()));
        }
        if self.pages.is_empty() {
            return Err(ReportError::Serialization("document has no pages".to_string()));
        }
        self.finished = true;

        let pages = std::mem::take(&mut self.pages);
        let total_pages = pages.len().to_string();
        let page_ids: Vec<u32> = pages.into_iter().map(|page| self.write_page(page, &total_pages)).collect();

        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        let pages_dict = format!(
            "<< /Type /Pages\n\
             /Kids [{}]\n\
             /Count {}\n\
             >>\n",
            kids.join(" "),
            page_ids.len()
        );
        self.generator.add_object_with_id(self.pages_id, pages_dict);

        let catalog_dict = format!(
            "<< /Type /Catalog\n\
             /Pages {} 0 R\n\
             >>\n",
            self.pages_id
        );
        let catalog_id = self.generator.add_object(catalog_dict);

        let mut info = b"<< /Title (".to_vec();
        info.extend_from_slice(&escape_pdf_string(&self.title));
        info.extend_from_slice(
            format!(
                ")\n/Producer (archive-report)\n/CreationDate (D:{})\n>>\n",
                chrono::Local::now().format("%Y%m%d%H%M%S")
            )
            .as_bytes(),
        );
        let info_id = self.generator.add_object(String::from_utf8_lossy(&info).into_owned());

        log::debug!("Serializing PDF with {} pages and {} images", page_ids.len(), self.image_cache.len());
        Ok(self.generator.generate(catalog_id, Some(info_id)))
    }
}
