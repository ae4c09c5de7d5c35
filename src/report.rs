//! Report entry points.

use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::image::ImageFetcher;
use crate::page_writer::{PageFurniture, PageWriter, ReportContext};
use crate::pdf_generator::PdfSurface;
use crate::record::{Normalizer, RecordView, SourceRecord, StoreItem};
use crate::renderer::{ItemExtras, ReportRenderer};
use crate::search::{select_layout, SearchResultsInput};
use crate::surface::{DrawingSurface, PageOrientation};
use std::path::{Path, PathBuf};

pub const SEARCH_RESULTS_FILE_NAME: &str = "search-results.pdf";

/// Marker the client watches for to learn that the download has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadMarker {
    pub name: &'static str,
    /// Unix timestamp in seconds
    pub value: i64,
}

impl DownloadMarker {
    pub fn now() -> Self {
        Self { name: "REPORT", value: chrono::Utc::now().timestamp() }
    }

    /// Value for a `Set-Cookie` header.
    pub fn header_value(&self) -> String {
        format!("{}={}; Path=/", self.name, self.value)
    }
}

#[derive(Debug, Clone)]
pub struct ReportDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub marker: DownloadMarker,
}

impl ReportDownload {
    /// Write the document into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> crate::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        log::info!("Wrote {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

#[derive(Debug, Clone)]
pub enum ReportOutcome {
    Download(ReportDownload),
    /// Nothing was produced; show this text instead.
    Message(String),
}

/// File name for an item report.
pub fn item_file_name(identifier: &str) -> String {
    let safe: String = identifier
        .trim()
        .chars()
        .map(|ch| if ch == '/' || ch == '\\' || ch.is_control() { '-' } else { ch })
        .collect();
    format!("item-{}.pdf", safe)
}

fn normalize_item(config: &ReportConfig, item: &StoreItem, viewer_is_authenticated: bool) -> RecordView {
    let normalizer = Normalizer::new(
        config.detail_layout_field_names(),
        config.private_field_set(),
        viewer_is_authenticated,
        false,
    );
    normalizer.normalize(&SourceRecord::Store(item.clone()))
}

/// Render an item onto `surface` without serializing it.
pub fn render_item<S: DrawingSurface>(
    surface: S,
    config: &ReportConfig,
    item: &StoreItem,
    viewer_is_authenticated: bool,
    fetcher: &dyn ImageFetcher,
) -> PageWriter<S> {
    let record = normalize_item(config, item, viewer_is_authenticated);
    let furniture = PageFurniture::new(config.header_title(), Some(config.item_url(&item.id.to_string())));
    let ctx = ReportContext::new(PageOrientation::Portrait, viewer_is_authenticated);
    let mut writer = PageWriter::new(surface, ctx, furniture);

    let renderer = ReportRenderer::new(fetcher, config.max_images_in_detail_layout);
    renderer.render_item_report(&mut writer, &record, &ItemExtras::from_item(item, config));
    writer
}

/// Render search results onto `surface` without serializing them. The
/// results cap is not checked here.
pub fn render_search_results<S: DrawingSurface>(
    surface: S,
    config: &ReportConfig,
    input: &SearchResultsInput,
    viewer_is_authenticated: bool,
    fetcher: &dyn ImageFetcher,
) -> PageWriter<S> {
    let normalizer = Normalizer::new(
        config.detail_layout_field_names(),
        config.private_field_set(),
        viewer_is_authenticated,
        config.shared_search_enabled,
    );
    let records = normalizer.normalize_all(&input.results);
    let layout = select_layout(config, input.query.layout_id());
    let summary = input.summary(config).render();

    let ctx = ReportContext::new(layout.orientation(), viewer_is_authenticated);
    let mut writer = PageWriter::new(surface, ctx, PageFurniture::new(config.header_title(), None));

    let renderer = ReportRenderer::new(fetcher, config.max_images_in_detail_layout);
    renderer.render_search_results_report(&mut writer, &records, &layout, &summary);
    writer
}

/// Serialize a rendered report. Serialization failures become a message.
pub fn finish_report<S: DrawingSurface>(mut writer: PageWriter<S>, file_name: String) -> ReportOutcome {
    match writer.finish() {
        Ok(bytes) => {
            log::info!(
                "Created {} ({} pages, {} bytes)",
                file_name,
                writer.page_number(),
                bytes.len()
            );
            ReportOutcome::Download(ReportDownload { file_name, bytes, marker: DownloadMarker::now() })
        }
        Err(e) => {
            log::error!("Failed to create {}: {}", file_name, e);
            ReportOutcome::Message(e.to_string())
        }
    }
}

/// Check the results cap.
pub fn check_result_limit(total_results: usize, limit: usize) -> Result<(), ReportError> {
    if total_results > limit {
        return Err(ReportError::TooManyResults { total: total_results, limit });
    }
    Ok(())
}

pub fn create_item_report(
    config: &ReportConfig,
    item: &StoreItem,
    viewer_is_authenticated: bool,
    fetcher: &dyn ImageFetcher,
) -> ReportOutcome {
    let file_name = item_file_name(normalize_item(config, item, viewer_is_authenticated).identifier());
    let surface = PdfSurface::new(&config.header_title());
    let writer = render_item(surface, config, item, viewer_is_authenticated, fetcher);
    finish_report(writer, file_name)
}

pub fn create_search_results_report(
    config: &ReportConfig,
    input: &SearchResultsInput,
    viewer_is_authenticated: bool,
    fetcher: &dyn ImageFetcher,
) -> ReportOutcome {
    if let Err(e) = check_result_limit(input.total_results, config.max_results) {
        log::info!("Refusing report: {}", e);
        return ReportOutcome::Message(e.to_string());
    }

    let surface = PdfSurface::new(&config.header_title());
    let writer = render_search_results(surface, config, input, viewer_is_authenticated, fetcher);
    finish_report(writer, SEARCH_RESULTS_FILE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::test_support::MapFetcher;
    use crate::record::ElementText;
    use crate::surface::RecordingSurface;
    use std::collections::HashMap;

    fn item() -> StoreItem {
        StoreItem {
            id: 12,
            element_texts: vec![
                ElementText { element: "Identifier".into(), text: "1987.4".into() },
                ElementText { element: "Title".into(), text: "Harbor map".into() },
            ],
            files: Vec::new(),
            thumbnail_url: None,
        }
    }

    fn download() -> ReportDownload {
        ReportDownload {
            file_name: "item-1.pdf".into(),
            bytes: b"%PDF-1.4".to_vec(),
            marker: DownloadMarker { name: "REPORT", value: 1 },
        }
    }

    #[test]
    fn test_write_to_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reports");
        let path = download().write_to(&target).unwrap();
        assert_eq!(path, target.join("item-1.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn test_write_to_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, b"file").unwrap();
        let err = download().write_to(&blocker).unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));
    }

    #[test]
    fn test_marker_header_value() {
        let marker = DownloadMarker { name: "REPORT", value: 1700000000 };
        assert_eq!(marker.header_value(), "REPORT=1700000000; Path=/");
    }

    #[test]
    fn test_item_file_name() {
        assert_eq!(item_file_name("1987.4"), "item-1987.4.pdf");
        assert_eq!(item_file_name("a/b"), "item-a-b.pdf");
    }

    #[test]
    fn test_item_report_produces_pdf() {
        let fetcher = MapFetcher(HashMap::new());
        let outcome = create_item_report(&ReportConfig::default(), &item(), false, &fetcher);
        match outcome {
            ReportOutcome::Download(download) => {
                assert_eq!(download.file_name, "item-1987.4.pdf");
                assert!(download.bytes.starts_with(b"%PDF-1.4"));
                assert!(download.marker.value > 0);
            }
            ReportOutcome::Message(m) => panic!("unexpected message {}", m),
        }
    }

    #[test]
    fn test_too_many_results_renders_nothing() {
        let fetcher = MapFetcher(HashMap::new());
        let config = ReportConfig { max_results: 10, ..Default::default() };
        let input: SearchResultsInput = serde_json::from_str(r#"{"total_results": 11}"#).unwrap();
        match create_search_results_report(&config, &input, false, &fetcher) {
            ReportOutcome::Message(m) => {
                assert_eq!(m, "Too many results, refine your search to return no more than 10 results")
            }
            ReportOutcome::Download(_) => panic!("expected the limit message"),
        }
    }

    #[test]
    fn test_limit_is_inclusive() {
        assert!(check_result_limit(10, 10).is_ok());
        assert!(check_result_limit(11, 10).is_err());
    }

    #[test]
    fn test_serialization_failure_becomes_message() {
        let fetcher = MapFetcher(HashMap::new());
        let writer = render_item(RecordingSurface::failing(), &ReportConfig::default(), &item(), false, &fetcher);
        match finish_report(writer, "item-x.pdf".into()) {
            ReportOutcome::Message(m) => assert!(m.starts_with("Failed to create the PDF document")),
            ReportOutcome::Download(_) => panic!("expected a message"),
        }
    }

    #[test]
    fn test_item_report_header_links_to_item() {
        let fetcher = MapFetcher(HashMap::new());
        let config = ReportConfig {
            site_title: "Harbor".into(),
            site_url: "https://harbor.example.org".into(),
            ..Default::default()
        };
        let writer = render_item(RecordingSurface::new(), &config, &item(), false, &fetcher);
        let surface = writer.surface();
        assert_eq!(surface.count_text("Harbor Digital Archive"), 1);
        assert_eq!(surface.count_text("https://harbor.example.org/items/show/12"), 1);
    }
}
