use anyhow::{anyhow, Result};
use archive_report::config::ReportConfig;
use archive_report::image::ImageFetcher;
use archive_report::report::{finish_report, render_search_results, ReportOutcome};
use archive_report::search::SearchResultsInput;
use archive_report::page_writer::{BODY_TOP, HEADER_RULE_Y};
use archive_report::renderer::DETAIL_PAGE_BREAK_Y;
use archive_report::surface::{DrawOp, PageSize, RecordingSurface, Rgb};
use serde_json::json;
use std::collections::HashMap;

/// Serves fixed bytes per location; everything else is a 404.
struct FixtureFetcher(HashMap<String, Vec<u8>>);

impl ImageFetcher for FixtureFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        self.0.get(location).cloned().ok_or_else(|| anyhow!("404 for {}", location))
    }
}

/// Just enough of a JPEG for the header parser.
fn jpeg_header(width: u16, height: u16) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xC0, 0x00, 0x11, 0x08];
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&width.to_be_bytes());
    data.push(0x03);
    data.extend_from_slice(&[0; 12]);
    data
}

fn fetcher() -> FixtureFetcher {
    let mut served = HashMap::new();
    served.insert("https://img.example.org/thumb.jpg".to_string(), jpeg_header(120, 90));
    served.insert("https://img.example.org/broken.jpg".to_string(), b"<html>gone</html>".to_vec());
    FixtureFetcher(served)
}

fn config() -> ReportConfig {
    ReportConfig::from_json(
        r#"{
            "site_title": "Harbor",
            "site_url": "https://harbor.example.org",
            "display_order": ["Identifier", "Title", "Subject", "Date"],
            "item_type_fields": ["Status"],
            "private_fields": ["Status"],
            "max_results": 5000,
            "layouts": {"2": {"name": "Table", "columns": ["Identifier", "Title", "Subject"]}}
        }"#,
    )
    .unwrap()
}

fn store_record(id: usize, title: &str, thumb: Option<&str>) -> serde_json::Value {
    json!({
        "id": id,
        "element_texts": [
            {"element": "Identifier", "text": format!("A-{}", id)},
            {"element": "Title", "text": title},
            {"element": "Status", "text": "Restricted"}
        ],
        "thumbnail_url": thumb
    })
}

fn input(records: Vec<serde_json::Value>, layout: u32) -> SearchResultsInput {
    serde_json::from_value(json!({
        "total_results": records.len(),
        "results": records,
        "filters_text": "Subject: Boats",
        "query": {"layout": layout}
    }))
    .unwrap()
}

fn render(input: &SearchResultsInput, authenticated: bool) -> RecordingSurface {
    let mut writer = render_search_results(RecordingSurface::new(), &config(), input, authenticated, &fetcher());
    writer.finish().unwrap();
    writer.into_surface()
}

#[test]
fn test_detail_layout_places_thumbnails() {
    let records = vec![
        store_record(1, "Pier", Some("https://img.example.org/thumb.jpg")),
        store_record(2, "Lighthouse", Some("https://img.example.org/thumb.jpg")),
    ];
    let surface = render(&input(records, 1), false);
    assert_eq!(surface.image_count(), 2);
    assert_eq!(surface.ops[0], DrawOp::BeginPage(PageSize { width: 8.5, height: 11.0 }));
}

#[test]
fn test_oversized_detail_layout_has_no_images() {
    let records: Vec<_> = (0..1001)
        .map(|i| store_record(i, "Pier", Some("https://img.example.org/thumb.jpg")))
        .collect();
    let surface = render(&input(records, 1), false);
    assert_eq!(surface.image_count(), 0);
    assert!(surface.page_count() > 1);
}

#[test]
fn test_broken_image_only_affects_its_record() {
    let records = vec![
        store_record(1, "Pier", Some("https://img.example.org/broken.jpg")),
        store_record(2, "Lighthouse", Some("https://img.example.org/thumb.jpg")),
        store_record(3, "Dock", Some("https://img.example.org/missing.jpg")),
    ];
    let surface = render(&input(records, 1), false);
    assert_eq!(surface.image_count(), 1);
    assert_eq!(surface.count_text("Lighthouse"), 2);
    assert_eq!(surface.count_text("Dock"), 2);
}

#[test]
fn test_repeated_values_share_one_label() {
    let record = json!({
        "id": 1,
        "element_texts": [
            {"element": "Title", "text": "Pier"},
            {"element": "Subject", "text": "Boats"},
            {"element": "Subject", "text": "Fishing"}
        ]
    });
    let surface = render(&input(vec![record], 1), false);
    assert_eq!(surface.count_text("Subject:"), 1);
    assert_eq!(surface.count_text("Boats"), 1);
    assert_eq!(surface.count_text("Fishing"), 1);
}

#[test]
fn test_repeated_display_order_name_draws_values_once() {
    let config = ReportConfig::from_json(
        r#"{"site_title": "Harbor", "display_order": ["Title", "Subject", "Subject"]}"#,
    )
    .unwrap();
    let record = json!({
        "id": 1,
        "element_texts": [
            {"element": "Title", "text": "Pier"},
            {"element": "Subject", "text": "Boats"}
        ]
    });
    let writer = render_search_results(RecordingSurface::new(), &config, &input(vec![record], 1), false, &fetcher());
    assert_eq!(writer.surface().count_text("Subject:"), 1);
    assert_eq!(writer.surface().count_text("Boats"), 1);
}

/// Ops between the start of page `index` (0-based) and the next page.
fn page_ops(surface: &RecordingSurface, index: usize) -> &[DrawOp] {
    let starts: Vec<usize> = surface
        .ops
        .iter()
        .enumerate()
        .filter(|(_, op)| matches!(op, DrawOp::BeginPage(_)))
        .map(|(i, _)| i)
        .collect();
    let end = starts.get(index + 1).copied().unwrap_or(surface.ops.len());
    &surface.ops[starts[index]..end]
}

fn separators(ops: &[DrawOp]) -> Vec<f32> {
    ops.iter()
        .filter_map(|op| match op {
            DrawOp::Line { y1, color, .. } if *color == Rgb::gray(160) && *y1 > HEADER_RULE_Y + 0.01 => Some(*y1),
            _ => None,
        })
        .collect()
}

fn text_y(ops: &[DrawOp], wanted: &str) -> Option<f32> {
    ops.iter().find_map(|op| match op {
        DrawOp::Text { text, y, .. } if text == wanted => Some(*y),
        _ => None,
    })
}

#[test]
fn test_detail_layout_breaks_below_threshold_without_separator() {
    let records: Vec<_> = (0..14).map(|i| store_record(i, &format!("Record {}", i), None)).collect();
    let surface = render(&input(records, 1), false);
    assert!(surface.page_count() >= 2);

    let first = page_ops(&surface, 0);
    let second = page_ops(&surface, 1);

    // Every separator on the first page sits above the break threshold.
    let first_separators = separators(first);
    assert!(!first_separators.is_empty());
    assert!(first_separators.iter().all(|y| *y <= DETAIL_PAGE_BREAK_Y + 0.1 + 1e-4));

    // The record that starts the second page is drawn right at the body top,
    // and no separator precedes it.
    let opening = surface.texts_by_page()[1]
        .iter()
        .find(|t| t.starts_with("Record "))
        .map(|t| t.to_string())
        .unwrap();
    let opening_y = text_y(second, &opening).unwrap();
    assert!(opening_y > BODY_TOP && opening_y < BODY_TOP + 0.2);
    assert!(separators(second).iter().all(|y| *y > opening_y));

    // The previous record ended past the threshold on the first page.
    let last_on_first = surface.texts_by_page()[0]
        .iter()
        .filter(|t| t.starts_with("Record "))
        .last()
        .map(|t| t.to_string())
        .unwrap();
    let last_y = text_y(first, &last_on_first).unwrap();
    assert!(last_y <= DETAIL_PAGE_BREAK_Y + 0.4);
}

#[test]
fn test_private_values_hidden_from_anonymous_viewers() {
    let records = vec![store_record(1, "Pier", None)];
    let anonymous = render(&input(records.clone(), 1), false);
    assert_eq!(anonymous.count_text("Status:"), 0);
    assert_eq!(anonymous.count_text("Restricted"), 0);

    let signed_in = render(&input(records, 1), true);
    assert_eq!(signed_in.count_text("Status:"), 1);
    assert_eq!(signed_in.count_text("Restricted"), 1);
}

#[test]
fn test_summary_text_heads_the_report() {
    let surface = render(&input(vec![store_record(1, "Pier", None)], 1), false);
    let first_page = &surface.texts_by_page()[0];
    assert!(first_page.contains(&"1 search results from https://harbor.example.org"));
    assert!(first_page.contains(&"Filters: Subject: Boats, sorted by most-recently-modified"));
}

#[test]
fn test_compressed_layout_is_landscape_table() {
    let records = vec![store_record(1, "Pier", None), store_record(2, "Lighthouse", None)];
    let surface = render(&input(records, 2), false);
    assert_eq!(surface.ops[0], DrawOp::BeginPage(PageSize { width: 11.0, height: 8.5 }));
    assert_eq!(surface.count_text("Identifier"), 1);
    assert_eq!(surface.count_text("A-2"), 1);
    assert_eq!(surface.image_count(), 0);
}

#[test]
fn test_tall_row_breaks_page_and_repeats_header() {
    let tall_title: String = (0..45).map(|i| format!("line {}\n", i)).collect();
    let records = vec![store_record(1, "Pier", None), store_record(2, &tall_title, None)];
    let surface = render(&input(records, 2), false);

    assert_eq!(surface.page_count(), 2);
    let pages = surface.texts_by_page();
    assert!(pages[0].contains(&"A-1"));
    assert!(!pages[0].contains(&"line 0"));

    // After the page title, the table header comes first on the new page.
    let second = &pages[1];
    assert_eq!(second[0], "Harbor Digital Archive");
    assert_eq!(&second[1..4], &["Identifier", "Title", "Subject"]);
    assert!(second.contains(&"line 0"));
    assert!(second.contains(&"line 44"));
}

#[test]
fn test_many_rows_repeat_header_on_every_page() {
    let records: Vec<_> = (0..120).map(|i| store_record(i, "Pier", None)).collect();
    let surface = render(&input(records, 2), false);
    assert!(surface.page_count() >= 3);
    assert_eq!(surface.count_text("Identifier"), surface.page_count());
}

#[test]
fn test_unknown_layout_falls_back_to_detail() {
    let surface = render(&input(vec![store_record(1, "Pier", None)], 42), false);
    assert_eq!(surface.ops[0], DrawOp::BeginPage(PageSize { width: 8.5, height: 11.0 }));
    assert_eq!(surface.count_text("Title:"), 1);
}

#[test]
fn test_zero_results_render_a_single_page() {
    let surface = render(&input(Vec::new(), 2), false);
    assert_eq!(surface.page_count(), 1);
    assert!(!surface.ops.iter().any(|op| matches!(op, DrawOp::Rect { .. })));
}

#[test]
fn test_shared_search_prefixes_identifiers() {
    let mut config = config();
    config.shared_search_enabled = true;
    let input: SearchResultsInput = serde_json::from_value(json!({
        "total_results": 1,
        "query": {"layout": 2, "site": 1},
        "results": [{
            "_id": "hhs-7",
            "_source": {
                "core-fields": {"identifier": "7", "title": "Pier"},
                "item": {"contributor-id": "HHS"}
            }
        }]
    }))
    .unwrap();

    let writer = render_search_results(RecordingSurface::new(), &config, &input, false, &fetcher());
    let surface = writer.surface();
    assert_eq!(surface.count_text("HHS-7"), 1);
    assert!(surface
        .texts()
        .contains(&"1 search results from all sites (contributor ID appears in Identifier column)"));
}

#[test]
fn test_finished_listing_resolves_page_total() {
    let records: Vec<_> = (0..120).map(|i| store_record(i, "Pier", None)).collect();
    let writer = render_search_results(RecordingSurface::new(), &config(), &input(records, 2), false, &fetcher());
    match finish_report(writer, "search-results.pdf".to_string()) {
        ReportOutcome::Download(download) => {
            let listing = String::from_utf8(download.bytes).unwrap();
            assert!(!listing.contains("{nb}"));
            assert!(listing.contains("Page 1 of "));
        }
        ReportOutcome::Message(m) => panic!("unexpected message {}", m),
    }
}
