// Performance benchmarks for report layout and serialization
//
// Run benchmarks with: cargo bench

use archive_report::columns::{plan_columns, LANDSCAPE_TABLE_WIDTH, TABLE_INDENT};
use archive_report::config::ReportConfig;
use archive_report::image::DefaultImageFetcher;
use archive_report::metrics::{estimate_line_count, Font};
use archive_report::report::{create_search_results_report, render_search_results};
use archive_report::search::SearchResultsInput;
use archive_report::surface::RecordingSurface;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

fn config() -> ReportConfig {
    ReportConfig::from_json(
        r#"{
            "site_title": "Harbor",
            "site_url": "https://harbor.example.org",
            "max_results": 100000,
            "layouts": {"2": {"name": "Table", "columns": ["Identifier", "Title", "Description", "Subject", "Date"]}}
        }"#,
    )
    .expect("valid config")
}

fn results(count: usize, layout: u32) -> SearchResultsInput {
    let records: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "id": i,
                "element_texts": [
                    {"element": "Identifier", "text": format!("1987.{}", i)},
                    {"element": "Title", "text": format!("Chart of the outer harbor, sheet {}", i)},
                    {"element": "Description", "text": "Hand-colored survey chart showing soundings, the breakwater and the lighthouse on the point."},
                    {"element": "Subject", "text": "Maps"},
                    {"element": "Subject", "text": "Navigation"},
                    {"element": "Date", "text": "1887"}
                ]
            })
        })
        .collect();
    serde_json::from_value(json!({
        "total_results": count,
        "results": records,
        "filters_text": "Subject: Maps",
        "query": {"layout": layout}
    }))
    .expect("valid results")
}

/// Benchmark the wrap-based line-count estimator
fn bench_line_count(c: &mut Criterion) {
    let text = "Hand-colored survey chart showing soundings, the breakwater and the lighthouse on the point. ".repeat(8);
    let font = Font::regular(8.0);

    let mut group = c.benchmark_group("line_count");
    for width in [1.25f32, 2.0, 4.0] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| estimate_line_count(black_box(width), black_box(&text), font))
        });
    }
    group.finish();
}

/// Benchmark column planning
fn bench_column_plan(c: &mut Criterion) {
    let names: Vec<String> = ["Identifier", "Title", "Description", "Subject", "Date", "Creator", "Place"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    c.bench_function("plan_columns", |b| {
        b.iter(|| plan_columns(black_box(&names), LANDSCAPE_TABLE_WIDTH, TABLE_INDENT, false))
    });
}

/// Benchmark layout onto a recording surface and full PDF output
fn bench_reports(c: &mut Criterion) {
    let config = config();
    let fetcher = DefaultImageFetcher::default();

    let mut group = c.benchmark_group("search_report");
    for count in [10usize, 100, 500] {
        let detail = results(count, 1);
        let table = results(count, 2);

        group.bench_with_input(BenchmarkId::new("detail_layout", count), &detail, |b, input| {
            b.iter(|| render_search_results(RecordingSurface::new(), &config, black_box(input), false, &fetcher))
        });
        group.bench_with_input(BenchmarkId::new("compressed_layout", count), &table, |b, input| {
            b.iter(|| render_search_results(RecordingSurface::new(), &config, black_box(input), false, &fetcher))
        });
        group.bench_with_input(BenchmarkId::new("pdf", count), &table, |b, input| {
            b.iter(|| create_search_results_report(&config, black_box(input), false, &fetcher))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_line_count, bench_column_plan, bench_reports);
criterion_main!(benches);
