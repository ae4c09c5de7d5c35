//! # archive-report
//!
//! Renders archive item metadata, or a page of search results, as a
//! paginated PDF report. This library provides:
//!
//! - **Record normalization**: store items and search index hits become one
//!   ordered, privacy-filtered view
//! - **Detail layout**: one block per record with title, thumbnail and a
//!   label/value list
//! - **Compressed layout**: a landscape table with planned column widths
//! - **Summary text**: result count, filters and sort order atop a results
//!   report
//! - **PDF output**: standard Helvetica fonts, JPEG/PNG images, links and
//!   compressed content streams
//!
//! ## Quick Start
//!
//! ```rust
//! use archive_report::config::ReportConfig;
//! use archive_report::image::DefaultImageFetcher;
//! use archive_report::report::{create_search_results_report, ReportOutcome};
//! use archive_report::search::SearchResultsInput;
//!
//! let config = ReportConfig::from_json(r#"{"site_title": "Harbor", "site_url": "https://harbor.example.org"}"#)
//!     .expect("valid config");
//! let input: SearchResultsInput = serde_json::from_str(
//!     r#"{"total_results": 1, "results": [{"id": 3, "element_texts": [{"element": "Title", "text": "Pier"}]}]}"#,
//! )
//! .expect("valid results");
//!
//! match create_search_results_report(&config, &input, false, &DefaultImageFetcher::default()) {
//!     ReportOutcome::Download(download) => assert_eq!(download.file_name, "search-results.pdf"),
//!     ReportOutcome::Message(message) => panic!("{}", message),
//! }
//! ```
//!
//! ## Modules
//!
//! - [`record`]: source records and the normalizer
//! - [`summary`]: filter and sort description of a results report
//! - [`columns`]: column widths for the compressed layout
//! - [`renderer`]: detail and compressed page flow, item reports
//! - [`page_writer`]: cursor, page breaks and page furniture
//! - [`metrics`]: Helvetica widths and text wrapping
//! - [`surface`]: the drawing surface trait and a recording implementation
//! - [`pdf_generator`]: PDF serialization
//! - [`image`]: image fetching, decoding and embedding
//! - [`report`]: entry points returning a download or a message

pub mod columns;
pub mod compression;
pub mod config;
pub mod encoding;
pub mod error;
pub mod image;
pub mod metrics;
pub mod page_writer;
pub mod pdf_generator;
pub mod record;
pub mod renderer;
pub mod report;
pub mod search;
pub mod summary;
pub mod surface;

pub use error::{ReportError, Result};
