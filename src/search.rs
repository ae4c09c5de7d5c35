use crate::columns::{plan_columns, LANDSCAPE_TABLE_WIDTH, TABLE_INDENT};
use crate::config::{ReportConfig, DETAIL_LAYOUT_ID};
use crate::record::SourceRecord;
use crate::renderer::ResultsLayout;
use crate::summary::{FilterSummary, SearchScope, SortDefault};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Site id that selects a search across all contributing sites.
pub const ALL_SITES_ID: u32 = 1;

/// Query string parameters of the search that produced the results.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchQuery {
    pub query: String,
    pub keywords: String,
    pub sort: Option<String>,
    /// `"1"` restricts results to items with images
    pub filter: Option<String>,
    pub layout: Option<u32>,
    pub site: Option<u32>,
}

impl SearchQuery {
    /// Relevance ranking only makes sense when there is text to rank by.
    pub fn relevance_allowed(&self) -> bool {
        !self.query.trim().is_empty() || !self.keywords.trim().is_empty()
    }

    pub fn images_only(&self) -> bool {
        self.filter.as_deref() == Some("1")
    }

    pub fn layout_id(&self) -> u32 {
        self.layout.unwrap_or(DETAIL_LAYOUT_ID)
    }

    pub fn is_all_sites(&self) -> bool {
        self.site == Some(ALL_SITES_ID)
    }
}

/// One page of search results as handed over by the search subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultsInput {
    pub total_results: usize,
    #[serde(default)]
    pub results: Vec<SourceRecord>,
    /// Active filters, one per line
    #[serde(default)]
    pub filters_text: String,
    #[serde(default)]
    pub query: SearchQuery,
}

impl SearchResultsInput {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read search results {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid search results {}", path.display()))
    }

    pub fn is_detail_layout(&self, config: &ReportConfig) -> bool {
        config.compressed_layout(self.query.layout_id()).is_none()
    }

    pub fn scope(&self, config: &ReportConfig) -> SearchScope {
        if self.query.is_all_sites() {
            SearchScope::AllSites { detail: self.is_detail_layout(config) }
        } else {
            SearchScope::Site(config.site_url.clone())
        }
    }

    pub fn summary(&self, config: &ReportConfig) -> FilterSummary {
        FilterSummary::new(
            self.total_results,
            &self.filters_text,
            self.query.sort.as_deref(),
            self.query.images_only(),
            SortDefault::from_allowance(self.query.relevance_allowed()),
            self.scope(config),
        )
    }
}

/// Detail layout for id 1, a planned table for a configured layout id.
/// Anything else falls back to the detail layout.
pub fn select_layout(config: &ReportConfig, layout_id: u32) -> ResultsLayout {
    match config.compressed_layout(layout_id) {
        Some(definition) => {
            let plan = plan_columns(
                &definition.columns,
                LANDSCAPE_TABLE_WIDTH,
                TABLE_INDENT,
                config.shared_search_enabled,
            );
            log::debug!("Layout {} ({}) columns {:?}", layout_id, definition.name, plan.widths());
            ResultsLayout::Compressed(plan)
        }
        None => {
            if layout_id != DETAIL_LAYOUT_ID {
                log::warn!("Unknown layout {}, using the detail layout", layout_id);
            }
            ResultsLayout::Detail
        }
    }
}
