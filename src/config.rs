use crate::record::unique_field_names;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Layout id of the portrait detail layout.
pub const DETAIL_LAYOUT_ID: u32 = 1;

/// A named compressed layout and the fields it shows as columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutDefinition {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Organization name shown in the page header, before "Digital Archive"
    pub site_title: String,
    /// Root URL used for deep links to items
    pub site_url: String,
    /// URL under which attachment originals are served
    pub files_url: String,
    /// Local directory holding attachment derivatives (`fullsize/...`)
    pub files_dir: PathBuf,
    /// Field names in the order a public item page shows them
    pub display_order: Vec<String>,
    /// Item-type fields appended after the display order
    pub item_type_fields: Vec<String>,
    pub private_fields: Vec<String>,
    /// Largest result set a search report will render
    pub max_results: usize,
    /// Detail layouts with more records than this are rendered without images
    pub max_images_in_detail_layout: usize,
    pub layouts: BTreeMap<u32, LayoutDefinition>,
    pub shared_search_enabled: bool,
    pub image_timeout_secs: u64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            site_title: String::new(),
            site_url: String::new(),
            files_url: String::new(),
            files_dir: PathBuf::from("files"),
            display_order: vec![
                "Identifier".to_string(),
                "Title".to_string(),
                "Description".to_string(),
                "Subject".to_string(),
                "Date".to_string(),
            ],
            item_type_fields: Vec::new(),
            private_fields: Vec::new(),
            max_results: 1000,
            max_images_in_detail_layout: 1000,
            layouts: BTreeMap::new(),
            shared_search_enabled: false,
            image_timeout_secs: 10,
        }
    }
}

impl ReportConfig {
    /// Load a configuration file. Missing keys take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Field order for every report: the display order followed by any
    /// item-type fields it does not already contain. Each name appears once.
    pub fn detail_layout_field_names(&self) -> Vec<String> {
        unique_field_names(self.display_order.iter().chain(&self.item_type_fields).cloned())
    }

    pub fn private_field_set(&self) -> BTreeSet<String> {
        self.private_fields.iter().cloned().collect()
    }

    /// Columns of a compressed layout, or `None` for the detail layout and
    /// ids that are not configured.
    pub fn compressed_layout(&self, layout_id: u32) -> Option<&LayoutDefinition> {
        if layout_id == DETAIL_LAYOUT_ID {
            return None;
        }
        self.layouts.get(&layout_id)
    }

    /// Header text shown on every page.
    pub fn header_title(&self) -> String {
        let title = self.site_title.trim();
        if title.is_empty() {
            "Digital Archive".to_string()
        } else {
            format!("{} Digital Archive", title)
        }
    }

    pub fn item_url(&self, item_id: &str) -> String {
        format!("{}/items/show/{}", self.site_url.trim_end_matches('/'), item_id)
    }

    pub fn attachment_url(&self, filename: &str) -> String {
        format!("{}/files/original/{}", self.files_url.trim_end_matches('/'), filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = ReportConfig::from_json("{}").unwrap();
        assert_eq!(config.max_results, 1000);
        assert_eq!(config.max_images_in_detail_layout, 1000);
        assert!(!config.shared_search_enabled);
        assert_eq!(config.display_order[0], "Identifier");
    }

    #[test]
    fn test_detail_layout_appends_item_type_fields_once() {
        let config = ReportConfig {
            display_order: vec!["Title".into(), "Subject".into()],
            item_type_fields: vec!["Subject".into(), "Place".into(), "Status".into()],
            ..Default::default()
        };
        assert_eq!(config.detail_layout_field_names(), vec!["Title", "Subject", "Place", "Status"]);
    }

    #[test]
    fn test_repeated_display_order_names_collapse() {
        let config = ReportConfig {
            display_order: vec!["Title".into(), "Subject".into(), "Subject".into()],
            item_type_fields: vec!["Title".into()],
            ..Default::default()
        };
        assert_eq!(config.detail_layout_field_names(), vec!["Title", "Subject"]);
    }

    #[test]
    fn test_layouts_parse_with_integer_keys() {
        let config = ReportConfig::from_json(
            r#"{"layouts": {"2": {"name": "Summary", "columns": ["Identifier", "Title"]}}}"#,
        )
        .unwrap();
        let layout = config.compressed_layout(2).unwrap();
        assert_eq!(layout.name, "Summary");
        assert_eq!(layout.columns, vec!["Identifier", "Title"]);
        assert!(config.compressed_layout(DETAIL_LAYOUT_ID).is_none());
        assert!(config.compressed_layout(9).is_none());
    }

    #[test]
    fn test_urls_trim_trailing_slash() {
        let config = ReportConfig {
            site_url: "https://archive.example.org/".into(),
            files_url: "https://archive.example.org".into(),
            ..Default::default()
        };
        assert_eq!(config.item_url("42"), "https://archive.example.org/items/show/42");
        assert_eq!(config.attachment_url("a.pdf"), "https://archive.example.org/files/original/a.pdf");
    }

    #[test]
    fn test_header_title() {
        let config = ReportConfig { site_title: "Harbor Historical Society".into(), ..Default::default() };
        assert_eq!(config.header_title(), "Harbor Historical Society Digital Archive");
    }
}
