//! Source records and the normalizer that turns them into [`RecordView`]s.
//!
//! A report is fed either by items read straight from the record store or by
//! hits returned from the search index. Both shapes are folded into the same
//! ordered view, with private fields already removed for anonymous viewers.

use crate::encoding::decode_field_text;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub const TITLE_FIELD: &str = "Title";
pub const IDENTIFIER_FIELD: &str = "Identifier";
pub const UNTITLED: &str = "[Untitled]";

// --- Source records ---

/// One element text of a stored item, in store order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementText {
    pub element: String,
    pub text: String,
}

/// A file attached to a stored item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemFile {
    pub filename: String,
    /// Name of the JPEG derivative, when the host generated one
    #[serde(default)]
    pub derivative_filename: Option<String>,
    #[serde(default)]
    pub mime_type: String,
}

impl ItemFile {
    pub fn is_pdf(&self) -> bool {
        self.mime_type.contains("pdf")
    }

    /// Derivative image name, or the original name when there is none.
    pub fn image_filename(&self) -> &str {
        self.derivative_filename.as_deref().unwrap_or(&self.filename)
    }
}

/// An item read directly from the record store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreItem {
    pub id: u64,
    pub element_texts: Vec<ElementText>,
    #[serde(default)]
    pub files: Vec<ItemFile>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Field values in the search index are either a single string or a list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum IndexValues {
    One(String),
    Many(Vec<String>),
}

impl IndexValues {
    pub fn as_slice(&self) -> &[String] {
        match self {
            IndexValues::One(value) => std::slice::from_ref(value),
            IndexValues::Many(values) => values,
        }
    }
}

pub type IndexFields = BTreeMap<String, IndexValues>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HitItem {
    #[serde(rename = "contributor-id", default)]
    pub contributor_id: String,
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HitUrls {
    #[serde(default)]
    pub thumb: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HitSource {
    #[serde(rename = "core-fields", default)]
    pub core_fields: IndexFields,
    #[serde(rename = "local-fields", default)]
    pub local_fields: Option<IndexFields>,
    #[serde(rename = "private-fields", default)]
    pub private_fields: Option<IndexFields>,
    #[serde(default)]
    pub item: HitItem,
    #[serde(default)]
    pub url: HitUrls,
}

/// A document returned by the search index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: HitSource,
}

/// Either source shape. Deserialization picks the variant from the fields
/// present: store items carry `element_texts`, hits carry `_source`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SourceRecord {
    Store(StoreItem),
    Hit(SearchHit),
}

// --- Normalized view ---

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub field_name: String,
    pub value: String,
    pub is_private: bool,
}

/// Ordered, privacy-filtered field values of one record.
#[derive(Debug, Clone)]
pub struct RecordView {
    record_id: String,
    ordered_field_names: Vec<String>,
    fields: HashMap<String, Vec<FieldValue>>,
    thumbnail_url: Option<String>,
}

impl RecordView {
    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn ordered_field_names(&self) -> &[String] {
        &self.ordered_field_names
    }

    /// Values of a field; empty for fields the record does not have.
    pub fn values(&self, field_name: &str) -> &[FieldValue] {
        self.fields.get(field_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every value of every field, in display order.
    pub fn pairs(&self) -> impl Iterator<Item = &FieldValue> {
        self.ordered_field_names.iter().flat_map(move |name| self.values(name).iter())
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail_url.as_deref()
    }

    /// All titles joined by newlines, or `[Untitled]`.
    pub fn title(&self) -> String {
        let titles = self.values(TITLE_FIELD);
        if titles.is_empty() {
            return UNTITLED.to_string();
        }
        titles.iter().map(|v| v.value.as_str()).collect::<Vec<_>>().join("\n")
    }

    /// First identifier value, falling back to the record id.
    pub fn identifier(&self) -> &str {
        self.values(IDENTIFIER_FIELD)
            .first()
            .map(|v| v.value.as_str())
            .unwrap_or(&self.record_id)
    }

    /// Values of a field joined by newlines, as shown in a table cell.
    pub fn cell_text(&self, field_name: &str) -> String {
        self.values(field_name).iter().map(|v| v.value.as_str()).collect::<Vec<_>>().join("\n")
    }
}

/// Convert a display field name to the name used by the search index.
pub fn index_field_name(display_name: &str) -> String {
    let mut out = String::with_capacity(display_name.len());
    let mut pending_dash = false;
    for ch in display_name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Builds record views for one report.
///
/// Every record of a report must go through the same normalizer so that all
/// views share one field order.
#[derive(Debug, Clone)]
pub struct Normalizer {
    field_display_order: Vec<String>,
    private_field_names: BTreeSet<String>,
    viewer_is_authenticated: bool,
    shared_search_enabled: bool,
}

impl Normalizer {
    pub fn new(
        field_display_order: Vec<String>,
        private_field_names: BTreeSet<String>,
        viewer_is_authenticated: bool,
        shared_search_enabled: bool,
    ) -> Self {
        Self {
            field_display_order: unique_field_names(field_display_order),
            private_field_names,
            viewer_is_authenticated,
            shared_search_enabled,
        }
    }

    pub fn normalize(&self, source: &SourceRecord) -> RecordView {
        let mut fields: HashMap<String, Vec<FieldValue>> = self
            .field_display_order
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();

        let (record_id, thumbnail_url) = match source {
            SourceRecord::Store(item) => {
                self.collect_store_values(item, &mut fields);
                (item.id.to_string(), item.thumbnail_url.clone())
            }
            SourceRecord::Hit(hit) => {
                self.collect_hit_values(hit, &mut fields);
                let id = if hit.id.is_empty() {
                    hit.source.item.id.map(|id| id.to_string()).unwrap_or_default()
                } else {
                    hit.id.clone()
                };
                (id, hit.source.url.thumb.clone())
            }
        };

        RecordView {
            record_id,
            ordered_field_names: self.field_display_order.clone(),
            fields,
            thumbnail_url: thumbnail_url.filter(|url| !url.trim().is_empty()),
        }
    }

    pub fn normalize_all(&self, sources: &[SourceRecord]) -> Vec<RecordView> {
        sources.iter().map(|source| self.normalize(source)).collect()
    }

    fn is_private(&self, field_name: &str) -> bool {
        self.private_field_names.contains(field_name)
    }

    fn push_value(
        &self,
        fields: &mut HashMap<String, Vec<FieldValue>>,
        field_name: &str,
        raw: &str,
        is_private: bool,
    ) {
        if is_private && !self.viewer_is_authenticated {
            return;
        }
        if let Some(values) = fields.get_mut(field_name) {
            values.push(FieldValue {
                field_name: field_name.to_string(),
                value: decode_field_text(raw),
                is_private,
            });
        }
    }

    fn collect_store_values(&self, item: &StoreItem, fields: &mut HashMap<String, Vec<FieldValue>>) {
        for element_text in &item.element_texts {
            let name = element_text.element.as_str();
            self.push_value(fields, name, &element_text.text, self.is_private(name));
        }
    }

    fn collect_hit_values(&self, hit: &SearchHit, fields: &mut HashMap<String, Vec<FieldValue>>) {
        let source = &hit.source;
        let empty = IndexFields::new();
        let groups = [
            (&source.core_fields, false),
            (source.local_fields.as_ref().unwrap_or(&empty), false),
            (source.private_fields.as_ref().unwrap_or(&empty), true),
        ];

        for display_name in &self.field_display_order {
            let index_name = index_field_name(display_name);
            let found = groups
                .iter()
                .find_map(|(group, private_group)| group.get(&index_name).map(|values| (values, *private_group)));

            let Some((values, private_group)) = found else {
                continue;
            };

            let is_private = private_group || self.is_private(display_name);
            for value in values.as_slice() {
                if self.shared_search_enabled && display_name == IDENTIFIER_FIELD {
                    let prefixed = format!("{}-{}", source.item.contributor_id, value);
                    self.push_value(fields, display_name, &prefixed, is_private);
                } else {
                    self.push_value(fields, display_name, value, is_private);
                }
            }
        }
    }
}

/// Drop repeated names, keeping each at its first position.
pub fn unique_field_names<I: IntoIterator<Item = String>>(names: I) -> Vec<String> {
    let mut seen = HashSet::new();
    names.into_iter().filter(|name| seen.insert(name.clone())).collect()
}

/// Normalize a single record.
pub fn normalize(
    source: &SourceRecord,
    field_display_order: &[String],
    private_field_names: &BTreeSet<String>,
    viewer_is_authenticated: bool,
    shared_search_enabled: bool,
) -> RecordView {
    Normalizer::new(
        field_display_order.to_vec(),
        private_field_names.clone(),
        viewer_is_authenticated,
        shared_search_enabled,
    )
    .normalize(source)
}
