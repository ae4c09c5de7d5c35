//! Column planning for the compressed (table) layout.

use std::collections::BTreeSet;

/// Usable width of a landscape letter page with 0.75 in side margins.
pub const LANDSCAPE_TABLE_WIDTH: f32 = 9.5;
/// Offset that lines the table's left border up with the page header.
pub const TABLE_INDENT: f32 = 0.05;

const IDENTIFIER_WIDTH: f32 = 0.6;
const SHARED_IDENTIFIER_WIDTH: f32 = 0.8;
const WIDE_WIDTH: f32 = 4.0;
const WIDE_WIDTH_CROWDED: f32 = 1.75;
const MEDIUM_WIDTH: f32 = 2.0;
const MEDIUM_WIDTH_CROWDED: f32 = 1.25;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedColumn {
    pub name: String,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPlan {
    pub columns: Vec<PlannedColumn>,
    pub dropped_columns: BTreeSet<String>,
    pub indent: f32,
}

impl ColumnPlan {
    pub fn widths(&self) -> Vec<f32> {
        self.columns.iter().map(|c| c.width).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn total_width(&self) -> f32 {
        self.columns.iter().map(|c| c.width).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Width a column asks for before the budget is applied.
pub fn heuristic_width(field_name: &str, column_count: usize, shared_search_enabled: bool) -> f32 {
    match field_name {
        "Identifier" => {
            if shared_search_enabled { SHARED_IDENTIFIER_WIDTH } else { IDENTIFIER_WIDTH }
        }
        "Title" | "Description" => {
            if column_count > 5 { WIDE_WIDTH_CROWDED } else { WIDE_WIDTH }
        }
        _ => {
            if column_count > 6 { MEDIUM_WIDTH_CROWDED } else { MEDIUM_WIDTH }
        }
    }
}

pub fn plan_columns(
    field_names: &[String],
    available_width: f32,
    indent: f32,
    shared_search_enabled: bool,
) -> ColumnPlan {
    let column_count = field_names.len();
    let mut remaining = available_width - indent * 2.0;
    let mut columns = Vec::new();
    let mut dropped_columns = BTreeSet::new();

    for (index, name) in field_names.iter().enumerate() {
        if remaining <= 0.0 {
            dropped_columns.insert(name.clone());
            continue;
        }

        let width = if index + 1 == column_count {
            remaining
        } else {
            let width = heuristic_width(name, column_count, shared_search_enabled).min(remaining);
            remaining -= width;
            width
        };

        columns.push(PlannedColumn { name: name.clone(), width });
    }

    if !dropped_columns.is_empty() {
        log::debug!("Dropped {} columns that do not fit: {:?}", dropped_columns.len(), dropped_columns);
    }

    ColumnPlan { columns, dropped_columns, indent }
}
