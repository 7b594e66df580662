use std::sync::Arc;

use serde_json::Value;

use super::model::display_value;
use super::source::SourceTable;
use crate::api::models::Column;
use crate::core::reference::ReferenceData;
use crate::error::ModelError;

/// One record shown as a captioned list of `(title, value)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPage {
    pub caption: String,
    pub entries: Vec<(String, String)>,
}

/// Record-per-page view of a typed source.
#[derive(Debug, Clone)]
pub struct SeriesModel {
    source: SourceTable,
    reference: Arc<ReferenceData>,
    visible: Vec<usize>,
}

impl SeriesModel {
    pub fn new(
        columns: Vec<Column>,
        data: &[Vec<Value>],
        reference: Arc<ReferenceData>,
    ) -> Result<Self, ModelError> {
        Ok(Self::from_source(SourceTable::build(columns, data)?, reference))
    }

    pub fn from_source(source: SourceTable, reference: Arc<ReferenceData>) -> Self {
        let visible = source.visible_columns();
        Self {
            source,
            reference,
            visible,
        }
    }

    pub fn page_count(&self) -> usize {
        self.source.row_count()
    }

    pub fn page(&self, row: usize) -> Option<SeriesPage> {
        if row >= self.source.row_count() {
            return None;
        }
        let entries: Vec<(String, String)> = self
            .visible
            .iter()
            .map(|&col| {
                let column = &self.source.columns()[col];
                let title = column.title.clone().unwrap_or_else(|| column.name.clone());
                let value = display_value(&self.source, &self.reference, row, col)
                    .map(|v| v.to_string())
                    .unwrap_or_default();
                (title, value)
            })
            .collect();

        let caption = match entries.first() {
            Some((title, value)) => format!("{}: {}", title, value),
            None => format!("#{}", row + 1),
        };
        Some(SeriesPage { caption, entries })
    }

    pub fn pages(&self) -> Vec<SeriesPage> {
        (0..self.page_count()).filter_map(|row| self.page(row)).collect()
    }
}
