//! Filterable, sortable view over a typed source table.
//!
//! The source never changes after construction. The view is a list of source
//! row indices plus the visible column projection; filters and sorting only
//! ever rearrange those indices, so any view coordinate maps back to the
//! source row it came from.

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::SortOrder;
use super::source::SourceTable;
use super::value::CellValue;
use crate::api::models::{Column, ColumnType, ParamValues};
use crate::core::reference::{CellStyle, ReferenceData};
use crate::error::ModelError;
use crate::utils::text::header_lines;

/// Name of the row-wide style pseudo-column.
pub const STYLE_COLUMN: &str = "STYLE";

/// Titles and display strings of the current view, as export and print consume them.
#[derive(Debug, Clone, PartialEq)]
pub struct Records {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct TableModel {
    source: SourceTable,
    reference: Arc<ReferenceData>,
    visible: Vec<usize>,
    filters: IndexMap<String, CellValue>,
    view_rows: Vec<usize>,
}

/// Display-typed value of a source cell, with reference-table translation for
/// code-like columns. A lookup miss keeps the raw value.
pub(crate) fn display_value(
    source: &SourceTable,
    reference: &ReferenceData,
    row: usize,
    col: usize,
) -> Option<CellValue> {
    let raw = source.value(row, col)?;
    let column = &source.columns()[col];
    let translatable = matches!(
        source.column_type(col),
        Some(ColumnType::String | ColumnType::Integer)
    );

    if translatable && !raw.is_null() {
        if let Some(binding) = column.nci_binding() {
            if let Some(label) = reference.translate(&binding, &raw.to_string()) {
                return Some(CellValue::Text(label.to_string()));
            }
        }
    }
    Some(raw.clone())
}

impl TableModel {
    pub fn new(
        columns: Vec<Column>,
        data: &[Vec<Value>],
        reference: Arc<ReferenceData>,
    ) -> Result<Self, ModelError> {
        Ok(Self::from_source(SourceTable::build(columns, data)?, reference))
    }

    pub fn from_source(source: SourceTable, reference: Arc<ReferenceData>) -> Self {
        let visible = source.visible_columns();
        let view_rows = (0..source.row_count()).collect();
        Self {
            source,
            reference,
            visible,
            filters: IndexMap::new(),
            view_rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.view_rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.visible.len()
    }

    pub fn column(&self, col: usize) -> Option<&Column> {
        self.visible.get(col).map(|&c| &self.source.columns()[c])
    }

    pub fn column_type(&self, col: usize) -> Option<ColumnType> {
        self.source.column_type(*self.visible.get(col)?)
    }

    /// View column of a visible column, by case-insensitive name.
    pub fn column_by_name(&self, name: &str) -> Option<usize> {
        let source_col = self.source.column_index(name)?;
        self.visible.iter().position(|&c| c == source_col)
    }

    /// `(source row, source column)` behind a view coordinate.
    pub fn source_index(&self, row: usize, col: usize) -> Option<(usize, usize)> {
        Some((*self.view_rows.get(row)?, *self.visible.get(col)?))
    }

    pub fn raw_value(&self, row: usize, col: usize) -> Option<&CellValue> {
        let (row, col) = self.source_index(row, col)?;
        self.source.value(row, col)
    }

    pub fn cell_value(&self, row: usize, col: usize) -> Option<CellValue> {
        let (row, col) = self.source_index(row, col)?;
        display_value(&self.source, &self.reference, row, col)
    }

    pub fn display_string(&self, row: usize, col: usize) -> String {
        self.cell_value(row, col)
            .map(|value| value.to_string())
            .unwrap_or_default()
    }

    /// Check state for BOOL columns, `None` for every other type.
    pub fn cell_checked(&self, row: usize, col: usize) -> Option<bool> {
        if self.column_type(col)? != ColumnType::Bool {
            return None;
        }
        self.raw_value(row, col)?.as_bool()
    }

    /// `STYLE_<COLUMN>` wins over the row-wide `STYLE`; unknown names get default styling.
    pub fn cell_style(&self, row: usize, col: usize) -> CellStyle {
        let Some((source_row, source_col)) = self.source_index(row, col) else {
            return CellStyle::default();
        };
        let column_name = &self.source.columns()[source_col].name;

        let style_name = |pseudo: &str| {
            let index = self.source.column_index(pseudo)?;
            match self.source.value(source_row, index)? {
                CellValue::Null => None,
                value => Some(value.to_string()),
            }
        };

        style_name(&format!("{}_{}", STYLE_COLUMN, column_name))
            .or_else(|| style_name(STYLE_COLUMN))
            .and_then(|name| self.reference.style(&name).map(|s| s.cell_style()))
            .unwrap_or_default()
    }

    /// Column title with `<br>` rendered as a line break.
    pub fn header(&self, col: usize) -> Option<String> {
        let column = self.column(col)?;
        Some(header_lines(column.title.as_deref().unwrap_or(&column.name)))
    }

    /// One-based source row number.
    pub fn row_header(&self, row: usize) -> Option<String> {
        self.view_rows.get(row).map(|r| (r + 1).to_string())
    }

    /// Payload text of every source column of the row behind `row`, by upper-cased name.
    pub fn source_row_values(&self, row: usize) -> Option<ParamValues> {
        let source_row = *self.view_rows.get(row)?;
        let cells = self.source.raw_row(source_row)?;
        Some(
            self.source
                .columns()
                .iter()
                .zip(cells)
                .map(|(column, text)| (column.name.clone(), text.clone()))
                .collect(),
        )
    }

    pub fn visible_records(&self) -> Records {
        let headers = (0..self.column_count())
            .filter_map(|col| self.column(col))
            .map(|c| c.title.clone().unwrap_or_else(|| c.name.clone()))
            .collect();
        let rows = (0..self.row_count())
            .map(|row| {
                (0..self.column_count())
                    .map(|col| self.display_string(row, col))
                    .collect()
            })
            .collect();
        Records { headers, rows }
    }

    // Filters

    pub fn filters(&self) -> &IndexMap<String, CellValue> {
        &self.filters
    }

    pub fn has_filter(&self, col: usize) -> bool {
        self.column(col)
            .is_some_and(|column| self.filters.contains_key(&column.name))
    }

    /// Keep rows whose source value equals `value`; `CellValue::Null` keeps null rows.
    /// Returns false, leaving the view untouched, when the column is already filtered.
    pub fn set_filter(&mut self, col: usize, value: CellValue) -> bool {
        let Some(name) = self.column(col).map(|c| c.name.clone()) else {
            return false;
        };
        if self.filters.contains_key(&name) {
            return false;
        }
        self.filters.insert(name, value);
        self.apply_filters();
        true
    }

    pub fn reset_filter(&mut self, col: usize) -> bool {
        let Some(name) = self.column(col).map(|c| c.name.clone()) else {
            return false;
        };
        if self.filters.shift_remove(&name).is_none() {
            return false;
        }
        self.apply_filters();
        true
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.apply_filters();
    }

    /// Parses a filter value typed by the user into the column's type. Empty text is the null marker.
    pub fn parse_filter_value(&self, col: usize, text: &str) -> Result<CellValue, ModelError> {
        let column = self.column(col).ok_or_else(|| ModelError::MissingField {
            attribute: "view".to_string(),
            field: col.to_string(),
        })?;
        let column_type = column.column_type()?;
        if text.is_empty() {
            return Ok(CellValue::Null);
        }
        CellValue::coerce(&Value::String(text.to_string()), column_type, &column.name, 0)
    }

    /// Rebuilds the view from the source, applying filters in insertion order.
    fn apply_filters(&mut self) {
        let conditions: Vec<(usize, &CellValue)> = self
            .filters
            .iter()
            .filter_map(|(name, value)| Some((self.source.column_index(name)?, value)))
            .collect();

        self.view_rows = (0..self.source.row_count())
            .filter(|&row| {
                conditions.iter().all(|(col, expected)| {
                    self.source.value(row, *col).is_some_and(|v| match expected {
                        CellValue::Null => v.is_null(),
                        expected => v == *expected,
                    })
                })
            })
            .collect();
    }

    // Sorting

    /// Stable sort of the view by displayed value. Nulls stay at the end in both directions.
    pub fn sort(&mut self, col: usize, order: SortOrder) {
        let Some(&source_col) = self.visible.get(col) else {
            return;
        };
        if order == SortOrder::None {
            self.unsort();
            return;
        }

        let mut keyed: Vec<(usize, CellValue)> = self
            .view_rows
            .iter()
            .map(|&row| {
                let key = display_value(&self.source, &self.reference, row, source_col)
                    .unwrap_or(CellValue::Null);
                (row, key)
            })
            .collect();

        keyed.sort_by(|(_, a), (_, b)| match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if order == SortOrder::Descending => b.compare(a),
            (false, false) => a.compare(b),
        });

        self.view_rows = keyed.into_iter().map(|(row, _)| row).collect();
    }

    /// Restore source order.
    pub fn unsort(&mut self) {
        self.view_rows.sort_unstable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::{NciTable, Style, StyleRegistry};
    use serde_json::json;

    fn reference() -> Arc<ReferenceData> {
        let nci = NciTable::new(
            "depots",
            vec!["code".to_string(), "name".to_string()],
            vec![
                vec!["D1".to_string(), "Zeta depot".to_string()],
                vec!["D2".to_string(), "Alpha depot".to_string()],
            ],
        );
        let mut styles = StyleRegistry::new();
        styles.insert(
            "alarm".to_string(),
            Style {
                text_color: "#FFFFFF".to_string(),
                background_color: "#FF0000".to_string(),
            },
        );
        styles.insert(
            "calm".to_string(),
            Style {
                text_color: "#000000".to_string(),
                background_color: "#00FF00".to_string(),
            },
        );
        Arc::new(ReferenceData::new(vec![nci], styles))
    }

    fn model() -> TableModel {
        let columns: Vec<Column> = serde_json::from_value(json!([
            {"name": "depot", "title": "Depot", "type": "STRING", "visable": true,
             "nci": {"name": "depots"}, "nci_column": "name"},
            {"name": "qty", "title": "Qty<br>total", "type": "INTEGER", "visable": true},
            {"name": "price", "title": "Price", "type": "NUMBER", "visable": true},
            {"name": "ok", "title": "Ok", "type": "BOOL", "visable": true},
            {"name": "secret", "title": "Secret", "type": "STRING", "visable": false},
            {"name": "style", "type": "STRING"},
            {"name": "style_qty", "type": "STRING"}
        ]))
        .unwrap();
        let data = vec![
            vec![json!("D1"), json!("3"), json!("1.5"), json!("TRUE"), json!("a"), json!("calm"), json!(null)],
            vec![json!("D2"), json!(""), json!(null), json!("false"), json!("b"), json!(null), json!("alarm")],
            vec![json!("D3"), json!("3"), json!("0.25"), json!("True"), json!("c"), json!("unknown"), json!(null)],
            vec![json!("D1"), json!("7"), json!("9"), json!("0"), json!("d"), json!(null), json!(null)],
        ];
        TableModel::new(columns, &data, reference()).unwrap()
    }

    fn column_strings(model: &TableModel, col: usize) -> Vec<String> {
        (0..model.row_count())
            .map(|row| model.display_string(row, col))
            .collect()
    }

    #[test]
    fn test_visible_projection_hides_untitled_and_invisible() {
        let model = model();
        assert_eq!(model.column_count(), 4);
        assert_eq!(model.row_count(), 4);
        assert!(model.column_by_name("secret").is_none());
        assert_eq!(model.column_by_name("qty"), Some(1));
        assert_eq!(model.header(1).as_deref(), Some("Qty\ntotal"));
    }

    #[test]
    fn test_typed_values() {
        let model = model();
        assert_eq!(model.cell_value(0, 1), Some(CellValue::Integer(3)));
        assert_eq!(model.cell_value(1, 1), Some(CellValue::Integer(0)));
        assert_eq!(model.cell_value(0, 2), Some(CellValue::Number(1.5)));
        assert_eq!(model.cell_value(1, 2), Some(CellValue::Null));
        assert_eq!(model.cell_checked(0, 3), Some(true));
        assert_eq!(model.cell_checked(2, 3), Some(true));
        assert_eq!(model.cell_checked(3, 3), Some(false));
        assert_eq!(model.cell_checked(0, 1), None);
    }

    #[test]
    fn test_nci_translation_with_fallback() {
        let model = model();
        assert_eq!(
            column_strings(&model, 0),
            vec!["Zeta depot", "Alpha depot", "D3", "Zeta depot"]
        );
        assert_eq!(model.raw_value(0, 0), Some(&CellValue::Text("D1".to_string())));
    }

    #[test]
    fn test_filter_is_idempotent_and_resettable() {
        let mut model = model();
        let qty = model.column_by_name("QTY").unwrap();

        assert!(model.set_filter(qty, CellValue::Integer(3)));
        let first: Vec<_> = (0..model.row_count())
            .map(|r| model.source_index(r, 0).unwrap().0)
            .collect();
        assert_eq!(first, vec![0, 2]);
        assert!(model.has_filter(qty));

        assert!(!model.set_filter(qty, CellValue::Integer(3)));
        assert!(!model.set_filter(qty, CellValue::Integer(7)));
        assert_eq!(model.row_count(), 2);

        assert!(model.reset_filter(qty));
        assert_eq!(model.row_count(), 4);
        assert!(model.set_filter(qty, CellValue::Integer(3)));
        let again: Vec<_> = (0..model.row_count())
            .map(|r| model.source_index(r, 0).unwrap().0)
            .collect();
        assert_eq!(again, first);
    }

    #[test]
    fn test_null_filter_and_combined_filters() {
        let mut model = model();
        assert!(model.set_filter(2, CellValue::Null));
        assert_eq!(model.row_count(), 1);
        assert_eq!(model.row_header(0).as_deref(), Some("2"));

        model.clear_filters();
        assert!(model.set_filter(0, CellValue::Text("D1".to_string())));
        assert!(model.set_filter(1, CellValue::Integer(7)));
        assert_eq!(model.row_count(), 1);
        assert_eq!(model.filters().keys().collect::<Vec<_>>(), vec!["DEPOT", "QTY"]);
    }

    #[test]
    fn test_parse_filter_value_uses_column_type() {
        let model = model();
        assert_eq!(model.parse_filter_value(1, "7"), Ok(CellValue::Integer(7)));
        assert_eq!(model.parse_filter_value(2, ""), Ok(CellValue::Null));
        assert!(model.parse_filter_value(2, "cheap").is_err());
    }

    #[test]
    fn test_sort_by_display_value_then_unsort() {
        let mut model = model();
        model.sort(0, SortOrder::Ascending);
        assert_eq!(
            column_strings(&model, 0),
            vec!["Alpha depot", "D3", "Zeta depot", "Zeta depot"]
        );

        model.unsort();
        let order: Vec<_> = (0..model.row_count())
            .map(|r| model.source_index(r, 0).unwrap().0)
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_sort_is_stable_and_keeps_nulls_last() {
        let mut model = model();
        model.sort(1, SortOrder::Descending);
        let rows: Vec<_> = (0..model.row_count())
            .map(|r| model.source_index(r, 0).unwrap().0)
            .collect();
        // qty: 3, 0, 3, 7 -> equal threes keep source order
        assert_eq!(rows, vec![3, 0, 2, 1]);

        model.sort(2, SortOrder::Descending);
        assert_eq!(column_strings(&model, 2), vec!["9", "1.5", "0.25", ""]);
        model.sort(2, SortOrder::Ascending);
        assert_eq!(column_strings(&model, 2), vec!["0.25", "1.5", "9", ""]);
    }

    #[test]
    fn test_cell_style_lookup_order() {
        let model = model();
        // row-wide style
        let style = model.cell_style(0, 0);
        assert_eq!(style.background.map(|c| (c.r, c.g, c.b)), Some((0, 255, 0)));
        assert_eq!(style.background.map(|c| c.alpha), Some(0.5));

        // per-column style wins for QTY
        let style = model.cell_style(1, 1);
        assert_eq!(style.background.map(|c| (c.r, c.g, c.b)), Some((255, 0, 0)));
        assert!(model.cell_style(1, 0).is_default());

        // unknown style name
        assert!(model.cell_style(2, 0).is_default());
        assert!(model.cell_style(99, 0).is_default());
    }

    #[test]
    fn test_source_row_values_and_records() {
        let mut model = model();
        model.sort(1, SortOrder::Descending);
        let values = model.source_row_values(0).unwrap();
        assert_eq!(values.get("DEPOT").map(String::as_str), Some("D1"));
        assert_eq!(values.get("QTY").map(String::as_str), Some("7"));
        assert_eq!(values.get("SECRET").map(String::as_str), Some("d"));

        // blank INTEGER binds as sent, not as its typed zero
        let blank = model.source_row_values(3).unwrap();
        assert_eq!(blank.get("QTY").map(String::as_str), Some(""));

        let records = model.visible_records();
        assert_eq!(records.headers, vec!["Depot", "Qty<br>total", "Price", "Ok"]);
        assert_eq!(records.rows[0], vec!["Zeta depot", "7", "9", "false"]);
    }

    #[test]
    fn test_number_columns_are_numeric() {
        let model = model();
        for row in 0..model.row_count() {
            match model.cell_value(row, 2) {
                Some(CellValue::Number(_)) | Some(CellValue::Null) => {}
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_bad_cell_fails_construction() {
        let columns: Vec<Column> =
            serde_json::from_value(json!([{"name": "n", "type": "NUMBER"}])).unwrap();
        let err = TableModel::new(columns, &[vec![json!("n/a")]], Arc::default()).unwrap_err();
        assert!(matches!(err, ModelError::Coerce { row: 0, .. }));
    }
}
