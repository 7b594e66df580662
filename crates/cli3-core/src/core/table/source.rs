use serde_json::Value;

use super::value::CellValue;
use crate::api::models::{Column, ColumnType, value_to_string};
use crate::error::ModelError;
use crate::utils::error_helpers::convert_model_error;

/// Immutable, fully typed table built from a result payload.
#[derive(Debug, Clone)]
pub struct SourceTable {
    columns: Vec<Column>,
    types: Vec<ColumnType>,
    rows: Vec<Vec<CellValue>>,
    /// Payload text of every cell, as the server sent it.
    raw: Vec<Vec<String>>,
}

impl SourceTable {
    /// Fails on the first unknown column type, row of the wrong width or
    /// cell that cannot be read as its column's type.
    pub fn build(columns: Vec<Column>, data: &[Vec<Value>]) -> Result<Self, ModelError> {
        let types = columns
            .iter()
            .map(Column::column_type)
            .collect::<Result<Vec<_>, _>>()?;

        let rows = data
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                if cells.len() != columns.len() {
                    return Err(ModelError::RowWidth {
                        row,
                        expected: columns.len(),
                        found: cells.len(),
                    });
                }
                cells
                    .iter()
                    .zip(columns.iter().zip(&types))
                    .map(|(raw, (column, column_type))| {
                        CellValue::coerce(raw, *column_type, &column.name, row)
                    })
                    .collect::<Result<Vec<CellValue>, ModelError>>()
            })
            .collect::<Result<Vec<_>, _>>()?;
        let raw = data
            .iter()
            .map(|cells| cells.iter().map(value_to_string).collect())
            .collect();

        Ok(Self {
            columns,
            types,
            rows,
            raw,
        })
    }

    /// Parses a `{ type, columns, data }` result attribute.
    pub fn from_attribute(attribute: &str, value: &Value) -> Result<Self, ModelError> {
        let field = |name: &str| {
            value.get(name).ok_or_else(|| ModelError::MissingField {
                attribute: attribute.to_string(),
                field: name.to_string(),
            })
        };
        let context = format!("result '{}'", attribute);
        let invalid = |e: serde_json::Error| convert_model_error(e, &context);

        let columns: Vec<Column> = serde_json::from_value(field("columns")?.clone()).map_err(invalid)?;
        let data: Vec<Vec<Value>> = serde_json::from_value(field("data")?.clone()).map_err(invalid)?;
        Self::build(columns, &data)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_type(&self, col: usize) -> Option<ColumnType> {
        self.types.get(col).copied()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.to_uppercase();
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row)?.get(col)
    }

    pub fn raw_row(&self, row: usize) -> Option<&[String]> {
        self.raw.get(row).map(Vec::as_slice)
    }

    /// Source indices of titled, visible columns in declaration order.
    pub fn visible_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.is_visible())
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(json: Value) -> Vec<Column> {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_build_types_every_column() {
        let cols = columns(json!([
            {"name": "id", "title": "Id", "type": "INTEGER", "visable": true},
            {"name": "amount", "title": "Amount", "type": "NUMBER", "visable": true},
            {"name": "style", "type": "STRING"}
        ]));
        let data = vec![vec![json!("1"), json!("10.5"), json!("warn")]];
        let table = SourceTable::build(cols, &data).unwrap();

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.value(0, 0), Some(&CellValue::Integer(1)));
        assert_eq!(table.value(0, 1), Some(&CellValue::Number(10.5)));
        assert_eq!(table.visible_columns(), vec![0, 1]);
        assert_eq!(table.column_index("Style"), Some(2));
    }

    #[test]
    fn test_row_width_mismatch() {
        let cols = columns(json!([{"name": "a"}, {"name": "b"}]));
        let data = vec![vec![json!("1"), json!("2")], vec![json!("3")]];
        assert_eq!(
            SourceTable::build(cols, &data).unwrap_err(),
            ModelError::RowWidth {
                row: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_unknown_type_fails_fast() {
        let cols = columns(json!([{"name": "a", "type": "MONEY"}]));
        assert!(matches!(
            SourceTable::build(cols, &[]),
            Err(ModelError::UnknownColumnType { .. })
        ));
    }

    #[test]
    fn test_from_attribute_requires_columns_and_data() {
        let value = json!({"type": "cursor", "columns": []});
        assert_eq!(
            SourceTable::from_attribute("r1", &value).unwrap_err(),
            ModelError::MissingField {
                attribute: "r1".to_string(),
                field: "data".to_string()
            }
        );

        let value = json!({"type": "cursor", "columns": [{"name": "x"}], "data": [["v"]]});
        let table = SourceTable::from_attribute("r1", &value).unwrap();
        assert_eq!(table.value(0, 0), Some(&CellValue::Text("v".to_string())));
    }
}
