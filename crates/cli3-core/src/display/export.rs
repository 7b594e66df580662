//! Machine-readable renderings of a table view.

use crate::core::table::Records;
use crate::error::{AppError, StorageError};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!("unknown format '{}' (expected table, json or csv)", other)),
        }
    }
}

/// Header row of column titles, then one line per view row.
pub fn records_to_csv(records: &Records) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let export_error = |message: String| StorageError::DocumentFormat {
        path: "<csv>".to_string(),
        message,
    };

    writer
        .write_record(&records.headers)
        .map_err(|e| export_error(e.to_string()))?;
    for row in &records.rows {
        writer
            .write_record(row)
            .map_err(|e| export_error(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| export_error(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| export_error(e.to_string()).into())
}

/// Array of objects keyed by column title.
pub fn records_to_json(records: &Records) -> Result<String, AppError> {
    let rows: Vec<Value> = records
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = records
                .headers
                .iter()
                .cloned()
                .zip(row.iter().cloned().map(Value::String))
                .collect();
            Value::Object(object)
        })
        .collect();
    serde_json::to_string_pretty(&rows).map_err(|e| {
        StorageError::DocumentFormat {
            path: "<json>".to_string(),
            message: e.to_string(),
        }
        .into()
    })
}
