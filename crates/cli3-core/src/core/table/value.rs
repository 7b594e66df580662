use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;

use crate::api::models::{ColumnType, value_to_string};
use crate::error::ModelError;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%d.%m.%Y %H:%M:%S",
];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// A typed cell of the source table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Text(String),
    Number(f64),
    Integer(i64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl CellValue {
    /// Converts a raw payload cell to the column's type.
    ///
    /// Blank cells (null, empty or whitespace text) become `Integer(0)` in
    /// INTEGER columns and `Null` everywhere else except BOOL, where they are false.
    pub fn coerce(
        raw: &Value,
        column_type: ColumnType,
        column: &str,
        row: usize,
    ) -> Result<Self, ModelError> {
        let text = value_to_string(raw);
        let trimmed = text.trim();
        let blank = trimmed.is_empty();

        let fail = || ModelError::Coerce {
            column: column.to_string(),
            row,
            value: text.clone(),
            expected: column_type.as_str().to_string(),
        };

        let value = match column_type {
            ColumnType::String if blank => CellValue::Null,
            ColumnType::String => CellValue::Text(text.clone()),
            ColumnType::Bool => CellValue::Bool(trimmed.eq_ignore_ascii_case("true")),
            ColumnType::Integer if blank => CellValue::Integer(0),
            ColumnType::Integer => {
                let number = parse_number(raw, trimmed).ok_or_else(fail)?;
                // NaN counts as blank; fractions truncate toward zero
                if number.is_nan() {
                    CellValue::Integer(0)
                } else if (i64::MIN as f64..i64::MAX as f64).contains(&number) {
                    CellValue::Integer(number as i64)
                } else {
                    return Err(fail());
                }
            }
            _ if blank => CellValue::Null,
            ColumnType::Number => CellValue::Number(parse_number(raw, trimmed).ok_or_else(fail)?),
            ColumnType::Date => CellValue::Date(parse_date(trimmed).ok_or_else(fail)?),
            ColumnType::DateTime => CellValue::DateTime(parse_datetime(trimmed).ok_or_else(fail)?),
            ColumnType::Time => CellValue::Time(parse_time(trimmed).ok_or_else(fail)?),
        };
        Ok(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            CellValue::Bool(_) => 0,
            CellValue::Number(_) | CellValue::Integer(_) => 1,
            CellValue::Date(_) | CellValue::DateTime(_) => 2,
            CellValue::Time(_) => 3,
            CellValue::Text(_) => 4,
            CellValue::Null => 5,
        }
    }

    /// Total order used for sorting. Nulls sort after every other value.
    pub fn compare(&self, other: &Self) -> Ordering {
        use CellValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Text(a), Text(b)) => a.cmp(b),
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (Date(a), DateTime(b)) => a.and_time(NaiveTime::MIN).cmp(b),
            (DateTime(a), Date(b)) => a.cmp(&b.and_time(NaiveTime::MIN)),
            (Time(a), Time(b)) => a.cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                _ => a.rank().cmp(&b.rank()),
            },
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
        }
    }
}

fn parse_number(raw: &Value, trimmed: &str) -> Option<f64> {
    let number = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(_) => trimmed.parse::<f64>().ok(),
        _ => None,
    }?;
    (!number.is_infinite()).then_some(number)
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| parse_datetime(text).map(|dt| dt.date()))
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        .or_else(|| parse_datetime(text).map(|dt| dt.time()))
}
