//! Reference data fetched once per login: NCI lookup tables and the style registry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::api::models::{NciBinding, NciPayload, value_to_string};

/// Opacity applied to style backgrounds.
pub const BACKGROUND_ALPHA: f32 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default)]
    pub text_color: String,
    #[serde(default)]
    pub background_color: String,
}

pub type StyleRegistry = HashMap<String, Style>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub alpha: f32,
}

impl Rgba {
    /// Reads the last six hex digits, so `#RRGGBB`, `RRGGBB` and `0xAARRGGBB` all work.
    pub fn from_hex(hex: &str, alpha: f32) -> Option<Self> {
        let hex = hex.trim();
        if hex.len() < 6 || !hex.is_char_boundary(hex.len() - 6) {
            return None;
        }
        let digits = &hex[hex.len() - 6..];
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
            alpha,
        })
    }
}

/// Resolved colors for one cell; `None` means default styling.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CellStyle {
    pub foreground: Option<Rgba>,
    pub background: Option<Rgba>,
}

impl CellStyle {
    pub fn is_default(&self) -> bool {
        self.foreground.is_none() && self.background.is_none()
    }
}

impl Style {
    pub fn cell_style(&self) -> CellStyle {
        CellStyle {
            foreground: Rgba::from_hex(&self.text_color, 1.0),
            background: Rgba::from_hex(&self.background_color, BACKGROUND_ALPHA),
        }
    }
}

/// One reference table, indexed by its first column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NciTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl NciTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let columns: Vec<String> = columns.into_iter().map(|c| c.to_uppercase()).collect();
        let mut index = HashMap::with_capacity(rows.len());
        for (pos, row) in rows.iter().enumerate() {
            if let Some(key) = row.first() {
                // first occurrence of a key wins
                index.entry(key.clone()).or_insert(pos);
            }
        }
        Self {
            name: name.into(),
            columns,
            rows,
            index,
        }
    }

    pub fn from_payload(name: impl Into<String>, payload: NciPayload) -> Self {
        let rows = payload
            .rows
            .iter()
            .map(|row| row.iter().map(value_to_string).collect())
            .collect();
        Self::new(name, payload.columns, rows)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in the row keyed by `key`; `None` when either is absent.
    pub fn lookup(&self, key: &str, column: &str) -> Option<&str> {
        let row = *self.index.get(key)?;
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows[row].get(col).map(String::as_str)
    }

    /// Rows whose code or label contains `text`, at most `max_rows`.
    pub fn search(&self, text: &str, max_rows: usize) -> Vec<&[String]> {
        self.rows
            .iter()
            .filter(|row| row.iter().take(2).any(|cell| cell.contains(text)))
            .take(max_rows)
            .map(Vec::as_slice)
            .collect()
    }
}

/// Snapshot of everything loaded at login. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    nci: HashMap<String, NciTable>,
    styles: StyleRegistry,
}

impl ReferenceData {
    pub fn new(tables: Vec<NciTable>, styles: StyleRegistry) -> Self {
        let nci = tables
            .into_iter()
            .map(|table| (table.name.clone(), table))
            .collect();
        Self { nci, styles }
    }

    pub fn nci(&self, name: &str) -> Option<&NciTable> {
        self.nci.get(name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.nci.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn style(&self, name: &str) -> Option<&Style> {
        self.styles.get(name)
    }

    pub fn styles(&self) -> &StyleRegistry {
        &self.styles
    }

    pub fn translate(&self, binding: &NciBinding, key: &str) -> Option<&str> {
        self.nci(&binding.table)?.lookup(key, &binding.column)
    }

    pub fn is_empty(&self) -> bool {
        self.nci.is_empty() && self.styles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stations() -> NciTable {
        NciTable::new(
            "stations",
            vec!["code".to_string(), "name".to_string()],
            vec![
                vec!["01".to_string(), "North Yard".to_string()],
                vec!["02".to_string(), "South Yard".to_string()],
                vec!["01".to_string(), "Duplicate".to_string()],
            ],
        )
    }

    #[test]
    fn test_lookup_by_first_column() {
        let table = stations();
        assert_eq!(table.columns(), ["CODE", "NAME"]);
        assert_eq!(table.lookup("01", "NAME"), Some("North Yard"));
        assert_eq!(table.lookup("03", "NAME"), None);
        assert_eq!(table.lookup("01", "MISSING"), None);
    }

    #[test]
    fn test_search_matches_code_or_label() {
        let table = stations();
        assert_eq!(table.search("Yard", 10).len(), 2);
        assert_eq!(table.search("02", 10).len(), 1);
        assert_eq!(table.search("Yard", 1).len(), 1);
    }

    #[test]
    fn test_translate_through_reference_data() {
        let data = ReferenceData::new(vec![stations()], StyleRegistry::new());
        let binding = NciBinding {
            table: "stations".to_string(),
            column: "NAME".to_string(),
        };
        assert_eq!(data.translate(&binding, "02"), Some("South Yard"));
        assert_eq!(data.translate(&binding, "99"), None);
        assert_eq!(data.table_names(), vec!["stations"]);
    }

    #[test]
    fn test_rgba_from_hex_uses_last_six_digits() {
        let color = Rgba::from_hex("#FF8000", 1.0).unwrap();
        assert_eq!((color.r, color.g, color.b), (255, 128, 0));

        let color = Rgba::from_hex("0x80102030", 0.5).unwrap();
        assert_eq!((color.r, color.g, color.b), (0x10, 0x20, 0x30));
        assert_eq!(color.alpha, 0.5);

        assert!(Rgba::from_hex("#FFF", 1.0).is_none());
        assert!(Rgba::from_hex("zzzzzz", 1.0).is_none());
    }

    #[test]
    fn test_style_background_is_half_transparent() {
        let style = Style {
            text_color: "#000000".to_string(),
            background_color: "#FF0000".to_string(),
        };
        let cell = style.cell_style();
        assert_eq!(cell.background.map(|c| c.alpha), Some(BACKGROUND_ALPHA));
        assert_eq!(cell.foreground.map(|c| c.alpha), Some(1.0));
        assert!(!cell.is_default());
    }

    #[test]
    fn test_style_registry_deserializes() {
        let json = r##"{"warn": {"text_color": "#000000", "background_color": "#FFFF00"}}"##;
        let styles: StyleRegistry = serde_json::from_str(json).unwrap();
        let data = ReferenceData::new(Vec::new(), styles);
        assert!(data.style("warn").is_some());
        assert!(data.style("other").is_none());
    }
}
