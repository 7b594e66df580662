use crate::api::models::{Folder, FolderTree, Query};
use crate::core::reference::{CellStyle, NciTable, Rgba};
use crate::core::request_log::RequestLog;
use crate::core::table::{SeriesModel, TableModel};
use crate::core::window::{DocumentContent, DocumentWindow};
use crate::utils::text::truncate_text;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};
use crossterm::terminal;

const CELL_MAX_WIDTH: usize = 100;
const CHECKED: &str = "[x]";
const UNCHECKED: &str = "[ ]";

/// Terminal rendering of documents, folder trees and reference tables.
pub struct TableDisplay {
    max_width: Option<usize>,
    use_colors: bool,
}

impl TableDisplay {
    pub fn new() -> Self {
        Self {
            max_width: Self::detect_terminal_width(),
            use_colors: true,
        }
    }

    fn detect_terminal_width() -> Option<usize> {
        match terminal::size() {
            Ok((cols, _)) => Some((cols as usize).clamp(40, 240)),
            Err(_) => Some(80),
        }
    }

    pub fn with_max_width(mut self, width: usize) -> Self {
        self.max_width = Some(width);
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn new_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        let width = self.max_width.map(|w| w.saturating_sub(2).max(40)).unwrap_or(80);
        table.set_width(width as u16);
        table
    }

    fn header_cell(&self, text: &str) -> Cell {
        let cell = Cell::new(text).add_attribute(Attribute::Bold);
        if self.use_colors {
            cell.fg(Color::Cyan)
        } else {
            cell
        }
    }

    fn dim_cell(&self, text: &str) -> Cell {
        if self.use_colors {
            Cell::new(text).fg(Color::DarkGrey)
        } else {
            Cell::new(text)
        }
    }

    fn styled_cell(&self, text: &str, style: CellStyle) -> Cell {
        let mut cell = Cell::new(text);
        if !self.use_colors {
            return cell;
        }
        if let Some(fg) = style.foreground {
            cell = cell.fg(terminal_color(fg));
        }
        if let Some(bg) = style.background {
            cell = cell.bg(terminal_color(bg));
        }
        cell
    }

    /// Current view of a table: row numbers, typed values, styles and check boxes.
    pub fn render_table(&self, model: &TableModel, limit: Option<usize>) -> String {
        if model.row_count() == 0 {
            return "Query returned no rows.".to_string();
        }

        let mut table = self.new_table();
        let mut headers = vec![self.header_cell("#")];
        headers.extend(
            (0..model.column_count())
                .filter_map(|col| model.header(col))
                .map(|title| self.header_cell(&title)),
        );
        table.set_header(headers);

        let total = model.row_count();
        let shown = limit.unwrap_or(total).min(total);
        for row in 0..shown {
            let mut cells = vec![self.dim_cell(&model.row_header(row).unwrap_or_default())];
            for col in 0..model.column_count() {
                let text = match model.cell_checked(row, col) {
                    Some(true) => CHECKED.to_string(),
                    Some(false) => UNCHECKED.to_string(),
                    None => truncate_text(&model.display_string(row, col), CELL_MAX_WIDTH),
                };
                cells.push(self.styled_cell(&text, model.cell_style(row, col)));
            }
            table.add_row(cells);
        }

        let mut output = table.to_string();
        if shown != total {
            output.push_str(&format!("\nShowing {} of {} rows", shown, total));
        }
        if !model.filters().is_empty() {
            let filters: Vec<String> = model
                .filters()
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            output.push_str(&format!("\nFiltered by {}", filters.join(", ")));
        }
        output
    }

    pub fn render_series(&self, model: &SeriesModel) -> String {
        if model.page_count() == 0 {
            return "Query returned no rows.".to_string();
        }
        model
            .pages()
            .iter()
            .map(|page| {
                let mut table = self.new_table();
                table.set_header(vec![self.header_cell(&page.caption)]);
                for (title, value) in &page.entries {
                    table.add_row(vec![self.dim_cell(title), Cell::new(value)]);
                }
                table.to_string()
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn render_document(&self, window: &DocumentWindow, limit: Option<usize>) -> String {
        let body = match window.content() {
            DocumentContent::Empty => "(empty)".to_string(),
            DocumentContent::Table(model) => self.render_table(model, limit),
            DocumentContent::Series(model) => self.render_series(model),
            DocumentContent::Text(text) => text.clone(),
        };
        format!("{}\n{}\n{}", window.title(), "─".repeat(self.rule_width()), body)
    }

    fn rule_width(&self) -> usize {
        self.max_width.unwrap_or(80).min(80)
    }

    /// Indented folder tree with query ids.
    pub fn render_tree(&self, tree: &FolderTree) -> String {
        fn walk(folder: &Folder, depth: usize, out: &mut Vec<String>) {
            let indent = "  ".repeat(depth);
            out.push(format!("{}{}/", indent, folder.name));
            for child in &folder.folders {
                walk(child, depth + 1, out);
            }
            for query in &folder.queries {
                out.push(format!("{}  [{}] {}", indent, query.id, query.name));
            }
        }

        let mut lines = Vec::new();
        for folder in &tree.folders {
            walk(folder, 0, &mut lines);
        }
        if lines.is_empty() {
            "No folders.".to_string()
        } else {
            lines.join("\n")
        }
    }

    /// Query definition: kind, input params and sub-queries.
    pub fn render_query(&self, query: &Query) -> String {
        let mut output = format!(
            "Query #{}: {} ({})\n",
            query.id,
            query.name,
            String::from(query.kind)
        );

        if query.has_in_params() {
            let mut table = self.new_table();
            table.set_header(
                ["Name", "Title", "Type", "Value", "Input"]
                    .iter()
                    .map(|h| self.header_cell(h))
                    .collect::<Vec<_>>(),
            );
            for param in query.in_params() {
                let input = param
                    .field
                    .as_ref()
                    .map(|field| match field.nci_binding() {
                        Some(binding) => format!(
                            "{} -> {}.{}",
                            field.field_type, binding.table, binding.column
                        ),
                        None => field.field_type.clone(),
                    })
                    .unwrap_or_default();
                table.add_row(vec![
                    Cell::new(&param.name),
                    Cell::new(param.title()),
                    self.dim_cell(&String::from(param.param_type.clone())),
                    Cell::new(&param.value),
                    self.dim_cell(&input),
                ]);
            }
            output.push_str(&table.to_string());
            output.push('\n');
        } else {
            output.push_str("No input parameters.\n");
        }

        if query.has_subqueries() {
            output.push_str("Drill-down:\n");
            for sub in &query.subqueries {
                output.push_str(&format!("  -> [{}] {}\n", sub.id, sub.name));
            }
        }
        output
    }

    pub fn render_nci(&self, table: &NciTable, rows: &[&[String]]) -> String {
        let mut out = self.new_table();
        out.set_header(
            table
                .columns()
                .iter()
                .map(|c| self.header_cell(c))
                .collect::<Vec<_>>(),
        );
        for row in rows {
            out.add_row(row.iter().map(Cell::new).collect::<Vec<_>>());
        }
        format!("{}\n{} of {} rows", out, rows.len(), table.len())
    }

    pub fn render_log(&self, log: &RequestLog) -> String {
        let mut table = self.new_table();
        table.set_header(
            ["Sent", "Done", "Request", "Status"]
                .iter()
                .map(|h| self.header_cell(h))
                .collect::<Vec<_>>(),
        );
        let time = |t: Option<chrono::DateTime<chrono::Utc>>| {
            t.map(|t| t.format("%H:%M:%S").to_string()).unwrap_or_default()
        };
        for entry in log.entries() {
            let status = if entry.is_error() && self.use_colors {
                Cell::new(entry.summary()).fg(Color::Red)
            } else {
                Cell::new(entry.summary())
            };
            table.add_row(vec![
                self.dim_cell(&time(entry.sent_at)),
                self.dim_cell(&time(entry.done_at)),
                Cell::new(&entry.title),
                status,
            ]);
        }
        table.to_string()
    }

    /// Render a simple table with custom headers and rows
    pub fn render_simple_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut table = self.new_table();
        table.set_header(headers.iter().map(|h| self.header_cell(h)).collect::<Vec<_>>());
        for row in rows {
            table.add_row(row.iter().map(Cell::new).collect::<Vec<_>>());
        }
        table.to_string()
    }
}

impl Default for TableDisplay {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminals have no alpha channel; translucent colors are blended over white.
fn terminal_color(color: Rgba) -> Color {
    let blend = |channel: u8| {
        let alpha = color.alpha.clamp(0.0, 1.0);
        (f32::from(channel) * alpha + 255.0 * (1.0 - alpha)).round() as u8
    };
    Color::Rgb {
        r: blend(color.r),
        g: blend(color.g),
        b: blend(color.b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reference::{ReferenceData, Style};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn display() -> TableDisplay {
        TableDisplay::new().with_colors(false).with_max_width(120)
    }

    fn model() -> TableModel {
        let columns = serde_json::from_value(json!([
            {"name": "name", "title": "Name", "visable": true},
            {"name": "active", "title": "Active", "type": "BOOL", "visable": true},
            {"name": "style", "type": "STRING"}
        ]))
        .unwrap();
        let data = vec![
            vec![json!("Alpha"), json!("TRUE"), json!("hot")],
            vec![json!("Beta"), json!("false"), json!(null)],
        ];
        let mut styles = HashMap::new();
        styles.insert(
            "hot".to_string(),
            Style {
                text_color: "#FF0000".to_string(),
                background_color: "#000000".to_string(),
            },
        );
        TableModel::new(columns, &data, Arc::new(ReferenceData::new(Vec::new(), styles))).unwrap()
    }

    #[test]
    fn test_render_table() {
        let output = display().render_table(&model(), None);
        assert!(output.contains("Name"));
        assert!(output.contains("Alpha"));
        assert!(output.contains(CHECKED));
        assert!(output.contains(UNCHECKED));
        assert!(!output.contains("hot"));
        assert!(!output.contains("Showing"));
    }

    #[test]
    fn test_render_table_with_limit() {
        let output = display().render_table(&model(), Some(1));
        assert!(output.contains("Showing 1 of 2 rows"));
        assert!(!output.contains("Beta"));
    }

    #[test]
    fn test_terminal_color_blends_alpha() {
        let black = Rgba {
            r: 0,
            g: 0,
            b: 0,
            alpha: 0.5,
        };
        assert_eq!(
            terminal_color(black),
            Color::Rgb {
                r: 128,
                g: 128,
                b: 128
            }
        );
    }

    #[test]
    fn test_render_tree() {
        let tree = FolderTree::from_json(
            r#"{"folders": [{"name": "Sales", "folders": [{"name": "Daily", "queries": [{"id": 3, "name": "Today"}]}],
                             "queries": [{"id": 1, "name": "Totals"}]}]}"#,
        )
        .unwrap();
        let output = display().render_tree(&tree);
        assert_eq!(output, "Sales/\n  Daily/\n    [3] Today\n  [1] Totals");
    }

    #[test]
    fn test_render_log() {
        use crate::core::events::SessionEvent;

        let mut log = RequestLog::new();
        log.apply(&SessionEvent::LoggedIn {
            code: 401,
            message: "Wrong password".to_string(),
        });
        let output = display().render_log(&log);
        assert!(output.contains("Status"));
        assert!(output.contains("Wrong password"));
    }

    #[test]
    fn test_render_query_lists_in_params_only() {
        let query = Query::from_json(
            r#"{"id": 4, "name": "Stock", "type": "SERIES",
                "params": [{"name": "WH", "title": "Warehouse", "type": "STRING", "value": "A1", "input": null},
                           {"name": "RC", "type": "CURSOR", "value": null, "input": null}]}"#,
        )
        .unwrap();
        let output = display().render_query(&query);
        assert!(output.starts_with("Query #4: Stock (SERIES)"));
        assert!(output.contains("Warehouse"));
        assert!(!output.contains("RC"));
        assert!(!output.contains("Drill-down"));
    }

    #[test]
    fn test_render_query_lists_subqueries() {
        let query = Query::from_json(
            r#"{"id": 5, "name": "Orders", "subqueries": [{"id": 6, "name": "Order lines"}]}"#,
        )
        .unwrap();
        let output = display().render_query(&query);
        assert!(output.contains("No input parameters."));
        assert!(output.contains("Drill-down:\n  -> [6] Order lines"));
    }
}
