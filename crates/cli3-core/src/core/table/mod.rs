//! Typed result tables: the immutable source, the table view and the series view.

pub mod model;
pub mod series;
pub mod source;
pub mod value;

pub use model::{Records, TableModel};
pub use series::{SeriesModel, SeriesPage};
pub use source::SourceTable;
pub use value::CellValue;

/// Sort order for a table view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Source order
    #[default]
    None,
    /// Ascending order (A-Z, 0-9)
    Ascending,
    /// Descending order (Z-A, 9-0)
    Descending,
}

impl SortOrder {
    /// Header click cycle: None -> Ascending -> Descending -> None.
    pub fn next(self) -> Self {
        match self {
            SortOrder::None => SortOrder::Ascending,
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::None,
        }
    }
}
