//! # cli3-core
//!
//! Core library for the cli3 reporting service client.
//!
//! The service serves a folder tree of parameterized queries. A [`Session`]
//! logs in, loads the reference tables used to translate coded values, and
//! executes queries asynchronously; completed requests become document
//! windows holding a typed, filterable and sortable result model.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cli3_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> cli3_core::Result<()> {
//!     let config = Config::load(None)?;
//!     let session = Arc::new(Session::from_config(&config)?);
//!     let mut workspace = Workspace::new(Arc::clone(&session));
//!
//!     session.login("user", "secret").await?;
//!     let query = session.fetch_query("42").await?;
//!     let request = session.send_query(query, &ParamValues::new());
//!
//!     workspace.wait_for(request.id()).await;
//!     if let Some(window) = workspace.active() {
//!         println!("{}", TableDisplay::new().render_document(window, None));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │           API Layer                 │  HTTP client, query/column/folder models
//! ├─────────────────────────────────────┤
//! │          Core Layer                 │  Session, requests, table models, windows
//! ├─────────────────────────────────────┤
//! │        Storage Layer                │  Configuration, reference cache, documents
//! ├─────────────────────────────────────┤
//! │         Utils Layer                 │  Validation, text helpers, error conversion
//! └─────────────────────────────────────┘
//! ```

pub use error::AppError;

/// Commonly used types in one import.
///
/// ```rust,ignore
/// use cli3_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::Result;
    pub use crate::error::AppError;

    pub use crate::api::client::ApiClient;
    pub use crate::api::models::{FolderTree, ParamValues, Query, QueryKind};

    pub use crate::core::events::SessionEvent;
    pub use crate::core::request::Request;
    pub use crate::core::session::Session;
    pub use crate::core::table::{CellValue, SortOrder, TableModel};
    pub use crate::core::window::{ActionState, Capabilities, DocumentWindow};
    pub use crate::core::workspace::{Workspace, WorkspaceChange};

    pub use crate::storage::config::Config;

    pub use crate::display::TableDisplay;
}

/// Session and request lifecycle, result models and document windows.
pub mod core;

/// Configuration file, reference-table cache and saved documents.
pub mod storage;

/// Validation, text formatting and error conversion helpers.
pub mod utils;

/// HTTP client and the server's JSON shapes.
pub mod api;

/// Terminal tables and export formats.
pub mod display;

/// Error hierarchy with severity levels and troubleshooting hints.
pub mod error;

/// Result type alias using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
