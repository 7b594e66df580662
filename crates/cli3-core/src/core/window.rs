//! Document windows: one completed request rendered as a table, series or text.
//!
//! Lifecycle: `Unbound -> Bound -> Refreshing -> Bound`, or `Bound -> Closed`.
//! A refresh re-sends the same request and locks the window until the
//! session reports the outcome through [`DocumentWindow::on_session_event`].

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use super::events::{EventBus, SessionEvent};
use super::reference::ReferenceData;
use super::request::Request;
use super::session::Session;
use super::table::{CellValue, SeriesModel, SortOrder, SourceTable, TableModel};
use crate::api::models::{ParamValues, Query, QueryKind};
use crate::error::{AppError, ModelError, WindowError};
use crate::storage::documents::SavedDocument;
use crate::utils::error_helpers::convert_model_error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Filter,
    Print,
    Export,
    Refresh,
    Save,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Filter => "filter",
            Capability::Print => "print",
            Capability::Export => "export",
            Capability::Refresh => "refresh",
            Capability::Save => "save",
        }
    }
}

/// What a kind of document window can do.
pub trait Capabilities {
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl Capabilities for QueryKind {
    fn capabilities(&self) -> &'static [Capability] {
        match self {
            QueryKind::Table => &[
                Capability::Filter,
                Capability::Print,
                Capability::Export,
                Capability::Refresh,
                Capability::Save,
            ],
            QueryKind::Series | QueryKind::Text => &[Capability::Refresh, Capability::Save],
        }
    }
}

fn kind_name(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::Table => "table",
        QueryKind::Series => "series",
        QueryKind::Text => "text",
    }
}

/// Result attribute types a window kind accepts, in order of preference.
fn accepted_types(kind: QueryKind) -> &'static [&'static str] {
    match kind {
        QueryKind::Table => &["cursor", "table"],
        QueryKind::Series => &["series", "cursor"],
        QueryKind::Text => &["text"],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Unbound,
    Bound,
    Refreshing,
    Closed,
}

/// Notifications about one window, for whoever renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    /// Lock state changed; enabled actions must be re-evaluated.
    NeedsReevaluation { id: Uuid },
    Updated { id: Uuid },
    RefreshFailed { id: Uuid, error: WindowError },
    Closed { id: Uuid },
}

#[derive(Debug, Clone)]
pub enum DocumentContent {
    Empty,
    Table(TableModel),
    Series(SeriesModel),
    Text(String),
}

impl DocumentContent {
    /// Builds the content for `kind` from a raw answer payload.
    pub fn from_answer(
        kind: QueryKind,
        answer: &str,
        reference: Arc<ReferenceData>,
    ) -> Result<Self, ModelError> {
        let payload: serde_json::Map<String, Value> =
            serde_json::from_str(answer).map_err(|e| convert_model_error(e, "answer"))?;

        let (name, attribute) = accepted_types(kind)
            .iter()
            .find_map(|wanted| {
                payload.iter().find(|(_, value)| {
                    value
                        .get("type")
                        .and_then(Value::as_str)
                        .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
                })
            })
            .ok_or_else(|| ModelError::MissingAttribute {
                kind: accepted_types(kind).join("|"),
            })?;

        match kind {
            QueryKind::Table => Ok(DocumentContent::Table(TableModel::from_source(
                SourceTable::from_attribute(name, attribute)?,
                reference,
            ))),
            QueryKind::Series => Ok(DocumentContent::Series(SeriesModel::from_source(
                SourceTable::from_attribute(name, attribute)?,
                reference,
            ))),
            QueryKind::Text => {
                let data = attribute.get("data").ok_or_else(|| ModelError::MissingField {
                    attribute: name.clone(),
                    field: "data".to_string(),
                })?;
                Ok(DocumentContent::Text(match data {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                }))
            }
        }
    }
}

/// Where a drill-down query comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrillSource {
    Column,
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrillDownEntry {
    pub source: DrillSource,
    pub query: Query,
}

pub struct DocumentWindow {
    kind: QueryKind,
    session: Arc<Session>,
    request: Option<Request>,
    content: DocumentContent,
    title: String,
    state: WindowState,
    last_error: Option<WindowError>,
    sort: Option<(usize, SortOrder)>,
    notices: EventBus<WindowEvent>,
}

impl std::fmt::Debug for DocumentWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentWindow")
            .field("kind", &self.kind)
            .field("title", &self.title)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Capabilities for DocumentWindow {
    fn capabilities(&self) -> &'static [Capability] {
        self.kind.capabilities()
    }
}

impl DocumentWindow {
    pub fn new(kind: QueryKind, session: Arc<Session>) -> Self {
        Self {
            kind,
            session,
            request: None,
            content: DocumentContent::Empty,
            title: String::new(),
            state: WindowState::Unbound,
            last_error: None,
            sort: None,
            notices: EventBus::new(),
        }
    }

    /// Window for a completed request, with the kind its query declares.
    pub fn open(request: Request, session: Arc<Session>) -> Result<Self, AppError> {
        let mut window = Self::new(request.query().kind, session);
        window.set_request(request)?;
        Ok(window)
    }

    /// Reconstructs a saved window. Nothing is created when the file cannot be used.
    pub fn load(path: &Path, session: Arc<Session>) -> Result<Self, AppError> {
        let request = SavedDocument::read(path)?.into_request();
        Self::open(request, session)
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.state == WindowState::Refreshing
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn request_id(&self) -> Option<Uuid> {
        self.request.as_ref().map(Request::id)
    }

    pub fn content(&self) -> &DocumentContent {
        &self.content
    }

    pub fn table(&self) -> Option<&TableModel> {
        match &self.content {
            DocumentContent::Table(model) => Some(model),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&WindowError> {
        self.last_error.as_ref()
    }

    pub fn sort_state(&self) -> Option<(usize, SortOrder)> {
        self.sort
    }

    pub fn subscribe(&self) -> UnboundedReceiver<WindowEvent> {
        self.notices.subscribe()
    }

    /// Binds a completed request and rebuilds the content from its answer.
    /// On error the window keeps whatever it showed before.
    pub fn set_request(&mut self, request: Request) -> Result<(), AppError> {
        if self.state == WindowState::Closed {
            return Err(WindowError::Closed.into());
        }
        if let Some((code, message)) = request.error() {
            return Err(WindowError::RequestFailed {
                id: request.id().to_string(),
                code,
                message: message.to_string(),
            }
            .into());
        }
        let answer = request.answer().ok_or(WindowError::Unbound)?;
        let content = DocumentContent::from_answer(self.kind, answer, self.session.reference())?;

        self.title = request.title();
        self.content = content;
        self.request = Some(request);
        self.sort = None;
        self.last_error = None;
        self.state = WindowState::Bound;
        Ok(())
    }

    /// Re-sends the bound request and locks the window until it completes.
    pub fn refresh(&mut self) -> Result<(), WindowError> {
        match self.state {
            WindowState::Unbound => return Err(WindowError::Unbound),
            WindowState::Refreshing => return Err(WindowError::Locked),
            WindowState::Closed => return Err(WindowError::Closed),
            WindowState::Bound => {}
        }
        let request = self.request.clone().ok_or(WindowError::Unbound)?;
        let id = request.id();

        self.session.send_request(request);
        self.state = WindowState::Refreshing;
        log::debug!("Refreshing window '{}'", self.title);
        self.notices.emit(WindowEvent::NeedsReevaluation { id });
        Ok(())
    }

    /// Applies the outcome of a refresh. Returns true when the event was for this window.
    pub fn on_session_event(&mut self, event: &SessionEvent) -> bool {
        if self.state != WindowState::Refreshing {
            return false;
        }
        let Some(id) = self.request_id() else {
            return false;
        };
        let request = match event {
            SessionEvent::AnswerReceived(r) | SessionEvent::AnswerError(r) if r.id() == id => r,
            _ => return false,
        };

        self.state = WindowState::Bound;
        let outcome = match request.error() {
            Some((code, message)) => Err(WindowError::RequestFailed {
                id: id.to_string(),
                code,
                message: message.to_string(),
            }),
            None => self.set_request(request.clone()).map_err(|e| WindowError::RequestFailed {
                id: id.to_string(),
                code: crate::error::codes::BAD_PAYLOAD,
                message: e.to_string(),
            }),
        };

        match outcome {
            Ok(()) => self.notices.emit(WindowEvent::Updated { id }),
            Err(error) => {
                log::warn!("Refresh of '{}' failed: {}", self.title, error);
                self.last_error = Some(error.clone());
                self.notices.emit(WindowEvent::RefreshFailed { id, error });
            }
        }
        self.notices.emit(WindowEvent::NeedsReevaluation { id });
        true
    }

    pub fn close(&mut self) {
        if self.state == WindowState::Closed {
            return;
        }
        self.state = WindowState::Closed;
        if let Some(id) = self.request_id() {
            self.notices.emit(WindowEvent::Closed { id });
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let request = self.request.as_ref().ok_or(WindowError::Unbound)?;
        let document = SavedDocument::from_request(request).ok_or(WindowError::Unbound)?;
        document.write(path)?;
        log::info!("Saved '{}' to {}", self.title, path.display());
        Ok(())
    }

    fn require(&self, capability: Capability) -> Result<(), WindowError> {
        if self.state == WindowState::Closed {
            return Err(WindowError::Closed);
        }
        if !self.supports(capability) {
            return Err(WindowError::Unsupported {
                kind: kind_name(self.kind).to_string(),
                capability: capability.as_str().to_string(),
            });
        }
        Ok(())
    }

    fn table_mut(&mut self) -> Result<&mut TableModel, WindowError> {
        match &mut self.content {
            DocumentContent::Table(model) => Ok(model),
            _ => Err(WindowError::Unbound),
        }
    }

    fn reapply_sort(&mut self) {
        if let Some((col, order)) = self.sort {
            if let DocumentContent::Table(model) = &mut self.content {
                model.sort(col, order);
            }
        }
    }

    /// Sorts the table view; `SortOrder::None` restores source order.
    pub fn sort(&mut self, col: usize, order: SortOrder) -> Result<(), WindowError> {
        self.require(Capability::Filter)?;
        let model = self.table_mut()?;
        if col >= model.column_count() {
            return Ok(());
        }
        if order == SortOrder::None {
            model.unsort();
            self.sort = None;
        } else {
            model.sort(col, order);
            self.sort = Some((col, order));
        }
        Ok(())
    }

    /// Header click: ascending, then descending, then back to source order.
    pub fn header_clicked(&mut self, col: usize) -> Result<SortOrder, WindowError> {
        let order = match self.sort {
            Some((sorted, order)) if sorted == col => order.next(),
            _ => SortOrder::Ascending,
        };
        self.sort(col, order)?;
        Ok(order)
    }

    /// Filters the view to rows whose `col` equals `value`. The active sort is kept.
    pub fn set_filter(&mut self, col: usize, value: CellValue) -> Result<bool, WindowError> {
        self.require(Capability::Filter)?;
        let changed = self.table_mut()?.set_filter(col, value);
        self.reapply_sort();
        Ok(changed)
    }

    /// Filter toggle on the selected cell: filter by its value, or drop the
    /// column's filter when there is one. Returns whether the column is now filtered.
    pub fn toggle_filter(&mut self, row: usize, col: usize) -> Result<bool, WindowError> {
        self.require(Capability::Filter)?;
        let model = self.table_mut()?;
        let filtered = if model.has_filter(col) {
            model.reset_filter(col);
            false
        } else {
            match model.raw_value(row, col).cloned() {
                Some(value) => model.set_filter(col, value),
                None => false,
            }
        };
        self.reapply_sort();
        Ok(filtered)
    }

    /// Context entries for a cell: the column's sub-queries, then the query's.
    pub fn drill_down_entries(&self, col: usize) -> Vec<DrillDownEntry> {
        let mut entries = Vec::new();
        if let Some(column) = self.table().and_then(|m| m.column(col)) {
            entries.extend(column.subqueries.iter().map(|q| DrillDownEntry {
                source: DrillSource::Column,
                query: q.clone(),
            }));
        }
        if let Some(request) = &self.request {
            entries.extend(request.query().subqueries.iter().map(|q| DrillDownEntry {
                source: DrillSource::Query,
                query: q.clone(),
            }));
        }
        entries
    }

    /// Fetches the sub-query's current definition, binds its in-params from
    /// the row's source values and sends it. This window is not modified.
    pub async fn drill_down(&self, entry: &DrillDownEntry, row: usize) -> Result<Request, AppError> {
        let values = self
            .table()
            .and_then(|model| model.source_row_values(row))
            .ok_or(WindowError::Unbound)?;

        let mut query = self.session.fetch_query(&entry.query.id).await?;
        let names: Vec<String> = query.in_params().map(|p| p.name.clone()).collect();
        for name in names {
            if let Some(value) = values.get(&name.to_uppercase()) {
                query.set_param_value(&name, value.clone());
            }
        }

        log::debug!("Drill-down from '{}' into '{}'", self.title, query.name);
        Ok(self.session.send_query(query, &ParamValues::new()))
    }
}

/// Which window actions are enabled for the active window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionState {
    pub save: bool,
    pub filter_enabled: bool,
    pub filter_checked: bool,
    pub refresh: bool,
    pub print: bool,
    pub export: bool,
}

impl ActionState {
    pub fn evaluate(window: Option<&DocumentWindow>, selected_col: Option<usize>) -> Self {
        let Some(window) = window.filter(|w| w.state() != WindowState::Closed) else {
            return Self::default();
        };
        let bound = window.request().is_some();
        let filter = window.supports(Capability::Filter)
            && selected_col.is_some_and(|col| window.table().is_some_and(|m| col < m.column_count()));

        Self {
            save: bound && window.supports(Capability::Save),
            filter_enabled: filter,
            filter_checked: filter
                && selected_col
                    .zip(window.table())
                    .is_some_and(|(col, model)| model.has_filter(col)),
            refresh: bound && window.supports(Capability::Refresh) && !window.is_locked(),
            print: bound && window.supports(Capability::Print),
            export: bound && window.supports(Capability::Export),
        }
    }
}
