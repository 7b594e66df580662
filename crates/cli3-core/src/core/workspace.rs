//! The set of open document windows, driven by session events.
//!
//! Answers for a request owned by refreshing windows go back to every one of
//! them. An answer for a request the workspace has never shown opens a new
//! window of the query's kind; replays of a request whose windows are gone
//! have no observer and are dropped.

use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use super::events::SessionEvent;
use super::request_log::RequestLog;
use super::session::Session;
use super::window::{ActionState, DocumentWindow, WindowState};
use crate::error::{AppError, WindowError};

/// What a session event did to the workspace.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkspaceChange {
    /// Only the log changed.
    Logged,
    Opened { index: usize, id: Uuid },
    Refreshed { index: usize, id: Uuid },
    RefreshFailed { index: usize, id: Uuid, message: String },
    /// A new answer arrived but no window could be built from it.
    OpenFailed { id: Uuid, message: String },
    RequestFailed { id: Uuid, code: i32, message: String },
    /// An answer for a request whose windows were closed.
    Dropped { id: Uuid },
}

impl WorkspaceChange {
    pub fn request_id(&self) -> Option<Uuid> {
        match self {
            WorkspaceChange::Logged => None,
            WorkspaceChange::Opened { id, .. }
            | WorkspaceChange::Refreshed { id, .. }
            | WorkspaceChange::RefreshFailed { id, .. }
            | WorkspaceChange::OpenFailed { id, .. }
            | WorkspaceChange::RequestFailed { id, .. }
            | WorkspaceChange::Dropped { id } => Some(*id),
        }
    }
}

pub struct Workspace {
    session: Arc<Session>,
    events: UnboundedReceiver<SessionEvent>,
    windows: Vec<DocumentWindow>,
    active: Option<usize>,
    log: RequestLog,
    /// Every request id a window was ever built for.
    shown: HashSet<Uuid>,
    pending: VecDeque<WorkspaceChange>,
}

impl Workspace {
    pub fn new(session: Arc<Session>) -> Self {
        let events = session.subscribe();
        Self {
            session,
            events,
            windows: Vec::new(),
            active: None,
            log: RequestLog::new(),
            shown: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn log(&self) -> &RequestLog {
        &self.log
    }

    pub fn windows(&self) -> &[DocumentWindow] {
        &self.windows
    }

    pub fn window(&self, index: usize) -> Option<&DocumentWindow> {
        self.windows.get(index)
    }

    pub fn window_mut(&mut self, index: usize) -> Option<&mut DocumentWindow> {
        self.windows.get_mut(index)
    }

    pub fn active(&self) -> Option<&DocumentWindow> {
        self.active.and_then(|i| self.windows.get(i))
    }

    pub fn active_mut(&mut self) -> Option<&mut DocumentWindow> {
        self.active.and_then(|i| self.windows.get_mut(i))
    }

    pub fn activate(&mut self, index: usize) -> bool {
        if index < self.windows.len() {
            self.active = Some(index);
            true
        } else {
            false
        }
    }

    pub fn action_state(&self, selected_col: Option<usize>) -> ActionState {
        ActionState::evaluate(self.active(), selected_col)
    }

    /// Closes and removes a window. A refresh still in flight for it is dropped on arrival.
    pub fn close(&mut self, index: usize) -> Option<DocumentWindow> {
        if index >= self.windows.len() {
            return None;
        }
        let mut window = self.windows.remove(index);
        window.close();
        self.active = match self.active {
            _ if self.windows.is_empty() => None,
            Some(active) if active > index => Some(active - 1),
            Some(active) if active == index => Some(index.min(self.windows.len() - 1)),
            other => other,
        };
        Some(window)
    }

    /// Opens a saved document as the active window.
    pub fn open_file(&mut self, path: &Path) -> Result<usize, AppError> {
        let window = DocumentWindow::load(path, Arc::clone(&self.session))?;
        Ok(self.push(window))
    }

    pub fn refresh_active(&mut self) -> Result<(), WindowError> {
        self.active_mut().ok_or(WindowError::Unbound)?.refresh()
    }

    fn push(&mut self, window: DocumentWindow) -> usize {
        if let Some(id) = window.request_id() {
            self.shown.insert(id);
        }
        self.windows.push(window);
        let index = self.windows.len() - 1;
        self.active = Some(index);
        index
    }

    fn refreshing_windows(&self, id: Uuid) -> Vec<usize> {
        self.windows
            .iter()
            .enumerate()
            .filter(|(_, w)| w.state() == WindowState::Refreshing && w.request_id() == Some(id))
            .map(|(index, _)| index)
            .collect()
    }

    /// Applies one session event to the log and the windows. An answer shared by
    /// several refreshing windows yields one change per window.
    pub fn apply(&mut self, event: &SessionEvent) -> Vec<WorkspaceChange> {
        self.log.apply(event);

        let (request, success) = match event {
            SessionEvent::AnswerReceived(r) => (r, true),
            SessionEvent::AnswerError(r) => (r, false),
            _ => return vec![WorkspaceChange::Logged],
        };
        let id = request.id();

        let owners = self.refreshing_windows(id);
        if !owners.is_empty() {
            return owners
                .into_iter()
                .map(|index| {
                    let window = &mut self.windows[index];
                    window.on_session_event(event);
                    match window.last_error() {
                        Some(error) => WorkspaceChange::RefreshFailed {
                            index,
                            id,
                            message: error.to_string(),
                        },
                        None => WorkspaceChange::Refreshed { index, id },
                    }
                })
                .collect();
        }

        if self.shown.contains(&id) {
            log::debug!("Dropping answer of request {}: no window is waiting", id);
            return vec![WorkspaceChange::Dropped { id }];
        }

        if !success {
            let (code, message) = request.error().unwrap_or((0, ""));
            return vec![WorkspaceChange::RequestFailed {
                id,
                code,
                message: message.to_string(),
            }];
        }

        let change = match DocumentWindow::open(request.clone(), Arc::clone(&self.session)) {
            Ok(window) => {
                let index = self.push(window);
                log::debug!("Opened window {} for request {}", index, id);
                WorkspaceChange::Opened { index, id }
            }
            Err(e) => {
                log::warn!("Cannot open answer of request {}: {}", id, e);
                WorkspaceChange::OpenFailed {
                    id,
                    message: e.to_string(),
                }
            }
        };
        vec![change]
    }

    /// Next change, waiting for a session event when none is queued.
    pub async fn next(&mut self) -> Option<WorkspaceChange> {
        while self.pending.is_empty() {
            let event = self.events.recv().await?;
            let changes = self.apply(&event);
            self.pending.extend(changes);
        }
        self.pending.pop_front()
    }

    /// Queued changes plus those of every event already received, without waiting.
    pub fn pump(&mut self) -> Vec<WorkspaceChange> {
        let mut changes: Vec<WorkspaceChange> = self.pending.drain(..).collect();
        while let Ok(event) = self.events.try_recv() {
            changes.extend(self.apply(&event));
        }
        changes
    }

    /// Waits until `id` has been answered and returns what that did.
    pub async fn wait_for(&mut self, id: Uuid) -> Option<WorkspaceChange> {
        while let Some(change) = self.next().await {
            if change.request_id() == Some(id) {
                return Some(change);
            }
        }
        None
    }
}
