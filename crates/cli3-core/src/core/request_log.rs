//! Session activity as a list of entries, one per request plus login/logout lines.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::events::SessionEvent;
use crate::error::codes;
use crate::utils::text::format_bytes;

#[derive(Debug, Clone, PartialEq)]
pub enum EntryStatus {
    Pending,
    Succeeded { bytes: usize },
    Failed { code: i32, message: String },
    Info { code: i32, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: Option<Uuid>,
    pub title: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub done_at: Option<DateTime<Utc>>,
    pub status: EntryStatus,
}

impl LogEntry {
    pub fn is_error(&self) -> bool {
        match &self.status {
            EntryStatus::Failed { .. } => true,
            EntryStatus::Info { code, .. } => *code != codes::SUCCESS,
            _ => false,
        }
    }

    /// Status column text.
    pub fn summary(&self) -> String {
        match &self.status {
            EntryStatus::Pending => "sent".to_string(),
            EntryStatus::Succeeded { bytes } => format!("{} received", format_bytes(*bytes)),
            EntryStatus::Failed { code, message } => format!("error {}: {}", code, message),
            EntryStatus::Info { message, .. } => message.clone(),
        }
    }
}

/// Running log of session events. A re-sent request reuses its entry.
#[derive(Debug, Default)]
pub struct RequestLog {
    entries: Vec<LogEntry>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, id: Uuid) -> Option<&LogEntry> {
        self.entries.iter().find(|e| e.id == Some(id))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn apply(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::LoggedIn { code, message } => self.info("Login", *code, message),
            SessionEvent::LoggedOut { code, message } => self.info("Logout", *code, message),
            SessionEvent::RequestSent(request) => {
                let entry = LogEntry {
                    id: Some(request.id()),
                    title: request.title(),
                    sent_at: request.sent_at(),
                    done_at: None,
                    status: EntryStatus::Pending,
                };
                match self.entries.iter_mut().find(|e| e.id == entry.id) {
                    Some(existing) => *existing = entry,
                    None => self.entries.push(entry),
                }
            }
            SessionEvent::RequestDone(request) => {
                let Some(entry) = self.entries.iter_mut().find(|e| e.id == Some(request.id()))
                else {
                    return;
                };
                entry.done_at = request.done_at();
                entry.status = match (request.answer(), request.error()) {
                    (Some(answer), _) => EntryStatus::Succeeded {
                        bytes: answer.len(),
                    },
                    (None, Some((code, message))) => EntryStatus::Failed {
                        code,
                        message: message.to_string(),
                    },
                    (None, None) => EntryStatus::Pending,
                };
            }
            SessionEvent::AnswerReceived(_) | SessionEvent::AnswerError(_) => {}
        }
    }

    fn info(&mut self, title: &str, code: i32, message: &str) {
        self.entries.push(LogEntry {
            id: None,
            title: title.to_string(),
            sent_at: Some(Utc::now()),
            done_at: None,
            status: EntryStatus::Info {
                code,
                message: message.to_string(),
            },
        });
    }
}
