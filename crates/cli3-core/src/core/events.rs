//! Fan-out of lifecycle notifications over unbounded channels.

use std::sync::{Mutex, PoisonError};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::request::Request;

/// Notifications emitted by a [`Session`](super::session::Session).
///
/// For one dispatch of a request the order is always
/// `RequestSent`, `RequestDone`, then `AnswerReceived` or `AnswerError`.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    LoggedIn { code: i32, message: String },
    LoggedOut { code: i32, message: String },
    RequestSent(Request),
    RequestDone(Request),
    AnswerReceived(Request),
    AnswerError(Request),
}

impl SessionEvent {
    /// The request this event is about, if any.
    pub fn request(&self) -> Option<&Request> {
        match self {
            SessionEvent::RequestSent(r)
            | SessionEvent::RequestDone(r)
            | SessionEvent::AnswerReceived(r)
            | SessionEvent::AnswerError(r) => Some(r),
            SessionEvent::LoggedIn { .. } | SessionEvent::LoggedOut { .. } => None,
        }
    }
}

/// Broadcasts every emitted value to all live subscribers.
///
/// Sends never block; subscribers whose receiver was dropped are pruned on
/// the next emit.
#[derive(Debug)]
pub struct EventBus<T> {
    subscribers: Mutex<Vec<UnboundedSender<T>>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<T: Clone> EventBus<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn emit(&self, event: T) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
