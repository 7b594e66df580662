use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::models::{ParamValues, Query};
use crate::error::codes;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    /// `code` 0 is success; otherwise `answer` holds the failure message.
    Done { code: i32, answer: String },
}

/// One execution of a query, identified by a UUID.
///
/// The same request (same id) is re-sent on refresh; its status is reset
/// to pending on each dispatch and completed exactly once per dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    id: Uuid,
    query: Query,
    params: ParamValues,
    status: RequestStatus,
    #[serde(default)]
    sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    done_at: Option<DateTime<Utc>>,
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Request {}

impl Request {
    /// New request with a fresh id; `overrides` win over the stored param values.
    pub fn new(query: Query, overrides: &ParamValues) -> Self {
        let params = query.resolve_params(overrides);
        Self {
            id: Uuid::new_v4(),
            query,
            params,
            status: RequestStatus::Pending,
            sent_at: None,
            done_at: None,
        }
    }

    /// Rebuild a completed request, e.g. from a saved document.
    pub fn restore(id: Uuid, query: Query, params: ParamValues, code: i32, answer: String) -> Self {
        Self {
            id,
            query,
            params,
            status: RequestStatus::Done { code, answer },
            sent_at: None,
            done_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn params(&self) -> &ParamValues {
        &self.params
    }

    pub fn status(&self) -> &RequestStatus {
        &self.status
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn done_at(&self) -> Option<DateTime<Utc>> {
        self.done_at
    }

    /// `id=<id>&NAME=value...` for the request endpoint.
    pub fn query_string(&self) -> String {
        self.query.make_request(&self.params)
    }

    /// Query name with its in-param values.
    pub fn title(&self) -> String {
        self.query.full_name(&self.params)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }

    pub fn code(&self) -> Option<i32> {
        match &self.status {
            RequestStatus::Done { code, .. } => Some(*code),
            RequestStatus::Pending => None,
        }
    }

    /// Raw answer of a successful request.
    pub fn answer(&self) -> Option<&str> {
        match &self.status {
            RequestStatus::Done { code, answer } if *code == codes::SUCCESS => Some(answer),
            _ => None,
        }
    }

    /// `(code, message)` of a failed request.
    pub fn error(&self) -> Option<(i32, &str)> {
        match &self.status {
            RequestStatus::Done { code, answer } if *code != codes::SUCCESS => {
                Some((*code, answer.as_str()))
            }
            _ => None,
        }
    }

    pub(crate) fn mark_sent(&mut self) {
        self.status = RequestStatus::Pending;
        self.sent_at = Some(Utc::now());
        self.done_at = None;
    }

    pub(crate) fn complete(&mut self, code: i32, answer: String) {
        self.status = RequestStatus::Done { code, answer };
        self.done_at = Some(Utc::now());
    }
}
