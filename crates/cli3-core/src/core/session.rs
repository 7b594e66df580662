//! Authenticated connection to one server and schema.
//!
//! The session owns the HTTP client (and its cookie jar), the reference data
//! loaded at login and the registry of in-flight requests. Query execution
//! is asynchronous: `send_query` returns at once and the outcome arrives as
//! [`SessionEvent`]s on every subscriber's channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use super::events::{EventBus, SessionEvent};
use super::reference::{NciTable, ReferenceData};
use super::request::Request;
use crate::api::client::{ApiClient, endpoints};
use crate::api::models::{FolderTree, ParamValues, Query};
use crate::error::{ApiError, AppError, AuthError, codes};
use crate::storage::config::Config;
use crate::storage::nci_store::NciStore;
use crate::utils::error_helpers::convert_json_error;

const LOGIN_OK: &str = "Success";

struct Pending {
    request: Request,
    dispatch: u64,
}

#[derive(Default)]
struct Registry {
    pending: HashMap<Uuid, Pending>,
    next_dispatch: u64,
}

pub struct Session {
    client: ApiClient,
    nci_store: Option<NciStore>,
    registry: Mutex<Registry>,
    events: EventBus<SessionEvent>,
    reference: RwLock<Arc<ReferenceData>>,
    logged_in: AtomicBool,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.client.base_url)
            .field("logged_in", &self.is_logged_in())
            .finish_non_exhaustive()
    }
}

/// Message shown to the user for a failed call.
fn failure_message(error: &ApiError) -> String {
    match error {
        ApiError::Unauthorized { server_message, .. } if !server_message.trim().is_empty() => {
            server_message.clone()
        }
        other => other.to_string(),
    }
}

impl Session {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            nci_store: None,
            registry: Mutex::new(Registry::default()),
            events: EventBus::new(),
            reference: RwLock::new(Arc::new(ReferenceData::default())),
            logged_in: AtomicBool::new(false),
        }
    }

    /// Session for the configured server, with the reference cache in the configured directory.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let client = ApiClient::with_timeout(config.base_url(), config.timeout_seconds)?;
        let session = Self::new(client);
        Ok(match config.resolve_cache_dir() {
            Ok(dir) => session.with_nci_store(NciStore::new(dir)),
            Err(e) => {
                log::warn!("Reference cache disabled: {}", e);
                session
            }
        })
    }

    pub fn with_nci_store(mut self, store: NciStore) -> Self {
        self.nci_store = Some(store);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.client.base_url
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> UnboundedReceiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Shared snapshot of the reference data loaded at login.
    pub fn reference(&self) -> Arc<ReferenceData> {
        let guard = self.reference.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn set_reference(&self, data: ReferenceData) {
        let mut guard = self.reference.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(data);
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the requests still waiting for an answer.
    pub fn outstanding(&self) -> Vec<Request> {
        self.registry()
            .pending
            .values()
            .map(|p| p.request.clone())
            .collect()
    }

    /// Sign in, then load reference tables and styles.
    ///
    /// Emits `LoggedIn` with code 0 on success. Any failure, including one
    /// while loading reference data, leaves the caches empty.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AppError> {
        self.logged_in.store(false, Ordering::SeqCst);
        self.set_reference(ReferenceData::default());

        let outcome = match self.client.signin(username, password).await {
            Ok(()) => self.load_reference().await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(data) => {
                self.set_reference(data);
                self.logged_in.store(true, Ordering::SeqCst);
                log::info!("Logged in to {} as {}", self.client.base_url, username);
                self.events.emit(SessionEvent::LoggedIn {
                    code: codes::SUCCESS,
                    message: LOGIN_OK.to_string(),
                });
                Ok(())
            }
            Err(e) => {
                let (code, message) = (e.code(), failure_message(&e));
                log::info!("Login to {} failed: {}", self.client.base_url, message);
                self.events.emit(SessionEvent::LoggedIn {
                    code,
                    message: message.clone(),
                });
                Err(AuthError::LoginFailed { code, message }.into())
            }
        }
    }

    /// Best-effort sign out. The reference caches are cleared either way.
    pub async fn logout(&self) -> Result<(), AppError> {
        let result = self.client.signout().await;
        self.logged_in.store(false, Ordering::SeqCst);
        self.set_reference(ReferenceData::default());

        let (code, message) = match &result {
            Ok(()) => (codes::SUCCESS, "Logged out".to_string()),
            Err(e) => {
                log::warn!("Sign out failed: {}", e);
                (e.code(), failure_message(e))
            }
        };
        self.events.emit(SessionEvent::LoggedOut { code, message });
        result.map_err(AppError::from)
    }

    async fn load_reference(&self) -> Result<ReferenceData, ApiError> {
        let descriptors = self.client.nci_list().await?;
        let mut tables = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            if let Some(table) = self.cached_table(&descriptor.name) {
                tables.push(table);
                continue;
            }

            let payload = self.client.nci_table(&descriptor.name).await?;
            let table = NciTable::from_payload(&descriptor.name, payload);
            if let Some(store) = &self.nci_store {
                if let Err(e) = store.save(&table) {
                    log::warn!("Could not cache reference table '{}': {}", table.name(), e);
                }
            }
            tables.push(table);
        }

        let styles = self.client.styles().await?;
        log::debug!(
            "Loaded {} reference tables and {} styles",
            tables.len(),
            styles.len()
        );
        Ok(ReferenceData::new(tables, styles))
    }

    fn cached_table(&self, name: &str) -> Option<NciTable> {
        let store = self.nci_store.as_ref()?;
        match store.load(name) {
            Ok(table) => table,
            Err(e) => {
                log::warn!("Ignoring cached reference table '{}': {}", name, e);
                None
            }
        }
    }

    /// Synchronous fetch of a non-query resource, awaited in place.
    /// Failures carry the wire `(code, message)` through [`ApiError::code`].
    pub async fn get(&self, path: &str) -> Result<String, ApiError> {
        self.client.get_text(path).await
    }

    async fn get_parsed<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.get(path).await?;
        serde_json::from_str(&body).map_err(|e| convert_json_error(e, path))
    }

    pub async fn fetch_tree(&self) -> Result<FolderTree, ApiError> {
        self.get_parsed(endpoints::TREE).await
    }

    /// Current definition of a query.
    pub async fn fetch_query(&self, id: &str) -> Result<Query, ApiError> {
        self.get_parsed(&endpoints::query(id)).await
    }

    /// Execute `query` as a new request. Returns immediately; the answer
    /// arrives as events.
    pub fn send_query(self: &Arc<Self>, query: Query, params: &ParamValues) -> Request {
        self.dispatch(Request::new(query, params))
    }

    /// Re-issue an existing request under the same id.
    pub fn send_request(self: &Arc<Self>, request: Request) -> Request {
        self.dispatch(request)
    }

    fn dispatch(self: &Arc<Self>, mut request: Request) -> Request {
        let mut registry = self.registry();
        request.mark_sent();
        registry.next_dispatch += 1;
        let dispatch = registry.next_dispatch;
        registry.pending.insert(
            request.id(),
            Pending {
                request: request.clone(),
                dispatch,
            },
        );
        log::debug!("Request {} sent: {}", request.id(), request.query_string());
        self.events.emit(SessionEvent::RequestSent(request.clone()));

        let session = Arc::clone(self);
        let in_flight = request.clone();
        tokio::spawn(async move {
            session.execute(in_flight, dispatch).await;
        });
        request
    }

    async fn execute(&self, request: Request, dispatch: u64) {
        let path = endpoints::request(&request.query_string());
        let (code, answer) = match self.client.get_text(&path).await {
            Ok(body) => (codes::SUCCESS, body),
            Err(e) => (e.code(), failure_message(&e)),
        };
        self.complete(request, dispatch, code, answer);
    }

    fn complete(&self, mut request: Request, dispatch: u64, code: i32, answer: String) {
        let mut registry = self.registry();
        let current = registry
            .pending
            .get(&request.id())
            .is_some_and(|p| p.dispatch == dispatch);
        if !current {
            log::debug!("Request {} superseded, dropping stale answer", request.id());
            return;
        }

        request.complete(code, answer);
        log::debug!("Request {} done with code {}", request.id(), code);
        self.events.emit(SessionEvent::RequestDone(request.clone()));
        let id = request.id();
        if code == codes::SUCCESS {
            self.events.emit(SessionEvent::AnswerReceived(request));
        } else {
            self.events.emit(SessionEvent::AnswerError(request));
        }
        registry.pending.remove(&id);
    }
}
