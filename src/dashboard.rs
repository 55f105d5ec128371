//! Runtime that drives the shell: it performs [`Effect`]s against the API
//! client, the session store and the file system, and feeds their outcomes
//! back as [`Event`]s.

use chrono::{Local, Utc};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

use crate::client::{ApiClient, AuthEvent};
use crate::config::Config;
use crate::error::{ApiError, StoreError};
use crate::export::write_license_export;
use crate::session::{self, SessionState};
use crate::shell::{self, AppState, Effect, Event};
use crate::storage::SessionStore;

pub struct Dashboard {
    state: AppState,
    client: ApiClient,
    store: SessionStore,
    export_dir: PathBuf,
    auth_events: broadcast::Receiver<AuthEvent>,
    // Effects of the initial state, run by `resume`.
    pending: Vec<Effect>,
}

impl Dashboard {
    /// Restore the persisted session and build a client around it, without
    /// contacting the server.
    pub fn open(config: &Config, store: SessionStore) -> Result<Self, ApiError> {
        let restored = session::rehydrate(&store, Utc::now()).unwrap_or_else(|e| {
            warn!("Could not read the stored session: {}", e);
            SessionState::Anonymous
        });
        let client = ApiClient::new(config, restored.session().cloned())?;
        let auth_events = client.subscribe();
        let (state, pending) = AppState::new(restored, Local::now().date_naive());

        Ok(Self {
            state,
            client,
            store,
            export_dir: config.export_dir.clone(),
            auth_events,
            pending,
        })
    }

    /// [`Dashboard::open`], then populate the view.
    pub async fn start(config: &Config, store: SessionStore) -> Result<Self, ApiError> {
        let mut dashboard = Self::open(config, store)?;
        dashboard.resume().await;
        Ok(dashboard)
    }

    /// Run the effects of the initial state (customer list and first search
    /// when logged in). Does nothing on later calls.
    pub async fn resume(&mut self) {
        let effects = std::mem::take(&mut self.pending);
        self.run(VecDeque::new(), effects).await;
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn render(&self) -> String {
        shell::render(&self.state)
    }

    /// Apply one user event and everything it sets in motion.
    pub async fn dispatch(&mut self, event: Event) {
        let mut events = VecDeque::from([event]);
        let today = Local::now().date_naive();
        if today != self.state.today() {
            events.push_front(Event::DayStarted(today));
        }
        self.run(events, Vec::new()).await;
    }

    async fn run(&mut self, mut events: VecDeque<Event>, initial: Vec<Effect>) {
        let mut effects: VecDeque<Effect> = initial.into();
        loop {
            if let Some(effect) = effects.pop_front() {
                if let Some(event) = self.perform(effect).await {
                    events.push_back(event);
                }
                // A 401 is reported on the channel only, so each one turns
                // into exactly one event here.
                loop {
                    match self.auth_events.try_recv() {
                        Ok(AuthEvent::Unauthorized) | Err(TryRecvError::Lagged(_)) => {
                            // The session is gone; queued calls would only go
                            // out without a token.
                            effects.retain(|e| matches!(e, Effect::ClearSession));
                            events.push_back(Event::Unauthorized)
                        }
                        Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                    }
                }
                continue;
            }

            let Some(event) = events.pop_front() else {
                break;
            };
            let (state, next) = shell::update(self.state.clone(), event);
            self.state = state;
            effects.extend(next);
        }
    }

    async fn perform(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Login { username, password } => match self.client.login(&username, &password).await {
                Ok(session) => {
                    info!(username = %session.username, "Logged in");
                    self.client.set_session(Some(session.clone())).await;
                    Some(Event::LoginSucceeded(session))
                }
                Err(e) => Some(Event::LoginFailed(failure("Login", e)?)),
            },
            Effect::PersistSession(session) => {
                log_store_error(session::persist(&self.store, &session));
                None
            }
            Effect::ClearSession => {
                info!("Session cleared");
                self.client.set_session(None).await;
                log_store_error(session::forget(&self.store));
                None
            }
            Effect::LoadCustomers => match self.client.fetch_customers().await {
                Ok(customers) => Some(Event::CustomersLoaded(customers)),
                Err(e) => Some(Event::CustomersFailed(failure("Customer list", e)?)),
            },
            Effect::LoadProducts(customer) => match self.client.fetch_products(customer.as_deref()).await {
                Ok(products) => Some(Event::ProductsLoaded(products)),
                Err(e) => Some(Event::ProductsFailed(failure("Product list", e)?)),
            },
            Effect::Search(filters) => match self.client.fetch_license_details(&filters).await {
                Ok(page) => Some(Event::SearchSucceeded {
                    rows: page.rows,
                    total: page.total,
                }),
                Err(e) => Some(Event::SearchFailed(failure("Search", e)?)),
            },
            Effect::Ingest => match self.client.ingest_licenses().await {
                Ok(report) => {
                    info!(fetched = report.fetched, upserted = report.upserted, "Ingestion finished");
                    Some(Event::IngestSucceeded(report))
                }
                Err(e) => Some(Event::IngestFailed(failure("Ingestion", e)?)),
            },
            Effect::Export(filters) => {
                let rows = match self.client.fetch_license_details_for_export(&filters).await {
                    Ok(rows) => rows,
                    Err(e) => return Some(Event::ExportFailed(failure("Export", e)?)),
                };
                match write_license_export(&self.export_dir, &filters, &rows) {
                    Ok(path) => Some(Event::ExportSucceeded { path, rows: rows.len() }),
                    Err(e) => {
                        warn!("Export failed: {}", e);
                        Some(Event::ExportFailed(e.to_string()))
                    }
                }
            }
        }
    }
}

/// Message for a failed action, or `None` for a 401 (which the auth channel
/// reports instead).
fn failure(action: &str, err: ApiError) -> Option<String> {
    match err {
        ApiError::Unauthorized => None,
        err => {
            warn!("{} failed: {}", action, err);
            Some(err.to_string())
        }
    }
}

fn log_store_error(result: Result<(), StoreError>) {
    if let Err(e) = result {
        warn!("Session store: {}", e);
    }
}
