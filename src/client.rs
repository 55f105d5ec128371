//! HTTP client for the license API.
//!
//! The client owns an explicit [`Session`]; its token is attached as a
//! bearer header on every authenticated call. A 401 clears that session and
//! is announced once on the [`AuthEvent`] channel so the application shell
//! can drop back to the login view.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::{
    CustomersPayload, EnvelopeHeader, IngestPayload, IngestReport, LicenseFilters, LicensePage,
    LicensePayload, LicenseQuery, LicenseRow, LoginPayload, LoginRequest, ProductsPayload,
};
use crate::session::Session;

pub const LOGIN_PATH: &str = "/api/login";
pub const LICENSE_DETAILS_PATH: &str = "/api/license-details";
pub const INGEST_PATH: &str = "/ingest/licenses";
pub const CUSTOMERS_PATH: &str = "/api/customers";
pub const PRODUCTS_PATH: &str = "/api/products";

const LOGIN_FAILED: &str = "login failed";
const FETCH_LICENSES_FAILED: &str = "failed to fetch licenses";
const EXPORT_LICENSES_FAILED: &str = "failed to export licenses";
const INGEST_FAILED: &str = "failed to ingest licenses";
const FETCH_CUSTOMERS_FAILED: &str = "failed to fetch customers";
const FETCH_PRODUCTS_FAILED: &str = "failed to fetch products";

const AUTH_EVENT_CAPACITY: usize = 16;

/// Notifications published by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// The server rejected the current bearer token.
    Unauthorized,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: RwLock<Option<Session>>,
    auth_events: broadcast::Sender<AuthEvent>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Option<Session>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let (auth_events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Ok(Self {
            http: builder.build()?,
            base_url: config.api_base().to_string(),
            session: RwLock::new(session),
            auth_events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Subscribe to unauthorized notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.auth_events.subscribe()
    }

    /// Replace the active session (`None` to go anonymous).
    pub async fn set_session(&self, session: Option<Session>) {
        *self.session.write().await = session;
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Exchange credentials for a bearer token.
    ///
    /// The returned session is not installed; callers decide whether to
    /// keep it via [`ApiClient::set_session`].
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, ApiError> {
        debug!("Logging in as {}", username);
        let request = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest { username, password });
        let payload: LoginPayload = self.send(request, LOGIN_FAILED, false).await?;
        let token = payload
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::server(None, LOGIN_FAILED))?;
        Ok(Session::from_token(token, username)?)
    }

    /// One page of licenses matching `filters`.
    pub async fn fetch_license_details(&self, filters: &LicenseFilters) -> Result<LicensePage, ApiError> {
        let query = LicenseQuery::search(filters);
        debug!("Searching licenses: {:?}", query);
        let request = self.http.post(self.url(LICENSE_DETAILS_PATH)).json(&query);
        let payload: LicensePayload = self.send(request, FETCH_LICENSES_FAILED, true).await?;
        let rows = payload
            .license
            .ok_or_else(|| ApiError::server(None, FETCH_LICENSES_FAILED))?;
        let total = payload.total.unwrap_or(rows.len() as u64);
        Ok(LicensePage { rows, total })
    }

    /// Every license matching `filters`, unpaginated.
    pub async fn fetch_license_details_for_export(
        &self,
        filters: &LicenseFilters,
    ) -> Result<Vec<LicenseRow>, ApiError> {
        let query = LicenseQuery::export(filters);
        debug!("Fetching export set: {:?}", query);
        let request = self.http.post(self.url(LICENSE_DETAILS_PATH)).json(&query);
        let payload: LicensePayload = self.send(request, EXPORT_LICENSES_FAILED, true).await?;
        payload
            .license
            .ok_or_else(|| ApiError::server(None, EXPORT_LICENSES_FAILED))
    }

    /// Run the server-side fetch-and-upsert job and wait for its report.
    pub async fn ingest_licenses(&self) -> Result<IngestReport, ApiError> {
        debug!("Triggering ingestion");
        let request = self.http.get(self.url(INGEST_PATH));
        let payload: IngestPayload = self.send(request, INGEST_FAILED, true).await?;
        payload
            .report
            .ok_or_else(|| ApiError::server(None, INGEST_FAILED))
    }

    pub async fn fetch_customers(&self) -> Result<Vec<String>, ApiError> {
        let request = self.http.get(self.url(CUSTOMERS_PATH));
        let payload: CustomersPayload = self.send(request, FETCH_CUSTOMERS_FAILED, true).await?;
        let customers = payload
            .customers
            .ok_or_else(|| ApiError::server(None, FETCH_CUSTOMERS_FAILED))?;
        Ok(customers.into_iter().map(|c| c.customer_name).collect())
    }

    /// Products, optionally narrowed to one customer.
    pub async fn fetch_products(&self, customer: Option<&str>) -> Result<Vec<String>, ApiError> {
        let mut request = self.http.get(self.url(PRODUCTS_PATH));
        if let Some(customer) = customer.filter(|c| !c.is_empty()) {
            request = request.query(&[("customer_name", customer)]);
        }
        let payload: ProductsPayload = self.send(request, FETCH_PRODUCTS_FAILED, true).await?;
        let products = payload
            .products
            .ok_or_else(|| ApiError::server(None, FETCH_PRODUCTS_FAILED))?;
        Ok(products.into_iter().map(|p| p.product_title).collect())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, check the `{ok, error?}` envelope and parse the payload.
    ///
    /// On authenticated calls a 401 drops the session and publishes a
    /// single [`AuthEvent::Unauthorized`].
    async fn send<T>(&self, request: RequestBuilder, fallback: &str, authenticated: bool) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let request = match (authenticated, self.session.read().await.as_ref()) {
            (true, Some(session)) => request.bearer_auth(&session.token),
            _ => request,
        };

        let response = request.send().await?;
        let status = response.status();

        if authenticated && status == StatusCode::UNAUTHORIZED {
            warn!("Request rejected as unauthorized, dropping session");
            self.session.write().await.take();
            // No subscribers is fine: nobody is listening for logouts.
            let _ = self.auth_events.send(AuthEvent::Unauthorized);
            return Err(ApiError::Unauthorized);
        }

        let body = response.bytes().await?;
        let header: EnvelopeHeader = match serde_json::from_slice(&body) {
            Ok(header) => header,
            Err(e) => {
                debug!("Unparsable response ({}): {}", status, e);
                return Err(ApiError::server(Some(status.as_u16()), fallback));
            }
        };

        if !header.ok || !status.is_success() {
            let message = header
                .error
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| fallback.to_string());
            return Err(ApiError::server(Some(status.as_u16()), message));
        }

        serde_json::from_slice(&body).map_err(|e| {
            debug!("Unexpected payload ({}): {}", status, e);
            ApiError::server(Some(status.as_u16()), fallback)
        })
    }
}
