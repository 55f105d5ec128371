//! Application shell as an explicit state machine.
//!
//! [`update`] folds an [`Event`] into the [`AppState`] and returns the
//! [`Effect`]s the runtime has to perform; [`render`] is a pure projection
//! of the state to text. Neither touches the network or the disk.

use chrono::NaiveDate;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::dates::default_range;
use crate::models::{IngestReport, LicenseFilters, LicenseRow};
use crate::session::{Session, SessionState};
use crate::table;

pub const SESSION_EXPIRED_NOTICE: &str = "Your session has expired. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    fn info(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Info,
            message: message.into(),
        }
    }

    fn success(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub view: View,
    pub session: SessionState,
    pub filters: LicenseFilters,
    pub rows: Vec<LicenseRow>,
    pub total: u64,
    pub customers: Vec<String>,
    pub products: Vec<String>,
    pub loading: bool,
    pub logging_in: bool,
    pub ingesting: bool,
    pub exporting: bool,
    pub last_ingest: Option<IngestReport>,
    pub banner: Option<Banner>,
    today: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LoginSubmitted { username: String, password: String },
    LoginSucceeded(Session),
    LoginFailed(String),
    LogoutRequested,
    Unauthorized,
    DateFromChanged(Option<String>),
    DateToChanged(Option<String>),
    CustomerSelected(Option<String>),
    ProductSelected(Option<String>),
    PageChanged(u32),
    /// Replace the whole filter set at once.
    FiltersApplied(LicenseFilters),
    SearchRequested,
    SearchSucceeded { rows: Vec<LicenseRow>, total: u64 },
    SearchFailed(String),
    CustomersRequested,
    CustomersLoaded(Vec<String>),
    CustomersFailed(String),
    ProductsLoaded(Vec<String>),
    ProductsFailed(String),
    IngestRequested,
    IngestSucceeded(IngestReport),
    IngestFailed(String),
    ExportRequested,
    ExportSucceeded { path: PathBuf, rows: usize },
    ExportFailed(String),
    BannerDismissed,
    /// The local date the default filter range ends on has changed.
    DayStarted(NaiveDate),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Login { username: String, password: String },
    PersistSession(Session),
    ClearSession,
    LoadCustomers,
    LoadProducts(Option<String>),
    Search(LicenseFilters),
    Ingest,
    Export(LicenseFilters),
}

impl AppState {
    /// Initial state: the data view if a session was restored, otherwise
    /// the login view. Returns the effects needed to populate the view.
    pub fn new(session: SessionState, today: NaiveDate) -> (Self, Vec<Effect>) {
        let mut state = Self {
            view: View::Login,
            session: SessionState::Anonymous,
            filters: LicenseFilters::default(),
            rows: Vec::new(),
            total: 0,
            customers: Vec::new(),
            products: Vec::new(),
            loading: false,
            logging_in: false,
            ingesting: false,
            exporting: false,
            last_ingest: None,
            banner: None,
            today,
        };
        let effects = match session {
            SessionState::Authenticated(session) => state.enter_data_view(session),
            SessionState::Anonymous => Vec::new(),
        };
        (state, effects)
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn username(&self) -> Option<&str> {
        self.session.session().map(|s| s.username.as_str())
    }

    fn enter_data_view(&mut self, session: Session) -> Vec<Effect> {
        let range = default_range(self.today);
        self.session = SessionState::Authenticated(session);
        self.view = View::Data;
        self.filters = LicenseFilters {
            date_from: Some(range.from_param()),
            date_to: Some(range.to_param()),
            ..Default::default()
        };
        self.loading = true;
        vec![Effect::LoadCustomers, Effect::Search(self.filters.clone())]
    }

    fn reset_to_login(&mut self) {
        let today = self.today;
        *self = Self::new(SessionState::Anonymous, today).0;
    }
}

/// Fold one event into the state.
pub fn update(mut state: AppState, event: Event) -> (AppState, Vec<Effect>) {
    let mut effects = Vec::new();

    match (state.view, event) {
        (_, Event::BannerDismissed) => state.banner = None,
        (_, Event::DayStarted(today)) => state.today = today,

        // Login view.
        (View::Login, Event::LoginSubmitted { username, password }) => {
            if !state.logging_in {
                state.logging_in = true;
                state.banner = None;
                effects.push(Effect::Login { username, password });
            }
        }
        (View::Login, Event::LoginSucceeded(session)) => {
            state.logging_in = false;
            state.banner = None;
            effects.push(Effect::PersistSession(session.clone()));
            effects.extend(state.enter_data_view(session));
        }
        (View::Login, Event::LoginFailed(message)) => {
            state.logging_in = false;
            state.banner = Some(Banner::error(message));
        }
        // Anything else arriving on the login screen is a stale response.
        (View::Login, _) => {}

        // Data view.
        (View::Data, Event::LogoutRequested) => {
            state.reset_to_login();
            effects.push(Effect::ClearSession);
        }
        (View::Data, Event::Unauthorized) => {
            state.reset_to_login();
            state.banner = Some(Banner::info(SESSION_EXPIRED_NOTICE));
            effects.push(Effect::ClearSession);
        }
        (View::Data, Event::DateFromChanged(value)) => state.filters.date_from = value,
        (View::Data, Event::DateToChanged(value)) => state.filters.date_to = value,
        (View::Data, Event::CustomerSelected(customer)) => {
            state.filters.customer_name = customer.clone();
            state.filters.product_title = None;
            state.products.clear();
            effects.push(Effect::LoadProducts(customer));
        }
        (View::Data, Event::ProductSelected(product)) => state.filters.product_title = product,
        (View::Data, Event::PageChanged(page)) => state.filters.page = Some(page.max(1)),
        (View::Data, Event::FiltersApplied(mut filters)) => {
            filters.page = filters.page.map(|p| p.max(1));
            state.filters = filters;
        }
        (View::Data, Event::SearchRequested) => {
            state.loading = true;
            effects.push(Effect::Search(state.filters.clone()));
        }
        (View::Data, Event::SearchSucceeded { rows, total }) => {
            state.loading = false;
            state.rows = rows;
            state.total = total;
        }
        (View::Data, Event::SearchFailed(message)) => {
            state.loading = false;
            state.banner = Some(Banner::error(message));
        }
        (View::Data, Event::CustomersRequested) => effects.push(Effect::LoadCustomers),
        (View::Data, Event::CustomersLoaded(customers)) => state.customers = customers,
        (View::Data, Event::ProductsLoaded(products)) => state.products = products,
        (View::Data, Event::CustomersFailed(message) | Event::ProductsFailed(message)) => {
            state.banner = Some(Banner::error(message));
        }
        (View::Data, Event::IngestRequested) => {
            if !state.ingesting {
                state.ingesting = true;
                effects.push(Effect::Ingest);
            }
        }
        (View::Data, Event::IngestSucceeded(report)) => {
            state.ingesting = false;
            state.banner = Some(Banner::success(format!(
                "Ingestion complete: fetched {}, upserted {} ({} to {})",
                report.fetched, report.upserted, report.from_date, report.to_date
            )));
            state.last_ingest = Some(report);
            state.loading = true;
            effects.push(Effect::Search(state.filters.clone()));
        }
        (View::Data, Event::IngestFailed(message)) => {
            state.ingesting = false;
            state.banner = Some(Banner::error(message));
        }
        (View::Data, Event::ExportRequested) => {
            if !state.exporting {
                state.exporting = true;
                effects.push(Effect::Export(state.filters.clone()));
            }
        }
        (View::Data, Event::ExportSucceeded { path, rows }) => {
            state.exporting = false;
            state.banner = Some(Banner::success(format!(
                "Exported {} rows to {}",
                rows,
                path.display()
            )));
        }
        (View::Data, Event::ExportFailed(message)) => {
            state.exporting = false;
            state.banner = Some(Banner::error(message));
        }
        (View::Data, Event::LoginSubmitted { .. } | Event::LoginSucceeded(_) | Event::LoginFailed(_)) => {}
    }

    (state, effects)
}

/// Text projection of the state.
pub fn render(state: &AppState) -> String {
    let mut out = String::new();

    if let Some(banner) = &state.banner {
        let tag = match banner.kind {
            BannerKind::Info => "info",
            BannerKind::Success => "ok",
            BannerKind::Error => "error",
        };
        let _ = writeln!(out, "[{}] {}", tag, banner.message);
    }

    match state.view {
        View::Login => {
            if state.logging_in {
                let _ = writeln!(out, "Logging in...");
            } else {
                let _ = writeln!(out, "Please log in to view license details.");
            }
        }
        View::Data => {
            let filters = &state.filters;
            let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "any".to_string());
            let _ = writeln!(out, "License Details (signed in as {})", state.username().unwrap_or_default());
            let _ = writeln!(
                out,
                "From: {}  To: {}  Customer: {}  Product: {}  Page: {}",
                show(&filters.date_from),
                show(&filters.date_to),
                show(&filters.customer_name),
                show(&filters.product_title),
                filters.page.unwrap_or(1)
            );
            if state.ingesting {
                let _ = writeln!(out, "Ingesting...");
            }
            if state.exporting {
                let _ = writeln!(out, "Exporting...");
            }
            if state.loading {
                let _ = writeln!(out, "Loading...");
            } else {
                let _ = writeln!(out, "{}", table::render(&table::license_columns(), &state.rows));
                let _ = writeln!(out, "Showing {} of {} licenses", state.rows.len(), state.total);
            }
        }
    }

    out
}
