//! license_dash: terminal dashboard for a remote license API.
//!
//! Authenticates against the API, searches license grants by date,
//! customer and product, triggers server-side ingestion, and exports the
//! current match set to a spreadsheet.
//!
//! The application shell is a pure state machine ([`shell`]) driven by a
//! small runtime ([`dashboard`]) over the API client and session store.

pub mod auth;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod export;
pub mod models;
pub mod repl;
pub mod session;
pub mod shell;
pub mod storage;
pub mod table;
pub mod telemetry;
