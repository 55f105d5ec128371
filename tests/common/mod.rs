//! In-process license API used by the integration tests.
//!
//! Speaks the same envelope as the real service, issues HS256 tokens on
//! login and records every authenticated request body.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Query, State},
    http::{header, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use license_dash::config::Config;
use license_dash::storage::SessionStore;

const SECRET_KEY: &[u8] = b"fixture-secret";
// Lowest cost bcrypt accepts; keeps the tests fast.
const BCRYPT_COST: u32 = 4;
pub const PAGE_SIZE: usize = 2;

#[derive(Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct FixtureState {
    users: HashMap<String, String>,
    pub licenses: Vec<Value>,
    /// Lifetime of issued tokens, in seconds.
    pub token_ttl: Mutex<i64>,
    /// Answer every authenticated request with 401.
    pub reject_all: AtomicBool,
    /// Answer authenticated requests to these paths with 401.
    pub reject_paths: Mutex<Vec<String>>,
    /// Body returned (with status 500) by the license search instead of rows.
    pub search_error: Mutex<Option<Value>>,
    pub requests: Mutex<Vec<Recorded>>,
}

impl FixtureState {
    pub fn requests_to(&self, path: &str) -> Vec<Recorded> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

pub struct Fixture {
    pub base_url: String,
    pub state: Arc<FixtureState>,
}

impl Fixture {
    /// Config pointing at this fixture, exporting into `export_dir`.
    pub fn config(&self, export_dir: &std::path::Path) -> Config {
        Config {
            api_base: self.base_url.clone(),
            export_dir: export_dir.to_path_buf(),
            timeout_secs: Some(10),
            ..Default::default()
        }
    }
}

pub fn sample_licenses() -> Vec<Value> {
    vec![
        json!({
            "customer_name": "Acme",
            "user_username": "jdoe",
            "product_title": "Forklift Safety",
            "product_price": 49.5,
            "product_duration": "365 days",
            "license_start": "2025-01-02T08:00:00",
            "license_end": "2026-01-02T08:00:00",
            "tracking_last_access": "2025-01-20T10:15:00",
            "tracking_visits": 3,
            "tracking_elapsed_time": 3725
        }),
        json!({
            "customer_name": "Acme",
            "user_fullname": "Ann Lee",
            "product_title": "Fire Drill",
            "license_start": "2025-01-05",
            "license_end": "2025-02-04"
        }),
        json!({
            "customer_name": "Globex",
            "user_fullname": "Hank Scorpio",
            "product_title": "Forklift Safety"
        }),
    ]
}

/// Start the fixture on an ephemeral port. `alice` / `wonderland` is the
/// only account.
pub async fn spawn() -> Fixture {
    let mut users = HashMap::new();
    users.insert(
        "alice".to_string(),
        bcrypt::hash("wonderland", BCRYPT_COST).expect("hash fixture password"),
    );
    let state = Arc::new(FixtureState {
        users,
        licenses: sample_licenses(),
        token_ttl: Mutex::new(3600),
        reject_all: AtomicBool::new(false),
        reject_paths: Mutex::new(Vec::new()),
        search_error: Mutex::new(None),
        requests: Mutex::new(Vec::new()),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fixture");
    let addr = listener.local_addr().expect("fixture address");
    let app = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fixture server");
    });

    Fixture {
        base_url: format!("http://{}", addr),
        state,
    }
}

pub fn create_router(state: Arc<FixtureState>) -> Router {
    let auth_routes = Router::new()
        .route("/api/license-details", post(license_details_handler))
        .route("/ingest/licenses", get(ingest_handler))
        .route("/api/customers", get(customers_handler))
        .route("/api/products", get(products_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/api/login", post(login_handler))
        .merge(auth_routes)
        .with_state(state)
}

/// Token for `username` that expires `ttl` seconds from now.
pub fn create_jwt(username: &str, ttl: i64) -> String {
    let claims = Claims {
        sub: username.to_owned(),
        exp: Utc::now().timestamp() + ttl,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET_KEY)).expect("encode token")
}

/// A temporary session store already holding a session for `alice`.
pub fn store_with_session(ttl: i64) -> SessionStore {
    let store = SessionStore::temporary().expect("temporary store");
    store.save(&create_jwt("alice", ttl), "alice").expect("seed store");
    store
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "ok": false, "error": "Unauthorized" }))).into_response()
}

async fn auth_middleware(
    State(state): State<Arc<FixtureState>>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    if state.reject_all.load(Ordering::SeqCst) || state.reject_paths.lock().unwrap().contains(&path) {
        return unauthorized();
    }
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    let Some(token) = token else {
        return unauthorized();
    };

    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.leeway = 0;
    if jsonwebtoken::decode::<Claims>(token, &jsonwebtoken::DecodingKey::from_secret(SECRET_KEY), &validation).is_err() {
        return unauthorized();
    }
    next.run(req).await
}

fn record(state: &FixtureState, path: &str, authorization: Option<String>, body: Value) {
    state.requests.lock().unwrap().push(Recorded {
        path: path.to_string(),
        authorization,
        body,
    });
}

fn bearer(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn login_handler(State(state): State<Arc<FixtureState>>, Json(payload): Json<LoginBody>) -> Response {
    let valid = state
        .users
        .get(&payload.username)
        .map(|hash| bcrypt::verify(&payload.password, hash).unwrap_or(false))
        .unwrap_or(false);
    if !valid {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "error": "Invalid username or password" })),
        )
            .into_response();
    }
    let ttl = *state.token_ttl.lock().unwrap();
    Json(json!({ "ok": true, "token": create_jwt(&payload.username, ttl) })).into_response()
}

async fn license_details_handler(
    State(state): State<Arc<FixtureState>>,
    headers: axum::http::HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, "/api/license-details", bearer(&headers), body.clone());
    if let Some(error) = state.search_error.lock().unwrap().clone() {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response();
    }

    let wanted = |key: &str, row: &Value| match body.get(key).and_then(Value::as_str) {
        Some(expected) => row.get(key).and_then(Value::as_str) == Some(expected),
        None => true,
    };
    let matching: Vec<Value> = state
        .licenses
        .iter()
        .filter(|row| wanted("customer_name", row) && wanted("product_title", row))
        .cloned()
        .collect();

    if body.get("export").and_then(Value::as_bool) == Some(true) {
        return Json(json!({ "ok": true, "license": matching })).into_response();
    }
    let page = body.get("page").and_then(Value::as_u64).unwrap_or(1).max(1) as usize;
    let rows: Vec<Value> = matching.iter().skip((page - 1) * PAGE_SIZE).take(PAGE_SIZE).cloned().collect();
    Json(json!({ "ok": true, "license": rows, "total": matching.len() })).into_response()
}

async fn ingest_handler(State(state): State<Arc<FixtureState>>, headers: axum::http::HeaderMap) -> Json<Value> {
    record(&state, "/ingest/licenses", bearer(&headers), Value::Null);
    Json(json!({
        "ok": true,
        "report": { "fetched": 42, "upserted": 40, "fromDate": "2025-01-01", "toDate": "2025-01-31" }
    }))
}

async fn customers_handler(State(state): State<Arc<FixtureState>>, headers: axum::http::HeaderMap) -> Json<Value> {
    record(&state, "/api/customers", bearer(&headers), Value::Null);
    Json(json!({
        "ok": true,
        "customers": [{ "customer_name": "Acme" }, { "customer_name": "Globex" }]
    }))
}

async fn products_handler(
    State(state): State<Arc<FixtureState>>,
    headers: axum::http::HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    record(&state, "/api/products", bearer(&headers), json!(params));
    let customer = params.get("customer_name");
    let mut titles: Vec<&str> = state
        .licenses
        .iter()
        .filter(|row| customer.map_or(true, |c| row.get("customer_name").and_then(Value::as_str) == Some(c)))
        .filter_map(|row| row.get("product_title").and_then(Value::as_str))
        .collect();
    titles.sort_unstable();
    titles.dedup();
    let products: Vec<Value> = titles.into_iter().map(|t| json!({ "product_title": t })).collect();
    Json(json!({ "ok": true, "products": products }))
}
