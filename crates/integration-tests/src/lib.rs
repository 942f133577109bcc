//! Integration test support for Vehicle Manager.
//!
//! [`FakeApi`] is an in-process stand-in for the vehicle REST API with a
//! store owned by each test, a log of every request it received, per-route
//! failure injection, and a way to hold one request until the test releases
//! it. [`TestContext`] serves the real admin app
//! against it on an ephemeral port and drives it with a cookie-keeping
//! client that does not follow redirects.
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_dashboard() {
//!     let ctx = TestContext::signed_in().await;
//!     let resp = ctx.get("/").await;
//!     assert_eq!(resp.status(), StatusCode::OK);
//! }
//! ```

#![allow(clippy::missing_panics_doc)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderMap, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{Datelike, NaiveDate};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{RwLock, Semaphore};
use url::Url;

use vehicle_manager_admin::{build_app, config::AppConfig, state::AppState};
use vehicle_manager_core::{
    ChartPoint, FuelType, PageSummary, Price, Summary, User, UserId, Vehicle, VehicleFormData,
    VehicleId,
    VehicleList,
};

/// Credentials the fake API accepts.
pub const EMAIL: &str = "jane.doe@company.com";
pub const PASSWORD: &str = "verystrongpassword";

/// Page size of the fake list endpoint.
pub const PAGE_SIZE: u64 = 10;

/// Number of seeded vehicles.
pub const SEEDED: usize = 25;

const MAKES: [(&str, &str, &str); 5] = [
    ("Audi", "A3", "Hatchback"),
    ("BMW", "3 Series", "Saloon"),
    ("Ford", "Focus", "Estate"),
    ("Kia", "Sportage", "SUV"),
    ("Tesla", "Model 3", "Saloon"),
];
const COLORS: [&str; 4] = ["black", "sky blue", "red", "white"];

/// A request received by the fake API.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    /// Query string, without the leading `?`.
    pub query: Option<String>,
}

/// A request kept waiting until released.
#[derive(Debug)]
struct Hold {
    method: Method,
    path: String,
    query: String,
    gate: Arc<Semaphore>,
}

/// Everything the fake API knows.
#[derive(Debug)]
pub struct Store {
    pub user: User,
    pub vehicles: Vec<Vehicle>,
    /// Bodies of accepted create requests.
    pub created: Vec<VehicleFormData>,
    pub requests: Vec<RecordedRequest>,
    tokens: HashSet<String>,
    failures: HashMap<(Method, String), StatusCode>,
    hold: Option<Hold>,
    next_id: u64,
}

impl Store {
    fn seeded() -> Self {
        Self {
            user: User {
                id: UserId::new("1"),
                name: "Jane Doe".to_string(),
                email: EMAIL.to_string(),
                avatar: "https://avatars.githubusercontent.com/u/2245692".to_string(),
            },
            vehicles: (1..=SEEDED).map(seed_vehicle).collect(),
            created: Vec::new(),
            requests: Vec::new(),
            tokens: HashSet::new(),
            failures: HashMap::new(),
            hold: None,
            next_id: SEEDED as u64 + 1,
        }
    }
}

/// Vehicle number `n` of the seed data. Ids are `"1"`, `"2"`, ...
#[must_use]
pub fn seed_vehicle(n: usize) -> Vehicle {
    let (manufacturer, model, vehicle_type) = MAKES[n % MAKES.len()];
    let year = 2015 + i32::try_from(n % 8).unwrap_or(0);
    let n64 = n as u64;

    Vehicle {
        id: VehicleId::new(n.to_string()),
        vrm: format!("VRM{n}"),
        manufacturer: manufacturer.to_string(),
        model: model.to_string(),
        vehicle_type: vehicle_type.to_string(),
        fuel: FuelType::ALL[n % FuelType::ALL.len()],
        color: COLORS[n % COLORS.len()].to_string(),
        vin: format!("VIN{n:014}"),
        mileage: u32::try_from(n * 1000).unwrap_or(u32::MAX),
        registration_date: NaiveDate::from_ymd_opt(year, 1, 1).expect("valid seed date"),
        price: Price::from_whole_units(10_000 + n64 * 1000),
    }
}

type Shared = Arc<RwLock<Store>>;

/// In-process fake of the vehicle REST API.
#[derive(Clone)]
pub struct FakeApi {
    store: Shared,
    addr: SocketAddr,
}

impl FakeApi {
    /// Start a fake API with the seed data.
    pub async fn start() -> Self {
        let store: Shared = Arc::new(RwLock::new(Store::seeded()));
        let app = fake_routes(store.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake API");
        let addr = listener.local_addr().expect("Fake API has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake API crashed");
        });

        Self { store, addr }
    }

    /// Base URL of the API.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/api/", self.addr)).expect("valid fake API url")
    }

    /// Shared access to the store.
    pub async fn store(&self) -> tokio::sync::RwLockReadGuard<'_, Store> {
        self.store.read().await
    }

    /// Replace every vehicle.
    pub async fn set_vehicles(&self, vehicles: Vec<Vehicle>) {
        self.store.write().await.vehicles = vehicles;
    }

    /// Make `method path` answer with `status` until cleared.
    pub async fn fail(&self, method: Method, path: &str, status: StatusCode) {
        self.store
            .write()
            .await
            .failures
            .insert((method, path.to_string()), status);
    }

    /// Stop injecting failures.
    pub async fn clear_failures(&self) {
        self.store.write().await.failures.clear();
    }

    /// Keep requests for `method path?query` waiting until [`Self::release`].
    pub async fn hold(&self, method: Method, path: &str, query: &str) {
        self.store.write().await.hold = Some(Hold {
            method,
            path: path.to_string(),
            query: query.to_string(),
            gate: Arc::new(Semaphore::new(0)),
        });
    }

    /// Let held requests through.
    pub async fn release(&self) {
        if let Some(hold) = self.store.write().await.hold.take() {
            hold.gate.close();
        }
    }

    /// Wait until `count` requests for `method path` have arrived.
    pub async fn wait_for(&self, method: &Method, path: &str, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(method, path).await < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("Timed out waiting for API requests");
    }

    /// Requests received so far for `method path`.
    pub async fn requests_to(&self, method: &Method, path: &str) -> Vec<RecordedRequest> {
        self.store
            .read()
            .await
            .requests
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .cloned()
            .collect()
    }

    /// Number of requests received for `method path`.
    pub async fn count(&self, method: &Method, path: &str) -> usize {
        self.requests_to(method, path).await.len()
    }
}

fn fake_routes(store: Shared) -> Router {
    let api = Router::new()
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/summary", get(summary))
        .route("/chart", get(chart))
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route("/vehicles/{id}", get(get_vehicle).delete(delete_vehicle))
        .route("/manufacturers", get(manufacturers))
        .route("/models", get(models))
        .route("/types", get(types))
        .route("/colors", get(colors))
        .layer(middleware::from_fn_with_state(store.clone(), record_and_inject))
        .with_state(store);

    Router::new().nest("/api", api)
}

/// Log the request, answer with an injected failure if one is set, reject
/// private routes without a known bearer token, and wait on a matching hold.
async fn record_and_inject(State(store): State<Shared>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    // Nested routers see the path without the `/api` prefix.
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(ToString::to_string);
    let token = bearer(request.headers());

    let gate = {
        let mut store = store.write().await;
        store.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query: query.clone(),
        });
        if let Some(status) = store.failures.get(&(method.clone(), path.clone())) {
            return (*status, Json(json!({ "message": "injected failure" }))).into_response();
        }
        if path != "/login" && !token.is_some_and(|t| store.tokens.contains(&t)) {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        store
            .hold
            .as_ref()
            .filter(|hold| {
                hold.method == method
                    && hold.path == path
                    && query.as_deref().unwrap_or_default() == hold.query
            })
            .map(|hold| hold.gate.clone())
    };

    if let Some(gate) = gate {
        // Closing the gate releases every waiter
        let _released = gate.acquire().await;
    }

    next.run(request).await
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(ToString::to_string)
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
}

async fn login(State(store): State<Shared>, Json(body): Json<Credentials>) -> Response {
    if body.email != EMAIL || body.password != PASSWORD {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let token = uuid::Uuid::new_v4().to_string();
    store.write().await.tokens.insert(token.clone());
    Json(json!({ "token": token })).into_response()
}

async fn me(State(store): State<Shared>) -> Json<User> {
    Json(store.read().await.user.clone())
}

async fn summary(State(store): State<Shared>) -> Json<Summary> {
    let store = store.read().await;
    let oems: BTreeSet<&str> = store.vehicles.iter().map(|v| v.manufacturer.as_str()).collect();
    let value = store
        .vehicles
        .iter()
        .filter_map(|v| v.price.amount())
        .sum::<Decimal>();

    Json(Summary {
        count: store.vehicles.len() as u64,
        oems: oems.len() as u64,
        value,
    })
}

#[derive(Deserialize)]
struct ChartQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
}

fn counted<K: Ord + ToString>(keys: impl Iterator<Item = K>) -> Vec<ChartPoint> {
    let mut counts: BTreeMap<K, u64> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(key, value)| ChartPoint::new(key.to_string(), value))
        .collect()
}

async fn chart(State(store): State<Shared>, Query(query): Query<ChartQuery>) -> Json<Vec<ChartPoint>> {
    let store = store.read().await;
    let vehicles = &store.vehicles;

    let points = match query.kind.as_deref() {
        Some("FUEL_TYPE") => FuelType::ALL
            .into_iter()
            .map(|fuel| {
                let value = vehicles.iter().filter(|v| v.fuel == fuel).count() as u64;
                ChartPoint::new(fuel.chart_key(), value)
            })
            .collect(),
        Some("OEM") => counted(vehicles.iter().map(|v| v.manufacturer.clone())),
        Some("REGISTRATION_YEAR") => counted(vehicles.iter().map(|v| v.registration_date.year())),
        _ => Vec::new(),
    };
    Json(points)
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<u64>,
    q: Option<String>,
}

async fn list_vehicles(State(store): State<Shared>, Query(query): Query<ListQuery>) -> Json<VehicleList> {
    let store = store.read().await;
    let page = query.page.unwrap_or(1).max(1);
    let q = query.q.unwrap_or_default().to_lowercase();

    let matching: Vec<&Vehicle> = store
        .vehicles
        .iter()
        .filter(|v| {
            q.is_empty()
                || v.manufacturer.to_lowercase().contains(&q)
                || v.model.to_lowercase().contains(&q)
                || v.vehicle_type.to_lowercase().contains(&q)
        })
        .collect();

    let start = usize::try_from((page - 1) * PAGE_SIZE).unwrap_or(usize::MAX);
    let vehicles = matching
        .iter()
        .skip(start)
        .take(PAGE_SIZE as usize)
        .map(|v| v.summary())
        .collect();

    Json(VehicleList {
        summary: PageSummary::new(matching.len() as u64, page, PAGE_SIZE),
        vehicles,
    })
}

async fn get_vehicle(State(store): State<Shared>, Path(id): Path<String>) -> Response {
    let store = store.read().await;
    store
        .vehicles
        .iter()
        .find(|v| v.id.as_str() == id)
        .map_or_else(
            || StatusCode::NOT_FOUND.into_response(),
            |v| Json(v.clone()).into_response(),
        )
}

async fn delete_vehicle(State(store): State<Shared>, Path(id): Path<String>) -> Json<serde_json::Value> {
    store.write().await.vehicles.retain(|v| v.id.as_str() != id);
    Json(json!({}))
}

async fn create_vehicle(State(store): State<Shared>, Json(form): Json<VehicleFormData>) -> Json<Vehicle> {
    let mut store = store.write().await;
    let id = VehicleId::new(store.next_id.to_string());
    store.next_id += 1;

    store.created.push(form.clone());
    let vehicle = Vehicle::from_form(id, form);
    store.vehicles.push(vehicle.clone());
    Json(vehicle)
}

async fn distinct(store: &Shared, field: fn(&Vehicle) -> &str) -> Json<Vec<String>> {
    let store = store.read().await;
    let values: BTreeSet<String> = store.vehicles.iter().map(|v| field(v).to_string()).collect();
    Json(values.into_iter().collect())
}

async fn manufacturers(State(store): State<Shared>) -> Json<Vec<String>> {
    distinct(&store, |v| v.manufacturer.as_str()).await
}

async fn models(State(store): State<Shared>) -> Json<Vec<String>> {
    distinct(&store, |v| v.model.as_str()).await
}

async fn types(State(store): State<Shared>) -> Json<Vec<String>> {
    distinct(&store, |v| v.vehicle_type.as_str()).await
}

async fn colors(State(store): State<Shared>) -> Json<Vec<String>> {
    distinct(&store, |v| v.color.as_str()).await
}

// =============================================================================
// Test Context
// =============================================================================

/// The admin app served against a fresh [`FakeApi`].
pub struct TestContext {
    pub client: Client,
    pub api: FakeApi,
    addr: SocketAddr,
}

impl TestContext {
    /// Start the app with default configuration.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Start the app, adjusting its configuration first.
    pub async fn with_config(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let api = FakeApi::start().await;

        let mut config = AppConfig::new(api.url());
        configure(&mut config);
        let app = build_app(AppState::new(config));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind app");
        let addr = listener.local_addr().expect("App has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("App crashed");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client");

        Self { client, api, addr }
    }

    /// Start the app and sign in.
    pub async fn signed_in() -> Self {
        let ctx = Self::new().await;
        ctx.login().await;
        ctx
    }

    /// Absolute URL of an app path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET an app path.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    /// GET an app path the way htmx does.
    pub async fn get_htmx(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("HX-Request", "true")
            .send()
            .await
            .expect("Request failed")
    }

    /// POST a form to an app path.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("Request failed")
    }

    /// GET an app path and return the body of a 200 response.
    pub async fn page(&self, path: &str) -> String {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        resp.text().await.expect("Failed to read body")
    }

    /// Load the results fragment a rendered list page asks for.
    pub async fn results_for(&self, list_page: &str) -> String {
        let url = fragment_url(list_page);
        let resp = self.get_htmx(&url).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {url}");
        resp.text().await.expect("Failed to read body")
    }

    /// Sign in with the accepted credentials.
    pub async fn login(&self) -> reqwest::Response {
        let resp = self
            .post_form("/login", &[("email", EMAIL), ("password", PASSWORD), ("to", "/")])
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "login should redirect");
        resp
    }
}

/// Value of the `Location` header.
#[must_use]
pub fn location(resp: &reqwest::Response) -> Option<&str> {
    resp.headers().get("location")?.to_str().ok()
}

/// URL the results area of a list page loads itself from, with the HTML
/// escaping of its `hx-get` attribute undone.
#[must_use]
pub fn fragment_url(list_page: &str) -> String {
    let start = list_page
        .find(r#"<div id="vehicle-results""#)
        .expect("Page has no results area");
    let tag = &list_page[start..];
    let tag = &tag[..tag.find('>').expect("Unterminated results tag")];
    let (_, rest) = tag
        .split_once(r#"hx-get=""#)
        .expect("Results area does not load anything");
    let (url, _) = rest.split_once('"').expect("Unterminated hx-get");
    url.replace("&#38;", "&").replace("&amp;", "&")
}
