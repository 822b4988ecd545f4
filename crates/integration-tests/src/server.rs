//! Fake commerce service speaking the REST wire format over HTTP.
//!
//! Behaviour is driven by the request contents so tests need no setup:
//!
//! - `POST /cart/items` with product `throttled` answers 429 with
//!   `Retry-After: 7`; product `broken` answers 503
//! - `DELETE /cart` answers 404 until an item has been added
//! - `POST /cart/coupon` accepts `EID10`, reports `EXPIRED` with a
//!   `success: false` envelope, and answers 422 for anything else
//! - `GET /wishlist` answers 401 without a bearer token
//! - `POST /wishlist` with product `quiet` confirms without echoing the entry
//! - `POST /orders` answers 400 without an `Idempotency-Key`

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// A request as the fake service received it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub authorization: Option<String>,
    pub idempotency_key: Option<String>,
    pub body: Value,
}

#[derive(Default)]
struct Shared {
    requests: Vec<Recorded>,
    cart_exists: bool,
}

type AppState = Arc<Mutex<Shared>>;

fn lock(state: &AppState) -> MutexGuard<'_, Shared> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

fn record(state: &AppState, method: &'static str, path: String, headers: &HeaderMap, body: Value) {
    lock(state).requests.push(Recorded {
        method,
        path,
        authorization: header_value(headers, header::AUTHORIZATION.as_str()),
        idempotency_key: header_value(headers, "idempotency-key"),
        body,
    });
}

fn ok() -> Response {
    Json(json!({ "success": true })).into_response()
}

fn ok_with(data: Value) -> Response {
    Json(json!({ "success": true, "data": data })).into_response()
}

fn failure(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

fn product(id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Product {id}"),
        "price": "1250.00",
        "originalPrice": 1500,
        "stock": 4,
        "category": "apparel",
        "isAuthentic": true
    })
}

fn wishlist_entry(id: &str) -> Value {
    let added_at = Utc
        .with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();
    json!({ "product": product(id), "addedAt": added_at })
}

async fn add_item(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "POST", "/cart/items".to_string(), &headers, body.clone());
    match body["productId"].as_str() {
        Some("throttled") => {
            (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "7")], "slow down").into_response()
        }
        Some("broken") => failure(StatusCode::SERVICE_UNAVAILABLE, "Inventory service down"),
        Some(_) => {
            lock(&state).cart_exists = true;
            ok()
        }
        None => failure(StatusCode::UNPROCESSABLE_ENTITY, "productId is required"),
    }
}

async fn clear_cart(State(state): State<AppState>, headers: HeaderMap) -> Response {
    record(&state, "DELETE", "/cart".to_string(), &headers, Value::Null);
    if lock(&state).cart_exists {
        ok()
    } else {
        failure(StatusCode::NOT_FOUND, "Cart not found")
    }
}

async fn apply_coupon(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "POST", "/cart/coupon".to_string(), &headers, body.clone());
    match body["code"].as_str() {
        Some("EID10") => ok_with(json!({
            "code": "EID10",
            "discountType": "percentage",
            "discountValue": 10,
            "description": "Eid special"
        })),
        Some("EXPIRED") => Json(json!({ "success": false, "message": "Coupon expired" })).into_response(),
        _ => failure(StatusCode::UNPROCESSABLE_ENTITY, "Invalid coupon code"),
    }
}

async fn remove_coupon(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "DELETE", "/cart/coupon".to_string(), &headers, body);
    // Some deployments answer removals with an empty body.
    StatusCode::NO_CONTENT.into_response()
}

async fn get_wishlist(State(state): State<AppState>, headers: HeaderMap) -> Response {
    record(&state, "GET", "/wishlist".to_string(), &headers, Value::Null);
    if headers.get(header::AUTHORIZATION).is_none() {
        return failure(StatusCode::UNAUTHORIZED, "Please log in");
    }
    ok_with(json!([wishlist_entry("w-1"), wishlist_entry("w-2")]))
}

async fn add_to_wishlist(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "POST", "/wishlist".to_string(), &headers, body.clone());
    match body["productId"].as_str() {
        Some("quiet") => ok(),
        Some(id) => ok_with(wishlist_entry(id)),
        None => failure(StatusCode::BAD_REQUEST, "productId is required"),
    }
}

async fn clear_wishlist(State(state): State<AppState>, headers: HeaderMap) -> Response {
    record(&state, "DELETE", "/wishlist".to_string(), &headers, Value::Null);
    ok()
}

async fn remove_from_wishlist(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    record(&state, "DELETE", format!("/wishlist/{id}"), &headers, Value::Null);
    ok()
}

async fn move_to_cart(State(state): State<AppState>, Path(id): Path<String>, headers: HeaderMap) -> Response {
    record(&state, "POST", format!("/wishlist/{id}/move-to-cart"), &headers, Value::Null);
    lock(&state).cart_exists = true;
    ok()
}

async fn create_order(State(state): State<AppState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, "POST", "/orders".to_string(), &headers, body);
    if headers.get("idempotency-key").is_none() {
        return failure(StatusCode::BAD_REQUEST, "Idempotency-Key header is required");
    }
    ok_with(json!({
        "orderId": "ord_9001",
        "orderNumber": "CW-9001",
        "totalAmount": "2650.00",
        "estimatedDelivery": "3-5 business days"
    }))
}

/// A running fake service bound to a local port.
pub struct FakeServer {
    base_url: Url,
    state: AppState,
    handle: JoinHandle<()>,
}

impl FakeServer {
    /// Bind to an ephemeral port and start serving.
    ///
    /// # Errors
    ///
    /// Returns error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = AppState::default();
        let app = Router::new()
            .route("/api/cart", delete(clear_cart))
            .route("/api/cart/items", post(add_item))
            .route("/api/cart/coupon", post(apply_coupon).delete(remove_coupon))
            .route(
                "/api/wishlist",
                get(get_wishlist).post(add_to_wishlist).delete(clear_wishlist),
            )
            .route("/api/wishlist/{id}", delete(remove_from_wishlist))
            .route("/api/wishlist/{id}/move-to-cart", post(move_to_cart))
            .route("/api/orders", post(create_order))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = Url::parse(&format!("http://{addr}/api/")).map_err(std::io::Error::other)?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url,
            state,
            handle,
        })
    }

    /// Base URL the client should be configured with.
    #[must_use]
    pub fn base_url(&self) -> Url {
        self.base_url.clone()
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<Recorded> {
        lock(&self.state).requests.clone()
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
