//! HTTP API for the stock daemon.
//!
//! Provides REST endpoints for:
//! - Health check and metrics
//! - Availability check
//! - Raw, increase and decrease stock adjustments
//! - Stock level read, administrative overwrite
//! - Provisioning and retiring stock records for catalog products

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use stock_domain::{Adjustment, IdempotencyKey};
use stock_inventory::{InventoryError, InventoryService};

use crate::metrics::Metrics;

/// Request header carrying an idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Seconds a client should wait before retrying when the store is unavailable.
const RETRY_AFTER_SECS: &str = "1";

// =============================================================================
// API State
// =============================================================================

/// Shared state for API handlers.
pub struct ApiState<I: InventoryService + 'static> {
    pub inventory: Arc<I>,
    pub metrics: Arc<Metrics>,
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// Envelope wrapping every API response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok(data)
        }
    }

    fn fail(message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            errors,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Availability check result.
#[derive(Debug, Serialize, Deserialize)]
pub struct AvailabilityResponse {
    pub product_id: Uuid,
    pub quantity: i64,
    pub available: bool,
}

/// Raw stock change request.
#[derive(Debug, Deserialize)]
pub struct UpdateStockRequest {
    pub product_id: Uuid,
    pub quantity_change: i64,
}

/// Query parameters for increase/decrease.
#[derive(Debug, Deserialize)]
pub struct StockChangeQuery {
    pub product_id: Uuid,
    pub quantity: i64,
}

/// Administrative overwrite request.
#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub quantity: i64,
}

/// Provisioning request sent by the catalog on product creation.
#[derive(Debug, Default, Deserialize)]
pub struct ProvisionRequest {
    #[serde(default)]
    pub initial_quantity: i64,
}

/// Committed adjustment.
#[derive(Debug, Serialize, Deserialize)]
pub struct AdjustmentResponse {
    pub product_id: Uuid,
    pub delta: i64,
    pub quantity_on_hand: i64,
    pub replayed: bool,
}

/// Current stock level of a product.
#[derive(Debug, Serialize, Deserialize)]
pub struct StockLevelResponse {
    pub product_id: Uuid,
    pub quantity_on_hand: i64,
    pub updated_at: DateTime<Utc>,
}

/// Provisioning outcome.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProvisionResponse {
    pub product_id: Uuid,
    pub created: bool,
}

/// Error response with its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ApiResponse<()>,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ApiResponse::fail("Validation failed.", vec![message]),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry = self.status == StatusCode::SERVICE_UNAVAILABLE;
        let mut response = (self.status, Json(self.body)).into_response();
        if retry {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Router
// =============================================================================

/// Create the API router.
pub fn create_router<I>(state: Arc<ApiState<I>>) -> Router
where
    I: InventoryService + 'static,
{
    let inventory = Router::new()
        .route("/availability/:product_id/:quantity", get(availability_handler::<I>))
        .route("/update-stock", post(update_stock_handler::<I>))
        .route("/decrease-stock", post(decrease_stock_handler::<I>))
        .route("/increase-stock", post(increase_stock_handler::<I>))
        .route(
            "/:product_id",
            get(get_stock_handler::<I>)
                .put(set_stock_handler::<I>)
                .delete(retire_handler::<I>),
        )
        .route("/:product_id/provision", post(provision_handler::<I>));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler::<I>))
        .nest("/api/inventory", inventory)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus text exposition.
async fn metrics_handler<I>(State(state): State<Arc<ApiState<I>>>) -> Response
where
    I: InventoryService + 'static,
{
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Advisory availability check.
async fn availability_handler<I>(
    State(state): State<Arc<ApiState<I>>>,
    Path((product_id, quantity)): Path<(Uuid, i64)>,
) -> ApiResult<Json<ApiResponse<AvailabilityResponse>>>
where
    I: InventoryService + 'static,
{
    let available = state
        .inventory
        .is_available(product_id, quantity)
        .await
        .map_err(to_error_response)?;

    Ok(Json(ApiResponse::ok(AvailabilityResponse {
        product_id,
        quantity,
        available,
    })))
}

/// Raw signed stock change.
async fn update_stock_handler<I>(
    State(state): State<Arc<ApiState<I>>>,
    headers: HeaderMap,
    Json(req): Json<UpdateStockRequest>,
) -> ApiResult<Json<ApiResponse<AdjustmentResponse>>>
where
    I: InventoryService + 'static,
{
    let key = idempotency_key(&headers)?;
    let result = state
        .inventory
        .update_stock(req.product_id, req.quantity_change, key.as_ref())
        .await;
    state.metrics.record_adjustment("update_stock", &result);

    let receipt = result.map_err(to_error_response)?;
    Ok(Json(ApiResponse::ok_with_message(
        adjustment_to_response(&receipt),
        "Stock updated successfully.",
    )))
}

/// Validated decrease.
async fn decrease_stock_handler<I>(
    State(state): State<Arc<ApiState<I>>>,
    headers: HeaderMap,
    Query(query): Query<StockChangeQuery>,
) -> ApiResult<Json<ApiResponse<AdjustmentResponse>>>
where
    I: InventoryService + 'static,
{
    let key = idempotency_key(&headers)?;
    let result = state
        .inventory
        .decrease(query.product_id, query.quantity, key.as_ref())
        .await;
    state.metrics.record_adjustment("decrease", &result);

    let receipt = result.map_err(to_error_response)?;
    Ok(Json(ApiResponse::ok_with_message(
        adjustment_to_response(&receipt),
        "Stock decreased successfully.",
    )))
}

/// Validated increase.
async fn increase_stock_handler<I>(
    State(state): State<Arc<ApiState<I>>>,
    headers: HeaderMap,
    Query(query): Query<StockChangeQuery>,
) -> ApiResult<Json<ApiResponse<AdjustmentResponse>>>
where
    I: InventoryService + 'static,
{
    let key = idempotency_key(&headers)?;
    let result = state
        .inventory
        .increase(query.product_id, query.quantity, key.as_ref())
        .await;
    state.metrics.record_adjustment("increase", &result);

    let receipt = result.map_err(to_error_response)?;
    Ok(Json(ApiResponse::ok_with_message(
        adjustment_to_response(&receipt),
        "Stock increased successfully.",
    )))
}

/// Current stock level.
async fn get_stock_handler<I>(
    State(state): State<Arc<ApiState<I>>>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<StockLevelResponse>>>
where
    I: InventoryService + 'static,
{
    let record = state
        .inventory
        .stock_level(product_id)
        .await
        .map_err(to_error_response)?;

    Ok(Json(ApiResponse::ok(StockLevelResponse {
        product_id: record.product_id,
        quantity_on_hand: record.quantity_on_hand.get(),
        updated_at: record.updated_at,
    })))
}

/// Administrative overwrite.
async fn set_stock_handler<I>(
    State(state): State<Arc<ApiState<I>>>,
    Path(product_id): Path<Uuid>,
    Json(req): Json<SetStockRequest>,
) -> ApiResult<Json<ApiResponse<StockLevelResponse>>>
where
    I: InventoryService + 'static,
{
    let record = state
        .inventory
        .set_absolute(product_id, req.quantity)
        .await
        .map_err(to_error_response)?;

    Ok(Json(ApiResponse::ok_with_message(
        StockLevelResponse {
            product_id: record.product_id,
            quantity_on_hand: record.quantity_on_hand.get(),
            updated_at: record.updated_at,
        },
        "Stock set successfully.",
    )))
}

/// Create the stock record for a new catalog product.
///
/// An empty body provisions zero units. A non-empty body must be JSON.
async fn provision_handler<I>(
    State(state): State<Arc<ApiState<I>>>,
    Path(product_id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<ApiResponse<ProvisionResponse>>)>
where
    I: InventoryService + 'static,
{
    let req = parse_provision_body(&headers, &body)?;
    let created = state
        .inventory
        .provision(product_id, req.initial_quantity)
        .await
        .map_err(to_error_response)?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(ApiResponse::ok(ProvisionResponse {
            product_id,
            created,
        })),
    ))
}

/// Drop the stock record of a deleted catalog product.
async fn retire_handler<I>(
    State(state): State<Arc<ApiState<I>>>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<StatusCode>
where
    I: InventoryService + 'static,
{
    state
        .inventory
        .retire(product_id)
        .await
        .map_err(to_error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Helpers
// =============================================================================

fn idempotency_key(headers: &HeaderMap) -> ApiResult<Option<IdempotencyKey>> {
    let Some(value) = headers.get(IDEMPOTENCY_KEY_HEADER) else {
        return Ok(None);
    };

    let raw = value
        .to_str()
        .map_err(|_| ApiError::bad_request("Idempotency-Key must be visible ASCII"))?;

    IdempotencyKey::new(raw)
        .map(Some)
        .map_err(|e| ApiError::bad_request(e.to_string()))
}

fn parse_provision_body(headers: &HeaderMap, body: &[u8]) -> ApiResult<ProvisionRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ProvisionRequest::default());
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
        .unwrap_or(false);
    if !is_json {
        return Err(ApiError::bad_request("Expected request with `Content-Type: application/json`"));
    }

    Json::<ProvisionRequest>::from_bytes(body)
        .map(|Json(req)| req)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn to_error_response(error: InventoryError) -> ApiError {
    let status = match &error {
        InventoryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        InventoryError::NotFound(_) => StatusCode::NOT_FOUND,
        InventoryError::InsufficientStock { .. } => StatusCode::CONFLICT,
        InventoryError::IdempotencyConflict(_) => StatusCode::UNPROCESSABLE_ENTITY,
        InventoryError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        InventoryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    // Internal details stay in the logs.
    let message = match &error {
        InventoryError::Internal(_) => "Internal server error.".to_string(),
        other => other.to_string(),
    };

    ApiError {
        status,
        body: ApiResponse::fail(message, Vec::new()),
    }
}

fn adjustment_to_response(receipt: &Adjustment) -> AdjustmentResponse {
    AdjustmentResponse {
        product_id: receipt.product_id,
        delta: receipt.delta,
        quantity_on_hand: receipt.new_quantity.get(),
        replayed: receipt.replayed,
    }
}

// =============================================================================
// Tests
// =============================================================================
