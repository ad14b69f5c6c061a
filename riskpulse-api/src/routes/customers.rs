//! Scoring service proxy endpoints
//!
//! Thin pass-through routes: request parameters are forwarded in the
//! scoring service's envelope and its JSON answers are returned as is.
//! Any upstream failure becomes a 502.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use riskpulse_core::FetchError;
use riskpulse_scoring::{CustomerQuery, InterventionRequest, RiskFilter};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::AppState;

/// Query parameters for listing customers
#[derive(Debug, Deserialize)]
pub struct ListCustomersQuery {
    /// Risk tier (all, critical, high, medium, low)
    pub risk_filter: Option<String>,
    /// Name or customer id search
    pub search: Option<String>,
    pub enrich_ml: Option<bool>,
    /// Maximum number of results
    pub limit: Option<u32>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create customer routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(get_stats))
        .route("/customers", get(list_customers))
        .route("/customers/{id}", get(get_customer))
        .route("/customers/{id}/analysis", get(analyze_customer))
        .route("/customers/{id}/insights", post(generate_insights))
        .route("/interventions", post(execute_intervention))
}

/// One-time direct stats fetch, used by consumers to seed before streaming
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    match state.scoring.fetch_stats().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => upstream_error("fetch dashboard stats", e),
    }
}

async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<ListCustomersQuery>,
) -> impl IntoResponse {
    info!("Listing customers with params: {:?}", params);

    let risk_filter = match params.risk_filter.as_deref() {
        Some(raw) => match raw.parse::<RiskFilter>() {
            Ok(filter) => filter,
            Err(e) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: e })).into_response()
            }
        },
        None => RiskFilter::All,
    };

    let query = CustomerQuery {
        risk_filter,
        search: params.search.unwrap_or_default(),
        enrich_ml: params.enrich_ml.unwrap_or(false),
        limit: params.limit,
    };

    proxy("list customers", state.scoring.list_customers(&query).await)
}

async fn get_customer(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    proxy("get customer", state.scoring.get_customer(&id).await)
}

async fn analyze_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    info!("Analyzing customer {}", id);
    proxy("analyze customer", state.scoring.analyze_customer_risk(&id).await)
}

async fn generate_insights(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    proxy("generate insights", state.scoring.generate_ai_insights(&id).await)
}

async fn execute_intervention(
    State(state): State<AppState>,
    Json(request): Json<InterventionRequest>,
) -> impl IntoResponse {
    info!(
        "Executing intervention '{}' for {}",
        request.action, request.customer_id
    );
    proxy(
        "execute intervention",
        state.scoring.execute_intervention(&request).await,
    )
}

fn proxy(operation: &str, result: Result<Value, FetchError>) -> axum::response::Response {
    match result {
        Ok(value) => (StatusCode::OK, Json(value)).into_response(),
        Err(e) => upstream_error(operation, e),
    }
}

fn upstream_error(operation: &str, e: FetchError) -> axum::response::Response {
    error!("Failed to {}: {}", operation, e);
    (
        StatusCode::BAD_GATEWAY,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}
