//! Store routes: availability and purchase for both policy versions.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::GateError;
use crate::gate::{timestamp_from_secs, AdmissionPolicy, Gate};

/// Body returned whenever the gate fails internally.
pub const STORE_ERROR_MESSAGE: &str = "An error occurred with our store. Please contact support.";

/// Policy version served under `/v1` or `/v2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V1,
    V2,
}

#[derive(Clone)]
struct StoreState {
    gate: Arc<Gate>,
    version: Version,
}

impl StoreState {
    fn policy(&self) -> &dyn AdmissionPolicy {
        match self.version {
            Version::V1 => self.gate.v1(),
            Version::V2 => self.gate.v2(),
        }
    }
}

/// Optional evaluation time, in epoch seconds.
#[derive(Debug, Default, Deserialize)]
pub struct TimeQuery {
    /// Defaults to now when absent
    pub time: Option<i64>,
}

impl TimeQuery {
    fn resolve(&self) -> Result<DateTime<Utc>, GateError> {
        match self.time {
            Some(secs) => timestamp_from_secs(secs),
            None => Ok(Utc::now()),
        }
    }
}

/// Body of an availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
}

/// Body of a purchase attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub success: bool,
}

/// Body of the liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    pub ping: String,
}

/// Body of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// A gate failure surfaced through the store.
///
/// The detail is logged; callers only see the generic 500 body.
#[derive(Debug)]
pub struct StoreError(GateError);

impl From<GateError> for StoreError {
    fn from(err: GateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "Store request failed");
        let body = ErrorBody {
            error: STORE_ERROR_MESSAGE.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Build the store router over `gate`.
pub fn router(gate: Arc<Gate>) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .nest("/v1/store", store_routes(Arc::clone(&gate), Version::V1))
        .nest("/v2/store", store_routes(gate, Version::V2))
}

fn store_routes(gate: Arc<Gate>, version: Version) -> Router {
    Router::new()
        .route("/availability", get(availability))
        .route("/purchase", post(purchase))
        .with_state(StoreState { gate, version })
}

async fn ping() -> Json<Ping> {
    Json(Ping {
        ping: "pong".to_string(),
    })
}

async fn availability(
    State(state): State<StoreState>,
    Query(query): Query<TimeQuery>,
) -> Result<Json<Availability>, StoreError> {
    let time = query.resolve()?;
    let available = state.policy().can_admit(time)?;
    debug!(version = ?state.version, available, "Availability checked");
    Ok(Json(Availability { available }))
}

async fn purchase(
    State(state): State<StoreState>,
    Query(query): Query<TimeQuery>,
) -> Result<Json<Purchase>, StoreError> {
    let time = query.resolve()?;
    let success = state.policy().admit(time)?;
    debug!(version = ?state.version, success, "Purchase attempted");
    Ok(Json(Purchase { success }))
}
