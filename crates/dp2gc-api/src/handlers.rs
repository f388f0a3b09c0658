//! HTTP API handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dp2gc_core::{is_valid_import_range, mask_password, Credentials, EventList, QuarterToken};

use crate::error::{ApiError, Result};
use crate::server::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// Query string of the event list endpoint
#[derive(Debug, Deserialize)]
pub struct EventListQuery {
    /// Quarter token (`1q`, `3q_and_4q`, ...)
    #[serde(rename = "importRange")]
    pub import_range: String,
    /// Portal user id
    pub username: String,
    /// Portal password
    pub password: String,
    /// Academic year to import; defaults to the configured table's year
    #[serde(rename = "importYear", default)]
    pub import_year: Option<String>,
}

/// Liveness response
#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub text: String,
}

// ============================================================================
// Handler functions
// ============================================================================

/// Liveness check
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        text: "Hello!".to_string(),
    })
}

/// Collect class events for every month of a quarter
pub async fn get_dhu_event_list(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<Json<EventList>> {
    debug!(
        "Event list request: range={} year={:?} username={} password={}",
        query.import_range,
        query.import_year,
        query.username,
        mask_password(&query.password)
    );

    if !is_valid_import_range(&query.import_range) {
        return Err(ApiError::InvalidRequest(format!(
            "importRange {} is not correct",
            query.import_range
        )));
    }
    let token: QuarterToken = query.import_range.parse()?;

    let import_year = query
        .import_year
        .as_deref()
        .map(|year| year.trim().parse::<i32>())
        .transpose()
        .map_err(|_| ApiError::InvalidRequest("importYear must be numeric".to_string()))?;

    let range = state
        .quarters
        .get(token)
        .ok_or_else(|| ApiError::Internal(format!("error in get_range for {}", token)))?;
    let range = match import_year {
        Some(year) => state.quarters.shift_to_year(range, year)?,
        None => range,
    };

    let credentials = Credentials::new(query.username, query.password);
    let events = state.aggregator.aggregate(&credentials, &range).await?;

    info!(
        "Returning {} events for {} ({} to {})",
        events.len(),
        token,
        range.start,
        range.end
    );
    Ok(Json(events))
}
