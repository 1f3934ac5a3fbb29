//! `GET /opportunities` — filterable by chain and status (spec §1: a
//! read-only view over the detector's persisted state).

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::types::OpportunityStatus;

use super::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub chain_id: i64,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_opportunities(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let status = match params.status.as_deref() {
        None => None,
        Some(s) => match s.parse::<OpportunityStatus>() {
            Ok(status) => Some(status),
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "error": format!("unknown status: {s}") })),
                )
                    .into_response()
            }
        },
    };

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    match state.db.list_opportunities(params.chain_id, status, limit).await {
        Ok(opportunities) => Json(opportunities).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to list opportunities");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal error" })),
            )
                .into_response()
        }
    }
}
