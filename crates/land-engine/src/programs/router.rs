use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::scorer::{ParcelRequest, ProgramScorer, ScoringError};
use crate::location::normalize_state;

/// Router exposing program quotes, combined scoring and rule maintenance.
pub fn program_router(scorer: Arc<ProgramScorer>) -> Router {
    Router::new()
        .route("/api/v1/programs/crp/quote", post(crp_quote_handler))
        .route("/api/v1/programs/eqip/quote", post(eqip_quote_handler))
        .route("/api/v1/programs/csp/quote", post(csp_quote_handler))
        .route("/api/v1/programs/score_all", post(score_all_handler))
        .route("/api/v1/programs/crp/counties", get(crp_counties_handler))
        .route("/api/v1/programs/rules/reload", post(reload_rules_handler))
        .with_state(scorer)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountiesQuery {
    state: String,
}

#[derive(Debug, Serialize)]
struct CountyListing {
    state: String,
    counties: Vec<String>,
}

pub(crate) async fn crp_quote_handler(
    State(scorer): State<Arc<ProgramScorer>>,
    axum::Json(request): axum::Json<ParcelRequest>,
) -> Response {
    respond(scorer.quote_crp(&request).await)
}

pub(crate) async fn eqip_quote_handler(
    State(scorer): State<Arc<ProgramScorer>>,
    axum::Json(request): axum::Json<ParcelRequest>,
) -> Response {
    respond(scorer.quote_eqip(&request).await)
}

pub(crate) async fn csp_quote_handler(
    State(scorer): State<Arc<ProgramScorer>>,
    axum::Json(request): axum::Json<ParcelRequest>,
) -> Response {
    respond(scorer.quote_csp(&request).await)
}

pub(crate) async fn score_all_handler(
    State(scorer): State<Arc<ProgramScorer>>,
    axum::Json(request): axum::Json<ParcelRequest>,
) -> Response {
    respond(scorer.score_all(&request).await)
}

pub(crate) async fn crp_counties_handler(
    State(scorer): State<Arc<ProgramScorer>>,
    Query(query): Query<CountiesQuery>,
) -> Response {
    let listing = CountyListing {
        counties: scorer.crp_counties(&query.state),
        state: normalize_state(&query.state),
    };
    (StatusCode::OK, axum::Json(listing)).into_response()
}

pub(crate) async fn reload_rules_handler(State(scorer): State<Arc<ProgramScorer>>) -> Response {
    // The rebuild reads the rule file under the cache's build lock.
    let rules = match tokio::task::spawn_blocking(move || scorer.reload_rules()).await {
        Ok(rules) => rules,
        Err(err) => {
            error!(error = %err, "rule reload task failed");
            let payload = json!({ "error": "rule reload failed" });
            return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
        }
    };
    let payload = json!({
        "reloaded": true,
        "rules": rules,
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

fn respond<T: Serialize>(result: Result<T, ScoringError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}
