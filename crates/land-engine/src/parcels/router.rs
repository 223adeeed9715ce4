use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::csv_io::{self, ParcelCsvError};
use super::domain::{ParcelId, ParcelInput, ParcelUpdate};
use super::repository::{ParcelRepository, RepositoryError};
use super::service::{ParcelService, ParcelServiceError};

const DEFAULT_TOP_LIMIT: usize = 10;

/// Router exposing parcel scoring, storage and CSV endpoints.
pub fn parcel_router<R>(service: Arc<ParcelService<R>>) -> Router
where
    R: ParcelRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/parcels",
            get(list_handler::<R>).post(create_batch_handler::<R>),
        )
        .route("/api/v1/parcels/single", post(create_handler::<R>))
        .route("/api/v1/parcels/top", get(top_handler::<R>))
        .route("/api/v1/parcels/county_stats", get(county_stats_handler::<R>))
        .route("/api/v1/parcels/reset", delete(reset_handler::<R>))
        .route("/api/v1/parcels/import_csv", post(import_csv_handler::<R>))
        .route("/api/v1/parcels/rank_csv", post(rank_csv_handler))
        .route(
            "/api/v1/parcels/:parcel_id",
            get(get_handler::<R>)
                .put(update_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountyStatsQuery {
    state: Option<String>,
}

pub(crate) async fn create_handler<R>(
    State(service): State<Arc<ParcelService<R>>>,
    axum::Json(input): axum::Json<ParcelInput>,
) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.create(input) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_batch_handler<R>(
    State(service): State<Arc<ParcelService<R>>>,
    axum::Json(inputs): axum::Json<Vec<ParcelInput>>,
) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.create_batch(inputs) {
        Ok(records) => (StatusCode::CREATED, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R>(State(service): State<Arc<ParcelService<R>>>) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.list() {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn top_handler<R>(
    State(service): State<Arc<ParcelService<R>>>,
    Query(query): Query<TopQuery>,
) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.top(query.limit.unwrap_or(DEFAULT_TOP_LIMIT)) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn county_stats_handler<R>(
    State(service): State<Arc<ParcelService<R>>>,
    Query(query): Query<CountyStatsQuery>,
) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.county_stats(query.state.as_deref()) {
        Ok(stats) => (StatusCode::OK, axum::Json(stats)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<ParcelService<R>>>,
    Path(parcel_id): Path<ParcelId>,
) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.get(parcel_id) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R>(
    State(service): State<Arc<ParcelService<R>>>,
    Path(parcel_id): Path<ParcelId>,
    axum::Json(update): axum::Json<ParcelUpdate>,
) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.update(parcel_id, update) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<ParcelService<R>>>,
    Path(parcel_id): Path<ParcelId>,
) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.delete(parcel_id) {
        Ok(()) => {
            let payload = json!({ "deleted": true, "id": parcel_id });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reset_handler<R>(State(service): State<Arc<ParcelService<R>>>) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.reset() {
        Ok(deleted_rows) => {
            let payload = json!({ "deleted_rows": deleted_rows });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn import_csv_handler<R>(
    State(service): State<Arc<ParcelService<R>>>,
    body: String,
) -> Response
where
    R: ParcelRepository + 'static,
{
    match service.import_csv(body.as_bytes()) {
        Ok(records) => (StatusCode::CREATED, axum::Json(records)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn rank_csv_handler(body: String) -> Response {
    match csv_io::rank_csv(body.as_bytes()) {
        Ok(ranked) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"ranked_parcels.csv\"",
                ),
            ],
            ranked.body,
        )
            .into_response(),
        Err(err) => error_response(err.into()),
    }
}

fn error_response(err: ParcelServiceError) -> Response {
    let status = match &err {
        ParcelServiceError::Validation(_) | ParcelServiceError::InvalidLimit(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ParcelServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ParcelServiceError::Csv(ParcelCsvError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ParcelServiceError::Csv(_) => StatusCode::BAD_REQUEST,
        ParcelServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parcels::memory::InMemoryParcelRepository;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn router() -> Router {
        parcel_router(Arc::new(ParcelService::new(Arc::new(
            InMemoryParcelRepository::new(),
        ))))
    }

    fn parcel_json(risk: f64) -> Value {
        json!({
            "state": "Iowa",
            "county": "Story",
            "acres": 80.0,
            "purchase_price_per_acre": 4000.0,
            "expected_payment_per_acre_year1": 200.0,
            "risk_score": risk,
        })
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, body.to_vec())
    }

    fn post_json(uri: &str, payload: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(payload).expect("json")))
            .expect("request")
    }

    #[tokio::test]
    async fn single_create_then_fetch() {
        let router = router();
        let request = post_json("/api/v1/parcels/single", &parcel_json(0.1));
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(created["las_score"], 90.0);

        let uri = format!("/api/v1/parcels/{}", created["id"]);
        let request = Request::get(&uri).body(Body::empty()).expect("request");
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        let fetched: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(fetched["id"], created["id"]);
    }

    #[tokio::test]
    async fn out_of_range_risk_is_unprocessable() {
        let router = router();
        let request = post_json("/api/v1/parcels/single", &parcel_json(3.0));
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert!(payload["error"].as_str().expect("message").contains("risk_score"));
    }

    #[tokio::test]
    async fn unknown_parcel_is_not_found() {
        let router = router();
        let request = Request::delete("/api/v1/parcels/77")
            .body(Body::empty())
            .expect("request");
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reset_route_wins_over_parcel_id() {
        let router = router();
        let batch = json!([parcel_json(0.1), parcel_json(0.2)]);
        let (status, _) = send(&router, post_json("/api/v1/parcels", &batch)).await;
        assert_eq!(status, StatusCode::CREATED);

        let request = Request::delete("/api/v1/parcels/reset")
            .body(Body::empty())
            .expect("request");
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        let payload: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["deleted_rows"], 2);
    }

    #[tokio::test]
    async fn top_rejects_zero_limit() {
        let router = router();
        let request = Request::get("/api/v1/parcels/top?limit=0")
            .body(Body::empty())
            .expect("request");
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn rank_csv_returns_text_csv() {
        let router = router();
        let csv = "state,county,acres,purchase_price_per_acre,expected_payment_per_acre_year1,risk_score\n\
                   Iowa,Story,80,4000,200,0.1\n";
        let request = Request::post("/api/v1/parcels/rank_csv")
            .header(header::CONTENT_TYPE, "text/csv")
            .body(Body::from(csv))
            .expect("request");
        let response = router.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).expect("content type"),
            "text/csv"
        );
    }

    #[tokio::test]
    async fn csv_without_required_headers_is_bad_request() {
        let router = router();
        let request = Request::post("/api/v1/parcels/import_csv")
            .body(Body::from("state,county\nIowa,Story\n"))
            .expect("request");
        let (status, _) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
