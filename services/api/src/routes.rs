use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use land_engine::parcels::{parcel_router, ParcelRepository, ParcelService};
use land_engine::programs::{program_router, ProgramScorer};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_service_routes<R>(
    scorer: Arc<ProgramScorer>,
    parcels: Arc<ParcelService<R>>,
) -> axum::Router
where
    R: ParcelRepository + 'static,
{
    program_router(scorer)
        .merge(parcel_router(parcels))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use land_engine::eligibility::{EmptyEligibilityPolicy, RuleMapCache};
    use land_engine::parcels::InMemoryParcelRepository;
    use land_engine::schedules::ScheduleSet;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app(readiness: Arc<AtomicBool>) -> axum::Router {
        let scorer = Arc::new(ProgramScorer::new(
            ScheduleSet::default(),
            Arc::new(RuleMapCache::disabled()),
            EmptyEligibilityPolicy::default(),
        ));
        let parcels = Arc::new(ParcelService::new(Arc::new(
            InMemoryParcelRepository::new(),
        )));
        let state = AppState {
            readiness,
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_service_routes(scorer, parcels).layer(Extension(state))
    }

    async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::get(uri).body(Body::empty()).expect("request");
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let (status, body) = get(app(Arc::new(AtomicBool::new(false))), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn readiness_follows_the_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let (status, body) = get(app(flag.clone()), "/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "initializing");

        flag.store(true, Ordering::Release);
        let (status, _) = get(app(flag), "/ready").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn program_and_parcel_routes_are_mounted() {
        let app = app(Arc::new(AtomicBool::new(true)));
        let (status, body) = get(app.clone(), "/api/v1/parcels").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, body) = get(app, "/api/v1/programs/crp/counties?state=MI").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["counties"], json!([]));
    }
}
