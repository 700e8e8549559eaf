use crate::metrics::Metrics;
use crate::query::QueryService;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct HttpAppState {
    pub query: Arc<QueryService>,
    pub metrics: Arc<Metrics>,
}

pub fn build_router(query: Arc<QueryService>, metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/api/usage", get(usage))
        .route("/api/disk", get(disk))
        .route("/api/net", get(net))
        .route("/api/procs/top", get(procs_top))
        .route("/api/temps", get(temps))
        .route("/api/gpu", get(gpu))
        .with_state(HttpAppState { query, metrics })
}

async fn health() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

async fn metrics_handler(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_scrape_count();
    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encoding failed: {err}"),
        )
            .into_response(),
    }
}

async fn usage(State(state): State<HttpAppState>) -> impl IntoResponse {
    Json(state.query.usage().await)
}

async fn disk(State(state): State<HttpAppState>) -> impl IntoResponse {
    Json(state.query.disk().await)
}

async fn net(State(state): State<HttpAppState>) -> impl IntoResponse {
    Json(state.query.net().await)
}

async fn procs_top(State(state): State<HttpAppState>) -> impl IntoResponse {
    let snapshot = state.query.top_processes().await;
    Json((*snapshot).clone())
}

async fn temps(State(state): State<HttpAppState>) -> impl IntoResponse {
    Json(state.query.temperatures().await)
}

async fn gpu(State(state): State<HttpAppState>) -> impl IntoResponse {
    Json(state.query.gpus().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procs::{ProcessCache, SystemClock};
    use crate::source::{
        DiskCounters, GpuReport, MetricSource, NetCounters, RawProcess, TempReading,
    };
    use crate::store::TimeSeriesStore;
    use axum::body::to_bytes;
    use axum::http::Request;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    struct FakeSource;

    impl MetricSource for FakeSource {
        fn cpu_percent(&mut self) -> f64 {
            0.0
        }
        fn memory_percent(&mut self) -> f64 {
            0.0
        }
        fn disk_counters(&mut self) -> Option<DiskCounters> {
            None
        }
        fn net_counters(&mut self) -> Option<NetCounters> {
            None
        }
        fn processes(&mut self) -> Vec<RawProcess> {
            vec![RawProcess {
                pid: 1,
                name: "init".to_string(),
                cpu_percent: 0.5,
                memory_rss_bytes: 1024 * 1024,
            }]
        }
        fn temperatures(&mut self) -> Vec<TempReading> {
            Vec::new()
        }
        fn gpus(&mut self) -> GpuReport {
            GpuReport::default()
        }
    }

    fn test_app() -> Router {
        let store = Arc::new(TimeSeriesStore::seeded(240, 50.0, "00:00:00"));
        let source: Arc<Mutex<Box<dyn MetricSource>>> =
            Arc::new(Mutex::new(Box::new(FakeSource)));
        let procs = Arc::new(ProcessCache::new(
            source.clone(),
            Duration::from_secs(2),
            5,
            Arc::new(SystemClock),
        ));
        let query = Arc::new(QueryService::new(store, procs, source));
        let metrics = Metrics::new().expect("metrics init");
        build_router(query, metrics)
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok_true() {
        let json = get_json(test_app(), "/health").await;
        assert_eq!(json, json!({"ok": true}));
    }

    #[tokio::test]
    async fn usage_returns_seeded_series() {
        let json = get_json(test_app(), "/api/usage").await;
        assert_eq!(json["cpu"].as_array().unwrap().len(), 2);
        assert_eq!(json["memory"][0], 50.0);
        assert_eq!(
            json["timestamps"].as_array().unwrap().len(),
            json["cpu"].as_array().unwrap().len()
        );
    }

    #[tokio::test]
    async fn disk_and_net_have_rate_fields() {
        let app = test_app();
        let disk = get_json(app.clone(), "/api/disk").await;
        assert!(disk.get("read").is_some());
        assert!(disk.get("write").is_some());

        let net = get_json(app, "/api/net").await;
        assert!(net.get("rx").is_some());
        assert!(net.get("tx").is_some());
    }

    #[tokio::test]
    async fn procs_top_returns_ranked_snapshot() {
        let json = get_json(test_app(), "/api/procs/top").await;
        assert_eq!(json["cpu_top"][0]["name"], "init");
        assert!(json["ts"].is_string());
    }

    #[tokio::test]
    async fn temps_degrade_to_empty_list() {
        let json = get_json(test_app(), "/api/temps").await;
        assert_eq!(json, json!({"temps": []}));
    }

    #[tokio::test]
    async fn gpu_degrades_to_unavailable() {
        let json = get_json(test_app(), "/api/gpu").await;
        assert_eq!(json, json!({"available": false, "gpus": []}));
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_agent_gauges() {
        let response = test_app()
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("agent_cpu_percent"));
        assert!(text.contains("agent_scrape_count_total"));
    }
}
