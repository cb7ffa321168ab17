//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use super::AppState;
use super::types::{
    ErrorResponse, PlantResponse, PlantTick, StateResponse, TelemetryQuery, TelemetryRecord,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: String) -> ApiError {
    (status, Json(ErrorResponse { error: message }))
}

/// Returns simulation config, KPI report, and latest market record.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        config: state.config.clone(),
        kpi: state.kpi.clone(),
        latest_step: state.results.last().map(TelemetryRecord::from),
    })
}

/// Returns market records, optionally filtered by tick range.
///
/// `GET /telemetry` → 200 + `Vec<TelemetryRecord>` JSON
/// `GET /telemetry?from=N&to=M` → filtered range (inclusive)
/// `GET /telemetry?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TelemetryQuery>,
) -> Result<Json<Vec<TelemetryRecord>>, ApiError> {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err(error(
            StatusCode::BAD_REQUEST,
            format!("`from` ({from}) must be <= `to` ({to})"),
        ));
    }

    let records = state
        .results
        .iter()
        .filter(|r| r.tick >= from && r.tick <= to)
        .map(TelemetryRecord::from)
        .collect();

    Ok(Json(records))
}

/// Returns one plant's dispatch history.
///
/// `GET /plants/{id}` → 200 + `PlantResponse` JSON
/// `GET /plants/unknown` → 404 + `ErrorResponse`
pub async fn get_plant(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PlantResponse>, ApiError> {
    let ticks: Vec<PlantTick> = state
        .results
        .iter()
        .flat_map(|step| {
            step.plants
                .iter()
                .filter(|p| p.plant_id == id)
                .map(move |p| PlantTick::new(step, p))
        })
        .collect();

    if ticks.is_empty() {
        return Err(error(StatusCode::NOT_FOUND, format!("unknown plant \"{id}\"")));
    }

    Ok(Json(PlantResponse {
        plant_id: id,
        total_profit: ticks.iter().map(|t| t.profit).sum(),
        ticks,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::market::Bid;
    use crate::sim::kpi::KpiReport;
    use crate::sim::types::{PlantRecord, SimConfig, StepResult};

    fn make_test_state() -> Arc<AppState> {
        let config = SimConfig::new(24, 48, 1, 42);
        let results: Vec<StepResult> = (0..24)
            .map(|t| StepResult {
                tick: t,
                slot: t,
                demand: 100.0,
                predicted_demand: 0.0,
                clearing_price: 20.0 + t as f64,
                predicted_price: 0.0,
                buying_price: 19.0,
                selling_price: 21.0,
                load_factor: 0.5,
                renewable_qty: 10.0,
                total_quota: 100.0,
                epsilon: 0.01,
                iterations: 5,
                converged: true,
                imbalance: None,
                plants: vec![PlantRecord {
                    plant_id: "coal".to_string(),
                    bid: Bid::new(0.05, 10.0, 0.0, 200.0),
                    quota: 90.0,
                    scale: 1.0,
                    revenue: 1305.0,
                    profit: 2.0,
                    reward: None,
                }],
            })
            .collect();
        let kpi = KpiReport::from_results(&results);
        Arc::new(AppState {
            config,
            kpi,
            results,
        })
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let app = router(make_test_state());
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn state_returns_200() {
        let (status, json) = get_json("/state").await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("config").is_some());
        assert!(json.get("kpi").is_some());
        assert_eq!(json["latest_step"]["tick"], 23);
    }

    #[tokio::test]
    async fn telemetry_returns_all_steps() {
        let (status, json) = get_json("/telemetry").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(24));
    }

    #[tokio::test]
    async fn telemetry_range_query() {
        let (status, json) = get_json("/telemetry?from=5&to=10").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().map(Vec::len), Some(6)); // ticks 5..=10
        assert_eq!(json[0]["tick"], 5);
        assert_eq!(json[5]["tick"], 10);
    }

    #[tokio::test]
    async fn telemetry_invalid_range_returns_400() {
        let (status, json) = get_json("/telemetry?from=10&to=5").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json.get("error").is_some());
    }

    #[tokio::test]
    async fn plant_history() {
        let (status, json) = get_json("/plants/coal").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["plant_id"], "coal");
        assert_eq!(json["ticks"].as_array().map(Vec::len), Some(24));
        assert_eq!(json["total_profit"], 48.0);
    }

    #[tokio::test]
    async fn unknown_plant_returns_404() {
        let (status, json) = get_json("/plants/nuclear").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json.get("error").is_some());
    }
}
