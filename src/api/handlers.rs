use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let response = RootResponse {
        message: state.settings().api().project_name.clone(),
        version: state.settings().api().version.clone(),
        environment: state.settings().runtime().environment.as_str().to_string(),
    };

    Json(response)
}

/// Liveness plus component status. Redis being down only degrades answer-save
/// throttling; the database being down makes the service unhealthy.
pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut components = HashMap::new();

    let (redis, redis_ok) = redis_status(&state).await;
    components.insert("redis".to_string(), redis);
    let (database, database_ok) = database_status(&state).await;
    components.insert("database".to_string(), database);

    let status = match (database_ok, redis_ok) {
        (false, _) => "unhealthy",
        (true, false) => "degraded",
        (true, true) => "healthy",
    };

    Json(HealthResponse {
        service: "coursecert-api".to_string(),
        status: status.to_string(),
        components,
    })
}

async fn redis_status(state: &AppState) -> (String, bool) {
    match state.redis().health().await {
        RedisHealth::Healthy => ("healthy".to_string(), true),
        RedisHealth::Disconnected => ("disconnected".to_string(), true),
        RedisHealth::Unhealthy(error) => (format!("unhealthy: {error}"), false),
    }
}

async fn database_status(state: &AppState) -> (String, bool) {
    match sqlx::query("SELECT 1").execute(state.db()).await {
        Ok(_) => ("healthy".to_string(), true),
        Err(err) => (format!("unhealthy: {err}"), false),
    }
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
