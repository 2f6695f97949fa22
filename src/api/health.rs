/// Health check endpoint
use crate::{context::AppContext, db};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: String,
    database: &'static str,
}

pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health_check))
}

/// Health check with a database connectivity probe
async fn health_check(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    let database = match db::test_connection(&ctx.db).await {
        Ok(_) => "ok",
        Err(_) => "unreachable",
    };

    Json(HealthResponse {
        status: if database == "ok" { "ok" } else { "degraded" },
        version: ctx.config.service.version.clone(),
        database,
    })
}
