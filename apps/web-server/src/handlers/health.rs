//! Liveness and storage check.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
    pub timestamp: String,
}

/// GET /health - 503 when the post store cannot be queried.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let database = match state.blog.repositories().groups.list().await {
        Ok(_) => "up",
        Err(e) => {
            tracing::error!(error = %e, "Health check could not reach the database");
            "down"
        }
    };

    let mut response = if database == "up" {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };

    response.json(HealthResponse {
        status: if database == "up" { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        database,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
