use actix_web::{get, web, HttpResponse};
use std::sync::Arc;

use hark_common::HealthReadiness;

use crate::error::ApiError;
use crate::state::AppState;
use crate::types::HealthResponse;

/// Service health and readiness.
///
/// In lenient mode the endpoint answers ok whenever the process is up.
/// In strict mode the backend is probed and an unready backend turns
/// the answer into 503.
#[get("/health")]
pub async fn health(
    state: web::Data<Arc<AppState>>,
) -> Result<HttpResponse, ApiError> {
    let mut response = HealthResponse {
        status: "ok".to_string(),
        backend: state.backend.name().to_string(),
        available_slots: state.slots.available(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    if state.config.health_readiness == HealthReadiness::Strict {
        if let Err(e) = state.backend.check_ready().await {
            tracing::warn!(error = %e, "Health probe found backend unready");
            response.status = "unavailable".to_string();
            return Ok(HttpResponse::ServiceUnavailable().json(response));
        }
    }

    Ok(HttpResponse::Ok().json(response))
}
