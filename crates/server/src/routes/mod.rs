//! HTTP route handlers

use actix_web::web;

use hark_common::HarkError;

use crate::error::ApiError;

pub mod health;
pub mod transcribe;

/// Register all routes and extractor configuration.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        ApiError(HarkError::invalid_request(format!(
            "invalid query parameters: {}",
            err
        )))
        .into()
    });

    cfg.app_data(query_config)
        .service(health::health)
        .service(transcribe::transcribe);
}
