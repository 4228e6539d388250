//! HTTP error mapping
//!
//! Wraps the pipeline error taxonomy so every failure leaves the server
//! as a structured JSON body with a machine-readable kind and the status
//! code the taxonomy assigns.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use hark_common::HarkError;

use crate::types::ErrorResponse;

/// Request-level error returned by route handlers.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub HarkError);

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::from(&self.0))
    }
}
