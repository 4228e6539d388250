use actix_multipart::{Field, Multipart};
use actix_web::http::header;
use actix_web::{post, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::time::Instant;

use hark_common::{HarkError, Result};
use hark_stt::audio::content_type_for_extension;
use hark_stt::{AudioPayload, Granularity, TranscribeOptions};

use crate::error::ApiError;
use crate::job::TranscriptionJob;
use crate::state::AppState;
use crate::types::TranscribeParams;

/// Transcribe an audio upload.
///
/// Accepts either a multipart form with a `file` part (plus optional
/// `language` and `timestamps` fields) or the raw audio bytes with a
/// Content-Type header naming the format. Body reading counts against
/// the request deadline.
#[post("/stt/transcribe")]
pub async fn transcribe(
    req: HttpRequest,
    query: web::Query<TranscribeParams>,
    mut payload: web::Payload,
    state: web::Data<Arc<AppState>>,
) -> std::result::Result<HttpResponse, ApiError> {
    let received_at = Instant::now();
    let cap = state.config.max_payload_bytes;

    let content_type_header = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    // Form fields override query parameters when both are present.
    let mut params = query.into_inner();

    let audio = if content_type_header
        .to_lowercase()
        .starts_with("multipart/form-data")
    {
        read_multipart(&req, payload, cap, &mut params).await?
    } else {
        if content_type_header.is_empty() {
            return Err(ApiError(HarkError::invalid_request(
                "missing Content-Type header",
            )));
        }
        let bytes = read_body_capped(&mut payload, cap).await?;
        AudioPayload::new(bytes, &content_type_header)
    };

    let options = build_options(params)?;
    let job = TranscriptionJob::new(options, state.config.request_timeout_seconds, received_at);
    let response = job.run(&state, audio).await?;

    Ok(HttpResponse::Ok().json(response))
}

/// Pull the audio file and any form fields out of a multipart body.
async fn read_multipart(
    req: &HttpRequest,
    payload: web::Payload,
    cap: usize,
    params: &mut TranscribeParams,
) -> Result<AudioPayload> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut audio: Option<AudioPayload> = None;

    while let Some(item) = multipart.next().await {
        let mut field = item
            .map_err(|e| HarkError::invalid_request(format!("malformed multipart body: {}", e)))?;

        let (name, filename) = {
            let cd = field.content_disposition();
            (
                cd.get_name().unwrap_or("").to_string(),
                cd.get_filename().map(|s| s.to_string()),
            )
        };

        match name.as_str() {
            "file" => {
                let declared = field.content_type().map(|m| m.essence_str().to_string());
                let bytes = read_field_capped(&mut field, cap).await?;
                let content_type = resolve_part_content_type(declared, filename.as_deref());
                audio = Some(AudioPayload::new(bytes, &content_type));
            }
            "language" => {
                params.language = Some(read_field_string(&mut field).await?);
            }
            "timestamps" => {
                params.timestamps = Some(read_field_string(&mut field).await?);
            }
            _ => {
                // Drain unknown fields so the stream stays parseable
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| {
                        HarkError::invalid_request(format!("malformed multipart body: {}", e))
                    })?;
                }
            }
        }
    }

    audio.ok_or_else(|| HarkError::invalid_request("multipart body is missing a 'file' field"))
}

/// Content-type for a file part: its own header when meaningful,
/// otherwise inferred from the filename extension.
fn resolve_part_content_type(declared: Option<String>, filename: Option<&str>) -> String {
    if let Some(ct) = &declared {
        if ct != "application/octet-stream" {
            return ct.clone();
        }
    }

    if let Some(name) = filename {
        if let Some(ext) = std::path::Path::new(name).extension().and_then(|e| e.to_str()) {
            if let Some(ct) = content_type_for_extension(ext) {
                return ct.to_string();
            }
        }
    }

    declared.unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Read a file part, stopping one byte past the payload cap.
///
/// An over-cap read is not an error here; the validator reports it as
/// PayloadTooLarge so the taxonomy owns the rejection.
async fn read_field_capped(field: &mut Field, cap: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk
            .map_err(|e| HarkError::invalid_request(format!("malformed multipart body: {}", e)))?;
        if bytes.len() + chunk.len() > cap {
            let take = cap + 1 - bytes.len();
            bytes.extend_from_slice(&chunk[..take.min(chunk.len())]);
            return Ok(bytes);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Read a raw request body, stopping one byte past the payload cap.
async fn read_body_capped(payload: &mut web::Payload, cap: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk =
            chunk.map_err(|e| HarkError::invalid_request(format!("broken request body: {}", e)))?;
        if bytes.len() + chunk.len() > cap {
            let take = cap + 1 - bytes.len();
            bytes.extend_from_slice(&chunk[..take.min(chunk.len())]);
            return Ok(bytes);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Read a small text form field.
async fn read_field_string(field: &mut Field) -> Result<String> {
    // Ample for a language code or granularity name
    let bytes = read_field_capped(field, 1024).await?;
    String::from_utf8(bytes)
        .map_err(|_| HarkError::invalid_request("form field is not valid UTF-8"))
}

/// Turn request parameters into backend options.
fn build_options(params: TranscribeParams) -> Result<TranscribeOptions> {
    let granularity = match params.timestamps.as_deref() {
        Some(s) => s.parse::<Granularity>()?,
        None => Granularity::Segment,
    };

    let mut options = TranscribeOptions::default().with_granularity(granularity);
    options.language = params.language.filter(|s| !s.trim().is_empty());
    Ok(options)
}
