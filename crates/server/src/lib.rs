//! Hark HTTP server
//!
//! Actix-web REST API for the transcription pipeline: a health probe
//! and a transcribe endpoint that accepts multipart or raw audio.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;

use hark_common::{AppConfig, HarkError, Result};

pub mod error;
pub mod job;
pub mod routes;
pub mod slots;
pub mod state;
pub mod types;

pub use state::AppState;

/// Build state and serve until shutdown.
pub async fn start_server(config: AppConfig) -> Result<()> {
    let bind_address = config.server_bind_address();
    let state = Arc::new(AppState::new(config)?);

    // Probe once at startup so a dead backend is visible immediately;
    // the server still comes up and reports it through /health.
    match state.backend.check_ready().await {
        Ok(()) => info!(backend = state.backend.name(), "Transcription backend ready"),
        Err(e) => warn!(
            backend = state.backend.name(),
            error = %e,
            "Transcription backend not ready at startup"
        ),
    }

    info!(
        backend = state.backend.name(),
        slots = state.slots.capacity(),
        "Starting server at http://{}",
        bind_address
    );

    let data = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .configure(routes::configure)
    })
    .bind(&bind_address)
    .map_err(|e| HarkError::config(format!("failed to bind {}: {}", bind_address, e)))?
    .run()
    .await
    .map_err(|e| HarkError::internal(format!("server terminated: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use actix_web::{http::StatusCode, test};
    use futures_util::future::join_all;

    use hark_common::{HarkError, HealthReadiness};
    use hark_stt::backend::mock::MockBackend;
    use hark_stt::wav::encode_wav;
    use hark_stt::AudioBuffer;

    use crate::types::{ErrorResponse, HealthResponse, TranscribeResponse};

    const BOUNDARY: &str = "hark-test-boundary";

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.request_timeout_seconds = 30;
        config.max_duration_seconds = 300;
        config
    }

    fn wav_bytes(seconds: f32) -> Vec<u8> {
        let frames = (seconds * 16000.0) as usize;
        let samples: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.05).sin() * 0.4).collect();
        encode_wav(&AudioBuffer::new(samples, 16000, 1))
    }

    fn multipart_body(
        file_bytes: &[u8],
        filename: &str,
        content_type: &str,
        fields: &[(&str, &str)],
    ) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, filename, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(file_bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn multipart_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/stt/transcribe")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(routes::configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_multipart_upload_returns_transcript() {
        let mock = Arc::new(MockBackend::new());
        let state = Arc::new(AppState::with_backend(test_config(), mock.clone()));
        let app = init_app!(state.clone());

        let body = multipart_body(&wav_bytes(5.0), "clip.wav", "audio/wav", &[("language", "en")]);
        let resp = test::call_service(&app, multipart_request(body).to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let parsed: TranscribeResponse = test::read_body_json(resp).await;

        assert!(!parsed.text.is_empty());
        assert!(!parsed.segments.is_empty());
        assert!((parsed.duration_seconds - 5.0).abs() < 0.05);
        assert!(parsed.confidence >= 0.0 && parsed.confidence <= 1.0);

        // Segments ordered and non-overlapping
        for pair in parsed.segments.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-3);
            assert!(pair[0].start <= pair[1].start);
        }
        for segment in &parsed.segments {
            assert!(segment.end <= parsed.duration_seconds + 1e-3);
            assert!(segment.confidence >= 0.0 && segment.confidence <= 1.0);
        }

        assert_eq!(parsed.language.as_deref(), Some("en"));
        assert_eq!(mock.calls(), 1);
    }

    #[actix_web::test]
    async fn test_raw_binary_upload_returns_transcript() {
        let mock = Arc::new(MockBackend::new());
        let state = Arc::new(AppState::with_backend(test_config(), mock.clone()));
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/stt/transcribe")
            .insert_header(("content-type", "audio/wav"))
            .set_payload(wav_bytes(1.0))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let parsed: TranscribeResponse = test::read_body_json(resp).await;
        assert!(!parsed.text.is_empty());
        assert_eq!(mock.calls(), 1);
    }

    #[actix_web::test]
    async fn test_unsupported_content_type_is_rejected() {
        let mock = Arc::new(MockBackend::new());
        let state = Arc::new(AppState::with_backend(test_config(), mock.clone()));
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/stt/transcribe")
            .insert_header(("content-type", "application/pdf"))
            .set_payload(vec![0x25, 0x50, 0x44, 0x46])
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let parsed: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(parsed.error.kind, "UnsupportedFormat");
        assert_eq!(mock.calls(), 0);
    }

    #[actix_web::test]
    async fn test_oversized_payload_is_rejected() {
        let mock = Arc::new(MockBackend::new());
        let mut config = test_config();
        config.max_payload_bytes = 1024;
        let state = Arc::new(AppState::with_backend(config, mock.clone()));
        let app = init_app!(state);

        let body = multipart_body(&vec![0u8; 4096], "big.wav", "audio/wav", &[]);
        let resp = test::call_service(&app, multipart_request(body).to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let parsed: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(parsed.error.kind, "PayloadTooLarge");
        assert_eq!(mock.calls(), 0);
    }

    #[actix_web::test]
    async fn test_stalled_backend_times_out_and_frees_slot() {
        let mock = Arc::new(MockBackend::hanging(Duration::from_secs(3)));
        let mut config = test_config();
        config.request_timeout_seconds = 1;
        let state = Arc::new(AppState::with_backend(config, mock.clone()));
        let app = init_app!(state.clone());

        let req = test::TestRequest::post()
            .uri("/stt/transcribe")
            .insert_header(("content-type", "audio/wav"))
            .set_payload(wav_bytes(1.0))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let parsed: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(parsed.error.kind, "TimedOut");

        // The cancelled job released its slot with the response.
        assert_eq!(state.slots.available(), state.slots.capacity());
        assert_eq!(mock.active(), 0);
    }

    #[actix_web::test]
    async fn test_concurrent_uploads_respect_slot_capacity() {
        let mock = Arc::new(
            MockBackend::new()
                .with_concurrency(2)
                .with_delay(Duration::from_millis(100)),
        );
        let state = Arc::new(AppState::with_backend(test_config(), mock.clone()));
        let app = init_app!(state.clone());

        let requests: Vec<_> = (0..6)
            .map(|_| {
                let req = test::TestRequest::post()
                    .uri("/stt/transcribe")
                    .insert_header(("content-type", "audio/wav"))
                    .set_payload(wav_bytes(1.0))
                    .to_request();
                test::call_service(&app, req)
            })
            .collect();

        let responses = join_all(requests).await;

        for resp in responses {
            assert_eq!(resp.status(), StatusCode::OK);
        }
        assert_eq!(mock.calls(), 6);
        assert!(mock.peak_concurrency() <= 2);
        assert_eq!(state.slots.available(), 2);
    }

    #[actix_web::test]
    async fn test_backend_failure_maps_to_bad_gateway() {
        let mock = Arc::new(MockBackend::failing(HarkError::backend_internal(
            "model exploded",
        )));
        let state = Arc::new(AppState::with_backend(test_config(), mock));
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/stt/transcribe")
            .insert_header(("content-type", "audio/wav"))
            .set_payload(wav_bytes(1.0))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let parsed: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(parsed.error.kind, "BackendInternal");
    }

    #[actix_web::test]
    async fn test_timestamps_none_omits_segments() {
        let mock = Arc::new(MockBackend::new());
        let state = Arc::new(AppState::with_backend(test_config(), mock));
        let app = init_app!(state);

        let body = multipart_body(
            &wav_bytes(3.0),
            "clip.wav",
            "audio/wav",
            &[("timestamps", "none")],
        );
        let resp = test::call_service(&app, multipart_request(body).to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let parsed: TranscribeResponse = test::read_body_json(resp).await;
        assert!(!parsed.text.is_empty());
        assert!(parsed.segments.is_empty());
    }

    #[actix_web::test]
    async fn test_multipart_without_file_field_is_invalid() {
        let mock = Arc::new(MockBackend::new());
        let state = Arc::new(AppState::with_backend(test_config(), mock));
        let app = init_app!(state);

        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"language\"\r\n\r\nen\r\n--{}--\r\n",
                BOUNDARY, BOUNDARY
            )
            .as_bytes(),
        );
        let resp = test::call_service(&app, multipart_request(body).to_request()).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let parsed: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(parsed.error.kind, "InvalidRequest");
    }

    #[actix_web::test]
    async fn test_octet_stream_part_uses_filename_extension() {
        let mock = Arc::new(MockBackend::new());
        let state = Arc::new(AppState::with_backend(test_config(), mock));
        let app = init_app!(state);

        let body = multipart_body(
            &wav_bytes(1.0),
            "clip.wav",
            "application/octet-stream",
            &[],
        );
        let resp = test::call_service(&app, multipart_request(body).to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_health_lenient_is_ok_with_unready_backend() {
        let mock = Arc::new(MockBackend::unready());
        let state = Arc::new(AppState::with_backend(test_config(), mock));
        let app = init_app!(state);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let parsed: HealthResponse = test::read_body_json(resp).await;
        assert_eq!(parsed.status, "ok");
        assert_eq!(parsed.backend, "mock");
    }

    #[actix_web::test]
    async fn test_health_strict_reports_unready_backend() {
        let mock = Arc::new(MockBackend::unready());
        let mut config = test_config();
        config.health_readiness = HealthReadiness::Strict;
        let state = Arc::new(AppState::with_backend(config, mock));
        let app = init_app!(state);

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let parsed: HealthResponse = test::read_body_json(resp).await;
        assert_eq!(parsed.status, "unavailable");
    }
}
