//! Transcription job orchestration
//!
//! Drives one request through validation, decoding, slot acquisition,
//! backend inference, and response formatting, under a single deadline
//! measured from request receipt. Stage transitions are logged per job
//! so a request's path is reconstructable from the log stream.

use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use hark_common::{HarkError, Result};
use hark_stt::{decode_audio, AudioPayload, TranscribeOptions};

use crate::state::AppState;
use crate::types::TranscribeResponse;

/// Lifecycle stage of a transcription job.
///
/// Completed, Failed, and TimedOut are terminal. The deadline can only
/// fire while waiting for a slot or for the backend; validation and
/// decoding run to completion once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    Validating,
    Decoding,
    AwaitingSlot,
    Transcribing,
    Formatting,
    Completed,
    Failed,
    TimedOut,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validating => "validating",
            Self::Decoding => "decoding",
            Self::AwaitingSlot => "awaiting_slot",
            Self::Transcribing => "transcribing",
            Self::Formatting => "formatting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// One request moving through the pipeline.
pub struct TranscriptionJob {
    pub id: Uuid,
    options: TranscribeOptions,
    started_at: Instant,
    deadline: Instant,
    timeout_secs: u64,
    stage: JobStage,
}

impl TranscriptionJob {
    /// Create a job whose deadline runs from `received_at`.
    pub fn new(options: TranscribeOptions, timeout_secs: u64, received_at: Instant) -> Self {
        let job = Self {
            id: Uuid::new_v4(),
            options,
            started_at: received_at,
            deadline: received_at + std::time::Duration::from_secs(timeout_secs),
            timeout_secs,
            stage: JobStage::Received,
        };
        debug!(job_id = %job.id, "Transcription job received");
        job
    }

    fn advance(&mut self, next: JobStage) {
        debug!(
            job_id = %self.id,
            from = self.stage.as_str(),
            to = next.as_str(),
            "Job stage transition"
        );
        self.stage = next;
    }

    fn timed_out(&self) -> HarkError {
        HarkError::TimedOut {
            timeout_secs: self.timeout_secs,
        }
    }

    /// Run the job to a terminal state and return its outcome.
    pub async fn run(mut self, state: &AppState, payload: AudioPayload) -> Result<TranscribeResponse> {
        let result = self.execute(state, payload).await;

        match &result {
            Ok(response) => {
                self.advance(JobStage::Completed);
                info!(
                    job_id = %self.id,
                    elapsed_ms = self.started_at.elapsed().as_millis() as u64,
                    duration_seconds = response.duration_seconds,
                    segments = response.segments.len(),
                    "Transcription job completed"
                );
            }
            Err(e) if matches!(e, HarkError::TimedOut { .. }) => {
                let at_stage = self.stage;
                self.advance(JobStage::TimedOut);
                warn!(
                    job_id = %self.id,
                    at_stage = at_stage.as_str(),
                    timeout_secs = self.timeout_secs,
                    "Transcription job timed out"
                );
            }
            Err(e) => {
                let at_stage = self.stage;
                self.advance(JobStage::Failed);
                warn!(
                    job_id = %self.id,
                    at_stage = at_stage.as_str(),
                    kind = e.kind(),
                    error = %e,
                    "Transcription job failed"
                );
            }
        }

        result
    }

    async fn execute(
        &mut self,
        state: &AppState,
        payload: AudioPayload,
    ) -> Result<TranscribeResponse> {
        self.advance(JobStage::Validating);
        state.validator.check_payload(&payload)?;

        self.advance(JobStage::Decoding);
        let audio = tokio::task::spawn_blocking(move || decode_audio(payload))
            .await
            .map_err(|e| HarkError::internal(format!("decode task panicked: {}", e)))??;
        state.validator.check_duration(&audio)?;
        let duration_seconds = audio.duration();

        self.advance(JobStage::AwaitingSlot);
        let slot = timeout_at(self.deadline, state.slots.acquire())
            .await
            .map_err(|_| self.timed_out())??;

        self.advance(JobStage::Transcribing);
        let transcription = timeout_at(
            self.deadline,
            state.backend.transcribe(audio, &self.options),
        )
        .await
        .map_err(|_| self.timed_out())??;

        // Return the slot before formatting; only inference occupies it.
        drop(slot);

        self.advance(JobStage::Formatting);
        Ok(TranscribeResponse::from_transcription(
            transcription,
            duration_seconds,
            self.options.granularity,
        ))
    }
}
