//! API data models for the War Room web surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warroom_core::{SchedulerState, SessionConfig, SessionId};
use warroom_proto::{BusError, ParticipantId, ParticipantState, Question};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response with a machine-readable kind.
///
/// `retryable` distinguishes "try again later" (turn violation) from "your
/// input was malformed", so the calling UI can decide between retrying
/// automatically and prompting the human.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
    pub retryable: bool,
}

impl ErrorResponse {
    /// Builds the wire body for a bus error.
    pub fn from_bus_error(err: &BusError) -> Self {
        Self {
            error: err.to_string(),
            kind: err.kind().to_string(),
            retryable: err.is_retryable(),
        }
    }

    /// A plain error body for non-bus failures.
    pub fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind: "internal".to_string(),
            retryable: false,
        }
    }
}

/// Request body for creating a session.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Optional config; server defaults apply when omitted.
    #[serde(default)]
    pub config: Option<SessionConfig>,
}

/// Response for a created session.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: SessionId,
}

/// Summary of a session for list views.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub state: SchedulerState,
    pub message_count: usize,
}

/// One participant's state.
#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub id: ParticipantId,
    pub state: ParticipantState,
}

/// Full session detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDetail {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub state: SchedulerState,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_interrupt: Option<ParticipantId>,
    pub participants: Vec<ParticipantInfo>,
    pub message_count: usize,
    pub pending_questions: Vec<Question>,
}

/// Request body for answering a question.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub response: String,
    /// Answering participant; defaults to the user.
    #[serde(default)]
    pub from: Option<ParticipantId>,
}

/// Query parameters for polling messages.
#[derive(Debug, Default, Deserialize)]
pub struct SinceQuery {
    /// Message-id cursor; `0` (the default) reads from the beginning.
    #[serde(default)]
    pub since: u64,
}
