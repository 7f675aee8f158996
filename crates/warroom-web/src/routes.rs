//! API routes for the War Room web surface.

use crate::AppState;
use crate::models::{
    AnswerRequest, CreateSessionRequest, CreateSessionResponse, ErrorResponse, HealthResponse,
    ParticipantInfo, SessionDetail, SessionSummary, SinceQuery,
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use warroom_core::{Session, SessionId};
use warroom_proto::{BusError, Message, MessageDraft, ParticipantId, Question, QuestionId};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Maps a bus error to its transport representation.
///
/// Turn violations and stale resumes are 409 (retry later), malformed input
/// is 400, stale question references are 404. The body's `kind`/`retryable`
/// fields tell the caller whether to retry or re-prompt the human.
fn bus_error(err: &BusError) -> ApiError {
    let status = match err {
        BusError::InvalidMessage(_) | BusError::UnknownParticipant(_) => StatusCode::BAD_REQUEST,
        BusError::Rejected(_) | BusError::NotPaused => StatusCode::CONFLICT,
        BusError::QuestionNotFound(_) => StatusCode::NOT_FOUND,
    };
    (status, Json(ErrorResponse::from_bus_error(err)))
}

fn session_not_found(id: SessionId) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::message(format!("Session not found: {id}"))),
    )
}

fn lookup(state: &AppState, id: SessionId) -> Result<Session, ApiError> {
    state.manager.get(id).ok_or_else(|| session_not_found(id))
}

fn summarize(session: &Session) -> SessionSummary {
    SessionSummary {
        id: session.id(),
        created_at: session.created_at(),
        state: session.state(),
        message_count: session.message_count(),
    }
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Create a new session.
async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    if let Some(config) = &req.config {
        if let Err(e) = config.validate() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::message(e.to_string())),
            ));
        }
    }

    match state.manager.create(req.config) {
        Ok(session) => Ok(Json(CreateSessionResponse {
            session_id: session.id(),
        })),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::message(format!(
                "Failed to open session transcript: {e}"
            ))),
        )),
    }
}

/// List all live sessions.
async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(state.manager.list().iter().map(summarize).collect())
}

/// Get session detail.
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionDetail>, ApiError> {
    let session = lookup(&state, id)?;
    Ok(Json(SessionDetail {
        id: session.id(),
        created_at: session.created_at(),
        state: session.state(),
        current_interrupt: session.current_interrupt(),
        participants: session
            .participants()
            .into_iter()
            .map(|(id, state)| ParticipantInfo { id, state })
            .collect(),
        message_count: session.message_count(),
        pending_questions: session.pending_questions(),
    }))
}

/// Close a session.
async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    if state.manager.close(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(id))
    }
}

/// Submit a message draft.
async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Json(draft): Json<MessageDraft>,
) -> Result<Json<Message>, ApiError> {
    let session = lookup(&state, id)?;
    session.submit(draft).map(Json).map_err(|e| bus_error(&e))
}

/// Poll messages after a cursor, exactly-once.
async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
    Query(query): Query<SinceQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let session = lookup(&state, id)?;
    Ok(Json(session.read_since(query.since)))
}

/// Pause all agents ("hold on").
async fn interrupt_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    let session = lookup(&state, id)?;
    session
        .interrupt(ParticipantId::User)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| bus_error(&e))
}

/// Resume a paused session.
async fn resume_session(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ApiError> {
    let session = lookup(&state, id)?;
    session
        .resume()
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| bus_error(&e))
}

/// Answer a pending question.
async fn answer_question(
    State(state): State<AppState>,
    Path((id, question_id)): Path<(SessionId, QuestionId)>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<Question>, ApiError> {
    let session = lookup(&state, id)?;
    let from = req.from.unwrap_or(ParticipantId::User);
    match session.answer_from(question_id, from, &req.response) {
        Ok(question) => Ok(Json(question)),
        Err(e) => {
            if matches!(e, BusError::QuestionNotFound(_)) {
                // Stale answers are expected after expiry or double-clicks;
                // callers treat this as a no-op.
                tracing::debug!(session = %id, question = %question_id, "Stale answer ignored");
            }
            Err(bus_error(&e))
        }
    }
}

/// List participant states.
async fn list_participants(
    State(state): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<Vec<ParticipantInfo>>, ApiError> {
    let session = lookup(&state, id)?;
    Ok(Json(
        session
            .participants()
            .into_iter()
            .map(|(id, state)| ParticipantInfo { id, state })
            .collect(),
    ))
}

/// Create API routes.
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(health))
        // Session management
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route("/api/sessions/{id}", get(get_session).delete(close_session))
        // The bus boundary: submit / poll / interrupt / resume / answer
        .route(
            "/api/sessions/{id}/messages",
            get(list_messages).post(submit_message),
        )
        .route("/api/sessions/{id}/interrupt", post(interrupt_session))
        .route("/api/sessions/{id}/resume", post(resume_session))
        .route(
            "/api/sessions/{id}/questions/{qid}/answer",
            post(answer_question),
        )
        .route("/api/sessions/{id}/participants", get(list_participants))
        .with_state(state)
}
