//! OpenAI-compatible v1 API.
//!
//! Endpoints:
//!
//! - `POST /v1/chat/completions` — chat completion, JSON or SSE (`stream: true`)
//!
//! Errors are returned as `{"detail": "..."}` with the matching status code.

use axum::{
    Router,
    extract::State,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use localllm_core::{CompletionRequest, CompletionResponse, Error};

use crate::SharedState;

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat/completions", post(chat_completions_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// An error on its way to the client.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidRequest(detail) => Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail),
            Error::Generation(e) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                detail: self.detail,
            }),
        )
            .into_response()
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// `POST /v1/chat/completions`
async fn chat_completions_handler(
    State(state): State<SharedState>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected malformed completion request");
        ApiError::from(rejection)
    })?;
    request.validate()?;

    info!(
        model = %request.model,
        messages = request.messages.len(),
        stream = request.stream,
        "v1/chat/completions request"
    );

    let response = state.router.complete(&request).await.map_err(|e| {
        error!(error = %e, "Error generating completion");
        ApiError::from(e)
    })?;

    if request.stream {
        Ok(sse_response(response).into_response())
    } else {
        Ok(Json(response).into_response())
    }
}

/// Deliver a finished completion as `chat.completion.chunk` events followed
/// by the `[DONE]` sentinel.
fn sse_response(
    response: CompletionResponse,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, axum::Error>>> {
    let mut events: Vec<Result<SseEvent, axum::Error>> = response
        .into_chunks()
        .iter()
        .map(|chunk| SseEvent::default().json_data(chunk))
        .collect();
    events.push(Ok(SseEvent::default().data("[DONE]")));
    Sse::new(tokio_stream::iter(events))
}
